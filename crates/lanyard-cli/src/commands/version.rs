//! Version command implementation.

const VERSION: &str = env!("CARGO_PKG_VERSION");

pub fn run() {
    println!("lanyard {VERSION}");
    println!();
    println!("Attribute resolution and release filtering.");
    println!();
    println!("Build info:");
    println!("  Arch:         {}", std::env::consts::ARCH);
    println!("  OS:           {}", std::env::consts::OS);
}
