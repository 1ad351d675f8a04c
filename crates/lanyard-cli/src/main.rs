//! Lanyard operator CLI.
//!
//! Checks configuration, prints the merged result and dry-runs attribute
//! releases against it.
//!
//! # Quick Start
//!
//! ```bash
//! # Build the resolver and filter from ./lanyard.toml
//! lanyard check
//!
//! # Show the merged configuration
//! lanyard show --format toml
//!
//! # What would https://sp.example.org receive for alice?
//! lanyard resolve --principal alice --requester https://sp.example.org
//! ```

mod commands;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use lanyard_config::ConfigLoader;
use tracing_subscriber::EnvFilter;

/// Lanyard - attribute resolution and release filtering.
#[derive(Parser)]
#[command(name = "lanyard")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Directory containing lanyard.toml.
    #[arg(short, long, global = true, default_value = ".")]
    project: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show version information.
    Version,

    /// Build the resolver and filter and check connector backends.
    Check {
        /// Only build the engines; do not contact backends.
        #[arg(long)]
        skip_backends: bool,
    },

    /// Print the merged configuration.
    Show {
        /// Output format (text, json, toml).
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Resolve and filter attributes for one principal.
    Resolve {
        /// Principal name.
        #[arg(long)]
        principal: String,

        /// Relying party entity id.
        #[arg(short, long)]
        requester: Option<String>,

        /// Issuing entity id.
        #[arg(long)]
        issuer: Option<String>,

        /// Authentication method of the principal.
        #[arg(long)]
        authn_method: Option<String>,

        /// Attribute to resolve (repeatable). Defaults to all.
        #[arg(short, long = "attribute")]
        attributes: Vec<String>,

        /// Output format (text, json).
        #[arg(short, long, default_value = "text")]
        format: String,
    },
}

fn init_logging(default_directive: &str) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_directive))
        .unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    if matches!(cli.command, Commands::Version) {
        commands::version::run();
        return Ok(());
    }

    let config = ConfigLoader::new()
        .with_project_dir(&cli.project)
        .load()
        .with_context(|| format!("Failed to load configuration from {}", cli.project.display()))?;
    init_logging(&config.logging.level);
    tracing::debug!(
        project = %cli.project.display(),
        connectors = config.resolver.connectors.len(),
        definitions = config.resolver.definitions.len(),
        policies = config.filter.policies.len(),
        "configuration loaded"
    );

    match cli.command {
        Commands::Version => Ok(()),
        Commands::Check { skip_backends } => commands::check::run(&config, skip_backends),
        Commands::Show { format } => commands::show::run(&config, &format),
        Commands::Resolve {
            principal,
            requester,
            issuer,
            authn_method,
            attributes,
            format,
        } => commands::resolve::run(
            &config,
            commands::resolve::Args {
                principal,
                requester,
                issuer,
                authn_method,
                attributes,
            },
            &format,
        ),
    }
}
