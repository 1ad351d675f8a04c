//! Configuration check command.

use anyhow::{Context, Result};
use lanyard::AttributeService;
use lanyard_config::LanyardConfig;

use super::offline_backends;

/// Build both engines and, unless skipped, validate every connector.
pub fn run(config: &LanyardConfig, skip_backends: bool) -> Result<()> {
    println!("Checking configuration...");

    let service = AttributeService::from_config(config, &offline_backends())
        .context("Configuration is invalid")?;

    println!(
        "✓ Resolver '{}': {} connectors, {} definitions",
        service.resolver().id(),
        service.resolver().connector_ids().count(),
        service.resolver().definition_ids().count()
    );
    println!(
        "✓ Filter '{}': {} policies",
        service.filter().id(),
        service.filter().policies().len()
    );

    if skip_backends {
        return Ok(());
    }

    match service.validate() {
        Ok(()) => {
            println!("✓ All connectors validated");
            Ok(())
        }
        Err(e) => {
            println!("✗ Connector validation failed:");
            println!("  {e}");
            Err(e.into())
        }
    }
}
