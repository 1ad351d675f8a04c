//! Configuration display command.

use anyhow::{Result, bail};
use lanyard_config::{ConnectorSource, DefinitionSource, LanyardConfig};

/// Show the merged configuration.
pub fn run(config: &LanyardConfig, format: &str) -> Result<()> {
    match format {
        "json" => {
            let json = serde_json::to_string_pretty(config)?;
            println!("{json}");
        }
        "toml" => {
            let toml_str = toml::to_string_pretty(config)?;
            println!("{toml_str}");
        }
        "text" => print_text(config),
        other => bail!("Unknown format '{other}' (expected text, json or toml)"),
    }
    Ok(())
}

fn print_text(config: &LanyardConfig) {
    println!("Lanyard Configuration");
    println!("=====================\n");

    println!("Resolver '{}':", config.resolver.id);
    println!("  Connectors:");
    for connector in &config.resolver.connectors {
        let kind = match &connector.source {
            ConnectorSource::Static { .. } => "static".to_string(),
            ConnectorSource::Directory { backend, .. } => format!("directory ({backend})"),
            ConnectorSource::Relational { backend, .. } => format!("relational ({backend})"),
        };
        match &connector.failover {
            Some(failover) => println!("    {} [{kind}] failover -> {failover}", connector.id),
            None => println!("    {} [{kind}]", connector.id),
        }
    }
    println!("  Definitions:");
    for definition in &config.resolver.definitions {
        let kind = match &definition.kind {
            DefinitionSource::Simple => "simple",
            DefinitionSource::Scoped { .. } => "scoped",
            DefinitionSource::RegexSplit { .. } => "regex-split",
            DefinitionSource::Scripted { .. } => "scripted",
            DefinitionSource::PrincipalAuthenticationMethod => "principal-authentication-method",
        };
        let deps: Vec<&str> = definition
            .dependencies
            .iter()
            .map(|d| d.plugin.as_str())
            .collect();
        let hidden = if definition.dependency_only {
            " (dependency only)"
        } else {
            ""
        };
        println!(
            "    {} [{kind}] <- {}{hidden}",
            definition.id,
            deps.join(", ")
        );
    }
    println!();

    println!("Filter '{}':", config.filter.id);
    println!("  Audit: {}", config.filter.audit);
    for policy in &config.filter.policies {
        let attributes: Vec<&str> = policy.rules.iter().map(|r| r.attribute.as_str()).collect();
        println!("  Policy {}: {}", policy.id, attributes.join(", "));
    }
    println!();

    println!("Metadata:");
    println!("  Parties: {}", config.metadata.parties.len());
    println!();

    println!("Logging:");
    println!("  Level: {}", config.logging.level);
}
