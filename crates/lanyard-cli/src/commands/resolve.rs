//! Dry-run attribute release.

use anyhow::{Context, Result, bail};
use lanyard::{AttributeService, Release, ReleaseRequest};
use lanyard_config::LanyardConfig;

use super::offline_backends;

pub struct Args {
    pub principal: String,
    pub requester: Option<String>,
    pub issuer: Option<String>,
    pub authn_method: Option<String>,
    pub attributes: Vec<String>,
}

impl Args {
    fn request(&self) -> ReleaseRequest {
        let mut request = ReleaseRequest::new(&self.principal)
            .with_requested_attributes(self.attributes.iter().cloned());
        if let Some(requester) = &self.requester {
            request = request.with_requester(requester);
        }
        if let Some(issuer) = &self.issuer {
            request = request.with_issuer(issuer);
        }
        if let Some(method) = &self.authn_method {
            request = request.with_authentication_method(method);
        }
        request
    }
}

pub fn run(config: &LanyardConfig, args: Args, format: &str) -> Result<()> {
    if !matches!(format, "text" | "json") {
        bail!("Unknown format '{format}' (expected text or json)");
    }

    let service = AttributeService::from_config(config, &offline_backends())
        .context("Configuration is invalid")?;
    let release = service
        .release(args.request())
        .with_context(|| format!("Attribute release for '{}' failed", args.principal))?;

    if format == "json" {
        println!("{}", serde_json::to_string_pretty(&release)?);
    } else {
        print_text(&args, &release);
    }
    Ok(())
}

fn print_text(args: &Args, release: &Release) {
    println!(
        "Release for '{}' to {}",
        args.principal,
        args.requester.as_deref().unwrap_or("(no requester)")
    );
    println!();

    if release.attributes.is_empty() {
        println!("  (nothing released)");
    }
    for (id, attribute) in &release.attributes {
        let values: Vec<String> = attribute.values().iter().map(ToString::to_string).collect();
        println!("  {id}: {}", values.join(", "));
    }
    println!();

    println!("Policies:");
    for outcome in &release.report.policies {
        println!("  {}: {}", outcome.policy, outcome.requirement);
    }
    if !release.report.removed.is_empty() {
        println!("Withheld: {}", release.report.removed.join(", "));
    }
    for failure in &release.report.value_failures {
        println!(
            "Failed {:?} evaluation: policy {} attribute {} value {}",
            failure.side, failure.policy, failure.attribute, failure.value
        );
    }
}
