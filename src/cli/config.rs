//! Config loading and the `config init` command

use crate::cli::{ConfigInitArgs, CoreArgs};
use crate::config::{HelpdeskConfig, ProviderKind};
use std::fs;

const EXAMPLE_CONFIG: &str = include_str!("../../helpdesk.example.toml");

/// Load configuration: defaults, then file, then env, then CLI flags.
///
/// A missing file is not an error; defaults are used instead.
pub fn load_config(args: &CoreArgs) -> Result<HelpdeskConfig, Box<dyn std::error::Error>> {
    let mut config = if args.config.exists() {
        HelpdeskConfig::load(Some(&args.config))?
    } else {
        tracing::debug!(path = %args.config.display(), "config file not found, using defaults");
        HelpdeskConfig::default()
    };

    config = config.with_env_overrides();

    if let Some(limit) = args.daily_limit {
        config.quota.daily_limit = limit;
    }
    if args.offline {
        config.provider.kind = ProviderKind::Offline;
    }
    if let Some(ref level) = args.log_level {
        config.logging.level = level.clone();
    }

    config.validate()?;
    Ok(config)
}

/// Handle `helpdesk config init` command
pub fn handle_config_init(args: &ConfigInitArgs) -> Result<(), Box<dyn std::error::Error>> {
    if args.output.exists() && !args.force {
        return Err(format!(
            "File already exists: {}. Use --force to overwrite.",
            args.output.display()
        )
        .into());
    }

    fs::write(&args.output, EXAMPLE_CONFIG)?;

    println!("✓ Configuration file created: {}", args.output.display());
    println!("  Edit this file to set the daily limit, cache size and provider.");

    Ok(())
}
