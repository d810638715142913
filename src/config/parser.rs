use super::Config;
use anyhow::{Context, Result};
use std::path::Path;

/// Reads and validates a configuration file.
///
/// # Errors
///
/// Returns an error if the file cannot be read, is not valid TOML, or fails validation.
pub fn parse_config_file(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;
    parse_config_str(&content)
        .with_context(|| format!("Invalid config file: {}", path.display()))
}

pub(crate) fn parse_config_str(content: &str) -> Result<Config> {
    let config: Config = toml::from_str(content).with_context(|| "Failed to parse TOML config")?;

    validate_config(&config)?;
    Ok(config)
}

fn validate_config(config: &Config) -> Result<()> {
    if config.performance.mmap_threshold == 0 {
        anyhow::bail!("mmap_threshold must be at least 1 byte");
    }

    if config
        .snapshot
        .exclude_from
        .as_deref()
        .is_some_and(|p| p.trim().is_empty())
    {
        anyhow::bail!("snapshot.exclude_from cannot be empty");
    }

    Ok(())
}
