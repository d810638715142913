use anyhow::Result;
use colored::Colorize;
use std::collections::HashSet;
use std::path::Path;

/// Flags configuration keys that fsdiff does not understand.
///
/// Unknown keys are only warned about; serde ignores them when loading.
pub struct ConfigValidator {
    /// Set of valid configuration fields that are recognized by fsdiff
    known_fields: HashSet<&'static str>,
}

impl ConfigValidator {
    /// Create a new validator with known configuration fields
    #[must_use]
    pub fn new() -> Self {
        let known_fields = HashSet::from([
            // Snapshot fields
            "snapshot.carry_on",
            "snapshot.shallow",
            "snapshot.exclude",
            "snapshot.exclude_from",
            // Diff fields
            "diff.ignore",
            "diff.exclude",
            // Output fields
            "output.color",
            // Performance fields
            "performance.mmap_threshold",
        ]);

        Self { known_fields }
    }

    /// Validate a configuration file and warn about unknown fields on stderr
    ///
    /// # Errors
    ///
    /// Returns an error if the config file cannot be read or parsed
    pub fn validate_config_file(&self, config_path: &Path) -> Result<()> {
        if !config_path.exists() {
            return Ok(());
        }

        let content = std::fs::read_to_string(config_path)?;
        let unknown = self.unknown_fields(&content)?;

        if !unknown.is_empty() {
            eprintln!("{}", "Configuration warnings:".yellow().bold());
            for field in &unknown {
                eprintln!("  Unknown configuration field: {}", field.yellow());
            }
            eprintln!();
        }

        Ok(())
    }

    /// Dotted names of every leaf field in `content` that is not recognized.
    ///
    /// # Errors
    ///
    /// Returns an error if `content` is not valid TOML
    pub fn unknown_fields(&self, content: &str) -> Result<Vec<String>> {
        let parsed: toml::Table = toml::from_str(content)?;
        let mut unknown = Vec::new();
        self.check_table(&parsed, "", &mut unknown);
        Ok(unknown)
    }

    /// Recursively collects unknown leaf fields of `table` under `prefix`
    fn check_table(&self, table: &toml::Table, prefix: &str, unknown: &mut Vec<String>) {
        for (key, value) in table {
            let full_key = if prefix.is_empty() {
                key.clone()
            } else {
                format!("{prefix}.{key}")
            };

            if self.known_fields.contains(full_key.as_str()) {
                continue;
            }

            match value {
                toml::Value::Table(nested) => self.check_table(nested, &full_key, unknown),
                _ => unknown.push(full_key),
            }
        }
    }
}

impl Default for ConfigValidator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_fields_pass() -> Result<()> {
        let validator = ConfigValidator::new();
        let content = r#"
[snapshot]
carry_on = true
exclude = ["a"]

[output]
color = false
"#;
        assert!(validator.unknown_fields(content)?.is_empty());
        Ok(())
    }

    #[test]
    fn test_unknown_fields_reported() -> Result<()> {
        let validator = ConfigValidator::new();
        let content = r#"
top_level = 1

[snapshot]
follow_links = true

[core.nested]
x = "y"
"#;
        let mut unknown = validator.unknown_fields(content)?;
        unknown.sort();
        assert_eq!(
            unknown,
            ["core.nested.x", "snapshot.follow_links", "top_level"]
        );
        Ok(())
    }

    #[test]
    fn test_missing_file_is_fine() -> Result<()> {
        let dir = tempfile::tempdir()?;
        ConfigValidator::new().validate_config_file(&dir.path().join("nope.toml"))
    }
}
