/// TOML parsing and semantic checks.
pub mod parser;
/// Unknown-key warnings.
pub mod validator;

use crate::diff::Property;
use crate::utils::hash::DEFAULT_MMAP_THRESHOLD;
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Contents of `config.toml`. Every section and field is optional.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct Config {
    /// `[snapshot]` section
    #[serde(default)]
    pub snapshot: SnapshotConfig,

    /// `[diff]` section
    #[serde(default)]
    pub diff: DiffConfig,

    /// `[output]` section
    #[serde(default)]
    pub output: OutputConfig,

    /// `[performance]` section
    #[serde(default)]
    pub performance: PerformanceConfig,
}

/// Defaults for `fsdiff snapshot`.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct SnapshotConfig {
    /// Skip unreadable entries instead of aborting
    #[serde(default)]
    pub carry_on: bool,
    /// Do not compute content checksums
    #[serde(default)]
    pub shallow: bool,
    /// Exclusion patterns applied before the command-line ones
    #[serde(default)]
    pub exclude: Vec<String>,
    /// File of exclusion patterns (`~/` is expanded)
    #[serde(default)]
    pub exclude_from: Option<String>,
}

/// Defaults for `fsdiff diff`.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct DiffConfig {
    /// Properties never compared
    #[serde(default)]
    pub ignore: Vec<Property>,
    /// Exclusion patterns applied before the command-line ones
    #[serde(default)]
    pub exclude: Vec<String>,
}

/// Report rendering.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct OutputConfig {
    /// Color the report markers
    #[serde(default = "default_color")]
    pub color: bool,
}

/// Tuning knobs.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PerformanceConfig {
    /// Files at least this many bytes are hashed through a memory map
    #[serde(default = "default_mmap_threshold")]
    pub mmap_threshold: u64,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            color: default_color(),
        }
    }
}

impl Default for PerformanceConfig {
    fn default() -> Self {
        Self {
            mmap_threshold: default_mmap_threshold(),
        }
    }
}

impl Config {
    /// Load configuration from a file
    ///
    /// A missing file yields the defaults; nothing is written.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The file exists but cannot be read
    /// - The file contains invalid TOML or unknown property names
    /// - A value is out of range
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        parser::parse_config_file(path)
    }

    /// Pattern file configured for snapshots, with `~/` expanded.
    ///
    /// # Errors
    ///
    /// Returns an error if the configured path is empty.
    pub fn snapshot_exclude_file(&self) -> Result<Option<PathBuf>> {
        self.snapshot
            .exclude_from
            .as_deref()
            .map(crate::utils::expand_tilde)
            .transpose()
    }
}

// Default functions for serde
const fn default_color() -> bool {
    true
}

const fn default_mmap_threshold() -> u64 {
    DEFAULT_MMAP_THRESHOLD
}
