#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]
// Allow pedantic strict lints that create false positives in this codebase
#![allow(clippy::arithmetic_side_effects)] // Simple counters cannot overflow
#![allow(clippy::float_arithmetic)] // Required for file size formatting
#![allow(clippy::indexing_slicing)] // Bounds checked by logic

//! # fsdiff - Filesystem Snapshot Diff
//!
//! fsdiff records the state of a directory tree at a point in time and
//! compares two such snapshots to report what changed: entries created,
//! removed, modified or moved.
//!
//! ## Features
//!
//! - **Two-index snapshots**: records are stored by path and indexed by SHA-1
//!   content checksum in a single embedded database file
//! - **Rename detection**: a file that only changed path is reported as a move
//! - **Property diff**: size, mtime, owner, mode, link target, kind and checksum
//! - **Exclusions**: gitignore-style patterns, pruned during traversal
//! - **Shallow mode**: skip content hashing for fast metadata-only snapshots
//!
//! ## Architecture
//!
//! - [`storage`]: file record model and the snapshot store
//! - [`scanner`]: snapshot builder and exclusion matching
//! - [`diff`]: diff engine and report rendering
//! - [`commands`]: command implementations (snapshot, diff, dump)
//! - [`config`]: configuration parsing and validation
//! - [`output`]: status messages
//! - [`utils`]: hashing, serialization and path helpers
//!
//! ## Example Usage
//!
//! ```no_run
//! use fsdiff::BuildInfo;
//! use fsdiff::diff::{DiffOptions, diff_stores};
//! use fsdiff::scanner::{BuildOptions, SnapshotBuilder};
//! use fsdiff::storage::snapshots::SnapshotStore;
//! use std::path::Path;
//!
//! # fn main() -> fsdiff::Result<()> {
//! let builder = SnapshotBuilder::new(BuildInfo::current(), BuildOptions::default());
//! builder.build(Path::new("/srv/www"), Path::new("before.snap"))?;
//! // ... time passes ...
//! builder.build(Path::new("/srv/www"), Path::new("after.snap"))?;
//!
//! let before = SnapshotStore::open(Path::new("before.snap"))?;
//! let after = SnapshotStore::open(Path::new("after.snap"))?;
//! let changes = diff_stores(&before, &after, &DiffOptions::default())?;
//! println!("{}", changes.summary);
//! # Ok(())
//! # }
//! ```

/// Command-line interface definitions (argument parsing structures).
pub mod cli;

/// Commands module containing all CLI command implementations.
pub mod commands;

/// Configuration parsing and validation.
pub mod config;

/// Snapshot comparison and report rendering.
pub mod diff;

/// Error types shared by the library.
pub mod error;

/// Status messages on stderr.
pub mod output;

/// Snapshot builder and exclusion matching.
pub mod scanner;

/// File record model and snapshot persistence.
pub mod storage;

/// Utility functions and helpers.
pub mod utils;

pub use error::{Error, Result};

use anyhow::Context;
use std::fmt;
use std::path::PathBuf;

/// Current version of the fsdiff binary.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// On-disk snapshot format version, checked when a snapshot is opened.
pub const FORMAT_VERSION: u32 = 1;

/// Default configuration file path relative to home directory.
pub const DEFAULT_CONFIG_PATH: &str = ".config/fsdiff/config.toml";

/// Version information stamped into every snapshot.
///
/// Passed explicitly to the builder; `commit` comes from the `FSDIFF_COMMIT`
/// environment variable at compile time when set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildInfo {
    /// Crate version
    pub version: String,
    /// Source revision, `dev` for local builds
    pub commit: String,
}

impl BuildInfo {
    /// Creates build information from explicit values.
    pub fn new(version: impl Into<String>, commit: impl Into<String>) -> Self {
        Self {
            version: version.into(),
            commit: commit.into(),
        }
    }

    /// Build information of the running binary.
    #[must_use]
    pub fn current() -> Self {
        Self::new(VERSION, option_env!("FSDIFF_COMMIT").unwrap_or("dev"))
    }
}

impl fmt::Display for BuildInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.version, self.commit)
    }
}

/// Central context for all fsdiff commands: the loaded configuration and
/// where it came from.
///
/// # Examples
///
/// ```no_run
/// use fsdiff::FsdiffContext;
///
/// # fn main() -> anyhow::Result<()> {
/// // Configuration from FSDIFF_CONFIG_PATH or ~/.config/fsdiff/config.toml
/// let ctx = FsdiffContext::new()?;
///
/// // Configuration from an explicit file (for testing)
/// let ctx = FsdiffContext::new_explicit("/tmp/fsdiff.toml".into())?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct FsdiffContext {
    /// Path to the configuration file (which may not exist).
    pub config_path: PathBuf,

    /// Loaded configuration settings.
    pub config: config::Config,

    /// Version information stamped into new snapshots.
    pub build_info: BuildInfo,
}

impl FsdiffContext {
    /// Creates a context by loading the configuration from the default path,
    /// or from `FSDIFF_CONFIG_PATH` when set.
    ///
    /// # Errors
    ///
    /// Returns an error if the home directory cannot be determined or if the
    /// configuration file exists but is invalid.
    pub fn new() -> anyhow::Result<Self> {
        let config_path = if let Ok(path) = std::env::var("FSDIFF_CONFIG_PATH") {
            PathBuf::from(path)
        } else {
            let home = dirs::home_dir().context("Could not find home directory")?;
            home.join(DEFAULT_CONFIG_PATH)
        };

        // Unknown keys are only warned about
        let validator = config::validator::ConfigValidator::new();
        if let Err(e) = validator.validate_config_file(&config_path) {
            output::warning(&format!("Configuration validation failed: {e}"));
        }

        Self::new_explicit(config_path)
    }

    /// Creates a context from an explicit configuration file path.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration file exists but is invalid.
    pub fn new_explicit(config_path: PathBuf) -> anyhow::Result<Self> {
        let config = config::Config::load(&config_path)?;
        tracing::debug!(path = %config_path.display(), "configuration loaded");

        Ok(Self {
            config_path,
            config,
            build_info: BuildInfo::current(),
        })
    }
}
