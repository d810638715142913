//! Utility functions and helpers.
//!
//! - Path manipulation (tilde expansion, snapshot-relative paths)
//! - Default snapshot file naming
//! - Byte size formatting
//!
//! # Submodules
//!
//! - [`hash`]: Content checksums
//! - [`serialization`]: Binary record encoding
//!
//! # Examples
//!
//! ```
//! use fsdiff::utils::{format_size, relative_path_string};
//! use std::path::Path;
//!
//! assert_eq!(format_size(1024 * 1024), "1.00 MB");
//! assert_eq!(
//!     relative_path_string(Path::new("/srv"), Path::new("/srv/a/b")).as_deref(),
//!     Some("a/b")
//! );
//! ```

/// Content checksum computation
pub mod hash;
/// Binary serialization utilities
pub mod serialization;

use anyhow::Result;
use chrono::{DateTime, TimeZone};
use std::path::{Component, Path, PathBuf};

/// Expands a path starting with `~` to the user's home directory.
///
/// # Errors
///
/// Returns an error if the path is empty.
pub fn expand_tilde(path: &str) -> Result<PathBuf> {
    if path.is_empty() {
        anyhow::bail!("Path cannot be empty");
    }
    if path.starts_with("~/")
        && let Some(home) = dirs::home_dir()
    {
        return Ok(home.join(&path[2..]));
    }
    Ok(PathBuf::from(path))
}

/// Path of `path` relative to `base`, joined with `/` whatever the platform.
///
/// Returns `None` when `path` is not below `base`, is `base` itself, or has a
/// component that is not valid UTF-8 (a lossy conversion could map two names
/// onto one key).
#[must_use]
pub fn relative_path_string(base: &Path, path: &Path) -> Option<String> {
    let relative = path.strip_prefix(base).ok()?;

    let mut segments = Vec::new();
    for component in relative.components() {
        if let Component::Normal(s) = component {
            segments.push(s.to_str()?);
        }
    }

    if segments.is_empty() {
        None
    } else {
        Some(segments.join("/"))
    }
}

/// Timestamp-based snapshot file name, `YYYYMMDDhhmmss.snap`.
#[must_use]
pub fn default_snapshot_name<Tz: TimeZone>(now: &DateTime<Tz>) -> String
where
    Tz::Offset: std::fmt::Display,
{
    format!("{}.snap", now.format("%Y%m%d%H%M%S"))
}

/// Formats a file size in bytes into a human-readable string with appropriate units.
#[must_use]
#[allow(
    clippy::cast_precision_loss,
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss
)]
pub fn format_size(size: u64) -> String {
    const UNITS: &[&str] = &["B", "KB", "MB", "GB", "TB"];
    let mut size = size as f64;
    let mut unit_index = 0;

    while size >= 1024.0 && unit_index < UNITS.len() - 1 {
        size /= 1024.0;
        unit_index += 1;
    }

    if unit_index == 0 {
        format!("{} {}", size.round() as u64, UNITS[unit_index])
    } else {
        format!("{:.2} {}", size, UNITS[unit_index])
    }
}
