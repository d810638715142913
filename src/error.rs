//! Error taxonomy shared by the builder, the store and the diff engine.
//!
//! Only [`Error::Traversal`] is ever recovered from, and only by the builder
//! when carry-on mode is enabled. Everything else is surfaced unmodified.

use std::path::PathBuf;
use thiserror::Error;

/// Errors produced by the snapshot core.
#[derive(Debug, Error)]
pub enum Error {
    /// The snapshot file is missing, locked, corrupt or not a snapshot at all.
    #[error("unable to open snapshot {path}: {reason}")]
    Open {
        /// Path of the snapshot file.
        path: PathBuf,
        /// Human readable cause.
        reason: String,
    },

    /// The snapshot was written with an incompatible on-disk format.
    #[error("unsupported snapshot format version {found} in {path} (expected {expected})")]
    FormatVersion {
        /// Path of the snapshot file.
        path: PathBuf,
        /// Version recorded in the file.
        found: u32,
        /// Version this build reads and writes.
        expected: u32,
    },

    /// A filesystem entry could not be stat'ed, read or resolved.
    #[error("{}: {source}", path.display())]
    Traversal {
        /// Entry that failed.
        path: PathBuf,
        /// Underlying I/O failure.
        #[source]
        source: std::io::Error,
    },

    /// A record could not be encoded or decoded.
    #[error("snapshot data corrupted: {0}")]
    Serialization(String),

    /// An exclusion pattern or pattern file is malformed.
    #[error("invalid exclusion pattern: {0}")]
    ExclusionPattern(String),

    /// The key-value engine failed while reading or committing an open store.
    #[error("snapshot storage error: {0}")]
    Storage(String),

    /// Output file handling failed.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Builds an [`Error::Open`] for `path` from any displayable cause.
    pub fn open(path: impl Into<PathBuf>, reason: impl std::fmt::Display) -> Self {
        Self::Open {
            path: path.into(),
            reason: reason.to_string(),
        }
    }

    /// Builds an [`Error::Traversal`] for `path`.
    pub fn traversal(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Traversal {
            path: path.into(),
            source,
        }
    }

    /// Whether carry-on mode may skip past this error.
    #[must_use]
    pub const fn is_recoverable(&self) -> bool {
        matches!(self, Self::Traversal { .. })
    }
}

impl From<redb::Error> for Error {
    fn from(value: redb::Error) -> Self {
        Self::Storage(value.to_string())
    }
}

impl From<redb::DatabaseError> for Error {
    fn from(value: redb::DatabaseError) -> Self {
        Self::Storage(value.to_string())
    }
}

impl From<redb::TransactionError> for Error {
    fn from(value: redb::TransactionError) -> Self {
        Self::Storage(value.to_string())
    }
}

impl From<redb::TableError> for Error {
    fn from(value: redb::TableError) -> Self {
        Self::Storage(value.to_string())
    }
}

impl From<redb::StorageError> for Error {
    fn from(value: redb::StorageError) -> Self {
        Self::Storage(value.to_string())
    }
}

impl From<redb::CommitError> for Error {
    fn from(value: redb::CommitError) -> Self {
        Self::Storage(value.to_string())
    }
}
