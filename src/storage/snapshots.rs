//! Persisted snapshot: one redb file with three tables.
//!
//! - `metadata`: a single `info` key holding the encoded [`Metadata`]
//! - `by_path`: relative path -> encoded [`FileRecord`] (owns every record)
//! - `by_cs`: checksum -> relative path (lookup only, resolved through `by_path`)
//!
//! A store is created once, filled inside a single write transaction and is
//! read-only afterwards.

use super::{Checksum, FileRecord, Metadata};
use crate::error::{Error, Result};
use crate::utils::serialization;
use redb::{
    Database, ReadOnlyTable, ReadableTable, ReadableTableMetadata, Table, TableDefinition,
    WriteTransaction,
};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

const METADATA_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("metadata");
const BY_PATH_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("by_path");
const BY_CHECKSUM_TABLE: TableDefinition<&[u8], &str> = TableDefinition::new("by_cs");

const METADATA_KEY: &str = "info";

/// An open snapshot file.
pub struct SnapshotStore {
    db: Database,
    path: PathBuf,
    meta: Metadata,
}

impl std::fmt::Debug for SnapshotStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SnapshotStore")
            .field("path", &self.path)
            .field("meta", &self.meta)
            .finish_non_exhaustive()
    }
}

impl SnapshotStore {
    /// Creates a new snapshot file at `path` (which must be absent or empty)
    /// and commits the metadata together with both empty indices.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Open`] if the file cannot be initialized and
    /// [`Error::Storage`] if the initial transaction fails.
    pub fn create(path: &Path, meta: Metadata) -> Result<Self> {
        let db = Database::create(path).map_err(|e| Error::open(path, e))?;

        let txn = db.begin_write()?;
        {
            let mut metadata = txn.open_table(METADATA_TABLE)?;
            txn.open_table(BY_PATH_TABLE)?;
            txn.open_table(BY_CHECKSUM_TABLE)?;
            metadata.insert(METADATA_KEY, serialization::serialize(&meta)?.as_slice())?;
        }
        txn.commit()?;

        debug!(path = %path.display(), shallow = meta.shallow, "created snapshot store");

        Ok(Self {
            db,
            path: path.to_path_buf(),
            meta,
        })
    }

    /// Opens an existing snapshot file for reading.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Open`] if the file is missing, locked, not a redb
    /// database or lacks one of the tables, [`Error::FormatVersion`] on a
    /// format mismatch and [`Error::Serialization`] if the metadata is corrupt.
    pub fn open(path: &Path) -> Result<Self> {
        if !path.is_file() {
            return Err(Error::open(path, "no such snapshot file"));
        }

        let db = Database::open(path).map_err(|e| Error::open(path, e))?;
        let meta = read_metadata(&db, path)?;

        debug!(
            path = %path.display(),
            tool_version = %meta.tool_version,
            shallow = meta.shallow,
            "opened snapshot store"
        );

        Ok(Self {
            db,
            path: path.to_path_buf(),
            meta,
        })
    }

    /// Snapshot metadata.
    #[must_use]
    pub const fn metadata(&self) -> &Metadata {
        &self.meta
    }

    /// Location of the snapshot file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Runs `f` inside one write transaction covering both indices.
    ///
    /// Nothing written by `f` becomes visible unless `f` succeeds and the
    /// transaction commits; on error the transaction is aborted.
    ///
    /// # Errors
    ///
    /// Returns the error of `f`, or [`Error::Storage`] if the engine fails.
    pub fn write<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut SnapshotWriter<'_>) -> Result<T>,
    {
        let txn = self.db.begin_write()?;
        let outcome = {
            let mut writer = SnapshotWriter::new(&txn)?;
            f(&mut writer)
        };

        match outcome {
            Ok(value) => {
                txn.commit()?;
                Ok(value)
            }
            Err(err) => {
                if let Err(abort_err) = txn.abort() {
                    warn!(error = %abort_err, "failed to abort snapshot transaction");
                }
                Err(err)
            }
        }
    }

    /// Runs `f` with a read-only view over both indices, all taken from the
    /// same read transaction.
    ///
    /// # Errors
    ///
    /// Returns the error of `f`, or [`Error::Storage`] if the engine fails.
    pub fn read<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&SnapshotView<'_>) -> Result<T>,
    {
        let txn = self.db.begin_read()?;
        let view = SnapshotView {
            meta: &self.meta,
            by_path: txn.open_table(BY_PATH_TABLE)?,
            by_checksum: txn.open_table(BY_CHECKSUM_TABLE)?,
        };
        f(&view)
    }

    /// All records, in path order.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read or a record is corrupt.
    pub fn records_by_path(&self) -> Result<Vec<FileRecord>> {
        self.read(|view| view.records()?.collect())
    }

    /// All checksum index entries, in checksum order.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read or an entry is corrupt.
    pub fn checksum_entries(&self) -> Result<Vec<(Checksum, String)>> {
        self.read(|view| view.checksum_entries()?.collect())
    }
}

fn read_metadata(db: &Database, path: &Path) -> Result<Metadata> {
    let txn = db.begin_read().map_err(|e| Error::open(path, e))?;

    txn.open_table(BY_PATH_TABLE)
        .map_err(|e| Error::open(path, format!("by_path table: {e}")))?;
    txn.open_table(BY_CHECKSUM_TABLE)
        .map_err(|e| Error::open(path, format!("by_cs table: {e}")))?;

    let table = txn
        .open_table(METADATA_TABLE)
        .map_err(|e| Error::open(path, format!("metadata table: {e}")))?;
    let data = table
        .get(METADATA_KEY)
        .map_err(|e| Error::open(path, e))?
        .ok_or_else(|| Error::open(path, "invalid snapshot metadata"))?;

    // The version leads the encoded metadata, check it before decoding the rest.
    let found: u32 = serialization::deserialize_prefix(data.value())?;
    if found != crate::FORMAT_VERSION {
        return Err(Error::FormatVersion {
            path: path.to_path_buf(),
            found,
            expected: crate::FORMAT_VERSION,
        });
    }

    serialization::deserialize(data.value())
}

/// Write access to both indices during the build transaction.
pub struct SnapshotWriter<'txn> {
    by_path: Table<'txn, &'static str, &'static [u8]>,
    by_checksum: Table<'txn, &'static [u8], &'static str>,
}

impl<'txn> SnapshotWriter<'txn> {
    fn new(txn: &'txn WriteTransaction) -> Result<Self> {
        Ok(Self {
            by_path: txn.open_table(BY_PATH_TABLE)?,
            by_checksum: txn.open_table(BY_CHECKSUM_TABLE)?,
        })
    }

    /// Stores `record` under its path and, when it has one, indexes its
    /// checksum. Identical contents collapse onto the last inserted path.
    ///
    /// # Errors
    ///
    /// Returns an error if encoding or the engine fails.
    pub fn insert(&mut self, record: &FileRecord) -> Result<()> {
        let data = serialization::serialize(record)?;
        self.by_path.insert(record.path.as_str(), data.as_slice())?;

        if let Some(checksum) = &record.checksum {
            self.by_checksum
                .insert(checksum.as_bytes().as_slice(), record.path.as_str())?;
        }

        Ok(())
    }
}

/// Read-only view over one snapshot, valid for the duration of a read transaction.
pub struct SnapshotView<'a> {
    meta: &'a Metadata,
    by_path: ReadOnlyTable<&'static str, &'static [u8]>,
    by_checksum: ReadOnlyTable<&'static [u8], &'static str>,
}

impl SnapshotView<'_> {
    /// Snapshot metadata.
    #[must_use]
    pub const fn metadata(&self) -> &Metadata {
        self.meta
    }

    /// Record stored at `path`, if any.
    ///
    /// # Errors
    ///
    /// Returns an error if the engine fails or the record is corrupt.
    pub fn get(&self, path: &str) -> Result<Option<FileRecord>> {
        self.by_path
            .get(path)?
            .map(|data| serialization::deserialize(data.value()))
            .transpose()
    }

    /// Whether a record exists at `path`.
    ///
    /// # Errors
    ///
    /// Returns an error if the engine fails.
    pub fn contains(&self, path: &str) -> Result<bool> {
        Ok(self.by_path.get(path)?.is_some())
    }

    /// Record whose content hashes to `checksum`, resolved through the path index.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Serialization`] if the checksum entry points at a path
    /// that has no record.
    pub fn get_by_checksum(&self, checksum: &Checksum) -> Result<Option<FileRecord>> {
        let Some(path) = self.by_checksum.get(checksum.as_bytes().as_slice())? else {
            return Ok(None);
        };
        let path = path.value();

        match self.get(path)? {
            Some(record) => Ok(Some(record)),
            None => Err(Error::Serialization(format!(
                "checksum {checksum} references missing path {path:?}"
            ))),
        }
    }

    /// Iterates every record in path order.
    ///
    /// # Errors
    ///
    /// Returns an error if the iteration cannot start; per-record failures are
    /// yielded by the iterator.
    pub fn records(&self) -> Result<impl Iterator<Item = Result<FileRecord>> + '_> {
        Ok(self.by_path.iter()?.map(|entry| {
            let (key, value) = entry?;
            let record: FileRecord = serialization::deserialize(value.value())?;
            if record.path != key.value() {
                return Err(Error::Serialization(format!(
                    "record for {:?} stored under {:?}",
                    record.path,
                    key.value()
                )));
            }
            Ok(record)
        }))
    }

    /// Iterates the checksum index in checksum order.
    ///
    /// # Errors
    ///
    /// Returns an error if the iteration cannot start; per-entry failures are
    /// yielded by the iterator.
    pub fn checksum_entries(
        &self,
    ) -> Result<impl Iterator<Item = Result<(Checksum, String)>> + '_> {
        Ok(self.by_checksum.iter()?.map(|entry| {
            let (key, value) = entry?;
            let checksum = Checksum::from_slice(key.value()).ok_or_else(|| {
                Error::Serialization(format!("checksum key of {} bytes", key.value().len()))
            })?;
            Ok((checksum, value.value().to_string()))
        }))
    }

    /// Number of records in the path index.
    ///
    /// # Errors
    ///
    /// Returns an error if the engine fails.
    pub fn len(&self) -> Result<u64> {
        Ok(self.by_path.len()?)
    }

    /// Whether the snapshot holds no record at all.
    ///
    /// # Errors
    ///
    /// Returns an error if the engine fails.
    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.by_path.is_empty()?)
    }

    /// Number of entries in the checksum index.
    ///
    /// # Errors
    ///
    /// Returns an error if the engine fails.
    pub fn checksum_len(&self) -> Result<u64> {
        Ok(self.by_checksum.len()?)
    }
}
