//! Snapshot builder: walks a directory tree and fills a fresh snapshot store.
//!
//! The whole traversal runs inside one write transaction on a temporary file
//! next to the output. The temporary file is renamed over the output only
//! once the transaction committed, so a failed or interrupted build never
//! leaves a file that looks like a complete snapshot.

/// Gitignore-style exclusion matching.
pub mod exclude;

pub use exclude::ExclusionMatcher;

use crate::BuildInfo;
use crate::error::{Error, Result};
use crate::storage::snapshots::{SnapshotStore, SnapshotWriter};
use crate::storage::{FileKind, FileRecord, Metadata};
use crate::utils::{self, hash};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use walkdir::WalkDir;

/// Options controlling a single build.
#[derive(Debug, Clone)]
pub struct BuildOptions {
    /// Skip unreadable entries instead of aborting
    pub carry_on: bool,
    /// Do not compute content checksums
    pub shallow: bool,
    /// Entries (and whole subtrees) left out of the snapshot
    pub excluded: ExclusionMatcher,
    /// Files at least this large are hashed through a memory map
    pub mmap_threshold: u64,
}

impl Default for BuildOptions {
    fn default() -> Self {
        Self {
            carry_on: false,
            shallow: false,
            excluded: ExclusionMatcher::empty(),
            mmap_threshold: hash::DEFAULT_MMAP_THRESHOLD,
        }
    }
}

/// Counters reported once a build committed.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct BuildStats {
    /// Records written to the path index
    pub entries: u64,
    /// Entries skipped because they could not be read (carry-on mode)
    pub skipped: u64,
    /// Regular files whose content was hashed
    pub checksummed: u64,
    /// Total bytes fed to the hasher
    pub bytes_hashed: u64,
}

impl BuildStats {
    fn record(&mut self, record: &FileRecord) {
        self.entries += 1;
        if record.checksum.is_some() {
            self.checksummed += 1;
            self.bytes_hashed += record.size;
        }
    }
}

/// Builds snapshots of directory trees.
#[derive(Debug, Clone)]
pub struct SnapshotBuilder {
    build_info: BuildInfo,
    options: BuildOptions,
}

impl SnapshotBuilder {
    /// Creates a builder stamping snapshots with `build_info`.
    #[must_use]
    pub const fn new(build_info: BuildInfo, options: BuildOptions) -> Self {
        Self {
            build_info,
            options,
        }
    }

    /// Options in effect.
    #[must_use]
    pub const fn options(&self) -> &BuildOptions {
        &self.options
    }

    /// Snapshots `root` into a new snapshot file at `output`.
    ///
    /// `output` is replaced only when the build succeeds. On failure any file
    /// already at `output` is removed as well.
    ///
    /// # Errors
    ///
    /// - [`Error::Traversal`] if `root` is not a readable directory, or if an
    ///   entry cannot be read or has a name or link target that is not UTF-8,
    ///   and carry-on mode is off
    /// - [`Error::Open`] / [`Error::Storage`] if the snapshot file cannot be written
    /// - [`Error::Io`] if the output directory does not exist, or the temporary
    ///   file cannot be created or renamed
    pub fn build(&self, root: &Path, output: &Path) -> Result<BuildStats> {
        let root = canonical_dir(root)?;
        let output = canonical_output(output)?;

        let output_dir = output.parent().unwrap_or(&root);
        let temp = tempfile::Builder::new()
            .prefix(".fsdiff-")
            .suffix(".tmp")
            .tempfile_in(output_dir)?
            .into_temp_path();

        info!(
            root = %root.display(),
            output = %output.display(),
            shallow = self.options.shallow,
            carry_on = self.options.carry_on,
            "building snapshot"
        );

        match self.build_into(&root, &temp, &output) {
            Ok(stats) => {
                temp.persist(&output).map_err(|e| Error::Io(e.error))?;
                info!(
                    entries = stats.entries,
                    skipped = stats.skipped,
                    checksummed = stats.checksummed,
                    bytes_hashed = stats.bytes_hashed,
                    "snapshot complete"
                );
                Ok(stats)
            }
            Err(err) => {
                drop(temp);
                discard_output(&output);
                Err(err)
            }
        }
    }

    fn build_into(&self, root: &Path, temp: &Path, output: &Path) -> Result<BuildStats> {
        let meta = Metadata::new(self.build_info.to_string(), root, self.options.shallow);
        let store = SnapshotStore::create(temp, meta)?;

        // The store is dropped before the caller renames or deletes the file.
        store.write(|writer| self.walk(root, &[temp, output], writer))
    }

    fn walk(
        &self,
        root: &Path,
        skip: &[&Path],
        writer: &mut SnapshotWriter<'_>,
    ) -> Result<BuildStats> {
        let mut stats = BuildStats::default();
        let excluded = &self.options.excluded;

        let mut walker = WalkDir::new(root)
            .follow_links(false)
            .min_depth(1)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|entry| {
                if skip.contains(&entry.path()) {
                    return false;
                }
                // Pruning here keeps excluded directories from being read at all.
                utils::relative_path_string(root, entry.path())
                    .is_none_or(|rel| !excluded.matches_path(&rel, entry.file_type().is_dir()))
            });

        // `while let` so that a skipped directory can be pruned.
        while let Some(entry) = walker.next() {
            let entry = match entry {
                Ok(entry) => entry,
                Err(err) => {
                    let path = err.path().map_or_else(|| root.to_path_buf(), Path::to_path_buf);
                    self.recover(Error::traversal(path, io::Error::from(err)), &mut stats)?;
                    continue;
                }
            };

            let record = utils::relative_path_string(root, entry.path())
                .ok_or_else(|| Error::traversal(entry.path(), non_utf8("file name")))
                .and_then(|relative| self.read_entry(entry.path(), relative));

            match record {
                Ok(record) => {
                    writer.insert(&record)?;
                    stats.record(&record);
                }
                Err(err) => {
                    self.recover(err, &mut stats)?;
                    if entry.file_type().is_dir() {
                        walker.skip_current_dir();
                    }
                }
            }
        }

        Ok(stats)
    }

    fn read_entry(&self, path: &Path, relative: String) -> Result<FileRecord> {
        let metadata = fs::symlink_metadata(path).map_err(|e| Error::traversal(path, e))?;
        let mut record =
            FileRecord::from_metadata(relative, &metadata).map_err(|e| Error::traversal(path, e))?;

        match record.kind {
            FileKind::Symlink => {
                let target = fs::read_link(path).map_err(|e| Error::traversal(path, e))?;
                record.link_target = target
                    .into_os_string()
                    .into_string()
                    .map_err(|_| Error::traversal(path, non_utf8("link target")))?;
            }
            FileKind::Regular if !self.options.shallow => {
                let checksum = hash::hash_file(path, self.options.mmap_threshold)
                    .map_err(|e| Error::traversal(path, e))?;
                record.checksum = Some(checksum);
            }
            _ => {}
        }

        Ok(record)
    }

    fn recover(&self, err: Error, stats: &mut BuildStats) -> Result<()> {
        if self.options.carry_on && err.is_recoverable() {
            warn!(error = %err, "skipping unreadable entry");
            stats.skipped += 1;
            Ok(())
        } else {
            Err(err)
        }
    }
}

/// Walked paths are built from the canonical root, so the output and temporary
/// file paths must be canonical as well to be recognized during the walk.
fn canonical_dir(root: &Path) -> Result<PathBuf> {
    let root = fs::canonicalize(root).map_err(|e| Error::traversal(root, e))?;
    let metadata = fs::metadata(&root).map_err(|e| Error::traversal(&root, e))?;
    if !metadata.is_dir() {
        return Err(Error::traversal(
            &root,
            io::Error::new(io::ErrorKind::NotADirectory, "not a directory"),
        ));
    }
    Ok(root)
}

fn canonical_output(output: &Path) -> Result<PathBuf> {
    let output = std::path::absolute(output)?;
    let (Some(dir), Some(name)) = (output.parent(), output.file_name()) else {
        return Err(Error::Io(io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("{} is not a file path", output.display()),
        )));
    };
    Ok(fs::canonicalize(dir)?.join(name))
}

fn non_utf8(what: &str) -> io::Error {
    io::Error::new(io::ErrorKind::InvalidData, format!("{what} is not valid UTF-8"))
}

fn discard_output(output: &Path) {
    match fs::remove_file(output) {
        Ok(()) => debug!(path = %output.display(), "removed stale snapshot after failed build"),
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(e) => warn!(path = %output.display(), error = %e, "could not remove snapshot after failed build"),
    }
}
