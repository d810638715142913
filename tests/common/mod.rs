#![allow(dead_code)]

use anyhow::Result;
use fsdiff::BuildInfo;
use fsdiff::diff::{ChangeKind, ChangeSet, DiffOptions, diff_stores};
use fsdiff::scanner::{BuildOptions, SnapshotBuilder};
use fsdiff::storage::snapshots::SnapshotStore;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// A scratch directory tree plus a place to keep snapshots of it
pub struct TestTree {
    pub temp_dir: TempDir,
}

impl TestTree {
    /// Create an empty tree
    pub fn new() -> Result<Self> {
        let temp_dir = TempDir::new()?;
        fs::create_dir(temp_dir.path().join("root"))?;
        fs::create_dir(temp_dir.path().join("snaps"))?;
        Ok(Self { temp_dir })
    }

    /// Create a tree holding `files` (relative path, content)
    pub fn with_files(files: &[(&str, &str)]) -> Result<Self> {
        let tree = Self::new()?;
        for (path, content) in files {
            tree.write(path, content)?;
        }
        Ok(tree)
    }

    /// Directory being snapshotted
    pub fn root(&self) -> PathBuf {
        self.temp_dir.path().join("root")
    }

    /// Absolute path of an entry of the tree
    pub fn path(&self, relative: &str) -> PathBuf {
        self.root().join(relative)
    }

    /// Write a file, creating parent directories
    pub fn write(&self, relative: &str, content: &str) -> Result<()> {
        let path = self.path(relative);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, content)?;
        Ok(())
    }

    /// Remove a file or a whole directory
    pub fn remove(&self, relative: &str) -> Result<()> {
        let path = self.path(relative);
        if path.is_dir() {
            fs::remove_dir_all(path)?;
        } else {
            fs::remove_file(path)?;
        }
        Ok(())
    }

    /// Rename an entry, keeping its metadata
    pub fn rename(&self, from: &str, to: &str) -> Result<()> {
        fs::rename(self.path(from), self.path(to))?;
        Ok(())
    }

    /// Location for a snapshot file named `name`
    pub fn snap_path(&self, name: &str) -> PathBuf {
        self.temp_dir.path().join("snaps").join(name)
    }

    /// Snapshot the tree with default options
    pub fn snapshot(&self, name: &str) -> Result<PathBuf> {
        self.snapshot_with(name, BuildOptions::default())
    }

    /// Snapshot the tree with explicit options
    pub fn snapshot_with(&self, name: &str, options: BuildOptions) -> Result<PathBuf> {
        let out = self.snap_path(name);
        SnapshotBuilder::new(BuildInfo::new("test", "fixture"), options).build(&self.root(), &out)?;
        Ok(out)
    }

    /// Run `f` on the tree while keeping the mtime of `dirs`, so that only
    /// the entries touched by `f` show up as changed
    pub fn preserving_mtime<F>(&self, dirs: &[&str], f: F) -> Result<()>
    where
        F: FnOnce(&Self) -> Result<()>,
    {
        let saved: Vec<(PathBuf, filetime::FileTime)> = dirs
            .iter()
            .map(|d| {
                let path = self.path(d);
                let meta = fs::metadata(&path)?;
                Ok((path, filetime::FileTime::from_last_modification_time(&meta)))
            })
            .collect::<Result<_>>()?;

        f(self)?;

        for (path, mtime) in saved {
            filetime::set_file_mtime(path, mtime)?;
        }
        Ok(())
    }
}

/// Diff two snapshot files. A file compared with itself is opened once, the
/// store holds an exclusive lock.
pub fn diff(before: &Path, after: &Path, options: &DiffOptions) -> Result<ChangeSet> {
    let before_store = SnapshotStore::open(before)?;
    if before == after {
        return Ok(diff_stores(&before_store, &before_store, options)?);
    }
    let after_store = SnapshotStore::open(after)?;
    Ok(diff_stores(&before_store, &after_store, options)?)
}

/// Paths of the changes of one kind, in report order
pub fn paths(changes: &ChangeSet, kind: ChangeKind) -> Vec<String> {
    changes
        .of_kind(kind)
        .map(|c| c.path().to_string())
        .collect()
}
