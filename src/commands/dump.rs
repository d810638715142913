use crate::storage::snapshots::SnapshotStore;
use crate::storage::{Checksum, FileRecord, Metadata};
use anyhow::{Context, Result};
use std::io::{self, Write};
use std::path::Path;

/// Everything stored in a snapshot file, in index order.
#[derive(Debug, Clone)]
pub struct Dump {
    /// Content of the path index
    pub records: Vec<FileRecord>,
    /// Content of the checksum index
    pub checksums: Vec<(Checksum, String)>,
    /// Snapshot metadata
    pub metadata: Metadata,
}

impl Dump {
    /// Reads a snapshot. With `metadata_only` both indices are left empty.
    ///
    /// # Errors
    ///
    /// Returns an error if the snapshot cannot be opened or holds corrupt records.
    pub fn load(path: &Path, metadata_only: bool) -> Result<Self> {
        let store = SnapshotStore::open(path)
            .with_context(|| format!("Unable to read {}", path.display()))?;

        let (records, checksums) = if metadata_only {
            (Vec::new(), Vec::new())
        } else {
            (store.records_by_path()?, store.checksum_entries()?)
        };

        Ok(Self {
            records,
            checksums,
            metadata: store.metadata().clone(),
        })
    }

    /// Writes the dump in its text form.
    ///
    /// # Errors
    ///
    /// Returns an error if writing to `out` fails.
    pub fn render<W: Write>(&self, metadata_only: bool, out: &mut W) -> io::Result<()> {
        if !metadata_only {
            writeln!(out, "## by_path ({})", self.records.len())?;
            for record in &self.records {
                writeln!(out, "{} {record}", record.path)?;
            }

            writeln!(out, "## by_cs ({})", self.checksums.len())?;
            for (checksum, path) in &self.checksums {
                writeln!(out, "{checksum} {path}")?;
            }
        }

        let meta = &self.metadata;
        writeln!(out, "## metadata")?;
        writeln!(out, "format version: {}", meta.format_version)?;
        writeln!(out, "fsdiff version: {}", meta.tool_version)?;
        writeln!(out, "date: {}", meta.created_at.to_rfc3339())?;
        writeln!(out, "root: {}", meta.root)?;
        writeln!(out, "shallow: {}", meta.shallow)
    }
}

/// Execute the dump command
///
/// # Errors
///
/// Returns an error if the snapshot cannot be read or stdout cannot be written.
pub fn execute(path: &Path, metadata_only: bool) -> Result<()> {
    let dump = Dump::load(path, metadata_only)?;

    let stdout = io::stdout();
    let mut out = stdout.lock();
    dump.render(metadata_only, &mut out)?;
    out.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::BuildInfo;
    use crate::scanner::{BuildOptions, SnapshotBuilder};
    use crate::utils::hash::hash_bytes;
    use tempfile::TempDir;

    fn snapshot() -> Result<(TempDir, std::path::PathBuf)> {
        let dir = TempDir::new()?;
        let root = dir.path().join("root");
        std::fs::create_dir_all(root.join("d"))?;
        std::fs::write(root.join("d/f"), "abc")?;

        let snap = dir.path().join("dump.snap");
        SnapshotBuilder::new(BuildInfo::new("9.9.9", "cafe"), BuildOptions::default())
            .build(&root, &snap)?;
        Ok((dir, snap))
    }

    #[test]
    fn test_full_dump() -> Result<()> {
        let (_dir, snap) = snapshot()?;
        let dump = Dump::load(&snap, false)?;

        let mut buf = Vec::new();
        dump.render(false, &mut buf)?;
        let text = String::from_utf8(buf)?;
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(lines[0], "## by_path (2)");
        assert!(lines[1].starts_with("d size:0 "));
        assert!(lines[1].ends_with(" DIR"));
        assert!(lines[2].starts_with("d/f size:3 "));
        assert_eq!(lines[3], "## by_cs (1)");
        assert_eq!(lines[4], format!("{} d/f", hash_bytes(b"abc")));
        assert_eq!(lines[5], "## metadata");
        assert_eq!(lines[6], format!("format version: {}", crate::FORMAT_VERSION));
        assert_eq!(lines[7], "fsdiff version: 9.9.9 (cafe)");
        assert!(lines[8].starts_with("date: "));
        assert!(lines[9].starts_with("root: "));
        assert_eq!(lines[10], "shallow: false");

        Ok(())
    }

    #[test]
    fn test_metadata_only() -> Result<()> {
        let (_dir, snap) = snapshot()?;
        let dump = Dump::load(&snap, true)?;
        assert!(dump.records.is_empty());

        let mut buf = Vec::new();
        dump.render(true, &mut buf)?;
        let text = String::from_utf8(buf)?;
        assert!(text.starts_with("## metadata\n"));
        assert!(!text.contains("by_path"));

        Ok(())
    }
}
