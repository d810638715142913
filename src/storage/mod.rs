/// Snapshot persistence over the embedded key-value engine
pub mod snapshots;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::io;

/// 160-bit content digest of a regular file.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Checksum([u8; Checksum::LEN]);

impl Checksum {
    /// Digest length in bytes.
    pub const LEN: usize = 20;

    /// Wraps raw digest bytes.
    #[must_use]
    pub const fn from_bytes(bytes: [u8; Self::LEN]) -> Self {
        Self(bytes)
    }

    /// Parses a digest stored as an index key. Returns `None` on a length mismatch.
    #[must_use]
    pub fn from_slice(bytes: &[u8]) -> Option<Self> {
        <[u8; Self::LEN]>::try_from(bytes).ok().map(Self)
    }

    /// Raw digest bytes, used as the checksum index key.
    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; Self::LEN] {
        &self.0
    }
}

impl fmt::Display for Checksum {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for byte in &self.0 {
            write!(f, "{byte:02x}")?;
        }
        Ok(())
    }
}

impl fmt::Debug for Checksum {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Checksum({self})")
    }
}

/// Mutually exclusive classification of a filesystem entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FileKind {
    /// Regular file.
    Regular,
    /// Directory.
    Directory,
    /// Symbolic link (never followed).
    Symlink,
    /// Unix domain socket.
    Socket,
    /// Named pipe.
    Pipe,
    /// Block or character device.
    Device,
}

impl FileKind {
    /// Classifies an entry from its (non-followed) file type.
    #[must_use]
    pub fn from_file_type(file_type: &fs::FileType) -> Self {
        if file_type.is_dir() {
            return Self::Directory;
        }
        if file_type.is_symlink() {
            return Self::Symlink;
        }

        #[cfg(unix)]
        {
            use std::os::unix::fs::FileTypeExt;
            if file_type.is_socket() {
                return Self::Socket;
            }
            if file_type.is_fifo() {
                return Self::Pipe;
            }
            if file_type.is_block_device() || file_type.is_char_device() {
                return Self::Device;
            }
        }

        Self::Regular
    }

    /// Whether the entry carries no meaningful byte length.
    #[must_use]
    pub const fn is_special(self) -> bool {
        matches!(self, Self::Socket | Self::Pipe | Self::Device)
    }
}

/// One filesystem entry as recorded in a snapshot.
///
/// `path` is relative to the snapshotted root and uses `/` separators.
/// `checksum` is only ever set for regular files of a non-shallow snapshot;
/// `None` means "not computed", which is different from the digest of an
/// empty file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileRecord {
    /// Path relative to the snapshot root
    pub path: String,
    /// Byte length (0 for directories and special files)
    pub size: u64,
    /// Last modification time, full filesystem precision
    pub mtime: DateTime<Utc>,
    /// Owner user id
    pub uid: u32,
    /// Owner group id
    pub gid: u32,
    /// Raw mode: permission and file type bits
    pub mode: u32,
    /// Symlink target, empty for anything but symlinks
    pub link_target: String,
    /// Entry classification
    pub kind: FileKind,
    /// Content digest (regular files, non-shallow snapshots only)
    pub checksum: Option<Checksum>,
}

impl FileRecord {
    /// Builds a record from `lstat`-style metadata. The link target and the
    /// checksum are filled in later by the builder.
    ///
    /// # Errors
    ///
    /// Returns an error if the platform cannot report a modification time.
    pub fn from_metadata(path: String, metadata: &fs::Metadata) -> io::Result<Self> {
        let kind = FileKind::from_file_type(&metadata.file_type());
        let size = if kind == FileKind::Directory || kind.is_special() {
            0
        } else {
            metadata.len()
        };
        let (uid, gid, mode) = owner_and_mode(metadata);

        Ok(Self {
            path,
            size,
            mtime: DateTime::<Utc>::from(metadata.modified()?),
            uid,
            gid,
            mode,
            link_target: String::new(),
            kind,
            checksum: None,
        })
    }

    /// Whether this record is a directory.
    #[must_use]
    pub fn is_dir(&self) -> bool {
        self.kind == FileKind::Directory
    }

    /// Whether this record can be looked up in the checksum index to detect a
    /// rename. Empty files are excluded: they all share the same digest.
    #[must_use]
    pub fn is_rename_candidate(&self) -> bool {
        self.kind == FileKind::Regular
            && self.link_target.is_empty()
            && self.size > 0
            && self.checksum.is_some()
    }

    /// Path split on `/`, as handed to the exclusion matcher.
    #[must_use]
    pub fn path_segments(&self) -> Vec<&str> {
        self.path.split('/').collect()
    }
}

impl fmt::Display for FileRecord {
    // The path is left out: it is already printed by whoever shows the record.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "size:{} mtime:{} uid:{} gid:{} mode:{}",
            self.size,
            self.mtime.to_rfc3339_opts(chrono::SecondsFormat::AutoSi, true),
            self.uid,
            self.gid,
            format_mode(self.mode, self.kind),
        )?;

        match self.kind {
            FileKind::Directory => write!(f, " DIR"),
            FileKind::Socket => write!(f, " SOCK"),
            FileKind::Pipe => write!(f, " PIPE"),
            FileKind::Device => write!(f, " DEV"),
            FileKind::Symlink => write!(f, " link:{}", self.link_target),
            FileKind::Regular => match &self.checksum {
                Some(checksum) => write!(f, " checksum:{checksum}"),
                None => Ok(()),
            },
        }
    }
}

/// Renders permission bits the way `ls -l` does, prefixed by a type character.
#[must_use]
pub fn format_mode(mode: u32, kind: FileKind) -> String {
    let type_char = match kind {
        FileKind::Regular => '-',
        FileKind::Directory => 'd',
        FileKind::Symlink => 'L',
        FileKind::Socket => 'S',
        FileKind::Pipe => 'p',
        FileKind::Device => 'D',
    };

    let mut out = String::with_capacity(10);
    out.push(type_char);
    for shift in [6u32, 3, 0] {
        let bits = (mode >> shift) & 0o7;
        out.push(if bits & 0o4 != 0 { 'r' } else { '-' });
        out.push(if bits & 0o2 != 0 { 'w' } else { '-' });
        out.push(if bits & 0o1 != 0 { 'x' } else { '-' });
    }
    out
}

#[cfg(unix)]
fn owner_and_mode(metadata: &fs::Metadata) -> (u32, u32, u32) {
    use std::os::unix::fs::MetadataExt;
    (metadata.uid(), metadata.gid(), metadata.mode())
}

#[cfg(not(unix))]
fn owner_and_mode(metadata: &fs::Metadata) -> (u32, u32, u32) {
    // No ownership model; keep the read-only flag as the only permission.
    let mode = if metadata.permissions().readonly() {
        0o444
    } else {
        0o644
    };
    (0, 0, mode)
}

/// Snapshot-wide information, written before any record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Metadata {
    /// On-disk format version, checked on open
    pub format_version: u32,
    /// Version (and commit) of the tool that wrote the snapshot
    pub tool_version: String,
    /// When the snapshot was taken
    pub created_at: DateTime<Utc>,
    /// Canonical path of the snapshotted root
    pub root: String,
    /// Whether checksums were skipped
    pub shallow: bool,
}

impl Metadata {
    /// Metadata for a snapshot of `root` taken now.
    #[must_use]
    pub fn new(tool_version: String, root: &std::path::Path, shallow: bool) -> Self {
        Self {
            format_version: crate::FORMAT_VERSION,
            tool_version,
            created_at: Utc::now(),
            root: root.to_string_lossy().into_owned(),
            shallow,
        }
    }
}
