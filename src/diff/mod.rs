//! Snapshot comparison.
//!
//! Reconciles two snapshots into a categorized change set:
//! - New: a path present only after, with no content match before
//! - Modified: a path present in both whose properties differ, or a file that
//!   moved (matched by content checksum, before/after paths differ)
//! - Deleted: a path present only before that was not the source of a move
//!
//! The forward pass walks the after snapshot in path order, so the change set
//! lists new and modified entries sorted by path, followed by deletions.

/// Plain-text rendering of a change set
pub mod report;

pub use report::Reporter;

use crate::error::Result;
use crate::scanner::ExclusionMatcher;
use crate::storage::snapshots::{SnapshotStore, SnapshotView};
use crate::storage::{Checksum, FileKind, FileRecord};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::fmt;
use tracing::{debug, debug_span};

/// Record properties that may be left out of the comparison.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum Property {
    /// Byte length
    Size,
    /// Modification time
    Mtime,
    /// Owner user id
    Uid,
    /// Owner group id
    Gid,
    /// Permission and type bits
    Mode,
    /// Content checksum
    Checksum,
}

impl Property {
    /// Attribute reported when this property differs.
    #[must_use]
    pub const fn attribute(self) -> Attribute {
        match self {
            Self::Size => Attribute::Size,
            Self::Mtime => Attribute::Mtime,
            Self::Uid => Attribute::Uid,
            Self::Gid => Attribute::Gid,
            Self::Mode => Attribute::Mode,
            Self::Checksum => Attribute::Checksum,
        }
    }
}

/// Every attribute the property diff can report.
///
/// `Link` and the four kind flags are always compared; the others can be
/// ignored through their [`Property`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[allow(missing_docs)]
pub enum Attribute {
    Size,
    Mtime,
    Uid,
    Gid,
    Mode,
    Link,
    Dir,
    Sock,
    Pipe,
    Dev,
    Checksum,
}

impl Attribute {
    /// Name used in reports.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Size => "size",
            Self::Mtime => "mtime",
            Self::Uid => "uid",
            Self::Gid => "gid",
            Self::Mode => "mode",
            Self::Link => "link",
            Self::Dir => "dir",
            Self::Sock => "sock",
            Self::Pipe => "pipe",
            Self::Dev => "dev",
            Self::Checksum => "checksum",
        }
    }
}

impl fmt::Display for Attribute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Value of a single attribute on one side of a comparison.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PropertyValue {
    /// Size or owner id
    Number(u64),
    /// Timestamp
    Time(DateTime<Utc>),
    /// Raw mode bits, shown in octal
    Mode(u32),
    /// Symlink target
    Text(String),
    /// Kind flag
    Flag(bool),
    /// Content digest
    Checksum(Checksum),
}

impl fmt::Display for PropertyValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(n) => write!(f, "{n}"),
            Self::Time(t) => {
                f.write_str(&t.to_rfc3339_opts(chrono::SecondsFormat::AutoSi, true))
            }
            Self::Mode(m) => write!(f, "{m:o}"),
            Self::Text(s) => write!(f, "{s:?}"),
            Self::Flag(b) => write!(f, "{b}"),
            Self::Checksum(c) => write!(f, "{c}"),
        }
    }
}

/// Before and after values of a differing attribute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PropertyChange {
    /// Value in the before snapshot
    pub before: PropertyValue,
    /// Value in the after snapshot
    pub after: PropertyValue,
}

/// Differing attributes of a record pair. Empty means identical properties.
pub type PropertyDiff = BTreeMap<Attribute, PropertyChange>;

/// Compares the properties of two records.
///
/// `compare_checksums` is false in shallow mode; even when true, checksums are
/// only compared if both records carry one.
#[must_use]
pub fn property_diff(
    before: &FileRecord,
    after: &FileRecord,
    ignored: &BTreeSet<Property>,
    compare_checksums: bool,
) -> PropertyDiff {
    let mut diff = PropertyDiff::new();
    let mut check = |attr: Attribute, b: PropertyValue, a: PropertyValue| {
        if b != a {
            diff.insert(attr, PropertyChange { before: b, after: a });
        }
    };

    let wanted = |p: Property| !ignored.contains(&p);

    if wanted(Property::Size) {
        check(
            Attribute::Size,
            PropertyValue::Number(before.size),
            PropertyValue::Number(after.size),
        );
    }
    if wanted(Property::Mtime) {
        check(
            Attribute::Mtime,
            PropertyValue::Time(before.mtime),
            PropertyValue::Time(after.mtime),
        );
    }
    if wanted(Property::Uid) {
        check(
            Attribute::Uid,
            PropertyValue::Number(before.uid.into()),
            PropertyValue::Number(after.uid.into()),
        );
    }
    if wanted(Property::Gid) {
        check(
            Attribute::Gid,
            PropertyValue::Number(before.gid.into()),
            PropertyValue::Number(after.gid.into()),
        );
    }
    if wanted(Property::Mode) {
        check(
            Attribute::Mode,
            PropertyValue::Mode(before.mode),
            PropertyValue::Mode(after.mode),
        );
    }

    check(
        Attribute::Link,
        PropertyValue::Text(before.link_target.clone()),
        PropertyValue::Text(after.link_target.clone()),
    );
    for (attr, kind) in [
        (Attribute::Dir, FileKind::Directory),
        (Attribute::Sock, FileKind::Socket),
        (Attribute::Pipe, FileKind::Pipe),
        (Attribute::Dev, FileKind::Device),
    ] {
        check(
            attr,
            PropertyValue::Flag(before.kind == kind),
            PropertyValue::Flag(after.kind == kind),
        );
    }

    if compare_checksums
        && wanted(Property::Checksum)
        && let (Some(b), Some(a)) = (before.checksum, after.checksum)
    {
        check(
            Attribute::Checksum,
            PropertyValue::Checksum(b),
            PropertyValue::Checksum(a),
        );
    }

    diff
}

/// Category of a change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[allow(missing_docs)]
pub enum ChangeKind {
    New,
    Modified,
    Deleted,
}

/// One entry of a change set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Change {
    /// Present only in the after snapshot.
    New {
        /// Record in the after snapshot
        after: FileRecord,
    },
    /// Present in both, or moved. A move has differing before/after paths
    /// and may carry an empty property diff.
    Modified {
        /// Record in the before snapshot
        before: FileRecord,
        /// Record in the after snapshot
        after: FileRecord,
        /// Differing attributes
        properties: PropertyDiff,
    },
    /// Present only in the before snapshot.
    Deleted {
        /// Record in the before snapshot
        before: FileRecord,
    },
}

impl Change {
    /// Category of this change.
    #[must_use]
    pub const fn kind(&self) -> ChangeKind {
        match self {
            Self::New { .. } => ChangeKind::New,
            Self::Modified { .. } => ChangeKind::Modified,
            Self::Deleted { .. } => ChangeKind::Deleted,
        }
    }

    /// Path the change is reported under (the after path for moves).
    #[must_use]
    pub fn path(&self) -> &str {
        match self {
            Self::New { after } | Self::Modified { after, .. } => &after.path,
            Self::Deleted { before } => &before.path,
        }
    }

    /// Whether this entry is a move detected by content checksum.
    #[must_use]
    pub fn is_rename(&self) -> bool {
        matches!(self, Self::Modified { before, after, .. } if before.path != after.path)
    }
}

/// Per-category counts of a change set.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Summary {
    /// New entries
    pub new: usize,
    /// Modified or moved entries
    pub modified: usize,
    /// Deleted entries
    pub deleted: usize,
}

impl Summary {
    /// Number of reported changes.
    #[must_use]
    pub const fn total(&self) -> usize {
        self.new + self.modified + self.deleted
    }

    /// Whether nothing was reported.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.total() == 0
    }
}

impl fmt::Display for Summary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} new, {} modified, {} deleted",
            self.new, self.modified, self.deleted
        )
    }
}

/// Result of comparing two snapshots.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChangeSet {
    /// Changes in report order
    pub changes: Vec<Change>,
    /// Counts per category
    pub summary: Summary,
    /// Whether the comparison ran without checksums
    pub shallow: bool,
}

impl ChangeSet {
    /// Whether no difference was found.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    fn push(&mut self, change: Change) {
        match change.kind() {
            ChangeKind::New => self.summary.new += 1,
            ChangeKind::Modified => self.summary.modified += 1,
            ChangeKind::Deleted => self.summary.deleted += 1,
        }
        self.changes.push(change);
    }

    /// Changes of one category, in report order.
    pub fn of_kind(&self, kind: ChangeKind) -> impl Iterator<Item = &Change> {
        self.changes.iter().filter(move |c| c.kind() == kind)
    }
}

/// Comparison options.
#[derive(Debug, Clone, Default)]
pub struct DiffOptions {
    /// Paths left out of both passes
    pub excluded: ExclusionMatcher,
    /// Properties not compared
    pub ignored: BTreeSet<Property>,
    /// Do not report new entries
    pub suppress_new: bool,
    /// Do not report same-path modifications. Moves are still reported.
    pub suppress_modified: bool,
    /// Do not report deleted entries
    pub suppress_deleted: bool,
}

/// Compares two open snapshot files.
///
/// Both read transactions stay open for the whole comparison. `before` and
/// `after` may be the same store.
///
/// # Errors
///
/// Returns an error if either store cannot be read or holds corrupt records.
pub fn diff_stores(
    before: &SnapshotStore,
    after: &SnapshotStore,
    options: &DiffOptions,
) -> Result<ChangeSet> {
    before.read(|b| after.read(|a| diff(b, a, options)))
}

/// Compares two snapshot views.
///
/// # Errors
///
/// Returns an error if a record cannot be read or decoded.
pub fn diff(
    before: &SnapshotView<'_>,
    after: &SnapshotView<'_>,
    options: &DiffOptions,
) -> Result<ChangeSet> {
    let shallow = before.metadata().shallow || after.metadata().shallow;
    let _span = debug_span!("diff", shallow).entered();

    let mut out = ChangeSet {
        shallow,
        ..ChangeSet::default()
    };
    let mut moved: HashSet<String> = HashSet::new();

    for record in after.records()? {
        let after_record = record?;

        if options
            .excluded
            .matches(&after_record.path_segments(), after_record.is_dir())
        {
            continue;
        }

        if let Some(before_record) = before.get(&after_record.path)? {
            let properties =
                property_diff(&before_record, &after_record, &options.ignored, !shallow);
            if !properties.is_empty() && !options.suppress_modified {
                out.push(Change::Modified {
                    before: before_record,
                    after: after_record,
                    properties,
                });
            }
            continue;
        }

        if !shallow
            && after_record.is_rename_candidate()
            && let Some(checksum) = after_record.checksum
            && let Some(before_record) = before.get_by_checksum(&checksum)?
        {
            // Reported even when modifications are suppressed.
            let properties = property_diff(&before_record, &after_record, &options.ignored, true);
            moved.insert(before_record.path.clone());
            out.push(Change::Modified {
                before: before_record,
                after: after_record,
                properties,
            });
            continue;
        }

        if !options.suppress_new {
            out.push(Change::New {
                after: after_record,
            });
        }
    }

    debug!(
        new = out.summary.new,
        modified = out.summary.modified,
        moved = moved.len(),
        "forward pass done"
    );

    for record in before.records()? {
        let before_record = record?;

        if after.contains(&before_record.path)? || moved.contains(&before_record.path) {
            continue;
        }
        if options
            .excluded
            .matches(&before_record.path_segments(), before_record.is_dir())
        {
            continue;
        }
        if !options.suppress_deleted {
            out.push(Change::Deleted {
                before: before_record,
            });
        }
    }

    debug!(deleted = out.summary.deleted, "reverse pass done");

    Ok(out)
}
