mod common;

use anyhow::Result;
use common::{TestTree, diff, paths};
use fsdiff::diff::{Attribute, Change, ChangeKind, DiffOptions, Property};
use fsdiff::scanner::{BuildOptions, ExclusionMatcher};
use rstest::rstest;
use std::collections::BTreeSet;

#[test]
fn test_unchanged_tree_has_no_changes() -> Result<()> {
    let tree = TestTree::with_files(&[("a/b", "b"), ("a/c/d", "d"), ("z", "z")])?;
    let first = tree.snapshot("1.snap")?;
    let second = tree.snapshot("2.snap")?;

    let changes = diff(&first, &second, &DiffOptions::default())?;
    assert!(changes.is_empty(), "{:?}", changes.changes);
    assert_eq!(changes.summary.to_string(), "0 new, 0 modified, 0 deleted");

    // A snapshot is always equal to itself
    assert!(diff(&first, &first, &DiffOptions::default())?.is_empty());

    Ok(())
}

#[test]
fn test_reported_scenario() -> Result<()> {
    let tree = TestTree::with_files(&[("a/b", "b"), ("a/c/d", "d"), ("z", "z")])?;
    let before = tree.snapshot("before.snap")?;

    tree.preserving_mtime(&["a"], |t| {
        t.remove("a/c")?;
        t.write("a/b", "zz")
    })?;
    let after = tree.snapshot("after.snap")?;

    let changes = diff(&before, &after, &DiffOptions::default())?;
    let listed: Vec<(ChangeKind, &str)> = changes
        .changes
        .iter()
        .map(|c| (c.kind(), c.path()))
        .collect();
    assert_eq!(
        listed,
        vec![
            (ChangeKind::Modified, "a/b"),
            (ChangeKind::Deleted, "a/c"),
            (ChangeKind::Deleted, "a/c/d"),
        ]
    );
    assert_eq!(changes.summary.to_string(), "0 new, 1 modified, 2 deleted");

    let Change::Modified { properties, .. } = &changes.changes[0] else {
        panic!("expected a modification");
    };
    assert!(properties.contains_key(&Attribute::Size));
    assert!(properties.contains_key(&Attribute::Checksum));

    Ok(())
}

#[test]
fn test_new_and_deleted_swap_when_reversed() -> Result<()> {
    let tree = TestTree::with_files(&[("keep", "k"), ("gone", "g"), ("edit", "1")])?;
    let a = tree.snapshot("a.snap")?;

    tree.remove("gone")?;
    tree.write("added", "new content")?;
    tree.write("edit", "22")?;
    let b = tree.snapshot("b.snap")?;

    let forward = diff(&a, &b, &DiffOptions::default())?;
    let backward = diff(&b, &a, &DiffOptions::default())?;

    assert_eq!(paths(&forward, ChangeKind::New), vec!["added"]);
    assert_eq!(paths(&forward, ChangeKind::Deleted), vec!["gone"]);
    assert_eq!(
        paths(&forward, ChangeKind::New),
        paths(&backward, ChangeKind::Deleted)
    );
    assert_eq!(
        paths(&forward, ChangeKind::Deleted),
        paths(&backward, ChangeKind::New)
    );
    assert_eq!(
        paths(&forward, ChangeKind::Modified),
        paths(&backward, ChangeKind::Modified)
    );

    Ok(())
}

#[test]
fn test_added_then_removed_leaves_no_net_change() -> Result<()> {
    let tree = TestTree::with_files(&[("stable", "s")])?;
    let a = tree.snapshot("a.snap")?;

    tree.write("transient", "here for a while")?;
    let b = tree.snapshot("b.snap")?;

    tree.remove("transient")?;
    let c = tree.snapshot("c.snap")?;

    let ab = diff(&a, &b, &DiffOptions::default())?;
    assert_eq!(paths(&ab, ChangeKind::New), vec!["transient"]);

    let bc = diff(&b, &c, &DiffOptions::default())?;
    assert_eq!(paths(&bc, ChangeKind::Deleted), vec!["transient"]);

    let ac = diff(&a, &c, &DiffOptions::default())?;
    assert!(ac.is_empty(), "{:?}", ac.changes);

    Ok(())
}

#[test]
fn test_rename_is_one_modification() -> Result<()> {
    let tree = TestTree::with_files(&[("old.txt", "some content"), ("other", "o")])?;
    let before = tree.snapshot("before.snap")?;

    tree.rename("old.txt", "new.txt")?;
    let after = tree.snapshot("after.snap")?;

    let changes = diff(&before, &after, &DiffOptions::default())?;
    assert_eq!(changes.changes.len(), 1, "{:?}", changes.changes);

    let change = &changes.changes[0];
    assert!(change.is_rename());
    let Change::Modified {
        before,
        after,
        properties,
    } = change
    else {
        panic!("expected a modification");
    };
    assert_eq!(before.path, "old.txt");
    assert_eq!(after.path, "new.txt");
    assert!(properties.is_empty(), "{properties:?}");
    assert_eq!(changes.summary.to_string(), "0 new, 1 modified, 0 deleted");

    Ok(())
}

#[test]
fn test_empty_files_are_never_moves() -> Result<()> {
    let tree = TestTree::with_files(&[("e1", "")])?;
    let before = tree.snapshot("before.snap")?;

    tree.remove("e1")?;
    tree.write("e2", "")?;
    let after = tree.snapshot("after.snap")?;

    let changes = diff(&before, &after, &DiffOptions::default())?;
    assert_eq!(paths(&changes, ChangeKind::New), vec!["e2"]);
    assert_eq!(paths(&changes, ChangeKind::Deleted), vec!["e1"]);
    assert!(paths(&changes, ChangeKind::Modified).is_empty());

    Ok(())
}

#[test]
fn test_shallow_snapshot_disables_move_detection() -> Result<()> {
    let tree = TestTree::with_files(&[("old.txt", "some content")])?;
    let before = tree.snapshot("before.snap")?;

    tree.rename("old.txt", "new.txt")?;
    let shallow = BuildOptions {
        shallow: true,
        ..BuildOptions::default()
    };
    let after = tree.snapshot_with("after.snap", shallow)?;

    let changes = diff(&before, &after, &DiffOptions::default())?;
    assert!(changes.shallow);
    assert_eq!(paths(&changes, ChangeKind::New), vec!["new.txt"]);
    assert_eq!(paths(&changes, ChangeKind::Deleted), vec!["old.txt"]);
    assert!(paths(&changes, ChangeKind::Modified).is_empty());

    Ok(())
}

#[test]
fn test_shallow_ignores_same_size_content_change() -> Result<()> {
    let tree = TestTree::with_files(&[("f", "aaaa")])?;
    let shallow = || BuildOptions {
        shallow: true,
        ..BuildOptions::default()
    };
    let before = tree.snapshot_with("before.snap", shallow())?;

    let mtime = filetime::FileTime::from_last_modification_time(&std::fs::metadata(
        tree.path("f"),
    )?);
    tree.write("f", "bbbb")?;
    filetime::set_file_mtime(tree.path("f"), mtime)?;
    let after = tree.snapshot_with("after.snap", shallow())?;

    assert!(diff(&before, &after, &DiffOptions::default())?.is_empty());

    Ok(())
}

#[cfg(unix)]
#[test]
fn test_ignored_mode_change_is_not_reported() -> Result<()> {
    use std::os::unix::fs::PermissionsExt;

    let tree = TestTree::with_files(&[("script.sh", "echo hi")])?;
    let before = tree.snapshot("before.snap")?;

    std::fs::set_permissions(
        tree.path("script.sh"),
        std::fs::Permissions::from_mode(0o755),
    )?;
    let after = tree.snapshot("after.snap")?;

    let changes = diff(&before, &after, &DiffOptions::default())?;
    assert_eq!(paths(&changes, ChangeKind::Modified), vec!["script.sh"]);

    let ignore_mode = DiffOptions {
        ignored: BTreeSet::from([Property::Mode]),
        ..DiffOptions::default()
    };
    assert!(diff(&before, &after, &ignore_mode)?.is_empty());

    Ok(())
}

#[test]
fn test_excluded_paths_are_never_reported() -> Result<()> {
    let tree = TestTree::with_files(&[("cache/x", "1"), ("src/main", "m")])?;
    let before = tree.snapshot("before.snap")?;

    tree.write("cache/x", "changed")?;
    tree.write("cache/y", "new")?;
    tree.write("src/main", "mm")?;
    let after = tree.snapshot("after.snap")?;

    let options = DiffOptions {
        excluded: ExclusionMatcher::new(["cache/"])?,
        ..DiffOptions::default()
    };
    let changes = diff(&before, &after, &options)?;

    assert!(changes.changes.iter().all(|c| !c.path().starts_with("cache")));
    assert_eq!(paths(&changes, ChangeKind::Modified), vec!["src/main"]);

    Ok(())
}

#[test]
fn test_excluded_at_build_time_looks_deleted() -> Result<()> {
    let tree = TestTree::with_files(&[("build/out", "o"), ("f", "f")])?;
    let before = tree.snapshot("before.snap")?;

    let options = BuildOptions {
        excluded: ExclusionMatcher::new(["build"])?,
        ..BuildOptions::default()
    };
    let after = tree.snapshot_with("after.snap", options)?;

    let changes = diff(&before, &after, &DiffOptions::default())?;
    assert_eq!(
        paths(&changes, ChangeKind::Deleted),
        vec!["build", "build/out"]
    );

    Ok(())
}

#[test]
fn test_suppressed_categories() -> Result<()> {
    let tree = TestTree::with_files(&[("gone", "g"), ("edit", "1")])?;
    let before = tree.snapshot("before.snap")?;

    tree.remove("gone")?;
    tree.write("edit", "22")?;
    tree.write("added", "a")?;
    let after = tree.snapshot("after.snap")?;

    let all = diff(&before, &after, &DiffOptions::default())?;
    assert_eq!(all.summary.total(), 3);

    let no_new = diff(
        &before,
        &after,
        &DiffOptions {
            suppress_new: true,
            ..DiffOptions::default()
        },
    )?;
    assert_eq!(no_new.summary.new, 0);
    assert_eq!(no_new.summary.total(), 2);

    let no_modified = diff(
        &before,
        &after,
        &DiffOptions {
            suppress_modified: true,
            ..DiffOptions::default()
        },
    )?;
    assert_eq!(no_modified.summary.modified, 0);
    assert_eq!(no_modified.summary.total(), 2);

    let no_deleted = diff(
        &before,
        &after,
        &DiffOptions {
            suppress_deleted: true,
            ..DiffOptions::default()
        },
    )?;
    assert_eq!(no_deleted.summary.deleted, 0);
    assert_eq!(no_deleted.summary.total(), 2);

    Ok(())
}

#[test]
fn test_move_reported_when_modifications_suppressed() -> Result<()> {
    let tree = TestTree::with_files(&[("old.txt", "some content"), ("edit", "1")])?;
    let before = tree.snapshot("before.snap")?;

    tree.rename("old.txt", "new.txt")?;
    tree.write("edit", "22")?;
    let after = tree.snapshot("after.snap")?;

    let options = DiffOptions {
        suppress_modified: true,
        ..DiffOptions::default()
    };
    let changes = diff(&before, &after, &options)?;

    assert_eq!(changes.changes.len(), 1);
    assert!(changes.changes[0].is_rename());
    assert_eq!(changes.changes[0].path(), "new.txt");

    Ok(())
}

#[cfg(unix)]
#[rstest]
#[case::size(Property::Size)]
#[case::mtime(Property::Mtime)]
#[case::uid(Property::Uid)]
#[case::gid(Property::Gid)]
#[case::mode(Property::Mode)]
#[case::checksum(Property::Checksum)]
fn test_ignored_property_never_listed(#[case] property: Property) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;

    let tree = TestTree::with_files(&[("f", "one")])?;
    let before = tree.snapshot("before.snap")?;

    tree.write("f", "three")?;
    std::fs::set_permissions(tree.path("f"), std::fs::Permissions::from_mode(0o600))?;
    let after = tree.snapshot("after.snap")?;

    let options = DiffOptions {
        ignored: BTreeSet::from([property]),
        ..DiffOptions::default()
    };
    let changes = diff(&before, &after, &options)?;

    for change in &changes.changes {
        if let Change::Modified { properties, .. } = change {
            assert!(!properties.contains_key(&property.attribute()));
        }
    }
    assert_eq!(paths(&changes, ChangeKind::Modified), vec!["f"]);

    Ok(())
}
