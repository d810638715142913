use crate::FsdiffContext;
use crate::cli::DiffArgs;
use crate::diff::{ChangeSet, DiffOptions, Reporter, diff_stores};
use crate::output;
use crate::scanner::ExclusionMatcher;
use crate::storage::snapshots::SnapshotStore;
use anyhow::{Context, Result};
use std::collections::BTreeSet;
use std::io::Write;
use std::path::Path;

/// Combines the configuration with the command-line flags.
///
/// # Errors
///
/// Returns an error if an exclusion pattern is invalid.
pub fn diff_options(ctx: &FsdiffContext, args: &DiffArgs) -> Result<DiffOptions> {
    let config = &ctx.config.diff;

    let ignored: BTreeSet<_> = config.ignore.iter().chain(&args.ignore).copied().collect();
    let excluded = ExclusionMatcher::new(config.exclude.iter().chain(&args.exclude))?;

    Ok(DiffOptions {
        excluded,
        ignored,
        suppress_new: args.ignore_new,
        suppress_modified: args.ignore_modified,
        suppress_deleted: args.ignore_deleted,
    })
}

/// Compares the two snapshots named by `args`.
///
/// A snapshot compared with itself is opened only once.
///
/// # Errors
///
/// Returns an error if either snapshot cannot be opened or read.
pub fn compare(before: &Path, after: &Path, options: &DiffOptions) -> Result<ChangeSet> {
    let before_store = open(before)?;

    let changes = if same_file(before, after) {
        diff_stores(&before_store, &before_store, options)
    } else {
        let after_store = open(after)?;
        if before_store.metadata().root != after_store.metadata().root {
            output::verbose(&format!(
                "Snapshots were taken from different roots: {} and {}",
                before_store.metadata().root,
                after_store.metadata().root
            ));
        }
        diff_stores(&before_store, &after_store, options)
    };

    changes.context("Unable to compare snapshots")
}

/// Execute the diff command and print the report on stdout
///
/// Returns whether any difference was reported.
///
/// # Errors
///
/// Returns an error if a snapshot cannot be read or stdout cannot be written.
pub fn execute(ctx: &FsdiffContext, args: &DiffArgs) -> Result<bool> {
    let options = diff_options(ctx, args)?;
    let changes = compare(&args.before, &args.after, &options)?;

    if changes.shallow {
        output::verbose("Shallow comparison: checksums and moves are not considered");
    }

    let reporter = Reporter {
        color: ctx.config.output.color && !args.nocolor,
        summary_only: args.summary,
        quiet: args.quiet,
    };

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    reporter.render(&changes, &mut out)?;
    out.flush()?;

    Ok(!changes.is_empty())
}

fn open(path: &Path) -> Result<SnapshotStore> {
    SnapshotStore::open(path).with_context(|| format!("Unable to read {}", path.display()))
}

fn same_file(a: &Path, b: &Path) -> bool {
    match (a.canonicalize(), b.canonicalize()) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}
