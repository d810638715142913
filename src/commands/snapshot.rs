use crate::FsdiffContext;
use crate::cli::SnapshotArgs;
use crate::output;
use crate::scanner::{BuildOptions, BuildStats, ExclusionMatcher, SnapshotBuilder};
use crate::utils::{default_snapshot_name, format_size};
use anyhow::{Context, Result};
use std::path::PathBuf;

/// Combines the configuration with the command-line flags.
///
/// Flags can only turn options on. Configured patterns come first, so a
/// command-line pattern (including a `!` negation) has the last word.
/// `--exclude-from` replaces the configured pattern file.
///
/// # Errors
///
/// Returns an error if a pattern is invalid or the pattern file cannot be read.
pub fn build_options(ctx: &FsdiffContext, args: &SnapshotArgs) -> Result<BuildOptions> {
    let config = &ctx.config;

    let exclude_file = match &args.exclude_from {
        Some(file) => Some(file.clone()),
        None => config.snapshot_exclude_file()?,
    };
    let patterns = config.snapshot.exclude.iter().chain(&args.exclude);
    let excluded = ExclusionMatcher::from_sources(exclude_file.as_deref(), patterns)?;

    Ok(BuildOptions {
        carry_on: config.snapshot.carry_on || args.carry_on,
        shallow: config.snapshot.shallow || args.shallow,
        excluded,
        mmap_threshold: config.performance.mmap_threshold,
    })
}

/// Execute the snapshot command
///
/// # Errors
///
/// Returns an error if the options are invalid or the build fails.
pub fn execute(ctx: &FsdiffContext, args: &SnapshotArgs) -> Result<BuildStats> {
    let options = build_options(ctx, args)?;
    let output_path = args
        .output
        .clone()
        .unwrap_or_else(|| PathBuf::from(default_snapshot_name(&chrono::Local::now())));

    output::action("Snapshotting", &args.root.display().to_string());
    if options.shallow {
        output::verbose("Shallow mode: file checksums are not computed");
    }

    let builder = SnapshotBuilder::new(ctx.build_info.clone(), options);
    let stats = builder
        .build(&args.root, &output_path)
        .with_context(|| format!("Unable to snapshot {}", args.root.display()))?;

    if stats.skipped > 0 {
        output::warning(&format!("Skipped {} unreadable entries", stats.skipped));
    }
    output::success(&format!(
        "Snapshot written to {} ({} entries, {} hashed)",
        output_path.display(),
        stats.entries,
        format_size(stats.bytes_hashed)
    ));

    Ok(stats)
}
