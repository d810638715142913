//! Command-line interface definitions for fsdiff.
//!
//! The CLI definitions are shared between the main binary and build tools
//! (like xtask) for man page generation.
//!
//! Note: Field-level documentation is provided via clap attributes, so we
//! allow missing_docs for this module to avoid redundant documentation.

#![allow(missing_docs)]
#![allow(clippy::missing_docs_in_private_items)]

use crate::diff::Property;
use clap::{Parser, Subcommand};
use clap_complete::Shell;
use std::path::PathBuf;

/// Main CLI structure for fsdiff.
#[derive(Parser)]
#[command(
    name = "fsdiff",
    version = crate::VERSION,
    about = "Snapshot a directory tree and report what changed",
    long_about = "Records the state of a directory tree in a snapshot file and compares \
                  two snapshots: new, modified, moved and deleted entries.\n\n\
                  Exit status: 0 if no differences, 1 if differences were found, 2 on error."
)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Show verbose output and debug logs
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

/// All available commands.
#[derive(Subcommand)]
pub enum Commands {
    /// Take a snapshot of a directory tree
    #[command(visible_alias = "snap")]
    Snapshot(SnapshotArgs),

    /// Compare two snapshots
    Diff(DiffArgs),

    /// Print the content of a snapshot file
    Dump {
        /// Snapshot file
        snapshot: PathBuf,

        /// Only print the snapshot metadata
        #[arg(long)]
        metadata_only: bool,
    },

    /// Generate shell completion scripts
    Completion {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(clap::Args, Debug, Clone, Default)]
pub struct SnapshotArgs {
    /// Directory to snapshot
    pub root: PathBuf,

    /// Snapshot file to write (default: YYYYMMDDhhmmss.snap)
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Skip unreadable entries instead of aborting
    #[arg(long)]
    pub carry_on: bool,

    /// Do not compute file checksums (faster, no rename detection)
    #[arg(long)]
    pub shallow: bool,

    /// Exclude entries matching a gitignore-style pattern (repeatable)
    #[arg(short, long = "exclude", value_name = "PATTERN")]
    pub exclude: Vec<String>,

    /// Read exclusion patterns from a file
    #[arg(long, value_name = "FILE")]
    pub exclude_from: Option<PathBuf>,

    /// Only print warnings
    #[arg(short, long)]
    pub quiet: bool,
}

#[derive(clap::Args, Debug, Clone, Default)]
pub struct DiffArgs {
    /// Snapshot taken first
    pub before: PathBuf,

    /// Snapshot taken last
    pub after: PathBuf,

    /// Do not compare a property (repeatable)
    #[arg(long = "ignore", value_enum, value_name = "PROPERTY")]
    pub ignore: Vec<Property>,

    /// Do not report new entries
    #[arg(long)]
    pub ignore_new: bool,

    /// Do not report modified entries
    #[arg(long)]
    pub ignore_modified: bool,

    /// Do not report deleted entries
    #[arg(long)]
    pub ignore_deleted: bool,

    /// Only print the summary line
    #[arg(long)]
    pub summary: bool,

    /// Disable colored output
    #[arg(long)]
    pub nocolor: bool,

    /// Print nothing, only set the exit status
    #[arg(short, long)]
    pub quiet: bool,

    /// Exclude entries matching a gitignore-style pattern (repeatable)
    #[arg(short, long = "exclude", value_name = "PATTERN")]
    pub exclude: Vec<String>,
}
