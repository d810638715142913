/// `fsdiff diff`: compare two snapshots.
pub mod diff;
/// `fsdiff dump`: print the content of a snapshot.
pub mod dump;
/// `fsdiff snapshot`: record a directory tree.
pub mod snapshot;

/// Process exit status of a successful `diff` with no differences.
pub const EXIT_SAME: i32 = 0;

/// Process exit status of a successful `diff` that found differences.
pub const EXIT_DIFFERENT: i32 = 1;

/// Process exit status of any operational failure.
pub const EXIT_ERROR: i32 = 2;
