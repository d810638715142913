use crate::storage::Checksum;
use memmap2::MmapOptions;
use sha1::{Digest, Sha1};
use std::fs::File;
use std::io;
use std::path::Path;

/// Default size at which file content is hashed through a memory map.
pub const DEFAULT_MMAP_THRESHOLD: u64 = 1_048_576;

/// Checksum of an in-memory buffer.
#[must_use]
pub fn hash_bytes(data: &[u8]) -> Checksum {
    Checksum::from_bytes(Sha1::digest(data).into())
}

/// Computes the content checksum of the regular file at `path`.
///
/// Files smaller than `mmap_threshold` are streamed through the hasher; larger
/// ones are memory mapped. Empty files always take the streaming path since a
/// zero-length mapping is rejected by the OS.
///
/// # Errors
///
/// Returns the underlying I/O error if the file cannot be opened, mapped or read.
pub fn hash_file(path: &Path, mmap_threshold: u64) -> io::Result<Checksum> {
    let mut file = File::open(path)?;
    let len = file.metadata()?.len();

    let mut hasher = Sha1::new();
    if len > 0 && len >= mmap_threshold {
        // SAFETY: the mapping is read-only and dropped before returning; a
        // concurrent writer can only change the bytes being hashed.
        let mmap = unsafe { MmapOptions::new().map(&file)? };
        hasher.update(&mmap[..]);
    } else {
        io::copy(&mut file, &mut hasher)?;
    }

    Ok(Checksum::from_bytes(hasher.finalize().into()))
}
