//! Trailer and per-entry checksums used by pack and index files.

use crate::hasher::ObjectHasher;

/// Length of the SHA-1 trailer appended to pack and index files.
pub const TRAILER_LEN: usize = 20;

/// CRC-32 of a byte range, as stored in the pack index for each entry.
pub fn crc32(data: &[u8]) -> u32 {
    crc32fast::hash(data)
}

/// Split a file into its body and trailing SHA-1 checksum.
///
/// Returns `None` if the file is shorter than the trailer.
pub fn split_trailer(data: &[u8]) -> Option<(&[u8], &[u8; TRAILER_LEN])> {
    if data.len() < TRAILER_LEN {
        return None;
    }
    let (body, trailer) = data.split_at(data.len() - TRAILER_LEN);
    trailer.try_into().ok().map(|t| (body, t))
}

/// Returns `true` if the last 20 bytes of `data` are the SHA-1 of everything before them.
pub fn verify_trailer(data: &[u8]) -> bool {
    match split_trailer(data) {
        Some((body, trailer)) => ObjectHasher::raw_hash(body) == *trailer,
        None => false,
    }
}
