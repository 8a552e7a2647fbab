//! Hashing and checksum primitives for gitodb.
//!
//! Provides git object identity hashing (SHA-1 over a typed header plus
//! payload), SHA-1 trailer verification for pack and index files, and the
//! CRC-32 used by pack index entries.
//!
//! All operations wrap established libraries; there is no custom cryptography.

pub mod checksum;
pub mod hasher;

pub use checksum::{crc32, split_trailer, verify_trailer, TRAILER_LEN};
pub use hasher::ObjectHasher;
