//! Git pack files, read-only.
//!
//! Decodes version 2 pack indexes and pack files, applies delta programs,
//! and resolves OFS_DELTA / REF_DELTA chains into full objects.
//!
//! # Architecture
//!
//! - **Pack index** (`.idx`): fan-out table, sorted digests, CRC-32s, offsets
//! - **Pack file** (`.pack`): `PACK` header, then zlib-compressed entries
//!   addressed by the offsets in the index
//! - **PackFile**: one decoded pack with every delta chain resolved
//! - **PackSet**: all packs of a repository, each decoded on first access
//!
//! Failures to reconstruct a single object (missing base, bad delta) are
//! kept on that object; structural damage to a pack or index fails the
//! whole pack.

pub mod cursor;
pub mod delta;
pub mod entry;
pub mod error;
pub mod index;
pub mod manager;
pub mod options;
pub mod reader;
#[cfg(any(test, feature = "test-support"))]
pub mod testing;
pub mod varint;
pub mod verify;

pub use entry::{BaseRef, PackEntryKind};
pub use error::{DeltaError, ObjectError, PackError, PackResult};
pub use index::{PackIndex, PackIndexEntry};
pub use manager::PackSet;
pub use options::{PackOptions, DEFAULT_MAX_DELTA_DEPTH};
pub use reader::{PackFile, PackObject};
pub use verify::{VerifyLine, VerifyReport};
