//! Foundation types for gitodb.
//!
//! Every other gitodb crate depends on `gitodb-types` for the identifiers
//! that key objects on disk and in pack indexes.
//!
//! # Key Types
//!
//! - [`Digest`] -- 20-byte SHA-1 object identifier, rendered as 40 lowercase hex digits
//! - [`DigestPrefix`] -- validated abbreviation (4–40 hex digits) used during lookup

pub mod digest;
pub mod error;
pub mod prefix;

pub use digest::{Digest, DIGEST_HEX_LEN, DIGEST_LEN};
pub use error::TypeError;
pub use prefix::{DigestPrefix, MIN_PREFIX_LEN};
