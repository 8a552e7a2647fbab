use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::TypeError;

/// Length of a raw SHA-1 digest in bytes.
pub const DIGEST_LEN: usize = 20;

/// Length of a digest rendered as lowercase hex.
pub const DIGEST_HEX_LEN: usize = 40;

/// Content identifier of a git object.
///
/// A `Digest` is the SHA-1 of the object's canonical `"<kind> <len>\0"`
/// header followed by its payload. It is immutable and used as a map key
/// throughout the store. The textual form is always 40 lowercase hex digits.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Digest([u8; DIGEST_LEN]);

impl Digest {
    /// Create a `Digest` from the 20 raw bytes found in tree entries,
    /// pack indexes and REF_DELTA headers.
    pub fn from_raw(bytes: &[u8]) -> Result<Self, TypeError> {
        let arr: [u8; DIGEST_LEN] =
            bytes.try_into().map_err(|_| TypeError::InvalidLength {
                expected: DIGEST_LEN,
                actual: bytes.len(),
            })?;
        Ok(Self(arr))
    }

    /// The all-zero digest.
    pub const fn null() -> Self {
        Self([0u8; DIGEST_LEN])
    }

    /// Returns `true` if this is the all-zero digest.
    pub fn is_null(&self) -> bool {
        self.0 == [0u8; DIGEST_LEN]
    }

    /// The raw 20-byte hash.
    pub fn as_bytes(&self) -> &[u8; DIGEST_LEN] {
        &self.0
    }

    /// First byte of the digest; selects the pack index fan-out bucket.
    pub fn first_byte(&self) -> u8 {
        self.0[0]
    }

    /// Full 40-character lowercase hex representation.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Abbreviated hex representation (first 7 characters, as git prints them).
    pub fn short_hex(&self) -> String {
        let mut s = self.to_hex();
        s.truncate(7);
        s
    }

    /// Two-character loose object fan-out directory name.
    pub fn fanout_dir(&self) -> String {
        hex::encode(&self.0[..1])
    }

    /// Remaining 38 characters used as the loose object file name.
    pub fn loose_file_name(&self) -> String {
        hex::encode(&self.0[1..])
    }

    /// The `i`-th hex nibble (0-indexed from the most significant).
    pub fn nibble(&self, i: usize) -> u8 {
        let byte = self.0[i / 2];
        if i % 2 == 0 {
            byte >> 4
        } else {
            byte & 0x0f
        }
    }

    /// Parse a full 40-character hex digest. Uppercase is accepted.
    pub fn from_hex(s: &str) -> Result<Self, TypeError> {
        if s.len() != DIGEST_HEX_LEN {
            return Err(TypeError::InvalidLength {
                expected: DIGEST_HEX_LEN,
                actual: s.len(),
            });
        }
        let bytes = hex::decode(s).map_err(|e| TypeError::InvalidHex(e.to_string()))?;
        Self::from_raw(&bytes)
    }
}

impl fmt::Debug for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Digest({})", self.short_hex())
    }
}

impl fmt::Display for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl FromStr for Digest {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_hex(s)
    }
}

impl From<[u8; DIGEST_LEN]> for Digest {
    fn from(bytes: [u8; DIGEST_LEN]) -> Self {
        Self(bytes)
    }
}

impl From<Digest> for [u8; DIGEST_LEN] {
    fn from(digest: Digest) -> Self {
        digest.0
    }
}

impl Serialize for Digest {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for Digest {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::from_hex(&s).map_err(serde::de::Error::custom)
    }
}
