use std::fmt;
use std::str::FromStr;

use crate::digest::{Digest, DIGEST_HEX_LEN};
use crate::error::TypeError;

/// Shortest abbreviation accepted during lookup.
pub const MIN_PREFIX_LEN: usize = 4;

/// A lowercase hex abbreviation of a [`Digest`], 4 to 40 characters long.
///
/// Prefixes may have odd length; matching is done nibble by nibble so no
/// padding is ever invented.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct DigestPrefix {
    hex: String,
    nibbles: Vec<u8>,
}

impl DigestPrefix {
    /// Parse and normalise an abbreviation.
    pub fn parse(s: &str) -> Result<Self, TypeError> {
        let s = s.trim();
        if s.len() < MIN_PREFIX_LEN {
            return Err(TypeError::PrefixTooShort {
                min: MIN_PREFIX_LEN,
                actual: s.len(),
            });
        }
        if s.len() > DIGEST_HEX_LEN {
            return Err(TypeError::InvalidLength {
                expected: DIGEST_HEX_LEN,
                actual: s.len(),
            });
        }
        let nibbles = s
            .chars()
            .map(|c| {
                c.to_digit(16)
                    .map(|d| d as u8)
                    .ok_or_else(|| TypeError::InvalidHex(format!("invalid character {c:?} in {s:?}")))
            })
            .collect::<Result<Vec<u8>, _>>()?;
        Ok(Self {
            hex: s.to_ascii_lowercase(),
            nibbles,
        })
    }

    /// The normalised lowercase hex text.
    pub fn as_str(&self) -> &str {
        &self.hex
    }

    /// Number of hex characters.
    pub fn len(&self) -> usize {
        self.nibbles.len()
    }

    /// Always `false`: a valid prefix has at least [`MIN_PREFIX_LEN`] characters.
    pub fn is_empty(&self) -> bool {
        self.nibbles.is_empty()
    }

    /// Returns `true` if the prefix spells out a whole digest.
    pub fn is_full(&self) -> bool {
        self.len() == DIGEST_HEX_LEN
    }

    /// The full digest, if the prefix is complete.
    pub fn to_digest(&self) -> Option<Digest> {
        if self.is_full() {
            Digest::from_hex(&self.hex).ok()
        } else {
            None
        }
    }

    /// Two-character loose object fan-out directory this prefix lives in.
    pub fn fanout_dir(&self) -> &str {
        &self.hex[..2]
    }

    /// The part of the prefix that names a file inside [`fanout_dir`](Self::fanout_dir).
    pub fn file_name_prefix(&self) -> &str {
        &self.hex[2..]
    }

    /// First byte shared by every matching digest.
    pub fn first_byte(&self) -> u8 {
        (self.nibbles[0] << 4) | self.nibbles[1]
    }

    /// Lowest digest that can match this prefix (missing nibbles zeroed).
    pub fn lower_bound(&self) -> Digest {
        let mut bytes = [0u8; 20];
        for (i, nibble) in self.nibbles.iter().enumerate() {
            if i % 2 == 0 {
                bytes[i / 2] |= nibble << 4;
            } else {
                bytes[i / 2] |= nibble;
            }
        }
        Digest::from(bytes)
    }

    /// Returns `true` if `digest` starts with this prefix.
    pub fn matches(&self, digest: &Digest) -> bool {
        self.nibbles
            .iter()
            .enumerate()
            .all(|(i, &n)| digest.nibble(i) == n)
    }
}

impl fmt::Debug for DigestPrefix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "DigestPrefix({})", self.hex)
    }
}

impl fmt::Display for DigestPrefix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.hex)
    }
}

impl FromStr for DigestPrefix {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl From<Digest> for DigestPrefix {
    fn from(digest: Digest) -> Self {
        let hex = digest.to_hex();
        let nibbles = (0..DIGEST_HEX_LEN).map(|i| digest.nibble(i)).collect();
        Self { hex, nibbles }
    }
}
