use std::fmt;

use gitodb_store::ObjectKind;
use gitodb_types::Digest;
use serde::Serialize;

/// The 3-bit type code of a pack entry header.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PackEntryKind {
    /// A complete object stored as-is.
    Full(ObjectKind),
    /// Delta against the entry a given distance earlier in the same pack.
    OfsDelta,
    /// Delta against the object with a given digest.
    RefDelta,
}

impl PackEntryKind {
    pub const OFS_DELTA: u8 = 6;
    pub const REF_DELTA: u8 = 7;

    /// Decode a header type code. `0` and `5` are reserved.
    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            1 => Some(Self::Full(ObjectKind::Commit)),
            2 => Some(Self::Full(ObjectKind::Tree)),
            3 => Some(Self::Full(ObjectKind::Blob)),
            4 => Some(Self::Full(ObjectKind::Tag)),
            Self::OFS_DELTA => Some(Self::OfsDelta),
            Self::REF_DELTA => Some(Self::RefDelta),
            _ => None,
        }
    }

    pub fn code(&self) -> u8 {
        match self {
            Self::Full(ObjectKind::Commit) => 1,
            Self::Full(ObjectKind::Tree) => 2,
            Self::Full(ObjectKind::Blob) => 3,
            Self::Full(ObjectKind::Tag) => 4,
            Self::OfsDelta => Self::OFS_DELTA,
            Self::RefDelta => Self::REF_DELTA,
        }
    }

    pub fn is_delta(&self) -> bool {
        matches!(self, Self::OfsDelta | Self::RefDelta)
    }
}

impl fmt::Display for PackEntryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Full(kind) => write!(f, "{kind}"),
            Self::OfsDelta => f.write_str("ofs-delta"),
            Self::RefDelta => f.write_str("ref-delta"),
        }
    }
}

/// Where a delta entry's base lives.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BaseRef {
    /// Absolute pack offset, already computed from the entry's negative distance.
    Offset(u64),
    /// Digest of the base object.
    Digest(Digest),
}

impl fmt::Display for BaseRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Offset(offset) => write!(f, "at offset {offset}"),
            Self::Digest(digest) => write!(f, "{digest}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn type_codes() {
        assert_eq!(
            PackEntryKind::from_code(1),
            Some(PackEntryKind::Full(ObjectKind::Commit))
        );
        assert_eq!(
            PackEntryKind::from_code(4),
            Some(PackEntryKind::Full(ObjectKind::Tag))
        );
        assert_eq!(PackEntryKind::from_code(6), Some(PackEntryKind::OfsDelta));
        assert_eq!(PackEntryKind::from_code(7), Some(PackEntryKind::RefDelta));
        assert_eq!(PackEntryKind::RefDelta.code(), 7);
        assert_eq!(PackEntryKind::Full(ObjectKind::Blob).code(), 3);
    }

    #[test]
    fn reserved_codes_are_rejected() {
        assert!(PackEntryKind::from_code(0).is_none());
        assert!(PackEntryKind::from_code(5).is_none());
    }

    #[test]
    fn delta_kinds() {
        assert!(PackEntryKind::OfsDelta.is_delta());
        assert!(!PackEntryKind::Full(ObjectKind::Tree).is_delta());
        assert_eq!(PackEntryKind::OfsDelta.to_string(), "ofs-delta");
    }

    #[test]
    fn base_ref_display() {
        assert_eq!(BaseRef::Offset(2422).to_string(), "at offset 2422");
    }
}
