use std::fmt;
use std::str::FromStr;

use gitodb_crypto::ObjectHasher;
use gitodb_types::Digest;
use serde::{Deserialize, Serialize};

use crate::commit::Commit;
use crate::error::{StoreError, StoreResult};
use crate::tree::{RawTreeEntry, Tree};

/// The kind of a stored object.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ObjectKind {
    /// Snapshot pointer: tree, parents, author, committer, message.
    Commit,
    /// Directory listing: ordered `(mode, name, digest)` entries.
    Tree,
    /// Raw file content.
    Blob,
    /// Annotated tag. Decoded at the raw level only.
    Tag,
}

impl ObjectKind {
    /// The tag used in loose object headers.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Commit => "commit",
            Self::Tree => "tree",
            Self::Blob => "blob",
            Self::Tag => "tag",
        }
    }

    /// Parse a loose object header tag.
    pub fn parse(tag: &str) -> StoreResult<Self> {
        match tag {
            "commit" => Ok(Self::Commit),
            "tree" => Ok(Self::Tree),
            "blob" => Ok(Self::Blob),
            "tag" => Ok(Self::Tag),
            other => Err(StoreError::UnknownKind(other.to_string())),
        }
    }

    /// Hasher computing digests for objects of this kind.
    pub fn hasher(&self) -> ObjectHasher {
        match self {
            Self::Commit => ObjectHasher::COMMIT,
            Self::Tree => ObjectHasher::TREE,
            Self::Blob => ObjectHasher::BLOB,
            Self::Tag => ObjectHasher::TAG,
        }
    }
}

impl fmt::Display for ObjectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ObjectKind {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// An undecoded object: kind tag, declared size and payload bytes.
///
/// This is what both the loose object reader and the pack decoder produce.
/// The declared size is advisory; nothing in the store relies on it matching
/// `data.len()`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RawObject {
    /// The type of this object.
    pub kind: ObjectKind,
    /// Size recorded alongside the object.
    pub size: u64,
    /// The payload, without any header.
    pub data: Vec<u8>,
}

impl RawObject {
    /// Create a raw object whose declared size is the payload length.
    pub fn new(kind: ObjectKind, data: Vec<u8>) -> Self {
        let size = data.len() as u64;
        Self { kind, size, data }
    }

    /// Create a raw object carrying a separately recorded size.
    pub fn with_declared_size(kind: ObjectKind, size: u64, data: Vec<u8>) -> Self {
        Self { kind, size, data }
    }

    /// Compute the git digest of this object from its kind and payload.
    pub fn compute_digest(&self) -> Digest {
        self.kind.hasher().hash(&self.data)
    }

    /// Decode into a typed object.
    ///
    /// `classify` is consulted once per tree entry, in stored order, to
    /// decide each child's kind; it is never called for commits or blobs.
    pub fn decode_with<F, E>(self, digest: Option<Digest>, classify: F) -> Result<Object, E>
    where
        F: FnMut(&RawTreeEntry) -> Result<ObjectKind, E>,
        E: From<StoreError>,
    {
        match self.kind {
            ObjectKind::Commit => Ok(Object::Commit(Commit::parse(
                &self.data, self.size, digest,
            )?)),
            ObjectKind::Tree => Ok(Object::Tree(Tree::parse_with(
                &self.data, self.size, digest, classify,
            )?)),
            ObjectKind::Blob => Ok(Object::Blob(Blob::parse(self.data, self.size, digest))),
            ObjectKind::Tag => Err(StoreError::UnsupportedKind(ObjectKind::Tag).into()),
        }
    }

    /// Decode into a typed object, classifying tree entries by mode alone.
    pub fn decode(self, digest: Option<Digest>) -> StoreResult<Object> {
        self.decode_with(digest, RawTreeEntry::kind_from_mode)
    }
}

/// A decoded object. The variant set is closed; every consumer matches
/// exhaustively.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Object {
    Commit(Commit),
    Tree(Tree),
    Blob(Blob),
}

impl Object {
    /// The kind tag of this object.
    pub fn kind(&self) -> ObjectKind {
        match self {
            Self::Commit(_) => ObjectKind::Commit,
            Self::Tree(_) => ObjectKind::Tree,
            Self::Blob(_) => ObjectKind::Blob,
        }
    }

    /// The object's own digest, when known from the lookup that produced it.
    pub fn digest(&self) -> Option<Digest> {
        match self {
            Self::Commit(c) => c.digest,
            Self::Tree(t) => t.digest,
            Self::Blob(b) => b.digest,
        }
    }

    /// Size recorded alongside the object.
    pub fn size(&self) -> u64 {
        match self {
            Self::Commit(c) => c.size,
            Self::Tree(t) => t.size,
            Self::Blob(b) => b.size,
        }
    }

    pub fn as_commit(&self) -> Option<&Commit> {
        match self {
            Self::Commit(c) => Some(c),
            _ => None,
        }
    }

    pub fn as_tree(&self) -> Option<&Tree> {
        match self {
            Self::Tree(t) => Some(t),
            _ => None,
        }
    }

    pub fn as_blob(&self) -> Option<&Blob> {
        match self {
            Self::Blob(b) => Some(b),
            _ => None,
        }
    }

    pub fn into_commit(self) -> Option<Commit> {
        match self {
            Self::Commit(c) => Some(c),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Blob
// ---------------------------------------------------------------------------

/// Raw content object. The payload is opaque and stored verbatim.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Blob {
    pub digest: Option<Digest>,
    pub size: u64,
    pub data: Vec<u8>,
}

impl Blob {
    /// Wrap a blob payload.
    pub fn parse(data: Vec<u8>, size: u64, digest: Option<Digest>) -> Self {
        Self { digest, size, data }
    }

    /// Payload length in bytes.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Returns `true` if the blob is empty.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}
