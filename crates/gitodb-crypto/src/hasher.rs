use sha1::{Digest as Sha1Digest, Sha1};
use gitodb_types::Digest;

/// Git object hasher.
///
/// A git object's identity is the SHA-1 of a `"<kind> <len>\0"` header
/// followed by the payload. The kind tag is part of the hash, so a blob and
/// a tree with identical bytes get different digests.
pub struct ObjectHasher {
    kind: &'static str,
}

impl ObjectHasher {
    /// Hasher for commit objects.
    pub const COMMIT: Self = Self { kind: "commit" };
    /// Hasher for tree objects.
    pub const TREE: Self = Self { kind: "tree" };
    /// Hasher for blob objects.
    pub const BLOB: Self = Self { kind: "blob" };
    /// Hasher for annotated tag objects.
    pub const TAG: Self = Self { kind: "tag" };

    /// Create a hasher for an arbitrary kind tag.
    pub const fn new(kind: &'static str) -> Self {
        Self { kind }
    }

    /// Hash a payload under this hasher's kind tag.
    pub fn hash(&self, data: &[u8]) -> Digest {
        let mut hasher = Sha1::new();
        hasher.update(self.kind.as_bytes());
        hasher.update(b" ");
        hasher.update(data.len().to_string().as_bytes());
        hasher.update([0u8]);
        hasher.update(data);
        let mut out = [0u8; 20];
        out.copy_from_slice(&hasher.finalize());
        Digest::from(out)
    }

    /// Hash a payload that already carries its `"<kind> <len>\0"` header,
    /// as found inside a decompressed loose object file.
    pub fn hash_framed(framed: &[u8]) -> Digest {
        Digest::from(Self::raw_hash(framed))
    }

    /// Verify that a payload produces the expected digest.
    pub fn verify(&self, data: &[u8], expected: &Digest) -> bool {
        self.hash(data) == *expected
    }

    /// Plain SHA-1 without any object header.
    pub fn raw_hash(data: &[u8]) -> [u8; 20] {
        let mut hasher = Sha1::new();
        hasher.update(data);
        let mut out = [0u8; 20];
        out.copy_from_slice(&hasher.finalize());
        out
    }

    /// The kind tag used by this hasher.
    pub fn kind(&self) -> &str {
        self.kind
    }
}
