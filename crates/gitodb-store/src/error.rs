use gitodb_types::{Digest, TypeError};

use crate::object::ObjectKind;

/// Errors from object decoding and loose object storage.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The requested object was not found.
    #[error("object not found: {0}")]
    NotFound(Digest),

    /// The object bytes do not follow the expected layout.
    #[error("malformed object: {0}")]
    Format(String),

    /// The object header names a kind this store does not know.
    #[error("unknown object kind: {0:?}")]
    UnknownKind(String),

    /// The object is valid at the raw level but has no typed representation.
    #[error("unsupported object kind: {0}")]
    UnsupportedKind(ObjectKind),

    /// Recomputed content hash does not match the object's name.
    #[error("digest mismatch: expected {expected}, computed {computed}")]
    DigestMismatch { expected: Digest, computed: Digest },

    /// A digest embedded in the object could not be decoded.
    #[error("invalid digest: {0}")]
    InvalidDigest(#[from] TypeError),

    /// I/O error while reading loose objects.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl StoreError {
    pub(crate) fn format(reason: impl Into<String>) -> Self {
        Self::Format(reason.into())
    }
}

/// Result alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
