use std::path::PathBuf;

use gitodb_types::Digest;
use thiserror::Error;

use crate::cursor::CursorError;
use crate::entry::BaseRef;

/// Errors that abort loading a pack or index, or a read from one.
#[derive(Debug, Error)]
pub enum PackError {
    #[error("invalid {file} magic: expected {expected}, got {actual}")]
    InvalidMagic {
        file: &'static str,
        expected: String,
        actual: String,
    },

    #[error("unsupported {file} version: {version}")]
    UnsupportedVersion { file: &'static str, version: u32 },

    #[error("malformed pack data at offset {offset}: {reason}")]
    Format { offset: u64, reason: String },

    #[error("pack too large: index entry {position} uses the 64-bit offset table")]
    LargeOffset { position: usize },

    #[error("{file} checksum mismatch")]
    ChecksumMismatch { file: &'static str },

    #[error("CRC-32 mismatch for object {digest} at offset {offset}")]
    CrcMismatch { digest: Digest, offset: u64 },

    #[error("pack and index disagree: {0}")]
    IndexMismatch(String),

    /// The object is present but its content could not be reconstructed.
    #[error("object {digest}: {source}")]
    Object {
        digest: Digest,
        #[source]
        source: ObjectError,
    },

    #[error("failed to load pack {}: {source}", path.display())]
    Load {
        path: PathBuf,
        #[source]
        source: Box<PackError>,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl PackError {
    pub(crate) fn format(offset: u64, reason: impl Into<String>) -> Self {
        Self::Format {
            offset,
            reason: reason.into(),
        }
    }

    pub(crate) fn at(offset: u64) -> impl FnOnce(CursorError) -> Self {
        move |e| Self::format(offset, e.to_string())
    }
}

/// A failure reconstructing one packed object.
///
/// Stored on the object itself; siblings in the same pack are unaffected.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ObjectError {
    #[error("delta base {0} is not in this pack")]
    BaseObjectMissing(BaseRef),

    #[error("delta base at offset {base_offset} could not be resolved")]
    BaseFailed { base_offset: u64 },

    #[error("delta chain loops back to offset {offset}")]
    Cycle { offset: u64 },

    #[error("delta chain is longer than {max}")]
    ChainTooDeep { max: usize },

    #[error("invalid delta: {0}")]
    Delta(#[from] DeltaError),
}

/// Malformed delta instruction streams.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum DeltaError {
    #[error("delta stream truncated at byte {at}")]
    Truncated { at: usize },

    #[error("reserved opcode 0 at byte {at}")]
    ReservedOpcode { at: usize },

    #[error("copy of {len} bytes at offset {offset} exceeds base of {base_len} bytes")]
    CopyOutOfRange { offset: u64, len: u64, base_len: usize },

    #[error("base is {actual} bytes, delta expects {expected}")]
    SourceLength { expected: u64, actual: usize },

    #[error("delta produced {actual} bytes, header declares {expected}")]
    TargetLength { expected: u64, actual: usize },
}

impl From<CursorError> for DeltaError {
    fn from(e: CursorError) -> Self {
        Self::Truncated { at: e.position() }
    }
}

pub type PackResult<T> = Result<T, PackError>;
