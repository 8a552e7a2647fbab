use std::path::PathBuf;

use gitodb_pack::PackError;
use gitodb_store::{ObjectKind, StoreError};
use gitodb_types::{Digest, TypeError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SdkError {
    #[error("not a git repository (or any of the parent directories): {}", .0.display())]
    NotAGitRepository(PathBuf),

    #[error("object not found: {0}")]
    ObjectNotFound(String),

    #[error("short object id {prefix} is ambiguous ({} candidates)", candidates.len())]
    AmbiguousPrefix {
        prefix: String,
        candidates: Vec<Digest>,
    },

    #[error("object {digest} is a {kind}, not a commit")]
    NotACommit { digest: Digest, kind: ObjectKind },

    #[error("object {digest} is a {actual}, expected a {expected}")]
    WrongKind {
        digest: Digest,
        expected: ObjectKind,
        actual: ObjectKind,
    },

    #[error("commit {0} appears twice in its own first-parent history")]
    HistoryCycle(Digest),

    #[error("history is longer than {max} commits")]
    HistoryTooLong { max: usize },

    #[error("tree nesting deeper than {max} levels at {path}")]
    TreeTooDeep { path: String, max: usize },

    #[error("invalid .git file {}: {reason}", path.display())]
    InvalidGitFile { path: PathBuf, reason: String },

    #[error("invalid object id: {0}")]
    InvalidId(#[from] TypeError),

    #[error("store error: {0}")]
    Store(#[from] StoreError),

    #[error("pack error: {0}")]
    Pack(#[from] PackError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type SdkResult<T> = Result<T, SdkError>;
