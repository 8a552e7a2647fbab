//! Read-only access to a git repository's objects.
//!
//! Finds the repository's metadata directory, resolves full or abbreviated
//! object ids across loose objects and packs, decodes commits, trees and
//! blobs, and walks first-parent history.
//!
//! Most callers need only [`resolve`] and [`log`]. Open a [`Repository`]
//! directly to reuse decoded packs across many lookups.

pub mod config;
pub mod error;
pub mod history;
pub mod locate;
pub mod repository;

use std::path::Path;

pub use config::{RepositoryConfig, TreeClassification};
pub use error::{SdkError, SdkResult};
pub use locate::find_git_dir;
pub use repository::Repository;

// Re-export key types
pub use gitodb_pack::{PackFile, PackOptions, VerifyReport};
pub use gitodb_store::{
    Blob, Commit, EntryMode, Object, ObjectKind, RawObject, Signature, Tree, TreeEntry,
};
pub use gitodb_types::{Digest, DigestPrefix};

/// Resolve `id` in the repository containing `hint`.
pub fn resolve(hint: impl AsRef<Path>, id: &str) -> SdkResult<Object> {
    Repository::open(hint)?.resolve(id)
}

/// First-parent history of the commit `id` in the repository containing
/// `hint`, starting with that commit.
pub fn log(hint: impl AsRef<Path>, id: &str) -> SdkResult<Vec<Commit>> {
    let repo = Repository::open(hint)?;
    let start = repo.resolve_id(id)?;
    repo.log(&start)
}
