//! Git object model and loose object storage.
//!
//! This crate knows what a git object *is*: the closed set of kinds, how a
//! commit, tree or blob payload is decoded, and how a loose object file in
//! `.git/objects/<2-hex>/<38-hex>` is laid out. It does not know about packs
//! or about finding a repository; those live in `gitodb-pack` and
//! `gitodb-sdk`.
//!
//! # Object Types
//!
//! - [`Commit`] -- tree, ordered parents, author, committer, message
//! - [`Tree`] -- ordered `(mode, name, digest, kind)` entries
//! - [`Blob`] -- opaque content
//!
//! Annotated tags exist at the [`RawObject`] level only.
//!
//! # Sources
//!
//! Every object source implements the read-only [`ObjectStore`] trait:
//!
//! - [`LooseObjects`] -- one zlib stream per file

pub mod commit;
pub mod error;
pub mod loose;
pub mod object;
#[cfg(any(test, feature = "test-support"))]
pub mod testing;
pub mod traits;
pub mod tree;

pub use commit::{Commit, Signature};
pub use error::{StoreError, StoreResult};
pub use loose::{decode_loose, read_loose_file, LooseObjects};
pub use object::{Blob, Object, ObjectKind, RawObject};
pub use traits::ObjectStore;
pub use tree::{EntryMode, RawTreeEntry, Tree, TreeEntry};
