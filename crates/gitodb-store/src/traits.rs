use gitodb_types::{Digest, DigestPrefix};

use crate::object::{ObjectKind, RawObject};

/// A read-only source of git objects.
///
/// Implemented by the loose object directory and by the pack set. Sources
/// never interpret payloads; decoding into typed objects happens above them.
/// Each source reports its own error type so callers can tell a corrupt pack
/// from a corrupt loose file.
pub trait ObjectStore: Send + Sync {
    /// Error produced by this source.
    type Error;

    /// Read an object's kind, declared size and payload.
    ///
    /// Returns `Ok(None)` if this source does not hold the object.
    fn read_raw(&self, digest: &Digest) -> Result<Option<RawObject>, Self::Error>;

    /// Every digest held by this source that starts with `prefix`, sorted.
    fn find_prefix(&self, prefix: &DigestPrefix) -> Result<Vec<Digest>, Self::Error>;

    /// Read only the kind of an object.
    ///
    /// Default implementation reads the whole object. Sources that can stop
    /// early should override it.
    fn kind_of(&self, digest: &Digest) -> Result<Option<ObjectKind>, Self::Error> {
        Ok(self.read_raw(digest)?.map(|raw| raw.kind))
    }

    /// Check whether this source holds an object.
    fn contains(&self, digest: &Digest) -> Result<bool, Self::Error> {
        Ok(self.kind_of(digest)?.is_some())
    }
}
