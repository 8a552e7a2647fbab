use std::fs::{self, File};
use std::io::{BufRead, BufReader, ErrorKind, Read};
use std::path::{Path, PathBuf};

use flate2::read::ZlibDecoder;
use gitodb_crypto::ObjectHasher;
use gitodb_types::{Digest, DigestPrefix};
use tracing::{trace, warn};

use crate::error::{StoreError, StoreResult};
use crate::object::{ObjectKind, RawObject};
use crate::traits::ObjectStore;

/// Longest header git writes: `"commit " + 20 digits + NUL`, with slack.
const MAX_HEADER_LEN: u64 = 64;

/// The loose half of an object database: `<objects>/<2-hex>/<38-hex>`.
///
/// Every file holds one zlib stream that inflates to
/// `"<kind> <size>\0<payload>"`.
#[derive(Clone, Debug)]
pub struct LooseObjects {
    objects_dir: PathBuf,
    verify_digests: bool,
}

impl LooseObjects {
    /// Open the loose objects below an `objects/` directory.
    pub fn new(objects_dir: impl Into<PathBuf>) -> Self {
        Self {
            objects_dir: objects_dir.into(),
            verify_digests: false,
        }
    }

    /// Re-hash every object read and reject files whose content does not
    /// match their name.
    pub fn with_digest_verification(mut self, verify: bool) -> Self {
        self.verify_digests = verify;
        self
    }

    /// The `objects/` directory.
    pub fn objects_dir(&self) -> &Path {
        &self.objects_dir
    }

    /// Path of the file that would hold `digest`.
    pub fn path_for(&self, digest: &Digest) -> PathBuf {
        self.objects_dir
            .join(digest.fanout_dir())
            .join(digest.loose_file_name())
    }

    /// Read and fully decode the object named `digest`.
    pub fn read(&self, digest: &Digest) -> StoreResult<Option<RawObject>> {
        let path = self.path_for(digest);
        let framed = match read_inflated(&path) {
            Ok(framed) => framed,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        trace!(digest = %digest, bytes = framed.len(), "read loose object");

        if self.verify_digests {
            let computed = ObjectHasher::hash_framed(&framed);
            if computed != *digest {
                return Err(StoreError::DigestMismatch {
                    expected: *digest,
                    computed,
                });
            }
        }
        decode_loose(&framed).map(Some)
    }

    /// Read only the header of the object named `digest`.
    ///
    /// Inflation stops at the first NUL, so this is cheap even for large
    /// blobs.
    pub fn read_kind(&self, digest: &Digest) -> StoreResult<Option<ObjectKind>> {
        let file = match File::open(self.path_for(digest)) {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let mut reader = BufReader::new(ZlibDecoder::new(file).take(MAX_HEADER_LEN));
        let mut header = Vec::new();
        reader.read_until(0, &mut header)?;
        if header.pop() != Some(0) {
            return Err(StoreError::format(format!(
                "loose object {digest} has no header terminator"
            )));
        }
        let (kind, _) = parse_header(&header)?;
        Ok(Some(kind))
    }

    /// Loose digests beginning with `prefix`, sorted.
    pub fn find_prefix(&self, prefix: &DigestPrefix) -> StoreResult<Vec<Digest>> {
        if let Some(digest) = prefix.to_digest() {
            return Ok(if self.path_for(&digest).is_file() {
                vec![digest]
            } else {
                Vec::new()
            });
        }

        let dir = self.objects_dir.join(prefix.fanout_dir());
        let listing = match fs::read_dir(&dir) {
            Ok(listing) => listing,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut found = Vec::new();
        for dirent in listing {
            let dirent = dirent?;
            let name = dirent.file_name();
            let Some(name) = name.to_str() else { continue };
            if !name.starts_with(prefix.file_name_prefix()) {
                continue;
            }
            // Stray files (temp files, `.lock`) are not objects.
            let Ok(digest) = Digest::from_hex(&format!("{}{name}", prefix.fanout_dir())) else {
                continue;
            };
            if prefix.matches(&digest) {
                found.push(digest);
            }
        }
        found.sort();
        Ok(found)
    }
}

impl ObjectStore for LooseObjects {
    type Error = StoreError;

    fn read_raw(&self, digest: &Digest) -> StoreResult<Option<RawObject>> {
        self.read(digest)
    }

    fn find_prefix(&self, prefix: &DigestPrefix) -> StoreResult<Vec<Digest>> {
        LooseObjects::find_prefix(self, prefix)
    }

    fn kind_of(&self, digest: &Digest) -> StoreResult<Option<ObjectKind>> {
        self.read_kind(digest)
    }

    fn contains(&self, digest: &Digest) -> StoreResult<bool> {
        Ok(self.path_for(digest).is_file())
    }
}

/// Inflate a whole loose object file.
pub fn read_inflated(path: &Path) -> std::io::Result<Vec<u8>> {
    let file = File::open(path)?;
    let mut framed = Vec::new();
    ZlibDecoder::new(file).read_to_end(&mut framed)?;
    Ok(framed)
}

/// Decode a loose object file on disk, without knowing its name.
pub fn read_loose_file(path: &Path) -> StoreResult<RawObject> {
    decode_loose(&read_inflated(path)?)
}

/// Split inflated loose object bytes into header and payload.
///
/// The declared size is kept as metadata; a payload of a different length
/// is logged and accepted.
pub fn decode_loose(framed: &[u8]) -> StoreResult<RawObject> {
    let nul = framed
        .iter()
        .position(|&b| b == 0)
        .ok_or_else(|| StoreError::format("loose object has no header terminator"))?;
    let (kind, size) = parse_header(&framed[..nul])?;
    let payload = framed[nul + 1..].to_vec();
    if payload.len() as u64 != size {
        warn!(
            kind = %kind,
            declared = size,
            actual = payload.len(),
            "loose object size does not match header"
        );
    }
    Ok(RawObject::with_declared_size(kind, size, payload))
}

/// Parse `"<kind> <size>"`.
fn parse_header(header: &[u8]) -> StoreResult<(ObjectKind, u64)> {
    let header = std::str::from_utf8(header)
        .map_err(|_| StoreError::format("loose object header is not ASCII"))?;
    let (kind, size) = header
        .split_once(' ')
        .ok_or_else(|| StoreError::format(format!("malformed loose object header {header:?}")))?;
    let kind = ObjectKind::parse(kind)?;
    let size = size
        .parse::<u64>()
        .map_err(|_| StoreError::format(format!("invalid size in loose object header {header:?}")))?;
    Ok((kind, size))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commit::Commit;
    use crate::testing::{frame, write_loose_object, write_raw_loose};

    const INITIAL_COMMIT: &[u8] = b"tree 9de6c72106b169990a83ce7090c7cad84b6b506b\n\
author aditya <dev@chimeracoder.net> 1428075900 -0400\n\
committer aditya <dev@chimeracoder.net> 1428075900 -0400\n\
\n\
First commit. Create .gitignore";

    fn store() -> (tempfile::TempDir, LooseObjects) {
        let dir = tempfile::tempdir().unwrap();
        let loose = LooseObjects::new(dir.path());
        (dir, loose)
    }

    #[test]
    fn decodes_commit_with_declared_size() {
        let (dir, loose) = store();
        let digest = write_loose_object(dir.path(), ObjectKind::Commit, INITIAL_COMMIT).unwrap();

        let raw = loose.read(&digest).unwrap().unwrap();
        assert_eq!(raw.kind, ObjectKind::Commit);
        assert_eq!(raw.size, INITIAL_COMMIT.len() as u64);

        let commit = Commit::parse(&raw.data, raw.size, Some(digest)).unwrap();
        assert_eq!(
            commit.tree.to_hex(),
            "9de6c72106b169990a83ce7090c7cad84b6b506b"
        );
        assert!(commit.parents.is_empty());
        assert_eq!(commit.message, b"First commit. Create .gitignore");
        assert_eq!(commit.digest, Some(digest));
    }

    #[test]
    fn header_size_mismatch_is_tolerated() {
        let framed = b"commit 190\0tree 9de6c72106b169990a83ce7090c7cad84b6b506b\n";
        let raw = decode_loose(framed).unwrap();
        assert_eq!(raw.size, 190);
        assert_eq!(raw.data.len(), framed.len() - 11);
    }

    #[test]
    fn missing_object_is_none() {
        let (_dir, loose) = store();
        let digest = Digest::from_hex("97eed02ebe122df8fdd853c1215d8775f3d9f1a1").unwrap();
        assert!(loose.read(&digest).unwrap().is_none());
        assert!(loose.read_kind(&digest).unwrap().is_none());
        assert!(!loose.contains(&digest).unwrap());
    }

    #[test]
    fn read_kind_stops_at_header() {
        let (dir, loose) = store();
        let big = vec![b'x'; 1 << 20];
        let digest = write_loose_object(dir.path(), ObjectKind::Blob, &big).unwrap();
        assert_eq!(loose.read_kind(&digest).unwrap(), Some(ObjectKind::Blob));
    }

    #[test]
    fn malformed_headers_are_format_errors() {
        assert!(matches!(decode_loose(b"blob 5").unwrap_err(), StoreError::Format(_)));
        assert!(matches!(decode_loose(b"blob\0abc").unwrap_err(), StoreError::Format(_)));
        assert!(matches!(decode_loose(b"blob five\0abc").unwrap_err(), StoreError::Format(_)));
        assert!(matches!(
            decode_loose(b"note 3\0abc").unwrap_err(),
            StoreError::UnknownKind(_)
        ));
    }

    #[test]
    fn prefix_search_lists_fanout_directory() {
        let (dir, loose) = store();
        let a = write_loose_object(dir.path(), ObjectKind::Blob, b"alpha\n").unwrap();
        let b = write_loose_object(dir.path(), ObjectKind::Blob, b"beta\n").unwrap();

        let prefix = DigestPrefix::parse(&a.to_hex()[..8]).unwrap();
        assert_eq!(loose.find_prefix(&prefix).unwrap(), vec![a]);

        let full = DigestPrefix::from(b);
        assert_eq!(loose.find_prefix(&full).unwrap(), vec![b]);

        let absent = DigestPrefix::parse("ffff").unwrap();
        let expected: Vec<Digest> = [a, b]
            .into_iter()
            .filter(|d| d.to_hex().starts_with("ffff"))
            .collect();
        assert_eq!(loose.find_prefix(&absent).unwrap(), expected);
    }

    #[test]
    fn prefix_search_skips_stray_files() {
        let (dir, loose) = store();
        let a = write_loose_object(dir.path(), ObjectKind::Blob, b"alpha\n").unwrap();
        let stray = dir.path().join(a.fanout_dir()).join("tmp_obj_123");
        fs::write(stray, b"junk").unwrap();

        let prefix = DigestPrefix::parse(&a.to_hex()[..4]).unwrap();
        assert_eq!(loose.find_prefix(&prefix).unwrap(), vec![a]);
    }

    #[test]
    fn verification_rejects_misnamed_file() {
        let (dir, loose) = store();
        let name = Digest::from_hex("1111111111111111111111111111111111111111").unwrap();
        write_raw_loose(dir.path(), &name, &frame(ObjectKind::Blob, b"content\n")).unwrap();

        assert!(loose.read(&name).unwrap().is_some());
        let strict = loose.with_digest_verification(true);
        assert!(matches!(
            strict.read(&name).unwrap_err(),
            StoreError::DigestMismatch { expected, .. } if expected == name
        ));
    }

    #[test]
    fn read_loose_file_needs_no_name() {
        let (dir, loose) = store();
        let digest = write_loose_object(dir.path(), ObjectKind::Tree, b"").unwrap();
        let raw = read_loose_file(&loose.path_for(&digest)).unwrap();
        assert_eq!(raw.kind, ObjectKind::Tree);
        assert!(raw.data.is_empty());
    }
}
