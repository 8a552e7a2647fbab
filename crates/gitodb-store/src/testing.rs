//! Fixture writers for tests.
//!
//! Compiled for this crate's own tests and, through the `test-support`
//! feature, for dependants' tests. The store itself never writes objects.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use flate2::write::ZlibEncoder;
use flate2::Compression;
use gitodb_types::Digest;

use crate::object::ObjectKind;

/// Identity used for every fixture commit.
pub const FIXTURE_IDENTITY: &str = "aditya <dev@chimeracoder.net>";

/// `"<kind> <len>\0" + data`.
pub fn frame(kind: ObjectKind, data: &[u8]) -> Vec<u8> {
    let mut framed = format!("{} {}\0", kind, data.len()).into_bytes();
    framed.extend_from_slice(data);
    framed
}

/// zlib-compress `data` at the default level.
pub fn deflate(data: &[u8]) -> Vec<u8> {
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    // Writing into a Vec cannot fail.
    let _ = encoder.write_all(data);
    encoder.finish().unwrap_or_default()
}

/// Write already framed bytes under an arbitrary name.
pub fn write_raw_loose(objects_dir: &Path, name: &Digest, framed: &[u8]) -> io::Result<PathBuf> {
    let dir = objects_dir.join(name.fanout_dir());
    fs::create_dir_all(&dir)?;
    let path = dir.join(name.loose_file_name());
    fs::write(&path, deflate(framed))?;
    Ok(path)
}

/// Write an object under its real digest and return the digest.
pub fn write_loose_object(objects_dir: &Path, kind: ObjectKind, data: &[u8]) -> io::Result<Digest> {
    let digest = kind.hasher().hash(data);
    write_raw_loose(objects_dir, &digest, &frame(kind, data))?;
    Ok(digest)
}

/// A commit payload with the fixture identity. `seconds` is used for both
/// author and committer time, in the `-0400` zone.
pub fn commit_payload(tree: &Digest, parents: &[Digest], seconds: i64, message: &str) -> Vec<u8> {
    let mut out = format!("tree {tree}\n");
    for parent in parents {
        out.push_str(&format!("parent {parent}\n"));
    }
    out.push_str(&format!("author {FIXTURE_IDENTITY} {seconds} -0400\n"));
    out.push_str(&format!("committer {FIXTURE_IDENTITY} {seconds} -0400\n"));
    out.push('\n');
    out.push_str(message);
    out.into_bytes()
}

/// A tree payload from `(mode, name, digest)` triples, kept in the given order.
pub fn tree_payload(entries: &[(&str, &str, Digest)]) -> Vec<u8> {
    let mut out = Vec::new();
    for (mode, name, digest) in entries {
        out.extend_from_slice(format!("{mode} {name}\0").as_bytes());
        out.extend_from_slice(digest.as_bytes());
    }
    out
}
