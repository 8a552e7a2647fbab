use std::borrow::Cow;
use std::fmt;

use chrono::{DateTime, FixedOffset, TimeZone};
use gitodb_types::Digest;
use serde::Serialize;

use crate::error::{StoreError, StoreResult};

// ---------------------------------------------------------------------------
// Signature
// ---------------------------------------------------------------------------

/// An `author` or `committer` value: `<name and email> <unix-seconds> <±HHMM>`.
///
/// The identity part is opaque. It ends at the first `>` after the first `<`;
/// everything after it is the timestamp and the UTC offset.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Signature {
    raw: String,
    identity: String,
    when: DateTime<FixedOffset>,
}

impl Signature {
    /// Parse an identity/timestamp string.
    pub fn parse(value: &str) -> StoreResult<Self> {
        let raw = value.trim();
        let open = raw
            .find('<')
            .ok_or_else(|| StoreError::format(format!("signature without email: {raw:?}")))?;
        let close = raw[open..]
            .find('>')
            .map(|i| open + i)
            .ok_or_else(|| StoreError::format(format!("unterminated email in {raw:?}")))?;

        let mut fields = raw[close + 1..].split_whitespace();
        let seconds = fields
            .next()
            .ok_or_else(|| StoreError::format(format!("signature without timestamp: {raw:?}")))?;
        let seconds: i64 = seconds
            .parse()
            .map_err(|_| StoreError::format(format!("invalid timestamp {seconds:?}")))?;
        let offset = fields
            .next()
            .ok_or_else(|| StoreError::format(format!("signature without UTC offset: {raw:?}")))?;
        if fields.next().is_some() {
            return Err(StoreError::format(format!("trailing data in signature {raw:?}")));
        }

        let offset = parse_utc_offset(offset)?;
        let when = offset
            .timestamp_opt(seconds, 0)
            .single()
            .ok_or_else(|| StoreError::format(format!("timestamp out of range: {seconds}")))?;

        Ok(Self {
            raw: raw.to_string(),
            identity: raw[..=close].to_string(),
            when,
        })
    }

    /// The value exactly as it appeared in the commit (trimmed).
    pub fn raw(&self) -> &str {
        &self.raw
    }

    /// `name <email>`.
    pub fn identity(&self) -> &str {
        &self.identity
    }

    /// The name before the email bracket.
    pub fn name(&self) -> &str {
        match self.identity.find('<') {
            Some(i) => self.identity[..i].trim(),
            None => &self.identity,
        }
    }

    /// The text between the email brackets.
    pub fn email(&self) -> &str {
        let start = self.identity.find('<').map(|i| i + 1).unwrap_or(0);
        let end = self.identity.len().saturating_sub(1).max(start);
        &self.identity[start..end]
    }

    /// Point in time, carrying the recorded UTC offset.
    pub fn when(&self) -> DateTime<FixedOffset> {
        self.when
    }

    /// Unix timestamp in seconds.
    pub fn timestamp(&self) -> i64 {
        self.when.timestamp()
    }
}

impl fmt::Display for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

/// Parse `+HHMM` / `-HHMM`.
fn parse_utc_offset(s: &str) -> StoreResult<FixedOffset> {
    let invalid = || StoreError::format(format!("invalid UTC offset {s:?}"));
    let bytes = s.as_bytes();
    if bytes.len() != 5 || !bytes[1..].iter().all(u8::is_ascii_digit) {
        return Err(invalid());
    }
    let sign = match bytes[0] {
        b'+' => 1,
        b'-' => -1,
        _ => return Err(invalid()),
    };
    let hours: i32 = s[1..3].parse().map_err(|_| invalid())?;
    let minutes: i32 = s[3..5].parse().map_err(|_| invalid())?;
    if minutes >= 60 {
        return Err(invalid());
    }
    FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60)).ok_or_else(invalid)
}

// ---------------------------------------------------------------------------
// Commit
// ---------------------------------------------------------------------------

/// A decoded commit.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Commit {
    /// Own digest, when known from the lookup.
    pub digest: Option<Digest>,
    /// Root tree of the snapshot.
    pub tree: Digest,
    /// Parents in header order; the first parent is always index 0.
    pub parents: Vec<Digest>,
    pub author: Signature,
    pub committer: Signature,
    /// Everything after the first blank line, byte for byte.
    pub message: Vec<u8>,
    /// Size recorded alongside the object.
    pub size: u64,
}

impl Commit {
    /// Parse a commit payload.
    ///
    /// Header lines are `<key> <value>` up to the first blank line. Only
    /// `tree`, `parent`, `author` and `committer` are accepted.
    pub fn parse(data: &[u8], size: u64, digest: Option<Digest>) -> StoreResult<Self> {
        let mut tree = None;
        let mut parents = Vec::new();
        let mut author = None;
        let mut committer = None;
        let mut message = Vec::new();

        let mut pos = 0;
        while pos < data.len() {
            let end = data[pos..]
                .iter()
                .position(|&b| b == b'\n')
                .map(|i| pos + i);
            let line = &data[pos..end.unwrap_or(data.len())];
            let next = end.map_or(data.len(), |e| e + 1);

            if line.iter().all(u8::is_ascii_whitespace) {
                message = data[next..].to_vec();
                break;
            }

            let line = std::str::from_utf8(line)
                .map_err(|_| StoreError::format("commit header is not valid UTF-8"))?;
            let (key, value) = line.split_once(' ').unwrap_or((line, ""));
            match key {
                "tree" => tree = Some(parse_header_digest(key, value)?),
                "parent" => parents.push(parse_header_digest(key, value)?),
                "author" => author = Some(Signature::parse(value)?),
                "committer" => committer = Some(Signature::parse(value)?),
                other => {
                    return Err(StoreError::format(format!(
                        "unknown commit header {other:?}"
                    )))
                }
            }
            pos = next;
        }

        Ok(Self {
            digest,
            tree: tree.ok_or_else(|| StoreError::format("commit without tree"))?,
            parents,
            author: author.ok_or_else(|| StoreError::format("commit without author"))?,
            committer: committer
                .ok_or_else(|| StoreError::format("commit without committer"))?,
            message,
            size,
        })
    }

    /// The parent followed by first-parent history, if any.
    pub fn first_parent(&self) -> Option<&Digest> {
        self.parents.first()
    }

    /// Returns `true` for a commit without parents.
    pub fn is_root(&self) -> bool {
        self.parents.is_empty()
    }

    /// The message as text, replacing invalid UTF-8.
    pub fn message_text(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.message)
    }

    /// First line of the message.
    pub fn summary(&self) -> String {
        self.message_text()
            .lines()
            .next()
            .unwrap_or_default()
            .to_string()
    }
}

fn parse_header_digest(key: &str, value: &str) -> StoreResult<Digest> {
    Digest::from_hex(value.trim())
        .map_err(|e| StoreError::format(format!("invalid {key} digest {value:?}: {e}")))
}
