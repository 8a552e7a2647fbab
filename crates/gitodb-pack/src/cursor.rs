//! Explicit cursor over an in-memory pack or delta stream.
//!
//! Every decoder consumes exactly its own bytes and leaves the cursor at the
//! first byte it did not need, so the next decoder can start where it ended.

use flate2::{Decompress, FlushDecompress, Status};
use gitodb_types::{Digest, DIGEST_LEN};
use thiserror::Error;

/// Output chunk size for zlib inflation.
const INFLATE_CHUNK: usize = 16 * 1024;

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum CursorError {
    #[error("need {wanted} bytes at {at}, only {available} left")]
    Truncated {
        at: usize,
        wanted: usize,
        available: usize,
    },

    #[error("variable-length integer at {at} overflows 64 bits")]
    Overflow { at: usize },

    #[error("zlib stream at {at}: {reason}")]
    Inflate { at: usize, reason: String },
}

impl CursorError {
    /// Byte position the error refers to.
    pub fn position(&self) -> usize {
        match self {
            Self::Truncated { at, .. } | Self::Overflow { at } | Self::Inflate { at, .. } => *at,
        }
    }
}

#[derive(Clone, Debug)]
pub struct ByteCursor<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> ByteCursor<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    /// A cursor positioned at `pos`.
    pub fn at(data: &'a [u8], pos: usize) -> Self {
        Self { data, pos }
    }

    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn remaining(&self) -> usize {
        self.data.len().saturating_sub(self.pos)
    }

    pub fn is_empty(&self) -> bool {
        self.remaining() == 0
    }

    pub fn read_u8(&mut self) -> Result<u8, CursorError> {
        Ok(self.read_bytes(1)?[0])
    }

    /// Read exactly `n` bytes.
    pub fn read_bytes(&mut self, n: usize) -> Result<&'a [u8], CursorError> {
        if self.remaining() < n {
            return Err(CursorError::Truncated {
                at: self.pos,
                wanted: n,
                available: self.remaining(),
            });
        }
        let bytes = &self.data[self.pos..self.pos + n];
        self.pos += n;
        Ok(bytes)
    }

    pub fn read_u32_be(&mut self) -> Result<u32, CursorError> {
        let bytes = self.read_bytes(4)?;
        Ok(u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }

    /// Read a raw 20-byte digest.
    pub fn read_digest(&mut self) -> Result<Digest, CursorError> {
        let mut raw = [0u8; DIGEST_LEN];
        raw.copy_from_slice(self.read_bytes(DIGEST_LEN)?);
        Ok(Digest::from(raw))
    }

    /// Inflate the zlib stream starting at the cursor.
    ///
    /// The stream carries no length prefix: the decompressor is driven until
    /// it reports the end of the stream, and the cursor is left on the byte
    /// after the last one zlib consumed. `limit` caps the inflated size; a
    /// stream producing more is an error.
    pub fn inflate(&mut self, limit: usize) -> Result<Vec<u8>, CursorError> {
        let start = self.pos;
        let input = &self.data[start.min(self.data.len())..];
        let mut de = Decompress::new(true);
        let mut out = Vec::with_capacity(limit.min(1 << 20));
        let mut chunk = [0u8; INFLATE_CHUNK];
        let mut in_pos = 0usize;

        loop {
            let before_in = de.total_in();
            let before_out = de.total_out();
            let status = de
                .decompress(&input[in_pos..], &mut chunk, FlushDecompress::None)
                .map_err(|e| CursorError::Inflate {
                    at: start,
                    reason: e.to_string(),
                })?;
            let consumed = (de.total_in() - before_in) as usize;
            let produced = (de.total_out() - before_out) as usize;
            in_pos += consumed;

            if out.len() + produced > limit {
                return Err(CursorError::Inflate {
                    at: start,
                    reason: format!("inflates past {limit} bytes"),
                });
            }
            out.extend_from_slice(&chunk[..produced]);

            match status {
                Status::StreamEnd => {
                    self.pos = start + in_pos;
                    return Ok(out);
                }
                Status::Ok | Status::BufError if consumed == 0 && produced == 0 => {
                    return Err(CursorError::Inflate {
                        at: start,
                        reason: if in_pos >= input.len() {
                            "stream truncated".to_string()
                        } else {
                            "stream stalled".to_string()
                        },
                    });
                }
                Status::Ok | Status::BufError => {}
            }
        }
    }
}
