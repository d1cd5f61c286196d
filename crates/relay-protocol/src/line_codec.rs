// crates/relay-protocol/src/line_codec.rs

//! Newline-delimited framing.
//!
//! TCP delivers bytes, not messages: one `read` may carry half a line or
//! several. [`LineBuffer`] accumulates reads and hands out complete lines
//! only, in arrival order.
//!
//! - Lines end at `\n`; a trailing `\r` is stripped.
//! - Blank lines are skipped.
//! - A partial line longer than the configured maximum is discarded up to
//!   its terminating newline and reported once as [`LineError::TooLong`].

use bytes::{Bytes, BytesMut};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum LineError {
    #[error("line exceeds {max} bytes ({len} buffered)")]
    TooLong { len: usize, max: usize },
}

/// Accumulates raw bytes and yields complete lines.
#[derive(Debug)]
pub struct LineBuffer {
    buf: BytesMut,
    max_line: usize,
    discarding: bool,
}

impl LineBuffer {
    pub fn new(max_line: usize) -> Self {
        Self {
            buf: BytesMut::with_capacity(4096),
            max_line,
            discarding: false,
        }
    }

    /// Append freshly read bytes.
    pub fn extend(&mut self, data: &[u8]) {
        self.buf.extend_from_slice(data);
    }

    /// Pop the next complete, non-blank line (without its terminator).
    ///
    /// Returns `Ok(None)` when no complete line is buffered yet.
    pub fn next_line(&mut self) -> Result<Option<Bytes>, LineError> {
        loop {
            let Some(pos) = self.buf.iter().position(|&b| b == b'\n') else {
                if !self.discarding && self.buf.len() > self.max_line {
                    let len = self.buf.len();
                    self.buf.clear();
                    self.discarding = true;
                    return Err(LineError::TooLong {
                        len,
                        max: self.max_line,
                    });
                }
                if self.discarding {
                    self.buf.clear();
                }
                return Ok(None);
            };

            let mut line = self.buf.split_to(pos + 1);
            if self.discarding {
                // Tail of an oversized line.
                self.discarding = false;
                continue;
            }

            line.truncate(pos);
            if line.last() == Some(&b'\r') {
                line.truncate(pos - 1);
            }
            if line.iter().all(u8::is_ascii_whitespace) {
                continue;
            }
            if line.len() > self.max_line {
                return Err(LineError::TooLong {
                    len: line.len(),
                    max: self.max_line,
                });
            }
            return Ok(Some(line.freeze()));
        }
    }

    /// Bytes buffered but not yet terminated by a newline.
    pub fn pending(&self) -> usize {
        self.buf.len()
    }
}

/// Frame one JSON document as a TCP line.
pub fn encode_line(json: &str, out: &mut BytesMut) {
    out.reserve(json.len() + 1);
    out.extend_from_slice(json.as_bytes());
    out.extend_from_slice(b"\n");
}
