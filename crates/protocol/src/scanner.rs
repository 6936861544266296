//! Async scanner for the carbon plaintext protocol.
//!
//! Frames newline-delimited lines off a byte stream and parses each into
//! `(name, timestamp, value)`. Malformed lines never terminate the scan:
//! they are counted and skipped so one bad client line cannot take down the
//! whole connection.
//!
//! # Wire format
//!
//! ```text
//! name value timestamp\n
//! ```
//!
//! `name` is a dotted segment sequence, `value` a decimal float, and
//! `timestamp` integer Unix seconds. CRLF line endings are tolerated.

use std::io;
use std::ops::Range;

use bytes::BytesMut;
use tokio::io::{AsyncRead, AsyncReadExt};

use crate::types::{UnixNanos, NANOS_PER_SEC};

/// Maximum accepted line length. Longer lines are malformed.
pub const MAX_LINE_LENGTH: usize = 4096;

/// Initial per-connection read buffer capacity.
const READ_BUFFER_CAPACITY: usize = 64 * 1024;

/// Streaming scanner over a carbon plaintext byte stream.
pub struct CarbonScanner<R> {
    stream: R,
    buf: BytesMut,

    /// The most recently accepted line; `metric()` borrows into it.
    line: BytesMut,
    name: Range<usize>,
    timestamp: UnixNanos,
    value: f64,

    /// Lines discarded as unparseable since the last drain.
    malformed: u64,

    /// Set while discarding the remainder of an oversized line.
    skipping: bool,

    error: Option<io::Error>,
    eof: bool,
}

impl<R: AsyncRead + Unpin> CarbonScanner<R> {
    pub fn new(stream: R) -> Self {
        Self {
            stream,
            buf: BytesMut::with_capacity(READ_BUFFER_CAPACITY),
            line: BytesMut::new(),
            name: 0..0,
            timestamp: 0,
            value: 0.0,
            malformed: 0,
            skipping: false,
            error: None,
            eof: false,
        }
    }

    /// Advance to the next well-formed metric line.
    ///
    /// Returns false on end of stream or transport error; `error()`
    /// distinguishes the two. Malformed lines are counted and skipped
    /// without returning.
    pub async fn advance(&mut self) -> bool {
        loop {
            // Drain complete lines already buffered.
            while let Some(pos) = memchr::memchr(b'\n', &self.buf) {
                let line = self.buf.split_to(pos + 1);
                if self.skipping {
                    // Tail of a line that was already discarded as oversized.
                    self.skipping = false;
                    continue;
                }
                if self.accept(line) {
                    return true;
                }
            }

            if self.eof {
                // A final unterminated line is still a line.
                if !self.buf.is_empty() && !self.skipping {
                    let line = self.buf.split();
                    if self.accept(line) {
                        return true;
                    }
                }
                return false;
            }

            // No newline in sight and the frame is already over the limit:
            // count it once and discard until the next newline.
            if self.buf.len() > MAX_LINE_LENGTH && !self.skipping {
                self.buf.clear();
                self.malformed += 1;
                self.skipping = true;
            } else if self.skipping {
                self.buf.clear();
            }

            match self.stream.read_buf(&mut self.buf).await {
                Ok(0) => self.eof = true,
                Ok(_) => {}
                Err(err) => {
                    self.error = Some(err);
                    return false;
                }
            }
        }
    }

    /// The most recently scanned metric.
    ///
    /// The name view is only valid until the next `advance`; callers that
    /// retain it must copy.
    pub fn metric(&self) -> (&[u8], UnixNanos, f64) {
        (&self.line[self.name.clone()], self.timestamp, self.value)
    }

    /// Lines discarded as unparseable since the last `take_malformed`.
    pub fn malformed_count(&self) -> u64 {
        self.malformed
    }

    /// Drain the malformed-line count, resetting it to zero.
    pub fn take_malformed(&mut self) -> u64 {
        std::mem::take(&mut self.malformed)
    }

    /// The transport error that terminated the scan, if any.
    pub fn error(&self) -> Option<&io::Error> {
        self.error.as_ref()
    }

    /// Parse a framed line, stashing the result on success.
    fn accept(&mut self, line: BytesMut) -> bool {
        if line.len() > MAX_LINE_LENGTH {
            self.malformed += 1;
            return false;
        }
        match parse_line(trim_line_ending(&line)) {
            Some((name, value, timestamp)) => {
                self.line = line;
                self.name = name;
                self.value = value;
                self.timestamp = timestamp;
                true
            }
            None => {
                self.malformed += 1;
                false
            }
        }
    }
}

/// Strip a trailing LF and optional CR.
fn trim_line_ending(line: &[u8]) -> &[u8] {
    let line = line.strip_suffix(b"\n").unwrap_or(line);
    line.strip_suffix(b"\r").unwrap_or(line)
}

/// Parse `name value timestamp` out of one line.
///
/// Returns the name's byte range within the line so callers can borrow it
/// without copying.
fn parse_line(line: &[u8]) -> Option<(Range<usize>, f64, UnixNanos)> {
    let name = next_field(line, 0)?;
    let value = next_field(line, name.end)?;
    let timestamp = next_field(line, value.end)?;
    if next_field(line, timestamp.end).is_some() {
        return None;
    }

    let value: f64 = std::str::from_utf8(&line[value]).ok()?.parse().ok()?;
    let secs: i64 = std::str::from_utf8(&line[timestamp]).ok()?.parse().ok()?;
    let nanos = secs.checked_mul(NANOS_PER_SEC)?;

    Some((name, value, nanos))
}

/// The next whitespace-delimited field at or after `start`.
fn next_field(line: &[u8], mut start: usize) -> Option<Range<usize>> {
    while start < line.len() && line[start].is_ascii_whitespace() {
        start += 1;
    }
    if start == line.len() {
        return None;
    }
    let mut end = start;
    while end < line.len() && !line[end].is_ascii_whitespace() {
        end += 1;
    }
    Some(start..end)
}

#[cfg(test)]
#[path = "scanner_test.rs"]
mod scanner_test;
