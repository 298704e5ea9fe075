//! Splitting a raw byte stream into text lines.
//!
//! Graphite senders write one metric per `\n`-terminated line, but reads from
//! a socket or pipe arrive in arbitrary chunks. [`LineSplitter`] buffers the
//! partial line at the end of each chunk until its terminator shows up.
//!
//! The buffer is bounded: a line longer than the configured maximum is
//! dropped, and the splitter resynchronizes at the next `\n`.

use tracing::warn;

/// Default upper bound on a single line, in bytes, excluding the `\n`.
pub const DEFAULT_MAX_LINE_LENGTH: usize = 64 * 1024;

/// Incremental `\n` line splitter.
#[derive(Debug)]
pub struct LineSplitter {
    buffer: Vec<u8>,
    max_line_length: usize,
    discarding: bool,
    dropped: u64,
}

impl Default for LineSplitter {
    fn default() -> Self {
        Self::with_max_line_length(DEFAULT_MAX_LINE_LENGTH)
    }
}

impl LineSplitter {
    /// Creates an empty splitter with [`DEFAULT_MAX_LINE_LENGTH`].
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty splitter that drops lines longer than
    /// `max_line_length` bytes.
    pub fn with_max_line_length(max_line_length: usize) -> Self {
        Self {
            buffer: Vec::new(),
            max_line_length,
            discarding: false,
            dropped: 0,
        }
    }

    /// Feeds a chunk of bytes and returns every line it completes.
    ///
    /// Lines are returned without their terminator; a `\r` before the `\n` is
    /// stripped too. Invalid UTF-8 is replaced rather than rejected. Lines
    /// over the length limit are dropped and counted in [`dropped`](Self::dropped).
    ///
    /// Only `data` is scanned for terminators; buffered bytes are never
    /// rescanned.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use graphite_codec::LineSplitter;
    ///
    /// let mut splitter = LineSplitter::new();
    /// assert!(splitter.push(b"cpu 1 10").is_empty());
    /// assert_eq!(splitter.push(b"00\nmem 2 1000\n"), vec!["cpu 1 1000", "mem 2 1000"]);
    /// ```
    pub fn push(&mut self, data: &[u8]) -> Vec<String> {
        let mut lines = Vec::new();
        let mut rest = data;

        while let Some(pos) = memchr::memchr(b'\n', rest) {
            let segment = &rest[..pos];
            rest = &rest[pos + 1..];

            if self.discarding {
                // Terminator of a line already dropped.
                self.discarding = false;
                continue;
            }

            let length = self.buffer.len() + segment.len();
            if length > self.max_line_length {
                self.drop_line(length);
                self.buffer.clear();
            } else if self.buffer.is_empty() {
                lines.push(to_line(segment));
            } else {
                self.buffer.extend_from_slice(segment);
                lines.push(to_line(&self.buffer));
                self.buffer.clear();
            }
        }

        if !self.discarding && !rest.is_empty() {
            let length = self.buffer.len() + rest.len();
            if length > self.max_line_length {
                self.drop_line(length);
                self.buffer.clear();
                self.discarding = true;
            } else {
                self.buffer.extend_from_slice(rest);
            }
        }

        lines
    }

    /// Returns the unterminated remainder, if any, and clears the buffer.
    ///
    /// Call this once the stream has ended.
    pub fn flush(&mut self) -> Option<String> {
        self.discarding = false;
        if self.buffer.is_empty() {
            return None;
        }
        let remainder = std::mem::take(&mut self.buffer);
        Some(to_line(&remainder))
    }

    /// Number of buffered bytes not yet part of a complete line.
    pub fn pending(&self) -> usize {
        self.buffer.len()
    }

    /// Number of lines dropped for exceeding the length limit.
    pub fn dropped(&self) -> u64 {
        self.dropped
    }

    /// The longest line, in bytes, this splitter will return.
    pub fn max_line_length(&self) -> usize {
        self.max_line_length
    }

    fn drop_line(&mut self, length: usize) {
        self.dropped += 1;
        warn!(
            length,
            limit = self.max_line_length,
            "dropping line that exceeds the maximum length"
        );
    }
}

fn to_line(bytes: &[u8]) -> String {
    let bytes = bytes.strip_suffix(b"\r").unwrap_or(bytes);
    String::from_utf8_lossy(bytes).into_owned()
}
