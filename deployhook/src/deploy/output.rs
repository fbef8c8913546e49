//! Bounded capture of deploy process output

use std::collections::VecDeque;

/// Marker prepended when older output was dropped
pub const TRUNCATION_MARKER: &str = "[... earlier output truncated ...]\n";

/// Accumulates raw output, keeping only the most recent `max_bytes`.
///
/// Bytes are decoded once, in `into_string`, so a character split across
/// two reads survives intact.
#[derive(Debug, Clone)]
pub struct OutputBuffer {
    bytes: VecDeque<u8>,
    max_bytes: usize,
    truncated: bool,
}

impl OutputBuffer {
    pub fn new(max_bytes: usize) -> Self {
        Self {
            bytes: VecDeque::new(),
            max_bytes,
            truncated: false,
        }
    }

    pub fn push(&mut self, chunk: &[u8]) {
        self.bytes.extend(chunk);

        if self.bytes.len() > self.max_bytes {
            let excess = self.bytes.len() - self.max_bytes;
            self.bytes.drain(..excess);
            self.truncated = true;
        }
    }

    /// Captured text, with a marker in front if anything was dropped.
    /// Invalid UTF-8 is replaced, not rejected.
    pub fn into_string(self) -> String {
        let mut bytes = Vec::from(self.bytes);
        if !self.truncated {
            return String::from_utf8_lossy(&bytes).into_owned();
        }

        // The cut may have landed inside a character; drop its tail bytes.
        let partial = bytes
            .iter()
            .take(3)
            .take_while(|b| is_continuation(**b))
            .count();
        bytes.drain(..partial);

        format!("{}{}", TRUNCATION_MARKER, String::from_utf8_lossy(&bytes))
    }
}

fn is_continuation(byte: u8) -> bool {
    byte & 0b1100_0000 == 0b1000_0000
}
