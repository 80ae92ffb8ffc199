// Copyright 2026 Daniel Pelikan
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Cutting the inbound byte stream into messages.
//!
//! The device firmware does not frame its replies, so by default every chunk
//! returned by a read is treated as one message. Firmware that terminates
//! replies with a newline can use [`Framing::Line`] instead, which copes with
//! replies that are split across reads or arrive together.

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Maximum bytes buffered while waiting for a line terminator.
pub const MAX_LINE_LENGTH: usize = 4096;

/// How inbound bytes are split into messages.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Framing {
    /// One read, one message.
    #[default]
    Chunk,
    /// Newline-terminated messages.
    Line,
}

/// Turns received chunks into complete messages.
pub struct MessageAssembler {
    framing: Framing,
    buffer: Vec<u8>,
    /// Dropping the rest of an overlong line.
    discarding: bool,
}

impl MessageAssembler {
    pub fn new(framing: Framing) -> Self {
        Self {
            framing,
            buffer: Vec::with_capacity(256),
            discarding: false,
        }
    }

    /// Feed one received chunk.
    ///
    /// Returns the messages completed by this chunk, in order. Blank messages
    /// are dropped.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        match self.framing {
            Framing::Chunk => {
                let text = String::from_utf8_lossy(chunk);
                if text.trim().is_empty() {
                    Vec::new()
                } else {
                    vec![text.into_owned()]
                }
            }
            Framing::Line => self.push_lines(chunk),
        }
    }

    fn push_lines(&mut self, chunk: &[u8]) -> Vec<String> {
        let mut messages = Vec::new();

        for &byte in chunk {
            if byte == b'\n' {
                if self.discarding {
                    self.discarding = false;
                    continue;
                }
                let mut line = std::mem::take(&mut self.buffer);
                if line.last() == Some(&b'\r') {
                    line.pop();
                }
                let text = String::from_utf8_lossy(&line);
                if !text.trim().is_empty() {
                    messages.push(text.into_owned());
                }
                continue;
            }

            if self.discarding {
                continue;
            }
            if self.buffer.len() == MAX_LINE_LENGTH {
                warn!(
                    "Line exceeds {} bytes without terminator, discarding",
                    MAX_LINE_LENGTH
                );
                self.buffer.clear();
                self.discarding = true;
                continue;
            }
            self.buffer.push(byte);
        }

        if !self.buffer.is_empty() {
            debug!("Holding {} bytes of partial line", self.buffer.len());
        }

        messages
    }

    /// Bytes waiting for a terminator.
    pub fn pending(&self) -> usize {
        self.buffer.len()
    }

    pub fn reset(&mut self) {
        self.buffer.clear();
        self.discarding = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chunk_mode_passes_through() {
        let mut assembler = MessageAssembler::new(Framing::Chunk);
        assert_eq!(
            assembler.push(b"outA--src--solar"),
            vec!["outA--src--solar".to_string()]
        );
        // Coalesced replies stay together in chunk mode.
        assert_eq!(
            assembler.push(b"outA--src--solaroutB--src--grid"),
            vec!["outA--src--solaroutB--src--grid".to_string()]
        );
    }

    #[test]
    fn test_chunk_mode_skips_blank() {
        let mut assembler = MessageAssembler::new(Framing::Chunk);
        assert!(assembler.push(b"").is_empty());
        assert!(assembler.push(b" \r\n").is_empty());
    }

    #[test]
    fn test_line_mode_splits_coalesced() {
        let mut assembler = MessageAssembler::new(Framing::Line);
        let messages = assembler.push(b"outA--src--solar\r\noutB--src--grid\n");
        assert_eq!(messages, vec!["outA--src--solar", "outB--src--grid"]);
        assert_eq!(assembler.pending(), 0);
    }

    #[test]
    fn test_line_mode_joins_fragments() {
        let mut assembler = MessageAssembler::new(Framing::Line);
        assert!(assembler.push(b"outB--s").is_empty());
        assert_eq!(assembler.pending(), 7);
        assert_eq!(assembler.push(b"rc--solar\n\n"), vec!["outB--src--solar"]);
    }

    #[test]
    fn test_line_mode_discards_overlong() {
        let mut assembler = MessageAssembler::new(Framing::Line);
        let junk = vec![b'x'; MAX_LINE_LENGTH + 10];
        assert!(assembler.push(&junk).is_empty());
        assert_eq!(assembler.pending(), 0);

        // The tail of the overlong line is dropped up to its terminator.
        assert!(assembler.push(b"outA--src--solar\n").is_empty());
        assert_eq!(assembler.push(b"outB--src--grid\n"), vec!["outB--src--grid"]);

        assert!(assembler.push(&junk).is_empty());
        assembler.reset();
        assert_eq!(assembler.push(b"outA--src--grid\n"), vec!["outA--src--grid"]);
    }

    #[test]
    fn test_line_mode_overlong_within_one_chunk() {
        let mut assembler = MessageAssembler::new(Framing::Line);
        let mut chunk = vec![b'x'; MAX_LINE_LENGTH + 3];
        chunk.push(b'\n');
        assert!(assembler.push(&chunk).is_empty());
        assert_eq!(assembler.pending(), 0);
    }
}
