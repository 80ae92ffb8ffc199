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

//! Wire protocol for switching output sources.
//!
//! Messages are plain ASCII of the form `<output>--src--<source>`, e.g.
//! `outA--src--solar`. The same shape is used in both directions: the app
//! sends it as a command and the device echoes it back once the relay has
//! switched.

use std::fmt;

/// Marker separating the output tag from the source tag.
pub const DELIMITER: &str = "--src--";

/// One of the two independently switched outputs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OutputId {
    A,
    B,
}

impl OutputId {
    /// All outputs, in display order.
    pub const ALL: [OutputId; 2] = [OutputId::A, OutputId::B];

    /// Parse from the wire tag.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "outA" => Some(Self::A),
            "outB" => Some(Self::B),
            _ => None,
        }
    }

    /// Wire tag.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::A => "outA",
            Self::B => "outB",
        }
    }

    /// Human readable name.
    pub fn label(&self) -> &'static str {
        match self {
            Self::A => "Output A",
            Self::B => "Output B",
        }
    }
}

/// Power origin selected for an output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SourceChoice {
    Solar,
    Grid,
}

impl SourceChoice {
    /// Parse from the wire tag.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "solar" => Some(Self::Solar),
            "grid" => Some(Self::Grid),
            _ => None,
        }
    }

    /// Wire tag.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Solar => "solar",
            Self::Grid => "grid",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Solar => "Solar",
            Self::Grid => "Grid",
        }
    }

    /// The other source.
    pub fn toggled(self) -> Self {
        match self {
            Self::Solar => Self::Grid,
            Self::Grid => Self::Solar,
        }
    }
}

/// Request to switch one output to a source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Command {
    pub output: OutputId,
    pub source: SourceChoice,
}

impl Command {
    pub fn new(output: OutputId, source: SourceChoice) -> Self {
        Self { output, source }
    }
}

/// Result of decoding one inbound message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InboundEvent {
    /// The device confirmed a switch.
    Switched {
        output: OutputId,
        source: SourceChoice,
    },
    /// Delimiter found but the output tag is not recognised.
    UnknownOutput(String),
    /// Known output, unrecognised source tag.
    UnknownSource { output: OutputId, raw: String },
    /// No delimiter at all.
    RawText(String),
}

impl fmt::Display for InboundEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Switched { output, source } => {
                write!(f, "{} switched to {}", output.label(), source.label())
            }
            Self::UnknownOutput(raw) => write!(f, "Unknown output: {}", raw),
            Self::UnknownSource { output, raw } => {
                write!(f, "Unknown source for {}: {}", output.label(), raw)
            }
            Self::RawText(raw) => write!(f, "Received raw data: {}", raw),
        }
    }
}

/// Encode a command for the wire.
pub fn encode(command: &Command) -> String {
    format!(
        "{}{}{}",
        command.output.as_str(),
        DELIMITER,
        command.source.as_str()
    )
}

/// Decode one inbound message. Never fails.
///
/// The first delimiter separates output from source. The source tag runs up
/// to the next delimiter, if any; whatever follows that is ignored.
pub fn decode(raw: &str) -> InboundEvent {
    let Some((output, rest)) = raw.split_once(DELIMITER) else {
        return InboundEvent::RawText(raw.to_string());
    };

    let Some(output) = OutputId::parse(output) else {
        return InboundEvent::UnknownOutput(output.to_string());
    };

    let source = rest.split(DELIMITER).next().unwrap_or(rest);
    match SourceChoice::parse(source) {
        Some(source) => InboundEvent::Switched { output, source },
        None => InboundEvent::UnknownSource {
            output,
            raw: source.to_string(),
        },
    }
}
