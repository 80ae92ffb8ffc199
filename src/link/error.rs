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

//! Error types for the device link.

use thiserror::Error;

use crate::state::ConnectionStatus;

/// Failure to open a connection to a peer.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConnectError {
    #[error("Device not found: {0}")]
    NotFound(String),

    #[error("Connection refused: {0}")]
    Refused(String),

    #[error("Connection timed out")]
    Timeout,
}

/// Failure on an open connection.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum IoError {
    #[error("Link is closed")]
    Closed,

    #[error("Peer disconnected: {0}")]
    Disconnected(String),

    #[error("Operation timed out")]
    Timeout,
}

impl From<std::io::Error> for IoError {
    fn from(e: std::io::Error) -> Self {
        match e.kind() {
            std::io::ErrorKind::TimedOut => IoError::Timeout,
            _ => IoError::Disconnected(e.to_string()),
        }
    }
}

impl ConnectError {
    /// Classify an I/O error raised while connecting.
    pub fn from_io(e: &std::io::Error) -> Self {
        use std::io::ErrorKind;

        match e.kind() {
            ErrorKind::TimedOut => ConnectError::Timeout,
            ErrorKind::NotFound | ErrorKind::AddrNotAvailable => {
                ConnectError::NotFound(e.to_string())
            }
            _ => ConnectError::Refused(e.to_string()),
        }
    }
}

/// Errors returned by [`LinkSession`](super::LinkSession) operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    #[error("Not connected")]
    NotConnected,

    #[error("Link is busy ({})", .0.as_str())]
    Busy(ConnectionStatus),

    #[error(transparent)]
    Connect(#[from] ConnectError),

    #[error(transparent)]
    Io(#[from] IoError),
}
