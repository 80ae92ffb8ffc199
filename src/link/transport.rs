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

//! Byte-stream transport to a single peer.

use futures::future::BoxFuture;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tracing::debug;
use uuid::Uuid;

use super::error::{ConnectError, IoError};

/// Standard SPP UUID.
pub const SPP_UUID: Uuid = Uuid::from_u128(0x00001101_0000_1000_8000_00805F9B34FB);

/// Maximum bytes returned by a single receive.
pub const READ_CHUNK_SIZE: usize = 1024;

/// A paired device that can be connected to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Peer {
    /// Backend specific identifier (the Bluetooth address for RFCOMM).
    pub id: String,
    /// Display name.
    pub name: String,
}

impl Peer {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
        }
    }
}

/// Opens transports to peers.
pub trait Connector: Send + Sync {
    fn connect<'a>(&'a self, peer: &'a Peer) -> BoxFuture<'a, Result<Transport, ConnectError>>;
}

type BoxReader = Box<dyn AsyncRead + Send + Unpin>;
type BoxWriter = Box<dyn AsyncWrite + Send + Unpin>;

/// An open duplex stream to one peer.
pub struct Transport {
    reader: BoxReader,
    writer: BoxWriter,
}

impl Transport {
    /// Wrap an already split stream.
    pub fn new(
        reader: impl AsyncRead + Send + Unpin + 'static,
        writer: impl AsyncWrite + Send + Unpin + 'static,
    ) -> Self {
        Self {
            reader: Box::new(reader),
            writer: Box::new(writer),
        }
    }

    /// Wrap a duplex stream.
    pub fn from_stream<S>(stream: S) -> Self
    where
        S: AsyncRead + AsyncWrite + Send + 'static,
    {
        let (reader, writer) = tokio::io::split(stream);
        Self::new(reader, writer)
    }

    /// Split into halves so reads and writes can proceed concurrently.
    pub fn into_split(
        self,
        read_timeout: Option<Duration>,
        write_timeout: Duration,
    ) -> (TransportReader, TransportWriter) {
        (
            TransportReader {
                inner: self.reader,
                buf: vec![0u8; READ_CHUNK_SIZE],
                timeout: read_timeout,
            },
            TransportWriter {
                inner: Some(self.writer),
                timeout: write_timeout,
            },
        )
    }
}

/// Connect through `connector`, giving up after `timeout`.
pub async fn open(
    connector: &dyn Connector,
    peer: &Peer,
    timeout: Duration,
) -> Result<Transport, ConnectError> {
    match tokio::time::timeout(timeout, connector.connect(peer)).await {
        Ok(result) => result,
        Err(_) => Err(ConnectError::Timeout),
    }
}

/// Read half of a [`Transport`].
pub struct TransportReader {
    inner: BoxReader,
    buf: Vec<u8>,
    timeout: Option<Duration>,
}

impl TransportReader {
    /// Wait for at least one byte and return up to [`READ_CHUNK_SIZE`] bytes.
    ///
    /// End of stream is reported as [`IoError::Disconnected`].
    pub async fn receive(&mut self) -> Result<Vec<u8>, IoError> {
        let read = self.inner.read(&mut self.buf);
        let n = match self.timeout {
            Some(timeout) => tokio::time::timeout(timeout, read)
                .await
                .map_err(|_| IoError::Timeout)??,
            None => read.await?,
        };

        if n == 0 {
            return Err(IoError::Disconnected("end of stream".to_string()));
        }

        debug!("Received {} bytes", n);
        Ok(self.buf[..n].to_vec())
    }
}

/// Write half of a [`Transport`].
pub struct TransportWriter {
    inner: Option<BoxWriter>,
    timeout: Duration,
}

impl TransportWriter {
    /// Write and flush `bytes`.
    pub async fn send(&mut self, bytes: &[u8]) -> Result<(), IoError> {
        let writer = self.inner.as_mut().ok_or(IoError::Closed)?;

        let write = async {
            writer.write_all(bytes).await?;
            writer.flush().await
        };
        tokio::time::timeout(self.timeout, write)
            .await
            .map_err(|_| IoError::Timeout)??;

        debug!("Sent {} bytes", bytes.len());
        Ok(())
    }

    pub fn is_closed(&self) -> bool {
        self.inner.is_none()
    }

    /// Shut down and release the write side. Safe to call more than once.
    pub async fn close(&mut self) {
        if let Some(mut writer) = self.inner.take() {
            // The peer may already be gone; nothing useful to do with the error.
            let _ = tokio::time::timeout(self.timeout, writer.shutdown()).await;
            debug!("Transport closed");
        }
    }
}
