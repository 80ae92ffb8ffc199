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

//! Link session: one device connection, its receive loop and its status.

use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch, Mutex as AsyncMutex};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use super::error::SessionError;
use super::framing::{Framing, MessageAssembler};
use super::protocol::{self, Command, InboundEvent};
use super::transport::{self, Connector, Peer, TransportReader, TransportWriter};
use crate::state::ConnectionStatus;

/// Receives everything a session reports.
///
/// Callbacks run on the caller's task for `connect`/`send`/`disconnect` and on
/// the receive task for inbound data, so they must not block.
pub trait LinkSubscriber: Send + Sync {
    fn on_status(&self, status: ConnectionStatus);
    fn on_event(&self, event: InboundEvent);
    fn on_error(&self, error: &SessionError);
}

/// Session callbacks as a value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkEvent {
    Status(ConnectionStatus),
    Event(InboundEvent),
    Error(SessionError),
}

/// Subscriber that forwards callbacks into a channel.
pub struct ChannelSubscriber {
    tx: mpsc::UnboundedSender<LinkEvent>,
}

impl ChannelSubscriber {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<LinkEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    fn emit(&self, event: LinkEvent) {
        let _ = self.tx.send(event);
    }
}

impl LinkSubscriber for ChannelSubscriber {
    fn on_status(&self, status: ConnectionStatus) {
        self.emit(LinkEvent::Status(status));
    }

    fn on_event(&self, event: InboundEvent) {
        self.emit(LinkEvent::Event(event));
    }

    fn on_error(&self, error: &SessionError) {
        self.emit(LinkEvent::Error(error.clone()));
    }
}

/// Timeouts and framing used by a session.
#[derive(Debug, Clone)]
pub struct SessionOptions {
    pub connect_timeout: Duration,
    pub write_timeout: Duration,
    /// `None` waits for data indefinitely.
    pub read_timeout: Option<Duration>,
    pub framing: Framing,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(10),
            write_timeout: Duration::from_secs(5),
            read_timeout: None,
            framing: Framing::Chunk,
        }
    }
}

struct LinkState {
    status: ConnectionStatus,
    /// Bumped on every successful connect so a stale receive loop cannot
    /// touch the status of a newer connection.
    generation: u64,
}

impl LinkState {
    fn is_current(&self, generation: u64) -> bool {
        self.generation == generation && self.status == ConnectionStatus::Connected
    }
}

type SharedState = Arc<Mutex<LinkState>>;
type SharedWriter = Arc<AsyncMutex<TransportWriter>>;

/// Move to `Offline` if `generation` is still the live connection.
fn mark_offline(state: &SharedState, generation: u64) -> bool {
    let mut state = state.lock();
    if state.is_current(generation) {
        state.status = ConnectionStatus::Offline;
        true
    } else {
        false
    }
}

struct ActiveLink {
    generation: u64,
    writer: SharedWriter,
    shutdown_tx: watch::Sender<bool>,
    task: JoinHandle<()>,
}

/// Owns the connection to one device.
pub struct LinkSession<C> {
    connector: C,
    subscriber: Arc<dyn LinkSubscriber>,
    options: SessionOptions,
    state: SharedState,
    active: Option<ActiveLink>,
    peer: Option<Peer>,
}

impl<C: Connector> LinkSession<C> {
    /// Create a session. The subscriber is fixed for the session's lifetime.
    pub fn new(connector: C, subscriber: Arc<dyn LinkSubscriber>, options: SessionOptions) -> Self {
        Self {
            connector,
            subscriber,
            options,
            state: Arc::new(Mutex::new(LinkState {
                status: ConnectionStatus::NotPaired,
                generation: 0,
            })),
            active: None,
            peer: None,
        }
    }

    pub fn status(&self) -> ConnectionStatus {
        self.state.lock().status
    }

    /// The peer most recently passed to [`connect`](Self::connect).
    pub fn peer(&self) -> Option<&Peer> {
        self.peer.as_ref()
    }

    pub fn connector(&self) -> &C {
        &self.connector
    }

    fn set_status(&self, status: ConnectionStatus) {
        self.state.lock().status = status;
        self.subscriber.on_status(status);
    }

    /// Connect to `peer` and start receiving.
    ///
    /// Only allowed from `NotPaired` or `Offline`. On failure the previous
    /// status is restored.
    pub async fn connect(&mut self, peer: Peer) -> Result<(), SessionError> {
        let previous = {
            let mut state = self.state.lock();
            match state.status {
                ConnectionStatus::NotPaired | ConnectionStatus::Offline => {}
                busy => return Err(SessionError::Busy(busy)),
            }
            let previous = state.status;
            state.status = ConnectionStatus::Connecting;
            previous
        };
        self.subscriber.on_status(ConnectionStatus::Connecting);

        // Leftovers of a link the peer dropped.
        self.release().await;
        self.peer = Some(peer.clone());

        info!("Connecting to {} ({})", peer.name, peer.id);
        let transport =
            match transport::open(&self.connector, &peer, self.options.connect_timeout).await {
                Ok(transport) => transport,
                Err(e) => {
                    warn!("Connection to {} failed: {}", peer.name, e);
                    self.set_status(previous);
                    let error = SessionError::Connect(e);
                    self.subscriber.on_error(&error);
                    return Err(error);
                }
            };

        let (reader, writer) =
            transport.into_split(self.options.read_timeout, self.options.write_timeout);
        let writer = Arc::new(AsyncMutex::new(writer));
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let generation = {
            let mut state = self.state.lock();
            state.generation += 1;
            state.status = ConnectionStatus::Connected;
            state.generation
        };
        self.subscriber.on_status(ConnectionStatus::Connected);
        info!("Connected to {}", peer.name);

        let receive_loop = ReceiveLoop {
            state: self.state.clone(),
            subscriber: self.subscriber.clone(),
            writer: writer.clone(),
            generation,
            framing: self.options.framing,
        };
        let task = tokio::spawn(receive_loop.run(reader, shutdown_rx));

        self.active = Some(ActiveLink {
            generation,
            writer,
            shutdown_tx,
            task,
        });
        Ok(())
    }

    /// Send a switch command. Fails without I/O unless connected.
    pub async fn send(&mut self, command: Command) -> Result<(), SessionError> {
        if self.status() != ConnectionStatus::Connected {
            return Err(SessionError::NotConnected);
        }
        let Some(active) = self.active.as_ref() else {
            return Err(SessionError::NotConnected);
        };

        let wire = protocol::encode(&command);
        debug!("Sending: {}", wire);
        let result = active.writer.lock().await.send(wire.as_bytes()).await;

        match result {
            Ok(()) => Ok(()),
            Err(e) => {
                error!("Send failed: {}", e);
                let generation = active.generation;
                let went_offline = mark_offline(&self.state, generation);
                self.release().await;
                if went_offline {
                    self.subscriber.on_status(ConnectionStatus::Offline);
                }
                let error = SessionError::Io(e);
                self.subscriber.on_error(&error);
                Err(error)
            }
        }
    }

    /// Close the link and stop the receive loop. No-op when not connected.
    pub async fn disconnect(&mut self) {
        let was_connected = {
            let mut state = self.state.lock();
            if state.status == ConnectionStatus::Connected {
                state.status = ConnectionStatus::Offline;
                true
            } else {
                false
            }
        };

        self.release().await;

        if was_connected {
            info!("Disconnected");
            self.subscriber.on_status(ConnectionStatus::Offline);
        }
    }

    /// Stop the receive loop, close the transport and wait for the loop to exit.
    async fn release(&mut self) {
        let Some(active) = self.active.take() else {
            return;
        };

        let _ = active.shutdown_tx.send(true);
        active.writer.lock().await.close().await;
        if let Err(e) = active.task.await {
            error!("Receive loop ended abnormally: {}", e);
        }
    }
}

/// State moved into the receive task.
struct ReceiveLoop {
    state: SharedState,
    subscriber: Arc<dyn LinkSubscriber>,
    writer: SharedWriter,
    generation: u64,
    framing: Framing,
}

impl ReceiveLoop {
    async fn run(self, mut reader: TransportReader, mut shutdown: watch::Receiver<bool>) {
        debug!("Receive loop {} started", self.generation);
        let mut assembler = MessageAssembler::new(self.framing);

        loop {
            let result = tokio::select! {
                _ = shutdown.changed() => break,
                result = reader.receive() => result,
            };
            if *shutdown.borrow() {
                break;
            }

            match result {
                Ok(chunk) => {
                    for message in assembler.push(&chunk) {
                        if !self.state.lock().is_current(self.generation) {
                            debug!("Dropping message from stale link: {}", message);
                            return;
                        }
                        debug!("Received: {}", message);
                        self.subscriber.on_event(protocol::decode(&message));
                    }
                }
                Err(e) => {
                    if mark_offline(&self.state, self.generation) {
                        error!("Read error: {}", e);
                        self.writer.lock().await.close().await;
                        self.subscriber.on_status(ConnectionStatus::Offline);
                        self.subscriber.on_error(&SessionError::Io(e));
                    }
                    break;
                }
            }
        }

        debug!("Receive loop {} stopped", self.generation);
    }
}
