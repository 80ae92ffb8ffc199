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

//! Device link.
//!
//! Transport, wire protocol and the session tying them together. Nothing in
//! here knows about Bluetooth; backends plug in through [`Connector`].

pub mod error;
pub mod framing;
pub mod protocol;
pub mod session;
pub mod transport;

pub use error::{ConnectError, IoError, SessionError};
pub use framing::{Framing, MessageAssembler};
pub use protocol::{decode, encode, Command, InboundEvent, OutputId, SourceChoice, DELIMITER};
pub use session::{ChannelSubscriber, LinkEvent, LinkSession, LinkSubscriber, SessionOptions};
pub use transport::{Connector, Peer, Transport, SPP_UUID};
