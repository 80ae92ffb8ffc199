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

//! Bluetooth RFCOMM client implementation.

use anyhow::Result;
use bluer::rfcomm::{Profile, ReqError, Role, SocketAddr, Stream};
use bluer::{Adapter, Address, Session};
use futures::future::BoxFuture;
use futures::StreamExt;
use tracing::{debug, info, warn};

use crate::link::{ConnectError, Connector, Peer, Transport, SPP_UUID};

/// Opens RFCOMM streams to paired devices through BlueZ.
pub struct RfcommConnector {
    session: Session,
    adapter: Adapter,
    channel: Option<u8>,
}

impl RfcommConnector {
    /// Create a connector on the default adapter.
    ///
    /// With `channel` set, connections go straight to that RFCOMM channel;
    /// otherwise BlueZ resolves the SPP service on the device.
    pub async fn new(channel: Option<u8>) -> Result<Self> {
        info!("Initializing Bluetooth...");

        // Create BlueZ session
        let session = Session::new().await?;
        info!("BlueZ session created");

        let adapter = session.default_adapter().await?;
        info!("Using Bluetooth adapter: {}", adapter.name());

        if !adapter.is_powered().await? {
            info!("Powering on Bluetooth adapter...");
            adapter.set_powered(true).await?;
        }

        Ok(Self {
            session,
            adapter,
            channel,
        })
    }

    /// Paired devices whose name equals `expected_name`.
    pub async fn paired_peers(&self, expected_name: &str) -> Result<Vec<Peer>> {
        let mut peers = Vec::new();

        for addr in self.adapter.device_addresses().await? {
            let device = self.adapter.device(addr)?;
            if !device.is_paired().await? {
                continue;
            }

            let name = device.alias().await.unwrap_or_else(|_| addr.to_string());
            if name == expected_name {
                peers.push(Peer::new(addr.to_string(), name));
            }
        }

        info!("Found {} paired '{}' devices", peers.len(), expected_name);
        Ok(peers)
    }

    async fn connect_channel(&self, address: Address, channel: u8) -> Result<Stream, ConnectError> {
        debug!("Connecting to {} on RFCOMM channel {}", address, channel);
        Stream::connect(SocketAddr::new(address, channel))
            .await
            .map_err(|e| ConnectError::from_io(&e))
    }

    /// Register an SPP client profile and have BlueZ connect it.
    async fn connect_profile(&self, address: Address) -> Result<Stream, ConnectError> {
        debug!("Connecting to {} via SPP profile {}", address, SPP_UUID);

        let profile = Profile {
            uuid: SPP_UUID,
            role: Some(Role::Client),
            require_authentication: Some(false),
            require_authorization: Some(false),
            auto_connect: Some(false),
            ..Default::default()
        };
        let mut handle = self
            .session
            .register_profile(profile)
            .await
            .map_err(bluer_error)?;

        let device = self.adapter.device(address).map_err(bluer_error)?;
        let connect = device.connect_profile(&SPP_UUID);
        tokio::pin!(connect);
        let mut requested = false;

        loop {
            tokio::select! {
                result = &mut connect, if !requested => {
                    requested = true;
                    result.map_err(bluer_error)?;
                }
                request = handle.next() => {
                    let Some(request) = request else {
                        return Err(ConnectError::Refused("SPP profile unregistered".to_string()));
                    };
                    if request.device() != address {
                        warn!("Rejecting connection from unexpected device {}", request.device());
                        request.reject(ReqError::Rejected);
                        continue;
                    }
                    return request
                        .accept()
                        .map_err(|e| ConnectError::Refused(e.to_string()));
                }
            }
        }
    }
}

fn bluer_error(e: bluer::Error) -> ConnectError {
    match e.kind {
        bluer::ErrorKind::DoesNotExist | bluer::ErrorKind::NotFound => {
            ConnectError::NotFound(e.to_string())
        }
        _ => ConnectError::Refused(e.to_string()),
    }
}

impl Connector for RfcommConnector {
    fn connect<'a>(&'a self, peer: &'a Peer) -> BoxFuture<'a, Result<Transport, ConnectError>> {
        Box::pin(async move {
            let address: Address = peer
                .id
                .parse()
                .map_err(|_| ConnectError::NotFound(format!("invalid address '{}'", peer.id)))?;

            let stream = match self.channel {
                Some(channel) => self.connect_channel(address, channel).await?,
                None => self.connect_profile(address).await?,
            };

            info!("RFCOMM stream open to {}", address);
            Ok(Transport::from_stream(stream))
        })
    }
}
