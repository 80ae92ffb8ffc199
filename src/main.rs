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

//! IEMS Link console application

use anyhow::Result;
use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use iems_link::bluetooth::RfcommConnector;
use iems_link::config::Config;
use iems_link::events::EventProcessor;
use iems_link::link::{Command, LinkSession, Peer, SessionError};
use iems_link::state::AppState;
use iems_link::ui::{self, ConsoleAction};

type Session = LinkSession<RfcommConnector>;

async fn connect(session: &mut Session, state: &AppState, peer: Peer) {
    let name = peer.name.clone();
    match session.connect(peer).await {
        Ok(()) => state.set_device_name(Some(name)),
        Err(SessionError::Busy(status)) => {
            warn!("Cannot connect while {}", status.as_str());
        }
        // Connect failures reach the user through the event processor.
        Err(_) => {}
    }
}

async fn send(session: &mut Session, state: &AppState, command: Command) {
    match session.send(command).await {
        Ok(()) => {
            // The switch follows the user's choice; the device reply confirms it.
            state.record_sent(command.output, command.source);
            info!("Sent {} -> {}", command.output.label(), command.source.label());
        }
        Err(SessionError::NotConnected) => {
            let status = state.get_status();
            match status.action_label() {
                Some(action) => warn!("{} ({} first)", status.as_str(), action.to_lowercase()),
                None => warn!("{}", status.as_str()),
            }
        }
        // Write failures reach the user through the event processor.
        Err(_) => {}
    }
}

async fn refresh_peers(session: &Session, device_name: &str) -> Vec<Peer> {
    match session.connector().paired_peers(device_name).await {
        Ok(peers) => peers,
        Err(e) => {
            error!("Failed to list paired devices: {}", e);
            Vec::new()
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("iems_link=info".parse()?),
        )
        .init();

    info!("Starting IEMS Link v{}...", env!("CARGO_PKG_VERSION"));

    // Load configuration
    let config = Config::load()?;
    info!("Configuration loaded");

    let connector = RfcommConnector::new(config.bluetooth.channel).await?;

    // Create application state
    let state = AppState::new();
    let processor = Arc::new(EventProcessor::new(state.clone()));
    let mut session = LinkSession::new(connector, processor, config.link.session_options());

    let device_name = config.bluetooth.device_name.clone();
    let mut peers = refresh_peers(&session, &device_name).await;
    if peers.is_empty() {
        warn!(
            "No paired device named '{}'. Pair it in the system Bluetooth settings, then type 'peers'.",
            device_name
        );
    } else if config.bluetooth.auto_connect {
        connect(&mut session, &state, peers[0].clone()).await;
    }

    let mut action_rx = ui::run_console();
    info!("{}", ui::status_line(&state));

    loop {
        tokio::select! {
            Some(action) = action_rx.recv() => {
                match action {
                    ConsoleAction::Switch(output, source) => {
                        send(&mut session, &state, Command::new(output, source)).await;
                    }
                    ConsoleAction::Toggle(output) => {
                        let source = state.next_source(output);
                        send(&mut session, &state, Command::new(output, source)).await;
                    }
                    ConsoleAction::Connect(index) => {
                        let peer = match index {
                            Some(i) => peers.get(i).cloned(),
                            None => session.peer().cloned().or_else(|| peers.first().cloned()),
                        };
                        match peer {
                            Some(peer) => connect(&mut session, &state, peer).await,
                            None => warn!("No such device, type 'peers' to list paired devices"),
                        }
                    }
                    ConsoleAction::Disconnect => {
                        session.disconnect().await;
                    }
                    ConsoleAction::ListPeers => {
                        peers = refresh_peers(&session, &device_name).await;
                        for (i, peer) in peers.iter().enumerate() {
                            info!("[{}] {} ({})", i, peer.name, peer.id);
                        }
                    }
                    ConsoleAction::ShowStatus => {
                        info!("{}", ui::status_line(&state));
                    }
                    ConsoleAction::DumpState => {
                        match serde_json::to_string_pretty(&state.snapshot()) {
                            Ok(json) => println!("{}", json),
                            Err(e) => error!("Failed to serialize state: {}", e),
                        }
                    }
                    ConsoleAction::Help => {
                        println!("{}", ui::HELP);
                    }
                    ConsoleAction::Quit => {
                        info!("Quit requested");
                        break;
                    }
                }
            }
            _ = tokio::signal::ctrl_c() => {
                info!("Shutdown signal received");
                break;
            }
        }
    }

    session.disconnect().await;
    info!("IEMS Link stopped");
    Ok(())
}
