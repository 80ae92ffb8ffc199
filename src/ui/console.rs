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

//! Line-based console controller.

use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::link::{OutputId, SourceChoice};
use crate::state::{AppState, ConnectionStatus};

pub const HELP: &str = "\
Commands:
  a solar|grid     switch Output A
  b solar|grid     switch Output B
  toggle a|b       flip an output
  connect [n]      connect to paired device n (default: last used)
  disconnect       close the link
  peers            list paired devices
  status           show link and output state
  dump             print the full state as JSON
  quit             exit";

/// Actions that can be triggered from the console.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsoleAction {
    Switch(OutputId, SourceChoice),
    Toggle(OutputId),
    Connect(Option<usize>),
    Disconnect,
    ListPeers,
    ShowStatus,
    DumpState,
    Help,
    Quit,
}

fn parse_output(s: &str) -> Option<OutputId> {
    match s.to_ascii_lowercase().as_str() {
        "a" | "outa" => Some(OutputId::A),
        "b" | "outb" => Some(OutputId::B),
        _ => None,
    }
}

impl ConsoleAction {
    /// Parse one input line. Blank lines yield `Ok(None)`.
    pub fn parse(line: &str) -> Result<Option<Self>, String> {
        let words: Vec<&str> = line.split_whitespace().collect();

        let action = match words.as_slice() {
            [] => return Ok(None),
            ["toggle", output] => {
                let output = parse_output(output).ok_or_else(|| format!("Unknown output '{}'", output))?;
                ConsoleAction::Toggle(output)
            }
            ["connect"] => ConsoleAction::Connect(None),
            ["connect", index] => {
                let index = index
                    .parse::<usize>()
                    .map_err(|_| format!("Invalid device number '{}'", index))?;
                ConsoleAction::Connect(Some(index))
            }
            ["disconnect"] => ConsoleAction::Disconnect,
            ["peers"] => ConsoleAction::ListPeers,
            ["status"] => ConsoleAction::ShowStatus,
            ["dump"] => ConsoleAction::DumpState,
            ["help"] | ["?"] => ConsoleAction::Help,
            ["quit"] | ["exit"] => ConsoleAction::Quit,
            [output, source] => {
                let output = parse_output(output).ok_or_else(|| format!("Unknown command '{}'", line.trim()))?;
                let source = SourceChoice::parse(&source.to_ascii_lowercase())
                    .ok_or_else(|| format!("Unknown source '{}'", source))?;
                ConsoleAction::Switch(output, source)
            }
            _ => return Err(format!("Unknown command '{}'", line.trim())),
        };

        Ok(Some(action))
    }
}

/// One-line summary of the link and both outputs.
pub fn status_line(state: &AppState) -> String {
    let status = state.get_status();
    let link = match status {
        ConnectionStatus::Connected => {
            let device = state
                .get_device_name()
                .unwrap_or_else(|| "Unknown".to_string());
            format!("● Connected: {}", device)
        }
        ConnectionStatus::Connecting => "◐ Connecting...".to_string(),
        other => match other.action_label() {
            Some(action) => format!("○ {} ({})", other.as_str(), action.to_lowercase()),
            None => format!("○ {}", other.as_str()),
        },
    };

    let outputs: Vec<String> = OutputId::ALL
        .iter()
        .map(|output| {
            let source = state
                .get_source(*output)
                .map(|s| s.label())
                .unwrap_or("?");
            format!("{}: {}", output.label(), source)
        })
        .collect();

    format!("{} | {}", link, outputs.join(" | "))
}

/// Read actions from stdin until EOF.
pub fn run_console() -> mpsc::UnboundedReceiver<ConsoleAction> {
    let (action_tx, action_rx) = mpsc::unbounded_channel();

    tokio::spawn(async move {
        let mut lines = BufReader::new(tokio::io::stdin()).lines();

        loop {
            match lines.next_line().await {
                Ok(Some(line)) => match ConsoleAction::parse(&line) {
                    Ok(Some(action)) => {
                        debug!("Console action: {:?}", action);
                        if action_tx.send(action).is_err() {
                            break;
                        }
                    }
                    Ok(None) => {}
                    Err(e) => warn!("{} (type 'help')", e),
                },
                Ok(None) => {
                    let _ = action_tx.send(ConsoleAction::Quit);
                    break;
                }
                Err(e) => {
                    warn!("Console read error: {}", e);
                    let _ = action_tx.send(ConsoleAction::Quit);
                    break;
                }
            }
        }
    });

    info!("Console started, type 'help' for commands");
    action_rx
}
