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

//! Event processing and message dispatch.

use std::sync::Arc;
use tracing::{error, info, warn};

use crate::link::{ConnectError, InboundEvent, LinkSubscriber, SessionError};
use crate::state::{AppState, ConnectionStatus};

/// Applies session callbacks to the application state and raises notifications.
pub struct EventProcessor {
    state: Arc<AppState>,
}

impl EventProcessor {
    pub fn new(state: Arc<AppState>) -> Self {
        Self { state }
    }

    fn notify(&self, text: impl Into<String>) {
        let text = text.into();
        info!("{}", text);
        self.state.push_notification(text);
    }
}

impl LinkSubscriber for EventProcessor {
    fn on_status(&self, status: ConnectionStatus) {
        let previous = self.state.get_status();
        self.state.set_status(status);

        match status {
            ConnectionStatus::Connected => {
                self.notify("Connected to ESP32");
            }
            ConnectionStatus::Offline if previous == ConnectionStatus::Connected => {
                self.notify("Device disconnected");
            }
            _ => {}
        }
    }

    fn on_event(&self, event: InboundEvent) {
        match &event {
            InboundEvent::Switched { output, source } => {
                self.state.set_source(*output, *source);
            }
            InboundEvent::UnknownOutput(_) | InboundEvent::UnknownSource { .. } => {
                warn!("Unrecognised reply: {:?}", event);
            }
            InboundEvent::RawText(_) => {}
        }
        self.notify(event.to_string());
    }

    fn on_error(&self, e: &SessionError) {
        error!("Link error: {}", e);
        let text = match e {
            SessionError::Connect(ConnectError::Timeout) => "Failed to connect: timed out".to_string(),
            SessionError::Connect(_) => "Failed to connect".to_string(),
            SessionError::Io(io) => format!("Connection lost: {}", io),
            other => other.to_string(),
        };
        self.notify(text);
    }
}
