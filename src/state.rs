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

//! Application state management.

use chrono::{DateTime, Local};
use parking_lot::RwLock;
use serde::Serialize;
use std::collections::VecDeque;
use std::sync::Arc;

use crate::link::{OutputId, SourceChoice};

/// Number of notifications kept for `status` output.
const MAX_NOTIFICATIONS: usize = 20;

/// Connection status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ConnectionStatus {
    Connected,
    Connecting,
    Offline,
    NotPaired,
}

impl ConnectionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConnectionStatus::Connected => "Connected",
            ConnectionStatus::Connecting => "Connecting...",
            ConnectionStatus::Offline => "Device Offline",
            ConnectionStatus::NotPaired => "No Paired Device",
        }
    }

    /// Label of the action offered to the user in this state, if any.
    pub fn action_label(&self) -> Option<&'static str> {
        match self {
            ConnectionStatus::NotPaired => Some("Pair Device"),
            ConnectionStatus::Offline => Some("Reconnect"),
            ConnectionStatus::Connected | ConnectionStatus::Connecting => None,
        }
    }
}

/// A transient message shown to the user.
#[derive(Debug, Clone, Serialize)]
pub struct Notification {
    pub at: DateTime<Local>,
    pub text: String,
}

/// Serializable view of [`AppState`].
#[derive(Debug, Clone, Serialize)]
pub struct StateSnapshot {
    pub status: ConnectionStatus,
    pub device: Option<String>,
    pub output_a: Option<&'static str>,
    pub output_b: Option<&'static str>,
    pub notifications: Vec<Notification>,
}

/// Shared application state.
#[derive(Debug)]
pub struct AppState {
    /// Current connection status.
    pub connection_status: RwLock<ConnectionStatus>,

    /// Connected device name.
    pub connected_device: RwLock<Option<String>>,

    /// Last source selected by the user or reported by the device, per output.
    pub output_a: RwLock<Option<SourceChoice>>,
    pub output_b: RwLock<Option<SourceChoice>>,

    /// Recent notifications, newest last.
    pub notifications: RwLock<VecDeque<Notification>>,
}

impl Default for AppState {
    fn default() -> Self {
        Self {
            connection_status: RwLock::new(ConnectionStatus::NotPaired),
            connected_device: RwLock::new(None),
            output_a: RwLock::new(None),
            output_b: RwLock::new(None),
            notifications: RwLock::new(VecDeque::with_capacity(MAX_NOTIFICATIONS)),
        }
    }
}

impl AppState {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn set_status(&self, status: ConnectionStatus) {
        *self.connection_status.write() = status;
    }

    pub fn get_status(&self) -> ConnectionStatus {
        *self.connection_status.read()
    }

    pub fn set_device_name(&self, device_name: Option<String>) {
        *self.connected_device.write() = device_name;
    }

    pub fn get_device_name(&self) -> Option<String> {
        self.connected_device.read().clone()
    }

    fn output_slot(&self, output: OutputId) -> &RwLock<Option<SourceChoice>> {
        match output {
            OutputId::A => &self.output_a,
            OutputId::B => &self.output_b,
        }
    }

    pub fn set_source(&self, output: OutputId, source: SourceChoice) {
        *self.output_slot(output).write() = Some(source);
    }

    pub fn get_source(&self, output: OutputId) -> Option<SourceChoice> {
        *self.output_slot(output).read()
    }

    /// Source a toggle should select. Outputs start out on grid.
    pub fn next_source(&self, output: OutputId) -> SourceChoice {
        self.get_source(output)
            .unwrap_or(SourceChoice::Grid)
            .toggled()
    }

    /// Record a command the device accepted for writing.
    pub fn record_sent(&self, output: OutputId, source: SourceChoice) {
        self.set_source(output, source);
        self.push_notification("Data sent!");
    }

    pub fn push_notification(&self, text: impl Into<String>) {
        let mut notifications = self.notifications.write();
        if notifications.len() == MAX_NOTIFICATIONS {
            notifications.pop_front();
        }
        notifications.push_back(Notification {
            at: Local::now(),
            text: text.into(),
        });
    }

    pub fn last_notification(&self) -> Option<String> {
        self.notifications.read().back().map(|n| n.text.clone())
    }

    pub fn snapshot(&self) -> StateSnapshot {
        StateSnapshot {
            status: self.get_status(),
            device: self.get_device_name(),
            output_a: self.get_source(OutputId::A).map(|s| s.as_str()),
            output_b: self.get_source(OutputId::B).map(|s| s.as_str()),
            notifications: self.notifications.read().iter().cloned().collect(),
        }
    }
}
