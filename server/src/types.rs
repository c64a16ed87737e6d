//
// Copyright 2017-2026 Hans W. Uhlig. All Rights Reserved.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//      http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//


//! Core types for the connection core

use mudcore_telnetcodec::naws::WindowSize;
use std::fmt;
use std::time::{Duration, Instant};

/// Identifier of a connection, unique among live connections.
///
/// The driver derives it from the socket's poll token, so it is never reused while the
/// connection it names is still in the registry.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Handle(usize);

impl Handle {
    /// Create a new handle
    pub fn new(id: usize) -> Self {
        Self(id)
    }

    /// Get the underlying value
    pub fn as_usize(&self) -> usize {
        self.0
    }
}

impl fmt::Display for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

/// Opaque reference the executor attaches to a connection.
///
/// The core never interprets it. It is handed back to
/// [`CommandExecutor::release`](crate::CommandExecutor::release) exactly once when the
/// connection is destroyed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ScriptRef(u64);

impl ScriptRef {
    /// Wrap an executor-defined value
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    /// Get the underlying value
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

/// Lifecycle state of a connection.
///
/// ```text
/// Open ⇄ Delaying
///  │        │
///  ▼        ▼
/// Draining ─┴──▶ Closed
/// ```
///
/// Every state except `Closed` may also move straight to `Closed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// Accepting input, sending output and eligible for prompts
    Open,
    /// Paused until a deadline; I/O is still serviced but input is not read
    Delaying,
    /// Waiting for buffered output to flush before closing
    Draining,
    /// Terminal, awaiting removal
    Closed,
}

impl ConnectionState {
    /// Check if the connection can no longer process commands
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Draining | Self::Closed)
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Open => write!(f, "open"),
            Self::Delaying => write!(f, "delaying"),
            Self::Draining => write!(f, "draining"),
            Self::Closed => write!(f, "closed"),
        }
    }
}

/// Connection information snapshot
#[derive(Debug, Clone)]
pub struct ConnectionInfo {
    /// Connection handle
    pub handle: Handle,
    /// Current state
    pub state: ConnectionState,
    /// When the connection was created
    pub created_at: Instant,
    /// Total bytes written to the socket
    pub bytes_sent: u64,
    /// Total bytes read from the socket
    pub bytes_received: u64,
    /// Complete lines accepted into the command queue
    pub commands_received: u64,
    /// Commands waiting for dispatch
    pub commands_queued: usize,
    /// Terminal size reported through NAWS
    pub window_size: Option<WindowSize>,
    /// Whether MCCP2 compression is active
    pub compressing: bool,
}

impl ConnectionInfo {
    /// Get the connection duration
    pub fn duration(&self) -> Duration {
        self.created_at.elapsed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_handle() {
        let h1 = Handle::new(1);
        let h2 = Handle::new(2);
        assert_eq!(h1.as_usize(), 1);
        assert!(h1 < h2);
        assert_eq!(h2.to_string(), "conn-2");
    }

    #[test]
    fn test_connection_state_terminal() {
        assert!(!ConnectionState::Open.is_terminal());
        assert!(!ConnectionState::Delaying.is_terminal());
        assert!(ConnectionState::Draining.is_terminal());
        assert!(ConnectionState::Closed.is_terminal());
        assert_eq!(ConnectionState::Delaying.to_string(), "delaying");
    }
}
