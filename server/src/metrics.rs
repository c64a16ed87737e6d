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


//! Counters for the connection core
//!
//! Every update is kept locally, so a [`MetricsSnapshot`] can be taken at any time, and is
//! also forwarded to the [`metrics`] facade so an installed recorder sees it.

use metrics::{counter, gauge};
use std::cell::Cell;
use std::fmt;
use std::time::{Duration, Instant};

/// Counter of accepted connections
pub const CONNECTIONS_OPENED: &str = "mudcore.connections.opened";
/// Gauge of connections in the registry
pub const CONNECTIONS_ACTIVE: &str = "mudcore.connections.active";
/// Counter of bytes written to sockets
pub const BYTES_SENT: &str = "mudcore.bytes.sent";
/// Counter of bytes read from sockets
pub const BYTES_RECEIVED: &str = "mudcore.bytes.received";
/// Counter of commands handed to the executor
pub const COMMANDS_DISPATCHED: &str = "mudcore.commands.dispatched";
/// Counter of lines dropped because the command queue was full
pub const COMMANDS_DISCARDED: &str = "mudcore.commands.discarded";
/// Counter of input lines truncated to the line buffer capacity
pub const LINES_TRUNCATED: &str = "mudcore.lines.truncated";
/// Counter of prompts emitted
pub const PROMPTS_SENT: &str = "mudcore.prompts.sent";

/// Core counters shared by the registry and its connections
///
/// The core is single threaded, so plain cells are enough. The registry hands each
/// connection an `Rc` to the same instance.
#[derive(Debug)]
pub struct CoreMetrics {
    connections_opened: Cell<u64>,
    connections_active: Cell<u64>,
    bytes_sent: Cell<u64>,
    bytes_received: Cell<u64>,
    commands_dispatched: Cell<u64>,
    commands_discarded: Cell<u64>,
    lines_truncated: Cell<u64>,
    prompts_sent: Cell<u64>,
    started_at: Instant,
}

impl Default for CoreMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl CoreMetrics {
    /// Create a new metrics instance
    pub fn new() -> Self {
        Self {
            connections_opened: Cell::new(0),
            connections_active: Cell::new(0),
            bytes_sent: Cell::new(0),
            bytes_received: Cell::new(0),
            commands_dispatched: Cell::new(0),
            commands_discarded: Cell::new(0),
            lines_truncated: Cell::new(0),
            prompts_sent: Cell::new(0),
            started_at: Instant::now(),
        }
    }

    fn bump(cell: &Cell<u64>, count: u64) {
        cell.set(cell.get().saturating_add(count));
    }

    // Connection tracking

    /// Record a new connection entering the registry
    pub fn connection_opened(&self) {
        Self::bump(&self.connections_opened, 1);
        Self::bump(&self.connections_active, 1);
        counter!(CONNECTIONS_OPENED).increment(1);
        gauge!(CONNECTIONS_ACTIVE).increment(1.0);
    }

    /// Record a connection leaving the registry
    pub fn connection_destroyed(&self) {
        self.connections_active
            .set(self.connections_active.get().saturating_sub(1));
        gauge!(CONNECTIONS_ACTIVE).decrement(1.0);
    }

    // Throughput tracking

    /// Record bytes written to a socket
    pub fn bytes_sent(&self, count: usize) {
        Self::bump(&self.bytes_sent, count as u64);
        counter!(BYTES_SENT).increment(count as u64);
    }

    /// Record bytes read from a socket
    pub fn bytes_received(&self, count: usize) {
        Self::bump(&self.bytes_received, count as u64);
        counter!(BYTES_RECEIVED).increment(count as u64);
    }

    // Command tracking

    /// Record a command handed to the executor
    pub fn command_dispatched(&self) {
        Self::bump(&self.commands_dispatched, 1);
        counter!(COMMANDS_DISPATCHED).increment(1);
    }

    /// Record a line dropped on queue overflow
    pub fn command_discarded(&self) {
        Self::bump(&self.commands_discarded, 1);
        counter!(COMMANDS_DISCARDED).increment(1);
    }

    /// Record a truncated input line
    pub fn line_truncated(&self) {
        Self::bump(&self.lines_truncated, 1);
        counter!(LINES_TRUNCATED).increment(1);
    }

    /// Record an emitted prompt
    pub fn prompt_sent(&self) {
        Self::bump(&self.prompts_sent, 1);
        counter!(PROMPTS_SENT).increment(1);
    }

    // Snapshot

    /// Get a point-in-time copy of all counters
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            connections_opened: self.connections_opened.get(),
            connections_active: self.connections_active.get(),
            bytes_sent: self.bytes_sent.get(),
            bytes_received: self.bytes_received.get(),
            commands_dispatched: self.commands_dispatched.get(),
            commands_discarded: self.commands_discarded.get(),
            lines_truncated: self.lines_truncated.get(),
            prompts_sent: self.prompts_sent.get(),
            uptime: self.started_at.elapsed(),
        }
    }
}

/// A snapshot of core metrics at a point in time
#[derive(Debug, Clone)]
pub struct MetricsSnapshot {
    /// Connections accepted since start
    pub connections_opened: u64,
    /// Connections currently in the registry
    pub connections_active: u64,
    /// Total bytes sent
    pub bytes_sent: u64,
    /// Total bytes received
    pub bytes_received: u64,
    /// Commands handed to the executor
    pub commands_dispatched: u64,
    /// Lines dropped on queue overflow
    pub commands_discarded: u64,
    /// Input lines truncated
    pub lines_truncated: u64,
    /// Prompts emitted
    pub prompts_sent: u64,
    /// Time since the metrics were created
    pub uptime: Duration,
}

impl MetricsSnapshot {
    /// Calculate bytes per second (sent)
    pub fn bytes_sent_per_sec(&self) -> f64 {
        if self.uptime.is_zero() {
            return 0.0;
        }
        self.bytes_sent as f64 / self.uptime.as_secs_f64()
    }

    /// Calculate commands per second
    pub fn commands_per_sec(&self) -> f64 {
        if self.uptime.is_zero() {
            return 0.0;
        }
        self.commands_dispatched as f64 / self.uptime.as_secs_f64()
    }
}

impl fmt::Display for MetricsSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "connections {}/{} bytes {}/{} commands {} (discarded {}, truncated {}) prompts {}",
            self.connections_active,
            self.connections_opened,
            self.bytes_sent,
            self.bytes_received,
            self.commands_dispatched,
            self.commands_discarded,
            self.lines_truncated,
            self.prompts_sent,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connection_tracking() {
        let metrics = CoreMetrics::new();

        metrics.connection_opened();
        metrics.connection_opened();
        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.connections_active, 2);
        assert_eq!(snapshot.connections_opened, 2);

        metrics.connection_destroyed();
        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.connections_active, 1);
        assert_eq!(snapshot.connections_opened, 2);
    }

    #[test]
    fn test_active_never_underflows() {
        let metrics = CoreMetrics::new();
        metrics.connection_destroyed();
        assert_eq!(metrics.snapshot().connections_active, 0);
    }

    #[test]
    fn test_throughput_tracking() {
        let metrics = CoreMetrics::new();

        metrics.bytes_sent(100);
        metrics.bytes_received(200);
        metrics.command_dispatched();
        metrics.command_discarded();
        metrics.line_truncated();
        metrics.prompt_sent();

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.bytes_sent, 100);
        assert_eq!(snapshot.bytes_received, 200);
        assert_eq!(snapshot.commands_dispatched, 1);
        assert_eq!(snapshot.commands_discarded, 1);
        assert_eq!(snapshot.lines_truncated, 1);
        assert_eq!(snapshot.prompts_sent, 1);
        assert_eq!(
            snapshot.to_string(),
            "connections 0/0 bytes 100/200 commands 1 (discarded 1, truncated 1) prompts 1"
        );
    }
}
