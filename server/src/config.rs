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


//! Core and driver configuration

use std::net::{Ipv4Addr, SocketAddr};
use std::time::Duration;

/// Per-connection limits and negotiation policy
///
/// # Example
///
/// ```
/// use mudcore_server::CoreConfig;
///
/// let config = CoreConfig::default()
///     .with_line_buffer_size(256)
///     .with_command_queue_size(4)
///     .with_offer_compression(false);
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone)]
pub struct CoreConfig {
    /// Capacity of the input line buffer; longer lines are truncated
    pub line_buffer_size: usize,

    /// Capacity of the outbound wire buffer
    pub output_buffer_size: usize,

    /// Maximum number of complete lines waiting for dispatch
    pub command_queue_size: usize,

    /// Size of the scratch buffer used for a single `recv` call
    pub recv_buffer_size: usize,

    /// Offer MCCP2 (WILL COMPRESS2) when a connection is created
    pub offer_compression: bool,

    /// Request window size reports (DO NAWS) when a connection is created
    pub offer_naws: bool,

    /// How long an append may wait on a peer that accepts no bytes before the connection
    /// is closed
    ///
    /// Only consulted when more output is appended than the output buffer holds. The wait
    /// restarts whenever the peer accepts anything.
    pub output_stall_timeout: Duration,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            line_buffer_size: 512,
            output_buffer_size: 4096,
            command_queue_size: 10,
            recv_buffer_size: 512,
            offer_compression: true,
            offer_naws: true,
            output_stall_timeout: Duration::from_secs(10),
        }
    }
}

impl CoreConfig {
    /// Set the line buffer capacity
    pub fn with_line_buffer_size(mut self, size: usize) -> Self {
        self.line_buffer_size = size;
        self
    }

    /// Set the output buffer capacity
    pub fn with_output_buffer_size(mut self, size: usize) -> Self {
        self.output_buffer_size = size;
        self
    }

    /// Set the command queue capacity
    pub fn with_command_queue_size(mut self, size: usize) -> Self {
        self.command_queue_size = size;
        self
    }

    /// Set the receive scratch buffer size
    pub fn with_recv_buffer_size(mut self, size: usize) -> Self {
        self.recv_buffer_size = size;
        self
    }

    /// Enable or disable the MCCP2 offer
    pub fn with_offer_compression(mut self, enabled: bool) -> Self {
        self.offer_compression = enabled;
        self
    }

    /// Enable or disable the NAWS request
    pub fn with_offer_naws(mut self, enabled: bool) -> Self {
        self.offer_naws = enabled;
        self
    }

    /// Set the output stall timeout
    pub fn with_output_stall_timeout(mut self, timeout: Duration) -> Self {
        self.output_stall_timeout = timeout;
        self
    }

    /// Validate the configuration
    ///
    /// Returns an error if the configuration is invalid.
    pub fn validate(&self) -> Result<(), String> {
        if self.line_buffer_size == 0 {
            return Err("line_buffer_size must be greater than 0".to_string());
        }

        if self.output_buffer_size == 0 {
            return Err("output_buffer_size must be greater than 0".to_string());
        }

        if self.command_queue_size == 0 {
            return Err("command_queue_size must be greater than 0".to_string());
        }

        if self.recv_buffer_size == 0 {
            return Err("recv_buffer_size must be greater than 0".to_string());
        }

        if self.output_stall_timeout.is_zero() {
            return Err("output_stall_timeout must be greater than 0".to_string());
        }

        Ok(())
    }
}

/// Reference driver configuration
///
/// # Example
///
/// ```
/// use mudcore_server::ServerConfig;
/// use std::time::Duration;
///
/// let config = ServerConfig::new("0.0.0.0:4000".parse().unwrap())
///     .with_max_connections(200)
///     .with_tick_interval(Duration::from_millis(50));
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address to bind the server to
    pub bind_address: SocketAddr,

    /// Maximum number of concurrent connections; further clients are refused at accept
    pub max_connections: usize,

    /// Number of readiness events fetched per poll
    pub poll_capacity: usize,

    /// Longest time a tick waits for readiness
    ///
    /// Shortened automatically when a delayed connection is due earlier.
    pub tick_interval: Duration,

    /// Per-connection settings
    pub core: CoreConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: SocketAddr::from((Ipv4Addr::LOCALHOST, 4000)),
            max_connections: 1000,
            poll_capacity: 1024,
            tick_interval: Duration::from_millis(100),
            core: CoreConfig::default(),
        }
    }
}

impl ServerConfig {
    /// Create a new configuration with the given bind address
    ///
    /// All other settings will use their default values.
    pub fn new(bind_address: SocketAddr) -> Self {
        Self {
            bind_address,
            ..Default::default()
        }
    }

    /// Set the maximum number of concurrent connections
    pub fn with_max_connections(mut self, max: usize) -> Self {
        self.max_connections = max;
        self
    }

    /// Set the number of events fetched per poll
    pub fn with_poll_capacity(mut self, capacity: usize) -> Self {
        self.poll_capacity = capacity;
        self
    }

    /// Set the tick interval
    pub fn with_tick_interval(mut self, interval: Duration) -> Self {
        self.tick_interval = interval;
        self
    }

    /// Set the per-connection settings
    pub fn with_core(mut self, core: CoreConfig) -> Self {
        self.core = core;
        self
    }

    /// Validate the configuration
    ///
    /// Returns an error if the configuration is invalid.
    pub fn validate(&self) -> Result<(), String> {
        if self.max_connections == 0 {
            return Err("max_connections must be greater than 0".to_string());
        }

        if self.poll_capacity == 0 {
            return Err("poll_capacity must be greater than 0".to_string());
        }

        if self.tick_interval.is_zero() {
            return Err("tick_interval must be greater than 0".to_string());
        }

        self.core.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ServerConfig::default();
        assert_eq!(config.max_connections, 1000);
        assert_eq!(config.bind_address.port(), 4000);
        assert_eq!(config.core.line_buffer_size, 512);
        assert_eq!(config.core.output_buffer_size, 4096);
        assert_eq!(config.core.command_queue_size, 10);
        assert!(config.core.offer_compression);
        assert!(config.core.offer_naws);
        assert_eq!(config.core.output_stall_timeout, Duration::from_secs(10));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_builder_pattern() {
        let config = ServerConfig::default()
            .with_max_connections(500)
            .with_tick_interval(Duration::from_millis(250))
            .with_core(CoreConfig::default().with_command_queue_size(3).with_offer_naws(false));

        assert_eq!(config.max_connections, 500);
        assert_eq!(config.tick_interval, Duration::from_millis(250));
        assert_eq!(config.core.command_queue_size, 3);
        assert!(!config.core.offer_naws);
    }

    #[test]
    fn test_validation() {
        let mut config = ServerConfig::default();

        // Valid config
        assert!(config.validate().is_ok());

        // Invalid: zero max_connections
        config.max_connections = 0;
        assert!(config.validate().is_err());

        // Invalid: zero tick interval
        config.max_connections = 1000;
        config.tick_interval = Duration::ZERO;
        assert!(config.validate().is_err());

        // Invalid: nested core setting
        config.tick_interval = Duration::from_millis(100);
        config.core.output_buffer_size = 0;
        assert_eq!(
            config.validate(),
            Err("output_buffer_size must be greater than 0".to_string())
        );

        // Invalid: no time to wait on a slow peer
        config.core.output_buffer_size = 4096;
        config.core.output_stall_timeout = Duration::ZERO;
        assert!(config.validate().is_err());
    }
}
