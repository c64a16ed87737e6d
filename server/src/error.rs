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


//! Error types for the connection core

use crate::types::Handle;
use thiserror::Error;

/// Result type for core operations
pub type CoreResult<T> = std::result::Result<T, CoreError>;

/// Connection core error types
#[derive(Debug, Error)]
pub enum CoreError {
    /// I/O error from a socket or the poller
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Protocol error from the codec layer
    #[error("Protocol error: {0}")]
    Protocol(#[from] mudcore_telnetcodec::CodecError),

    /// Connection with the given handle was not found
    #[error("Connection {0} not found")]
    ConnectionNotFound(Handle),

    /// A connection with the given handle already exists
    #[error("Connection {0} already registered")]
    DuplicateHandle(Handle),

    /// A delay was negative, not finite or too large
    #[error("Invalid delay of {seconds} seconds for {handle}")]
    InvalidDelay {
        /// Connection the delay was requested for
        handle: Handle,
        /// The rejected duration
        seconds: f64,
    },

    /// An executor callback failed
    #[error("Executor error: {0}")]
    Executor(#[from] ExecutorError),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    Config(String),
}

impl CoreError {
    /// Check if the error is a connection error
    pub fn is_connection_error(&self) -> bool {
        matches!(
            self,
            CoreError::ConnectionNotFound(_) | CoreError::DuplicateHandle(_) | CoreError::Io(_)
        )
    }

    /// Check if the error is a protocol error
    pub fn is_protocol_error(&self) -> bool {
        matches!(self, CoreError::Protocol(_))
    }
}

/// Failure reported by a [`CommandExecutor`](crate::CommandExecutor) callback.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct ExecutorError {
    message: String,
}

impl ExecutorError {
    /// Create an error carrying `message`
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    /// The failure description
    pub fn message(&self) -> &str {
        &self.message
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_is_connection_error() {
        assert!(CoreError::ConnectionNotFound(Handle::new(1)).is_connection_error());
        assert!(CoreError::DuplicateHandle(Handle::new(1)).is_connection_error());
        assert!(!CoreError::Config("bad".into()).is_connection_error());
    }

    #[test]
    fn test_error_display() {
        let err = CoreError::ConnectionNotFound(Handle::new(42));
        assert_eq!(err.to_string(), "Connection conn-42 not found");

        let err = CoreError::InvalidDelay {
            handle: Handle::new(3),
            seconds: -1.5,
        };
        assert_eq!(err.to_string(), "Invalid delay of -1.5 seconds for conn-3");

        let err = CoreError::from(ExecutorError::new("script crashed"));
        assert_eq!(err.to_string(), "Executor error: script crashed");
        assert!(!err.is_protocol_error());
    }
}
