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


use crate::TelnetOption;
use thiserror::Error;

/// Result Type for Codec Operations
pub type CodecResult<T> = Result<T, CodecError>;

/// Represents possible errors that can occur in the codec handling process.
#[derive(Debug, Error)]
pub enum CodecError {
    /// An I/O error occurred while reading from or writing to the underlying stream.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The MCCP stream compressor failed.
    #[error("compression error: {reason}")]
    Compression {
        /// Description of the failure
        reason: String,
    },

    /// An operation required an option state that was not negotiated.
    #[error("negotiation error for option {option}: {reason}")]
    NegotiationError {
        /// The option concerned
        option: TelnetOption,
        /// Description of what went wrong
        reason: String,
    },

    /// A subnegotiation payload could not be interpreted.
    #[error("subnegotiation error for option {option}: {reason}")]
    SubnegotiationError {
        /// The telnet option being subnegotiated
        option: TelnetOption,
        /// Specific reason for the failure
        reason: SubnegotiationErrorKind,
    },
}

/// Specific kinds of subnegotiation errors with structured context.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SubnegotiationErrorKind {
    /// The payload does not have the length the option requires.
    #[error("invalid length (required: {required}, available: {available})")]
    InvalidLength {
        /// Number of bytes required
        required: usize,
        /// Number of bytes available
        available: usize,
    },

    /// The payload exceeded the subnegotiation size limit and was discarded.
    #[error("payload larger than {limit} bytes")]
    Overflow {
        /// The configured limit
        limit: usize,
    },

    /// Unexpected data present when none was expected.
    #[error("unexpected data: {reason}")]
    UnexpectedData {
        /// Description of why the data is unexpected
        reason: String,
    },
}

impl CodecError {
    /// Whether the error stems from the peer sending malformed data.
    ///
    /// Such errors are recoverable; everything else is fatal for the connection.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, CodecError::SubnegotiationError { .. })
    }
}
