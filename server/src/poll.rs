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


//! Readiness exchanged between the registry and a poller
//!
//! The registry does not own a poller. Each tick it contributes one [`PollInterest`] per
//! live connection and later consumes [`PollReady`] results, skipping any whose handle it
//! does not know. This keeps the core usable beside other sockets the driver polls.

use crate::types::Handle;

/// What a connection wants to be woken for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollInterest {
    /// Connection the interest belongs to
    pub handle: Handle,
    /// Input should be read; only while the connection is open
    pub readable: bool,
    /// Buffered output is waiting for the socket
    pub writable: bool,
}

/// Readiness reported by the poller for one handle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PollReady {
    /// Connection the readiness belongs to
    pub handle: Handle,
    /// The socket has input or reached end of stream
    pub readable: bool,
    /// The socket accepts output
    pub writable: bool,
    /// The socket reported an error condition
    pub error: bool,
}

impl PollReady {
    /// Readiness for reading only
    pub fn readable(handle: Handle) -> Self {
        Self {
            handle,
            readable: true,
            ..Default::default()
        }
    }

    /// Readiness for writing only
    pub fn writable(handle: Handle) -> Self {
        Self {
            handle,
            writable: true,
            ..Default::default()
        }
    }

    /// An error condition
    pub fn error(handle: Handle) -> Self {
        Self {
            handle,
            error: true,
            ..Default::default()
        }
    }
}
