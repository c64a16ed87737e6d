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


//! MudCore Connection Core
//!
//! The non-blocking, single-threaded heart of a scripted multi-user telnet server. It owns
//! client sockets, speaks telnet through [`mudcore_telnetcodec`], turns input into command
//! lines and hands them one at a time to a [`CommandExecutor`], usually a scripting runtime.
//!
//! # Architecture
//!
//! ```text
//! TelnetServer (mio)
//!     ↓ interests / readiness
//! ConnectionRegistry ──▶ CommandExecutor
//!     ↓          ◀── ConnectionControl
//! Connection → TelnetCodec, line buffer, command queue, output buffer
//! ```
//!
//! Each tick runs the same phases: collect poll interests, dispatch readiness, reap,
//! dispatch commands, expire delays and emit prompts. Nothing blocks and no locks are
//! taken; the executor acts on connections only through the [`ConnectionControl`] it is
//! handed during a callback.
//!
//! # Example
//!
//! ```no_run
//! use mudcore_server::{
//!     CommandExecutor, ConnectionControl, Handle, ServerConfig, TelnetServer,
//! };
//!
//! struct Echo;
//!
//! impl CommandExecutor for Echo {
//!     fn on_command(&mut self, control: &mut dyn ConnectionControl, handle: Handle, line: &[u8]) {
//!         let text = String::from_utf8_lossy(line);
//!         let _ = control.append(handle, &format!("{text}\r\n"));
//!     }
//! }
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut server = TelnetServer::bind(ServerConfig::default())?;
//!     let mut executor = Echo;
//!     loop {
//!         server.tick(&mut executor)?;
//!     }
//! }
//! ```

#![warn(missing_docs, future_incompatible, rust_2018_idioms)]

mod buffer;
mod config;
mod connection;
mod error;
mod executor;
pub mod metrics;
mod poll;
mod queue;
mod registry;
mod server;
mod socket;
mod types;

pub use buffer::BoundedBuffer;
pub use config::{CoreConfig, ServerConfig};
pub use connection::{Connection, LINE_TRUNCATED_NOTICE, QUEUE_FULL_NOTICE};
pub use error::{CoreError, CoreResult, ExecutorError};
pub use executor::{CommandExecutor, ConnectionControl};
pub use metrics::{CoreMetrics, MetricsSnapshot};
pub use poll::{PollInterest, PollReady};
pub use queue::CommandQueue;
pub use registry::ConnectionRegistry;
pub use server::TelnetServer;
pub use socket::{MioSocket, Socket};
pub use types::{ConnectionInfo, ConnectionState, Handle, ScriptRef};

pub use mudcore_telnetcodec::naws::WindowSize;
