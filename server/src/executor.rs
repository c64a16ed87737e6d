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


//! The contract between the connection core and the command executor
//!
//! The core owns sockets, buffers and the telnet state of every connection. Everything a
//! player's line *means* belongs to a [`CommandExecutor`], usually an embedded scripting
//! runtime. The core calls the executor at fixed points of a tick and passes it a
//! [`ConnectionControl`] through which it can act on any connection, including ones other
//! than the one the callback is about.

use crate::error::{CoreResult, ExecutorError};
use crate::types::{ConnectionInfo, ConnectionState, Handle, ScriptRef};
use mudcore_telnetcodec::naws::WindowSize;

/// Operations an executor may perform on connections during a callback.
///
/// Every operation naming a handle that is not in the registry reports a warning and
/// returns [`CoreError::ConnectionNotFound`](crate::CoreError::ConnectionNotFound) without
/// touching anything else.
pub trait ConnectionControl {
    /// Queue `text` for the connection, preceded by a line break if a prompt is pending
    /// on the terminal
    fn append(&mut self, handle: Handle, text: &str) -> CoreResult<()>;

    /// Close the connection immediately; buffered output is discarded
    fn close(&mut self, handle: Handle) -> CoreResult<()>;

    /// Stop processing input and close once buffered output has been sent
    fn drain(&mut self, handle: Handle) -> CoreResult<()>;

    /// Pause command dispatch and prompts for `seconds`
    ///
    /// Delaying an already delayed connection extends its deadline.
    fn delay(&mut self, handle: Handle, seconds: f64) -> CoreResult<()>;

    /// Like [`delay`](Self::delay), but [`CommandExecutor::on_resume`] is called when the
    /// deadline passes
    fn suspend(&mut self, handle: Handle, seconds: f64) -> CoreResult<()>;

    /// Offer (`true`) or withdraw (`false`) server-side echo, used for password entry
    fn set_echo(&mut self, handle: Handle, enabled: bool) -> CoreResult<()>;

    /// Terminal size last reported by the client
    fn window_size(&self, handle: Handle) -> Option<WindowSize>;

    /// Current state of the connection
    fn state(&self, handle: Handle) -> Option<ConnectionState>;

    /// Snapshot of the connection
    fn info(&self, handle: Handle) -> Option<ConnectionInfo>;

    /// Handles of every connection in the registry, in ascending order
    fn handles(&self) -> Vec<Handle>;
}

/// Callbacks through which the core hands work to the application.
///
/// Only [`on_command`](Self::on_command) is required. The defaults attach no script
/// context, ignore resumes and closes, and prompt with `"> "`.
pub trait CommandExecutor {
    /// A connection was created and its negotiation offers queued
    ///
    /// The returned reference is stored with the connection and handed to
    /// [`release`](Self::release) when the connection is destroyed.
    fn on_new_connection(
        &mut self,
        control: &mut dyn ConnectionControl,
        handle: Handle,
    ) -> Option<ScriptRef> {
        let _ = (control, handle);
        None
    }

    /// A complete input line was dequeued
    ///
    /// Called at most once per connection per tick, with the line terminator removed.
    fn on_command(&mut self, control: &mut dyn ConnectionControl, handle: Handle, line: &[u8]);

    /// A delay requested through [`ConnectionControl::suspend`] expired
    fn on_resume(&mut self, control: &mut dyn ConnectionControl, handle: Handle) {
        let _ = (control, handle);
    }

    /// The connection closed; called exactly once, before its socket is released
    ///
    /// A failure is logged and teardown continues.
    fn on_close(
        &mut self,
        control: &mut dyn ConnectionControl,
        handle: Handle,
    ) -> Result<(), ExecutorError> {
        let _ = (control, handle);
        Ok(())
    }

    /// Text of the prompt for a connection that produced output or ran a command
    ///
    /// A failure is logged and the connection is closed.
    fn prompt(
        &mut self,
        control: &mut dyn ConnectionControl,
        handle: Handle,
    ) -> Result<String, ExecutorError> {
        let _ = (control, handle);
        Ok("> ".to_string())
    }

    /// The connection is being destroyed; `script` will never be mentioned again
    fn release(&mut self, handle: Handle, script: ScriptRef) {
        let _ = (handle, script);
    }
}
