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


//! A single client connection
//!
//! A [`Connection`] owns the socket, the telnet codec, the line buffer, the command queue
//! and the outbound wire buffer of one client. It never calls the executor itself; the
//! [`ConnectionRegistry`](crate::ConnectionRegistry) drives it through the tick phases and
//! forwards executor requests to it.

use crate::buffer::BoundedBuffer;
use crate::config::CoreConfig;
use crate::error::{CoreError, CoreResult};
use crate::metrics::CoreMetrics;
use crate::poll::{PollInterest, PollReady};
use crate::queue::CommandQueue;
use crate::socket::Socket;
use crate::types::{ConnectionInfo, ConnectionState, Handle, ScriptRef};
use bytes::{Bytes, BytesMut};
use mudcore_telnetcodec::naws::WindowSize;
use mudcore_telnetcodec::{
    CodecResult, TelnetCodec, TelnetEvent, TelnetOption, TelnetSide, TelnetVerb, consts,
};
use std::io;
use std::rc::Rc;
use std::time::{Duration, Instant};
use tokio_util::codec::Encoder;
use tracing::{debug, error, info, trace, warn};

/// Appended when a line arrives while the command queue is full
pub const QUEUE_FULL_NOTICE: &str = "Input queue full. Command discarded.\r\n";

/// Appended when an input line exceeds the line buffer
pub const LINE_TRUNCATED_NOTICE: &str = "Input line too long. Command truncated.\r\n";

/// Pause between send attempts while the peer accepts nothing
const STALL_BACKOFF: Duration = Duration::from_millis(1);

/// One client connection and everything it owns
pub struct Connection<S> {
    handle: Handle,
    socket: Option<S>,
    state: ConnectionState,
    codec: TelnetCodec,
    line_buffer: BoundedBuffer,
    output_buffer: BoundedBuffer,
    command_queue: CommandQueue,
    recv_buffer: Box<[u8]>,
    scratch: BytesMut,
    skip_until_newline: bool,
    needs_prompt: bool,
    needs_newline: bool,
    self_delayed: bool,
    delay_end: Option<Instant>,
    close_pending: bool,
    script: Option<ScriptRef>,
    window_size: Option<WindowSize>,
    output_stall_timeout: Duration,
    metrics: Rc<CoreMetrics>,
    created_at: Instant,
    bytes_sent: u64,
    bytes_received: u64,
    commands_received: u64,
}

impl<S: Socket> Connection<S> {
    /// Create an open connection around `socket`
    ///
    /// Nothing is sent until [`send_offers`](Self::send_offers) is called.
    pub fn new(handle: Handle, socket: S, config: &CoreConfig, metrics: Rc<CoreMetrics>) -> Self {
        let mut codec = TelnetCodec::new();
        if !config.offer_compression {
            codec.set_supported_local(TelnetOption::Compress2, false);
        }
        if !config.offer_naws {
            codec.set_supported_remote(TelnetOption::NAWS, false);
        }
        Self {
            handle,
            socket: Some(socket),
            state: ConnectionState::Open,
            codec,
            line_buffer: BoundedBuffer::new(config.line_buffer_size),
            output_buffer: BoundedBuffer::new(config.output_buffer_size),
            command_queue: CommandQueue::new(config.command_queue_size),
            recv_buffer: vec![0; config.recv_buffer_size].into_boxed_slice(),
            scratch: BytesMut::new(),
            skip_until_newline: false,
            needs_prompt: true,
            needs_newline: false,
            self_delayed: false,
            delay_end: None,
            close_pending: false,
            script: None,
            window_size: None,
            output_stall_timeout: config.output_stall_timeout,
            metrics,
            created_at: Instant::now(),
            bytes_sent: 0,
            bytes_received: 0,
            commands_received: 0,
        }
    }

    /// Queue `WILL COMPRESS2` and `DO NAWS` for the options this connection supports
    pub fn send_offers(&mut self) {
        if self.codec.is_supported_local(TelnetOption::Compress2) {
            self.negotiate(TelnetVerb::Will, TelnetOption::Compress2);
        }
        if self.codec.is_supported_remote(TelnetOption::NAWS) {
            self.negotiate(TelnetVerb::Do, TelnetOption::NAWS);
        }
    }

    // #### Accessors ##########################################################

    /// Connection handle
    pub fn handle(&self) -> Handle {
        self.handle
    }

    /// Current lifecycle state
    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// Check if the connection reached its terminal state
    pub fn is_closed(&self) -> bool {
        self.state == ConnectionState::Closed
    }

    /// Check if a prompt is due
    pub fn needs_prompt(&self) -> bool {
        self.needs_prompt
    }

    /// Terminal size last reported through NAWS
    pub fn window_size(&self) -> Option<WindowSize> {
        self.window_size
    }

    /// Deadline of the current delay
    pub fn delay_end(&self) -> Option<Instant> {
        self.delay_end
    }

    /// Check if the current delay was requested through a suspend
    pub fn is_self_delayed(&self) -> bool {
        self.self_delayed
    }

    /// Number of complete lines waiting for dispatch
    pub fn queued_commands(&self) -> usize {
        self.command_queue.len()
    }

    /// Wire bytes not yet accepted by the socket
    pub fn pending_output(&self) -> &[u8] {
        self.output_buffer.as_slice()
    }

    /// Check if MCCP2 compression is active
    pub fn is_compressing(&self) -> bool {
        self.codec.is_compressing()
    }

    /// The telnet codec, for option queries
    pub fn codec(&self) -> &TelnetCodec {
        &self.codec
    }

    /// The socket, until it has been released
    pub fn socket_mut(&mut self) -> Option<&mut S> {
        self.socket.as_mut()
    }

    /// Get a snapshot of the connection
    pub fn info(&self) -> ConnectionInfo {
        ConnectionInfo {
            handle: self.handle,
            state: self.state,
            created_at: self.created_at,
            bytes_sent: self.bytes_sent,
            bytes_received: self.bytes_received,
            commands_received: self.commands_received,
            commands_queued: self.command_queue.len(),
            window_size: self.window_size,
            compressing: self.codec.is_compressing(),
        }
    }

    // #### Lifecycle ##########################################################

    /// Close immediately, discarding buffered input and output
    ///
    /// Closing a closed connection does nothing.
    pub fn close(&mut self) {
        if self.state == ConnectionState::Closed {
            return;
        }
        info!(handle = %self.handle, from = %self.state, "Connection closed");
        self.state = ConnectionState::Closed;
        self.close_pending = true;
        self.delay_end = None;
        self.self_delayed = false;
        self.output_buffer.clear();
        self.line_buffer.clear();
        self.command_queue.clear();
    }

    /// Stop application processing and close once buffered output is sent
    ///
    /// An active compressed stream is finished first so the client sees its end marker.
    pub fn drain(&mut self) {
        if !matches!(
            self.state,
            ConnectionState::Open | ConnectionState::Delaying
        ) {
            return;
        }
        debug!(handle = %self.handle, pending = self.output_buffer.len(), "Draining connection");
        self.state = ConnectionState::Draining;
        self.delay_end = None;
        self.self_delayed = false;
        self.emit(|codec, dst| codec.end_compression(dst));
    }

    /// Delay the connection for `seconds` measured from `now`
    ///
    /// A delayed connection is extended from its current deadline. Draining and closed
    /// connections ignore the request. When `resume` is set, [`expire_delay`] reports the
    /// expiry so the executor can be resumed.
    ///
    /// [`expire_delay`]: Self::expire_delay
    pub fn delay(&mut self, now: Instant, seconds: f64, resume: bool) -> CoreResult<()> {
        let start = match self.state {
            ConnectionState::Open => now,
            ConnectionState::Delaying => self.delay_end.unwrap_or(now),
            ConnectionState::Draining | ConnectionState::Closed => {
                debug!(handle = %self.handle, state = %self.state, "Delay ignored");
                return Ok(());
            }
        };
        let deadline = if seconds.is_finite() && seconds >= 0.0 {
            Duration::try_from_secs_f64(seconds)
                .ok()
                .and_then(|duration| start.checked_add(duration))
        } else {
            None
        };
        let Some(deadline) = deadline else {
            warn!(handle = %self.handle, seconds, "Rejected invalid delay");
            return Err(CoreError::InvalidDelay {
                handle: self.handle,
                seconds,
            });
        };
        debug!(handle = %self.handle, seconds, resume, "Connection delayed");
        self.state = ConnectionState::Delaying;
        self.delay_end = Some(deadline);
        if resume {
            self.self_delayed = true;
        }
        Ok(())
    }

    /// Reopen the connection if its delay ended before `now`
    ///
    /// Returns `true` when the delay was a suspend and the executor must be resumed.
    pub fn expire_delay(&mut self, now: Instant) -> bool {
        if self.state != ConnectionState::Delaying {
            return false;
        }
        if self.delay_end.is_some_and(|end| now <= end) {
            return false;
        }
        debug!(handle = %self.handle, "Delay expired");
        self.state = ConnectionState::Open;
        self.delay_end = None;
        std::mem::take(&mut self.self_delayed)
    }

    // #### Polling ############################################################

    /// The readiness this connection wants to be woken for
    pub fn poll_interest(&self) -> PollInterest {
        PollInterest {
            handle: self.handle,
            readable: self.state == ConnectionState::Open,
            writable: self.state != ConnectionState::Closed && !self.output_buffer.is_empty(),
        }
    }

    /// Service readiness reported by the poller
    pub fn handle_ready(&mut self, ready: &PollReady) {
        if self.state == ConnectionState::Closed {
            return;
        }
        if ready.error {
            debug!(handle = %self.handle, "Socket error condition");
            self.close();
            return;
        }
        if ready.writable {
            self.flush();
        }
        if ready.readable {
            self.receive_from_socket();
        }
    }

    /// Send buffered output until the socket would block
    pub fn flush(&mut self) {
        while self.state != ConnectionState::Closed && !self.output_buffer.is_empty() {
            let Some(socket) = self.socket.as_mut() else {
                return;
            };
            match socket.send(self.output_buffer.as_slice()) {
                Ok(0) => {
                    debug!(handle = %self.handle, "Socket accepted no bytes");
                    self.close();
                }
                Ok(count) => {
                    trace!(handle = %self.handle, bytes = count, "Sent");
                    self.output_buffer.drain(count);
                    self.bytes_sent += count as u64;
                    self.metrics.bytes_sent(count);
                }
                Err(err) => match err.kind() {
                    io::ErrorKind::WouldBlock => break,
                    io::ErrorKind::Interrupted => continue,
                    io::ErrorKind::ConnectionReset
                    | io::ErrorKind::ConnectionAborted
                    | io::ErrorKind::BrokenPipe => {
                        debug!(handle = %self.handle, "Peer went away during send");
                        self.close();
                    }
                    _ => {
                        error!(handle = %self.handle, error = %err, "Send failed");
                        self.close();
                    }
                },
            }
        }
    }

    fn receive_from_socket(&mut self) {
        while self.state == ConnectionState::Open {
            let Some(socket) = self.socket.as_mut() else {
                return;
            };
            match socket.recv(&mut self.recv_buffer) {
                Ok(0) => {
                    debug!(handle = %self.handle, "Peer closed the connection");
                    self.close();
                }
                Ok(count) => {
                    trace!(handle = %self.handle, bytes = count, "Received");
                    self.bytes_received += count as u64;
                    self.metrics.bytes_received(count);
                    let chunk = Bytes::copy_from_slice(&self.recv_buffer[..count]);
                    self.receive(&chunk);
                }
                Err(err) => match err.kind() {
                    io::ErrorKind::WouldBlock => break,
                    io::ErrorKind::Interrupted => continue,
                    io::ErrorKind::ConnectionReset | io::ErrorKind::ConnectionAborted => {
                        debug!(handle = %self.handle, "Peer reset the connection");
                        self.close();
                    }
                    _ => {
                        error!(handle = %self.handle, error = %err, "Receive failed");
                        self.close();
                    }
                },
            }
        }
    }

    // #### Input ##############################################################

    /// Feed raw bytes from the client through the telnet codec
    ///
    /// Application data is assembled into lines; negotiation replies are queued as output.
    /// Malformed input is reported and skipped. Encoding failures while replying close the
    /// connection.
    pub fn receive(&mut self, bytes: &[u8]) {
        let mut src = BytesMut::from(bytes);
        while self.state != ConnectionState::Closed {
            let Some(event) = self.codec.next_event(&mut src) else {
                break;
            };
            self.handle_event(event);
        }
    }

    /// Remove the oldest complete line
    pub fn pop_command(&mut self) -> Option<Bytes> {
        self.command_queue.pop()
    }

    fn handle_event(&mut self, event: TelnetEvent) {
        match event {
            TelnetEvent::Data(byte) => self.assemble(byte),
            TelnetEvent::Transmit(bytes) => self.emit(|codec, dst| codec.transmit(&bytes, dst)),
            TelnetEvent::Negotiate(TelnetVerb::Wont, TelnetOption::NAWS) => {
                debug!(handle = %self.handle, "Client refused NAWS");
                self.stop_naws();
            }
            TelnetEvent::Negotiate(verb, option) => {
                trace!(handle = %self.handle, %verb, %option, "Negotiation received");
            }
            TelnetEvent::OptionStatus(option, side, enabled) => {
                self.option_changed(option, side, enabled)
            }
            TelnetEvent::Subnegotiate(TelnetOption::NAWS, payload) => {
                self.window_size_report(&payload)
            }
            TelnetEvent::Subnegotiate(option, payload) => {
                trace!(handle = %self.handle, %option, len = payload.len(), "Subnegotiation ignored");
            }
            TelnetEvent::Warning(message) => {
                warn!(handle = %self.handle, "Protocol warning: {}", message);
            }
            other => trace!(handle = %self.handle, event = ?other, "Command ignored"),
        }
    }

    fn assemble(&mut self, byte: u8) {
        match byte {
            consts::CR => {}
            consts::LF => {
                self.needs_newline = false;
                self.skip_until_newline = false;
                let line = self.line_buffer.take();
                match self.command_queue.push(line) {
                    Ok(()) => self.commands_received += 1,
                    Err(_) => {
                        debug!(handle = %self.handle, "Command queue full");
                        self.metrics.command_discarded();
                        self.append_output(QUEUE_FULL_NOTICE);
                    }
                }
                self.line_buffer.clear();
            }
            _ if self.skip_until_newline => {}
            consts::BS => {
                self.line_buffer.backspace();
            }
            _ => {
                if !self.line_buffer.append_byte(byte) {
                    debug!(handle = %self.handle, "Input line truncated");
                    self.metrics.line_truncated();
                    self.append_output(LINE_TRUNCATED_NOTICE);
                    self.skip_until_newline = true;
                }
            }
        }
    }

    fn option_changed(&mut self, option: TelnetOption, side: TelnetSide, enabled: bool) {
        debug!(handle = %self.handle, %option, %side, enabled, "Option changed");
        match (option, side, enabled) {
            (TelnetOption::Compress2, TelnetSide::Local, true) => {
                self.emit(|codec, dst| codec.begin_compression(dst))
            }
            (TelnetOption::Compress2, TelnetSide::Local, false) => {
                self.emit(|codec, dst| codec.end_compression(dst))
            }
            _ => {}
        }
    }

    fn window_size_report(&mut self, payload: &[u8]) {
        match WindowSize::decode(payload) {
            Ok(size) => {
                debug!(handle = %self.handle, %size, "Window size reported");
                self.window_size = Some(size);
            }
            Err(err) => {
                warn!(handle = %self.handle, error = %err, "Disabling NAWS");
                self.negotiate(TelnetVerb::Dont, TelnetOption::NAWS);
                self.stop_naws();
            }
        }
    }

    fn stop_naws(&mut self) {
        self.window_size = None;
        self.codec.set_supported_remote(TelnetOption::NAWS, false);
    }

    // #### Output #############################################################

    /// Queue `text` for the client
    ///
    /// A line break is written first when the client's cursor sits after a prompt. When the
    /// output buffer fills up it is drained to the socket and the rest is retried. A peer
    /// that accepts nothing for the configured stall timeout is closed.
    pub fn append_output(&mut self, text: &str) {
        if self.state == ConnectionState::Closed {
            return;
        }
        if self.needs_newline {
            self.needs_newline = false;
            self.emit(|codec, dst| codec.encode(&b"\r\n"[..], dst));
        }
        self.emit(|codec, dst| codec.encode(text.as_bytes(), dst));
        self.needs_prompt = true;
    }

    /// Write a prompt followed by a go-ahead unless SUPPRESS-GO-AHEAD is active
    pub fn send_prompt(&mut self, prompt: &str) {
        if self.state != ConnectionState::Open {
            return;
        }
        self.append_output(prompt);
        self.needs_prompt = false;
        if !self.codec.is_enabled_local(TelnetOption::SuppressGoAhead) {
            self.emit(|codec, dst| codec.send_go_ahead(dst));
        }
        self.needs_newline = true;
        self.metrics.prompt_sent();
    }

    /// Offer or withdraw server-side echo
    pub fn set_echo(&mut self, enabled: bool) {
        let verb = if enabled {
            TelnetVerb::Will
        } else {
            TelnetVerb::Wont
        };
        self.negotiate(verb, TelnetOption::Echo);
    }

    fn negotiate(&mut self, verb: TelnetVerb, option: TelnetOption) {
        self.emit(|codec, dst| codec.negotiate(verb, option, dst).map(|_| ()));
    }

    /// Run an encoding step against the codec and queue the wire bytes it produced
    fn emit<F>(&mut self, encode: F)
    where
        F: FnOnce(&mut TelnetCodec, &mut BytesMut) -> CodecResult<()>,
    {
        if self.state == ConnectionState::Closed {
            return;
        }
        let mut wire = std::mem::take(&mut self.scratch);
        wire.clear();
        match encode(&mut self.codec, &mut wire) {
            Ok(()) => self.push_wire(&wire),
            Err(err) => {
                error!(handle = %self.handle, error = %err, "Protocol error");
                self.close();
            }
        }
        self.scratch = wire;
    }

    fn push_wire(&mut self, mut wire: &[u8]) {
        let mut stalled_since: Option<Instant> = None;
        loop {
            let accepted = self.output_buffer.append(wire);
            wire = &wire[accepted..];
            if wire.is_empty() {
                return;
            }
            let before = self.output_buffer.len();
            self.flush();
            if self.state == ConnectionState::Closed || self.socket.is_none() {
                return;
            }
            if self.output_buffer.len() < before {
                stalled_since = None;
                continue;
            }
            let since = *stalled_since.get_or_insert_with(Instant::now);
            if since.elapsed() >= self.output_stall_timeout {
                warn!(
                    handle = %self.handle,
                    pending = wire.len(),
                    timeout = ?self.output_stall_timeout,
                    "Peer stopped reading"
                );
                self.close();
                return;
            }
            std::thread::sleep(STALL_BACKOFF);
        }
    }

    // #### Registry hooks #####################################################

    pub(crate) fn mark_needs_prompt(&mut self) {
        self.needs_prompt = true;
    }

    pub(crate) fn set_script(&mut self, script: Option<ScriptRef>) {
        self.script = script;
    }

    pub(crate) fn take_script(&mut self) -> Option<ScriptRef> {
        self.script.take()
    }

    /// Returns `true` once after the connection closed
    pub(crate) fn take_close_notification(&mut self) -> bool {
        std::mem::take(&mut self.close_pending)
    }

    pub(crate) fn release_socket(&mut self) {
        if let Some(mut socket) = self.socket.take() {
            trace!(handle = %self.handle, "Releasing socket");
            socket.close();
        }
    }
}

impl<S> std::fmt::Debug for Connection<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection")
            .field("handle", &self.handle)
            .field("state", &self.state)
            .field("queued", &self.command_queue.len())
            .field("pending_output", &self.output_buffer.len())
            .field("window_size", &self.window_size)
            .finish()
    }
}
