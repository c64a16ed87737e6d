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


//! Reference driver built on mio
//!
//! [`TelnetServer`] owns the poller and the listening socket and runs the registry phases
//! once per [`tick`](TelnetServer::tick). Applications that already have an event loop can
//! skip it and drive a [`ConnectionRegistry`] directly.

use crate::config::ServerConfig;
use crate::error::{CoreError, CoreResult};
use crate::executor::CommandExecutor;
use crate::poll::PollReady;
use crate::registry::ConnectionRegistry;
use crate::socket::MioSocket;
use crate::types::Handle;
use mio::net::TcpListener;
use mio::{Events, Interest, Poll, Token};
use std::io;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;
use tracing::{debug, error, info, instrument, warn};

const LISTENER: Token = Token(0);

/// A single-threaded telnet server
pub struct TelnetServer {
    config: ServerConfig,
    poll: Poll,
    events: Events,
    listener: TcpListener,
    registry: ConnectionRegistry<MioSocket>,
    next_handle: usize,
}

impl TelnetServer {
    /// Bind the listening socket
    pub fn bind(config: ServerConfig) -> CoreResult<Self> {
        config.validate().map_err(CoreError::Config)?;
        let poll = Poll::new()?;
        let mut listener = TcpListener::bind(config.bind_address)?;
        poll.registry()
            .register(&mut listener, LISTENER, Interest::READABLE)?;
        info!(address = %listener.local_addr()?, "Listening");
        Ok(Self {
            events: Events::with_capacity(config.poll_capacity),
            registry: ConnectionRegistry::new(config.core.clone()),
            config,
            poll,
            listener,
            next_handle: 1,
        })
    }

    /// Address the server is listening on
    pub fn local_addr(&self) -> CoreResult<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    /// The connection registry
    pub fn registry(&self) -> &ConnectionRegistry<MioSocket> {
        &self.registry
    }

    /// The connection registry, mutably
    pub fn registry_mut(&mut self) -> &mut ConnectionRegistry<MioSocket> {
        &mut self.registry
    }

    /// Run one iteration of the server loop
    ///
    /// Accepts pending clients, waits for readiness up to the tick interval (or the next
    /// delay deadline, if sooner) and then runs every registry phase.
    pub fn tick<E>(&mut self, executor: &mut E) -> CoreResult<()>
    where
        E: CommandExecutor + ?Sized,
    {
        self.accept(executor)?;
        self.arm_interests();

        let mut timeout = self.config.tick_interval;
        if let Some(deadline) = self.registry.next_deadline() {
            timeout = timeout.min(deadline.saturating_duration_since(Instant::now()));
        }
        match self.poll.poll(&mut self.events, Some(timeout)) {
            Ok(()) => {}
            Err(err) if err.kind() == io::ErrorKind::Interrupted => return Ok(()),
            Err(err) => return Err(err.into()),
        }

        let ready: Vec<PollReady> = self
            .events
            .iter()
            .filter(|event| event.token() != LISTENER)
            .map(|event| PollReady {
                handle: Handle::new(event.token().0),
                readable: event.is_readable() || event.is_read_closed(),
                writable: event.is_writable(),
                error: event.is_error(),
            })
            .collect();

        self.registry.dispatch_ready(&ready, executor);
        self.registry.reap(executor);
        self.registry.dispatch_commands(executor);
        self.registry.expire_delays(Instant::now(), executor);
        self.registry.send_prompts(executor);
        Ok(())
    }

    /// Tick until `running` is cleared, then tear everything down
    #[instrument(skip_all)]
    pub fn run<E>(&mut self, executor: &mut E, running: &AtomicBool) -> CoreResult<()>
    where
        E: CommandExecutor + ?Sized,
    {
        while running.load(Ordering::Relaxed) {
            self.tick(executor)?;
        }
        self.shutdown(executor);
        Ok(())
    }

    /// Close every connection, notifying the executor once for each
    pub fn shutdown<E>(&mut self, executor: &mut E)
    where
        E: CommandExecutor + ?Sized,
    {
        info!(connections = self.registry.len(), "Shutting down");
        self.registry.teardown(executor);
    }

    fn accept<E>(&mut self, executor: &mut E) -> CoreResult<()>
    where
        E: CommandExecutor + ?Sized,
    {
        loop {
            match self.listener.accept() {
                Ok((mut stream, peer)) => {
                    if self.registry.len() >= self.config.max_connections {
                        warn!(peer = %peer, limit = self.config.max_connections, "Connection refused");
                        continue;
                    }
                    let handle = Handle::new(self.next_handle);
                    self.next_handle += 1;
                    self.poll.registry().register(
                        &mut stream,
                        Token(handle.as_usize()),
                        Interest::READABLE | Interest::WRITABLE,
                    )?;
                    let socket = MioSocket::new(stream, peer, self.poll.registry().try_clone()?);
                    info!(handle = %handle, peer = %peer, "Accepted connection");
                    self.registry.insert(handle, socket, executor)?;
                }
                Err(err) if err.kind() == io::ErrorKind::WouldBlock => return Ok(()),
                Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
                Err(err) => {
                    error!(error = %err, "Accept failed");
                    return Ok(());
                }
            }
        }
    }

    /// Re-arm every connection with its current interest
    ///
    /// Only open connections are armed readable. A connection that wants neither readiness
    /// is taken off the poller, since mio rejects an empty interest; input that arrives
    /// meanwhile is reported once it is armed readable again.
    fn arm_interests(&mut self) {
        for interest in self.registry.poll_interests() {
            let mio_interest = match (interest.readable, interest.writable) {
                (true, true) => Some(Interest::READABLE | Interest::WRITABLE),
                (true, false) => Some(Interest::READABLE),
                (false, true) => Some(Interest::WRITABLE),
                (false, false) => None,
            };
            let Some(socket) = self.registry.socket_mut(interest.handle) else {
                continue;
            };
            if let Err(err) = socket.rearm(Token(interest.handle.as_usize()), mio_interest) {
                debug!(handle = %interest.handle, error = %err, "Rearm failed");
            }
        }
    }
}

impl std::fmt::Debug for TelnetServer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TelnetServer")
            .field("config", &self.config)
            .field("registry", &self.registry)
            .finish()
    }
}
