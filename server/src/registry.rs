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


//! Connection registry and per-tick phases
//!
//! The registry owns every [`Connection`] and is the only place connections are created
//! and destroyed. A driver calls the phases in order once per tick:
//!
//! 1. [`poll_interests`](ConnectionRegistry::poll_interests)
//! 2. [`dispatch_ready`](ConnectionRegistry::dispatch_ready)
//! 3. [`reap`](ConnectionRegistry::reap)
//! 4. [`dispatch_commands`](ConnectionRegistry::dispatch_commands)
//! 5. [`expire_delays`](ConnectionRegistry::expire_delays)
//! 6. [`send_prompts`](ConnectionRegistry::send_prompts)
//!
//! Connections closed during a phase get their close notification at the end of that
//! phase, and their socket is released right after it. Entries stay in the map until the
//! next reap so a handle is never reused within a tick.

use crate::config::CoreConfig;
use crate::connection::Connection;
use crate::error::{CoreError, CoreResult};
use crate::executor::{CommandExecutor, ConnectionControl};
use crate::metrics::{CoreMetrics, MetricsSnapshot};
use crate::poll::{PollInterest, PollReady};
use crate::socket::Socket;
use crate::types::{ConnectionInfo, ConnectionState, Handle};
use mudcore_telnetcodec::naws::WindowSize;
use std::collections::BTreeMap;
use std::rc::Rc;
use std::time::Instant;
use tracing::{debug, error, trace, warn};

/// Owner of every live connection
///
/// Iteration follows ascending handle order, which makes every phase deterministic.
///
/// Call [`teardown`](Self::teardown) before dropping a registry that still holds
/// connections. Dropping it only closes the sockets: the executor is never told about the
/// close and the script references are never released.
pub struct ConnectionRegistry<S> {
    connections: BTreeMap<Handle, Connection<S>>,
    config: CoreConfig,
    metrics: Rc<CoreMetrics>,
}

impl<S: Socket> ConnectionRegistry<S> {
    /// Create an empty registry whose connections use `config`
    pub fn new(config: CoreConfig) -> Self {
        Self {
            connections: BTreeMap::new(),
            config,
            metrics: Rc::new(CoreMetrics::new()),
        }
    }

    /// The per-connection configuration
    pub fn config(&self) -> &CoreConfig {
        &self.config
    }

    /// Number of connections in the registry, including closed ones awaiting reap
    pub fn len(&self) -> usize {
        self.connections.len()
    }

    /// Check if the registry is empty
    pub fn is_empty(&self) -> bool {
        self.connections.is_empty()
    }

    /// Check if `handle` names a connection in the registry
    pub fn contains(&self, handle: Handle) -> bool {
        self.connections.contains_key(&handle)
    }

    /// Look up a connection
    pub fn get(&self, handle: Handle) -> Option<&Connection<S>> {
        self.connections.get(&handle)
    }

    /// Look up a connection mutably
    pub fn get_mut(&mut self, handle: Handle) -> Option<&mut Connection<S>> {
        self.connections.get_mut(&handle)
    }

    /// Iterate over every connection
    pub fn iter(&self) -> impl Iterator<Item = &Connection<S>> {
        self.connections.values()
    }

    /// The socket of a connection, until it has been released
    pub fn socket_mut(&mut self, handle: Handle) -> Option<&mut S> {
        self.connections.get_mut(&handle)?.socket_mut()
    }

    /// Get a snapshot of the core counters
    pub fn metrics(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }

    /// Earliest deadline among delayed connections
    pub fn next_deadline(&self) -> Option<Instant> {
        self.connections
            .values()
            .filter(|conn| conn.state() == ConnectionState::Delaying)
            .filter_map(Connection::delay_end)
            .min()
    }

    /// Register a new connection, queue its negotiation offers and introduce it to the
    /// executor
    pub fn insert<E>(&mut self, handle: Handle, socket: S, executor: &mut E) -> CoreResult<()>
    where
        E: CommandExecutor + ?Sized,
    {
        if self.connections.contains_key(&handle) {
            return Err(CoreError::DuplicateHandle(handle));
        }
        let mut conn = Connection::new(handle, socket, &self.config, Rc::clone(&self.metrics));
        conn.send_offers();
        self.connections.insert(handle, conn);
        self.metrics.connection_opened();
        debug!(handle = %handle, "Connection registered");

        let script = executor.on_new_connection(self, handle);
        if let Some(conn) = self.connections.get_mut(&handle) {
            conn.set_script(script);
        }
        self.notify_closed(executor);
        Ok(())
    }

    // #### Phases #############################################################

    /// Phase 1: the readiness every live connection wants
    pub fn poll_interests(&self) -> Vec<PollInterest> {
        self.connections
            .values()
            .filter(|conn| !conn.is_closed())
            .map(Connection::poll_interest)
            .collect()
    }

    /// Phase 2: service socket readiness
    ///
    /// Results for handles not in the registry are skipped.
    pub fn dispatch_ready<E>(&mut self, ready: &[PollReady], executor: &mut E)
    where
        E: CommandExecutor + ?Sized,
    {
        for event in ready {
            match self.connections.get_mut(&event.handle) {
                Some(conn) => conn.handle_ready(event),
                None => trace!(handle = %event.handle, "Skipping foreign readiness"),
            }
        }
        self.notify_closed(executor);
    }

    /// Phase 3: close drained connections and destroy closed ones
    pub fn reap<E>(&mut self, executor: &mut E)
    where
        E: CommandExecutor + ?Sized,
    {
        for conn in self.connections.values_mut() {
            if conn.state() == ConnectionState::Draining && conn.pending_output().is_empty() {
                conn.close();
            }
        }
        self.notify_closed(executor);

        let closed: Vec<Handle> = self
            .connections
            .values()
            .filter(|conn| conn.is_closed())
            .map(Connection::handle)
            .collect();
        for handle in closed {
            self.destroy(handle, executor);
        }
    }

    /// Phase 4: hand at most one queued line per open connection to the executor
    pub fn dispatch_commands<E>(&mut self, executor: &mut E)
    where
        E: CommandExecutor + ?Sized,
    {
        for handle in self.handles() {
            let Some(conn) = self.connections.get_mut(&handle) else {
                continue;
            };
            if conn.state() != ConnectionState::Open {
                continue;
            }
            let Some(line) = conn.pop_command() else {
                continue;
            };
            conn.mark_needs_prompt();
            self.metrics.command_dispatched();
            trace!(handle = %handle, len = line.len(), "Dispatching command");
            executor.on_command(self, handle, &line);
        }
        self.notify_closed(executor);
    }

    /// Phase 5: reopen connections whose delay ended before `now`
    ///
    /// Suspended connections are resumed through the executor.
    pub fn expire_delays<E>(&mut self, now: Instant, executor: &mut E)
    where
        E: CommandExecutor + ?Sized,
    {
        for handle in self.handles() {
            let resume = self
                .connections
                .get_mut(&handle)
                .is_some_and(|conn| conn.expire_delay(now));
            if resume {
                trace!(handle = %handle, "Resuming");
                executor.on_resume(self, handle);
            }
        }
        self.notify_closed(executor);
    }

    /// Phase 6: prompt every open connection that produced output or ran a command
    pub fn send_prompts<E>(&mut self, executor: &mut E)
    where
        E: CommandExecutor + ?Sized,
    {
        for handle in self.handles() {
            let due = self
                .connections
                .get(&handle)
                .is_some_and(|conn| conn.state() == ConnectionState::Open && conn.needs_prompt());
            if !due {
                continue;
            }
            let prompt = executor.prompt(self, handle);
            let Some(conn) = self.connections.get_mut(&handle) else {
                continue;
            };
            match prompt {
                Ok(text) => conn.send_prompt(&text),
                Err(err) => {
                    error!(handle = %handle, error = %err, "Prompt failed");
                    conn.close();
                }
            }
        }
        self.notify_closed(executor);
    }

    /// Close and destroy every connection
    ///
    /// Each connection that was not already closed gets its close notification.
    pub fn teardown<E>(&mut self, executor: &mut E)
    where
        E: CommandExecutor + ?Sized,
    {
        debug!(connections = self.connections.len(), "Tearing down registry");
        for conn in self.connections.values_mut() {
            conn.close();
        }
        self.notify_closed(executor);
        for handle in self.handles() {
            self.destroy(handle, executor);
        }
    }

    // #### Internals ##########################################################

    /// Deliver pending close notifications, then release the sockets
    ///
    /// Close hooks may close further connections; those are picked up in another round.
    fn notify_closed<E>(&mut self, executor: &mut E)
    where
        E: CommandExecutor + ?Sized,
    {
        loop {
            let pending: Vec<Handle> = self
                .connections
                .values_mut()
                .filter_map(|conn| conn.take_close_notification().then(|| conn.handle()))
                .collect();
            if pending.is_empty() {
                return;
            }
            for handle in pending {
                if let Err(err) = executor.on_close(self, handle) {
                    error!(handle = %handle, error = %err, "Close hook failed");
                }
                if let Some(conn) = self.connections.get_mut(&handle) {
                    conn.release_socket();
                }
            }
        }
    }

    /// The single removal path
    fn destroy<E>(&mut self, handle: Handle, executor: &mut E)
    where
        E: CommandExecutor + ?Sized,
    {
        let Some(mut conn) = self.connections.remove(&handle) else {
            return;
        };
        conn.release_socket();
        if let Some(script) = conn.take_script() {
            executor.release(handle, script);
        }
        self.metrics.connection_destroyed();
        debug!(handle = %handle, "Connection destroyed");
    }

    fn lookup(&mut self, handle: Handle) -> CoreResult<&mut Connection<S>> {
        match self.connections.get_mut(&handle) {
            Some(conn) => Ok(conn),
            None => {
                warn!(handle = %handle, "No such connection");
                Err(CoreError::ConnectionNotFound(handle))
            }
        }
    }
}

impl<S: Socket> ConnectionControl for ConnectionRegistry<S> {
    fn append(&mut self, handle: Handle, text: &str) -> CoreResult<()> {
        self.lookup(handle)?.append_output(text);
        Ok(())
    }

    fn close(&mut self, handle: Handle) -> CoreResult<()> {
        self.lookup(handle)?.close();
        Ok(())
    }

    fn drain(&mut self, handle: Handle) -> CoreResult<()> {
        self.lookup(handle)?.drain();
        Ok(())
    }

    fn delay(&mut self, handle: Handle, seconds: f64) -> CoreResult<()> {
        self.lookup(handle)?.delay(Instant::now(), seconds, false)
    }

    fn suspend(&mut self, handle: Handle, seconds: f64) -> CoreResult<()> {
        self.lookup(handle)?.delay(Instant::now(), seconds, true)
    }

    fn set_echo(&mut self, handle: Handle, enabled: bool) -> CoreResult<()> {
        self.lookup(handle)?.set_echo(enabled);
        Ok(())
    }

    fn window_size(&self, handle: Handle) -> Option<WindowSize> {
        self.connections.get(&handle)?.window_size()
    }

    fn state(&self, handle: Handle) -> Option<ConnectionState> {
        self.connections.get(&handle).map(Connection::state)
    }

    fn info(&self, handle: Handle) -> Option<ConnectionInfo> {
        self.connections.get(&handle).map(Connection::info)
    }

    fn handles(&self) -> Vec<Handle> {
        self.connections.keys().copied().collect()
    }
}

impl<S> Drop for ConnectionRegistry<S> {
    fn drop(&mut self) {
        if !self.connections.is_empty() {
            warn!(
                connections = self.connections.len(),
                "Registry dropped without teardown; close hooks and releases skipped"
            );
        }
    }
}

impl<S> std::fmt::Debug for ConnectionRegistry<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionRegistry")
            .field("connections", &self.connections.len())
            .field("config", &self.config)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ExecutorError;
    use crate::socket::mock::MockSocket;
    use crate::types::ScriptRef;
    use std::time::Duration;
    use tracing_test::traced_test;

    #[derive(Default)]
    struct Recorder {
        events: Vec<String>,
        fail_close: bool,
        fail_prompt: bool,
    }

    impl CommandExecutor for Recorder {
        fn on_new_connection(
            &mut self,
            _control: &mut dyn ConnectionControl,
            handle: Handle,
        ) -> Option<ScriptRef> {
            self.events.push(format!("new {handle}"));
            Some(ScriptRef::new(handle.as_usize() as u64 * 100))
        }

        fn on_command(&mut self, control: &mut dyn ConnectionControl, handle: Handle, line: &[u8]) {
            let line = String::from_utf8_lossy(line).into_owned();
            self.events.push(format!("command {handle} {line}"));
            match line.as_str() {
                "quit" => control.close(handle).unwrap(),
                "wait" => control.suspend(handle, 0.0).unwrap(),
                _ => control.append(handle, &format!("You said {line}\r\n")).unwrap(),
            }
        }

        fn on_resume(&mut self, _control: &mut dyn ConnectionControl, handle: Handle) {
            self.events.push(format!("resume {handle}"));
        }

        fn on_close(
            &mut self,
            _control: &mut dyn ConnectionControl,
            handle: Handle,
        ) -> Result<(), ExecutorError> {
            self.events.push(format!("close {handle}"));
            if self.fail_close {
                return Err(ExecutorError::new("close hook exploded"));
            }
            Ok(())
        }

        fn prompt(
            &mut self,
            _control: &mut dyn ConnectionControl,
            handle: Handle,
        ) -> Result<String, ExecutorError> {
            self.events.push(format!("prompt {handle}"));
            if self.fail_prompt {
                return Err(ExecutorError::new("no prompt"));
            }
            Ok("> ".to_string())
        }

        fn release(&mut self, handle: Handle, script: ScriptRef) {
            self.events.push(format!("release {handle} {}", script.as_u64()));
        }
    }

    fn registry() -> ConnectionRegistry<MockSocket> {
        ConnectionRegistry::new(
            CoreConfig::default()
                .with_offer_compression(false)
                .with_offer_naws(false),
        )
    }

    #[test]
    fn test_insert_and_duplicate() {
        let mut registry = registry();
        let mut executor = Recorder::default();
        registry
            .insert(Handle::new(1), MockSocket::new(), &mut executor)
            .unwrap();
        let err = registry
            .insert(Handle::new(1), MockSocket::new(), &mut executor)
            .unwrap_err();
        assert!(matches!(err, CoreError::DuplicateHandle(_)));
        assert_eq!(registry.len(), 1);
        assert_eq!(executor.events, vec!["new conn-1"]);
        assert_eq!(registry.metrics().connections_opened, 1);
    }

    #[test]
    #[traced_test]
    fn test_null_target_is_reported() {
        let mut registry = registry();
        let err = registry.append(Handle::new(9), "hello").unwrap_err();
        assert!(matches!(err, CoreError::ConnectionNotFound(_)));
        assert!(registry.delay(Handle::new(9), 1.0).is_err());
        assert!(registry.state(Handle::new(9)).is_none());
        assert!(logs_contain("No such connection"));
    }

    #[test]
    fn test_close_notifies_once_then_reaps() {
        let mut registry = registry();
        let mut executor = Recorder::default();
        let socket = MockSocket::new();
        registry
            .insert(Handle::new(1), socket.clone(), &mut executor)
            .unwrap();

        socket.push_eof();
        registry.dispatch_ready(&[PollReady::readable(Handle::new(1))], &mut executor);
        assert_eq!(registry.state(Handle::new(1)), Some(ConnectionState::Closed));
        assert!(socket.is_closed());

        registry.close(Handle::new(1)).unwrap();
        registry.reap(&mut executor);
        assert!(!registry.contains(Handle::new(1)));
        assert_eq!(
            executor.events,
            vec!["new conn-1", "close conn-1", "release conn-1 100"]
        );
        assert_eq!(socket.close_calls(), 1);
        assert_eq!(registry.metrics().connections_active, 0);
    }

    #[test]
    #[traced_test]
    fn test_close_hook_failure_does_not_stop_teardown() {
        let mut registry = registry();
        let mut executor = Recorder {
            fail_close: true,
            ..Default::default()
        };
        let socket = MockSocket::new();
        registry
            .insert(Handle::new(1), socket.clone(), &mut executor)
            .unwrap();
        registry.teardown(&mut executor);

        assert!(registry.is_empty());
        assert!(socket.is_closed());
        assert!(executor.events.contains(&"release conn-1 100".to_string()));
        assert!(logs_contain("Close hook failed"));
    }

    #[test]
    fn test_draining_closes_after_flush() {
        let mut registry = registry();
        let mut executor = Recorder::default();
        let socket = MockSocket::new();
        socket.set_send_budget(Some(0));
        registry
            .insert(Handle::new(1), socket.clone(), &mut executor)
            .unwrap();
        registry.append(Handle::new(1), "Goodbye!\r\n").unwrap();
        registry.drain(Handle::new(1)).unwrap();

        registry.reap(&mut executor);
        assert_eq!(registry.state(Handle::new(1)), Some(ConnectionState::Draining));

        socket.set_send_budget(None);
        registry.dispatch_ready(&[PollReady::writable(Handle::new(1))], &mut executor);
        registry.reap(&mut executor);
        assert!(!registry.contains(Handle::new(1)));
        assert_eq!(socket.sent(), b"Goodbye!\r\n");
    }

    #[test]
    #[traced_test]
    fn test_prompt_failure_closes() {
        let mut registry = registry();
        let mut executor = Recorder {
            fail_prompt: true,
            ..Default::default()
        };
        registry
            .insert(Handle::new(1), MockSocket::new(), &mut executor)
            .unwrap();
        registry.send_prompts(&mut executor);
        assert_eq!(registry.state(Handle::new(1)), Some(ConnectionState::Closed));
        assert_eq!(
            executor.events,
            vec!["new conn-1", "prompt conn-1", "close conn-1"]
        );
        assert!(logs_contain("Prompt failed"));
    }

    #[test]
    fn test_suspend_resumes_through_executor() {
        let mut registry = registry();
        let mut executor = Recorder::default();
        let socket = MockSocket::new();
        registry
            .insert(Handle::new(1), socket.clone(), &mut executor)
            .unwrap();
        socket.push_data(b"wait\r\n");
        registry.dispatch_ready(&[PollReady::readable(Handle::new(1))], &mut executor);
        registry.dispatch_commands(&mut executor);
        assert_eq!(registry.state(Handle::new(1)), Some(ConnectionState::Delaying));
        assert!(registry.next_deadline().is_some());

        registry.send_prompts(&mut executor);
        assert!(!executor.events.iter().any(|event| event.starts_with("prompt")));

        registry.expire_delays(Instant::now() + Duration::from_secs(1), &mut executor);
        assert_eq!(registry.state(Handle::new(1)), Some(ConnectionState::Open));
        assert_eq!(executor.events.last().map(String::as_str), Some("resume conn-1"));
        assert!(registry.next_deadline().is_none());
    }

    #[test]
    #[traced_test]
    fn test_drop_without_teardown_is_reported() {
        let mut executor = Recorder::default();
        let mut registry = registry();
        registry
            .insert(Handle::new(1), MockSocket::new(), &mut executor)
            .unwrap();
        drop(registry);
        assert!(logs_contain("Registry dropped without teardown"));
        assert_eq!(executor.events, vec!["new conn-1"]);
    }

    #[test]
    #[traced_test]
    fn test_drop_after_teardown_is_quiet() {
        let mut executor = Recorder::default();
        let mut registry = registry();
        registry
            .insert(Handle::new(1), MockSocket::new(), &mut executor)
            .unwrap();
        registry.teardown(&mut executor);
        drop(registry);
        assert!(!logs_contain("Registry dropped without teardown"));
        assert_eq!(
            executor.events,
            vec!["new conn-1", "close conn-1", "release conn-1 100"]
        );
    }

    #[test]
    fn test_mass_close_notifies_each_once() {
        let mut registry = registry();
        let mut executor = Recorder::default();
        let sockets: Vec<MockSocket> = (1..=50).map(|_| MockSocket::new()).collect();
        for (index, socket) in sockets.iter().enumerate() {
            registry
                .insert(Handle::new(index + 1), socket.clone(), &mut executor)
                .unwrap();
            socket.push_eof();
        }
        let ready: Vec<PollReady> = (1..=50)
            .map(|index| PollReady::readable(Handle::new(index)))
            .collect();
        registry.dispatch_ready(&ready, &mut executor);

        let closes: Vec<&String> = executor
            .events
            .iter()
            .filter(|event| event.starts_with("close"))
            .collect();
        assert_eq!(closes.len(), 50);
        assert_eq!(closes[0], "close conn-1");
        assert_eq!(closes[49], "close conn-50");
        assert!(sockets.iter().all(|socket| socket.close_calls() == 1));
    }

    #[test]
    fn test_foreign_readiness_skipped() {
        let mut registry = registry();
        let mut executor = Recorder::default();
        registry.dispatch_ready(&[PollReady::error(Handle::new(42))], &mut executor);
        assert!(registry.is_empty());
        assert!(executor.events.is_empty());
    }
}
