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


//! Non-blocking socket primitives consumed by the core

use mio::net::TcpStream;
use mio::{Interest, Registry, Token};
use std::io::{self, Read, Write};
use std::net::{Shutdown, SocketAddr};
use tracing::trace;

/// The three operations a connection performs on its transport.
///
/// Implementations must be non-blocking: when no progress is possible they return an
/// error of kind [`io::ErrorKind::WouldBlock`].
pub trait Socket {
    /// Read available bytes into `buf`; `Ok(0)` means the peer closed its side
    fn recv(&mut self, buf: &mut [u8]) -> io::Result<usize>;

    /// Write as much of `buf` as the transport accepts right now
    fn send(&mut self, buf: &[u8]) -> io::Result<usize>;

    /// Release the transport; called once, after the close notification
    fn close(&mut self);
}

/// A [`Socket`] over a mio TCP stream registered with a poller
pub struct MioSocket {
    stream: TcpStream,
    peer: SocketAddr,
    registry: Registry,
    registered: bool,
}

impl MioSocket {
    /// Wrap an accepted stream already registered with `registry`
    pub fn new(stream: TcpStream, peer: SocketAddr, registry: Registry) -> Self {
        Self {
            stream,
            peer,
            registry,
            registered: true,
        }
    }

    /// Address of the remote end
    pub fn peer_addr(&self) -> SocketAddr {
        self.peer
    }

    /// Check if the stream is currently registered with the poller
    pub fn is_registered(&self) -> bool {
        self.registered
    }

    /// Replace the poll interest for this stream
    ///
    /// `None` removes the stream from the poller until an interest is armed again.
    /// Registering a stream that already has unread input reports it on the next poll.
    pub fn rearm(&mut self, token: Token, interest: Option<Interest>) -> io::Result<()> {
        match (interest, self.registered) {
            (Some(interest), true) => self.registry.reregister(&mut self.stream, token, interest),
            (Some(interest), false) => {
                self.registry.register(&mut self.stream, token, interest)?;
                self.registered = true;
                Ok(())
            }
            (None, true) => {
                self.registry.deregister(&mut self.stream)?;
                self.registered = false;
                Ok(())
            }
            (None, false) => Ok(()),
        }
    }
}

impl Socket for MioSocket {
    fn recv(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.stream.read(buf)
    }

    fn send(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.stream.write(buf)
    }

    fn close(&mut self) {
        if self.registered {
            self.registered = false;
            if let Err(err) = self.registry.deregister(&mut self.stream) {
                trace!(peer = %self.peer, error = %err, "Deregister failed");
            }
        }
        if let Err(err) = self.stream.shutdown(Shutdown::Both) {
            trace!(peer = %self.peer, error = %err, "Shutdown failed");
        }
    }
}

impl std::fmt::Debug for MioSocket {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MioSocket").field("peer", &self.peer).finish()
    }
}

#[cfg(test)]
pub(crate) mod mock {
    use super::Socket;
    use std::cell::RefCell;
    use std::collections::VecDeque;
    use std::io;
    use std::rc::Rc;

    /// What the next `recv` call yields
    pub enum Incoming {
        Data(Vec<u8>),
        Eof,
        Error(io::ErrorKind),
    }

    #[derive(Default)]
    pub struct Inner {
        pub incoming: VecDeque<Incoming>,
        pub sent: Vec<u8>,
        pub send_budget: Option<usize>,
        pub resume_after: Option<usize>,
        pub send_error: Option<io::ErrorKind>,
        pub closed: bool,
        pub close_calls: usize,
    }

    /// In-memory socket whose state stays inspectable through clones
    #[derive(Clone, Default)]
    pub struct MockSocket(pub Rc<RefCell<Inner>>);

    impl MockSocket {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn push_data(&self, bytes: &[u8]) {
            self.0
                .borrow_mut()
                .incoming
                .push_back(Incoming::Data(bytes.to_vec()));
        }

        pub fn push_eof(&self) {
            self.0.borrow_mut().incoming.push_back(Incoming::Eof);
        }

        pub fn push_error(&self, kind: io::ErrorKind) {
            self.0.borrow_mut().incoming.push_back(Incoming::Error(kind));
        }

        pub fn set_send_budget(&self, budget: Option<usize>) {
            self.0.borrow_mut().send_budget = budget;
        }

        /// Once the budget runs out, refuse this many sends and then accept everything
        pub fn set_resume_after(&self, refusals: Option<usize>) {
            self.0.borrow_mut().resume_after = refusals;
        }

        pub fn set_send_error(&self, kind: Option<io::ErrorKind>) {
            self.0.borrow_mut().send_error = kind;
        }

        pub fn sent(&self) -> Vec<u8> {
            self.0.borrow().sent.clone()
        }

        pub fn take_sent(&self) -> Vec<u8> {
            std::mem::take(&mut self.0.borrow_mut().sent)
        }

        pub fn is_closed(&self) -> bool {
            self.0.borrow().closed
        }

        pub fn close_calls(&self) -> usize {
            self.0.borrow().close_calls
        }
    }

    impl Socket for MockSocket {
        fn recv(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            let mut inner = self.0.borrow_mut();
            match inner.incoming.pop_front() {
                Some(Incoming::Data(mut data)) => {
                    let count = data.len().min(buf.len());
                    buf[..count].copy_from_slice(&data[..count]);
                    if count < data.len() {
                        let rest = data.split_off(count);
                        inner.incoming.push_front(Incoming::Data(rest));
                    }
                    Ok(count)
                }
                Some(Incoming::Eof) => Ok(0),
                Some(Incoming::Error(kind)) => Err(io::Error::from(kind)),
                None => Err(io::Error::from(io::ErrorKind::WouldBlock)),
            }
        }

        fn send(&mut self, buf: &[u8]) -> io::Result<usize> {
            let mut inner = self.0.borrow_mut();
            if let Some(kind) = inner.send_error {
                return Err(io::Error::from(kind));
            }
            let budget = inner.send_budget;
            let refusals = inner.resume_after;
            let count = match budget {
                Some(0) => match refusals {
                    Some(0) => {
                        inner.send_budget = None;
                        inner.resume_after = None;
                        buf.len()
                    }
                    Some(left) => {
                        inner.resume_after = Some(left - 1);
                        return Err(io::Error::from(io::ErrorKind::WouldBlock));
                    }
                    None => return Err(io::Error::from(io::ErrorKind::WouldBlock)),
                },
                Some(budget) => budget.min(buf.len()),
                None => buf.len(),
            };
            if let Some(budget) = inner.send_budget.as_mut() {
                *budget -= count;
            }
            inner.sent.extend_from_slice(&buf[..count]);
            Ok(count)
        }

        fn close(&mut self) {
            let mut inner = self.0.borrow_mut();
            inner.closed = true;
            inner.close_calls += 1;
        }
    }
}
