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


//! # Echo Server Example
//!
//! A tiny talker built on the connection core. Each connection picks a name, then
//! everything it types is echoed back.
//!
//! ## Usage
//!
//! ```bash
//! cargo run --example echo_server -- 0.0.0.0:4000
//! ```
//!
//! Then connect with `telnet localhost 4000` or any MUD client.
//!
//! ## Commands
//!
//! - `say <text>` - Tell everyone something
//! - `who` - List connected players
//! - `size` - Show the window size your client reported
//! - `wait <seconds>` - Pause, then get a wake-up message
//! - `secret` - Type the next line with local echo turned off
//! - `quit` - Say goodbye and disconnect

use mudcore_server::{
    CommandExecutor, ConnectionControl, ExecutorError, Handle, ScriptRef, ServerConfig,
    TelnetServer,
};
use std::collections::HashMap;
use std::sync::atomic::AtomicBool;
use tracing::{error, info};

#[derive(Debug, Default)]
struct Player {
    name: Option<String>,
    secret: bool,
}

/// Executor keeping one `Player` per script reference
#[derive(Debug, Default)]
struct Talker {
    players: HashMap<Handle, Player>,
    next_script: u64,
}

impl Talker {
    fn name(&self, handle: Handle) -> String {
        self.players
            .get(&handle)
            .and_then(|player| player.name.clone())
            .unwrap_or_else(|| handle.to_string())
    }

    fn broadcast(&self, control: &mut dyn ConnectionControl, text: &str) {
        for handle in control.handles() {
            if self.players.get(&handle).is_some_and(|p| p.name.is_some()) {
                let _ = control.append(handle, text);
            }
        }
    }
}

impl CommandExecutor for Talker {
    fn on_new_connection(
        &mut self,
        control: &mut dyn ConnectionControl,
        handle: Handle,
    ) -> Option<ScriptRef> {
        info!(handle = %handle, "New player");
        self.players.insert(handle, Player::default());
        let _ = control.append(handle, "Welcome to the echo chamber!\r\n");
        self.next_script += 1;
        Some(ScriptRef::new(self.next_script))
    }

    fn on_command(&mut self, control: &mut dyn ConnectionControl, handle: Handle, line: &[u8]) {
        let line = String::from_utf8_lossy(line).trim().to_string();
        let Some(player) = self.players.get_mut(&handle) else {
            return;
        };

        if player.name.is_none() {
            if line.is_empty() {
                return;
            }
            player.name = Some(line.clone());
            self.broadcast(control, &format!("{line} has arrived.\r\n"));
            return;
        }

        if player.secret {
            player.secret = false;
            let _ = control.set_echo(handle, false);
            let _ = control.append(handle, &format!("\r\nYour secret is {} bytes long.\r\n", line.len()));
            return;
        }

        let (command, rest) = line.split_once(' ').unwrap_or((line.as_str(), ""));
        match command {
            "" => {}
            "say" => {
                let name = self.name(handle);
                self.broadcast(control, &format!("{name} says '{rest}'\r\n"));
            }
            "who" => {
                let names: Vec<String> = control.handles().into_iter().map(|h| self.name(h)).collect();
                let _ = control.append(handle, &format!("Online: {}\r\n", names.join(", ")));
            }
            "size" => {
                let text = match control.window_size(handle) {
                    Some(size) => format!("Your window is {size}.\r\n"),
                    None => "Your client did not report a window size.\r\n".to_string(),
                };
                let _ = control.append(handle, &text);
            }
            "wait" => match rest.parse::<f64>() {
                Ok(seconds) if control.suspend(handle, seconds).is_ok() => {
                    let _ = control.append(handle, "You doze off...\r\n");
                }
                _ => {
                    let _ = control.append(handle, "Wait how long?\r\n");
                }
            },
            "secret" => {
                player.secret = true;
                let _ = control.set_echo(handle, true);
                let _ = control.append(handle, "Whisper it: ");
            }
            "quit" => {
                let _ = control.append(handle, "Goodbye!\r\n");
                let _ = control.drain(handle);
            }
            _ => {
                let _ = control.append(handle, &format!("You said: {line}\r\n"));
            }
        }
    }

    fn on_resume(&mut self, control: &mut dyn ConnectionControl, handle: Handle) {
        let _ = control.append(handle, "You wake up.\r\n");
    }

    fn on_close(
        &mut self,
        control: &mut dyn ConnectionControl,
        handle: Handle,
    ) -> Result<(), ExecutorError> {
        let name = self.name(handle);
        let named = self
            .players
            .remove(&handle)
            .is_some_and(|player| player.name.is_some());
        if named {
            self.broadcast(control, &format!("{name} has left.\r\n"));
        }
        info!(handle = %handle, "Player left");
        Ok(())
    }

    fn prompt(
        &mut self,
        _control: &mut dyn ConnectionControl,
        handle: Handle,
    ) -> Result<String, ExecutorError> {
        match self.players.get(&handle) {
            Some(player) if player.name.is_none() => Ok("By what name are you known? ".to_string()),
            Some(_) => Ok("> ".to_string()),
            None => Err(ExecutorError::new(format!("no player for {handle}"))),
        }
    }

    fn release(&mut self, handle: Handle, script: ScriptRef) {
        info!(handle = %handle, script = script.as_u64(), "Released player script");
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt::init();

    let address = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "127.0.0.1:4000".to_string());
    let config = ServerConfig::new(address.parse()?);
    let mut server = TelnetServer::bind(config)?;
    info!(address = %server.local_addr()?, "Echo server ready");

    let running = AtomicBool::new(true);
    let mut talker = Talker::default();
    if let Err(err) = server.run(&mut talker, &running) {
        error!(error = %err, "Server stopped");
        return Err(err.into());
    }
    Ok(())
}
