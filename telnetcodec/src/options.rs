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


use crate::frame::{TelnetFrame, TelnetVerb};
use crate::consts;
use std::fmt::Formatter;

///
/// [Telnet Terminal Options](https://www.iana.org/assignments/telnet-options/telnet-options.xhtml)
///
/// Only the options a MUD server commonly meets are named; every other code is carried as
/// [`TelnetOption::Unknown`] and negotiated like any other option.
///
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum TelnetOption {
    /// [`consts::option::BINARY`] Telnet Binary Transmission [RFC856](https://tools.ietf.org/html/rfc856)
    TransmitBinary,
    /// [`consts::option::ECHO`] Telnet Echo Option [RFC857](https://tools.ietf.org/html/rfc857)
    Echo,
    /// [`consts::option::SGA`] Suppress Go ahead [RFC858](https://tools.ietf.org/html/rfc858)
    SuppressGoAhead,
    /// [`consts::option::STATUS`] Telnet Status Option [RFC859](http://www.iana.org/go/rfc859)
    Status,
    /// [`consts::option::TM`] Telnet Timing Mark Option [RFC860](http://www.iana.org/go/rfc860)
    TimingMark,
    /// [`consts::option::TTYPE`] Terminal Type [RFC1091](http://www.iana.org/go/rfc1091)
    TTYPE,
    /// [`consts::option::EOR`] End of Record [RFC885](http://www.iana.org/go/rfc885)
    EOR,
    /// [`consts::option::NAWS`] Negotiate About Window Size [RFC1073](http://www.iana.org/go/rfc1073)
    NAWS,
    /// [`consts::option::TSPEED`] Terminal Speed [RFC1079](http://www.iana.org/go/rfc1079)
    TSPEED,
    /// [`consts::option::LFLOW`] Remote Flow Control [RFC1372](http://www.iana.org/go/rfc1372)
    LFLOW,
    /// [`consts::option::LINEMODE`] Linemode [RFC1184](http://www.iana.org/go/rfc1184)
    Linemode,
    /// [`consts::option::NEW_ENVIRONMENT`] New Environment Option [RFC1572](http://www.iana.org/go/rfc1572)
    NewEnvironment,
    /// [`consts::option::CHARSET`] Charset [RFC2066](http://www.iana.org/go/rfc2066)
    Charset,
    /// [`consts::option::MSDP`] Mud Server Data Protocol [MSDP](https://tintin.sourceforge.io/protocols/msdp/)
    MSDP,
    /// [`consts::option::MSSP`] Mud Server Status Protocol [MSSP](https://tintin.sourceforge.io/protocols/mssp/)
    MSSP,
    /// [`consts::option::COMPRESS1`] Mud Client Compression Protocol version 1 [MCCPv1](http://www.gammon.com.au/mccp/protocol.html)
    Compress1,
    /// [`consts::option::COMPRESS2`] Mud Client Compression Protocol version 2 [MCCPv2](https://tintin.sourceforge.io/protocols/mccp/)
    Compress2,
    /// [`consts::option::ZMP`] Zenith Mud Protocol [ZMP](http://discworld.starturtle.net/external/protocols/zmp.html)
    ZMP,
    /// [`consts::option::GMCP`] Generic Mud Communication Protocol [GMCP Protocol](https://www.gammon.com.au/gmcp)
    GMCP,
    /// Unknown Option
    Unknown(u8),
}

impl TelnetOption {
    /// Converts a `TelnetOption` into its option code.
    pub fn to_u8(&self) -> u8 {
        match self {
            TelnetOption::TransmitBinary => consts::option::BINARY,
            TelnetOption::Echo => consts::option::ECHO,
            TelnetOption::SuppressGoAhead => consts::option::SGA,
            TelnetOption::Status => consts::option::STATUS,
            TelnetOption::TimingMark => consts::option::TM,
            TelnetOption::TTYPE => consts::option::TTYPE,
            TelnetOption::EOR => consts::option::EOR,
            TelnetOption::NAWS => consts::option::NAWS,
            TelnetOption::TSPEED => consts::option::TSPEED,
            TelnetOption::LFLOW => consts::option::LFLOW,
            TelnetOption::Linemode => consts::option::LINEMODE,
            TelnetOption::NewEnvironment => consts::option::NEW_ENVIRONMENT,
            TelnetOption::Charset => consts::option::CHARSET,
            TelnetOption::MSDP => consts::option::MSDP,
            TelnetOption::MSSP => consts::option::MSSP,
            TelnetOption::Compress1 => consts::option::COMPRESS1,
            TelnetOption::Compress2 => consts::option::COMPRESS2,
            TelnetOption::ZMP => consts::option::ZMP,
            TelnetOption::GMCP => consts::option::GMCP,
            TelnetOption::Unknown(byte) => *byte,
        }
    }

    /// Converts an option code into a `TelnetOption`.
    ///
    /// Codes without a named variant map to `TelnetOption::Unknown`.
    pub fn from_u8(byte: u8) -> Self {
        match byte {
            consts::option::BINARY => TelnetOption::TransmitBinary,
            consts::option::ECHO => TelnetOption::Echo,
            consts::option::SGA => TelnetOption::SuppressGoAhead,
            consts::option::STATUS => TelnetOption::Status,
            consts::option::TM => TelnetOption::TimingMark,
            consts::option::TTYPE => TelnetOption::TTYPE,
            consts::option::EOR => TelnetOption::EOR,
            consts::option::NAWS => TelnetOption::NAWS,
            consts::option::TSPEED => TelnetOption::TSPEED,
            consts::option::LFLOW => TelnetOption::LFLOW,
            consts::option::LINEMODE => TelnetOption::Linemode,
            consts::option::NEW_ENVIRONMENT => TelnetOption::NewEnvironment,
            consts::option::CHARSET => TelnetOption::Charset,
            consts::option::MSDP => TelnetOption::MSDP,
            consts::option::MSSP => TelnetOption::MSSP,
            consts::option::COMPRESS1 => TelnetOption::Compress1,
            consts::option::COMPRESS2 => TelnetOption::Compress2,
            consts::option::ZMP => TelnetOption::ZMP,
            consts::option::GMCP => TelnetOption::GMCP,
            byte => TelnetOption::Unknown(byte),
        }
    }
}

impl std::fmt::Display for TelnetOption {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            TelnetOption::TransmitBinary => write!(f, "TransmitBinary"),
            TelnetOption::Echo => write!(f, "Echo"),
            TelnetOption::SuppressGoAhead => write!(f, "SuppressGoAhead"),
            TelnetOption::Status => write!(f, "Status"),
            TelnetOption::TimingMark => write!(f, "TimingMark"),
            TelnetOption::TTYPE => write!(f, "TTYPE"),
            TelnetOption::EOR => write!(f, "EOR"),
            TelnetOption::NAWS => write!(f, "NAWS"),
            TelnetOption::TSPEED => write!(f, "TSPEED"),
            TelnetOption::LFLOW => write!(f, "LFLOW"),
            TelnetOption::Linemode => write!(f, "Linemode"),
            TelnetOption::NewEnvironment => write!(f, "NewEnvironment"),
            TelnetOption::Charset => write!(f, "Charset"),
            TelnetOption::MSDP => write!(f, "MSDP"),
            TelnetOption::MSSP => write!(f, "MSSP"),
            TelnetOption::Compress1 => write!(f, "Compress1"),
            TelnetOption::Compress2 => write!(f, "Compress2"),
            TelnetOption::ZMP => write!(f, "ZMP"),
            TelnetOption::GMCP => write!(f, "GMCP"),
            TelnetOption::Unknown(option) => write!(f, "Unknown({option})"),
        }
    }
}

impl From<u8> for TelnetOption {
    fn from(byte: u8) -> Self {
        Self::from_u8(byte)
    }
}

impl From<TelnetOption> for u8 {
    fn from(option: TelnetOption) -> Self {
        option.to_u8()
    }
}

/// Which half of an option a negotiation concerns.
///
/// Each option runs two independent RFC 1143 state machines:
///
/// ```text
/// Local:  WILL <option>  →  peer answers DO / DONT
/// Remote: DO <option>    →  peer answers WILL / WONT
/// ```
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum TelnetSide {
    /// The option is performed by us
    Local,
    /// The option is performed by the peer
    Remote,
}

impl std::fmt::Display for TelnetSide {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            TelnetSide::Local => write!(f, "Local"),
            TelnetSide::Remote => write!(f, "Remote"),
        }
    }
}

/// Q-method option state from [RFC 1143](https://www.rfc-editor.org/rfc/rfc1143).
///
/// The `Opposite` variants record a queued request for the opposite state that is sent once
/// the outstanding negotiation resolves.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum QState {
    /// Option is disabled
    #[default]
    No,
    /// Option is enabled
    Yes,
    /// We asked to disable and wait for the answer
    WantNo,
    /// We asked to disable and want it enabled again afterwards
    WantNoOpposite,
    /// We asked to enable and wait for the answer
    WantYes,
    /// We asked to enable and want it disabled again afterwards
    WantYesOpposite,
}

#[derive(Clone, Copy, Debug, Default)]
struct SupportState {
    local: bool,
    remote: bool,
}

#[derive(Clone, Copy, Debug, Default)]
struct OptionState {
    local: QState,
    remote: QState,
}

/// Support configuration and negotiation state for all 256 option codes.
///
/// The default supports `Echo`, `SuppressGoAhead` and `Compress2` locally and `NAWS` remotely.
#[derive(Clone, Debug)]
pub struct TelnetOptions {
    config: [SupportState; 256],
    state: [OptionState; 256],
}

impl TelnetOptions {
    /// An option table that refuses everything.
    pub fn empty() -> Self {
        TelnetOptions {
            config: [SupportState::default(); 256],
            state: [OptionState::default(); 256],
        }
    }

    /// Checks if we support the given option locally
    pub fn is_supported_local(&self, option: TelnetOption) -> bool {
        self.config[option.to_u8() as usize].local
    }

    /// Checks if we support the given option remotely
    pub fn is_supported_remote(&self, option: TelnetOption) -> bool {
        self.config[option.to_u8() as usize].remote
    }

    /// Allow or refuse performing `option` ourselves.
    pub fn set_supported_local(&mut self, option: TelnetOption, supported: bool) {
        self.config[option.to_u8() as usize].local = supported;
    }

    /// Allow or refuse the peer performing `option`.
    pub fn set_supported_remote(&mut self, option: TelnetOption, supported: bool) {
        self.config[option.to_u8() as usize].remote = supported;
    }

    /// The local Q-method state of an option.
    pub fn local_qstate(&self, option: TelnetOption) -> QState {
        self.state[option.to_u8() as usize].local
    }

    /// The remote Q-method state of an option.
    pub fn remote_qstate(&self, option: TelnetOption) -> QState {
        self.state[option.to_u8() as usize].remote
    }

    /// Whether we currently perform `option`.
    pub fn local_enabled(&self, option: TelnetOption) -> bool {
        self.local_qstate(option) == QState::Yes
    }

    /// Whether the peer currently performs `option`.
    pub fn remote_enabled(&self, option: TelnetOption) -> bool {
        self.remote_qstate(option) == QState::Yes
    }

    /// Ask to enable `option` locally. Returns the `WILL` to send, if any.
    pub fn enable_local(&mut self, option: TelnetOption) -> Option<TelnetFrame> {
        if !self.is_supported_local(option) {
            return None;
        }
        let state = &mut self.state[option.to_u8() as usize].local;
        request_enable(state).then_some(TelnetFrame::Will(option))
    }

    /// Ask to disable `option` locally. Returns the `WONT` to send, if any.
    pub fn disable_local(&mut self, option: TelnetOption) -> Option<TelnetFrame> {
        let state = &mut self.state[option.to_u8() as usize].local;
        request_disable(state).then_some(TelnetFrame::Wont(option))
    }

    /// Ask the peer to enable `option`. Returns the `DO` to send, if any.
    pub fn enable_remote(&mut self, option: TelnetOption) -> Option<TelnetFrame> {
        if !self.is_supported_remote(option) {
            return None;
        }
        let state = &mut self.state[option.to_u8() as usize].remote;
        request_enable(state).then_some(TelnetFrame::Do(option))
    }

    /// Ask the peer to disable `option`. Returns the `DONT` to send, if any.
    pub fn disable_remote(&mut self, option: TelnetOption) -> Option<TelnetFrame> {
        let state = &mut self.state[option.to_u8() as usize].remote;
        request_disable(state).then_some(TelnetFrame::Dont(option))
    }

    /// Process a negotiation command received from the peer.
    ///
    /// Returns the reply the Q-method requires, if any.
    pub fn handle_received(&mut self, verb: TelnetVerb, option: TelnetOption) -> Option<TelnetFrame> {
        let idx = option.to_u8() as usize;
        let (side, agree) = match verb {
            TelnetVerb::Will => {
                let supported = self.config[idx].remote;
                (TelnetSide::Remote, receive_enable(&mut self.state[idx].remote, supported)?)
            }
            TelnetVerb::Wont => (TelnetSide::Remote, receive_disable(&mut self.state[idx].remote)?),
            TelnetVerb::Do => {
                let supported = self.config[idx].local;
                (TelnetSide::Local, receive_enable(&mut self.state[idx].local, supported)?)
            }
            TelnetVerb::Dont => (TelnetSide::Local, receive_disable(&mut self.state[idx].local)?),
        };
        Some(match (side, agree) {
            (TelnetSide::Remote, true) => TelnetFrame::Do(option),
            (TelnetSide::Remote, false) => TelnetFrame::Dont(option),
            (TelnetSide::Local, true) => TelnetFrame::Will(option),
            (TelnetSide::Local, false) => TelnetFrame::Wont(option),
        })
    }
}

impl Default for TelnetOptions {
    fn default() -> Self {
        let mut options = TelnetOptions::empty();
        options.set_supported_local(TelnetOption::Echo, true);
        options.set_supported_local(TelnetOption::SuppressGoAhead, true);
        options.set_supported_local(TelnetOption::Compress2, true);
        options.set_supported_remote(TelnetOption::NAWS, true);
        options
    }
}

// #### Q-method transitions ###################################################
//
// The helpers below are written from the point of view of one half of an option. A reply of
// `Some(true)` means "send the positive verb" (DO or WILL), `Some(false)` the negative one.

/// Our side wants the option on. Returns whether a positive request must be sent.
fn request_enable(state: &mut QState) -> bool {
    match *state {
        QState::No => {
            *state = QState::WantYes;
            true
        }
        QState::WantNo => {
            *state = QState::WantNoOpposite;
            false
        }
        QState::WantYesOpposite => {
            *state = QState::WantYes;
            false
        }
        QState::Yes | QState::WantYes | QState::WantNoOpposite => false,
    }
}

/// Our side wants the option off. Returns whether a negative request must be sent.
fn request_disable(state: &mut QState) -> bool {
    match *state {
        QState::Yes => {
            *state = QState::WantNo;
            true
        }
        QState::WantYes => {
            *state = QState::WantYesOpposite;
            false
        }
        QState::WantNoOpposite => {
            *state = QState::WantNo;
            false
        }
        QState::No | QState::WantNo | QState::WantYesOpposite => false,
    }
}

/// The peer sent WILL (remote half) or DO (local half).
fn receive_enable(state: &mut QState, supported: bool) -> Option<bool> {
    match *state {
        QState::No if supported => {
            *state = QState::Yes;
            Some(true)
        }
        QState::No => Some(false),
        QState::Yes => None,
        // The peer answered our refusal with an offer; treat it as refused.
        QState::WantNo => {
            *state = QState::No;
            None
        }
        QState::WantNoOpposite | QState::WantYes => {
            *state = QState::Yes;
            None
        }
        QState::WantYesOpposite => {
            *state = QState::WantNo;
            Some(false)
        }
    }
}

/// The peer sent WONT (remote half) or DONT (local half).
fn receive_disable(state: &mut QState) -> Option<bool> {
    match *state {
        QState::No => None,
        QState::Yes => {
            *state = QState::No;
            Some(false)
        }
        QState::WantNo | QState::WantYes | QState::WantYesOpposite => {
            *state = QState::No;
            None
        }
        QState::WantNoOpposite => {
            *state = QState::WantYes;
            Some(true)
        }
    }
}
