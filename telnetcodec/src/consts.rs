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


//! Telnet protocol byte values.

/// Interpret As Command
pub const IAC: u8 = 255;
/// Refuse or stop an option on the remote side
pub const DONT: u8 = 254;
/// Request an option on the remote side
pub const DO: u8 = 253;
/// Refuse or stop an option on the local side
pub const WONT: u8 = 252;
/// Offer an option on the local side
pub const WILL: u8 = 251;
/// Subnegotiation Begin
pub const SB: u8 = 250;
/// Go Ahead
pub const GA: u8 = 249;
/// Erase Line
pub const EL: u8 = 248;
/// Erase Character
pub const EC: u8 = 247;
/// Are You There
pub const AYT: u8 = 246;
/// Abort Output
pub const AO: u8 = 245;
/// Interrupt Process
pub const IP: u8 = 244;
/// Break
pub const BRK: u8 = 243;
/// Data Mark
pub const DM: u8 = 242;
/// No Operation
pub const NOP: u8 = 241;
/// Subnegotiation End
pub const SE: u8 = 240;
/// End of Record
pub const EOR: u8 = 239;

/// Carriage Return
pub const CR: u8 = b'\r';
/// Line Feed
pub const LF: u8 = b'\n';
/// Backspace
pub const BS: u8 = 0x08;

/// Option codes understood by this codec.
///
/// See the [IANA registry](https://www.iana.org/assignments/telnet-options/telnet-options.xhtml).
pub mod option {
    /// Binary Transmission, RFC 856
    pub const BINARY: u8 = 0;
    /// Echo, RFC 857
    pub const ECHO: u8 = 1;
    /// Suppress Go Ahead, RFC 858
    pub const SGA: u8 = 3;
    /// Status, RFC 859
    pub const STATUS: u8 = 5;
    /// Timing Mark, RFC 860
    pub const TM: u8 = 6;
    /// Terminal Type, RFC 1091
    pub const TTYPE: u8 = 24;
    /// End of Record, RFC 885
    pub const EOR: u8 = 25;
    /// Negotiate About Window Size, RFC 1073
    pub const NAWS: u8 = 31;
    /// Terminal Speed, RFC 1079
    pub const TSPEED: u8 = 32;
    /// Remote Flow Control, RFC 1372
    pub const LFLOW: u8 = 33;
    /// Linemode, RFC 1184
    pub const LINEMODE: u8 = 34;
    /// New Environment, RFC 1572
    pub const NEW_ENVIRONMENT: u8 = 39;
    /// Charset, RFC 2066
    pub const CHARSET: u8 = 42;
    /// Mud Server Data Protocol
    pub const MSDP: u8 = 69;
    /// Mud Server Status Protocol
    pub const MSSP: u8 = 70;
    /// Mud Client Compression Protocol v1
    pub const COMPRESS1: u8 = 85;
    /// Mud Client Compression Protocol v2
    pub const COMPRESS2: u8 = 86;
    /// Zenith Mud Protocol
    pub const ZMP: u8 = 93;
    /// Generic Mud Communication Protocol
    pub const GMCP: u8 = 201;
}
