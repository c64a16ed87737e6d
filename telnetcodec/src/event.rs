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


use crate::frame::TelnetVerb;
use crate::options::{TelnetOption, TelnetSide};
use bytes::Bytes;

///
/// `TelnetEvent` is what the decoder raises while consuming bytes from a peer.
///
/// Negotiation is settled inside the codec. The decoder reports its outcome in up to three
/// events, always in this order: a `Transmit` carrying the reply the Q-method requires, the
/// `Negotiate` request as received, and an `OptionStatus` when the option changed state.
///
#[derive(Clone, Debug, PartialEq)]
pub enum TelnetEvent {
    /// Application data byte
    Data(u8),
    /// Plain telnet bytes that must be written to the peer through [`TelnetCodec::transmit`]
    ///
    /// [`TelnetCodec::transmit`]: crate::TelnetCodec::transmit
    Transmit(Bytes),
    /// The peer sent a negotiation command
    Negotiate(TelnetVerb, TelnetOption),
    /// Indicate a completed Negotiation
    /// Parameters: (option, side, enabled)
    OptionStatus(TelnetOption, TelnetSide, bool),
    /// Subnegotiation payload with IAC escapes removed
    Subnegotiate(TelnetOption, Bytes),
    /// No Operation
    NoOperation,
    /// End of urgent Data Stream
    DataMark,
    /// Operator pressed the Break key or the Attention key.
    Break,
    /// Interrupt current process.
    InterruptProcess,
    /// Cancel output from the current process.
    AbortOutput,
    /// Request acknowledgment.
    AreYouThere,
    /// Request that the operator erase the previous character.
    EraseCharacter,
    /// Request that the operator erase the previous line.
    EraseLine,
    /// End of input for half-duplex connections.
    GoAhead,
    /// End of Record
    EndOfRecord,
    /// Malformed but recoverable protocol data
    Warning(String),
}
