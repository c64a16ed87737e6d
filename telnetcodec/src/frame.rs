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


use crate::{TelnetOption, consts};
use bytes::{BufMut, Bytes, BytesMut};
use std::fmt;

///
/// `TelnetFrame` is a single unit of the telnet wire protocol as it is written to a peer.
///
/// Frames are encoded in their plain form by [`TelnetFrame::write_to`]. The codec then passes
/// the result through the stream compressor when MCCP is active.
///
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TelnetFrame {
    /// Telnet Data Byte, escaped when it equals IAC
    Data(u8),
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
    /// Request the remote side to enable an option
    Do(TelnetOption),
    /// Request the remote side to disable an option
    Dont(TelnetOption),
    /// Offer to enable an option locally
    Will(TelnetOption),
    /// Refuse or disable an option locally
    Wont(TelnetOption),
    /// Subnegotiation with its unescaped payload
    Subnegotiate(TelnetOption, Bytes),
}

impl TelnetFrame {
    /// Build a negotiation frame from its verb.
    pub fn negotiation(verb: TelnetVerb, option: TelnetOption) -> TelnetFrame {
        match verb {
            TelnetVerb::Do => TelnetFrame::Do(option),
            TelnetVerb::Dont => TelnetFrame::Dont(option),
            TelnetVerb::Will => TelnetFrame::Will(option),
            TelnetVerb::Wont => TelnetFrame::Wont(option),
        }
    }

    /// Number of bytes this frame occupies on the wire before compression.
    pub fn len(&self) -> usize {
        match self {
            TelnetFrame::Data(consts::IAC) => 2,
            TelnetFrame::Data(_) => 1,
            TelnetFrame::Do(_) | TelnetFrame::Dont(_) | TelnetFrame::Will(_) | TelnetFrame::Wont(_) => 3,
            TelnetFrame::Subnegotiate(_, payload) => {
                5 + payload.len() + payload.iter().filter(|b| **b == consts::IAC).count()
            }
            _ => 2,
        }
    }

    /// Frames are never empty.
    pub fn is_empty(&self) -> bool {
        false
    }

    /// Write the plain wire encoding of this frame to `dst`.
    pub fn write_to(&self, dst: &mut BytesMut) {
        dst.reserve(self.len());
        match self {
            TelnetFrame::Data(byte) => {
                if *byte == consts::IAC {
                    dst.put_u8(consts::IAC);
                }
                dst.put_u8(*byte);
            }
            TelnetFrame::NoOperation => dst.put_slice(&[consts::IAC, consts::NOP]),
            TelnetFrame::DataMark => dst.put_slice(&[consts::IAC, consts::DM]),
            TelnetFrame::Break => dst.put_slice(&[consts::IAC, consts::BRK]),
            TelnetFrame::InterruptProcess => dst.put_slice(&[consts::IAC, consts::IP]),
            TelnetFrame::AbortOutput => dst.put_slice(&[consts::IAC, consts::AO]),
            TelnetFrame::AreYouThere => dst.put_slice(&[consts::IAC, consts::AYT]),
            TelnetFrame::EraseCharacter => dst.put_slice(&[consts::IAC, consts::EC]),
            TelnetFrame::EraseLine => dst.put_slice(&[consts::IAC, consts::EL]),
            TelnetFrame::GoAhead => dst.put_slice(&[consts::IAC, consts::GA]),
            TelnetFrame::EndOfRecord => dst.put_slice(&[consts::IAC, consts::EOR]),
            TelnetFrame::Do(option) => dst.put_slice(&[consts::IAC, consts::DO, option.to_u8()]),
            TelnetFrame::Dont(option) => {
                dst.put_slice(&[consts::IAC, consts::DONT, option.to_u8()])
            }
            TelnetFrame::Will(option) => {
                dst.put_slice(&[consts::IAC, consts::WILL, option.to_u8()])
            }
            TelnetFrame::Wont(option) => {
                dst.put_slice(&[consts::IAC, consts::WONT, option.to_u8()])
            }
            TelnetFrame::Subnegotiate(option, payload) => {
                dst.put_slice(&[consts::IAC, consts::SB, option.to_u8()]);
                for byte in payload.iter() {
                    if *byte == consts::IAC {
                        dst.put_u8(consts::IAC);
                    }
                    dst.put_u8(*byte);
                }
                dst.put_slice(&[consts::IAC, consts::SE]);
            }
        }
    }
}

/// The four option negotiation commands.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum TelnetVerb {
    /// `IAC DO`
    Do,
    /// `IAC DONT`
    Dont,
    /// `IAC WILL`
    Will,
    /// `IAC WONT`
    Wont,
}

impl TelnetVerb {
    /// The command byte for this verb.
    pub fn to_u8(self) -> u8 {
        match self {
            TelnetVerb::Do => consts::DO,
            TelnetVerb::Dont => consts::DONT,
            TelnetVerb::Will => consts::WILL,
            TelnetVerb::Wont => consts::WONT,
        }
    }
}

impl fmt::Display for TelnetVerb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TelnetVerb::Do => write!(f, "DO"),
            TelnetVerb::Dont => write!(f, "DONT"),
            TelnetVerb::Will => write!(f, "WILL"),
            TelnetVerb::Wont => write!(f, "WONT"),
        }
    }
}
