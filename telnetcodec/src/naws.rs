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


//! Negotiate About Window Size
//!
//! The payload of `IAC SB NAWS ... IAC SE` is exactly four bytes: the width followed by the
//! height, each a big-endian `u16` ([RFC 1073](https://www.rfc-editor.org/rfc/rfc1073)).

use crate::{CodecError, CodecResult, SubnegotiationErrorKind, TelnetFrame, TelnetOption};
use byteorder::{BigEndian, ByteOrder};
use bytes::Bytes;

/// Terminal dimensions reported by the peer.
///
/// # Example
/// ```
/// use mudcore_telnetcodec::naws::WindowSize;
///
/// let size = WindowSize::decode(&[0, 80, 0, 24]).unwrap();
/// assert_eq!(size, WindowSize::new(80, 24));
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct WindowSize {
    /// The number of columns (characters) in the terminal window
    pub cols: u16,
    /// The number of rows (lines) in the terminal window
    pub rows: u16,
}

impl WindowSize {
    /// Encoded payload length.
    pub const LEN: usize = 4;

    /// Creates a new `WindowSize` with the specified columns and rows.
    pub fn new(cols: u16, rows: u16) -> Self {
        WindowSize { cols, rows }
    }

    /// Decode a NAWS payload.
    ///
    /// Any length other than four is rejected.
    pub fn decode(payload: &[u8]) -> CodecResult<WindowSize> {
        if payload.len() != Self::LEN {
            return Err(CodecError::SubnegotiationError {
                option: TelnetOption::NAWS,
                reason: SubnegotiationErrorKind::InvalidLength {
                    required: Self::LEN,
                    available: payload.len(),
                },
            });
        }
        Ok(WindowSize {
            cols: BigEndian::read_u16(&payload[0..2]),
            rows: BigEndian::read_u16(&payload[2..4]),
        })
    }

    /// Encode as a NAWS payload.
    pub fn encode(&self) -> [u8; 4] {
        let mut payload = [0u8; Self::LEN];
        BigEndian::write_u16(&mut payload[0..2], self.cols);
        BigEndian::write_u16(&mut payload[2..4], self.rows);
        payload
    }

    /// The complete subnegotiation frame a client would send.
    pub fn to_frame(&self) -> TelnetFrame {
        TelnetFrame::Subnegotiate(TelnetOption::NAWS, Bytes::copy_from_slice(&self.encode()))
    }
}

impl std::fmt::Display for WindowSize {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}x{}", self.cols, self.rows)
    }
}
