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


//! # MudCore Telnet Protocol Codec
//!
//! This crate implements the telnet wire protocol (RFC 854) as a stateful, byte-oriented codec
//! built on the `tokio_util::codec` [`Decoder`] and [`Encoder`] traits. It is used
//! synchronously by the connection core: bytes read from a socket are fed to
//! [`Decoder::decode`], and application output is passed through [`Encoder::encode`].
//!
//! ## Overview
//!
//! - **Data transmission**: application bytes with IAC escaping
//! - **Control commands**: Break, Interrupt Process, Go Ahead, etc.
//! - **Option negotiation**: the RFC 1143 Q-method over all 256 option codes
//! - **Subnegotiation**: payload collection with a size limit
//! - **MCCP2**: `COMPRESS2` stream compression of everything the encoder writes
//!
//! ## Core Components
//!
//! ### [`TelnetCodec`]
//!
//! Owns the decoder state, the [`TelnetOptions`] table and the optional compressor.
//!
//! ### [`TelnetEvent`]
//!
//! What the decoder raises: data bytes, replies to transmit, negotiation requests and their
//! outcome, subnegotiation payloads, control commands and protocol warnings.
//!
//! ### [`TelnetFrame`]
//!
//! A unit of output: data, control commands, negotiation and subnegotiation.
//!
//! ## Usage Example
//!
//! ```rust
//! use bytes::BytesMut;
//! use mudcore_telnetcodec::{TelnetCodec, TelnetEvent, TelnetOption, TelnetSide};
//! use tokio_util::codec::{Decoder, Encoder};
//!
//! let mut codec = TelnetCodec::new();
//! let mut wire = BytesMut::new();
//!
//! // Ask the client for its window size.
//! let offer = codec.enable_remote(TelnetOption::NAWS).unwrap();
//! codec.encode(offer, &mut wire).unwrap();
//!
//! // The client agrees.
//! let mut input = BytesMut::from(&[255, 251, 31][..]);
//! let mut events = Vec::new();
//! while let Some(event) = codec.decode(&mut input).unwrap() {
//!     events.push(event);
//! }
//! assert_eq!(
//!     events.last(),
//!     Some(&TelnetEvent::OptionStatus(TelnetOption::NAWS, TelnetSide::Remote, true))
//! );
//! ```

#![warn(missing_docs, future_incompatible, rust_2018_idioms)]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]

mod codec;
pub mod consts;
mod event;
mod frame;
pub mod naws;
mod options;
mod result;

pub use self::codec::{DEFAULT_MAX_SUBNEGOTIATION, TelnetCodec};
pub use self::event::TelnetEvent;
pub use self::frame::{TelnetFrame, TelnetVerb};
pub use self::options::{QState, TelnetOption, TelnetOptions, TelnetSide};
pub use self::result::{CodecError, CodecResult, SubnegotiationErrorKind};
