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
use crate::options::{TelnetOptions, TelnetSide};
use crate::{CodecError, CodecResult, TelnetEvent, TelnetFrame, TelnetOption, consts};
use bytes::{Buf, BufMut, Bytes, BytesMut};
use mudcore_compress::{Algorithm, Compressor};
use std::collections::VecDeque;
use tokio_util::codec::{Decoder, Encoder};
use tracing::{debug, trace};

/// Largest subnegotiation payload kept by default. Longer payloads are discarded with a warning.
pub const DEFAULT_MAX_SUBNEGOTIATION: usize = 16 * 1024;

/// A codec for the telnet protocol with RFC 1143 option negotiation and MCCP2 compression.
///
/// `TelnetCodec` turns raw bytes from a peer into [`TelnetEvent`]s and turns frames and
/// application bytes into wire bytes. It owns the option table, so replies to the peer's
/// negotiation are produced here and handed back to the caller as [`TelnetEvent::Transmit`].
///
/// Every byte the encoder produces passes through the MCCP2 compressor once
/// [`begin_compression`](TelnetCodec::begin_compression) has been called.
pub struct TelnetCodec {
    decoder_buffer: BytesMut,
    decoder_state: DecoderState,
    subnegotiation_overflow: bool,
    max_subnegotiation: usize,
    options: TelnetOptions,
    pending: VecDeque<TelnetEvent>,
    encoder_buffer: BytesMut,
    compressor: Option<Compressor>,
}

impl TelnetCodec {
    /// Creates a new `TelnetCodec` with the default option table.
    ///
    /// # Example
    /// ```
    /// use mudcore_telnetcodec::TelnetCodec;
    ///
    /// let codec = TelnetCodec::new();
    /// assert!(!codec.is_compressing());
    /// ```
    pub fn new() -> TelnetCodec {
        TelnetCodec::default()
    }

    /// Creates a codec using the given option table.
    pub fn with_options(options: TelnetOptions) -> TelnetCodec {
        TelnetCodec {
            options,
            ..TelnetCodec::default()
        }
    }

    /// Sets the largest subnegotiation payload the decoder keeps.
    pub fn with_max_subnegotiation(mut self, limit: usize) -> TelnetCodec {
        self.max_subnegotiation = limit;
        self
    }

    /// The option table.
    pub fn options(&self) -> &TelnetOptions {
        &self.options
    }

    /// Checks if we support the given option locally
    pub fn is_supported_local(&self, option: TelnetOption) -> bool {
        self.options.is_supported_local(option)
    }

    /// Checks if we support the given option remotely
    pub fn is_supported_remote(&self, option: TelnetOption) -> bool {
        self.options.is_supported_remote(option)
    }

    /// Allow or refuse performing `option` ourselves.
    pub fn set_supported_local(&mut self, option: TelnetOption, supported: bool) {
        self.options.set_supported_local(option, supported);
    }

    /// Allow or refuse the peer performing `option`.
    pub fn set_supported_remote(&mut self, option: TelnetOption, supported: bool) {
        self.options.set_supported_remote(option, supported);
    }

    /// Checks if a specific Telnet option is enabled locally.
    pub fn is_enabled_local(&self, option: TelnetOption) -> bool {
        self.options.local_enabled(option)
    }

    /// Checks if a specific Telnet option is enabled on the remote side.
    pub fn is_enabled_remote(&self, option: TelnetOption) -> bool {
        self.options.remote_enabled(option)
    }

    /// Request to enable a Telnet option locally (we will send WILL).
    ///
    /// Returns the frame to send, or `None` when the Q-method requires no message.
    pub fn enable_local(&mut self, option: TelnetOption) -> Option<TelnetFrame> {
        self.options.enable_local(option)
    }

    /// Request to disable a Telnet option locally (we will send WONT).
    pub fn disable_local(&mut self, option: TelnetOption) -> Option<TelnetFrame> {
        self.options.disable_local(option)
    }

    /// Request to enable a Telnet option on the remote side (we will send DO).
    pub fn enable_remote(&mut self, option: TelnetOption) -> Option<TelnetFrame> {
        self.options.enable_remote(option)
    }

    /// Request to disable a Telnet option on the remote side (we will send DONT).
    pub fn disable_remote(&mut self, option: TelnetOption) -> Option<TelnetFrame> {
        self.options.disable_remote(option)
    }

    /// Run a negotiation request through the option table and encode whatever must be sent.
    ///
    /// `WILL`/`WONT` ask to enable or disable the option locally, `DO`/`DONT` ask the peer.
    /// Returns `true` if a frame was written to `dst`.
    ///
    /// # Example
    /// ```
    /// use bytes::BytesMut;
    /// use mudcore_telnetcodec::{TelnetCodec, TelnetOption, TelnetVerb};
    ///
    /// let mut codec = TelnetCodec::new();
    /// let mut dst = BytesMut::new();
    /// assert!(codec.negotiate(TelnetVerb::Do, TelnetOption::NAWS, &mut dst).unwrap());
    /// assert_eq!(&dst[..], &[255, 253, 31]);
    /// ```
    pub fn negotiate(
        &mut self,
        verb: TelnetVerb,
        option: TelnetOption,
        dst: &mut BytesMut,
    ) -> CodecResult<bool> {
        let frame = match verb {
            TelnetVerb::Will => self.options.enable_local(option),
            TelnetVerb::Wont => self.options.disable_local(option),
            TelnetVerb::Do => self.options.enable_remote(option),
            TelnetVerb::Dont => self.options.disable_remote(option),
        };
        match frame {
            Some(frame) => {
                self.encode(frame, dst)?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Write `IAC GA`.
    pub fn send_go_ahead(&mut self, dst: &mut BytesMut) -> CodecResult<()> {
        self.encode(TelnetFrame::GoAhead, dst)
    }

    /// Write plain telnet bytes, such as a [`TelnetEvent::Transmit`] payload, to `dst`.
    ///
    /// The bytes are not escaped but are compressed when MCCP2 is active.
    pub fn transmit(&mut self, raw: &[u8], dst: &mut BytesMut) -> CodecResult<()> {
        write_wire(&mut self.compressor, raw, dst)
    }

    /// Whether outbound bytes are currently compressed.
    pub fn is_compressing(&self) -> bool {
        self.compressor.is_some()
    }

    /// Start the MCCP2 compressed stream.
    ///
    /// Writes `IAC SB COMPRESS2 IAC SE` uncompressed, after which every encoded byte is
    /// compressed. The peer must have agreed to `COMPRESS2` first. Calling this while already
    /// compressing does nothing.
    pub fn begin_compression(&mut self, dst: &mut BytesMut) -> CodecResult<()> {
        if self.compressor.is_some() {
            return Ok(());
        }
        if !self.options.local_enabled(TelnetOption::Compress2) {
            return Err(CodecError::NegotiationError {
                option: TelnetOption::Compress2,
                reason: "peer has not agreed to compression".into(),
            });
        }
        TelnetFrame::Subnegotiate(TelnetOption::Compress2, Bytes::new()).write_to(dst);
        self.compressor = Some(Compressor::new(Algorithm::Zlib));
        debug!("MCCP2 compression started");
        Ok(())
    }

    /// Finish the MCCP2 stream, writing the zlib end marker to `dst`.
    ///
    /// Output written afterwards is uncompressed again.
    pub fn end_compression(&mut self, dst: &mut BytesMut) -> CodecResult<()> {
        if let Some(mut compressor) = self.compressor.take() {
            compressor
                .finish(dst)
                .map_err(|err| CodecError::Compression {
                    reason: err.to_string(),
                })?;
            debug!(
                total_in = compressor.total_in(),
                total_out = compressor.total_out(),
                "MCCP2 compression ended"
            );
        }
        Ok(())
    }

    /// Consume bytes from `src` until an event is available.
    ///
    /// Decoding never fails: malformed input is reported as [`TelnetEvent::Warning`] and
    /// decoding carries on. Returns `None` once `src` is exhausted.
    pub fn next_event(&mut self, src: &mut BytesMut) -> Option<TelnetEvent> {
        while self.pending.is_empty() && src.has_remaining() {
            let byte = src.get_u8();
            self.step(byte);
        }
        self.pending.pop_front()
    }

    /// Advance the decoder by one byte, queueing any events it completes.
    fn step(&mut self, byte: u8) {
        match (self.decoder_state, byte) {
            (DecoderState::NormalData, consts::IAC) => {
                self.decoder_state = DecoderState::InterpretAsCommand;
            }
            (DecoderState::NormalData, _) => {
                self.pending.push_back(TelnetEvent::Data(byte));
            }
            (DecoderState::InterpretAsCommand, consts::DO) => {
                self.decoder_state = DecoderState::Negotiate(TelnetVerb::Do);
            }
            (DecoderState::InterpretAsCommand, consts::DONT) => {
                self.decoder_state = DecoderState::Negotiate(TelnetVerb::Dont);
            }
            (DecoderState::InterpretAsCommand, consts::WILL) => {
                self.decoder_state = DecoderState::Negotiate(TelnetVerb::Will);
            }
            (DecoderState::InterpretAsCommand, consts::WONT) => {
                self.decoder_state = DecoderState::Negotiate(TelnetVerb::Wont);
            }
            (DecoderState::InterpretAsCommand, consts::SB) => {
                self.decoder_state = DecoderState::Subnegotiate;
            }
            (DecoderState::InterpretAsCommand, _) => {
                self.decoder_state = DecoderState::NormalData;
                let event = match byte {
                    consts::IAC => TelnetEvent::Data(consts::IAC),
                    consts::NOP => TelnetEvent::NoOperation,
                    consts::DM => TelnetEvent::DataMark,
                    consts::BRK => TelnetEvent::Break,
                    consts::IP => TelnetEvent::InterruptProcess,
                    consts::AO => TelnetEvent::AbortOutput,
                    consts::AYT => TelnetEvent::AreYouThere,
                    consts::EC => TelnetEvent::EraseCharacter,
                    consts::EL => TelnetEvent::EraseLine,
                    consts::GA => TelnetEvent::GoAhead,
                    consts::EOR => TelnetEvent::EndOfRecord,
                    _ => {
                        trace!("Received Unknown Command {:#X}", byte);
                        TelnetEvent::NoOperation
                    }
                };
                self.pending.push_back(event);
            }
            (DecoderState::Negotiate(verb), _) => {
                self.decoder_state = DecoderState::NormalData;
                self.negotiated(verb, TelnetOption::from_u8(byte));
            }
            (DecoderState::Subnegotiate, _) => {
                self.decoder_buffer.clear();
                self.subnegotiation_overflow = false;
                self.decoder_state = DecoderState::SubnegotiateArgument(byte);
            }
            (DecoderState::SubnegotiateArgument(option), consts::IAC) => {
                self.decoder_state = DecoderState::SubnegotiateArgumentIAC(option);
            }
            (DecoderState::SubnegotiateArgument(option), _) => {
                self.push_argument(option, byte);
            }
            (DecoderState::SubnegotiateArgumentIAC(option), consts::IAC) => {
                self.decoder_state = DecoderState::SubnegotiateArgument(option);
                self.push_argument(option, consts::IAC);
            }
            (DecoderState::SubnegotiateArgumentIAC(option), consts::SE) => {
                self.decoder_state = DecoderState::NormalData;
                let payload = self.decoder_buffer.split().freeze();
                if !self.subnegotiation_overflow {
                    self.pending.push_back(TelnetEvent::Subnegotiate(
                        TelnetOption::from_u8(option),
                        payload,
                    ));
                }
            }
            (DecoderState::SubnegotiateArgumentIAC(option), _) => {
                // Abandon the subnegotiation and treat the byte as the command it introduces.
                self.decoder_buffer.clear();
                self.pending.push_back(TelnetEvent::Warning(format!(
                    "unexpected byte {:#04X} after IAC inside {} subnegotiation",
                    byte,
                    TelnetOption::from_u8(option)
                )));
                self.decoder_state = DecoderState::InterpretAsCommand;
                self.step(byte);
            }
        }
    }

    fn push_argument(&mut self, option: u8, byte: u8) {
        if self.decoder_buffer.len() < self.max_subnegotiation {
            self.decoder_buffer.put_u8(byte);
        } else if !self.subnegotiation_overflow {
            self.subnegotiation_overflow = true;
            self.decoder_buffer.clear();
            self.pending.push_back(TelnetEvent::Warning(format!(
                "{} subnegotiation larger than {} bytes discarded",
                TelnetOption::from_u8(option),
                self.max_subnegotiation
            )));
        }
    }

    fn negotiated(&mut self, verb: TelnetVerb, option: TelnetOption) {
        let side = match verb {
            TelnetVerb::Do | TelnetVerb::Dont => TelnetSide::Local,
            TelnetVerb::Will | TelnetVerb::Wont => TelnetSide::Remote,
        };
        let enabled = |options: &TelnetOptions| match side {
            TelnetSide::Local => options.local_enabled(option),
            TelnetSide::Remote => options.remote_enabled(option),
        };

        let before = enabled(&self.options);
        if let Some(reply) = self.options.handle_received(verb, option) {
            let mut raw = BytesMut::with_capacity(reply.len());
            reply.write_to(&mut raw);
            self.pending.push_back(TelnetEvent::Transmit(raw.freeze()));
        }
        self.pending.push_back(TelnetEvent::Negotiate(verb, option));
        let after = enabled(&self.options);
        if before != after {
            self.pending
                .push_back(TelnetEvent::OptionStatus(option, side, after));
        }
    }
}

impl Default for TelnetCodec {
    fn default() -> Self {
        TelnetCodec {
            decoder_buffer: BytesMut::new(),
            decoder_state: DecoderState::NormalData,
            subnegotiation_overflow: false,
            max_subnegotiation: DEFAULT_MAX_SUBNEGOTIATION,
            options: TelnetOptions::default(),
            pending: VecDeque::new(),
            encoder_buffer: BytesMut::new(),
            compressor: None,
        }
    }
}

impl std::fmt::Debug for TelnetCodec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TelnetCodec")
            .field("decoder_state", &self.decoder_state)
            .field("pending", &self.pending.len())
            .field("compressing", &self.is_compressing())
            .finish()
    }
}

impl Decoder for TelnetCodec {
    type Item = TelnetEvent;
    type Error = CodecError;

    /// Decodes bytes from `src` until at least one [`TelnetEvent`] is available.
    ///
    /// Bytes are consumed one at a time, so a command split across reads is resumed on the
    /// next call. Events produced by a single byte (a negotiation reply, the request and its
    /// status change) are queued and returned by successive calls before any more input is
    /// consumed. `Ok(None)` means `src` is exhausted. See [`TelnetCodec::next_event`].
    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<TelnetEvent>, Self::Error> {
        Ok(self.next_event(src))
    }
}

impl Encoder<TelnetFrame> for TelnetCodec {
    type Error = CodecError;

    fn encode(&mut self, item: TelnetFrame, dst: &mut BytesMut) -> Result<(), Self::Error> {
        self.encoder_buffer.clear();
        item.write_to(&mut self.encoder_buffer);
        write_wire(&mut self.compressor, &self.encoder_buffer, dst)
    }
}

impl Encoder<&[u8]> for TelnetCodec {
    type Error = CodecError;

    /// Encodes application bytes, doubling every IAC. Line endings are passed through as is.
    fn encode(&mut self, item: &[u8], dst: &mut BytesMut) -> Result<(), Self::Error> {
        self.encoder_buffer.clear();
        self.encoder_buffer.reserve(item.len());
        for byte in item {
            if *byte == consts::IAC {
                self.encoder_buffer.put_u8(consts::IAC);
            }
            self.encoder_buffer.put_u8(*byte);
        }
        write_wire(&mut self.compressor, &self.encoder_buffer, dst)
    }
}

impl Encoder<u8> for TelnetCodec {
    type Error = CodecError;

    fn encode(&mut self, item: u8, dst: &mut BytesMut) -> Result<(), Self::Error> {
        self.encode(TelnetFrame::Data(item), dst)
    }
}

fn write_wire(
    compressor: &mut Option<Compressor>,
    raw: &[u8],
    dst: &mut BytesMut,
) -> CodecResult<()> {
    match compressor {
        Some(compressor) => {
            compressor
                .compress(raw, dst)
                .map_err(|err| CodecError::Compression {
                    reason: err.to_string(),
                })?;
        }
        None => dst.extend_from_slice(raw),
    }
    Ok(())
}

/// Decoder position within the telnet grammar.
#[derive(Clone, Copy, Debug)]
enum DecoderState {
    /// Normal Data
    NormalData,
    /// Received IAC, Next byte is Command
    InterpretAsCommand,
    /// Received a negotiation verb, Next Byte is the option
    Negotiate(TelnetVerb),
    /// Received Subnegotiate Command, Next Byte is the option
    Subnegotiate,
    /// Received Subnegotiate Option, Next Bytes are arguments
    SubnegotiateArgument(u8),
    /// Received IAC during Subnegotiation, Next Byte is command
    SubnegotiateArgumentIAC(u8),
}
