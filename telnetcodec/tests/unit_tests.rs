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


//! Unit tests for telnetcodec components

use bytes::{Bytes, BytesMut};
use mudcore_compress::{Algorithm, Decompressor};
use mudcore_telnetcodec::naws::WindowSize;
use mudcore_telnetcodec::{
    CodecError, QState, TelnetCodec, TelnetEvent, TelnetFrame, TelnetOption, TelnetOptions,
    TelnetSide, TelnetVerb, consts,
};
use tokio_util::codec::{Decoder, Encoder};

// ============================================================================
// Helper Functions
// ============================================================================

fn encode_frame(codec: &mut TelnetCodec, frame: TelnetFrame) -> BytesMut {
    let mut buffer = BytesMut::new();
    codec.encode(frame, &mut buffer).unwrap();
    buffer
}

fn decode_all(codec: &mut TelnetCodec, buffer: &mut BytesMut) -> Vec<TelnetEvent> {
    let mut events = Vec::new();
    while let Some(event) = codec.decode(buffer).unwrap() {
        events.push(event);
    }
    events
}

/// Deliver every `Transmit` reply from `events` to `peer`, returning the peer's events.
fn relay(events: &[TelnetEvent], peer: &mut TelnetCodec) -> Vec<TelnetEvent> {
    let mut wire = BytesMut::new();
    for event in events {
        if let TelnetEvent::Transmit(bytes) = event {
            wire.extend_from_slice(bytes);
        }
    }
    decode_all(peer, &mut wire)
}

fn client_codec() -> TelnetCodec {
    let mut options = TelnetOptions::empty();
    options.set_supported_local(TelnetOption::NAWS, true);
    options.set_supported_remote(TelnetOption::Compress2, true);
    options.set_supported_remote(TelnetOption::Echo, true);
    TelnetCodec::with_options(options)
}

// ============================================================================
// TelnetOption Tests
// ============================================================================

#[test]
fn telnet_option_from_u8() {
    assert_eq!(TelnetOption::from(0), TelnetOption::TransmitBinary);
    assert_eq!(TelnetOption::from(1), TelnetOption::Echo);
    assert_eq!(TelnetOption::from(31), TelnetOption::NAWS);
    assert_eq!(TelnetOption::from(86), TelnetOption::Compress2);
    assert_eq!(TelnetOption::from(255), TelnetOption::Unknown(255));
}

#[test]
fn telnet_option_display() {
    assert_eq!(format!("{}", TelnetOption::Echo), "Echo");
    assert_eq!(format!("{}", TelnetOption::Compress2), "Compress2");
    assert_eq!(format!("{}", TelnetOption::Unknown(99)), "Unknown(99)");
}

#[test]
fn telnet_verb_display() {
    assert_eq!(TelnetVerb::Will.to_string(), "WILL");
    assert_eq!(TelnetVerb::Dont.to_u8(), consts::DONT);
}

// ============================================================================
// Two Codec Negotiation Tests
// ============================================================================

#[test]
fn server_offers_are_accepted_by_client() {
    let mut server = TelnetCodec::new();
    let mut client = client_codec();

    let compress = server.enable_local(TelnetOption::Compress2).unwrap();
    let naws = server.enable_remote(TelnetOption::NAWS).unwrap();
    let mut wire = encode_frame(&mut server, compress);
    wire.extend_from_slice(&encode_frame(&mut server, naws));

    let client_events = decode_all(&mut client, &mut wire);
    assert!(client.is_enabled_remote(TelnetOption::Compress2));
    assert!(client.is_enabled_local(TelnetOption::NAWS));

    let server_events = relay(&client_events, &mut server);
    assert_eq!(
        server_events,
        vec![
            TelnetEvent::Negotiate(TelnetVerb::Do, TelnetOption::Compress2),
            TelnetEvent::OptionStatus(TelnetOption::Compress2, TelnetSide::Local, true),
            TelnetEvent::Negotiate(TelnetVerb::Will, TelnetOption::NAWS),
            TelnetEvent::OptionStatus(TelnetOption::NAWS, TelnetSide::Remote, true),
        ]
    );
    // The Q-method terminates: the server has nothing further to say.
    assert!(
        !server_events
            .iter()
            .any(|event| matches!(event, TelnetEvent::Transmit(_)))
    );
}

#[test]
fn client_refusing_naws_settles_on_no() {
    let mut server = TelnetCodec::new();
    let mut client = TelnetCodec::with_options(TelnetOptions::empty());

    let naws = server.enable_remote(TelnetOption::NAWS).unwrap();
    let mut wire = encode_frame(&mut server, naws);
    let client_events = decode_all(&mut client, &mut wire);
    assert_eq!(
        client_events[0],
        TelnetEvent::Transmit(Bytes::from_static(&[
            consts::IAC,
            consts::WONT,
            consts::option::NAWS
        ]))
    );

    let server_events = relay(&client_events, &mut server);
    assert_eq!(
        server_events,
        vec![TelnetEvent::Negotiate(TelnetVerb::Wont, TelnetOption::NAWS)]
    );
    assert_eq!(server.options().remote_qstate(TelnetOption::NAWS), QState::No);
}

#[test]
fn echo_toggle_round_trip() {
    let mut server = TelnetCodec::new();
    let mut client = client_codec();

    let mut wire = BytesMut::new();
    assert!(server.negotiate(TelnetVerb::Will, TelnetOption::Echo, &mut wire).unwrap());
    let server_events = relay(&decode_all(&mut client, &mut wire), &mut server);
    assert!(server.is_enabled_local(TelnetOption::Echo));
    assert_eq!(server_events.len(), 2);

    let mut wire = BytesMut::new();
    assert!(server.negotiate(TelnetVerb::Wont, TelnetOption::Echo, &mut wire).unwrap());
    assert_eq!(server.options().local_qstate(TelnetOption::Echo), QState::WantNo);
    let client_events = decode_all(&mut client, &mut wire);
    assert!(!client.is_enabled_remote(TelnetOption::Echo));
    relay(&client_events, &mut server);
    assert_eq!(server.options().local_qstate(TelnetOption::Echo), QState::No);
}

// ============================================================================
// NAWS Tests
// ============================================================================

#[test]
fn naws_frame_reaches_server_as_subnegotiation() {
    let mut client = client_codec();
    let mut server = TelnetCodec::new();

    let mut wire = encode_frame(&mut client, WindowSize::new(132, 43).to_frame());
    let events = decode_all(&mut server, &mut wire);
    assert_eq!(events.len(), 1);
    let TelnetEvent::Subnegotiate(TelnetOption::NAWS, payload) = &events[0] else {
        panic!("expected NAWS subnegotiation, got {:?}", events[0]);
    };
    assert_eq!(WindowSize::decode(payload).unwrap(), WindowSize::new(132, 43));
}

#[test]
fn naws_with_escaped_dimension() {
    let mut server = TelnetCodec::new();
    let mut client = client_codec();
    let mut wire = encode_frame(&mut client, WindowSize::new(255, 255).to_frame());
    let events = decode_all(&mut server, &mut wire);
    let TelnetEvent::Subnegotiate(_, payload) = &events[0] else {
        panic!("expected subnegotiation");
    };
    assert_eq!(&payload[..], &[0, 255, 0, 255]);
}

#[test]
fn naws_short_payload_is_an_error() {
    assert!(matches!(
        WindowSize::decode(&[0, 80, 0]),
        Err(CodecError::SubnegotiationError { .. })
    ));
}

// ============================================================================
// Byte Splitting Tests
// ============================================================================

#[test]
fn every_split_yields_the_same_events() {
    let input: Vec<u8> = [
        &b"look"[..],
        &[consts::IAC, consts::DO, consts::option::ECHO][..],
        &[consts::IAC, consts::SB, consts::option::NAWS, 0, 80, 0, 24, consts::IAC, consts::SE][..],
        &[consts::IAC, consts::IAC][..],
        &b"\r\n"[..],
    ]
    .concat();

    let mut reference = TelnetCodec::new();
    let expected = decode_all(&mut reference, &mut BytesMut::from(&input[..]));

    for split in 0..=input.len() {
        let mut codec = TelnetCodec::new();
        let mut events = decode_all(&mut codec, &mut BytesMut::from(&input[..split]));
        events.extend(decode_all(&mut codec, &mut BytesMut::from(&input[split..])));
        assert_eq!(events, expected, "split at {}", split);
    }
}

// ============================================================================
// Compression Tests
// ============================================================================

#[test]
fn compressed_negotiation_replies() {
    let mut server = TelnetCodec::new();
    let mut wire = BytesMut::new();
    server.negotiate(TelnetVerb::Will, TelnetOption::Compress2, &mut wire).unwrap();
    decode_all(
        &mut server,
        &mut BytesMut::from(&[consts::IAC, consts::DO, consts::option::COMPRESS2][..]),
    );

    let mut out = BytesMut::new();
    server.begin_compression(&mut out).unwrap();
    let marker = out.len();

    // A reply produced while compressing goes through the compressor.
    let events = decode_all(
        &mut server,
        &mut BytesMut::from(&[consts::IAC, consts::DO, consts::option::SGA][..]),
    );
    let TelnetEvent::Transmit(reply) = &events[0] else {
        panic!("expected a reply");
    };
    server.transmit(reply, &mut out).unwrap();

    let mut decompressor = Decompressor::new(Algorithm::Zlib);
    let mut plain = BytesMut::new();
    decompressor.decompress(&out[marker..], &mut plain).unwrap();
    assert_eq!(&plain[..], &[consts::IAC, consts::WILL, consts::option::SGA]);
}

#[test]
fn end_compression_without_start_is_noop() {
    let mut codec = TelnetCodec::new();
    let mut out = BytesMut::new();
    codec.end_compression(&mut out).unwrap();
    assert!(out.is_empty());
}
