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


//! # Stream Compression
//!
//! This crate provides the synchronous compression primitives used to implement the MUD Client
//! Compression Protocol (MCCP). Unlike a general purpose stream wrapper, a [`Compressor`] is fed
//! discrete writes and flushes each of them with a zlib *sync flush*, so every chunk it produces
//! can be decoded by the peer as soon as it arrives. That property is what lets a single-threaded
//! server interleave compressed prompts with ordinary output without ever waiting on a timer.
//!
//! ## Basic Usage
//!
//! ```rust
//! use bytes::BytesMut;
//! use mudcore_compress::{Algorithm, Compressor, Decompressor};
//!
//! let mut compressor = Compressor::new(Algorithm::Zlib);
//! let mut wire = BytesMut::new();
//! compressor.compress(b"Welcome to the realm!\r\n", &mut wire).unwrap();
//!
//! let mut decompressor = Decompressor::new(Algorithm::Zlib);
//! let mut plain = BytesMut::new();
//! decompressor.decompress(&wire, &mut plain).unwrap();
//! assert_eq!(&plain[..], b"Welcome to the realm!\r\n");
//! ```
//!
//! ## Algorithm Selection
//!
//! - **`Algorithm::None`**: pass-through, the bytes are copied unchanged
//! - **`Algorithm::Zlib`**: DEFLATE with a zlib wrapper, the format MCCP v2 mandates
//! - **`Algorithm::Deflate`**: raw DEFLATE without header or checksum
//!
//! ## Stream Finalization
//!
//! [`Compressor::finish`] writes the end of stream marker. After that point the peer expects
//! uncompressed data again, and any further call to [`Compressor::compress`] fails.

#![warn(missing_docs, rust_2018_idioms)]

use bytes::BytesMut;
use flate2::{Compress, Compression, Decompress, FlushCompress, FlushDecompress, Status};
use std::io;
use tracing::trace;

/// Size of the scratch block used while pumping data through the engine.
const CHUNK_SIZE: usize = 4096;

/// Compression algorithm selection.
///
/// | Algorithm | Format | Use Case |
/// |-----------|--------|----------|
/// | `None` | raw bytes | compression negotiated off, testing |
/// | `Zlib` | RFC 1950 | MCCP v2 |
/// | `Deflate` | RFC 1951 | custom framings without checksums |
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Algorithm {
    /// No compression, data passes through unchanged.
    #[default]
    None,
    /// DEFLATE with a zlib header and Adler-32 trailer.
    Zlib,
    /// Raw DEFLATE.
    Deflate,
}

impl Algorithm {
    fn zlib_header(self) -> bool {
        matches!(self, Algorithm::Zlib)
    }
}

/// An incremental compressor that sync-flushes every write.
///
/// Each call to [`compress`](Compressor::compress) consumes all of its input and appends a
/// self-contained, immediately decodable block to the destination buffer.
pub struct Compressor {
    algorithm: Algorithm,
    engine: Option<Compress>,
    finished: bool,
}

impl Compressor {
    /// Create a compressor using the default compression level.
    pub fn new(algorithm: Algorithm) -> Self {
        Self::with_level(algorithm, Compression::default().level())
    }

    /// Create a compressor with an explicit level between 0 (store) and 9 (best).
    pub fn with_level(algorithm: Algorithm, level: u32) -> Self {
        let engine = match algorithm {
            Algorithm::None => None,
            Algorithm::Zlib | Algorithm::Deflate => Some(Compress::new(
                Compression::new(level.min(9)),
                algorithm.zlib_header(),
            )),
        };
        Compressor {
            algorithm,
            engine,
            finished: false,
        }
    }

    /// The algorithm this compressor was created with.
    pub fn algorithm(&self) -> Algorithm {
        self.algorithm
    }

    /// Whether the end of stream marker has been written.
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Total number of uncompressed bytes consumed so far.
    pub fn total_in(&self) -> u64 {
        self.engine.as_ref().map_or(0, Compress::total_in)
    }

    /// Total number of compressed bytes produced so far.
    pub fn total_out(&self) -> u64 {
        self.engine.as_ref().map_or(0, Compress::total_out)
    }

    /// Compress `input` and append the sync-flushed output to `dst`.
    ///
    /// Returns the number of bytes appended to `dst`.
    pub fn compress(&mut self, input: &[u8], dst: &mut BytesMut) -> io::Result<usize> {
        if self.finished {
            return Err(io::Error::other("compression stream already finished"));
        }
        if input.is_empty() {
            return Ok(0);
        }
        let Some(engine) = self.engine.as_mut() else {
            dst.extend_from_slice(input);
            return Ok(input.len());
        };

        let mut chunk = [0u8; CHUNK_SIZE];
        let mut consumed = 0usize;
        let mut written = 0usize;
        loop {
            let before_in = engine.total_in();
            let before_out = engine.total_out();
            engine
                .compress(&input[consumed..], &mut chunk, FlushCompress::Sync)
                .map_err(io::Error::other)?;
            let read = (engine.total_in() - before_in) as usize;
            let produced = (engine.total_out() - before_out) as usize;
            consumed += read;
            written += produced;
            dst.extend_from_slice(&chunk[..produced]);

            // The flush is complete once all input is taken and the engine left room to spare.
            if consumed == input.len() && produced < CHUNK_SIZE {
                break;
            }
            if read == 0 && produced == 0 {
                return Err(io::Error::other("compressor made no progress"));
            }
        }
        trace!(input = input.len(), output = written, "Compressed block");
        Ok(written)
    }

    /// Write the end of stream marker to `dst`.
    ///
    /// Calling this more than once is a no-op.
    pub fn finish(&mut self, dst: &mut BytesMut) -> io::Result<usize> {
        if self.finished {
            return Ok(0);
        }
        self.finished = true;
        let Some(engine) = self.engine.as_mut() else {
            return Ok(0);
        };

        let mut chunk = [0u8; CHUNK_SIZE];
        let mut written = 0usize;
        loop {
            let before_out = engine.total_out();
            let status = engine
                .compress(&[], &mut chunk, FlushCompress::Finish)
                .map_err(io::Error::other)?;
            let produced = (engine.total_out() - before_out) as usize;
            written += produced;
            dst.extend_from_slice(&chunk[..produced]);
            match status {
                Status::StreamEnd => break,
                Status::Ok | Status::BufError if produced == 0 => {
                    return Err(io::Error::other("compressor failed to finish stream"));
                }
                Status::Ok | Status::BufError => {}
            }
        }
        Ok(written)
    }
}

impl std::fmt::Debug for Compressor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Compressor")
            .field("algorithm", &self.algorithm)
            .field("total_in", &self.total_in())
            .field("total_out", &self.total_out())
            .field("finished", &self.finished)
            .finish()
    }
}

/// The inverse of [`Compressor`], used by clients and by tests.
pub struct Decompressor {
    algorithm: Algorithm,
    engine: Option<Decompress>,
    finished: bool,
}

impl Decompressor {
    /// Create a decompressor for the given algorithm.
    pub fn new(algorithm: Algorithm) -> Self {
        let engine = match algorithm {
            Algorithm::None => None,
            Algorithm::Zlib | Algorithm::Deflate => {
                Some(Decompress::new(algorithm.zlib_header()))
            }
        };
        Decompressor {
            algorithm,
            engine,
            finished: false,
        }
    }

    /// The algorithm this decompressor was created with.
    pub fn algorithm(&self) -> Algorithm {
        self.algorithm
    }

    /// Whether the end of the compressed stream has been reached.
    ///
    /// Bytes following the end marker are not part of the compressed stream.
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Decompress as much of `input` as possible into `dst`.
    ///
    /// Returns the number of input bytes consumed. This is less than `input.len()` only when the
    /// end of stream marker was reached before the end of `input`.
    pub fn decompress(&mut self, input: &[u8], dst: &mut BytesMut) -> io::Result<usize> {
        if self.finished {
            return Ok(0);
        }
        let Some(engine) = self.engine.as_mut() else {
            dst.extend_from_slice(input);
            return Ok(input.len());
        };

        let mut chunk = [0u8; CHUNK_SIZE];
        let mut consumed = 0usize;
        loop {
            let before_in = engine.total_in();
            let before_out = engine.total_out();
            let status = engine
                .decompress(&input[consumed..], &mut chunk, FlushDecompress::Sync)
                .map_err(|err| io::Error::new(io::ErrorKind::InvalidData, err))?;
            let read = (engine.total_in() - before_in) as usize;
            let produced = (engine.total_out() - before_out) as usize;
            consumed += read;
            dst.extend_from_slice(&chunk[..produced]);

            if status == Status::StreamEnd {
                self.finished = true;
                break;
            }
            if consumed == input.len() && produced < CHUNK_SIZE {
                break;
            }
            if read == 0 && produced == 0 {
                break;
            }
        }
        Ok(consumed)
    }
}

impl std::fmt::Debug for Decompressor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Decompressor")
            .field("algorithm", &self.algorithm)
            .field("finished", &self.finished)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn passthrough_copies_input() {
        let mut compressor = Compressor::new(Algorithm::None);
        let mut dst = BytesMut::new();
        assert_eq!(compressor.compress(b"plain", &mut dst).unwrap(), 5);
        assert_eq!(&dst[..], b"plain");
        assert_eq!(compressor.total_in(), 0);
    }

    #[test]
    fn empty_input_produces_nothing() {
        let mut compressor = Compressor::new(Algorithm::Zlib);
        let mut dst = BytesMut::new();
        assert_eq!(compressor.compress(b"", &mut dst).unwrap(), 0);
        assert!(dst.is_empty());
    }

    #[test]
    fn zlib_stream_starts_with_header() {
        let mut compressor = Compressor::new(Algorithm::Zlib);
        let mut dst = BytesMut::new();
        compressor.compress(b"hello", &mut dst).unwrap();
        assert_eq!(dst[0], 0x78);
        // A sync flush always ends with an empty stored block.
        assert_eq!(&dst[dst.len() - 4..], &[0x00, 0x00, 0xFF, 0xFF]);
    }

    #[test]
    fn compress_after_finish_fails() {
        let mut compressor = Compressor::new(Algorithm::Zlib);
        let mut dst = BytesMut::new();
        compressor.compress(b"bye", &mut dst).unwrap();
        assert!(compressor.finish(&mut dst).unwrap() > 0);
        assert!(compressor.is_finished());
        assert_eq!(compressor.finish(&mut dst).unwrap(), 0);
        assert!(compressor.compress(b"again", &mut dst).is_err());
    }
}
