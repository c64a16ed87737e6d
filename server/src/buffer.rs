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


//! Fixed-capacity byte buffer

use bytes::{Buf, Bytes, BytesMut};

/// A byte buffer that never holds more than its capacity.
///
/// Appends are truncated at the capacity instead of growing the allocation, so callers
/// learn how much was accepted and decide what to do with the rest.
#[derive(Debug, Clone)]
pub struct BoundedBuffer {
    data: BytesMut,
    capacity: usize,
}

impl BoundedBuffer {
    /// Create an empty buffer holding at most `capacity` bytes
    pub fn new(capacity: usize) -> Self {
        Self {
            data: BytesMut::with_capacity(capacity),
            capacity,
        }
    }

    /// Append as much of `bytes` as fits and return how many were accepted
    pub fn append(&mut self, bytes: &[u8]) -> usize {
        let accepted = bytes.len().min(self.remaining());
        self.data.extend_from_slice(&bytes[..accepted]);
        accepted
    }

    /// Append a single byte, returning `false` when the buffer is full
    pub fn append_byte(&mut self, byte: u8) -> bool {
        if self.is_full() {
            return false;
        }
        self.data.extend_from_slice(&[byte]);
        true
    }

    /// Remove up to `count` bytes from the front, keeping the rest in order
    pub fn drain(&mut self, count: usize) {
        let count = count.min(self.data.len());
        self.data.advance(count);
    }

    /// Remove everything
    pub fn clear(&mut self) {
        self.data.clear();
    }

    /// Remove the last byte, returning `false` if the buffer was empty
    pub fn backspace(&mut self) -> bool {
        match self.data.len() {
            0 => false,
            len => {
                self.data.truncate(len - 1);
                true
            }
        }
    }

    /// Move the current contents out, leaving the buffer empty
    pub fn take(&mut self) -> Bytes {
        self.data.split().freeze()
    }

    /// The buffered bytes
    pub fn as_slice(&self) -> &[u8] {
        &self.data
    }

    /// Number of buffered bytes
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Check if nothing is buffered
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Check if no more bytes fit
    pub fn is_full(&self) -> bool {
        self.data.len() >= self.capacity
    }

    /// Maximum number of bytes the buffer holds
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of bytes that still fit
    pub fn remaining(&self) -> usize {
        self.capacity.saturating_sub(self.data.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_append_truncates_at_capacity() {
        let mut buffer = BoundedBuffer::new(4);
        assert_eq!(buffer.append(b"ab"), 2);
        assert_eq!(buffer.append(b"cdef"), 2);
        assert_eq!(buffer.as_slice(), b"abcd");
        assert!(buffer.is_full());
        assert_eq!(buffer.append(b"g"), 0);
        assert!(!buffer.append_byte(b'g'));
        assert_eq!(buffer.len(), 4);
    }

    #[test]
    fn test_drain_preserves_order() {
        let mut buffer = BoundedBuffer::new(8);
        buffer.append(b"abcdef");
        buffer.drain(2);
        assert_eq!(buffer.as_slice(), b"cdef");
        assert_eq!(buffer.remaining(), 4);
        assert_eq!(buffer.append(b"ghijk"), 4);
        assert_eq!(buffer.as_slice(), b"cdefghij");
        buffer.drain(100);
        assert!(buffer.is_empty());
    }

    #[test]
    fn test_backspace() {
        let mut buffer = BoundedBuffer::new(8);
        assert!(!buffer.backspace());
        buffer.append(b"lookx");
        assert!(buffer.backspace());
        assert_eq!(buffer.as_slice(), b"look");
    }

    #[test]
    fn test_take_and_clear() {
        let mut buffer = BoundedBuffer::new(8);
        buffer.append(b"north");
        let line = buffer.take();
        assert_eq!(&line[..], b"north");
        assert!(buffer.is_empty());
        assert_eq!(buffer.remaining(), 8);

        buffer.append(b"south");
        buffer.clear();
        assert!(buffer.is_empty());
        assert_eq!(buffer.capacity(), 8);
    }
}
