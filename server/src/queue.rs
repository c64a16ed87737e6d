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


//! Bounded FIFO of complete input lines

use bytes::Bytes;
use std::collections::VecDeque;

/// Complete input lines waiting for dispatch, oldest first.
#[derive(Debug, Clone)]
pub struct CommandQueue {
    lines: VecDeque<Bytes>,
    capacity: usize,
}

impl CommandQueue {
    /// Create an empty queue holding at most `capacity` lines
    pub fn new(capacity: usize) -> Self {
        Self {
            lines: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Queue a line, handing it back if the queue is full
    pub fn push(&mut self, line: Bytes) -> Result<(), Bytes> {
        if self.is_full() {
            return Err(line);
        }
        self.lines.push_back(line);
        Ok(())
    }

    /// Remove the oldest line
    pub fn pop(&mut self) -> Option<Bytes> {
        self.lines.pop_front()
    }

    /// Drop every queued line
    pub fn clear(&mut self) {
        self.lines.clear();
    }

    /// Number of queued lines
    pub fn len(&self) -> usize {
        self.lines.len()
    }

    /// Check if no lines are queued
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Check if another push would be rejected
    pub fn is_full(&self) -> bool {
        self.lines.len() >= self.capacity
    }

    /// Maximum number of queued lines
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
