//! Bounded FIFO replay buffer for sanitized session output.
//!
//! Every sanitized chunk a session produces is appended here before fan-out,
//! so a client that attaches late (or reattaches after a disconnect) can
//! still be caught up via `terminal:replay-data`. The buffer is capped at a
//! byte capacity rather than a chunk count, since output chunk sizes vary
//! wildly (a single keystroke echo vs. a `cat` of a large file).

use coterm_core::config::DEFAULT_REPLAY_CAPACITY_BYTES;
use std::collections::VecDeque;

/// FIFO ring buffer of output chunks, capped at a total byte capacity.
pub struct ReplayBuffer {
    capacity: usize,
    chunks: VecDeque<Vec<u8>>,
    total: usize,
}

impl ReplayBuffer {
    pub fn new(capacity: usize) -> Self {
        Self { capacity, chunks: VecDeque::new(), total: 0 }
    }

    pub fn with_default_capacity() -> Self {
        Self::new(DEFAULT_REPLAY_CAPACITY_BYTES)
    }

    /// Append a chunk, evicting from the head until the buffer fits within
    /// capacity. A single chunk larger than capacity replaces the buffer
    /// outright with its trailing `capacity` bytes.
    pub fn append(&mut self, chunk: &[u8]) {
        if chunk.is_empty() {
            return;
        }

        if chunk.len() >= self.capacity {
            self.chunks.clear();
            let tail = &chunk[chunk.len() - self.capacity..];
            self.chunks.push_back(tail.to_vec());
            self.total = tail.len();
            return;
        }

        self.chunks.push_back(chunk.to_vec());
        self.total += chunk.len();

        while self.total > self.capacity {
            if let Some(front) = self.chunks.pop_front() {
                self.total -= front.len();
            } else {
                break;
            }
        }
    }

    /// Concatenation of all retained chunks, oldest first.
    pub fn snapshot(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.total);
        for chunk in &self.chunks {
            out.extend_from_slice(chunk);
        }
        out
    }

    pub fn size(&self) -> usize {
        self.total
    }

    pub fn clear(&mut self) {
        self.chunks.clear();
        self.total = 0;
    }
}
