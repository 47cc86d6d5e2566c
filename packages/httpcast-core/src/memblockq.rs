//! Bounded, byte-addressed FIFO of sample chunks.
//!
//! Holds the bytes produced by a source-output between the audio-thread push
//! and the main-thread write pump. Backpressure is drop-oldest: a
//! push that would exceed `max_length` evicts bytes from the front of the
//! queue first, so a slow HTTP client never stalls the producer.

use std::collections::VecDeque;

use bytes::Bytes;

pub struct MemBlockQueue {
    max_length: usize,
    frame_size: usize,
    chunks: VecDeque<Bytes>,
    length: usize,
}

impl MemBlockQueue {
    pub fn new(max_length: usize, frame_size: usize) -> Self {
        MemBlockQueue { max_length, frame_size: frame_size.max(1), chunks: VecDeque::new(), length: 0 }
    }

    /// Appends `chunk`, aligning it down to a whole number of frames (a
    /// partial trailing frame is dropped, mirroring `push_align`'s
    /// alignment-aware push). If the push would exceed `max_length`, the
    /// oldest bytes are dropped first to make room.
    pub fn push_align(&mut self, mut chunk: Bytes) {
        let aligned_len = (chunk.len() / self.frame_size) * self.frame_size;
        if aligned_len == 0 {
            return;
        }
        chunk.truncate(aligned_len);

        let overflow = (self.length + aligned_len).saturating_sub(self.max_length);
        if overflow > 0 {
            self.drop_bytes(overflow.min(self.length));
        }

        self.length += chunk.len();
        self.chunks.push_back(chunk);
    }

    /// Returns the oldest resident chunk without consuming it, or `None` if
    /// the queue is empty (the write pump's "nothing to do" case).
    pub fn peek(&self) -> Option<&Bytes> {
        self.chunks.front()
    }

    /// Removes exactly `n` bytes from the front of the queue, splitting the
    /// leading chunk if `n` doesn't land on a chunk boundary. Byte-granular
    /// so a short socket write only retires what was actually accepted.
    pub fn drop_bytes(&mut self, mut n: usize) {
        n = n.min(self.length);
        while n > 0 {
            let Some(front) = self.chunks.front_mut() else { break };
            if front.len() <= n {
                n -= front.len();
                self.length -= front.len();
                self.chunks.pop_front();
            } else {
                let _ = front.split_to(n);
                self.length -= n;
                n = 0;
            }
        }
    }

    /// Total bytes currently resident, the value the latency callback
    /// converts to a backlog estimate.
    pub fn len(&self) -> usize {
        self.length
    }

    pub fn is_empty(&self) -> bool {
        self.length == 0
    }

    pub fn max_length(&self) -> usize {
        self.max_length
    }
}
