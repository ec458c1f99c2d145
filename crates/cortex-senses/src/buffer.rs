//! [`MessageBuffer`] – bounded FIFO of timestamped readings.
//!
//! Each input source owns one.  The polling task appends, the composer
//! reads, the scheduler clears (for streaming modalities).  When the buffer
//! is full the oldest entry is discarded, so a stalled scheduler can never
//! grow a source's memory without bound.

use std::collections::VecDeque;
use std::sync::Mutex;

use cortex_types::Message;

/// Bounded, mutex-guarded message buffer.
///
/// All accessors are short synchronous critical sections; the lock is never
/// held across a suspension point.
#[derive(Debug)]
pub struct MessageBuffer {
    capacity: usize,
    entries: Mutex<VecDeque<Message>>,
}

impl MessageBuffer {
    /// Create a buffer holding at most `capacity` messages.  A capacity of 1
    /// gives latest-value-only semantics.
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            entries: Mutex::new(VecDeque::new()),
        }
    }

    /// Append a message, discarding the oldest entry when full.
    pub fn push(&self, message: Message) {
        let mut entries = self.entries.lock().expect("buffer mutex poisoned");
        while entries.len() >= self.capacity {
            entries.pop_front();
        }
        entries.push_back(message);
    }

    /// Texts of all buffered messages, oldest first.
    pub fn texts(&self) -> Vec<String> {
        self.entries
            .lock()
            .expect("buffer mutex poisoned")
            .iter()
            .map(|m| m.text.clone())
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().expect("buffer mutex poisoned").is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().expect("buffer mutex poisoned").len()
    }

    pub fn clear(&self) {
        self.entries.lock().expect("buffer mutex poisoned").clear();
    }
}
