//! Elastic FIFO buffer with a valid/ready streaming interface.

use std::collections::VecDeque;

use crate::ConfigError;

/// One side of a valid/ready handshake for the current cycle.
///
/// `msg` is `Some` exactly when the producer asserts valid. A transfer happens
/// on cycles where the item is valid and the consumer is ready.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StreamItem<T> {
    /// Producer payload, present while valid.
    pub msg: Option<T>,
    /// Consumer ready.
    pub ready: bool,
}

impl<T> StreamItem<T> {
    /// Pairs a producer payload with a consumer ready.
    #[must_use]
    pub const fn new(msg: Option<T>, ready: bool) -> Self {
        Self { msg, ready }
    }

    /// Producer valid.
    #[must_use]
    pub const fn is_valid(&self) -> bool {
        self.msg.is_some()
    }

    /// Returns `true` on a transfer cycle.
    #[must_use]
    pub const fn fires(&self) -> bool {
        self.msg.is_some() && self.ready
    }

    /// The transferred item, if this cycle is a transfer.
    #[must_use]
    pub fn transfer(self) -> Option<T> {
        if self.ready {
            self.msg
        } else {
            None
        }
    }
}

/// Bounded FIFO queue.
///
/// `ready` reflects only the stored count, never a dequeue in the same
/// cycle, so a queue never forms a combinational path from its output
/// handshake to its input handshake.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Queue<T> {
    entries: VecDeque<T>,
    capacity: usize,
}

impl<T> Queue<T> {
    /// Creates an empty queue holding at most `capacity` entries.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::ZeroCapacity`] when `capacity` is zero.
    pub fn new(capacity: usize) -> Result<Self, ConfigError> {
        if capacity == 0 {
            return Err(ConfigError::ZeroCapacity);
        }
        Ok(Self {
            entries: VecDeque::with_capacity(capacity),
            capacity,
        })
    }

    /// Creates a single-entry skid buffer.
    #[must_use]
    pub fn single() -> Self {
        Self {
            entries: VecDeque::with_capacity(1),
            capacity: 1,
        }
    }

    /// Maximum number of stored entries.
    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of stored entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` when nothing is stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns `true` when no further entry can be accepted.
    #[must_use]
    pub fn is_full(&self) -> bool {
        self.entries.len() >= self.capacity
    }

    /// Input-side ready: the queue can accept an entry this cycle.
    #[must_use]
    pub fn ready(&self) -> bool {
        !self.is_full()
    }

    /// Output-side payload: the oldest entry, present while valid.
    #[must_use]
    pub fn peek(&self) -> Option<&T> {
        self.entries.front()
    }

    /// Stored entries, oldest first.
    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.entries.iter()
    }

    /// Latches one cycle of traffic: an optional accepted entry and whether
    /// the head was taken.
    ///
    /// Callers only pass an entry when [`Queue::ready`] held during the cycle
    /// and only dequeue when [`Queue::peek`] was valid.
    pub fn commit(&mut self, enq: Option<T>, deq: bool) {
        debug_assert!(!deq || !self.entries.is_empty(), "dequeue from empty queue");
        debug_assert!(
            enq.is_none() || self.entries.len() < self.capacity,
            "enqueue into full queue"
        );
        if deq {
            self.entries.pop_front();
        }
        if let Some(entry) = enq {
            self.entries.push_back(entry);
        }
    }

    /// Synchronous reset: drops every stored entry.
    pub fn reset(&mut self) {
        self.entries.clear();
    }
}
