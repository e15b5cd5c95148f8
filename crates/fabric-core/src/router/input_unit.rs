//! Ingress buffering stage.

use crate::{Packet, Queue};

/// One-entry buffer at a router ingress port.
///
/// Decouples upstream timing from the route stage; packets pass through
/// unchanged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputUnit {
    queue: Queue<Packet>,
}

impl Default for InputUnit {
    fn default() -> Self {
        Self::new()
    }
}

impl InputUnit {
    /// Creates an empty input unit.
    #[must_use]
    pub fn new() -> Self {
        Self {
            queue: Queue::single(),
        }
    }

    /// Ingress ready.
    #[must_use]
    pub fn recv_ready(&self) -> bool {
        self.queue.ready()
    }

    /// Buffered packet presented to the route stage.
    #[must_use]
    pub fn send(&self) -> Option<&Packet> {
        self.queue.peek()
    }

    /// Number of buffered packets.
    #[must_use]
    pub fn occupancy(&self) -> usize {
        self.queue.len()
    }

    /// Latches the cycle's ingress transfer and egress dequeue.
    pub fn commit(&mut self, recv: Option<Packet>, send_fired: bool) {
        self.queue.commit(recv, send_fired);
    }

    /// Empties the buffer.
    pub fn reset(&mut self) {
        self.queue.reset();
    }
}
