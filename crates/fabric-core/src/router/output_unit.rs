//! Egress buffering stage.

use crate::{Packet, Queue};

/// Buffer at a router egress port.
///
/// One slot deep, like the input unit: the registered output cuts every
/// combinational path from the downstream ready back into the route and
/// switch stages.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputUnit {
    queue: Queue<Packet>,
}

impl Default for OutputUnit {
    fn default() -> Self {
        Self::new()
    }
}

impl OutputUnit {
    /// Creates an empty output unit.
    #[must_use]
    pub fn new() -> Self {
        Self {
            queue: Queue::single(),
        }
    }

    /// Ready seen by the route or switch stage.
    #[must_use]
    pub fn recv_ready(&self) -> bool {
        self.queue.ready()
    }

    /// Packet presented on the router egress port.
    #[must_use]
    pub fn send(&self) -> Option<&Packet> {
        self.queue.peek()
    }

    /// Latches the cycle's merged-stream transfer and egress dequeue.
    pub fn commit(&mut self, recv: Option<Packet>, send_fired: bool) {
        self.queue.commit(recv, send_fired);
    }

    /// Empties the buffer.
    pub fn reset(&mut self) {
        self.queue.reset();
    }
}
