//! Switch stage: merges several lanes onto one egress.

use crate::{Arbiter, PortMask};

/// Combinational grant of one switch unit for a cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SwitchGrant {
    /// Lane chosen by the arbiter.
    pub grant: Option<usize>,
    /// Ready of the downstream output unit.
    pub send_ready: bool,
}

impl SwitchGrant {
    /// Ready presented to `lane`: only the granted lane sees ready, and only
    /// while the output can accept.
    #[must_use]
    pub fn lane_ready(&self, lane: usize) -> bool {
        self.send_ready && self.grant == Some(lane)
    }
}

/// Per-egress M-to-1 merge stage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SwitchUnit<A> {
    arbiter: A,
    num_inports: usize,
}

impl<A: Arbiter> SwitchUnit<A> {
    /// Creates a switch merging `num_inports` lanes.
    #[must_use]
    pub const fn new(arbiter: A, num_inports: usize) -> Self {
        Self {
            arbiter,
            num_inports,
        }
    }

    /// Number of merged lanes.
    #[must_use]
    pub const fn num_inports(&self) -> usize {
        self.num_inports
    }

    /// Arbitration state.
    #[must_use]
    pub const fn arbiter(&self) -> &A {
        &self.arbiter
    }

    /// Picks a lane among `requests`.
    #[must_use]
    pub fn evaluate(&self, requests: PortMask, send_ready: bool) -> SwitchGrant {
        SwitchGrant {
            grant: self.arbiter.grant(requests),
            send_ready,
        }
    }

    /// Advances arbitration past `fired`, the lane that transferred.
    pub fn commit(&mut self, fired: Option<usize>) {
        if let Some(lane) = fired {
            self.arbiter.accept(lane);
        }
    }

    /// Restores reset priority.
    pub fn reset(&mut self) {
        self.arbiter.reset();
    }
}

#[cfg(test)]
mod tests {
    use super::SwitchUnit;
    use crate::{PortMask, RoundRobinArbiter};

    #[test]
    fn only_granted_lane_sees_ready() {
        let switch = SwitchUnit::new(RoundRobinArbiter::new(), 3);
        let grant = switch.evaluate(PortMask::from_bits(0b110, 3), true);
        assert_eq!(grant.grant, Some(1));
        assert!(grant.lane_ready(1));
        assert!(!grant.lane_ready(2));
        assert!(!grant.lane_ready(0));
    }

    #[test]
    fn blocked_output_withholds_ready_but_keeps_grant() {
        let switch = SwitchUnit::new(RoundRobinArbiter::new(), 2);
        let grant = switch.evaluate(PortMask::full(2), false);
        assert_eq!(grant.grant, Some(0));
        assert!(!grant.lane_ready(0));
    }

    #[test]
    fn commit_without_transfer_keeps_priority() {
        let mut switch = SwitchUnit::new(RoundRobinArbiter::new(), 2);
        switch.commit(None);
        assert_eq!(switch.evaluate(PortMask::full(2), true).grant, Some(0));
        switch.commit(Some(0));
        assert_eq!(switch.evaluate(PortMask::full(2), true).grant, Some(1));
        switch.reset();
        assert_eq!(switch.arbiter().last_granted(), None);
    }
}
