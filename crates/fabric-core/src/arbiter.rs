//! Arbitration policies for switch units.

use std::fmt;

use crate::PortMask;

/// Picks one winner among requesting lanes each cycle.
///
/// `grant` is evaluated combinationally; `accept` is called at commit time
/// only for a grant that completed a transfer.
pub trait Arbiter: fmt::Debug {
    /// Chooses a lane among the set bits of `requests`, if any.
    fn grant(&self, requests: PortMask) -> Option<usize>;

    /// Records that `lane` completed a transfer.
    fn accept(&mut self, lane: usize);

    /// Returns to the reset priority order.
    fn reset(&mut self);
}

/// Round-robin arbiter.
///
/// Priority starts at the lane after the last one that completed a transfer,
/// so under sustained contention every requesting lane is served within
/// `num_lanes - 1` transfers of any other.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RoundRobinArbiter {
    last: Option<usize>,
}

impl RoundRobinArbiter {
    /// Creates an arbiter that favours lane 0 first.
    #[must_use]
    pub const fn new() -> Self {
        Self { last: None }
    }

    /// Lane that most recently completed a transfer.
    #[must_use]
    pub const fn last_granted(&self) -> Option<usize> {
        self.last
    }
}

impl Arbiter for RoundRobinArbiter {
    fn grant(&self, requests: PortMask) -> Option<usize> {
        let width = requests.width();
        if requests.is_empty() || width == 0 {
            return None;
        }
        let start = self.last.map_or(0, |last| (last + 1) % width);
        (0..width)
            .map(|offset| (start + offset) % width)
            .find(|lane| requests.is_set(*lane))
    }

    fn accept(&mut self, lane: usize) {
        self.last = Some(lane);
    }

    fn reset(&mut self) {
        self.last = None;
    }
}

impl fmt::Display for RoundRobinArbiter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.last {
            Some(lane) => write!(f, "rr(last={lane})"),
            None => write!(f, "rr(reset)"),
        }
    }
}
