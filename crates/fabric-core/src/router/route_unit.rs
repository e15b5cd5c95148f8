//! Route stage: turns a buffered packet into per-lane requests.

use crate::{Packet, PortMask, RouteFault, RoutingLogic, SenderId};

/// Combinational result of routing the buffered packet for one cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RouteDecision {
    /// Raw decision vector from the routing logic.
    pub select: PortMask,
    /// Lanes requested this cycle: `select` gated by packet valid.
    pub request: PortMask,
    /// Fault raised this cycle or latched earlier.
    pub fault: Option<RouteFault>,
}

impl RouteDecision {
    /// Requested lanes whose ready is low.
    #[must_use]
    pub const fn blocking(&self, lane_ready: PortMask) -> PortMask {
        self.request.and(lane_ready.complement())
    }

    /// Ingress ready: no requested lane is blocked and no fault is held.
    #[must_use]
    pub const fn recv_ready(&self, lane_ready: PortMask) -> bool {
        self.fault.is_none() && self.blocking(lane_ready).is_empty()
    }

    /// Lanes that transfer this cycle.
    ///
    /// Lane valid is gated by the ingress ready, so a multicast packet is
    /// presented to all of its lanes in the same cycle or to none of them.
    #[must_use]
    pub const fn lane_fire(&self, lane_ready: PortMask) -> PortMask {
        if self.recv_ready(lane_ready) {
            self.request
        } else {
            PortMask::empty(self.request.width())
        }
    }

    /// Returns `true` when the buffered packet retires this cycle.
    #[must_use]
    pub const fn retires(&self, lane_ready: PortMask) -> bool {
        !self.request.is_empty() && self.recv_ready(lane_ready)
    }
}

/// Per-ingress route stage.
///
/// Holds a routing logic instance and a sticky fault register. A packet
/// whose decision selects nothing, or whose decision has the wrong width,
/// faults the unit; it then holds its ingress not-ready until reset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteUnit<R> {
    logic: R,
    num_outports: usize,
    fault: Option<RouteFault>,
}

impl<R: RoutingLogic> RouteUnit<R> {
    /// Creates a route unit feeding `num_outports` lanes.
    #[must_use]
    pub const fn new(logic: R, num_outports: usize) -> Self {
        Self {
            logic,
            num_outports,
            fault: None,
        }
    }

    /// Routing logic in use.
    #[must_use]
    pub const fn logic(&self) -> &R {
        &self.logic
    }

    /// Latched fault, if any.
    #[must_use]
    pub const fn fault(&self) -> Option<RouteFault> {
        self.fault
    }

    /// Routes `packet` (the buffered head, if any) for this cycle.
    #[must_use]
    pub fn route(&self, packet: Option<&Packet>, sender: SenderId) -> RouteDecision {
        let idle = PortMask::empty(self.num_outports);
        if let Some(fault) = self.fault {
            return RouteDecision {
                select: idle,
                request: idle,
                fault: Some(fault),
            };
        }
        let Some(packet) = packet else {
            return RouteDecision {
                select: idle,
                request: idle,
                fault: None,
            };
        };

        let select = self.logic.route(packet, sender);
        let fault = if select.width() != self.num_outports {
            Some(RouteFault::DecisionWidth {
                expected: self.num_outports,
                got: select.width(),
            })
        } else if select.is_empty() {
            Some(RouteFault::EmptyDecision { addr: packet.addr })
        } else {
            None
        };

        RouteDecision {
            select,
            request: if fault.is_some() { idle } else { select },
            fault,
        }
    }

    /// Latches a fault raised by `decision`.
    pub fn commit(&mut self, decision: &RouteDecision) {
        if let (None, Some(fault)) = (self.fault, decision.fault) {
            log::error!("route unit fault: {fault}");
            self.fault = Some(fault);
        }
    }

    /// Clears the fault register.
    pub fn reset(&mut self) {
        self.fault = None;
    }
}
