//! Generic M×N router built from input, route, switch and output units.

use crate::{
    Arbiter, ConfigError, Packet, PortMask, RoundRobinArbiter, RouteFault, RoutingLogic,
    SenderId, StreamItem,
};

use super::{InputUnit, OutputUnit, RouteDecision, RouteUnit, SwitchGrant, SwitchUnit};

/// Everything the router computed for one cycle.
///
/// Produced by [`Router::evaluate`] and consumed by [`Router::commit`]; the
/// fields are public so callers can inspect transfers before committing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouterEval {
    /// Ingress handshakes: upstream payload and input-unit ready.
    pub recv: Vec<StreamItem<Packet>>,
    /// Route decisions, one per ingress.
    pub decisions: Vec<RouteDecision>,
    /// Multicast lane allowed to compete at the switches this cycle.
    pub multicast_lead: Option<usize>,
    /// Switch grants, one per egress; empty for single-ingress routers.
    pub grants: Vec<SwitchGrant>,
    /// Ingress lanes whose buffered packet retires.
    pub retired: Vec<bool>,
    /// Packet entering each output unit.
    pub out_enq: Vec<Option<Packet>>,
    /// Lane that won each switch and transferred.
    pub switch_fired: Vec<Option<usize>>,
    /// Egress handshakes: output-unit payload and downstream ready.
    pub send: Vec<StreamItem<Packet>>,
}

impl RouterEval {
    /// Packet accepted on ingress `port`, if any.
    #[must_use]
    pub fn accepted(&self, port: usize) -> Option<Packet> {
        self.recv.get(port).and_then(|item| item.transfer())
    }

    /// Packet delivered on egress `port`, if any.
    #[must_use]
    pub fn delivered(&self, port: usize) -> Option<Packet> {
        self.send.get(port).and_then(|item| item.transfer())
    }
}

/// Packet router with `M` ingress and `N` egress ports.
///
/// Each ingress is buffered, routed by its own route unit, merged per egress
/// by a switch unit when `M > 1`, and buffered again at the egress. Every
/// port state is registered, so [`Router::recv_ready`] and [`Router::send`]
/// depend only on state.
///
/// A multicast packet needs the grant of every switch it selects in the
/// same cycle. Only one multicast lane at a time, the lead, competes at the
/// switches; the others wait behind it. The lead is picked by a router-wide
/// arbiter that advances only when the lead transfers. Each switch keeps
/// serving unicast lanes until its own rotation reaches the lead and then
/// holds the grant there, so all of the lead's switches converge on it.
#[derive(Debug, Clone)]
pub struct Router<R, A = RoundRobinArbiter> {
    sender: SenderId,
    input_units: Vec<InputUnit>,
    route_units: Vec<RouteUnit<R>>,
    multicast: A,
    switch_units: Vec<SwitchUnit<A>>,
    output_units: Vec<OutputUnit>,
}

impl<R: RoutingLogic + Clone> Router<R, RoundRobinArbiter> {
    /// Builds a router with round-robin switch arbitration.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::ZeroPorts`], [`ConfigError::TooManyPorts`] or
    /// [`ConfigError::DecisionWidthMismatch`] for an unusable topology.
    pub fn new(
        sender: SenderId,
        num_inports: usize,
        num_outports: usize,
        logic: R,
    ) -> Result<Self, ConfigError> {
        Self::with_arbiter(
            sender,
            num_inports,
            num_outports,
            logic,
            RoundRobinArbiter::new(),
        )
    }
}

impl<R: RoutingLogic + Clone, A: Arbiter + Clone> Router<R, A> {
    /// Builds a router whose switch units each start from a copy of
    /// `arbiter`.
    ///
    /// # Errors
    ///
    /// Same as [`Router::new`].
    pub fn with_arbiter(
        sender: SenderId,
        num_inports: usize,
        num_outports: usize,
        logic: R,
        arbiter: A,
    ) -> Result<Self, ConfigError> {
        if num_inports == 0 || num_outports == 0 {
            return Err(ConfigError::ZeroPorts {
                inports: num_inports,
                outports: num_outports,
            });
        }
        PortMask::check_width(num_inports)?;
        PortMask::check_width(num_outports)?;
        if logic.num_outports() != num_outports {
            return Err(ConfigError::DecisionWidthMismatch {
                logic: logic.num_outports(),
                router: num_outports,
            });
        }

        let multicast = arbiter.clone();
        let switch_units = if num_inports > 1 {
            vec![SwitchUnit::new(arbiter, num_inports); num_outports]
        } else {
            Vec::new()
        };
        log::debug!(
            "router {}: {num_inports}x{num_outports}, {} switch units",
            sender.0,
            switch_units.len()
        );

        Ok(Self {
            sender,
            input_units: vec![InputUnit::new(); num_inports],
            route_units: vec![RouteUnit::new(logic, num_outports); num_inports],
            multicast,
            switch_units,
            output_units: vec![OutputUnit::new(); num_outports],
        })
    }
}

impl<R: RoutingLogic, A: Arbiter> Router<R, A> {
    /// Sender id presented to the routing logic.
    #[must_use]
    pub const fn sender(&self) -> SenderId {
        self.sender
    }

    /// Number of ingress ports.
    #[must_use]
    pub fn num_inports(&self) -> usize {
        self.input_units.len()
    }

    /// Number of egress ports.
    #[must_use]
    pub fn num_outports(&self) -> usize {
        self.output_units.len()
    }

    /// Ready on ingress `port`. Out-of-range ports are never ready.
    #[must_use]
    pub fn recv_ready(&self, port: usize) -> bool {
        self.input_units
            .get(port)
            .is_some_and(InputUnit::recv_ready)
    }

    /// Packet presented on egress `port`.
    #[must_use]
    pub fn send(&self, port: usize) -> Option<&Packet> {
        self.output_units.get(port).and_then(OutputUnit::send)
    }

    /// Fault latched by the route unit behind ingress `port`.
    #[must_use]
    pub fn fault(&self, port: usize) -> Option<RouteFault> {
        self.route_units.get(port).and_then(RouteUnit::fault)
    }

    /// All latched faults with their ingress port.
    pub fn faults(&self) -> impl Iterator<Item = (usize, RouteFault)> + '_ {
        self.route_units
            .iter()
            .enumerate()
            .filter_map(|(port, unit)| unit.fault().map(|fault| (port, fault)))
    }

    /// Router-wide arbitration state for multicast lanes.
    #[must_use]
    pub const fn multicast_arbiter(&self) -> &A {
        &self.multicast
    }

    /// Packets buffered anywhere in the router.
    #[must_use]
    pub fn occupancy(&self) -> usize {
        self.input_units
            .iter()
            .map(InputUnit::occupancy)
            .sum::<usize>()
            + self
                .output_units
                .iter()
                .filter(|unit| unit.send().is_some())
                .count()
    }

    /// Computes one cycle of traffic.
    ///
    /// `recv[i]` is the packet offered on ingress `i` and `send_ready[j]`
    /// the downstream ready on egress `j`; missing entries read as idle.
    #[must_use]
    pub fn evaluate(&self, recv: &[Option<Packet>], send_ready: &[bool]) -> RouterEval {
        let num_inports = self.num_inports();
        let num_outports = self.num_outports();

        let heads: Vec<Option<&Packet>> = self.input_units.iter().map(InputUnit::send).collect();
        let decisions: Vec<RouteDecision> = self
            .route_units
            .iter()
            .zip(&heads)
            .map(|(unit, head)| unit.route(*head, self.sender))
            .collect();
        let out_ready: Vec<bool> = self
            .output_units
            .iter()
            .map(OutputUnit::recv_ready)
            .collect();

        let multicast_lead = if self.switch_units.is_empty() {
            None
        } else {
            let multicast: Vec<bool> = decisions
                .iter()
                .map(|decision| decision.request.count() > 1)
                .collect();
            self.multicast.grant(PortMask::from_flags(&multicast))
        };

        let grants: Vec<SwitchGrant> = self
            .switch_units
            .iter()
            .enumerate()
            .map(|(out, switch)| {
                let requests: Vec<bool> = decisions
                    .iter()
                    .enumerate()
                    .map(|(lane, decision)| {
                        decision.request.is_set(out)
                            && (decision.request.count() == 1 || multicast_lead == Some(lane))
                    })
                    .collect();
                switch.evaluate(PortMask::from_flags(&requests), out_ready[out])
            })
            .collect();

        let lane_ready: Vec<PortMask> = if grants.is_empty() {
            vec![PortMask::from_flags(&out_ready); num_inports]
        } else {
            (0..num_inports)
                .map(|lane| {
                    let ready: Vec<bool> =
                        grants.iter().map(|grant| grant.lane_ready(lane)).collect();
                    PortMask::from_flags(&ready)
                })
                .collect()
        };

        let lane_fire: Vec<PortMask> = decisions
            .iter()
            .zip(&lane_ready)
            .map(|(decision, ready)| decision.lane_fire(*ready))
            .collect();
        let retired: Vec<bool> = decisions
            .iter()
            .zip(&lane_ready)
            .map(|(decision, ready)| decision.retires(*ready))
            .collect();

        let switch_fired: Vec<Option<usize>> = grants
            .iter()
            .enumerate()
            .map(|(out, grant)| grant.grant.filter(|lane| lane_fire[*lane].is_set(out)))
            .collect();
        let out_enq: Vec<Option<Packet>> = (0..num_outports)
            .map(|out| {
                let lane = if grants.is_empty() {
                    Some(0).filter(|lane| lane_fire[*lane].is_set(out))
                } else {
                    switch_fired[out]
                };
                lane.and_then(|lane| heads[lane].copied())
            })
            .collect();

        let recv = self
            .input_units
            .iter()
            .enumerate()
            .map(|(port, unit)| {
                StreamItem::new(recv.get(port).copied().flatten(), unit.recv_ready())
            })
            .collect();
        let send = self
            .output_units
            .iter()
            .enumerate()
            .map(|(port, unit)| {
                StreamItem::new(
                    unit.send().copied(),
                    send_ready.get(port).copied().unwrap_or(false),
                )
            })
            .collect();

        RouterEval {
            recv,
            decisions,
            multicast_lead,
            grants,
            retired,
            out_enq,
            switch_fired,
            send,
        }
    }

    /// Latches a cycle computed by [`Router::evaluate`] on this router.
    pub fn commit(&mut self, eval: &RouterEval) {
        for (port, unit) in self.input_units.iter_mut().enumerate() {
            let accepted = eval.accepted(port);
            if let Some(packet) = accepted {
                log::trace!("router {}: in[{port}] <- {packet:?}", self.sender.0);
            }
            unit.commit(accepted, eval.retired.get(port).copied().unwrap_or(false));
        }
        for (unit, decision) in self.route_units.iter_mut().zip(&eval.decisions) {
            unit.commit(decision);
        }
        if let Some(lane) = eval
            .multicast_lead
            .filter(|lane| eval.retired.get(*lane).copied().unwrap_or(false))
        {
            self.multicast.accept(lane);
        }
        for (switch, fired) in self.switch_units.iter_mut().zip(&eval.switch_fired) {
            switch.commit(*fired);
        }
        for (port, unit) in self.output_units.iter_mut().enumerate() {
            let delivered = eval.delivered(port);
            if let Some(packet) = delivered {
                log::trace!("router {}: out[{port}] -> {packet:?}", self.sender.0);
            }
            unit.commit(
                eval.out_enq.get(port).copied().flatten(),
                delivered.is_some(),
            );
        }
    }

    /// Evaluates and commits one cycle.
    pub fn tick(&mut self, recv: &[Option<Packet>], send_ready: &[bool]) -> RouterEval {
        let eval = self.evaluate(recv, send_ready);
        self.commit(&eval);
        eval
    }

    /// Empties every buffer, clears faults and restores arbitration.
    pub fn reset(&mut self) {
        self.input_units.iter_mut().for_each(InputUnit::reset);
        self.route_units.iter_mut().for_each(RouteUnit::reset);
        self.multicast.reset();
        self.switch_units.iter_mut().for_each(SwitchUnit::reset);
        self.output_units.iter_mut().for_each(OutputUnit::reset);
    }
}
