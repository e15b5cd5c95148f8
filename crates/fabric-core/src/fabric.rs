//! Top-level fabric: adapter, loopback, request/response router, terminals.

use crate::{
    AdapterEval, AdapterInputs, AddressRangeRouting, ConfigError, ConfigTerminal, FabricConfig,
    FabricInputs, FabricOutputs, FabricStats, Loopback, LoopbackEval, LoopbackInputs, Packet,
    PushPullAdapter, ReqRespEval, ReqRespInputs, ReqRespRouter, TerminalEval, TerminalInputs,
    TraceEvent, TraceSink,
};

/// Everything the fabric computed for one cycle, before commit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FabricEval {
    /// Loopback wiring.
    pub loopback: LoopbackEval,
    /// Adapter activity.
    pub adapter: AdapterEval,
    /// Router activity in both directions.
    pub router: ReqRespEval,
    /// Per-terminal activity.
    pub terminals: Vec<TerminalEval>,
}

impl FabricEval {
    /// External outputs produced by this cycle.
    #[must_use]
    pub const fn outputs(&self) -> FabricOutputs {
        FabricOutputs {
            pull: self.adapter.pull,
            parity: self.adapter.parity,
        }
    }
}

/// Complete configuration-access fabric.
///
/// Requests pushed into the adapter pass the loopback stage, are steered by
/// address to one terminal, and the terminal's response travels back to the
/// adapter where it waits to be pulled.
#[derive(Debug, Clone)]
pub struct ConfigFabric {
    config: FabricConfig,
    adapter: PushPullAdapter,
    loopback: Loopback,
    router: ReqRespRouter<AddressRangeRouting>,
    terminals: Vec<ConfigTerminal>,
    status: Vec<Vec<u32>>,
    stats: FabricStats,
}

impl ConfigFabric {
    /// Builds a fabric from `config`.
    ///
    /// # Errors
    ///
    /// Returns the [`ConfigError`] reported by [`FabricConfig::validate`] or
    /// by any component constructor.
    pub fn new(config: FabricConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let num_terminals = config.num_terminals();
        let router = ReqRespRouter::new(num_terminals, config.routing()?)?;
        let adapter = PushPullAdapter::new(config.adapter_entries, config.format)?;
        let terminals = (0..num_terminals)
            .map(|_| ConfigTerminal::new(config.config_regs, config.status_regs))
            .collect::<Result<Vec<_>, _>>()?;
        log::debug!(
            "config fabric: {num_terminals} terminals at {:x?}",
            config.boundaries
        );
        Ok(Self {
            status: vec![vec![0; config.status_regs]; num_terminals],
            config,
            adapter,
            loopback: Loopback::new(),
            router,
            terminals,
            stats: FabricStats::default(),
        })
    }

    /// Topology the fabric was built from.
    #[must_use]
    pub const fn config(&self) -> &FabricConfig {
        &self.config
    }

    /// Activity counters.
    #[must_use]
    pub const fn stats(&self) -> FabricStats {
        self.stats
    }

    /// Push/pull adapter.
    #[must_use]
    pub const fn adapter(&self) -> &PushPullAdapter {
        &self.adapter
    }

    /// Request/response router, including latched route faults.
    #[must_use]
    pub const fn router(&self) -> &ReqRespRouter<AddressRangeRouting> {
        &self.router
    }

    /// Terminal `index`.
    #[must_use]
    pub fn terminal(&self, index: usize) -> Option<&ConfigTerminal> {
        self.terminals.get(index)
    }

    /// All terminals in address order.
    #[must_use]
    pub fn terminals(&self) -> &[ConfigTerminal] {
        &self.terminals
    }

    /// Registered loopback enable.
    #[must_use]
    pub const fn loopback_enabled(&self) -> bool {
        self.loopback.is_enabled()
    }

    /// Drives status input `index` of `terminal`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::TerminalOutOfRange`] when either index does
    /// not exist.
    pub fn set_status(
        &mut self,
        terminal: usize,
        index: usize,
        value: u32,
    ) -> Result<(), ConfigError> {
        let slot = self
            .status
            .get_mut(terminal)
            .and_then(|inputs| inputs.get_mut(index))
            .ok_or(ConfigError::TerminalOutOfRange { terminal, index })?;
        *slot = value;
        Ok(())
    }

    /// Present status inputs of `terminal`.
    #[must_use]
    pub fn status(&self, terminal: usize) -> Option<&[u32]> {
        self.status.get(terminal).map(Vec::as_slice)
    }

    /// Packets held anywhere between the push and pull interfaces.
    #[must_use]
    pub fn in_flight(&self) -> usize {
        self.adapter.pending_requests()
            + self.adapter.pending_responses()
            + self.router.req_router().occupancy()
            + self.router.resp_router().occupancy()
            + self
                .terminals
                .iter()
                .map(ConfigTerminal::occupancy)
                .sum::<usize>()
    }

    /// Computes one cycle without changing any state.
    #[must_use]
    pub fn evaluate(&self, inputs: &FabricInputs) -> FabricEval {
        let loopback = self.loopback.evaluate(&LoopbackInputs {
            enable: inputs.loopback_en,
            minion_req: self.adapter.req().copied(),
            minion_resp_ready: self.adapter.resp_ready(),
            master_req_ready: self.router.minion_req_ready(),
            master_resp: self.router.minion_resp().copied(),
        });

        let adapter = self.adapter.evaluate(&AdapterInputs {
            push: inputs.push,
            pull_en: inputs.pull_en,
            req_ready: loopback.minion_req_ready,
            resp: loopback.minion_resp,
        });

        let master_req_ready: Vec<bool> = self
            .terminals
            .iter()
            .map(ConfigTerminal::req_ready)
            .collect();
        let master_resp: Vec<Option<Packet>> = self
            .terminals
            .iter()
            .map(|terminal| terminal.resp().copied())
            .collect();
        let router = self.router.evaluate(&ReqRespInputs {
            minion_req: loopback.master_req,
            minion_resp_ready: loopback.master_resp_ready,
            master_req_ready: &master_req_ready,
            master_resp: &master_resp,
        });

        let terminals = self
            .terminals
            .iter()
            .zip(&self.status)
            .enumerate()
            .map(|(index, (terminal, status))| {
                terminal.evaluate(&TerminalInputs {
                    req: self.router.master_req(index).copied(),
                    resp_ready: self.router.master_resp_ready(index),
                    status,
                })
            })
            .collect();

        FabricEval {
            loopback,
            adapter,
            router,
            terminals,
        }
    }

    /// Latches a cycle computed by [`ConfigFabric::evaluate`].
    pub fn commit(&mut self, eval: &FabricEval) {
        self.loopback.commit(&eval.loopback);
        self.adapter.commit(&eval.adapter);
        self.router.commit(&eval.router);
        for (terminal, terminal_eval) in self.terminals.iter_mut().zip(&eval.terminals) {
            terminal.commit(terminal_eval);
        }

        let stats = &mut self.stats;
        stats.cycles = stats.cycles.saturating_add(1);
        if eval.adapter.push_accepted.is_some() {
            stats.requests_accepted = stats.requests_accepted.saturating_add(1);
        }
        if eval.adapter.push_dropped.is_some() {
            stats.pushes_dropped = stats.pushes_dropped.saturating_add(1);
        }
        if eval.adapter.pull.valid {
            stats.responses_delivered = stats.responses_delivered.saturating_add(1);
        }
        let writes = eval
            .terminals
            .iter()
            .filter(|terminal| terminal.write.is_some())
            .count();
        stats.register_writes = stats
            .register_writes
            .saturating_add(u64::try_from(writes).unwrap_or(u64::MAX));
    }

    /// Runs one clock cycle.
    pub fn step(&mut self, inputs: &FabricInputs) -> FabricOutputs {
        let eval = self.evaluate(inputs);
        self.commit(&eval);
        eval.outputs()
    }

    /// Runs one clock cycle, reporting its events to `sink` first.
    pub fn step_traced(
        &mut self,
        inputs: &FabricInputs,
        sink: &mut dyn TraceSink,
    ) -> FabricOutputs {
        let eval = self.evaluate(inputs);
        self.emit_trace(&eval, sink);
        self.commit(&eval);
        eval.outputs()
    }

    fn emit_trace(&self, eval: &FabricEval, sink: &mut dyn TraceSink) {
        let cycle = self.stats.cycles;
        let adapter = &eval.adapter;

        if let Some(packet) = adapter.push_accepted {
            sink.on_event(TraceEvent::PushAccepted { cycle, packet });
        }
        if let Some(packet) = adapter.push_dropped {
            sink.on_event(TraceEvent::PushDropped { cycle, packet });
        }
        for (terminal, terminal_eval) in eval.terminals.iter().enumerate() {
            if let Some(packet) = terminal_eval.req.transfer() {
                sink.on_event(TraceEvent::RequestDelivered {
                    cycle,
                    terminal,
                    packet,
                });
            }
            if let Some((index, value)) = terminal_eval.write {
                sink.on_event(TraceEvent::RegisterWrite {
                    cycle,
                    terminal,
                    index,
                    value,
                });
            }
        }
        if let Some(packet) = adapter.resp.transfer() {
            sink.on_event(TraceEvent::ResponseReturned {
                cycle,
                packet,
                looped: self.loopback.is_enabled(),
            });
        }
        if adapter.pull.valid {
            sink.on_event(TraceEvent::ResponsePulled {
                cycle,
                packet: adapter.pull.payload,
            });
        }
        if adapter.resp_stall_next != self.adapter.resp_stalled() {
            sink.on_event(TraceEvent::StallLatch {
                cycle,
                armed: adapter.resp_stall_next,
            });
        }
        for (port, decision) in eval.router.req.decisions.iter().enumerate() {
            if let (None, Some(fault)) = (self.router.req_router().fault(port), decision.fault) {
                sink.on_event(TraceEvent::RouteFaulted { cycle, port, fault });
            }
        }
    }

    /// Synchronous reset of every register, queue and counter. Status
    /// inputs are external and keep their values.
    pub fn reset(&mut self) {
        self.adapter.reset();
        self.loopback.reset();
        self.router.reset();
        self.terminals.iter_mut().for_each(ConfigTerminal::reset);
        self.stats = FabricStats::default();
    }
}

#[cfg(test)]
mod tests {
    use super::ConfigFabric;
    use crate::{ConfigError, FabricConfig, FabricInputs, Packet, TraceEvent};

    fn fabric() -> ConfigFabric {
        ConfigFabric::new(FabricConfig::default()).expect("default config is valid")
    }

    /// Pushes `packet` and pulls until its response appears.
    fn transact(fabric: &mut ConfigFabric, packet: Packet) -> Packet {
        let mut pushed = false;
        let mut stalled = false;
        for _ in 0..64 {
            let inputs = if pushed || stalled {
                FabricInputs::pull()
            } else {
                FabricInputs::push(packet)
            };
            let outputs = fabric.step(&inputs);
            pushed |= inputs.push.msg.valid;
            stalled = outputs.pull.stall;
            if outputs.pull.valid {
                return outputs.pull.payload;
            }
        }
        panic!("no response for {packet:?}");
    }

    #[test]
    fn invalid_config_is_rejected() {
        let config = FabricConfig {
            boundaries: vec![0x10, 0x10],
            ..FabricConfig::default()
        };
        assert!(matches!(
            ConfigFabric::new(config),
            Err(ConfigError::UnsortedBoundaries { .. })
        ));
    }

    #[test]
    fn write_lands_in_the_addressed_terminal() {
        let mut fabric = fabric();
        let ack = transact(&mut fabric, Packet::write(0x2001, 0xbadb_ed00));
        assert_eq!(ack, Packet::write(0x2001, 0));
        assert_eq!(fabric.terminal(2).map(|t| t.config_regs()[1]), Some(0xbadb_ed00));
        assert_eq!(fabric.terminal(0).map(|t| t.config_regs()[1]), Some(0));
        assert_eq!(fabric.stats().register_writes, 1);
        assert_eq!(fabric.in_flight(), 0);
    }

    #[test]
    fn address_bits_above_the_format_do_not_reach_routing() {
        let mut fabric = fabric();
        let ack = transact(&mut fabric, Packet::write(0x1_0001, 7));
        assert_eq!(ack, Packet::write(0x0001, 0));
        assert_eq!(fabric.terminal(0).map(|t| t.config_regs()[1]), Some(7));
        assert!(fabric.terminals()[1..]
            .iter()
            .all(|terminal| terminal.config_regs() == [0, 0]));
    }

    #[test]
    fn status_inputs_are_visible_to_reads() {
        let mut fabric = fabric();
        fabric.set_status(1, 0, 0x5a5a).expect("status exists");
        let resp = transact(&mut fabric, Packet::read(0x1002));
        assert_eq!(resp.data, 0x5a5a);
        assert_eq!(
            fabric.set_status(4, 0, 1),
            Err(ConfigError::TerminalOutOfRange {
                terminal: 4,
                index: 0,
            })
        );
    }

    #[test]
    fn loopback_echoes_requests_without_touching_terminals() {
        let mut fabric = fabric();
        fabric.step(&FabricInputs {
            loopback_en: true,
            ..FabricInputs::default()
        });
        assert!(fabric.loopback_enabled());

        let request = Packet::write(0x0001, 0x1234);
        let mut events = Vec::new();
        let mut inputs = FabricInputs {
            loopback_en: true,
            ..FabricInputs::push(request)
        };
        let mut echoed = None;
        for _ in 0..8 {
            let outputs = fabric.step_traced(&inputs, &mut events);
            inputs.push = FabricInputs::pull().push;
            if outputs.pull.valid {
                echoed = Some(outputs.pull.payload);
                break;
            }
        }
        assert_eq!(echoed, Some(request));
        assert_eq!(fabric.terminal(0).map(|t| t.config_regs()[1]), Some(0));
        assert!(events
            .iter()
            .any(|event| matches!(event, TraceEvent::ResponseReturned { looped: true, .. })));
    }

    #[test]
    fn reset_returns_to_power_on_state() {
        let mut fabric = fabric();
        transact(&mut fabric, Packet::write(0x0000, 9));
        fabric.reset();
        assert_eq!(fabric.terminal(0).map(|t| t.config_regs()[0]), Some(0));
        assert_eq!(fabric.stats().cycles, 0);
        assert!(!fabric.adapter().resp_stalled());
    }
}
