//! Host-facing configuration, per-cycle I/O, tracing and counters.

use crate::{
    AddressRangeRouting, ConfigError, Packet, PacketFormat, PortMask, PushIn, PushPullMsg,
    RouteFault, DEFAULT_ADAPTER_ENTRIES,
};

/// Default terminal address boundaries: four terminals of 4 KiB each.
pub const DEFAULT_BOUNDARIES: [u32; 3] = [0x1000, 0x2000, 0x3000];

/// Default number of config registers per terminal.
pub const DEFAULT_CONFIG_REGS: usize = 2;

/// Default number of status registers per terminal.
pub const DEFAULT_STATUS_REGS: usize = 2;

/// Static topology of a [`crate::ConfigFabric`].
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct FabricConfig {
    /// Packet field widths, used for parity.
    pub format: PacketFormat,
    /// Ascending address boundaries; one more terminal than boundaries.
    pub boundaries: Vec<u32>,
    /// Writable registers per terminal.
    pub config_regs: usize,
    /// Status registers per terminal.
    pub status_regs: usize,
    /// Depth of the adapter request and response queues.
    pub adapter_entries: usize,
}

impl Default for FabricConfig {
    fn default() -> Self {
        Self {
            format: PacketFormat::default(),
            boundaries: DEFAULT_BOUNDARIES.to_vec(),
            config_regs: DEFAULT_CONFIG_REGS,
            status_regs: DEFAULT_STATUS_REGS,
            adapter_entries: DEFAULT_ADAPTER_ENTRIES,
        }
    }
}

impl FabricConfig {
    /// Number of terminals addressed by the boundaries.
    #[must_use]
    pub fn num_terminals(&self) -> usize {
        self.boundaries.len() + 1
    }

    /// Terminal that owns `addr`.
    #[must_use]
    pub fn terminal_for(&self, addr: u32) -> usize {
        self.boundaries.partition_point(|boundary| *boundary <= addr)
    }

    /// Builds the request routing logic for this topology.
    ///
    /// # Errors
    ///
    /// See [`AddressRangeRouting::new`].
    pub fn routing(&self) -> Result<AddressRangeRouting, ConfigError> {
        AddressRangeRouting::new(self.boundaries.clone())
    }

    /// Checks every parameter without building anything.
    ///
    /// # Errors
    ///
    /// Returns the first [`ConfigError`] the fabric constructor would hit.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.format.validate()?;
        if self.adapter_entries == 0 {
            return Err(ConfigError::ZeroCapacity);
        }
        if self.config_regs + self.status_regs == 0 {
            return Err(ConfigError::NoRegisters);
        }
        PortMask::check_width(self.num_terminals())?;
        self.routing().map(|_| ())
    }
}

/// External inputs for one fabric cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct FabricInputs {
    /// Push side of the external interface.
    pub push: PushIn,
    /// Pull enable.
    pub pull_en: bool,
    /// Loopback enable, effective from the next cycle.
    pub loopback_en: bool,
}

impl FabricInputs {
    /// Pulls without pushing.
    #[must_use]
    pub const fn pull() -> Self {
        Self {
            push: PushIn::stall(false),
            pull_en: true,
            loopback_en: false,
        }
    }

    /// Pushes `packet` and pulls in the same cycle.
    #[must_use]
    pub const fn push(packet: Packet) -> Self {
        Self {
            push: PushIn::packet(packet),
            pull_en: true,
            loopback_en: false,
        }
    }
}

/// External outputs of one fabric cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct FabricOutputs {
    /// Pull-side message: a revealed response and the request stall.
    pub pull: PushPullMsg,
    /// Parity of the request leaving the adapter.
    pub parity: bool,
}

/// Cycle-stamped events emitted by [`crate::ConfigFabric::step_traced`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum TraceEvent {
    /// A pushed request entered the adapter.
    PushAccepted {
        /// Cycle number.
        cycle: u64,
        /// Pushed packet.
        packet: Packet,
    },
    /// A pushed request found the adapter full and was lost.
    PushDropped {
        /// Cycle number.
        cycle: u64,
        /// Lost packet.
        packet: Packet,
    },
    /// A request was handed to a terminal.
    RequestDelivered {
        /// Cycle number.
        cycle: u64,
        /// Receiving terminal.
        terminal: usize,
        /// Delivered request.
        packet: Packet,
    },
    /// A terminal updated a config register.
    RegisterWrite {
        /// Cycle number.
        cycle: u64,
        /// Writing terminal.
        terminal: usize,
        /// Register index.
        index: usize,
        /// New register value.
        value: u32,
    },
    /// A response reached the adapter, from the router or the loopback.
    ResponseReturned {
        /// Cycle number.
        cycle: u64,
        /// Returned response.
        packet: Packet,
        /// `true` when the loopback produced it.
        looped: bool,
    },
    /// A response was revealed on the pull interface.
    ResponsePulled {
        /// Cycle number.
        cycle: u64,
        /// Revealed response.
        packet: Packet,
    },
    /// The adapter stall latch changed state.
    StallLatch {
        /// Cycle number.
        cycle: u64,
        /// New latch value.
        armed: bool,
    },
    /// A route unit latched a fault.
    RouteFaulted {
        /// Cycle number.
        cycle: u64,
        /// Request-router ingress port of the faulting route unit.
        port: usize,
        /// Fault reason.
        fault: RouteFault,
    },
}

/// Sink trait for fabric trace events.
pub trait TraceSink {
    /// Records an event in cycle order.
    fn on_event(&mut self, event: TraceEvent);
}

impl TraceSink for Vec<TraceEvent> {
    fn on_event(&mut self, event: TraceEvent) {
        self.push(event);
    }
}

/// Saturating activity counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct FabricStats {
    /// Cycles stepped since construction or reset.
    pub cycles: u64,
    /// Pushed requests accepted by the adapter.
    pub requests_accepted: u64,
    /// Responses revealed on the pull interface.
    pub responses_delivered: u64,
    /// Pushed requests lost to a full adapter.
    pub pushes_dropped: u64,
    /// Config register writes across all terminals.
    pub register_writes: u64,
}

impl FabricStats {
    /// Requests accepted but not yet answered on the pull side.
    #[must_use]
    pub const fn outstanding(&self) -> u64 {
        self.requests_accepted.saturating_sub(self.responses_delivered)
    }
}
