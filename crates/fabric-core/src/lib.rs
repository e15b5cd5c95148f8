//! Cycle-level model of a configuration-access fabric.
//!
//! Every clocked component follows the same two-phase contract: port getters
//! read only registered state, `evaluate` computes a cycle without side
//! effects, and `commit` latches it.

/// Construction and runtime routing error types.
pub mod error;
pub use error::{ConfigError, RouteFault};

/// Packet model, packed layout and the push/pull message.
pub mod packet;
pub use packet::{
    CfgKind, Packet, PacketFormat, PushPullMsg, DEFAULT_ADDR_BITS, DEFAULT_DATA_BITS,
    DEFAULT_KIND_BITS,
};

/// Port bit-vectors and sender identities.
pub mod mask;
pub use mask::{PortMask, SenderId, FABRIC_SENDER_ID, MAX_PORTS};

/// Bounded FIFO with valid/ready handshakes.
pub mod queue;
pub use queue::{Queue, StreamItem};

/// Pluggable routing decisions.
pub mod routing;
pub use routing::{AddressRangeRouting, FixedRouting, RoutingLogic};

/// Pluggable switch arbitration.
pub mod arbiter;
pub use arbiter::{Arbiter, RoundRobinArbiter};

/// Router microarchitecture and the request/response fabric.
pub mod router;
pub use router::{
    InputUnit, OutputUnit, ReqRespEval, ReqRespInputs, ReqRespRouter, RouteDecision, RouteUnit,
    Router, RouterEval, SwitchGrant, SwitchUnit,
};

/// Register-file terminal.
pub mod terminal;
pub use terminal::{ConfigTerminal, TerminalEval, TerminalInputs};

/// Push/pull to streaming adapter.
pub mod adapter;
pub use adapter::{AdapterEval, AdapterInputs, PushIn, PushPullAdapter, DEFAULT_ADAPTER_ENTRIES};

/// Loopback bypass stage.
pub mod loopback;
pub use loopback::{Loopback, LoopbackEval, LoopbackInputs};

/// Host-facing configuration, I/O, tracing and counters.
pub mod api;
pub use api::{
    FabricConfig, FabricInputs, FabricOutputs, FabricStats, TraceEvent, TraceSink,
    DEFAULT_BOUNDARIES, DEFAULT_CONFIG_REGS, DEFAULT_STATUS_REGS,
};

/// Top-level fabric wiring.
pub mod fabric;
pub use fabric::{ConfigFabric, FabricEval};

#[cfg(test)]
use proptest as _;
#[cfg(test)]
use rstest as _;
