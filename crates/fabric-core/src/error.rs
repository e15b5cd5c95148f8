use thiserror::Error;

/// Topology and parameter errors rejected when a component is built.
///
/// None of these can occur once a fabric is running; construction is the only
/// place a misconfiguration is reported.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Error)]
pub enum ConfigError {
    /// A queue was requested with room for no entries.
    #[error("queue capacity must be at least one entry")]
    ZeroCapacity,
    /// A router was requested with no ingress or no egress ports.
    #[error("router needs at least one input and one output port (got {inports}x{outports})")]
    ZeroPorts {
        /// Requested ingress port count.
        inports: usize,
        /// Requested egress port count.
        outports: usize,
    },
    /// A port count exceeds what a decision vector can address.
    #[error("port count {requested} exceeds the supported maximum of {max}")]
    TooManyPorts {
        /// Requested port count.
        requested: usize,
        /// Largest supported port count.
        max: usize,
    },
    /// Routing logic is sized for a different number of egress ports.
    #[error("routing logic produces {logic}-bit decisions but the router has {router} outputs")]
    DecisionWidthMismatch {
        /// Width the routing logic was built for.
        logic: usize,
        /// Number of router egress ports.
        router: usize,
    },
    /// A terminal was requested with neither config nor status registers.
    #[error("config terminal needs at least one register")]
    NoRegisters,
    /// Address boundaries must be strictly ascending.
    #[error("address boundary {value:#x} at position {index} is not above its predecessor")]
    UnsortedBoundaries {
        /// Position of the offending boundary.
        index: usize,
        /// Offending boundary value.
        value: u32,
    },
    /// Packet field widths are zero, too wide, or do not fit in 64 bits.
    #[error("invalid packet format {kind_bits}/{addr_bits}/{data_bits}")]
    InvalidPacketFormat {
        /// Width of the kind field.
        kind_bits: u32,
        /// Width of the address field.
        addr_bits: u32,
        /// Width of the data field.
        data_bits: u32,
    },
    /// A terminal or status index names something the fabric does not have.
    #[error("terminal {terminal} status input {index} is out of range")]
    TerminalOutOfRange {
        /// Terminal index that was addressed.
        terminal: usize,
        /// Status input index that was addressed.
        index: usize,
    },
}

/// Runtime routing faults latched by a route unit.
///
/// A faulted route unit never retires its packet; the fault shows up as
/// sustained backpressure on its ingress.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Error)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum RouteFault {
    /// Routing logic selected no egress port for a live packet.
    #[error("routing logic selected no output for address {addr:#x}")]
    EmptyDecision {
        /// Address of the packet that could not be routed.
        addr: u32,
    },
    /// Routing logic returned a decision vector of the wrong width.
    #[error("routing decision is {got} bits wide, expected {expected}")]
    DecisionWidth {
        /// Width the route unit expects.
        expected: usize,
        /// Width that was produced.
        got: usize,
    },
}

impl RouteFault {
    /// Stable numeric code for diagnostics counters and traces.
    #[must_use]
    pub const fn code(self) -> u8 {
        match self {
            Self::EmptyDecision { .. } => 0x01,
            Self::DecisionWidth { .. } => 0x02,
        }
    }
}
