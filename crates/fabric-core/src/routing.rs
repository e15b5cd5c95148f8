//! Routing logic: the per-packet egress decision plugged into route units.

use std::fmt;

use crate::{ConfigError, Packet, PortMask, SenderId};

/// Chooses the egress ports for a packet.
///
/// A decision is a pure function of the packet and the ingress identity. A
/// one-hot result is unicast; setting several bits multicasts the packet to
/// every selected port atomically.
pub trait RoutingLogic: fmt::Debug {
    /// Number of egress ports the decisions are sized for.
    fn num_outports(&self) -> usize;

    /// Returns the decision vector for `packet` arriving from `sender`.
    fn route(&self, packet: &Packet, sender: SenderId) -> PortMask;
}

/// Sends every packet to port 0 regardless of contents.
///
/// Used to collapse responses onto the single return path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedRouting {
    num_outports: usize,
}

impl FixedRouting {
    /// Creates fixed routing for a router with `num_outports` outputs.
    #[must_use]
    pub const fn new(num_outports: usize) -> Self {
        Self { num_outports }
    }
}

impl RoutingLogic for FixedRouting {
    fn num_outports(&self) -> usize {
        self.num_outports
    }

    fn route(&self, _packet: &Packet, _sender: SenderId) -> PortMask {
        PortMask::one_hot(0, self.num_outports)
    }
}

/// Splits the address space at ascending boundaries.
///
/// Port `i` receives addresses below `boundaries[i]` (and at or above the
/// previous boundary); the last port receives everything above the final
/// boundary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddressRangeRouting {
    boundaries: Vec<u32>,
}

impl AddressRangeRouting {
    /// Creates range routing with `boundaries.len() + 1` ports.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::UnsortedBoundaries`] when the boundaries are
    /// not strictly ascending, or [`ConfigError::TooManyPorts`] when they
    /// describe more ports than a decision vector holds.
    pub fn new(boundaries: Vec<u32>) -> Result<Self, ConfigError> {
        PortMask::check_width(boundaries.len() + 1)?;
        if let Some((index, pair)) = boundaries
            .windows(2)
            .enumerate()
            .find(|(_, pair)| pair[1] <= pair[0])
        {
            return Err(ConfigError::UnsortedBoundaries {
                index: index + 1,
                value: pair[1],
            });
        }
        Ok(Self { boundaries })
    }

    /// Boundary addresses in ascending order.
    #[must_use]
    pub fn boundaries(&self) -> &[u32] {
        &self.boundaries
    }

    /// Port index that owns `addr`.
    #[must_use]
    pub fn port_for(&self, addr: u32) -> usize {
        self.boundaries.partition_point(|boundary| *boundary <= addr)
    }
}

impl RoutingLogic for AddressRangeRouting {
    fn num_outports(&self) -> usize {
        self.boundaries.len() + 1
    }

    fn route(&self, packet: &Packet, _sender: SenderId) -> PortMask {
        PortMask::one_hot(self.port_for(packet.addr), self.num_outports())
    }
}
