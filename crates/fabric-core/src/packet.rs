//! Configuration packets and their packed bit layout.

use crate::ConfigError;

/// Request/response kind carried in the packet type field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
#[repr(u8)]
pub enum CfgKind {
    /// Register write (`0`).
    #[default]
    Write = 0,
    /// Register read (`1`).
    Read = 1,
}

impl CfgKind {
    /// Returns the encoded type-field value.
    #[must_use]
    pub const fn as_u8(self) -> u8 {
        self as u8
    }

    /// Decodes a type-field value.
    #[must_use]
    pub const fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::Write),
            1 => Some(Self::Read),
            _ => None,
        }
    }
}

/// A register access request or its response.
///
/// Responses reuse the request layout: the terminal echoes `kind` and `addr`
/// and fills in `data`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct Packet {
    /// Access kind.
    pub kind: CfgKind,
    /// Flat address; routing and register decode each read their own bits.
    pub addr: u32,
    /// Write data, or read data on a response.
    pub data: u32,
}

impl Packet {
    /// Creates a packet.
    #[must_use]
    pub const fn new(kind: CfgKind, addr: u32, data: u32) -> Self {
        Self { kind, addr, data }
    }

    /// Creates a write request.
    #[must_use]
    pub const fn write(addr: u32, data: u32) -> Self {
        Self::new(CfgKind::Write, addr, data)
    }

    /// Creates a read request.
    #[must_use]
    pub const fn read(addr: u32) -> Self {
        Self::new(CfgKind::Read, addr, 0)
    }

    /// Returns `true` for write packets.
    #[must_use]
    pub const fn is_write(&self) -> bool {
        matches!(self.kind, CfgKind::Write)
    }
}

/// Default width of the packet type field.
pub const DEFAULT_KIND_BITS: u32 = 2;
/// Default width of the packet address field.
pub const DEFAULT_ADDR_BITS: u32 = 16;
/// Default width of the packet data field.
pub const DEFAULT_DATA_BITS: u32 = 32;

/// Field widths of the packed packet, most significant field first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct PacketFormat {
    /// Width of the kind field.
    pub kind_bits: u32,
    /// Width of the address field.
    pub addr_bits: u32,
    /// Width of the data field.
    pub data_bits: u32,
}

impl Default for PacketFormat {
    fn default() -> Self {
        Self {
            kind_bits: DEFAULT_KIND_BITS,
            addr_bits: DEFAULT_ADDR_BITS,
            data_bits: DEFAULT_DATA_BITS,
        }
    }
}

const fn field_mask(bits: u32) -> u64 {
    if bits >= 64 {
        u64::MAX
    } else {
        (1u64 << bits) - 1
    }
}

impl PacketFormat {
    /// Checks that every field is non-empty and the packed word fits in 64 bits.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidPacketFormat`] otherwise.
    pub const fn validate(&self) -> Result<(), ConfigError> {
        let ok = self.kind_bits >= 1
            && self.kind_bits <= 8
            && self.addr_bits >= 1
            && self.addr_bits <= 32
            && self.data_bits >= 1
            && self.data_bits <= 32
            && self.total_bits() <= 64;
        if ok {
            Ok(())
        } else {
            Err(ConfigError::InvalidPacketFormat {
                kind_bits: self.kind_bits,
                addr_bits: self.addr_bits,
                data_bits: self.data_bits,
            })
        }
    }

    /// Total packed width in bits.
    #[must_use]
    pub const fn total_bits(&self) -> u32 {
        self.kind_bits + self.addr_bits + self.data_bits
    }

    /// Returns `true` when every field of `packet` fits its declared width.
    #[must_use]
    pub const fn fits(&self, packet: &Packet) -> bool {
        (packet.kind.as_u8() as u64) <= field_mask(self.kind_bits)
            && (packet.addr as u64) <= field_mask(self.addr_bits)
            && (packet.data as u64) <= field_mask(self.data_bits)
    }

    /// Copy of `packet` with the address and data cut to their field widths,
    /// as the packed wire carries them.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub const fn clip(&self, packet: &Packet) -> Packet {
        Packet {
            kind: packet.kind,
            addr: (packet.addr as u64 & field_mask(self.addr_bits)) as u32,
            data: (packet.data as u64 & field_mask(self.data_bits)) as u32,
        }
    }

    /// Packs `packet` into `kind | addr | data`, truncating oversized fields.
    #[must_use]
    pub const fn pack(&self, packet: &Packet) -> u64 {
        let kind = packet.kind.as_u8() as u64 & field_mask(self.kind_bits);
        let addr = packet.addr as u64 & field_mask(self.addr_bits);
        let data = packet.data as u64 & field_mask(self.data_bits);
        (kind << (self.addr_bits + self.data_bits)) | (addr << self.data_bits) | data
    }

    /// XOR-reduction over the packed bits of `packet`.
    #[must_use]
    pub const fn parity(&self, packet: &Packet) -> bool {
        self.pack(packet).count_ones() % 2 == 1
    }
}

/// Message on the external push/pull interface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct PushPullMsg {
    /// Payload is meaningful.
    pub valid: bool,
    /// Advisory backpressure from the sender of this message.
    pub stall: bool,
    /// Carried packet.
    pub payload: Packet,
}

impl PushPullMsg {
    /// A valid, non-stalling message carrying `payload`.
    #[must_use]
    pub const fn valid(payload: Packet) -> Self {
        Self {
            valid: true,
            stall: false,
            payload,
        }
    }

    /// An empty message that only carries the stall bit.
    #[must_use]
    pub const fn stall_only(stall: bool) -> Self {
        Self {
            valid: false,
            stall,
            payload: Packet::write(0, 0),
        }
    }
}
