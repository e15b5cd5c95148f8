//! Fixed-width port bit-vectors used for routing decisions and lane state.

use std::fmt;

use crate::ConfigError;

/// Largest port count a [`PortMask`] can describe.
pub const MAX_PORTS: usize = 64;

/// Identity tag of the ingress that presents a packet to routing logic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct SenderId(pub u16);

/// Sender id used by the request/response router.
///
/// The fabric assumes a single request/response router instance, so its
/// routers present a constant id instead of wiring a real one.
pub const FABRIC_SENDER_ID: SenderId = SenderId(0);

/// A bit-vector with one bit per port, bit `i` selecting port `i`.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct PortMask {
    bits: u64,
    width: u8,
}

const fn width_mask(width: u8) -> u64 {
    if width as usize >= MAX_PORTS {
        u64::MAX
    } else {
        (1u64 << width) - 1
    }
}

impl PortMask {
    /// Checks that `width` is a usable port count.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::TooManyPorts`] for widths above [`MAX_PORTS`].
    pub const fn check_width(width: usize) -> Result<(), ConfigError> {
        if width > MAX_PORTS {
            Err(ConfigError::TooManyPorts {
                requested: width,
                max: MAX_PORTS,
            })
        } else {
            Ok(())
        }
    }

    /// All-zero mask of `width` ports. Widths above [`MAX_PORTS`] saturate.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub const fn empty(width: usize) -> Self {
        let width = if width > MAX_PORTS { MAX_PORTS } else { width };
        Self {
            bits: 0,
            width: width as u8,
        }
    }

    /// Mask with every one of `width` ports selected.
    #[must_use]
    pub const fn full(width: usize) -> Self {
        let empty = Self::empty(width);
        Self {
            bits: width_mask(empty.width),
            width: empty.width,
        }
    }

    /// Mask selecting only `port`. An out-of-range port yields an empty mask.
    #[must_use]
    pub const fn one_hot(port: usize, width: usize) -> Self {
        let empty = Self::empty(width);
        if port >= empty.width as usize {
            return empty;
        }
        Self {
            bits: 1u64 << port,
            width: empty.width,
        }
    }

    /// Mask from raw bits; bits at or above `width` are discarded.
    #[must_use]
    pub const fn from_bits(bits: u64, width: usize) -> Self {
        let empty = Self::empty(width);
        Self {
            bits: bits & width_mask(empty.width),
            width: empty.width,
        }
    }

    /// Mask from one flag per port.
    #[must_use]
    pub fn from_flags(flags: &[bool]) -> Self {
        flags
            .iter()
            .enumerate()
            .fold(Self::empty(flags.len()), |mask, (port, flag)| {
                mask.with(port, *flag)
            })
    }

    /// Raw bits.
    #[must_use]
    pub const fn bits(self) -> u64 {
        self.bits
    }

    /// Number of ports described.
    #[must_use]
    pub const fn width(self) -> usize {
        self.width as usize
    }

    /// Returns `true` when `port` is selected.
    #[must_use]
    pub const fn is_set(self, port: usize) -> bool {
        port < self.width as usize && (self.bits >> port) & 1 == 1
    }

    /// Copy of this mask with `port` set to `value`.
    #[must_use]
    pub const fn with(self, port: usize, value: bool) -> Self {
        if port >= self.width as usize {
            return self;
        }
        let bits = if value {
            self.bits | (1u64 << port)
        } else {
            self.bits & !(1u64 << port)
        };
        Self {
            bits,
            width: self.width,
        }
    }

    /// Returns `true` when no port is selected.
    #[must_use]
    pub const fn is_empty(self) -> bool {
        self.bits == 0
    }

    /// Returns `true` when exactly one port is selected.
    #[must_use]
    pub const fn is_one_hot(self) -> bool {
        self.bits.count_ones() == 1
    }

    /// Number of selected ports.
    #[must_use]
    pub const fn count(self) -> u32 {
        self.bits.count_ones()
    }

    /// Ports selected in both masks.
    #[must_use]
    pub const fn and(self, other: Self) -> Self {
        Self {
            bits: self.bits & other.bits,
            width: self.width,
        }
    }

    /// Ports not selected, within this mask's width.
    #[must_use]
    pub const fn complement(self) -> Self {
        Self {
            bits: !self.bits & width_mask(self.width),
            width: self.width,
        }
    }

    /// Iterates over selected ports in ascending order.
    pub fn iter(self) -> impl Iterator<Item = usize> {
        (0..self.width()).filter(move |port| self.is_set(*port))
    }
}

impl fmt::Debug for PortMask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PortMask({self})")
    }
}

impl fmt::Display for PortMask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0b")?;
        if self.width == 0 {
            return write!(f, "0");
        }
        for port in (0..self.width()).rev() {
            write!(f, "{}", u8::from(self.is_set(port)))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::{PortMask, MAX_PORTS};

    #[test]
    fn one_hot_selects_exactly_one_port() {
        let mask = PortMask::one_hot(2, 4);
        assert!(mask.is_one_hot());
        assert!(mask.is_set(2));
        assert!(!mask.is_set(0));
        assert_eq!(mask.iter().collect::<Vec<_>>(), vec![2]);
    }

    #[test]
    fn out_of_range_one_hot_is_empty() {
        assert!(PortMask::one_hot(4, 4).is_empty());
    }

    #[test]
    fn from_bits_discards_bits_above_width() {
        let mask = PortMask::from_bits(0b1_0110, 4);
        assert_eq!(mask.bits(), 0b0110);
        assert_eq!(mask.count(), 2);
    }

    #[test]
    fn complement_stays_within_width() {
        let mask = PortMask::from_bits(0b0101, 4).complement();
        assert_eq!(mask.bits(), 0b1010);
        assert_eq!(PortMask::full(MAX_PORTS).complement().bits(), 0);
    }

    #[test]
    fn from_flags_matches_display_order() {
        let mask = PortMask::from_flags(&[true, false, true]);
        assert_eq!(mask.to_string(), "0b101");
        assert_eq!(mask.width(), 3);
    }

    #[test]
    fn check_width_rejects_wide_routers() {
        assert!(PortMask::check_width(MAX_PORTS).is_ok());
        assert!(PortMask::check_width(MAX_PORTS + 1).is_err());
    }
}
