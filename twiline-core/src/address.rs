//! Slave address framing

use crate::error::Error;

/// Highest 7-bit address
pub const MAX_ADDRESS: u8 = 0x7F;

/// Transfer direction, sent as bit 0 of the address frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Direction {
    /// Master transmits (R/W = 0)
    Write,
    /// Master receives (R/W = 1)
    Read,
}

/// 7-bit slave address
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SlaveAddress(u8);

impl SlaveAddress {
    /// Validate a 7-bit address
    pub fn new(address: u8) -> Result<Self, Error> {
        if address > MAX_ADDRESS {
            return Err(Error::InvalidAddress);
        }
        Ok(Self(address))
    }

    /// The bare address
    pub fn get(self) -> u8 {
        self.0
    }

    /// First byte after a Start: address in bits 7..1, direction in bit 0
    pub fn frame(self, direction: Direction) -> u8 {
        let rw = match direction {
            Direction::Write => 0,
            Direction::Read => 1,
        };
        (self.0 << 1) | rw
    }
}

impl TryFrom<u8> for SlaveAddress {
    type Error = Error;

    fn try_from(address: u8) -> Result<Self, Error> {
        Self::new(address)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_sets_direction_bit() {
        let addr = SlaveAddress::new(0x53).unwrap();
        assert_eq!(addr.frame(Direction::Write), 0xA6);
        assert_eq!(addr.frame(Direction::Read), 0xA7);
    }

    #[test]
    fn test_rejects_eight_bit_address() {
        assert_eq!(SlaveAddress::new(0x80), Err(Error::InvalidAddress));
        assert_eq!(SlaveAddress::try_from(0xA6), Err(Error::InvalidAddress));
        assert!(SlaveAddress::new(MAX_ADDRESS).is_ok());
    }
}
