//! I2C bus primitive abstractions
//!
//! Provides the four primitive operations a two-wire master peripheral
//! performs. Chip-specific HALs implement [`TwiBus`]; the transaction
//! sequencer in `twiline-core` composes them into addressed reads and
//! writes.

use core::fmt;

/// Acknowledge bit returned by the receiver after a byte
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Acknowledge {
    /// Address or data accepted
    Ack,
    /// Address or data rejected
    Nack,
}

impl Acknowledge {
    /// Check if the byte was accepted
    pub fn is_ack(self) -> bool {
        self == Acknowledge::Ack
    }
}

/// Hardware condition that ended a primitive operation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum BusFault {
    /// Another master won control of the bus
    ArbitrationLost,
    /// Illegal Start or Stop detected on the bus
    BusError,
    /// Status code the master state machine does not expect here
    Unexpected(u8),
    /// Hardware never reported completion
    Timeout,
}

impl fmt::Display for BusFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BusFault::ArbitrationLost => f.write_str("arbitration lost"),
            BusFault::BusError => f.write_str("bus error"),
            BusFault::Unexpected(status) => write!(f, "unexpected bus status {:#04x}", status),
            BusFault::Timeout => f.write_str("bus timeout"),
        }
    }
}

/// Two-wire bus master primitives
///
/// Every method blocks until the hardware reports completion (or the
/// implementation's deadline expires). None of them retry.
pub trait TwiBus {
    /// Generate a Start condition, or a Repeated Start mid-transaction
    ///
    /// Returns `Ok` only when the hardware accepted the condition.
    fn start(&mut self) -> Result<(), BusFault>;

    /// Generate a Stop condition and wait until the bus is released
    ///
    /// The only possible failure is [`BusFault::Timeout`].
    fn stop(&mut self) -> Result<(), BusFault>;

    /// Shift one byte out and report how the receiver acknowledged it
    fn put_byte(&mut self, byte: u8) -> Result<Acknowledge, BusFault>;

    /// Shift one byte in, answering with the given acknowledge bit
    ///
    /// `Ack` asks the slave for more data, `Nack` marks the last byte.
    fn get_byte(&mut self, ack: Acknowledge) -> Result<u8, BusFault>;

    /// Receive a byte and request more
    fn get_byte_ack(&mut self) -> Result<u8, BusFault> {
        self.get_byte(Acknowledge::Ack)
    }

    /// Receive the final byte of a read
    fn get_byte_nack(&mut self) -> Result<u8, BusFault> {
        self.get_byte(Acknowledge::Nack)
    }
}

impl<T: TwiBus + ?Sized> TwiBus for &mut T {
    fn start(&mut self) -> Result<(), BusFault> {
        (**self).start()
    }

    fn stop(&mut self) -> Result<(), BusFault> {
        (**self).stop()
    }

    fn put_byte(&mut self, byte: u8) -> Result<Acknowledge, BusFault> {
        (**self).put_byte(byte)
    }

    fn get_byte(&mut self, ack: Acknowledge) -> Result<u8, BusFault> {
        (**self).get_byte(ack)
    }
}

/// CPU clock below which the bit-rate divisor is forced to zero
pub const MIN_DIVIDED_CPU_HZ: u32 = 1_600_000;

/// I2C configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct I2cConfig {
    /// Clock frequency in Hz
    pub frequency: u32,
}

impl Default for I2cConfig {
    fn default() -> Self {
        Self {
            frequency: 100_000, // 100kHz standard mode
        }
    }
}

impl I2cConfig {
    /// Standard mode (100 kHz)
    pub const STANDARD: Self = Self { frequency: 100_000 };

    /// Fast mode (400 kHz)
    pub const FAST: Self = Self { frequency: 400_000 };

    /// Bit-rate divisor for a prescaler of 1
    ///
    /// SCL = CPU / (16 + 2 * divisor). Slow CPUs get divisor 0, which caps
    /// SCL at CPU / 16.
    pub fn bit_rate_divisor(&self, cpu_hz: u32) -> u8 {
        if cpu_hz < MIN_DIVIDED_CPU_HZ || self.frequency == 0 {
            return 0;
        }
        let divisor = (cpu_hz / self.frequency).saturating_sub(16) / 2;
        divisor.min(u8::MAX as u32) as u8
    }

    /// SCL frequency actually produced by [`Self::bit_rate_divisor`]
    pub fn effective_frequency(&self, cpu_hz: u32) -> u32 {
        cpu_hz / (16 + 2 * self.bit_rate_divisor(cpu_hz) as u32)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_divisor_standard_mode_16mhz() {
        // (16_000_000 / 100_000 - 16) / 2 = 72
        assert_eq!(I2cConfig::STANDARD.bit_rate_divisor(16_000_000), 72);
        assert_eq!(I2cConfig::STANDARD.effective_frequency(16_000_000), 100_000);
    }

    #[test]
    fn test_divisor_fast_mode_16mhz() {
        assert_eq!(I2cConfig::FAST.bit_rate_divisor(16_000_000), 12);
        assert_eq!(I2cConfig::FAST.effective_frequency(16_000_000), 400_000);
    }

    #[test]
    fn test_divisor_slow_cpu() {
        assert_eq!(I2cConfig::STANDARD.bit_rate_divisor(1_000_000), 0);
        assert_eq!(I2cConfig::FAST.bit_rate_divisor(1_599_999), 0);
    }

    #[test]
    fn test_divisor_saturates() {
        let slow = I2cConfig { frequency: 10_000 };
        assert_eq!(slow.bit_rate_divisor(20_000_000), u8::MAX);
    }

    #[test]
    fn test_divisor_frequency_above_cpu_ratio() {
        // CPU / frequency below 16 cannot be reached, fall back to fastest
        let fast = I2cConfig { frequency: 400_000 };
        assert_eq!(fast.bit_rate_divisor(4_000_000), 0);
    }

    #[test]
    fn test_default_is_standard() {
        assert_eq!(I2cConfig::default(), I2cConfig::STANDARD);
    }

    struct CountingBus {
        acked: u8,
        nacked: u8,
    }

    impl TwiBus for CountingBus {
        fn start(&mut self) -> Result<(), BusFault> {
            Ok(())
        }

        fn stop(&mut self) -> Result<(), BusFault> {
            Ok(())
        }

        fn put_byte(&mut self, _byte: u8) -> Result<Acknowledge, BusFault> {
            Ok(Acknowledge::Ack)
        }

        fn get_byte(&mut self, ack: Acknowledge) -> Result<u8, BusFault> {
            match ack {
                Acknowledge::Ack => self.acked += 1,
                Acknowledge::Nack => self.nacked += 1,
            }
            Ok(0)
        }
    }

    #[test]
    fn test_get_byte_helpers_pick_ack_bit() {
        let mut bus = CountingBus { acked: 0, nacked: 0 };
        bus.get_byte_ack().unwrap();
        bus.get_byte_ack().unwrap();
        bus.get_byte_nack().unwrap();
        assert_eq!(bus.acked, 2);
        assert_eq!(bus.nacked, 1);
    }

    #[test]
    fn test_bus_by_mutable_reference() {
        fn last_byte<B: TwiBus>(mut bus: B) -> u8 {
            bus.get_byte_nack().unwrap()
        }

        let mut bus = CountingBus { acked: 0, nacked: 0 };
        last_byte(&mut bus);
        assert_eq!(bus.nacked, 1);
    }

    #[test]
    fn test_fault_display() {
        use core::fmt::Write;
        let mut text = heapless::String::<32>::new();
        write!(text, "{}", BusFault::Unexpected(0xF8)).unwrap();
        assert_eq!(text.as_str(), "unexpected bus status 0xf8");
    }
}
