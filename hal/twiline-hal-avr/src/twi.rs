//! TWI bus handle
//!
//! Owns the TWI register block and implements the bus primitives by
//! polling TWINT. Every poll loop is bounded by [`TwiConfig::timeout`].

use embassy_time::{Duration, Instant};
use tock_registers::fields::FieldValue;
use tock_registers::LocalRegisterCopy;
use twiline_hal::{Acknowledge, BusFault, I2cConfig, TwiBus};

use crate::registers::{Register, RegisterBlock, TWCR, TWSR};
use crate::status::{fault_for, TwiStatus};

/// Default completion deadline for a single primitive
pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(10);

/// TWI configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct TwiConfig {
    /// Bus speed
    pub i2c: I2cConfig,
    /// CPU clock feeding the TWI in Hz
    pub cpu_frequency: u32,
    /// How long a primitive may wait for the hardware
    pub timeout: Duration,
}

impl Default for TwiConfig {
    fn default() -> Self {
        Self {
            i2c: I2cConfig::STANDARD,
            cpu_frequency: 16_000_000,
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

impl TwiConfig {
    /// Set the bus speed
    #[must_use]
    pub fn with_i2c(mut self, i2c: I2cConfig) -> Self {
        self.i2c = i2c;
        self
    }

    /// Set the CPU clock
    #[must_use]
    pub fn with_cpu_frequency(mut self, hz: u32) -> Self {
        self.cpu_frequency = hz;
        self
    }

    /// Set the completion deadline
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

type Control = FieldValue<u8, TWCR::Register>;

/// Handle to the TWI peripheral in master mode
///
/// There is one per physical peripheral. It is not `Clone`; move it into
/// the transaction engine so every transfer goes through one owner.
pub struct Twi<R: RegisterBlock> {
    regs: R,
    config: TwiConfig,
    divisor: u8,
    enabled: bool,
}

impl<R: RegisterBlock> Twi<R> {
    /// Configure the bit rate and enable the peripheral
    ///
    /// Prescaler is fixed at 1; the divisor comes from
    /// [`I2cConfig::bit_rate_divisor`].
    pub fn new(mut regs: R, config: TwiConfig) -> Self {
        let divisor = config.i2c.bit_rate_divisor(config.cpu_frequency);

        regs.write(Register::Status, TWSR::TWPS::Div1.value);
        regs.write(Register::BitRate, divisor);
        regs.write(Register::Control, TWCR::TWEN::SET.value);

        debug!(
            "TWI enabled: {} Hz bus, divisor {}",
            config.i2c.effective_frequency(config.cpu_frequency),
            divisor
        );

        Self {
            regs,
            config,
            divisor,
            enabled: true,
        }
    }

    /// Get the configuration
    pub fn config(&self) -> &TwiConfig {
        &self.config
    }

    /// Bit-rate register value in use
    pub fn divisor(&self) -> u8 {
        self.divisor
    }

    /// Check if the peripheral is enabled
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Borrow the register block
    pub fn registers(&self) -> &R {
        &self.regs
    }

    /// Mutably borrow the register block
    pub fn registers_mut(&mut self) -> &mut R {
        &mut self.regs
    }

    /// Switch the peripheral off, releasing SDA and SCL
    pub fn disable(&mut self) {
        self.regs.write(Register::Control, 0);
        self.enabled = false;
    }

    /// Switch the peripheral back on
    pub fn enable(&mut self) {
        self.regs.write(Register::Control, TWCR::TWEN::SET.value);
        self.enabled = true;
    }

    /// Disable the peripheral and give the registers back
    pub fn free(mut self) -> R {
        self.disable();
        self.regs
    }

    fn command(&mut self, control: Control) {
        self.regs.write(Register::Control, control.value);
        self.enabled = true;
    }

    fn control(&self) -> LocalRegisterCopy<u8, TWCR::Register> {
        LocalRegisterCopy::new(self.regs.read(Register::Control))
    }

    fn status_code(&self) -> u8 {
        TwiStatus::code_of(self.regs.read(Register::Status))
    }

    fn wait_until(
        &self,
        done: impl Fn(LocalRegisterCopy<u8, TWCR::Register>) -> bool,
    ) -> Result<(), BusFault> {
        let deadline = Instant::now() + self.config.timeout;
        loop {
            if done(self.control()) {
                return Ok(());
            }
            if Instant::now() >= deadline {
                warn!("TWI timeout, TWCR={:#x}", self.regs.read(Register::Control));
                return Err(BusFault::Timeout);
            }
        }
    }

    /// Wait for TWINT and return the status code
    fn wait_for_job(&self) -> Result<u8, BusFault> {
        self.wait_until(|control| control.is_set(TWCR::TWINT))?;
        Ok(self.status_code())
    }
}

impl<R: RegisterBlock> TwiBus for Twi<R> {
    fn start(&mut self) -> Result<(), BusFault> {
        self.command(TWCR::TWINT::SET + TWCR::TWSTA::SET + TWCR::TWEN::SET);
        let code = self.wait_for_job()?;

        match TwiStatus::from_code(code) {
            Some(TwiStatus::Start) | Some(TwiStatus::RepeatedStart) => {
                trace!("start accepted ({:#x})", code);
                Ok(())
            }
            _ => {
                debug!("start rejected ({:#x})", code);
                Err(fault_for(code))
            }
        }
    }

    fn stop(&mut self) -> Result<(), BusFault> {
        self.command(TWCR::TWINT::SET + TWCR::TWSTO::SET + TWCR::TWEN::SET);
        // TWINT is not set after a stop; the hardware clears TWSTO instead
        self.wait_until(|control| !control.is_set(TWCR::TWSTO))
    }

    fn put_byte(&mut self, byte: u8) -> Result<Acknowledge, BusFault> {
        self.regs.write(Register::Data, byte);
        self.command(TWCR::TWINT::SET + TWCR::TWEN::SET);
        let code = self.wait_for_job()?;

        TwiStatus::from_code(code)
            .and_then(TwiStatus::transmit_ack)
            .ok_or_else(|| fault_for(code))
    }

    fn get_byte(&mut self, ack: Acknowledge) -> Result<u8, BusFault> {
        let control = match ack {
            Acknowledge::Ack => TWCR::TWINT::SET + TWCR::TWEA::SET + TWCR::TWEN::SET,
            Acknowledge::Nack => TWCR::TWINT::SET + TWCR::TWEN::SET,
        };
        self.command(control);
        let code = self.wait_for_job()?;

        match TwiStatus::from_code(code) {
            Some(TwiStatus::DataReceivedAck) | Some(TwiStatus::DataReceivedNack) => {
                Ok(self.regs.read(Register::Data))
            }
            _ => Err(fault_for(code)),
        }
    }
}
