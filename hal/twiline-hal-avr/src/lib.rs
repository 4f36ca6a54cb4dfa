//! AVR TWI HAL for Twiline
//!
//! This crate implements the `twiline-hal` bus primitives on the two-wire
//! interface of the megaAVR family (ATmega48/88/168/328 and compatible
//! register layouts).
//!
//! # Features
//!
//! - `defmt` - Enable debug formatting and logging support
//!
//! # Usage
//!
//! ```ignore
//! let regs = unsafe { MmioRegisters::atmega328p() }.unwrap();
//! let twi = Twi::new(regs, TwiConfig::default().with_i2c(I2cConfig::FAST));
//! ```
//!
//! The resulting [`Twi`] is the single owner of the peripheral; hand it to
//! the transaction engine in `twiline-core`.

#![no_std]

// This mod MUST go first, so that the others see its macros.
mod fmt;

pub mod registers;
pub mod status;
pub mod twi;

#[cfg(test)]
mod sim;

pub use registers::{MmioRegisters, Register, RegisterBlock};
pub use status::TwiStatus;
pub use twi::{Twi, TwiConfig, DEFAULT_TIMEOUT};

// Re-export shared types from twiline-hal
pub use twiline_hal::{Acknowledge, BusFault, I2cConfig, TwiBus};
