//! I2C master transaction engine
//!
//! Turns the four bus primitives of a [`TwiBus`] into complete register
//! transactions:
//!
//! - Register writes and random-access register reads ([`Master`])
//! - Bounded polling of busy slaves with Repeated Start
//! - A single Stop on every exit path
//! - An `embedded-hal` [`I2c`](embedded_hal::i2c::I2c) implementation
//!
//! Enable the `sim` feature for [`sim::SimBus`], a host-side bus model
//! with fault injection.

#![no_std]
#![deny(unsafe_code)]

mod fmt;

pub mod address;
pub mod error;
pub mod master;
pub mod transaction;

#[cfg(any(test, feature = "sim"))]
pub mod sim;

pub use address::{Direction, SlaveAddress, MAX_ADDRESS};
pub use error::Error;
pub use master::{Master, Phase, MAX_RESTARTS};
pub use twiline_hal::{Acknowledge, BusFault, I2cConfig, TwiBus};
