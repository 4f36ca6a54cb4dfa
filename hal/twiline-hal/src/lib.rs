//! Twiline Hardware Abstraction Layer
//!
//! This crate defines the two-wire bus primitives that chip-specific HALs
//! implement (AVR TWI, simulated buses, etc.). The transaction sequencer
//! only talks to these traits, so the same register read/write logic runs
//! on every platform.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │  Device drivers (external)              │
//! └─────────────────────────────────────────┘
//!                     │
//!                     ▼
//! ┌─────────────────────────────────────────┐
//! │  twiline-core (transaction sequencer)   │
//! └─────────────────────────────────────────┘
//!                     │
//!                     ▼
//! ┌─────────────────────────────────────────┐
//! │  twiline-hal (this crate - traits)      │
//! └─────────────────────────────────────────┘
//!                     │
//!         ┌───────────┴───────────┐
//!         ▼                       ▼
//! ┌───────────────┐       ┌───────────────┐
//! │ twiline-hal-  │       │  simulated    │
//! │     avr       │       │     bus       │
//! └───────────────┘       └───────────────┘
//! ```
//!
//! # Traits
//!
//! - [`i2c::TwiBus`] - Start, Stop, byte out, byte in

#![no_std]
#![deny(unsafe_code)]

pub mod i2c;

// Re-export key types at crate root for convenience
pub use i2c::{Acknowledge, BusFault, I2cConfig, TwiBus};
