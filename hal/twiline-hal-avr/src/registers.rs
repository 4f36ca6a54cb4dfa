//! TWI register map
//!
//! Register layout and bit fields of the AVR two-wire interface as found on
//! the ATmega48/88/168/328 family. Access goes through [`RegisterBlock`] so
//! the bus handle can drive either the memory-mapped peripheral or a host
//! simulation.

use core::ptr::NonNull;

use tock_registers::interfaces::{Readable, Writeable};
use tock_registers::register_bitfields;
use tock_registers::registers::ReadWrite;

/// Data-space address of TWBR on the ATmega328P
pub const ATMEGA328P_TWI_BASE: usize = 0xB8;

register_bitfields![u8,
    /// TWI Control Register
    pub TWCR [
        /// Interrupt flag, set by hardware when the current job completes
        TWINT OFFSET(7) NUMBITS(1) [],
        /// Enable acknowledge
        TWEA OFFSET(6) NUMBITS(1) [],
        /// Start condition
        TWSTA OFFSET(5) NUMBITS(1) [],
        /// Stop condition
        TWSTO OFFSET(4) NUMBITS(1) [],
        /// Write collision
        TWWC OFFSET(3) NUMBITS(1) [],
        /// TWI enable
        TWEN OFFSET(2) NUMBITS(1) [],
        /// Interrupt enable
        TWIE OFFSET(0) NUMBITS(1) []
    ],
    /// TWI Status Register
    pub TWSR [
        /// Status code, upper five bits
        TWS OFFSET(3) NUMBITS(5) [],
        /// Bit-rate prescaler
        TWPS OFFSET(0) NUMBITS(2) [
            Div1 = 0,
            Div4 = 1,
            Div16 = 2,
            Div64 = 3
        ]
    ]
];

/// Registers the bus handle touches
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Register {
    /// TWBR
    BitRate,
    /// TWSR
    Status,
    /// TWDR
    Data,
    /// TWCR
    Control,
}

/// Raw byte access to the TWI registers
pub trait RegisterBlock {
    /// Read a register
    fn read(&self, register: Register) -> u8;

    /// Write a register
    fn write(&mut self, register: Register, value: u8);
}

impl<T: RegisterBlock + ?Sized> RegisterBlock for &mut T {
    fn read(&self, register: Register) -> u8 {
        (**self).read(register)
    }

    fn write(&mut self, register: Register, value: u8) {
        (**self).write(register, value)
    }
}

/// Memory layout of the TWI peripheral
#[repr(C)]
pub struct TwiRegisters {
    /// Bit rate
    pub twbr: ReadWrite<u8>,
    /// Status and prescaler
    pub twsr: ReadWrite<u8, TWSR::Register>,
    /// Slave address (unused in master mode)
    pub twar: ReadWrite<u8>,
    /// Data
    pub twdr: ReadWrite<u8>,
    /// Control
    pub twcr: ReadWrite<u8, TWCR::Register>,
    /// Slave address mask (unused in master mode)
    pub twamr: ReadWrite<u8>,
}

/// Memory-mapped TWI peripheral
pub struct MmioRegisters {
    ptr: NonNull<TwiRegisters>,
}

impl MmioRegisters {
    /// Wrap the register block at `base`
    ///
    /// Returns `None` for a null pointer.
    ///
    /// # Safety
    ///
    /// - `base` must point at the TWI register block and stay valid for the
    ///   program duration.
    /// - No other `MmioRegisters` for the same block may exist.
    pub unsafe fn new(base: *mut u8) -> Option<Self> {
        NonNull::new(base).map(|ptr| Self { ptr: ptr.cast() })
    }

    /// The ATmega328P TWI peripheral
    ///
    /// # Safety
    ///
    /// Must be called at most once, on an ATmega328P-compatible part.
    pub unsafe fn atmega328p() -> Option<Self> {
        // SAFETY: forwarded to the caller
        unsafe { Self::new(ATMEGA328P_TWI_BASE as *mut u8) }
    }

    fn regs(&self) -> &TwiRegisters {
        // SAFETY: `ptr` is aligned and dereferencable for the program
        // duration as promised by the caller of `MmioRegisters::new`.
        unsafe { self.ptr.as_ref() }
    }
}

impl RegisterBlock for MmioRegisters {
    fn read(&self, register: Register) -> u8 {
        let regs = self.regs();
        match register {
            Register::BitRate => regs.twbr.get(),
            Register::Status => regs.twsr.get(),
            Register::Data => regs.twdr.get(),
            Register::Control => regs.twcr.get(),
        }
    }

    fn write(&mut self, register: Register, value: u8) {
        let regs = self.regs();
        match register {
            Register::BitRate => regs.twbr.set(value),
            Register::Status => regs.twsr.set(value),
            Register::Data => regs.twdr.set(value),
            Register::Control => regs.twcr.set(value),
        }
    }
}
