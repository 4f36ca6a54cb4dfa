//! TWI status codes
//!
//! Master-mode values of the TWS field of TWSR (prescaler bits masked off).

use tock_registers::LocalRegisterCopy;
use twiline_hal::{Acknowledge, BusFault};

use crate::registers::TWSR;

/// Master transmitter / receiver status codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum TwiStatus {
    /// Illegal Start or Stop
    BusError = 0x00,
    /// Start transmitted
    Start = 0x08,
    /// Repeated Start transmitted
    RepeatedStart = 0x10,
    /// SLA+W sent, ACK received
    AddressWriteAck = 0x18,
    /// SLA+W sent, NACK received
    AddressWriteNack = 0x20,
    /// Data sent, ACK received
    DataSentAck = 0x28,
    /// Data sent, NACK received
    DataSentNack = 0x30,
    /// Arbitration lost in SLA or data
    ArbitrationLost = 0x38,
    /// SLA+R sent, ACK received
    AddressReadAck = 0x40,
    /// SLA+R sent, NACK received
    AddressReadNack = 0x48,
    /// Data received, ACK returned
    DataReceivedAck = 0x50,
    /// Data received, NACK returned
    DataReceivedNack = 0x58,
    /// No relevant state information
    NoInfo = 0xF8,
}

impl TwiStatus {
    /// Decode a status code (prescaler bits already masked)
    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            0x00 => Some(TwiStatus::BusError),
            0x08 => Some(TwiStatus::Start),
            0x10 => Some(TwiStatus::RepeatedStart),
            0x18 => Some(TwiStatus::AddressWriteAck),
            0x20 => Some(TwiStatus::AddressWriteNack),
            0x28 => Some(TwiStatus::DataSentAck),
            0x30 => Some(TwiStatus::DataSentNack),
            0x38 => Some(TwiStatus::ArbitrationLost),
            0x40 => Some(TwiStatus::AddressReadAck),
            0x48 => Some(TwiStatus::AddressReadNack),
            0x50 => Some(TwiStatus::DataReceivedAck),
            0x58 => Some(TwiStatus::DataReceivedNack),
            0xF8 => Some(TwiStatus::NoInfo),
            _ => None,
        }
    }

    /// Status code of a raw TWSR value
    pub fn code_of(twsr: u8) -> u8 {
        LocalRegisterCopy::<u8, TWSR::Register>::new(twsr).read(TWSR::TWS) << 3
    }

    /// Numeric status code
    pub fn code(self) -> u8 {
        self as u8
    }

    /// Acknowledge carried by a transmit status, if any
    pub fn transmit_ack(self) -> Option<Acknowledge> {
        match self {
            TwiStatus::AddressWriteAck | TwiStatus::DataSentAck | TwiStatus::AddressReadAck => {
                Some(Acknowledge::Ack)
            }
            TwiStatus::AddressWriteNack
            | TwiStatus::DataSentNack
            | TwiStatus::AddressReadNack => Some(Acknowledge::Nack),
            _ => None,
        }
    }
}

/// Fault reported for a status code that does not fit the current operation
pub fn fault_for(code: u8) -> BusFault {
    match TwiStatus::from_code(code) {
        Some(TwiStatus::ArbitrationLost) => BusFault::ArbitrationLost,
        Some(TwiStatus::BusError) => BusFault::BusError,
        _ => BusFault::Unexpected(code),
    }
}
