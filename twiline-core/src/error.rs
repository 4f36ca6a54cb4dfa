//! Transaction error vocabulary

use core::fmt;

use embedded_hal::i2c::{ErrorKind, NoAcknowledgeSource};
use twiline_hal::BusFault;

/// Why a transaction failed
///
/// Each variant identifies a distinct failure point. [`Error::code`] gives
/// a stable numeric status code for C-style callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error {
    /// Start condition rejected on every attempt
    StartFailed,
    /// Slave NACKed its write address on every attempt
    AddressNack,
    /// Slave NACKed the register address byte
    RegisterNack,
    /// Slave NACKed a data byte during a write
    DataNack,
    /// Repeated Start rejected on every attempt
    RepeatedStartFailed,
    /// Slave NACKed its read address on every attempt
    ReadAddressNack,
    /// Another master won the bus mid-transfer
    ArbitrationLost,
    /// Illegal Start or Stop detected
    BusError,
    /// Hardware reported a status that fits no expected transition
    UnexpectedStatus(u8),
    /// Hardware never completed an operation
    Timeout,
    /// Address does not fit in 7 bits
    InvalidAddress,
}

impl Error {
    /// Numeric status code (0 is reserved for success)
    ///
    /// 1-4 are the values the C `i2c_write` returns. `i2c_read` reused 4 and
    /// 5 for a failed Repeated Start and a NACKed read address; those are
    /// renumbered to 5 and 6 so every code names one failure.
    pub fn code(self) -> u8 {
        match self {
            Error::StartFailed => 1,
            Error::AddressNack => 2,
            Error::RegisterNack => 3,
            Error::DataNack => 4,
            Error::RepeatedStartFailed => 5,
            Error::ReadAddressNack => 6,
            Error::ArbitrationLost => 7,
            Error::BusError => 8,
            Error::UnexpectedStatus(_) => 9,
            Error::Timeout => 10,
            Error::InvalidAddress => 11,
        }
    }

    /// Check if retrying the whole transaction later may succeed
    pub fn is_transient(self) -> bool {
        matches!(
            self,
            Error::StartFailed
                | Error::AddressNack
                | Error::RepeatedStartFailed
                | Error::ReadAddressNack
                | Error::ArbitrationLost
        )
    }
}

impl From<BusFault> for Error {
    fn from(fault: BusFault) -> Self {
        match fault {
            BusFault::ArbitrationLost => Error::ArbitrationLost,
            BusFault::BusError => Error::BusError,
            BusFault::Unexpected(code) => Error::UnexpectedStatus(code),
            BusFault::Timeout => Error::Timeout,
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::StartFailed => f.write_str("start condition rejected"),
            Error::AddressNack => f.write_str("slave did not acknowledge its address"),
            Error::RegisterNack => f.write_str("register address rejected"),
            Error::DataNack => f.write_str("data byte rejected"),
            Error::RepeatedStartFailed => f.write_str("repeated start rejected"),
            Error::ReadAddressNack => f.write_str("slave did not acknowledge its read address"),
            Error::ArbitrationLost => f.write_str("arbitration lost"),
            Error::BusError => f.write_str("bus error"),
            Error::UnexpectedStatus(code) => write!(f, "unexpected bus status {:#04x}", code),
            Error::Timeout => f.write_str("bus timeout"),
            Error::InvalidAddress => f.write_str("address is not 7-bit"),
        }
    }
}

impl embedded_hal::i2c::Error for Error {
    fn kind(&self) -> ErrorKind {
        match self {
            Error::AddressNack | Error::ReadAddressNack => {
                ErrorKind::NoAcknowledge(NoAcknowledgeSource::Address)
            }
            Error::RegisterNack | Error::DataNack => {
                ErrorKind::NoAcknowledge(NoAcknowledgeSource::Data)
            }
            Error::ArbitrationLost => ErrorKind::ArbitrationLoss,
            Error::BusError => ErrorKind::Bus,
            _ => ErrorKind::Other,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use embedded_hal::i2c::Error as _;

    #[test]
    fn test_codes_match_write_interface() {
        assert_eq!(Error::StartFailed.code(), 1);
        assert_eq!(Error::AddressNack.code(), 2);
        assert_eq!(Error::RegisterNack.code(), 3);
        assert_eq!(Error::DataNack.code(), 4);
    }

    #[test]
    fn test_read_only_failures_are_renumbered() {
        assert_eq!(Error::RepeatedStartFailed.code(), 5);
        assert_eq!(Error::ReadAddressNack.code(), 6);
    }

    #[test]
    fn test_codes_are_distinct() {
        let all = [
            Error::StartFailed,
            Error::AddressNack,
            Error::RegisterNack,
            Error::DataNack,
            Error::RepeatedStartFailed,
            Error::ReadAddressNack,
            Error::ArbitrationLost,
            Error::BusError,
            Error::UnexpectedStatus(0x68),
            Error::Timeout,
            Error::InvalidAddress,
        ];
        for (i, a) in all.iter().enumerate() {
            assert_ne!(a.code(), 0);
            for b in &all[i + 1..] {
                assert_ne!(a.code(), b.code(), "{:?} / {:?}", a, b);
            }
        }
    }

    #[test]
    fn test_from_bus_fault() {
        assert_eq!(Error::from(BusFault::Timeout), Error::Timeout);
        assert_eq!(Error::from(BusFault::BusError), Error::BusError);
        assert_eq!(
            Error::from(BusFault::Unexpected(0xF8)),
            Error::UnexpectedStatus(0xF8)
        );
    }

    #[test]
    fn test_embedded_hal_kinds() {
        assert_eq!(
            Error::AddressNack.kind(),
            ErrorKind::NoAcknowledge(NoAcknowledgeSource::Address)
        );
        assert_eq!(
            Error::DataNack.kind(),
            ErrorKind::NoAcknowledge(NoAcknowledgeSource::Data)
        );
        assert_eq!(Error::ArbitrationLost.kind(), ErrorKind::ArbitrationLoss);
        assert_eq!(Error::Timeout.kind(), ErrorKind::Other);
    }

    #[test]
    fn test_transient_errors() {
        assert!(Error::AddressNack.is_transient());
        assert!(!Error::RegisterNack.is_transient());
        assert!(!Error::Timeout.is_transient());
    }
}
