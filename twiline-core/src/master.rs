//! Transaction sequencer
//!
//! Composes the bus primitives into addressed register writes and
//! random-access register reads:
//!
//! ```text
//! write: S  SLA+W  REG  D0 .. Dn-1            P
//! read:  S  SLA+W  REG  Sr  SLA+R  D0 .. Dn-1 P
//!                                  A  ..  N
//! ```
//!
//! A rejected Start or a NACKed address frame is treated as a busy bus or
//! a busy slave and re-polled with a fresh Start, up to the retry budget.
//! Every other failure aborts at once. Stop is issued exactly once on every
//! path that touched the bus.

use twiline_hal::{Acknowledge, BusFault, TwiBus};

use crate::address::{Direction, SlaveAddress};
use crate::error::Error;

/// Default number of failed Start attempts tolerated per transaction
pub const MAX_RESTARTS: u8 = 20;

/// Where a transaction currently is (or where the last one ended)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Phase {
    /// No transaction issued yet
    Idle,
    /// Waiting for a Start or Repeated Start to be accepted
    StartPending,
    /// Sending the slave address frame
    AddressFraming,
    /// Register address acknowledged
    RegisterAddressSent,
    /// Moving payload bytes
    DataPhase,
    /// Completed and Stop issued
    Stopped,
    /// Failed and Stop issued
    Aborted,
}

impl Phase {
    /// Check if the last transaction has fully ended
    pub fn is_terminal(self) -> bool {
        matches!(self, Phase::Stopped | Phase::Aborted)
    }
}

/// Which condition opens an address phase
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Condition {
    Start,
    RepeatedStart,
}

/// Failure budget shared by all address phases of one transaction
///
/// Only a rejected Start or a NACKed address frame is charged, so every
/// address phase gets at least one attempt.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Retries {
    remaining: u8,
}

impl Retries {
    pub(crate) fn new(budget: u8) -> Self {
        Self { remaining: budget }
    }

    /// Charge one failed attempt; `false` once the budget is spent
    pub(crate) fn consume(&mut self) -> bool {
        self.remaining = self.remaining.saturating_sub(1);
        self.remaining > 0
    }
}

/// I2C master transaction engine
///
/// Owns the bus handle; all transactions serialize through `&mut self`.
///
/// # Example
///
/// ```ignore
/// let mut master = Master::new(twi);
/// master.write(0x53, 0x2D, &[0x08])?;
/// let mut xyz = [0u8; 6];
/// master.read(0x53, 0x32, &mut xyz)?;
/// ```
pub struct Master<B: TwiBus> {
    bus: B,
    max_restarts: u8,
    phase: Phase,
}

impl<B: TwiBus> Master<B> {
    /// Create an engine with the default retry budget
    pub fn new(bus: B) -> Self {
        Self::with_max_restarts(bus, MAX_RESTARTS)
    }

    /// Create an engine tolerating `max_restarts` failed Start attempts per
    /// transaction
    ///
    /// A budget of zero is raised to one.
    pub fn with_max_restarts(bus: B, max_restarts: u8) -> Self {
        Self {
            bus,
            max_restarts: max_restarts.max(1),
            phase: Phase::Idle,
        }
    }

    /// Retry budget
    pub fn max_restarts(&self) -> u8 {
        self.max_restarts
    }

    /// Phase reached by the last transaction that touched the bus
    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub(crate) fn set_phase(&mut self, phase: Phase) {
        self.phase = phase;
    }

    /// Borrow the bus handle
    pub fn bus(&self) -> &B {
        &self.bus
    }

    /// Mutably borrow the bus handle
    pub fn bus_mut(&mut self) -> &mut B {
        &mut self.bus
    }

    /// Give the bus handle back
    pub fn release(self) -> B {
        self.bus
    }

    /// Write `data` to consecutive registers starting at `register`
    ///
    /// An empty `data` is a no-op that never touches the bus.
    pub fn write(&mut self, address: u8, register: u8, data: &[u8]) -> Result<(), Error> {
        if data.is_empty() {
            return Ok(());
        }
        let address = SlaveAddress::new(address)?;
        let mut retries = Retries::new(self.max_restarts);

        let result = self.write_phases(address, register, data, &mut retries);
        self.finish(result)
    }

    /// Fill `buffer` from consecutive registers starting at `register`
    ///
    /// An empty `buffer` is a no-op that never touches the bus.
    pub fn read(&mut self, address: u8, register: u8, buffer: &mut [u8]) -> Result<(), Error> {
        if buffer.is_empty() {
            return Ok(());
        }
        let address = SlaveAddress::new(address)?;
        let mut retries = Retries::new(self.max_restarts);

        let result = self.read_phases(address, register, buffer, &mut retries);
        self.finish(result)
    }

    fn write_phases(
        &mut self,
        address: SlaveAddress,
        register: u8,
        data: &[u8],
        retries: &mut Retries,
    ) -> Result<(), Error> {
        self.open(address, Direction::Write, Condition::Start, retries)?;
        self.send_register(register)?;
        self.phase = Phase::DataPhase;
        self.send(data)
    }

    fn read_phases(
        &mut self,
        address: SlaveAddress,
        register: u8,
        buffer: &mut [u8],
        retries: &mut Retries,
    ) -> Result<(), Error> {
        self.open(address, Direction::Write, Condition::Start, retries)?;
        self.send_register(register)?;
        self.open(address, Direction::Read, Condition::RepeatedStart, retries)?;
        self.phase = Phase::DataPhase;
        self.receive(buffer, true)
    }

    /// Issue a Start and the address frame until the slave answers
    pub(crate) fn open(
        &mut self,
        address: SlaveAddress,
        direction: Direction,
        condition: Condition,
        retries: &mut Retries,
    ) -> Result<(), Error> {
        let frame = address.frame(direction);
        let rejected = match condition {
            Condition::Start => Error::StartFailed,
            Condition::RepeatedStart => Error::RepeatedStartFailed,
        };
        let mut attempts: u8 = 0;

        loop {
            attempts = attempts.saturating_add(1);
            self.phase = Phase::StartPending;
            let failure = match self.bus.start() {
                Ok(()) => {
                    self.phase = Phase::AddressFraming;
                    match self.bus.put_byte(frame)? {
                        Acknowledge::Ack => return Ok(()),
                        Acknowledge::Nack => {
                            trace!("address frame {:#x} not acknowledged", frame);
                            match direction {
                                Direction::Write => Error::AddressNack,
                                Direction::Read => Error::ReadAddressNack,
                            }
                        }
                    }
                }
                Err(BusFault::Timeout) => return Err(Error::Timeout),
                Err(fault) => {
                    debug!("start rejected: {}", fault);
                    rejected
                }
            };

            if !retries.consume() {
                warn!(
                    "address {:#x} unanswered after {} attempts",
                    address.get(),
                    attempts
                );
                return Err(failure);
            }
        }
    }

    fn send_register(&mut self, register: u8) -> Result<(), Error> {
        match self.bus.put_byte(register)? {
            Acknowledge::Ack => {
                self.phase = Phase::RegisterAddressSent;
                Ok(())
            }
            Acknowledge::Nack => Err(Error::RegisterNack),
        }
    }

    pub(crate) fn send(&mut self, data: &[u8]) -> Result<(), Error> {
        for &byte in data {
            if !self.bus.put_byte(byte)?.is_ack() {
                return Err(Error::DataNack);
            }
        }
        Ok(())
    }

    /// Receive into `buffer`; `nack_last` ends the slave's transmission
    pub(crate) fn receive(&mut self, buffer: &mut [u8], nack_last: bool) -> Result<(), Error> {
        let Some((last, head)) = buffer.split_last_mut() else {
            return Ok(());
        };
        for byte in head {
            *byte = self.bus.get_byte_ack()?;
        }
        *last = if nack_last {
            self.bus.get_byte_nack()?
        } else {
            self.bus.get_byte_ack()?
        };
        Ok(())
    }

    /// Issue the Stop and settle the terminal phase
    pub(crate) fn finish(&mut self, result: Result<(), Error>) -> Result<(), Error> {
        let stopped = self.bus.stop();

        match (result, stopped) {
            (Ok(()), Ok(())) => {
                self.phase = Phase::Stopped;
                Ok(())
            }
            (Ok(()), Err(fault)) => {
                warn!("stop failed: {}", fault);
                self.phase = Phase::Aborted;
                Err(fault.into())
            }
            (Err(error), _) => {
                warn!("transaction aborted: {}", error);
                self.phase = Phase::Aborted;
                Err(error)
            }
        }
    }
}
