//! `embedded-hal` I2C adapter
//!
//! Lets platform-agnostic drivers run on [`Master`]. Operations are
//! sequenced with the same retry and Stop rules as [`Master::write`] and
//! [`Master::read`]: one Start for the first operation, a Repeated Start
//! whenever the direction flips, the last byte of each read run NACKed and
//! a single Stop at the end.

use embedded_hal::i2c::{ErrorType, I2c, Operation, SevenBitAddress};
use twiline_hal::TwiBus;

use crate::address::{Direction, SlaveAddress};
use crate::error::Error;
use crate::master::{Condition, Master, Phase, Retries};

impl<B: TwiBus> ErrorType for Master<B> {
    type Error = Error;
}

impl<B: TwiBus> I2c<SevenBitAddress> for Master<B> {
    fn transaction(
        &mut self,
        address: SevenBitAddress,
        operations: &mut [Operation<'_>],
    ) -> Result<(), Self::Error> {
        if operations.is_empty() {
            return Ok(());
        }
        let address = SlaveAddress::new(address)?;
        let mut retries = Retries::new(self.max_restarts());

        let result = self.run_operations(address, operations, &mut retries);
        self.finish(result)
    }
}

fn direction_of(operation: &Operation<'_>) -> Direction {
    match operation {
        Operation::Read(_) => Direction::Read,
        Operation::Write(_) => Direction::Write,
    }
}

/// Check if more bytes will be read before the direction flips
fn reads_follow(rest: &[Operation<'_>]) -> bool {
    rest.iter()
        .take_while(|op| matches!(op, Operation::Read(_)))
        .any(|op| matches!(op, Operation::Read(buf) if !buf.is_empty()))
}

impl<B: TwiBus> Master<B> {
    fn run_operations(
        &mut self,
        address: SlaveAddress,
        operations: &mut [Operation<'_>],
        retries: &mut Retries,
    ) -> Result<(), Error> {
        let mut current: Option<Direction> = None;

        for i in 0..operations.len() {
            let direction = direction_of(&operations[i]);
            if current != Some(direction) {
                let condition = match current {
                    None => Condition::Start,
                    Some(_) => Condition::RepeatedStart,
                };
                self.open(address, direction, condition, retries)?;
                current = Some(direction);
            }

            let nack_last = !reads_follow(&operations[i + 1..]);
            self.set_phase(Phase::DataPhase);
            match &mut operations[i] {
                Operation::Write(bytes) => self.send(bytes)?,
                Operation::Read(buffer) => self.receive(buffer, nack_last)?,
            }
        }
        Ok(())
    }
}
