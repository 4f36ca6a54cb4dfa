//! Register-level model of the TWI peripheral for host tests
//!
//! Completes every job instantly: writing TWCR with TWINT set performs the
//! requested action against one attached slave and sets TWINT again.

use heapless::Vec;
use tock_registers::LocalRegisterCopy;

use crate::registers::{Register, RegisterBlock, TWCR};
use crate::status::TwiStatus;

/// Register file of a simulated slave with an auto-incrementing pointer
#[derive(Debug, Clone)]
pub struct SimSlave {
    address: u8,
    registers: [u8; 256],
    pointer: u8,
    busy_polls: u32,
}

impl SimSlave {
    pub fn new(address: u8) -> Self {
        Self {
            address,
            registers: [0; 256],
            pointer: 0,
            busy_polls: 0,
        }
    }

    pub fn with_registers(mut self, start: u8, values: &[u8]) -> Self {
        for (offset, &value) in values.iter().enumerate() {
            self.registers[start.wrapping_add(offset as u8) as usize] = value;
        }
        self
    }

    /// NACK the address for the next `polls` address frames
    pub fn with_busy_polls(mut self, polls: u32) -> Self {
        self.busy_polls = polls;
        self
    }

    pub fn register(&self, register: u8) -> u8 {
        self.registers[register as usize]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Idle,
    Addressing,
    Transmit { pointer_loaded: bool },
    Receive,
    Ignored,
}

/// Simulated TWI peripheral
#[derive(Debug, Clone)]
pub struct SimPeripheral {
    twbr: u8,
    twsr: u8,
    twdr: u8,
    twcr: u8,
    slave: SimSlave,
    mode: Mode,
    bus_owned: bool,
    control_log: Vec<u8, 128>,
    forced_start_status: Option<u8>,
    arbitration_lost: bool,
    stalled: bool,
    stop_stalled: bool,
    jobs_before_stall: Option<u32>,
    starts: u32,
    repeated_starts: u32,
    stops: u32,
}

impl Default for SimPeripheral {
    fn default() -> Self {
        Self::with_slave(SimSlave::new(0x00))
    }
}

impl SimPeripheral {
    pub fn with_slave(slave: SimSlave) -> Self {
        Self {
            twbr: 0,
            twsr: 0xF8,
            twdr: 0xFF,
            twcr: 0,
            slave,
            mode: Mode::Idle,
            bus_owned: false,
            control_log: Vec::new(),
            forced_start_status: None,
            arbitration_lost: false,
            stalled: false,
            stop_stalled: false,
            jobs_before_stall: None,
            starts: 0,
            repeated_starts: 0,
            stops: 0,
        }
    }

    pub fn slave(&self) -> &SimSlave {
        &self.slave
    }

    pub fn status_code(&self) -> u8 {
        TwiStatus::code_of(self.twsr)
    }

    pub fn control_writes(&self) -> &[u8] {
        &self.control_log
    }

    pub fn bus_owned(&self) -> bool {
        self.bus_owned
    }

    pub fn starts(&self) -> u32 {
        self.starts
    }

    pub fn repeated_starts(&self) -> u32 {
        self.repeated_starts
    }

    pub fn stops(&self) -> u32 {
        self.stops
    }

    /// Answer the next Start with `code` instead of 0x08/0x10
    pub fn force_start_status(&mut self, code: u8) {
        self.forced_start_status = Some(code);
    }

    /// Lose arbitration on the next transmitted byte
    pub fn lose_arbitration(&mut self) {
        self.arbitration_lost = true;
    }

    /// Never set TWINT again
    pub fn stall(&mut self) {
        self.stalled = true;
    }

    /// Stall once `jobs` more jobs have completed
    pub fn stall_after(&mut self, jobs: u32) {
        self.jobs_before_stall = Some(jobs);
    }

    /// Never clear TWSTO
    pub fn stall_stop(&mut self) {
        self.stop_stalled = true;
    }

    fn set_status(&mut self, status: TwiStatus) {
        self.set_status_code(status.code());
    }

    fn set_status_code(&mut self, code: u8) {
        self.twsr = code | (self.twsr & 0x03);
    }

    fn run_job(&mut self, control: LocalRegisterCopy<u8, TWCR::Register>) {
        if control.is_set(TWCR::TWSTA) {
            self.start_condition();
            return;
        }

        match self.mode {
            Mode::Addressing => self.address_frame(),
            Mode::Transmit { pointer_loaded } => self.transmit(pointer_loaded),
            Mode::Receive => self.receive(control.is_set(TWCR::TWEA)),
            Mode::Idle | Mode::Ignored => self.set_status(TwiStatus::NoInfo),
        }
    }

    fn start_condition(&mut self) {
        if let Some(code) = self.forced_start_status.take() {
            self.set_status_code(code);
            self.mode = Mode::Idle;
            return;
        }

        if self.bus_owned {
            self.repeated_starts += 1;
            self.set_status(TwiStatus::RepeatedStart);
        } else {
            self.starts += 1;
            self.set_status(TwiStatus::Start);
        }
        self.bus_owned = true;
        self.mode = Mode::Addressing;
    }

    fn address_frame(&mut self) {
        if core::mem::take(&mut self.arbitration_lost) {
            self.set_status(TwiStatus::ArbitrationLost);
            self.bus_owned = false;
            self.mode = Mode::Idle;
            return;
        }

        let read = self.twdr & 1 == 1;
        let matched = self.twdr >> 1 == self.slave.address;
        let busy = matched && self.slave.busy_polls > 0;
        if busy {
            self.slave.busy_polls -= 1;
        }

        let (status, mode) = match (matched && !busy, read) {
            (true, false) => (
                TwiStatus::AddressWriteAck,
                Mode::Transmit {
                    pointer_loaded: false,
                },
            ),
            (true, true) => (TwiStatus::AddressReadAck, Mode::Receive),
            (false, false) => (TwiStatus::AddressWriteNack, Mode::Ignored),
            (false, true) => (TwiStatus::AddressReadNack, Mode::Ignored),
        };
        self.set_status(status);
        self.mode = mode;
    }

    fn transmit(&mut self, pointer_loaded: bool) {
        if core::mem::take(&mut self.arbitration_lost) {
            self.set_status(TwiStatus::ArbitrationLost);
            self.bus_owned = false;
            self.mode = Mode::Idle;
            return;
        }

        if pointer_loaded {
            let pointer = self.slave.pointer;
            self.slave.registers[pointer as usize] = self.twdr;
            self.slave.pointer = pointer.wrapping_add(1);
        } else {
            self.slave.pointer = self.twdr;
        }
        self.set_status(TwiStatus::DataSentAck);
        self.mode = Mode::Transmit {
            pointer_loaded: true,
        };
    }

    fn receive(&mut self, ack: bool) {
        let pointer = self.slave.pointer;
        self.twdr = self.slave.registers[pointer as usize];
        self.slave.pointer = pointer.wrapping_add(1);
        if ack {
            self.set_status(TwiStatus::DataReceivedAck);
        } else {
            self.set_status(TwiStatus::DataReceivedNack);
            self.mode = Mode::Ignored;
        }
    }
}

impl RegisterBlock for SimPeripheral {
    fn read(&self, register: Register) -> u8 {
        match register {
            Register::BitRate => self.twbr,
            Register::Status => self.twsr,
            Register::Data => self.twdr,
            Register::Control => self.twcr,
        }
    }

    fn write(&mut self, register: Register, value: u8) {
        match register {
            Register::BitRate => self.twbr = value,
            // Only the prescaler bits are writable
            Register::Status => self.twsr = (self.twsr & 0xF8) | (value & 0x03),
            Register::Data => self.twdr = value,
            Register::Control => {
                let _ = self.control_log.push(value);
                let control = LocalRegisterCopy::<u8, TWCR::Register>::new(value);
                let int_flag = TWCR::TWINT::SET.value;

                if !control.is_set(TWCR::TWEN) || !control.is_set(TWCR::TWINT) {
                    self.twcr = value & !int_flag;
                    return;
                }

                if control.is_set(TWCR::TWSTO) {
                    self.stops += 1;
                    self.bus_owned = false;
                    self.mode = Mode::Idle;
                    self.set_status(TwiStatus::NoInfo);
                    self.twcr = if self.stop_stalled {
                        value & !int_flag
                    } else {
                        value & !(int_flag | TWCR::TWSTO::SET.value)
                    };
                    return;
                }

                if let Some(remaining) = self.jobs_before_stall {
                    if remaining == 0 {
                        self.stalled = true;
                    } else {
                        self.jobs_before_stall = Some(remaining - 1);
                    }
                }

                if self.stalled {
                    self.twcr = value & !int_flag;
                    return;
                }

                self.run_job(control);
                self.twcr = value;
            }
        }
    }
}
