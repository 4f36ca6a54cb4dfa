//! Byte-level bus simulator
//!
//! [`SimBus`] implements [`TwiBus`] against a set of register-file slaves
//! and records every primitive as a [`BusEvent`]. Faults can be scheduled
//! on any primitive call to drive the engine down its error paths on the
//! host.

use heapless::Vec;
use twiline_hal::{Acknowledge, BusFault, TwiBus};

/// Busy counter value meaning "never answers"
pub const ALWAYS: u32 = u32::MAX;

/// One observed bus primitive
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BusEvent {
    Start,
    RepeatedStart,
    /// Start or Repeated Start that failed
    StartRejected,
    Stop,
    Put(u8),
    GetAck(u8),
    GetNack(u8),
}

/// Fault scheduled on a primitive call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Injection {
    /// Refuse a Start; ignored on other primitives
    RejectStart,
    /// Fail the primitive with this fault
    Fault(BusFault),
}

/// Slave with 256 byte-wide registers and an auto-incrementing pointer
#[derive(Debug, Clone)]
pub struct SimSlave {
    address: u8,
    registers: [u8; 256],
    pointer: u8,
    busy_polls: u32,
    read_busy_polls: u32,
    nack_register: bool,
    nack_data_at: Option<usize>,
}

impl SimSlave {
    pub fn new(address: u8) -> Self {
        Self {
            address,
            registers: [0; 256],
            pointer: 0,
            busy_polls: 0,
            read_busy_polls: 0,
            nack_register: false,
            nack_data_at: None,
        }
    }

    /// Preload registers from `start`, wrapping at 0xFF
    pub fn with_registers(mut self, start: u8, values: &[u8]) -> Self {
        for (offset, &value) in values.iter().enumerate() {
            self.registers[start.wrapping_add(offset as u8) as usize] = value;
        }
        self
    }

    /// NACK the next `polls` write address frames
    pub fn with_busy_polls(mut self, polls: u32) -> Self {
        self.busy_polls = polls;
        self
    }

    /// NACK every address frame
    pub fn always_busy(self) -> Self {
        self.with_busy_polls(ALWAYS).with_read_busy_polls(ALWAYS)
    }

    /// NACK the next `polls` read address frames
    pub fn with_read_busy_polls(mut self, polls: u32) -> Self {
        self.read_busy_polls = polls;
        self
    }

    /// NACK every register address byte
    pub fn nack_register(mut self) -> Self {
        self.nack_register = true;
        self
    }

    /// NACK the data byte at `index` of each write
    pub fn nack_data_at(mut self, index: usize) -> Self {
        self.nack_data_at = Some(index);
        self
    }

    pub fn address(&self) -> u8 {
        self.address
    }

    pub fn register(&self, register: u8) -> u8 {
        self.registers[register as usize]
    }

    /// Answer an address frame, counting down the busy polls
    fn answer(&mut self, read: bool) -> Acknowledge {
        let polls = if read {
            &mut self.read_busy_polls
        } else {
            &mut self.busy_polls
        };
        match *polls {
            0 => Acknowledge::Ack,
            ALWAYS => Acknowledge::Nack,
            _ => {
                *polls -= 1;
                Acknowledge::Nack
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Idle,
    Addressing,
    Transmit { slave: usize, written: Option<usize> },
    Receive { slave: usize },
    Ignored,
}

/// Simulated bus with up to four slaves
///
/// Overflowing the slave list, the injection schedule or the 512-entry
/// event log panics rather than skewing the counters.
#[derive(Debug, Clone)]
pub struct SimBus {
    slaves: Vec<SimSlave, 4>,
    events: Vec<BusEvent, 512>,
    injections: Vec<(usize, Injection), 64>,
    mode: Mode,
    bus_owned: bool,
    calls: usize,
    start_rejections: u32,
    stop_stalled: bool,
}

impl Default for SimBus {
    fn default() -> Self {
        Self::new()
    }
}

impl SimBus {
    pub fn new() -> Self {
        Self {
            slaves: Vec::new(),
            events: Vec::new(),
            injections: Vec::new(),
            mode: Mode::Idle,
            bus_owned: false,
            calls: 0,
            start_rejections: 0,
            stop_stalled: false,
        }
    }

    /// Attach a slave
    ///
    /// # Panics
    ///
    /// Panics when a fifth slave is attached.
    pub fn with_slave(mut self, slave: SimSlave) -> Self {
        self.slaves.push(slave).expect("at most four simulated slaves");
        self
    }

    /// Schedule `injection` on primitive call `call` (0-based, Stop excluded)
    pub fn with_injection(mut self, call: usize, injection: Injection) -> Self {
        self.injections
            .push((call, injection))
            .expect("at most 64 scheduled injections");
        self
    }

    /// Refuse the next `count` Starts
    pub fn with_start_rejections(mut self, count: u32) -> Self {
        self.start_rejections = count;
        self
    }

    /// Report a timeout from every Stop
    pub fn with_stalled_stop(mut self) -> Self {
        self.stop_stalled = true;
        self
    }

    pub fn slave(&self, address: u8) -> Option<&SimSlave> {
        self.slaves.iter().find(|s| s.address == address)
    }

    pub fn events(&self) -> &[BusEvent] {
        &self.events
    }

    pub fn clear_events(&mut self) {
        self.events.clear();
    }

    /// Primitive calls made so far, Stop excluded
    pub fn calls(&self) -> usize {
        self.calls
    }

    pub fn bus_owned(&self) -> bool {
        self.bus_owned
    }

    pub fn starts(&self) -> usize {
        self.count(|e| e == BusEvent::Start)
    }

    pub fn repeated_starts(&self) -> usize {
        self.count(|e| e == BusEvent::RepeatedStart)
    }

    /// Every Start tried, accepted or not
    pub fn start_attempts(&self) -> usize {
        self.count(|e| {
            matches!(
                e,
                BusEvent::Start | BusEvent::RepeatedStart | BusEvent::StartRejected
            )
        })
    }

    pub fn stops(&self) -> usize {
        self.count(|e| e == BusEvent::Stop)
    }

    pub fn acked_reads(&self) -> usize {
        self.count(|e| matches!(e, BusEvent::GetAck(_)))
    }

    pub fn nacked_reads(&self) -> usize {
        self.count(|e| matches!(e, BusEvent::GetNack(_)))
    }

    fn count(&self, pred: impl Fn(BusEvent) -> bool) -> usize {
        self.events.iter().filter(|&&e| pred(e)).count()
    }

    fn log(&mut self, event: BusEvent) {
        self.events.push(event).expect("bus event log full");
    }

    /// Advance the call counter and return any fault scheduled on it
    fn next_call(&mut self) -> Option<Injection> {
        let call = self.calls;
        self.calls += 1;
        self.injections
            .iter()
            .find(|(at, _)| *at == call)
            .map(|&(_, injection)| injection)
    }

    fn put_address(&mut self, frame: u8) -> Acknowledge {
        let read = frame & 1 == 1;
        let Some(index) = self.slaves.iter().position(|s| s.address == frame >> 1) else {
            self.mode = Mode::Ignored;
            return Acknowledge::Nack;
        };

        let ack = self.slaves[index].answer(read);
        self.mode = match (ack, read) {
            (Acknowledge::Nack, _) => Mode::Ignored,
            (Acknowledge::Ack, false) => Mode::Transmit {
                slave: index,
                written: None,
            },
            (Acknowledge::Ack, true) => Mode::Receive { slave: index },
        };
        ack
    }

    fn put_data(&mut self, index: usize, written: Option<usize>, byte: u8) -> Acknowledge {
        let slave = &mut self.slaves[index];
        match written {
            None if slave.nack_register => {
                self.mode = Mode::Ignored;
                Acknowledge::Nack
            }
            None => {
                slave.pointer = byte;
                self.mode = Mode::Transmit {
                    slave: index,
                    written: Some(0),
                };
                Acknowledge::Ack
            }
            Some(n) if slave.nack_data_at == Some(n) => {
                self.mode = Mode::Ignored;
                Acknowledge::Nack
            }
            Some(n) => {
                slave.registers[slave.pointer as usize] = byte;
                slave.pointer = slave.pointer.wrapping_add(1);
                self.mode = Mode::Transmit {
                    slave: index,
                    written: Some(n + 1),
                };
                Acknowledge::Ack
            }
        }
    }
}

impl TwiBus for SimBus {
    fn start(&mut self) -> Result<(), BusFault> {
        let injected = self.next_call();

        let fault = match injected {
            Some(Injection::RejectStart) => Some(BusFault::ArbitrationLost),
            Some(Injection::Fault(fault)) => Some(fault),
            None if self.start_rejections > 0 => {
                if self.start_rejections != ALWAYS {
                    self.start_rejections -= 1;
                }
                Some(BusFault::ArbitrationLost)
            }
            None => None,
        };
        if let Some(fault) = fault {
            self.log(BusEvent::StartRejected);
            self.mode = Mode::Idle;
            return Err(fault);
        }

        let event = if self.bus_owned {
            BusEvent::RepeatedStart
        } else {
            BusEvent::Start
        };
        self.log(event);
        self.bus_owned = true;
        self.mode = Mode::Addressing;
        Ok(())
    }

    fn stop(&mut self) -> Result<(), BusFault> {
        self.log(BusEvent::Stop);
        self.bus_owned = false;
        self.mode = Mode::Idle;
        if self.stop_stalled {
            return Err(BusFault::Timeout);
        }
        Ok(())
    }

    fn put_byte(&mut self, byte: u8) -> Result<Acknowledge, BusFault> {
        if let Some(Injection::Fault(fault)) = self.next_call() {
            self.mode = Mode::Idle;
            return Err(fault);
        }
        self.log(BusEvent::Put(byte));

        match self.mode {
            Mode::Addressing => Ok(self.put_address(byte)),
            Mode::Transmit { slave, written } => Ok(self.put_data(slave, written, byte)),
            Mode::Ignored => Ok(Acknowledge::Nack),
            Mode::Idle | Mode::Receive { .. } => Err(BusFault::Unexpected(0xF8)),
        }
    }

    fn get_byte(&mut self, ack: Acknowledge) -> Result<u8, BusFault> {
        if let Some(Injection::Fault(fault)) = self.next_call() {
            self.mode = Mode::Idle;
            return Err(fault);
        }

        let Mode::Receive { slave } = self.mode else {
            return Err(BusFault::Unexpected(0xF8));
        };
        let slave = &mut self.slaves[slave];
        let value = slave.registers[slave.pointer as usize];
        slave.pointer = slave.pointer.wrapping_add(1);

        match ack {
            Acknowledge::Ack => self.log(BusEvent::GetAck(value)),
            Acknowledge::Nack => {
                self.log(BusEvent::GetNack(value));
                self.mode = Mode::Ignored;
            }
        }
        Ok(value)
    }
}
