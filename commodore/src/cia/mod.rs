//! # CIA (MOS 6526) Complex Interface Adapter
//!
//! The C64 has two:
//! - CIA1 ($DC00-$DCFF): keyboard matrix, joystick ports, IRQ
//! - CIA2 ($DD00-$DDFF): serial bus, VIC-II bank selection, NMI
//!
//! Each contains two 16-bit timers, a [`TodClock`], a [`SerialPort`] and two
//! [`Port`]s. The interrupt control register (ICR) combines five sources:
//!
//! | Bit | Source                 |
//! |-----|------------------------|
//! | 0   | Timer A underflow      |
//! | 1   | Timer B underflow      |
//! | 2   | TOD alarm              |
//! | 3   | Serial port byte done  |
//! | 4   | FLAG line edge         |
//!
//! Reading the ICR returns and clears the flags; peeking leaves them. The
//! interrupt output carries the enabled, pending flags as its reason code.
//!
//! Registers mirror every 16 bytes.

mod clock;
mod serial;

pub use clock::{TimeOfDay, TodClock};
pub use serial::{SerialDirection, SerialOutput, SerialPort};

use std::any::Any;

use log::debug;

use lib8bit::{
    Attributes, Chip, ChipError, ChipId, CountMode, Cpu, CycleTracker, Event, EventQueue,
    InfoStructure, InitializationError, InterruptId, InterruptOutput, LatchedFlag, Memory,
    Notifier, RunMode, Subscription, SubsetId, SubsetKind, Timer,
};

use crate::port::Port;
use crate::region::Region;

/// CNT line level changed. Value 1 is high. Emitted and accepted.
pub const EVENT_CNT: u32 = 0x100;
/// SP line level changed. Value 1 is high. Emitted and accepted.
pub const EVENT_SP: u32 = 0x101;
/// A negative edge on the FLAG input. Accepted.
pub const EVENT_FLAG: u32 = 0x102;
/// Port A pins changed. Emitted with the new pin levels.
pub const EVENT_PORT_A: u32 = 0x103;
/// Port B pins changed. Emitted with the new pin levels.
pub const EVENT_PORT_B: u32 = 0x104;

/// Timer A underflow
pub const REASON_TIMER_A: u32 = 0x01;
/// Timer B underflow
pub const REASON_TIMER_B: u32 = 0x02;
/// TOD alarm
pub const REASON_ALARM: u32 = 0x04;
/// Serial port
pub const REASON_SERIAL: u32 = 0x08;
/// FLAG line
pub const REASON_FLAG: u32 = 0x10;

/// What timer B counts, CRB bits 5-6.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimerBInput {
    Cycles,
    CntEdges,
    TimerA,
    TimerAWhileCnt,
}

impl TimerBInput {
    fn from_bits(bits: u8) -> Self {
        match bits & 0x03 {
            0 => TimerBInput::Cycles,
            1 => TimerBInput::CntEdges,
            2 => TimerBInput::TimerA,
            _ => TimerBInput::TimerAWhileCnt,
        }
    }

    fn bits(self) -> u8 {
        match self {
            TimerBInput::Cycles => 0,
            TimerBInput::CntEdges => 1,
            TimerBInput::TimerA => 2,
            TimerBInput::TimerAWhileCnt => 3,
        }
    }
}

/// How a timer shows on port B (PB6 for A, PB7 for B).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
struct Reflection {
    enabled: bool,
    toggle: bool,
    level: bool,
}

impl Reflection {
    /// Advances one tick given whether the timer underflowed.
    fn clock(&mut self, underflow: bool) {
        if self.toggle {
            if underflow {
                self.level = !self.level;
            }
        } else {
            self.level = underflow;
        }
    }
}

/// MOS 6526 Complex Interface Adapter.
pub struct Cia {
    id: ChipId,
    name: String,
    attributes: Attributes,
    registers: SubsetId,
    interrupt: InterruptOutput,
    tracker: CycleTracker,
    initialized: bool,
    error: Option<ChipError>,

    port_a: Port,
    port_b: Port,
    timer_a: Timer,
    timer_b: Timer,
    timer_a_counts_cnt: bool,
    timer_b_input: TimerBInput,
    reflect_a: Reflection,
    reflect_b: Reflection,
    clock: TodClock,
    tod_50hz: bool,
    alarm_writes: bool,
    serial: SerialPort,
    flag: LatchedFlag,
    flag_enabled: bool,
    cnt: bool,
    cnt_edge: bool,
    last_pins_a: u8,
    last_pins_b: u8,

    notifier: Notifier,
    input: EventQueue,
}

impl Cia {
    /// A CIA answering the register subset `registers` and raising
    /// `interrupt`.
    pub fn new(
        id: ChipId,
        name: impl Into<String>,
        registers: SubsetId,
        interrupt: InterruptId,
        region: Region,
    ) -> Self {
        Self {
            id,
            name: name.into(),
            attributes: Attributes::new()
                .with("Name", "CIA")
                .with("Code", "6526/6526A/8521")
                .with("Manufacturer", "Commodore Business Machines CBM")
                .with("Year", "1980"),
            registers,
            interrupt: InterruptOutput::new(interrupt),
            tracker: CycleTracker::new(),
            initialized: false,
            error: None,
            port_a: Port::new(),
            port_b: Port::new(),
            timer_a: Timer::new(0, RunMode::Reload, CountMode::Cycles),
            timer_b: Timer::new(1, RunMode::Reload, CountMode::Cycles),
            timer_a_counts_cnt: false,
            timer_b_input: TimerBInput::Cycles,
            reflect_a: Reflection::default(),
            reflect_b: Reflection::default(),
            clock: TodClock::new(region.tod_tenth_cycles()),
            tod_50hz: false,
            alarm_writes: false,
            serial: SerialPort::new(),
            flag: LatchedFlag::default(),
            flag_enabled: false,
            cnt: true,
            cnt_edge: false,
            last_pins_a: 0xFF,
            last_pins_b: 0xFF,
            notifier: Notifier::new(),
            input: EventQueue::new(),
        }
    }

    pub fn port_a(&self) -> &Port {
        &self.port_a
    }

    pub fn port_a_mut(&mut self) -> &mut Port {
        &mut self.port_a
    }

    pub fn port_b(&self) -> &Port {
        &self.port_b
    }

    pub fn port_b_mut(&mut self) -> &mut Port {
        &mut self.port_b
    }

    pub fn timer_a(&self) -> &Timer {
        &self.timer_a
    }

    pub fn timer_b(&self) -> &Timer {
        &self.timer_b
    }

    pub fn clock(&self) -> &TodClock {
        &self.clock
    }

    pub fn serial(&self) -> &SerialPort {
        &self.serial
    }

    pub fn timer_b_input(&self) -> TimerBInput {
        self.timer_b_input
    }

    pub fn interrupt(&self) -> &InterruptOutput {
        &self.interrupt
    }

    /// Subscribes this CIA to CNT, SP and FLAG events from another chip.
    #[must_use = "dropping the subscription unsubscribes immediately"]
    pub fn listen(&self, notifier: &Notifier) -> Subscription {
        self.input.listen(notifier)
    }

    /// Queues an input event directly, processed on the next simulate.
    pub fn push_event(&self, event: Event) {
        self.input.push(event);
    }

    /// VIC-II bank selected by port A bits 0-1 (active low), 0 to 3.
    pub fn vic_bank(&self) -> u8 {
        !self.port_a.value() & 0x03
    }

    /// Port B as the pins read, with timer reflection on PB6/PB7.
    fn port_b_value(&self) -> u8 {
        let mut value = self.port_b.value();
        if self.reflect_a.enabled {
            value = (value & !0x40) | if self.reflect_a.level { 0x40 } else { 0 };
        }
        if self.reflect_b.enabled {
            value = (value & !0x80) | if self.reflect_b.level { 0x80 } else { 0 };
        }
        value
    }

    /// Publishes port pin changes since the last call.
    fn notify_ports(&mut self) {
        let a = self.port_a.value();
        if a != self.last_pins_a {
            self.last_pins_a = a;
            self.notifier.notify(&Event::with_value(EVENT_PORT_A, a as i64));
        }
        let b = self.port_b_value();
        if b != self.last_pins_b {
            self.last_pins_b = b;
            self.notifier.notify(&Event::with_value(EVENT_PORT_B, b as i64));
        }
    }

    /// Enabled and pending sources, one bit each.
    fn reason(&self) -> u32 {
        let mut reason = 0;
        if self.timer_a.launch_interrupt() {
            reason |= REASON_TIMER_A;
        }
        if self.timer_b.launch_interrupt() {
            reason |= REASON_TIMER_B;
        }
        if self.clock.interrupt_requested() && self.clock.interrupt_enabled() {
            reason |= REASON_ALARM;
        }
        if self.serial.interrupt_requested() && self.serial.interrupt_enabled() {
            reason |= REASON_SERIAL;
        }
        if self.flag.peek() && self.flag_enabled {
            reason |= REASON_FLAG;
        }
        reason
    }

    fn icr_value(&self) -> u8 {
        let mut value = 0u8;
        if self.timer_a.interrupt_requested() {
            value |= 0x01;
        }
        if self.timer_b.interrupt_requested() {
            value |= 0x02;
        }
        if self.clock.interrupt_requested() {
            value |= 0x04;
        }
        if self.serial.interrupt_requested() {
            value |= 0x08;
        }
        if self.flag.peek() {
            value |= 0x10;
        }
        if self.reason() != 0 {
            value |= 0x80;
        }
        value
    }

    fn cra_value(&self) -> u8 {
        let mut value = 0u8;
        if self.timer_a.is_counting() {
            value |= 0x01;
        }
        if self.reflect_a.enabled {
            value |= 0x02;
        }
        if self.reflect_a.toggle {
            value |= 0x04;
        }
        if self.timer_a.run_mode() == RunMode::OneShot {
            value |= 0x08;
        }
        if self.timer_a_counts_cnt {
            value |= 0x20;
        }
        if self.serial.direction() == SerialDirection::Output {
            value |= 0x40;
        }
        if self.tod_50hz {
            value |= 0x80;
        }
        value
    }

    fn crb_value(&self) -> u8 {
        let mut value = 0u8;
        if self.timer_b.is_counting() {
            value |= 0x01;
        }
        if self.reflect_b.enabled {
            value |= 0x02;
        }
        if self.reflect_b.toggle {
            value |= 0x04;
        }
        if self.timer_b.run_mode() == RunMode::OneShot {
            value |= 0x08;
        }
        value |= self.timer_b_input.bits() << 5;
        if self.alarm_writes {
            value |= 0x80;
        }
        value
    }

    fn write_control(timer: &mut Timer, reflection: &mut Reflection, value: u8) {
        if value & 0x01 != 0 && !timer.is_counting() {
            reflection.level = true;
        }
        reflection.enabled = value & 0x02 != 0;
        reflection.toggle = value & 0x04 != 0;
        timer.set_run_mode(if value & 0x08 != 0 {
            RunMode::OneShot
        } else {
            RunMode::Reload
        });
        if value & 0x10 != 0 {
            timer.reload();
        }
        if value & 0x01 != 0 {
            timer.start();
        } else {
            timer.stop();
        }
    }

    fn process_events(&mut self) {
        for event in self.input.drain() {
            match event.id {
                EVENT_CNT => {
                    let level = event.value == 1;
                    if level && !self.cnt {
                        self.cnt_edge = true;
                    }
                    self.cnt = level;
                    self.serial.set_cnt(level);
                }
                EVENT_SP => self.serial.set_sp(event.value == 1),
                EVENT_FLAG => self.flag.set(),
                _ => {}
            }
        }
    }

    /// One CPU cycle.
    fn tick(&mut self) {
        let cnt_edge = std::mem::take(&mut self.cnt_edge);

        let a_underflow = self.timer_a.clock(cnt_edge);
        self.reflect_a.clock(a_underflow);

        let b_pulse = match self.timer_b_input {
            TimerBInput::Cycles => true,
            TimerBInput::CntEdges => cnt_edge,
            TimerBInput::TimerA => a_underflow,
            TimerBInput::TimerAWhileCnt => a_underflow && self.cnt,
        };
        let b_underflow = self.timer_b.clock(b_pulse);
        self.reflect_b.clock(b_underflow);

        self.clock.tick();

        // Output shifts at half of a free-running timer A period
        if self.timer_a.reaches_half() && self.timer_a.run_mode() == RunMode::Reload {
            for change in self.serial.timer_half_period() {
                let event = match change {
                    SerialOutput::Cnt(level) => Event::with_value(EVENT_CNT, level as i64),
                    SerialOutput::Sp(level) => Event::with_value(EVENT_SP, level as i64),
                };
                self.notifier.notify(&event);
            }
        }

        if self.reflect_a.enabled || self.reflect_b.enabled {
            self.notify_ports();
        }
    }
}

impl Chip for Cia {
    fn id(&self) -> ChipId {
        self.id
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn attributes(&self) -> &Attributes {
        &self.attributes
    }

    fn initialize(&mut self, memory: &mut Memory) -> Result<(), InitializationError> {
        let subset = memory
            .subset(self.registers)
            .ok_or(InitializationError::SubsetNotFound(self.registers))?;
        if !matches!(subset.kind(), SubsetKind::Registers { .. }) {
            return Err(InitializationError::MissingRegisters {
                chip: self.name.clone(),
                subset: self.registers,
            });
        }
        memory.attach_chip(self.registers, self.id)?;

        self.port_a = Port::new();
        self.port_b = Port::new();
        self.timer_a.initialize();
        self.timer_b.initialize();
        self.timer_a_counts_cnt = false;
        self.timer_b_input = TimerBInput::Cycles;
        self.reflect_a = Reflection::default();
        self.reflect_b = Reflection::default();
        self.clock.initialize();
        self.tod_50hz = false;
        self.alarm_writes = false;
        self.serial.initialize();
        self.flag.clear();
        self.flag_enabled = false;
        self.cnt = true;
        self.cnt_edge = false;
        self.last_pins_a = self.port_a.value();
        self.last_pins_b = self.port_b_value();
        self.input.drain();
        self.interrupt.reset();
        self.tracker.reset(0);
        self.error = None;
        self.initialized = true;
        debug!("{}: initialized on registers {}", self.name, self.registers);
        Ok(())
    }

    fn simulate(&mut self, cpu: &mut dyn Cpu, _memory: &mut Memory) -> Result<(), ChipError> {
        if !self.initialized {
            let e = ChipError::NotInitialized(self.name.clone());
            self.error = Some(e.clone());
            return Err(e);
        }

        self.process_events();

        let now = cpu.clock_cycles();
        let ticks = self.tracker.advance(now);
        for remaining in (0..ticks).rev() {
            self.tick();
            let reason = self.reason();
            self.interrupt.update(cpu, self.id, reason, now - remaining);
        }
        Ok(())
    }

    fn set_value(&mut self, offset: u16, value: u8) {
        match offset & 0x0F {
            0x00 => self.port_a.set_output(value),
            0x01 => self.port_b.set_output(value),
            0x02 => self.port_a.set_direction(value),
            0x03 => self.port_b.set_direction(value),
            0x04 => {
                let latch = (self.timer_a.initial_value() & 0xFF00) | value as u16;
                self.timer_a.set_initial_value(latch);
            }
            0x05 => {
                let latch = (self.timer_a.initial_value() & 0x00FF) | ((value as u16) << 8);
                self.timer_a.set_initial_value(latch);
                if !self.timer_a.is_counting() {
                    self.timer_a.reload();
                }
            }
            0x06 => {
                let latch = (self.timer_b.initial_value() & 0xFF00) | value as u16;
                self.timer_b.set_initial_value(latch);
            }
            0x07 => {
                let latch = (self.timer_b.initial_value() & 0x00FF) | ((value as u16) << 8);
                self.timer_b.set_initial_value(latch);
                if !self.timer_b.is_counting() {
                    self.timer_b.reload();
                }
            }
            r @ 0x08..=0x0B => {
                self.clock
                    .write_register((r - 0x08) as usize, value, self.alarm_writes)
            }
            0x0C => self.serial.set_value(value),
            0x0D => {
                // Bit 7 chooses between setting and clearing the named bits
                let on = value & 0x80 != 0;
                if value & 0x01 != 0 {
                    self.timer_a.set_interrupt_enabled(on);
                }
                if value & 0x02 != 0 {
                    self.timer_b.set_interrupt_enabled(on);
                }
                if value & 0x04 != 0 {
                    self.clock.set_interrupt_enabled(on);
                }
                if value & 0x08 != 0 {
                    self.serial.set_interrupt_enabled(on);
                }
                if value & 0x10 != 0 {
                    self.flag_enabled = on;
                }
            }
            0x0E => {
                Self::write_control(&mut self.timer_a, &mut self.reflect_a, value);
                self.timer_a_counts_cnt = value & 0x20 != 0;
                self.timer_a.set_count_mode(if self.timer_a_counts_cnt {
                    CountMode::Pulses
                } else {
                    CountMode::Cycles
                });
                self.serial.set_direction(if value & 0x40 != 0 {
                    SerialDirection::Output
                } else {
                    SerialDirection::Input
                });
                self.tod_50hz = value & 0x80 != 0;
            }
            _ => {
                Self::write_control(&mut self.timer_b, &mut self.reflect_b, value);
                self.timer_b_input = TimerBInput::from_bits(value >> 5);
                self.timer_b.set_count_mode(if self.timer_b_input == TimerBInput::Cycles {
                    CountMode::Cycles
                } else {
                    CountMode::Pulses
                });
                self.alarm_writes = value & 0x80 != 0;
            }
        }
        self.notify_ports();
    }

    fn read_value(&mut self, offset: u16) -> u8 {
        match offset & 0x0F {
            r @ 0x08..=0x0B => self.clock.read_register((r - 0x08) as usize),
            0x0D => {
                let value = self.icr_value();
                self.timer_a.take_interrupt_request();
                self.timer_b.take_interrupt_request();
                self.clock.take_interrupt_request();
                self.serial.take_interrupt_request();
                self.flag.clear();
                value
            }
            other => self.peek_value(other),
        }
    }

    fn peek_value(&self, offset: u16) -> u8 {
        match offset & 0x0F {
            0x00 => self.port_a.value(),
            0x01 => self.port_b_value(),
            0x02 => self.port_a.direction(),
            0x03 => self.port_b.direction(),
            0x04 => self.timer_a.current_value() as u8,
            0x05 => (self.timer_a.current_value() >> 8) as u8,
            0x06 => self.timer_b.current_value() as u8,
            0x07 => (self.timer_b.current_value() >> 8) as u8,
            r @ 0x08..=0x0B => self.clock.peek_register((r - 0x08) as usize),
            0x0C => self.serial.value(),
            0x0D => self.icr_value(),
            0x0E => self.cra_value(),
            _ => self.crb_value(),
        }
    }

    fn notifier(&self) -> Option<&Notifier> {
        Some(&self.notifier)
    }

    fn error(&self) -> Option<&ChipError> {
        self.error.as_ref()
    }

    fn info(&self) -> InfoStructure {
        self.attributes
            .info()
            .with("port A", format!("${:02X}", self.port_a.value()))
            .with("port B", format!("${:02X}", self.port_b_value()))
            .with("DDR A", format!("${:02X}", self.port_a.direction()))
            .with("DDR B", format!("${:02X}", self.port_b.direction()))
            .with("ICR", format!("${:02X}", self.icr_value()))
            .with_child("timer A", self.timer_a.info())
            .with_child("timer B", self.timer_b.info())
            .with_child("clock", self.clock.info())
            .with_child("serial port", self.serial.info())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
