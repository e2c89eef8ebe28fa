//! # VIA (MOS 6522) Versatile Interface Adapter
//!
//! Two 8-bit ports with handshake lines, two 16-bit timers and a shift
//! register. Used in pairs by the VIC-20 and in the 1541 drive.
//!
//! ## Registers
//!
//! | Offset | Write                         | Read                          |
//! |--------|-------------------------------|-------------------------------|
//! | $0     | ORB                           | IRB                           |
//! | $1     | ORA, with handshake           | IRA, with handshake           |
//! | $2/$3  | DDRB / DDRA                   | DDRB / DDRA                   |
//! | $4     | T1 latch low                  | T1 counter low, clears T1 IRQ |
//! | $5     | T1 latch high, load and start | T1 counter high               |
//! | $6/$7  | T1 latch low / high           | T1 latch low / high           |
//! | $8     | T2 latch low                  | T2 counter low, clears T2 IRQ |
//! | $9     | T2 high, load and start       | T2 counter high               |
//! | $A     | SR                            | SR                            |
//! | $B     | ACR                           | ACR                           |
//! | $C     | PCR                           | PCR                           |
//! | $D     | IFR, 1 bits clear flags       | IFR, bit 7 = any enabled      |
//! | $E     | IER, bit 7 sets or clears     | IER, bit 7 reads 1            |
//! | $F     | ORA, no handshake             | IRA, no handshake             |
//!
//! The interrupt output carries `IFR & IER` as its reason code.

mod lines;
mod shift;

pub use lines::{ActiveEdge, Cx2Mode, EdgeLine, HandshakeLine};
pub use shift::{ShiftMode, ShiftRegister};

use std::any::Any;

use log::debug;

use lib8bit::{
    Attributes, Chip, ChipError, ChipId, CountMode, Cpu, CycleTracker, Event, EventQueue,
    InfoStructure, InitializationError, InterruptId, InterruptOutput, Memory, Notifier, RunMode,
    Subscription, SubsetId, SubsetKind, Timer,
};

use crate::port::Port;

/// CA1 level. Accepted.
pub const EVENT_CA1: u32 = 0x200;
/// CA2 level. Accepted in input modes, emitted in output modes.
pub const EVENT_CA2: u32 = 0x201;
/// CB1 level. Accepted.
pub const EVENT_CB1: u32 = 0x202;
/// CB2 level. Accepted in input modes, emitted in output modes and by the
/// shift register.
pub const EVENT_CB2: u32 = 0x203;
/// Levels driven into port A from outside. Accepted.
pub const EVENT_PORT_A_INPUT: u32 = 0x204;
/// Levels driven into port B from outside. Accepted.
pub const EVENT_PORT_B_INPUT: u32 = 0x205;
/// Port A pins changed. Emitted with the new pin levels.
pub const EVENT_PORT_A: u32 = 0x206;
/// Port B pins changed. Emitted with the new pin levels.
pub const EVENT_PORT_B: u32 = 0x207;

pub const IFR_CA2: u8 = 0x01;
pub const IFR_CA1: u8 = 0x02;
pub const IFR_SR: u8 = 0x04;
pub const IFR_CB2: u8 = 0x08;
pub const IFR_CB1: u8 = 0x10;
pub const IFR_T2: u8 = 0x20;
pub const IFR_T1: u8 = 0x40;

/// MOS 6522 Versatile Interface Adapter.
pub struct Via {
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
    latch_a: Option<u8>,
    latch_b: Option<u8>,
    acr: u8,
    ca1: EdgeLine,
    ca2: HandshakeLine,
    cb1: EdgeLine,
    cb2: HandshakeLine,
    timer1: Timer,
    timer2: Timer,
    pb7: bool,
    pb6_edge: bool,
    shift: ShiftRegister,
    last_pins_a: u8,
    last_pins_b: u8,

    notifier: Notifier,
    input: EventQueue,
}

impl Via {
    pub fn new(
        id: ChipId,
        name: impl Into<String>,
        registers: SubsetId,
        interrupt: InterruptId,
    ) -> Self {
        Self {
            id,
            name: name.into(),
            attributes: Attributes::new()
                .with("Name", "VIA")
                .with("Code", "6522")
                .with("Manufacturer", "MOS Technology")
                .with("Year", "1977"),
            registers,
            interrupt: InterruptOutput::new(interrupt),
            tracker: CycleTracker::new(),
            initialized: false,
            error: None,
            port_a: Port::new(),
            port_b: Port::new(),
            latch_a: None,
            latch_b: None,
            acr: 0x00,
            ca1: EdgeLine::new(),
            ca2: HandshakeLine::new(),
            cb1: EdgeLine::new(),
            cb2: HandshakeLine::new(),
            timer1: Timer::new(0, RunMode::OneShot, CountMode::Cycles),
            timer2: Timer::new(1, RunMode::OneShot, CountMode::Cycles),
            pb7: true,
            pb6_edge: false,
            shift: ShiftRegister::new(),
            last_pins_a: 0xFF,
            last_pins_b: 0xFF,
            notifier: Notifier::new(),
            input: EventQueue::new(),
        }
    }

    pub fn port_a(&self) -> &Port {
        &self.port_a
    }

    pub fn port_b(&self) -> &Port {
        &self.port_b
    }

    pub fn timer1(&self) -> &Timer {
        &self.timer1
    }

    pub fn timer2(&self) -> &Timer {
        &self.timer2
    }

    pub fn shift_register(&self) -> &ShiftRegister {
        &self.shift
    }

    pub fn ca2(&self) -> &HandshakeLine {
        &self.ca2
    }

    pub fn cb2(&self) -> &HandshakeLine {
        &self.cb2
    }

    pub fn interrupt(&self) -> &InterruptOutput {
        &self.interrupt
    }

    /// Subscribes this VIA to line and port events from another chip.
    #[must_use = "dropping the subscription unsubscribes immediately"]
    pub fn listen(&self, notifier: &Notifier) -> Subscription {
        self.input.listen(notifier)
    }

    /// Queues an input event directly, processed on the next simulate.
    pub fn push_event(&self, event: Event) {
        self.input.push(event);
    }

    fn pb7_output(&self) -> bool {
        self.acr & 0x80 != 0
    }

    fn latching_a(&self) -> bool {
        self.acr & 0x01 != 0
    }

    fn latching_b(&self) -> bool {
        self.acr & 0x02 != 0
    }

    fn pins_a(&self) -> u8 {
        self.port_a.value()
    }

    fn pins_b(&self) -> u8 {
        let value = self.port_b.value();
        if self.pb7_output() {
            (value & 0x7F) | if self.pb7 { 0x80 } else { 0 }
        } else {
            value
        }
    }

    fn ira(&self) -> u8 {
        match self.latch_a {
            Some(latched) if self.latching_a() => latched,
            _ => self.pins_a(),
        }
    }

    fn irb(&self) -> u8 {
        let direction = self.port_b.direction();
        let input = match self.latch_b {
            Some(latched) if self.latching_b() => latched,
            _ => self.pins_b(),
        };
        // Output bits always read the output register
        let output = if self.pb7_output() {
            self.pins_b()
        } else {
            self.port_b.output()
        };
        (input & !direction) | (output & direction)
    }

    fn ifr(&self) -> u8 {
        let mut value = 0u8;
        if self.ca2.flag() {
            value |= IFR_CA2;
        }
        if self.ca1.flag() {
            value |= IFR_CA1;
        }
        if self.shift.flag() {
            value |= IFR_SR;
        }
        if self.cb2.flag() {
            value |= IFR_CB2;
        }
        if self.cb1.flag() {
            value |= IFR_CB1;
        }
        if self.timer2.interrupt_requested() {
            value |= IFR_T2;
        }
        if self.timer1.interrupt_requested() {
            value |= IFR_T1;
        }
        if value & self.ier() != 0 {
            value |= 0x80;
        }
        value
    }

    fn ier(&self) -> u8 {
        let mut value = 0u8;
        if self.ca2.interrupt_enabled() {
            value |= IFR_CA2;
        }
        if self.ca1.interrupt_enabled() {
            value |= IFR_CA1;
        }
        if self.shift.interrupt_enabled() {
            value |= IFR_SR;
        }
        if self.cb2.interrupt_enabled() {
            value |= IFR_CB2;
        }
        if self.cb1.interrupt_enabled() {
            value |= IFR_CB1;
        }
        if self.timer2.interrupt_enabled() {
            value |= IFR_T2;
        }
        if self.timer1.interrupt_enabled() {
            value |= IFR_T1;
        }
        value
    }

    fn pcr(&self) -> u8 {
        let mut value = self.ca2.mode().bits() << 1 | self.cb2.mode().bits() << 5;
        if self.ca1.active_edge() == ActiveEdge::Positive {
            value |= 0x01;
        }
        if self.cb1.active_edge() == ActiveEdge::Positive {
            value |= 0x10;
        }
        value
    }

    fn notify_line(&self, id: u32, level: Option<bool>) {
        if let Some(level) = level {
            self.notifier.notify(&Event::with_value(id, level as i64));
        }
    }

    /// Publishes port pin changes since the last call.
    fn notify_ports(&mut self) {
        let a = self.pins_a();
        if a != self.last_pins_a {
            self.last_pins_a = a;
            self.notifier.notify(&Event::with_value(EVENT_PORT_A, a as i64));
        }
        let b = self.pins_b();
        if b != self.last_pins_b {
            self.last_pins_b = b;
            self.notifier.notify(&Event::with_value(EVENT_PORT_B, b as i64));
        }
    }

    fn set_ca1(&mut self, level: bool) {
        if self.ca1.set_level(level) {
            if self.latching_a() {
                self.latch_a = Some(self.pins_a());
            }
            let change = self.ca2.companion_edge();
            self.notify_line(EVENT_CA2, change);
        }
    }

    fn set_cb1(&mut self, level: bool) {
        if self.cb1.set_level(level) {
            if self.latching_b() {
                self.latch_b = Some(self.pins_b());
            }
            let change = self.cb2.companion_edge();
            self.notify_line(EVENT_CB2, change);
        }
        let cb2 = self.cb2.level();
        let out = self.shift.cb1_edge(level, cb2);
        self.notify_line(EVENT_CB2, out);
    }

    fn process_events(&mut self) {
        for event in self.input.drain() {
            let level = event.value != 0;
            match event.id {
                EVENT_CA1 => self.set_ca1(level),
                EVENT_CA2 => self.ca2.set_input(level),
                EVENT_CB1 => self.set_cb1(level),
                EVENT_CB2 => self.cb2.set_input(level),
                EVENT_PORT_A_INPUT => self.port_a.set_external(event.value as u8),
                EVENT_PORT_B_INPUT => {
                    let before = self.port_b.external();
                    let after = event.value as u8;
                    if before & 0x40 != 0 && after & 0x40 == 0 {
                        self.pb6_edge = true;
                    }
                    self.port_b.set_external(after);
                }
                _ => {}
            }
        }
    }

    fn write_acr(&mut self, value: u8) {
        self.acr = value;
        self.timer1.set_run_mode(if value & 0x40 != 0 {
            RunMode::Reload
        } else {
            RunMode::OneShot
        });
        self.timer2.set_count_mode(if value & 0x20 != 0 {
            CountMode::Pulses
        } else {
            CountMode::Cycles
        });
        let shift = ShiftMode::from_bits(value >> 2);
        // The shift register needs timer 2 to keep reloading
        if shift.uses_timer2() {
            self.timer2.set_run_mode(RunMode::Reload);
        } else {
            self.timer2.set_run_mode(RunMode::OneShot);
        }
        self.shift.set_mode(shift);
        if !self.latching_a() {
            self.latch_a = None;
        }
        if !self.latching_b() {
            self.latch_b = None;
        }
    }

    fn write_pcr(&mut self, value: u8) {
        self.ca1.set_pcr_bit(value & 0x01 != 0);
        let ca2 = self.ca2.set_mode(Cx2Mode::from_bits(value >> 1));
        self.notify_line(EVENT_CA2, ca2);
        self.cb1.set_pcr_bit(value & 0x10 != 0);
        let cb2 = self.cb2.set_mode(Cx2Mode::from_bits(value >> 5));
        self.notify_line(EVENT_CB2, cb2);
    }

    fn port_a_access(&mut self, handshake: bool) {
        self.ca1.clear_flag();
        let change = self.ca2.port_access(handshake);
        self.notify_line(EVENT_CA2, change);
    }

    /// Only writes start a CB2 handshake.
    fn port_b_access(&mut self, write: bool) {
        self.cb1.clear_flag();
        let change = self.cb2.port_access(write);
        self.notify_line(EVENT_CB2, change);
    }

    /// One system clock cycle.
    fn tick(&mut self) {
        let ca2 = self.ca2.tick();
        self.notify_line(EVENT_CA2, ca2);
        let cb2 = self.cb2.tick();
        self.notify_line(EVENT_CB2, cb2);

        if self.timer1.clock(false) {
            if self.timer1.run_mode() == RunMode::Reload {
                self.pb7 = !self.pb7;
            } else {
                self.pb7 = true;
            }
        }

        let pulse = std::mem::take(&mut self.pb6_edge);
        self.timer2.clock(pulse);

        let cb2_in = self.cb2.level();
        let out = self.shift.tick(self.timer2.reaches_zero_low_byte(), cb2_in);
        self.notify_line(EVENT_CB2, out);

        self.notify_ports();
    }
}

impl Chip for Via {
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
        self.latch_a = None;
        self.latch_b = None;
        self.acr = 0x00;
        self.ca1 = EdgeLine::new();
        self.ca2 = HandshakeLine::new();
        self.cb1 = EdgeLine::new();
        self.cb2 = HandshakeLine::new();
        self.timer1.initialize();
        self.timer2.initialize();
        self.pb7 = true;
        self.pb6_edge = false;
        self.shift = ShiftRegister::new();
        self.last_pins_a = self.pins_a();
        self.last_pins_b = self.pins_b();
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
            let reason = (self.ifr() & self.ier()) as u32;
            self.interrupt.update(cpu, self.id, reason, now - remaining);
        }
        Ok(())
    }

    fn set_value(&mut self, offset: u16, value: u8) {
        match offset & 0x0F {
            0x00 => {
                self.port_b.set_output(value);
                self.port_b_access(true);
            }
            0x01 => {
                self.port_a.set_output(value);
                self.port_a_access(true);
            }
            0x02 => self.port_b.set_direction(value),
            0x03 => self.port_a.set_direction(value),
            0x04 | 0x06 => {
                let latch = (self.timer1.initial_value() & 0xFF00) | value as u16;
                self.timer1.set_initial_value(latch);
            }
            0x05 => {
                let latch = (self.timer1.initial_value() & 0x00FF) | ((value as u16) << 8);
                self.timer1.set_initial_value(latch);
                self.timer1.take_interrupt_request();
                self.timer1.reload();
                self.timer1.start();
                if self.pb7_output() {
                    self.pb7 = false;
                }
            }
            0x07 => {
                let latch = (self.timer1.initial_value() & 0x00FF) | ((value as u16) << 8);
                self.timer1.set_initial_value(latch);
                self.timer1.take_interrupt_request();
            }
            0x08 => {
                let latch = (self.timer2.initial_value() & 0xFF00) | value as u16;
                self.timer2.set_initial_value(latch);
            }
            0x09 => {
                let latch = (self.timer2.initial_value() & 0x00FF) | ((value as u16) << 8);
                self.timer2.set_initial_value(latch);
                self.timer2.take_interrupt_request();
                self.timer2.reload();
                self.timer2.start();
            }
            0x0A => self.shift.write(value),
            0x0B => self.write_acr(value),
            0x0C => self.write_pcr(value),
            0x0D => {
                if value & IFR_CA2 != 0 {
                    self.ca2.clear_flag();
                }
                if value & IFR_CA1 != 0 {
                    self.ca1.clear_flag();
                }
                if value & IFR_SR != 0 {
                    self.shift.clear_flag();
                }
                if value & IFR_CB2 != 0 {
                    self.cb2.clear_flag();
                }
                if value & IFR_CB1 != 0 {
                    self.cb1.clear_flag();
                }
                if value & IFR_T2 != 0 {
                    self.timer2.take_interrupt_request();
                }
                if value & IFR_T1 != 0 {
                    self.timer1.take_interrupt_request();
                }
            }
            0x0E => {
                let on = value & 0x80 != 0;
                if value & IFR_CA2 != 0 {
                    self.ca2.set_interrupt_enabled(on);
                }
                if value & IFR_CA1 != 0 {
                    self.ca1.set_interrupt_enabled(on);
                }
                if value & IFR_SR != 0 {
                    self.shift.set_interrupt_enabled(on);
                }
                if value & IFR_CB2 != 0 {
                    self.cb2.set_interrupt_enabled(on);
                }
                if value & IFR_CB1 != 0 {
                    self.cb1.set_interrupt_enabled(on);
                }
                if value & IFR_T2 != 0 {
                    self.timer2.set_interrupt_enabled(on);
                }
                if value & IFR_T1 != 0 {
                    self.timer1.set_interrupt_enabled(on);
                }
            }
            _ => self.port_a.set_output(value),
        }
        self.notify_ports();
    }

    fn read_value(&mut self, offset: u16) -> u8 {
        match offset & 0x0F {
            0x00 => {
                let value = self.irb();
                self.port_b_access(false);
                value
            }
            0x01 => {
                let value = self.ira();
                self.port_a_access(true);
                value
            }
            0x04 => {
                self.timer1.take_interrupt_request();
                self.timer1.current_value() as u8
            }
            0x08 => {
                self.timer2.take_interrupt_request();
                self.timer2.current_value() as u8
            }
            0x0A => self.shift.read(),
            other => self.peek_value(other),
        }
    }

    fn peek_value(&self, offset: u16) -> u8 {
        match offset & 0x0F {
            0x00 => self.irb(),
            0x01 | 0x0F => self.ira(),
            0x02 => self.port_b.direction(),
            0x03 => self.port_a.direction(),
            0x04 => self.timer1.current_value() as u8,
            0x05 => (self.timer1.current_value() >> 8) as u8,
            0x06 => self.timer1.initial_value() as u8,
            0x07 => (self.timer1.initial_value() >> 8) as u8,
            0x08 => self.timer2.current_value() as u8,
            0x09 => (self.timer2.current_value() >> 8) as u8,
            0x0A => self.shift.peek(),
            0x0B => self.acr,
            0x0C => self.pcr(),
            0x0D => self.ifr(),
            _ => self.ier() | 0x80,
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
            .with("port A", format!("${:02X}", self.pins_a()))
            .with("port B", format!("${:02X}", self.pins_b()))
            .with("ACR", format!("${:02X}", self.acr))
            .with("PCR", format!("${:02X}", self.pcr()))
            .with("IFR", format!("${:02X}", self.ifr()))
            .with("IER", format!("${:02X}", self.ier()))
            .with_child("timer 1", self.timer1.info())
            .with_child("timer 2", self.timer2.info())
            .with_child("shift register", self.shift.info())
            .with_child("CA1", self.ca1.info())
            .with_child("CA2", self.ca2.info())
            .with_child("CB1", self.cb1.info())
            .with_child("CB2", self.cb2.info())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
