//! # TED (MOS 7360/8360) timers and interrupts
//!
//! The C16/Plus4 TED combines video, sound and three 16-bit timers. This
//! model covers the timers and the interrupt block:
//!
//! | Offset  | Register                                              |
//! |---------|-------------------------------------------------------|
//! | $00/$01 | Timer 1 low / high                                    |
//! | $02/$03 | Timer 2 low / high                                    |
//! | $04/$05 | Timer 3 low / high                                    |
//! | $09     | Interrupt flags, writing 1 clears; bit 7 = any active |
//! | $0A     | Interrupt enable; bit 0 = raster compare bit 8        |
//! | $0B     | Raster compare low                                    |
//! | $1C/$1D | Current raster line high / low                        |
//!
//! Writing a timer's low byte stops it; writing the high byte starts it.
//! Timer 1 reloads the value last written; timers 2 and 3 keep counting down
//! through $FFFF.
//!
//! The other registers of the 64-byte block hold what was last written.

use std::any::Any;

use log::debug;

use lib8bit::{
    Attributes, Chip, ChipError, ChipId, CountMode, Cpu, CycleTracker, InfoStructure,
    InitializationError, InterruptId, InterruptOutput, Memory, RunMode, SubsetId, SubsetKind,
    Timer,
};

use crate::region::Region;

pub const IRQ_RASTER: u8 = 0x02;
pub const IRQ_LIGHT_PEN: u8 = 0x04;
pub const IRQ_TIMER1: u8 = 0x08;
pub const IRQ_TIMER2: u8 = 0x10;
pub const IRQ_TIMER3: u8 = 0x40;

/// CPU single-clock cycles per raster line.
const CYCLES_PER_LINE: u16 = 57;

pub struct Ted {
    id: ChipId,
    name: String,
    attributes: Attributes,
    registers_subset: SubsetId,
    region: Region,
    interrupt: InterruptOutput,
    tracker: CycleTracker,
    initialized: bool,
    error: Option<ChipError>,

    registers: [u8; 0x40],
    timers: [Timer; 3],
    raster: u16,
    cycle_in_line: u16,
    raster_flag: bool,
    light_pen_flag: bool,
    irq_enable: u8,
}

impl Ted {
    pub fn new(
        id: ChipId,
        name: impl Into<String>,
        registers: SubsetId,
        interrupt: InterruptId,
        region: Region,
    ) -> Self {
        let code = match region {
            Region::Pal => "8360",
            Region::Ntsc => "7360",
        };
        Self {
            id,
            name: name.into(),
            attributes: Attributes::new()
                .with("Name", "TED")
                .with("Code", code)
                .with("Manufacturer", "Commodore Business Machines CBM")
                .with("Year", "1984"),
            registers_subset: registers,
            region,
            interrupt: InterruptOutput::new(interrupt),
            tracker: CycleTracker::new(),
            initialized: false,
            error: None,
            registers: [0; 0x40],
            timers: Self::power_on_timers(),
            raster: 0,
            cycle_in_line: 0,
            raster_flag: false,
            light_pen_flag: false,
            irq_enable: 0,
        }
    }

    fn power_on_timers() -> [Timer; 3] {
        [
            Timer::new(1, RunMode::Reload, CountMode::Cycles),
            Timer::new(2, RunMode::Continuous, CountMode::Cycles),
            Timer::new(3, RunMode::Continuous, CountMode::Cycles),
        ]
    }

    /// Timer 1, 2 or 3.
    pub fn timer(&self, number: usize) -> Option<&Timer> {
        number.checked_sub(1).and_then(|i| self.timers.get(i))
    }

    pub fn raster(&self) -> u16 {
        self.raster
    }

    /// Raster lines per frame.
    pub fn raster_lines(&self) -> u16 {
        match self.region {
            Region::Pal => 312,
            Region::Ntsc => 262,
        }
    }

    pub fn raster_compare(&self) -> u16 {
        ((self.irq_enable as u16 & 0x01) << 8) | self.registers[0x0B] as u16
    }

    /// Latches a light pen interrupt reported by the front end.
    pub fn trigger_light_pen(&mut self) {
        self.light_pen_flag = true;
    }

    fn flags(&self) -> u8 {
        let mut value = 0u8;
        if self.raster_flag {
            value |= IRQ_RASTER;
        }
        if self.light_pen_flag {
            value |= IRQ_LIGHT_PEN;
        }
        for (timer, bit) in self.timers.iter().zip([IRQ_TIMER1, IRQ_TIMER2, IRQ_TIMER3]) {
            if timer.interrupt_requested() {
                value |= bit;
            }
        }
        value
    }

    fn reason(&self) -> u8 {
        self.flags() & self.irq_enable & 0x5E
    }

    fn check_raster(&mut self) {
        if self.raster == self.raster_compare() {
            self.raster_flag = true;
        }
    }

    /// Low byte write: stops the timer.
    fn write_timer_low(&mut self, index: usize, value: u8) {
        let timer = &mut self.timers[index];
        timer.stop();
        let latch = (timer.initial_value() & 0xFF00) | value as u16;
        timer.load(latch);
    }

    /// High byte write: starts the timer.
    fn write_timer_high(&mut self, index: usize, value: u8) {
        let timer = &mut self.timers[index];
        let latch = (timer.initial_value() & 0x00FF) | ((value as u16) << 8);
        timer.load(latch);
        timer.start();
    }

    fn tick(&mut self) {
        for timer in &mut self.timers {
            timer.clock(false);
        }

        self.cycle_in_line += 1;
        if self.cycle_in_line < CYCLES_PER_LINE {
            return;
        }
        self.cycle_in_line = 0;
        self.raster += 1;
        if self.raster >= self.raster_lines() {
            self.raster = 0;
        }
        self.check_raster();
    }
}

impl Chip for Ted {
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
            .subset(self.registers_subset)
            .ok_or(InitializationError::SubsetNotFound(self.registers_subset))?;
        if !matches!(subset.kind(), SubsetKind::Registers { .. }) {
            return Err(InitializationError::MissingRegisters {
                chip: self.name.clone(),
                subset: self.registers_subset,
            });
        }
        memory.attach_chip(self.registers_subset, self.id)?;

        self.registers = [0; 0x40];
        for timer in &mut self.timers {
            timer.initialize();
        }
        self.raster = 0;
        self.cycle_in_line = 0;
        self.raster_flag = false;
        self.light_pen_flag = false;
        self.irq_enable = 0;
        self.interrupt.reset();
        self.tracker.reset(0);
        self.error = None;
        self.initialized = true;
        debug!("{}: initialized, {:?} timing", self.name, self.region);
        Ok(())
    }

    fn simulate(&mut self, cpu: &mut dyn Cpu, _memory: &mut Memory) -> Result<(), ChipError> {
        if !self.initialized {
            let e = ChipError::NotInitialized(self.name.clone());
            self.error = Some(e.clone());
            return Err(e);
        }

        let now = cpu.clock_cycles();
        let ticks = self.tracker.advance(now);
        for remaining in (0..ticks).rev() {
            self.tick();
            let reason = self.reason() as u32;
            self.interrupt.update(cpu, self.id, reason, now - remaining);
        }
        Ok(())
    }

    fn set_value(&mut self, offset: u16, value: u8) {
        let offset = (offset & 0x3F) as usize;
        match offset {
            0x00 | 0x02 | 0x04 => self.write_timer_low(offset / 2, value),
            0x01 | 0x03 | 0x05 => self.write_timer_high(offset / 2, value),
            0x09 => {
                if value & IRQ_RASTER != 0 {
                    self.raster_flag = false;
                }
                if value & IRQ_LIGHT_PEN != 0 {
                    self.light_pen_flag = false;
                }
                for (timer, bit) in self.timers.iter_mut().zip([IRQ_TIMER1, IRQ_TIMER2, IRQ_TIMER3]) {
                    if value & bit != 0 {
                        timer.take_interrupt_request();
                    }
                }
            }
            0x0A => {
                self.irq_enable = value;
                for (timer, bit) in self.timers.iter_mut().zip([IRQ_TIMER1, IRQ_TIMER2, IRQ_TIMER3]) {
                    timer.set_interrupt_enabled(value & bit != 0);
                }
                self.check_raster();
            }
            0x0B => {
                self.registers[0x0B] = value;
                self.check_raster();
            }
            0x1C => self.raster = ((value as u16 & 0x01) << 8) | (self.raster & 0xFF),
            0x1D => self.raster = (self.raster & 0x100) | value as u16,
            _ => self.registers[offset] = value,
        }
    }

    fn read_value(&mut self, offset: u16) -> u8 {
        self.peek_value(offset)
    }

    fn peek_value(&self, offset: u16) -> u8 {
        let offset = (offset & 0x3F) as usize;
        match offset {
            0x00..=0x05 => {
                let value = self.timers[offset / 2].current_value();
                if offset % 2 == 0 {
                    value as u8
                } else {
                    (value >> 8) as u8
                }
            }
            0x09 => {
                let mut value = self.flags() | 0x21;
                if self.reason() != 0 {
                    value |= 0x80;
                }
                value
            }
            0x0A => self.irq_enable,
            0x1C => 0xFE | (self.raster >> 8) as u8,
            0x1D => self.raster as u8,
            _ => self.registers[offset],
        }
    }

    fn error(&self) -> Option<&ChipError> {
        self.error.as_ref()
    }

    fn info(&self) -> InfoStructure {
        let mut info = self
            .attributes
            .info()
            .with("raster", self.raster)
            .with("raster compare", self.raster_compare())
            .with("IRQ flags", format!("${:02X}", self.flags()))
            .with("IRQ enable", format!("${:02X}", self.irq_enable));
        for (i, timer) in self.timers.iter().enumerate() {
            info.add_child(format!("timer {}", i + 1), timer.info());
        }
        info
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
