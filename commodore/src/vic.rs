//! VIC-II (MOS 6569/6567) raster and interrupt model.
//!
//! The VIC-II is the C64's graphics chip. This model covers what the rest of
//! the machine observes through timing:
//! - The raster counter, advancing one line every `cycles_per_line` cycles
//! - The 9-bit raster compare and the raster interrupt
//! - The interrupt latch ($19) and enable ($1A) registers
//! - Video memory fetches through the VIC's own memory view
//!
//! Rendering is left to the front end, which reads registers with
//! [`Chip::peek_value`] and follows [`EVENT_RASTER_LINE`].

use std::any::Any;

use log::{debug, trace};

use lib8bit::{
    Attributes, Chip, ChipError, ChipId, Cpu, CycleTracker, Event, EventQueue, InfoStructure,
    InitializationError, InterruptId, InterruptOutput, Memory, Notifier, Subscription, SubsetId,
    SubsetKind, ViewId,
};

use crate::cia;
use crate::region::Region;

/// VIC-II register count (47 registers at $D000-$D02E).
pub const VIC_REGISTER_COUNT: usize = 47;

/// A new raster line started. Value is the line number.
pub const EVENT_RASTER_LINE: u32 = 0x300;

/// Raster compare matched, $19 bit 0.
pub const IRQ_RASTER: u8 = 0x01;
/// Sprite to background collision, $19 bit 1.
pub const IRQ_SPRITE_BACKGROUND: u8 = 0x02;
/// Sprite to sprite collision, $19 bit 2.
pub const IRQ_SPRITE_SPRITE: u8 = 0x04;
/// Light pen, $19 bit 3.
pub const IRQ_LIGHT_PEN: u8 = 0x08;

/// MOS 6569 (PAL) / 6567 (NTSC) Video Interface Chip.
pub struct Vic {
    id: ChipId,
    name: String,
    attributes: Attributes,
    registers_subset: SubsetId,
    view: Option<ViewId>,
    region: Region,
    interrupt: InterruptOutput,
    tracker: CycleTracker,
    initialized: bool,
    error: Option<ChipError>,

    /// Hardware registers ($D000-$D02E).
    registers: [u8; VIC_REGISTER_COUNT],

    /// Current raster line (0-311 PAL, 0-262 NTSC).
    current_raster: u16,

    /// Cycle within current raster line.
    cycle_in_line: u16,

    /// 16K bank the VIC sees, 0 to 3.
    bank: u8,

    /// Interrupt latch, low nibble of $19.
    irq_latch: u8,

    notifier: Notifier,
    input: EventQueue,
    bank_source: Option<Subscription>,
}

impl Vic {
    pub fn new(
        id: ChipId,
        name: impl Into<String>,
        registers: SubsetId,
        interrupt: InterruptId,
        region: Region,
    ) -> Self {
        let code = match region {
            Region::Pal => "6569",
            Region::Ntsc => "6567",
        };
        Self {
            id,
            name: name.into(),
            attributes: Attributes::new()
                .with("Name", "VIC-II")
                .with("Code", code)
                .with("Manufacturer", "MOS Technology")
                .with("Year", "1982"),
            registers_subset: registers,
            view: None,
            region,
            interrupt: InterruptOutput::new(interrupt),
            tracker: CycleTracker::new(),
            initialized: false,
            error: None,
            registers: Self::power_on_registers(),
            current_raster: 0,
            cycle_in_line: 0,
            bank: 0,
            irq_latch: 0,
            notifier: Notifier::new(),
            input: EventQueue::new(),
            bank_source: None,
        }
    }

    /// Fetches video data through `view` instead of the CPU's view.
    pub fn with_view(mut self, view: ViewId) -> Self {
        self.view = Some(view);
        self
    }

    fn power_on_registers() -> [u8; VIC_REGISTER_COUNT] {
        let mut registers = [0; VIC_REGISTER_COUNT];
        registers[0x11] = 0x1B; // Control register 1: DEN=1, RSEL=1
        registers[0x16] = 0xC8; // Control register 2: CSEL=1
        registers[0x18] = 0x15; // Memory pointers
        registers[0x20] = 0x0E; // Border color: light blue
        registers[0x21] = 0x06; // Background color: blue
        registers
    }

    pub fn region(&self) -> Region {
        self.region
    }

    /// Get the current raster line.
    pub fn raster(&self) -> u16 {
        self.current_raster
    }

    /// Get the cycle within the current raster line.
    pub fn cycle_in_line(&self) -> u16 {
        self.cycle_in_line
    }

    /// Get the raster compare value from registers.
    pub fn raster_compare(&self) -> u16 {
        let low = self.registers[0x12] as u16;
        let high = ((self.registers[0x11] & 0x80) as u16) << 1;
        high | low
    }

    /// Get the border color (0-15).
    pub fn border_color(&self) -> u8 {
        self.registers[0x20] & 0x0F
    }

    /// Get the background color 0 (0-15).
    pub fn background_color(&self) -> u8 {
        self.registers[0x21] & 0x0F
    }

    /// Check if display is enabled (DEN bit).
    pub fn display_enabled(&self) -> bool {
        self.registers[0x11] & 0x10 != 0
    }

    /// Get the 16K bank seen by the VIC.
    pub fn bank(&self) -> u8 {
        self.bank
    }

    /// Select the 16K bank, as driven by CIA2 port A.
    pub fn set_bank(&mut self, bank: u8) {
        self.bank = bank & 0x03;
    }

    /// Follows the bank selected by a CIA's port A bits 0-1 (active low).
    pub fn follow_bank(&mut self, cia_notifier: &Notifier) {
        self.bank_source = Some(self.input.listen(cia_notifier));
    }

    /// Screen memory offset within the bank, from $18 bits 4-7.
    pub fn screen_address(&self) -> u16 {
        ((self.registers[0x18] >> 4) as u16) << 10
    }

    /// Character memory offset within the bank, from $18 bits 1-3.
    pub fn character_address(&self) -> u16 {
        (((self.registers[0x18] >> 1) & 0x07) as u16) << 11
    }

    /// Reads a byte of the current bank the way the VIC sees it.
    pub fn fetch(&self, memory: &Memory, offset: u16) -> u8 {
        let address = ((self.bank as u16) << 14) | (offset & 0x3FFF);
        match self.view {
            Some(view) => memory.peek_in_view(view, address),
            None => memory.target_value(memory.resolve_active(address, lib8bit::Access::Read)),
        }
    }

    /// Interrupt latch as read from $19.
    fn irq_register(&self) -> u8 {
        let mut value = self.irq_latch | 0x70; // Unused bits read as 1
        if self.irq_latch & self.registers[0x1A] & 0x0F != 0 {
            value |= 0x80;
        }
        value
    }

    fn check_raster_irq(&mut self) {
        if self.current_raster == self.raster_compare() {
            self.irq_latch |= IRQ_RASTER;
            trace!("{}: raster compare at line {}", self.name, self.current_raster);
        }
    }

    /// Latches a collision or light pen source reported by the front end.
    pub fn trigger(&mut self, source: u8) {
        self.irq_latch |= source & 0x0F;
    }

    /// One system clock cycle.
    fn tick(&mut self) {
        self.cycle_in_line += 1;
        if self.cycle_in_line < self.region.cycles_per_line() {
            return;
        }
        self.cycle_in_line = 0;
        self.current_raster += 1;
        if self.current_raster >= self.region.raster_lines() {
            self.current_raster = 0;
        }
        self.notifier
            .notify(&Event::with_value(EVENT_RASTER_LINE, self.current_raster as i64));
        self.check_raster_irq();
    }
}

impl Chip for Vic {
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
        if let Some(view) = self.view {
            memory.view(view).ok_or(InitializationError::ViewNotFound(view))?;
        }
        memory.attach_chip(self.registers_subset, self.id)?;

        self.registers = Self::power_on_registers();
        self.current_raster = 0;
        self.cycle_in_line = 0;
        self.bank = 0;
        self.irq_latch = 0;
        self.input.drain();
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
        if self.current_raster >= self.region.raster_lines() {
            let e = ChipError::InconsistentState {
                chip: self.name.clone(),
                reason: format!("raster line {} out of frame", self.current_raster),
            };
            self.error = Some(e.clone());
            return Err(e);
        }

        for event in self.input.drain() {
            if event.id == cia::EVENT_PORT_A {
                self.set_bank(!(event.value as u8) & 0x03);
            }
        }

        let now = cpu.clock_cycles();
        let ticks = self.tracker.advance(now);
        for remaining in (0..ticks).rev() {
            self.tick();
            let reason = (self.irq_latch & self.registers[0x1A] & 0x0F) as u32;
            self.interrupt.update(cpu, self.id, reason, now - remaining);
        }
        Ok(())
    }

    fn set_value(&mut self, offset: u16, value: u8) {
        // Registers mirror every 64 bytes
        let offset = (offset & 0x3F) as usize;
        if offset >= VIC_REGISTER_COUNT {
            return;
        }

        match offset {
            // Collision registers are read-only
            0x1E | 0x1F => {}
            // Interrupt register: writing 1 clears the flag
            0x19 => self.irq_latch &= !(value & 0x0F),
            0x11 | 0x12 => {
                self.registers[offset] = value;
                self.check_raster_irq();
            }
            _ => self.registers[offset] = value,
        }
    }

    fn read_value(&mut self, offset: u16) -> u8 {
        let offset = offset & 0x3F;
        let value = self.peek_value(offset);
        // Collisions clear on read
        if offset == 0x1E || offset == 0x1F {
            self.registers[offset as usize] = 0;
        }
        value
    }

    fn peek_value(&self, offset: u16) -> u8 {
        match (offset & 0x3F) as usize {
            0x11 => {
                let raster_bit8 = if self.current_raster > 255 { 0x80 } else { 0 };
                (self.registers[0x11] & 0x7F) | raster_bit8
            }
            0x12 => (self.current_raster & 0xFF) as u8,
            0x19 => self.irq_register(),
            0x1A => self.registers[0x1A] | 0xF0,
            n if n < VIC_REGISTER_COUNT => self.registers[n],
            _ => 0xFF,
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
            .with("raster", self.current_raster)
            .with("cycle", self.cycle_in_line)
            .with("raster compare", self.raster_compare())
            .with("IRQ", format!("${:02X}", self.irq_register()))
            .with("IRQ enable", format!("${:02X}", self.registers[0x1A] & 0x0F))
            .with("bank", self.bank)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup_vic() -> Vic {
        Vic::new(ChipId(1), "VIC-II", SubsetId(1), InterruptId::IRQ, Region::Pal)
    }

    #[test]
    fn test_new_vic_defaults() {
        let vic = setup_vic();
        assert_eq!(vic.border_color(), 0x0E);
        assert_eq!(vic.background_color(), 0x06);
        assert!(vic.display_enabled());
    }

    #[test]
    fn test_raster_read() {
        let mut vic = setup_vic();

        vic.current_raster = 100;
        assert_eq!(vic.peek_value(0x12), 100);
        assert_eq!(vic.peek_value(0x11) & 0x80, 0);

        vic.current_raster = 300;
        assert_eq!(vic.peek_value(0x12), 44);
        assert_eq!(vic.peek_value(0x11) & 0x80, 0x80);
    }

    #[test]
    fn test_raster_advances_per_line() {
        let mut vic = setup_vic();
        for _ in 0..63 {
            vic.tick();
        }
        assert_eq!(vic.raster(), 1);
        assert_eq!(vic.cycle_in_line(), 0);
    }

    #[test]
    fn test_interrupt_clear() {
        let mut vic = setup_vic();
        vic.set_value(0x12, 0x00);
        assert_eq!(vic.peek_value(0x19) & 0x01, 0x01);

        vic.set_value(0x19, 0x01);
        assert_eq!(vic.peek_value(0x19), 0x70);
    }

    #[test]
    fn test_registers_mirror_every_64_bytes() {
        let mut vic = setup_vic();
        vic.set_value(0x40 + 0x20, 0x02);
        assert_eq!(vic.border_color(), 0x02);
        assert_eq!(vic.peek_value(0x2F), 0xFF);
    }

    #[test]
    fn test_collision_read_only() {
        let mut vic = setup_vic();
        vic.set_value(0x1E, 0xFF);
        assert_eq!(vic.peek_value(0x1E), 0x00);
    }
}
