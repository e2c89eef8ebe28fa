//! # Shift Register
//!
//! Eight bits shifted through CB2, clocked by timer 2, the system clock or
//! external CB1 edges depending on ACR bits 2-4. Under timer 2 a bit moves
//! each time the low byte of the counter reaches zero. Reading or writing the
//! register clears its interrupt flag and starts a new 8-bit transfer.
//!
//! Shifting out rotates: bit 7 goes to CB2 and back into bit 0.

use lib8bit::{InfoStructure, LatchedFlag};

/// ACR bits 2-4.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShiftMode {
    Disabled,
    InTimer2,
    InClock,
    InExternal,
    OutFreeRunning,
    OutTimer2,
    OutClock,
    OutExternal,
}

impl ShiftMode {
    pub fn from_bits(bits: u8) -> Self {
        match bits & 0x07 {
            0 => ShiftMode::Disabled,
            1 => ShiftMode::InTimer2,
            2 => ShiftMode::InClock,
            3 => ShiftMode::InExternal,
            4 => ShiftMode::OutFreeRunning,
            5 => ShiftMode::OutTimer2,
            6 => ShiftMode::OutClock,
            _ => ShiftMode::OutExternal,
        }
    }

    pub fn bits(self) -> u8 {
        match self {
            ShiftMode::Disabled => 0,
            ShiftMode::InTimer2 => 1,
            ShiftMode::InClock => 2,
            ShiftMode::InExternal => 3,
            ShiftMode::OutFreeRunning => 4,
            ShiftMode::OutTimer2 => 5,
            ShiftMode::OutClock => 6,
            ShiftMode::OutExternal => 7,
        }
    }

    pub fn is_output(self) -> bool {
        self.bits() >= 4
    }

    /// Modes clocked by the low byte of timer 2.
    pub fn uses_timer2(self) -> bool {
        matches!(
            self,
            ShiftMode::InTimer2 | ShiftMode::OutFreeRunning | ShiftMode::OutTimer2
        )
    }

    fn is_external(self) -> bool {
        matches!(self, ShiftMode::InExternal | ShiftMode::OutExternal)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShiftRegister {
    mode: ShiftMode,
    value: u8,
    bits: u8,
    active: bool,
    flag: LatchedFlag,
    interrupt_enabled: bool,
}

impl ShiftRegister {
    pub fn new() -> Self {
        Self {
            mode: ShiftMode::Disabled,
            value: 0x00,
            bits: 0,
            active: false,
            flag: LatchedFlag::default(),
            interrupt_enabled: false,
        }
    }

    pub fn mode(&self) -> ShiftMode {
        self.mode
    }

    pub fn set_mode(&mut self, mode: ShiftMode) {
        if mode != self.mode {
            self.mode = mode;
            self.active = false;
            self.bits = 0;
        }
    }

    pub fn peek(&self) -> u8 {
        self.value
    }

    /// Register read.
    pub fn read(&mut self) -> u8 {
        self.restart();
        self.value
    }

    /// Register write.
    pub fn write(&mut self, value: u8) {
        self.value = value;
        self.restart();
    }

    pub fn is_shifting(&self) -> bool {
        self.active
    }

    pub fn flag(&self) -> bool {
        self.flag.peek()
    }

    pub fn clear_flag(&mut self) {
        self.flag.clear();
    }

    pub fn interrupt_enabled(&self) -> bool {
        self.interrupt_enabled
    }

    pub fn set_interrupt_enabled(&mut self, enabled: bool) {
        self.interrupt_enabled = enabled;
    }

    fn restart(&mut self) {
        self.flag.clear();
        self.bits = 0;
        self.active = self.mode != ShiftMode::Disabled;
    }

    /// One system clock cycle. `t2_low_zero` tells whether the low byte of
    /// timer 2 reached zero on this cycle, `cb2` is the input level. Returns
    /// the CB2 output level when a bit was shifted out.
    pub fn tick(&mut self, t2_low_zero: bool, cb2: bool) -> Option<bool> {
        if !self.active || self.mode.is_external() {
            return None;
        }
        if self.mode.uses_timer2() && !t2_low_zero {
            return None;
        }
        self.shift(cb2)
    }

    /// A transition on CB1 in the external clock modes. Input shifts on the
    /// rising edge, output on the falling edge.
    pub fn cb1_edge(&mut self, level: bool, cb2: bool) -> Option<bool> {
        if !self.active || !self.mode.is_external() {
            return None;
        }
        match (self.mode, level) {
            (ShiftMode::InExternal, true) | (ShiftMode::OutExternal, false) => self.shift(cb2),
            _ => None,
        }
    }

    fn shift(&mut self, cb2: bool) -> Option<bool> {
        let out = if self.mode.is_output() {
            let bit = self.value & 0x80 != 0;
            self.value = self.value.rotate_left(1);
            Some(bit)
        } else {
            self.value = (self.value << 1) | cb2 as u8;
            None
        };

        self.bits += 1;
        if self.bits == 8 {
            self.bits = 0;
            if self.mode != ShiftMode::OutFreeRunning {
                self.active = false;
                self.flag.set();
            }
        }
        out
    }

    pub fn info(&self) -> InfoStructure {
        InfoStructure::new()
            .with("mode", self.mode.bits())
            .with("value", format!("${:02X}", self.value))
            .with("bits", self.bits)
            .with("shifting", self.active)
    }
}

impl Default for ShiftRegister {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shift_out_at_clock_rate() {
        let mut sr = ShiftRegister::new();
        sr.set_mode(ShiftMode::OutClock);
        sr.write(0xA0);

        let bits: Vec<bool> = (0..8).filter_map(|_| sr.tick(false, true)).collect();
        assert_eq!(bits, vec![true, false, true, false, false, false, false, false]);
        assert!(sr.flag());
        assert!(!sr.is_shifting());
        assert_eq!(sr.peek(), 0xA0);
    }

    #[test]
    fn test_shift_in_under_timer2() {
        let mut sr = ShiftRegister::new();
        sr.set_mode(ShiftMode::InTimer2);
        sr.read();
        for cycle in 0..(3 * 8) {
            sr.tick(cycle % 3 == 2, true);
        }
        assert_eq!(sr.peek(), 0xFF);
        assert!(sr.flag());
    }

    #[test]
    fn test_timer2_modes_wait_for_low_byte_zero() {
        let mut sr = ShiftRegister::new();
        sr.set_mode(ShiftMode::OutTimer2);
        sr.write(0x80);
        assert_eq!(sr.tick(false, false), None);
        assert_eq!(sr.tick(true, false), Some(true));
        assert!(sr.is_shifting());
    }

    #[test]
    fn test_free_running_never_interrupts() {
        let mut sr = ShiftRegister::new();
        sr.set_mode(ShiftMode::OutFreeRunning);
        sr.write(0x01);
        for _ in 0..32 {
            sr.tick(true, false);
        }
        assert!(!sr.flag());
        assert!(sr.is_shifting());
    }

    #[test]
    fn test_external_clock_edges() {
        let mut sr = ShiftRegister::new();
        sr.set_mode(ShiftMode::InExternal);
        sr.write(0x00);
        assert_eq!(sr.tick(true, true), None);
        for _ in 0..8 {
            sr.cb1_edge(false, true);
            sr.cb1_edge(true, true);
        }
        assert_eq!(sr.peek(), 0xFF);
        assert!(sr.flag());
    }
}
