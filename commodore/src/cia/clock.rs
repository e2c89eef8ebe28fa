//! # Time of Day Clock
//!
//! The CIA's real-time clock: tenths, seconds, minutes and 12-hour hours with
//! an AM/PM flag, all presented to the CPU in packed BCD, plus an alarm.
//!
//! The clock advances one tenth every `period` CPU cycles. Register access
//! follows the 6526 protocol:
//!
//! - Reading hours freezes the readable time until tenths are read, so a
//!   multi-byte read is consistent.
//! - Writing hours stops the clock until tenths are written.
//! - With CRB bit 7 set, writes go to the alarm instead.

use lib8bit::{InfoStructure, LatchedFlag, NumberFormat, UBytes, UInt};

/// Converts a binary value below 100 to packed BCD.
pub(crate) fn to_bcd(value: u8) -> u8 {
    UInt::from_unsigned(value as u64, 1, NumberFormat::PackedBcd).map_or(0, |v| v.raw() as u8)
}

/// Converts packed BCD to binary. Nibbles above 9 are taken at face value.
pub(crate) fn from_bcd(value: u8) -> u8 {
    match UInt::new(UBytes::from_values(&[value], true), NumberFormat::PackedBcd) {
        Ok(v) => v.as_unsigned() as u8,
        Err(_) => (value >> 4) * 10 + (value & 0x0F),
    }
}

/// A time of day, in binary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TimeOfDay {
    pub tenths: u8,
    pub seconds: u8,
    pub minutes: u8,
    /// 1 to 12
    pub hours: u8,
    pub pm: bool,
}

impl TimeOfDay {
    /// The four register values: tenths, seconds, minutes, hours.
    pub fn registers(&self) -> [u8; 4] {
        [
            to_bcd(self.tenths),
            to_bcd(self.seconds),
            to_bcd(self.minutes),
            to_bcd(self.hours) | if self.pm { 0x80 } else { 0x00 },
        ]
    }

    fn set_register(&mut self, register: usize, value: u8) {
        match register {
            0 => self.tenths = from_bcd(value & 0x0F),
            1 => self.seconds = from_bcd(value & 0x7F),
            2 => self.minutes = from_bcd(value & 0x7F),
            _ => {
                self.hours = from_bcd(value & 0x1F);
                self.pm = value & 0x80 != 0;
            }
        }
    }

    fn advance(&mut self) {
        self.tenths += 1;
        if self.tenths < 10 {
            return;
        }
        self.tenths = 0;
        self.seconds += 1;
        if self.seconds < 60 {
            return;
        }
        self.seconds = 0;
        self.minutes += 1;
        if self.minutes < 60 {
            return;
        }
        self.minutes = 0;
        match self.hours {
            11 => {
                self.hours = 12;
                self.pm = !self.pm;
            }
            12 => self.hours = 1,
            h => self.hours = h + 1,
        }
    }
}

/// The TOD clock and its alarm.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TodClock {
    time: TimeOfDay,
    alarm: TimeOfDay,
    latch: Option<[u8; 4]>,
    stopped: bool,
    period: u32,
    elapsed: u32,
    reaches_alarm: bool,
    interrupt_requested: LatchedFlag,
    interrupt_enabled: bool,
}

impl TodClock {
    /// A clock ticking one tenth every `period` cycles.
    pub fn new(period: u32) -> Self {
        Self {
            time: TimeOfDay {
                hours: 1,
                ..Default::default()
            },
            alarm: TimeOfDay::default(),
            latch: None,
            stopped: false,
            period: period.max(1),
            elapsed: 0,
            reaches_alarm: false,
            interrupt_requested: LatchedFlag::default(),
            interrupt_enabled: false,
        }
    }

    pub fn initialize(&mut self) {
        *self = Self::new(self.period);
    }

    pub fn time(&self) -> TimeOfDay {
        self.time
    }

    pub fn alarm(&self) -> TimeOfDay {
        self.alarm
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped
    }

    pub fn is_latched(&self) -> bool {
        self.latch.is_some()
    }

    /// Whether the alarm matched on the last tick.
    pub fn reaches_alarm(&self) -> bool {
        self.reaches_alarm
    }

    pub fn interrupt_enabled(&self) -> bool {
        self.interrupt_enabled
    }

    pub fn set_interrupt_enabled(&mut self, enabled: bool) {
        self.interrupt_enabled = enabled;
    }

    pub fn interrupt_requested(&self) -> bool {
        self.interrupt_requested.peek()
    }

    pub fn take_interrupt_request(&mut self) -> bool {
        self.interrupt_requested.read()
    }

    /// Processes one CPU cycle. Returns whether the alarm matched.
    pub fn tick(&mut self) -> bool {
        self.reaches_alarm = false;
        if self.stopped {
            return false;
        }
        self.elapsed += 1;
        if self.elapsed < self.period {
            return false;
        }
        self.elapsed = 0;
        self.time.advance();
        if self.time == self.alarm {
            self.reaches_alarm = true;
            self.interrupt_requested.set();
        }
        self.reaches_alarm
    }

    /// Register read, `register` 0 to 3. Hours latch, tenths unlatch.
    pub fn read_register(&mut self, register: usize) -> u8 {
        let value = self.peek_register(register);
        match register {
            0 => self.latch = None,
            3 => {
                if self.latch.is_none() {
                    self.latch = Some(self.time.registers());
                }
            }
            _ => {}
        }
        value
    }

    /// Register value without latching.
    pub fn peek_register(&self, register: usize) -> u8 {
        let registers = self.latch.unwrap_or_else(|| self.time.registers());
        registers[register.min(3)]
    }

    /// Register write, to the alarm when `alarm` is set.
    pub fn write_register(&mut self, register: usize, value: u8, alarm: bool) {
        if alarm {
            self.alarm.set_register(register, value);
            return;
        }
        self.time.set_register(register, value);
        match register {
            0 => {
                self.stopped = false;
                self.elapsed = 0;
            }
            3 => self.stopped = true,
            _ => {}
        }
    }

    pub fn info(&self) -> InfoStructure {
        let [t, s, m, h] = self.time.registers();
        let [at, as_, am, ah] = self.alarm.registers();
        InfoStructure::new()
            .with("time", format!("{:02X}:{:02X}:{:02X}.{:X}", h & 0x7F, m, s, t))
            .with("pm", self.time.pm)
            .with("alarm", format!("{:02X}:{:02X}:{:02X}.{:X}", ah & 0x7F, am, as_, at))
            .with("stopped", self.stopped)
            .with("interrupt enabled", self.interrupt_enabled)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bcd_conversion() {
        assert_eq!(to_bcd(59), 0x59);
        assert_eq!(from_bcd(0x42), 42);
    }

    #[test]
    fn test_ticks_one_tenth_per_period() {
        let mut clock = TodClock::new(10);
        for _ in 0..9 {
            clock.tick();
        }
        assert_eq!(clock.peek_register(0), 0x00);
        clock.tick();
        assert_eq!(clock.peek_register(0), 0x01);
    }

    #[test]
    fn test_hours_wrap_through_noon() {
        let mut clock = TodClock::new(1);
        clock.write_register(3, 0x11, false);
        clock.write_register(2, 0x59, false);
        clock.write_register(1, 0x59, false);
        clock.write_register(0, 0x09, false);
        clock.tick();
        assert_eq!(clock.peek_register(3), 0x92); // 12 PM
    }

    #[test]
    fn test_hours_read_latches_until_tenths_read() {
        let mut clock = TodClock::new(1);
        let hours = clock.read_register(3);
        clock.tick();
        clock.tick();
        assert_eq!(clock.read_register(3), hours);
        assert_eq!(clock.read_register(0), 0x00);
        assert_eq!(clock.peek_register(0), 0x02);
    }

    #[test]
    fn test_hours_write_stops_until_tenths_write() {
        let mut clock = TodClock::new(1);
        clock.write_register(3, 0x05, false);
        clock.tick();
        assert!(clock.is_stopped());
        assert_eq!(clock.peek_register(0), 0x00);
        clock.write_register(0, 0x00, false);
        clock.tick();
        assert_eq!(clock.peek_register(0), 0x01);
    }

    #[test]
    fn test_alarm_requests_interrupt() {
        let mut clock = TodClock::new(1);
        clock.write_register(3, 0x01, true);
        clock.write_register(0, 0x03, true);
        clock.tick();
        clock.tick();
        assert!(!clock.interrupt_requested());
        assert!(clock.tick());
        assert!(clock.take_interrupt_request());
        assert!(!clock.interrupt_requested());
    }
}
