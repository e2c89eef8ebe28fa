//! # Serial Port
//!
//! The CIA's 8-bit shift register.
//!
//! - **Input**: a bit is sampled from the SP line on every rising edge of CNT.
//!   After eight bits the byte moves to the data register and an interrupt
//!   is requested.
//! - **Output**: writing the data register starts a transfer clocked by timer
//!   A, which must be running continuously. CNT toggles each time timer A
//!   passes half of its period; a bit is shifted out, most significant
//!   first, on each falling edge. After eight bits an interrupt is requested.

use lib8bit::{InfoStructure, LatchedFlag};

/// Direction of the shift register, CRA bit 6.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SerialDirection {
    Input,
    Output,
}

/// A line change the serial port drives while sending.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SerialOutput {
    /// CNT went to this level.
    Cnt(bool),
    /// A data bit was put on SP.
    Sp(bool),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SerialPort {
    direction: SerialDirection,
    data: u8,
    shift: u8,
    bits: u8,
    pending_output: bool,
    sending: bool,
    cnt: bool,
    sp: bool,
    interrupt_requested: LatchedFlag,
    interrupt_enabled: bool,
}

impl SerialPort {
    pub fn new() -> Self {
        Self {
            direction: SerialDirection::Input,
            data: 0x00,
            shift: 0x00,
            bits: 0,
            pending_output: false,
            sending: false,
            cnt: true,
            sp: true,
            interrupt_requested: LatchedFlag::default(),
            interrupt_enabled: false,
        }
    }

    pub fn initialize(&mut self) {
        *self = Self::new();
    }

    pub fn direction(&self) -> SerialDirection {
        self.direction
    }

    /// Switching direction abandons a transfer in progress.
    pub fn set_direction(&mut self, direction: SerialDirection) {
        if direction != self.direction {
            self.direction = direction;
            self.bits = 0;
            self.sending = false;
            self.pending_output = false;
        }
    }

    /// The data register.
    pub fn value(&self) -> u8 {
        self.data
    }

    /// Data register write. In output mode this queues the byte for sending.
    pub fn set_value(&mut self, value: u8) {
        self.data = value;
        if self.direction == SerialDirection::Output {
            self.pending_output = true;
        }
    }

    pub fn is_sending(&self) -> bool {
        self.sending
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

    /// Level on SP, as set from outside in input mode.
    pub fn set_sp(&mut self, level: bool) {
        self.sp = level;
    }

    /// Level on CNT, as set from outside in input mode. Returns whether a
    /// byte was completed.
    pub fn set_cnt(&mut self, level: bool) -> bool {
        let rising = level && !self.cnt;
        self.cnt = level;
        if !rising || self.direction != SerialDirection::Input {
            return false;
        }
        self.shift = (self.shift << 1) | self.sp as u8;
        self.bits += 1;
        if self.bits < 8 {
            return false;
        }
        self.bits = 0;
        self.data = self.shift;
        self.interrupt_requested.set();
        true
    }

    /// Called each time a continuous timer A passes half of its period.
    /// Returns the line changes to publish, in order.
    pub fn timer_half_period(&mut self) -> Vec<SerialOutput> {
        let mut out = Vec::new();
        if self.direction != SerialDirection::Output {
            return out;
        }
        if !self.sending {
            if !self.pending_output {
                return out;
            }
            self.pending_output = false;
            self.sending = true;
            self.shift = self.data;
            self.bits = 0;
        }

        self.cnt = !self.cnt;
        out.push(SerialOutput::Cnt(self.cnt));
        if self.cnt {
            return out;
        }

        self.sp = self.shift & 0x80 != 0;
        self.shift <<= 1;
        self.bits += 1;
        out.push(SerialOutput::Sp(self.sp));
        if self.bits == 8 {
            self.bits = 0;
            self.interrupt_requested.set();
            self.sending = self.pending_output;
            if self.pending_output {
                self.pending_output = false;
                self.shift = self.data;
            }
        }
        out
    }

    pub fn info(&self) -> InfoStructure {
        InfoStructure::new()
            .with("direction", format!("{:?}", self.direction))
            .with("data", format!("${:02X}", self.data))
            .with("bits", self.bits)
            .with("interrupt enabled", self.interrupt_enabled)
    }
}

impl Default for SerialPort {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_input_shifts_on_rising_cnt() {
        let mut port = SerialPort::new();
        let byte = 0b1010_0110u8;
        let mut done = false;
        for i in (0..8).rev() {
            port.set_sp(byte & (1 << i) != 0);
            port.set_cnt(false);
            done = port.set_cnt(true);
        }
        assert!(done);
        assert_eq!(port.value(), byte);
        assert!(port.take_interrupt_request());
    }

    #[test]
    fn test_output_sends_msb_first() {
        let mut port = SerialPort::new();
        port.set_direction(SerialDirection::Output);
        port.set_value(0x81);

        let mut sent = Vec::new();
        for _ in 0..16 {
            for change in port.timer_half_period() {
                if let SerialOutput::Sp(bit) = change {
                    sent.push(bit);
                }
            }
        }
        assert_eq!(sent, vec![true, false, false, false, false, false, false, true]);
        assert!(port.interrupt_requested());
        assert!(!port.is_sending());
    }
}
