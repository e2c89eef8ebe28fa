//! # Control Lines
//!
//! CA1 and CB1 are edge-sensitive inputs whose active edge comes from one PCR
//! bit. CA2 and CB2 take a 3-bit PCR field and act either as edge inputs or
//! as outputs:
//!
//! | Mode | CA2 / CB2 behavior                                    |
//! |------|-------------------------------------------------------|
//! | 0    | input, negative edge, flag cleared by port access     |
//! | 1    | independent input, negative edge                      |
//! | 2    | input, positive edge, flag cleared by port access     |
//! | 3    | independent input, positive edge                      |
//! | 4    | handshake output: low on port access until CA1/CB1     |
//! | 5    | pulse output: low for one cycle after port access     |
//! | 6    | manual output low                                     |
//! | 7    | manual output high                                    |

use lib8bit::{InfoStructure, LatchedFlag};

/// Which transition of an input line sets its interrupt flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ActiveEdge {
    Negative,
    Positive,
}

impl ActiveEdge {
    fn from_bit(bit: bool) -> Self {
        if bit {
            ActiveEdge::Positive
        } else {
            ActiveEdge::Negative
        }
    }

    fn matches(self, level: bool) -> bool {
        match self {
            ActiveEdge::Negative => !level,
            ActiveEdge::Positive => level,
        }
    }
}

/// CA1 or CB1.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EdgeLine {
    level: bool,
    active: ActiveEdge,
    flag: LatchedFlag,
    interrupt_enabled: bool,
}

impl EdgeLine {
    pub fn new() -> Self {
        Self {
            level: true,
            active: ActiveEdge::Negative,
            flag: LatchedFlag::default(),
            interrupt_enabled: false,
        }
    }

    pub fn level(&self) -> bool {
        self.level
    }

    pub fn active_edge(&self) -> ActiveEdge {
        self.active
    }

    pub fn set_pcr_bit(&mut self, bit: bool) {
        self.active = ActiveEdge::from_bit(bit);
    }

    /// Drives the line. Returns whether this was the active transition.
    pub fn set_level(&mut self, level: bool) -> bool {
        if level == self.level {
            return false;
        }
        self.level = level;
        let active = self.active.matches(level);
        if active {
            self.flag.set();
        }
        active
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

    pub fn info(&self) -> InfoStructure {
        InfoStructure::new()
            .with("level", self.level)
            .with("active edge", format!("{:?}", self.active))
            .with("flag", self.flag.peek())
    }
}

impl Default for EdgeLine {
    fn default() -> Self {
        Self::new()
    }
}

/// Mode of CA2 or CB2.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Cx2Mode {
    InputNegative,
    IndependentNegative,
    InputPositive,
    IndependentPositive,
    Handshake,
    Pulse,
    Low,
    High,
}

impl Cx2Mode {
    pub fn from_bits(bits: u8) -> Self {
        match bits & 0x07 {
            0 => Cx2Mode::InputNegative,
            1 => Cx2Mode::IndependentNegative,
            2 => Cx2Mode::InputPositive,
            3 => Cx2Mode::IndependentPositive,
            4 => Cx2Mode::Handshake,
            5 => Cx2Mode::Pulse,
            6 => Cx2Mode::Low,
            _ => Cx2Mode::High,
        }
    }

    pub fn bits(self) -> u8 {
        match self {
            Cx2Mode::InputNegative => 0,
            Cx2Mode::IndependentNegative => 1,
            Cx2Mode::InputPositive => 2,
            Cx2Mode::IndependentPositive => 3,
            Cx2Mode::Handshake => 4,
            Cx2Mode::Pulse => 5,
            Cx2Mode::Low => 6,
            Cx2Mode::High => 7,
        }
    }

    pub fn is_output(self) -> bool {
        self.bits() >= 4
    }

    fn active_edge(self) -> ActiveEdge {
        match self {
            Cx2Mode::InputPositive | Cx2Mode::IndependentPositive => ActiveEdge::Positive,
            _ => ActiveEdge::Negative,
        }
    }
}

/// CA2 or CB2.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandshakeLine {
    mode: Cx2Mode,
    level: bool,
    pulsing: bool,
    flag: LatchedFlag,
    interrupt_enabled: bool,
}

impl HandshakeLine {
    pub fn new() -> Self {
        Self {
            mode: Cx2Mode::InputNegative,
            level: true,
            pulsing: false,
            flag: LatchedFlag::default(),
            interrupt_enabled: false,
        }
    }

    pub fn mode(&self) -> Cx2Mode {
        self.mode
    }

    pub fn level(&self) -> bool {
        self.level
    }

    /// Changes mode. Returns the new output level if it changed.
    pub fn set_mode(&mut self, mode: Cx2Mode) -> Option<bool> {
        self.mode = mode;
        self.pulsing = false;
        match mode {
            Cx2Mode::Low => self.drive(false),
            Cx2Mode::High | Cx2Mode::Handshake | Cx2Mode::Pulse => self.drive(true),
            _ => None,
        }
    }

    /// Driven from outside. Ignored in output modes.
    pub fn set_input(&mut self, level: bool) {
        if self.mode.is_output() || level == self.level {
            return;
        }
        self.level = level;
        if self.mode.active_edge().matches(level) {
            self.flag.set();
        }
    }

    /// Read or write of the associated port register. `triggers` tells whether
    /// this access starts a handshake or pulse. Returns the new output level if
    /// it changed.
    pub fn port_access(&mut self, triggers: bool) -> Option<bool> {
        match self.mode {
            Cx2Mode::InputNegative | Cx2Mode::InputPositive => {
                self.flag.clear();
                None
            }
            Cx2Mode::Handshake if triggers => self.drive(false),
            Cx2Mode::Pulse if triggers => {
                self.pulsing = true;
                self.drive(false)
            }
            _ => None,
        }
    }

    /// The companion CA1/CB1 saw its active edge.
    pub fn companion_edge(&mut self) -> Option<bool> {
        match self.mode {
            Cx2Mode::Handshake => self.drive(true),
            _ => None,
        }
    }

    /// One cycle. Ends a pulse.
    pub fn tick(&mut self) -> Option<bool> {
        if std::mem::take(&mut self.pulsing) {
            return self.drive(true);
        }
        None
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

    fn drive(&mut self, level: bool) -> Option<bool> {
        if self.level == level {
            return None;
        }
        self.level = level;
        Some(level)
    }

    pub fn info(&self) -> InfoStructure {
        InfoStructure::new()
            .with("mode", self.mode.bits())
            .with("level", self.level)
            .with("flag", self.flag.peek())
    }
}

impl Default for HandshakeLine {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_edge_line_negative_by_default() {
        let mut line = EdgeLine::new();
        assert!(!line.set_level(true));
        assert!(line.set_level(false));
        assert!(line.flag());
        line.clear_flag();
        assert!(!line.set_level(true));
        assert!(!line.flag());
    }

    #[test]
    fn test_edge_line_positive() {
        let mut line = EdgeLine::new();
        line.set_pcr_bit(true);
        line.set_level(false);
        assert!(!line.flag());
        assert!(line.set_level(true));
        assert!(line.flag());
    }

    #[test]
    fn test_handshake_until_companion_edge() {
        let mut line = HandshakeLine::new();
        assert_eq!(line.set_mode(Cx2Mode::Handshake), None);
        assert_eq!(line.port_access(true), Some(false));
        assert_eq!(line.tick(), None);
        assert!(!line.level());
        assert_eq!(line.companion_edge(), Some(true));
    }

    #[test]
    fn test_pulse_lasts_one_cycle() {
        let mut line = HandshakeLine::new();
        line.set_mode(Cx2Mode::Pulse);
        assert_eq!(line.port_access(true), Some(false));
        assert_eq!(line.tick(), Some(true));
        assert_eq!(line.tick(), None);
    }

    #[test]
    fn test_independent_input_survives_port_access() {
        let mut line = HandshakeLine::new();
        line.set_mode(Cx2Mode::IndependentNegative);
        line.set_input(false);
        line.port_access(true);
        assert!(line.flag());

        line.set_mode(Cx2Mode::InputNegative);
        line.port_access(false);
        assert!(!line.flag());
    }

    #[test]
    fn test_manual_modes_drive_level() {
        let mut line = HandshakeLine::new();
        assert_eq!(line.set_mode(Cx2Mode::Low), Some(false));
        assert_eq!(line.set_mode(Cx2Mode::High), Some(true));
        line.set_input(false);
        assert!(line.level());
    }
}
