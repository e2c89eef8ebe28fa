//! # Countdown Timers
//!
//! The generic timer state machine that every peripheral chip instantiates with
//! small variations.
//!
//! ## States
//!
//! A timer is either *idle* or *counting*. Counting decrements the current value
//! by one unit per tick (every tick in [`CountMode::Cycles`], only on ticks where
//! the external pulse input is high in [`CountMode::Pulses`]). On reaching zero:
//!
//! - [`RunMode::OneShot`]: reload the initial value and go idle until restarted.
//! - [`RunMode::Reload`]: reload the initial value and keep counting.
//! - [`RunMode::Continuous`]: keep counting, wrapping through $FFFF.
//!
//! ## Edge Flags
//!
//! `reaches zero`, `reaches zero (low byte)` and `reaches half` hold for exactly
//! the tick in which their condition first occurs and clear on the next tick.
//! `interrupt requested` is set on reaching zero and stays set until consumed by
//! [`LatchedFlag::read`]. Code deciding whether to raise an interrupt must use
//! [`LatchedFlag::peek`] so the flag survives until the CPU has acted.
//!
//! Ticks are always fed one at a time. Chips loop over elapsed cycles calling
//! [`Timer::clock`] so every edge is observable on its exact tick.

use crate::info::InfoStructure;

/// What happens when the counter reaches zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum RunMode {
    /// Fire once, reload and stop.
    OneShot,
    /// Reload from the initial value and keep counting.
    Reload,
    /// Keep counting down through $FFFF.
    Continuous,
}

/// What decrements the counter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum CountMode {
    /// Every clock tick.
    Cycles,
    /// Ticks where the external pulse input is high.
    Pulses,
}

/// A one-bit latch with a consuming read and a pure peek.
///
/// # Examples
///
/// ```
/// use lib8bit::LatchedFlag;
///
/// let mut flag = LatchedFlag::default();
/// flag.set();
/// assert!(flag.peek());
/// assert!(flag.peek());
/// assert!(flag.read());
/// assert!(!flag.read());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LatchedFlag(bool);

impl LatchedFlag {
    pub fn set(&mut self) {
        self.0 = true;
    }

    pub fn set_to(&mut self, value: bool) {
        self.0 = value;
    }

    pub fn clear(&mut self) {
        self.0 = false;
    }

    /// Returns the flag and clears it.
    pub fn read(&mut self) -> bool {
        std::mem::take(&mut self.0)
    }

    /// Returns the flag without clearing it.
    pub fn peek(&self) -> bool {
        self.0
    }
}

/// Selects one of a timer's flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimerFlag {
    ReachesZero,
    ReachesZeroLowByte,
    ReachesHalf,
    InterruptRequested,
}

/// A 16-bit countdown timer.
///
/// # Examples
///
/// ```
/// use lib8bit::{CountMode, RunMode, Timer};
///
/// let mut timer = Timer::new(0, RunMode::OneShot, CountMode::Cycles);
/// timer.load(3);
/// timer.start();
///
/// assert!(!timer.clock(false));
/// assert!(!timer.clock(false));
/// assert!(timer.clock(false));
/// assert!(!timer.is_counting());
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Timer {
    id: u8,
    run_mode: RunMode,
    count_mode: CountMode,
    power_on: (RunMode, CountMode),
    initial: u16,
    current: u16,
    counting: bool,
    half_passed: bool,
    reaches_zero: LatchedFlag,
    reaches_zero_low_byte: LatchedFlag,
    reaches_half: LatchedFlag,
    interrupt_requested: LatchedFlag,
    interrupt_enabled: bool,
}

impl Timer {
    /// Creates an idle timer with initial and current value $FFFF.
    pub fn new(id: u8, run_mode: RunMode, count_mode: CountMode) -> Self {
        Self {
            id,
            run_mode,
            count_mode,
            power_on: (run_mode, count_mode),
            initial: 0xFFFF,
            current: 0xFFFF,
            counting: false,
            half_passed: false,
            reaches_zero: LatchedFlag::default(),
            reaches_zero_low_byte: LatchedFlag::default(),
            reaches_half: LatchedFlag::default(),
            interrupt_requested: LatchedFlag::default(),
            interrupt_enabled: false,
        }
    }

    /// Returns to the power-on state.
    pub fn initialize(&mut self) {
        let (run_mode, count_mode) = self.power_on;
        *self = Self::new(self.id, run_mode, count_mode);
    }

    pub fn id(&self) -> u8 {
        self.id
    }

    pub fn run_mode(&self) -> RunMode {
        self.run_mode
    }

    pub fn set_run_mode(&mut self, mode: RunMode) {
        self.run_mode = mode;
    }

    pub fn count_mode(&self) -> CountMode {
        self.count_mode
    }

    pub fn set_count_mode(&mut self, mode: CountMode) {
        self.count_mode = mode;
    }

    pub fn current_value(&self) -> u16 {
        self.current
    }

    /// Overwrites the counter without touching the initial value.
    pub fn set_current_value(&mut self, value: u16) {
        self.current = value;
        self.half_passed = false;
    }

    pub fn initial_value(&self) -> u16 {
        self.initial
    }

    /// Sets the value used by the next reload.
    pub fn set_initial_value(&mut self, value: u16) {
        self.initial = value;
    }

    /// Copies the initial value into the counter.
    pub fn reload(&mut self) {
        self.current = self.initial;
        self.half_passed = false;
    }

    /// Sets the initial value and reloads the counter from it.
    pub fn load(&mut self, value: u16) {
        self.set_initial_value(value);
        self.reload();
    }

    pub fn start(&mut self) {
        self.counting = true;
    }

    pub fn stop(&mut self) {
        self.counting = false;
    }

    pub fn is_counting(&self) -> bool {
        self.counting
    }

    pub fn interrupt_enabled(&self) -> bool {
        self.interrupt_enabled
    }

    pub fn set_interrupt_enabled(&mut self, enabled: bool) {
        self.interrupt_enabled = enabled;
    }

    pub fn flag(&self, flag: TimerFlag) -> &LatchedFlag {
        match flag {
            TimerFlag::ReachesZero => &self.reaches_zero,
            TimerFlag::ReachesZeroLowByte => &self.reaches_zero_low_byte,
            TimerFlag::ReachesHalf => &self.reaches_half,
            TimerFlag::InterruptRequested => &self.interrupt_requested,
        }
    }

    pub fn flag_mut(&mut self, flag: TimerFlag) -> &mut LatchedFlag {
        match flag {
            TimerFlag::ReachesZero => &mut self.reaches_zero,
            TimerFlag::ReachesZeroLowByte => &mut self.reaches_zero_low_byte,
            TimerFlag::ReachesHalf => &mut self.reaches_half,
            TimerFlag::InterruptRequested => &mut self.interrupt_requested,
        }
    }

    /// Whether the counter reached zero on the last tick.
    pub fn reaches_zero(&self) -> bool {
        self.reaches_zero.peek()
    }

    /// Whether the low byte of the counter became zero on the last tick.
    pub fn reaches_zero_low_byte(&self) -> bool {
        self.reaches_zero_low_byte.peek()
    }

    /// Whether the counter passed half of its initial value on the last tick.
    pub fn reaches_half(&self) -> bool {
        self.reaches_half.peek()
    }

    /// Peeks the pending interrupt request.
    pub fn interrupt_requested(&self) -> bool {
        self.interrupt_requested.peek()
    }

    /// Consumes the pending interrupt request.
    pub fn take_interrupt_request(&mut self) -> bool {
        self.interrupt_requested.read()
    }

    /// Whether an interrupt is pending and enabled. Does not consume the request.
    pub fn launch_interrupt(&self) -> bool {
        self.interrupt_requested.peek() && self.interrupt_enabled
    }

    /// Processes one tick. `pulse` is the external count input for this tick.
    ///
    /// Returns whether the counter reached zero on this tick.
    pub fn clock(&mut self, pulse: bool) -> bool {
        self.reaches_zero.clear();
        self.reaches_zero_low_byte.clear();
        self.reaches_half.clear();

        if !self.counting {
            return false;
        }
        let decrement = match self.count_mode {
            CountMode::Cycles => true,
            CountMode::Pulses => pulse,
        };
        if !decrement {
            return false;
        }

        self.current = match (self.current, self.run_mode) {
            // A zero latch underflows on every counted tick.
            (0, RunMode::OneShot | RunMode::Reload) => 0,
            (value, _) => value.wrapping_sub(1),
        };

        if self.current & 0x00FF == 0 {
            self.reaches_zero_low_byte.set();
        }
        if !self.half_passed && self.current <= self.initial / 2 {
            self.half_passed = true;
            self.reaches_half.set();
        }
        if self.current != 0 {
            return false;
        }

        self.reaches_zero.set();
        self.interrupt_requested.set();
        match self.run_mode {
            RunMode::OneShot => {
                self.reload();
                self.counting = false;
            }
            RunMode::Reload => self.reload(),
            RunMode::Continuous => self.half_passed = false,
        }
        true
    }

    pub fn info(&self) -> InfoStructure {
        InfoStructure::new()
            .with("run mode", format!("{:?}", self.run_mode))
            .with("count mode", format!("{:?}", self.count_mode))
            .with("counting", self.counting)
            .with("value", format!("${:04X}", self.current))
            .with("initial value", format!("${:04X}", self.initial))
            .with("interrupt enabled", self.interrupt_enabled)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup_timer(run_mode: RunMode, value: u16) -> Timer {
        let mut timer = Timer::new(1, run_mode, CountMode::Cycles);
        timer.load(value);
        timer.start();
        timer
    }

    #[test]
    fn test_edge_flags_last_one_tick() {
        let mut timer = setup_timer(RunMode::Reload, 2);
        timer.clock(false);
        assert!(timer.reaches_half());
        timer.clock(false);
        assert!(timer.reaches_zero());
        assert!(!timer.reaches_half());
        timer.clock(false);
        assert!(!timer.reaches_zero());
        assert!(timer.interrupt_requested());
    }

    #[test]
    fn test_low_byte_zero() {
        let mut timer = setup_timer(RunMode::Reload, 0x0201);
        timer.clock(false);
        assert!(timer.reaches_zero_low_byte());
        assert!(!timer.reaches_zero());
        timer.clock(false);
        assert!(!timer.reaches_zero_low_byte());
    }

    #[test]
    fn test_pulse_counting() {
        let mut timer = Timer::new(2, RunMode::OneShot, CountMode::Pulses);
        timer.load(2);
        timer.start();
        assert!(!timer.clock(false));
        assert_eq!(timer.current_value(), 2);
        assert!(!timer.clock(true));
        assert!(!timer.clock(false));
        assert!(timer.clock(true));
    }

    #[test]
    fn test_continuous_wraps() {
        let mut timer = setup_timer(RunMode::Continuous, 1);
        assert!(timer.clock(false));
        timer.clock(false);
        assert_eq!(timer.current_value(), 0xFFFF);
        assert!(timer.is_counting());
    }

    #[test]
    fn test_launch_interrupt_needs_enable() {
        let mut timer = setup_timer(RunMode::OneShot, 1);
        timer.clock(false);
        assert!(!timer.launch_interrupt());
        timer.set_interrupt_enabled(true);
        assert!(timer.launch_interrupt());
        assert!(timer.take_interrupt_request());
        assert!(!timer.launch_interrupt());
    }

    #[test]
    fn test_initialize_restores_power_on() {
        let mut timer = setup_timer(RunMode::Reload, 5);
        timer.set_run_mode(RunMode::OneShot);
        timer.initialize();
        assert_eq!(timer.run_mode(), RunMode::Reload);
        assert_eq!(timer.current_value(), 0xFFFF);
        assert!(!timer.is_counting());
    }
}
