//! # Chip Contract
//!
//! Every support chip (timers, serial ports, clocks, video raster logic)
//! implements [`Chip`]:
//!
//! - `initialize` looks up the memory subsets the chip needs and resets it.
//! - `simulate` catches the chip up with the CPU clock. A chip must process
//!   exactly the ticks elapsed since it last ran, one at a time;
//!   [`CycleTracker`] does the bookkeeping.
//! - The register triad `set_value` / `read_value` / `peek_value` serves the
//!   chip's register window. `read_value` may clear latches, `peek_value`
//!   never changes anything.
//!
//! Chips never hold references to the CPU, memory or each other. The
//! [`Computer`](crate::Computer) passes what a call needs, and chips talk to
//! each other only through [`events`](crate::events).

use std::any::Any;
use std::collections::BTreeMap;
use std::fmt;

use log::trace;

use crate::cpu::{Cpu, InterruptId, InterruptRequest};
use crate::error::{ChipError, InitializationError};
use crate::events::Notifier;
use crate::info::InfoStructure;
use crate::memory::Memory;

/// Identifies a chip within a computer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ChipId(pub u32);

impl fmt::Display for ChipId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "chip {}", self.0)
    }
}

/// String-keyed descriptive attributes: name, code, manufacturer, year.
///
/// # Examples
///
/// ```
/// use lib8bit::Attributes;
///
/// let attrs = Attributes::new()
///     .with("Name", "CIA")
///     .with("Code", "6526")
///     .with("Manufacturer", "MOS Technology");
/// assert_eq!(attrs.get("Code"), Some("6526"));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Attributes {
    entries: BTreeMap<String, String>,
}

impl Attributes {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.set(key, value);
        self
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.entries.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn info(&self) -> InfoStructure {
        let mut info = InfoStructure::new();
        for (k, v) in self.iter() {
            info.add(k, v);
        }
        info
    }
}

/// Remembers the CPU cycle a chip last caught up to.
///
/// # Examples
///
/// ```
/// use lib8bit::CycleTracker;
///
/// let mut tracker = CycleTracker::new();
/// tracker.reset(100);
/// assert_eq!(tracker.advance(103), 3);
/// assert_eq!(tracker.last_observed(), 103);
/// assert_eq!(tracker.advance(103), 0);
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CycleTracker {
    last: u64,
}

impl CycleTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn last_observed(&self) -> u64 {
        self.last
    }

    /// Ticks between the last observation and `now`, without consuming them.
    pub fn elapsed(&self, now: u64) -> u64 {
        now.saturating_sub(self.last)
    }

    /// Returns the ticks to process and marks `now` as observed.
    pub fn advance(&mut self, now: u64) -> u64 {
        let elapsed = self.elapsed(now);
        self.last = now.max(self.last);
        elapsed
    }

    pub fn reset(&mut self, now: u64) {
        self.last = now;
    }
}

/// How a chip's interrupt output is sensed by the CPU.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Trigger {
    /// Requested for as long as any source is active.
    Level,
    /// Requested once per newly active source.
    Edge,
}

/// A chip's interrupt output pin.
///
/// Chips compute a reason code every tick, one bit per active source, and
/// hand it to [`update`](InterruptOutput::update). The output requests the
/// interrupt on the CPU when sources become active and withdraws a level
/// request that is still pending once every source is gone.
///
/// NMI lines are edge triggered; every other line is level triggered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InterruptOutput {
    id: InterruptId,
    trigger: Trigger,
    reason: u32,
}

impl InterruptOutput {
    pub fn new(id: InterruptId) -> Self {
        let trigger = if id == InterruptId::NMI {
            Trigger::Edge
        } else {
            Trigger::Level
        };
        Self {
            id,
            trigger,
            reason: 0,
        }
    }

    pub fn id(&self) -> InterruptId {
        self.id
    }

    pub fn trigger(&self) -> Trigger {
        self.trigger
    }

    /// Reason code seen by the last update.
    pub fn reason(&self) -> u32 {
        self.reason
    }

    pub fn is_active(&self) -> bool {
        self.reason != 0
    }

    pub fn reset(&mut self) {
        self.reason = 0;
    }

    /// Drives the pin with this tick's reason code.
    pub fn update(&mut self, cpu: &mut dyn Cpu, chip: ChipId, reason: u32, cycles: u64) {
        let rising = reason & !self.reason;
        if reason == 0 {
            if self.reason != 0 && self.trigger == Trigger::Level && cpu.withdraw_interrupt(self.id, chip) {
                trace!("{}: {} withdrawn", chip, self.id);
            }
        } else {
            let request = match self.trigger {
                Trigger::Edge => rising != 0,
                Trigger::Level => {
                    rising != 0
                        || !cpu
                            .interrupts()
                            .pending()
                            .iter()
                            .any(|r| r.id == self.id && r.source == Some(chip))
                }
            };
            if request {
                trace!("{}: requests {} at cycle {} (reason {:#x})", chip, self.id, cycles, reason);
                cpu.request_interrupt(InterruptRequest::new(self.id, cycles).from_chip(chip, reason));
            }
        }
        self.reason = reason;
    }
}

/// The contract every peripheral chip implements.
pub trait Chip {
    fn id(&self) -> ChipId;

    /// Short name, e.g. "CIA1".
    fn name(&self) -> &str;

    fn attributes(&self) -> &Attributes;

    /// Resolves the chip's memory subsets and puts it in its power-on state.
    fn initialize(&mut self, memory: &mut Memory) -> Result<(), InitializationError>;

    /// Processes every tick since the last call, requesting or withdrawing
    /// interrupts on `cpu` as the chip's interrupt line changes.
    fn simulate(&mut self, cpu: &mut dyn Cpu, memory: &mut Memory) -> Result<(), ChipError>;

    /// Register write at `offset` within the chip's register window.
    fn set_value(&mut self, offset: u16, value: u8);

    /// Register read. May clear latches.
    fn read_value(&mut self, offset: u16) -> u8;

    /// Register read without side effects.
    fn peek_value(&self, offset: u16) -> u8;

    /// Applies the chip's bank configuration. Called after every register
    /// write so that bank switching takes effect immediately.
    fn configure_memory(&mut self, _memory: &mut Memory) {}

    /// The chip's event source, for chips that emit events.
    fn notifier(&self) -> Option<&Notifier> {
        None
    }

    /// Error of the last failed `simulate`.
    fn error(&self) -> Option<&ChipError>;

    fn info(&self) -> InfoStructure;

    fn as_any(&self) -> &dyn Any;

    fn as_any_mut(&mut self) -> &mut dyn Any;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tracker_never_runs_backwards() {
        let mut tracker = CycleTracker::new();
        tracker.reset(50);
        assert_eq!(tracker.advance(40), 0);
        assert_eq!(tracker.last_observed(), 50);
    }

    #[test]
    fn test_attributes_replace() {
        let mut attrs = Attributes::new().with("Year", "1981");
        attrs.set("Year", "1982");
        assert_eq!(attrs.get("Year"), Some("1982"));
        assert_eq!(attrs.iter().count(), 1);
    }
}
