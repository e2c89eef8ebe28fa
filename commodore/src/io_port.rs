//! # 6510 on-chip port
//!
//! Six I/O lines built into the 6510, answering at $0000 (direction, 1 =
//! output) and $0001 (data). Lines with direction 0 read whatever is wired
//! to them.
//!
//! | Bit | C64 use                                         |
//! |-----|-------------------------------------------------|
//! | 0   | LORAM: with HIRAM, BASIC ROM at $A000           |
//! | 1   | HIRAM: KERNAL ROM at $E000                      |
//! | 2   | CHAREN: I/O at $D000 when set, characters when clear |
//! | 3   | Cassette write                                  |
//! | 4   | Cassette switch sense, low when pressed         |
//! | 5   | Cassette motor, low when running                |
//!
//! Banking takes effect right after the register write that changed it.

use std::any::Any;

use log::{debug, warn};

use lib8bit::{
    Attributes, Chip, ChipError, ChipId, Cpu, Event, EventQueue, InfoStructure,
    InitializationError, Memory, Notifier, Subscription, SubsetId, SubsetKind,
};

/// Cassette motor changed. Value 1 when running. Emitted.
pub const EVENT_CASSETTE_MOTOR: u32 = 0x400;
/// Cassette play switch changed. Value 1 when pressed. Accepted.
pub const EVENT_CASSETTE_SENSE: u32 = 0x401;

/// Power-on direction: banking lines and the motor drive, the rest listen.
const POWER_ON_DIRECTION: u8 = 0x2F;
/// Power-on data: BASIC, KERNAL and I/O banked in, motor stopped.
const POWER_ON_DATA: u8 = 0x37;
/// Unconnected lines float high. The sense line reads high with no button.
const EXTERNAL_DEFAULT: u8 = 0x17;

/// The subsets the port switches between.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BankLayout {
    pub basic_rom: SubsetId,
    pub basic_ram: SubsetId,
    pub kernal_rom: SubsetId,
    pub kernal_ram: SubsetId,
    pub char_rom: SubsetId,
    /// RAM under the I/O area, $D000-$DFFF.
    pub io_ram: SubsetId,
    /// Every subset making up the I/O area.
    pub io: Vec<SubsetId>,
}

/// What answers CPU reads at $D000-$DFFF.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IoArea {
    Ram,
    Characters,
    Io,
}

impl IoArea {
    /// From the three banking bits.
    pub fn from_config(config: u8) -> Self {
        match config & 0x07 {
            0 | 1 | 4 => IoArea::Ram,
            2 | 3 => IoArea::Characters,
            _ => IoArea::Io,
        }
    }
}

pub struct IoPort6510 {
    id: ChipId,
    name: String,
    attributes: Attributes,
    registers: SubsetId,
    layout: BankLayout,
    initialized: bool,
    error: Option<ChipError>,

    direction: u8,
    data: u8,
    external: u8,

    /// Banking bits last pushed into memory.
    applied: Option<u8>,
    motor_running: bool,

    notifier: Notifier,
    input: EventQueue,
}

impl IoPort6510 {
    pub fn new(id: ChipId, registers: SubsetId, layout: BankLayout) -> Self {
        Self {
            id,
            name: "6510 I/O port".into(),
            attributes: Attributes::new()
                .with("Name", "I/O port")
                .with("Code", "6510")
                .with("Manufacturer", "MOS Technology")
                .with("Year", "1982"),
            registers,
            layout,
            initialized: false,
            error: None,
            direction: POWER_ON_DIRECTION,
            data: POWER_ON_DATA,
            external: EXTERNAL_DEFAULT,
            applied: None,
            motor_running: false,
            notifier: Notifier::new(),
            input: EventQueue::new(),
        }
    }

    /// LORAM, HIRAM and CHAREN as the pins show them, 0 to 7.
    pub fn bank_config(&self) -> u8 {
        self.pins() & 0x07
    }

    pub fn basic_visible(&self) -> bool {
        self.bank_config() & 0x03 == 0x03
    }

    pub fn kernal_visible(&self) -> bool {
        self.bank_config() & 0x02 != 0
    }

    pub fn io_area(&self) -> IoArea {
        IoArea::from_config(self.bank_config())
    }

    pub fn motor_on(&self) -> bool {
        self.pins() & 0x20 == 0
    }

    /// Driven lines show the data register, the others what is wired in.
    fn pins(&self) -> u8 {
        (self.data & self.direction) | (self.external & !self.direction)
    }

    /// Levels wired to the input lines.
    pub fn set_external(&mut self, value: u8) {
        self.external = value;
    }

    pub fn direction(&self) -> u8 {
        self.direction
    }

    pub fn data(&self) -> u8 {
        self.data
    }

    /// Subscribes the port to cassette events from a device.
    #[must_use = "dropping the subscription unsubscribes immediately"]
    pub fn listen(&self, notifier: &Notifier) -> Subscription {
        self.input.listen(notifier)
    }

    pub fn push_event(&self, event: Event) {
        self.input.push(event);
    }

    fn apply(&self, memory: &mut Memory, config: u8) -> Result<(), InitializationError> {
        let basic = config & 0x03 == 0x03;
        let kernal = config & 0x02 != 0;
        let area = IoArea::from_config(config);
        let io = area == IoArea::Io;
        let chars = area == IoArea::Characters;
        let layout = &self.layout;

        // ROMs answer reads only. Writes go to the RAM underneath.
        memory.set_active(layout.basic_rom, basic, false)?;
        memory.set_active(layout.basic_ram, !basic, true)?;
        memory.set_active(layout.kernal_rom, kernal, false)?;
        memory.set_active(layout.kernal_ram, !kernal, true)?;
        memory.set_active(layout.char_rom, chars, false)?;
        for &subset in &layout.io {
            memory.set_active(subset, io, io)?;
        }
        memory.set_active(layout.io_ram, !io && !chars, !io)?;
        Ok(())
    }

    fn check_motor(&mut self) {
        let on = self.motor_on();
        if on != self.motor_running {
            self.motor_running = on;
            self.notifier
                .notify(&Event::with_value(EVENT_CASSETTE_MOTOR, on as i64));
        }
    }
}

impl Chip for IoPort6510 {
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

        self.direction = POWER_ON_DIRECTION;
        self.data = POWER_ON_DATA;
        self.external = EXTERNAL_DEFAULT;
        self.applied = None;
        self.input.drain();
        self.motor_running = self.motor_on();
        self.error = None;
        self.initialized = true;
        Ok(())
    }

    fn simulate(&mut self, _cpu: &mut dyn Cpu, memory: &mut Memory) -> Result<(), ChipError> {
        if !self.initialized {
            let e = ChipError::NotInitialized(self.name.clone());
            self.error = Some(e.clone());
            return Err(e);
        }
        if let Some(e) = &self.error {
            return Err(e.clone());
        }

        for event in self.input.drain() {
            if event.id == EVENT_CASSETTE_SENSE {
                // Pressed pulls the line low
                if event.value != 0 {
                    self.external &= !0x10;
                } else {
                    self.external |= 0x10;
                }
            }
        }
        self.configure_memory(memory);
        self.check_motor();
        match &self.error {
            Some(e) => Err(e.clone()),
            None => Ok(()),
        }
    }

    fn set_value(&mut self, offset: u16, value: u8) {
        match offset {
            0 => self.direction = value,
            1 => self.data = value,
            _ => {}
        }
        self.check_motor();
    }

    fn read_value(&mut self, offset: u16) -> u8 {
        self.peek_value(offset)
    }

    fn peek_value(&self, offset: u16) -> u8 {
        match offset {
            0 => self.direction,
            1 => self.pins(),
            _ => 0xFF,
        }
    }

    fn configure_memory(&mut self, memory: &mut Memory) {
        let config = self.bank_config();
        if self.applied == Some(config) {
            return;
        }
        match self.apply(memory, config) {
            Ok(()) => {
                debug!("{}: bank configuration {}", self.name, config);
                self.applied = Some(config);
            }
            Err(e) => {
                warn!("{}: bank configuration {} failed: {}", self.name, config, e);
                self.error = Some(ChipError::InconsistentState {
                    chip: self.name.clone(),
                    reason: e.to_string(),
                });
            }
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
            .with("direction", format!("${:02X}", self.direction))
            .with("data", format!("${:02X}", self.data))
            .with("pins", format!("${:02X}", self.pins()))
            .with("bank configuration", self.bank_config())
            .with("motor", self.motor_on())
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

    fn setup_port() -> IoPort6510 {
        let layout = BankLayout {
            basic_rom: SubsetId(1),
            basic_ram: SubsetId(2),
            kernal_rom: SubsetId(3),
            kernal_ram: SubsetId(4),
            char_rom: SubsetId(5),
            io_ram: SubsetId(6),
            io: vec![SubsetId(7)],
        };
        IoPort6510::new(ChipId(0), SubsetId(0), layout)
    }

    #[test]
    fn test_power_on_banks_everything_in() {
        let port = setup_port();
        assert_eq!(port.direction(), POWER_ON_DIRECTION);
        assert_eq!(port.peek_value(1), POWER_ON_DATA);
        assert_eq!(port.bank_config(), 7);
        assert!(port.basic_visible());
        assert!(port.kernal_visible());
        assert_eq!(port.io_area(), IoArea::Io);
        assert!(!port.motor_on());
    }

    #[test]
    fn test_every_configuration() {
        let expected = [
            (false, false, IoArea::Ram),
            (false, false, IoArea::Ram),
            (false, true, IoArea::Characters),
            (true, true, IoArea::Characters),
            (false, false, IoArea::Ram),
            (false, false, IoArea::Io),
            (false, true, IoArea::Io),
            (true, true, IoArea::Io),
        ];
        let mut port = setup_port();
        for (config, &(basic, kernal, area)) in expected.iter().enumerate() {
            port.set_value(1, 0x30 | config as u8);
            assert_eq!(port.basic_visible(), basic, "config {}", config);
            assert_eq!(port.kernal_visible(), kernal, "config {}", config);
            assert_eq!(port.io_area(), area, "config {}", config);
        }
    }

    #[test]
    fn test_input_lines_read_external_levels() {
        let mut port = setup_port();
        port.set_value(0, 0x07);
        port.set_external(0xF0);
        // Driven bits from data, the rest from outside
        assert_eq!(port.peek_value(1), 0xF7);
        assert_eq!(port.bank_config(), 7);

        // A released line floats high
        port.set_value(0, 0x00);
        port.set_external(0xFF);
        assert_eq!(port.bank_config(), 7);
    }

    #[test]
    fn test_motor_event() {
        let mut port = setup_port();
        let seen = std::rc::Rc::new(std::cell::RefCell::new(Vec::new()));
        let sink = seen.clone();
        let _subscription = port
            .notifier()
            .map(|n| n.subscribe(move |e: &Event| sink.borrow_mut().push(e.value)));

        port.set_value(1, 0x17);
        port.set_value(1, 0x37);
        assert_eq!(*seen.borrow(), vec![1, 0]);
    }
}
