//! # Computer
//!
//! The [`Computer`] owns one CPU, the [`Memory`], every [`Chip`] and every
//! [`Device`], and drives the master loop. One [`step`](Computer::step):
//!
//! 1. The CPU executes one instruction through a [`SystemBus`], which routes
//!    register-window accesses to the chip that owns them.
//! 2. Every chip is simulated in the order it was added, catching up with the
//!    CPU clock.
//! 3. Every device is simulated and may ask to quit.
//!
//! The first failure stops the machine and records an [`ExitCode`]. There is
//! no recovery: a stopped computer stays stopped until it is initialized again.

use std::any::Any;

use log::{debug, error};

use crate::chip::{Chip, ChipId};
use crate::cpu::Cpu;
use crate::error::{DeviceError, EmulationError, InitializationError};
use crate::info::InfoStructure;
use crate::memory::{Access, Memory, MemoryBus, Target, UNMAPPED_VALUE};

/// Why the computer stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ExitCode {
    /// [`Computer::request_exit`] was called.
    Requested,
    /// The CPU failed to decode an instruction.
    CpuError,
    /// A chip's simulate failed.
    ChipError(ChipId),
    /// The device at this index failed.
    DeviceError(usize),
    /// A device asked to quit.
    DeviceQuit,
}

/// What a device wants after its simulate step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeviceStatus {
    Continue,
    Quit,
}

/// An external collaborator (screen, sound, input) simulated after the chips.
///
/// Devices observe the machine but never write to it.
pub trait Device {
    fn name(&self) -> &str;

    fn initialize(&mut self) -> Result<(), DeviceError> {
        Ok(())
    }

    fn simulate(&mut self, cpu: &dyn Cpu, memory: &Memory) -> Result<DeviceStatus, DeviceError>;
}

/// A range of I/O ports answered by one chip's registers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct PortMapping {
    first: u8,
    last: u8,
    chip: ChipId,
}

/// The bus a CPU sees inside a [`Computer`]: memory resolution plus routing
/// of register subsets and I/O ports to chips.
pub struct SystemBus<'a> {
    memory: &'a mut Memory,
    chips: &'a mut [Box<dyn Chip>],
    ports: &'a [PortMapping],
}

impl<'a> SystemBus<'a> {
    fn chip_mut(&mut self, id: ChipId) -> Option<&mut Box<dyn Chip>> {
        self.chips.iter_mut().find(|c| c.id() == id)
    }

    fn port_target(&self, port: u16) -> Option<(ChipId, u16)> {
        let low = port as u8;
        self.ports
            .iter()
            .find(|m| (m.first..=m.last).contains(&low))
            .map(|m| (m.chip, (low - m.first) as u16))
    }
}

impl MemoryBus for SystemBus<'_> {
    fn read(&mut self, addr: u16) -> u8 {
        match self.memory.resolve_active(addr, Access::Read) {
            Target::Registers { chip, offset } => self
                .chip_mut(chip)
                .map_or(UNMAPPED_VALUE, |c| c.read_value(offset)),
            target => self.memory.target_value(target),
        }
    }

    fn peek(&self, addr: u16) -> u8 {
        match self.memory.resolve_active(addr, Access::Read) {
            Target::Registers { chip, offset } => self
                .chips
                .iter()
                .find(|c| c.id() == chip)
                .map_or(UNMAPPED_VALUE, |c| c.peek_value(offset)),
            target => self.memory.target_value(target),
        }
    }

    fn write(&mut self, addr: u16, value: u8) {
        match self.memory.resolve_active(addr, Access::Write) {
            Target::Registers { chip, offset } => {
                if let Some(index) = self.chips.iter().position(|c| c.id() == chip) {
                    let chip = &mut self.chips[index];
                    chip.set_value(offset, value);
                    chip.configure_memory(self.memory);
                }
            }
            target => self.memory.store(target, value),
        }
    }

    fn port_read(&mut self, port: u16) -> u8 {
        match self.port_target(port) {
            Some((chip, offset)) => self
                .chip_mut(chip)
                .map_or(UNMAPPED_VALUE, |c| c.read_value(offset)),
            None => UNMAPPED_VALUE,
        }
    }

    fn port_write(&mut self, port: u16, value: u8) {
        if let Some((chip, offset)) = self.port_target(port) {
            if let Some(index) = self.chips.iter().position(|c| c.id() == chip) {
                let chip = &mut self.chips[index];
                chip.set_value(offset, value);
                chip.configure_memory(self.memory);
            }
        }
    }
}

/// A complete machine.
///
/// # Examples
///
/// ```
/// use lib8bit::{Computer, ExitCode, Memory, MemoryView, Mos6502, PhysicalStorage, PhysicalStorageSubset, SubsetId, ViewId};
///
/// let mut image = vec![0u8; 0x10000];
/// image[0x8000] = 0xFF; // no such opcode
/// image[0xFFFC] = 0x00;
/// image[0xFFFD] = 0x80;
///
/// let mut memory = Memory::new();
/// let ram = memory.add_storage(PhysicalStorage::ram("ram", 0x10000));
/// memory
///     .add_subset(PhysicalStorageSubset::window(SubsetId(0), "ram", ram, 0, 0, 0x10000).with_default_data(image))
///     .unwrap();
/// memory.add_view(MemoryView::new(ViewId(0), "cpu", vec![SubsetId(0)])).unwrap();
///
/// let mut computer = Computer::new(Box::new(Mos6502::new()), memory);
/// computer.initialize().unwrap();
/// assert!(computer.step().is_err());
/// assert_eq!(computer.exit_code(), Some(ExitCode::CpuError));
/// assert_eq!(computer.cpu().program_counter(), 0x8000);
/// ```
pub struct Computer {
    cpu: Box<dyn Cpu>,
    memory: Memory,
    chips: Vec<Box<dyn Chip>>,
    devices: Vec<Box<dyn Device>>,
    ports: Vec<PortMapping>,
    exit: Option<ExitCode>,
    last_error: Option<EmulationError>,
}

impl Computer {
    pub fn new(cpu: Box<dyn Cpu>, memory: Memory) -> Self {
        Self {
            cpu,
            memory,
            chips: Vec::new(),
            devices: Vec::new(),
            ports: Vec::new(),
            exit: None,
            last_error: None,
        }
    }

    /// Adds a chip. Chips are simulated in the order they are added.
    pub fn add_chip(&mut self, chip: Box<dyn Chip>) -> ChipId {
        let id = chip.id();
        self.chips.push(chip);
        id
    }

    /// Adds a device and returns its index.
    pub fn add_device(&mut self, device: Box<dyn Device>) -> usize {
        self.devices.push(device);
        self.devices.len() - 1
    }

    /// Routes I/O ports whose low byte is in `first..=last` to a chip's
    /// registers, at offset `port - first`.
    pub fn map_ports(&mut self, first: u8, last: u8, chip: ChipId) -> Result<(), InitializationError> {
        if !self.chips.iter().any(|c| c.id() == chip) {
            return Err(InitializationError::ChipNotFound(chip));
        }
        self.ports.push(PortMapping { first, last, chip });
        Ok(())
    }

    /// Brings every component to power-on state: memory contents and bank
    /// flags, chips, the CPU reset sequence, then devices.
    pub fn initialize(&mut self) -> Result<(), EmulationError> {
        self.memory.initialize();
        for chip in self.chips.iter_mut() {
            chip.initialize(&mut self.memory)?;
            chip.configure_memory(&mut self.memory);
        }
        self.memory.verify_coherence()?;

        let mut bus = SystemBus {
            memory: &mut self.memory,
            chips: &mut self.chips,
            ports: &self.ports,
        };
        self.cpu.reset(&mut bus);

        for (index, device) in self.devices.iter_mut().enumerate() {
            device
                .initialize()
                .map_err(|source| EmulationError::Device { device: index, source })?;
        }

        self.exit = None;
        self.last_error = None;
        debug!(
            "computer: initialized {} CPU with {} chips and {} devices, PC=${:04X}",
            self.cpu.name(),
            self.chips.len(),
            self.devices.len(),
            self.cpu.program_counter()
        );
        Ok(())
    }

    /// Runs one iteration of the master loop.
    ///
    /// Does nothing once the computer has stopped.
    pub fn step(&mut self) -> Result<(), EmulationError> {
        if self.exit.is_some() {
            return Ok(());
        }

        let mut bus = SystemBus {
            memory: &mut self.memory,
            chips: &mut self.chips,
            ports: &self.ports,
        };
        if let Err(e) = self.cpu.execute_next_instruction(&mut bus) {
            return Err(self.halt(ExitCode::CpuError, e.into()));
        }

        for index in 0..self.chips.len() {
            let chip = &mut self.chips[index];
            if let Err(source) = chip.simulate(self.cpu.as_mut(), &mut self.memory) {
                let id = chip.id();
                return Err(self.halt(ExitCode::ChipError(id), EmulationError::Chip { chip: id, source }));
            }
        }

        for index in 0..self.devices.len() {
            match self.devices[index].simulate(self.cpu.as_ref(), &self.memory) {
                Ok(DeviceStatus::Continue) => {}
                Ok(DeviceStatus::Quit) => {
                    debug!("computer: device {} asked to quit", self.devices[index].name());
                    self.exit = Some(ExitCode::DeviceQuit);
                    return Ok(());
                }
                Err(source) => {
                    return Err(self.halt(
                        ExitCode::DeviceError(index),
                        EmulationError::Device { device: index, source },
                    ));
                }
            }
        }
        Ok(())
    }

    /// Steps until at least `cycles` more CPU cycles have run or the
    /// computer stops. Returns the cycles actually run.
    pub fn run_for_cycles(&mut self, cycles: u64) -> Result<u64, EmulationError> {
        let start = self.cpu.clock_cycles();
        let target = start.saturating_add(cycles);
        while self.exit.is_none() && self.cpu.clock_cycles() < target {
            self.step()?;
        }
        Ok(self.cpu.clock_cycles() - start)
    }

    /// Steps until the computer stops.
    pub fn run(&mut self) -> ExitCode {
        loop {
            if let Some(code) = self.exit {
                return code;
            }
            // The failure is already recorded in `exit` and `last_error`.
            let _ = self.step();
        }
    }

    /// Stops the computer before its next step.
    pub fn request_exit(&mut self) {
        self.exit.get_or_insert(ExitCode::Requested);
    }

    pub fn exit_code(&self) -> Option<ExitCode> {
        self.exit
    }

    pub fn last_error(&self) -> Option<&EmulationError> {
        self.last_error.as_ref()
    }

    pub fn cpu(&self) -> &dyn Cpu {
        self.cpu.as_ref()
    }

    pub fn cpu_mut(&mut self) -> &mut dyn Cpu {
        self.cpu.as_mut()
    }

    pub fn memory(&self) -> &Memory {
        &self.memory
    }

    pub fn memory_mut(&mut self) -> &mut Memory {
        &mut self.memory
    }

    /// A bus over this computer's memory and chips, for loaders and debuggers.
    pub fn bus(&mut self) -> SystemBus<'_> {
        SystemBus {
            memory: &mut self.memory,
            chips: &mut self.chips,
            ports: &self.ports,
        }
    }

    pub fn chips(&self) -> impl Iterator<Item = &dyn Chip> {
        self.chips.iter().map(|c| c.as_ref())
    }

    /// The chip with `id`, downcast to its concrete type.
    pub fn chip<T: Any>(&self, id: ChipId) -> Option<&T> {
        self.chips
            .iter()
            .find(|c| c.id() == id)
            .and_then(|c| c.as_any().downcast_ref::<T>())
    }

    pub fn chip_mut<T: Any>(&mut self, id: ChipId) -> Option<&mut T> {
        self.chips
            .iter_mut()
            .find(|c| c.id() == id)
            .and_then(|c| c.as_any_mut().downcast_mut::<T>())
    }

    pub fn info(&self) -> InfoStructure {
        let mut chips = InfoStructure::new();
        for chip in &self.chips {
            chips.add_child(chip.name(), chip.info());
        }
        let mut info = InfoStructure::new()
            .with_child("cpu", self.cpu.info())
            .with_child("memory", self.memory.info())
            .with_child("chips", chips);
        if let Some(code) = self.exit {
            info.add("exit", format!("{:?}", code));
        }
        info
    }

    fn halt(&mut self, code: ExitCode, e: EmulationError) -> EmulationError {
        error!(
            "computer: stopped at PC=${:04X} after {} cycles: {}",
            self.cpu.program_counter(),
            self.cpu.clock_cycles(),
            e
        );
        self.exit = Some(code);
        self.last_error = Some(e.clone());
        e
    }
}
