//! # Memory, Views and Bank Switching
//!
//! This module provides the address-resolution layer every component reads and
//! writes through:
//!
//! - [`PhysicalStorage`]: owned byte arrays, RAM or ROM.
//! - [`PhysicalStorageSubset`]: windows into one storage, mapped at an address range,
//!   with independent active-for-read and active-for-write flags.
//! - [`MemoryView`]: ordered lists of subsets. The CPU and a video chip may see
//!   the same storages through different views.
//! - [`Memory`]: owns all of the above and resolves accesses.
//!
//! ## Resolution
//!
//! An access walks the view's subsets in declaration order and stops at the first
//! one that contains the address and is active for that kind of access. Bank
//! switching only flips activation flags; resolution never changes.
//!
//! Nothing here fails at run time. An address with no active subset reads as
//! [`UNMAPPED_VALUE`] and swallows writes, like a floating bus.
//!
//! The [`MemoryBus`] trait is the narrow contract CPUs execute against. [`Memory`]
//! implements it directly, and [`FlatMemory`] is a plain 64 KiB bus for tests.

mod storage;
mod subset;
mod view;

use std::fmt;

use log::trace;

pub use storage::{PhysicalStorage, StorageKind};
pub use subset::{PhysicalStorageSubset, SubsetKind};
pub use view::MemoryView;

use crate::chip::ChipId;
use crate::error::InitializationError;
use crate::info::InfoStructure;

/// Value read from an address no subset answers.
pub const UNMAPPED_VALUE: u8 = 0xFF;

macro_rules! memory_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
        #[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
        pub struct $name(pub u32);

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "#{}", self.0)
            }
        }
    };
}

memory_id!(
    /// Identifies a [`PhysicalStorage`] within a [`Memory`]. Assigned on insertion.
    StorageId
);
memory_id!(
    /// Identifies a [`PhysicalStorageSubset`]. Chosen by the machine builder so
    /// chips can look their subsets up by a known number.
    SubsetId
);
memory_id!(
    /// Identifies a [`MemoryView`].
    ViewId
);

/// Kind of access being resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    Read,
    Write,
}

/// Where an access lands after resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Target {
    Storage { storage: StorageId, offset: usize },
    Fixed(u8),
    Registers { chip: ChipId, offset: u16 },
    Unmapped,
}

/// Memory bus trait for CPUs to read and write bytes.
///
/// `read` may trigger side effects in whatever answers the address (a chip
/// clearing a latch, for example); `peek` never does and is what debuggers and
/// disassemblers use.
///
/// The port methods model a separate I/O address space (Z80 `IN`/`OUT`). Buses
/// without one answer [`UNMAPPED_VALUE`] and drop writes.
///
/// # Examples
///
/// ```
/// use lib8bit::{FlatMemory, MemoryBus};
///
/// let mut mem = FlatMemory::new();
/// mem.write(0x1234, 0x42);
/// assert_eq!(mem.read(0x1234), 0x42);
/// assert_eq!(mem.peek(0x1234), 0x42);
/// ```
pub trait MemoryBus {
    /// Reads a byte. Must never panic.
    fn read(&mut self, addr: u16) -> u8;

    /// Reads a byte without side effects.
    fn peek(&self, addr: u16) -> u8;

    /// Writes a byte. Read-only and unmapped targets ignore it.
    fn write(&mut self, addr: u16, value: u8);

    /// Reads from the I/O port space.
    fn port_read(&mut self, _port: u16) -> u8 {
        UNMAPPED_VALUE
    }

    /// Writes to the I/O port space.
    fn port_write(&mut self, _port: u16, _value: u8) {}
}

/// The storages, subsets and views of one machine.
///
/// # Examples
///
/// ```
/// use lib8bit::{Memory, MemoryBus, MemoryView, PhysicalStorage, PhysicalStorageSubset, SubsetId, ViewId};
///
/// let mut memory = Memory::new();
/// let rom = memory.add_storage(PhysicalStorage::rom("rom", vec![0xAA; 0x100]));
/// let ram = memory.add_storage(PhysicalStorage::ram("ram", 0x100));
///
/// memory.add_subset(PhysicalStorageSubset::window(SubsetId(1), "rom", rom, 0, 0x1000, 0x100)).unwrap();
/// memory
///     .add_subset(
///         PhysicalStorageSubset::window(SubsetId(2), "ram", ram, 0, 0x1000, 0x100)
///             .with_activation(false, true),
///     )
///     .unwrap();
/// memory.add_view(MemoryView::new(ViewId(0), "cpu", vec![SubsetId(1), SubsetId(2)])).unwrap();
///
/// assert_eq!(memory.read(0x1000), 0xAA);
/// memory.activate_exclusively(SubsetId(2)).unwrap();
/// assert_eq!(memory.read(0x1000), 0x00);
/// ```
#[derive(Debug, Clone, Default)]
pub struct Memory {
    storages: Vec<PhysicalStorage>,
    subsets: Vec<PhysicalStorageSubset>,
    views: Vec<MemoryView>,
    active_view: usize,
}

impl Memory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a storage and returns its id.
    pub fn add_storage(&mut self, storage: PhysicalStorage) -> StorageId {
        self.storages.push(storage);
        StorageId(self.storages.len() as u32 - 1)
    }

    /// Adds a subset after checking its storage exists and is large enough.
    pub fn add_subset(&mut self, subset: PhysicalStorageSubset) -> Result<(), InitializationError> {
        if self.subset_slot(subset.id()).is_some() {
            return Err(InitializationError::DuplicateSubset(subset.id()));
        }
        if let SubsetKind::Window { storage, offset } = subset.kind() {
            let size = self
                .storage(storage)
                .ok_or(InitializationError::StorageNotFound(storage))?
                .len();
            let end = offset + subset.len() as usize;
            if end > size {
                return Err(InitializationError::SubsetOutOfBounds {
                    subset: subset.id(),
                    storage,
                    end,
                    size,
                });
            }
        }
        self.subsets.push(subset);
        Ok(())
    }

    /// Adds a view. The first view added is active.
    pub fn add_view(&mut self, mut view: MemoryView) -> Result<(), InitializationError> {
        let mut ranges = Vec::with_capacity(view.subsets().len());
        for &id in view.subsets() {
            let slot = self
                .subset_slot(id)
                .ok_or(InitializationError::SubsetNotFound(id))?;
            let s = &self.subsets[slot];
            ranges.push((slot, s.start() as u32, s.end()));
        }
        view.index(&ranges);
        self.views.push(view);
        Ok(())
    }

    pub fn storage(&self, id: StorageId) -> Option<&PhysicalStorage> {
        self.storages.get(id.0 as usize)
    }

    pub fn storage_mut(&mut self, id: StorageId) -> Option<&mut PhysicalStorage> {
        self.storages.get_mut(id.0 as usize)
    }

    pub fn subset(&self, id: SubsetId) -> Option<&PhysicalStorageSubset> {
        self.subset_slot(id).map(|slot| &self.subsets[slot])
    }

    pub fn subset_mut(&mut self, id: SubsetId) -> Option<&mut PhysicalStorageSubset> {
        self.subset_slot(id).map(move |slot| &mut self.subsets[slot])
    }

    pub fn view(&self, id: ViewId) -> Option<&MemoryView> {
        self.views.iter().find(|v| v.id() == id)
    }

    pub fn views(&self) -> &[MemoryView] {
        &self.views
    }

    /// Id of the view used by [`MemoryBus`] accesses.
    pub fn active_view(&self) -> Option<ViewId> {
        self.views.get(self.active_view).map(MemoryView::id)
    }

    pub fn set_active_view(&mut self, id: ViewId) -> Result<(), InitializationError> {
        self.active_view = self
            .view_slot(id)
            .ok_or(InitializationError::ViewNotFound(id))?;
        Ok(())
    }

    /// Copies `bytes` into a storage regardless of its kind.
    pub fn load(&mut self, storage: StorageId, offset: usize, bytes: &[u8]) -> Result<(), InitializationError> {
        self.storage_mut(storage)
            .ok_or(InitializationError::StorageNotFound(storage))?
            .load(offset, bytes);
        Ok(())
    }

    /// Sets both activation flags of a subset.
    pub fn set_active(&mut self, id: SubsetId, read: bool, write: bool) -> Result<(), InitializationError> {
        let subset = self
            .subset_mut(id)
            .ok_or(InitializationError::SubsetNotFound(id))?;
        subset.set_active_for_read(read);
        subset.set_active_for_write(write);
        Ok(())
    }

    /// Makes `id` the only subset readable over its range.
    ///
    /// Every other subset overlapping it, in any view that contains it, stops
    /// being active for read. Write flags are untouched.
    pub fn activate_exclusively(&mut self, id: SubsetId) -> Result<(), InitializationError> {
        let slot = self
            .subset_slot(id)
            .ok_or(InitializationError::SubsetNotFound(id))?;
        let target = self.subsets[slot].clone();
        let mut rivals = Vec::new();
        for view in self.views.iter().filter(|v| v.contains(id)) {
            for &other in view.subsets() {
                if other == id {
                    continue;
                }
                if let Some(other_slot) = self.subset_slot(other) {
                    if self.subsets[other_slot].overlaps(&target) {
                        rivals.push(other_slot);
                    }
                }
            }
        }
        for other in rivals {
            self.subsets[other].set_active_for_read(false);
        }
        self.subsets[slot].set_active_for_read(true);
        trace!("memory: {} ({}) now answers reads", target.name(), id);
        Ok(())
    }

    /// Attaches a register subset to the chip that answers it.
    pub fn attach_chip(&mut self, subset: SubsetId, chip: ChipId) -> Result<(), InitializationError> {
        self.subset_mut(subset)
            .ok_or(InitializationError::SubsetNotFound(subset))?
            .attach_chip(chip);
        Ok(())
    }

    /// Checks that no two active-for-read subsets of a view overlap.
    pub fn verify_coherence(&self) -> Result<(), InitializationError> {
        for view in &self.views {
            let readable: Vec<&PhysicalStorageSubset> = view
                .subsets()
                .iter()
                .filter_map(|&id| self.subset(id))
                .filter(|s| s.active_for_read())
                .collect();
            for (i, first) in readable.iter().enumerate() {
                for second in &readable[i + 1..] {
                    if first.overlaps(second) {
                        return Err(InitializationError::OverlappingSubsets {
                            view: view.id(),
                            first: first.id(),
                            second: second.id(),
                            address: first.start().max(second.start()),
                        });
                    }
                }
            }
        }
        Ok(())
    }

    /// Restores power-on state: RAM windows get their default contents (zeros
    /// unless declared), activation flags return to their initial values, and
    /// the first view becomes active again.
    pub fn initialize(&mut self) {
        for subset in &mut self.subsets {
            subset.restore_activation();
            if let SubsetKind::Window { storage, offset } = subset.kind() {
                let Some(target) = self.storages.get_mut(storage.0 as usize) else {
                    continue;
                };
                if target.kind() != StorageKind::Ram {
                    continue;
                }
                let len = subset.len() as usize;
                match subset.default_data() {
                    // Data past the end of the window stays out of the storage
                    Some(data) => target.load(offset, &data[..len.min(data.len())]),
                    None => target.load(offset, &vec![0; len]),
                }
            }
        }
        self.active_view = 0;
    }

    /// Resolves an access in a given view.
    pub fn resolve(&self, view: ViewId, address: u16, access: Access) -> Target {
        match self.view_slot(view) {
            Some(slot) => self.resolve_slot(slot, address, access),
            None => Target::Unmapped,
        }
    }

    /// Resolves an access in the active view.
    pub fn resolve_active(&self, address: u16, access: Access) -> Target {
        self.resolve_slot(self.active_view, address, access)
    }

    /// Reads through another view without switching the active one.
    ///
    /// Register subsets have no backing bytes at this level and read as
    /// [`UNMAPPED_VALUE`].
    pub fn read_in_view(&self, view: ViewId, address: u16) -> u8 {
        self.target_value(self.resolve(view, address, Access::Read))
    }

    /// Same as [`read_in_view`](Self::read_in_view); storage reads have no side effects.
    pub fn peek_in_view(&self, view: ViewId, address: u16) -> u8 {
        self.read_in_view(view, address)
    }

    /// Value a resolved read target holds.
    pub fn target_value(&self, target: Target) -> u8 {
        match target {
            Target::Storage { storage, offset } => self
                .storage(storage)
                .map_or(UNMAPPED_VALUE, |s| s.read(offset)),
            Target::Fixed(value) => value,
            Target::Registers { .. } | Target::Unmapped => UNMAPPED_VALUE,
        }
    }

    /// Stores into a resolved write target. Only storage targets keep the byte.
    pub fn store(&mut self, target: Target, value: u8) {
        match target {
            Target::Storage { storage, offset } => {
                if let Some(s) = self.storage_mut(storage) {
                    s.write(offset, value);
                }
            }
            Target::Unmapped => trace!("dropped write of ${:02X} to unmapped space", value),
            Target::Registers { .. } | Target::Fixed(_) => {}
        }
    }

    pub fn info(&self) -> InfoStructure {
        let mut info = InfoStructure::new()
            .with("storages", self.storages.len())
            .with("subsets", self.subsets.len())
            .with(
                "active view",
                self.views
                    .get(self.active_view)
                    .map_or("-", |v| v.name()),
            );
        for view in &self.views {
            let mut v = InfoStructure::new();
            for s in view.subsets().iter().filter_map(|&id| self.subset(id)) {
                let flags = format!(
                    "${:04X}-${:04X} {}{}",
                    s.start(),
                    s.end() - 1,
                    if s.active_for_read() { 'R' } else { '-' },
                    if s.active_for_write() { 'W' } else { '-' }
                );
                v.add(s.name(), flags);
            }
            info.add_child(view.name(), v);
        }
        info
    }

    fn subset_slot(&self, id: SubsetId) -> Option<usize> {
        self.subsets.iter().position(|s| s.id() == id)
    }

    fn view_slot(&self, id: ViewId) -> Option<usize> {
        self.views.iter().position(|v| v.id() == id)
    }

    fn resolve_slot(&self, view: usize, address: u16, access: Access) -> Target {
        let Some(view) = self.views.get(view) else {
            return Target::Unmapped;
        };
        let found = view.candidates(address).iter().map(|&slot| &self.subsets[slot]).find(|s| {
            s.contains(address)
                && match access {
                    Access::Read => s.active_for_read(),
                    Access::Write => s.active_for_write(),
                }
        });
        match found {
            None => Target::Unmapped,
            Some(s) => match s.kind() {
                SubsetKind::Window { storage, offset } => Target::Storage {
                    storage,
                    offset: offset + s.offset_of(address) as usize,
                },
                SubsetKind::Fixed(value) => Target::Fixed(value),
                SubsetKind::Registers { chip: Some(chip) } => Target::Registers {
                    chip,
                    offset: s.offset_of(address),
                },
                SubsetKind::Registers { chip: None } => Target::Unmapped,
            },
        }
    }
}

impl MemoryBus for Memory {
    fn read(&mut self, addr: u16) -> u8 {
        self.peek(addr)
    }

    fn peek(&self, addr: u16) -> u8 {
        self.target_value(self.resolve_active(addr, Access::Read))
    }

    fn write(&mut self, addr: u16, value: u8) {
        let target = self.resolve_active(addr, Access::Write);
        self.store(target, value);
    }
}

/// Simple 64KB flat memory with a 256-port I/O space.
///
/// All addresses are writable RAM initialized to 0x00. Port writes are also
/// recorded in order so tests can check what a program sent out.
///
/// # Examples
///
/// ```
/// use lib8bit::{FlatMemory, MemoryBus};
///
/// let mut mem = FlatMemory::new();
/// mem.load(0x8000, &[0xA9, 0x42]);
/// assert_eq!(mem.peek(0x8001), 0x42);
/// ```
#[derive(Debug, Clone)]
pub struct FlatMemory {
    data: Box<[u8; 65536]>,
    ports: Box<[u8; 256]>,
    port_writes: Vec<(u16, u8)>,
}

impl FlatMemory {
    /// Creates a new FlatMemory with all bytes and ports zero.
    pub fn new() -> Self {
        Self {
            data: Box::new([0; 65536]),
            ports: Box::new([0; 256]),
            port_writes: Vec::new(),
        }
    }

    /// Copies `bytes` in starting at `addr`, wrapping at the end of memory.
    pub fn load(&mut self, addr: u16, bytes: &[u8]) {
        for (i, b) in bytes.iter().enumerate() {
            self.data[addr.wrapping_add(i as u16) as usize] = *b;
        }
    }

    /// Sets the value an input port answers with.
    pub fn set_port(&mut self, port: u8, value: u8) {
        self.ports[port as usize] = value;
    }

    /// Every port write so far, oldest first.
    pub fn port_writes(&self) -> &[(u16, u8)] {
        &self.port_writes
    }
}

impl Default for FlatMemory {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryBus for FlatMemory {
    fn read(&mut self, addr: u16) -> u8 {
        self.data[addr as usize]
    }

    fn peek(&self, addr: u16) -> u8 {
        self.data[addr as usize]
    }

    fn write(&mut self, addr: u16, value: u8) {
        self.data[addr as usize] = value;
    }

    fn port_read(&mut self, port: u16) -> u8 {
        self.ports[(port & 0xFF) as usize]
    }

    fn port_write(&mut self, port: u16, value: u8) {
        self.ports[(port & 0xFF) as usize] = value;
        self.port_writes.push((port, value));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup_banked() -> Memory {
        let mut memory = Memory::new();
        let ram = memory.add_storage(PhysicalStorage::ram("ram", 0x10000));
        let rom = memory.add_storage(PhysicalStorage::rom("rom", vec![0x60; 0x2000]));
        memory
            .add_subset(PhysicalStorageSubset::window(SubsetId(1), "low", ram, 0, 0, 0xE000))
            .unwrap();
        memory
            .add_subset(
                PhysicalStorageSubset::window(SubsetId(2), "rom", rom, 0, 0xE000, 0x2000)
                    .with_activation(true, false),
            )
            .unwrap();
        memory
            .add_subset(
                PhysicalStorageSubset::window(SubsetId(3), "high", ram, 0xE000, 0xE000, 0x2000)
                    .with_activation(false, true),
            )
            .unwrap();
        memory
            .add_view(MemoryView::new(
                ViewId(0),
                "cpu",
                vec![SubsetId(1), SubsetId(2), SubsetId(3)],
            ))
            .unwrap();
        memory
    }

    #[test]
    fn test_write_under_rom_lands_in_ram() {
        let mut memory = setup_banked();
        memory.write(0xE000, 0x42);
        assert_eq!(memory.read(0xE000), 0x60);
        memory.activate_exclusively(SubsetId(3)).unwrap();
        assert_eq!(memory.read(0xE000), 0x42);
        assert!(!memory.subset(SubsetId(2)).unwrap().active_for_read());
    }

    #[test]
    fn test_unmapped_reads_sentinel() {
        let mut memory = setup_banked();
        memory.set_active(SubsetId(2), false, false).unwrap();
        memory.set_active(SubsetId(3), false, false).unwrap();
        assert_eq!(memory.read(0xF000), UNMAPPED_VALUE);
        memory.write(0xF000, 0x12);
        assert_eq!(memory.read(0xF000), UNMAPPED_VALUE);
    }

    #[test]
    fn test_coherence_detects_overlap() {
        let mut memory = setup_banked();
        assert!(memory.verify_coherence().is_ok());
        memory.set_active(SubsetId(3), true, true).unwrap();
        assert_eq!(
            memory.verify_coherence(),
            Err(InitializationError::OverlappingSubsets {
                view: ViewId(0),
                first: SubsetId(2),
                second: SubsetId(3),
                address: 0xE000,
            })
        );
    }

    #[test]
    fn test_initialize_restores_flags_and_ram() {
        let mut memory = setup_banked();
        memory.write(0x1000, 0x99);
        memory.activate_exclusively(SubsetId(3)).unwrap();
        memory.initialize();
        assert_eq!(memory.read(0x1000), 0x00);
        assert!(memory.subset(SubsetId(2)).unwrap().active_for_read());
        assert!(!memory.subset(SubsetId(3)).unwrap().active_for_read());
    }

    #[test]
    fn test_subset_out_of_bounds() {
        let mut memory = Memory::new();
        let ram = memory.add_storage(PhysicalStorage::ram("ram", 0x100));
        let err = memory
            .add_subset(PhysicalStorageSubset::window(SubsetId(1), "big", ram, 0x80, 0, 0x100))
            .unwrap_err();
        assert!(matches!(err, InitializationError::SubsetOutOfBounds { end: 0x180, .. }));
    }

    #[test]
    fn test_missing_view_subset() {
        let mut memory = Memory::new();
        let err = memory
            .add_view(MemoryView::new(ViewId(0), "cpu", vec![SubsetId(7)]))
            .unwrap_err();
        assert_eq!(err, InitializationError::SubsetNotFound(SubsetId(7)));
    }

    #[test]
    fn test_flat_memory_ports() {
        let mut mem = FlatMemory::new();
        mem.set_port(0xFE, 0xBF);
        assert_eq!(mem.port_read(0x7FFE), 0xBF);
        mem.port_write(0x00FE, 0x07);
        assert_eq!(mem.port_writes(), &[(0x00FE, 0x07)]);
    }
}
