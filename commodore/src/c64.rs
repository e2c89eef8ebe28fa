//! # C64 Machine Assembly
//!
//! Builds a [`Computer`] with a 6502, the C64 memory layout, the 6510 I/O
//! port, a VIC-II raster unit and two CIAs. Bank switching is entirely
//! subset activation driven by the I/O port; nothing here special-cases
//! addresses at run time.
//!
//! ## CPU view
//!
//! | Range         | Subsets (first active wins)                      |
//! |---------------|--------------------------------------------------|
//! | $0000-$0001   | I/O port registers                               |
//! | $0002-$9FFF   | RAM                                              |
//! | $A000-$BFFF   | BASIC ROM, RAM                                   |
//! | $C000-$CFFF   | RAM                                              |
//! | $D000-$DFFF   | VIC, SID, colour RAM, CIA1, CIA2, expansion;     |
//! |               | character ROM; RAM                               |
//! | $E000-$FFFF   | KERNAL ROM, RAM                                  |
//!
//! ROM subsets are never active for write, so writes under a visible ROM
//! land in the RAM beneath it.
//!
//! ## VIC view
//!
//! The VIC sees RAM everywhere except $1000-$1FFF and $9000-$9FFF, where
//! the character ROM answers.

use thiserror::Error;

use lib8bit::{
    Chip, ChipId, Computer, InitializationError, InterruptId, Memory, MemoryView, Mos6502,
    PhysicalStorage, PhysicalStorageSubset, StorageId, SubsetId, ViewId,
};

use crate::cia::Cia;
use crate::io_port::{BankLayout, IoPort6510};
use crate::region::Region;
use crate::vic::Vic;

pub const BASIC_ROM_SIZE: usize = 0x2000;
pub const KERNAL_ROM_SIZE: usize = 0x2000;
pub const CHARACTER_ROM_SIZE: usize = 0x1000;

pub const IO_PORT: ChipId = ChipId(0);
pub const VIC: ChipId = ChipId(1);
pub const CIA1: ChipId = ChipId(2);
pub const CIA2: ChipId = ChipId(3);

pub const CPU_VIEW: ViewId = ViewId(0);
pub const VIC_VIEW: ViewId = ViewId(1);

/// Subset ids of the CPU view, in resolution order.
pub mod subsets {
    use lib8bit::SubsetId;

    pub const IO_PORT: SubsetId = SubsetId(0);
    pub const RAM_LOW: SubsetId = SubsetId(1);
    pub const BASIC_ROM: SubsetId = SubsetId(2);
    pub const BASIC_RAM: SubsetId = SubsetId(3);
    pub const RAM_C000: SubsetId = SubsetId(4);
    pub const VIC: SubsetId = SubsetId(5);
    pub const SID: SubsetId = SubsetId(6);
    pub const COLOR_RAM: SubsetId = SubsetId(7);
    pub const CIA1: SubsetId = SubsetId(8);
    pub const CIA2: SubsetId = SubsetId(9);
    pub const EXPANSION: SubsetId = SubsetId(10);
    pub const CHAR_ROM: SubsetId = SubsetId(11);
    pub const IO_RAM: SubsetId = SubsetId(12);
    pub const KERNAL_ROM: SubsetId = SubsetId(13);
    pub const KERNAL_RAM: SubsetId = SubsetId(14);

    pub(super) const VIC_RAM_0000: SubsetId = SubsetId(20);
    pub(super) const VIC_CHARS_1000: SubsetId = SubsetId(21);
    pub(super) const VIC_RAM_2000: SubsetId = SubsetId(22);
    pub(super) const VIC_CHARS_9000: SubsetId = SubsetId(23);
    pub(super) const VIC_RAM_A000: SubsetId = SubsetId(24);
}

#[derive(Error, Debug)]
pub enum C64Error {
    #[error("{rom} ROM must be {expected} bytes, got {actual}")]
    RomSize {
        rom: &'static str,
        expected: usize,
        actual: usize,
    },

    #[error(transparent)]
    Initialization(#[from] InitializationError),
}

/// The three ROM images of a C64.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Roms {
    basic: Vec<u8>,
    kernal: Vec<u8>,
    characters: Vec<u8>,
}

impl Roms {
    /// Checks each image has its exact size.
    pub fn new(basic: Vec<u8>, kernal: Vec<u8>, characters: Vec<u8>) -> Result<Self, C64Error> {
        check_size("BASIC", &basic, BASIC_ROM_SIZE)?;
        check_size("KERNAL", &kernal, KERNAL_ROM_SIZE)?;
        check_size("Character", &characters, CHARACTER_ROM_SIZE)?;
        Ok(Self {
            basic,
            kernal,
            characters,
        })
    }

    /// Zero-filled images. The reset vector points at $0000.
    pub fn blank() -> Self {
        Self {
            basic: vec![0; BASIC_ROM_SIZE],
            kernal: vec![0; KERNAL_ROM_SIZE],
            characters: vec![0; CHARACTER_ROM_SIZE],
        }
    }

    pub fn basic(&self) -> &[u8] {
        &self.basic
    }

    pub fn kernal(&self) -> &[u8] {
        &self.kernal
    }

    pub fn characters(&self) -> &[u8] {
        &self.characters
    }
}

fn check_size(rom: &'static str, image: &[u8], expected: usize) -> Result<(), C64Error> {
    if image.len() != expected {
        return Err(C64Error::RomSize {
            rom,
            expected,
            actual: image.len(),
        });
    }
    Ok(())
}

struct Storages {
    ram: StorageId,
    basic: StorageId,
    kernal: StorageId,
    characters: StorageId,
    color: StorageId,
    sid: StorageId,
}

/// Builds the memory of a C64 with both views.
pub fn memory(roms: &Roms) -> Result<Memory, C64Error> {
    use subsets::*;

    let mut memory = Memory::new();
    let s = Storages {
        ram: memory.add_storage(PhysicalStorage::ram("RAM", 0x10000)),
        basic: memory.add_storage(PhysicalStorage::rom("BASIC", roms.basic.clone())),
        kernal: memory.add_storage(PhysicalStorage::rom("KERNAL", roms.kernal.clone())),
        characters: memory.add_storage(PhysicalStorage::rom("Characters", roms.characters.clone())),
        color: memory.add_storage(PhysicalStorage::ram("Colour RAM", 0x400)),
        sid: memory.add_storage(PhysicalStorage::ram("SID", 0x400)),
    };

    let cpu = [
        PhysicalStorageSubset::registers(IO_PORT, "6510 port", 0x0000, 2),
        PhysicalStorageSubset::window(RAM_LOW, "RAM", s.ram, 0x0002, 0x0002, 0x9FFE),
        PhysicalStorageSubset::window(BASIC_ROM, "BASIC ROM", s.basic, 0, 0xA000, 0x2000)
            .with_activation(true, false),
        PhysicalStorageSubset::window(BASIC_RAM, "RAM under BASIC", s.ram, 0xA000, 0xA000, 0x2000)
            .with_activation(false, true),
        PhysicalStorageSubset::window(RAM_C000, "RAM", s.ram, 0xC000, 0xC000, 0x1000),
        PhysicalStorageSubset::registers(subsets::VIC, "VIC-II", 0xD000, 0x400),
        PhysicalStorageSubset::window(SID, "SID", s.sid, 0, 0xD400, 0x400),
        PhysicalStorageSubset::window(COLOR_RAM, "Colour RAM", s.color, 0, 0xD800, 0x400),
        PhysicalStorageSubset::registers(subsets::CIA1, "CIA1", 0xDC00, 0x100),
        PhysicalStorageSubset::registers(subsets::CIA2, "CIA2", 0xDD00, 0x100),
        PhysicalStorageSubset::fixed(EXPANSION, "Expansion", 0xFF, 0xDE00, 0x200),
        PhysicalStorageSubset::window(CHAR_ROM, "Character ROM", s.characters, 0, 0xD000, 0x1000)
            .with_activation(false, false),
        PhysicalStorageSubset::window(IO_RAM, "RAM under I/O", s.ram, 0xD000, 0xD000, 0x1000)
            .with_activation(false, false),
        PhysicalStorageSubset::window(KERNAL_ROM, "KERNAL ROM", s.kernal, 0, 0xE000, 0x2000)
            .with_activation(true, false),
        PhysicalStorageSubset::window(KERNAL_RAM, "RAM under KERNAL", s.ram, 0xE000, 0xE000, 0x2000)
            .with_activation(false, true),
    ];
    let cpu_ids: Vec<SubsetId> = cpu.iter().map(PhysicalStorageSubset::id).collect();
    for subset in cpu {
        memory.add_subset(subset)?;
    }

    let vic = [
        PhysicalStorageSubset::window(VIC_RAM_0000, "VIC RAM", s.ram, 0x0000, 0x0000, 0x1000),
        PhysicalStorageSubset::window(VIC_CHARS_1000, "VIC characters", s.characters, 0, 0x1000, 0x1000),
        PhysicalStorageSubset::window(VIC_RAM_2000, "VIC RAM", s.ram, 0x2000, 0x2000, 0x7000),
        PhysicalStorageSubset::window(VIC_CHARS_9000, "VIC characters", s.characters, 0, 0x9000, 0x1000),
        PhysicalStorageSubset::window(VIC_RAM_A000, "VIC RAM", s.ram, 0xA000, 0xA000, 0x6000),
    ];
    let vic_ids: Vec<SubsetId> = vic.iter().map(PhysicalStorageSubset::id).collect();
    for subset in vic {
        memory.add_subset(subset)?;
    }

    memory.add_view(MemoryView::new(CPU_VIEW, "CPU", cpu_ids))?;
    memory.add_view(MemoryView::new(VIC_VIEW, "VIC-II", vic_ids))?;
    Ok(memory)
}

/// Subsets the 6510 port switches.
pub fn bank_layout() -> BankLayout {
    use subsets::*;

    BankLayout {
        basic_rom: BASIC_ROM,
        basic_ram: BASIC_RAM,
        kernal_rom: KERNAL_ROM,
        kernal_ram: KERNAL_RAM,
        char_rom: CHAR_ROM,
        io_ram: IO_RAM,
        io: vec![subsets::VIC, SID, COLOR_RAM, subsets::CIA1, subsets::CIA2, EXPANSION],
    }
}

/// Assembles a C64. Call [`Computer::initialize`] before running it.
///
/// CIA1 drives IRQ, CIA2 drives NMI, and the VIC-II follows the bank
/// selected on CIA2's port A.
pub fn build(region: Region, roms: &Roms) -> Result<Computer, C64Error> {
    let memory = memory(roms)?;
    let mut computer = Computer::new(Box::new(Mos6502::new()), memory);

    let io_port = IoPort6510::new(IO_PORT, subsets::IO_PORT, bank_layout());
    let cia1 = Cia::new(CIA1, "CIA1", subsets::CIA1, InterruptId::IRQ, region);
    let cia2 = Cia::new(CIA2, "CIA2", subsets::CIA2, InterruptId::NMI, region);
    let mut vic = Vic::new(VIC, "VIC-II", subsets::VIC, InterruptId::IRQ, region).with_view(VIC_VIEW);
    if let Some(notifier) = cia2.notifier() {
        vic.follow_bank(notifier);
    }

    computer.add_chip(Box::new(io_port));
    computer.add_chip(Box::new(vic));
    computer.add_chip(Box::new(cia1));
    computer.add_chip(Box::new(cia2));
    Ok(computer)
}

#[cfg(test)]
mod tests {
    use super::*;
    use lib8bit::MemoryBus;

    #[test]
    fn test_rom_sizes_checked() {
        let err = Roms::new(vec![0; 100], vec![0; KERNAL_ROM_SIZE], vec![0; CHARACTER_ROM_SIZE])
            .unwrap_err();
        assert!(matches!(
            err,
            C64Error::RomSize { rom: "BASIC", expected: 0x2000, actual: 100 }
        ));
        assert!(err.to_string().contains("BASIC"));
    }

    #[test]
    fn test_memory_is_coherent_at_power_on() {
        let memory = memory(&Roms::blank()).unwrap();
        memory.verify_coherence().unwrap();
        assert_eq!(memory.views().len(), 2);
    }

    #[test]
    fn test_vic_view_sees_characters() {
        let mut characters = vec![0; CHARACTER_ROM_SIZE];
        characters[0x10] = 0x3C;
        let roms = Roms::new(vec![0; BASIC_ROM_SIZE], vec![0; KERNAL_ROM_SIZE], characters).unwrap();
        let mut memory = memory(&roms).unwrap();
        memory.write(0x1010, 0x99);

        assert_eq!(memory.peek_in_view(VIC_VIEW, 0x1010), 0x3C);
        assert_eq!(memory.peek_in_view(VIC_VIEW, 0x9010), 0x3C);
        assert_eq!(memory.peek(0x1010), 0x99);
    }
}
