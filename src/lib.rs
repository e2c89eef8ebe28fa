//! # 8-bit Emulation Core
//!
//! A cycle-accurate emulation core for 8-bit home computers: 6502 and Z80
//! CPUs, bank-switched memory, the timer/interrupt state machine shared by
//! support chips, and the computer loop that ties them together.
//!
//! ## Quick Start
//!
//! ```rust
//! use lib8bit::{Cpu, FlatMemory, MemoryBus, Mos6502};
//!
//! // Create 64KB flat memory
//! let mut memory = FlatMemory::new();
//!
//! // Set reset vector to point to program start at 0x8000
//! memory.write(0xFFFC, 0x00); // Low byte
//! memory.write(0xFFFD, 0x80); // High byte
//! memory.load(0x8000, &[0xA9, 0x42]); // LDA #$42
//!
//! let mut cpu = Mos6502::new();
//! cpu.reset(&mut memory);
//! assert_eq!(cpu.program_counter(), 0x8000);
//!
//! cpu.execute_next_instruction(&mut memory).unwrap();
//! assert_eq!(cpu.a(), 0x42);
//! assert_eq!(cpu.clock_cycles(), 2);
//! ```
//!
//! ## Architecture
//!
//! - **CPUs don't own memory.** Every step borrows a [`MemoryBus`], so the same
//!   core runs against a [`FlatMemory`] in tests or a [`SystemBus`] inside a
//!   [`Computer`].
//! - **Table-driven instructions.** Each CPU family builds a static
//!   [`InstructionSet`] once. Entries carry the template that drives both
//!   execution bookkeeping and the [`disassembler`].
//! - **Chips catch up.** After every instruction each [`Chip`] processes exactly
//!   the cycles elapsed since it last ran, one tick at a time.
//! - **No hidden globals.** Logging goes through the `log` facade and the
//!   caller installs a logger; configuration is passed at construction.
//!
//! ## Modules
//!
//! - `numeric` - Fixed-width values with carry and overflow
//! - `address` - Bounded, wrapping addresses
//! - `memory` - Storages, subsets, views and the `MemoryBus` trait
//! - `cpu` - The shared CPU contract, instruction tables and interrupts
//! - `mos6502` - The NMOS 6502
//! - `z80` - The Z80
//! - `timer` - The countdown timer state machine
//! - `chip` - The chip contract
//! - `events` - Publish/subscribe between chips
//! - `computer` - The master loop
//! - `disassembler` - Template-driven disassembly

pub mod address;
pub mod chip;
pub mod computer;
pub mod cpu;
pub mod disassembler;
pub mod error;
pub mod events;
pub mod info;
pub mod memory;
pub mod mos6502;
pub mod numeric;
pub mod timer;
pub mod z80;

pub use address::Address;
pub use chip::{Attributes, Chip, ChipId, CycleTracker, InterruptOutput, Trigger};
pub use computer::{Computer, Device, DeviceStatus, ExitCode, SystemBus};
pub use cpu::{
    Cpu, CpuState, Decoded, Instruction, InstructionSet, InstructionTemplate, InterruptId,
    InterruptLine, InterruptRequest, InterruptSystem, LastInstruction, Operands, Register,
    StatusRegister, Vectors,
};
pub use error::{
    ChipError, DecodeError, DeviceError, EmulationError, InitializationError, NumericError,
};
pub use events::{Event, EventQueue, Notifier, Subscription};
pub use info::InfoStructure;
pub use memory::{
    Access, FlatMemory, Memory, MemoryBus, MemoryView, PhysicalStorage, PhysicalStorageSubset,
    StorageId, StorageKind, SubsetId, SubsetKind, Target, ViewId, UNMAPPED_VALUE,
};
pub use mos6502::Mos6502;
pub use numeric::{NumberFormat, UByte, UBytes, UInt};
pub use timer::{CountMode, LatchedFlag, RunMode, Timer, TimerFlag};
pub use z80::Z80;
