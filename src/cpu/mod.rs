//! # CPU Contract
//!
//! Everything the machine loop, chips and debuggers need from a CPU, shared by
//! the 6502 and Z80 cores:
//!
//! - [`Cpu`]: the object-safe trait the [`Computer`](crate::Computer) drives.
//! - [`Instruction`] / [`InstructionSet`]: data-driven opcode tables.
//! - [`InstructionTemplate`]: the operand template grammar.
//! - [`InterruptSystem`]: the pending/in-execution interrupt queue.
//! - [`Register`] / [`StatusRegister`]: introspection of the register file.
//!
//! ## Execution Model
//!
//! A CPU does not own memory. [`Cpu::execute_next_instruction`] borrows a
//! [`MemoryBus`] for one step:
//!
//! 1. If an unmasked interrupt is pending, push state and jump to its vector.
//! 2. Fetch the opcode (and prefixes) at the program counter and look it up.
//!    An unknown opcode fails with [`DecodeError`] and changes nothing.
//! 3. Fetch the declared operand bytes and move the program counter past them.
//! 4. Run the instruction, then add its base cost plus any extra cycles.
//! 5. Record it as the last executed instruction.

pub mod instruction;
pub mod interrupts;
pub mod registers;
pub mod template;

use std::any::Any;
use std::borrow::Cow;

pub use instruction::{Execute, Instruction, InstructionSet, Operands};
pub use interrupts::{InterruptId, InterruptLine, InterruptRequest, InterruptSystem};
pub use registers::{Register, StatusRegister};
pub use template::{InstructionTemplate, ParameterKind, Segment};

use crate::chip::ChipId;
use crate::error::DecodeError;
use crate::info::InfoStructure;
use crate::memory::MemoryBus;

/// Architecture-specific fixed addresses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Vectors {
    pub reset: u16,
    pub irq: u16,
    pub nmi: u16,
}

/// Whether the CPU is fetching instructions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum CpuState {
    #[default]
    Running,
    /// Waiting for an interrupt (Z80 `HALT`).
    Halted,
}

/// An instruction as it was fetched and decoded at one address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Decoded {
    pub address: u16,
    /// Every byte of the encoding, prefixes included.
    pub bytes: Vec<u8>,
    pub template: Cow<'static, str>,
    pub operands: Operands,
    pub cycles: u8,
}

impl Decoded {
    pub fn length(&self) -> u16 {
        self.bytes.len() as u16
    }

    /// Address of the following instruction.
    pub fn next_address(&self) -> u16 {
        self.address.wrapping_add(self.length())
    }

    /// The template rendered with the operand bytes.
    pub fn text(&self) -> String {
        match InstructionTemplate::parse(&self.template) {
            Ok(t) => t.render(self.operands.bytes(), self.next_address()),
            Err(_) => self.template.to_string(),
        }
    }
}

/// The instruction most recently executed, for introspection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LastInstruction {
    pub decoded: Decoded,
    /// Cycles it took, extras included.
    pub cycles: u32,
}

impl LastInstruction {
    pub fn address(&self) -> u16 {
        self.decoded.address
    }

    /// Rendered text, e.g. `LDA #$01`.
    pub fn text(&self) -> String {
        self.decoded.text()
    }
}

/// The contract every CPU core implements.
pub trait Cpu {
    /// Family name, e.g. "6502".
    fn name(&self) -> &str;

    /// Total cycles executed. This is the machine's time base.
    fn clock_cycles(&self) -> u64;

    fn program_counter(&self) -> u16;

    fn set_program_counter(&mut self, pc: u16);

    fn vectors(&self) -> Vectors;

    fn state(&self) -> CpuState;

    /// Power-on reset: clears interrupts and loads the program counter per the
    /// architecture's reset rule.
    fn reset(&mut self, bus: &mut dyn MemoryBus);

    /// Serves a pending interrupt if one is unmasked, then fetches, decodes and
    /// executes one instruction.
    fn execute_next_instruction(&mut self, bus: &mut dyn MemoryBus) -> Result<(), DecodeError>;

    /// Decodes the instruction at `address` without side effects.
    fn decode_at(&self, bus: &dyn MemoryBus, address: u16) -> Result<Decoded, DecodeError>;

    /// Queues an interrupt. Returns false if the CPU has no such line.
    fn request_interrupt(&mut self, request: InterruptRequest) -> bool;

    /// Withdraws a still-pending request raised by `source`.
    fn withdraw_interrupt(&mut self, id: InterruptId, source: ChipId) -> bool;

    fn interrupts(&self) -> &InterruptSystem;

    /// Snapshot of the register file.
    fn registers(&self) -> Vec<Register>;

    fn last_instruction(&self) -> Option<&LastInstruction>;

    /// Error of the last failed step, cleared by the next successful one.
    fn last_error(&self) -> Option<DecodeError>;

    fn info(&self) -> InfoStructure {
        let mut regs = InfoStructure::new();
        for r in self.registers() {
            let text = if r.width == 1 {
                format!("${:02X}", r.value)
            } else {
                format!("${:04X}", r.value)
            };
            regs.add(r.name, text);
        }
        let mut info = InfoStructure::new()
            .with("name", self.name())
            .with("cycles", self.clock_cycles())
            .with("state", format!("{:?}", self.state()))
            .with_child("registers", regs)
            .with_child("interrupts", self.interrupts().info());
        if let Some(last) = self.last_instruction() {
            info.add(
                "last instruction",
                format!("${:04X} {}", last.address(), last.text()),
            );
        }
        info
    }

    fn as_any(&self) -> &dyn Any;

    fn as_any_mut(&mut self) -> &mut dyn Any;
}
