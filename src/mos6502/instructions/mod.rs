//! # 6502 Instruction Implementations
//!
//! The executors bound into the opcode table, organized by category. Each one
//! takes the CPU, the bus and the decoded operands, runs after the program
//! counter has moved past the instruction, and returns the cycles it took on
//! top of its base cost.
//!
//! ## Categories
//!
//! - **alu**: Arithmetic and logic operations (ADC, SBC, AND, ORA, EOR, CMP, CPX, CPY, BIT)
//! - **branches**: Conditional branch instructions (BCC, BCS, BEQ, BNE, BMI, BPL, BVC, BVS)
//! - **shifts**: Shift and rotate operations (ASL, LSR, ROL, ROR)
//! - **load_store**: Load and store instructions (LDA, LDX, LDY, STA, STX, STY)
//! - **inc_dec**: Increment and decrement operations (INC, DEC, INX, INY, DEX, DEY)
//! - **control**: Control flow instructions (JMP, JSR, RTS, RTI, BRK, NOP)
//! - **stack**: Stack operations (PHA, PHP, PLA, PLP)
//! - **flags**: Status flag manipulation (CLC, SEC, CLI, SEI, CLD, SED, CLV)
//! - **transfer**: Register transfer operations (TAX, TAY, TXA, TYA, TSX, TXS)

pub(crate) mod alu;
pub(crate) mod branches;
pub(crate) mod control;
pub(crate) mod flags;
pub(crate) mod inc_dec;
pub(crate) mod load_store;
pub(crate) mod shifts;
pub(crate) mod stack;
pub(crate) mod transfer;

pub(crate) use alu::*;
pub(crate) use branches::*;
pub(crate) use control::*;
pub(crate) use flags::*;
pub(crate) use inc_dec::*;
pub(crate) use load_store::*;
pub(crate) use shifts::*;
pub(crate) use stack::*;
pub(crate) use transfer::*;

use super::addressing::AddressingMode;

/// Extra cycle charged to reads that cross a page while indexing.
pub(crate) fn page_penalty(mode: AddressingMode, crossed: bool) -> u32 {
    match mode {
        AddressingMode::AbsoluteX | AddressingMode::AbsoluteY | AddressingMode::IndirectY if crossed => 1,
        _ => 0,
    }
}
