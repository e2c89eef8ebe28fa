//! # Z80 Instruction Implementations
//!
//! Executors decode the `x`/`y`/`z`/`p`/`q` fields of the opcode themselves,
//! so one function serves a whole row of a table. The table prefix in the
//! operands selects HL, IX or IY.
//!
//! - **load**: 8/16-bit loads, exchanges, stack (LD, EX, EXX, PUSH, POP)
//! - **arithmetic**: ALU, INC/DEC, 16-bit arithmetic, DAA, accumulator rotates
//! - **bits**: the `CB` and `DDCB`/`FDCB` rotates and BIT/RES/SET
//! - **control**: jumps, calls, returns, RST, HALT, DI/EI, IM
//! - **block**: LDI/CPI/INI/OUTI and their decrementing and repeating forms
//! - **io**: IN and OUT

pub(crate) mod arithmetic;
pub(crate) mod bits;
pub(crate) mod block;
pub(crate) mod control;
pub(crate) mod io;
pub(crate) mod load;

pub(crate) use arithmetic::*;
pub(crate) use bits::*;
pub(crate) use block::*;
pub(crate) use control::*;
pub(crate) use io::*;
pub(crate) use load::*;

/// The `y` field, bits 5-3.
pub(crate) fn field_y(opcode: u8) -> u8 {
    (opcode >> 3) & 7
}

/// The `z` field, bits 2-0.
pub(crate) fn field_z(opcode: u8) -> u8 {
    opcode & 7
}

/// The `p` field, bits 5-4.
pub(crate) fn field_p(opcode: u8) -> u8 {
    (opcode >> 4) & 3
}
