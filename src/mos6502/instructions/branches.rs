//! # Branch Instructions
//!
//! This module implements the conditional branches:
//! BCC, BCS, BEQ, BNE, BMI, BPL, BVC, BVS.
//!
//! All branch instructions use relative addressing with a signed 8-bit offset
//! from the following instruction. Timing:
//! - 2 cycles if the branch is not taken
//! - 3 cycles if taken to the same page
//! - 4 cycles if taken to a different page
//!
//! No flags are affected.

use crate::cpu::Operands;
use crate::memory::MemoryBus;
use crate::mos6502::Mos6502;

/// Moves PC by the operand offset when `condition` holds and returns the
/// extra cycles.
fn branch_if(condition: bool, cpu: &mut Mos6502, op: &Operands) -> u32 {
    if !condition {
        return 0;
    }
    // PC already points at the next instruction.
    let from = cpu.pc;
    let target = from.wrapping_add_signed(op.offset(0) as i16);
    cpu.pc = target;

    // A page boundary is crossed if the high byte of the address changes
    if (from & 0xFF00) != (target & 0xFF00) {
        2
    } else {
        1
    }
}

/// BCC: Branch if Carry Clear (C = 0).
pub(crate) fn execute_bcc(cpu: &mut Mos6502, _bus: &mut dyn MemoryBus, op: &Operands) -> u32 {
    branch_if(!cpu.flag_c, cpu, op)
}

/// BCS: Branch if Carry Set (C = 1).
pub(crate) fn execute_bcs(cpu: &mut Mos6502, _bus: &mut dyn MemoryBus, op: &Operands) -> u32 {
    branch_if(cpu.flag_c, cpu, op)
}

/// BEQ: Branch if Equal (Z = 1).
pub(crate) fn execute_beq(cpu: &mut Mos6502, _bus: &mut dyn MemoryBus, op: &Operands) -> u32 {
    branch_if(cpu.flag_z, cpu, op)
}

/// BNE: Branch if Not Equal (Z = 0).
pub(crate) fn execute_bne(cpu: &mut Mos6502, _bus: &mut dyn MemoryBus, op: &Operands) -> u32 {
    branch_if(!cpu.flag_z, cpu, op)
}

/// BMI: Branch if Minus (N = 1).
pub(crate) fn execute_bmi(cpu: &mut Mos6502, _bus: &mut dyn MemoryBus, op: &Operands) -> u32 {
    branch_if(cpu.flag_n, cpu, op)
}

/// BPL: Branch if Positive (N = 0).
pub(crate) fn execute_bpl(cpu: &mut Mos6502, _bus: &mut dyn MemoryBus, op: &Operands) -> u32 {
    branch_if(!cpu.flag_n, cpu, op)
}

/// BVC: Branch if Overflow Clear (V = 0).
pub(crate) fn execute_bvc(cpu: &mut Mos6502, _bus: &mut dyn MemoryBus, op: &Operands) -> u32 {
    branch_if(!cpu.flag_v, cpu, op)
}

/// BVS: Branch if Overflow Set (V = 1).
pub(crate) fn execute_bvs(cpu: &mut Mos6502, _bus: &mut dyn MemoryBus, op: &Operands) -> u32 {
    branch_if(cpu.flag_v, cpu, op)
}
