//! # Load and Store Instructions
//!
//! LDA, LDX, LDY load a register and update Z and N. STA, STX, STY write a
//! register and affect no flags. Indexed stores always take their worst-case
//! time, so only loads pay the page-crossing cycle.

use super::page_penalty;
use crate::cpu::Operands;
use crate::memory::MemoryBus;
use crate::mos6502::opcodes::addressing_mode_of;
use crate::mos6502::Mos6502;

/// LDA: Load Accumulator.
pub(crate) fn execute_lda(cpu: &mut Mos6502, bus: &mut dyn MemoryBus, op: &Operands) -> u32 {
    let mode = addressing_mode_of(op.opcode());
    let (value, page_crossed) = cpu.operand_value(bus, mode, op);
    cpu.a = value;
    cpu.set_zn(value);
    page_penalty(mode, page_crossed)
}

/// LDX: Load X Register.
pub(crate) fn execute_ldx(cpu: &mut Mos6502, bus: &mut dyn MemoryBus, op: &Operands) -> u32 {
    let mode = addressing_mode_of(op.opcode());
    let (value, page_crossed) = cpu.operand_value(bus, mode, op);
    cpu.x = value;
    cpu.set_zn(value);
    page_penalty(mode, page_crossed)
}

/// LDY: Load Y Register.
pub(crate) fn execute_ldy(cpu: &mut Mos6502, bus: &mut dyn MemoryBus, op: &Operands) -> u32 {
    let mode = addressing_mode_of(op.opcode());
    let (value, page_crossed) = cpu.operand_value(bus, mode, op);
    cpu.y = value;
    cpu.set_zn(value);
    page_penalty(mode, page_crossed)
}

fn store(cpu: &mut Mos6502, bus: &mut dyn MemoryBus, op: &Operands, value: u8) -> u32 {
    let mode = addressing_mode_of(op.opcode());
    let (addr, _) = cpu.effective_address(bus, mode, op);
    bus.write(addr, value);
    0
}

/// STA: Store Accumulator.
pub(crate) fn execute_sta(cpu: &mut Mos6502, bus: &mut dyn MemoryBus, op: &Operands) -> u32 {
    let value = cpu.a;
    store(cpu, bus, op, value)
}

/// STX: Store X Register.
pub(crate) fn execute_stx(cpu: &mut Mos6502, bus: &mut dyn MemoryBus, op: &Operands) -> u32 {
    let value = cpu.x;
    store(cpu, bus, op, value)
}

/// STY: Store Y Register.
pub(crate) fn execute_sty(cpu: &mut Mos6502, bus: &mut dyn MemoryBus, op: &Operands) -> u32 {
    let value = cpu.y;
    store(cpu, bus, op, value)
}
