//! # Increment and Decrement Instructions
//!
//! INC and DEC modify memory (read-modify-write); INX, INY, DEX, DEY modify
//! the index registers. All wrap at 8 bits and update Z and N.

use super::shifts::read_modify_write;
use crate::cpu::Operands;
use crate::memory::MemoryBus;
use crate::mos6502::Mos6502;

/// INC: Increment Memory.
pub(crate) fn execute_inc(cpu: &mut Mos6502, bus: &mut dyn MemoryBus, op: &Operands) -> u32 {
    read_modify_write(cpu, bus, op, |_, value| value.wrapping_add(1))
}

/// DEC: Decrement Memory.
pub(crate) fn execute_dec(cpu: &mut Mos6502, bus: &mut dyn MemoryBus, op: &Operands) -> u32 {
    read_modify_write(cpu, bus, op, |_, value| value.wrapping_sub(1))
}

/// INX: Increment X.
pub(crate) fn execute_inx(cpu: &mut Mos6502, _bus: &mut dyn MemoryBus, _op: &Operands) -> u32 {
    cpu.x = cpu.x.wrapping_add(1);
    cpu.set_zn(cpu.x);
    0
}

/// INY: Increment Y.
pub(crate) fn execute_iny(cpu: &mut Mos6502, _bus: &mut dyn MemoryBus, _op: &Operands) -> u32 {
    cpu.y = cpu.y.wrapping_add(1);
    cpu.set_zn(cpu.y);
    0
}

/// DEX: Decrement X.
pub(crate) fn execute_dex(cpu: &mut Mos6502, _bus: &mut dyn MemoryBus, _op: &Operands) -> u32 {
    cpu.x = cpu.x.wrapping_sub(1);
    cpu.set_zn(cpu.x);
    0
}

/// DEY: Decrement Y.
pub(crate) fn execute_dey(cpu: &mut Mos6502, _bus: &mut dyn MemoryBus, _op: &Operands) -> u32 {
    cpu.y = cpu.y.wrapping_sub(1);
    cpu.set_zn(cpu.y);
    0
}
