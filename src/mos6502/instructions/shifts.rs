//! # Shift and Rotate Instructions
//!
//! ASL, LSR, ROL, ROR on the accumulator or on memory. Memory forms are
//! read-modify-write: like the NMOS part they write the unmodified value back
//! before writing the result, which I/O registers can observe.

use crate::cpu::Operands;
use crate::memory::MemoryBus;
use crate::mos6502::opcodes::addressing_mode_of;
use crate::mos6502::{AddressingMode, Mos6502};
use crate::numeric::UByte;

/// Applies `f` to the accumulator or memory operand and sets Z and N from the
/// result.
pub(crate) fn read_modify_write<F>(cpu: &mut Mos6502, bus: &mut dyn MemoryBus, op: &Operands, f: F) -> u32
where
    F: FnOnce(&mut Mos6502, u8) -> u8,
{
    let mode = addressing_mode_of(op.opcode());
    let result = if mode == AddressingMode::Accumulator {
        let a = cpu.a;
        let result = f(cpu, a);
        cpu.a = result;
        result
    } else {
        let (addr, _) = cpu.effective_address(bus, mode, op);
        let old = bus.read(addr);
        let result = f(cpu, old);
        bus.write(addr, old);
        bus.write(addr, result);
        result
    };
    cpu.set_zn(result);
    0
}

/// ASL: Arithmetic Shift Left. Bit 7 goes to C, 0 enters bit 0.
pub(crate) fn execute_asl(cpu: &mut Mos6502, bus: &mut dyn MemoryBus, op: &Operands) -> u32 {
    read_modify_write(cpu, bus, op, |cpu, value| {
        let mut byte = UByte::new(value);
        cpu.flag_c = byte.shift_left_c(false);
        byte.value()
    })
}

/// LSR: Logical Shift Right. Bit 0 goes to C, 0 enters bit 7.
pub(crate) fn execute_lsr(cpu: &mut Mos6502, bus: &mut dyn MemoryBus, op: &Operands) -> u32 {
    read_modify_write(cpu, bus, op, |cpu, value| {
        let mut byte = UByte::new(value);
        cpu.flag_c = byte.shift_right_c(false);
        byte.value()
    })
}

/// ROL: Rotate Left through carry.
pub(crate) fn execute_rol(cpu: &mut Mos6502, bus: &mut dyn MemoryBus, op: &Operands) -> u32 {
    read_modify_write(cpu, bus, op, |cpu, value| {
        let mut byte = UByte::new(value);
        cpu.flag_c = byte.rotate_left_c(cpu.flag_c, 1);
        byte.value()
    })
}

/// ROR: Rotate Right through carry.
pub(crate) fn execute_ror(cpu: &mut Mos6502, bus: &mut dyn MemoryBus, op: &Operands) -> u32 {
    read_modify_write(cpu, bus, op, |cpu, value| {
        let mut byte = UByte::new(value);
        cpu.flag_c = byte.rotate_right_c(cpu.flag_c, 1);
        byte.value()
    })
}
