//! # Arithmetic and Logic

use super::{field_p, field_y, field_z};
use crate::cpu::Operands;
use crate::memory::MemoryBus;
use crate::z80::alu::{self, FLAG_C, FLAG_H, FLAG_N, FLAG_PV, FLAG_S, FLAG_X, FLAG_Y, FLAG_Z};
use crate::z80::{Index, Z80};

/// Applies ALU operation `y` (ADD ADC SUB SBC AND XOR OR CP) to A.
fn alu_op(cpu: &mut Z80, y: u8, value: u8) {
    let carry = cpu.f & FLAG_C != 0;
    let (result, flags) = match y {
        0 => alu::add8(cpu.a, value, false),
        1 => alu::add8(cpu.a, value, carry),
        2 => alu::sub8(cpu.a, value, false),
        3 => alu::sub8(cpu.a, value, carry),
        4 => alu::and8(cpu.a, value),
        5 => alu::xor8(cpu.a, value),
        6 => alu::or8(cpu.a, value),
        _ => (cpu.a, alu::compare(cpu.a, value)),
    };
    cpu.a = result;
    cpu.f = flags;
}

/// ALU A,r
pub(crate) fn execute_alu_r(cpu: &mut Z80, bus: &mut dyn MemoryBus, op: &Operands) -> u32 {
    let value = cpu.read_r(bus, field_z(op.opcode()), Index::of(op.prefix()), op);
    alu_op(cpu, field_y(op.opcode()), value);
    0
}

/// ALU A,n
pub(crate) fn execute_alu_n(cpu: &mut Z80, _bus: &mut dyn MemoryBus, op: &Operands) -> u32 {
    alu_op(cpu, field_y(op.opcode()), op.byte(0));
    0
}

/// INC r
pub(crate) fn execute_inc_r(cpu: &mut Z80, bus: &mut dyn MemoryBus, op: &Operands) -> u32 {
    let index = Index::of(op.prefix());
    let y = field_y(op.opcode());
    let value = cpu.read_r(bus, y, index, op);
    let (result, flags) = alu::inc8(value, cpu.f);
    cpu.write_r(bus, y, index, op, result);
    cpu.f = flags;
    0
}

/// DEC r
pub(crate) fn execute_dec_r(cpu: &mut Z80, bus: &mut dyn MemoryBus, op: &Operands) -> u32 {
    let index = Index::of(op.prefix());
    let y = field_y(op.opcode());
    let value = cpu.read_r(bus, y, index, op);
    let (result, flags) = alu::dec8(value, cpu.f);
    cpu.write_r(bus, y, index, op, result);
    cpu.f = flags;
    0
}

/// INC rp. No flags.
pub(crate) fn execute_inc_rp(cpu: &mut Z80, _bus: &mut dyn MemoryBus, op: &Operands) -> u32 {
    let index = Index::of(op.prefix());
    let p = field_p(op.opcode());
    let value = cpu.pair(p, index).wrapping_add(1);
    cpu.set_pair(p, index, value);
    0
}

/// DEC rp. No flags.
pub(crate) fn execute_dec_rp(cpu: &mut Z80, _bus: &mut dyn MemoryBus, op: &Operands) -> u32 {
    let index = Index::of(op.prefix());
    let p = field_p(op.opcode());
    let value = cpu.pair(p, index).wrapping_sub(1);
    cpu.set_pair(p, index, value);
    0
}

/// ADD HL,rp
pub(crate) fn execute_add_hl_rp(cpu: &mut Z80, _bus: &mut dyn MemoryBus, op: &Operands) -> u32 {
    let index = Index::of(op.prefix());
    let rhs = cpu.pair(field_p(op.opcode()), index);
    let (result, flags) = alu::add16(cpu.index_reg(index), rhs, cpu.f);
    cpu.set_index_reg(index, result);
    cpu.f = flags;
    0
}

/// ED: ADC HL,rp
pub(crate) fn execute_adc_hl(cpu: &mut Z80, _bus: &mut dyn MemoryBus, op: &Operands) -> u32 {
    let rhs = cpu.pair(field_p(op.opcode()), Index::Hl);
    let (result, flags) = alu::adc16(cpu.hl(), rhs, cpu.f & FLAG_C != 0);
    cpu.set_hl(result);
    cpu.f = flags;
    0
}

/// ED: SBC HL,rp
pub(crate) fn execute_sbc_hl(cpu: &mut Z80, _bus: &mut dyn MemoryBus, op: &Operands) -> u32 {
    let rhs = cpu.pair(field_p(op.opcode()), Index::Hl);
    let (result, flags) = alu::sbc16(cpu.hl(), rhs, cpu.f & FLAG_C != 0);
    cpu.set_hl(result);
    cpu.f = flags;
    0
}

/// RLCA, RRCA, RLA, RRA
pub(crate) fn execute_rotate_a(cpu: &mut Z80, _bus: &mut dyn MemoryBus, op: &Operands) -> u32 {
    let (result, flags) = alu::rotate_accumulator(field_y(op.opcode()), cpu.a, cpu.f);
    cpu.a = result;
    cpu.f = flags;
    0
}

/// DAA
pub(crate) fn execute_daa(cpu: &mut Z80, _bus: &mut dyn MemoryBus, _op: &Operands) -> u32 {
    let (result, flags) = alu::daa(cpu.a, cpu.f);
    cpu.a = result;
    cpu.f = flags;
    0
}

/// CPL: complements A. Sets H and N.
pub(crate) fn execute_cpl(cpu: &mut Z80, _bus: &mut dyn MemoryBus, _op: &Operands) -> u32 {
    cpu.a = !cpu.a;
    cpu.f = (cpu.f & (FLAG_S | FLAG_Z | FLAG_PV | FLAG_C)) | FLAG_H | FLAG_N | (cpu.a & (FLAG_Y | FLAG_X));
    0
}

/// SCF
pub(crate) fn execute_scf(cpu: &mut Z80, _bus: &mut dyn MemoryBus, _op: &Operands) -> u32 {
    cpu.f = (cpu.f & (FLAG_S | FLAG_Z | FLAG_PV)) | FLAG_C | (cpu.a & (FLAG_Y | FLAG_X));
    0
}

/// CCF: H receives the old carry.
pub(crate) fn execute_ccf(cpu: &mut Z80, _bus: &mut dyn MemoryBus, _op: &Operands) -> u32 {
    let carry = cpu.f & FLAG_C != 0;
    let h = if carry { FLAG_H } else { 0 };
    let c = if carry { 0 } else { FLAG_C };
    cpu.f = (cpu.f & (FLAG_S | FLAG_Z | FLAG_PV)) | h | c | (cpu.a & (FLAG_Y | FLAG_X));
    0
}

/// ED: NEG
pub(crate) fn execute_neg(cpu: &mut Z80, _bus: &mut dyn MemoryBus, _op: &Operands) -> u32 {
    let (result, flags) = alu::sub8(0, cpu.a, false);
    cpu.a = result;
    cpu.f = flags;
    0
}

/// ED: RLD. Rotates the digits of A's low nibble and (HL) left.
pub(crate) fn execute_rld(cpu: &mut Z80, bus: &mut dyn MemoryBus, _op: &Operands) -> u32 {
    let addr = cpu.hl();
    let value = bus.read(addr);
    bus.write(addr, (value << 4) | (cpu.a & 0x0F));
    cpu.a = (cpu.a & 0xF0) | (value >> 4);
    cpu.f = (cpu.f & FLAG_C) | alu::szp(cpu.a);
    0
}

/// ED: RRD. Rotates the digits of A's low nibble and (HL) right.
pub(crate) fn execute_rrd(cpu: &mut Z80, bus: &mut dyn MemoryBus, _op: &Operands) -> u32 {
    let addr = cpu.hl();
    let value = bus.read(addr);
    bus.write(addr, (cpu.a << 4) | (value >> 4));
    cpu.a = (cpu.a & 0xF0) | (value & 0x0F);
    cpu.f = (cpu.f & FLAG_C) | alu::szp(cpu.a);
    0
}
