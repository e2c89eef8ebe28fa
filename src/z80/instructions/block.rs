//! # Block Instructions
//!
//! The `y` field picks the variant: 4 increments HL, 5 decrements it, 6 and 7
//! do the same and repeat. A repeating instruction that is not finished moves
//! PC back onto itself and costs 5 more T-states, so each iteration is one
//! step and interrupts can be taken between iterations.

use super::field_y;
use crate::cpu::Operands;
use crate::memory::MemoryBus;
use crate::z80::alu::{self, FLAG_C, FLAG_H, FLAG_N, FLAG_PV, FLAG_S, FLAG_X, FLAG_Y, FLAG_Z};
use crate::z80::Z80;

/// (step, repeat) for the opcode.
fn variant(op: &Operands) -> (u16, bool) {
    let y = field_y(op.opcode());
    let step = if y & 1 == 0 { 1 } else { 0xFFFF };
    (step, y >= 6)
}

fn again(cpu: &mut Z80, repeat: bool, condition: bool) -> u32 {
    if repeat && condition {
        cpu.pc = cpu.pc.wrapping_sub(2);
        5
    } else {
        0
    }
}

/// LDI, LDD, LDIR, LDDR
pub(crate) fn execute_block_ld(cpu: &mut Z80, bus: &mut dyn MemoryBus, op: &Operands) -> u32 {
    let (step, repeat) = variant(op);
    let value = bus.read(cpu.hl());
    bus.write(cpu.de(), value);
    cpu.set_hl(cpu.hl().wrapping_add(step));
    cpu.set_de(cpu.de().wrapping_add(step));
    cpu.set_bc(cpu.bc().wrapping_sub(1));

    let n = value.wrapping_add(cpu.a);
    let more = cpu.bc() != 0;
    cpu.f = (cpu.f & (FLAG_S | FLAG_Z | FLAG_C))
        | (n & FLAG_X)
        | ((n << 4) & FLAG_Y)
        | (if more { FLAG_PV } else { 0 });
    again(cpu, repeat, more)
}

/// CPI, CPD, CPIR, CPDR: the repeating forms stop on a match.
pub(crate) fn execute_block_cp(cpu: &mut Z80, bus: &mut dyn MemoryBus, op: &Operands) -> u32 {
    let (step, repeat) = variant(op);
    let value = bus.read(cpu.hl());
    let (result, flags) = alu::sub8(cpu.a, value, false);
    cpu.set_hl(cpu.hl().wrapping_add(step));
    cpu.set_bc(cpu.bc().wrapping_sub(1));

    let more = cpu.bc() != 0;
    let n = result.wrapping_sub((flags & FLAG_H != 0) as u8);
    cpu.f = (flags & (FLAG_S | FLAG_Z | FLAG_H))
        | FLAG_N
        | (cpu.f & FLAG_C)
        | (n & FLAG_X)
        | ((n << 4) & FLAG_Y)
        | (if more { FLAG_PV } else { 0 });
    again(cpu, repeat, more && result != 0)
}

/// INI, IND, INIR, INDR
pub(crate) fn execute_block_in(cpu: &mut Z80, bus: &mut dyn MemoryBus, op: &Operands) -> u32 {
    let (step, repeat) = variant(op);
    let value = bus.port_read(cpu.bc());
    bus.write(cpu.hl(), value);
    cpu.set_hl(cpu.hl().wrapping_add(step));
    cpu.b = cpu.b.wrapping_sub(1);
    cpu.f = (cpu.f & FLAG_C) | alu::sz(cpu.b) | FLAG_N;
    let more = cpu.b != 0;
    again(cpu, repeat, more)
}

/// OUTI, OUTD, OTIR, OTDR: B is decremented before it reaches the port.
pub(crate) fn execute_block_out(cpu: &mut Z80, bus: &mut dyn MemoryBus, op: &Operands) -> u32 {
    let (step, repeat) = variant(op);
    let value = bus.read(cpu.hl());
    cpu.b = cpu.b.wrapping_sub(1);
    bus.port_write(cpu.bc(), value);
    cpu.set_hl(cpu.hl().wrapping_add(step));
    cpu.f = (cpu.f & FLAG_C) | alu::sz(cpu.b) | FLAG_N;
    let more = cpu.b != 0;
    again(cpu, repeat, more)
}
