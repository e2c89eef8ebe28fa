//! # Port I/O
//!
//! Ports are 16-bit: `(n)` forms put A on the high byte, `(C)` forms use BC.

use super::field_y;
use crate::cpu::Operands;
use crate::memory::MemoryBus;
use crate::z80::alu::{szp, FLAG_C};
use crate::z80::{Index, Z80};

/// OUT (n),A
pub(crate) fn execute_out_n_a(cpu: &mut Z80, bus: &mut dyn MemoryBus, op: &Operands) -> u32 {
    let port = u16::from_be_bytes([cpu.a, op.byte(0)]);
    bus.port_write(port, cpu.a);
    0
}

/// IN A,(n). No flags.
pub(crate) fn execute_in_a_n(cpu: &mut Z80, bus: &mut dyn MemoryBus, op: &Operands) -> u32 {
    let port = u16::from_be_bytes([cpu.a, op.byte(0)]);
    cpu.a = bus.port_read(port);
    0
}

/// ED: IN r,(C). `IN F,(C)` only sets the flags.
pub(crate) fn execute_in_r_c(cpu: &mut Z80, bus: &mut dyn MemoryBus, op: &Operands) -> u32 {
    let value = bus.port_read(cpu.bc());
    let y = field_y(op.opcode());
    if y != 6 {
        cpu.set_reg(y, Index::Hl, value);
    }
    cpu.f = (cpu.f & FLAG_C) | szp(value);
    0
}

/// ED: OUT (C),r
pub(crate) fn execute_out_c_r(cpu: &mut Z80, bus: &mut dyn MemoryBus, op: &Operands) -> u32 {
    let value = cpu.reg(field_y(op.opcode()), Index::Hl);
    bus.port_write(cpu.bc(), value);
    0
}
