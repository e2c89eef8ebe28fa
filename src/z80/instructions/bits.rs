//! # CB-Prefixed Bit Operations
//!
//! Rotates and shifts, BIT, RES and SET. Under `DDCB`/`FDCB` the operand is
//! always `(IX+d)`, and forms whose `z` field names a register also copy the
//! result into that register.

use super::{field_y, field_z};
use crate::cpu::Operands;
use crate::memory::MemoryBus;
use crate::z80::alu;
use crate::z80::{Index, Z80};

/// Runs `f` on the operand and stores the result back.
fn modify<F>(cpu: &mut Z80, bus: &mut dyn MemoryBus, op: &Operands, f: F)
where
    F: FnOnce(&mut Z80, u8) -> u8,
{
    let index = Index::of(op.prefix());
    let z = field_z(op.opcode());
    if index == Index::Hl {
        let value = cpu.read_r(bus, z, Index::Hl, op);
        let result = f(cpu, value);
        cpu.write_r(bus, z, Index::Hl, op, result);
    } else {
        let addr = cpu.memory_operand(index, op);
        let value = bus.read(addr);
        let result = f(cpu, value);
        bus.write(addr, result);
        if z != 6 {
            cpu.set_reg(z, Index::Hl, result);
        }
    }
}

/// RLC RRC RL RR SLA SRA SLL SRL
pub(crate) fn execute_cb_rotate(cpu: &mut Z80, bus: &mut dyn MemoryBus, op: &Operands) -> u32 {
    let y = field_y(op.opcode());
    modify(cpu, bus, op, |cpu, value| {
        let (result, flags) = alu::rotate_shift(y, value, cpu.f);
        cpu.f = flags;
        result
    });
    0
}

/// BIT b,r
pub(crate) fn execute_cb_bit(cpu: &mut Z80, bus: &mut dyn MemoryBus, op: &Operands) -> u32 {
    let index = Index::of(op.prefix());
    let value = if index == Index::Hl {
        cpu.read_r(bus, field_z(op.opcode()), Index::Hl, op)
    } else {
        bus.read(cpu.memory_operand(index, op))
    };
    cpu.f = alu::bit(field_y(op.opcode()), value, cpu.f);
    0
}

/// RES b,r
pub(crate) fn execute_cb_res(cpu: &mut Z80, bus: &mut dyn MemoryBus, op: &Operands) -> u32 {
    let mask = !(1u8 << field_y(op.opcode()));
    modify(cpu, bus, op, |_, value| value & mask);
    0
}

/// SET b,r
pub(crate) fn execute_cb_set(cpu: &mut Z80, bus: &mut dyn MemoryBus, op: &Operands) -> u32 {
    let mask = 1u8 << field_y(op.opcode());
    modify(cpu, bus, op, |_, value| value | mask);
    0
}
