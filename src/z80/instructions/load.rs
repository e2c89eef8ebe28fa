//! # Loads, Exchanges and Stack

use super::{field_p, field_y, field_z};
use crate::cpu::Operands;
use crate::memory::MemoryBus;
use crate::z80::alu::{sz, FLAG_C, FLAG_PV};
use crate::z80::{Index, Z80};

/// LD rp,nn
pub(crate) fn execute_ld_rp_nn(cpu: &mut Z80, _bus: &mut dyn MemoryBus, op: &Operands) -> u32 {
    let index = Index::of(op.prefix());
    cpu.set_pair(field_p(op.opcode()), index, op.word(0));
    0
}

/// LD (BC),A / LD (DE),A / LD (nn),HL / LD (nn),A
pub(crate) fn execute_ld_indirect_a(cpu: &mut Z80, bus: &mut dyn MemoryBus, op: &Operands) -> u32 {
    let index = Index::of(op.prefix());
    match field_p(op.opcode()) {
        0 => bus.write(cpu.bc(), cpu.a),
        1 => bus.write(cpu.de(), cpu.a),
        2 => Z80::write_word(bus, op.word(0), cpu.index_reg(index)),
        _ => bus.write(op.word(0), cpu.a),
    }
    0
}

/// LD A,(BC) / LD A,(DE) / LD HL,(nn) / LD A,(nn)
pub(crate) fn execute_ld_a_indirect(cpu: &mut Z80, bus: &mut dyn MemoryBus, op: &Operands) -> u32 {
    let index = Index::of(op.prefix());
    match field_p(op.opcode()) {
        0 => cpu.a = bus.read(cpu.bc()),
        1 => cpu.a = bus.read(cpu.de()),
        2 => {
            let value = Z80::read_word(bus, op.word(0));
            cpu.set_index_reg(index, value);
        }
        _ => cpu.a = bus.read(op.word(0)),
    }
    0
}

/// LD r,n. With an index prefix and `(IX+d)` the value follows the displacement.
pub(crate) fn execute_ld_r_n(cpu: &mut Z80, bus: &mut dyn MemoryBus, op: &Operands) -> u32 {
    let index = Index::of(op.prefix());
    let y = field_y(op.opcode());
    let n = if y == 6 && index != Index::Hl {
        op.byte(1)
    } else {
        op.byte(0)
    };
    cpu.write_r(bus, y, index, op, n);
    0
}

/// LD r,r'. When one side is `(IX+d)` the other side's H and L stay plain.
pub(crate) fn execute_ld_r_r(cpu: &mut Z80, bus: &mut dyn MemoryBus, op: &Operands) -> u32 {
    let index = Index::of(op.prefix());
    let y = field_y(op.opcode());
    let z = field_z(op.opcode());
    let registers = if y == 6 || z == 6 { Index::Hl } else { index };

    let value = if z == 6 {
        bus.read(cpu.memory_operand(index, op))
    } else {
        cpu.reg(z, registers)
    };
    if y == 6 {
        bus.write(cpu.memory_operand(index, op), value);
    } else {
        cpu.set_reg(y, registers, value);
    }
    0
}

/// LD SP,HL
pub(crate) fn execute_ld_sp_hl(cpu: &mut Z80, _bus: &mut dyn MemoryBus, op: &Operands) -> u32 {
    cpu.sp = cpu.index_reg(Index::of(op.prefix()));
    0
}

/// EX AF,AF'
pub(crate) fn execute_ex_af_af(cpu: &mut Z80, _bus: &mut dyn MemoryBus, _op: &Operands) -> u32 {
    let af = cpu.af();
    cpu.set_af(cpu.af_alt);
    cpu.af_alt = af;
    0
}

/// EXX: swaps BC, DE, HL with their shadows.
pub(crate) fn execute_exx(cpu: &mut Z80, _bus: &mut dyn MemoryBus, _op: &Operands) -> u32 {
    let (bc, de, hl) = (cpu.bc(), cpu.de(), cpu.hl());
    cpu.set_bc(cpu.bc_alt);
    cpu.set_de(cpu.de_alt);
    cpu.set_hl(cpu.hl_alt);
    cpu.bc_alt = bc;
    cpu.de_alt = de;
    cpu.hl_alt = hl;
    0
}

/// EX DE,HL. Not affected by index prefixes.
pub(crate) fn execute_ex_de_hl(cpu: &mut Z80, _bus: &mut dyn MemoryBus, _op: &Operands) -> u32 {
    let de = cpu.de();
    cpu.set_de(cpu.hl());
    cpu.set_hl(de);
    0
}

/// EX (SP),HL
pub(crate) fn execute_ex_sp_hl(cpu: &mut Z80, bus: &mut dyn MemoryBus, op: &Operands) -> u32 {
    let index = Index::of(op.prefix());
    let stacked = Z80::read_word(bus, cpu.sp);
    Z80::write_word(bus, cpu.sp, cpu.index_reg(index));
    cpu.set_index_reg(index, stacked);
    0
}

/// PUSH rp2
pub(crate) fn execute_push(cpu: &mut Z80, bus: &mut dyn MemoryBus, op: &Operands) -> u32 {
    let value = cpu.pair_af(field_p(op.opcode()), Index::of(op.prefix()));
    cpu.push(bus, value);
    0
}

/// POP rp2
pub(crate) fn execute_pop(cpu: &mut Z80, bus: &mut dyn MemoryBus, op: &Operands) -> u32 {
    let value = cpu.pop(bus);
    cpu.set_pair_af(field_p(op.opcode()), Index::of(op.prefix()), value);
    0
}

/// ED: LD (nn),rp
pub(crate) fn execute_ld_nn_rp(cpu: &mut Z80, bus: &mut dyn MemoryBus, op: &Operands) -> u32 {
    let value = cpu.pair(field_p(op.opcode()), Index::Hl);
    Z80::write_word(bus, op.word(0), value);
    0
}

/// ED: LD rp,(nn)
pub(crate) fn execute_ld_rp_from_nn(cpu: &mut Z80, bus: &mut dyn MemoryBus, op: &Operands) -> u32 {
    let value = Z80::read_word(bus, op.word(0));
    cpu.set_pair(field_p(op.opcode()), Index::Hl, value);
    0
}

/// LD I,A
pub(crate) fn execute_ld_i_a(cpu: &mut Z80, _bus: &mut dyn MemoryBus, _op: &Operands) -> u32 {
    cpu.i = cpu.a;
    0
}

/// LD R,A. The only way to set bit 7 of R.
pub(crate) fn execute_ld_r_a(cpu: &mut Z80, _bus: &mut dyn MemoryBus, _op: &Operands) -> u32 {
    cpu.r = cpu.a;
    0
}

/// LD A,I: P/V receives IFF2.
pub(crate) fn execute_ld_a_i(cpu: &mut Z80, _bus: &mut dyn MemoryBus, _op: &Operands) -> u32 {
    cpu.a = cpu.i;
    load_special_flags(cpu);
    0
}

/// LD A,R: P/V receives IFF2.
pub(crate) fn execute_ld_a_r(cpu: &mut Z80, _bus: &mut dyn MemoryBus, _op: &Operands) -> u32 {
    cpu.a = cpu.r;
    load_special_flags(cpu);
    0
}

fn load_special_flags(cpu: &mut Z80) {
    let pv = if cpu.iff2 { FLAG_PV } else { 0 };
    cpu.f = (cpu.f & FLAG_C) | sz(cpu.a) | pv;
}
