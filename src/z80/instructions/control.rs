//! # Jumps, Calls, Returns and CPU Control

use super::field_y;
use crate::cpu::Operands;
use crate::memory::MemoryBus;
use crate::z80::{Index, InterruptMode, Z80};

/// NOP
pub(crate) fn execute_nop(_cpu: &mut Z80, _bus: &mut dyn MemoryBus, _op: &Operands) -> u32 {
    0
}

/// HALT: waits for an interrupt, PC already past the instruction.
pub(crate) fn execute_halt(cpu: &mut Z80, _bus: &mut dyn MemoryBus, _op: &Operands) -> u32 {
    cpu.halted = true;
    0
}

/// DJNZ d: decrements B and jumps while it is not zero. 13 T-states taken.
pub(crate) fn execute_djnz(cpu: &mut Z80, _bus: &mut dyn MemoryBus, op: &Operands) -> u32 {
    cpu.b = cpu.b.wrapping_sub(1);
    if cpu.b != 0 {
        cpu.pc = cpu.pc.wrapping_add_signed(op.offset(0) as i16);
        5
    } else {
        0
    }
}

/// JR d
pub(crate) fn execute_jr(cpu: &mut Z80, _bus: &mut dyn MemoryBus, op: &Operands) -> u32 {
    cpu.pc = cpu.pc.wrapping_add_signed(op.offset(0) as i16);
    0
}

/// JR cc,d: only NZ, Z, NC and C exist. 12 T-states taken.
pub(crate) fn execute_jr_cc(cpu: &mut Z80, _bus: &mut dyn MemoryBus, op: &Operands) -> u32 {
    if cpu.condition(field_y(op.opcode()) - 4) {
        cpu.pc = cpu.pc.wrapping_add_signed(op.offset(0) as i16);
        5
    } else {
        0
    }
}

/// JP nn
pub(crate) fn execute_jp(cpu: &mut Z80, _bus: &mut dyn MemoryBus, op: &Operands) -> u32 {
    cpu.pc = op.word(0);
    0
}

/// JP cc,nn. Same time either way.
pub(crate) fn execute_jp_cc(cpu: &mut Z80, _bus: &mut dyn MemoryBus, op: &Operands) -> u32 {
    if cpu.condition(field_y(op.opcode())) {
        cpu.pc = op.word(0);
    }
    0
}

/// JP (HL): jumps to HL itself, not through it.
pub(crate) fn execute_jp_hl(cpu: &mut Z80, _bus: &mut dyn MemoryBus, op: &Operands) -> u32 {
    cpu.pc = cpu.index_reg(Index::of(op.prefix()));
    0
}

/// CALL nn
pub(crate) fn execute_call(cpu: &mut Z80, bus: &mut dyn MemoryBus, op: &Operands) -> u32 {
    cpu.push(bus, cpu.pc);
    cpu.pc = op.word(0);
    0
}

/// CALL cc,nn. 17 T-states taken.
pub(crate) fn execute_call_cc(cpu: &mut Z80, bus: &mut dyn MemoryBus, op: &Operands) -> u32 {
    if cpu.condition(field_y(op.opcode())) {
        cpu.push(bus, cpu.pc);
        cpu.pc = op.word(0);
        7
    } else {
        0
    }
}

/// RET
pub(crate) fn execute_ret(cpu: &mut Z80, bus: &mut dyn MemoryBus, _op: &Operands) -> u32 {
    cpu.pc = cpu.pop(bus);
    0
}

/// RET cc. 11 T-states taken.
pub(crate) fn execute_ret_cc(cpu: &mut Z80, bus: &mut dyn MemoryBus, op: &Operands) -> u32 {
    if cpu.condition(field_y(op.opcode())) {
        cpu.pc = cpu.pop(bus);
        6
    } else {
        0
    }
}

/// RST p: call to `y * 8`.
pub(crate) fn execute_rst(cpu: &mut Z80, bus: &mut dyn MemoryBus, op: &Operands) -> u32 {
    cpu.push(bus, cpu.pc);
    cpu.pc = (field_y(op.opcode()) as u16) * 8;
    0
}

/// DI
pub(crate) fn execute_di(cpu: &mut Z80, _bus: &mut dyn MemoryBus, _op: &Operands) -> u32 {
    cpu.iff1 = false;
    cpu.iff2 = false;
    0
}

/// EI: takes effect after the next instruction. Also ends the interrupt in
/// execution, as handlers re-enable interrupts on their way out.
pub(crate) fn execute_ei(cpu: &mut Z80, _bus: &mut dyn MemoryBus, _op: &Operands) -> u32 {
    cpu.iff1 = true;
    cpu.iff2 = true;
    cpu.ei_delay = true;
    cpu.interrupts.end_service();
    0
}

/// ED: RETN. IFF1 is restored from IFF2.
pub(crate) fn execute_retn(cpu: &mut Z80, bus: &mut dyn MemoryBus, _op: &Operands) -> u32 {
    cpu.pc = cpu.pop(bus);
    cpu.iff1 = cpu.iff2;
    cpu.interrupts.end_service();
    0
}

/// ED: RETI
pub(crate) fn execute_reti(cpu: &mut Z80, bus: &mut dyn MemoryBus, _op: &Operands) -> u32 {
    cpu.pc = cpu.pop(bus);
    cpu.iff1 = cpu.iff2;
    cpu.interrupts.end_service();
    0
}

/// ED: IM 0 / IM 1 / IM 2
pub(crate) fn execute_im(cpu: &mut Z80, _bus: &mut dyn MemoryBus, op: &Operands) -> u32 {
    cpu.im = match field_y(op.opcode()) & 3 {
        2 => InterruptMode::Mode1,
        3 => InterruptMode::Mode2,
        _ => InterruptMode::Mode0,
    };
    0
}
