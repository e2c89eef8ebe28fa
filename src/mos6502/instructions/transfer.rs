//! # Register Transfer Instructions
//!
//! TAX, TAY, TXA, TYA, TSX update Z and N from the copied value. TXS does not
//! touch the flags.

use crate::cpu::Operands;
use crate::memory::MemoryBus;
use crate::mos6502::Mos6502;

/// TAX: Transfer A to X.
pub(crate) fn execute_tax(cpu: &mut Mos6502, _bus: &mut dyn MemoryBus, _op: &Operands) -> u32 {
    cpu.x = cpu.a;
    cpu.set_zn(cpu.x);
    0
}

/// TAY: Transfer A to Y.
pub(crate) fn execute_tay(cpu: &mut Mos6502, _bus: &mut dyn MemoryBus, _op: &Operands) -> u32 {
    cpu.y = cpu.a;
    cpu.set_zn(cpu.y);
    0
}

/// TXA: Transfer X to A.
pub(crate) fn execute_txa(cpu: &mut Mos6502, _bus: &mut dyn MemoryBus, _op: &Operands) -> u32 {
    cpu.a = cpu.x;
    cpu.set_zn(cpu.a);
    0
}

/// TYA: Transfer Y to A.
pub(crate) fn execute_tya(cpu: &mut Mos6502, _bus: &mut dyn MemoryBus, _op: &Operands) -> u32 {
    cpu.a = cpu.y;
    cpu.set_zn(cpu.a);
    0
}

/// TSX: Transfer SP to X.
pub(crate) fn execute_tsx(cpu: &mut Mos6502, _bus: &mut dyn MemoryBus, _op: &Operands) -> u32 {
    cpu.x = cpu.sp;
    cpu.set_zn(cpu.x);
    0
}

/// TXS: Transfer X to SP.
pub(crate) fn execute_txs(cpu: &mut Mos6502, _bus: &mut dyn MemoryBus, _op: &Operands) -> u32 {
    cpu.sp = cpu.x;
    0
}
