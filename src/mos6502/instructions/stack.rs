//! # Stack Instructions
//!
//! The stack lives in page one ($0100-$01FF) and grows downward; SP points at
//! the next free byte.

use crate::cpu::Operands;
use crate::memory::MemoryBus;
use crate::mos6502::{Mos6502, FLAG_B, FLAG_UNUSED};

/// PHA: Push Accumulator.
pub(crate) fn execute_pha(cpu: &mut Mos6502, bus: &mut dyn MemoryBus, _op: &Operands) -> u32 {
    let value = cpu.a;
    cpu.push(bus, value);
    0
}

/// PHP: Push Processor Status. The pushed copy has B and bit 5 set.
pub(crate) fn execute_php(cpu: &mut Mos6502, bus: &mut dyn MemoryBus, _op: &Operands) -> u32 {
    let status = cpu.status() | FLAG_B | FLAG_UNUSED;
    cpu.push(bus, status);
    0
}

/// PLA: Pull Accumulator. Updates Z and N.
pub(crate) fn execute_pla(cpu: &mut Mos6502, bus: &mut dyn MemoryBus, _op: &Operands) -> u32 {
    cpu.a = cpu.pull(bus);
    cpu.set_zn(cpu.a);
    0
}

/// PLP: Pull Processor Status. B and bit 5 of the pulled byte are ignored.
pub(crate) fn execute_plp(cpu: &mut Mos6502, bus: &mut dyn MemoryBus, _op: &Operands) -> u32 {
    let status = cpu.pull(bus);
    cpu.set_status(status);
    0
}
