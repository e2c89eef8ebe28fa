//! # Flag Instructions
//!
//! CLC, SEC, CLI, SEI, CLD, SED, CLV. Each sets or clears one status flag and
//! takes 2 cycles.

use crate::cpu::Operands;
use crate::memory::MemoryBus;
use crate::mos6502::Mos6502;

/// CLC: Clear Carry Flag.
pub(crate) fn execute_clc(cpu: &mut Mos6502, _bus: &mut dyn MemoryBus, _op: &Operands) -> u32 {
    cpu.flag_c = false;
    0
}

/// SEC: Set Carry Flag.
pub(crate) fn execute_sec(cpu: &mut Mos6502, _bus: &mut dyn MemoryBus, _op: &Operands) -> u32 {
    cpu.flag_c = true;
    0
}

/// CLI: Clear Interrupt Disable. A pending IRQ is served before the next fetch.
pub(crate) fn execute_cli(cpu: &mut Mos6502, _bus: &mut dyn MemoryBus, _op: &Operands) -> u32 {
    cpu.flag_i = false;
    0
}

/// SEI: Set Interrupt Disable.
pub(crate) fn execute_sei(cpu: &mut Mos6502, _bus: &mut dyn MemoryBus, _op: &Operands) -> u32 {
    cpu.flag_i = true;
    0
}

/// CLD: Clear Decimal Mode.
pub(crate) fn execute_cld(cpu: &mut Mos6502, _bus: &mut dyn MemoryBus, _op: &Operands) -> u32 {
    cpu.flag_d = false;
    0
}

/// SED: Set Decimal Mode.
pub(crate) fn execute_sed(cpu: &mut Mos6502, _bus: &mut dyn MemoryBus, _op: &Operands) -> u32 {
    cpu.flag_d = true;
    0
}

/// CLV: Clear Overflow Flag. There is no SEV.
pub(crate) fn execute_clv(cpu: &mut Mos6502, _bus: &mut dyn MemoryBus, _op: &Operands) -> u32 {
    cpu.flag_v = false;
    0
}
