//! # Control Flow Instructions
//!
//! This module implements control flow operations:
//! - BRK: Force Interrupt
//! - JMP: Jump to address
//! - JSR, RTS: Subroutine call and return
//! - RTI: Return from interrupt
//! - NOP: No operation
//!
//! BRK is a software interrupt that:
//! 1. Pushes the BRK address + 2 to the stack (high byte first, then low byte)
//! 2. Pushes processor status to stack with B flag set
//! 3. Sets the I (interrupt disable) flag
//! 4. Loads PC from IRQ vector at $FFFE/F
//!
//! It also opens a software entry in the interrupt queue, which the
//! handler's RTI closes.

use crate::cpu::Operands;
use crate::memory::MemoryBus;
use crate::mos6502::opcodes::addressing_mode_of;
use crate::mos6502::{Mos6502, FLAG_B, FLAG_UNUSED, VECTORS};

/// Executes the BRK (Force Interrupt) instruction.
///
/// Cycle timing: 7 cycles (fixed)
///
/// Flags affected:
/// - B: Set to 1 (in the pushed status byte, not in the actual flag)
/// - I: Set to 1
pub(crate) fn execute_brk(cpu: &mut Mos6502, bus: &mut dyn MemoryBus, _op: &Operands) -> u32 {
    // PC is past the one-byte opcode; the pushed address skips a padding byte.
    let return_address = cpu.pc.wrapping_add(1);
    cpu.push_word(bus, return_address);

    let status = cpu.status() | FLAG_B | FLAG_UNUSED;
    cpu.push(bus, status);

    cpu.flag_i = true;
    cpu.interrupts.begin_software(cpu.cycles);

    let lo = bus.read(VECTORS.irq) as u16;
    let hi = bus.read(VECTORS.irq.wrapping_add(1)) as u16;
    cpu.pc = (hi << 8) | lo;
    0
}

/// Executes the JMP (Jump) instruction.
///
/// Absolute or indirect. Indirect jumps reproduce the page wrap of the
/// pointer: `JMP ($10FF)` reads the high byte from $1000.
pub(crate) fn execute_jmp(cpu: &mut Mos6502, bus: &mut dyn MemoryBus, op: &Operands) -> u32 {
    let mode = addressing_mode_of(op.opcode());
    let (target, _) = cpu.effective_address(bus, mode, op);
    cpu.pc = target;
    0
}

/// Executes the JSR (Jump to Subroutine) instruction.
///
/// Pushes the address of its own last byte, then jumps.
pub(crate) fn execute_jsr(cpu: &mut Mos6502, bus: &mut dyn MemoryBus, op: &Operands) -> u32 {
    let return_address = cpu.pc.wrapping_sub(1);
    cpu.push_word(bus, return_address);
    cpu.pc = op.word(0);
    0
}

/// Executes the RTS (Return from Subroutine) instruction.
pub(crate) fn execute_rts(cpu: &mut Mos6502, bus: &mut dyn MemoryBus, _op: &Operands) -> u32 {
    cpu.pc = cpu.pull_word(bus).wrapping_add(1);
    0
}

/// Executes the RTI (Return from Interrupt) instruction.
///
/// Restores the status (B and bit 5 ignored) and PC, and ends the innermost
/// interrupt in execution.
pub(crate) fn execute_rti(cpu: &mut Mos6502, bus: &mut dyn MemoryBus, _op: &Operands) -> u32 {
    let status = cpu.pull(bus);
    cpu.set_status(status);
    cpu.pc = cpu.pull_word(bus);
    cpu.interrupts.end_service();
    0
}

/// Executes the NOP (No Operation) instruction.
pub(crate) fn execute_nop(_cpu: &mut Mos6502, _bus: &mut dyn MemoryBus, _op: &Operands) -> u32 {
    0
}
