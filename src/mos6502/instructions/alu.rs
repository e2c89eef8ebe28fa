//! # ALU (Arithmetic Logic Unit) Instructions
//!
//! This module implements arithmetic and logical operations:
//! - ADC, SBC: Add and subtract with carry, binary or decimal
//! - AND, ORA, EOR: Bitwise logic with the accumulator
//! - CMP, CPX, CPY: Register comparisons
//! - BIT: Bit test

use super::page_penalty;
use crate::cpu::Operands;
use crate::memory::MemoryBus;
use crate::mos6502::opcodes::addressing_mode_of;
use crate::mos6502::Mos6502;
use crate::numeric::UInt;

/// Executes the ADC (Add with Carry) instruction.
///
/// Adds the operand plus the carry flag to the accumulator. With the D flag
/// set the operands are packed BCD. In decimal mode Z comes from the binary
/// sum and N/V from the intermediate high nibble, as on NMOS parts.
pub(crate) fn execute_adc(cpu: &mut Mos6502, bus: &mut dyn MemoryBus, op: &Operands) -> u32 {
    let mode = addressing_mode_of(op.opcode());
    let (value, page_crossed) = cpu.operand_value(bus, mode, op);
    let a = cpu.a;

    let (binary, carry, overflow) = binary_add(a, value, cpu.flag_c);

    if cpu.flag_d {
        let mut lo = (a & 0x0F) as u16 + (value & 0x0F) as u16 + cpu.flag_c as u16;
        if lo > 0x09 {
            lo += 0x06;
        }
        let mut hi = (a >> 4) as u16 + (value >> 4) as u16 + (lo > 0x0F) as u16;

        // Zero flag: Set if the binary sum is 0
        cpu.flag_z = binary == 0;

        // Negative and overflow flags: From the high nibble before adjustment
        cpu.flag_n = hi & 0x08 != 0;
        cpu.flag_v = (!(a ^ value) & (a ^ ((hi as u8) << 4)) & 0x80) != 0;

        if hi > 0x09 {
            hi += 0x06;
        }

        // Carry flag: Set if the decimal sum exceeds 99
        cpu.flag_c = hi > 0x0F;
        cpu.a = ((hi << 4) as u8) | (lo as u8 & 0x0F);
    } else {
        // Carry flag: Set if result > 255
        cpu.flag_c = carry;

        // Overflow flag: Set if both operands had the same sign and the result does not
        cpu.flag_v = overflow;

        cpu.a = binary;
        cpu.set_zn(binary);
    }

    page_penalty(mode, page_crossed)
}

/// Executes the SBC (Subtract with Carry) instruction.
///
/// Subtracts the operand and the inverted carry from the accumulator. Flags
/// always come from the binary difference; only the stored result is decimal
/// adjusted when D is set.
pub(crate) fn execute_sbc(cpu: &mut Mos6502, bus: &mut dyn MemoryBus, op: &Operands) -> u32 {
    let mode = addressing_mode_of(op.opcode());
    let (value, page_crossed) = cpu.operand_value(bus, mode, op);
    let a = cpu.a;
    let borrow = !cpu.flag_c;

    let (binary, no_borrow, overflow) = binary_subtract(a, value, borrow);

    // Carry flag: Clear if a borrow was needed
    cpu.flag_c = no_borrow;

    // Overflow flag: Set if the operands had different signs and the result
    // has the sign of the subtrahend
    cpu.flag_v = overflow;

    cpu.set_zn(binary);

    if cpu.flag_d {
        let mut lo = (a & 0x0F) as i16 - (value & 0x0F) as i16 - borrow as i16;
        let mut hi = (a >> 4) as i16 - (value >> 4) as i16;
        if lo < 0 {
            lo -= 0x06;
            hi -= 1;
        }
        if hi < 0 {
            hi -= 0x06;
        }
        cpu.a = (((hi as u8) & 0x0F) << 4) | ((lo as u8) & 0x0F);
    } else {
        cpu.a = binary;
    }

    page_penalty(mode, page_crossed)
}

/// Executes the AND (Logical AND) instruction.
pub(crate) fn execute_and(cpu: &mut Mos6502, bus: &mut dyn MemoryBus, op: &Operands) -> u32 {
    let mode = addressing_mode_of(op.opcode());
    let (value, page_crossed) = cpu.operand_value(bus, mode, op);
    cpu.a &= value;
    cpu.set_zn(cpu.a);
    page_penalty(mode, page_crossed)
}

/// Executes the ORA (Logical Inclusive OR) instruction.
pub(crate) fn execute_ora(cpu: &mut Mos6502, bus: &mut dyn MemoryBus, op: &Operands) -> u32 {
    let mode = addressing_mode_of(op.opcode());
    let (value, page_crossed) = cpu.operand_value(bus, mode, op);
    cpu.a |= value;
    cpu.set_zn(cpu.a);
    page_penalty(mode, page_crossed)
}

/// Executes the EOR (Exclusive OR) instruction.
pub(crate) fn execute_eor(cpu: &mut Mos6502, bus: &mut dyn MemoryBus, op: &Operands) -> u32 {
    let mode = addressing_mode_of(op.opcode());
    let (value, page_crossed) = cpu.operand_value(bus, mode, op);
    cpu.a ^= value;
    cpu.set_zn(cpu.a);
    page_penalty(mode, page_crossed)
}

/// Executes the CMP (Compare Accumulator) instruction.
pub(crate) fn execute_cmp(cpu: &mut Mos6502, bus: &mut dyn MemoryBus, op: &Operands) -> u32 {
    let mode = addressing_mode_of(op.opcode());
    let (value, page_crossed) = cpu.operand_value(bus, mode, op);
    let register = cpu.a;
    compare(cpu, register, value);
    page_penalty(mode, page_crossed)
}

/// Executes the CPX (Compare X Register) instruction.
pub(crate) fn execute_cpx(cpu: &mut Mos6502, bus: &mut dyn MemoryBus, op: &Operands) -> u32 {
    let mode = addressing_mode_of(op.opcode());
    let (value, _) = cpu.operand_value(bus, mode, op);
    let register = cpu.x;
    compare(cpu, register, value);
    0
}

/// Executes the CPY (Compare Y Register) instruction.
pub(crate) fn execute_cpy(cpu: &mut Mos6502, bus: &mut dyn MemoryBus, op: &Operands) -> u32 {
    let mode = addressing_mode_of(op.opcode());
    let (value, _) = cpu.operand_value(bus, mode, op);
    let register = cpu.y;
    compare(cpu, register, value);
    0
}

/// Executes the BIT (Bit Test) instruction.
///
/// Z reflects `A & M`; N and V are copied from bits 7 and 6 of the operand.
pub(crate) fn execute_bit(cpu: &mut Mos6502, bus: &mut dyn MemoryBus, op: &Operands) -> u32 {
    let mode = addressing_mode_of(op.opcode());
    let (value, _) = cpu.operand_value(bus, mode, op);
    cpu.flag_z = cpu.a & value == 0;
    cpu.flag_n = value & 0x80 != 0;
    cpu.flag_v = value & 0x40 != 0;
    0
}

fn compare(cpu: &mut Mos6502, register: u8, value: u8) {
    let result = register.wrapping_sub(value);

    // Carry flag: Set if register >= operand
    cpu.flag_c = register >= value;
    cpu.set_zn(result);
}

/// One-byte binary addition: (result, carry, overflow).
fn binary_add(a: u8, b: u8, carry_in: bool) -> (u8, bool, bool) {
    match UInt::from_u8(a).add_with_carry(&UInt::from_u8(b), carry_in) {
        Ok(sum) => (sum.raw() as u8, sum.carry(), sum.overflow()),
        Err(_) => {
            let sum = a as u16 + b as u16 + carry_in as u16;
            let result = sum as u8;
            (result, sum > 0xFF, !(a ^ b) & (a ^ result) & 0x80 != 0)
        }
    }
}

/// One-byte binary subtraction: (result, no borrow, overflow).
fn binary_subtract(a: u8, b: u8, borrow_in: bool) -> (u8, bool, bool) {
    match UInt::from_u8(a).subtract_with_borrow(&UInt::from_u8(b), borrow_in) {
        Ok(diff) => (diff.raw() as u8, diff.carry(), diff.overflow()),
        Err(_) => {
            let result = a.wrapping_sub(b).wrapping_sub(borrow_in as u8);
            let no_borrow = a as u16 >= b as u16 + borrow_in as u16;
            (result, no_borrow, (a ^ b) & (a ^ result) & 0x80 != 0)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_binary_add_flags() {
        assert_eq!(binary_add(0x50, 0x50, false), (0xA0, false, true));
        assert_eq!(binary_add(0xFF, 0x00, true), (0x00, true, false));
    }

    #[test]
    fn test_binary_subtract_flags() {
        assert_eq!(binary_subtract(0x50, 0xB0, false), (0xA0, false, true));
        assert_eq!(binary_subtract(0x05, 0x05, false), (0x00, true, false));
        assert_eq!(binary_subtract(0x05, 0x05, true), (0xFF, false, false));
    }
}
