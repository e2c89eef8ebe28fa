//! # Z80 Flag Arithmetic
//!
//! Pure functions computing results and the F register for the 8- and 16-bit
//! arithmetic, logic, rotate and adjust operations. The undocumented bits 5
//! and 3 of F copy the corresponding bits of the result unless noted.

/// Sign
pub const FLAG_S: u8 = 0x80;
/// Zero
pub const FLAG_Z: u8 = 0x40;
/// Undocumented copy of result bit 5
pub const FLAG_Y: u8 = 0x20;
/// Half carry
pub const FLAG_H: u8 = 0x10;
/// Undocumented copy of result bit 3
pub const FLAG_X: u8 = 0x08;
/// Parity or overflow
pub const FLAG_PV: u8 = 0x04;
/// Add/subtract
pub const FLAG_N: u8 = 0x02;
/// Carry
pub const FLAG_C: u8 = 0x01;

const XY: u8 = FLAG_Y | FLAG_X;

fn flag(on: bool, bit: u8) -> u8 {
    if on {
        bit
    } else {
        0
    }
}

/// S, Z and the undocumented bits for a result byte.
pub fn sz(value: u8) -> u8 {
    (value & (FLAG_S | XY)) | flag(value == 0, FLAG_Z)
}

/// S, Z, undocumented bits and even parity.
pub fn szp(value: u8) -> u8 {
    sz(value) | flag(value.count_ones() % 2 == 0, FLAG_PV)
}

/// 8-bit addition with carry in.
pub fn add8(a: u8, b: u8, carry: bool) -> (u8, u8) {
    let c = carry as u16;
    let sum = a as u16 + b as u16 + c;
    let r = sum as u8;
    let f = sz(r)
        | flag((a & 0x0F) as u16 + (b & 0x0F) as u16 + c > 0x0F, FLAG_H)
        | flag((a ^ r) & (b ^ r) & 0x80 != 0, FLAG_PV)
        | flag(sum > 0xFF, FLAG_C);
    (r, f)
}

/// 8-bit subtraction with borrow in. Also the basis of CP.
pub fn sub8(a: u8, b: u8, carry: bool) -> (u8, u8) {
    let c = carry as u16;
    let r = (a as u16).wrapping_sub(b as u16).wrapping_sub(c) as u8;
    let f = sz(r)
        | FLAG_N
        | flag(((a & 0x0F) as u16) < (b & 0x0F) as u16 + c, FLAG_H)
        | flag((a ^ b) & (a ^ r) & 0x80 != 0, FLAG_PV)
        | flag((a as u16) < b as u16 + c, FLAG_C);
    (r, f)
}

/// CP: flags of `a - b`, with the undocumented bits taken from the operand.
pub fn compare(a: u8, b: u8) -> u8 {
    let (_, f) = sub8(a, b, false);
    (f & !XY) | (b & XY)
}

pub fn and8(a: u8, b: u8) -> (u8, u8) {
    let r = a & b;
    (r, szp(r) | FLAG_H)
}

pub fn or8(a: u8, b: u8) -> (u8, u8) {
    let r = a | b;
    (r, szp(r))
}

pub fn xor8(a: u8, b: u8) -> (u8, u8) {
    let r = a ^ b;
    (r, szp(r))
}

/// INC: carry is preserved from `f`.
pub fn inc8(value: u8, f: u8) -> (u8, u8) {
    let r = value.wrapping_add(1);
    let flags = (f & FLAG_C)
        | sz(r)
        | flag(value & 0x0F == 0x0F, FLAG_H)
        | flag(value == 0x7F, FLAG_PV);
    (r, flags)
}

/// DEC: carry is preserved from `f`.
pub fn dec8(value: u8, f: u8) -> (u8, u8) {
    let r = value.wrapping_sub(1);
    let flags = (f & FLAG_C)
        | sz(r)
        | FLAG_N
        | flag(value & 0x0F == 0x00, FLAG_H)
        | flag(value == 0x80, FLAG_PV);
    (r, flags)
}

/// ADD HL,rp: S, Z and P/V are preserved from `f`.
pub fn add16(a: u16, b: u16, f: u8) -> (u16, u8) {
    let sum = a as u32 + b as u32;
    let r = sum as u16;
    let flags = (f & (FLAG_S | FLAG_Z | FLAG_PV))
        | ((r >> 8) as u8 & XY)
        | flag((a & 0x0FFF) + (b & 0x0FFF) > 0x0FFF, FLAG_H)
        | flag(sum > 0xFFFF, FLAG_C);
    (r, flags)
}

/// ADC HL,rp.
pub fn adc16(a: u16, b: u16, carry: bool) -> (u16, u8) {
    let c = carry as u32;
    let sum = a as u32 + b as u32 + c;
    let r = sum as u16;
    let hi = (r >> 8) as u8;
    let flags = (hi & (FLAG_S | XY))
        | flag(r == 0, FLAG_Z)
        | flag((a & 0x0FFF) as u32 + (b & 0x0FFF) as u32 + c > 0x0FFF, FLAG_H)
        | flag((a ^ r) & (b ^ r) & 0x8000 != 0, FLAG_PV)
        | flag(sum > 0xFFFF, FLAG_C);
    (r, flags)
}

/// SBC HL,rp.
pub fn sbc16(a: u16, b: u16, carry: bool) -> (u16, u8) {
    let c = carry as u32;
    let r = (a as u32).wrapping_sub(b as u32).wrapping_sub(c) as u16;
    let hi = (r >> 8) as u8;
    let flags = (hi & (FLAG_S | XY))
        | flag(r == 0, FLAG_Z)
        | FLAG_N
        | flag(((a & 0x0FFF) as u32) < (b & 0x0FFF) as u32 + c, FLAG_H)
        | flag((a ^ b) & (a ^ r) & 0x8000 != 0, FLAG_PV)
        | flag((a as u32) < b as u32 + c, FLAG_C);
    (r, flags)
}

/// CB-prefixed rotates and shifts, selected by the `y` field (0-7:
/// RLC RRC RL RR SLA SRA SLL SRL). Returns the result and full flags.
pub fn rotate_shift(y: u8, value: u8, f: u8) -> (u8, u8) {
    let carry_in = f & FLAG_C != 0;
    let (r, carry) = match y {
        0 => (value.rotate_left(1), value & 0x80 != 0),
        1 => (value.rotate_right(1), value & 0x01 != 0),
        2 => ((value << 1) | carry_in as u8, value & 0x80 != 0),
        3 => ((value >> 1) | ((carry_in as u8) << 7), value & 0x01 != 0),
        4 => (value << 1, value & 0x80 != 0),
        5 => ((value >> 1) | (value & 0x80), value & 0x01 != 0),
        6 => ((value << 1) | 0x01, value & 0x80 != 0),
        _ => (value >> 1, value & 0x01 != 0),
    };
    (r, szp(r) | flag(carry, FLAG_C))
}

/// RLCA/RRCA/RLA/RRA: like the CB forms on A but S, Z and P/V are kept.
pub fn rotate_accumulator(y: u8, a: u8, f: u8) -> (u8, u8) {
    let (r, rf) = rotate_shift(y, a, f);
    (r, (f & (FLAG_S | FLAG_Z | FLAG_PV)) | (r & XY) | (rf & FLAG_C))
}

/// BIT b: Z and P/V set when the bit is clear, S only for bit 7.
pub fn bit(b: u8, value: u8, f: u8) -> u8 {
    let set = value & (1 << b) != 0;
    (f & FLAG_C)
        | FLAG_H
        | (value & XY)
        | flag(!set, FLAG_Z | FLAG_PV)
        | flag(set && b == 7, FLAG_S)
}

/// DAA: decimal adjust after an addition or subtraction.
pub fn daa(a: u8, f: u8) -> (u8, u8) {
    let subtract = f & FLAG_N != 0;
    let mut carry = f & FLAG_C != 0;
    let mut correction = 0u8;
    if f & FLAG_H != 0 || a & 0x0F > 0x09 {
        correction |= 0x06;
    }
    if carry || a > 0x99 {
        correction |= 0x60;
        carry = true;
    }
    let r = if subtract {
        a.wrapping_sub(correction)
    } else {
        a.wrapping_add(correction)
    };
    let half = if subtract {
        f & FLAG_H != 0 && a & 0x0F < 0x06
    } else {
        a & 0x0F > 0x09
    };
    let flags = szp(r) | (f & FLAG_N) | flag(half, FLAG_H) | flag(carry, FLAG_C);
    (r, flags)
}
