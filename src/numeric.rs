//! # Numeric Primitives
//!
//! Fixed-width unsigned values used throughout the engine:
//!
//! - [`UByte`]: a single 8-bit cell with bit access and shift/rotate operations
//!   that report the bit shifted out (the carry).
//! - [`UBytes`]: an ordered sequence of `UByte` with a declared endianness.
//! - [`UInt`]: a fixed-width integer built from `UBytes`, in binary or packed-BCD
//!   format, whose arithmetic keeps the carry and overflow of the last operation.
//!
//! Arithmetic never changes width. Operands of different widths are rejected with
//! [`NumericError::WidthMismatch`]; callers pad them first with [`UInt::extended`].

use std::fmt;
use std::ops::{BitAnd, BitOr, BitXor, Index, Not};

use crate::error::NumericError;

/// A single 8-bit cell.
///
/// # Examples
///
/// ```
/// use lib8bit::UByte;
///
/// let mut b = UByte::new(0x81);
/// let carry = b.shift_left_c(false);
/// assert!(carry);
/// assert_eq!(b.value(), 0x02);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct UByte(u8);

impl UByte {
    /// All bits clear.
    pub const ZERO: UByte = UByte(0x00);
    /// All bits set.
    pub const FF: UByte = UByte(0xFF);
    /// Number of bits in a cell.
    pub const BITS: usize = 8;

    /// Creates a cell holding `value`.
    pub const fn new(value: u8) -> Self {
        Self(value)
    }

    /// Returns the raw value.
    pub const fn value(self) -> u8 {
        self.0
    }

    /// Returns bit `n` (0 = least significant).
    pub const fn bit(self, n: usize) -> bool {
        n < Self::BITS && (self.0 >> n) & 0x01 != 0
    }

    /// Sets or clears bit `n`. Bits outside 0..8 are ignored.
    pub fn set_bit(&mut self, n: usize, on: bool) {
        if n >= Self::BITS {
            return;
        }
        if on {
            self.0 |= 1 << n;
        } else {
            self.0 &= !(1 << n);
        }
    }

    /// Shifts one position left, moving `carry_in` into bit 0.
    ///
    /// Returns the bit shifted out of bit 7.
    pub fn shift_left_c(&mut self, carry_in: bool) -> bool {
        let out = self.bit(7);
        self.0 = (self.0 << 1) | carry_in as u8;
        out
    }

    /// Shifts one position right, moving `carry_in` into bit 7.
    ///
    /// Returns the bit shifted out of bit 0.
    pub fn shift_right_c(&mut self, carry_in: bool) -> bool {
        let out = self.bit(0);
        self.0 = (self.0 >> 1) | ((carry_in as u8) << 7);
        out
    }

    /// Rotates left through the carry `positions` times.
    ///
    /// The carry takes part in the rotation as a ninth bit: each step moves the
    /// carry into bit 0 and bit 7 into the carry. Returns the final carry.
    pub fn rotate_left_c(&mut self, carry: bool, positions: usize) -> bool {
        let mut c = carry;
        for _ in 0..positions {
            c = self.shift_left_c(c);
        }
        c
    }

    /// Rotates right through the carry `positions` times. Returns the final carry.
    pub fn rotate_right_c(&mut self, carry: bool, positions: usize) -> bool {
        let mut c = carry;
        for _ in 0..positions {
            c = self.shift_right_c(c);
        }
        c
    }

    /// Circular rotation left by one: bit 7 moves into bit 0.
    ///
    /// Returns the bit that wrapped around.
    pub fn rotate_left(&mut self) -> bool {
        let wrapped = self.bit(7);
        self.0 = self.0.rotate_left(1);
        wrapped
    }

    /// Circular rotation right by one: bit 0 moves into bit 7.
    pub fn rotate_right(&mut self) -> bool {
        let wrapped = self.bit(0);
        self.0 = self.0.rotate_right(1);
        wrapped
    }
}

impl From<u8> for UByte {
    fn from(value: u8) -> Self {
        Self(value)
    }
}

impl From<UByte> for u8 {
    fn from(value: UByte) -> Self {
        value.0
    }
}

impl BitAnd for UByte {
    type Output = UByte;

    fn bitand(self, rhs: Self) -> Self::Output {
        UByte(self.0 & rhs.0)
    }
}

impl BitOr for UByte {
    type Output = UByte;

    fn bitor(self, rhs: Self) -> Self::Output {
        UByte(self.0 | rhs.0)
    }
}

impl BitXor for UByte {
    type Output = UByte;

    fn bitxor(self, rhs: Self) -> Self::Output {
        UByte(self.0 ^ rhs.0)
    }
}

impl Not for UByte {
    type Output = UByte;

    fn not(self) -> Self::Output {
        UByte(!self.0)
    }
}

impl fmt::Display for UByte {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02X}", self.0)
    }
}

/// An ordered sequence of bytes with a declared endianness.
///
/// Index 0 is the first byte as stored. For a big-endian sequence it is the most
/// significant byte; for a little-endian one, the least significant.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct UBytes {
    bytes: Vec<UByte>,
    big_endian: bool,
}

impl UBytes {
    /// Creates a sequence from cells in storage order.
    pub fn new(bytes: Vec<UByte>, big_endian: bool) -> Self {
        Self { bytes, big_endian }
    }

    /// Creates a sequence from raw values in storage order.
    pub fn from_values(values: &[u8], big_endian: bool) -> Self {
        Self::new(values.iter().copied().map(UByte::new).collect(), big_endian)
    }

    /// Encodes `value` in `width` bytes.
    pub fn from_unsigned(value: u64, width: usize, big_endian: bool) -> Result<Self, NumericError> {
        check_width(width)?;
        if width < 8 && value >> (width * 8) != 0 {
            return Err(NumericError::Overflow { value, width });
        }
        let mut bytes: Vec<UByte> = (0..width)
            .map(|i| UByte::new((value >> (i * 8)) as u8))
            .collect();
        if big_endian {
            bytes.reverse();
        }
        Ok(Self { bytes, big_endian })
    }

    /// Number of bytes.
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// True when the sequence holds no bytes.
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Whether index 0 is the most significant byte.
    pub fn big_endian(&self) -> bool {
        self.big_endian
    }

    /// The cells in storage order.
    pub fn bytes(&self) -> &[UByte] {
        &self.bytes
    }

    /// Interprets the bytes as an unsigned number honoring the endianness.
    ///
    /// Only the 8 least significant bytes take part.
    pub fn as_unsigned(&self) -> u64 {
        let fold = |acc: u64, b: &UByte| (acc << 8) | b.value() as u64;
        if self.big_endian {
            self.bytes.iter().fold(0, fold)
        } else {
            self.bytes.iter().rev().fold(0, fold)
        }
    }

    /// Same bytes in the opposite order and endianness, so the number is unchanged.
    pub fn reversed(&self) -> Self {
        let mut bytes = self.bytes.clone();
        bytes.reverse();
        Self {
            bytes,
            big_endian: !self.big_endian,
        }
    }

    /// Pads with zero bytes on the most significant side up to `width`.
    ///
    /// Sequences already at least `width` long are returned unchanged.
    pub fn padded(&self, width: usize) -> Self {
        if self.bytes.len() >= width {
            return self.clone();
        }
        let pad = std::iter::repeat(UByte::ZERO).take(width - self.bytes.len());
        let bytes = if self.big_endian {
            pad.chain(self.bytes.iter().copied()).collect()
        } else {
            self.bytes.iter().copied().chain(pad).collect()
        };
        Self {
            bytes,
            big_endian: self.big_endian,
        }
    }
}

impl Index<usize> for UBytes {
    type Output = UByte;

    fn index(&self, index: usize) -> &Self::Output {
        &self.bytes[index]
    }
}

impl fmt::Display for UBytes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let ordered: Vec<&UByte> = if self.big_endian {
            self.bytes.iter().collect()
        } else {
            self.bytes.iter().rev().collect()
        };
        for b in ordered {
            write!(f, "{}", b)?;
        }
        Ok(())
    }
}

/// How the bytes of a [`UInt`] encode its value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum NumberFormat {
    /// Plain binary, two's complement when read as signed.
    #[default]
    Binary,
    /// Two decimal digits per byte.
    PackedBcd,
}

/// A fixed-width integer with carry and overflow outputs.
///
/// The width (1 to 8 bytes) never changes through arithmetic. Each operation
/// returns a new value whose [`carry`](UInt::carry) and
/// [`overflow`](UInt::overflow) describe that operation.
///
/// # Examples
///
/// ```
/// use lib8bit::UInt;
///
/// let a = UInt::from_u8(0x7F);
/// let b = UInt::from_u8(0x01);
/// let r = a.add(&b).unwrap();
///
/// assert_eq!(r.as_unsigned(), 0x80);
/// assert!(r.overflow());
/// assert!(!r.carry());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct UInt {
    bytes: UBytes,
    format: NumberFormat,
    carry: bool,
    overflow: bool,
}

impl UInt {
    /// Builds a value from its bytes.
    ///
    /// Fails if the width is outside 1..=8 or a BCD byte holds a digit above 9.
    pub fn new(bytes: UBytes, format: NumberFormat) -> Result<Self, NumericError> {
        check_width(bytes.len())?;
        if format == NumberFormat::PackedBcd {
            if let Some(bad) = bytes.bytes().iter().find(|b| !is_bcd(b.value())) {
                return Err(NumericError::InvalidBcd(bad.value()));
            }
        }
        // Kept big-endian internally.
        let bytes = if bytes.big_endian() { bytes } else { bytes.reversed() };
        Ok(Self {
            bytes,
            format,
            carry: false,
            overflow: false,
        })
    }

    /// Encodes an unsigned number in `width` bytes of the given format.
    pub fn from_unsigned(value: u64, width: usize, format: NumberFormat) -> Result<Self, NumericError> {
        check_width(width)?;
        let raw = match format {
            NumberFormat::Binary => value,
            NumberFormat::PackedBcd => to_bcd(value, width)?,
        };
        Self::new(UBytes::from_unsigned(raw, width, true)?, format)
    }

    /// A one-byte binary value.
    pub fn from_u8(value: u8) -> Self {
        Self {
            bytes: UBytes::from_values(&[value], true),
            format: NumberFormat::Binary,
            carry: false,
            overflow: false,
        }
    }

    /// A two-byte binary value.
    pub fn from_u16(value: u16) -> Self {
        Self {
            bytes: UBytes::from_values(&value.to_be_bytes(), true),
            format: NumberFormat::Binary,
            carry: false,
            overflow: false,
        }
    }

    /// Width in bytes.
    pub fn width(&self) -> usize {
        self.bytes.len()
    }

    /// Encoding format.
    pub fn format(&self) -> NumberFormat {
        self.format
    }

    /// The bytes, most significant first.
    pub fn bytes(&self) -> &UBytes {
        &self.bytes
    }

    /// Carry out of the operation that produced this value.
    ///
    /// For subtraction this follows the 6502 convention: set when no borrow
    /// was needed.
    pub fn carry(&self) -> bool {
        self.carry
    }

    /// Signed overflow of the operation that produced this value.
    pub fn overflow(&self) -> bool {
        self.overflow
    }

    /// The raw bit pattern, ignoring the format.
    pub fn raw(&self) -> u64 {
        self.bytes.as_unsigned()
    }

    /// The unsigned value. BCD values are decoded to their decimal meaning.
    pub fn as_unsigned(&self) -> u64 {
        match self.format {
            NumberFormat::Binary => self.raw(),
            NumberFormat::PackedBcd => from_bcd(self.raw(), self.width()),
        }
    }

    /// The value read as two's complement.
    pub fn as_i64(&self) -> i64 {
        let bits = self.width() * 8;
        let raw = self.raw();
        if bits == 64 {
            raw as i64
        } else if self.is_negative() {
            (raw as i64) - (1i64 << bits)
        } else {
            raw as i64
        }
    }

    /// Whether the most significant bit is set.
    pub fn is_negative(&self) -> bool {
        self.bytes[0].bit(7)
    }

    /// Zero-extends to `width` bytes.
    pub fn extended(&self, width: usize) -> Result<Self, NumericError> {
        check_width(width)?;
        Ok(Self {
            bytes: self.bytes.padded(width),
            format: self.format,
            carry: false,
            overflow: false,
        })
    }

    /// Adds two values of the same width and format.
    pub fn add(&self, rhs: &UInt) -> Result<UInt, NumericError> {
        self.add_with_carry(rhs, false)
    }

    /// Adds `rhs` plus an incoming carry.
    pub fn add_with_carry(&self, rhs: &UInt, carry_in: bool) -> Result<UInt, NumericError> {
        self.check_compatible(rhs)?;
        let width = self.width();
        match self.format {
            NumberFormat::Binary => {
                let mask = mask(width);
                let sum = self.raw() as u128 + rhs.raw() as u128 + carry_in as u128;
                let result = (sum as u64) & mask;
                let sign = sign_bit(width);
                let overflow = (self.raw() ^ result) & (rhs.raw() ^ result) & sign != 0;
                self.derived(result, sum > mask as u128, overflow)
            }
            NumberFormat::PackedBcd => {
                let limit = decimal_limit(width);
                let sum = self.as_unsigned() as u128 + rhs.as_unsigned() as u128 + carry_in as u128;
                let carry = sum >= limit as u128;
                let result = to_bcd((sum % limit as u128) as u64, width)?;
                self.derived(result, carry, false)
            }
        }
    }

    /// Subtracts `rhs`.
    pub fn subtract(&self, rhs: &UInt) -> Result<UInt, NumericError> {
        self.subtract_with_borrow(rhs, false)
    }

    /// Subtracts `rhs` and an incoming borrow.
    ///
    /// The resulting carry is set when no borrow was needed.
    pub fn subtract_with_borrow(&self, rhs: &UInt, borrow_in: bool) -> Result<UInt, NumericError> {
        self.check_compatible(rhs)?;
        let width = self.width();
        match self.format {
            NumberFormat::Binary => {
                let mask = mask(width);
                let a = self.raw() as i128;
                let b = rhs.raw() as i128 + borrow_in as i128;
                let diff = a - b;
                let result = (diff as u64) & mask;
                let sign = sign_bit(width);
                let overflow = (self.raw() ^ rhs.raw()) & (self.raw() ^ result) & sign != 0;
                self.derived(result, diff >= 0, overflow)
            }
            NumberFormat::PackedBcd => {
                let limit = decimal_limit(width) as i128;
                let diff = self.as_unsigned() as i128 - rhs.as_unsigned() as i128 - borrow_in as i128;
                let wrapped = diff.rem_euclid(limit) as u64;
                self.derived(to_bcd(wrapped, width)?, diff >= 0, false)
            }
        }
    }

    /// Multiplies, truncating to the operands' width.
    ///
    /// The carry is set when the full product did not fit.
    pub fn multiply(&self, rhs: &UInt) -> Result<UInt, NumericError> {
        self.check_compatible(rhs)?;
        let width = self.width();
        match self.format {
            NumberFormat::Binary => {
                let mask = mask(width);
                let product = self.raw() as u128 * rhs.raw() as u128;
                self.derived((product as u64) & mask, product > mask as u128, false)
            }
            NumberFormat::PackedBcd => {
                let limit = decimal_limit(width) as u128;
                let product = self.as_unsigned() as u128 * rhs.as_unsigned() as u128;
                self.derived(to_bcd((product % limit) as u64, width)?, product >= limit, false)
            }
        }
    }

    fn check_compatible(&self, rhs: &UInt) -> Result<(), NumericError> {
        if self.width() != rhs.width() {
            return Err(NumericError::WidthMismatch {
                left: self.width(),
                right: rhs.width(),
            });
        }
        if self.format != rhs.format {
            return Err(NumericError::FormatMismatch);
        }
        Ok(())
    }

    fn derived(&self, raw: u64, carry: bool, overflow: bool) -> Result<UInt, NumericError> {
        Ok(UInt {
            bytes: UBytes::from_unsigned(raw, self.width(), true)?,
            format: self.format,
            carry,
            overflow,
        })
    }
}

impl From<UByte> for UInt {
    fn from(value: UByte) -> Self {
        UInt::from_u8(value.value())
    }
}

impl fmt::Display for UInt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.format {
            NumberFormat::Binary => write!(f, "${}", self.bytes),
            NumberFormat::PackedBcd => write!(f, "{}", self.as_unsigned()),
        }
    }
}

fn check_width(width: usize) -> Result<(), NumericError> {
    if (1..=8).contains(&width) {
        Ok(())
    } else {
        Err(NumericError::InvalidWidth(width))
    }
}

fn mask(width: usize) -> u64 {
    if width >= 8 {
        u64::MAX
    } else {
        (1u64 << (width * 8)) - 1
    }
}

fn sign_bit(width: usize) -> u64 {
    1u64 << (width * 8 - 1)
}

fn decimal_limit(width: usize) -> u64 {
    10u64.pow((width * 2) as u32)
}

fn is_bcd(byte: u8) -> bool {
    byte & 0x0F <= 9 && byte >> 4 <= 9
}

fn to_bcd(value: u64, width: usize) -> Result<u64, NumericError> {
    if width < 8 && value >= decimal_limit(width) {
        return Err(NumericError::Overflow { value, width });
    }
    let mut remaining = value;
    let mut result = 0u64;
    for digit in 0..width * 2 {
        result |= (remaining % 10) << (digit * 4);
        remaining /= 10;
    }
    Ok(result)
}

fn from_bcd(raw: u64, width: usize) -> u64 {
    (0..width * 2)
        .rev()
        .fold(0, |acc, digit| acc * 10 + ((raw >> (digit * 4)) & 0x0F))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ubyte_bits() {
        let mut b = UByte::new(0x00);
        b.set_bit(3, true);
        assert_eq!(b.value(), 0x08);
        assert!(b.bit(3));
        b.set_bit(3, false);
        assert_eq!(b, UByte::ZERO);
        b.set_bit(9, true);
        assert_eq!(b, UByte::ZERO);
    }

    #[test]
    fn test_rotate_left_with_carry_keeps_ff() {
        let mut b = UByte::new(0xFF);
        let carry = b.rotate_left_c(true, 1);
        assert_eq!(b.value(), 0xFF);
        assert!(carry);

        let mut c = UByte::new(0xFF);
        assert!(c.rotate_left());
        assert_eq!(c.value(), 0xFF);
    }

    #[test]
    fn test_shift_right_carry_in() {
        let mut b = UByte::new(0x01);
        assert!(b.shift_right_c(true));
        assert_eq!(b.value(), 0x80);
    }

    #[test]
    fn test_ubytes_endianness() {
        let be = UBytes::from_values(&[0x12, 0x34], true);
        let le = UBytes::from_values(&[0x34, 0x12], false);
        assert_eq!(be.as_unsigned(), 0x1234);
        assert_eq!(le.as_unsigned(), 0x1234);
        assert_eq!(be.reversed().as_unsigned(), 0x1234);
        assert_eq!(format!("{}", le), "1234");
        assert_eq!(le.padded(4).as_unsigned(), 0x1234);
    }

    #[test]
    fn test_width_mismatch_rejected() {
        let a = UInt::from_u8(1);
        let b = UInt::from_u16(1);
        assert_eq!(
            a.add(&b),
            Err(NumericError::WidthMismatch { left: 1, right: 2 })
        );
        let padded = a.extended(2).unwrap();
        assert_eq!(padded.add(&b).unwrap().as_unsigned(), 2);
    }

    #[test]
    fn test_subtract_carry_is_no_borrow() {
        let a = UInt::from_u8(0x05);
        let b = UInt::from_u8(0x06);
        let r = a.subtract(&b).unwrap();
        assert_eq!(r.as_unsigned(), 0xFF);
        assert!(!r.carry());
        let r = b.subtract(&a).unwrap();
        assert!(r.carry());
    }

    #[test]
    fn test_bcd_arithmetic() {
        let a = UInt::from_unsigned(59, 1, NumberFormat::PackedBcd).unwrap();
        assert_eq!(a.raw(), 0x59);
        let one = UInt::from_unsigned(1, 1, NumberFormat::PackedBcd).unwrap();
        let r = a.add(&one).unwrap();
        assert_eq!(r.raw(), 0x60);
        let r = UInt::from_unsigned(99, 1, NumberFormat::PackedBcd)
            .unwrap()
            .add(&one)
            .unwrap();
        assert_eq!(r.raw(), 0x00);
        assert!(r.carry());
        assert_eq!(
            UInt::new(UBytes::from_values(&[0x1A], true), NumberFormat::PackedBcd),
            Err(NumericError::InvalidBcd(0x1A))
        );
    }

    #[test]
    fn test_signed_view() {
        assert_eq!(UInt::from_u8(0xFF).as_i64(), -1);
        assert_eq!(UInt::from_u16(0x8000).as_i64(), -32768);
        assert_eq!(UInt::from_u8(0x7F).as_i64(), 127);
    }

    #[test]
    fn test_multiply_truncates() {
        let r = UInt::from_u8(0x10).multiply(&UInt::from_u8(0x10)).unwrap();
        assert_eq!(r.as_unsigned(), 0x00);
        assert!(r.carry());
    }
}
