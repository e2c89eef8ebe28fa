//! # Addresses
//!
//! An [`Address`] is a location in an address space of 1 to 4 bytes. Stepping
//! wraps modulo the size of the space, so `$FFFF.next(1)` is `$0000` in a 16-bit
//! space. Addresses from spaces of different sizes never compare.

use std::cmp::Ordering;
use std::fmt;

use crate::error::NumericError;
use crate::numeric::{NumberFormat, UBytes, UInt};

/// A bounded location in an address space.
///
/// # Examples
///
/// ```
/// use lib8bit::Address;
///
/// let top = Address::from(0xFFFFu16);
/// assert_eq!(top.next(1).value(), 0x0000);
/// assert_eq!(top.next(3).previous(3), top);
/// ```
#[derive(Debug, Clone, Copy, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Address {
    value: u32,
    width: u8,
}

impl Address {
    /// Creates an address in a space of `width` bytes.
    pub fn new(value: u32, width: u8) -> Result<Self, NumericError> {
        if !(1..=4).contains(&width) {
            return Err(NumericError::InvalidWidth(width as usize));
        }
        let address = Self { value: 0, width };
        if value as u64 > address.max() as u64 {
            return Err(NumericError::Overflow {
                value: value as u64,
                width: width as usize,
            });
        }
        Ok(Self { value, width })
    }

    /// Numeric value.
    pub fn value(&self) -> u32 {
        self.value
    }

    /// Width of the address space in bytes.
    pub fn width(&self) -> u8 {
        self.width
    }

    /// Highest address of the space.
    pub fn max(&self) -> u32 {
        if self.width >= 4 {
            u32::MAX
        } else {
            (1u32 << (self.width as u32 * 8)) - 1
        }
    }

    /// Number of addresses in the space.
    pub fn space_size(&self) -> u64 {
        self.max() as u64 + 1
    }

    /// Steps forward `n` locations, wrapping at the end of the space.
    pub fn next(&self, n: u32) -> Address {
        let value = (self.value as u64 + n as u64) % self.space_size();
        Address {
            value: value as u32,
            width: self.width,
        }
    }

    /// Steps back `n` locations, wrapping at the start of the space.
    pub fn previous(&self, n: u32) -> Address {
        let size = self.space_size();
        let value = (self.value as u64 + size - (n as u64 % size)) % size;
        Address {
            value: value as u32,
            width: self.width,
        }
    }

    /// Absolute number of locations between two addresses of the same space.
    pub fn distance(&self, other: &Address) -> Option<u32> {
        (self.width == other.width).then(|| self.value.abs_diff(other.value))
    }

    /// The low 16 bits.
    pub fn as_u16(&self) -> u16 {
        self.value as u16
    }

    /// The address as a binary [`UInt`] of the space's width.
    pub fn to_uint(&self) -> UInt {
        // Widths are validated at construction.
        match UBytes::from_unsigned(self.value as u64, self.width as usize, true)
            .and_then(|bytes| UInt::new(bytes, NumberFormat::Binary))
        {
            Ok(v) => v,
            Err(_) => UInt::from_u16(self.value as u16),
        }
    }
}

impl From<u16> for Address {
    fn from(value: u16) -> Self {
        Self {
            value: value as u32,
            width: 2,
        }
    }
}

impl PartialEq for Address {
    fn eq(&self, other: &Self) -> bool {
        self.width == other.width && self.value == other.value
    }
}

impl Eq for Address {}

impl PartialOrd for Address {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        (self.width == other.width).then(|| self.value.cmp(&other.value))
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "${:0width$X}", self.value, width = self.width as usize * 2)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wraps_at_end_of_space() {
        let a = Address::new(0xFE, 1).unwrap();
        assert_eq!(a.next(3).value(), 0x01);
        assert_eq!(a.next(3).previous(3), a);
        assert_eq!(Address::from(0u16).previous(1).value(), 0xFFFF);
    }

    #[test]
    fn test_different_spaces_do_not_compare() {
        let a = Address::new(0x10, 1).unwrap();
        let b = Address::new(0x10, 2).unwrap();
        assert_ne!(a, b);
        assert_eq!(a.partial_cmp(&b), None);
        assert_eq!(a.distance(&b), None);
        assert!(Address::from(0x10u16) < Address::from(0x20u16));
    }

    #[test]
    fn test_rejects_out_of_range() {
        assert!(Address::new(0x100, 1).is_err());
        assert!(Address::new(0, 5).is_err());
    }

    #[test]
    fn test_display() {
        assert_eq!(Address::from(0xC000u16).to_string(), "$C000");
        assert_eq!(Address::new(0x0F, 1).unwrap().to_string(), "$0F");
    }
}
