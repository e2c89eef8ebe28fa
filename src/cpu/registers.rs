//! Register snapshots and flag registers.

use std::fmt;

/// A named register value, as reported for introspection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Register {
    pub name: &'static str,
    pub value: u16,
    /// Width in bytes (1 or 2).
    pub width: u8,
}

impl Register {
    pub fn byte(name: &'static str, value: u8) -> Self {
        Self {
            name,
            value: value as u16,
            width: 1,
        }
    }

    pub fn word(name: &'static str, value: u16) -> Self {
        Self {
            name,
            value,
            width: 2,
        }
    }
}

impl fmt::Display for Register {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.width == 1 {
            write!(f, "{}=${:02X}", self.name, self.value)
        } else {
            write!(f, "{}=${:04X}", self.name, self.value)
        }
    }
}

/// An 8-bit register whose bits are named flags.
///
/// `names[n]` names bit `n`; unused bits are named `"-"`.
///
/// # Examples
///
/// ```
/// use lib8bit::StatusRegister;
///
/// let mut f = StatusRegister::new(["C", "N", "P", "X", "H", "Y", "Z", "S"]);
/// f.set_flag("Z", true);
/// assert_eq!(f.value(), 0x40);
/// assert_eq!(f.flag("Z"), Some(true));
/// assert_eq!(f.flag("Q"), None);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StatusRegister {
    bits: u8,
    names: [&'static str; 8],
}

impl StatusRegister {
    pub const fn new(names: [&'static str; 8]) -> Self {
        Self { bits: 0, names }
    }

    pub const fn value(&self) -> u8 {
        self.bits
    }

    pub fn set_value(&mut self, value: u8) {
        self.bits = value;
    }

    /// Bit `n` (0 = least significant).
    pub const fn get(&self, bit: u8) -> bool {
        self.bits & (1 << bit) != 0
    }

    pub fn set(&mut self, bit: u8, on: bool) {
        if on {
            self.bits |= 1 << bit;
        } else {
            self.bits &= !(1 << bit);
        }
    }

    /// Flag by name.
    pub fn flag(&self, name: &str) -> Option<bool> {
        self.bit_of(name).map(|bit| self.get(bit))
    }

    /// Sets a flag by name. Returns false if no bit has that name.
    pub fn set_flag(&mut self, name: &str, on: bool) -> bool {
        match self.bit_of(name) {
            Some(bit) => {
                self.set(bit, on);
                true
            }
            None => false,
        }
    }

    pub fn names(&self) -> &[&'static str; 8] {
        &self.names
    }

    fn bit_of(&self, name: &str) -> Option<u8> {
        if name == "-" {
            return None;
        }
        self.names.iter().position(|n| *n == name).map(|p| p as u8)
    }
}

impl fmt::Display for StatusRegister {
    /// Most significant bit first; clear flags print as `.`.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for bit in (0..8).rev() {
            let name = self.names[bit as usize];
            if self.get(bit) && name != "-" {
                write!(f, "{}", name)?;
            } else {
                write!(f, ".")?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_msb_first() {
        let mut p = StatusRegister::new(["C", "Z", "I", "D", "B", "-", "V", "N"]);
        p.set_value(0x81);
        assert_eq!(p.to_string(), "N......C");
        assert!(!p.set_flag("-", true));
    }

    #[test]
    fn test_register_display() {
        assert_eq!(Register::byte("A", 0x0F).to_string(), "A=$0F");
        assert_eq!(Register::word("PC", 0xC000).to_string(), "PC=$C000");
    }
}
