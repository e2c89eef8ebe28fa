//! # Instruction Templates
//!
//! A template is the human-readable form of an instruction with bracketed
//! placeholders for its operands:
//!
//! | Placeholder | Meaning                    | Rendered as             |
//! |-------------|----------------------------|-------------------------|
//! | `[#n]`      | raw data                   | `$` + hex               |
//! | `[$n]`      | absolute address           | `$` + hex               |
//! | `[&n]`      | relative branch offset     | target address          |
//! | `[%n]`      | absolute jump target       | `$` + hex               |
//!
//! `n` is the width in bytes. Placeholders consume the operand bytes after the
//! opcode (and any prefix) in order, little-endian. The same template drives the
//! disassembler and any external assembler.

use std::fmt;

use crate::error::InitializationError;

/// How an operand is encoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParameterKind {
    Data,
    Address,
    Relative,
    AbsoluteJump,
}

impl ParameterKind {
    fn from_marker(marker: char) -> Option<Self> {
        match marker {
            '#' => Some(ParameterKind::Data),
            '$' => Some(ParameterKind::Address),
            '&' => Some(ParameterKind::Relative),
            '%' => Some(ParameterKind::AbsoluteJump),
            _ => None,
        }
    }

    fn marker(self) -> char {
        match self {
            ParameterKind::Data => '#',
            ParameterKind::Address => '$',
            ParameterKind::Relative => '&',
            ParameterKind::AbsoluteJump => '%',
        }
    }
}

/// One piece of a parsed template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    Text(String),
    Parameter { kind: ParameterKind, width: u8 },
}

/// A parsed instruction template.
///
/// # Examples
///
/// ```
/// use lib8bit::InstructionTemplate;
///
/// let lda = InstructionTemplate::parse("LDA [$2],X").unwrap();
/// assert_eq!(lda.operand_bytes(), 2);
/// assert_eq!(lda.render(&[0x00, 0xC0], 0x8003), "LDA $C000,X");
///
/// let bne = InstructionTemplate::parse("BNE [&1]").unwrap();
/// assert_eq!(bne.render(&[0xFE], 0x8002), "BNE $8000");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstructionTemplate {
    segments: Vec<Segment>,
}

impl InstructionTemplate {
    /// Parses a template.
    pub fn parse(source: &str) -> Result<Self, InitializationError> {
        let invalid = |reason: &str| InitializationError::InvalidTemplate {
            template: source.to_string(),
            reason: reason.to_string(),
        };

        let mut segments = Vec::new();
        let mut text = String::new();
        let mut chars = source.chars();
        while let Some(c) = chars.next() {
            if c != '[' {
                text.push(c);
                continue;
            }
            let marker = chars.next().ok_or_else(|| invalid("unterminated placeholder"))?;
            let kind = ParameterKind::from_marker(marker)
                .ok_or_else(|| invalid("unknown placeholder kind"))?;
            let mut digits = String::new();
            loop {
                match chars.next() {
                    Some(']') => break,
                    Some(d) if d.is_ascii_digit() => digits.push(d),
                    Some(_) => return Err(invalid("placeholder width must be a number")),
                    None => return Err(invalid("unterminated placeholder")),
                }
            }
            let width: u8 = digits.parse().map_err(|_| invalid("missing placeholder width"))?;
            if !(1..=2).contains(&width) {
                return Err(invalid("placeholder width must be 1 or 2"));
            }
            if !text.is_empty() {
                segments.push(Segment::Text(std::mem::take(&mut text)));
            }
            segments.push(Segment::Parameter { kind, width });
        }
        if !text.is_empty() {
            segments.push(Segment::Text(text));
        }
        Ok(Self { segments })
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// Placeholders in order of appearance.
    pub fn parameters(&self) -> impl Iterator<Item = (ParameterKind, u8)> + '_ {
        self.segments.iter().filter_map(|s| match s {
            Segment::Parameter { kind, width } => Some((*kind, *width)),
            Segment::Text(_) => None,
        })
    }

    /// Total operand bytes the placeholders consume.
    pub fn operand_bytes(&self) -> usize {
        self.parameters().map(|(_, w)| w as usize).sum()
    }

    /// The leading word of the template.
    pub fn mnemonic(&self) -> &str {
        match self.segments.first() {
            Some(Segment::Text(t)) => t.split_whitespace().next().unwrap_or(""),
            _ => "",
        }
    }

    /// Renders the template with concrete operand bytes.
    ///
    /// `next_pc` is the address after the instruction, the base of relative
    /// offsets. Missing bytes render as zero.
    pub fn render(&self, operands: &[u8], next_pc: u16) -> String {
        let mut out = String::new();
        let mut bytes = operands.iter().copied();
        for segment in &self.segments {
            match segment {
                Segment::Text(t) => out.push_str(t),
                Segment::Parameter { kind, width } => {
                    let lo = bytes.next().unwrap_or(0);
                    let value = if *width == 2 {
                        u16::from_le_bytes([lo, bytes.next().unwrap_or(0)])
                    } else {
                        lo as u16
                    };
                    match (kind, width) {
                        (ParameterKind::Relative, 1) => {
                            let target = next_pc.wrapping_add_signed(value as u8 as i8 as i16);
                            out.push_str(&format!("${:04X}", target));
                        }
                        (ParameterKind::Relative, _) => {
                            let target = next_pc.wrapping_add(value);
                            out.push_str(&format!("${:04X}", target));
                        }
                        (_, 1) => out.push_str(&format!("${:02X}", value)),
                        _ => out.push_str(&format!("${:04X}", value)),
                    }
                }
            }
        }
        out
    }
}

impl fmt::Display for InstructionTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for segment in &self.segments {
            match segment {
                Segment::Text(t) => write!(f, "{}", t)?,
                Segment::Parameter { kind, width } => write!(f, "[{}{}]", kind.marker(), width)?,
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_round_trips_source() {
        for source in ["LD (IX+[#1]),[#1]", "JP [%2]", "NOP", "ADC #[#1]"] {
            let t = InstructionTemplate::parse(source).unwrap();
            assert_eq!(t.to_string(), source);
        }
    }

    #[test]
    fn test_parse_errors() {
        assert!(InstructionTemplate::parse("LDA [$").is_err());
        assert!(InstructionTemplate::parse("LDA [?1]").is_err());
        assert!(InstructionTemplate::parse("LDA [#]").is_err());
        assert!(InstructionTemplate::parse("LDA [#3]").is_err());
    }

    #[test]
    fn test_render_consumes_in_order() {
        let t = InstructionTemplate::parse("LD (IX+[#1]),[#1]").unwrap();
        assert_eq!(t.render(&[0x05, 0x42], 0), "LD (IX+$05),$42");
        assert_eq!(t.mnemonic(), "LD");
        assert_eq!(t.operand_bytes(), 2);
    }

    #[test]
    fn test_relative_backwards_wraps() {
        let t = InstructionTemplate::parse("JR [&1]").unwrap();
        assert_eq!(t.render(&[0x80], 0x0010), "JR $FF90");
    }
}
