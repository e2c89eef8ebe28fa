//! # Disassembler
//!
//! Turns machine code back into text using the same instruction templates
//! the CPUs execute from, so any [`Cpu`] can be disassembled without
//! per-family formatting code.
//!
//! Bytes that do not start a known instruction, or an instruction cut short
//! by the end of the input, come out as `.byte` directives.

use crate::cpu::Cpu;
use crate::memory::{FlatMemory, MemoryBus};

/// One disassembled line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Line {
    /// Address of the first byte
    pub address: u16,

    /// Every byte of the encoding
    pub bytes: Vec<u8>,

    /// Rendered text, e.g. `LD (IX+$05),$42`
    pub text: String,

    /// Base cycle cost; zero for `.byte` lines
    pub cycles: u8,
}

impl Line {
    /// Whether the line is raw data rather than an instruction.
    pub fn is_data(&self) -> bool {
        self.text.starts_with(".byte")
    }

    fn data(address: u16, byte: u8) -> Self {
        Self {
            address,
            bytes: vec![byte],
            text: format!(".byte ${:02X}", byte),
            cycles: 0,
        }
    }
}

/// Options controlling disassembly output
#[derive(Debug, Clone, Copy, Default)]
pub struct DisassemblyOptions {
    /// Address of the first byte
    pub start_address: u16,

    /// Whether `format_line` shows the encoding bytes
    pub hex_dump: bool,
}

/// Disassembles a byte slice as if it were loaded at `options.start_address`.
///
/// `cpu` supplies the instruction set; its state is not touched.
///
/// # Examples
///
/// ```
/// use lib8bit::disassembler::{disassemble, DisassemblyOptions};
/// use lib8bit::Mos6502;
///
/// let cpu = Mos6502::new();
/// let options = DisassemblyOptions { start_address: 0x8000, ..Default::default() };
/// let lines = disassemble(&cpu, &[0xA9, 0x42, 0xD0, 0xFC, 0xFF], options);
///
/// assert_eq!(lines[0].text, "LDA #$42");
/// assert_eq!(lines[1].text, "BNE $8000");
/// assert_eq!(lines[2].text, ".byte $FF");
/// ```
pub fn disassemble(cpu: &dyn Cpu, bytes: &[u8], options: DisassemblyOptions) -> Vec<Line> {
    let mut memory = FlatMemory::new();
    memory.load(options.start_address, bytes);

    let mut lines = Vec::new();
    let mut offset = 0usize;
    while offset < bytes.len() {
        let address = options.start_address.wrapping_add(offset as u16);
        let remaining = bytes.len() - offset;
        let line = match cpu.decode_at(&memory, address) {
            Ok(decoded) if decoded.bytes.len() <= remaining => Line {
                address,
                text: decoded.text(),
                cycles: decoded.cycles,
                bytes: decoded.bytes,
            },
            _ => Line::data(address, bytes[offset]),
        };
        offset += line.bytes.len();
        lines.push(line);
    }
    lines
}

/// Disassembles `count` instructions from a live bus, using `peek` only.
pub fn disassemble_bus(cpu: &dyn Cpu, bus: &dyn MemoryBus, start: u16, count: usize) -> Vec<Line> {
    let mut lines = Vec::with_capacity(count);
    let mut address = start;
    for _ in 0..count {
        let line = match cpu.decode_at(bus, address) {
            Ok(decoded) => Line {
                address,
                text: decoded.text(),
                cycles: decoded.cycles,
                bytes: decoded.bytes,
            },
            Err(_) => Line::data(address, bus.peek(address)),
        };
        address = address.wrapping_add(line.bytes.len() as u16);
        lines.push(line);
    }
    lines
}

/// Formats a line as `$8000  A9 42     LDA #$42`, or `$8000  LDA #$42`
/// without the hex dump.
pub fn format_line(line: &Line, options: &DisassemblyOptions) -> String {
    if options.hex_dump {
        let hex: Vec<String> = line.bytes.iter().map(|b| format!("{:02X}", b)).collect();
        format!("${:04X}  {:<12} {}", line.address, hex.join(" "), line.text)
    } else {
        format!("${:04X}  {}", line.address, line.text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Mos6502;

    #[test]
    fn test_disassemble_empty() {
        let lines = disassemble(&Mos6502::new(), &[], DisassemblyOptions::default());
        assert!(lines.is_empty());
    }

    #[test]
    fn test_truncated_instruction_is_data() {
        // JMP with only one of its two operand bytes; the leftover $00 is BRK
        let lines = disassemble(&Mos6502::new(), &[0x4C, 0x00], DisassemblyOptions::default());
        assert_eq!(lines.len(), 2);
        assert!(lines[0].is_data());
        assert_eq!(lines[0].text, ".byte $4C");
        assert_eq!(lines[1].text, "BRK");
    }

    #[test]
    fn test_format_with_hex_dump() {
        let line = Line {
            address: 0x8000,
            bytes: vec![0xA9, 0x42],
            text: "LDA #$42".to_string(),
            cycles: 2,
        };
        let options = DisassemblyOptions {
            hex_dump: true,
            ..Default::default()
        };
        assert_eq!(format_line(&line, &options), "$8000  A9 42        LDA #$42");
    }
}
