//! # Addressing Modes
//!
//! The 13 ways a 6502 instruction interprets its operand bytes, and the template
//! each one renders as.

/// 6502 addressing mode.
///
/// # Operand Sizes
///
/// - **0 bytes**: Implicit, Accumulator
/// - **1 byte**: Immediate, ZeroPage, ZeroPageX, ZeroPageY, Relative, IndirectX, IndirectY
/// - **2 bytes**: Absolute, AbsoluteX, AbsoluteY, Indirect
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AddressingMode {
    /// No operand. `CLC`, `RTS`.
    Implicit,
    /// Operates on A. `LSR A`.
    Accumulator,
    /// 8-bit constant. `LDA #$10`.
    Immediate,
    /// Address in page zero. `LDA $80`.
    ZeroPage,
    /// Page-zero address plus X, wrapping inside page zero.
    ZeroPageX,
    /// Page-zero address plus Y, wrapping inside page zero.
    ZeroPageY,
    /// Signed offset from the next instruction. Branches only.
    Relative,
    /// Full 16-bit address.
    Absolute,
    /// Absolute plus X. Reads take a cycle more when a page is crossed.
    AbsoluteX,
    /// Absolute plus Y. Reads take a cycle more when a page is crossed.
    AbsoluteY,
    /// `JMP ($FFFC)`. The pointer's high byte never crosses a page.
    Indirect,
    /// `LDA ($40,X)`: pointer in page zero at operand + X.
    IndirectX,
    /// `LDA ($40),Y`: pointer in page zero, plus Y.
    IndirectY,
}

impl AddressingMode {
    /// Operand bytes after the opcode.
    pub const fn operand_bytes(self) -> u8 {
        match self {
            AddressingMode::Implicit | AddressingMode::Accumulator => 0,
            AddressingMode::Absolute
            | AddressingMode::AbsoluteX
            | AddressingMode::AbsoluteY
            | AddressingMode::Indirect => 2,
            _ => 1,
        }
    }

    /// Template for `mnemonic` in this mode.
    ///
    /// `JMP` and `JSR` targets are jump placeholders; other absolute operands
    /// are addresses.
    pub fn template(self, mnemonic: &str) -> String {
        let jump = matches!(mnemonic, "JMP" | "JSR");
        match self {
            AddressingMode::Implicit => mnemonic.to_string(),
            AddressingMode::Accumulator => format!("{} A", mnemonic),
            AddressingMode::Immediate => format!("{} #[#1]", mnemonic),
            AddressingMode::ZeroPage => format!("{} [$1]", mnemonic),
            AddressingMode::ZeroPageX => format!("{} [$1],X", mnemonic),
            AddressingMode::ZeroPageY => format!("{} [$1],Y", mnemonic),
            AddressingMode::Relative => format!("{} [&1]", mnemonic),
            AddressingMode::Absolute if jump => format!("{} [%2]", mnemonic),
            AddressingMode::Absolute => format!("{} [$2]", mnemonic),
            AddressingMode::AbsoluteX => format!("{} [$2],X", mnemonic),
            AddressingMode::AbsoluteY => format!("{} [$2],Y", mnemonic),
            AddressingMode::Indirect => format!("{} ([$2])", mnemonic),
            AddressingMode::IndirectX => format!("{} ([$1],X)", mnemonic),
            AddressingMode::IndirectY => format!("{} ([$1]),Y", mnemonic),
        }
    }
}
