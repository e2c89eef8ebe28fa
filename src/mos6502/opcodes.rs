//! # Opcode Table
//!
//! The 151 documented NMOS 6502 opcodes. Each entry gives the mnemonic,
//! addressing mode, base cycle cost and execution function; size and template
//! follow from the addressing mode.
//!
//! The 105 undocumented opcodes have no entry and fail to decode.

use std::borrow::Cow;
use std::sync::OnceLock;

use super::addressing::AddressingMode;
use super::addressing::AddressingMode::*;
use super::instructions::*;
use super::Mos6502;
use crate::cpu::{Execute, Instruction, InstructionSet};

/// Static description of one documented opcode.
#[derive(Clone, Copy)]
pub struct OpcodeMetadata {
    pub opcode: u8,
    pub mnemonic: &'static str,
    pub addressing_mode: AddressingMode,
    /// Cost before page-crossing and branch penalties.
    pub base_cycles: u8,
    pub execute: Execute<Mos6502>,
}

impl OpcodeMetadata {
    /// Total size including the opcode byte.
    pub const fn size_bytes(&self) -> u8 {
        1 + self.addressing_mode.operand_bytes()
    }
}

impl std::fmt::Debug for OpcodeMetadata {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpcodeMetadata")
            .field("opcode", &format_args!("{:#04x}", self.opcode))
            .field("mnemonic", &self.mnemonic)
            .field("addressing_mode", &self.addressing_mode)
            .field("base_cycles", &self.base_cycles)
            .finish()
    }
}

const fn op(
    opcode: u8,
    mnemonic: &'static str,
    addressing_mode: AddressingMode,
    base_cycles: u8,
    execute: Execute<Mos6502>,
) -> OpcodeMetadata {
    OpcodeMetadata {
        opcode,
        mnemonic,
        addressing_mode,
        base_cycles,
        execute,
    }
}

/// Every documented opcode, grouped by instruction.
pub const DOCUMENTED: [OpcodeMetadata; 151] = [
    op(0x69, "ADC", Immediate, 2, execute_adc),
    op(0x65, "ADC", ZeroPage, 3, execute_adc),
    op(0x75, "ADC", ZeroPageX, 4, execute_adc),
    op(0x6D, "ADC", Absolute, 4, execute_adc),
    op(0x7D, "ADC", AbsoluteX, 4, execute_adc),
    op(0x79, "ADC", AbsoluteY, 4, execute_adc),
    op(0x61, "ADC", IndirectX, 6, execute_adc),
    op(0x71, "ADC", IndirectY, 5, execute_adc),
    op(0x29, "AND", Immediate, 2, execute_and),
    op(0x25, "AND", ZeroPage, 3, execute_and),
    op(0x35, "AND", ZeroPageX, 4, execute_and),
    op(0x2D, "AND", Absolute, 4, execute_and),
    op(0x3D, "AND", AbsoluteX, 4, execute_and),
    op(0x39, "AND", AbsoluteY, 4, execute_and),
    op(0x21, "AND", IndirectX, 6, execute_and),
    op(0x31, "AND", IndirectY, 5, execute_and),
    op(0x0A, "ASL", Accumulator, 2, execute_asl),
    op(0x06, "ASL", ZeroPage, 5, execute_asl),
    op(0x16, "ASL", ZeroPageX, 6, execute_asl),
    op(0x0E, "ASL", Absolute, 6, execute_asl),
    op(0x1E, "ASL", AbsoluteX, 7, execute_asl),
    op(0x90, "BCC", Relative, 2, execute_bcc),
    op(0xB0, "BCS", Relative, 2, execute_bcs),
    op(0xF0, "BEQ", Relative, 2, execute_beq),
    op(0x30, "BMI", Relative, 2, execute_bmi),
    op(0xD0, "BNE", Relative, 2, execute_bne),
    op(0x10, "BPL", Relative, 2, execute_bpl),
    op(0x50, "BVC", Relative, 2, execute_bvc),
    op(0x70, "BVS", Relative, 2, execute_bvs),
    op(0x24, "BIT", ZeroPage, 3, execute_bit),
    op(0x2C, "BIT", Absolute, 4, execute_bit),
    op(0x00, "BRK", Implicit, 7, execute_brk),
    op(0x18, "CLC", Implicit, 2, execute_clc),
    op(0xD8, "CLD", Implicit, 2, execute_cld),
    op(0x58, "CLI", Implicit, 2, execute_cli),
    op(0xB8, "CLV", Implicit, 2, execute_clv),
    op(0xC9, "CMP", Immediate, 2, execute_cmp),
    op(0xC5, "CMP", ZeroPage, 3, execute_cmp),
    op(0xD5, "CMP", ZeroPageX, 4, execute_cmp),
    op(0xCD, "CMP", Absolute, 4, execute_cmp),
    op(0xDD, "CMP", AbsoluteX, 4, execute_cmp),
    op(0xD9, "CMP", AbsoluteY, 4, execute_cmp),
    op(0xC1, "CMP", IndirectX, 6, execute_cmp),
    op(0xD1, "CMP", IndirectY, 5, execute_cmp),
    op(0xE0, "CPX", Immediate, 2, execute_cpx),
    op(0xE4, "CPX", ZeroPage, 3, execute_cpx),
    op(0xEC, "CPX", Absolute, 4, execute_cpx),
    op(0xC0, "CPY", Immediate, 2, execute_cpy),
    op(0xC4, "CPY", ZeroPage, 3, execute_cpy),
    op(0xCC, "CPY", Absolute, 4, execute_cpy),
    op(0xC6, "DEC", ZeroPage, 5, execute_dec),
    op(0xD6, "DEC", ZeroPageX, 6, execute_dec),
    op(0xCE, "DEC", Absolute, 6, execute_dec),
    op(0xDE, "DEC", AbsoluteX, 7, execute_dec),
    op(0xCA, "DEX", Implicit, 2, execute_dex),
    op(0x88, "DEY", Implicit, 2, execute_dey),
    op(0x49, "EOR", Immediate, 2, execute_eor),
    op(0x45, "EOR", ZeroPage, 3, execute_eor),
    op(0x55, "EOR", ZeroPageX, 4, execute_eor),
    op(0x4D, "EOR", Absolute, 4, execute_eor),
    op(0x5D, "EOR", AbsoluteX, 4, execute_eor),
    op(0x59, "EOR", AbsoluteY, 4, execute_eor),
    op(0x41, "EOR", IndirectX, 6, execute_eor),
    op(0x51, "EOR", IndirectY, 5, execute_eor),
    op(0xE6, "INC", ZeroPage, 5, execute_inc),
    op(0xF6, "INC", ZeroPageX, 6, execute_inc),
    op(0xEE, "INC", Absolute, 6, execute_inc),
    op(0xFE, "INC", AbsoluteX, 7, execute_inc),
    op(0xE8, "INX", Implicit, 2, execute_inx),
    op(0xC8, "INY", Implicit, 2, execute_iny),
    op(0x4C, "JMP", Absolute, 3, execute_jmp),
    op(0x6C, "JMP", Indirect, 5, execute_jmp),
    op(0x20, "JSR", Absolute, 6, execute_jsr),
    op(0xA9, "LDA", Immediate, 2, execute_lda),
    op(0xA5, "LDA", ZeroPage, 3, execute_lda),
    op(0xB5, "LDA", ZeroPageX, 4, execute_lda),
    op(0xAD, "LDA", Absolute, 4, execute_lda),
    op(0xBD, "LDA", AbsoluteX, 4, execute_lda),
    op(0xB9, "LDA", AbsoluteY, 4, execute_lda),
    op(0xA1, "LDA", IndirectX, 6, execute_lda),
    op(0xB1, "LDA", IndirectY, 5, execute_lda),
    op(0xA2, "LDX", Immediate, 2, execute_ldx),
    op(0xA6, "LDX", ZeroPage, 3, execute_ldx),
    op(0xB6, "LDX", ZeroPageY, 4, execute_ldx),
    op(0xAE, "LDX", Absolute, 4, execute_ldx),
    op(0xBE, "LDX", AbsoluteY, 4, execute_ldx),
    op(0xA0, "LDY", Immediate, 2, execute_ldy),
    op(0xA4, "LDY", ZeroPage, 3, execute_ldy),
    op(0xB4, "LDY", ZeroPageX, 4, execute_ldy),
    op(0xAC, "LDY", Absolute, 4, execute_ldy),
    op(0xBC, "LDY", AbsoluteX, 4, execute_ldy),
    op(0x4A, "LSR", Accumulator, 2, execute_lsr),
    op(0x46, "LSR", ZeroPage, 5, execute_lsr),
    op(0x56, "LSR", ZeroPageX, 6, execute_lsr),
    op(0x4E, "LSR", Absolute, 6, execute_lsr),
    op(0x5E, "LSR", AbsoluteX, 7, execute_lsr),
    op(0xEA, "NOP", Implicit, 2, execute_nop),
    op(0x09, "ORA", Immediate, 2, execute_ora),
    op(0x05, "ORA", ZeroPage, 3, execute_ora),
    op(0x15, "ORA", ZeroPageX, 4, execute_ora),
    op(0x0D, "ORA", Absolute, 4, execute_ora),
    op(0x1D, "ORA", AbsoluteX, 4, execute_ora),
    op(0x19, "ORA", AbsoluteY, 4, execute_ora),
    op(0x01, "ORA", IndirectX, 6, execute_ora),
    op(0x11, "ORA", IndirectY, 5, execute_ora),
    op(0x48, "PHA", Implicit, 3, execute_pha),
    op(0x08, "PHP", Implicit, 3, execute_php),
    op(0x68, "PLA", Implicit, 4, execute_pla),
    op(0x28, "PLP", Implicit, 4, execute_plp),
    op(0x2A, "ROL", Accumulator, 2, execute_rol),
    op(0x26, "ROL", ZeroPage, 5, execute_rol),
    op(0x36, "ROL", ZeroPageX, 6, execute_rol),
    op(0x2E, "ROL", Absolute, 6, execute_rol),
    op(0x3E, "ROL", AbsoluteX, 7, execute_rol),
    op(0x6A, "ROR", Accumulator, 2, execute_ror),
    op(0x66, "ROR", ZeroPage, 5, execute_ror),
    op(0x76, "ROR", ZeroPageX, 6, execute_ror),
    op(0x6E, "ROR", Absolute, 6, execute_ror),
    op(0x7E, "ROR", AbsoluteX, 7, execute_ror),
    op(0x40, "RTI", Implicit, 6, execute_rti),
    op(0x60, "RTS", Implicit, 6, execute_rts),
    op(0xE9, "SBC", Immediate, 2, execute_sbc),
    op(0xE5, "SBC", ZeroPage, 3, execute_sbc),
    op(0xF5, "SBC", ZeroPageX, 4, execute_sbc),
    op(0xED, "SBC", Absolute, 4, execute_sbc),
    op(0xFD, "SBC", AbsoluteX, 4, execute_sbc),
    op(0xF9, "SBC", AbsoluteY, 4, execute_sbc),
    op(0xE1, "SBC", IndirectX, 6, execute_sbc),
    op(0xF1, "SBC", IndirectY, 5, execute_sbc),
    op(0x38, "SEC", Implicit, 2, execute_sec),
    op(0xF8, "SED", Implicit, 2, execute_sed),
    op(0x78, "SEI", Implicit, 2, execute_sei),
    op(0x85, "STA", ZeroPage, 3, execute_sta),
    op(0x95, "STA", ZeroPageX, 4, execute_sta),
    op(0x8D, "STA", Absolute, 4, execute_sta),
    op(0x9D, "STA", AbsoluteX, 5, execute_sta),
    op(0x99, "STA", AbsoluteY, 5, execute_sta),
    op(0x81, "STA", IndirectX, 6, execute_sta),
    op(0x91, "STA", IndirectY, 6, execute_sta),
    op(0x86, "STX", ZeroPage, 3, execute_stx),
    op(0x96, "STX", ZeroPageY, 4, execute_stx),
    op(0x8E, "STX", Absolute, 4, execute_stx),
    op(0x84, "STY", ZeroPage, 3, execute_sty),
    op(0x94, "STY", ZeroPageX, 4, execute_sty),
    op(0x8C, "STY", Absolute, 4, execute_sty),
    op(0xAA, "TAX", Implicit, 2, execute_tax),
    op(0xA8, "TAY", Implicit, 2, execute_tay),
    op(0xBA, "TSX", Implicit, 2, execute_tsx),
    op(0x8A, "TXA", Implicit, 2, execute_txa),
    op(0x9A, "TXS", Implicit, 2, execute_txs),
    op(0x98, "TYA", Implicit, 2, execute_tya),
];

const fn index_by_opcode() -> [Option<OpcodeMetadata>; 256] {
    let mut table: [Option<OpcodeMetadata>; 256] = [None; 256];
    let mut i = 0;
    while i < DOCUMENTED.len() {
        table[DOCUMENTED[i].opcode as usize] = Some(DOCUMENTED[i]);
        i += 1;
    }
    table
}

/// [`DOCUMENTED`] indexed by opcode byte. Undocumented opcodes are `None`.
///
/// # Examples
///
/// ```
/// use lib8bit::mos6502::{AddressingMode, OPCODE_TABLE};
///
/// let lda_imm = OPCODE_TABLE[0xA9].unwrap();
/// assert_eq!(lda_imm.mnemonic, "LDA");
/// assert_eq!(lda_imm.addressing_mode, AddressingMode::Immediate);
/// assert_eq!(lda_imm.size_bytes(), 2);
///
/// assert!(OPCODE_TABLE[0x02].is_none());
/// ```
pub const OPCODE_TABLE: [Option<OpcodeMetadata>; 256] = index_by_opcode();

/// Addressing mode of `opcode`; implicit for undocumented opcodes.
pub(crate) fn addressing_mode_of(opcode: u8) -> AddressingMode {
    match &OPCODE_TABLE[opcode as usize] {
        Some(meta) => meta.addressing_mode,
        None => Implicit,
    }
}

/// The 6502 instruction set, built once.
pub fn instruction_set() -> &'static InstructionSet<Mos6502> {
    static SET: OnceLock<InstructionSet<Mos6502>> = OnceLock::new();
    SET.get_or_init(|| {
        let mut set = InstructionSet::new("6502");
        for meta in DOCUMENTED.iter() {
            set.insert(Instruction::new(
                0,
                meta.opcode,
                meta.size_bytes(),
                meta.base_cycles,
                Cow::Owned(meta.addressing_mode.template(meta.mnemonic)),
                meta.execute,
            ));
        }
        set
    })
}
