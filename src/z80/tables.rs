//! # Z80 Opcode Tables
//!
//! The tables are generated from the opcode fields rather than listed:
//!
//! ```text
//!   7 6 5 4 3 2 1 0
//!  [ x ][  y  ][ z ]     p = y >> 1, q = y & 1
//! ```
//!
//! `DD`/`FD` tables are derived from the unprefixed one: HL becomes IX/IY,
//! H and L become the index halves, and `(HL)` becomes `(IX+d)`. Opcodes that
//! do not touch HL behave as the unprefixed instruction with 4 extra T-states.

use std::sync::OnceLock;

use super::instructions::*;
use super::{prefix, Index, Z80};
use crate::cpu::{Execute, Instruction, InstructionSet};

const RP: [&str; 4] = ["BC", "DE", "HL", "SP"];
const RP2: [&str; 4] = ["BC", "DE", "HL", "AF"];
const CC: [&str; 8] = ["NZ", "Z", "NC", "C", "PO", "PE", "P", "M"];
const ALU: [&str; 8] = ["ADD A,", "ADC A,", "SUB ", "SBC A,", "AND ", "XOR ", "OR ", "CP "];
const ROT: [&str; 8] = ["RLC", "RRC", "RL", "RR", "SLA", "SRA", "SLL", "SRL"];

/// One generated entry before the prefix is applied.
struct Entry {
    /// Operand bytes after the opcode.
    operands: u8,
    cycles: u8,
    template: String,
    execute: Execute<Z80>,
    /// The entry has an `(HL)` operand.
    memory: bool,
}

fn entry(operands: u8, cycles: u8, template: impl Into<String>, execute: Execute<Z80>) -> Option<Entry> {
    Some(Entry {
        operands,
        cycles,
        template: template.into(),
        execute,
        memory: false,
    })
}

/// Name of the `r` field operand. `keep_hl` keeps H and L plain when an
/// indexed memory operand is also present.
fn r_name(r: u8, index: Index, keep_hl: bool) -> String {
    let half = |suffix: &str| -> String {
        if index == Index::Hl || keep_hl {
            suffix.into()
        } else {
            format!("{}{}", index.name(), suffix)
        }
    };
    match r & 7 {
        0 => "B".into(),
        1 => "C".into(),
        2 => "D".into(),
        3 => "E".into(),
        4 => half("H"),
        5 => half("L"),
        6 => match index {
            Index::Hl => "(HL)".into(),
            ix => format!("({}+[#1])", ix.name()),
        },
        _ => "A".into(),
    }
}

fn rp_name(p: u8, index: Index) -> &'static str {
    if p == 2 {
        index.name()
    } else {
        RP[p as usize]
    }
}

fn rp2_name(p: u8, index: Index) -> &'static str {
    if p == 2 {
        index.name()
    } else {
        RP2[p as usize]
    }
}

/// Entry of the unprefixed table, or of `DD`/`FD` when `index` is IX/IY.
fn main_entry(opcode: u8, index: Index) -> Option<Entry> {
    let x = opcode >> 6;
    let y = (opcode >> 3) & 7;
    let z = opcode & 7;
    let p = y >> 1;
    let q = y & 1;
    let hl = index.name();

    let mut e = match (x, z) {
        (0, 0) => match y {
            0 => entry(0, 4, "NOP", execute_nop),
            1 => entry(0, 4, "EX AF,AF'", execute_ex_af_af),
            2 => entry(1, 8, "DJNZ [&1]", execute_djnz),
            3 => entry(1, 12, "JR [&1]", execute_jr),
            _ => entry(1, 7, format!("JR {},[&1]", CC[(y - 4) as usize]), execute_jr_cc),
        },
        (0, 1) if q == 0 => entry(2, 10, format!("LD {},[#2]", rp_name(p, index)), execute_ld_rp_nn),
        (0, 1) => entry(0, 11, format!("ADD {},{}", hl, rp_name(p, index)), execute_add_hl_rp),
        (0, 2) => match (q, p) {
            (0, 0) => entry(0, 7, "LD (BC),A", execute_ld_indirect_a),
            (0, 1) => entry(0, 7, "LD (DE),A", execute_ld_indirect_a),
            (0, 2) => entry(2, 16, format!("LD ([$2]),{}", hl), execute_ld_indirect_a),
            (0, _) => entry(2, 13, "LD ([$2]),A", execute_ld_indirect_a),
            (_, 0) => entry(0, 7, "LD A,(BC)", execute_ld_a_indirect),
            (_, 1) => entry(0, 7, "LD A,(DE)", execute_ld_a_indirect),
            (_, 2) => entry(2, 16, format!("LD {},([$2])", hl), execute_ld_a_indirect),
            (_, _) => entry(2, 13, "LD A,([$2])", execute_ld_a_indirect),
        },
        (0, 3) if q == 0 => entry(0, 6, format!("INC {}", rp_name(p, index)), execute_inc_rp),
        (0, 3) => entry(0, 6, format!("DEC {}", rp_name(p, index)), execute_dec_rp),
        (0, 4) => memory_entry(y == 6, 0, 4, 11, format!("INC {}", r_name(y, index, false)), execute_inc_r),
        (0, 5) => memory_entry(y == 6, 0, 4, 11, format!("DEC {}", r_name(y, index, false)), execute_dec_r),
        (0, 6) => memory_entry(y == 6, 1, 7, 10, format!("LD {},[#1]", r_name(y, index, false)), execute_ld_r_n),
        (0, _) => match y {
            0 => entry(0, 4, "RLCA", execute_rotate_a),
            1 => entry(0, 4, "RRCA", execute_rotate_a),
            2 => entry(0, 4, "RLA", execute_rotate_a),
            3 => entry(0, 4, "RRA", execute_rotate_a),
            4 => entry(0, 4, "DAA", execute_daa),
            5 => entry(0, 4, "CPL", execute_cpl),
            6 => entry(0, 4, "SCF", execute_scf),
            _ => entry(0, 4, "CCF", execute_ccf),
        },
        (1, _) if y == 6 && z == 6 => entry(0, 4, "HALT", execute_halt),
        (1, _) => {
            let memory = y == 6 || z == 6;
            memory_entry(
                memory,
                0,
                4,
                7,
                format!("LD {},{}", r_name(y, index, memory), r_name(z, index, memory)),
                execute_ld_r_r,
            )
        }
        (2, _) => memory_entry(
            z == 6,
            0,
            4,
            7,
            format!("{}{}", ALU[y as usize], r_name(z, index, false)),
            execute_alu_r,
        ),
        (_, 0) => entry(0, 5, format!("RET {}", CC[y as usize]), execute_ret_cc),
        (_, 1) => match (q, p) {
            (0, _) => entry(0, 10, format!("POP {}", rp2_name(p, index)), execute_pop),
            (_, 0) => entry(0, 10, "RET", execute_ret),
            (_, 1) => entry(0, 4, "EXX", execute_exx),
            (_, 2) => entry(0, 4, format!("JP ({})", hl), execute_jp_hl),
            (_, _) => entry(0, 6, format!("LD SP,{}", hl), execute_ld_sp_hl),
        },
        (_, 2) => entry(2, 10, format!("JP {},[%2]", CC[y as usize]), execute_jp_cc),
        (_, 3) => match y {
            0 => entry(2, 10, "JP [%2]", execute_jp),
            1 => None,
            2 => entry(1, 11, "OUT ([#1]),A", execute_out_n_a),
            3 => entry(1, 11, "IN A,([#1])", execute_in_a_n),
            4 => entry(0, 19, format!("EX (SP),{}", hl), execute_ex_sp_hl),
            5 => entry(0, 4, "EX DE,HL", execute_ex_de_hl),
            6 => entry(0, 4, "DI", execute_di),
            _ => entry(0, 4, "EI", execute_ei),
        },
        (_, 4) => entry(2, 10, format!("CALL {},[%2]", CC[y as usize]), execute_call_cc),
        (_, 5) => match (q, p) {
            (0, _) => entry(0, 11, format!("PUSH {}", rp2_name(p, index)), execute_push),
            (_, 0) => entry(2, 17, "CALL [%2]", execute_call),
            _ => None,
        },
        (_, 6) => entry(1, 7, format!("{}[#1]", ALU[y as usize]), execute_alu_n),
        (_, _) => entry(0, 11, format!("RST ${:02X}", y * 8), execute_rst),
    }?;

    if index != Index::Hl {
        if e.memory {
            // Displacement byte, and the address addition.
            e.operands += 1;
            e.cycles += if opcode == 0x36 { 9 } else { 12 };
        } else {
            e.cycles += 4;
        }
    }
    Some(e)
}

fn memory_entry(
    memory: bool,
    operands: u8,
    cycles: u8,
    memory_cycles: u8,
    template: String,
    execute: Execute<Z80>,
) -> Option<Entry> {
    Some(Entry {
        operands,
        cycles: if memory { memory_cycles } else { cycles },
        template,
        execute,
        memory,
    })
}

/// `CB` table entry.
fn cb_entry(opcode: u8) -> Option<Entry> {
    let x = opcode >> 6;
    let y = (opcode >> 3) & 7;
    let z = opcode & 7;
    let r = r_name(z, Index::Hl, false);
    let memory = z == 6;
    match x {
        0 => memory_entry(memory, 0, 8, 15, format!("{} {}", ROT[y as usize], r), execute_cb_rotate),
        1 => memory_entry(memory, 0, 8, 12, format!("BIT {},{}", y, r), execute_cb_bit),
        2 => memory_entry(memory, 0, 8, 15, format!("RES {},{}", y, r), execute_cb_res),
        _ => memory_entry(memory, 0, 8, 15, format!("SET {},{}", y, r), execute_cb_set),
    }
}

/// `DDCB`/`FDCB` table entry. The operand is always `(IX+d)`; forms naming
/// a register also copy the result into it.
fn indexed_cb_entry(opcode: u8, index: Index) -> Option<Entry> {
    let x = opcode >> 6;
    let y = (opcode >> 3) & 7;
    let z = opcode & 7;
    let target = format!("({}+[#1])", index.name());
    let copy = if z == 6 || x == 1 {
        String::new()
    } else {
        format!(",{}", r_name(z, Index::Hl, false))
    };
    let (template, cycles, execute): (String, u8, Execute<Z80>) = match x {
        0 => (format!("{} {}{}", ROT[y as usize], target, copy), 23, execute_cb_rotate),
        1 => (format!("BIT {},{}", y, target), 20, execute_cb_bit),
        2 => (format!("RES {},{}{}", y, target, copy), 23, execute_cb_res),
        _ => (format!("SET {},{}{}", y, target, copy), 23, execute_cb_set),
    };
    Some(Entry {
        operands: 1,
        cycles,
        template,
        execute,
        memory: true,
    })
}

/// `ED` table entry. Only documented opcodes, plus `IN F,(C)`.
fn ed_entry(opcode: u8) -> Option<Entry> {
    let x = opcode >> 6;
    let y = (opcode >> 3) & 7;
    let z = opcode & 7;
    let p = y >> 1;
    let q = y & 1;
    match x {
        1 => match z {
            0 if y == 6 => entry(0, 12, "IN F,(C)", execute_in_r_c),
            0 => entry(0, 12, format!("IN {},(C)", r_name(y, Index::Hl, false)), execute_in_r_c),
            1 if y == 6 => None,
            1 => entry(0, 12, format!("OUT (C),{}", r_name(y, Index::Hl, false)), execute_out_c_r),
            2 if q == 0 => entry(0, 15, format!("SBC HL,{}", RP[p as usize]), execute_sbc_hl),
            2 => entry(0, 15, format!("ADC HL,{}", RP[p as usize]), execute_adc_hl),
            3 if q == 0 => entry(2, 20, format!("LD ([$2]),{}", RP[p as usize]), execute_ld_nn_rp),
            3 => entry(2, 20, format!("LD {},([$2])", RP[p as usize]), execute_ld_rp_from_nn),
            4 if y == 0 => entry(0, 8, "NEG", execute_neg),
            5 if y == 0 => entry(0, 14, "RETN", execute_retn),
            5 if y == 1 => entry(0, 14, "RETI", execute_reti),
            6 => match y {
                0 => entry(0, 8, "IM 0", execute_im),
                2 => entry(0, 8, "IM 1", execute_im),
                3 => entry(0, 8, "IM 2", execute_im),
                _ => None,
            },
            7 => match y {
                0 => entry(0, 9, "LD I,A", execute_ld_i_a),
                1 => entry(0, 9, "LD R,A", execute_ld_r_a),
                2 => entry(0, 9, "LD A,I", execute_ld_a_i),
                3 => entry(0, 9, "LD A,R", execute_ld_a_r),
                4 => entry(0, 18, "RRD", execute_rrd),
                5 => entry(0, 18, "RLD", execute_rld),
                _ => None,
            },
            _ => None,
        },
        2 if z <= 3 && y >= 4 => {
            const NAMES: [[&str; 4]; 4] = [
                ["LDI", "CPI", "INI", "OUTI"],
                ["LDD", "CPD", "IND", "OUTD"],
                ["LDIR", "CPIR", "INIR", "OTIR"],
                ["LDDR", "CPDR", "INDR", "OTDR"],
            ];
            let execute: Execute<Z80> = match z {
                0 => execute_block_ld,
                1 => execute_block_cp,
                2 => execute_block_in,
                _ => execute_block_out,
            };
            entry(0, 16, NAMES[(y - 4) as usize][z as usize], execute)
        }
        _ => None,
    }
}

fn insert(set: &mut InstructionSet<Z80>, table: u16, opcode: u8, prefix_len: u8, e: Entry) {
    set.insert(Instruction::new(
        table,
        opcode,
        prefix_len + 1 + e.operands,
        e.cycles,
        e.template,
        e.execute,
    ));
}

/// The Z80 instruction set, built once.
///
/// # Examples
///
/// ```
/// use lib8bit::z80::instruction_set;
///
/// let set = instruction_set();
/// let ld = set.get(0xDD, 0x36).unwrap();
/// assert_eq!(ld.template(), "LD (IX+[#1]),[#1]");
/// assert_eq!(ld.length(), 4);
/// assert_eq!(ld.cycles(), 19);
/// ```
pub fn instruction_set() -> &'static InstructionSet<Z80> {
    static SET: OnceLock<InstructionSet<Z80>> = OnceLock::new();
    SET.get_or_init(|| {
        let mut set = InstructionSet::new("Z80");
        for opcode in 0..=255u8 {
            if let Some(e) = main_entry(opcode, Index::Hl) {
                insert(&mut set, prefix::NONE, opcode, 0, e);
            }
            if let Some(e) = cb_entry(opcode) {
                insert(&mut set, prefix::CB, opcode, 1, e);
            }
            if let Some(e) = ed_entry(opcode) {
                insert(&mut set, prefix::ED, opcode, 1, e);
            }
            for (table, index) in [(prefix::DD, Index::Ix), (prefix::FD, Index::Iy)] {
                if let Some(e) = main_entry(opcode, index) {
                    insert(&mut set, table, opcode, 1, e);
                }
            }
            for (table, index) in [(prefix::DDCB, Index::Ix), (prefix::FDCB, Index::Iy)] {
                if let Some(e) = indexed_cb_entry(opcode, index) {
                    // DD CB d op: the displacement sits between prefix and opcode.
                    insert(&mut set, table, opcode, 2, e);
                }
            }
        }
        set
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table_sizes() {
        let set = instruction_set();
        let count = |p: u16| set.iter().filter(|i| i.prefix() == p).count();
        // 256 minus the CB, DD, ED, FD prefixes
        assert_eq!(count(prefix::NONE), 252);
        assert_eq!(count(prefix::CB), 256);
        assert_eq!(count(prefix::DD), 252);
        assert_eq!(count(prefix::DDCB), 256);
    }

    #[test]
    fn test_templates_match_lengths() {
        for inst in instruction_set().iter() {
            let template = inst.parse_template().unwrap();
            let head = match inst.prefix() {
                prefix::NONE => 1,
                prefix::DDCB | prefix::FDCB => 3,
                _ => 2,
            };
            assert_eq!(
                template.operand_bytes() as u8 + head,
                inst.length(),
                "{:?}",
                inst
            );
        }
    }

    #[test]
    fn test_indexed_forms() {
        let set = instruction_set();
        assert_eq!(set.get(prefix::DD, 0x7E).unwrap().template(), "LD A,(IX+[#1])");
        assert_eq!(set.get(prefix::DD, 0x66).unwrap().template(), "LD H,(IX+[#1])");
        assert_eq!(set.get(prefix::FD, 0x44).unwrap().template(), "LD B,IYH");
        assert_eq!(set.get(prefix::DD, 0x21).unwrap().cycles(), 14);
        assert_eq!(set.get(prefix::DD, 0x34).unwrap().cycles(), 23);
        assert_eq!(set.get(prefix::FD, 0x00).unwrap().cycles(), 8);
        assert_eq!(set.get(prefix::DDCB, 0x46).unwrap().template(), "BIT 0,(IX+[#1])");
    }
}
