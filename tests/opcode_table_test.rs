//! Consistency checks for the 6502 opcode table.

use std::collections::HashSet;

use lib8bit::mos6502::{instruction_set, AddressingMode, DOCUMENTED, OPCODE_TABLE};
use lib8bit::{Cpu, DecodeError, FlatMemory, InstructionTemplate, MemoryBus, Mos6502};

#[test]
fn test_151_documented_opcodes() {
    assert_eq!(DOCUMENTED.len(), 151);
    assert_eq!(OPCODE_TABLE.iter().filter(|e| e.is_some()).count(), 151);
    assert_eq!(instruction_set().len(), 151);
}

#[test]
fn test_no_duplicate_opcodes() {
    let unique: HashSet<u8> = DOCUMENTED.iter().map(|m| m.opcode).collect();
    assert_eq!(unique.len(), DOCUMENTED.len());
}

#[test]
fn test_table_indexed_by_opcode() {
    for (byte, entry) in OPCODE_TABLE.iter().enumerate() {
        if let Some(meta) = entry {
            assert_eq!(meta.opcode as usize, byte);
        }
    }
}

#[test]
fn test_templates_agree_with_sizes() {
    for instruction in instruction_set().iter() {
        let template = InstructionTemplate::parse(instruction.template()).unwrap();
        assert_eq!(
            template.operand_bytes() + 1,
            instruction.length() as usize,
            "{}",
            instruction.template()
        );
        assert_eq!(template.mnemonic(), instruction.mnemonic());
    }
}

#[test]
fn test_cycle_costs_in_range() {
    for meta in DOCUMENTED.iter() {
        assert!((2..=7).contains(&meta.base_cycles), "{:?}", meta);
    }
}

#[test]
fn test_branches_are_relative() {
    for opcode in [0x10u8, 0x30, 0x50, 0x70, 0x90, 0xB0, 0xD0, 0xF0] {
        let meta = OPCODE_TABLE[opcode as usize].unwrap();
        assert_eq!(meta.addressing_mode, AddressingMode::Relative);
        assert_eq!(meta.size_bytes(), 2);
    }
}

#[test]
fn test_undocumented_opcode_fails_without_side_effects() {
    let mut memory = FlatMemory::new();
    memory.write(0xFFFC, 0x00);
    memory.write(0xFFFD, 0x80);
    memory.write(0x8000, 0xFF);
    let mut cpu = Mos6502::new();
    cpu.reset(&mut memory);
    cpu.set_a(0x12);
    let before = cpu.registers();

    let err = cpu.execute_next_instruction(&mut memory).unwrap_err();
    assert_eq!(
        err,
        DecodeError::InvalidOpcode {
            opcode: 0xFF,
            prefix: None,
            address: 0x8000
        }
    );
    assert_eq!(cpu.registers(), before);
    assert_eq!(cpu.cycles(), 0);
    assert_eq!(cpu.last_error(), Some(err));
    assert!(cpu.last_instruction().is_none());
}

#[test]
fn test_last_instruction_recorded() {
    let mut memory = FlatMemory::new();
    memory.load(0x0000, &[0xBD, 0x00, 0x20]); // LDA $2000,X
    let mut cpu = Mos6502::new();
    cpu.step(&mut memory).unwrap();

    let last = cpu.last_instruction().unwrap();
    assert_eq!(last.address(), 0x0000);
    assert_eq!(last.text(), "LDA $2000,X");
    assert_eq!(last.decoded.bytes, vec![0xBD, 0x00, 0x20]);
    assert_eq!(last.cycles, 4);
}
