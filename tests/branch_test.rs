//! Tests for branches and jumps.

use lib8bit::{Cpu, FlatMemory, MemoryBus, Mos6502};

/// CPU with its reset vector at `start`.
fn setup_cpu(start: u16) -> (Mos6502, FlatMemory) {
    let mut memory = FlatMemory::new();
    memory.write(0xFFFC, start as u8);
    memory.write(0xFFFD, (start >> 8) as u8);
    let mut cpu = Mos6502::new();
    cpu.reset(&mut memory);
    (cpu, memory)
}

#[test]
fn test_branch_not_taken() {
    let (mut cpu, mut memory) = setup_cpu(0x8000);
    memory.load(0x8000, &[0xD0, 0x10]); // BNE +16
    cpu.set_flag_z(true);
    cpu.step(&mut memory).unwrap();
    assert_eq!(cpu.pc(), 0x8002);
    assert_eq!(cpu.cycles(), 2);
}

#[test]
fn test_branch_taken_same_page() {
    let (mut cpu, mut memory) = setup_cpu(0x8000);
    memory.load(0x8000, &[0xF0, 0x10]); // BEQ +16
    cpu.set_flag_z(true);
    cpu.step(&mut memory).unwrap();
    assert_eq!(cpu.pc(), 0x8012);
    assert_eq!(cpu.cycles(), 3);
}

#[test]
fn test_branch_taken_backwards() {
    let (mut cpu, mut memory) = setup_cpu(0x8010);
    memory.load(0x8010, &[0x90, 0xFE]); // BCC to itself
    cpu.step(&mut memory).unwrap();
    assert_eq!(cpu.pc(), 0x8010);
    assert_eq!(cpu.cycles(), 3);
}

#[test]
fn test_branch_taken_page_cross() {
    let (mut cpu, mut memory) = setup_cpu(0x80F0);
    memory.load(0x80F0, &[0x10, 0x7F]); // BPL +127
    cpu.step(&mut memory).unwrap();
    assert_eq!(cpu.pc(), 0x8171);
    assert_eq!(cpu.cycles(), 4);
}

#[test]
fn test_each_branch_condition() {
    // (opcode, flag setter, value that takes the branch)
    let cases: [(u8, fn(&mut Mos6502, bool), bool); 8] = [
        (0x90, Mos6502::set_flag_c, false),
        (0xB0, Mos6502::set_flag_c, true),
        (0xD0, Mos6502::set_flag_z, false),
        (0xF0, Mos6502::set_flag_z, true),
        (0x10, Mos6502::set_flag_n, false),
        (0x30, Mos6502::set_flag_n, true),
        (0x50, Mos6502::set_flag_v, false),
        (0x70, Mos6502::set_flag_v, true),
    ];
    for (opcode, set_flag, taken_when) in cases {
        for flag in [false, true] {
            let (mut cpu, mut memory) = setup_cpu(0x8000);
            memory.load(0x8000, &[opcode, 0x04]);
            set_flag(&mut cpu, flag);
            cpu.step(&mut memory).unwrap();
            let expected = if flag == taken_when { 0x8006 } else { 0x8002 };
            assert_eq!(cpu.pc(), expected, "opcode {:#04x} with flag {}", opcode, flag);
        }
    }
}

#[test]
fn test_jmp_absolute() {
    let (mut cpu, mut memory) = setup_cpu(0x8000);
    memory.load(0x8000, &[0x4C, 0x34, 0x12]);
    cpu.step(&mut memory).unwrap();
    assert_eq!(cpu.pc(), 0x1234);
    assert_eq!(cpu.cycles(), 3);
}

#[test]
fn test_jmp_indirect_page_wrap() {
    let (mut cpu, mut memory) = setup_cpu(0x8000);
    memory.load(0x8000, &[0x6C, 0xFF, 0x10]); // JMP ($10FF)
    memory.write(0x10FF, 0x34);
    memory.write(0x1000, 0x12);
    memory.write(0x1100, 0x56);
    cpu.step(&mut memory).unwrap();
    assert_eq!(cpu.pc(), 0x1234);
    assert_eq!(cpu.cycles(), 5);
}

#[test]
fn test_loop_counts_down() {
    let (mut cpu, mut memory) = setup_cpu(0x8000);
    // LDX #$03; loop: DEX; BNE loop; BRK padding
    memory.load(0x8000, &[0xA2, 0x03, 0xCA, 0xD0, 0xFD]);
    let used = cpu.run_for_cycles(&mut memory, 2 + 3 * 2 + 2 * 3 + 2).unwrap();
    assert_eq!(cpu.x(), 0);
    assert_eq!(cpu.pc(), 0x8005);
    assert_eq!(used, 16);
}
