//! Tests for stack instructions, subroutines and BRK/RTI.

use lib8bit::{Cpu, FlatMemory, MemoryBus, Mos6502};

fn setup_cpu() -> (Mos6502, FlatMemory) {
    let mut memory = FlatMemory::new();
    memory.write(0xFFFC, 0x00);
    memory.write(0xFFFD, 0x80);
    let mut cpu = Mos6502::new();
    cpu.reset(&mut memory);
    (cpu, memory)
}

#[test]
fn test_reset_state() {
    let (cpu, _memory) = setup_cpu();
    assert_eq!(cpu.pc(), 0x8000);
    assert_eq!(cpu.sp(), 0xFD);
    assert!(cpu.flag_i());
    assert_eq!(cpu.status(), 0x24);
    assert_eq!(cpu.cycles(), 0);
}

#[test]
fn test_pha_pla() {
    let (mut cpu, mut memory) = setup_cpu();
    // LDA #$80; PHA; LDA #$00; PLA
    memory.load(0x8000, &[0xA9, 0x80, 0x48, 0xA9, 0x00, 0x68]);
    cpu.step(&mut memory).unwrap();
    cpu.step(&mut memory).unwrap();
    assert_eq!(memory.read(0x01FD), 0x80);
    assert_eq!(cpu.sp(), 0xFC);

    cpu.step(&mut memory).unwrap();
    assert!(cpu.flag_z());
    cpu.step(&mut memory).unwrap();
    assert_eq!(cpu.a(), 0x80);
    assert!(cpu.flag_n());
    assert!(!cpu.flag_z());
    assert_eq!(cpu.sp(), 0xFD);
    assert_eq!(cpu.cycles(), 2 + 3 + 2 + 4);
}

#[test]
fn test_php_sets_break_in_copy_only() {
    let (mut cpu, mut memory) = setup_cpu();
    memory.load(0x8000, &[0x08, 0x28]); // PHP; PLP
    cpu.step(&mut memory).unwrap();
    assert_eq!(memory.read(0x01FD), 0x34);
    cpu.step(&mut memory).unwrap();
    assert_eq!(cpu.status(), 0x24);
}

#[test]
fn test_stack_pointer_wraps() {
    let (mut cpu, mut memory) = setup_cpu();
    cpu.set_sp(0x00);
    memory.load(0x8000, &[0x48]); // PHA
    cpu.set_a(0x5A);
    cpu.step(&mut memory).unwrap();
    assert_eq!(memory.read(0x0100), 0x5A);
    assert_eq!(cpu.sp(), 0xFF);
}

#[test]
fn test_jsr_rts() {
    let (mut cpu, mut memory) = setup_cpu();
    memory.load(0x8000, &[0x20, 0x00, 0x90]); // JSR $9000
    memory.load(0x9000, &[0x60]); // RTS

    cpu.step(&mut memory).unwrap();
    assert_eq!(cpu.pc(), 0x9000);
    assert_eq!(memory.read(0x01FD), 0x80);
    assert_eq!(memory.read(0x01FC), 0x02);
    assert_eq!(cpu.cycles(), 6);

    cpu.step(&mut memory).unwrap();
    assert_eq!(cpu.pc(), 0x8003);
    assert_eq!(cpu.sp(), 0xFD);
    assert_eq!(cpu.cycles(), 12);
}

#[test]
fn test_brk_and_rti() {
    let (mut cpu, mut memory) = setup_cpu();
    memory.write(0xFFFE, 0x00);
    memory.write(0xFFFF, 0x90);
    memory.load(0x8000, &[0x00, 0xEA]); // BRK + padding
    memory.load(0x9000, &[0x40]); // RTI
    cpu.set_flag_i(false);
    cpu.set_flag_c(true);

    cpu.step(&mut memory).unwrap();
    assert_eq!(cpu.pc(), 0x9000);
    assert!(cpu.flag_i());
    assert_eq!(memory.read(0x01FD), 0x80);
    assert_eq!(memory.read(0x01FC), 0x02);
    assert_eq!(memory.read(0x01FB), 0x31);
    assert_eq!(cpu.cycles(), 7);

    cpu.step(&mut memory).unwrap();
    assert_eq!(cpu.pc(), 0x8002);
    assert!(!cpu.flag_i());
    assert!(cpu.flag_c());
    assert_eq!(cpu.sp(), 0xFD);
}

#[test]
fn test_transfer_through_stack_pointer() {
    let (mut cpu, mut memory) = setup_cpu();
    memory.load(0x8000, &[0xA2, 0x40, 0x9A, 0xBA]); // LDX #$40; TXS; TSX
    cpu.step(&mut memory).unwrap();
    cpu.step(&mut memory).unwrap();
    assert_eq!(cpu.sp(), 0x40);
    cpu.set_x(0);
    cpu.step(&mut memory).unwrap();
    assert_eq!(cpu.x(), 0x40);
}
