//! Booting an assembled C64 from a test KERNAL and switching banks.

use commodore::c64::{self, CIA1, CIA2, IO_PORT, VIC};
use commodore::{Cia, IoPort6510, Region, Roms, Vic};
use lib8bit::{Computer, MemoryBus};

/// KERNAL image holding `program` at $E000, the reset vector pointing at it
/// and the IRQ vector at $E100.
fn kernal(program: &[u8], irq_handler: &[u8]) -> Vec<u8> {
    let mut image = vec![0xEA; c64::KERNAL_ROM_SIZE];
    image[..program.len()].copy_from_slice(program);
    image[0x100..0x100 + irq_handler.len()].copy_from_slice(irq_handler);
    image[0x1FFC] = 0x00;
    image[0x1FFD] = 0xE0;
    image[0x1FFE] = 0x00;
    image[0x1FFF] = 0xE1;
    image
}

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn setup_c64(program: &[u8], irq_handler: &[u8]) -> Computer {
    init_logging();
    let mut basic = vec![0; c64::BASIC_ROM_SIZE];
    basic[0] = 0x99;
    let mut characters = vec![0; c64::CHARACTER_ROM_SIZE];
    characters[0] = 0x3C;
    characters[0x20] = 0x7E;
    let roms = Roms::new(basic, kernal(program, irq_handler), characters).unwrap();

    let mut computer = c64::build(Region::Pal, &roms).unwrap();
    computer.initialize().unwrap();
    computer
}

#[test]
fn test_boot_runs_from_reset_vector() {
    // JMP $E000
    let computer = setup_c64(&[0x4C, 0x00, 0xE0], &[]);
    assert_eq!(computer.cpu().program_counter(), 0xE000);
    assert_eq!(computer.chips().count(), 4);
    assert!(computer.chip::<IoPort6510>(IO_PORT).is_some());
    assert!(computer.chip::<Vic>(VIC).is_some());
    assert!(computer.chip::<Cia>(CIA1).is_some());
    assert!(computer.chip::<Cia>(CIA2).is_some());
}

#[test]
fn test_program_switches_basic_out() {
    let program = [
        0xA9, 0x42, // LDA #$42
        0x8D, 0x00, 0xA0, // STA $A000, lands in RAM under BASIC
        0xAD, 0x00, 0xA0, // LDA $A000, reads BASIC
        0x85, 0x10, // STA $10
        0xA9, 0x36, // LDA #$36
        0x85, 0x01, // STA $01, BASIC out
        0xAD, 0x00, 0xA0, // LDA $A000, reads RAM
        0x85, 0x11, // STA $11
        0x4C, 0x13, 0xE0, // JMP *
    ];
    let mut computer = setup_c64(&program, &[]);
    computer.run_for_cycles(40).unwrap();

    assert_eq!(computer.bus().peek(0x0010), 0x99);
    assert_eq!(computer.bus().peek(0x0011), 0x42);
    let port = computer.chip::<IoPort6510>(IO_PORT).unwrap();
    assert_eq!(port.bank_config(), 6);
    assert!(!port.basic_visible());
}

#[test]
fn test_character_rom_replaces_io() {
    let mut computer = setup_c64(&[0x4C, 0x00, 0xE0], &[]);
    assert_eq!(computer.bus().peek(0xD020), 0x0E);

    computer.bus().write(0x0001, 0x33);
    assert_eq!(computer.bus().peek(0xD000), 0x3C);
    assert_eq!(computer.bus().peek(0xD020), 0x7E);

    computer.bus().write(0x0001, 0x37);
    assert_eq!(computer.bus().peek(0xD020), 0x0E);
}

#[test]
fn test_writes_under_kernal_reach_ram() {
    let mut computer = setup_c64(&[0x4C, 0x00, 0xE0], &[]);
    computer.bus().write(0xE000, 0x55);
    assert_eq!(computer.bus().peek(0xE000), 0x4C);

    // KERNAL out, I/O stays in
    computer.bus().write(0x0001, 0x35);
    assert_eq!(computer.bus().peek(0xE000), 0x55);
    assert_eq!(computer.bus().peek(0xD020), 0x0E);

    // Everything RAM
    computer.bus().write(0x0001, 0x30);
    computer.bus().write(0xD020, 0x01);
    assert_eq!(computer.bus().peek(0xD020), 0x01);
    computer.bus().write(0x0001, 0x37);
    assert_eq!(computer.bus().peek(0xD020), 0x0E);
}

#[test]
fn test_cia1_timer_drives_irq_handler() {
    let program = [
        0xA9, 0x81, 0x8D, 0x0D, 0xDC, // LDA #$81 / STA $DC0D
        0xA9, 0x40, 0x8D, 0x04, 0xDC, // LDA #$40 / STA $DC04
        0xA9, 0x00, 0x8D, 0x05, 0xDC, // LDA #$00 / STA $DC05
        0xA9, 0x11, 0x8D, 0x0E, 0xDC, // LDA #$11 / STA $DC0E
        0x58, // CLI
        0x4C, 0x15, 0xE0, // JMP *
    ];
    let handler = [
        0xEE, 0x20, 0xD0, // INC $D020
        0xAD, 0x0D, 0xDC, // LDA $DC0D
        0x40, // RTI
    ];
    let mut computer = setup_c64(&program, &handler);
    computer.run_for_cycles(2000).unwrap();

    let interrupts = computer.bus().peek(0xD020).wrapping_sub(0x0E);
    assert!(interrupts >= 10, "only {} interrupts", interrupts);
    assert!(computer.exit_code().is_none());
}

#[test]
fn test_vic_follows_cia2_bank() {
    let mut computer = setup_c64(&[0x4C, 0x00, 0xE0], &[]);
    computer.bus().write(0xDD02, 0x03);
    computer.bus().write(0xDD00, 0x01);
    computer.step().unwrap();

    assert_eq!(computer.chip::<Cia>(CIA2).unwrap().vic_bank(), 2);
    assert_eq!(computer.chip::<Vic>(VIC).unwrap().bank(), 2);
}

#[test]
fn test_vic_view_sees_characters_in_bank_zero() {
    let computer = setup_c64(&[0x4C, 0x00, 0xE0], &[]);
    let vic = computer.chip::<Vic>(VIC).unwrap();
    // $1000 in bank 0 is the character ROM for the VIC
    assert_eq!(vic.fetch(computer.memory(), 0x1000), 0x3C);
}
