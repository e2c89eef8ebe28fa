//! Fuzz target for 6502 step execution.
//!
//! Arbitrary registers and memory around the program counter, then one
//! instruction. A failed step must leave the CPU untouched.

#![no_main]

use arbitrary::Arbitrary;
use lib8bit::{Cpu, FlatMemory, MemoryBus, Mos6502};
use libfuzzer_sys::fuzz_target;

#[derive(Debug, Arbitrary)]
struct FuzzCpuState {
    a: u8,
    x: u8,
    y: u8,
    sp: u8,
    status: u8,
}

#[derive(Debug, Arbitrary)]
struct FuzzMemory {
    /// Instruction and operands at $8000
    instruction_bytes: [u8; 3],
    zero_page: [u8; 256],
    stack_page: [u8; 256],
    /// Target of absolute addressing, at $4000
    main_memory: [u8; 256],
}

#[derive(Debug, Arbitrary)]
struct FuzzInput {
    cpu_state: FuzzCpuState,
    memory: FuzzMemory,
}

fuzz_target!(|input: FuzzInput| {
    let mut memory = FlatMemory::new();
    memory.load(0xFFFC, &[0x00, 0x80, 0x00, 0x90]);
    memory.load(0x8000, &input.memory.instruction_bytes);
    memory.load(0x0000, &input.memory.zero_page);
    memory.load(0x0100, &input.memory.stack_page);
    memory.load(0x4000, &input.memory.main_memory);

    let mut cpu = Mos6502::new();
    cpu.reset(&mut memory);
    cpu.set_a(input.cpu_state.a);
    cpu.set_x(input.cpu_state.x);
    cpu.set_y(input.cpu_state.y);
    cpu.set_sp(input.cpu_state.sp);
    cpu.set_status(input.cpu_state.status);

    let before = cpu.registers();
    match cpu.step(&mut memory) {
        Ok(()) => {
            assert!(cpu.cycles() >= 2);
            assert_eq!(cpu.status() & 0x30, 0x20);
        }
        Err(_) => {
            assert_eq!(cpu.registers(), before);
            assert_eq!(cpu.cycles(), 0);
            assert_eq!(memory.peek(0x8000), input.memory.instruction_bytes[0]);
        }
    }
});
