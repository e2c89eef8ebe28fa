//! Fuzz target for Z80 step execution, prefixes included.

#![no_main]

use arbitrary::Arbitrary;
use lib8bit::z80::InterruptMode;
use lib8bit::{Cpu, FlatMemory, Z80};
use libfuzzer_sys::fuzz_target;

#[derive(Debug, Arbitrary)]
struct FuzzCpuState {
    af: u16,
    bc: u16,
    de: u16,
    hl: u16,
    ix: u16,
    iy: u16,
    sp: u16,
    i: u8,
    mode: u8,
    iff: bool,
}

#[derive(Debug, Arbitrary)]
struct FuzzInput {
    cpu_state: FuzzCpuState,
    /// Instruction bytes at $0000, long enough for DD CB d op
    instruction_bytes: [u8; 4],
    /// Contents around the index registers and the stack
    data: [u8; 256],
    ports: [u8; 16],
}

fuzz_target!(|input: FuzzInput| {
    let state = &input.cpu_state;
    let mut memory = FlatMemory::new();
    memory.load(0x0000, &input.instruction_bytes);
    memory.load(state.hl.wrapping_sub(0x80), &input.data);
    memory.load(state.ix.wrapping_sub(0x80), &input.data);
    memory.load(state.sp, &input.data);
    for (port, &value) in input.ports.iter().enumerate() {
        memory.set_port(port as u8, value);
    }

    let mut cpu = Z80::new();
    cpu.reset(&mut memory);
    cpu.set_af(state.af);
    cpu.set_bc(state.bc);
    cpu.set_de(state.de);
    cpu.set_hl(state.hl);
    cpu.set_ix(state.ix);
    cpu.set_iy(state.iy);
    cpu.set_sp(state.sp);
    cpu.set_i(state.i);
    cpu.set_interrupt_mode(match state.mode % 3 {
        0 => InterruptMode::Mode0,
        1 => InterruptMode::Mode1,
        _ => InterruptMode::Mode2,
    });
    cpu.set_iff(state.iff);

    let before = cpu.registers();
    match cpu.step(&mut memory) {
        Ok(()) => {
            assert!(cpu.cycles() >= 4);
            assert!(cpu.last_instruction().is_some());
        }
        Err(_) => {
            assert_eq!(cpu.registers(), before);
            assert_eq!(cpu.cycles(), 0);
        }
    }
});
