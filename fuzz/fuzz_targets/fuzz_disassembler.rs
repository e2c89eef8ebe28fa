//! Fuzz target for the disassembler.
//!
//! Arbitrary bytes through either core. Lines must tile the input exactly.

#![no_main]

use arbitrary::Arbitrary;
use lib8bit::disassembler::{disassemble, format_line, DisassemblyOptions};
use lib8bit::{Cpu, Mos6502, Z80};
use libfuzzer_sys::fuzz_target;

#[derive(Debug, Arbitrary)]
struct FuzzInput {
    bytes: Vec<u8>,
    start_address: u16,
    hex_dump: bool,
    z80: bool,
}

fuzz_target!(|input: FuzzInput| {
    if input.bytes.len() > 0x1000 {
        return;
    }

    let options = DisassemblyOptions {
        start_address: input.start_address,
        hex_dump: input.hex_dump,
    };
    let cpu: Box<dyn Cpu> = if input.z80 {
        Box::new(Z80::new())
    } else {
        Box::new(Mos6502::new())
    };
    let lines = disassemble(cpu.as_ref(), &input.bytes, options);

    let mut total_size = 0usize;
    let mut expected_address = input.start_address;
    for line in &lines {
        assert_eq!(line.address, expected_address);
        assert!(!line.bytes.is_empty() && line.bytes.len() <= 4);
        assert!(!line.text.is_empty());
        assert!(format_line(line, &options).contains(&line.text));

        total_size += line.bytes.len();
        expected_address = expected_address.wrapping_add(line.bytes.len() as u16);
    }
    assert_eq!(total_size, input.bytes.len());
});
