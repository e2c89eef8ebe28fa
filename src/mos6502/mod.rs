//! # MOS 6502
//!
//! A cycle-counting NMOS 6502 core with all 151 documented opcodes, decimal
//! mode, and IRQ/NMI/BRK/RTI handling through the shared interrupt queue.
//!
//! ## CPU State
//!
//! - **Registers**: Accumulator (A), index registers (X, Y)
//! - **Program counter** (PC): 16-bit address of next instruction
//! - **Stack pointer** (SP): 8-bit offset into the stack page ($0100-$01FF)
//! - **Status flags**: N, V, D, I, Z, C as individual bool fields. B only
//!   exists in pushed copies of the status byte.
//! - **Cycle counter**: u64, the machine's time base
//!
//! ## Vectors
//!
//! | Vector | Address | Cost     |
//! |--------|---------|----------|
//! | NMI    | $FFFA   | 7 cycles |
//! | RESET  | $FFFC   | -        |
//! | IRQ    | $FFFE   | 7 cycles |

mod addressing;
pub(crate) mod instructions;
mod opcodes;

use std::any::Any;

use log::warn;

pub use addressing::AddressingMode;
pub use opcodes::{instruction_set, OpcodeMetadata, DOCUMENTED, OPCODE_TABLE};

use crate::chip::ChipId;
use crate::cpu::{
    Cpu, CpuState, Decoded, InterruptId, InterruptRequest, InterruptSystem, LastInstruction, Operands,
    Register, StatusRegister, Vectors,
};
use crate::error::DecodeError;
use crate::memory::MemoryBus;

/// 6502 vector addresses.
pub const VECTORS: Vectors = Vectors {
    reset: 0xFFFC,
    irq: 0xFFFE,
    nmi: 0xFFFA,
};

/// Cycles taken to enter an IRQ or NMI handler.
pub const INTERRUPT_CYCLES: u64 = 7;

/// Status byte bits.
pub(crate) const FLAG_N: u8 = 0b1000_0000;
pub(crate) const FLAG_V: u8 = 0b0100_0000;
pub(crate) const FLAG_UNUSED: u8 = 0b0010_0000;
pub(crate) const FLAG_B: u8 = 0b0001_0000;
pub(crate) const FLAG_D: u8 = 0b0000_1000;
pub(crate) const FLAG_I: u8 = 0b0000_0100;
pub(crate) const FLAG_Z: u8 = 0b0000_0010;
pub(crate) const FLAG_C: u8 = 0b0000_0001;

/// 6502 CPU state.
///
/// The CPU does not own memory; every step borrows a [`MemoryBus`].
///
/// # Examples
///
/// ```
/// use lib8bit::{Cpu, FlatMemory, MemoryBus, Mos6502};
///
/// let mut memory = FlatMemory::new();
/// memory.write(0xFFFC, 0x00);
/// memory.write(0xFFFD, 0x80);
/// memory.load(0x8000, &[0xA9, 0x42]); // LDA #$42
///
/// let mut cpu = Mos6502::new();
/// cpu.reset(&mut memory);
/// cpu.step(&mut memory).unwrap();
///
/// assert_eq!(cpu.a(), 0x42);
/// assert_eq!(cpu.pc(), 0x8002);
/// assert_eq!(cpu.cycles(), 2);
/// ```
#[derive(Debug, Clone)]
pub struct Mos6502 {
    /// Accumulator register
    pub(crate) a: u8,

    /// X index register
    pub(crate) x: u8,

    /// Y index register
    pub(crate) y: u8,

    /// Program counter (address of next instruction)
    pub(crate) pc: u16,

    /// Stack pointer (0x0100 + sp gives full stack address)
    pub(crate) sp: u8,

    pub(crate) flag_n: bool,
    pub(crate) flag_v: bool,
    pub(crate) flag_d: bool,
    pub(crate) flag_i: bool,
    pub(crate) flag_z: bool,
    pub(crate) flag_c: bool,

    /// Total CPU cycles executed
    pub(crate) cycles: u64,

    pub(crate) interrupts: InterruptSystem,
    last: Option<LastInstruction>,
    last_error: Option<DecodeError>,
}

impl Default for Mos6502 {
    fn default() -> Self {
        Self::new()
    }
}

impl Mos6502 {
    /// Creates a CPU in the power-on state with PC at 0. Call
    /// [`Cpu::reset`] to load the reset vector.
    pub fn new() -> Self {
        Self {
            a: 0x00,
            x: 0x00,
            y: 0x00,
            pc: 0x0000,
            sp: 0xFD,
            flag_n: false,
            flag_v: false,
            flag_d: false,
            flag_i: true,
            flag_z: false,
            flag_c: false,
            cycles: 0,
            interrupts: InterruptSystem::irq_and_nmi(),
            last: None,
            last_error: None,
        }
    }

    /// Executes one instruction. Same as [`Cpu::execute_next_instruction`].
    pub fn step(&mut self, bus: &mut dyn MemoryBus) -> Result<(), DecodeError> {
        self.execute_next_instruction(bus)
    }

    /// Runs until at least `cycle_budget` cycles have elapsed.
    ///
    /// Returns the cycles actually consumed, which may overshoot by the length
    /// of the last instruction.
    pub fn run_for_cycles(&mut self, bus: &mut dyn MemoryBus, cycle_budget: u64) -> Result<u64, DecodeError> {
        let start = self.cycles;
        let target = start + cycle_budget;
        while self.cycles < target {
            self.step(bus)?;
        }
        Ok(self.cycles - start)
    }

    // ========== Register Access ==========

    pub fn a(&self) -> u8 {
        self.a
    }

    pub fn x(&self) -> u8 {
        self.x
    }

    pub fn y(&self) -> u8 {
        self.y
    }

    pub fn pc(&self) -> u16 {
        self.pc
    }

    /// Stack pointer. The full stack address is 0x0100 + SP.
    pub fn sp(&self) -> u8 {
        self.sp
    }

    pub fn cycles(&self) -> u64 {
        self.cycles
    }

    pub fn set_a(&mut self, value: u8) {
        self.a = value;
    }

    pub fn set_x(&mut self, value: u8) {
        self.x = value;
    }

    pub fn set_y(&mut self, value: u8) {
        self.y = value;
    }

    pub fn set_pc(&mut self, value: u16) {
        self.pc = value;
    }

    pub fn set_sp(&mut self, value: u8) {
        self.sp = value;
    }

    /// Returns the status register as a packed byte (NV-BDIZC).
    ///
    /// Bit 5 always reads 1. B reads 0; it is only set in copies pushed by
    /// `BRK` and `PHP`.
    pub fn status(&self) -> u8 {
        let mut status = FLAG_UNUSED;
        for (on, bit) in [
            (self.flag_n, FLAG_N),
            (self.flag_v, FLAG_V),
            (self.flag_d, FLAG_D),
            (self.flag_i, FLAG_I),
            (self.flag_z, FLAG_Z),
            (self.flag_c, FLAG_C),
        ] {
            if on {
                status |= bit;
            }
        }
        status
    }

    /// Unpacks a status byte into the flags. B and bit 5 are ignored.
    pub fn set_status(&mut self, value: u8) {
        self.flag_n = value & FLAG_N != 0;
        self.flag_v = value & FLAG_V != 0;
        self.flag_d = value & FLAG_D != 0;
        self.flag_i = value & FLAG_I != 0;
        self.flag_z = value & FLAG_Z != 0;
        self.flag_c = value & FLAG_C != 0;
    }

    /// The status byte as a named-flag register.
    pub fn status_register(&self) -> StatusRegister {
        let mut p = StatusRegister::new(["C", "Z", "I", "D", "B", "-", "V", "N"]);
        p.set_value(self.status());
        p
    }

    // ========== Status Flags ==========

    pub fn flag_n(&self) -> bool {
        self.flag_n
    }

    pub fn flag_v(&self) -> bool {
        self.flag_v
    }

    pub fn flag_d(&self) -> bool {
        self.flag_d
    }

    pub fn flag_i(&self) -> bool {
        self.flag_i
    }

    pub fn flag_z(&self) -> bool {
        self.flag_z
    }

    pub fn flag_c(&self) -> bool {
        self.flag_c
    }

    pub fn set_flag_n(&mut self, value: bool) {
        self.flag_n = value;
    }

    pub fn set_flag_v(&mut self, value: bool) {
        self.flag_v = value;
    }

    pub fn set_flag_d(&mut self, value: bool) {
        self.flag_d = value;
    }

    pub fn set_flag_i(&mut self, value: bool) {
        self.flag_i = value;
    }

    pub fn set_flag_z(&mut self, value: bool) {
        self.flag_z = value;
    }

    pub fn set_flag_c(&mut self, value: bool) {
        self.flag_c = value;
    }

    // ========== Internal Helpers ==========

    /// Sets Z and N from a result byte.
    pub(crate) fn set_zn(&mut self, value: u8) {
        self.flag_z = value == 0;
        self.flag_n = value & 0x80 != 0;
    }

    pub(crate) fn push(&mut self, bus: &mut dyn MemoryBus, value: u8) {
        bus.write(0x0100 | self.sp as u16, value);
        self.sp = self.sp.wrapping_sub(1);
    }

    pub(crate) fn pull(&mut self, bus: &mut dyn MemoryBus) -> u8 {
        self.sp = self.sp.wrapping_add(1);
        bus.read(0x0100 | self.sp as u16)
    }

    pub(crate) fn push_word(&mut self, bus: &mut dyn MemoryBus, value: u16) {
        self.push(bus, (value >> 8) as u8);
        self.push(bus, value as u8);
    }

    pub(crate) fn pull_word(&mut self, bus: &mut dyn MemoryBus) -> u16 {
        let lo = self.pull(bus) as u16;
        let hi = self.pull(bus) as u16;
        (hi << 8) | lo
    }

    /// Computes the effective address of a memory operand.
    ///
    /// Returns the address and whether indexing crossed a page boundary.
    pub(crate) fn effective_address(
        &self,
        bus: &mut dyn MemoryBus,
        mode: AddressingMode,
        op: &Operands,
    ) -> (u16, bool) {
        let zp_word = |bus: &mut dyn MemoryBus, ptr: u8| {
            let lo = bus.read(ptr as u16) as u16;
            let hi = bus.read(ptr.wrapping_add(1) as u16) as u16;
            (hi << 8) | lo
        };
        let indexed = |base: u16, index: u8| {
            let addr = base.wrapping_add(index as u16);
            (addr, (base & 0xFF00) != (addr & 0xFF00))
        };
        match mode {
            AddressingMode::ZeroPage => (op.byte(0) as u16, false),
            AddressingMode::ZeroPageX => (op.byte(0).wrapping_add(self.x) as u16, false),
            AddressingMode::ZeroPageY => (op.byte(0).wrapping_add(self.y) as u16, false),
            AddressingMode::Absolute => (op.word(0), false),
            AddressingMode::AbsoluteX => indexed(op.word(0), self.x),
            AddressingMode::AbsoluteY => indexed(op.word(0), self.y),
            AddressingMode::IndirectX => (zp_word(bus, op.byte(0).wrapping_add(self.x)), false),
            AddressingMode::IndirectY => indexed(zp_word(bus, op.byte(0)), self.y),
            AddressingMode::Indirect => {
                // The high byte of the pointer never carries into the next page.
                let ptr = op.word(0);
                let lo = bus.read(ptr) as u16;
                let hi = bus.read((ptr & 0xFF00) | (ptr.wrapping_add(1) & 0x00FF)) as u16;
                ((hi << 8) | lo, false)
            }
            AddressingMode::Relative => (self.pc.wrapping_add_signed(op.offset(0) as i16), false),
            AddressingMode::Implicit | AddressingMode::Accumulator | AddressingMode::Immediate => (0, false),
        }
    }

    /// Fetches the value an instruction operates on.
    pub(crate) fn operand_value(
        &self,
        bus: &mut dyn MemoryBus,
        mode: AddressingMode,
        op: &Operands,
    ) -> (u8, bool) {
        match mode {
            AddressingMode::Immediate => (op.byte(0), false),
            AddressingMode::Accumulator => (self.a, false),
            _ => {
                let (addr, crossed) = self.effective_address(bus, mode, op);
                (bus.read(addr), crossed)
            }
        }
    }

    fn service_interrupt(&mut self, bus: &mut dyn MemoryBus) {
        let masked = self.flag_i;
        let Some(request) = self
            .interrupts
            .begin_service(|r| r.id == InterruptId::NMI || !masked)
        else {
            return;
        };
        let vector = if request.id == InterruptId::NMI {
            VECTORS.nmi
        } else {
            VECTORS.irq
        };
        self.push_word(bus, self.pc);
        let status = self.status() & !FLAG_B;
        self.push(bus, status);
        self.flag_i = true;
        let lo = bus.read(vector) as u16;
        let hi = bus.read(vector.wrapping_add(1)) as u16;
        self.pc = (hi << 8) | lo;
        self.cycles += INTERRUPT_CYCLES;
    }
}

impl Cpu for Mos6502 {
    fn name(&self) -> &str {
        "6502"
    }

    fn clock_cycles(&self) -> u64 {
        self.cycles
    }

    fn program_counter(&self) -> u16 {
        self.pc
    }

    fn set_program_counter(&mut self, pc: u16) {
        self.pc = pc;
    }

    fn vectors(&self) -> Vectors {
        VECTORS
    }

    fn state(&self) -> CpuState {
        CpuState::Running
    }

    /// Loads PC from $FFFC/$FFFD, sets SP to $FD and I. Cycles restart at 0.
    fn reset(&mut self, bus: &mut dyn MemoryBus) {
        *self = Self::new();
        let lo = bus.read(VECTORS.reset) as u16;
        let hi = bus.read(VECTORS.reset.wrapping_add(1)) as u16;
        self.pc = (hi << 8) | lo;
    }

    fn execute_next_instruction(&mut self, bus: &mut dyn MemoryBus) -> Result<(), DecodeError> {
        self.service_interrupt(bus);

        let address = self.pc;
        let opcode = bus.read(address);
        let Some(instruction) = instruction_set().get(0, opcode) else {
            let err = DecodeError::InvalidOpcode {
                opcode,
                prefix: None,
                address,
            };
            warn!("6502: {}", err);
            self.last_error = Some(err);
            return Err(err);
        };

        let length = instruction.length() as usize;
        let mut bytes = [opcode, 0, 0];
        for (i, byte) in bytes.iter_mut().enumerate().take(length).skip(1) {
            *byte = bus.read(address.wrapping_add(i as u16));
        }
        let operands = Operands::new(0, opcode, &bytes[1..length]);
        self.pc = address.wrapping_add(length as u16);

        let extra = instruction.execute(self, bus, &operands);
        let total = instruction.cycles() as u32 + extra;
        self.cycles += total as u64;

        self.last = Some(LastInstruction {
            decoded: Decoded {
                address,
                bytes: bytes[..length].to_vec(),
                template: instruction.template().into(),
                operands,
                cycles: instruction.cycles(),
            },
            cycles: total,
        });
        self.last_error = None;
        Ok(())
    }

    fn decode_at(&self, bus: &dyn MemoryBus, address: u16) -> Result<Decoded, DecodeError> {
        let opcode = bus.peek(address);
        let instruction = instruction_set()
            .get(0, opcode)
            .ok_or(DecodeError::InvalidOpcode {
                opcode,
                prefix: None,
                address,
            })?;
        let bytes: Vec<u8> = (0..instruction.length() as u16)
            .map(|i| bus.peek(address.wrapping_add(i)))
            .collect();
        Ok(Decoded {
            address,
            operands: Operands::new(0, opcode, &bytes[1..]),
            bytes,
            template: instruction.template().into(),
            cycles: instruction.cycles(),
        })
    }

    fn request_interrupt(&mut self, request: InterruptRequest) -> bool {
        self.interrupts.request(request)
    }

    fn withdraw_interrupt(&mut self, id: InterruptId, source: ChipId) -> bool {
        self.interrupts.withdraw(id, source)
    }

    fn interrupts(&self) -> &InterruptSystem {
        &self.interrupts
    }

    fn registers(&self) -> Vec<Register> {
        vec![
            Register::byte("A", self.a),
            Register::byte("X", self.x),
            Register::byte("Y", self.y),
            Register::byte("SP", self.sp),
            Register::word("PC", self.pc),
            Register::byte("P", self.status()),
        ]
    }

    fn last_instruction(&self) -> Option<&LastInstruction> {
        self.last.as_ref()
    }

    fn last_error(&self) -> Option<DecodeError> {
        self.last_error
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::FlatMemory;

    fn setup_cpu() -> (Mos6502, FlatMemory) {
        let mut mem = FlatMemory::new();
        mem.write(0xFFFC, 0x00);
        mem.write(0xFFFD, 0x80);
        let mut cpu = Mos6502::new();
        cpu.reset(&mut mem);
        (cpu, mem)
    }

    #[test]
    fn test_cpu_initialization() {
        let (cpu, _mem) = setup_cpu();
        assert_eq!(cpu.pc(), 0x8000);
        assert_eq!(cpu.sp(), 0xFD);
        assert_eq!(cpu.cycles(), 0);
        assert!(cpu.flag_i());
        assert_eq!(cpu.status(), 0b0010_0100);
    }

    #[test]
    fn test_invalid_opcode_changes_nothing() {
        let (mut cpu, mut mem) = setup_cpu();
        mem.write(0x8000, 0x02);
        let before = cpu.registers();
        let err = cpu.step(&mut mem).unwrap_err();
        assert_eq!(
            err,
            DecodeError::InvalidOpcode {
                opcode: 0x02,
                prefix: None,
                address: 0x8000
            }
        );
        assert_eq!(cpu.registers(), before);
        assert_eq!(cpu.cycles(), 0);
        assert_eq!(cpu.last_error(), Some(err));
    }

    #[test]
    fn test_status_round_trip_ignores_b() {
        let (mut cpu, _mem) = setup_cpu();
        cpu.set_status(0xFF);
        assert_eq!(cpu.status(), 0xFF & !FLAG_B);
        assert_eq!(cpu.status_register().flag("N"), Some(true));
    }

    #[test]
    fn test_last_instruction_text() {
        let (mut cpu, mut mem) = setup_cpu();
        mem.load(0x8000, &[0xBD, 0x00, 0xC0]);
        cpu.step(&mut mem).unwrap();
        let last = cpu.last_instruction().unwrap();
        assert_eq!(last.text(), "LDA $C000,X");
        assert_eq!(last.cycles, 4);
    }
}
