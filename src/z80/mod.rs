//! # Zilog Z80
//!
//! A T-state counting Z80 core. Opcode tables for the unprefixed, `CB`, `ED`,
//! `DD`/`FD` and `DDCB`/`FDCB` spaces are generated from the regular opcode
//! fields (see [`instruction_set`]).
//!
//! ## Interrupts
//!
//! | Source | Condition         | Action                                  | T-states |
//! |--------|-------------------|-----------------------------------------|----------|
//! | NMI    | always            | IFF1 cleared, `RST $66`                 | 11       |
//! | INT    | IFF1, mode 0      | executes `RST $38` from the data bus    | 13       |
//! | INT    | IFF1, mode 1      | `RST $38`                               | 13       |
//! | INT    | IFF1, mode 2      | jump through the table at I*256 + bus   | 19       |
//!
//! `EI` enables interrupts only after the following instruction. `HALT`
//! parks the CPU in [`CpuState::Halted`], burning 4 T-states per step, until
//! an interrupt is accepted.

mod alu;
mod instructions;
mod tables;

use std::any::Any;

use log::warn;

pub use alu::{FLAG_C, FLAG_H, FLAG_N, FLAG_PV, FLAG_S, FLAG_X, FLAG_Y, FLAG_Z};
pub use tables::instruction_set;

use crate::chip::ChipId;
use crate::cpu::{
    Cpu, CpuState, Decoded, InterruptId, InterruptRequest, InterruptSystem, LastInstruction, Operands,
    Register, StatusRegister, Vectors,
};
use crate::error::DecodeError;
use crate::memory::MemoryBus;

/// Z80 fixed addresses. `irq` is the mode 1 restart.
pub const VECTORS: Vectors = Vectors {
    reset: 0x0000,
    irq: 0x0038,
    nmi: 0x0066,
};

/// Table prefixes as used in [`Operands::prefix`] and [`DecodeError`].
pub mod prefix {
    pub const NONE: u16 = 0x00;
    pub const CB: u16 = 0xCB;
    pub const ED: u16 = 0xED;
    pub const DD: u16 = 0xDD;
    pub const FD: u16 = 0xFD;
    pub const DDCB: u16 = 0xDDCB;
    pub const FDCB: u16 = 0xFDCB;
}

/// Which register pair stands in for HL.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Index {
    Hl,
    Ix,
    Iy,
}

impl Index {
    pub(crate) fn of(prefix: u16) -> Index {
        match prefix {
            prefix::DD | prefix::DDCB => Index::Ix,
            prefix::FD | prefix::FDCB => Index::Iy,
            _ => Index::Hl,
        }
    }

    pub(crate) fn name(self) -> &'static str {
        match self {
            Index::Hl => "HL",
            Index::Ix => "IX",
            Index::Iy => "IY",
        }
    }
}

/// Interrupt mode selected by `IM 0/1/2`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InterruptMode {
    #[default]
    Mode0,
    Mode1,
    Mode2,
}

/// Z80 CPU state.
///
/// # Examples
///
/// ```
/// use lib8bit::{Cpu, FlatMemory, Z80};
///
/// let mut memory = FlatMemory::new();
/// memory.load(0x0000, &[0x3E, 0x12, 0xC6, 0x30]); // LD A,$12 / ADD A,$30
///
/// let mut cpu = Z80::new();
/// cpu.reset(&mut memory);
/// cpu.step(&mut memory).unwrap();
/// cpu.step(&mut memory).unwrap();
///
/// assert_eq!(cpu.a(), 0x42);
/// assert_eq!(cpu.cycles(), 14);
/// ```
#[derive(Debug, Clone)]
pub struct Z80 {
    pub(crate) a: u8,
    pub(crate) f: u8,
    pub(crate) b: u8,
    pub(crate) c: u8,
    pub(crate) d: u8,
    pub(crate) e: u8,
    pub(crate) h: u8,
    pub(crate) l: u8,

    /// Shadow AF, BC, DE, HL swapped in by `EX AF,AF'` and `EXX`
    pub(crate) af_alt: u16,
    pub(crate) bc_alt: u16,
    pub(crate) de_alt: u16,
    pub(crate) hl_alt: u16,

    pub(crate) ix: u16,
    pub(crate) iy: u16,
    pub(crate) sp: u16,
    pub(crate) pc: u16,

    /// Interrupt vector base
    pub(crate) i: u8,
    /// Memory refresh counter; bit 7 only changes through `LD R,A`
    pub(crate) r: u8,

    pub(crate) iff1: bool,
    pub(crate) iff2: bool,
    pub(crate) im: InterruptMode,
    /// Set by `EI` to hold off maskable interrupts for one instruction
    pub(crate) ei_delay: bool,
    pub(crate) halted: bool,

    /// Byte a device puts on the data bus during an interrupt acknowledge
    pub(crate) bus_value: u8,

    /// Total T-states executed
    pub(crate) cycles: u64,

    pub(crate) interrupts: InterruptSystem,
    last: Option<LastInstruction>,
    last_error: Option<DecodeError>,
}

impl Default for Z80 {
    fn default() -> Self {
        Self::new()
    }
}

impl Z80 {
    pub fn new() -> Self {
        Self {
            a: 0xFF,
            f: 0xFF,
            b: 0,
            c: 0,
            d: 0,
            e: 0,
            h: 0,
            l: 0,
            af_alt: 0,
            bc_alt: 0,
            de_alt: 0,
            hl_alt: 0,
            ix: 0,
            iy: 0,
            sp: 0xFFFF,
            pc: 0,
            i: 0,
            r: 0,
            iff1: false,
            iff2: false,
            im: InterruptMode::Mode0,
            ei_delay: false,
            halted: false,
            bus_value: 0xFF,
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

    // ========== Register Access ==========

    pub fn a(&self) -> u8 {
        self.a
    }

    pub fn f(&self) -> u8 {
        self.f
    }

    pub fn b(&self) -> u8 {
        self.b
    }

    pub fn c(&self) -> u8 {
        self.c
    }

    pub fn d(&self) -> u8 {
        self.d
    }

    pub fn e(&self) -> u8 {
        self.e
    }

    pub fn h(&self) -> u8 {
        self.h
    }

    pub fn l(&self) -> u8 {
        self.l
    }

    pub fn af(&self) -> u16 {
        u16::from_be_bytes([self.a, self.f])
    }

    pub fn bc(&self) -> u16 {
        u16::from_be_bytes([self.b, self.c])
    }

    pub fn de(&self) -> u16 {
        u16::from_be_bytes([self.d, self.e])
    }

    pub fn hl(&self) -> u16 {
        u16::from_be_bytes([self.h, self.l])
    }

    pub fn ix(&self) -> u16 {
        self.ix
    }

    pub fn iy(&self) -> u16 {
        self.iy
    }

    pub fn sp(&self) -> u16 {
        self.sp
    }

    pub fn pc(&self) -> u16 {
        self.pc
    }

    pub fn i(&self) -> u8 {
        self.i
    }

    pub fn r(&self) -> u8 {
        self.r
    }

    pub fn iff1(&self) -> bool {
        self.iff1
    }

    pub fn iff2(&self) -> bool {
        self.iff2
    }

    pub fn interrupt_mode(&self) -> InterruptMode {
        self.im
    }

    pub fn halted(&self) -> bool {
        self.halted
    }

    pub fn cycles(&self) -> u64 {
        self.cycles
    }

    pub fn set_a(&mut self, value: u8) {
        self.a = value;
    }

    pub fn set_f(&mut self, value: u8) {
        self.f = value;
    }

    pub fn set_af(&mut self, value: u16) {
        [self.a, self.f] = value.to_be_bytes();
    }

    pub fn set_bc(&mut self, value: u16) {
        [self.b, self.c] = value.to_be_bytes();
    }

    pub fn set_de(&mut self, value: u16) {
        [self.d, self.e] = value.to_be_bytes();
    }

    pub fn set_hl(&mut self, value: u16) {
        [self.h, self.l] = value.to_be_bytes();
    }

    pub fn set_ix(&mut self, value: u16) {
        self.ix = value;
    }

    pub fn set_iy(&mut self, value: u16) {
        self.iy = value;
    }

    pub fn set_sp(&mut self, value: u16) {
        self.sp = value;
    }

    pub fn set_pc(&mut self, value: u16) {
        self.pc = value;
    }

    pub fn set_i(&mut self, value: u8) {
        self.i = value;
    }

    pub fn set_interrupt_mode(&mut self, mode: InterruptMode) {
        self.im = mode;
    }

    /// Sets both interrupt flip-flops, as `EI`/`DI` do but without the delay.
    pub fn set_iff(&mut self, enabled: bool) {
        self.iff1 = enabled;
        self.iff2 = enabled;
    }

    /// Sets the byte read from the data bus when a mode 2 interrupt is
    /// acknowledged.
    pub fn set_bus_value(&mut self, value: u8) {
        self.bus_value = value;
    }

    /// F as a named-flag register.
    pub fn status_register(&self) -> StatusRegister {
        let mut f = StatusRegister::new(["C", "N", "P/V", "X", "H", "Y", "Z", "S"]);
        f.set_value(self.f);
        f
    }

    // ========== Internal Helpers ==========

    /// Advances the low 7 bits of R.
    pub(crate) fn refresh(&mut self, fetches: u8) {
        self.r = (self.r & 0x80) | (self.r.wrapping_add(fetches) & 0x7F);
    }

    /// The register pair HL, IX or IY.
    pub(crate) fn index_reg(&self, index: Index) -> u16 {
        match index {
            Index::Hl => self.hl(),
            Index::Ix => self.ix,
            Index::Iy => self.iy,
        }
    }

    pub(crate) fn set_index_reg(&mut self, index: Index, value: u16) {
        match index {
            Index::Hl => self.set_hl(value),
            Index::Ix => self.ix = value,
            Index::Iy => self.iy = value,
        }
    }

    /// Register pair by the `p` field: BC, DE, HL (or index), SP.
    pub(crate) fn pair(&self, p: u8, index: Index) -> u16 {
        match p & 3 {
            0 => self.bc(),
            1 => self.de(),
            2 => self.index_reg(index),
            _ => self.sp,
        }
    }

    pub(crate) fn set_pair(&mut self, p: u8, index: Index, value: u16) {
        match p & 3 {
            0 => self.set_bc(value),
            1 => self.set_de(value),
            2 => self.set_index_reg(index, value),
            _ => self.sp = value,
        }
    }

    /// Like [`pair`](Self::pair) with AF in place of SP, for `PUSH`/`POP`.
    pub(crate) fn pair_af(&self, p: u8, index: Index) -> u16 {
        if p & 3 == 3 {
            self.af()
        } else {
            self.pair(p, index)
        }
    }

    pub(crate) fn set_pair_af(&mut self, p: u8, index: Index, value: u16) {
        if p & 3 == 3 {
            self.set_af(value);
        } else {
            self.set_pair(p, index, value);
        }
    }

    /// 8-bit register by the `r` field, except 6 which is memory. With an
    /// index prefix H and L mean the index halves.
    pub(crate) fn reg(&self, r: u8, index: Index) -> u8 {
        match (r & 7, index) {
            (0, _) => self.b,
            (1, _) => self.c,
            (2, _) => self.d,
            (3, _) => self.e,
            (4, Index::Hl) => self.h,
            (5, Index::Hl) => self.l,
            (4, ix) => (self.index_reg(ix) >> 8) as u8,
            (5, ix) => self.index_reg(ix) as u8,
            _ => self.a,
        }
    }

    pub(crate) fn set_reg(&mut self, r: u8, index: Index, value: u8) {
        match (r & 7, index) {
            (0, _) => self.b = value,
            (1, _) => self.c = value,
            (2, _) => self.d = value,
            (3, _) => self.e = value,
            (4, Index::Hl) => self.h = value,
            (5, Index::Hl) => self.l = value,
            (4, ix) => {
                let v = (self.index_reg(ix) & 0x00FF) | ((value as u16) << 8);
                self.set_index_reg(ix, v);
            }
            (5, ix) => {
                let v = (self.index_reg(ix) & 0xFF00) | value as u16;
                self.set_index_reg(ix, v);
            }
            _ => self.a = value,
        }
    }

    /// Address of the `(HL)` operand: HL, or IX/IY plus the displacement in
    /// the first operand byte.
    pub(crate) fn memory_operand(&self, index: Index, op: &Operands) -> u16 {
        match index {
            Index::Hl => self.hl(),
            ix => self.index_reg(ix).wrapping_add_signed(op.offset(0) as i16),
        }
    }

    /// Reads the operand named by the `r` field.
    pub(crate) fn read_r(&self, bus: &mut dyn MemoryBus, r: u8, index: Index, op: &Operands) -> u8 {
        if r & 7 == 6 {
            bus.read(self.memory_operand(index, op))
        } else {
            self.reg(r, index)
        }
    }

    pub(crate) fn write_r(&mut self, bus: &mut dyn MemoryBus, r: u8, index: Index, op: &Operands, value: u8) {
        if r & 7 == 6 {
            bus.write(self.memory_operand(index, op), value);
        } else {
            self.set_reg(r, index, value);
        }
    }

    /// Condition by the `y` field: NZ Z NC C PO PE P M.
    pub(crate) fn condition(&self, cc: u8) -> bool {
        let flag = |bit: u8| self.f & bit != 0;
        match cc & 7 {
            0 => !flag(FLAG_Z),
            1 => flag(FLAG_Z),
            2 => !flag(FLAG_C),
            3 => flag(FLAG_C),
            4 => !flag(FLAG_PV),
            5 => flag(FLAG_PV),
            6 => !flag(FLAG_S),
            _ => flag(FLAG_S),
        }
    }

    pub(crate) fn push(&mut self, bus: &mut dyn MemoryBus, value: u16) {
        let [hi, lo] = value.to_be_bytes();
        self.sp = self.sp.wrapping_sub(1);
        bus.write(self.sp, hi);
        self.sp = self.sp.wrapping_sub(1);
        bus.write(self.sp, lo);
    }

    pub(crate) fn pop(&mut self, bus: &mut dyn MemoryBus) -> u16 {
        let lo = bus.read(self.sp);
        self.sp = self.sp.wrapping_add(1);
        let hi = bus.read(self.sp);
        self.sp = self.sp.wrapping_add(1);
        u16::from_le_bytes([lo, hi])
    }

    pub(crate) fn read_word(bus: &mut dyn MemoryBus, addr: u16) -> u16 {
        u16::from_le_bytes([bus.read(addr), bus.read(addr.wrapping_add(1))])
    }

    pub(crate) fn write_word(bus: &mut dyn MemoryBus, addr: u16, value: u16) {
        let [lo, hi] = value.to_le_bytes();
        bus.write(addr, lo);
        bus.write(addr.wrapping_add(1), hi);
    }

    /// Accepts a pending interrupt if allowed. Returns true when one was taken.
    fn service_interrupt(&mut self, bus: &mut dyn MemoryBus, hold_maskable: bool) -> bool {
        let maskable_ok = self.iff1 && !hold_maskable;
        let Some(request) = self
            .interrupts
            .begin_service(|r| r.id == InterruptId::NMI || maskable_ok)
        else {
            return false;
        };

        self.halted = false;
        self.refresh(1);
        self.push(bus, self.pc);

        if request.id == InterruptId::NMI {
            self.iff1 = false;
            self.pc = VECTORS.nmi;
            self.cycles += 11;
            return true;
        }

        self.iff1 = false;
        self.iff2 = false;
        match self.im {
            InterruptMode::Mode0 | InterruptMode::Mode1 => {
                self.pc = VECTORS.irq;
                self.cycles += 13;
            }
            InterruptMode::Mode2 => {
                let table = u16::from_be_bytes([self.i, self.bus_value]);
                self.pc = Self::read_word(bus, table);
                self.cycles += 19;
            }
        }
        true
    }

    /// Reads the prefix bytes and opcode at `address`.
    ///
    /// Returns the table prefix, the opcode, the bytes read so far (the first
    /// operand byte follows them), and for `DDCB`/`FDCB` the displacement that
    /// precedes the opcode.
    fn fetch_head(read: &mut dyn FnMut(u16) -> u8, address: u16) -> (u16, u8, Vec<u8>, Option<u8>) {
        let b0 = read(address);
        match b0 {
            0xCB | 0xED => {
                let opcode = read(address.wrapping_add(1));
                (b0 as u16, opcode, vec![b0, opcode], None)
            }
            0xDD | 0xFD => {
                let b1 = read(address.wrapping_add(1));
                if b1 == 0xCB {
                    let d = read(address.wrapping_add(2));
                    let opcode = read(address.wrapping_add(3));
                    (((b0 as u16) << 8) | 0xCB, opcode, vec![b0, b1, d, opcode], Some(d))
                } else {
                    (b0 as u16, b1, vec![b0, b1], None)
                }
            }
            _ => (prefix::NONE, b0, vec![b0], None),
        }
    }

    /// Decodes the instruction at `address`, reading every byte once.
    fn decode_with(
        read: &mut dyn FnMut(u16) -> u8,
        address: u16,
    ) -> Result<(Decoded, &'static crate::cpu::Instruction<Z80>), DecodeError> {
        let (table, opcode, mut bytes, displacement) = Self::fetch_head(read, address);
        let instruction = instruction_set()
            .get(table, opcode)
            .ok_or(DecodeError::InvalidOpcode {
                opcode,
                prefix: (table != prefix::NONE).then_some(table),
                address,
            })?;
        let head = bytes.len();
        for i in head..instruction.length() as usize {
            bytes.push(read(address.wrapping_add(i as u16)));
        }
        let operands = match displacement {
            Some(d) => Operands::new(table, opcode, &[d]),
            None => Operands::new(table, opcode, &bytes[head..]),
        };
        Ok((
            Decoded {
                address,
                bytes,
                template: instruction.template().into(),
                operands,
                cycles: instruction.cycles(),
            },
            instruction,
        ))
    }
}

impl Cpu for Z80 {
    fn name(&self) -> &str {
        "Z80"
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
        if self.halted {
            CpuState::Halted
        } else {
            CpuState::Running
        }
    }

    /// PC, I and R to 0, interrupts disabled, mode 0. Cycles restart at 0.
    fn reset(&mut self, _bus: &mut dyn MemoryBus) {
        *self = Self::new();
        self.pc = VECTORS.reset;
    }

    fn execute_next_instruction(&mut self, bus: &mut dyn MemoryBus) -> Result<(), DecodeError> {
        let hold_maskable = std::mem::take(&mut self.ei_delay);
        self.service_interrupt(bus, hold_maskable);

        if self.halted {
            self.refresh(1);
            self.cycles += 4;
            return Ok(());
        }

        let address = self.pc;
        let decoded = Self::decode_with(&mut |a| bus.read(a), address);
        let (decoded, instruction) = match decoded {
            Ok(found) => found,
            Err(err) => {
                warn!("Z80: {}", err);
                self.last_error = Some(err);
                return Err(err);
            }
        };

        let fetches = match decoded.operands.prefix() {
            prefix::NONE => 1,
            _ => 2,
        };
        self.refresh(fetches);
        self.pc = decoded.next_address();

        let extra = instruction.execute(self, bus, &decoded.operands);
        let total = instruction.cycles() as u32 + extra;
        self.cycles += total as u64;

        self.last = Some(LastInstruction {
            decoded,
            cycles: total,
        });
        self.last_error = None;
        Ok(())
    }

    fn decode_at(&self, bus: &dyn MemoryBus, address: u16) -> Result<Decoded, DecodeError> {
        Self::decode_with(&mut |a| bus.peek(a), address).map(|(decoded, _)| decoded)
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
            Register::word("AF", self.af()),
            Register::word("BC", self.bc()),
            Register::word("DE", self.de()),
            Register::word("HL", self.hl()),
            Register::word("IX", self.ix),
            Register::word("IY", self.iy),
            Register::word("SP", self.sp),
            Register::word("PC", self.pc),
            Register::byte("I", self.i),
            Register::byte("R", self.r),
            Register::word("AF'", self.af_alt),
            Register::word("BC'", self.bc_alt),
            Register::word("DE'", self.de_alt),
            Register::word("HL'", self.hl_alt),
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

    fn setup_cpu(program: &[u8]) -> (Z80, FlatMemory) {
        let mut mem = FlatMemory::new();
        mem.load(0x0000, program);
        let mut cpu = Z80::new();
        cpu.reset(&mut mem);
        (cpu, mem)
    }

    #[test]
    fn test_reset_state() {
        let (cpu, _mem) = setup_cpu(&[]);
        assert_eq!(cpu.pc(), 0x0000);
        assert!(!cpu.iff1());
        assert_eq!(cpu.interrupt_mode(), InterruptMode::Mode0);
        assert_eq!(cpu.state(), CpuState::Running);
    }

    #[test]
    fn test_index_halves() {
        let mut cpu = Z80::new();
        cpu.set_ix(0x1234);
        cpu.set_reg(4, Index::Ix, 0xAB);
        assert_eq!(cpu.ix(), 0xAB34);
        assert_eq!(cpu.reg(5, Index::Ix), 0x34);
        assert_eq!(cpu.reg(4, Index::Hl), 0x00);
    }

    #[test]
    fn test_refresh_keeps_bit_seven() {
        let mut cpu = Z80::new();
        cpu.r = 0xFF;
        cpu.refresh(1);
        assert_eq!(cpu.r(), 0x80);
    }

    #[test]
    fn test_invalid_ed_opcode_reports_prefix() {
        let (mut cpu, mut mem) = setup_cpu(&[0xED, 0x00]);
        let err = cpu.step(&mut mem).unwrap_err();
        assert_eq!(
            err,
            DecodeError::InvalidOpcode {
                opcode: 0x00,
                prefix: Some(0xED),
                address: 0
            }
        );
        assert_eq!(cpu.pc(), 0);
        assert_eq!(cpu.cycles(), 0);
    }
}
