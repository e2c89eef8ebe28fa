//! # Instruction Tables
//!
//! An [`Instruction`] is an immutable descriptor: opcode, encoded length, base
//! cycle cost, a template, and a plain function that executes it. Tables are
//! built once per CPU family and looked up on every fetch.
//!
//! The execution function receives the CPU, the bus and the decoded
//! [`Operands`]. The program counter has already moved past the instruction
//! when it runs. It returns the extra cycles the instruction took on top of its
//! base cost (taken branches, page crossings, repeated block instructions).

use std::borrow::Cow;
use std::collections::BTreeMap;
use std::fmt;

use super::template::InstructionTemplate;
use crate::error::InitializationError;
use crate::memory::MemoryBus;

/// Executes one decoded instruction and returns its extra cycles.
pub type Execute<C> = fn(&mut C, &mut dyn MemoryBus, &Operands) -> u32;

/// The concrete operand bytes fetched for one instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Operands {
    prefix: u16,
    opcode: u8,
    bytes: [u8; 3],
    len: u8,
}

impl Operands {
    /// Operands for `opcode` under `prefix` (0 for none). At most 3 bytes are kept.
    pub fn new(prefix: u16, opcode: u8, bytes: &[u8]) -> Self {
        let mut buf = [0u8; 3];
        let len = bytes.len().min(3);
        buf[..len].copy_from_slice(&bytes[..len]);
        Self {
            prefix,
            opcode,
            bytes: buf,
            len: len as u8,
        }
    }

    pub fn prefix(&self) -> u16 {
        self.prefix
    }

    pub fn opcode(&self) -> u8 {
        self.opcode
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes[..self.len as usize]
    }

    /// Operand byte `i`, or 0 if absent.
    pub fn byte(&self, i: usize) -> u8 {
        self.bytes().get(i).copied().unwrap_or(0)
    }

    /// Operand byte `i` as a signed offset.
    pub fn offset(&self, i: usize) -> i8 {
        self.byte(i) as i8
    }

    /// Little-endian word from bytes `i` and `i + 1`.
    pub fn word(&self, i: usize) -> u16 {
        u16::from_le_bytes([self.byte(i), self.byte(i + 1)])
    }
}

/// One entry of an opcode table.
pub struct Instruction<C> {
    prefix: u16,
    opcode: u8,
    length: u8,
    cycles: u8,
    template: Cow<'static, str>,
    execute: Execute<C>,
}

impl<C> Instruction<C> {
    pub fn new(
        prefix: u16,
        opcode: u8,
        length: u8,
        cycles: u8,
        template: impl Into<Cow<'static, str>>,
        execute: Execute<C>,
    ) -> Self {
        Self {
            prefix,
            opcode,
            length,
            cycles,
            template: template.into(),
            execute,
        }
    }

    pub fn prefix(&self) -> u16 {
        self.prefix
    }

    pub fn opcode(&self) -> u8 {
        self.opcode
    }

    /// Encoded length in bytes, prefixes included.
    pub fn length(&self) -> u8 {
        self.length
    }

    /// Base cycle cost.
    pub fn cycles(&self) -> u8 {
        self.cycles
    }

    pub fn template(&self) -> &str {
        &self.template
    }

    pub fn parse_template(&self) -> Result<InstructionTemplate, InitializationError> {
        InstructionTemplate::parse(&self.template)
    }

    /// First word of the template.
    pub fn mnemonic(&self) -> &str {
        self.template.split_whitespace().next().unwrap_or("")
    }

    /// Runs the bound execution function.
    pub fn execute(&self, cpu: &mut C, bus: &mut dyn MemoryBus, operands: &Operands) -> u32 {
        (self.execute)(cpu, bus, operands)
    }
}

impl<C> Clone for Instruction<C> {
    fn clone(&self) -> Self {
        Self {
            prefix: self.prefix,
            opcode: self.opcode,
            length: self.length,
            cycles: self.cycles,
            template: self.template.clone(),
            execute: self.execute,
        }
    }
}

impl<C> fmt::Debug for Instruction<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Instruction")
            .field("prefix", &format_args!("{:#x}", self.prefix))
            .field("opcode", &format_args!("{:#04x}", self.opcode))
            .field("length", &self.length)
            .field("cycles", &self.cycles)
            .field("template", &self.template)
            .finish()
    }
}

/// Opcode tables of one CPU family, keyed by prefix (0 = unprefixed).
pub struct InstructionSet<C> {
    name: &'static str,
    tables: BTreeMap<u16, Vec<Option<Instruction<C>>>>,
}

impl<C> InstructionSet<C> {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            tables: BTreeMap::new(),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Adds an instruction, replacing any previous entry for the same code.
    pub fn insert(&mut self, instruction: Instruction<C>) {
        let table = self
            .tables
            .entry(instruction.prefix)
            .or_insert_with(|| vec![None; 256]);
        let slot = instruction.opcode as usize;
        table[slot] = Some(instruction);
    }

    pub fn get(&self, prefix: u16, opcode: u8) -> Option<&Instruction<C>> {
        self.tables
            .get(&prefix)
            .and_then(|t| t[opcode as usize].as_ref())
    }

    /// Every instruction, ordered by prefix then opcode.
    pub fn iter(&self) -> impl Iterator<Item = &Instruction<C>> {
        self.tables.values().flat_map(|t| t.iter().flatten())
    }

    pub fn len(&self) -> usize {
        self.iter().count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn prefixes(&self) -> impl Iterator<Item = u16> + '_ {
        self.tables.keys().copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::FlatMemory;

    struct Counter(u32);

    fn bump(c: &mut Counter, _bus: &mut dyn MemoryBus, ops: &Operands) -> u32 {
        c.0 += ops.byte(0) as u32;
        1
    }

    #[test]
    fn test_lookup_and_execute() {
        let mut set = InstructionSet::new("test");
        set.insert(Instruction::new(0, 0x10, 2, 3, "ADD [#1]", bump));
        set.insert(Instruction::new(0xCB, 0x10, 3, 5, "XADD [#1]", bump));
        assert_eq!(set.len(), 2);
        assert!(set.get(0, 0x11).is_none());

        let inst = set.get(0xCB, 0x10).unwrap();
        assert_eq!(inst.mnemonic(), "XADD");
        let mut c = Counter(0);
        let mut bus = FlatMemory::new();
        let extra = inst.execute(&mut c, &mut bus, &Operands::new(0xCB, 0x10, &[7]));
        assert_eq!((c.0, extra), (7, 1));
    }

    #[test]
    fn test_operand_helpers() {
        let ops = Operands::new(0, 0x20, &[0x34, 0x12, 0xFF, 0x99]);
        assert_eq!(ops.bytes().len(), 3);
        assert_eq!(ops.word(0), 0x1234);
        assert_eq!(ops.offset(2), -1);
        assert_eq!(ops.byte(5), 0);
    }
}
