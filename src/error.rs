//! # Error Taxonomy
//!
//! One error type per concern:
//!
//! - [`InitializationError`]: a resource a component needs was missing or
//!   misconfigured when the machine was assembled or initialized.
//! - [`DecodeError`]: the CPU fetched a byte sequence with no matching instruction.
//! - [`ChipError`]: a chip found itself in an inconsistent state while simulating.
//! - [`DeviceError`]: an external device failed during its simulate step.
//! - [`NumericError`]: invalid arithmetic on fixed-width values.
//! - [`EmulationError`]: the umbrella returned by [`Computer`](crate::Computer).
//!
//! Out-of-range memory access is never an error. Unmapped reads return a sentinel
//! and unmapped writes are dropped.

use thiserror::Error;

use crate::chip::ChipId;
use crate::memory::{StorageId, SubsetId, ViewId};

/// Invalid arithmetic on fixed-width values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Error)]
pub enum NumericError {
    /// Operands of an arithmetic operation have different widths.
    #[error("operand widths differ: {left} vs {right} bytes")]
    WidthMismatch { left: usize, right: usize },

    /// Operands mix binary and BCD formats.
    #[error("operands mix binary and BCD formats")]
    FormatMismatch,

    /// Width outside the supported range.
    #[error("width of {0} bytes is outside 1..=8")]
    InvalidWidth(usize),

    /// Value does not fit in the requested width.
    #[error("value {value:#x} does not fit in {width} bytes")]
    Overflow { value: u64, width: usize },

    /// A BCD byte holds a nibble above 9.
    #[error("byte {0:#04x} is not packed BCD")]
    InvalidBcd(u8),
}

/// A required resource was not available when a component was initialized.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InitializationError {
    #[error("physical storage {0} not found")]
    StorageNotFound(StorageId),

    #[error("memory subset {0} not found")]
    SubsetNotFound(SubsetId),

    #[error("memory view {0} not found")]
    ViewNotFound(ViewId),

    #[error("memory subset {0} is declared twice")]
    DuplicateSubset(SubsetId),

    /// The subset's window runs past the end of its storage.
    #[error("subset {subset} needs {end:#x} bytes of storage {storage} which holds {size:#x}")]
    SubsetOutOfBounds {
        subset: SubsetId,
        storage: StorageId,
        end: usize,
        size: usize,
    },

    /// Two subsets of one view answer reads at the same address.
    #[error("subsets {first} and {second} are both readable at ${address:04X} in view {view}")]
    OverlappingSubsets {
        view: ViewId,
        first: SubsetId,
        second: SubsetId,
        address: u16,
    },

    #[error("chip {0} not found")]
    ChipNotFound(ChipId),

    /// A chip expected a register subset routed to it.
    #[error("chip {chip} has no register subset {subset}")]
    MissingRegisters { chip: String, subset: SubsetId },

    /// An instruction template failed to parse while building an opcode table.
    #[error("invalid instruction template {template:?}: {reason}")]
    InvalidTemplate { template: String, reason: String },
}

/// The CPU fetched an opcode with no matching instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Error)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum DecodeError {
    #[error("invalid opcode {opcode:#04x}{} at ${address:04X}", prefix_text(.prefix))]
    InvalidOpcode {
        opcode: u8,
        prefix: Option<u16>,
        address: u16,
    },
}

fn prefix_text(prefix: &Option<u16>) -> String {
    match prefix {
        Some(p) if *p > 0xFF => format!(" after prefix {:#06x}", p),
        Some(p) => format!(" after prefix {:#04x}", p),
        None => String::new(),
    }
}

/// A chip detected an inconsistent internal state while simulating.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ChipError {
    #[error("chip {0} simulated before initialization")]
    NotInitialized(String),

    #[error("chip {chip} is inconsistent: {reason}")]
    InconsistentState { chip: String, reason: String },
}

/// An external device failed during its simulate step.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DeviceError {
    #[error("device {device} failed: {reason}")]
    Failed { device: String, reason: String },
}

/// Any failure that stops a [`Computer`](crate::Computer).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EmulationError {
    #[error(transparent)]
    Initialization(#[from] InitializationError),

    #[error(transparent)]
    Decode(#[from] DecodeError),

    #[error("chip {chip} failed")]
    Chip {
        chip: ChipId,
        #[source]
        source: ChipError,
    },

    #[error("device {device} failed")]
    Device {
        device: usize,
        #[source]
        source: DeviceError,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_error_display() {
        let err = DecodeError::InvalidOpcode {
            opcode: 0xFF,
            prefix: None,
            address: 0x8000,
        };
        assert_eq!(err.to_string(), "invalid opcode 0xff at $8000");

        let err = DecodeError::InvalidOpcode {
            opcode: 0x77,
            prefix: Some(0xED),
            address: 0x0010,
        };
        assert_eq!(err.to_string(), "invalid opcode 0x77 after prefix 0xed at $0010");
    }

    #[test]
    fn test_emulation_error_from_decode() {
        let decode = DecodeError::InvalidOpcode {
            opcode: 0x02,
            prefix: None,
            address: 0,
        };
        let err: EmulationError = decode.into();
        assert!(matches!(err, EmulationError::Decode(_)));
    }
}
