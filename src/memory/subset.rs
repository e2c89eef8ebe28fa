//! Subsets: activatable windows mapped into an address range.

use super::{StorageId, SubsetId};
use crate::chip::ChipId;

/// What answers accesses inside a subset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SubsetKind {
    /// A window into a physical storage starting at `offset`.
    Window { storage: StorageId, offset: usize },
    /// An empty region answering a constant and ignoring writes.
    Fixed(u8),
    /// A chip's register block. `chip` is attached when the machine is initialized.
    Registers { chip: Option<ChipId> },
}

/// A non-owning, address-mapped window with independent read and write activation.
///
/// # Examples
///
/// ```
/// use lib8bit::{PhysicalStorageSubset, StorageId, SubsetId};
///
/// let basic = PhysicalStorageSubset::window(SubsetId(3), "BASIC", StorageId(1), 0, 0xA000, 0x2000)
///     .with_activation(true, false);
///
/// assert!(basic.contains(0xBFFF));
/// assert!(!basic.contains(0xC000));
/// assert!(basic.active_for_read());
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhysicalStorageSubset {
    id: SubsetId,
    name: String,
    kind: SubsetKind,
    start: u16,
    len: u32,
    active_for_read: bool,
    active_for_write: bool,
    initial_read: bool,
    initial_write: bool,
    default_data: Option<Vec<u8>>,
}

impl PhysicalStorageSubset {
    fn with_kind(id: SubsetId, name: impl Into<String>, kind: SubsetKind, start: u16, len: u32) -> Self {
        Self {
            id,
            name: name.into(),
            kind,
            start,
            len,
            active_for_read: true,
            active_for_write: true,
            initial_read: true,
            initial_write: true,
            default_data: None,
        }
    }

    /// Window of `len` bytes of `storage` from `offset`, mapped at `start`.
    pub fn window(
        id: SubsetId,
        name: impl Into<String>,
        storage: StorageId,
        offset: usize,
        start: u16,
        len: u32,
    ) -> Self {
        Self::with_kind(id, name, SubsetKind::Window { storage, offset }, start, len)
    }

    /// Empty region answering `value`.
    pub fn fixed(id: SubsetId, name: impl Into<String>, value: u8, start: u16, len: u32) -> Self {
        Self::with_kind(id, name, SubsetKind::Fixed(value), start, len)
    }

    /// Chip register block.
    pub fn registers(id: SubsetId, name: impl Into<String>, start: u16, len: u32) -> Self {
        Self::with_kind(id, name, SubsetKind::Registers { chip: None }, start, len)
    }

    /// Sets the activation flags, which also become the ones restored on initialize.
    pub fn with_activation(mut self, read: bool, write: bool) -> Self {
        self.active_for_read = read;
        self.active_for_write = write;
        self.initial_read = read;
        self.initial_write = write;
        self
    }

    /// Contents restored into the window on initialize.
    pub fn with_default_data(mut self, data: Vec<u8>) -> Self {
        self.default_data = Some(data);
        self
    }

    pub fn id(&self) -> SubsetId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> SubsetKind {
        self.kind
    }

    /// First mapped address.
    pub fn start(&self) -> u16 {
        self.start
    }

    /// Number of mapped addresses.
    pub fn len(&self) -> u32 {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// One past the last mapped address.
    pub fn end(&self) -> u32 {
        self.start as u32 + self.len
    }

    pub fn contains(&self, address: u16) -> bool {
        let a = address as u32;
        a >= self.start as u32 && a < self.end()
    }

    /// Whether the two address ranges share at least one address.
    pub fn overlaps(&self, other: &PhysicalStorageSubset) -> bool {
        (self.start as u32) < other.end() && (other.start as u32) < self.end()
    }

    pub fn active_for_read(&self) -> bool {
        self.active_for_read
    }

    pub fn active_for_write(&self) -> bool {
        self.active_for_write
    }

    pub fn set_active_for_read(&mut self, active: bool) {
        self.active_for_read = active;
    }

    pub fn set_active_for_write(&mut self, active: bool) {
        self.active_for_write = active;
    }

    /// Offset of `address` inside the subset. `address` must be contained.
    pub fn offset_of(&self, address: u16) -> u16 {
        address.wrapping_sub(self.start)
    }

    pub(crate) fn default_data(&self) -> Option<&[u8]> {
        self.default_data.as_deref()
    }

    pub(crate) fn attach_chip(&mut self, chip: ChipId) {
        if let SubsetKind::Registers { chip: slot } = &mut self.kind {
            *slot = Some(chip);
        }
    }

    pub(crate) fn restore_activation(&mut self) {
        self.active_for_read = self.initial_read;
        self.active_for_write = self.initial_write;
    }
}
