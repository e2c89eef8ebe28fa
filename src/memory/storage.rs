//! Physical storages: the byte arrays every subset windows into.

use super::UNMAPPED_VALUE;

/// Whether a storage accepts writes through the bus.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum StorageKind {
    Ram,
    Rom,
}

/// An owned, fixed-size byte array.
///
/// Bus writes to a [`StorageKind::Rom`] storage are discarded. [`load`](Self::load)
/// fills any storage regardless of kind and is how ROM images get in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhysicalStorage {
    name: String,
    kind: StorageKind,
    data: Vec<u8>,
}

impl PhysicalStorage {
    /// Zero-filled RAM of `size` bytes.
    pub fn ram(name: impl Into<String>, size: usize) -> Self {
        Self {
            name: name.into(),
            kind: StorageKind::Ram,
            data: vec![0; size],
        }
    }

    /// ROM holding `image`.
    pub fn rom(name: impl Into<String>, image: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            kind: StorageKind::Rom,
            data: image,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> StorageKind {
        self.kind
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Byte at `offset`, or the unmapped sentinel past the end.
    pub fn read(&self, offset: usize) -> u8 {
        self.data.get(offset).copied().unwrap_or(UNMAPPED_VALUE)
    }

    /// Bus write. Ignored for ROM and past the end.
    pub fn write(&mut self, offset: usize, value: u8) {
        if self.kind == StorageKind::Rom {
            return;
        }
        if let Some(cell) = self.data.get_mut(offset) {
            *cell = value;
        }
    }

    /// Copies `bytes` in at `offset` regardless of kind, truncating at the end.
    pub fn load(&mut self, offset: usize, bytes: &[u8]) {
        if offset >= self.data.len() {
            return;
        }
        let end = (offset + bytes.len()).min(self.data.len());
        self.data[offset..end].copy_from_slice(&bytes[..end - offset]);
    }

    /// The raw contents.
    pub fn data(&self) -> &[u8] {
        &self.data
    }
}
