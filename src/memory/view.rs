//! Views: ordered lists of subsets forming one address-space perspective.

use super::{SubsetId, ViewId};

const PAGES: usize = 256;

/// One agent's perspective of the address space.
///
/// Resolution walks the view's subsets in declaration order. A per-page index of
/// candidate subsets, built when the view is added to a [`Memory`](super::Memory),
/// keeps the walk short without changing its order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemoryView {
    id: ViewId,
    name: String,
    subsets: Vec<SubsetId>,
    pages: Vec<Vec<usize>>,
}

impl MemoryView {
    pub fn new(id: ViewId, name: impl Into<String>, subsets: Vec<SubsetId>) -> Self {
        Self {
            id,
            name: name.into(),
            subsets,
            pages: Vec::new(),
        }
    }

    pub fn id(&self) -> ViewId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Subset ids in declaration order.
    pub fn subsets(&self) -> &[SubsetId] {
        &self.subsets
    }

    pub fn contains(&self, subset: SubsetId) -> bool {
        self.subsets.contains(&subset)
    }

    /// Builds the page index from each subset's (start, end) range, given as
    /// indices into the owning memory's subset list.
    pub(crate) fn index(&mut self, ranges: &[(usize, u32, u32)]) {
        self.pages = vec![Vec::new(); PAGES];
        for &(slot, start, end) in ranges {
            if end <= start {
                continue;
            }
            let first = (start >> 8) as usize;
            let last = (((end - 1) >> 8) as usize).min(PAGES - 1);
            for page in &mut self.pages[first..=last] {
                page.push(slot);
            }
        }
    }

    /// Candidate subset slots for `address`, in declaration order.
    pub(crate) fn candidates(&self, address: u16) -> &[usize] {
        self.pages
            .get((address >> 8) as usize)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }
}
