use std::cmp::Ordering;
use std::collections::BTreeMap;

use bitflags::bitflags;

use crate::address::Address;
use crate::cell::{ArchTag, Cell, ARCH_TAG_UNKNOWN};
use crate::error::{Error, Result};

bitflags! {
    /// Access permissions a [`MemoryArea`] was mapped with.
    #[derive(Debug, Clone, Copy, Eq, PartialEq, Hash)]
    pub struct AccessFlags: u8 {
        const READ    = 1 << 0;
        const WRITE   = 1 << 1;
        const EXECUTE = 1 << 2;
    }
}

/// A mapped range of virtual addresses backed by a file region, holding
/// the cells placed within it.
///
/// Areas are totally ordered by their starting address; [`Ord`] and
/// [`PartialOrd`] reflect only that so that `Document` can keep them in a
/// `BTreeSet`.
#[derive(Debug, Clone)]
pub struct MemoryArea {
    name: String,
    access: AccessFlags,
    file_offset: u64,
    file_size: u64,
    virtual_start: Address,
    virtual_size: u64,
    default_arch_tag: ArchTag,
    default_mode: u8,
    cells: BTreeMap<u64, Cell>,
}

impl MemoryArea {
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        access: AccessFlags,
        file_offset: u64,
        file_size: u64,
        virtual_start: Address,
        virtual_size: u64,
    ) -> Self {
        Self {
            name: name.into(),
            access,
            file_offset,
            file_size,
            virtual_start,
            virtual_size,
            default_arch_tag: ARCH_TAG_UNKNOWN,
            default_mode: 0,
            cells: BTreeMap::new(),
        }
    }

    #[must_use]
    pub fn with_default_architecture(mut self, tag: ArchTag, mode: u8) -> Self {
        self.default_arch_tag = tag;
        self.default_mode = mode;
        self
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn access(&self) -> AccessFlags {
        self.access
    }

    #[must_use]
    pub fn is_executable(&self) -> bool {
        self.access.contains(AccessFlags::EXECUTE)
    }

    #[must_use]
    pub fn virtual_start(&self) -> Address {
        self.virtual_start
    }

    #[must_use]
    pub fn virtual_size(&self) -> u64 {
        self.virtual_size
    }

    #[must_use]
    pub fn file_offset(&self) -> u64 {
        self.file_offset
    }

    #[must_use]
    pub fn default_architecture(&self) -> (ArchTag, u8) {
        (self.default_arch_tag, self.default_mode)
    }

    /// Builds an address within this area from an area-relative offset.
    #[must_use]
    pub fn make_address(&self, offset: u64) -> Address {
        self.virtual_start.with_offset(
            self.virtual_start
                .offset()
                .wrapping_add(offset),
        )
    }

    /// Whether `addr` falls within this area's virtual range.
    #[must_use]
    pub fn contains(&self, addr: Address) -> bool {
        if addr.base() != self.virtual_start.base() {
            return false;
        }
        let start = self.virtual_start.offset();
        let end = start.wrapping_add(self.virtual_size);
        addr.offset() >= start && addr.offset() < end
    }

    /// Converts a virtual address to an area-relative offset.
    #[must_use]
    pub fn area_offset(&self, addr: Address) -> Option<u64> {
        self.contains(addr)
            .then(|| addr.offset() - self.virtual_start.offset())
    }

    /// Converts a virtual address to a file offset (area-relative offset
    /// plus the area's file base).
    #[must_use]
    pub fn file_offset_of(&self, addr: Address) -> Option<u64> {
        self.area_offset(addr).map(|o| self.file_offset + o)
    }

    #[must_use]
    pub fn is_cell_present(&self, offset: u64) -> bool {
        self.cell_overlapping(offset, 1).is_some()
    }

    #[must_use]
    pub fn cell_at(&self, offset: u64) -> Option<&Cell> {
        self.cells.get(&offset)
    }

    pub fn cell_at_mut(&mut self, offset: u64) -> Option<&mut Cell> {
        self.cells.get_mut(&offset)
    }

    /// Finds the cell (if any) whose `[start, start+len)` interval overlaps
    /// `[offset, offset+len)`. The predecessor is found by greatest lower
    /// bound, tested for containment, then forward neighbors are checked.
    #[must_use]
    pub fn cell_overlapping(&self, offset: u64, len: u32) -> Option<u64> {
        let end = offset + u64::from(len.max(1));

        if let Some((&pred_off, pred_cell)) = self.cells.range(..=offset).next_back() {
            if pred_off + u64::from(pred_cell.length) > offset {
                return Some(pred_off);
            }
        }
        if let Some((&next_off, _)) = self.cells.range(offset..).next() {
            if next_off < end {
                return Some(next_off);
            }
        }
        None
    }

    /// All cells whose interval overlaps `[offset, offset+len)`.
    fn all_overlapping(&self, offset: u64, len: u32) -> Vec<u64> {
        let end = offset + u64::from(len.max(1));
        let mut hits = Vec::new();
        if let Some((&pred_off, pred_cell)) = self.cells.range(..offset).next_back() {
            if pred_off + u64::from(pred_cell.length) > offset {
                hits.push(pred_off);
            }
        }
        hits.extend(self.cells.range(offset..end).map(|(&o, _)| o));
        hits
    }

    /// Inserts `cell` at `offset`. See `Document::insert_cell` for the
    /// `force`/`safe` contract.
    pub fn insert_cell(&mut self, offset: u64, mut cell: Cell, force: bool, safe: bool) -> Result<()> {
        if cell.arch_tag == ARCH_TAG_UNKNOWN {
            cell.arch_tag = self.default_arch_tag;
        }
        if safe {
            let overlaps = self.all_overlapping(offset, cell.length);
            if !overlaps.is_empty() {
                if !force {
                    let existing_len = self.cells[&overlaps[0]].length;
                    return Err(Error::CellOverlap {
                        at: self.make_address(offset),
                        existing_len,
                    });
                }
                for overlap_offset in overlaps {
                    self.cells.remove(&overlap_offset);
                }
            }
        } else if force {
            self.cells.remove(&offset);
        }
        self.cells.insert(offset, cell);
        Ok(())
    }

    pub fn remove_cell(&mut self, offset: u64) -> Option<Cell> {
        self.cells.remove(&offset)
    }

    pub fn cells(&self) -> impl Iterator<Item = (u64, &Cell)> {
        self.cells.iter().map(|(&o, c)| (o, c))
    }

    #[must_use]
    pub fn cell_count(&self) -> usize {
        self.cells.len()
    }
}

/// Orders areas solely by starting address, matching `MemoryArea::Compare`
/// in the source design this area type is modeled on.
#[derive(Debug, Eq, PartialEq)]
pub struct AreaOrderKey(pub Address);

impl PartialOrd for AreaOrderKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for AreaOrderKey {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.cmp(&other.0)
    }
}
