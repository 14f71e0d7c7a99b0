use std::collections::{BTreeMap, HashMap};
use std::sync::RwLock;

use crate::address::Address;
use crate::cell::{Cell, MultiCell};
use crate::error::{Error, Result};
use crate::label::{Label, LabelKind};
use crate::memory_area::MemoryArea;
use crate::xref::XRefs;

/// A signal delivered to [`Subscriber`]s after a mutation's locks are
/// released. Mirrors the three-signal interface the source's
/// `Document::Subscriber` exposes: a cooperative-cancellation channel plus
/// two update notices.
#[derive(Debug, Clone)]
pub enum Signal {
    Quit,
    DocumentUpdated,
    LabelUpdated(Address),
}

pub trait Subscriber: Send + Sync {
    fn notify(&self, signal: &Signal);
}

struct AreaTable {
    areas: BTreeMap<Address, MemoryArea>,
}

impl AreaTable {
    fn new() -> Self {
        Self {
            areas: BTreeMap::new(),
        }
    }

    fn area_for(&self, addr: Address) -> Option<&MemoryArea> {
        self.areas
            .range(..=addr)
            .next_back()
            .map(|(_, area)| area)
            .filter(|area| area.contains(addr))
    }

    fn area_for_mut(&mut self, addr: Address) -> Option<&mut MemoryArea> {
        let start = self
            .areas
            .range(..=addr)
            .next_back()
            .map(|(&start, _)| start)?;
        let area = self.areas.get_mut(&start)?;
        area.contains(addr).then_some(area)
    }
}

struct CellTable {
    multicells: HashMap<Address, MultiCell>,
    labels_by_address: HashMap<Address, Label>,
    labels_by_name: HashMap<String, Address>,
    xrefs: XRefs,
    last_address_accessed: Option<Address>,
    history: Vec<Address>,
    history_cursor: usize,
}

impl CellTable {
    fn new() -> Self {
        Self {
            multicells: HashMap::new(),
            labels_by_address: HashMap::new(),
            labels_by_name: HashMap::new(),
            xrefs: XRefs::new(),
            last_address_accessed: None,
            history: Vec::new(),
            history_cursor: 0,
        }
    }
}

/// The aggregate model: memory areas, cells, multicells, labels, xrefs,
/// and navigation history, behind two logical locks matching the source's
/// `m_MemoryAreaMutex` (area set) and `m_CellMutex` (everything else).
///
/// Subscriber notification happens after the guard that produced it is
/// dropped, so a subscriber callback may itself call back into the
/// `Document` without deadlocking.
pub struct Document {
    areas: RwLock<AreaTable>,
    cells: RwLock<CellTable>,
    subscribers: RwLock<Vec<Box<dyn Subscriber>>>,
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl Document {
    #[must_use]
    pub fn new() -> Self {
        Self {
            areas: RwLock::new(AreaTable::new()),
            cells: RwLock::new(CellTable::new()),
            subscribers: RwLock::new(Vec::new()),
        }
    }

    pub fn subscribe(&self, subscriber: Box<dyn Subscriber>) {
        self.subscribers.write().unwrap().push(subscriber);
    }

    fn notify(&self, signal: Signal) {
        for subscriber in self.subscribers.read().unwrap().iter() {
            subscriber.notify(&signal);
        }
    }

    pub fn quit(&self) {
        self.notify(Signal::Quit);
    }

    // -- Areas ---------------------------------------------------------

    pub fn insert_area(&self, area: MemoryArea) {
        let start = area.virtual_start();
        self.areas.write().unwrap().areas.insert(start, area);
        self.notify(Signal::DocumentUpdated);
    }

    pub fn area_count(&self) -> usize {
        self.areas.read().unwrap().areas.len()
    }

    pub fn with_area_for<R>(&self, addr: Address, f: impl FnOnce(&MemoryArea) -> R) -> Option<R> {
        self.areas.read().unwrap().area_for(addr).map(f)
    }

    pub fn is_executable(&self, addr: Address) -> bool {
        self.with_area_for(addr, MemoryArea::is_executable)
            .unwrap_or(false)
    }

    // -- Cells -----------------------------------------------------------

    /// Inserts `cell` at `addr`. See `MemoryArea::insert_cell` for the
    /// `force`/`safe` contract; the cell's arch tag/mode default from the
    /// enclosing area when unset.
    pub fn insert_cell(&self, addr: Address, cell: Cell, force: bool, safe: bool) -> Result<()> {
        let mut areas = self.areas.write().unwrap();
        let area = areas
            .area_for_mut(addr)
            .ok_or(Error::UnmappedAddress(addr))?;
        let offset = area.area_offset(addr).ok_or(Error::UnmappedAddress(addr))?;
        area.insert_cell(offset, cell, force, safe)?;
        drop(areas);
        self.cells.write().unwrap().last_address_accessed = Some(addr);
        self.notify(Signal::DocumentUpdated);
        Ok(())
    }

    pub fn retrieve_cell(&self, addr: Address) -> Option<Cell> {
        let areas = self.areas.read().unwrap();
        let area = areas.area_for(addr)?;
        let offset = area.area_offset(addr)?;
        let cell = area.cell_at(offset).cloned();
        drop(areas);
        self.cells.write().unwrap().last_address_accessed = Some(addr);
        cell
    }

    pub fn is_cell_present(&self, addr: Address) -> bool {
        self.with_area_for(addr, |area| {
            area.area_offset(addr)
                .is_some_and(|offset| area.is_cell_present(offset))
        })
        .unwrap_or(false)
    }

    /// Removes the cell at `addr`, dropping any xrefs that touched it and
    /// orphan-removing any label at `addr` unless the label survives
    /// orphaning (`Imported`/`Exported`).
    pub fn delete_cell(&self, addr: Address) -> Result<()> {
        let mut areas = self.areas.write().unwrap();
        let area = areas
            .area_for_mut(addr)
            .ok_or(Error::UnmappedAddress(addr))?;
        let offset = area.area_offset(addr).ok_or(Error::UnmappedAddress(addr))?;
        area.remove_cell(offset);
        drop(areas);

        let mut cells = self.cells.write().unwrap();
        cells.xrefs.remove_all_touching(addr);
        if let Some(label) = cells.labels_by_address.get(&addr) {
            if !label.survives_orphaning() {
                let name = label.name.clone();
                cells.labels_by_address.remove(&addr);
                cells.labels_by_name.remove(&name);
            }
        }
        drop(cells);
        self.notify(Signal::DocumentUpdated);
        Ok(())
    }

    // -- Labels ------------------------------------------------------------

    /// Adds `label` at `addr`. Rejects a duplicate name unless `force`,
    /// in which case the existing binding (by name or by address) is
    /// replaced.
    pub fn add_label(&self, addr: Address, label: Label, force: bool) -> Result<()> {
        let mut cells = self.cells.write().unwrap();
        if let Some(existing_addr) = cells.labels_by_name.get(&label.name).copied() {
            if existing_addr != addr && !force {
                return Err(Error::DuplicateLabel(label.name));
            }
            cells.labels_by_address.remove(&existing_addr);
        }
        if let Some(previous) = cells.labels_by_address.remove(&addr) {
            cells.labels_by_name.remove(&previous.name);
        }
        cells.labels_by_name.insert(label.name.clone(), addr);
        cells.labels_by_address.insert(addr, label);
        drop(cells);
        self.notify(Signal::LabelUpdated(addr));
        Ok(())
    }

    pub fn remove_label(&self, addr: Address) {
        let mut cells = self.cells.write().unwrap();
        if let Some(label) = cells.labels_by_address.remove(&addr) {
            cells.labels_by_name.remove(&label.name);
        }
        drop(cells);
        self.notify(Signal::LabelUpdated(addr));
    }

    pub fn label_at(&self, addr: Address) -> Option<Label> {
        self.cells.read().unwrap().labels_by_address.get(&addr).cloned()
    }

    pub fn label_kind_at(&self, addr: Address) -> Option<LabelKind> {
        self.label_at(addr).map(|l| l.kind)
    }

    pub fn address_of_label(&self, name: &str) -> Option<Address> {
        self.cells.read().unwrap().labels_by_name.get(name).copied()
    }

    #[must_use]
    pub fn label_count(&self) -> usize {
        self.cells.read().unwrap().labels_by_address.len()
    }

    // -- XRefs ---------------------------------------------------------

    pub fn add_xref(&self, from: Address, to: Address) {
        self.cells.write().unwrap().xrefs.insert(from, to);
        self.notify(Signal::DocumentUpdated);
    }

    pub fn xrefs_from(&self, addr: Address) -> Vec<Address> {
        self.cells.read().unwrap().xrefs.from(addr).collect()
    }

    pub fn xrefs_to(&self, addr: Address) -> Vec<Address> {
        self.cells.read().unwrap().xrefs.to(addr).collect()
    }

    // -- MultiCells ------------------------------------------------------

    pub fn insert_multicell(&self, addr: Address, multicell: MultiCell) {
        self.cells.write().unwrap().multicells.insert(addr, multicell);
        self.notify(Signal::DocumentUpdated);
    }

    pub fn multicell_at(&self, addr: Address) -> Option<MultiCell> {
        self.cells.read().unwrap().multicells.get(&addr).cloned()
    }

    // -- Address arithmetic ---------------------------------------------

    pub fn make_address(&self, base: Address, offset: u64) -> Address {
        base.with_offset(offset)
    }

    /// Translates a virtual address to its backing file offset.
    pub fn translate(&self, addr: Address) -> Option<u64> {
        self.areas.read().unwrap().area_for(addr)?.file_offset_of(addr)
    }

    /// Converts a virtual address to its area-relative offset.
    pub fn convert(&self, addr: Address) -> Option<u64> {
        self.areas.read().unwrap().area_for(addr)?.area_offset(addr)
    }

    /// Converts a monotonic linear position (an index over every present
    /// cell, in address order across all areas) to an address.
    pub fn position_to_address(&self, position: usize) -> Option<Address> {
        self.iter_cell_addresses().nth(position)
    }

    /// Converts an address to its position, if it carries a cell.
    pub fn address_to_position(&self, addr: Address) -> Option<usize> {
        self.iter_cell_addresses().position(|a| a == addr)
    }

    /// Iterates every present cell's address, in ascending address order.
    pub fn iter_cell_addresses(&self) -> impl Iterator<Item = Address> + '_ {
        let areas = self.areas.read().unwrap();
        let mut addresses = Vec::new();
        for area in areas.areas.values() {
            for (offset, _) in area.cells() {
                addresses.push(area.make_address(offset));
            }
        }
        addresses.into_iter()
    }

    // -- Navigation history -----------------------------------------------

    pub fn navigate_to(&self, addr: Address) {
        let mut cells = self.cells.write().unwrap();
        cells.history.truncate(cells.history_cursor);
        cells.history.push(addr);
        cells.history_cursor = cells.history.len();
    }

    pub fn navigate_back(&self) -> Option<Address> {
        let mut cells = self.cells.write().unwrap();
        if cells.history_cursor == 0 {
            return None;
        }
        cells.history_cursor -= 1;
        cells.history.get(cells.history_cursor.saturating_sub(1)).copied()
    }

    pub fn navigate_forward(&self) -> Option<Address> {
        let mut cells = self.cells.write().unwrap();
        if cells.history_cursor >= cells.history.len() {
            return None;
        }
        let addr = cells.history[cells.history_cursor];
        cells.history_cursor += 1;
        Some(addr)
    }

    pub fn last_address_accessed(&self) -> Option<Address> {
        self.cells.read().unwrap().last_address_accessed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cell::ValueWidth;
    use crate::memory_area::AccessFlags;

    fn doc_with_area() -> Document {
        let doc = Document::new();
        doc.insert_area(MemoryArea::new(
            "test",
            AccessFlags::READ | AccessFlags::WRITE | AccessFlags::EXECUTE,
            0,
            0x1000,
            Address::flat(0x1000),
            0x1000,
        ));
        doc
    }

    #[test]
    fn test_insert_and_retrieve_round_trip() {
        let doc = doc_with_area();
        let addr = Address::flat(0x1010);
        doc.insert_cell(addr, Cell::new_value(ValueWidth::W32, 7), true, true)
            .unwrap();
        let cell = doc.retrieve_cell(addr).unwrap();
        assert!(cell.kind.is_value());
    }

    #[test]
    fn test_label_is_bijective() {
        let doc = doc_with_area();
        let addr = Address::flat(0x1010);
        doc.add_label(addr, Label::new("entry", LabelKind::CODE), false)
            .unwrap();
        assert_eq!(doc.address_of_label("entry"), Some(addr));
        assert_eq!(doc.label_at(addr).unwrap().name, "entry");
    }

    #[test]
    fn test_duplicate_label_without_force_rejected() {
        let doc = doc_with_area();
        doc.add_label(Address::flat(0x1010), Label::new("dup", LabelKind::CODE), false)
            .unwrap();
        let err = doc
            .add_label(Address::flat(0x1020), Label::new("dup", LabelKind::CODE), false)
            .unwrap_err();
        assert!(matches!(err, Error::DuplicateLabel(_)));
    }

    #[test]
    fn test_cell_removal_orphans_non_surviving_label() {
        let doc = doc_with_area();
        let addr = Address::flat(0x1010);
        doc.insert_cell(addr, Cell::new_value(ValueWidth::W32, 1), true, true)
            .unwrap();
        doc.add_label(addr, Label::new("tmp", LabelKind::DATA), false)
            .unwrap();
        doc.delete_cell(addr).unwrap();
        assert!(doc.label_at(addr).is_none());
    }

    #[test]
    fn test_cell_removal_keeps_exported_label() {
        let doc = doc_with_area();
        let addr = Address::flat(0x1010);
        doc.insert_cell(addr, Cell::new_value(ValueWidth::W32, 1), true, true)
            .unwrap();
        doc.add_label(addr, Label::new("exp", LabelKind::EXPORTED), false)
            .unwrap();
        doc.delete_cell(addr).unwrap();
        assert!(doc.label_at(addr).is_some());
    }

    #[test]
    fn test_position_is_monotone() {
        let doc = doc_with_area();
        for i in 0..8u64 {
            doc.insert_cell(
                Address::flat(0x1000 + i * 4),
                Cell::new_value(ValueWidth::W32, i),
                true,
                true,
            )
            .unwrap();
        }
        let positions: Vec<usize> = (0..8)
            .map(|i| doc.address_to_position(Address::flat(0x1000 + i * 4)).unwrap())
            .collect();
        for pair in positions.windows(2) {
            assert!(pair[0] < pair[1]);
        }
    }
}
