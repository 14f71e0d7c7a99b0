use std::collections::{HashMap, HashSet};

use crate::address::Address;

/// A directed multigraph of cross-references between addresses, indexed
/// both ways so that `from(A)` and `to(A)` are both O(1) lookups.
#[derive(Debug, Clone, Default)]
pub struct XRefs {
    from: HashMap<Address, HashSet<Address>>,
    to: HashMap<Address, HashSet<Address>>,
}

impl XRefs {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a directed edge `source -> destination`.
    pub fn insert(&mut self, source: Address, destination: Address) {
        self.from.entry(source).or_default().insert(destination);
        self.to.entry(destination).or_default().insert(source);
    }

    pub fn remove(&mut self, source: Address, destination: Address) {
        if let Some(set) = self.from.get_mut(&source) {
            set.remove(&destination);
            if set.is_empty() {
                self.from.remove(&source);
            }
        }
        if let Some(set) = self.to.get_mut(&destination) {
            set.remove(&source);
            if set.is_empty() {
                self.to.remove(&destination);
            }
        }
    }

    /// Removes every edge touching `addr`, in either direction. Used when a
    /// cell is deleted.
    pub fn remove_all_touching(&mut self, addr: Address) {
        if let Some(dests) = self.from.remove(&addr) {
            for dest in dests {
                if let Some(set) = self.to.get_mut(&dest) {
                    set.remove(&addr);
                }
            }
        }
        if let Some(srcs) = self.to.remove(&addr) {
            for src in srcs {
                if let Some(set) = self.from.get_mut(&src) {
                    set.remove(&addr);
                }
            }
        }
    }

    /// Addresses this address references.
    #[must_use]
    pub fn from(&self, addr: Address) -> impl Iterator<Item = Address> + '_ {
        self.from
            .get(&addr)
            .into_iter()
            .flat_map(|set| set.iter().copied())
    }

    /// Addresses that reference this address.
    #[must_use]
    pub fn to(&self, addr: Address) -> impl Iterator<Item = Address> + '_ {
        self.to
            .get(&addr)
            .into_iter()
            .flat_map(|set| set.iter().copied())
    }
}

#[test]
fn test_insert_and_query() {
    let mut xrefs = XRefs::new();
    let a = Address::flat(0x100);
    let b = Address::flat(0x200);
    xrefs.insert(a, b);
    assert_eq!(xrefs.from(a).collect::<Vec<_>>(), vec![b]);
    assert_eq!(xrefs.to(b).collect::<Vec<_>>(), vec![a]);
    assert_eq!(xrefs.from(b).count(), 0);
}

#[test]
fn test_remove_all_touching() {
    let mut xrefs = XRefs::new();
    let a = Address::flat(0x100);
    let b = Address::flat(0x200);
    let c = Address::flat(0x300);
    xrefs.insert(a, b);
    xrefs.insert(c, a);
    xrefs.remove_all_touching(a);
    assert_eq!(xrefs.from(a).count(), 0);
    assert_eq!(xrefs.to(b).count(), 0);
    assert_eq!(xrefs.from(c).count(), 0);
}
