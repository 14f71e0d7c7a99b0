use bitflags::bitflags;

bitflags! {
    /// Access classification bitmask for a [`Label`].
    #[derive(Debug, Clone, Copy, Eq, PartialEq, Hash)]
    pub struct LabelKind: u8 {
        const CODE     = 1 << 0;
        const DATA     = 1 << 1;
        const STRING   = 1 << 2;
        const IMPORTED = 1 << 3;
        const EXPORTED = 1 << 4;
    }
}

/// A named handle on an address with an access classification.
///
/// Label names are globally unique within a [`crate::document::Document`];
/// `unique` marks whether this particular label may be silently replaced
/// (e.g. an auto-generated `sub_XXXX` name) or must be preserved across
/// re-analysis.
#[derive(Debug, Clone, Eq, PartialEq, Hash)]
pub struct Label {
    pub name: String,
    pub kind: LabelKind,
    pub unique: bool,
}

impl Label {
    #[must_use]
    pub fn new(name: impl Into<String>, kind: LabelKind) -> Self {
        Self {
            name: name.into(),
            kind,
            unique: true,
        }
    }

    #[must_use]
    pub fn is_imported(&self) -> bool {
        self.kind.contains(LabelKind::IMPORTED)
    }

    #[must_use]
    pub fn is_exported(&self) -> bool {
        self.kind.contains(LabelKind::EXPORTED)
    }

    /// Whether a cell removal orphaning this label should also remove it.
    /// Exported and imported labels survive their cell's removal.
    #[must_use]
    pub fn survives_orphaning(&self) -> bool {
        self.is_imported() || self.is_exported()
    }
}
