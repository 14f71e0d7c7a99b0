use bitflags::bitflags;
use num_enum::{IntoPrimitive, TryFromPrimitive};

use crate::address::Address;
use crate::expr::Expr;

/// Opaque identifier selecting a decoder backend for a cell or memory area.
pub type ArchTag = u32;

pub const ARCH_TAG_UNKNOWN: ArchTag = 0;

bitflags! {
    /// Bitmask sub-type of an [`Instruction`] cell.
    #[derive(Debug, Clone, Copy, Eq, PartialEq, Hash)]
    pub struct InstructionKind: u8 {
        const NONE        = 0;
        const CONDITIONAL = 1 << 0;
        const JUMP        = 1 << 1;
        const CALL        = 1 << 2;
        const RETURN      = 1 << 3;
    }
}

impl InstructionKind {
    /// Whether decoding this instruction must end the current basic block.
    #[must_use]
    pub fn is_terminator(&self) -> bool {
        self.intersects(Self::JUMP | Self::CALL | Self::RETURN)
    }
}

bitflags! {
    /// Modifier flags carried by a [`Value`] cell.
    #[derive(Debug, Clone, Copy, Eq, PartialEq, Hash)]
    pub struct ValueModifiers: u8 {
        const CHARACTER = 1 << 0;
        const REFERENCE = 1 << 1;
        const NOT       = 1 << 2;
        const NEGATE    = 1 << 3;
    }
}

/// Valid bit-widths for a [`Value`] cell.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash, IntoPrimitive, TryFromPrimitive)]
#[repr(u32)]
pub enum ValueWidth {
    W8 = 8,
    W16 = 16,
    W32 = 32,
    W64 = 64,
}

impl ValueWidth {
    #[must_use]
    pub fn bytes(&self) -> u32 {
        u32::from(*self) / 8
    }

    /// Converts a bit count straight off a decoded operand or a wire format
    /// field into a `ValueWidth`, rejecting anything not in `{8,16,32,64}`.
    #[must_use]
    pub fn from_bits(bits: u32) -> Option<Self> {
        Self::try_from(bits).ok()
    }
}

/// A decoded operand as rendered by the architecture backend. The core only
/// needs enough to display it and to hand its index back to
/// `Architecture::operand_reference`.
#[derive(Debug, Clone, PartialEq)]
pub struct OperandDescriptor {
    pub text: String,
}

/// An [`Instruction`]-kind cell's payload.
#[derive(Debug, Clone)]
pub struct InstructionData {
    pub mnemonic: String,
    pub operands: Vec<OperandDescriptor>,
    pub semantics: Vec<Expr>,
    pub sub_type: InstructionKind,
}

/// A [`Value`]-kind cell's payload.
#[derive(Debug, Clone, Copy)]
pub struct ValueData {
    pub width: ValueWidth,
    pub modifiers: ValueModifiers,
    pub raw: u64,
}

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum StringEncoding {
    Utf8,
    Utf16,
}

#[derive(Debug, Clone)]
pub struct StringData {
    pub encoding: StringEncoding,
}

#[derive(Debug, Clone, Copy)]
pub struct CharacterData {
    pub value: u32,
}

/// The disassembly unit placed at an address: either decoded code or
/// typed data.
#[derive(Debug, Clone)]
pub enum CellKind {
    Instruction(InstructionData),
    Value(ValueData),
    String(StringData),
    Character(CharacterData),
}

impl CellKind {
    #[must_use]
    pub fn is_instruction(&self) -> bool {
        matches!(self, Self::Instruction(_))
    }

    #[must_use]
    pub fn is_value(&self) -> bool {
        matches!(self, Self::Value(_))
    }

    #[must_use]
    pub fn as_instruction(&self) -> Option<&InstructionData> {
        match self {
            Self::Instruction(data) => Some(data),
            _ => None,
        }
    }
}

bitflags! {
    #[derive(Debug, Clone, Copy, Eq, PartialEq, Hash)]
    pub struct CellFlags: u8 {
        const NONE = 0;
    }
}

/// A cell placed at an address: header plus kind-specific payload.
#[derive(Debug, Clone)]
pub struct Cell {
    pub kind: CellKind,
    pub length: u32,
    pub format_style: u16,
    pub flags: CellFlags,
    pub mode: u8,
    pub arch_tag: ArchTag,
}

impl Cell {
    #[must_use]
    pub fn new_instruction(length: u32, data: InstructionData) -> Self {
        Self {
            kind: CellKind::Instruction(data),
            length,
            format_style: 0,
            flags: CellFlags::NONE,
            mode: 0,
            arch_tag: ARCH_TAG_UNKNOWN,
        }
    }

    #[must_use]
    pub fn new_value(width: ValueWidth, raw: u64) -> Self {
        Self {
            kind: CellKind::Value(ValueData {
                width,
                modifiers: ValueModifiers::empty(),
                raw,
            }),
            length: width.bytes(),
            format_style: 0,
            flags: CellFlags::NONE,
            mode: 0,
            arch_tag: ARCH_TAG_UNKNOWN,
        }
    }

    #[must_use]
    pub fn sub_type(&self) -> InstructionKind {
        match &self.kind {
            CellKind::Instruction(data) => data.sub_type,
            _ => InstructionKind::NONE,
        }
    }
}

/// A grouping that annotates a contiguous range with higher-level meaning
/// (function, struct, array). Keyed by its starting address in
/// [`crate::document::Document`].
#[derive(Debug, Clone)]
pub struct MultiCell {
    pub kind: MultiCellKind,
    pub length: u64,
}

#[derive(Debug, Clone, Eq, PartialEq)]
pub enum MultiCellKind {
    Function { name: String },
    Struct { name: String, field_offsets: Vec<u64> },
    Array { element_length: u64, count: u64 },
}

/// A target address a [`MultiCell`] starts at, paired with the cell data.
pub type MultiCellEntry = (Address, MultiCell);
