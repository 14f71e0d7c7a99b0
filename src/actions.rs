use crate::address::Address;
use crate::analyzer::Analyzer;
use crate::arch::Architecture;
use crate::cell::{Cell, CellKind, ValueModifiers, ValueWidth};
use crate::config::AnalyzerConfig;
use crate::document::Document;
use crate::error::{Error, Result};
use crate::label::Label;
use crate::stream::BinaryStream;

/// A target an [`Action`] is evaluated against: a range of addresses plus
/// which one within it (if any) is the "current" selection, matching a
/// UI's notion of a selected byte range with a cursor.
#[derive(Debug, Clone, Copy)]
pub struct ActionTarget {
    pub range_start: Address,
    pub range_end: Address,
    pub index: Address,
}

/// The architecture/stream/config an [`Action`] may need beyond the
/// `Document` itself — only [`Analyze`] currently uses it, but every
/// action takes it so the registry can dispatch uniformly by name.
pub struct ActionContext<'a> {
    pub architecture: &'a dyn Architecture,
    pub stream: &'a dyn BinaryStream,
    pub config: AnalyzerConfig,
}

/// A named, cell-level operation exposed uniformly to UI and bindings:
/// a stable binding name, a human label, a compatibility check, and the
/// side effect it performs against a `Document`.
pub trait Action {
    fn name(&self) -> &str;
    fn label(&self) -> &str;
    fn is_compatible(&self, document: &Document, target: ActionTarget) -> bool;
    fn execute(&self, document: &Document, target: ActionTarget, ctx: &ActionContext<'_>) -> Result<()>;
}

pub struct Undefine;
impl Action for Undefine {
    fn name(&self) -> &str {
        "undefine"
    }
    fn label(&self) -> &str {
        "Undefine"
    }
    fn is_compatible(&self, document: &Document, target: ActionTarget) -> bool {
        document.is_cell_present(target.index)
    }
    fn execute(&self, document: &Document, target: ActionTarget, _ctx: &ActionContext<'_>) -> Result<()> {
        document.delete_cell(target.index)
    }
}

pub struct ChangeValueSize {
    pub width: ValueWidth,
}
impl Action for ChangeValueSize {
    fn name(&self) -> &str {
        match self.width {
            ValueWidth::W8 => "change_value_size_8",
            ValueWidth::W16 => "change_value_size_16",
            ValueWidth::W32 => "change_value_size_32",
            ValueWidth::W64 => "change_value_size_64",
        }
    }
    fn label(&self) -> &str {
        match self.width {
            ValueWidth::W8 => "Change value size: 8 bit",
            ValueWidth::W16 => "Change value size: 16 bit",
            ValueWidth::W32 => "Change value size: 32 bit",
            ValueWidth::W64 => "Change value size: 64 bit",
        }
    }
    fn is_compatible(&self, document: &Document, target: ActionTarget) -> bool {
        document
            .retrieve_cell(target.index)
            .is_some_and(|cell| cell.kind.is_value())
    }
    fn execute(&self, document: &Document, target: ActionTarget, _ctx: &ActionContext<'_>) -> Result<()> {
        let Some(mut cell) = document.retrieve_cell(target.index) else {
            return Err(Error::UnmappedAddress(target.index));
        };
        let CellKind::Value(data) = &mut cell.kind else {
            return Err(Error::UnmappedAddress(target.index));
        };
        data.width = self.width;
        cell.length = self.width.bytes();
        document.delete_cell(target.index)?;
        document.insert_cell(target.index, cell, true, true)
    }
}

/// Toggles a single [`ValueModifiers`] flag on a `Value` cell (used by
/// the to-character/reference/not/negate/normal actions).
pub struct ToggleValueModifier {
    pub name: &'static str,
    pub label: &'static str,
    pub modifier: ValueModifiers,
}
impl Action for ToggleValueModifier {
    fn name(&self) -> &str {
        self.name
    }
    fn label(&self) -> &str {
        self.label
    }
    fn is_compatible(&self, document: &Document, target: ActionTarget) -> bool {
        document
            .retrieve_cell(target.index)
            .is_some_and(|cell| cell.kind.is_value())
    }
    fn execute(&self, document: &Document, target: ActionTarget, _ctx: &ActionContext<'_>) -> Result<()> {
        let Some(mut cell) = document.retrieve_cell(target.index) else {
            return Err(Error::UnmappedAddress(target.index));
        };
        let CellKind::Value(data) = &mut cell.kind else {
            return Err(Error::UnmappedAddress(target.index));
        };
        if self.modifier == ValueModifiers::empty() {
            data.modifiers = ValueModifiers::empty();
        } else if data.modifiers.contains(self.modifier) {
            data.modifiers.remove(self.modifier);
        } else {
            data.modifiers.insert(self.modifier);
        }
        document.delete_cell(target.index)?;
        document.insert_cell(target.index, cell, true, true)
    }
}

#[must_use]
pub fn to_character_action() -> ToggleValueModifier {
    ToggleValueModifier {
        name: "to_character",
        label: "Character",
        modifier: ValueModifiers::CHARACTER,
    }
}

#[must_use]
pub fn to_reference_action() -> ToggleValueModifier {
    ToggleValueModifier {
        name: "to_reference",
        label: "Reference",
        modifier: ValueModifiers::REFERENCE,
    }
}

#[must_use]
pub fn to_not_action() -> ToggleValueModifier {
    ToggleValueModifier {
        name: "to_not",
        label: "Not",
        modifier: ValueModifiers::NOT,
    }
}

#[must_use]
pub fn to_negate_action() -> ToggleValueModifier {
    ToggleValueModifier {
        name: "to_negate",
        label: "Negate",
        modifier: ValueModifiers::NEGATE,
    }
}

#[must_use]
pub fn to_normal_action() -> ToggleValueModifier {
    ToggleValueModifier {
        name: "to_normal",
        label: "Normal",
        modifier: ValueModifiers::empty(),
    }
}

pub struct ToString {
    pub encoding: crate::cell::StringEncoding,
}
impl Action for ToString {
    fn name(&self) -> &str {
        match self.encoding {
            crate::cell::StringEncoding::Utf8 => "to_utf8_string",
            crate::cell::StringEncoding::Utf16 => "to_utf16_string",
        }
    }
    fn label(&self) -> &str {
        match self.encoding {
            crate::cell::StringEncoding::Utf8 => "UTF-8 string",
            crate::cell::StringEncoding::Utf16 => "UTF-16 string",
        }
    }
    fn is_compatible(&self, document: &Document, target: ActionTarget) -> bool {
        document.retrieve_cell(target.index).is_some()
    }
    fn execute(&self, document: &Document, target: ActionTarget, _ctx: &ActionContext<'_>) -> Result<()> {
        document.delete_cell(target.index).ok();
        let cell = Cell {
            kind: CellKind::String(crate::cell::StringData {
                encoding: self.encoding,
            }),
            length: (target.range_end.offset() - target.range_start.offset()) as u32,
            format_style: 0,
            flags: crate::cell::CellFlags::NONE,
            mode: 0,
            arch_tag: crate::cell::ARCH_TAG_UNKNOWN,
        };
        document.insert_cell(target.index, cell, true, true)
    }
}

pub struct CreateFunction;
impl Action for CreateFunction {
    fn name(&self) -> &str {
        "create_function"
    }
    fn label(&self) -> &str {
        "Create function"
    }
    fn is_compatible(&self, document: &Document, target: ActionTarget) -> bool {
        document
            .retrieve_cell(target.index)
            .is_some_and(|cell| cell.kind.is_instruction())
    }
    fn execute(&self, document: &Document, target: ActionTarget, _ctx: &ActionContext<'_>) -> Result<()> {
        let name = format!("sub_{:x}", target.index.offset());
        document.add_label(target.index, Label::new(name.clone(), crate::label::LabelKind::CODE), false)?;
        document.insert_multicell(
            target.index,
            crate::cell::MultiCell {
                kind: crate::cell::MultiCellKind::Function { name },
                length: target.range_end.offset().saturating_sub(target.range_start.offset()),
            },
        );
        Ok(())
    }
}

pub struct NavigateHistory {
    pub forward: bool,
}
impl Action for NavigateHistory {
    fn name(&self) -> &str {
        if self.forward {
            "navigate_forward"
        } else {
            "navigate_back"
        }
    }
    fn label(&self) -> &str {
        if self.forward {
            "Forward"
        } else {
            "Back"
        }
    }
    fn is_compatible(&self, _document: &Document, _target: ActionTarget) -> bool {
        true
    }
    fn execute(&self, document: &Document, target: ActionTarget, _ctx: &ActionContext<'_>) -> Result<()> {
        document.navigate_to(target.index);
        Ok(())
    }
}

/// Drives [`Analyzer::disassemble`] from the target address, the "analyze"
/// action of §4.7's standard registry.
pub struct Analyze;
impl Action for Analyze {
    fn name(&self) -> &str {
        "analyze"
    }
    fn label(&self) -> &str {
        "Analyze"
    }
    fn is_compatible(&self, document: &Document, target: ActionTarget) -> bool {
        document.is_executable(target.index)
    }
    fn execute(&self, document: &Document, target: ActionTarget, ctx: &ActionContext<'_>) -> Result<()> {
        let analyzer = Analyzer::new(document, ctx.config.clone());
        analyzer.disassemble(ctx.architecture, ctx.stream, target.index)
    }
}

/// A small registry of the named cell-level operations, looked up by
/// their stable binding name. Used uniformly by the UI and bindings.
#[derive(Default)]
pub struct ActionRegistry {
    actions: Vec<Box<dyn Action>>,
}

impl ActionRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_standard_actions() -> Self {
        let mut registry = Self::new();
        registry.register(Box::new(Undefine));
        registry.register(Box::new(ChangeValueSize { width: ValueWidth::W8 }));
        registry.register(Box::new(ChangeValueSize { width: ValueWidth::W16 }));
        registry.register(Box::new(ChangeValueSize { width: ValueWidth::W32 }));
        registry.register(Box::new(ChangeValueSize { width: ValueWidth::W64 }));
        registry.register(Box::new(to_character_action()));
        registry.register(Box::new(to_reference_action()));
        registry.register(Box::new(to_not_action()));
        registry.register(Box::new(to_negate_action()));
        registry.register(Box::new(to_normal_action()));
        registry.register(Box::new(ToString {
            encoding: crate::cell::StringEncoding::Utf8,
        }));
        registry.register(Box::new(ToString {
            encoding: crate::cell::StringEncoding::Utf16,
        }));
        registry.register(Box::new(CreateFunction));
        registry.register(Box::new(NavigateHistory { forward: false }));
        registry.register(Box::new(NavigateHistory { forward: true }));
        registry.register(Box::new(Analyze));
        registry
    }

    pub fn register(&mut self, action: Box<dyn Action>) {
        self.actions.push(action);
    }

    #[must_use]
    pub fn by_name(&self, name: &str) -> Option<&dyn Action> {
        self.actions.iter().find(|a| a.name() == name).map(|a| a.as_ref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arch::{CpuInformation, Instruction, Mode, ModeDescriptor};
    use crate::cell::InstructionKind;
    use crate::expr::Expr;
    use crate::memory_area::{AccessFlags, MemoryArea};
    use crate::stream::{BinaryStream, Endianness, SliceBinaryStream};

    fn doc_with_area() -> Document {
        let doc = Document::new();
        doc.insert_area(MemoryArea::new(
            "test",
            AccessFlags::READ | AccessFlags::WRITE,
            0,
            0x1000,
            Address::flat(0x1000),
            0x1000,
        ));
        doc
    }

    /// Never actually decodes anything; just enough to build an
    /// `ActionContext` for actions other than `Analyze`.
    struct NoopCpuInfo;
    impl CpuInformation for NoopCpuInfo {
        fn register_by_type(&self, _kind: u32, _mode: Mode) -> Option<u32> {
            None
        }
        fn size_of_register_in_bits(&self, _id: u32) -> Option<u32> {
            None
        }
        fn normalize_register(&self, _id: u32, _mode: Mode) -> Option<(u32, u32, u32)> {
            None
        }
        fn identifier_name(&self, _id: u32) -> Option<String> {
            None
        }
    }

    struct NoopArchitecture {
        cpu: NoopCpuInfo,
    }
    impl Architecture for NoopArchitecture {
        fn decode(&self, _stream: &dyn BinaryStream, file_offset: u64, _mode: Mode) -> Result<Instruction> {
            Err(Error::DecodeFailure(Address::flat(file_offset)))
        }
        fn emit_set_execution_address(&self, _current: Address, _mode: Mode) -> Vec<Expr> {
            Vec::new()
        }
        fn current_address(&self, addr: Address, insn: &Instruction) -> Address {
            addr.add(u64::from(insn.length))
        }
        fn modes(&self) -> Vec<ModeDescriptor> {
            Vec::new()
        }
        fn disassemble_basic_block_only(&self) -> bool {
            true
        }
        fn cpu_information(&self) -> &dyn CpuInformation {
            &self.cpu
        }
        fn operand_reference(&self, _document: &Document, _operand_index: usize, _current_address: Address) -> Option<Address> {
            None
        }
    }

    fn test_context<'a>(arch: &'a NoopArchitecture, stream: &'a dyn BinaryStream) -> ActionContext<'a> {
        ActionContext {
            architecture: arch,
            stream,
            config: AnalyzerConfig::default(),
        }
    }

    #[test]
    fn test_undefine_removes_cell() {
        let doc = doc_with_area();
        let addr = Address::flat(0x1010);
        doc.insert_cell(addr, Cell::new_value(ValueWidth::W32, 1), true, true)
            .unwrap();
        let target = ActionTarget {
            range_start: addr,
            range_end: addr,
            index: addr,
        };
        let arch = NoopArchitecture { cpu: NoopCpuInfo };
        let image = Vec::new();
        let stream = SliceBinaryStream::new(&image, Endianness::Little);
        let ctx = test_context(&arch, &stream);
        let action = Undefine;
        assert!(action.is_compatible(&doc, target));
        action.execute(&doc, target, &ctx).unwrap();
        assert!(!doc.is_cell_present(addr));
    }

    #[test]
    fn test_registry_lookup() {
        let registry = ActionRegistry::with_standard_actions();
        assert!(registry.by_name("undefine").is_some());
        assert!(registry.by_name("change_value_size_8").is_some());
        assert!(registry.by_name("change_value_size_16").is_some());
        assert!(registry.by_name("change_value_size_32").is_some());
        assert!(registry.by_name("change_value_size_64").is_some());
        assert!(registry.by_name("analyze").is_some());
        assert!(registry.by_name("nonexistent").is_none());
    }

    #[test]
    fn test_analyze_action_runs_disassembler() {
        let doc = doc_with_area();
        let mut image = vec![0u8; 0x10];
        image[0] = 0xC3;
        doc.insert_area(MemoryArea::new(
            "code",
            AccessFlags::READ | AccessFlags::EXECUTE,
            0,
            image.len() as u64,
            Address::flat(0x2000),
            image.len() as u64,
        ));

        struct RetOnly {
            cpu: NoopCpuInfo,
        }
        impl Architecture for RetOnly {
            fn decode(&self, stream: &dyn BinaryStream, file_offset: u64, _mode: Mode) -> Result<Instruction> {
                let opcode = stream.read(file_offset, 1)?;
                if opcode == 0xC3 {
                    Ok(Instruction {
                        mnemonic: "ret".to_string(),
                        operands: Vec::new(),
                        semantics: Vec::new(),
                        sub_type: InstructionKind::RETURN,
                        length: 1,
                    })
                } else {
                    Err(Error::DecodeFailure(Address::flat(file_offset)))
                }
            }
            fn emit_set_execution_address(&self, _current: Address, _mode: Mode) -> Vec<Expr> {
                Vec::new()
            }
            fn current_address(&self, addr: Address, insn: &Instruction) -> Address {
                addr.add(u64::from(insn.length))
            }
            fn modes(&self) -> Vec<ModeDescriptor> {
                Vec::new()
            }
            fn disassemble_basic_block_only(&self) -> bool {
                false
            }
            fn cpu_information(&self) -> &dyn CpuInformation {
                &self.cpu
            }
            fn operand_reference(&self, _document: &Document, _operand_index: usize, _current_address: Address) -> Option<Address> {
                None
            }
        }

        let arch = RetOnly { cpu: NoopCpuInfo };
        let stream = SliceBinaryStream::new(&image, Endianness::Little);
        let ctx = ActionContext {
            architecture: &arch,
            stream: &stream,
            config: AnalyzerConfig::default(),
        };
        let target = ActionTarget {
            range_start: Address::flat(0x2000),
            range_end: Address::flat(0x2001),
            index: Address::flat(0x2000),
        };
        let action = Analyze;
        assert!(action.is_compatible(&doc, target));
        action.execute(&doc, target, &ctx).unwrap();
        assert!(doc.is_cell_present(Address::flat(0x2000)));
    }
}
