use crate::address::Address;
use crate::cell::{InstructionKind, OperandDescriptor};
use crate::document::Document;
use crate::error::Result;
use crate::expr::Expr;
use crate::stream::BinaryStream;

/// Architecture-specific execution mode (16/32/64-bit, ARM/Thumb, …)
/// carried by a cell and threaded through decode calls.
pub type Mode = u32;

/// A decoded instruction, as handed back by [`Architecture::decode`].
#[derive(Debug, Clone)]
pub struct Instruction {
    pub mnemonic: String,
    pub operands: Vec<OperandDescriptor>,
    pub semantics: Vec<Expr>,
    pub sub_type: InstructionKind,
    pub length: u32,
}

/// A named execution mode an [`Architecture`] supports, e.g. `("x86_64", 2)`.
#[derive(Debug, Clone)]
pub struct ModeDescriptor {
    pub name: String,
    pub code: Mode,
}

/// Register file metadata an [`Architecture`] exposes to the normalize and
/// symbolic stages. `kind` selects a register class (general purpose,
/// flags, program counter, …) meaningful only to the backend itself.
pub trait CpuInformation: Send + Sync {
    fn register_by_type(&self, kind: u32, mode: Mode) -> Option<u32>;
    fn size_of_register_in_bits(&self, id: u32) -> Option<u32>;
    /// Resolves a sub-register alias to its canonical parent and the bit
    /// mask (hi, lo) it occupies within it.
    fn normalize_register(&self, id: u32, mode: Mode) -> Option<(u32, u32, u32)>;
    fn identifier_name(&self, id: u32) -> Option<String>;
}

/// Decodes raw bytes into instructions and exposes the register metadata
/// and execution-mode list the rest of the core needs. An external
/// collaborator: no implementation ships in this crate beyond the
/// test-only fake used by the scenario tests.
pub trait Architecture: Send + Sync {
    fn decode(&self, stream: &dyn BinaryStream, file_offset: u64, mode: Mode) -> Result<Instruction>;

    /// The semantic IR for "set the execution address register to
    /// `current`", used to seed the symbolic store's program counter.
    fn emit_set_execution_address(&self, current: Address, mode: Mode) -> Vec<Expr>;

    /// The fall-through address after `insn` decoded at `addr`.
    fn current_address(&self, addr: Address, insn: &Instruction) -> Address;

    fn modes(&self) -> Vec<ModeDescriptor>;

    /// When true, the analyzer decodes exactly one basic block from each
    /// seed and must not assume fall-through reaches live code.
    fn disassemble_basic_block_only(&self) -> bool;

    fn cpu_information(&self) -> &dyn CpuInformation;

    /// Resolves operand `index` of the instruction at `current_address` to
    /// an `Address`, if the operand denotes one (label/jump/call target,
    /// data reference). `None` means unresolved (purely register/immediate
    /// operands that don't address memory, or a destination this backend
    /// cannot determine statically).
    fn operand_reference(
        &self,
        document: &Document,
        operand_index: usize,
        current_address: Address,
    ) -> Option<Address>;
}
