use crate::address::Address;
use crate::arch::Architecture;
use crate::cell::{Cell, InstructionData};
use crate::config::AnalyzerConfig;
use crate::document::Document;
use crate::error::{Error, Result};
use crate::label::LabelKind;
use crate::stream::BinaryStream;

/// Recursive-traversal disassembler: grows the coded region of a
/// `Document` from a seed address using a work-list driven by
/// call/jump/return semantics (§4.4).
///
/// Holds no state of its own beyond configuration; a run's work-list
/// lives on the stack of `disassemble`, matching the source's
/// `std::stack`-based traversal.
pub struct Analyzer<'a> {
    document: &'a Document,
    config: AnalyzerConfig,
}

impl<'a> Analyzer<'a> {
    #[must_use]
    pub fn new(document: &'a Document, config: AnalyzerConfig) -> Self {
        Self { document, config }
    }

    /// Disassembles reachable code from `entry` using `architecture` to
    /// decode bytes out of `stream`. Every error kind the decoder or
    /// document can raise is recovered from locally (logged, current
    /// basic block or function traversal abandoned); only a configuration
    /// overrun (`InvalidConfiguration`, the work-list limit) aborts the
    /// whole call.
    pub fn disassemble(
        &self,
        architecture: &dyn Architecture,
        stream: &dyn BinaryStream,
        entry: Address,
    ) -> Result<()> {
        if self
            .document
            .label_kind_at(entry)
            .is_some_and(|kind| kind.contains(LabelKind::IMPORTED))
        {
            return Ok(());
        }

        let mut worklist = vec![entry];
        let mut iterations: u64 = 0;

        while let Some(addr) = worklist.pop() {
            iterations += 1;
            if iterations > self.config.max_worklist_iterations {
                return Err(Error::InvalidConfiguration(
                    "analyzer work-list iteration limit exceeded".to_string(),
                ));
            }
            self.try_seed(architecture, stream, addr, &mut worklist);
        }

        Ok(())
    }

    fn try_seed(
        &self,
        architecture: &dyn Architecture,
        stream: &dyn BinaryStream,
        addr: Address,
        worklist: &mut Vec<Address>,
    ) {
        if self
            .document
            .label_kind_at(addr)
            .is_some_and(|kind| kind.contains(LabelKind::IMPORTED))
        {
            return;
        }
        if self.document.is_cell_present(addr) {
            return;
        }
        if !self.document.is_executable(addr) {
            log::warn!("analyzer: {addr} is not in an executable area, dropping seed");
            return;
        }
        self.disassemble_basic_block(architecture, stream, addr, worklist);
    }

    /// Decodes one basic block starting at `current`, inserting cells as
    /// it goes, until a terminator is decoded or a stop condition fires.
    fn disassemble_basic_block(
        &self,
        architecture: &dyn Architecture,
        stream: &dyn BinaryStream,
        mut current: Address,
        worklist: &mut Vec<Address>,
    ) {
        loop {
            if self.document.is_cell_present(current) {
                // Overlaps already-coded bytes: abandon this decode, block ends.
                return;
            }
            let Some(file_offset) = self.document.translate(current) else {
                log::warn!("analyzer: {current} has no backing file offset");
                return;
            };
            let mode = 0;
            let insn = match architecture.decode(stream, file_offset, mode) {
                Ok(insn) => insn,
                Err(err) => {
                    log::warn!("analyzer: decode failed at {current}: {err}");
                    return;
                }
            };
            if insn.length == 0 {
                log::warn!("analyzer: zero-length instruction at {current}");
                return;
            }

            let cell = Cell::new_instruction(
                insn.length,
                InstructionData {
                    mnemonic: insn.mnemonic.clone(),
                    operands: insn.operands.clone(),
                    semantics: insn.semantics.clone(),
                    sub_type: insn.sub_type,
                },
            );
            if let Err(err) = self.document.insert_cell(current, cell, true, true) {
                log::warn!("analyzer: insert failed at {current}: {err}");
                return;
            }

            if insn.sub_type.is_terminator() {
                self.harvest_edges(architecture, current, &insn, worklist);
                return;
            }

            for operand_index in 0..insn.operands.len() {
                self.harvest_data_reference(architecture, current, operand_index);
            }

            if architecture.disassemble_basic_block_only() {
                return;
            }
            current = architecture.current_address(current, &insn);
        }
    }

    fn harvest_edges(
        &self,
        architecture: &dyn Architecture,
        current: Address,
        insn: &crate::arch::Instruction,
        worklist: &mut Vec<Address>,
    ) {
        use crate::cell::InstructionKind;

        let fall_through = architecture.current_address(current, insn);
        let resolved = architecture.operand_reference(self.document, 0, current);

        if insn.sub_type.contains(InstructionKind::CALL) {
            worklist.push(fall_through);
            if let Some(dest) = resolved {
                self.document.add_xref(current, dest);
                worklist.push(dest);
            }
            return;
        }

        if insn.sub_type.contains(InstructionKind::RETURN) {
            if insn.sub_type.contains(InstructionKind::CONDITIONAL) {
                worklist.push(fall_through);
            }
            return;
        }

        if insn.sub_type.contains(InstructionKind::JUMP) {
            if insn.sub_type.contains(InstructionKind::CONDITIONAL) {
                worklist.push(fall_through);
            }
            if let Some(dest) = resolved {
                self.document.add_xref(current, dest);
                worklist.push(dest);
            }
        }
    }

    /// A non-terminator instruction may still reference data; record the
    /// xref if the architecture resolves it, without pushing a code seed.
    fn harvest_data_reference(&self, architecture: &dyn Architecture, current: Address, operand_index: usize) {
        if let Some(dest) = architecture.operand_reference(self.document, operand_index, current) {
            self.document.add_xref(current, dest);
        }
    }
}
