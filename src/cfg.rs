use std::collections::HashSet;

use crate::address::Address;
use crate::arch::{Architecture, Instruction};
use crate::cell::InstructionKind;
use crate::document::Document;

/// Type carried by a [`ControlFlowGraph`] edge. `Unknown` is transient:
/// used only during discovery for a branch not yet classified by the
/// 0/1/2/N dispatch rule (§4.5), never left on a finalized graph edge a
/// caller observes.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash)]
pub enum EdgeType {
    Unknown,
    Unconditional,
    True,
    False,
    Next,
    Multiple,
}

/// A maximal straight-line run of cell addresses: single entry, single
/// exit, ending at the first branch/call/return.
#[derive(Debug, Clone, Default)]
pub struct BasicBlock {
    pub addresses: Vec<Address>,
}

impl BasicBlock {
    #[must_use]
    pub fn entry(&self) -> Option<Address> {
        self.addresses.first().copied()
    }

    #[must_use]
    pub fn contains(&self, addr: Address) -> bool {
        self.addresses.contains(&addr)
    }
}

/// An edge as recorded during traversal, before splitting may have moved
/// either endpoint to a different vertex.
#[derive(Debug, Clone, Copy)]
struct RawEdge {
    src: Address,
    dst: Address,
    kind: EdgeType,
}

/// A finalized edge between two vertices, identified by their entry
/// addresses.
#[derive(Debug, Clone, Copy)]
pub struct Edge {
    pub from_vertex: Address,
    pub to_vertex: Address,
    pub kind: EdgeType,
}

/// A directed graph of [`BasicBlock`] vertices built from the evidence a
/// single-function traversal accumulates: the full address list visited,
/// plus every branching instruction's `(destination, source, type)`.
/// [`Self::build`] performs that traversal itself against a `Document` and
/// `Architecture`; [`Self::new`] and [`Self::record_edge`] take the
/// evidence directly, for a caller (or test) that already has it.
pub struct ControlFlowGraph {
    vertices: Vec<BasicBlock>,
    raw_edges: Vec<RawEdge>,
    edges: Vec<Edge>,
    reached_return: bool,
}

impl ControlFlowGraph {
    /// Builds the initial vertex from every address a single-function walk
    /// visited (deduplicated, sorted ascending), splitting it at `entry`
    /// if a recorded jump landed before `entry` appears in traversal order
    /// (the entry address then lies strictly inside the accumulated
    /// block).
    #[must_use]
    pub fn new(mut addresses: Vec<Address>, entry: Address, reached_return: bool) -> Self {
        addresses.sort();
        addresses.dedup();
        let mut graph = Self {
            vertices: vec![BasicBlock { addresses }],
            raw_edges: Vec::new(),
            edges: Vec::new(),
            reached_return,
        };
        if let Some(vertex) = graph.vertex_containing(entry) {
            if graph.vertices[vertex].entry() != Some(entry) {
                graph.split_vertex_before(entry);
            }
        }
        graph
    }

    /// Performs the single-function walk itself (§4.6 construction step 1):
    /// pops addresses from a stack, follows fall-through past non-branch
    /// instructions and calls (a call returns control to its own
    /// fall-through; its callee is a different function's traversal, not
    /// this one's), follows the taken edge of unconditional jumps without
    /// forking the trajectory, records `(destination, source, type)` for
    /// every conditional branch, and stops a trajectory on an
    /// unconditional return or a revisit of an already-walked address.
    /// Feeds the result through [`Self::new`] and [`Self::record_edge`]
    /// itself, then finalizes, so a caller never has to reimplement the
    /// walk against `document`/`architecture` by hand.
    #[must_use]
    pub fn build(document: &Document, architecture: &dyn Architecture, entry: Address) -> Self {
        let mut visited: HashSet<Address> = HashSet::new();
        let mut order: Vec<Address> = Vec::new();
        let mut pending_edges: Vec<(Address, Address, EdgeType)> = Vec::new();
        let mut reached_return = false;
        let mut stack = vec![entry];

        while let Some(start) = stack.pop() {
            let mut addr = start;
            loop {
                if visited.contains(&addr) {
                    break;
                }
                let Some(cell) = document.retrieve_cell(addr) else {
                    break;
                };
                let Some(data) = cell.kind.as_instruction() else {
                    break;
                };
                visited.insert(addr);
                order.push(addr);

                let insn = Instruction {
                    mnemonic: data.mnemonic.clone(),
                    operands: data.operands.clone(),
                    semantics: data.semantics.clone(),
                    sub_type: data.sub_type,
                    length: cell.length,
                };
                let fall_through = architecture.current_address(addr, &insn);
                let resolved = architecture.operand_reference(document, 0, addr);

                if data.sub_type.contains(InstructionKind::RETURN) {
                    reached_return = true;
                    if data.sub_type.contains(InstructionKind::CONDITIONAL) {
                        stack.push(fall_through);
                    }
                    break;
                }

                if data.sub_type.contains(InstructionKind::CALL) {
                    addr = fall_through;
                    continue;
                }

                if data.sub_type.contains(InstructionKind::JUMP) {
                    if data.sub_type.contains(InstructionKind::CONDITIONAL) {
                        // Recorded nearest-first: splitting the fall-through edge
                        // before the (usually farther) taken edge keeps each
                        // split's implicit `Next` edge anchored to the vertex
                        // that directly precedes it, not the original
                        // unsplit vertex's entry.
                        pending_edges.push((addr, fall_through, EdgeType::False));
                        stack.push(fall_through);
                        if let Some(dest) = resolved {
                            pending_edges.push((addr, dest, EdgeType::True));
                            stack.push(dest);
                        }
                        break;
                    }
                    let Some(dest) = resolved else { break };
                    pending_edges.push((addr, dest, EdgeType::Unconditional));
                    addr = dest;
                    continue;
                }

                addr = fall_through;
            }
        }

        let mut graph = Self::new(order, entry, reached_return);
        for (src, dst, kind) in pending_edges {
            graph.record_edge(src, dst, kind);
        }
        graph.finalize();
        graph
    }

    #[must_use]
    pub fn reached_return(&self) -> bool {
        self.reached_return
    }

    #[must_use]
    pub fn vertices(&self) -> &[BasicBlock] {
        &self.vertices
    }

    #[must_use]
    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    fn vertex_containing(&self, addr: Address) -> Option<usize> {
        self.vertices.iter().position(|v| v.contains(addr))
    }

    /// Splits the vertex containing `addr` into two: addresses before
    /// `addr` remain in place, `addr` and everything after become a new
    /// vertex appended to `self.vertices`. An implicit `Next` edge from
    /// the predecessor half's entry to the new vertex's entry is recorded
    /// (connecting fall-through that used to be mid-block). No-op if
    /// `addr` is already a vertex's first address.
    fn split_vertex_before(&mut self, addr: Address) -> bool {
        let Some(idx) = self.vertex_containing(addr) else {
            return false;
        };
        if self.vertices[idx].entry() == Some(addr) {
            return true;
        }
        let split_at = self.vertices[idx]
            .addresses
            .iter()
            .position(|&a| a == addr)
            .expect("vertex_containing guarantees addr is present");

        let predecessor_entry = self.vertices[idx].entry().unwrap();
        let tail = self.vertices[idx].addresses.split_off(split_at);
        self.vertices.push(BasicBlock { addresses: tail });
        self.raw_edges.push(RawEdge {
            src: predecessor_entry,
            dst: addr,
            kind: EdgeType::Next,
        });
        true
    }

    /// Records a branching instruction's edge evidence and splits the
    /// vertex containing `dst` if `dst` lands mid-block.
    pub fn record_edge(&mut self, src: Address, dst: Address, kind: EdgeType) {
        self.split_vertex_before(dst);
        self.raw_edges.push(RawEdge { src, dst, kind });
    }

    /// Re-resolves every recorded edge's endpoints to the vertex entry
    /// address currently containing them, fixing up addresses that moved
    /// between vertices as a result of later splits. Idempotent; safe to
    /// call more than once.
    pub fn finalize(&mut self) {
        self.edges = self
            .raw_edges
            .iter()
            .filter_map(|edge| {
                let from_idx = self.vertex_containing(edge.src)?;
                let to_idx = self.vertex_containing(edge.dst)?;
                Some(Edge {
                    from_vertex: self.vertices[from_idx].entry()?,
                    to_vertex: self.vertices[to_idx].entry()?,
                    kind: edge.kind,
                })
            })
            .collect();
    }
}

/// Classifies a discovered branch-count into the edge kinds it produces,
/// per the §4.5 0/1/2/N dispatch rule. `branches` is given in discovery
/// order; for the 2-branch case the first is `True`, the second `False`.
#[must_use]
pub fn classify_branch_kinds(branch_count: usize) -> Vec<EdgeType> {
    match branch_count {
        0 => Vec::new(),
        1 => vec![EdgeType::Unconditional],
        2 => vec![EdgeType::True, EdgeType::False],
        _ => vec![EdgeType::Multiple; branch_count],
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;
    use crate::arch::{CpuInformation, Mode, ModeDescriptor};
    use crate::cell::{Cell, InstructionData, OperandDescriptor};
    use crate::error::Result;
    use crate::expr::Expr;
    use crate::memory_area::{AccessFlags, MemoryArea};
    use crate::stream::BinaryStream;

    #[test]
    fn test_split_creates_two_vertices() {
        let addresses = vec![
            Address::flat(0x100),
            Address::flat(0x102),
            Address::flat(0x104),
            Address::flat(0x105),
        ];
        let mut graph = ControlFlowGraph::new(addresses, Address::flat(0x100), true);
        graph.record_edge(Address::flat(0x100), Address::flat(0x104), EdgeType::True);
        graph.record_edge(Address::flat(0x100), Address::flat(0x102), EdgeType::False);
        graph.finalize();
        assert_eq!(graph.vertices().len(), 2);
        assert_eq!(graph.edges().len(), 2);
        let kinds: Vec<EdgeType> = graph.edges().iter().map(|e| e.kind).collect();
        assert!(kinds.contains(&EdgeType::True));
        assert!(kinds.contains(&EdgeType::False));
    }

    #[test]
    fn test_classify_branch_kinds() {
        assert_eq!(classify_branch_kinds(0), Vec::<EdgeType>::new());
        assert_eq!(classify_branch_kinds(1), vec![EdgeType::Unconditional]);
        assert_eq!(classify_branch_kinds(2), vec![EdgeType::True, EdgeType::False]);
        assert_eq!(classify_branch_kinds(4), vec![EdgeType::Multiple; 4]);
    }

    #[test]
    fn test_entry_inside_accumulated_block_splits() {
        let addresses = vec![Address::flat(0x100), Address::flat(0x102), Address::flat(0x104)];
        let graph = ControlFlowGraph::new(addresses, Address::flat(0x102), true);
        assert_eq!(graph.vertices().len(), 2);
        assert_eq!(graph.vertices()[0].entry(), Some(Address::flat(0x100)));
        assert_eq!(graph.vertices()[1].entry(), Some(Address::flat(0x102)));
    }

    struct FakeCpu;
    impl CpuInformation for FakeCpu {
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

    /// An architecture whose instructions carry no bytes at all: every
    /// instruction is a fixed-length 1-byte cell and jump targets come
    /// straight out of a lookup table keyed by source address, so the
    /// walk in `ControlFlowGraph::build` can be exercised without also
    /// standing up a decoder.
    struct FakeArch {
        targets: HashMap<Address, Address>,
    }

    impl Architecture for FakeArch {
        fn decode(&self, _stream: &dyn BinaryStream, _file_offset: u64, _mode: Mode) -> Result<Instruction> {
            unreachable!("build() walks already-decoded cells, it never decodes")
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
            &FakeCpu
        }

        fn operand_reference(&self, _document: &Document, _operand_index: usize, current_address: Address) -> Option<Address> {
            self.targets.get(&current_address).copied()
        }
    }

    fn insert_insn(document: &Document, addr: Address, length: u32, sub_type: InstructionKind) {
        let cell = Cell::new_instruction(
            length,
            InstructionData {
                mnemonic: String::new(),
                operands: vec![OperandDescriptor { text: String::new() }],
                semantics: Vec::new(),
                sub_type,
            },
        );
        document.insert_cell(addr, cell, true, true).unwrap();
    }

    /// `jz .+2; nop; nop; ret` at 0x100, the same layout as the scenario
    /// tests, built straight off the `Document` instead of hand-written
    /// edges: the walk must discover all three vertices and edges itself.
    #[test]
    fn test_build_walks_a_conditional_jump_into_three_vertices() {
        let document = Document::new();
        document.insert_area(MemoryArea::new(
            "image",
            AccessFlags::READ | AccessFlags::EXECUTE,
            0,
            0x110,
            Address::flat(0),
            0x110,
        ));
        insert_insn(&document, Address::flat(0x100), 2, InstructionKind::JUMP | InstructionKind::CONDITIONAL);
        insert_insn(&document, Address::flat(0x102), 1, InstructionKind::NONE);
        insert_insn(&document, Address::flat(0x103), 1, InstructionKind::NONE);
        insert_insn(&document, Address::flat(0x104), 1, InstructionKind::RETURN);

        let arch = FakeArch {
            targets: HashMap::from([(Address::flat(0x100), Address::flat(0x104))]),
        };
        let graph = ControlFlowGraph::build(&document, &arch, Address::flat(0x100));

        assert_eq!(graph.vertices().len(), 3);
        assert!(graph.reached_return());
        let kinds: Vec<(Address, Address, EdgeType)> = graph
            .edges()
            .iter()
            .map(|e| (e.from_vertex, e.to_vertex, e.kind))
            .collect();
        assert!(kinds.contains(&(Address::flat(0x100), Address::flat(0x104), EdgeType::True)));
        assert!(kinds.contains(&(Address::flat(0x100), Address::flat(0x102), EdgeType::False)));
        assert!(kinds.contains(&(Address::flat(0x102), Address::flat(0x104), EdgeType::Next)));
    }
}
