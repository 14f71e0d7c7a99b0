use std::collections::HashMap;

use super::simplify::SimplifyVisitor;
use super::visitor::ExpressionVisitor;
use super::{Expr, RegisterId};
use crate::bitvector::BitVector;

/// Resolves register reads for [`EvaluateVisitor`]. The disassembler's
/// "current program counter" register is handled specially: `pc()` lets a
/// backend answer `rip`/`pc` reads with the address of the instruction
/// being decoded rather than requiring it be pre-seeded into the register
/// map.
pub trait EvaluationContext {
    fn register(&self, id: RegisterId) -> Option<BitVector>;
    fn pc_register(&self) -> Option<RegisterId>;
    fn pc_value(&self) -> Option<BitVector>;
    /// Reads `width` bits at the (already evaluated) address, if mapped.
    fn read_memory(&self, address: &BitVector, width: u32) -> Option<BitVector>;
}

/// Folds an expression to a constant wherever its inputs are known,
/// leaving a (possibly partially reduced) `Expr` and a flag noting
/// whether any input remained unresolved.
///
/// Mirrors [`super::symbolic::SymbolicVisitor`]'s leaf handling but is one
/// level simpler: it has no store of its own to update, only the
/// read-only context it was constructed with, and it does not fork or
/// explore alternate paths.
pub struct EvaluateVisitor<'a> {
    ctx: &'a dyn EvaluationContext,
    is_symbolic: bool,
}

impl<'a> EvaluateVisitor<'a> {
    #[must_use]
    pub fn new(ctx: &'a dyn EvaluationContext) -> Self {
        Self {
            ctx,
            is_symbolic: false,
        }
    }

    /// Evaluates `expr`, returning the simplified result and whether any
    /// part of it depended on unresolved state.
    pub fn evaluate(ctx: &'a dyn EvaluationContext, expr: &Expr) -> (Expr, bool) {
        let mut visitor = EvaluateVisitor::new(ctx);
        let folded = visitor.visit(expr);
        let folded = SimplifyVisitor::simplify(&folded);
        (folded, visitor.is_symbolic)
    }

    fn mark_symbolic(&mut self) {
        self.is_symbolic = true;
    }
}

impl ExpressionVisitor for EvaluateVisitor<'_> {
    fn visit_leaf(&mut self, expr: &Expr) -> Expr {
        match expr {
            Expr::Identifier(id) => {
                if Some(*id) == self.ctx.pc_register() {
                    if let Some(pc) = self.ctx.pc_value() {
                        return Expr::BitVector(pc);
                    }
                }
                match self.ctx.register(*id) {
                    Some(value) => Expr::BitVector(value),
                    None => {
                        self.mark_symbolic();
                        expr.clone()
                    }
                }
            }
            Expr::Symbolic { .. } => {
                self.mark_symbolic();
                expr.clone()
            }
            _ => expr.clone(),
        }
    }

    fn visit_memory(&mut self, address: &Expr, width: u32) -> Expr {
        let address = self.visit(address);
        match &address {
            Expr::BitVector(addr_bv) => match self.ctx.read_memory(addr_bv, width) {
                Some(value) => Expr::BitVector(value),
                None => {
                    self.mark_symbolic();
                    Expr::memory(address, width)
                }
            },
            _ => {
                self.mark_symbolic();
                Expr::memory(address, width)
            }
        }
    }

    fn visit_binary(&mut self, op: super::BinaryOp, lhs: &Expr, rhs: &Expr) -> Expr {
        let lhs = self.visit(lhs);
        let rhs = self.visit(rhs);
        Expr::binary(op, lhs, rhs)
    }
}

/// A simple owned [`EvaluationContext`] backed by plain maps, convenient
/// for tests and for seeding a one-shot evaluation from a known register
/// file.
#[derive(Debug, Default)]
pub struct MapEvaluationContext {
    pub registers: HashMap<RegisterId, BitVector>,
    pub memory: HashMap<u128, BitVector>,
    pub pc_register: Option<RegisterId>,
    pub pc_value: Option<BitVector>,
}

impl MapEvaluationContext {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_register(mut self, id: RegisterId, value: BitVector) -> Self {
        self.registers.insert(id, value);
        self
    }
}

impl EvaluationContext for MapEvaluationContext {
    fn register(&self, id: RegisterId) -> Option<BitVector> {
        self.registers.get(&id).copied()
    }

    fn pc_register(&self) -> Option<RegisterId> {
        self.pc_register
    }

    fn pc_value(&self) -> Option<BitVector> {
        self.pc_value
    }

    fn read_memory(&self, address: &BitVector, _width: u32) -> Option<BitVector> {
        self.memory.get(&address.to_u128()).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::BinaryOp;

    #[test]
    fn test_resolved_registers_fold_to_constant() {
        let ctx = MapEvaluationContext::new().with_register(0, BitVector::new(32, 10));
        let expr = Expr::binary(BinaryOp::Add, Expr::Identifier(0), Expr::constant(32, 5));
        let (folded, is_symbolic) = EvaluateVisitor::evaluate(&ctx, &expr);
        assert_eq!(folded, Expr::constant(32, 15));
        assert!(!is_symbolic);
    }

    #[test]
    fn test_unresolved_register_is_symbolic() {
        let ctx = MapEvaluationContext::new();
        let expr = Expr::binary(BinaryOp::Add, Expr::Identifier(0), Expr::constant(32, 5));
        let (_, is_symbolic) = EvaluateVisitor::evaluate(&ctx, &expr);
        assert!(is_symbolic);
    }

    #[test]
    fn test_memory_read_resolves_when_mapped() {
        let mut ctx = MapEvaluationContext::new();
        ctx.memory.insert(0x1000, BitVector::new(32, 0xdead_beef));
        let expr = Expr::memory(Expr::constant(64, 0x1000), 32);
        let (folded, is_symbolic) = EvaluateVisitor::evaluate(&ctx, &expr);
        assert_eq!(folded, Expr::constant(32, 0xdead_beef));
        assert!(!is_symbolic);
    }

    #[test]
    fn test_pc_register_resolves_to_pc_value() {
        let mut ctx = MapEvaluationContext::new();
        ctx.pc_register = Some(15);
        ctx.pc_value = Some(BitVector::new(64, 0x4000));
        let (folded, is_symbolic) = EvaluateVisitor::evaluate(&ctx, &Expr::Identifier(15));
        assert_eq!(folded, Expr::constant(64, 0x4000));
        assert!(!is_symbolic);
    }
}
