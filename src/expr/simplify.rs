use super::visitor::ExpressionVisitor;
use super::{BinaryOp, Expr};

/// Bottom-up algebraic simplification: constant folding plus a small set
/// of identities (`x + 0`, `x ^ x`, `x & 0`, `x | 0`, double negation).
///
/// Used by the symbolic executor before a value is bound into the store,
/// so that expressions don't grow unboundedly across a long basic-block
/// chain of assignments.
#[derive(Debug, Default)]
pub struct SimplifyVisitor;

impl SimplifyVisitor {
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    #[must_use]
    pub fn simplify(expr: &Expr) -> Expr {
        SimplifyVisitor::new().visit(expr)
    }
}

impl ExpressionVisitor for SimplifyVisitor {
    fn visit_binary(&mut self, op: BinaryOp, lhs: &Expr, rhs: &Expr) -> Expr {
        let lhs = self.visit(lhs);
        let rhs = self.visit(rhs);

        if let (Expr::BitVector(a), Expr::BitVector(b)) = (&lhs, &rhs) {
            let folded = match op {
                BinaryOp::Add => Some(a.add(b)),
                BinaryOp::Sub => Some(a.sub(b)),
                BinaryOp::Mul => Some(a.mul(b)),
                BinaryOp::UDiv => a.udiv(b),
                BinaryOp::SDiv => a.sdiv(b),
                BinaryOp::UMod => a.umod(b),
                BinaryOp::SMod => a.smod(b),
                BinaryOp::And => Some(a.and(b)),
                BinaryOp::Or => Some(a.or(b)),
                BinaryOp::Xor => Some(a.xor(b)),
                BinaryOp::Lls => Some(a.lls(b)),
                BinaryOp::Lrs => Some(a.lrs(b)),
                BinaryOp::Ars => Some(a.ars(b)),
            };
            if let Some(folded) = folded {
                return Expr::BitVector(folded);
            }
        }

        if let Expr::BitVector(b) = &rhs {
            if b.is_zero() && matches!(op, BinaryOp::Add | BinaryOp::Sub | BinaryOp::Or | BinaryOp::Xor) {
                return lhs;
            }
            if b.is_zero() && matches!(op, BinaryOp::And | BinaryOp::Mul) {
                return rhs;
            }
        }
        if op == BinaryOp::Xor && lhs == rhs {
            if let Some(width) = lhs.width() {
                return Expr::constant(width, 0);
            }
        }

        Expr::binary(op, lhs, rhs)
    }

    fn visit_unary(&mut self, op: super::UnaryOp, operand: &Expr) -> Expr {
        let operand = self.visit(operand);
        if op == super::UnaryOp::Not {
            if let Expr::UnaryOp {
                op: super::UnaryOp::Not,
                operand: inner,
            } = &operand
            {
                return (**inner).clone();
            }
        }
        if let Expr::BitVector(v) = &operand {
            let folded = match op {
                super::UnaryOp::Not => Some(v.not()),
                super::UnaryOp::Neg => Some(v.neg()),
                super::UnaryOp::Swap => Some(v.swap()),
                _ => None,
            };
            if let Some(folded) = folded {
                return Expr::BitVector(folded);
            }
        }
        Expr::unary(op, operand)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constant_folding() {
        let expr = Expr::binary(BinaryOp::Add, Expr::constant(32, 2), Expr::constant(32, 3));
        assert_eq!(SimplifyVisitor::simplify(&expr), Expr::constant(32, 5));
    }

    #[test]
    fn test_add_zero_identity() {
        let expr = Expr::binary(BinaryOp::Add, Expr::Identifier(0), Expr::constant(32, 0));
        assert_eq!(SimplifyVisitor::simplify(&expr), Expr::Identifier(0));
    }

    #[test]
    fn test_xor_self_is_zero() {
        let reg = Expr::VectorIdentifier(0, 32);
        let expr = Expr::binary(BinaryOp::Xor, reg.clone(), reg);
        assert_eq!(SimplifyVisitor::simplify(&expr), Expr::constant(32, 0));
    }

    #[test]
    fn test_double_negation_cancels() {
        let expr = Expr::unary(super::super::UnaryOp::Not, Expr::unary(super::super::UnaryOp::Not, Expr::Identifier(0)));
        assert_eq!(SimplifyVisitor::simplify(&expr), Expr::Identifier(0));
    }
}
