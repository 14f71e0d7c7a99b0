use super::Expr;
use crate::address::Address;

/// The traversal contract every expression pass implements.
///
/// Each `visit_*` method returns the (possibly rewritten) subtree it was
/// given; the default implementations recurse into children and rebuild the
/// node, so a visitor only needs to override the cases it cares about.
/// [`IfElse`](Expr::IfElse) is the one node where the then- and
/// else-branches must be walked through their *own* dedicated callbacks
/// rather than reusing a single "visit a branch" helper for both, since a
/// visitor that e.g. tracks path conditions needs to know which branch it
/// is in.
pub trait ExpressionVisitor {
    fn visit(&mut self, expr: &Expr) -> Expr {
        match expr {
            Expr::BitVector(_)
            | Expr::Identifier(_)
            | Expr::VectorIdentifier(_, _)
            | Expr::Variable { .. }
            | Expr::Symbolic { .. } => self.visit_leaf(expr),
            Expr::Memory { address, width } => self.visit_memory(address, *width),
            Expr::Track {
                expr,
                address,
                generation,
            } => self.visit_track(expr, *address, *generation),
            Expr::UnaryOp { op, operand } => self.visit_unary(*op, operand),
            Expr::BinaryOp { op, lhs, rhs } => self.visit_binary(*op, lhs, rhs),
            Expr::ExtractBits { expr, hi, lo } => self.visit_extract_bits(expr, *hi, *lo),
            Expr::InsertBits { expr, src, hi, lo } => {
                self.visit_insert_bits(expr, src, *hi, *lo)
            }
            Expr::BitCast { expr, width } => self.visit_bit_cast(expr, *width),
            Expr::Assign { dst, src } => self.visit_assign(dst, src),
            Expr::Bind { name, value } => self.visit_bind(name, value),
            Expr::Cond { op, lhs, rhs } => self.visit_cond(*op, lhs, rhs),
            Expr::TernaryCond {
                cond,
                if_true,
                if_false,
            } => self.visit_ternary_cond(cond, if_true, if_false),
            Expr::IfElse {
                cond,
                then_branch,
                else_branch,
            } => self.visit_if_else(cond, then_branch, else_branch),
            Expr::WhileCond { cond, body } => self.visit_while_cond(cond, body),
            Expr::System { name, args } => self.visit_system(name, args),
        }
    }

    fn visit_leaf(&mut self, expr: &Expr) -> Expr {
        expr.clone()
    }

    fn visit_memory(&mut self, address: &Expr, width: u32) -> Expr {
        Expr::memory(self.visit(address), width)
    }

    fn visit_track(&mut self, expr: &Expr, address: Address, generation: u64) -> Expr {
        Expr::Track {
            expr: Box::new(self.visit(expr)),
            address,
            generation,
        }
    }

    fn visit_unary(&mut self, op: super::UnaryOp, operand: &Expr) -> Expr {
        Expr::unary(op, self.visit(operand))
    }

    fn visit_binary(&mut self, op: super::BinaryOp, lhs: &Expr, rhs: &Expr) -> Expr {
        Expr::binary(op, self.visit(lhs), self.visit(rhs))
    }

    fn visit_extract_bits(&mut self, expr: &Expr, hi: u32, lo: u32) -> Expr {
        Expr::ExtractBits {
            expr: Box::new(self.visit(expr)),
            hi,
            lo,
        }
    }

    fn visit_insert_bits(&mut self, expr: &Expr, src: &Expr, hi: u32, lo: u32) -> Expr {
        Expr::InsertBits {
            expr: Box::new(self.visit(expr)),
            src: Box::new(self.visit(src)),
            hi,
            lo,
        }
    }

    fn visit_bit_cast(&mut self, expr: &Expr, width: u32) -> Expr {
        Expr::BitCast {
            expr: Box::new(self.visit(expr)),
            width,
        }
    }

    fn visit_assign(&mut self, dst: &Expr, src: &Expr) -> Expr {
        Expr::assign(self.visit(dst), self.visit(src))
    }

    fn visit_bind(&mut self, name: &str, value: &Expr) -> Expr {
        Expr::Bind {
            name: name.to_string(),
            value: Box::new(self.visit(value)),
        }
    }

    fn visit_cond(&mut self, op: super::CondOp, lhs: &Expr, rhs: &Expr) -> Expr {
        Expr::cond(op, self.visit(lhs), self.visit(rhs))
    }

    fn visit_ternary_cond(&mut self, cond: &Expr, if_true: &Expr, if_false: &Expr) -> Expr {
        Expr::TernaryCond {
            cond: Box::new(self.visit(cond)),
            if_true: Box::new(self.visit(if_true)),
            if_false: Box::new(self.visit(if_false)),
        }
    }

    /// Visits the condition, then the then-branch, then the else-branch,
    /// each exactly once.
    fn visit_if_else(&mut self, cond: &Expr, then_branch: &[Expr], else_branch: &[Expr]) -> Expr {
        let cond = self.visit(cond);
        let then_branch = then_branch.iter().map(|e| self.visit(e)).collect();
        let else_branch = else_branch.iter().map(|e| self.visit(e)).collect();
        Expr::IfElse {
            cond: Box::new(cond),
            then_branch,
            else_branch,
        }
    }

    fn visit_while_cond(&mut self, cond: &Expr, body: &[Expr]) -> Expr {
        let cond = self.visit(cond);
        let body = body.iter().map(|e| self.visit(e)).collect();
        Expr::WhileCond {
            cond: Box::new(cond),
            body,
        }
    }

    fn visit_system(&mut self, name: &str, args: &[Expr]) -> Expr {
        Expr::System {
            name: name.to_string(),
            args: args.iter().map(|e| self.visit(e)).collect(),
        }
    }
}
