use super::visitor::ExpressionVisitor;
use super::Expr;
use crate::address::Address;

/// Collects every subexpression matching a predicate, walking the whole
/// tree, up to an optional quota.
///
/// Matching does not stop descent into a matched node: a `Memory` read
/// whose address itself contains another `Memory` read yields both.
pub struct FilterVisitor<'a> {
    matcher: Box<dyn Fn(&Expr) -> bool + 'a>,
    quota: Option<usize>,
    matches: Vec<Expr>,
}

impl<'a> FilterVisitor<'a> {
    #[must_use]
    pub fn new(matcher: impl Fn(&Expr) -> bool + 'a) -> Self {
        Self {
            matcher: Box::new(matcher),
            quota: None,
            matches: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_quota(mut self, quota: usize) -> Self {
        self.quota = Some(quota);
        self
    }

    #[must_use]
    pub fn quota_reached(&self) -> bool {
        matches!(self.quota, Some(q) if self.matches.len() >= q)
    }

    pub fn run(mut self, expr: &Expr) -> Vec<Expr> {
        ExpressionVisitor::visit(&mut self, expr);
        self.matches
    }

    fn record(&mut self, expr: &Expr) {
        if !self.quota_reached() && (self.matcher)(expr) {
            self.matches.push(expr.clone());
        }
    }
}

/// Every override records the node on entry, then falls through to the
/// trait's default recursive behavior so children are still visited
/// (unless the quota was already hit, in which case the subtree is
/// returned unexamined).
impl ExpressionVisitor for FilterVisitor<'_> {
    fn visit_leaf(&mut self, expr: &Expr) -> Expr {
        self.record(expr);
        expr.clone()
    }

    fn visit_memory(&mut self, address: &Expr, width: u32) -> Expr {
        let whole = Expr::memory(address.clone(), width);
        self.record(&whole);
        if self.quota_reached() {
            return whole;
        }
        Expr::memory(self.visit(address), width)
    }

    fn visit_track(&mut self, expr: &Expr, address: Address, generation: u64) -> Expr {
        let whole = Expr::Track {
            expr: Box::new(expr.clone()),
            address,
            generation,
        };
        self.record(&whole);
        if self.quota_reached() {
            return whole;
        }
        Expr::Track {
            expr: Box::new(self.visit(expr)),
            address,
            generation,
        }
    }

    fn visit_unary(&mut self, op: super::UnaryOp, operand: &Expr) -> Expr {
        self.record(&Expr::unary(op, operand.clone()));
        if self.quota_reached() {
            return Expr::unary(op, operand.clone());
        }
        Expr::unary(op, self.visit(operand))
    }

    fn visit_binary(&mut self, op: super::BinaryOp, lhs: &Expr, rhs: &Expr) -> Expr {
        self.record(&Expr::binary(op, lhs.clone(), rhs.clone()));
        if self.quota_reached() {
            return Expr::binary(op, lhs.clone(), rhs.clone());
        }
        Expr::binary(op, self.visit(lhs), self.visit(rhs))
    }

    fn visit_extract_bits(&mut self, expr: &Expr, hi: u32, lo: u32) -> Expr {
        self.record(&Expr::ExtractBits {
            expr: Box::new(expr.clone()),
            hi,
            lo,
        });
        if self.quota_reached() {
            return expr.clone();
        }
        Expr::ExtractBits {
            expr: Box::new(self.visit(expr)),
            hi,
            lo,
        }
    }

    fn visit_insert_bits(&mut self, expr: &Expr, src: &Expr, hi: u32, lo: u32) -> Expr {
        self.record(&Expr::InsertBits {
            expr: Box::new(expr.clone()),
            src: Box::new(src.clone()),
            hi,
            lo,
        });
        if self.quota_reached() {
            return expr.clone();
        }
        Expr::InsertBits {
            expr: Box::new(self.visit(expr)),
            src: Box::new(self.visit(src)),
            hi,
            lo,
        }
    }

    fn visit_bit_cast(&mut self, expr: &Expr, width: u32) -> Expr {
        self.record(&Expr::BitCast {
            expr: Box::new(expr.clone()),
            width,
        });
        if self.quota_reached() {
            return expr.clone();
        }
        Expr::BitCast {
            expr: Box::new(self.visit(expr)),
            width,
        }
    }

    fn visit_assign(&mut self, dst: &Expr, src: &Expr) -> Expr {
        self.record(&Expr::assign(dst.clone(), src.clone()));
        if self.quota_reached() {
            return Expr::assign(dst.clone(), src.clone());
        }
        Expr::assign(self.visit(dst), self.visit(src))
    }

    fn visit_bind(&mut self, name: &str, value: &Expr) -> Expr {
        self.record(&Expr::Bind {
            name: name.to_string(),
            value: Box::new(value.clone()),
        });
        if self.quota_reached() {
            return value.clone();
        }
        Expr::Bind {
            name: name.to_string(),
            value: Box::new(self.visit(value)),
        }
    }

    fn visit_cond(&mut self, op: super::CondOp, lhs: &Expr, rhs: &Expr) -> Expr {
        self.record(&Expr::cond(op, lhs.clone(), rhs.clone()));
        if self.quota_reached() {
            return Expr::cond(op, lhs.clone(), rhs.clone());
        }
        Expr::cond(op, self.visit(lhs), self.visit(rhs))
    }

    fn visit_ternary_cond(&mut self, cond: &Expr, if_true: &Expr, if_false: &Expr) -> Expr {
        self.record(&Expr::TernaryCond {
            cond: Box::new(cond.clone()),
            if_true: Box::new(if_true.clone()),
            if_false: Box::new(if_false.clone()),
        });
        if self.quota_reached() {
            return cond.clone();
        }
        Expr::TernaryCond {
            cond: Box::new(self.visit(cond)),
            if_true: Box::new(self.visit(if_true)),
            if_false: Box::new(self.visit(if_false)),
        }
    }

    fn visit_if_else(&mut self, cond: &Expr, then_branch: &[Expr], else_branch: &[Expr]) -> Expr {
        self.record(&Expr::if_else(
            cond.clone(),
            then_branch.to_vec(),
            else_branch.to_vec(),
        ));
        if self.quota_reached() {
            return cond.clone();
        }
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
        self.record(&Expr::WhileCond {
            cond: Box::new(cond.clone()),
            body: body.to_vec(),
        });
        if self.quota_reached() {
            return cond.clone();
        }
        let cond = self.visit(cond);
        let body = body.iter().map(|e| self.visit(e)).collect();
        Expr::WhileCond {
            cond: Box::new(cond),
            body,
        }
    }

    fn visit_system(&mut self, name: &str, args: &[Expr]) -> Expr {
        self.record(&Expr::System {
            name: name.to_string(),
            args: args.to_vec(),
        });
        if self.quota_reached() {
            return Expr::System {
                name: name.to_string(),
                args: args.to_vec(),
            };
        }
        Expr::System {
            name: name.to_string(),
            args: args.iter().map(|e| self.visit(e)).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::BinaryOp;

    #[test]
    fn test_filter_collects_all_memory_reads() {
        let expr = Expr::assign(
            Expr::Identifier(0),
            Expr::binary(
                BinaryOp::Add,
                Expr::memory(Expr::constant(64, 0x1000), 32),
                Expr::memory(Expr::constant(64, 0x2000), 32),
            ),
        );
        let hits = FilterVisitor::new(|e| matches!(e, Expr::Memory { .. })).run(&expr);
        assert_eq!(hits.len(), 2);
    }

    #[test]
    fn test_filter_respects_quota() {
        let expr = Expr::assign(
            Expr::Identifier(0),
            Expr::binary(
                BinaryOp::Add,
                Expr::memory(Expr::constant(64, 0x1000), 32),
                Expr::memory(Expr::constant(64, 0x2000), 32),
            ),
        );
        let hits = FilterVisitor::new(|e| matches!(e, Expr::Memory { .. }))
            .with_quota(1)
            .run(&expr);
        assert_eq!(hits.len(), 1);
    }
}
