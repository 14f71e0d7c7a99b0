use std::collections::HashMap;

use super::visitor::ExpressionVisitor;
use super::Expr;
use crate::address::Address;

/// Wraps every `Identifier`/`VectorIdentifier`/`Memory` leaf in a `Track`
/// node carrying the origin address (the instruction being walked) and the
/// generation counter current for that storage location, and bumps the
/// counter for any leaf that is the destination of an `Assign`.
///
/// This is how the pipeline turns "register `eax`, used twice" into two
/// distinct SSA-like values when the register was reassigned in between:
/// the second occurrence's `Track` generation differs from the first's. The
/// origin address is what lets a later pass answer "at which address did
/// this read/write happen", per the data-flow-chain purpose `Track` serves.
#[derive(Debug)]
pub struct TrackVisitor {
    generations: HashMap<String, u64>,
    origin_address: Address,
}

impl TrackVisitor {
    #[must_use]
    pub fn new(origin_address: Address) -> Self {
        Self {
            generations: HashMap::new(),
            origin_address,
        }
    }

    fn key(expr: &Expr) -> Option<String> {
        match expr {
            Expr::Identifier(id) => Some(format!("id:{id}")),
            Expr::VectorIdentifier(id, lane) => Some(format!("vid:{id}:{lane}")),
            Expr::Memory { address, .. } => Some(format!("mem:{address:?}")),
            _ => None,
        }
    }

    fn generation_of(&self, key: &str) -> u64 {
        self.generations.get(key).copied().unwrap_or(0)
    }

    fn bump(&mut self, key: &str) -> u64 {
        let next = self.generation_of(key) + 1;
        self.generations.insert(key.to_string(), next);
        next
    }

    fn wrap(&self, expr: &Expr) -> Expr {
        match Self::key(expr) {
            Some(key) => Expr::Track {
                expr: Box::new(expr.clone()),
                address: self.origin_address,
                generation: self.generation_of(&key),
            },
            None => expr.clone(),
        }
    }
}

impl ExpressionVisitor for TrackVisitor {
    fn visit_leaf(&mut self, expr: &Expr) -> Expr {
        self.wrap(expr)
    }

    fn visit_memory(&mut self, address: &Expr, width: u32) -> Expr {
        let visited_address = self.visit(address);
        self.wrap(&Expr::memory(visited_address, width))
    }

    fn visit_assign(&mut self, dst: &Expr, src: &Expr) -> Expr {
        let src = self.visit(src);
        if let Some(key) = Self::key(dst) {
            let generation = self.bump(&key);
            let tracked_dst = Expr::Track {
                expr: Box::new(dst.clone()),
                address: self.origin_address,
                generation,
            };
            return Expr::assign(tracked_dst, src);
        }
        Expr::assign(self.visit(dst), src)
    }
}

/// Walks an already-`Track`ed expression backwards from a chosen leaf,
/// collecting the sequence of `Assign` right-hand sides that produced each
/// earlier generation of the same storage location.
///
/// Used by the symbolic executor's path-reconstruction to answer "what
/// expression produced the value this jump target depends on".
#[derive(Debug, Default)]
pub struct BackTrackVisitor {
    history: Vec<(u64, Expr)>,
}

impl BackTrackVisitor {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records one assignment in program order; `generation` is the
    /// generation the assignment produced for `target`'s storage key.
    pub fn record_assignment(&mut self, generation: u64, src: Expr) {
        self.history.push((generation, src));
    }

    /// The most recent recorded definition at or before `generation`, if any.
    #[must_use]
    pub fn definition_at(&self, generation: u64) -> Option<&Expr> {
        self.history
            .iter()
            .rev()
            .find(|(g, _)| *g <= generation)
            .map(|(_, e)| e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reassignment_bumps_generation() {
        let mut visitor = TrackVisitor::new(Address::flat(0x1000));
        let first_write = visitor.visit(&Expr::assign(Expr::Identifier(0), Expr::constant(32, 1)));
        let second_write = visitor.visit(&Expr::assign(Expr::Identifier(0), Expr::constant(32, 2)));
        let (Expr::Assign { dst: d1, .. }, Expr::Assign { dst: d2, .. }) =
            (&first_write, &second_write)
        else {
            panic!("expected assigns");
        };
        let Expr::Track { generation: g1, .. } = **d1 else {
            panic!("expected track");
        };
        let Expr::Track { generation: g2, .. } = **d2 else {
            panic!("expected track");
        };
        assert!(g2 > g1);
    }

    #[test]
    fn test_wrapped_leaf_carries_origin_address() {
        let origin = Address::flat(0x2000);
        let mut visitor = TrackVisitor::new(origin);
        let wrapped = visitor.visit(&Expr::Identifier(3));
        let Expr::Track { address, .. } = wrapped else {
            panic!("expected track");
        };
        assert_eq!(address, origin);
    }

    #[test]
    fn test_backtrack_finds_latest_definition_at_or_before() {
        let mut bt = BackTrackVisitor::new();
        bt.record_assignment(1, Expr::constant(32, 10));
        bt.record_assignment(2, Expr::constant(32, 20));
        assert_eq!(bt.definition_at(2), Some(&Expr::constant(32, 20)));
        assert_eq!(bt.definition_at(1), Some(&Expr::constant(32, 10)));
        assert_eq!(bt.definition_at(0), None);
    }
}
