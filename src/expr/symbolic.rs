use crate::address::Address;
use crate::bitvector::BitVector;

use super::simplify::SimplifyVisitor;
use super::{BinaryOp, CondOp, Expr, RegisterId, UnaryOp, VariableAction};

/// External state the symbolic executor consults but never mutates:
/// whether an address carries an imported label, and whether/how to read
/// concrete memory through the binary stream. Kept as a trait so the
/// executor has no dependency on `Document` or `BinaryStream` directly.
pub trait SymbolicEnvironment {
    /// Name of the imported label at `address`, if any.
    fn imported_label(&self, address: Address) -> Option<String>;
    /// Whether the executor is configured to read concrete memory at all.
    fn memory_reads_enabled(&self) -> bool;
    /// Reads `width` bits at `address`, if mapped and readable.
    fn read_memory(&self, address: Address, width: u32) -> Option<BitVector>;
}

/// An ordered mapping from key expressions (`Identifier`, `Memory`, or
/// `Track`-wrapped forms of either) to the value expression currently
/// bound to them.
///
/// Kept as an association list rather than a `HashMap` because `Expr`
/// does not implement `Hash` uniformly across all variants and because
/// lookups are by `Expr::compare`, not raw equality.
#[derive(Debug, Clone, Default)]
pub struct SymbolicStore {
    entries: Vec<(Expr, Expr)>,
}

impl SymbolicStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Removes every binding whose key compares `Identical` to `key`, then
    /// installs the new binding at the end (so iteration order reflects
    /// recency).
    pub fn bind(&mut self, key: Expr, value: Expr) {
        self.entries
            .retain(|(k, _)| k.compare(&key) != super::Comparison::Identical);
        self.entries.push((key, value));
    }

    #[must_use]
    pub fn lookup(&self, key: &Expr) -> Option<&(Expr, Expr)> {
        self.entries
            .iter()
            .rev()
            .find(|(k, _)| k.compare(key) == super::Comparison::Identical)
    }

    /// Finds a binding whose key is (optionally `Track`-wrapping) an
    /// `Identifier` with register id `reg`.
    #[must_use]
    pub fn lookup_identifier(&self, reg: RegisterId) -> Option<&(Expr, Expr)> {
        self.entries.iter().rev().find(|(k, _)| {
            matches!(unwrap_track(k), Expr::Identifier(id) if *id == reg)
        })
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn unwrap_track(expr: &Expr) -> &Expr {
    match expr {
        Expr::Track { expr, .. } => expr,
        other => other,
    }
}

/// The §4.5 symbolic interpreter: propagates a [`SymbolicStore`] across a
/// single instruction's IR, with a fork/merge model for branch
/// exploration and jump-table enumeration used by `find_all_paths`.
pub struct SymbolicVisitor<'a> {
    env: &'a dyn SymbolicEnvironment,
    store: SymbolicStore,
    path_conditions: Vec<Expr>,
    variables: Vec<(String, Expr)>,
    current_address: Address,
    position: u64,
    update: bool,
    current_condition: Option<Expr>,
    default_register_width: u32,
}

impl<'a> SymbolicVisitor<'a> {
    #[must_use]
    pub fn new(env: &'a dyn SymbolicEnvironment, current_address: Address) -> Self {
        Self {
            env,
            store: SymbolicStore::new(),
            path_conditions: Vec::new(),
            variables: Vec::new(),
            current_address,
            position: 0,
            update: true,
            current_condition: None,
            default_register_width: 64,
        }
    }

    #[must_use]
    pub fn store(&self) -> &SymbolicStore {
        &self.store
    }

    #[must_use]
    pub fn path_conditions(&self) -> &[Expr] {
        &self.path_conditions
    }

    pub fn set_current_address(&mut self, address: Address) {
        self.current_address = address;
        self.position += 1;
    }

    /// Deep-clones the store, path conditions, variable pool, and
    /// addressing cursor so a caller can explore two branches without
    /// cross-talk between them.
    #[must_use]
    pub fn fork(&self) -> Self {
        Self {
            env: self.env,
            store: self.store.clone(),
            path_conditions: self.path_conditions.clone(),
            variables: self.variables.clone(),
            current_address: self.current_address,
            position: self.position,
            update: self.update,
            current_condition: self.current_condition.clone(),
            default_register_width: self.default_register_width,
        }
    }

    /// Evaluates one top-level IR statement against the store. Returns
    /// `None` if evaluation hit a zero-divisor: per scenario 6, the
    /// surrounding assignment is simply dropped, not an error.
    pub fn eval(&mut self, expr: &Expr) -> Option<Expr> {
        match expr {
            Expr::BitVector(bv) => Some(Expr::BitVector(*bv)),
            Expr::Identifier(id) => Some(self.eval_identifier(*id)),
            Expr::VectorIdentifier(_, _) => Some(expr.clone()),
            Expr::Memory { address, width } => self.eval_memory(address, *width),
            Expr::Track {
                expr,
                address,
                generation,
            } => {
                let inner = self.eval(expr)?;
                Some(Expr::Track {
                    expr: Box::new(inner),
                    address: *address,
                    generation: *generation,
                })
            }
            Expr::Symbolic { .. } => Some(expr.clone()),
            Expr::UnaryOp { op, operand } => self.eval_unary(*op, operand),
            Expr::BinaryOp { op, lhs, rhs } => self.eval_binary(*op, lhs, rhs),
            Expr::ExtractBits { expr, hi, lo } => {
                let inner = self.eval(expr)?;
                Some(eval_extract(&inner, *hi, *lo))
            }
            Expr::InsertBits { expr, src, hi, lo } => {
                let inner = self.eval(expr)?;
                let src_val = self.eval(src)?;
                Some(eval_insert(&inner, &src_val, *hi, *lo))
            }
            Expr::BitCast { expr, width } => {
                let inner = self.eval(expr)?;
                Some(match inner {
                    Expr::BitVector(bv) => Expr::BitVector(bv.bit_cast(*width)),
                    other => Expr::BitCast {
                        expr: Box::new(other),
                        width: *width,
                    },
                })
            }
            Expr::Assign { dst, src } => self.eval_assign(dst, src),
            Expr::Bind { name, value } => {
                let value = self.eval(value)?;
                Some(Expr::Bind {
                    name: name.clone(),
                    value: Box::new(value),
                })
            }
            Expr::Cond { op, lhs, rhs } => {
                let lhs = self.eval(lhs)?;
                let rhs = self.eval(rhs)?;
                Some(Expr::cond(*op, lhs, rhs))
            }
            Expr::TernaryCond {
                cond,
                if_true,
                if_false,
            } => {
                let cond = self.eval(cond)?;
                let if_true = self.eval(if_true)?;
                let if_false = self.eval(if_false)?;
                Some(Expr::TernaryCond {
                    cond: Box::new(cond),
                    if_true: Box::new(if_true),
                    if_false: Box::new(if_false),
                })
            }
            Expr::IfElse {
                cond,
                then_branch,
                else_branch,
            } => self.eval_if_else(cond, then_branch, else_branch),
            Expr::WhileCond { cond, body } => {
                let cond = self.eval(cond)?;
                let mut evaluated_body = Vec::with_capacity(body.len());
                for stmt in body {
                    evaluated_body.push(self.eval(stmt)?);
                }
                Some(Expr::WhileCond {
                    cond: Box::new(cond),
                    body: evaluated_body,
                })
            }
            Expr::System { name, args } => {
                let mut evaluated = Vec::with_capacity(args.len());
                for arg in args {
                    evaluated.push(self.eval(arg)?);
                }
                Some(Expr::System {
                    name: name.clone(),
                    args: evaluated,
                })
            }
            Expr::Variable {
                name,
                action,
                bit_size,
            } => self.eval_variable(name, *action, *bit_size),
        }
    }

    fn eval_identifier(&mut self, id: RegisterId) -> Expr {
        if let Some((key, value)) = self.store.lookup_identifier(id) {
            return if self.update { value.clone() } else { key.clone() };
        }
        if self.update {
            let track_key = Expr::Track {
                expr: Box::new(Expr::Identifier(id)),
                address: self.current_address,
                generation: self.position,
            };
            let sym = Expr::Symbolic {
                label: format!("sym_vst@{}", self.current_address),
                width: self.default_register_width,
            };
            self.store.bind(track_key, sym.clone());
            sym
        } else {
            Expr::Identifier(id)
        }
    }

    fn eval_memory(&mut self, address: &Expr, width: u32) -> Option<Expr> {
        let saved_update = self.update;
        self.update = true;
        let addr_val = self.eval(address);
        self.update = saved_update;
        let addr_val = addr_val?;

        if let Expr::BitVector(bv) = &addr_val {
            let addr = Address::flat(bv.to_u64());
            if let Some(name) = self.env.imported_label(addr) {
                return Some(Expr::Symbolic {
                    label: format!("ExternalFunction:{name}@{addr}"),
                    width,
                });
            }
            if self.env.memory_reads_enabled() {
                if let Some(value) = self.env.read_memory(addr, width) {
                    return Some(Expr::BitVector(value));
                }
            }
        }

        let key = Expr::memory(addr_val.clone(), width);
        if let Some((found_key, value)) = self.store.lookup(&key) {
            return Some(if self.update { value.clone() } else { found_key.clone() });
        }
        Some(key)
    }

    fn eval_unary(&mut self, op: UnaryOp, operand: &Expr) -> Option<Expr> {
        let value = self.eval(operand)?;
        Some(if let Expr::BitVector(bv) = &value {
            match op {
                UnaryOp::Not => Expr::BitVector(bv.not()),
                UnaryOp::Neg => Expr::BitVector(bv.neg()),
                UnaryOp::Swap => Expr::BitVector(bv.swap()),
                UnaryOp::Bsf => match bv.bsf() {
                    Some(idx) => Expr::constant(32, u128::from(idx)),
                    None => Expr::unary(op, value),
                },
                UnaryOp::Bsr => match bv.bsr() {
                    Some(idx) => Expr::constant(32, u128::from(idx)),
                    None => Expr::unary(op, value),
                },
                UnaryOp::SignExtend | UnaryOp::ZeroExtend => Expr::unary(op, value),
            }
        } else {
            Expr::unary(op, value)
        })
    }

    fn eval_binary(&mut self, op: BinaryOp, lhs: &Expr, rhs: &Expr) -> Option<Expr> {
        let lhs_val = self.eval(lhs)?;
        let rhs_val = self.eval(rhs)?;
        if let (Expr::BitVector(a), Expr::BitVector(b)) = (&lhs_val, &rhs_val) {
            let result = match op {
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
            return result.map(Expr::BitVector);
        }
        Some(Expr::binary(op, lhs_val, rhs_val))
    }

    /// Visits the condition, test. If both branches are concrete, picks
    /// the taken branch. Otherwise records the condition as "current" and
    /// recurses into both branches with updates disabled purely to
    /// record their shape, matching `then`/`else` respectively (not the
    /// source's then-twice behavior — see the design notes). `current_condition`
    /// is saved and restored around the branch visits exactly like `update`,
    /// so a condition set by a nested `IfElse` doesn't leak out of this one.
    fn eval_if_else(
        &mut self,
        cond: &Expr,
        then_branch: &[Expr],
        else_branch: &[Expr],
    ) -> Option<Expr> {
        let saved_update = self.update;
        self.update = true;
        let cond_val = self.eval(cond);
        self.update = saved_update;
        let cond_val = cond_val?;

        if let Expr::BitVector(bv) = &cond_val {
            let branch = if !bv.is_zero() { then_branch } else { else_branch };
            let mut last = Expr::BitVector(BitVector::zero(1));
            for stmt in branch {
                last = self.eval(stmt)?;
            }
            return Some(last);
        }

        let saved_condition = self.current_condition.take();
        self.current_condition = Some(cond_val.clone());
        self.path_conditions.push(cond_val.clone());

        let saved_update = self.update;
        self.update = false;
        let mut evaluated_then = Vec::with_capacity(then_branch.len());
        for stmt in then_branch {
            evaluated_then.push(self.eval(stmt)?);
        }
        let mut evaluated_else = Vec::with_capacity(else_branch.len());
        for stmt in else_branch {
            evaluated_else.push(self.eval(stmt)?);
        }
        self.update = saved_update;
        self.current_condition = saved_condition;

        Some(Expr::if_else(cond_val, evaluated_then, evaluated_else))
    }

    fn eval_assign(&mut self, dst: &Expr, src: &Expr) -> Option<Expr> {
        let saved_update = self.update;
        self.update = true;
        let src_val = self.eval(src);
        self.update = saved_update;
        let src_val = src_val?;

        self.update = false;
        let dst_key = self.eval(dst);
        self.update = saved_update;
        let dst_key = dst_key?;

        let value = if let Some(cond) = self.current_condition.clone() {
            self.update = true;
            let current = self.eval(dst);
            self.update = saved_update;
            let current = current?;
            Expr::TernaryCond {
                cond: Box::new(cond),
                if_true: Box::new(src_val),
                if_false: Box::new(current),
            }
        } else {
            src_val
        };

        let simplified = SimplifyVisitor::simplify(&value);
        self.store.bind(dst_key.clone(), simplified.clone());
        Some(Expr::assign(dst_key, simplified))
    }

    fn eval_variable(&mut self, name: &str, action: VariableAction, bit_size: u32) -> Option<Expr> {
        match action {
            VariableAction::Alloc => {
                if self.variables.iter().any(|(n, _)| n == name) {
                    return None;
                }
                let placeholder = Expr::constant(bit_size, 0);
                self.variables.push((name.to_string(), placeholder.clone()));
                Some(placeholder)
            }
            VariableAction::Use => Some(
                self.variables
                    .iter()
                    .find(|(n, _)| n == name)
                    .map(|(_, v)| v.clone())
                    .unwrap_or_else(|| Expr::variable(name, action, bit_size)),
            ),
            VariableAction::Free => {
                self.variables.retain(|(n, _)| n != name);
                Some(Expr::variable(name, action, bit_size))
            }
        }
    }
}

fn eval_extract(expr: &Expr, hi: u32, lo: u32) -> Expr {
    match expr {
        Expr::BitVector(bv) => Expr::BitVector(bv.extract_bits(hi, lo)),
        other => Expr::ExtractBits {
            expr: Box::new(other.clone()),
            hi,
            lo,
        },
    }
}

fn eval_insert(expr: &Expr, src: &Expr, hi: u32, lo: u32) -> Expr {
    match (expr, src) {
        (Expr::BitVector(a), Expr::BitVector(b)) => Expr::BitVector(a.insert_bits(b, hi, lo)),
        (expr, src) => Expr::InsertBits {
            expr: Box::new(expr.clone()),
            src: Box::new(src.clone()),
            hi,
            lo,
        },
    }
}

/// A discovered branch destination plus the assumptions (path conditions)
/// under which it is taken.
#[derive(Debug, Clone)]
pub struct PathDestination {
    pub destination: Expr,
    pub assumptions: Vec<Expr>,
}

/// Matches the `Add(Mul(index, pointer_size), table_base)` shape used to
/// recognize a jump table memory address.
struct JumpTableShape {
    index: Expr,
    pointer_size: u128,
    table_base: Expr,
}

fn match_jump_table(address: &Expr) -> Option<JumpTableShape> {
    let Expr::BinaryOp {
        op: BinaryOp::Add,
        lhs,
        rhs,
    } = address
    else {
        return None;
    };
    let (mul_side, base_side) = match (&**lhs, &**rhs) {
        (Expr::BinaryOp { op: BinaryOp::Mul, .. }, _) => (lhs.as_ref(), rhs.as_ref()),
        (_, Expr::BinaryOp { op: BinaryOp::Mul, .. }) => (rhs.as_ref(), lhs.as_ref()),
        _ => return None,
    };
    let Expr::BinaryOp {
        op: BinaryOp::Mul,
        lhs: mul_lhs,
        rhs: mul_rhs,
    } = mul_side
    else {
        return None;
    };
    let (index, pointer_size) = match (&**mul_lhs, &**mul_rhs) {
        (index, Expr::BitVector(size)) => (index.clone(), size.to_u128()),
        (Expr::BitVector(size), index) => (index.clone(), size.to_u128()),
        _ => return None,
    };
    Some(JumpTableShape {
        index,
        pointer_size,
        table_base: base_side.clone(),
    })
}

/// Finds the single `Identifier` inside `index` and computes the
/// replacement for it, given a candidate concrete value. Only the
/// simplest shapes (the identifier itself, or `identifier +/- constant`)
/// are inverted; anything else reports no match, bounding recoverable
/// patterns per the design notes.
fn substitute_index(index: &Expr, candidate: u128, width: u32) -> Option<Expr> {
    match index {
        Expr::Identifier(_) => Some(Expr::constant(width, candidate)),
        Expr::BinaryOp { op, lhs, rhs } if matches!(**lhs, Expr::Identifier(_)) => {
            let rhs_val = match &**rhs {
                Expr::BitVector(bv) => bv.to_u128(),
                _ => return None,
            };
            let resolved = match op {
                BinaryOp::Add => candidate.wrapping_sub(rhs_val),
                BinaryOp::Sub => candidate.wrapping_add(rhs_val),
                _ => return None,
            };
            Some(Expr::constant(width, resolved))
        }
        _ => None,
    }
}

impl<'a> SymbolicVisitor<'a> {
    /// Dispatches on the shape of `pc_value` (the evaluated program
    /// counter after a single instruction's semantics were applied) to
    /// enumerate the destinations reachable from this point.
    ///
    /// A jump-table memory read is bounded by `self.path_conditions`: the
    /// executor enumerates candidate indices starting at 0 while the
    /// *first* condition recorded at the current address holds for that
    /// candidate, stopping at the first failure (per the design notes,
    /// only the first accumulated condition is consulted).
    pub fn find_all_paths(&mut self, pc_value: &Expr) -> Vec<PathDestination> {
        match pc_value {
            Expr::BitVector(_) => vec![PathDestination {
                destination: pc_value.clone(),
                assumptions: Vec::new(),
            }],
            Expr::Symbolic { label, .. } if label.starts_with("ExternalFunction:") => {
                vec![PathDestination {
                    destination: pc_value.clone(),
                    assumptions: Vec::new(),
                }]
            }
            Expr::TernaryCond {
                cond,
                if_true,
                if_false,
            } => {
                let negated = negate_condition(cond);
                vec![
                    PathDestination {
                        destination: (**if_true).clone(),
                        assumptions: vec![(**cond).clone()],
                    },
                    PathDestination {
                        destination: (**if_false).clone(),
                        assumptions: vec![negated],
                    },
                ]
            }
            Expr::Memory { address, width } => {
                self.enumerate_jump_table(address, *width).unwrap_or_default()
            }
            _ => Vec::new(),
        }
    }

    fn enumerate_jump_table(&self, address: &Expr, width: u32) -> Option<Vec<PathDestination>> {
        let shape = match_jump_table(address)?;
        let condition = self.path_conditions.first()?;
        let mut destinations = Vec::new();
        let mut candidate: u128 = 0;
        loop {
            let index_width = shape.index.width().unwrap_or(32);
            let Some(substituted) = substitute_index(&shape.index, candidate, index_width) else {
                break;
            };
            if !self.condition_holds_for(condition, &shape.index, &substituted) {
                break;
            }
            let Expr::BitVector(base) = &shape.table_base else {
                break;
            };
            let entry_address = base.to_u128()
                + candidate * shape.pointer_size;
            let addr = Address::flat(entry_address as u64);
            let Some(value) = self.env.read_memory(addr, width) else {
                break;
            };
            destinations.push(PathDestination {
                destination: Expr::BitVector(value),
                assumptions: vec![Expr::assign(shape.index.clone(), substituted)],
            });
            candidate += 1;
        }
        Some(destinations)
    }

    /// Substitutes `replacement` for every occurrence of `variable` inside
    /// `condition` and constant-folds; `true` unless the fold yields a
    /// concrete false.
    fn condition_holds_for(&self, condition: &Expr, variable: &Expr, replacement: &Expr) -> bool {
        let substituted = substitute_expr(condition, variable, replacement);
        match SimplifyVisitor::simplify(&substituted) {
            Expr::BitVector(bv) => !bv.is_zero(),
            Expr::Cond { op, lhs, rhs } => match (&*lhs, &*rhs) {
                (Expr::BitVector(a), Expr::BitVector(b)) => eval_cond(op, a, b),
                _ => true,
            },
            _ => true,
        }
    }
}

fn substitute_expr(expr: &Expr, target: &Expr, replacement: &Expr) -> Expr {
    if expr == target {
        return replacement.clone();
    }
    match expr {
        Expr::UnaryOp { op, operand } => {
            Expr::unary(*op, substitute_expr(operand, target, replacement))
        }
        Expr::BinaryOp { op, lhs, rhs } => Expr::binary(
            *op,
            substitute_expr(lhs, target, replacement),
            substitute_expr(rhs, target, replacement),
        ),
        Expr::Cond { op, lhs, rhs } => Expr::cond(
            *op,
            substitute_expr(lhs, target, replacement),
            substitute_expr(rhs, target, replacement),
        ),
        Expr::ExtractBits { expr, hi, lo } => Expr::ExtractBits {
            expr: Box::new(substitute_expr(expr, target, replacement)),
            hi: *hi,
            lo: *lo,
        },
        other => other.clone(),
    }
}

fn eval_cond(op: CondOp, a: &BitVector, b: &BitVector) -> bool {
    match op {
        CondOp::Eq => a.to_u128() == b.to_u128(),
        CondOp::Ne => a.to_u128() != b.to_u128(),
        CondOp::Ult => a.to_u128() < b.to_u128(),
        CondOp::Ule => a.to_u128() <= b.to_u128(),
        CondOp::Ugt => a.to_u128() > b.to_u128(),
        CondOp::Uge => a.to_u128() >= b.to_u128(),
        CondOp::Slt => a.to_i128() < b.to_i128(),
        CondOp::Sle => a.to_i128() <= b.to_i128(),
        CondOp::Sgt => a.to_i128() > b.to_i128(),
        CondOp::Sge => a.to_i128() >= b.to_i128(),
    }
}

fn negate_condition(cond: &Expr) -> Expr {
    match cond {
        Expr::Cond { op, lhs, rhs } => Expr::cond(negate_op(*op), (**lhs).clone(), (**rhs).clone()),
        other => Expr::unary(UnaryOp::Not, other.clone()),
    }
}

fn negate_op(op: CondOp) -> CondOp {
    match op {
        CondOp::Eq => CondOp::Ne,
        CondOp::Ne => CondOp::Eq,
        CondOp::Ult => CondOp::Uge,
        CondOp::Ule => CondOp::Ugt,
        CondOp::Ugt => CondOp::Ule,
        CondOp::Uge => CondOp::Ult,
        CondOp::Slt => CondOp::Sge,
        CondOp::Sle => CondOp::Sgt,
        CondOp::Sgt => CondOp::Sle,
        CondOp::Sge => CondOp::Slt,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct NoMemory;
    impl SymbolicEnvironment for NoMemory {
        fn imported_label(&self, _address: Address) -> Option<String> {
            None
        }
        fn memory_reads_enabled(&self) -> bool {
            false
        }
        fn read_memory(&self, _address: Address, _width: u32) -> Option<BitVector> {
            None
        }
    }

    #[test]
    fn test_assign_binds_store() {
        let env = NoMemory;
        let mut visitor = SymbolicVisitor::new(&env, Address::flat(0x1000));
        let assign = Expr::assign(Expr::Identifier(0), Expr::constant(32, 42));
        visitor.eval(&assign).unwrap();
        let (_, value) = visitor.store().lookup_identifier(0).unwrap();
        assert_eq!(*value, Expr::constant(32, 42));
    }

    #[test]
    fn test_division_by_zero_drops_to_none() {
        let env = NoMemory;
        let mut visitor = SymbolicVisitor::new(&env, Address::flat(0x1000));
        let expr = Expr::assign(
            Expr::Identifier(0),
            Expr::binary(BinaryOp::UDiv, Expr::constant(32, 10), Expr::constant(32, 0)),
        );
        assert!(visitor.eval(&expr).is_none());
        assert!(visitor.store().is_empty());
    }

    #[test]
    fn test_fork_does_not_leak_mutations() {
        let env = NoMemory;
        let mut visitor = SymbolicVisitor::new(&env, Address::flat(0x1000));
        visitor
            .eval(&Expr::assign(Expr::Identifier(0), Expr::constant(32, 1)))
            .unwrap();
        let mut left = visitor.fork();
        left.eval(&Expr::assign(Expr::Identifier(0), Expr::constant(32, 2)))
            .unwrap();
        let (_, right_value) = visitor.store().lookup_identifier(0).unwrap();
        let (_, left_value) = left.store().lookup_identifier(0).unwrap();
        assert_eq!(*right_value, Expr::constant(32, 1));
        assert_eq!(*left_value, Expr::constant(32, 2));
    }

    #[test]
    fn test_unresolved_identifier_creates_tracked_symbolic() {
        let env = NoMemory;
        let mut visitor = SymbolicVisitor::new(&env, Address::flat(0x2000));
        let value = visitor.eval(&Expr::Identifier(7)).unwrap();
        assert!(matches!(value, Expr::Symbolic { .. }));
        assert_eq!(visitor.store().len(), 1);
    }

    #[test]
    fn test_concrete_pc_yields_single_destination() {
        let env = NoMemory;
        let mut visitor = SymbolicVisitor::new(&env, Address::flat(0x1000));
        let destinations = visitor.find_all_paths(&Expr::constant(64, 0x2000));
        assert_eq!(destinations.len(), 1);
        assert!(destinations[0].assumptions.is_empty());
    }

    #[test]
    fn test_ternary_pc_yields_two_destinations() {
        let env = NoMemory;
        let mut visitor = SymbolicVisitor::new(&env, Address::flat(0x1000));
        let pc = Expr::TernaryCond {
            cond: Box::new(Expr::cond(CondOp::Eq, Expr::Identifier(0), Expr::constant(32, 0))),
            if_true: Box::new(Expr::constant(64, 0x100)),
            if_false: Box::new(Expr::constant(64, 0x200)),
        };
        let destinations = visitor.find_all_paths(&pc);
        assert_eq!(destinations.len(), 2);
    }
}
