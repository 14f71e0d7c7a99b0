use super::visitor::ExpressionVisitor;
use super::{Expr, RegisterId};

/// Maps a sub-register identifier (e.g. an 8-bit or 16-bit alias) to its
/// full-width parent register plus the bit range within it, so the
/// evaluator and symbolic executor only ever reason about one storage
/// location per physical register.
///
/// An `Architecture::cpu_information` backend is expected to supply this
/// table; the core carries no knowledge of any concrete register file.
pub trait RegisterAliasTable {
    /// Resolves `id` to `(parent_register, hi, lo)`. Returns `None` for an
    /// identifier that is already a full-width (non-aliased) register.
    fn resolve(&self, id: RegisterId) -> Option<(RegisterId, u32, u32)>;
}

/// A table with no aliases: every identifier resolves to itself.
#[derive(Debug, Default, Clone, Copy)]
pub struct FlatRegisterTable;

impl RegisterAliasTable for FlatRegisterTable {
    fn resolve(&self, _id: RegisterId) -> Option<(RegisterId, u32, u32)> {
        None
    }
}

/// Rewrites every aliased `Identifier` into an `ExtractBits` over its
/// parent register, so that two instructions referencing e.g. `al` and
/// `eax` are seen by later stages as reads of the same underlying storage.
pub struct NormalizeIdentifier<'a> {
    table: &'a dyn RegisterAliasTable,
}

impl<'a> NormalizeIdentifier<'a> {
    #[must_use]
    pub fn new(table: &'a dyn RegisterAliasTable) -> Self {
        Self { table }
    }

    #[must_use]
    pub fn normalize(table: &'a dyn RegisterAliasTable, expr: &Expr) -> Expr {
        NormalizeIdentifier::new(table).visit(expr)
    }
}

impl ExpressionVisitor for NormalizeIdentifier<'_> {
    fn visit_leaf(&mut self, expr: &Expr) -> Expr {
        match expr {
            Expr::Identifier(id) => match self.table.resolve(*id) {
                Some((parent, hi, lo)) => Expr::ExtractBits {
                    expr: Box::new(Expr::Identifier(parent)),
                    hi,
                    lo,
                },
                None => expr.clone(),
            },
            _ => expr.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FakeAliases;
    impl RegisterAliasTable for FakeAliases {
        fn resolve(&self, id: RegisterId) -> Option<(RegisterId, u32, u32)> {
            // id 1 ("al") is bits [7:0] of id 0 ("eax").
            (id == 1).then_some((0, 7, 0))
        }
    }

    #[test]
    fn test_aliased_identifier_becomes_extract_bits() {
        let table = FakeAliases;
        let normalized = NormalizeIdentifier::normalize(&table, &Expr::Identifier(1));
        assert_eq!(
            normalized,
            Expr::ExtractBits {
                expr: Box::new(Expr::Identifier(0)),
                hi: 7,
                lo: 0,
            }
        );
    }

    #[test]
    fn test_unaliased_identifier_is_unchanged() {
        let table = FakeAliases;
        let normalized = NormalizeIdentifier::normalize(&table, &Expr::Identifier(0));
        assert_eq!(normalized, Expr::Identifier(0));
    }
}
