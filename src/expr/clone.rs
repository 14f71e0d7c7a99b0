use super::visitor::ExpressionVisitor;
use super::Expr;

/// Deep-clones an expression tree through the visitor pipeline rather than
/// `Expr::clone`, so that a pipeline stage can be inserted between
/// traversal and the copy (e.g. to strip `Track` wrappers) without a
/// second pass.
#[derive(Debug, Default)]
pub struct CloneVisitor;

impl CloneVisitor {
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    #[must_use]
    pub fn clone_expr(expr: &Expr) -> Expr {
        CloneVisitor::new().visit(expr)
    }
}

impl ExpressionVisitor for CloneVisitor {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::BinaryOp;

    #[test]
    fn test_clone_is_identical() {
        let expr = Expr::binary(BinaryOp::Add, Expr::constant(32, 1), Expr::constant(32, 2));
        let cloned = CloneVisitor::clone_expr(&expr);
        assert_eq!(expr, cloned);
    }
}
