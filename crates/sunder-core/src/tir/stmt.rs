//! Typed IR statements and blocks.

use super::expr::Expr;
use crate::ids::{DeferId, ScopeId, SymbolId};
use crate::source::Location;

/// A resolved block. Blocks own their lexical symbol table.
#[derive(Debug, Clone)]
pub struct Block {
    pub location: Location,
    pub scope: ScopeId,
    pub stmts: Vec<Stmt>,
    /// Head of the defer chain when the block exits.
    pub defer_begin: Option<DeferId>,
    /// Head of the defer chain when the block was entered; code generation
    /// unwinds from `defer_begin` back to (not including) `defer_end`.
    pub defer_end: Option<DeferId>,
}

/// A resolved statement.
#[derive(Debug, Clone)]
pub struct Stmt {
    pub location: Location,
    pub kind: StmtKind,
}

impl Stmt {
    pub fn new(location: Location, kind: StmtKind) -> Self {
        Self { location, kind }
    }
}

#[derive(Debug, Clone)]
pub enum StmtKind {
    /// An `if`/`elif`/`else` chain; only the final conditional may lack a
    /// condition.
    If { conditionals: Vec<Conditional> },
    ForRange {
        loop_variable: SymbolId,
        begin: Expr,
        end: Expr,
        body: Block,
    },
    ForExpr { condition: Expr, body: Block },
    /// Breaks run defers from `defer_begin` back to the loop's anchor
    /// `defer_end`.
    Break {
        defer_begin: Option<DeferId>,
        defer_end: Option<DeferId>,
    },
    Continue {
        defer_begin: Option<DeferId>,
        defer_end: Option<DeferId>,
    },
    Dump { expr: Expr },
    /// Returns run every defer from `defer` outward.
    Return {
        expr: Option<Expr>,
        defer: Option<DeferId>,
    },
    Assign { lhs: Expr, rhs: Expr },
    Expr(Expr),
    Defer(DeferId),
}

/// One arm of an `if` chain.
#[derive(Debug, Clone)]
pub struct Conditional {
    pub location: Location,
    pub condition: Option<Expr>,
    pub body: Block,
}

/// A link in a defer chain. Links are pool-allocated and threaded through
/// `prev`, so `break`/`continue`/`return` capture the chain head in effect
/// at the jump without any closure-like construct.
#[derive(Debug, Clone)]
pub struct Defer {
    pub prev: Option<DeferId>,
    pub body: Block,
}
