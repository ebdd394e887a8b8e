//! Typed IR expressions.
//!
//! Every node is immutable after construction and carries its source
//! location plus its result type.

use crate::context::Context;
use crate::ids::SymbolId;
use crate::source::Location;
use crate::symtab::SymbolKind;
use crate::types::{Ty, TyKind};
use crate::value::Address;
use num_bigint::BigInt;
use std::fmt;

/// A typed expression.
#[derive(Debug, Clone)]
pub struct Expr {
    pub location: Location,
    pub ty: Ty,
    pub kind: ExprKind,
}

impl Expr {
    pub fn new(location: Location, ty: Ty, kind: ExprKind) -> Self {
        Self { location, ty, kind }
    }

    /// True when this expression designates a memory location that may be
    /// assigned to or have its address taken.
    pub fn is_lvalue(&self, ctx: &Context) -> bool {
        match &self.kind {
            ExprKind::Symbol(symbol) => match &ctx.symbols[*symbol].kind {
                SymbolKind::Variable { .. } | SymbolKind::Constant { .. } => true,
                SymbolKind::Function(_) => false,
                SymbolKind::Type(_) | SymbolKind::Namespace(_) | SymbolKind::Template(_) => {
                    unreachable!("type-level symbol in expression position")
                }
            },
            ExprKind::AccessIndex { lhs, .. } => {
                matches!(ctx.types.kind(lhs.ty), TyKind::Slice { .. }) || lhs.is_lvalue(ctx)
            }
            ExprKind::AccessMember { lhs, .. } => lhs.is_lvalue(ctx),
            ExprKind::Unary { op, .. } => *op == UnaryOp::Dereference,
            _ => false,
        }
    }
}

/// The variant payload of a typed expression.
#[derive(Debug, Clone)]
pub enum ExprKind {
    /// A reference to a variable, constant, or function symbol.
    Symbol(SymbolId),
    Boolean(bool),
    Integer(BigInt),
    /// A bytes literal: the static address of its NUL-terminated backing
    /// array and the count *excluding* the NUL.
    Bytes { address: Address, count: usize },
    /// `(:[N]T)[a, b, ...c]`; the ellipsis expression fills the remaining
    /// slots at evaluation time.
    ArrayList {
        elements: Vec<Expr>,
        ellipsis: Option<Box<Expr>>,
    },
    /// `(:[]T)[a, b, c]` over a synthesized backing array symbol.
    SliceList {
        backing: SymbolId,
        elements: Vec<Expr>,
    },
    /// `(:[]T)[pointer, count]`.
    Slice {
        pointer: Box<Expr>,
        count: Box<Expr>,
    },
    /// Struct literal with one expression per member variable, in
    /// definition order.
    StructLiteral { members: Vec<Expr> },
    Cast { expr: Box<Expr> },
    Syscall { arguments: Vec<Expr> },
    Call {
        function: Box<Expr>,
        arguments: Vec<Expr>,
    },
    AccessIndex { lhs: Box<Expr>, index: Box<Expr> },
    AccessSlice {
        lhs: Box<Expr>,
        begin: Box<Expr>,
        end: Box<Expr>,
    },
    /// Struct member variable access; `member` indexes the struct type's
    /// member list.
    AccessMember { lhs: Box<Expr>, member: usize },
    Sizeof { operand: Ty },
    Alignof { operand: Ty },
    Unary { op: UnaryOp, rhs: Box<Expr> },
    Binary {
        op: BinaryOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Not,
    Pos,
    Neg,
    BitNot,
    Dereference,
    AddressOf,
    Countof,
}

impl fmt::Display for UnaryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            UnaryOp::Not => "not",
            UnaryOp::Pos => "+",
            UnaryOp::Neg => "-",
            UnaryOp::BitNot => "~",
            UnaryOp::Dereference => "*",
            UnaryOp::AddressOf => "&",
            UnaryOp::Countof => "countof",
        };
        f.write_str(text)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Or,
    And,
    Shl,
    Shr,
    Eq,
    Ne,
    Le,
    Lt,
    Ge,
    Gt,
    Add,
    Sub,
    Mul,
    Div,
    BitOr,
    BitXor,
    BitAnd,
}

impl fmt::Display for BinaryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            BinaryOp::Or => "or",
            BinaryOp::And => "and",
            BinaryOp::Shl => "<<",
            BinaryOp::Shr => ">>",
            BinaryOp::Eq => "==",
            BinaryOp::Ne => "!=",
            BinaryOp::Le => "<=",
            BinaryOp::Lt => "<",
            BinaryOp::Ge => ">=",
            BinaryOp::Gt => ">",
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::BitOr => "|",
            BinaryOp::BitXor => "^",
            BinaryOp::BitAnd => "&",
        };
        f.write_str(text)
    }
}
