//! Typed intermediate representation.
//!
//! The resolver lowers each module's CST into this IR; the code generator
//! consumes it together with the static-symbol list published by the
//! [`Context`](crate::context::Context).

pub mod expr;
pub mod stmt;

pub use expr::{BinaryOp, Expr, ExprKind, UnaryOp};
pub use stmt::{Block, Conditional, Defer, Stmt, StmtKind};

use crate::ids::{ScopeId, SymbolId};
use crate::interner::Name;
use crate::types::Ty;
use crate::value::Address;

/// A resolved function.
///
/// Functions are created in an incomplete state (type, address, parameter
/// symbols) and receive their body only after every top-level declaration
/// in the module has been resolved, so mutually recursive functions can
/// see each other.
#[derive(Debug, Clone)]
pub struct Function {
    pub name: Name,
    pub ty: Ty,
    /// Always a static address; the label the code generator emits.
    pub address: Address,
    /// Parameter symbols, left to right.
    pub parameters: Vec<SymbolId>,
    /// Synthetic symbol addressing the return-value stack slot. Absent for
    /// extern functions.
    pub symbol_return: Option<SymbolId>,
    /// The outermost symbol table of the function body. Absent for extern
    /// functions.
    pub scope: Option<ScopeId>,
    /// Lowest rbp offset reached by local storage; the stack frame size
    /// the code generator must reserve.
    pub local_stack_offset: i32,
    pub body: Option<Block>,
    pub is_extern: bool,
}
