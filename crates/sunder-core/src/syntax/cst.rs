//! Concrete syntax tree.
//!
//! The parser produces one [`Module`] per source file. The resolver
//! consumes the tree read-only and constructs a parallel typed IR; the
//! only CST nodes it ever creates itself are the synthesized declarations
//! of template instances, which is why declarations are reference-counted
//! and cloneable.

use crate::interner::Name;
use crate::source::Location;
use num_bigint::BigInt;
use std::fmt;
use std::rc::Rc;

/// A parsed source file.
#[derive(Debug, Clone)]
pub struct Module {
    pub namespace: Option<Namespace>,
    pub imports: Vec<Import>,
    /// Top-level declarations in topological order.
    pub decls: Vec<Rc<Decl>>,
}

/// A `namespace a::b::c;` prelude.
#[derive(Debug, Clone)]
pub struct Namespace {
    pub location: Location,
    pub identifiers: Vec<Identifier>,
}

/// An `import "path";` declaration.
#[derive(Debug, Clone)]
pub struct Import {
    pub location: Location,
    pub path: String,
}

/// An identifier token.
#[derive(Debug, Clone)]
pub struct Identifier {
    pub location: Location,
    pub name: Name,
}

impl Identifier {
    pub fn new(location: Location, name: Name) -> Self {
        Self { location, name }
    }
}

/// A top-level or member declaration.
#[derive(Debug, Clone)]
pub struct Decl {
    pub location: Location,
    pub kind: DeclKind,
}

#[derive(Debug, Clone)]
pub enum DeclKind {
    Variable {
        identifier: Identifier,
        typespec: Option<Typespec>,
        expr: ExprNode,
    },
    Constant {
        identifier: Identifier,
        typespec: Option<Typespec>,
        expr: ExprNode,
    },
    Function {
        identifier: Identifier,
        template_parameters: Vec<Identifier>,
        parameters: Vec<FunctionParameter>,
        return_typespec: Typespec,
        body: BlockNode,
    },
    Struct {
        identifier: Identifier,
        template_parameters: Vec<Identifier>,
        members: Vec<Member>,
    },
    Extend {
        typespec: Typespec,
        decl: Rc<Decl>,
    },
    Alias {
        identifier: Identifier,
        typespec: Typespec,
    },
    ExternVariable {
        identifier: Identifier,
        typespec: Typespec,
    },
    ExternFunction {
        identifier: Identifier,
        parameters: Vec<FunctionParameter>,
        return_typespec: Typespec,
    },
}

impl Decl {
    pub fn new(location: Location, kind: DeclKind) -> Self {
        Self { location, kind }
    }

    /// The declared name.
    pub fn name(&self) -> Name {
        match &self.kind {
            DeclKind::Variable { identifier, .. }
            | DeclKind::Constant { identifier, .. }
            | DeclKind::Function { identifier, .. }
            | DeclKind::Struct { identifier, .. }
            | DeclKind::Alias { identifier, .. }
            | DeclKind::ExternVariable { identifier, .. }
            | DeclKind::ExternFunction { identifier, .. } => identifier.name,
            DeclKind::Extend { decl, .. } => decl.name(),
        }
    }
}

/// One `name: typespec` function parameter.
#[derive(Debug, Clone)]
pub struct FunctionParameter {
    pub location: Location,
    pub identifier: Identifier,
    pub typespec: Typespec,
}

/// A struct member.
#[derive(Debug, Clone)]
pub struct Member {
    pub location: Location,
    pub name: Name,
    pub kind: MemberKind,
}

#[derive(Debug, Clone)]
pub enum MemberKind {
    Variable {
        identifier: Identifier,
        typespec: Typespec,
    },
    Constant(Rc<Decl>),
    Function(Rc<Decl>),
}

/// A `{ ... }` block of statements.
#[derive(Debug, Clone)]
pub struct BlockNode {
    pub location: Location,
    pub stmts: Vec<StmtNode>,
}

/// A statement.
#[derive(Debug, Clone)]
pub struct StmtNode {
    pub location: Location,
    pub kind: StmtKind,
}

#[derive(Debug, Clone)]
pub enum StmtKind {
    Decl(Rc<Decl>),
    Defer(BlockNode),
    If {
        /// One or more conditionals; only the last may lack a condition
        /// (the `else` arm).
        conditionals: Vec<Conditional>,
    },
    ForRange {
        identifier: Identifier,
        begin: Option<ExprNode>,
        end: ExprNode,
        body: BlockNode,
    },
    ForExpr {
        expr: ExprNode,
        body: BlockNode,
    },
    Break,
    Continue,
    Dump(ExprNode),
    Return(Option<ExprNode>),
    Assign {
        lhs: ExprNode,
        rhs: ExprNode,
    },
    Expr(ExprNode),
}

/// One `if`/`elif`/`else` arm.
#[derive(Debug, Clone)]
pub struct Conditional {
    pub location: Location,
    pub condition: Option<ExprNode>,
    pub body: BlockNode,
}

/// An expression.
#[derive(Debug, Clone)]
pub struct ExprNode {
    pub location: Location,
    pub kind: ExprKind,
}

impl ExprNode {
    pub fn new(location: Location, kind: ExprKind) -> Self {
        Self { location, kind }
    }
}

#[derive(Debug, Clone)]
pub enum ExprKind {
    Symbol(SymbolPath),
    Boolean(bool),
    Integer {
        value: BigInt,
        /// Literal suffix (`u8`, `s`, `y`, ...); the empty name for an
        /// un-suffixed literal.
        suffix: Name,
    },
    Character(char),
    /// A bytes (string) literal, without the NUL terminator the resolver
    /// appends to its backing array.
    Bytes(Vec<u8>),
    /// `(:T)[a, b, ...c]` array or slice list.
    List {
        typespec: Typespec,
        elements: Vec<ExprNode>,
        ellipsis: Option<Box<ExprNode>>,
    },
    /// `(:[]T)[pointer, count]` slice construction.
    Slice {
        typespec: Typespec,
        pointer: Box<ExprNode>,
        count: Box<ExprNode>,
    },
    /// `(:S){.a = x, .b = y}` struct literal.
    Struct {
        typespec: Typespec,
        initializers: Vec<MemberInitializer>,
    },
    Cast {
        typespec: Typespec,
        expr: Box<ExprNode>,
    },
    Grouped(Box<ExprNode>),
    Syscall {
        arguments: Vec<ExprNode>,
    },
    Call {
        function: Box<ExprNode>,
        arguments: Vec<ExprNode>,
    },
    AccessIndex {
        lhs: Box<ExprNode>,
        index: Box<ExprNode>,
    },
    AccessSlice {
        lhs: Box<ExprNode>,
        begin: Box<ExprNode>,
        end: Box<ExprNode>,
    },
    AccessMember {
        lhs: Box<ExprNode>,
        member: SymbolElement,
    },
    /// Postfix dereference `expr.*`.
    AccessDereference {
        lhs: Box<ExprNode>,
    },
    Sizeof(Typespec),
    Alignof(Typespec),
    Unary {
        op: UnaryOpToken,
        rhs: Box<ExprNode>,
    },
    Binary {
        op: BinaryOpToken,
        lhs: Box<ExprNode>,
        rhs: Box<ExprNode>,
    },
}

/// A `.member = expr` struct-literal initializer.
#[derive(Debug, Clone)]
pub struct MemberInitializer {
    pub location: Location,
    pub identifier: Identifier,
    pub expr: ExprNode,
}

/// A unary operator token with its location.
#[derive(Debug, Clone)]
pub struct UnaryOpToken {
    pub location: Location,
    pub kind: UnaryOpKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOpKind {
    Not,
    Pos,
    Neg,
    BitNot,
    Dereference,
    AddressOf,
    Countof,
}

impl fmt::Display for UnaryOpKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            UnaryOpKind::Not => "not",
            UnaryOpKind::Pos => "+",
            UnaryOpKind::Neg => "-",
            UnaryOpKind::BitNot => "~",
            UnaryOpKind::Dereference => "*",
            UnaryOpKind::AddressOf => "&",
            UnaryOpKind::Countof => "countof",
        };
        f.write_str(text)
    }
}

/// A binary operator token with its location.
#[derive(Debug, Clone)]
pub struct BinaryOpToken {
    pub location: Location,
    pub kind: BinaryOpKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOpKind {
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

impl fmt::Display for BinaryOpKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            BinaryOpKind::Or => "or",
            BinaryOpKind::And => "and",
            BinaryOpKind::Shl => "<<",
            BinaryOpKind::Shr => ">>",
            BinaryOpKind::Eq => "==",
            BinaryOpKind::Ne => "!=",
            BinaryOpKind::Le => "<=",
            BinaryOpKind::Lt => "<",
            BinaryOpKind::Ge => ">=",
            BinaryOpKind::Gt => ">",
            BinaryOpKind::Add => "+",
            BinaryOpKind::Sub => "-",
            BinaryOpKind::Mul => "*",
            BinaryOpKind::Div => "/",
            BinaryOpKind::BitOr => "|",
            BinaryOpKind::BitXor => "^",
            BinaryOpKind::BitAnd => "&",
        };
        f.write_str(text)
    }
}

/// A `::`-separated symbol path such as `std::foo[[u16]]::bar`.
#[derive(Debug, Clone)]
pub struct SymbolPath {
    pub location: Location,
    /// True when the path starts with `::` (resolve from the module root).
    pub is_from_root: bool,
    pub elements: Vec<SymbolElement>,
}

impl SymbolPath {
    /// A single-element path for a plain identifier.
    pub fn identifier(identifier: Identifier) -> Self {
        Self {
            location: identifier.location.clone(),
            is_from_root: false,
            elements: vec![SymbolElement {
                location: identifier.location.clone(),
                identifier,
                template_arguments: Vec::new(),
            }],
        }
    }
}

/// One element of a symbol path, optionally carrying template arguments.
#[derive(Debug, Clone)]
pub struct SymbolElement {
    pub location: Location,
    pub identifier: Identifier,
    pub template_arguments: Vec<Typespec>,
}

/// A type specification.
#[derive(Debug, Clone)]
pub struct Typespec {
    pub location: Location,
    pub kind: TypespecKind,
}

impl Typespec {
    pub fn new(location: Location, kind: TypespecKind) -> Self {
        Self { location, kind }
    }
}

#[derive(Debug, Clone)]
pub enum TypespecKind {
    Symbol(SymbolPath),
    Function {
        parameters: Vec<Typespec>,
        return_typespec: Box<Typespec>,
    },
    Pointer(Box<Typespec>),
    Array {
        count: Box<ExprNode>,
        base: Box<Typespec>,
    },
    Slice(Box<Typespec>),
    Typeof(Box<ExprNode>),
}
