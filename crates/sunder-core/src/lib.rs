//! Sunder semantic front-end
//!
//! This crate implements the semantic core of the Sunder compiler:
//! - Canonical type interning (type equality is handle equality)
//! - Lexically nested, freezable symbol tables
//! - A pure compile-time evaluator over the typed IR
//! - The CST -> TIR resolver (name lookup, implicit casts, templates,
//!   struct completion, module import merging)
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                            Context                              │
//! │  ┌──────────┐ ┌──────────┐ ┌─────────┐ ┌─────────┐ ┌─────────┐  │
//! │  │ Interner │ │  Types   │ │ Scopes  │ │ Symbols │ │ Statics │  │
//! │  │ (strings)│ │ (Ty→Kind)│ │ (tables)│ │ (pool)  │ │ (labels)│  │
//! │  └──────────┘ └──────────┘ └─────────┘ └─────────┘ └─────────┘  │
//! └─────────────────────────────────────────────────────────────────┘
//!        ↑              ↑              ↑
//!        │              │              │
//!   ┌────┴────┐    ┌────┴────┐    ┌────┴────┐
//!   │  Parse  │ →  │ Resolve │ ⇄  │  Eval   │ → Codegen
//!   │  (CST)  │    │  (TIR)  │    │ (Value) │
//!   └─────────┘    └─────────┘    └─────────┘
//! ```
//!
//! The parser and the x86-64 code generator are external collaborators:
//! the parser produces the [`syntax::cst`] input behind the
//! [`compiler::ModuleProvider`] seam, and the back-end consumes the static
//! symbols and resolved functions published by the [`context::Context`].

// Core modules
pub mod compiler;
pub mod context;
pub mod diagnostic;
pub mod ids;
pub mod index_vec;
pub mod interner;
pub mod source;
pub mod symtab;
pub mod syntax;
pub mod types;
pub mod value;

// Analysis modules
pub mod eval;
pub mod resolve;
pub mod tir;

// Re-exports
pub use compiler::{Compiler, FsModuleProvider, MemoryModuleProvider, ModuleProvider};
pub use context::Context;
pub use diagnostic::{CompileResult, Fatal};
pub use eval::Evaluator;
pub use ids::{DeferId, FuncId, ModuleId, ScopeId, SymbolId, TemplateId};
pub use index_vec::{Idx, IndexVec};
pub use interner::{ArcStr, Interner, Name};
pub use source::Location;
pub use symtab::{Scopes, Symbol, SymbolKind, SymbolTable};
pub use types::{Ty, TyKind, TypeRegistry};
pub use value::{Address, Value};
