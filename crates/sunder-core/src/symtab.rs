//! Symbols and lexically nested, freezable symbol tables.

use crate::ids::{FuncId, ScopeId, SymbolId, TemplateId};
use crate::index_vec::IndexVec;
use crate::interner::Name;
use crate::source::Location;
use crate::syntax::cst;
use crate::types::Ty;
use crate::value::{Address, Value};
use std::collections::HashMap;
use std::rc::Rc;

/// A named entity produced by resolution.
#[derive(Debug, Clone)]
pub struct Symbol {
    pub name: Name,
    pub location: Location,
    pub kind: SymbolKind,
}

/// The variant payload of a symbol.
#[derive(Debug, Clone)]
pub enum SymbolKind {
    Type(Ty),
    Variable {
        ty: Ty,
        address: Address,
        /// Frozen compile-time value. Present for globals, absent for
        /// locals (computed at runtime) and extern variables.
        value: Option<Value>,
    },
    Constant {
        ty: Ty,
        address: Address,
        value: Value,
    },
    Function(FuncId),
    Namespace(ScopeId),
    Template(TemplateId),
}

impl Symbol {
    pub fn new_type(location: Location, name: Name, ty: Ty) -> Self {
        Self {
            name,
            location,
            kind: SymbolKind::Type(ty),
        }
    }

    pub fn new_variable(
        location: Location,
        name: Name,
        ty: Ty,
        address: Address,
        value: Option<Value>,
    ) -> Self {
        Self {
            name,
            location,
            kind: SymbolKind::Variable { ty, address, value },
        }
    }

    pub fn new_constant(
        location: Location,
        name: Name,
        ty: Ty,
        address: Address,
        value: Value,
    ) -> Self {
        Self {
            name,
            location,
            kind: SymbolKind::Constant { ty, address, value },
        }
    }

    pub fn new_function(location: Location, name: Name, func: FuncId) -> Self {
        Self {
            name,
            location,
            kind: SymbolKind::Function(func),
        }
    }

    pub fn new_namespace(location: Location, name: Name, symbols: ScopeId) -> Self {
        Self {
            name,
            location,
            kind: SymbolKind::Namespace(symbols),
        }
    }

    pub fn new_template(location: Location, name: Name, template: TemplateId) -> Self {
        Self {
            name,
            location,
            kind: SymbolKind::Template(template),
        }
    }

    /// A short noun for diagnostics ("use of {kind} `name` ...").
    pub fn kind_name(&self) -> &'static str {
        match &self.kind {
            SymbolKind::Type(_) => "type",
            SymbolKind::Variable { .. } => "variable",
            SymbolKind::Constant { .. } => "constant",
            SymbolKind::Function(_) => "function",
            SymbolKind::Namespace(_) => "namespace",
            SymbolKind::Template(_) => "template",
        }
    }
}

/// A template declaration captured for later instantiation.
///
/// Instantiations are memoized in `instances`, keyed by the canonicalized
/// instantiation name (e.g. `box[[u32]]`), so repeated uses of the same
/// arguments resolve to the same symbol.
#[derive(Debug, Clone)]
pub struct Template {
    /// The templated function or struct declaration.
    pub decl: Rc<cst::Decl>,
    /// Static-address prefix in effect at the declaration site.
    pub static_prefix: Option<Name>,
    /// Scope the declaration was made in; instance scopes chain to it.
    pub parent_scope: ScopeId,
    /// Memoization table: instantiation name -> instance symbol.
    pub instances: ScopeId,
}

/// An ordered map from name to symbol plus a parent pointer.
///
/// Lookups walk the parent chain; `lookup_local` does not. Tables have a
/// lifecycle mutable -> frozen; inserting into a frozen table is a
/// compiler bug.
#[derive(Debug)]
pub struct SymbolTable {
    parent: Option<ScopeId>,
    names: HashMap<Name, SymbolId>,
    entries: Vec<(Name, SymbolId)>,
    frozen: bool,
}

impl SymbolTable {
    fn new(parent: Option<ScopeId>) -> Self {
        Self {
            parent,
            names: HashMap::new(),
            entries: Vec::new(),
            frozen: false,
        }
    }

    pub fn parent(&self) -> Option<ScopeId> {
        self.parent
    }

    pub fn get(&self, name: Name) -> Option<SymbolId> {
        self.names.get(&name).copied()
    }

    /// Entries in insertion order (used by namespace merging).
    pub fn entries(&self) -> &[(Name, SymbolId)] {
        &self.entries
    }

    /// Insert or shadow-replace an entry. Collision checks are performed by
    /// the caller; this only enforces the freeze lifecycle.
    pub fn insert(&mut self, name: Name, symbol: SymbolId) {
        assert!(!self.frozen, "insert into frozen symbol table");
        if let Some(slot) = self.entries.iter_mut().find(|(n, _)| *n == name) {
            slot.1 = symbol;
        } else {
            self.entries.push((name, symbol));
        }
        self.names.insert(name, symbol);
    }

    pub fn freeze(&mut self) {
        self.frozen = true;
    }

    pub fn is_frozen(&self) -> bool {
        self.frozen
    }
}

/// Pool of all symbol tables.
#[derive(Debug, Default)]
pub struct Scopes {
    tables: IndexVec<ScopeId, SymbolTable>,
}

impl Scopes {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn alloc(&mut self, parent: Option<ScopeId>) -> ScopeId {
        self.tables.push(SymbolTable::new(parent))
    }

    pub fn get(&self, scope: ScopeId) -> &SymbolTable {
        &self.tables[scope]
    }

    pub fn get_mut(&mut self, scope: ScopeId) -> &mut SymbolTable {
        &mut self.tables[scope]
    }

    /// Look up a name in this scope only.
    pub fn lookup_local(&self, scope: ScopeId, name: Name) -> Option<SymbolId> {
        self.tables[scope].get(name)
    }

    /// Look up a name in this scope, then in each enclosing scope.
    pub fn lookup(&self, scope: ScopeId, name: Name) -> Option<SymbolId> {
        let mut current = Some(scope);
        while let Some(scope) = current {
            if let Some(symbol) = self.tables[scope].get(name) {
                return Some(symbol);
            }
            current = self.tables[scope].parent();
        }
        None
    }

    pub fn freeze(&mut self, scope: ScopeId) {
        self.tables[scope].freeze();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ids::SymbolId;
    use crate::interner::Interner;

    #[test]
    fn test_lookup_walks_parents() {
        let interner = Interner::new();
        let mut scopes = Scopes::new();

        let outer = scopes.alloc(None);
        let inner = scopes.alloc(Some(outer));

        let x = interner.intern("x");
        scopes.get_mut(outer).insert(x, SymbolId::new(0));

        assert_eq!(scopes.lookup(inner, x), Some(SymbolId::new(0)));
        assert_eq!(scopes.lookup_local(inner, x), None);
        assert_eq!(scopes.lookup_local(outer, x), Some(SymbolId::new(0)));
    }

    #[test]
    fn test_shadow_replaces_entry() {
        let interner = Interner::new();
        let mut scopes = Scopes::new();

        let scope = scopes.alloc(None);
        let x = interner.intern("x");
        scopes.get_mut(scope).insert(x, SymbolId::new(0));
        scopes.get_mut(scope).insert(x, SymbolId::new(1));

        assert_eq!(scopes.lookup_local(scope, x), Some(SymbolId::new(1)));
        assert_eq!(scopes.get(scope).entries().len(), 1);
    }

    #[test]
    #[should_panic(expected = "frozen")]
    fn test_insert_into_frozen_table_panics() {
        let interner = Interner::new();
        let mut scopes = Scopes::new();

        let scope = scopes.alloc(None);
        scopes.freeze(scope);
        scopes
            .get_mut(scope)
            .insert(interner.intern("x"), SymbolId::new(0));
    }
}
