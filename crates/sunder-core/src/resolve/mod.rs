//! CST -> TIR resolution.
//!
//! One resolver runs per module. It predeclares struct types so forward
//! references work, resolves every top-level declaration in the order the
//! parser provides, completes struct bodies in a second sweep, and finally
//! resolves every deferred function body so mutually recursive functions
//! can see each other. Constant initializers, array counts, and folded
//! literals are reduced with the [`Evaluator`](crate::eval::Evaluator)
//! against the partially built symbol state.

mod decl;
mod expr;
mod stmt;

use crate::compiler::{canonical_import_path, load_module, ModuleProvider};
use crate::context::Context;
use crate::diagnostic::CompileResult;
use crate::fatal;
use crate::ids::{DeferId, FuncId, ModuleId, ScopeId, SymbolId};
use crate::interner::Name;
use crate::source::Location;
use crate::symtab::{Symbol, SymbolKind};
use crate::syntax::cst;
use crate::tir::{Expr, ExprKind};
use crate::types::{ceil8, Ty, TyKind};
use crate::value::Address;
use std::rc::Rc;
use tracing::debug;

/// A function whose body resolution has been deferred until every
/// top-level declaration of the module is resolved.
struct IncompleteFunction {
    decl: Rc<cst::Decl>,
    func: FuncId,
    scope: ScopeId,
}

/// Per-module resolution state.
pub struct Resolver<'a> {
    ctx: &'a mut Context,
    provider: &'a mut dyn ModuleProvider,
    module: ModuleId,
    /// Dotted prefix for static labels (`a.b.c` for namespace `a::b::c`,
    /// the function label inside function bodies).
    static_prefix: Option<Name>,
    /// The function whose body is being resolved, if any.
    current_function: Option<FuncId>,
    current_scope: ScopeId,
    current_export_scope: ScopeId,
    /// Running rbp offset for stack-allocated data; reset to zero at the
    /// start of each function completion.
    current_rbp_offset: i32,
    /// True inside a constant declaration. Slice-list backing arrays are
    /// declared as constants there instead of variables.
    is_within_const_decl: bool,
    is_within_loop: bool,
    /// Defer chain head captured when the innermost loop was entered.
    current_loop_defer: Option<DeferId>,
    /// Head of the defer chain in effect at the current statement.
    current_defer: Option<DeferId>,
    incomplete_functions: Vec<IncompleteFunction>,
}

/// Resolve one parsed module into the context.
pub(crate) fn resolve_module(
    ctx: &mut Context,
    provider: &mut dyn ModuleProvider,
    module: ModuleId,
    cst: &cst::Module,
) -> CompileResult<()> {
    let current_scope = ctx.modules[module].symbols;
    let current_export_scope = ctx.modules[module].exports;
    let mut resolver = Resolver {
        ctx,
        provider,
        module,
        static_prefix: None,
        current_function: None,
        current_scope,
        current_export_scope,
        current_rbp_offset: 0,
        is_within_const_decl: false,
        is_within_loop: false,
        current_loop_defer: None,
        current_defer: None,
        incomplete_functions: Vec::new(),
    };
    resolver.resolve(cst)
}

impl<'a> Resolver<'a> {
    fn resolve(&mut self, cst: &cst::Module) -> CompileResult<()> {
        debug!(module = %self.ctx.modules[self.module].path.display(), "resolving module");

        // Module namespace prelude.
        if let Some(namespace) = &cst.namespace {
            self.resolve_namespace(namespace)?;
        }

        // Imports.
        for import in &cst.imports {
            self.resolve_import(import)?;
        }

        // Structs have their symbols created before all other declarations
        // so that self referential and cross referential struct
        // declarations resolve.
        for decl in &cst.decls {
            if !matches!(decl.kind, cst::DeclKind::Struct { .. }) {
                continue;
            }
            let symbol = self.resolve_decl_struct(decl)?;
            if cst.namespace.is_none() {
                self.export_top_level(decl.name(), symbol)?;
            }
        }

        // Remaining declarations, and struct completion, in parser order.
        for decl in &cst.decls {
            if let cst::DeclKind::Struct { .. } = &decl.kind {
                let symbol = self
                    .ctx
                    .scopes
                    .lookup_local(self.current_scope, decl.name())
                    .expect("struct was predeclared");
                if matches!(self.ctx.symbols[symbol].kind, SymbolKind::Type(_)) {
                    self.complete_struct(symbol, decl)?;
                }
                continue;
            }

            let symbol = self.resolve_decl(decl)?;
            if cst.namespace.is_none() {
                self.export_top_level(decl.name(), symbol)?;
            }
        }

        // Function bodies last, so mutually recursive functions have access
        // to each other's symbols. Completing a body may instantiate
        // function templates and grow the work list.
        let mut index = 0;
        while index < self.incomplete_functions.len() {
            let incomplete = IncompleteFunction {
                decl: Rc::clone(&self.incomplete_functions[index].decl),
                func: self.incomplete_functions[index].func,
                scope: self.incomplete_functions[index].scope,
            };
            self.complete_function(&incomplete)?;
            index += 1;
        }

        Ok(())
    }

    /// Create (or join) the nested namespace symbols for a module's
    /// `namespace a::b::c;` prelude, in both the module-local table and
    /// the export table, and set the static-address prefix to `a.b.c`.
    fn resolve_namespace(&mut self, namespace: &cst::Namespace) -> CompileResult<()> {
        let mut qualified_name: Option<String> = None;
        let mut qualified_addr: Option<String> = None;

        for identifier in &namespace.identifiers {
            let text = self.ctx.str(identifier.name).to_string();
            qualified_name = Some(match &qualified_name {
                Some(prefix) => format!("{}::{}", prefix, text),
                None => text.clone(),
            });
            qualified_addr = Some(match &qualified_addr {
                Some(prefix) => format!("{}.{}", prefix, text),
                None => text,
            });

            let module_table = self.ctx.scopes.alloc(Some(self.current_scope));
            let export_table = self.ctx.scopes.alloc(Some(self.current_export_scope));
            self.ctx.queue_freeze(module_table);
            self.ctx.queue_freeze(export_table);

            // Both symbols expose the same inner table: what the module
            // declares under its namespace is exactly what it exports.
            let name = self.ctx.intern(qualified_name.as_ref().expect("set above"));
            let module_symbol = self.ctx.alloc_symbol(Symbol::new_namespace(
                identifier.location.clone(),
                name,
                module_table,
            ));
            let export_symbol = self.ctx.alloc_symbol(Symbol::new_namespace(
                identifier.location.clone(),
                name,
                module_table,
            ));
            self.ctx
                .scope_insert(self.current_scope, identifier.name, module_symbol, false)?;
            self.ctx.scope_insert(
                self.current_export_scope,
                identifier.name,
                export_symbol,
                false,
            )?;
            self.current_scope = module_table;
            self.current_export_scope = export_table;
        }

        let addr = qualified_addr.expect("namespace has at least one identifier");
        self.static_prefix = Some(self.ctx.intern(&addr));
        Ok(())
    }

    /// Add a top-level declaration of a namespace-less module to the
    /// module's export table and to the global table.
    fn export_top_level(&mut self, name: Name, symbol: SymbolId) -> CompileResult<()> {
        self.ctx
            .scope_insert(self.current_export_scope, name, symbol, false)?;
        let global = self.ctx.global_scope;
        self.ctx.scope_insert(global, name, symbol, false)
    }

    // ========================================================================
    // Imports
    // ========================================================================

    fn resolve_import(&mut self, import: &cst::Import) -> CompileResult<()> {
        self.resolve_import_file(&import.location, &import.path, false)
    }

    fn resolve_import_file(
        &mut self,
        location: &Location,
        file_name: &str,
        from_directory: bool,
    ) -> CompileResult<()> {
        let module_path = self.ctx.modules[self.module].path.clone();
        let path = match canonical_import_path(&*self.provider, &module_path, file_name) {
            Some(path) => path,
            None => fatal!(
                location.clone(),
                "failed to resolve import `{}`",
                file_name
            ),
        };

        // A directory import recursively imports its children.
        if self.provider.is_directory(&path) {
            for entry in self.provider.directory_entries(&path) {
                let child = format!("{}/{}", file_name, entry);
                self.resolve_import_file(location, &child, true)?;
            }
            return Ok(());
        }

        // Non-source files inside an imported directory are skipped so
        // that directories holding e.g. documentation still import.
        if from_directory && !file_name.ends_with(".sunder") {
            return Ok(());
        }

        let module = match self.ctx.module_by_path(&path) {
            Some(module) => module,
            None => load_module(&mut *self.ctx, &mut *self.provider, file_name, &path)?,
        };
        if !self.ctx.modules[module].loaded {
            fatal!(
                location.clone(),
                "circular dependency when importing `{}`",
                file_name
            );
        }

        debug!(import = file_name, "merging module exports");
        let dst = self.ctx.modules[self.module].symbols;
        let src = self.ctx.modules[module].exports;
        self.ctx.merge_scopes(dst, src)
    }

    // ========================================================================
    // Storage
    // ========================================================================

    /// True while resolution is performed in the global scope.
    fn is_global(&self) -> bool {
        self.current_function.is_none()
    }

    /// Reserve static storage for an object with the provided name.
    fn reserve_storage_static(&mut self, name: &str) -> Address {
        let name = self.normalize_unique(name);
        Address::Static { name, offset: 0 }
    }

    /// Reserve local storage for an object of the provided type, extending
    /// the enclosing function's stack-frame low-water mark.
    fn reserve_storage_local(&mut self, ty: Ty) -> Address {
        let size = self.ctx.types.size(ty).expect("local storage is sized");
        self.current_rbp_offset -= ceil8(size) as i32;

        let func = self.current_function.expect("local storage inside function");
        if self.current_rbp_offset < self.ctx.functions[func].local_stack_offset {
            self.ctx.functions[func].local_stack_offset = self.current_rbp_offset;
        }

        Address::Local {
            rbp_offset: self.current_rbp_offset,
        }
    }

    /// Normalize a name into an assembler-legal label: non-alphanumeric,
    /// non-underscore characters become `_`, the prefix joins with `.`,
    /// and a non-zero unique id is appended.
    fn normalize(&self, prefix: Option<Name>, name: &str, unique_id: u32) -> Name {
        let mut cleaned = String::with_capacity(name.len());
        for ch in name.chars() {
            if ch.is_ascii_alphanumeric() || ch == '_' {
                cleaned.push(ch);
            } else {
                cleaned.push('_');
            }
        }
        debug_assert!(!cleaned.is_empty());

        let mut text = String::new();
        if let Some(prefix) = prefix {
            text.push_str(&self.ctx.str(prefix));
            text.push('.');
        }
        text.push_str(&cleaned);
        if unique_id != 0 {
            text.push_str(&format!(".{}", unique_id));
        }
        self.ctx.intern(&text)
    }

    /// Normalize under the current prefix, linearly probing unique ids
    /// until the label does not collide with a registered static symbol.
    fn normalize_unique(&self, name: &str) -> Name {
        let mut unique_id = 0u32;
        loop {
            let normalized = self.normalize(self.static_prefix, name, unique_id);
            if !self.ctx.static_name_in_use(normalized) {
                return normalized;
            }
            unique_id += 1;
        }
    }

    // ========================================================================
    // Symbol lookup and templates
    // ========================================================================

    /// Resolve a `::` path to a symbol, instantiating template elements
    /// that carry argument lists, or fail fatally.
    fn xget_symbol(&mut self, target: &cst::SymbolPath) -> CompileResult<SymbolId> {
        let element = &target.elements[0];
        let scope = if target.is_from_root {
            self.ctx.modules[self.module].symbols
        } else {
            self.current_scope
        };

        let mut lhs = match self.ctx.scopes.lookup(scope, element.identifier.name) {
            Some(symbol) => symbol,
            None => fatal!(
                target.location.clone(),
                "use of undeclared identifier `{}`",
                self.ctx.str(element.identifier.name)
            ),
        };
        if !element.template_arguments.is_empty() {
            lhs = self.template_instance(&element.location, lhs, &element.template_arguments)?;
        }

        for element in &target.elements[1..] {
            let name = element.identifier.name;
            let symbol = match &self.ctx.symbols[lhs].kind {
                SymbolKind::Namespace(symbols) => {
                    let symbols = *symbols;
                    match self.ctx.scopes.lookup_local(symbols, name) {
                        Some(symbol) => symbol,
                        None => fatal!(
                            element.location.clone(),
                            "use of undeclared identifier `{}` within `{}`",
                            self.ctx.str(name),
                            self.ctx.str(self.ctx.symbols[lhs].name)
                        ),
                    }
                }
                SymbolKind::Type(ty) => {
                    let symbols = self.ctx.types.get(*ty).symbols;
                    match self.ctx.scopes.lookup_local(symbols, name) {
                        Some(symbol) => symbol,
                        None => fatal!(
                            element.location.clone(),
                            "use of undeclared identifier `{}` within `{}`",
                            self.ctx.str(name),
                            self.ctx.str(self.ctx.symbols[lhs].name)
                        ),
                    }
                }
                SymbolKind::Template(_) => fatal!(
                    element.location.clone(),
                    "template `{}` must be instantiated",
                    self.ctx.str(self.ctx.symbols[lhs].name)
                ),
                _ => fatal!(
                    element.location.clone(),
                    "`{}` is not a namespace or type",
                    self.ctx.str(self.ctx.symbols[lhs].name)
                ),
            };

            lhs = if element.template_arguments.is_empty() {
                symbol
            } else {
                self.template_instance(&element.location, symbol, &element.template_arguments)?
            };
        }

        Ok(lhs)
    }

    /// Find or create the instance of a template for the given argument
    /// typespecs.
    fn template_instance(
        &mut self,
        location: &Location,
        symbol: SymbolId,
        template_arguments: &[cst::Typespec],
    ) -> CompileResult<SymbolId> {
        let template = match &self.ctx.symbols[symbol].kind {
            SymbolKind::Template(template) => *template,
            SymbolKind::Type(_) => fatal!(
                location.clone(),
                "attempted template instantiation of non-template type `{}`",
                self.ctx.str(self.ctx.symbols[symbol].name)
            ),
            _ => fatal!(
                location.clone(),
                "attempted template instantiation of {} `{}`",
                self.ctx.symbols[symbol].kind_name(),
                self.ctx.str(self.ctx.symbols[symbol].name)
            ),
        };

        if template_arguments.is_empty() {
            fatal!(
                location.clone(),
                "template instantiation of `{}` requires a template argument list",
                self.ctx.str(self.ctx.symbols[symbol].name)
            );
        }

        let template_name = self.ctx.symbols[symbol].name;
        let template_data = self.ctx.templates[template].clone();

        let template_parameters = match &template_data.decl.kind {
            cst::DeclKind::Function {
                template_parameters,
                ..
            }
            | cst::DeclKind::Struct {
                template_parameters,
                ..
            } => template_parameters.clone(),
            _ => unreachable!("only functions and structs may be templated"),
        };

        if template_parameters.len() != template_arguments.len() {
            fatal!(
                location.clone(),
                "expected {} template argument(s) for template `{}` (received {})",
                template_parameters.len(),
                self.ctx.str(template_name),
                template_arguments.len()
            );
        }

        let mut argument_types = Vec::with_capacity(template_arguments.len());
        for argument in template_arguments {
            argument_types.push(self.resolve_typespec(argument)?);
        }

        // Canonicalize the instantiation name, e.g. `box[[u32]]`.
        let mut instance_text = self.ctx.str(template_name).to_string();
        instance_text.push_str("[[");
        for (i, &ty) in argument_types.iter().enumerate() {
            if i != 0 {
                instance_text.push_str(", ");
            }
            instance_text.push_str(&self.ctx.type_name(ty));
        }
        instance_text.push_str("]]");
        let instance_name = self.ctx.intern(&instance_text);

        // Reuse the cached instance if these arguments were seen before.
        if let Some(existing) = self
            .ctx
            .scopes
            .lookup_local(template_data.instances, instance_name)
        {
            return Ok(existing);
        }

        debug!(instance = %instance_text, "instantiating template");

        // A fresh scope binds each template parameter name to its argument
        // type, plus the template's own name so self-referential templates
        // need no qualification.
        let instance_scope = self.ctx.scopes.alloc(Some(template_data.parent_scope));
        self.ctx.queue_freeze(instance_scope);
        for (parameter, &ty) in template_parameters.iter().zip(argument_types.iter()) {
            let type_name = self.ctx.types.name(ty);
            let type_symbol = self.ctx.alloc_symbol(Symbol::new_type(
                parameter.location.clone(),
                type_name,
                ty,
            ));
            self.ctx
                .scope_insert(instance_scope, parameter.name, type_symbol, false)?;
        }
        self.ctx
            .scope_insert(instance_scope, template_name, symbol, false)?;

        // Synthesize the instance declaration: the template's CST with the
        // canonical instance name and no template parameters.
        let instance_identifier = cst::Identifier::new(location.clone(), instance_name);
        let instance_decl = match &template_data.decl.kind {
            cst::DeclKind::Function {
                parameters,
                return_typespec,
                body,
                ..
            } => Rc::new(cst::Decl::new(
                location.clone(),
                cst::DeclKind::Function {
                    identifier: instance_identifier,
                    template_parameters: Vec::new(),
                    parameters: parameters.clone(),
                    return_typespec: return_typespec.clone(),
                    body: body.clone(),
                },
            )),
            cst::DeclKind::Struct { members, .. } => Rc::new(cst::Decl::new(
                location.clone(),
                cst::DeclKind::Struct {
                    identifier: instance_identifier,
                    template_parameters: Vec::new(),
                    members: members.clone(),
                },
            )),
            _ => unreachable!("only functions and structs may be templated"),
        };

        // Resolve the instance under the captured prefix and scope.
        let save_prefix = self.static_prefix;
        let save_scope = self.current_scope;
        self.static_prefix = template_data.static_prefix;
        self.current_scope = instance_scope;

        let resolved = match &instance_decl.kind {
            cst::DeclKind::Function { .. } => self.resolve_decl_function(&instance_decl),
            cst::DeclKind::Struct { .. } => self.resolve_decl_struct(&instance_decl),
            _ => unreachable!(),
        };

        self.static_prefix = save_prefix;
        self.current_scope = save_scope;
        let resolved = resolved?;

        // Cache before completion: a struct instance that references
        // itself through a pointer member must find itself in the memo
        // table instead of recursing forever.
        self.ctx
            .scope_insert(template_data.instances, instance_name, resolved, false)?;

        if matches!(instance_decl.kind, cst::DeclKind::Struct { .. }) {
            self.complete_struct(resolved, &instance_decl)?;
        }

        Ok(resolved)
    }

    // ========================================================================
    // Type compatibility
    // ========================================================================

    fn check_type_compatibility(
        &self,
        location: &Location,
        actual: Ty,
        expected: Ty,
    ) -> CompileResult<()> {
        if actual != expected {
            fatal!(
                location.clone(),
                "incompatible type `{}` (expected `{}`)",
                self.ctx.type_name(actual),
                self.ctx.type_name(expected)
            );
        }
        Ok(())
    }

    /// Attempt one shallow, value-preserving implicit cast of `expr` to
    /// `ty`. No recursion into sub-expressions is performed; when no
    /// implicit cast applies the expression is returned unchanged and a
    /// subsequent compatibility check reports the mismatch.
    fn shallow_implicit_cast(&mut self, ty: Ty, expr: Expr) -> CompileResult<Expr> {
        // FROM type TO the same type.
        if ty == expr.ty {
            return Ok(expr);
        }

        // FROM untyped integer TO byte or a sized integer, bounds-checked.
        if expr.ty == Ty::INTEGER
            && (ty == Ty::BYTE || self.ctx.types.is_integer(ty))
        {
            let value = match &expr.kind {
                ExprKind::Integer(value) => value.clone(),
                // Only literal integers are rewritten; anything else falls
                // through to the compatibility check.
                _ => return Ok(expr),
            };

            let bounds_ty = if ty == Ty::BYTE { Ty::U8 } else { ty };
            let bounds = self
                .ctx
                .types
                .integer_bounds(bounds_ty)
                .expect("sized integer bounds");
            if value < bounds.min {
                let min = bounds.min.clone();
                fatal!(
                    expr.location.clone(),
                    "out-of-range conversion from `{}` to `{}` ({} < {})",
                    self.ctx.type_name(expr.ty),
                    self.ctx.type_name(ty),
                    value,
                    min
                );
            }
            if value > bounds.max {
                let max = bounds.max.clone();
                fatal!(
                    expr.location.clone(),
                    "out-of-range conversion from `{}` to `{}` ({} > {})",
                    self.ctx.type_name(expr.ty),
                    self.ctx.type_name(ty),
                    value,
                    max
                );
            }

            return Ok(Expr::new(expr.location, ty, ExprKind::Integer(value)));
        }

        // FROM non-any pointer TO any pointer.
        let target_is_any_pointer =
            matches!(self.ctx.types.kind(ty), TyKind::Pointer { base } if *base == Ty::ANY);
        let source_is_non_any_pointer =
            matches!(self.ctx.types.kind(expr.ty), TyKind::Pointer { base } if *base != Ty::ANY);
        if target_is_any_pointer && source_is_non_any_pointer {
            let location = expr.location.clone();
            return Ok(Expr::new(
                location,
                ty,
                ExprKind::Cast {
                    expr: Box::new(expr),
                },
            ));
        }

        // FROM function with typed pointers TO function with any pointers.
        let function_types = match (self.ctx.types.kind(ty), self.ctx.types.kind(expr.ty)) {
            (
                TyKind::Function {
                    parameters: target_parameters,
                    ret: target_ret,
                },
                TyKind::Function {
                    parameters: source_parameters,
                    ret: source_ret,
                },
            ) => Some((
                target_parameters.clone(),
                *target_ret,
                source_parameters.clone(),
                *source_ret,
            )),
            _ => None,
        };
        if let Some((target_parameters, target_ret, source_parameters, source_ret)) =
            function_types
        {
            if target_parameters.len() != source_parameters.len() {
                return Ok(expr);
            }

            let convertible = |types: &crate::types::TypeRegistry, target: Ty, source: Ty| {
                target == source
                    || (matches!(types.kind(target), TyKind::Pointer { base } if *base == Ty::ANY)
                        && matches!(types.kind(source), TyKind::Pointer { base } if *base != Ty::ANY))
            };

            let parameters_convert = target_parameters
                .iter()
                .zip(source_parameters.iter())
                .all(|(&target, &source)| convertible(&self.ctx.types, target, source));
            if !parameters_convert || !convertible(&self.ctx.types, target_ret, source_ret) {
                return Ok(expr);
            }

            let location = expr.location.clone();
            return Ok(Expr::new(
                location,
                ty,
                ExprKind::Cast {
                    expr: Box::new(expr),
                },
            ));
        }

        // No implicit cast applies.
        Ok(expr)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compiler::MemoryModuleProvider;
    use num_bigint::BigInt;
    use std::path::Path;

    fn with_resolver<R>(f: impl FnOnce(&mut Resolver) -> R) -> R {
        let mut ctx = Context::new();
        let mut provider = MemoryModuleProvider::new();
        let module = ctx.add_module("test", Path::new("/test.sunder"));
        let current_scope = ctx.modules[module].symbols;
        let current_export_scope = ctx.modules[module].exports;
        let mut resolver = Resolver {
            ctx: &mut ctx,
            provider: &mut provider,
            module,
            static_prefix: None,
            current_function: None,
            current_scope,
            current_export_scope,
            current_rbp_offset: 0,
            is_within_const_decl: false,
            is_within_loop: false,
            current_loop_defer: None,
            current_defer: None,
            incomplete_functions: Vec::new(),
        };
        f(&mut resolver)
    }

    fn location() -> Location {
        Location::new("test.sunder", 1, 1)
    }

    #[test]
    fn test_normalize_replaces_illegal_label_characters() {
        with_resolver(|resolver| {
            let prefix = resolver.ctx.intern("a.b");
            let normalized = resolver.normalize(Some(prefix), "foo[[u64]]", 0);
            assert_eq!(*resolver.ctx.str(normalized), "a.b.foo__u64__");

            let with_id = resolver.normalize(Some(prefix), "foo", 2);
            assert_eq!(*resolver.ctx.str(with_id), "a.b.foo.2");

            let bare = resolver.normalize(None, "bar", 0);
            assert_eq!(*resolver.ctx.str(bare), "bar");
        });
    }

    #[test]
    fn test_implicit_cast_rewrites_untyped_literal() {
        with_resolver(|resolver| {
            let literal = Expr::new(
                location(),
                Ty::INTEGER,
                ExprKind::Integer(BigInt::from(200)),
            );
            let cast = resolver.shallow_implicit_cast(Ty::U8, literal).unwrap();
            assert_eq!(cast.ty, Ty::U8);
            assert!(matches!(cast.kind, ExprKind::Integer(_)));

            let literal = Expr::new(
                location(),
                Ty::INTEGER,
                ExprKind::Integer(BigInt::from(300)),
            );
            let err = resolver.shallow_implicit_cast(Ty::U8, literal).unwrap_err();
            assert_eq!(
                err.message,
                "out-of-range conversion from `integer` to `u8` (300 > 255)"
            );
        });
    }

    #[test]
    fn test_implicit_cast_wraps_pointer_to_any() {
        with_resolver(|resolver| {
            let u32_pointer = resolver.ctx.ty_pointer(Ty::U32);
            let any_pointer = resolver.ctx.ty_pointer(Ty::ANY);

            // A placeholder pointer-typed operand; only its type matters.
            let name = resolver.ctx.intern("p");
            let symbol = resolver.ctx.alloc_symbol(Symbol::new_variable(
                location(),
                name,
                u32_pointer,
                Address::Local { rbp_offset: -8 },
                None,
            ));
            let operand = Expr::new(location(), u32_pointer, ExprKind::Symbol(symbol));

            let cast = resolver
                .shallow_implicit_cast(any_pointer, operand)
                .unwrap();
            assert_eq!(cast.ty, any_pointer);
            assert!(matches!(cast.kind, ExprKind::Cast { .. }));

            // No implicit cast between unrelated pointer types.
            let u64_pointer = resolver.ctx.ty_pointer(Ty::U64);
            let operand = Expr::new(location(), u32_pointer, ExprKind::Symbol(symbol));
            let unchanged = resolver
                .shallow_implicit_cast(u64_pointer, operand)
                .unwrap();
            assert_eq!(unchanged.ty, u32_pointer);
        });
    }

    #[test]
    fn test_unique_labels_probe_sequential_ids() {
        with_resolver(|resolver| {
            let first = resolver.reserve_storage_static("x");
            let symbol = resolver.ctx.alloc_symbol(Symbol::new_variable(
                location(),
                resolver.ctx.intern("x"),
                Ty::U32,
                first,
                None,
            ));
            resolver.ctx.register_static_symbol(symbol).unwrap();

            let second = resolver.reserve_storage_static("x");
            match second {
                Address::Static { name, .. } => {
                    assert_eq!(*resolver.ctx.str(name), "x.1");
                }
                Address::Local { .. } => panic!("static reservation yields a static address"),
            }
        });
    }
}
