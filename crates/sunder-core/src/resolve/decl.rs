//! Declaration resolution and two-phase completion.

use super::{IncompleteFunction, Resolver};
use crate::diagnostic::CompileResult;
use crate::eval::Evaluator;
use crate::fatal;
use crate::ids::SymbolId;
use crate::symtab::{Symbol, SymbolKind, Template};
use crate::syntax::cst;
use crate::tir::{Expr, ExprKind, Function, StmtKind};
use crate::types::{ceil8, Ty, TyKind};
use crate::value::Address;
use std::rc::Rc;
use tracing::debug;

impl<'a> Resolver<'a> {
    pub(super) fn resolve_decl(&mut self, decl: &Rc<cst::Decl>) -> CompileResult<SymbolId> {
        match &decl.kind {
            cst::DeclKind::Variable { .. } => {
                let (symbol, _, _) = self.resolve_decl_variable(decl)?;
                Ok(symbol)
            }
            cst::DeclKind::Constant { .. } => self.resolve_decl_constant(decl),
            cst::DeclKind::Function { .. } => self.resolve_decl_function(decl),
            // Structs are resolved in the initial pre-declaration sweep.
            cst::DeclKind::Struct { .. } => unreachable!("struct reached generic resolution"),
            cst::DeclKind::Extend { .. } => self.resolve_decl_extend(decl),
            cst::DeclKind::Alias { .. } => self.resolve_decl_alias(decl),
            cst::DeclKind::ExternVariable { .. } => self.resolve_decl_extern_variable(decl),
            cst::DeclKind::ExternFunction { .. } => self.resolve_decl_extern_function(decl),
        }
    }

    /// Resolve a `var` declaration. Also returns the identifier and
    /// initializer expressions so a local declaration can lower to an
    /// assignment statement.
    pub(super) fn resolve_decl_variable(
        &mut self,
        decl: &cst::Decl,
    ) -> CompileResult<(SymbolId, Expr, Expr)> {
        let (identifier, typespec, expr) = match &decl.kind {
            cst::DeclKind::Variable {
                identifier,
                typespec,
                expr,
            } => (identifier, typespec, expr),
            _ => unreachable!(),
        };

        let resolved = self.resolve_expr(expr)?;
        let ty = match typespec {
            Some(typespec) => self.resolve_typespec(typespec)?,
            None => resolved.ty,
        };
        if self.ctx.types.size(ty).is_none() {
            fatal!(
                decl.location.clone(),
                "declaration of variable with unsized type `{}`",
                self.ctx.type_name(ty)
            );
        }

        let resolved = self.shallow_implicit_cast(ty, resolved)?;
        self.check_type_compatibility(&resolved.location, resolved.ty, ty)?;

        // Globals have their initial value computed at compile time;
        // locals compute theirs at runtime when the value lands on the
        // stack.
        let is_static = self.is_global();
        let value = if is_static {
            Some(Evaluator::new(self.ctx).eval_rvalue(&resolved)?)
        } else {
            None
        };

        let address = if is_static {
            let name = self.ctx.str(identifier.name).to_string();
            self.reserve_storage_static(&name)
        } else {
            self.reserve_storage_local(ty)
        };

        let symbol = self.ctx.alloc_symbol(Symbol::new_variable(
            decl.location.clone(),
            identifier.name,
            ty,
            address,
            value,
        ));
        let allow_shadow = !self.is_global();
        self.ctx
            .scope_insert(self.current_scope, identifier.name, symbol, allow_shadow)?;
        if is_static {
            self.ctx.register_static_symbol(symbol)?;
        }

        let lhs = Expr::new(identifier.location.clone(), ty, ExprKind::Symbol(symbol));
        Ok((symbol, lhs, resolved))
    }

    /// Resolve a `const` declaration. Every constant, global or local,
    /// has its initializer evaluated and the value frozen into the
    /// symbol.
    pub(super) fn resolve_decl_constant(&mut self, decl: &cst::Decl) -> CompileResult<SymbolId> {
        let (identifier, typespec, expr) = match &decl.kind {
            cst::DeclKind::Constant {
                identifier,
                typespec,
                expr,
            } => (identifier, typespec, expr),
            _ => unreachable!(),
        };

        self.is_within_const_decl = true;

        let resolved = self.resolve_expr(expr)?;
        let ty = match typespec {
            Some(typespec) => self.resolve_typespec(typespec)?,
            None => resolved.ty,
        };
        if self.ctx.types.size(ty).is_none() {
            fatal!(
                decl.location.clone(),
                "declaration of constant with unsized type `{}`",
                self.ctx.type_name(ty)
            );
        }

        let resolved = self.shallow_implicit_cast(ty, resolved)?;
        self.check_type_compatibility(&resolved.location, resolved.ty, ty)?;

        let value = Evaluator::new(self.ctx).eval_rvalue(&resolved)?;

        let name = self.ctx.str(identifier.name).to_string();
        let address = self.reserve_storage_static(&name);

        let symbol = self.ctx.alloc_symbol(Symbol::new_constant(
            decl.location.clone(),
            identifier.name,
            ty,
            address,
            value,
        ));
        let allow_shadow = !self.is_global();
        self.ctx
            .scope_insert(self.current_scope, identifier.name, symbol, allow_shadow)?;
        self.ctx.register_static_symbol(symbol)?;

        self.is_within_const_decl = false;

        Ok(symbol)
    }

    pub(super) fn resolve_decl_function(
        &mut self,
        decl: &Rc<cst::Decl>,
    ) -> CompileResult<SymbolId> {
        let (identifier, template_parameters, parameters, return_typespec) = match &decl.kind {
            cst::DeclKind::Function {
                identifier,
                template_parameters,
                parameters,
                return_typespec,
                ..
            } => (identifier, template_parameters, parameters, return_typespec),
            _ => unreachable!(),
        };

        // A non-empty template parameter list declares a template rather
        // than a function; the declaration is captured for instantiation.
        if !template_parameters.is_empty() {
            return self.declare_template(decl, identifier.name);
        }

        let mut parameter_types = Vec::with_capacity(parameters.len());
        for parameter in parameters {
            let ty = self.resolve_typespec(&parameter.typespec)?;
            if self.ctx.types.size(ty).is_none() {
                fatal!(
                    parameter.typespec.location.clone(),
                    "declaration of function parameter with unsized type `{}`",
                    self.ctx.type_name(ty)
                );
            }
            parameter_types.push(ty);
        }

        let return_type = self.resolve_typespec(return_typespec)?;
        if self.ctx.types.size(return_type).is_none() {
            fatal!(
                return_typespec.location.clone(),
                "declaration of function with unsized return type `{}`",
                self.ctx.type_name(return_type)
            );
        }

        let function_type = self.ctx.ty_function(parameter_types.clone(), return_type);

        let name = self.ctx.str(identifier.name).to_string();
        let address = self.reserve_storage_static(&name);

        let func = self.ctx.functions.push(Function {
            name: identifier.name,
            ty: function_type,
            address,
            parameters: Vec::new(),
            symbol_return: None,
            scope: None,
            local_stack_offset: 0,
            body: None,
            is_extern: false,
        });

        // The symbol goes into the table before the body resolves so that
        // recursive functions may reference themselves.
        let symbol = self.ctx.alloc_symbol(Symbol::new_function(
            decl.location.clone(),
            identifier.name,
            func,
        ));
        self.ctx
            .scope_insert(self.current_scope, identifier.name, symbol, false)?;
        self.ctx.register_static_symbol(symbol)?;

        // The call pushes the return address and the prelude saves rbp, so
        // parameters start 0x10 bytes above rbp, assigned right to left.
        let mut rbp_offset: i32 = 0x10;
        let mut parameter_symbols = vec![None; parameters.len()];
        for (index, parameter) in parameters.iter().enumerate().rev() {
            let ty = parameter_types[index];
            let address = Address::Local { rbp_offset };
            let size = self.ctx.types.size(ty).expect("sized parameter");
            rbp_offset += ceil8(size) as i32;

            let symbol = self.ctx.alloc_symbol(Symbol::new_variable(
                parameter.location.clone(),
                parameter.identifier.name,
                ty,
                address,
                None,
            ));
            parameter_symbols[index] = Some(symbol);
        }
        let parameter_symbols: Vec<SymbolId> = parameter_symbols
            .into_iter()
            .map(|symbol| symbol.expect("every parameter was assigned"))
            .collect();

        // Parameters are added to the outermost table left to right so a
        // duplicate-parameter error cites the left-most symbol first.
        let scope = self.ctx.scopes.alloc(Some(self.current_scope));
        self.ctx.queue_freeze(scope);
        for (parameter, &symbol) in parameters.iter().zip(parameter_symbols.iter()) {
            self.ctx
                .scope_insert(scope, parameter.identifier.name, symbol, false)?;
        }

        // The synthetic return-value symbol lives in the next slot above
        // the parameters. `return` is a keyword, so it cannot collide.
        let return_name = self.ctx.intern("return");
        let return_symbol = self.ctx.alloc_symbol(Symbol::new_variable(
            return_typespec.location.clone(),
            return_name,
            return_type,
            Address::Local { rbp_offset },
            None,
        ));
        self.ctx
            .scope_insert(scope, return_name, return_symbol, false)?;

        let function = &mut self.ctx.functions[func];
        function.parameters = parameter_symbols;
        function.symbol_return = Some(return_symbol);
        function.scope = Some(scope);

        self.incomplete_functions.push(IncompleteFunction {
            decl: Rc::clone(decl),
            func,
            scope,
        });

        Ok(symbol)
    }

    pub(super) fn resolve_decl_struct(&mut self, decl: &Rc<cst::Decl>) -> CompileResult<SymbolId> {
        let (identifier, template_parameters, members) = match &decl.kind {
            cst::DeclKind::Struct {
                identifier,
                template_parameters,
                members,
            } => (identifier, template_parameters, members),
            _ => unreachable!(),
        };

        if !template_parameters.is_empty() {
            return self.declare_template(decl, identifier.name);
        }

        let scope = self.ctx.scopes.alloc(Some(self.current_scope));
        self.ctx.queue_freeze(scope);
        let ty = self.ctx.declare_struct(identifier.name, scope);

        // The symbol is inserted before completion so that structs with
        // self-referential pointer and slice members may reference the
        // type.
        let symbol =
            self.ctx
                .alloc_symbol(Symbol::new_type(decl.location.clone(), identifier.name, ty));
        self.ctx
            .scope_insert(self.current_scope, identifier.name, symbol, false)?;

        for (index, member) in members.iter().enumerate() {
            for later in &members[index + 1..] {
                if member.name == later.name {
                    fatal!(
                        later.location.clone(),
                        "duplicate definition of member `{}`",
                        self.ctx.str(later.name)
                    );
                }
            }
        }

        Ok(symbol)
    }

    fn declare_template(
        &mut self,
        decl: &Rc<cst::Decl>,
        name: crate::interner::Name,
    ) -> CompileResult<SymbolId> {
        let instances = self.ctx.scopes.alloc(Some(self.current_scope));
        self.ctx.queue_freeze(instances);
        let template = self.ctx.templates.push(Template {
            decl: Rc::clone(decl),
            static_prefix: self.static_prefix,
            parent_scope: self.current_scope,
            instances,
        });
        let symbol =
            self.ctx
                .alloc_symbol(Symbol::new_template(decl.location.clone(), name, template));
        self.ctx
            .scope_insert(self.current_scope, name, symbol, false)?;
        Ok(symbol)
    }

    /// Resolve an `extend T decl` declaration: the declaration resolves in
    /// a throwaway scope under `T`'s label prefix and is re-parented onto
    /// the type's member table.
    fn resolve_decl_extend(&mut self, decl: &Rc<cst::Decl>) -> CompileResult<SymbolId> {
        let (typespec, inner) = match &decl.kind {
            cst::DeclKind::Extend { typespec, decl } => (typespec, decl),
            _ => unreachable!(),
        };

        if !matches!(
            inner.kind,
            cst::DeclKind::Constant { .. } | cst::DeclKind::Function { .. }
        ) {
            fatal!(
                decl.location.clone(),
                "type extension declaration must be a constant or function"
            );
        }

        let ty = self.resolve_typespec(typespec)?;

        // A scope for this declaration only, hiding the created symbol
        // from the rest of the module.
        let scope = self.ctx.scopes.alloc(Some(self.current_scope));

        let save_prefix = self.static_prefix;
        let save_scope = self.current_scope;
        let type_name = self.ctx.type_name(ty).to_string();
        self.static_prefix = Some(self.normalize(None, &type_name, 0));
        self.current_scope = scope;

        let symbol = self.resolve_decl(inner)?;
        let member_scope = self.ctx.types.get(ty).symbols;
        self.ctx
            .scope_insert(member_scope, inner.name(), symbol, false)?;

        self.static_prefix = save_prefix;
        self.current_scope = save_scope;
        self.ctx.scopes.freeze(scope);

        Ok(symbol)
    }

    /// Resolve `alias name = T;`: a new type symbol whose canonical type
    /// is the aliased type.
    fn resolve_decl_alias(&mut self, decl: &cst::Decl) -> CompileResult<SymbolId> {
        let (identifier, typespec) = match &decl.kind {
            cst::DeclKind::Alias {
                identifier,
                typespec,
            } => (identifier, typespec),
            _ => unreachable!(),
        };

        let ty = self.resolve_typespec(typespec)?;
        let name = self.ctx.types.name(ty);
        let symbol = self
            .ctx
            .alloc_symbol(Symbol::new_type(decl.location.clone(), name, ty));
        let allow_shadow = !self.is_global();
        self.ctx
            .scope_insert(self.current_scope, identifier.name, symbol, allow_shadow)?;
        Ok(symbol)
    }

    fn resolve_decl_extern_variable(&mut self, decl: &cst::Decl) -> CompileResult<SymbolId> {
        assert!(self.is_global(), "extern variable in local scope");
        let (identifier, typespec) = match &decl.kind {
            cst::DeclKind::ExternVariable {
                identifier,
                typespec,
            } => (identifier, typespec),
            _ => unreachable!(),
        };

        let ty = self.resolve_typespec(typespec)?;
        if self.ctx.types.size(ty).is_none() {
            fatal!(
                typespec.location.clone(),
                "declaration of extern variable with unsized type `{}`",
                self.ctx.type_name(ty)
            );
        }

        let name = self.ctx.str(identifier.name).to_string();
        let address = self.reserve_storage_static(&name);

        // Extern variables have no compile-time value: their definition
        // lives outside the compilation.
        let symbol = self.ctx.alloc_symbol(Symbol::new_variable(
            decl.location.clone(),
            identifier.name,
            ty,
            address,
            None,
        ));
        self.ctx
            .scope_insert(self.current_scope, identifier.name, symbol, false)?;
        self.ctx.register_static_symbol(symbol)?;

        Ok(symbol)
    }

    fn resolve_decl_extern_function(&mut self, decl: &cst::Decl) -> CompileResult<SymbolId> {
        assert!(self.is_global(), "extern function in local scope");
        let (identifier, parameters, return_typespec) = match &decl.kind {
            cst::DeclKind::ExternFunction {
                identifier,
                parameters,
                return_typespec,
            } => (identifier, parameters, return_typespec),
            _ => unreachable!(),
        };

        let mut parameter_types = Vec::with_capacity(parameters.len());
        for parameter in parameters {
            let ty = self.resolve_typespec(&parameter.typespec)?;
            if self.ctx.types.size(ty).is_none() {
                fatal!(
                    parameter.typespec.location.clone(),
                    "declaration of function parameter with unsized type `{}`",
                    self.ctx.type_name(ty)
                );
            }
            parameter_types.push(ty);
        }

        let return_type = self.resolve_typespec(return_typespec)?;
        if self.ctx.types.size(return_type).is_none() {
            fatal!(
                return_typespec.location.clone(),
                "declaration of function with unsized return type `{}`",
                self.ctx.type_name(return_type)
            );
        }

        let function_type = self.ctx.ty_function(parameter_types, return_type);

        let name = self.ctx.str(identifier.name).to_string();
        let address = self.reserve_storage_static(&name);

        let func = self.ctx.functions.push(Function {
            name: identifier.name,
            ty: function_type,
            address,
            parameters: Vec::new(),
            symbol_return: None,
            scope: None,
            local_stack_offset: 0,
            body: None,
            is_extern: true,
        });

        let symbol = self.ctx.alloc_symbol(Symbol::new_function(
            decl.location.clone(),
            identifier.name,
            func,
        ));
        self.ctx
            .scope_insert(self.current_scope, identifier.name, symbol, false)?;
        self.ctx.register_static_symbol(symbol)?;

        Ok(symbol)
    }

    /// Populate the member variables of a predeclared struct and resolve
    /// its member constants and functions within the struct's member
    /// scope, under the struct's normalized label prefix.
    pub(super) fn complete_struct(
        &mut self,
        symbol: SymbolId,
        decl: &cst::Decl,
    ) -> CompileResult<()> {
        let ty = match self.ctx.symbols[symbol].kind {
            SymbolKind::Type(ty) => ty,
            _ => unreachable!("completed struct symbol is a type"),
        };
        debug_assert!(matches!(self.ctx.types.kind(ty), TyKind::Struct(_)));
        let members = match &decl.kind {
            cst::DeclKind::Struct { members, .. } => members,
            _ => unreachable!(),
        };

        let struct_scope = self.ctx.types.get(ty).symbols;
        let save_prefix = self.static_prefix;
        let save_scope = self.current_scope;
        let type_name = self.ctx.type_name(ty).to_string();
        self.static_prefix = Some(self.normalize(None, &type_name, 0));
        self.current_scope = struct_scope;

        for member in members {
            match &member.kind {
                cst::MemberKind::Variable { typespec, .. } => {
                    let member_ty = self.resolve_typespec(typespec)?;
                    if self.ctx.types.size(member_ty).is_none() {
                        fatal!(
                            typespec.location.clone(),
                            "declaration of struct member with unsized type `{}`",
                            self.ctx.type_name(member_ty)
                        );
                    }
                    self.ctx.struct_add_member(ty, member.name, member_ty);
                }
                cst::MemberKind::Constant(decl) => {
                    self.resolve_decl_constant(decl)?;
                }
                cst::MemberKind::Function(decl) => {
                    self.resolve_decl_function(decl)?;
                }
            }
        }

        self.static_prefix = save_prefix;
        self.current_scope = save_scope;
        self.ctx.struct_finalize(ty);
        Ok(())
    }

    /// Resolve the body of a deferred function.
    pub(super) fn complete_function(
        &mut self,
        incomplete: &IncompleteFunction,
    ) -> CompileResult<()> {
        assert!(self.current_function.is_none());
        assert_eq!(self.current_rbp_offset, 0);
        assert!(!self.is_within_loop);

        let func = incomplete.func;
        debug!(function = %self.ctx.str(self.ctx.functions[func].name), "completing function");

        let save_prefix = self.static_prefix;
        let label = match &self.ctx.functions[func].address {
            Address::Static { name, .. } => *name,
            Address::Local { .. } => unreachable!("function has a static address"),
        };
        self.static_prefix = Some(label);
        self.current_function = Some(func);

        let body = match &incomplete.decl.kind {
            cst::DeclKind::Function { body, .. } => body,
            _ => unreachable!(),
        };
        let block = self.resolve_block(incomplete.scope, body)?;

        self.static_prefix = save_prefix;
        self.current_function = None;
        assert_eq!(self.current_rbp_offset, 0);

        // A non-void-returning function must end with a return statement
        // as its final top-level statement; an if/else with a return in
        // every arm does not count.
        let return_type = match self.ctx.types.kind(self.ctx.functions[func].ty) {
            TyKind::Function { ret, .. } => *ret,
            _ => unreachable!("function symbol has a function type"),
        };
        let ends_with_return = matches!(
            block.stmts.last(),
            Some(stmt) if matches!(stmt.kind, StmtKind::Return { .. })
        );
        if return_type != Ty::VOID && !ends_with_return {
            fatal!(
                incomplete.decl.location.clone(),
                "non-void-returning function does not end with a return statement"
            );
        }

        self.ctx.functions[func].body = Some(block);
        Ok(())
    }
}
