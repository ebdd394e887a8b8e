//! Expression and typespec resolution.

use super::Resolver;
use crate::diagnostic::CompileResult;
use crate::eval::Evaluator;
use crate::fatal;
use crate::source::Location;
use crate::symtab::{Symbol, SymbolKind};
use crate::syntax::cst;
use crate::tir::{BinaryOp, Expr, ExprKind, UnaryOp};
use crate::types::{Ty, TyKind};
use crate::value::{Address, Value};
use num_bigint::BigInt;
use num_traits::ToPrimitive;

impl<'a> Resolver<'a> {
    pub(super) fn resolve_expr(&mut self, expr: &cst::ExprNode) -> CompileResult<Expr> {
        match &expr.kind {
            cst::ExprKind::Symbol(path) => self.resolve_expr_symbol(expr, path),
            cst::ExprKind::Boolean(value) => Ok(Expr::new(
                expr.location.clone(),
                Ty::BOOL,
                ExprKind::Boolean(*value),
            )),
            cst::ExprKind::Integer { value, suffix } => {
                let ty = self.integer_literal_suffix_to_type(&expr.location, *suffix)?;
                self.new_integer_expr(expr.location.clone(), ty, value.clone())
            }
            cst::ExprKind::Character(value) => self.new_integer_expr(
                expr.location.clone(),
                Ty::INTEGER,
                BigInt::from(*value as u32),
            ),
            cst::ExprKind::Bytes(bytes) => self.resolve_expr_bytes(expr, bytes),
            cst::ExprKind::List {
                typespec,
                elements,
                ellipsis,
            } => self.resolve_expr_list(expr, typespec, elements, ellipsis.as_deref()),
            cst::ExprKind::Slice {
                typespec,
                pointer,
                count,
            } => self.resolve_expr_slice(expr, typespec, pointer, count),
            cst::ExprKind::Struct {
                typespec,
                initializers,
            } => self.resolve_expr_struct(expr, typespec, initializers),
            cst::ExprKind::Cast { typespec, expr: rhs } => {
                self.resolve_expr_cast(expr, typespec, rhs)
            }
            cst::ExprKind::Grouped(inner) => self.resolve_expr(inner),
            cst::ExprKind::Syscall { arguments } => self.resolve_expr_syscall(expr, arguments),
            cst::ExprKind::Call {
                function,
                arguments,
            } => self.resolve_expr_call(expr, function, arguments),
            cst::ExprKind::AccessIndex { lhs, index } => {
                self.resolve_expr_access_index(expr, lhs, index)
            }
            cst::ExprKind::AccessSlice { lhs, begin, end } => {
                self.resolve_expr_access_slice(expr, lhs, begin, end)
            }
            cst::ExprKind::AccessMember { lhs, member } => {
                self.resolve_expr_access_member(expr, lhs, member)
            }
            cst::ExprKind::AccessDereference { lhs } => {
                let lhs = self.resolve_expr(lhs)?;
                self.resolve_dereference(&expr.location, lhs)
            }
            cst::ExprKind::Sizeof(typespec) => {
                let operand = self.resolve_typespec(typespec)?;
                if self.ctx.types.size(operand).is_none() {
                    fatal!(
                        expr.location.clone(),
                        "type `{}` has no defined size",
                        self.ctx.type_name(operand)
                    );
                }
                Ok(Expr::new(
                    expr.location.clone(),
                    Ty::USIZE,
                    ExprKind::Sizeof { operand },
                ))
            }
            cst::ExprKind::Alignof(typespec) => {
                let operand = self.resolve_typespec(typespec)?;
                if self.ctx.types.align(operand).is_none() {
                    fatal!(
                        expr.location.clone(),
                        "type `{}` has no defined alignment",
                        self.ctx.type_name(operand)
                    );
                }
                Ok(Expr::new(
                    expr.location.clone(),
                    Ty::USIZE,
                    ExprKind::Alignof { operand },
                ))
            }
            cst::ExprKind::Unary { op, rhs } => self.resolve_expr_unary(op, rhs),
            cst::ExprKind::Binary { op, lhs, rhs } => self.resolve_expr_binary(op, lhs, rhs),
        }
    }

    /// Build an integer literal expression, rejecting literals outside the
    /// representable range of their type.
    fn new_integer_expr(
        &self,
        location: Location,
        ty: Ty,
        value: BigInt,
    ) -> CompileResult<Expr> {
        if ty == Ty::BYTE {
            let bounds = self
                .ctx
                .types
                .integer_bounds(Ty::U8)
                .expect("u8 bounds exist");
            if value < bounds.min {
                let min = bounds.min.clone();
                fatal!(location, "out-of-range byte literal ({} < {})", value, min);
            }
            if value > bounds.max {
                let max = bounds.max.clone();
                fatal!(location, "out-of-range byte literal ({} > {})", value, max);
            }
        } else if let Some(bounds) = self.ctx.types.integer_bounds(ty) {
            if value < bounds.min {
                let min = bounds.min.clone();
                fatal!(
                    location,
                    "out-of-range integer literal ({} < {})",
                    value,
                    min
                );
            }
            if value > bounds.max {
                let max = bounds.max.clone();
                fatal!(
                    location,
                    "out-of-range integer literal ({} > {})",
                    value,
                    max
                );
            }
        }
        Ok(Expr::new(location, ty, ExprKind::Integer(value)))
    }

    fn integer_literal_suffix_to_type(
        &self,
        location: &Location,
        suffix: crate::interner::Name,
    ) -> CompileResult<Ty> {
        let text = self.ctx.str(suffix);
        let ty = match text.as_str() {
            "" => Ty::INTEGER,
            "y" => Ty::BYTE,
            "u8" => Ty::U8,
            "s8" => Ty::S8,
            "u16" => Ty::U16,
            "s16" => Ty::S16,
            "u32" => Ty::U32,
            "s32" => Ty::S32,
            "u64" => Ty::U64,
            "s64" => Ty::S64,
            "u" => Ty::USIZE,
            "s" => Ty::SSIZE,
            _ => fatal!(
                location.clone(),
                "unknown integer literal suffix `{}`",
                text
            ),
        };
        Ok(ty)
    }

    fn resolve_expr_symbol(
        &mut self,
        expr: &cst::ExprNode,
        path: &cst::SymbolPath,
    ) -> CompileResult<Expr> {
        let symbol = self.xget_symbol(path)?;
        match &self.ctx.symbols[symbol].kind {
            SymbolKind::Type(_) | SymbolKind::Template(_) | SymbolKind::Namespace(_) => {
                fatal!(
                    expr.location.clone(),
                    "use of {} `{}` as an expression",
                    self.ctx.symbols[symbol].kind_name(),
                    self.ctx.str(self.ctx.symbols[symbol].name)
                );
            }
            SymbolKind::Variable { .. } | SymbolKind::Constant { .. } | SymbolKind::Function(_) => {
            }
        }

        let ty = self.ctx.symbol_type(symbol).expect("value symbol has a type");
        Ok(Expr::new(
            expr.location.clone(),
            ty,
            ExprKind::Symbol(symbol),
        ))
    }

    /// A bytes literal allocates a static `[N+1]byte` constant holding the
    /// bytes plus a NUL terminator (not counted in the slice length) and
    /// resolves to a `[]byte` over it.
    fn resolve_expr_bytes(&mut self, expr: &cst::ExprNode, bytes: &[u8]) -> CompileResult<Expr> {
        let address = self.reserve_storage_static("__bytes");
        let count = bytes.len();
        let array_ty = self.ctx.ty_array(count + 1, Ty::BYTE);

        let mut elements: Vec<Value> = bytes.iter().map(|&byte| Value::Byte(byte)).collect();
        elements.push(Value::Byte(0x00));
        let value = Value::Array {
            ty: array_ty,
            elements,
        };

        let label = match &address {
            Address::Static { name, .. } => *name,
            Address::Local { .. } => unreachable!("bytes storage is static"),
        };
        let symbol = self.ctx.alloc_symbol(Symbol::new_constant(
            expr.location.clone(),
            label,
            array_ty,
            address.clone(),
            value,
        ));
        self.ctx.register_static_symbol(symbol)?;

        let ty = self.ctx.ty_slice(Ty::BYTE);
        Ok(Expr::new(
            expr.location.clone(),
            ty,
            ExprKind::Bytes { address, count },
        ))
    }

    fn resolve_expr_list(
        &mut self,
        expr: &cst::ExprNode,
        typespec: &cst::Typespec,
        elements: &[cst::ExprNode],
        ellipsis: Option<&cst::ExprNode>,
    ) -> CompileResult<Expr> {
        let ty = self.resolve_typespec(typespec)?;
        let (is_array, base) = match self.ctx.types.kind(ty) {
            TyKind::Array { base, .. } => (true, *base),
            TyKind::Slice { base } => (false, *base),
            _ => fatal!(
                typespec.location.clone(),
                "expected array or slice type (received `{}`)",
                self.ctx.type_name(ty)
            ),
        };

        if is_array {
            let count = match self.ctx.types.kind(ty) {
                TyKind::Array { count, .. } => *count,
                _ => unreachable!(),
            };

            let mut resolved_elements = Vec::with_capacity(elements.len());
            for element in elements {
                let resolved = self.resolve_expr(element)?;
                let resolved = self.shallow_implicit_cast(base, resolved)?;
                self.check_type_compatibility(&resolved.location, resolved.ty, base)?;
                resolved_elements.push(resolved);
            }

            let resolved_ellipsis = match ellipsis {
                Some(ellipsis) => {
                    let resolved = self.resolve_expr(ellipsis)?;
                    let resolved = self.shallow_implicit_cast(base, resolved)?;
                    self.check_type_compatibility(&resolved.location, resolved.ty, base)?;
                    Some(Box::new(resolved))
                }
                None => None,
            };

            if resolved_ellipsis.is_none() && count != resolved_elements.len() {
                fatal!(
                    expr.location.clone(),
                    "array of type `{}` created with {} elements (expected {})",
                    self.ctx.type_name(ty),
                    resolved_elements.len(),
                    count
                );
            }

            return Ok(Expr::new(
                expr.location.clone(),
                ty,
                ExprKind::ArrayList {
                    elements: resolved_elements,
                    ellipsis: resolved_ellipsis,
                },
            ));
        }

        // Slice list: the elements live in a synthesized backing array
        // paired with the list's length.
        if let Some(ellipsis) = ellipsis {
            fatal!(
                ellipsis.location.clone(),
                "ellipsis element is not allowed in slice lists"
            );
        }

        let array_ty = self.ctx.ty_array(elements.len(), base);

        let mut resolved_elements = Vec::with_capacity(elements.len());
        for element in elements {
            let resolved = self.resolve_expr(element)?;
            let resolved = self.shallow_implicit_cast(base, resolved)?;
            self.check_type_compatibility(&resolved.location, resolved.ty, base)?;
            resolved_elements.push(resolved);
        }

        // Inside a constant declaration the backing array must itself be a
        // constant; at global scope it is a static variable; otherwise it
        // lives on the stack.
        let is_static = self.is_global() || self.is_within_const_decl;
        let array_name_text = format!("__slice_list_elements_{}", self.ctx.next_slice_list_id());
        let array_name = self.ctx.intern(&array_name_text);

        let array_value = if is_static {
            let mut values = Vec::with_capacity(resolved_elements.len());
            for element in &resolved_elements {
                values.push(Evaluator::new(self.ctx).eval_rvalue(element)?);
            }
            Some(Value::Array {
                ty: array_ty,
                elements: values,
            })
        } else {
            None
        };

        let address = if is_static {
            self.reserve_storage_static(&array_name_text)
        } else {
            self.reserve_storage_local(array_ty)
        };

        let backing = if self.is_within_const_decl {
            let value = array_value.expect("constant backing array has a value");
            self.ctx.alloc_symbol(Symbol::new_constant(
                expr.location.clone(),
                array_name,
                array_ty,
                address,
                value,
            ))
        } else {
            self.ctx.alloc_symbol(Symbol::new_variable(
                expr.location.clone(),
                array_name,
                array_ty,
                address,
                array_value,
            ))
        };
        if is_static {
            self.ctx.register_static_symbol(backing)?;
        }
        self.ctx
            .scope_insert(self.current_scope, array_name, backing, false)?;

        Ok(Expr::new(
            expr.location.clone(),
            ty,
            ExprKind::SliceList {
                backing,
                elements: resolved_elements,
            },
        ))
    }

    fn resolve_expr_slice(
        &mut self,
        expr: &cst::ExprNode,
        typespec: &cst::Typespec,
        pointer: &cst::ExprNode,
        count: &cst::ExprNode,
    ) -> CompileResult<Expr> {
        let ty = self.resolve_typespec(typespec)?;
        let base = match self.ctx.types.kind(ty) {
            TyKind::Slice { base } => *base,
            _ => fatal!(
                typespec.location.clone(),
                "expected slice type (received `{}`)",
                self.ctx.type_name(ty)
            ),
        };

        let pointer = self.resolve_expr(pointer)?;
        if !matches!(self.ctx.types.kind(pointer.ty), TyKind::Pointer { .. }) {
            fatal!(
                pointer.location.clone(),
                "expression of type `{}` is not a pointer",
                self.ctx.type_name(pointer.ty)
            );
        }
        let expected_pointer = self.ctx.ty_pointer(base);
        self.check_type_compatibility(&pointer.location, pointer.ty, expected_pointer)?;

        let count = self.resolve_expr(count)?;
        let count = self.shallow_implicit_cast(Ty::USIZE, count)?;
        self.check_type_compatibility(&count.location, count.ty, Ty::USIZE)?;

        Ok(Expr::new(
            expr.location.clone(),
            ty,
            ExprKind::Slice {
                pointer: Box::new(pointer),
                count: Box::new(count),
            },
        ))
    }

    fn resolve_expr_struct(
        &mut self,
        expr: &cst::ExprNode,
        typespec: &cst::Typespec,
        initializers: &[cst::MemberInitializer],
    ) -> CompileResult<Expr> {
        let ty = self.resolve_typespec(typespec)?;
        if !matches!(self.ctx.types.kind(ty), TyKind::Struct(_)) {
            fatal!(
                expr.location.clone(),
                "expected struct type (received `{}`)",
                self.ctx.type_name(ty)
            );
        }

        let member_defs = self.ctx.types.struct_members(ty).to_vec();

        // Initializer expressions resolve before the shape checks so the
        // user hears about malformed expressions first.
        let mut initializer_exprs = Vec::with_capacity(initializers.len());
        for initializer in initializers {
            initializer_exprs.push(self.resolve_expr(&initializer.expr)?);
        }

        let mut member_exprs: Vec<Option<Expr>> = Vec::new();
        member_exprs.resize_with(member_defs.len(), || None);

        for (initializer, resolved) in initializers.iter().zip(initializer_exprs) {
            let index = member_defs
                .iter()
                .position(|member| member.name == initializer.identifier.name);
            let index = match index {
                Some(index) => index,
                None => fatal!(
                    initializer.location.clone(),
                    "struct `{}` does not have a member variable `{}`",
                    self.ctx.type_name(ty),
                    self.ctx.str(initializer.identifier.name)
                ),
            };

            if member_exprs[index].is_some() {
                fatal!(
                    initializer.location.clone(),
                    "duplicate initializer for member variable `{}`",
                    self.ctx.str(member_defs[index].name)
                );
            }

            let member_ty = member_defs[index].ty;
            let resolved = self.shallow_implicit_cast(member_ty, resolved)?;
            self.check_type_compatibility(&resolved.location, resolved.ty, member_ty)?;
            member_exprs[index] = Some(resolved);
        }

        let mut members = Vec::with_capacity(member_exprs.len());
        for (index, member_expr) in member_exprs.into_iter().enumerate() {
            match member_expr {
                Some(member_expr) => members.push(member_expr),
                None => fatal!(
                    expr.location.clone(),
                    "missing initializer for member variable `{}`",
                    self.ctx.str(member_defs[index].name)
                ),
            }
        }

        Ok(Expr::new(
            expr.location.clone(),
            ty,
            ExprKind::StructLiteral { members },
        ))
    }

    fn resolve_expr_cast(
        &mut self,
        expr: &cst::ExprNode,
        typespec: &cst::Typespec,
        rhs: &cst::ExprNode,
    ) -> CompileResult<Expr> {
        let ty = self.resolve_typespec(typespec)?;
        let rhs = self.resolve_expr(rhs)?;

        // Casts to and from unsized types are not permitted: it is unclear
        // how narrowing should behave for a value with no fixed width.
        if self.ctx.types.size(rhs.ty).is_none() {
            fatal!(
                rhs.location.clone(),
                "invalid cast from unsized type `{}` to `{}`",
                self.ctx.type_name(rhs.ty),
                self.ctx.type_name(ty)
            );
        }
        if self.ctx.types.size(ty).is_none() {
            fatal!(
                rhs.location.clone(),
                "invalid cast to unsized type `{}` from `{}`",
                self.ctx.type_name(ty),
                self.ctx.type_name(rhs.ty)
            );
        }

        let types = &self.ctx.types;
        let scalar = |ty: Ty| {
            types.is_any_integer(ty) || matches!(types.kind(ty), TyKind::Bool | TyKind::Byte)
        };
        let valid = ty == rhs.ty
            || (scalar(ty) && scalar(rhs.ty))
            || (matches!(types.kind(ty), TyKind::Pointer { .. }) && rhs.ty == Ty::USIZE)
            || (ty == Ty::USIZE && matches!(types.kind(rhs.ty), TyKind::Pointer { .. }))
            || (matches!(types.kind(ty), TyKind::Pointer { .. })
                && matches!(types.kind(rhs.ty), TyKind::Pointer { .. }))
            || (matches!(types.kind(ty), TyKind::Function { .. })
                && matches!(types.kind(rhs.ty), TyKind::Function { .. }));
        if !valid {
            fatal!(
                rhs.location.clone(),
                "invalid cast from `{}` to `{}`",
                self.ctx.type_name(rhs.ty),
                self.ctx.type_name(ty)
            );
        }

        Ok(Expr::new(
            expr.location.clone(),
            ty,
            ExprKind::Cast {
                expr: Box::new(rhs),
            },
        ))
    }

    fn resolve_expr_syscall(
        &mut self,
        expr: &cst::ExprNode,
        arguments: &[cst::ExprNode],
    ) -> CompileResult<Expr> {
        let mut resolved_arguments = Vec::with_capacity(arguments.len());
        for argument in arguments {
            let resolved = self.resolve_expr(argument)?;
            // Bare integer literals pass through registers as usize.
            let resolved = self.shallow_implicit_cast(Ty::USIZE, resolved)?;
            if self.ctx.types.size(resolved.ty).is_none() {
                fatal!(
                    resolved.location.clone(),
                    "syscall argument with unsized type `{}`",
                    self.ctx.type_name(resolved.ty)
                );
            }
            resolved_arguments.push(resolved);
        }

        Ok(Expr::new(
            expr.location.clone(),
            Ty::SSIZE,
            ExprKind::Syscall {
                arguments: resolved_arguments,
            },
        ))
    }

    fn resolve_expr_call(
        &mut self,
        expr: &cst::ExprNode,
        function: &cst::ExprNode,
        arguments: &[cst::ExprNode],
    ) -> CompileResult<Expr> {
        // A call through a `.member` expression may be a member function
        // call with an implicit pointer-to-self argument.
        if let cst::ExprKind::AccessMember { lhs, member } = &function.kind {
            let instance = self.resolve_expr(lhs)?;
            if !instance.is_lvalue(self.ctx) {
                fatal!(
                    instance.location.clone(),
                    "attempted to call member function `{}` on non-lvalue instance of type `{}`",
                    self.ctx.str(member.identifier.name),
                    self.ctx.type_name(instance.ty)
                );
            }

            let is_member_variable = matches!(self.ctx.types.kind(instance.ty), TyKind::Struct(_))
                && self
                    .ctx
                    .types
                    .struct_member(instance.ty, member.identifier.name)
                    .is_some();
            if !is_member_variable {
                return self.resolve_member_function_call(expr, instance, member, arguments);
            }
            // A member variable that happens to have a function type is
            // invoked as a regular call below.
        }

        let function = self.resolve_expr(function)?;
        let (parameter_types, return_type) = match self.ctx.types.kind(function.ty) {
            TyKind::Function { parameters, ret } => (parameters.clone(), *ret),
            _ => fatal!(
                expr.location.clone(),
                "non-callable type `{}` used in function call expression",
                self.ctx.type_name(function.ty)
            ),
        };

        if arguments.len() != parameter_types.len() {
            fatal!(
                expr.location.clone(),
                "function with type `{}` expects {} argument(s) ({} provided)",
                self.ctx.type_name(function.ty),
                parameter_types.len(),
                arguments.len()
            );
        }

        let mut resolved_arguments = Vec::with_capacity(arguments.len());
        for argument in arguments {
            resolved_arguments.push(self.resolve_expr(argument)?);
        }
        let resolved_arguments = self.check_arguments(resolved_arguments, &parameter_types)?;

        Ok(Expr::new(
            expr.location.clone(),
            return_type,
            ExprKind::Call {
                function: Box::new(function),
                arguments: resolved_arguments,
            },
        ))
    }

    fn resolve_member_function_call(
        &mut self,
        expr: &cst::ExprNode,
        instance: Expr,
        member: &cst::SymbolElement,
        arguments: &[cst::ExprNode],
    ) -> CompileResult<Expr> {
        let member_name = member.identifier.name;
        let member_scope = self.ctx.types.get(instance.ty).symbols;
        let symbol = match self.ctx.scopes.lookup_local(member_scope, member_name) {
            Some(symbol) => symbol,
            None => fatal!(
                instance.location.clone(),
                "type `{}` has no member function `{}`",
                self.ctx.type_name(instance.ty),
                self.ctx.str(member_name)
            ),
        };

        let symbol = if matches!(self.ctx.symbols[symbol].kind, SymbolKind::Template(_)) {
            self.template_instance(&member.location, symbol, &member.template_arguments)?
        } else {
            symbol
        };

        let func = match self.ctx.symbols[symbol].kind {
            SymbolKind::Function(func) => func,
            _ => fatal!(
                instance.location.clone(),
                "type `{}` has no member function `{}`",
                self.ctx.type_name(instance.ty),
                self.ctx.str(member_name)
            ),
        };

        let function_type = self.ctx.functions[func].ty;
        let (parameter_types, return_type) = match self.ctx.types.kind(function_type) {
            TyKind::Function { parameters, ret } => (parameters.clone(), *ret),
            _ => unreachable!("function symbol has a function type"),
        };

        // The first parameter must be a pointer to the instance's type for
        // the implicit `&instance` argument to apply.
        let selfptr_type = self.ctx.ty_pointer(instance.ty);
        match parameter_types.first() {
            None => fatal!(
                instance.location.clone(),
                "expected type `{}` for the first parameter of member function `{}` of type `{}`",
                self.ctx.type_name(selfptr_type),
                self.ctx.str(member_name),
                self.ctx.type_name(instance.ty)
            ),
            Some(&first) if first != selfptr_type => fatal!(
                instance.location.clone(),
                "expected type `{}` for the first parameter of member function `{}` of type `{}` (found `{}`)",
                self.ctx.type_name(selfptr_type),
                self.ctx.str(member_name),
                self.ctx.type_name(instance.ty),
                self.ctx.type_name(first)
            ),
            Some(_) => {}
        }

        let expected_argument_count = parameter_types.len() - 1;
        if arguments.len() != expected_argument_count {
            fatal!(
                expr.location.clone(),
                "member function with type `{}` expects {} argument(s) ({} provided)",
                self.ctx.type_name(function_type),
                expected_argument_count,
                arguments.len()
            );
        }

        let mut resolved_arguments = Vec::with_capacity(arguments.len() + 1);
        resolved_arguments.push(Expr::new(
            expr.location.clone(),
            selfptr_type,
            ExprKind::Unary {
                op: UnaryOp::AddressOf,
                rhs: Box::new(instance),
            },
        ));
        for argument in arguments {
            resolved_arguments.push(self.resolve_expr(argument)?);
        }
        let resolved_arguments = self.check_arguments(resolved_arguments, &parameter_types)?;

        let function = Expr::new(
            member.identifier.location.clone(),
            function_type,
            ExprKind::Symbol(symbol),
        );
        Ok(Expr::new(
            expr.location.clone(),
            return_type,
            ExprKind::Call {
                function: Box::new(function),
                arguments: resolved_arguments,
            },
        ))
    }

    /// Implicitly cast and type-check call arguments against parameter
    /// types.
    fn check_arguments(
        &mut self,
        arguments: Vec<Expr>,
        parameter_types: &[Ty],
    ) -> CompileResult<Vec<Expr>> {
        debug_assert_eq!(arguments.len(), parameter_types.len());
        let mut checked = Vec::with_capacity(arguments.len());
        for (argument, &expected) in arguments.into_iter().zip(parameter_types.iter()) {
            let argument = self.shallow_implicit_cast(expected, argument)?;
            if argument.ty != expected {
                fatal!(
                    argument.location.clone(),
                    "incompatible argument type `{}` (expected `{}`)",
                    self.ctx.type_name(argument.ty),
                    self.ctx.type_name(expected)
                );
            }
            checked.push(argument);
        }
        Ok(checked)
    }

    fn resolve_expr_access_index(
        &mut self,
        expr: &cst::ExprNode,
        lhs: &cst::ExprNode,
        index: &cst::ExprNode,
    ) -> CompileResult<Expr> {
        let lhs = self.resolve_expr(lhs)?;
        let base = match self.ctx.types.kind(lhs.ty) {
            TyKind::Array { base, .. } | TyKind::Slice { base } => *base,
            _ => fatal!(
                lhs.location.clone(),
                "illegal index operation with left-hand-side of type `{}`",
                self.ctx.type_name(lhs.ty)
            ),
        };

        let index = self.resolve_expr(index)?;
        let index = self.shallow_implicit_cast(Ty::USIZE, index)?;
        if index.ty != Ty::USIZE {
            fatal!(
                index.location.clone(),
                "illegal index operation with index of non-usize type `{}`",
                self.ctx.type_name(index.ty)
            );
        }

        Ok(Expr::new(
            expr.location.clone(),
            base,
            ExprKind::AccessIndex {
                lhs: Box::new(lhs),
                index: Box::new(index),
            },
        ))
    }

    fn resolve_expr_access_slice(
        &mut self,
        expr: &cst::ExprNode,
        lhs: &cst::ExprNode,
        begin: &cst::ExprNode,
        end: &cst::ExprNode,
    ) -> CompileResult<Expr> {
        let lhs = self.resolve_expr(lhs)?;
        let (is_array, base) = match self.ctx.types.kind(lhs.ty) {
            TyKind::Array { base, .. } => (true, *base),
            TyKind::Slice { base } => (false, *base),
            _ => fatal!(
                lhs.location.clone(),
                "illegal slice operation with left-hand-side of type `{}`",
                self.ctx.type_name(lhs.ty)
            ),
        };
        if is_array && !lhs.is_lvalue(self.ctx) {
            fatal!(
                lhs.location.clone(),
                "left hand side of slice operation is an rvalue array"
            );
        }

        let begin = self.resolve_expr(begin)?;
        let begin = self.shallow_implicit_cast(Ty::USIZE, begin)?;
        if begin.ty != Ty::USIZE {
            fatal!(
                begin.location.clone(),
                "illegal slice operation with index of non-usize type `{}`",
                self.ctx.type_name(begin.ty)
            );
        }

        let end = self.resolve_expr(end)?;
        let end = self.shallow_implicit_cast(Ty::USIZE, end)?;
        if end.ty != Ty::USIZE {
            fatal!(
                end.location.clone(),
                "illegal slice operation with index of non-usize type `{}`",
                self.ctx.type_name(end.ty)
            );
        }

        let ty = self.ctx.ty_slice(base);
        Ok(Expr::new(
            expr.location.clone(),
            ty,
            ExprKind::AccessSlice {
                lhs: Box::new(lhs),
                begin: Box::new(begin),
                end: Box::new(end),
            },
        ))
    }

    fn resolve_expr_access_member(
        &mut self,
        expr: &cst::ExprNode,
        lhs: &cst::ExprNode,
        member: &cst::SymbolElement,
    ) -> CompileResult<Expr> {
        let lhs = self.resolve_expr(lhs)?;
        if !matches!(self.ctx.types.kind(lhs.ty), TyKind::Struct(_)) {
            fatal!(
                lhs.location.clone(),
                "attempted member access on non-struct type `{}`",
                self.ctx.type_name(lhs.ty)
            );
        }

        let member_name = member.identifier.name;

        // Member variables take precedence over member constants,
        // functions, and templates.
        if let Some((index, member_def)) = self.ctx.types.struct_member(lhs.ty, member_name) {
            let member_ty = member_def.ty;
            if !member.template_arguments.is_empty() {
                fatal!(
                    expr.location.clone(),
                    "attempted template instantiation of member variable `{}` on type `{}`",
                    self.ctx.str(member_name),
                    self.ctx.type_name(lhs.ty)
                );
            }
            return Ok(Expr::new(
                expr.location.clone(),
                member_ty,
                ExprKind::AccessMember {
                    lhs: Box::new(lhs),
                    member: index,
                },
            ));
        }

        let member_scope = self.ctx.types.get(lhs.ty).symbols;
        match self.ctx.scopes.lookup_local(member_scope, member_name) {
            Some(symbol) => {
                let kind_name = match self.ctx.symbols[symbol].kind {
                    SymbolKind::Constant { .. } => "member constant",
                    SymbolKind::Function(_) => "member function",
                    SymbolKind::Template(_) => "member template",
                    _ => "member",
                };
                fatal!(
                    expr.location.clone(),
                    "attempted to take the value of {} `{}` on type `{}`",
                    kind_name,
                    self.ctx.str(member_name),
                    self.ctx.type_name(lhs.ty)
                );
            }
            None => fatal!(
                lhs.location.clone(),
                "struct `{}` has no member `{}`",
                self.ctx.type_name(lhs.ty),
                self.ctx.str(member_name)
            ),
        }
    }

    fn resolve_dereference(&mut self, location: &Location, rhs: Expr) -> CompileResult<Expr> {
        let base = match self.ctx.types.kind(rhs.ty) {
            TyKind::Pointer { base } => *base,
            _ => fatal!(
                rhs.location.clone(),
                "cannot dereference non-pointer type `{}`",
                self.ctx.type_name(rhs.ty)
            ),
        };
        Ok(Expr::new(
            location.clone(),
            base,
            ExprKind::Unary {
                op: UnaryOp::Dereference,
                rhs: Box::new(rhs),
            },
        ))
    }

    fn resolve_expr_unary(
        &mut self,
        op: &cst::UnaryOpToken,
        rhs: &cst::ExprNode,
    ) -> CompileResult<Expr> {
        // The parser sees `-128s8` as the negation of the literal `128s8`,
        // whose positive value is out of range for s8 even though -128 is
        // representable. A sign applied directly to an integer literal is
        // absorbed into the literal itself.
        let is_sign = matches!(op.kind, cst::UnaryOpKind::Pos | cst::UnaryOpKind::Neg);
        if let (true, cst::ExprKind::Integer { value, suffix }) = (is_sign, &rhs.kind) {
            let value = if op.kind == cst::UnaryOpKind::Neg {
                -value.clone()
            } else {
                value.clone()
            };
            let ty = self.integer_literal_suffix_to_type(&rhs.location, *suffix)?;
            return self.new_integer_expr(op.location.clone(), ty, value);
        }

        let rhs = self.resolve_expr(rhs)?;
        match op.kind {
            cst::UnaryOpKind::Not => {
                if rhs.ty != Ty::BOOL {
                    fatal!(
                        op.location.clone(),
                        "invalid argument of type `{}` in unary `{}` expression",
                        self.ctx.type_name(rhs.ty),
                        op.kind
                    );
                }
                Ok(Expr::new(
                    op.location.clone(),
                    rhs.ty,
                    ExprKind::Unary {
                        op: UnaryOp::Not,
                        rhs: Box::new(rhs),
                    },
                ))
            }

            cst::UnaryOpKind::Pos | cst::UnaryOpKind::Neg => {
                if op.kind == cst::UnaryOpKind::Neg && self.ctx.types.is_unsigned_integer(rhs.ty) {
                    fatal!(
                        op.location.clone(),
                        "invalid argument of type `{}` in unary `{}` expression",
                        self.ctx.type_name(rhs.ty),
                        op.kind
                    );
                }
                if !self.ctx.types.is_any_integer(rhs.ty) {
                    fatal!(
                        op.location.clone(),
                        "invalid argument of type `{}` in unary `{}` expression",
                        self.ctx.type_name(rhs.ty),
                        op.kind
                    );
                }
                let unary_op = if op.kind == cst::UnaryOpKind::Neg {
                    UnaryOp::Neg
                } else {
                    UnaryOp::Pos
                };
                Ok(Expr::new(
                    op.location.clone(),
                    rhs.ty,
                    ExprKind::Unary {
                        op: unary_op,
                        rhs: Box::new(rhs),
                    },
                ))
            }

            cst::UnaryOpKind::BitNot => {
                if self.ctx.types.size(rhs.ty).is_none() {
                    fatal!(
                        op.location.clone(),
                        "unsized type `{}` in unary `{}` expression has no bit-representation",
                        self.ctx.type_name(rhs.ty),
                        op.kind
                    );
                }
                let valid = rhs.ty == Ty::BYTE || self.ctx.types.is_any_integer(rhs.ty);
                if !valid {
                    fatal!(
                        rhs.location.clone(),
                        "cannot apply bitwise NOT to type `{}`",
                        self.ctx.type_name(rhs.ty)
                    );
                }
                Ok(Expr::new(
                    op.location.clone(),
                    rhs.ty,
                    ExprKind::Unary {
                        op: UnaryOp::BitNot,
                        rhs: Box::new(rhs),
                    },
                ))
            }

            cst::UnaryOpKind::Dereference => self.resolve_dereference(&op.location, rhs),

            cst::UnaryOpKind::AddressOf => {
                if !rhs.is_lvalue(self.ctx) {
                    fatal!(
                        rhs.location.clone(),
                        "cannot take the address of a non-lvalue"
                    );
                }
                let ty = self.ctx.ty_pointer(rhs.ty);
                Ok(Expr::new(
                    op.location.clone(),
                    ty,
                    ExprKind::Unary {
                        op: UnaryOp::AddressOf,
                        rhs: Box::new(rhs),
                    },
                ))
            }

            cst::UnaryOpKind::Countof => {
                if !matches!(
                    self.ctx.types.kind(rhs.ty),
                    TyKind::Array { .. } | TyKind::Slice { .. }
                ) {
                    fatal!(
                        rhs.location.clone(),
                        "expected array or slice type (received `{}`)",
                        self.ctx.type_name(rhs.ty)
                    );
                }
                Ok(Expr::new(
                    op.location.clone(),
                    Ty::USIZE,
                    ExprKind::Unary {
                        op: UnaryOp::Countof,
                        rhs: Box::new(rhs),
                    },
                ))
            }
        }
    }

    fn resolve_expr_binary(
        &mut self,
        op: &cst::BinaryOpToken,
        lhs: &cst::ExprNode,
        rhs: &cst::ExprNode,
    ) -> CompileResult<Expr> {
        let lhs = self.resolve_expr(lhs)?;
        let rhs = self.resolve_expr(rhs)?;

        match op.kind {
            cst::BinaryOpKind::Or => self.resolve_binary_logical(op, BinaryOp::Or, lhs, rhs),
            cst::BinaryOpKind::And => self.resolve_binary_logical(op, BinaryOp::And, lhs, rhs),
            cst::BinaryOpKind::Shl => self.resolve_binary_shift(op, BinaryOp::Shl, lhs, rhs),
            cst::BinaryOpKind::Shr => self.resolve_binary_shift(op, BinaryOp::Shr, lhs, rhs),
            cst::BinaryOpKind::Eq => self.resolve_binary_compare(op, BinaryOp::Eq, lhs, rhs, true),
            cst::BinaryOpKind::Ne => self.resolve_binary_compare(op, BinaryOp::Ne, lhs, rhs, true),
            cst::BinaryOpKind::Le => self.resolve_binary_compare(op, BinaryOp::Le, lhs, rhs, false),
            cst::BinaryOpKind::Lt => self.resolve_binary_compare(op, BinaryOp::Lt, lhs, rhs, false),
            cst::BinaryOpKind::Ge => self.resolve_binary_compare(op, BinaryOp::Ge, lhs, rhs, false),
            cst::BinaryOpKind::Gt => self.resolve_binary_compare(op, BinaryOp::Gt, lhs, rhs, false),
            cst::BinaryOpKind::Add => self.resolve_binary_arithmetic(op, BinaryOp::Add, lhs, rhs),
            cst::BinaryOpKind::Sub => self.resolve_binary_arithmetic(op, BinaryOp::Sub, lhs, rhs),
            cst::BinaryOpKind::Mul => self.resolve_binary_arithmetic(op, BinaryOp::Mul, lhs, rhs),
            cst::BinaryOpKind::Div => self.resolve_binary_arithmetic(op, BinaryOp::Div, lhs, rhs),
            cst::BinaryOpKind::BitOr => self.resolve_binary_bitwise(op, BinaryOp::BitOr, lhs, rhs),
            cst::BinaryOpKind::BitXor => {
                self.resolve_binary_bitwise(op, BinaryOp::BitXor, lhs, rhs)
            }
            cst::BinaryOpKind::BitAnd => {
                self.resolve_binary_bitwise(op, BinaryOp::BitAnd, lhs, rhs)
            }
        }
    }

    fn resolve_binary_logical(
        &mut self,
        op: &cst::BinaryOpToken,
        binary_op: BinaryOp,
        lhs: Expr,
        rhs: Expr,
    ) -> CompileResult<Expr> {
        if lhs.ty != Ty::BOOL || rhs.ty != Ty::BOOL {
            fatal!(
                op.location.clone(),
                "invalid arguments of types `{}` and `{}` in binary `{}` expression",
                self.ctx.type_name(lhs.ty),
                self.ctx.type_name(rhs.ty),
                op.kind
            );
        }
        Ok(Expr::new(
            op.location.clone(),
            Ty::BOOL,
            ExprKind::Binary {
                op: binary_op,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
            },
        ))
    }

    fn resolve_binary_shift(
        &mut self,
        op: &cst::BinaryOpToken,
        binary_op: BinaryOp,
        lhs: Expr,
        rhs: Expr,
    ) -> CompileResult<Expr> {
        if !self.ctx.types.is_any_integer(lhs.ty) {
            fatal!(
                op.location.clone(),
                "invalid left-hand argument of type `{}` in binary `{}` expression",
                self.ctx.type_name(lhs.ty),
                op.kind
            );
        }
        if self.ctx.types.size(lhs.ty).is_none() {
            fatal!(
                op.location.clone(),
                "unsized type `{}` in binary `{}` expression has no bit-representation",
                self.ctx.type_name(lhs.ty),
                op.kind
            );
        }

        let rhs = self.shallow_implicit_cast(Ty::USIZE, rhs)?;
        if rhs.ty != Ty::USIZE {
            fatal!(
                op.location.clone(),
                "invalid non-usize right-hand argument of type `{}` in binary `{}` expression",
                self.ctx.type_name(rhs.ty),
                op.kind
            );
        }

        let ty = lhs.ty;
        Ok(Expr::new(
            op.location.clone(),
            ty,
            ExprKind::Binary {
                op: binary_op,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
            },
        ))
    }

    fn resolve_binary_compare(
        &mut self,
        op: &cst::BinaryOpToken,
        binary_op: BinaryOp,
        lhs: Expr,
        rhs: Expr,
        equality: bool,
    ) -> CompileResult<Expr> {
        let lhs = self.shallow_implicit_cast(rhs.ty, lhs)?;
        let rhs = self.shallow_implicit_cast(lhs.ty, rhs)?;

        if lhs.ty != rhs.ty {
            fatal!(
                op.location.clone(),
                "invalid arguments of types `{}` and `{}` in binary `{}` expression",
                self.ctx.type_name(lhs.ty),
                self.ctx.type_name(rhs.ty),
                op.kind
            );
        }
        let comparable = if equality {
            self.ctx.types.can_compare_equality(lhs.ty)
        } else {
            self.ctx.types.can_compare_order(lhs.ty)
        };
        if !comparable {
            fatal!(
                op.location.clone(),
                "invalid arguments of type `{}` in binary `{}` expression",
                self.ctx.type_name(lhs.ty),
                op.kind
            );
        }

        let resolved = Expr::new(
            op.location.clone(),
            Ty::BOOL,
            ExprKind::Binary {
                op: binary_op,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
            },
        );
        self.fold_integer_literals(resolved)
    }

    fn resolve_binary_arithmetic(
        &mut self,
        op: &cst::BinaryOpToken,
        binary_op: BinaryOp,
        lhs: Expr,
        rhs: Expr,
    ) -> CompileResult<Expr> {
        let lhs = self.shallow_implicit_cast(rhs.ty, lhs)?;
        let rhs = self.shallow_implicit_cast(lhs.ty, rhs)?;

        let valid = lhs.ty == rhs.ty
            && self.ctx.types.is_any_integer(lhs.ty)
            && self.ctx.types.is_any_integer(rhs.ty);
        if !valid {
            fatal!(
                op.location.clone(),
                "invalid arguments of types `{}` and `{}` in binary `{}` expression",
                self.ctx.type_name(lhs.ty),
                self.ctx.type_name(rhs.ty),
                op.kind
            );
        }

        let ty = lhs.ty;
        let resolved = Expr::new(
            op.location.clone(),
            ty,
            ExprKind::Binary {
                op: binary_op,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
            },
        );
        self.fold_integer_literals(resolved)
    }

    fn resolve_binary_bitwise(
        &mut self,
        op: &cst::BinaryOpToken,
        binary_op: BinaryOp,
        lhs: Expr,
        rhs: Expr,
    ) -> CompileResult<Expr> {
        let lhs = self.shallow_implicit_cast(rhs.ty, lhs)?;
        let rhs = self.shallow_implicit_cast(lhs.ty, rhs)?;

        if lhs.ty != rhs.ty {
            fatal!(
                op.location.clone(),
                "invalid arguments of types `{}` and `{}` in binary `{}` expression",
                self.ctx.type_name(lhs.ty),
                self.ctx.type_name(rhs.ty),
                op.kind
            );
        }
        let ty = lhs.ty;
        if self.ctx.types.size(ty).is_none() {
            fatal!(
                op.location.clone(),
                "unsized types `{}` in binary `{}` expression have no bit-representation",
                self.ctx.type_name(ty),
                op.kind
            );
        }
        let valid = matches!(self.ctx.types.kind(ty), TyKind::Bool | TyKind::Byte)
            || self.ctx.types.is_any_integer(ty);
        if !valid {
            fatal!(
                op.location.clone(),
                "invalid arguments of types `{}` and `{}` in binary `{}` expression",
                self.ctx.type_name(lhs.ty),
                self.ctx.type_name(rhs.ty),
                op.kind
            );
        }

        let resolved = Expr::new(
            op.location.clone(),
            ty,
            ExprKind::Binary {
                op: binary_op,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
            },
        );
        self.fold_integer_literals(resolved)
    }

    /// Constant-fold a binary expression over two integer literals so the
    /// result is itself a literal, preserving untypedness through
    /// algebraic expressions like `1 + 2 * 3`.
    fn fold_integer_literals(&mut self, resolved: Expr) -> CompileResult<Expr> {
        let foldable = match &resolved.kind {
            ExprKind::Binary { lhs, rhs, .. } => {
                matches!(lhs.kind, ExprKind::Integer(_))
                    && matches!(rhs.kind, ExprKind::Integer(_))
            }
            _ => false,
        };
        if !foldable {
            return Ok(resolved);
        }

        let value = Evaluator::new(self.ctx).eval_rvalue(&resolved)?;
        let folded = match value {
            Value::Boolean(value) => Expr::new(
                resolved.location,
                Ty::BOOL,
                ExprKind::Boolean(value),
            ),
            Value::Byte(value) => Expr::new(
                resolved.location,
                resolved.ty,
                ExprKind::Integer(BigInt::from(value)),
            ),
            Value::Integer { value, .. } => Expr::new(
                resolved.location,
                resolved.ty,
                ExprKind::Integer(value),
            ),
            _ => unreachable!("integer literal fold yields a scalar"),
        };
        Ok(folded)
    }

    // ========================================================================
    // Typespecs
    // ========================================================================

    /// Resolve a typespec to a canonical type via the registry.
    pub(super) fn resolve_typespec(&mut self, typespec: &cst::Typespec) -> CompileResult<Ty> {
        match &typespec.kind {
            cst::TypespecKind::Symbol(path) => {
                let symbol = self.xget_symbol(path)?;
                match &self.ctx.symbols[symbol].kind {
                    SymbolKind::Type(ty) => Ok(*ty),
                    SymbolKind::Template(_) => fatal!(
                        typespec.location.clone(),
                        "template `{}` must be instantiated",
                        self.ctx.str(self.ctx.symbols[symbol].name)
                    ),
                    _ => fatal!(
                        typespec.location.clone(),
                        "identifier `{}` is not a type",
                        self.ctx.str(self.ctx.symbols[symbol].name)
                    ),
                }
            }

            cst::TypespecKind::Function {
                parameters,
                return_typespec,
            } => {
                let mut parameter_types = Vec::with_capacity(parameters.len());
                for parameter in parameters {
                    parameter_types.push(self.resolve_typespec(parameter)?);
                }
                let return_type = self.resolve_typespec(return_typespec)?;
                Ok(self.ctx.ty_function(parameter_types, return_type))
            }

            cst::TypespecKind::Pointer(base) => {
                let base = self.resolve_typespec(base)?;
                Ok(self.ctx.ty_pointer(base))
            }

            cst::TypespecKind::Array { count, base } => {
                let count_expr = self.resolve_expr(count)?;
                let count_expr = self.shallow_implicit_cast(Ty::USIZE, count_expr)?;
                if count_expr.ty != Ty::USIZE {
                    fatal!(
                        count_expr.location.clone(),
                        "illegal array count with non-usize type `{}`",
                        self.ctx.type_name(count_expr.ty)
                    );
                }

                let count_value = Evaluator::new(self.ctx).eval_rvalue(&count_expr)?;
                let count_value = match &count_value {
                    Value::Integer { value, .. } => value,
                    _ => unreachable!("usize expression evaluates to an integer"),
                };
                let count = match count_value.to_usize() {
                    Some(count) => count,
                    None => fatal!(
                        count_expr.location.clone(),
                        "array count too large (received {})",
                        count_value
                    ),
                };

                let base = self.resolve_typespec(base)?;
                if self.ctx.types.size(base).is_none() {
                    fatal!(
                        typespec.location.clone(),
                        "array of unsized type `{}`",
                        self.ctx.type_name(base)
                    );
                }
                Ok(self.ctx.ty_array(count, base))
            }

            cst::TypespecKind::Slice(base) => {
                let base = self.resolve_typespec(base)?;
                Ok(self.ctx.ty_slice(base))
            }

            // `typeof(expr)` resolves the expression for its type without
            // evaluating it.
            cst::TypespecKind::Typeof(expr) => {
                let resolved = self.resolve_expr(expr)?;
                Ok(resolved.ty)
            }
        }
    }
}
