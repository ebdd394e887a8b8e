//! Statement and block resolution.

use super::Resolver;
use crate::diagnostic::CompileResult;
use crate::fatal;
use crate::ids::ScopeId;
use crate::symtab::Symbol;
use crate::syntax::cst;
use crate::tir::{Block, Conditional, Defer, Expr, ExprKind, Stmt, StmtKind};
use crate::types::{Ty, TyKind};
use num_bigint::BigInt;

impl<'a> Resolver<'a> {
    /// Resolve a block's statements within the given symbol table,
    /// restoring the scope, rbp offset, and defer chain afterwards.
    pub(super) fn resolve_block(
        &mut self,
        scope: ScopeId,
        block: &cst::BlockNode,
    ) -> CompileResult<Block> {
        assert!(self.current_function.is_some());

        let save_scope = self.current_scope;
        let save_rbp_offset = self.current_rbp_offset;
        let save_defer = self.current_defer;
        self.current_scope = scope;

        let mut stmts = Vec::new();
        for stmt in &block.stmts {
            if let Some(resolved) = self.resolve_stmt(stmt)? {
                stmts.push(resolved);
            }
        }

        let resolved = Block {
            location: block.location.clone(),
            scope,
            stmts,
            defer_begin: self.current_defer,
            defer_end: save_defer,
        };

        self.current_scope = save_scope;
        self.current_rbp_offset = save_rbp_offset;
        self.current_defer = save_defer;
        Ok(resolved)
    }

    /// Resolve one statement. Declarations that produce no runtime effect
    /// (constants, aliases) yield `None`.
    fn resolve_stmt(&mut self, stmt: &cst::StmtNode) -> CompileResult<Option<Stmt>> {
        assert!(!self.is_global());

        match &stmt.kind {
            cst::StmtKind::Decl(decl) => self.resolve_stmt_decl(stmt, decl),
            cst::StmtKind::Defer(body) => self.resolve_stmt_defer(stmt, body).map(Some),
            cst::StmtKind::If { conditionals } => {
                self.resolve_stmt_if(stmt, conditionals).map(Some)
            }
            cst::StmtKind::ForRange {
                identifier,
                begin,
                end,
                body,
            } => self
                .resolve_stmt_for_range(stmt, identifier, begin.as_ref(), end, body)
                .map(Some),
            cst::StmtKind::ForExpr { expr, body } => {
                self.resolve_stmt_for_expr(stmt, expr, body).map(Some)
            }
            cst::StmtKind::Break => {
                if !self.is_within_loop {
                    fatal!(stmt.location.clone(), "break statement outside of loop");
                }
                Ok(Some(Stmt::new(
                    stmt.location.clone(),
                    StmtKind::Break {
                        defer_begin: self.current_defer,
                        defer_end: self.current_loop_defer,
                    },
                )))
            }
            cst::StmtKind::Continue => {
                if !self.is_within_loop {
                    fatal!(stmt.location.clone(), "continue statement outside of loop");
                }
                Ok(Some(Stmt::new(
                    stmt.location.clone(),
                    StmtKind::Continue {
                        defer_begin: self.current_defer,
                        defer_end: self.current_loop_defer,
                    },
                )))
            }
            cst::StmtKind::Dump(expr) => {
                let resolved = self.resolve_expr(expr)?;
                if self.ctx.types.size(resolved.ty).is_none() {
                    fatal!(
                        stmt.location.clone(),
                        "type `{}` has no defined size",
                        self.ctx.type_name(resolved.ty)
                    );
                }
                Ok(Some(Stmt::new(
                    stmt.location.clone(),
                    StmtKind::Dump { expr: resolved },
                )))
            }
            cst::StmtKind::Return(expr) => self.resolve_stmt_return(stmt, expr.as_ref()).map(Some),
            cst::StmtKind::Assign { lhs, rhs } => {
                self.resolve_stmt_assign(stmt, lhs, rhs).map(Some)
            }
            cst::StmtKind::Expr(expr) => {
                let resolved = self.resolve_expr(expr)?;
                if self.ctx.types.size(resolved.ty).is_none() {
                    fatal!(
                        resolved.location.clone(),
                        "statement-expression produces result of unsized type `{}`",
                        self.ctx.type_name(resolved.ty)
                    );
                }
                Ok(Some(Stmt::new(
                    stmt.location.clone(),
                    StmtKind::Expr(resolved),
                )))
            }
        }
    }

    fn resolve_stmt_decl(
        &mut self,
        stmt: &cst::StmtNode,
        decl: &std::rc::Rc<cst::Decl>,
    ) -> CompileResult<Option<Stmt>> {
        match &decl.kind {
            // A local variable declaration lowers to an assignment of its
            // initializer.
            cst::DeclKind::Variable { .. } => {
                let (_, lhs, rhs) = self.resolve_decl_variable(decl)?;
                Ok(Some(Stmt::new(
                    stmt.location.clone(),
                    StmtKind::Assign { lhs, rhs },
                )))
            }
            cst::DeclKind::Constant { .. } => {
                self.resolve_decl_constant(decl)?;
                Ok(None)
            }
            cst::DeclKind::Alias { .. } => {
                self.resolve_decl(decl)?;
                Ok(None)
            }
            cst::DeclKind::Function { .. } => {
                fatal!(stmt.location.clone(), "nested function declaration");
            }
            cst::DeclKind::Struct { .. } => {
                fatal!(
                    decl.location.clone(),
                    "local declaration of struct `{}`",
                    self.ctx.str(decl.name())
                );
            }
            cst::DeclKind::Extend { .. } => {
                fatal!(
                    decl.location.clone(),
                    "local declaration of type extension `{}`",
                    self.ctx.str(decl.name())
                );
            }
            cst::DeclKind::ExternVariable { .. } => {
                fatal!(
                    decl.location.clone(),
                    "local declaration of extern variable `{}`",
                    self.ctx.str(decl.name())
                );
            }
            cst::DeclKind::ExternFunction { .. } => {
                fatal!(
                    decl.location.clone(),
                    "local declaration of extern function `{}`",
                    self.ctx.str(decl.name())
                );
            }
        }
    }

    fn resolve_stmt_defer(
        &mut self,
        stmt: &cst::StmtNode,
        body: &cst::BlockNode,
    ) -> CompileResult<Stmt> {
        let scope = self.ctx.scopes.alloc(Some(self.current_scope));
        let body = self.resolve_block(scope, body)?;
        self.ctx.scopes.freeze(scope);

        let defer = self.ctx.defers.push(Defer {
            prev: self.current_defer,
            body,
        });
        self.current_defer = Some(defer);

        Ok(Stmt::new(stmt.location.clone(), StmtKind::Defer(defer)))
    }

    fn resolve_stmt_if(
        &mut self,
        stmt: &cst::StmtNode,
        conditionals: &[cst::Conditional],
    ) -> CompileResult<Stmt> {
        let mut resolved_conditionals = Vec::with_capacity(conditionals.len());
        for (index, conditional) in conditionals.iter().enumerate() {
            debug_assert!(conditional.condition.is_some() || index == conditionals.len() - 1);

            let condition = match &conditional.condition {
                Some(condition) => {
                    let condition = self.resolve_expr(condition)?;
                    if condition.ty != Ty::BOOL {
                        fatal!(
                            condition.location.clone(),
                            "illegal condition with non-boolean type `{}`",
                            self.ctx.type_name(condition.ty)
                        );
                    }
                    Some(condition)
                }
                None => None,
            };

            let scope = self.ctx.scopes.alloc(Some(self.current_scope));
            let body = self.resolve_block(scope, &conditional.body)?;
            // No new symbols enter the branch table once its block is
            // resolved.
            self.ctx.scopes.freeze(scope);

            resolved_conditionals.push(Conditional {
                location: conditional.location.clone(),
                condition,
                body,
            });
        }

        Ok(Stmt::new(
            stmt.location.clone(),
            StmtKind::If {
                conditionals: resolved_conditionals,
            },
        ))
    }

    fn resolve_stmt_for_range(
        &mut self,
        stmt: &cst::StmtNode,
        identifier: &cst::Identifier,
        begin: Option<&cst::ExprNode>,
        end: &cst::ExprNode,
        body: &cst::BlockNode,
    ) -> CompileResult<Stmt> {
        let begin = match begin {
            Some(begin) => {
                let begin = self.resolve_expr(begin)?;
                let begin = self.shallow_implicit_cast(Ty::USIZE, begin)?;
                if begin.ty != Ty::USIZE {
                    fatal!(
                        begin.location.clone(),
                        "illegal range-begin-expression with non-usize type `{}`",
                        self.ctx.type_name(begin.ty)
                    );
                }
                begin
            }
            None => Expr::new(
                stmt.location.clone(),
                Ty::USIZE,
                ExprKind::Integer(BigInt::from(0)),
            ),
        };

        let end = self.resolve_expr(end)?;
        let end = self.shallow_implicit_cast(Ty::USIZE, end)?;
        if end.ty != Ty::USIZE {
            fatal!(
                end.location.clone(),
                "illegal range-end-expression with non-usize type `{}`",
                self.ctx.type_name(end.ty)
            );
        }

        // The loop variable's stack slot is released once the loop ends.
        let save_rbp_offset = self.current_rbp_offset;
        let address = self.reserve_storage_local(Ty::USIZE);
        let loop_variable = self.ctx.alloc_symbol(Symbol::new_variable(
            identifier.location.clone(),
            identifier.name,
            Ty::USIZE,
            address,
            None,
        ));

        let scope = self.ctx.scopes.alloc(Some(self.current_scope));
        self.ctx
            .scope_insert(scope, identifier.name, loop_variable, false)?;

        let save_is_within_loop = self.is_within_loop;
        let save_loop_defer = self.current_loop_defer;
        self.is_within_loop = true;
        self.current_loop_defer = self.current_defer;

        let body = self.resolve_block(scope, body)?;

        self.current_rbp_offset = save_rbp_offset;
        self.is_within_loop = save_is_within_loop;
        self.current_loop_defer = save_loop_defer;
        self.ctx.scopes.freeze(scope);

        Ok(Stmt::new(
            stmt.location.clone(),
            StmtKind::ForRange {
                loop_variable,
                begin,
                end,
                body,
            },
        ))
    }

    fn resolve_stmt_for_expr(
        &mut self,
        stmt: &cst::StmtNode,
        expr: &cst::ExprNode,
        body: &cst::BlockNode,
    ) -> CompileResult<Stmt> {
        let condition = self.resolve_expr(expr)?;
        if condition.ty != Ty::BOOL {
            fatal!(
                condition.location.clone(),
                "illegal condition with non-boolean type `{}`",
                self.ctx.type_name(condition.ty)
            );
        }

        let scope = self.ctx.scopes.alloc(Some(self.current_scope));

        let save_is_within_loop = self.is_within_loop;
        let save_loop_defer = self.current_loop_defer;
        self.is_within_loop = true;
        self.current_loop_defer = self.current_defer;

        let body = self.resolve_block(scope, body)?;

        self.is_within_loop = save_is_within_loop;
        self.current_loop_defer = save_loop_defer;
        self.ctx.scopes.freeze(scope);

        Ok(Stmt::new(
            stmt.location.clone(),
            StmtKind::ForExpr { condition, body },
        ))
    }

    fn resolve_stmt_return(
        &mut self,
        stmt: &cst::StmtNode,
        expr: Option<&cst::ExprNode>,
    ) -> CompileResult<Stmt> {
        let func = self.current_function.expect("return inside function");
        let return_type = match self.ctx.types.kind(self.ctx.functions[func].ty) {
            TyKind::Function { ret, .. } => *ret,
            _ => unreachable!("function symbol has a function type"),
        };

        let expr = match expr {
            Some(expr) => {
                let resolved = self.resolve_expr(expr)?;
                let resolved = self.shallow_implicit_cast(return_type, resolved)?;
                self.check_type_compatibility(&resolved.location, resolved.ty, return_type)?;
                Some(resolved)
            }
            None => {
                if return_type != Ty::VOID {
                    fatal!(
                        stmt.location.clone(),
                        "illegal return statement in function with non-void return type"
                    );
                }
                None
            }
        };

        Ok(Stmt::new(
            stmt.location.clone(),
            StmtKind::Return {
                expr,
                defer: self.current_defer,
            },
        ))
    }

    fn resolve_stmt_assign(
        &mut self,
        stmt: &cst::StmtNode,
        lhs: &cst::ExprNode,
        rhs: &cst::ExprNode,
    ) -> CompileResult<Stmt> {
        let lhs = self.resolve_expr(lhs)?;
        let rhs = self.resolve_expr(rhs)?;

        if !lhs.is_lvalue(self.ctx) {
            fatal!(
                lhs.location.clone(),
                "left hand side of assignment statement is not an lvalue"
            );
        }

        let rhs = self.shallow_implicit_cast(lhs.ty, rhs)?;
        self.check_type_compatibility(&stmt.location, rhs.ty, lhs.ty)?;

        Ok(Stmt::new(
            stmt.location.clone(),
            StmtKind::Assign { lhs, rhs },
        ))
    }
}
