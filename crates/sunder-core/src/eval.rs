//! Compile-time evaluation of typed IR expressions.
//!
//! The evaluator reduces any expression appearing in a position that
//! requires a compile-time value (constant initializers, global
//! initializers, array counts, folded literals) to a [`Value`], or fails
//! with a source-located diagnostic. Evaluation is pure: there are no
//! side effects, so both operands of `or`/`and` may always be evaluated.

use crate::context::Context;
use crate::diagnostic::CompileResult;
use crate::fatal;
use crate::symtab::SymbolKind;
use crate::tir::{BinaryOp, Expr, ExprKind, UnaryOp};
use crate::types::{Ty, TyKind};
use crate::value::{bigint_from_le_bytes, bigint_to_le_bytes, Address, Value};
use num_bigint::BigInt;
use num_integer::Integer as _;
use num_traits::{Signed, ToPrimitive, Zero};

/// Pure reducer of typed IR expressions against resolved symbol state.
pub struct Evaluator<'ctx> {
    ctx: &'ctx mut Context,
}

impl<'ctx> Evaluator<'ctx> {
    pub fn new(ctx: &'ctx mut Context) -> Self {
        Self { ctx }
    }

    fn integer_out_of_range(&self, ty: Ty, value: &BigInt) -> bool {
        match self.ctx.types.integer_bounds(ty) {
            Some(bounds) => *value < bounds.min || *value > bounds.max,
            None => false,
        }
    }

    /// Evaluate an expression to a value.
    pub fn eval_rvalue(&mut self, expr: &Expr) -> CompileResult<Value> {
        match &expr.kind {
            ExprKind::Symbol(symbol) => match &self.ctx.symbols[*symbol].kind {
                SymbolKind::Constant { value, .. } => Ok(value.clone()),
                SymbolKind::Function(func) => Ok(Value::Function {
                    ty: self.ctx.functions[*func].ty,
                    func: *func,
                }),
                _ => {
                    let name = self.ctx.str(self.ctx.symbols[*symbol].name);
                    fatal!(
                        expr.location.clone(),
                        "identifier `{}` is not a constant",
                        name
                    );
                }
            },

            ExprKind::Boolean(value) => Ok(Value::Boolean(*value)),

            ExprKind::Integer(value) => {
                if expr.ty == Ty::BYTE {
                    let byte = value.to_u8().expect("byte literal in range");
                    return Ok(Value::Byte(byte));
                }
                debug_assert!(self.ctx.types.is_any_integer(expr.ty));
                Ok(Value::new_integer(expr.ty, value.clone(), &self.ctx.types))
            }

            ExprKind::Bytes { address, count } => {
                let pointer_ty = self.ctx.ty_pointer(Ty::BYTE);
                let pointer = Value::Pointer {
                    ty: pointer_ty,
                    address: address.clone(),
                };
                let count = Value::new_usize(*count, &self.ctx.types);
                Ok(Value::Slice {
                    ty: expr.ty,
                    pointer: Box::new(pointer),
                    count: Box::new(count),
                })
            }

            ExprKind::ArrayList { elements, ellipsis } => {
                let count = match self.ctx.types.kind(expr.ty) {
                    TyKind::Array { count, .. } => *count,
                    _ => unreachable!("array list with non-array type"),
                };

                let mut evaled = Vec::with_capacity(count);
                for element in elements {
                    evaled.push(self.eval_rvalue(element)?);
                }
                if let Some(ellipsis) = ellipsis {
                    let fill = self.eval_rvalue(ellipsis)?;
                    while evaled.len() < count {
                        evaled.push(fill.clone());
                    }
                }
                debug_assert_eq!(evaled.len(), count);
                Ok(Value::Array {
                    ty: expr.ty,
                    elements: evaled,
                })
            }

            ExprKind::SliceList { backing, elements } => {
                let base = match self.ctx.types.kind(expr.ty) {
                    TyKind::Slice { base } => *base,
                    _ => unreachable!("slice list with non-slice type"),
                };
                let address = match self.ctx.symbol_address(*backing) {
                    Some(address) => address.clone(),
                    None => unreachable!("slice-list backing symbol has an address"),
                };
                debug_assert!(matches!(address, Address::Static { .. }));

                let pointer_ty = self.ctx.ty_pointer(base);
                let pointer = Value::Pointer {
                    ty: pointer_ty,
                    address,
                };
                let count = Value::new_usize(elements.len(), &self.ctx.types);
                Ok(Value::Slice {
                    ty: expr.ty,
                    pointer: Box::new(pointer),
                    count: Box::new(count),
                })
            }

            ExprKind::Slice { pointer, count } => {
                let pointer = self.eval_rvalue(pointer)?;
                let count = self.eval_rvalue(count)?;
                Ok(Value::Slice {
                    ty: expr.ty,
                    pointer: Box::new(pointer),
                    count: Box::new(count),
                })
            }

            ExprKind::StructLiteral { .. } => {
                fatal!(
                    expr.location.clone(),
                    "struct literal not supported in compile-time expressions"
                );
            }

            ExprKind::Cast { expr: operand } => self.eval_cast(expr, operand),

            ExprKind::Syscall { .. } => {
                fatal!(
                    expr.location.clone(),
                    "constant expression contains system call"
                );
            }

            ExprKind::Call { .. } => {
                fatal!(
                    expr.location.clone(),
                    "constant expression contains function call"
                );
            }

            ExprKind::AccessIndex { lhs, index } => {
                let lhs_value = self.eval_rvalue(lhs)?;
                let index_value = self.eval_rvalue(index)?;
                let index_uz = self.expect_usize(&index_value, &index.location)?;

                match self.ctx.types.kind(lhs_value.ty()) {
                    TyKind::Array { count, .. } => {
                        if index_uz >= *count {
                            fatal!(
                                index.location.clone(),
                                "index out-of-bounds (array count is {}, received {})",
                                count,
                                index_uz
                            );
                        }
                        match lhs_value {
                            Value::Array { elements, .. } => Ok(elements[index_uz].clone()),
                            _ => unreachable!("array-typed value is an array"),
                        }
                    }
                    // Indexing a slice is pointer dereference, which has no
                    // compile-time meaning.
                    TyKind::Slice { .. } => {
                        fatal!(
                            expr.location.clone(),
                            "indexing with left-hand-type `{}` not supported in compile-time expressions",
                            self.ctx.type_name(lhs_value.ty())
                        );
                    }
                    _ => unreachable!("index of non-array, non-slice value"),
                }
            }

            ExprKind::AccessSlice { lhs, begin, end } => {
                let lhs_ty = lhs.ty;
                let begin_value = self.eval_rvalue(begin)?;
                let end_value = self.eval_rvalue(end)?;
                let begin_uz = self.expect_usize(&begin_value, &begin.location)?;
                let end_uz = self.expect_usize(&end_value, &end.location)?;

                let count = match self.ctx.types.kind(lhs_ty) {
                    TyKind::Array { count, .. } => Some(*count),
                    TyKind::Slice { .. } => None,
                    _ => unreachable!("slice access of non-array, non-slice value"),
                };
                match count {
                    Some(count) => {
                        if begin_uz >= count {
                            fatal!(
                                begin.location.clone(),
                                "index out-of-bounds (array count is {}, received {})",
                                count,
                                begin_uz
                            );
                        }
                        if end_uz > count {
                            fatal!(
                                begin.location.clone(),
                                "index out-of-bounds (array count is {}, received {})",
                                count,
                                end_uz
                            );
                        }
                        if end_uz < begin_uz {
                            fatal!(
                                begin.location.clone(),
                                "slice end index {} is less than begin index {}",
                                end_uz,
                                begin_uz
                            );
                        }

                        let base = match self.ctx.types.kind(expr.ty) {
                            TyKind::Slice { base } => *base,
                            _ => unreachable!("slice access with non-slice type"),
                        };
                        let base_size = self.ctx.types.size(base).expect("sized slice base");

                        let mut pointer = self.eval_lvalue(lhs)?;
                        let pointer_ty = self.ctx.ty_pointer(base);
                        match &mut pointer {
                            Value::Pointer { ty, address } => {
                                *ty = pointer_ty;
                                match address {
                                    Address::Static { offset, .. } => {
                                        *offset += begin_uz * base_size;
                                    }
                                    Address::Local { .. } => {
                                        unreachable!("compile-time l-value is static")
                                    }
                                }
                            }
                            _ => unreachable!("l-value evaluation yields a pointer"),
                        }

                        let count = Value::new_usize(end_uz - begin_uz, &self.ctx.types);
                        Ok(Value::Slice {
                            ty: expr.ty,
                            pointer: Box::new(pointer),
                            count: Box::new(count),
                        })
                    }
                    // Slicing a slice is pointer dereference, which has no
                    // compile-time meaning.
                    None => {
                        fatal!(
                            expr.location.clone(),
                            "slicing with left-hand-type `{}` not supported in compile-time expressions",
                            self.ctx.type_name(lhs_ty)
                        );
                    }
                }
            }

            ExprKind::AccessMember { .. } => {
                fatal!(
                    expr.location.clone(),
                    "member access not supported in compile-time expressions"
                );
            }

            ExprKind::Sizeof { operand } => {
                let size = self.ctx.types.size(*operand).expect("sizeof sized operand");
                Ok(Value::new_usize(size, &self.ctx.types))
            }

            ExprKind::Alignof { operand } => {
                let align = self
                    .ctx
                    .types
                    .align(*operand)
                    .expect("alignof aligned operand");
                Ok(Value::new_usize(align, &self.ctx.types))
            }

            ExprKind::Unary { op, rhs } => self.eval_unary(expr, *op, rhs),

            ExprKind::Binary { op, lhs, rhs } => self.eval_binary(expr, *op, lhs, rhs),
        }
    }

    /// Evaluate an expression to a pointer at a static address.
    pub fn eval_lvalue(&mut self, expr: &Expr) -> CompileResult<Value> {
        match &expr.kind {
            ExprKind::Symbol(symbol) => {
                let address = match self.ctx.symbol_address(*symbol) {
                    Some(Address::Static { name, offset }) => Address::Static {
                        name: *name,
                        offset: *offset,
                    },
                    _ => {
                        fatal!(
                            expr.location.clone(),
                            "addressof operator applied to non-static object in compile-time expression"
                        );
                    }
                };
                let ty = self.ctx.symbol_type(*symbol).expect("addressable symbol");
                let pointer_ty = self.ctx.ty_pointer(ty);
                Ok(Value::Pointer {
                    ty: pointer_ty,
                    address,
                })
            }

            ExprKind::AccessIndex { lhs, index } => {
                let pointer = self.eval_lvalue(lhs)?;
                let index_value = self.eval_rvalue(index)?;
                let index_uz = self.expect_usize(&index_value, &index.location)?;

                let (count, element_ty) = match self.ctx.types.kind(lhs.ty) {
                    TyKind::Array { count, base } => (*count, *base),
                    _ => unreachable!("indexed l-value is an array"),
                };
                if index_uz >= count {
                    fatal!(
                        index.location.clone(),
                        "index out-of-bounds (array count is {}, received {})",
                        count,
                        index_uz
                    );
                }

                let element_size = self.ctx.types.size(element_ty).expect("sized element");
                let address = match pointer {
                    Value::Pointer {
                        address: Address::Static { name, offset },
                        ..
                    } => Address::Static {
                        name,
                        offset: offset + element_size * index_uz,
                    },
                    _ => unreachable!("compile-time l-value is static"),
                };
                let pointer_ty = self.ctx.ty_pointer(element_ty);
                Ok(Value::Pointer {
                    ty: pointer_ty,
                    address,
                })
            }

            ExprKind::AccessMember { lhs, member } => {
                let pointer = self.eval_lvalue(lhs)?;
                let member = self
                    .ctx
                    .types
                    .struct_members(lhs.ty)
                    .get(*member)
                    .cloned()
                    .expect("member index in range");

                let address = match pointer {
                    Value::Pointer {
                        address: Address::Static { name, offset },
                        ..
                    } => Address::Static {
                        name,
                        offset: offset + member.offset,
                    },
                    _ => unreachable!("compile-time l-value is static"),
                };
                let pointer_ty = self.ctx.ty_pointer(member.ty);
                Ok(Value::Pointer {
                    ty: pointer_ty,
                    address,
                })
            }

            ExprKind::Unary { op, .. } => {
                assert!(*op == UnaryOp::Dereference, "non-lvalue unary in l-value position");
                fatal!(
                    expr.location.clone(),
                    "dereference operator not supported in compile-time expressions"
                );
            }

            _ => unreachable!("non-lvalue expression in l-value evaluation"),
        }
    }

    fn eval_cast(&mut self, expr: &Expr, operand: &Expr) -> CompileResult<Value> {
        let from = self.eval_rvalue(operand)?;

        // The bit pattern of an address is chosen by the assembler/linker
        // and has no meaningful representation at compile time, so casts
        // through pointer types are rejected outright.
        if matches!(self.ctx.types.kind(from.ty()), TyKind::Pointer { .. }) {
            fatal!(
                expr.location.clone(),
                "constant expression contains cast from pointer type"
            );
        }
        if matches!(self.ctx.types.kind(expr.ty), TyKind::Pointer { .. }) {
            fatal!(
                expr.location.clone(),
                "constant expression contains cast to pointer type"
            );
        }

        let bytes = from.to_bytes(&self.ctx.types);
        match self.ctx.types.kind(expr.ty) {
            TyKind::Bool => Ok(Value::Boolean(bytes.iter().any(|&byte| byte != 0))),
            TyKind::Byte => Ok(Value::Byte(bytes[0])),
            TyKind::Integer(bounds) => {
                // Sign-extend when the source is a signed integer with its
                // top bit set, zero-extend otherwise; truncation is
                // implicit in the byte count.
                let extend = self.ctx.types.is_signed_integer(from.ty())
                    && (bytes.last().copied().unwrap_or(0) & 0x80) != 0;
                let fill = if extend { 0xffu8 } else { 0x00u8 };

                let size = self.ctx.types.size(expr.ty).expect("sized cast target");
                let mut widened = bytes;
                widened.resize(size, fill);

                let value = bigint_from_le_bytes(&widened, bounds.signed);
                Ok(Value::new_integer(expr.ty, value, &self.ctx.types))
            }
            _ => unreachable!("cast to unsupported compile-time type"),
        }
    }

    fn eval_unary(&mut self, expr: &Expr, op: UnaryOp, rhs: &Expr) -> CompileResult<Value> {
        match op {
            UnaryOp::Not => {
                let rhs = self.eval_rvalue(rhs)?;
                match rhs {
                    Value::Boolean(value) => Ok(Value::Boolean(!value)),
                    _ => unreachable!("logical not of non-bool value"),
                }
            }

            UnaryOp::Pos => {
                let rhs = self.eval_rvalue(rhs)?;
                debug_assert!(self.ctx.types.is_any_integer(rhs.ty()));
                Ok(rhs)
            }

            UnaryOp::Neg => {
                let rhs = self.eval_rvalue(rhs)?;
                let value = match &rhs {
                    Value::Integer { value, .. } => value,
                    _ => unreachable!("negation of non-integer value"),
                };
                let result = -value;
                if self.integer_out_of_range(expr.ty, &result) {
                    fatal!(
                        expr.location.clone(),
                        "arithmetic operation produces out-of-range result (-({}) == {})",
                        value,
                        result
                    );
                }
                Ok(Value::new_integer(expr.ty, result, &self.ctx.types))
            }

            UnaryOp::BitNot => {
                let rhs = self.eval_rvalue(rhs)?;
                match rhs {
                    Value::Byte(byte) => Ok(Value::Byte(!byte)),
                    Value::Integer { ty, value } => {
                        let size = self.ctx.types.size(ty).expect("sized bitwise operand");
                        let signed = self.ctx.types.is_signed_integer(ty);
                        let bytes: Vec<u8> = bigint_to_le_bytes(&value, size)
                            .iter()
                            .map(|byte| !byte)
                            .collect();
                        let result = bigint_from_le_bytes(&bytes, signed);
                        Ok(Value::new_integer(ty, result, &self.ctx.types))
                    }
                    _ => unreachable!("bitwise not of non-byte, non-integer value"),
                }
            }

            UnaryOp::Dereference => {
                fatal!(
                    expr.location.clone(),
                    "dereference operator not supported in compile-time expressions"
                );
            }

            UnaryOp::AddressOf => self.eval_lvalue(rhs),

            UnaryOp::Countof => {
                let rhs = self.eval_rvalue(rhs)?;
                match &rhs {
                    Value::Array { ty, elements } => {
                        debug_assert!(matches!(
                            self.ctx.types.kind(*ty),
                            TyKind::Array { count, .. } if *count == elements.len()
                        ));
                        Ok(Value::new_usize(elements.len(), &self.ctx.types))
                    }
                    Value::Slice { count, .. } => Ok((**count).clone()),
                    _ => unreachable!("countof non-array, non-slice value"),
                }
            }
        }
    }

    fn eval_binary(
        &mut self,
        expr: &Expr,
        op: BinaryOp,
        lhs: &Expr,
        rhs: &Expr,
    ) -> CompileResult<Value> {
        let lhs = self.eval_rvalue(lhs)?;
        let rhs = self.eval_rvalue(rhs)?;

        match op {
            BinaryOp::Or => match (&lhs, &rhs) {
                (Value::Boolean(lhs), Value::Boolean(rhs)) => Ok(Value::Boolean(*lhs || *rhs)),
                _ => unreachable!("logical or of non-bool values"),
            },
            BinaryOp::And => match (&lhs, &rhs) {
                (Value::Boolean(lhs), Value::Boolean(rhs)) => Ok(Value::Boolean(*lhs && *rhs)),
                _ => unreachable!("logical and of non-bool values"),
            },

            BinaryOp::Shl | BinaryOp::Shr => {
                fatal!(
                    expr.location.clone(),
                    "binary `{}` operator not supported in compile-time expressions",
                    op
                );
            }

            BinaryOp::Eq => self.compare_eq(expr, &lhs, &rhs).map(Value::Boolean),
            BinaryOp::Ne => self
                .compare_eq(expr, &lhs, &rhs)
                .map(|eq| Value::Boolean(!eq)),
            BinaryOp::Lt => self.compare_lt(expr, &lhs, &rhs).map(Value::Boolean),
            BinaryOp::Gt => self.compare_gt(expr, &lhs, &rhs).map(Value::Boolean),
            BinaryOp::Le => {
                let lt = self.compare_lt(expr, &lhs, &rhs)?;
                let eq = self.compare_eq(expr, &lhs, &rhs)?;
                Ok(Value::Boolean(lt || eq))
            }
            BinaryOp::Ge => {
                let gt = self.compare_gt(expr, &lhs, &rhs)?;
                let eq = self.compare_eq(expr, &lhs, &rhs)?;
                Ok(Value::Boolean(gt || eq))
            }

            BinaryOp::Add | BinaryOp::Sub | BinaryOp::Mul => {
                let (lhs_int, rhs_int) = match (&lhs, &rhs) {
                    (Value::Integer { value: lhs, .. }, Value::Integer { value: rhs, .. }) => {
                        (lhs, rhs)
                    }
                    _ => unreachable!("arithmetic on non-integer values"),
                };
                let result = match op {
                    BinaryOp::Add => lhs_int + rhs_int,
                    BinaryOp::Sub => lhs_int - rhs_int,
                    BinaryOp::Mul => lhs_int * rhs_int,
                    _ => unreachable!(),
                };
                if self.integer_out_of_range(expr.ty, &result) {
                    fatal!(
                        expr.location.clone(),
                        "arithmetic operation produces out-of-range result ({} {} {} == {})",
                        lhs_int,
                        op,
                        rhs_int,
                        result
                    );
                }
                Ok(Value::new_integer(expr.ty, result, &self.ctx.types))
            }

            BinaryOp::Div => {
                let (lhs_int, rhs_int) = match (&lhs, &rhs) {
                    (Value::Integer { value: lhs, .. }, Value::Integer { value: rhs, .. }) => {
                        (lhs, rhs)
                    }
                    _ => unreachable!("arithmetic on non-integer values"),
                };
                if rhs_int.is_zero() {
                    fatal!(
                        expr.location.clone(),
                        "divide by zero ({} / {})",
                        lhs_int,
                        rhs_int
                    );
                }
                let result = lhs_int.div_floor(rhs_int);
                if self.integer_out_of_range(expr.ty, &result) {
                    fatal!(
                        expr.location.clone(),
                        "arithmetic operation produces out-of-range result ({} / {} == {})",
                        lhs_int,
                        rhs_int,
                        result
                    );
                }
                Ok(Value::new_integer(expr.ty, result, &self.ctx.types))
            }

            BinaryOp::BitOr | BinaryOp::BitXor | BinaryOp::BitAnd => {
                self.eval_bitwise(expr, op, lhs, rhs)
            }
        }
    }

    fn eval_bitwise(
        &mut self,
        expr: &Expr,
        op: BinaryOp,
        lhs: Value,
        rhs: Value,
    ) -> CompileResult<Value> {
        match (lhs, rhs) {
            (Value::Boolean(lhs), Value::Boolean(rhs)) => {
                let result = match op {
                    BinaryOp::BitOr => lhs || rhs,
                    BinaryOp::BitXor => lhs ^ rhs,
                    BinaryOp::BitAnd => lhs && rhs,
                    _ => unreachable!(),
                };
                Ok(Value::Boolean(result))
            }
            (Value::Byte(lhs), Value::Byte(rhs)) => {
                let result = match op {
                    BinaryOp::BitOr => lhs | rhs,
                    BinaryOp::BitXor => lhs ^ rhs,
                    BinaryOp::BitAnd => lhs & rhs,
                    _ => unreachable!(),
                };
                Ok(Value::Byte(result))
            }
            (
                Value::Integer {
                    ty,
                    value: lhs_value,
                },
                Value::Integer {
                    value: rhs_value, ..
                },
            ) => {
                let size = self.ctx.types.size(ty).expect("sized bitwise operand");
                let signed = self.ctx.types.is_signed_integer(ty);
                let lhs_bytes = bigint_to_le_bytes(&lhs_value, size);
                let rhs_bytes = bigint_to_le_bytes(&rhs_value, size);
                let bytes: Vec<u8> = lhs_bytes
                    .iter()
                    .zip(rhs_bytes.iter())
                    .map(|(lhs, rhs)| match op {
                        BinaryOp::BitOr => lhs | rhs,
                        BinaryOp::BitXor => lhs ^ rhs,
                        BinaryOp::BitAnd => lhs & rhs,
                        _ => unreachable!(),
                    })
                    .collect();
                let result = bigint_from_le_bytes(&bytes, signed);
                Ok(Value::new_integer(ty, result, &self.ctx.types))
            }
            _ => unreachable!("bitwise operation on mismatched values"),
        }
    }

    fn compare_eq(&self, expr: &Expr, lhs: &Value, rhs: &Value) -> CompileResult<bool> {
        match lhs.try_eq(rhs) {
            Some(result) => Ok(result),
            None => fatal!(
                expr.location.clone(),
                "comparison of values of type `{}` not supported in compile-time expressions",
                self.ctx.type_name(lhs.ty())
            ),
        }
    }

    fn compare_lt(&self, expr: &Expr, lhs: &Value, rhs: &Value) -> CompileResult<bool> {
        match lhs.try_lt(rhs) {
            Some(result) => Ok(result),
            None => fatal!(
                expr.location.clone(),
                "comparison of values of type `{}` not supported in compile-time expressions",
                self.ctx.type_name(lhs.ty())
            ),
        }
    }

    fn compare_gt(&self, expr: &Expr, lhs: &Value, rhs: &Value) -> CompileResult<bool> {
        match lhs.try_gt(rhs) {
            Some(result) => Ok(result),
            None => fatal!(
                expr.location.clone(),
                "comparison of values of type `{}` not supported in compile-time expressions",
                self.ctx.type_name(lhs.ty())
            ),
        }
    }

    fn expect_usize(
        &self,
        value: &Value,
        location: &crate::source::Location,
    ) -> CompileResult<usize> {
        let value = match value {
            Value::Integer { value, .. } => value,
            _ => unreachable!("index value is an integer"),
        };
        debug_assert!(!value.is_negative());
        match value.to_usize() {
            Some(value) => Ok(value),
            None => fatal!(location.clone(), "index out-of-range (received {})", value),
        }
    }
}
