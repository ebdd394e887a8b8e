//! Compile-time values.
//!
//! A [`Value`] is the evaluator's interpretable mirror of a type: every
//! constant initializer, array count, and folded literal reduces to one.
//! Values are ordinary owned data; the ones that survive resolution are
//! frozen into symbols, everything else is dropped on return.

use crate::ids::FuncId;
use crate::interner::Name;
use crate::types::{Ty, TyKind, TypeRegistry};
use num_bigint::{BigInt, Sign};

/// Storage assigned to a symbol.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Address {
    /// A label plus byte offset, resolved by the assembler/linker.
    Static { name: Name, offset: usize },
    /// Stack-frame relative storage within the enclosing function.
    Local { rbp_offset: i32 },
}

/// A compile-time value.
#[derive(Debug, Clone)]
pub enum Value {
    Boolean(bool),
    Byte(u8),
    /// Invariant: for a sized integer type, `min <= value <= max`.
    Integer { ty: Ty, value: BigInt },
    Function { ty: Ty, func: FuncId },
    Pointer { ty: Ty, address: Address },
    /// Invariant: `elements.len()` equals the array type's count.
    Array { ty: Ty, elements: Vec<Value> },
    /// Invariant: `pointer` is a `Pointer` value and `count` a non-negative
    /// `usize` integer.
    Slice {
        ty: Ty,
        pointer: Box<Value>,
        count: Box<Value>,
    },
}

impl Value {
    /// Construct an integer value, checking the type's bounds invariant.
    pub fn new_integer(ty: Ty, value: BigInt, types: &TypeRegistry) -> Value {
        if let Some(bounds) = types.integer_bounds(ty) {
            debug_assert!(bounds.min <= value && value <= bounds.max);
        }
        Value::Integer { ty, value }
    }

    /// Construct a usize integer value.
    pub fn new_usize(value: usize, types: &TypeRegistry) -> Value {
        Value::new_integer(Ty::USIZE, BigInt::from(value), types)
    }

    /// The type of this value.
    pub fn ty(&self) -> Ty {
        match self {
            Value::Boolean(_) => Ty::BOOL,
            Value::Byte(_) => Ty::BYTE,
            Value::Integer { ty, .. } => *ty,
            Value::Function { ty, .. } => *ty,
            Value::Pointer { ty, .. } => *ty,
            Value::Array { ty, .. } => *ty,
            Value::Slice { ty, .. } => *ty,
        }
    }

    /// Structural equality. Defined on bool, byte, integer, and function
    /// values; `None` for pointers and aggregates, whose comparison is not
    /// supported at compile time.
    pub fn try_eq(&self, other: &Value) -> Option<bool> {
        match (self, other) {
            (Value::Boolean(lhs), Value::Boolean(rhs)) => Some(lhs == rhs),
            (Value::Byte(lhs), Value::Byte(rhs)) => Some(lhs == rhs),
            (Value::Integer { value: lhs, .. }, Value::Integer { value: rhs, .. }) => {
                Some(lhs == rhs)
            }
            (Value::Function { func: lhs, .. }, Value::Function { func: rhs, .. }) => {
                Some(lhs == rhs)
            }
            _ => None,
        }
    }

    /// Ordered comparison. Defined on bool, byte, and integer values only.
    pub fn try_lt(&self, other: &Value) -> Option<bool> {
        match (self, other) {
            (Value::Boolean(lhs), Value::Boolean(rhs)) => Some(lhs < rhs),
            (Value::Byte(lhs), Value::Byte(rhs)) => Some(lhs < rhs),
            (Value::Integer { value: lhs, .. }, Value::Integer { value: rhs, .. }) => {
                Some(lhs < rhs)
            }
            _ => None,
        }
    }

    /// Ordered comparison. Defined on bool, byte, and integer values only.
    pub fn try_gt(&self, other: &Value) -> Option<bool> {
        match (self, other) {
            (Value::Boolean(lhs), Value::Boolean(rhs)) => Some(lhs > rhs),
            (Value::Byte(lhs), Value::Byte(rhs)) => Some(lhs > rhs),
            (Value::Integer { value: lhs, .. }, Value::Integer { value: rhs, .. }) => {
                Some(lhs > rhs)
            }
            _ => None,
        }
    }

    /// Serialize this value to its little-endian in-memory byte
    /// representation. Function, pointer, and slice values have no
    /// meaningful compile-time representation; reaching them here is a
    /// compiler bug (the evaluator rejects such operations first).
    pub fn to_bytes(&self, types: &TypeRegistry) -> Vec<u8> {
        match self {
            Value::Boolean(b) => vec![u8::from(*b)],
            Value::Byte(b) => vec![*b],
            Value::Integer { ty, value } => {
                let size = types.size(*ty).expect("serialized integer is sized");
                bigint_to_le_bytes(value, size)
            }
            Value::Array { ty, elements } => {
                let base = match types.kind(*ty) {
                    TyKind::Array { base, .. } => *base,
                    _ => unreachable!("array value with non-array type"),
                };
                let element_size = types.size(base).expect("array element is sized");
                let mut bytes = Vec::with_capacity(element_size * elements.len());
                for element in elements {
                    let element_bytes = element.to_bytes(types);
                    debug_assert_eq!(element_bytes.len(), element_size);
                    bytes.extend_from_slice(&element_bytes);
                }
                bytes
            }
            Value::Function { .. } | Value::Pointer { .. } | Value::Slice { .. } => {
                unreachable!("value has no compile-time byte representation")
            }
        }
    }
}

/// Serialize a bigint to `size` bytes of little-endian two's complement.
pub fn bigint_to_le_bytes(value: &BigInt, size: usize) -> Vec<u8> {
    let mut bytes = value.to_signed_bytes_le();
    let fill = if value.sign() == Sign::Minus { 0xff } else { 0x00 };
    bytes.resize(size, fill);
    bytes
}

/// Reassemble a bigint from little-endian bytes, interpreting them as
/// signed two's complement or unsigned according to `signed`.
pub fn bigint_from_le_bytes(bytes: &[u8], signed: bool) -> BigInt {
    if signed {
        BigInt::from_signed_bytes_le(bytes)
    } else {
        BigInt::from_bytes_le(Sign::Plus, bytes)
    }
}
