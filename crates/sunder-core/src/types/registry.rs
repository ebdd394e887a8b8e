//! Canonical type registry.
//!
//! The registry is keyed on the canonical type name: constructing a type
//! probes the registry, discards the candidate on a hit, and publishes it
//! on a miss. Struct types are the exception: they have nominal identity
//! and are never deduplicated by name.

use super::{IntegerTy, StructTy, Ty, TyKind, TypeData, POINTER_SIZE};
use crate::interner::{Interner, Name};
use crate::index_vec::IndexVec;
use crate::symtab::Scopes;
use num_bigint::BigInt;
use std::collections::HashMap;

/// Type registry that deduplicates types by canonical name.
#[derive(Debug)]
pub struct TypeRegistry {
    /// All interned types.
    types: IndexVec<Ty, TypeData>,
    /// Map from canonical name to its interned handle. Struct types are
    /// intentionally absent: their identity is nominal.
    by_name: HashMap<Name, Ty>,
}

impl TypeRegistry {
    /// Create a registry with all builtin types pre-interned at the `Ty`
    /// constants.
    pub fn bootstrap(interner: &Interner, scopes: &mut Scopes) -> Self {
        let mut registry = Self {
            types: IndexVec::new(),
            by_name: HashMap::new(),
        };

        let mut builtin = |registry: &mut Self, name: &str, size, align, kind| {
            let data = TypeData {
                name: interner.intern(name),
                size,
                align,
                symbols: scopes.alloc(None),
                kind,
            };
            registry.insert(data)
        };

        let unsigned = |bits: u32| {
            TyKind::Integer(IntegerTy {
                signed: false,
                min: BigInt::from(0),
                max: (BigInt::from(1) << bits) - 1,
            })
        };
        let signed = |bits: u32| {
            TyKind::Integer(IntegerTy {
                signed: true,
                min: -(BigInt::from(1) << (bits - 1)),
                max: (BigInt::from(1) << (bits - 1)) - 1,
            })
        };

        // These MUST match the Ty::* constants.
        assert_eq!(
            builtin(&mut registry, "void", Some(0), Some(0), TyKind::Void),
            Ty::VOID
        );
        assert_eq!(
            builtin(&mut registry, "bool", Some(1), Some(1), TyKind::Bool),
            Ty::BOOL
        );
        assert_eq!(
            builtin(&mut registry, "byte", Some(1), Some(1), TyKind::Byte),
            Ty::BYTE
        );
        assert_eq!(
            builtin(&mut registry, "u8", Some(1), Some(1), unsigned(8)),
            Ty::U8
        );
        assert_eq!(
            builtin(&mut registry, "s8", Some(1), Some(1), signed(8)),
            Ty::S8
        );
        assert_eq!(
            builtin(&mut registry, "u16", Some(2), Some(2), unsigned(16)),
            Ty::U16
        );
        assert_eq!(
            builtin(&mut registry, "s16", Some(2), Some(2), signed(16)),
            Ty::S16
        );
        assert_eq!(
            builtin(&mut registry, "u32", Some(4), Some(4), unsigned(32)),
            Ty::U32
        );
        assert_eq!(
            builtin(&mut registry, "s32", Some(4), Some(4), signed(32)),
            Ty::S32
        );
        assert_eq!(
            builtin(&mut registry, "u64", Some(8), Some(8), unsigned(64)),
            Ty::U64
        );
        assert_eq!(
            builtin(&mut registry, "s64", Some(8), Some(8), signed(64)),
            Ty::S64
        );
        assert_eq!(
            builtin(
                &mut registry,
                "usize",
                Some(POINTER_SIZE),
                Some(POINTER_SIZE),
                unsigned(8 * POINTER_SIZE as u32)
            ),
            Ty::USIZE
        );
        assert_eq!(
            builtin(
                &mut registry,
                "ssize",
                Some(POINTER_SIZE),
                Some(POINTER_SIZE),
                signed(8 * POINTER_SIZE as u32)
            ),
            Ty::SSIZE
        );
        assert_eq!(
            builtin(&mut registry, "integer", None, None, TyKind::UnsizedInteger),
            Ty::INTEGER
        );
        assert_eq!(
            builtin(&mut registry, "any", None, None, TyKind::Any),
            Ty::ANY
        );

        registry
    }

    /// Publish a type under its canonical name, returning the existing
    /// handle if one is already registered for that name.
    pub fn insert(&mut self, data: TypeData) -> Ty {
        if let Some(&ty) = self.by_name.get(&data.name) {
            return ty;
        }
        let name = data.name;
        let ty = self.types.push(data);
        self.by_name.insert(name, ty);
        ty
    }

    /// Publish a struct type. Structs have nominal identity: each
    /// declaration produces a fresh type even if a struct of the same name
    /// exists elsewhere.
    pub fn insert_struct(&mut self, data: TypeData) -> Ty {
        debug_assert!(matches!(data.kind, TyKind::Struct(_)));
        self.types.push(data)
    }

    /// Look up an interned type by canonical name.
    pub fn lookup(&self, name: Name) -> Option<Ty> {
        self.by_name.get(&name).copied()
    }

    pub fn get(&self, ty: Ty) -> &TypeData {
        &self.types[ty]
    }

    pub fn get_mut(&mut self, ty: Ty) -> &mut TypeData {
        &mut self.types[ty]
    }

    pub fn kind(&self, ty: Ty) -> &TyKind {
        &self.types[ty].kind
    }

    pub fn name(&self, ty: Ty) -> Name {
        self.types[ty].name
    }

    /// Size in bytes, or `None` for unsized types.
    pub fn size(&self, ty: Ty) -> Option<usize> {
        self.types[ty].size
    }

    /// Alignment in bytes, or `None` for unsized types.
    pub fn align(&self, ty: Ty) -> Option<usize> {
        self.types[ty].align
    }

    /// True for the sized integer types (u8..s64, usize, ssize).
    pub fn is_integer(&self, ty: Ty) -> bool {
        matches!(self.kind(ty), TyKind::Integer(_))
    }

    /// True for sized integers and the unsized integer literal type.
    pub fn is_any_integer(&self, ty: Ty) -> bool {
        matches!(self.kind(ty), TyKind::Integer(_) | TyKind::UnsizedInteger)
    }

    pub fn is_signed_integer(&self, ty: Ty) -> bool {
        matches!(self.kind(ty), TyKind::Integer(IntegerTy { signed: true, .. }))
    }

    pub fn is_unsigned_integer(&self, ty: Ty) -> bool {
        matches!(
            self.kind(ty),
            TyKind::Integer(IntegerTy { signed: false, .. })
        )
    }

    /// Bounds of a sized integer type.
    pub fn integer_bounds(&self, ty: Ty) -> Option<&IntegerTy> {
        match self.kind(ty) {
            TyKind::Integer(bounds) => Some(bounds),
            _ => None,
        }
    }

    /// Types on which `==`/`!=` are defined.
    pub fn can_compare_equality(&self, ty: Ty) -> bool {
        matches!(
            self.kind(ty),
            TyKind::Bool
                | TyKind::Byte
                | TyKind::Integer(_)
                | TyKind::UnsizedInteger
                | TyKind::Function { .. }
                | TyKind::Pointer { .. }
        )
    }

    /// Types on which `<`/`<=`/`>`/`>=` are defined.
    pub fn can_compare_order(&self, ty: Ty) -> bool {
        matches!(
            self.kind(ty),
            TyKind::Bool
                | TyKind::Byte
                | TyKind::Integer(_)
                | TyKind::UnsizedInteger
                | TyKind::Pointer { .. }
        )
    }

    /// Struct member variables, in declaration order.
    pub fn struct_members(&self, ty: Ty) -> &[super::MemberVariable] {
        match self.kind(ty) {
            TyKind::Struct(StructTy { members }) => members,
            _ => &[],
        }
    }

    /// Find a struct member variable by name.
    pub fn struct_member(&self, ty: Ty, name: Name) -> Option<(usize, &super::MemberVariable)> {
        self.struct_members(ty)
            .iter()
            .enumerate()
            .find(|(_, member)| member.name == name)
    }

    /// Number of interned types.
    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry() -> (Interner, Scopes, TypeRegistry) {
        let interner = Interner::new();
        let mut scopes = Scopes::new();
        let registry = TypeRegistry::bootstrap(&interner, &mut scopes);
        (interner, scopes, registry)
    }

    #[test]
    fn test_builtin_constants() {
        let (interner, _, registry) = registry();

        assert!(matches!(registry.kind(Ty::VOID), TyKind::Void));
        assert!(matches!(registry.kind(Ty::BOOL), TyKind::Bool));
        assert!(matches!(registry.kind(Ty::INTEGER), TyKind::UnsizedInteger));
        assert_eq!(*interner.str(registry.name(Ty::USIZE)), "usize");
        assert_eq!(registry.size(Ty::USIZE), Some(8));
        assert_eq!(registry.size(Ty::INTEGER), None);
    }

    #[test]
    fn test_integer_bounds() {
        let (_, _, registry) = registry();

        let u8_bounds = registry.integer_bounds(Ty::U8).unwrap();
        assert_eq!(u8_bounds.min, BigInt::from(0));
        assert_eq!(u8_bounds.max, BigInt::from(255));

        let s8_bounds = registry.integer_bounds(Ty::S8).unwrap();
        assert_eq!(s8_bounds.min, BigInt::from(-128));
        assert_eq!(s8_bounds.max, BigInt::from(127));

        let s64_bounds = registry.integer_bounds(Ty::S64).unwrap();
        assert_eq!(s64_bounds.min, BigInt::from(i64::MIN));
        assert_eq!(s64_bounds.max, BigInt::from(i64::MAX));
    }

    #[test]
    fn test_insert_deduplicates_by_name() {
        let (interner, mut scopes, mut registry) = registry();

        let name = interner.intern("*u32");
        let make = |scopes: &mut Scopes| TypeData {
            name,
            size: Some(8),
            align: Some(8),
            symbols: scopes.alloc(None),
            kind: TyKind::Pointer { base: Ty::U32 },
        };

        let first = registry.insert(make(&mut scopes));
        let second = registry.insert(make(&mut scopes));
        assert_eq!(first, second);
    }

    #[test]
    fn test_structs_are_nominal() {
        let (interner, mut scopes, mut registry) = registry();

        let name = interner.intern("point");
        let make = |scopes: &mut Scopes| TypeData {
            name,
            size: Some(0),
            align: Some(0),
            symbols: scopes.alloc(None),
            kind: TyKind::Struct(StructTy::default()),
        };

        let first = registry.insert_struct(make(&mut scopes));
        let second = registry.insert_struct(make(&mut scopes));
        assert_ne!(first, second);
    }
}
