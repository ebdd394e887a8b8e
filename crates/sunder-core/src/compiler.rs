//! Compilation driver API.
//!
//! The [`Compiler`] ties the resolver to its external collaborators: a
//! [`ModuleProvider`] supplies parsed modules and answers filesystem
//! queries, while the [`Context`] accumulates the resolved program. The
//! parser itself stays outside this crate; [`FsModuleProvider`] is handed
//! a parse function by the CLI driver, and [`MemoryModuleProvider`] serves
//! pre-built modules for embedding and tests.

use crate::context::Context;
use crate::diagnostic::{CompileResult, Fatal};
use crate::ids::{FuncId, ModuleId, SymbolId};
use crate::resolve;
use crate::source::Location;
use crate::syntax::cst;
use crate::tir::Function;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Filesystem and parser collaborator for module discovery.
///
/// Import paths are resolved against the importing module's directory
/// first, then against each configured import root (the driver populates
/// the roots from the colon-separated `SUNDER_IMPORT_PATH` environment
/// variable).
pub trait ModuleProvider {
    /// Canonicalize a path, returning `None` when it does not exist.
    fn canonical_path(&self, path: &Path) -> Option<PathBuf>;

    /// True when the canonical path names a directory.
    fn is_directory(&self, path: &Path) -> bool;

    /// Child entry names of a directory, in deterministic order.
    fn directory_entries(&self, path: &Path) -> Vec<String>;

    /// Directories searched for imports after the module-relative lookup.
    fn import_roots(&self) -> Vec<PathBuf>;

    /// Parse the module at the canonical path.
    fn load(&mut self, path: &Path) -> CompileResult<cst::Module>;
}

/// Resolve an import spelling to a canonical path: first relative to the
/// importing module's directory, then against each import root.
pub(crate) fn canonical_import_path(
    provider: &dyn ModuleProvider,
    module_path: &Path,
    import_path: &str,
) -> Option<PathBuf> {
    let module_dir = module_path.parent().unwrap_or_else(|| Path::new("."));
    if let Some(path) = provider.canonical_path(&module_dir.join(import_path)) {
        return Some(path);
    }

    for root in provider.import_roots() {
        if let Some(path) = provider.canonical_path(&root.join(import_path)) {
            return Some(path);
        }
    }
    None
}

/// Parse and resolve the module at `path`, registering it in the context.
/// The module is marked loaded only once resolution finishes, so an
/// import cycle is observable as an in-progress module.
pub(crate) fn load_module(
    ctx: &mut Context,
    provider: &mut dyn ModuleProvider,
    name: &str,
    path: &Path,
) -> CompileResult<ModuleId> {
    debug!(module = name, path = %path.display(), "loading module");
    let parsed = provider.load(path)?;
    let module = ctx.add_module(name, path);
    resolve::resolve_module(ctx, provider, module, &parsed)?;
    ctx.modules[module].loaded = true;
    Ok(module)
}

/// Compiler instance: the context plus the module provider.
pub struct Compiler<P: ModuleProvider> {
    ctx: Context,
    provider: P,
}

impl<P: ModuleProvider> Compiler<P> {
    pub fn new(provider: P) -> Self {
        Self {
            ctx: Context::new(),
            provider,
        }
    }

    /// Get the compiler context.
    pub fn context(&self) -> &Context {
        &self.ctx
    }

    /// Get mutable compiler context.
    pub fn context_mut(&mut self) -> &mut Context {
        &mut self.ctx
    }

    /// Get mutable access to the module provider.
    pub fn provider_mut(&mut self) -> &mut P {
        &mut self.provider
    }

    /// Load and resolve a root module (and, transitively, its imports).
    pub fn load(&mut self, name: &str, path: impl AsRef<Path>) -> CompileResult<ModuleId> {
        let path = path.as_ref();
        let canonical = match self.provider.canonical_path(path) {
            Some(canonical) => canonical,
            None => {
                let location = Location::new(path.display().to_string(), 0, 0);
                return Err(Fatal::new(
                    location,
                    format!("failed to resolve module path `{}`", path.display()),
                ));
            }
        };

        if let Some(existing) = self.ctx.module_by_path(&canonical) {
            return Ok(existing);
        }
        load_module(&mut self.ctx, &mut self.provider, name, &canonical)
    }

    /// Freeze the long-lived symbol tables once every module is loaded.
    pub fn finalize(&mut self) {
        self.ctx.freeze_pending();
    }

    /// The static symbols the back-end must emit, in registration order.
    pub fn static_symbols(&self) -> &[SymbolId] {
        &self.ctx.statics
    }

    /// The resolved functions the back-end must emit.
    pub fn functions(&self) -> impl Iterator<Item = (FuncId, &Function)> {
        self.ctx.functions.iter_enumerated()
    }
}

/// Filesystem-backed module provider. The parse function is supplied by
/// the driver, keeping the parser outside this crate.
pub struct FsModuleProvider<F> {
    parse: F,
    import_roots: Vec<PathBuf>,
}

impl<F> FsModuleProvider<F>
where
    F: FnMut(&Path, &str) -> CompileResult<cst::Module>,
{
    /// Create a provider with import roots taken from the colon-separated
    /// `SUNDER_IMPORT_PATH` environment variable.
    pub fn new(parse: F) -> Self {
        let import_roots = std::env::var("SUNDER_IMPORT_PATH")
            .map(|paths| paths.split(':').map(PathBuf::from).collect())
            .unwrap_or_default();
        Self {
            parse,
            import_roots,
        }
    }

    pub fn with_import_roots(parse: F, import_roots: Vec<PathBuf>) -> Self {
        Self {
            parse,
            import_roots,
        }
    }
}

impl<F> ModuleProvider for FsModuleProvider<F>
where
    F: FnMut(&Path, &str) -> CompileResult<cst::Module>,
{
    fn canonical_path(&self, path: &Path) -> Option<PathBuf> {
        std::fs::canonicalize(path).ok()
    }

    fn is_directory(&self, path: &Path) -> bool {
        path.is_dir()
    }

    fn directory_entries(&self, path: &Path) -> Vec<String> {
        let mut entries: Vec<String> = std::fs::read_dir(path)
            .into_iter()
            .flatten()
            .flatten()
            .map(|entry| entry.file_name().to_string_lossy().into_owned())
            .collect();
        entries.sort();
        entries
    }

    fn import_roots(&self) -> Vec<PathBuf> {
        self.import_roots.clone()
    }

    fn load(&mut self, path: &Path) -> CompileResult<cst::Module> {
        let content = std::fs::read_to_string(path).map_err(|err| {
            Fatal::new(
                Location::new(path.display().to_string(), 0, 0),
                format!("failed to read module: {}", err),
            )
        })?;
        (self.parse)(path, &content)
    }
}

/// In-memory module provider for embedding and tests.
#[derive(Default)]
pub struct MemoryModuleProvider {
    modules: HashMap<PathBuf, cst::Module>,
    directories: Vec<PathBuf>,
    import_roots: Vec<PathBuf>,
}

impl MemoryModuleProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a parsed module under a path.
    pub fn add_module(&mut self, path: impl Into<PathBuf>, module: cst::Module) {
        self.modules.insert(path.into(), module);
    }

    /// Register a directory containing previously added modules.
    pub fn add_directory(&mut self, path: impl Into<PathBuf>) {
        self.directories.push(path.into());
    }

    pub fn add_import_root(&mut self, path: impl Into<PathBuf>) {
        self.import_roots.push(path.into());
    }
}

impl ModuleProvider for MemoryModuleProvider {
    fn canonical_path(&self, path: &Path) -> Option<PathBuf> {
        if self.modules.contains_key(path) || self.directories.iter().any(|dir| dir == path) {
            Some(path.to_path_buf())
        } else {
            None
        }
    }

    fn is_directory(&self, path: &Path) -> bool {
        self.directories.iter().any(|dir| dir == path)
    }

    fn directory_entries(&self, path: &Path) -> Vec<String> {
        let mut entries: Vec<String> = self
            .modules
            .keys()
            .filter(|module| module.parent() == Some(path))
            .filter_map(|module| module.file_name())
            .map(|name| name.to_string_lossy().into_owned())
            .collect();
        entries.sort();
        entries
    }

    fn import_roots(&self) -> Vec<PathBuf> {
        self.import_roots.clone()
    }

    fn load(&mut self, path: &Path) -> CompileResult<cst::Module> {
        match self.modules.get(path) {
            Some(module) => Ok(module.clone()),
            None => Err(Fatal::new(
                Location::new(path.display().to_string(), 0, 0),
                format!("failed to read module `{}`", path.display()),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::symtab::SymbolKind;
    use crate::tir::{ExprKind, StmtKind};
    use crate::types::{Ty, TyKind};
    use crate::value::{Address, Value};
    use num_bigint::BigInt;
    use std::rc::Rc;

    fn loc() -> Location {
        Location::new("test.sunder", 1, 1)
    }

    fn compiler() -> Compiler<MemoryModuleProvider> {
        Compiler::new(MemoryModuleProvider::new())
    }

    fn ident(ctx: &Context, name: &str) -> cst::Identifier {
        cst::Identifier::new(loc(), ctx.intern(name))
    }

    fn int_lit(ctx: &Context, value: i64, suffix: &str) -> cst::ExprNode {
        cst::ExprNode::new(
            loc(),
            cst::ExprKind::Integer {
                value: BigInt::from(value),
                suffix: ctx.intern(suffix),
            },
        )
    }

    fn binary(kind: cst::BinaryOpKind, lhs: cst::ExprNode, rhs: cst::ExprNode) -> cst::ExprNode {
        cst::ExprNode::new(
            loc(),
            cst::ExprKind::Binary {
                op: cst::BinaryOpToken {
                    location: loc(),
                    kind,
                },
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
            },
        )
    }

    fn path_expr(ctx: &Context, names: &[&str]) -> cst::ExprNode {
        cst::ExprNode::new(loc(), cst::ExprKind::Symbol(path(ctx, names, &[])))
    }

    fn path(ctx: &Context, names: &[&str], last_args: &[cst::Typespec]) -> cst::SymbolPath {
        let elements = names
            .iter()
            .enumerate()
            .map(|(index, name)| cst::SymbolElement {
                location: loc(),
                identifier: ident(ctx, name),
                template_arguments: if index == names.len() - 1 {
                    last_args.to_vec()
                } else {
                    Vec::new()
                },
            })
            .collect();
        cst::SymbolPath {
            location: loc(),
            is_from_root: false,
            elements,
        }
    }

    fn ts_named(ctx: &Context, name: &str) -> cst::Typespec {
        cst::Typespec::new(loc(), cst::TypespecKind::Symbol(path(ctx, &[name], &[])))
    }

    fn ts_template(ctx: &Context, name: &str, arguments: &[cst::Typespec]) -> cst::Typespec {
        cst::Typespec::new(
            loc(),
            cst::TypespecKind::Symbol(path(ctx, &[name], arguments)),
        )
    }

    fn ts_array(ctx: &Context, count: i64, base: cst::Typespec) -> cst::Typespec {
        cst::Typespec::new(
            loc(),
            cst::TypespecKind::Array {
                count: Box::new(int_lit(ctx, count, "")),
                base: Box::new(base),
            },
        )
    }

    fn const_decl(
        ctx: &Context,
        name: &str,
        typespec: Option<cst::Typespec>,
        expr: cst::ExprNode,
    ) -> Rc<cst::Decl> {
        Rc::new(cst::Decl::new(
            loc(),
            cst::DeclKind::Constant {
                identifier: ident(ctx, name),
                typespec,
                expr,
            },
        ))
    }

    fn func_decl(
        ctx: &Context,
        name: &str,
        return_typespec: cst::Typespec,
        stmts: Vec<cst::StmtNode>,
    ) -> Rc<cst::Decl> {
        Rc::new(cst::Decl::new(
            loc(),
            cst::DeclKind::Function {
                identifier: ident(ctx, name),
                template_parameters: Vec::new(),
                parameters: Vec::new(),
                return_typespec,
                body: cst::BlockNode {
                    location: loc(),
                    stmts,
                },
            },
        ))
    }

    fn module(decls: Vec<Rc<cst::Decl>>) -> cst::Module {
        cst::Module {
            namespace: None,
            imports: Vec::new(),
            decls,
        }
    }

    fn load(
        compiler: &mut Compiler<MemoryModuleProvider>,
        module: cst::Module,
    ) -> CompileResult<ModuleId> {
        compiler.provider_mut().add_module("/main.sunder", module);
        compiler.load("main", "/main.sunder")
    }

    fn lookup_module_symbol(
        compiler: &Compiler<MemoryModuleProvider>,
        module: ModuleId,
        name: &str,
    ) -> SymbolId {
        let ctx = compiler.context();
        let scope = ctx.modules[module].symbols;
        ctx.scopes
            .lookup(scope, ctx.intern(name))
            .expect("symbol is declared")
    }

    #[test]
    fn test_untyped_literals_fold_to_a_typed_constant() {
        let mut compiler = compiler();
        let ctx = compiler.context();

        // const x: s32 = 1 + 2 * 3;
        let expr = binary(
            cst::BinaryOpKind::Add,
            int_lit(ctx, 1, ""),
            binary(
                cst::BinaryOpKind::Mul,
                int_lit(ctx, 2, ""),
                int_lit(ctx, 3, ""),
            ),
        );
        let decl = const_decl(ctx, "x", Some(ts_named(ctx, "s32")), expr);

        let module = load(&mut compiler, module(vec![decl])).unwrap();
        let symbol = lookup_module_symbol(&compiler, module, "x");
        match &compiler.context().symbols[symbol].kind {
            SymbolKind::Constant { ty, value, .. } => {
                assert_eq!(*ty, Ty::S32);
                match value {
                    Value::Integer { ty, value } => {
                        assert_eq!(*ty, Ty::S32);
                        assert_eq!(*value, BigInt::from(7));
                    }
                    other => panic!("expected integer value, got {:?}", other),
                }
            }
            other => panic!("expected constant symbol, got {:?}", other),
        }
    }

    #[test]
    fn test_folding_rewrites_the_ir_to_a_literal() {
        let mut compiler = compiler();
        let ctx = compiler.context();

        // func main() void { var x: s32 = 1 + 2 * 3; }
        let init = binary(
            cst::BinaryOpKind::Add,
            int_lit(ctx, 1, ""),
            binary(
                cst::BinaryOpKind::Mul,
                int_lit(ctx, 2, ""),
                int_lit(ctx, 3, ""),
            ),
        );
        let var = Rc::new(cst::Decl::new(
            loc(),
            cst::DeclKind::Variable {
                identifier: ident(ctx, "x"),
                typespec: Some(ts_named(ctx, "s32")),
                expr: init,
            },
        ));
        let body = vec![cst::StmtNode {
            location: loc(),
            kind: cst::StmtKind::Decl(var),
        }];
        let main = func_decl(ctx, "main", ts_named(ctx, "void"), body);

        load(&mut compiler, module(vec![main])).unwrap();

        let (_, function) = compiler
            .functions()
            .next()
            .expect("one function was resolved");
        let block = function.body.as_ref().expect("function body resolved");
        match &block.stmts[0].kind {
            StmtKind::Assign { rhs, .. } => match &rhs.kind {
                ExprKind::Integer(value) => assert_eq!(*value, BigInt::from(7)),
                other => panic!("expected folded literal, got {:?}", other),
            },
            other => panic!("expected assignment, got {:?}", other),
        }
        // The local lives below rbp within the frame's low-water mark.
        assert_eq!(function.local_stack_offset, -8);
    }

    #[test]
    fn test_array_initializer_with_ellipsis() {
        let mut compiler = compiler();
        let ctx = compiler.context();

        // const a: [4]u8 = (:[4]u8)[1, 2, ...5];
        let typespec = ts_array(ctx, 4, ts_named(ctx, "u8"));
        let list = cst::ExprNode::new(
            loc(),
            cst::ExprKind::List {
                typespec: ts_array(ctx, 4, ts_named(ctx, "u8")),
                elements: vec![int_lit(ctx, 1, ""), int_lit(ctx, 2, "")],
                ellipsis: Some(Box::new(int_lit(ctx, 5, ""))),
            },
        );
        let decl = const_decl(ctx, "a", Some(typespec), list);

        let module = load(&mut compiler, module(vec![decl])).unwrap();
        let symbol = lookup_module_symbol(&compiler, module, "a");
        match &compiler.context().symbols[symbol].kind {
            SymbolKind::Constant { value, .. } => match value {
                Value::Array { elements, .. } => {
                    let values: Vec<i64> = elements
                        .iter()
                        .map(|element| match element {
                            Value::Integer { value, .. } => {
                                i64::try_from(value.clone()).expect("small")
                            }
                            other => panic!("expected integer element, got {:?}", other),
                        })
                        .collect();
                    assert_eq!(values, vec![1, 2, 5, 5]);
                }
                other => panic!("expected array value, got {:?}", other),
            },
            other => panic!("expected constant symbol, got {:?}", other),
        }
    }

    #[test]
    fn test_bytes_literal_backing_array_and_slice() {
        let mut compiler = compiler();
        let ctx = compiler.context();

        // const s = "hi";
        let bytes = cst::ExprNode::new(loc(), cst::ExprKind::Bytes(b"hi".to_vec()));
        let decl = const_decl(ctx, "s", None, bytes);

        let module = load(&mut compiler, module(vec![decl])).unwrap();
        let ctx = compiler.context();

        // The backing array is a registered static of type [3]byte with a
        // trailing NUL.
        let backing = compiler
            .static_symbols()
            .iter()
            .find(|&&symbol| *ctx.str(ctx.symbols[symbol].name) == "__bytes")
            .copied()
            .expect("bytes backing symbol registered");
        match &ctx.symbols[backing].kind {
            SymbolKind::Constant { ty, value, .. } => {
                assert_eq!(*ctx.type_name(*ty), "[3]byte");
                match value {
                    Value::Array { elements, .. } => {
                        assert_eq!(elements.len(), 3);
                        assert!(matches!(elements[0], Value::Byte(b'h')));
                        assert!(matches!(elements[1], Value::Byte(b'i')));
                        assert!(matches!(elements[2], Value::Byte(0)));
                    }
                    other => panic!("expected array value, got {:?}", other),
                }
            }
            other => panic!("expected constant symbol, got {:?}", other),
        }

        // The named constant is a slice of count 2 pointing at the array.
        let symbol = lookup_module_symbol(&compiler, module, "s");
        match &ctx.symbols[symbol].kind {
            SymbolKind::Constant { ty, value, .. } => {
                assert_eq!(*ctx.type_name(*ty), "[]byte");
                match value {
                    Value::Slice { pointer, count, .. } => {
                        match &**count {
                            Value::Integer { value, .. } => assert_eq!(*value, BigInt::from(2)),
                            other => panic!("expected integer count, got {:?}", other),
                        }
                        match &**pointer {
                            Value::Pointer {
                                address: Address::Static { name, offset },
                                ..
                            } => {
                                assert_eq!(*ctx.str(*name), "__bytes");
                                assert_eq!(*offset, 0);
                            }
                            other => panic!("expected static pointer, got {:?}", other),
                        }
                    }
                    other => panic!("expected slice value, got {:?}", other),
                }
            }
            other => panic!("expected constant symbol, got {:?}", other),
        }
    }

    #[test]
    fn test_compile_time_overflow_is_rejected() {
        // Typed operands overflow in the arithmetic itself.
        let mut c = compiler();
        let ctx = c.context();
        let expr = binary(
            cst::BinaryOpKind::Add,
            int_lit(ctx, 200, "u8"),
            int_lit(ctx, 100, "u8"),
        );
        let decl = const_decl(ctx, "q", Some(ts_named(ctx, "u8")), expr);
        let err = load(&mut c, module(vec![decl])).unwrap_err();
        assert_eq!(
            err.message,
            "arithmetic operation produces out-of-range result (200 + 100 == 300)"
        );

        // Untyped operands fold losslessly and fail the conversion to u8.
        let mut c = compiler();
        let ctx = c.context();
        let expr = binary(
            cst::BinaryOpKind::Add,
            int_lit(ctx, 200, ""),
            int_lit(ctx, 100, ""),
        );
        let decl = const_decl(ctx, "q", Some(ts_named(ctx, "u8")), expr);
        let err = load(&mut c, module(vec![decl])).unwrap_err();
        assert_eq!(
            err.message,
            "out-of-range conversion from `integer` to `u8` (300 > 255)"
        );
    }

    #[test]
    fn test_minimum_signed_literal_is_representable() {
        let mut compiler = compiler();
        let ctx = compiler.context();

        // const m: s8 = -128s8; (unary minus absorbed into the literal)
        let negated = cst::ExprNode::new(
            loc(),
            cst::ExprKind::Unary {
                op: cst::UnaryOpToken {
                    location: loc(),
                    kind: cst::UnaryOpKind::Neg,
                },
                rhs: Box::new(int_lit(ctx, 128, "s8")),
            },
        );
        let decl = const_decl(ctx, "m", Some(ts_named(ctx, "s8")), negated);

        let module = load(&mut compiler, module(vec![decl])).unwrap();
        let symbol = lookup_module_symbol(&compiler, module, "m");
        match &compiler.context().symbols[symbol].kind {
            SymbolKind::Constant { value, .. } => match value {
                Value::Integer { value, .. } => assert_eq!(*value, BigInt::from(-128)),
                other => panic!("expected integer value, got {:?}", other),
            },
            other => panic!("expected constant symbol, got {:?}", other),
        }
    }

    #[test]
    fn test_template_instantiation_is_memoized() {
        let mut compiler = compiler();
        let ctx = compiler.context();

        // struct box[[T]] { var v: T; }
        let boxed = Rc::new(cst::Decl::new(
            loc(),
            cst::DeclKind::Struct {
                identifier: ident(ctx, "box"),
                template_parameters: vec![ident(ctx, "T")],
                members: vec![cst::Member {
                    location: loc(),
                    name: ctx.intern("v"),
                    kind: cst::MemberKind::Variable {
                        identifier: ident(ctx, "v"),
                        typespec: ts_named(ctx, "T"),
                    },
                }],
            },
        ));
        // alias b1 = box[[u32]]; alias b2 = box[[u32]];
        let alias = |ctx: &Context, name: &str| {
            Rc::new(cst::Decl::new(
                loc(),
                cst::DeclKind::Alias {
                    identifier: ident(ctx, name),
                    typespec: ts_template(ctx, "box", &[ts_named(ctx, "u32")]),
                },
            ))
        };
        let b1 = alias(ctx, "b1");
        let b2 = alias(ctx, "b2");

        let module = load(&mut compiler, module(vec![boxed, b1, b2])).unwrap();
        let ctx = compiler.context();

        let ty_of = |name: &str| {
            let symbol = lookup_module_symbol(&compiler, module, name);
            match ctx.symbols[symbol].kind {
                SymbolKind::Type(ty) => ty,
                _ => panic!("expected type symbol"),
            }
        };
        let first = ty_of("b1");
        let second = ty_of("b2");
        assert_eq!(first, second);
        assert_eq!(*ctx.type_name(first), "box[[u32]]");

        let members = ctx.types.struct_members(first);
        assert_eq!(members.len(), 1);
        assert_eq!(*ctx.str(members[0].name), "v");
        assert_eq!(members[0].ty, Ty::U32);
        assert_eq!(ctx.types.size(first), Some(4));
    }

    #[test]
    fn test_self_referential_template_instance_terminates() {
        let mut compiler = compiler();
        let ctx = compiler.context();

        // struct node[[T]] { var next: *node[[T]]; var v: T; }
        let next_typespec = cst::Typespec::new(
            loc(),
            cst::TypespecKind::Pointer(Box::new(ts_template(
                ctx,
                "node",
                &[ts_named(ctx, "T")],
            ))),
        );
        let node = Rc::new(cst::Decl::new(
            loc(),
            cst::DeclKind::Struct {
                identifier: ident(ctx, "node"),
                template_parameters: vec![ident(ctx, "T")],
                members: vec![
                    cst::Member {
                        location: loc(),
                        name: ctx.intern("next"),
                        kind: cst::MemberKind::Variable {
                            identifier: ident(ctx, "next"),
                            typespec: next_typespec,
                        },
                    },
                    cst::Member {
                        location: loc(),
                        name: ctx.intern("v"),
                        kind: cst::MemberKind::Variable {
                            identifier: ident(ctx, "v"),
                            typespec: ts_named(ctx, "u32"),
                        },
                    },
                ],
            },
        ));
        let alias = Rc::new(cst::Decl::new(
            loc(),
            cst::DeclKind::Alias {
                identifier: ident(ctx, "n"),
                typespec: ts_template(ctx, "node", &[ts_named(ctx, "u32")]),
            },
        ));

        let module = load(&mut compiler, module(vec![node, alias])).unwrap();
        let ctx = compiler.context();
        let symbol = lookup_module_symbol(&compiler, module, "n");
        let ty = match ctx.symbols[symbol].kind {
            SymbolKind::Type(ty) => ty,
            _ => panic!("expected type symbol"),
        };
        let members = ctx.types.struct_members(ty);
        assert_eq!(members.len(), 2);
        assert_eq!(*ctx.type_name(members[0].ty), "*node[[u32]]");
        // pointer (8) + u32 (4) rounded up to 8-byte alignment
        assert_eq!(ctx.types.size(ty), Some(16));
    }

    #[test]
    fn test_circular_import_is_rejected() {
        let mut compiler = compiler();

        let a = cst::Module {
            namespace: None,
            imports: vec![cst::Import {
                location: loc(),
                path: "b.sunder".to_string(),
            }],
            decls: Vec::new(),
        };
        let b = cst::Module {
            namespace: None,
            imports: vec![cst::Import {
                location: loc(),
                path: "a.sunder".to_string(),
            }],
            decls: Vec::new(),
        };
        compiler.provider_mut().add_module("/a.sunder", a);
        compiler.provider_mut().add_module("/b.sunder", b);

        let err = compiler.load("a", "/a.sunder").unwrap_err();
        assert_eq!(
            err.message,
            "circular dependency when importing `a.sunder`"
        );
    }

    #[test]
    fn test_namespaced_import_resolves_through_path() {
        let mut compiler = compiler();
        let ctx = compiler.context();

        // lib.sunder: namespace std::foo; const x: u32 = 41;
        let lib = cst::Module {
            namespace: Some(cst::Namespace {
                location: loc(),
                identifiers: vec![ident(ctx, "std"), ident(ctx, "foo")],
            }),
            imports: Vec::new(),
            decls: vec![const_decl(
                ctx,
                "x",
                Some(ts_named(ctx, "u32")),
                int_lit(ctx, 41, ""),
            )],
        };
        // main.sunder: imports lib twice (idempotent), reads std::foo::x.
        let main = cst::Module {
            namespace: None,
            imports: vec![
                cst::Import {
                    location: loc(),
                    path: "lib.sunder".to_string(),
                },
                cst::Import {
                    location: loc(),
                    path: "lib.sunder".to_string(),
                },
            ],
            decls: vec![const_decl(
                ctx,
                "y",
                Some(ts_named(ctx, "u32")),
                cst::ExprNode::new(
                    loc(),
                    cst::ExprKind::Symbol(path(ctx, &["std", "foo", "x"], &[])),
                ),
            )],
        };
        compiler.provider_mut().add_module("/lib.sunder", lib);
        compiler.provider_mut().add_module("/main.sunder", main);

        let module = compiler.load("main", "/main.sunder").unwrap();
        compiler.finalize();

        let symbol = lookup_module_symbol(&compiler, module, "y");
        match &compiler.context().symbols[symbol].kind {
            SymbolKind::Constant { value, .. } => match value {
                Value::Integer { value, .. } => assert_eq!(*value, BigInt::from(41)),
                other => panic!("expected integer value, got {:?}", other),
            },
            other => panic!("expected constant symbol, got {:?}", other),
        }

        // The library constant's label carries the namespace prefix.
        let ctx = compiler.context();
        assert!(compiler
            .static_symbols()
            .iter()
            .any(|&symbol| *ctx.str(ctx.symbols[symbol].name) == "x"
                && matches!(
                    ctx.symbol_address(symbol),
                    Some(Address::Static { name, .. }) if *ctx.str(*name) == "std.foo.x"
                )));
    }

    #[test]
    fn test_missing_terminal_return_is_rejected() {
        let mut compiler = compiler();
        let ctx = compiler.context();

        let decl = func_decl(ctx, "f", ts_named(ctx, "u32"), Vec::new());
        let err = load(&mut compiler, module(vec![decl])).unwrap_err();
        assert_eq!(
            err.message,
            "non-void-returning function does not end with a return statement"
        );
    }

    #[test]
    fn test_break_outside_loop_is_rejected() {
        let mut compiler = compiler();
        let ctx = compiler.context();

        let body = vec![cst::StmtNode {
            location: loc(),
            kind: cst::StmtKind::Break,
        }];
        let decl = func_decl(ctx, "f", ts_named(ctx, "void"), body);
        let err = load(&mut compiler, module(vec![decl])).unwrap_err();
        assert_eq!(err.message, "break statement outside of loop");
    }

    #[test]
    fn test_global_redeclaration_is_rejected() {
        let mut compiler = compiler();
        let ctx = compiler.context();

        let first = const_decl(ctx, "x", Some(ts_named(ctx, "u32")), int_lit(ctx, 1, ""));
        let second = const_decl(ctx, "x", Some(ts_named(ctx, "u32")), int_lit(ctx, 2, ""));
        let err = load(&mut compiler, module(vec![first, second])).unwrap_err();
        assert!(err.message.contains("redeclaration of `x`"));
    }

    #[test]
    fn test_static_labels_are_unique() {
        let mut compiler = compiler();
        let ctx = compiler.context();

        // Two bytes literals both want the `__bytes` label; the second is
        // uniquified.
        let first = const_decl(
            ctx,
            "a",
            None,
            cst::ExprNode::new(loc(), cst::ExprKind::Bytes(b"x".to_vec())),
        );
        let second = const_decl(
            ctx,
            "b",
            None,
            cst::ExprNode::new(loc(), cst::ExprKind::Bytes(b"y".to_vec())),
        );
        load(&mut compiler, module(vec![first, second])).unwrap();

        let ctx = compiler.context();
        let labels: Vec<String> = compiler
            .static_symbols()
            .iter()
            .filter_map(|&symbol| match ctx.symbol_address(symbol) {
                Some(Address::Static { name, .. }) => Some(ctx.str(*name).to_string()),
                _ => None,
            })
            .collect();
        let mut deduped = labels.clone();
        deduped.sort();
        deduped.dedup();
        assert_eq!(deduped.len(), labels.len());
        assert!(labels.contains(&"__bytes".to_string()));
        assert!(labels.contains(&"__bytes.1".to_string()));
    }

    #[test]
    fn test_typeof_resolves_without_evaluating() {
        let mut compiler = compiler();
        let ctx = compiler.context();

        // const a: u16 = 7; const b: typeof(a) = 9;
        let a = const_decl(ctx, "a", Some(ts_named(ctx, "u16")), int_lit(ctx, 7, ""));
        let type_of_a = cst::Typespec::new(
            loc(),
            cst::TypespecKind::Typeof(Box::new(path_expr(ctx, &["a"]))),
        );
        let b = const_decl(ctx, "b", Some(type_of_a), int_lit(ctx, 9, ""));

        let module = load(&mut compiler, module(vec![a, b])).unwrap();
        let symbol = lookup_module_symbol(&compiler, module, "b");
        match &compiler.context().symbols[symbol].kind {
            SymbolKind::Constant { ty, .. } => assert_eq!(*ty, Ty::U16),
            other => panic!("expected constant symbol, got {:?}", other),
        }
    }

    #[test]
    fn test_slice_list_in_constant_declaration() {
        let mut compiler = compiler();
        let ctx = compiler.context();

        // const s: []u32 = (:[]u32)[1, 2, 3];
        let slice_typespec = || {
            cst::Typespec::new(
                loc(),
                cst::TypespecKind::Slice(Box::new(ts_named(compiler.context(), "u32"))),
            )
        };
        let list = cst::ExprNode::new(
            loc(),
            cst::ExprKind::List {
                typespec: slice_typespec(),
                elements: vec![
                    int_lit(ctx, 1, ""),
                    int_lit(ctx, 2, ""),
                    int_lit(ctx, 3, ""),
                ],
                ellipsis: None,
            },
        );
        let decl = const_decl(ctx, "s", Some(slice_typespec()), list);

        let module = load(&mut compiler, module(vec![decl])).unwrap();
        let ctx = compiler.context();

        // The backing array was registered as a static constant.
        let backing = compiler
            .static_symbols()
            .iter()
            .find(|&&symbol| {
                ctx.str(ctx.symbols[symbol].name)
                    .starts_with("__slice_list_elements_")
            })
            .copied()
            .expect("backing array registered");
        match &ctx.symbols[backing].kind {
            SymbolKind::Constant { ty, .. } => {
                assert_eq!(*ctx.type_name(*ty), "[3]u32");
            }
            other => panic!("expected constant backing array, got {:?}", other),
        }

        // The constant's value is a slice over it with count 3.
        let symbol = lookup_module_symbol(&compiler, module, "s");
        match &ctx.symbols[symbol].kind {
            SymbolKind::Constant { value, .. } => match value {
                Value::Slice { count, .. } => match &**count {
                    Value::Integer { value, .. } => assert_eq!(*value, BigInt::from(3)),
                    other => panic!("expected integer count, got {:?}", other),
                },
                other => panic!("expected slice value, got {:?}", other),
            },
            other => panic!("expected constant symbol, got {:?}", other),
        }
    }

    #[test]
    fn test_type_used_as_expression_is_rejected() {
        let mut compiler = compiler();
        let ctx = compiler.context();

        let decl = const_decl(ctx, "x", None, path_expr(ctx, &["u32"]));
        let err = load(&mut compiler, module(vec![decl])).unwrap_err();
        assert_eq!(err.message, "use of type `u32` as an expression");
    }

    #[test]
    fn test_dereference_in_constant_is_rejected() {
        let mut compiler = compiler();
        let ctx = compiler.context();

        // const g: u32 = 1;  const x: u32 = *&g;
        let g = const_decl(ctx, "g", Some(ts_named(ctx, "u32")), int_lit(ctx, 1, ""));
        let address_of = cst::ExprNode::new(
            loc(),
            cst::ExprKind::Unary {
                op: cst::UnaryOpToken {
                    location: loc(),
                    kind: cst::UnaryOpKind::AddressOf,
                },
                rhs: Box::new(path_expr(ctx, &["g"])),
            },
        );
        let deref = cst::ExprNode::new(
            loc(),
            cst::ExprKind::Unary {
                op: cst::UnaryOpToken {
                    location: loc(),
                    kind: cst::UnaryOpKind::Dereference,
                },
                rhs: Box::new(address_of),
            },
        );
        let x = const_decl(ctx, "x", Some(ts_named(ctx, "u32")), deref);

        let err = load(&mut compiler, module(vec![g, x])).unwrap_err();
        assert_eq!(
            err.message,
            "dereference operator not supported in compile-time expressions"
        );
    }

    #[test]
    fn test_countof_in_constant() {
        let mut compiler = compiler();
        let ctx = compiler.context();

        // const arr: [3]u8 = (:[3]u8)[...0];  const n: usize = countof(arr);
        let arr = const_decl(
            ctx,
            "arr",
            Some(ts_array(ctx, 3, ts_named(ctx, "u8"))),
            cst::ExprNode::new(
                loc(),
                cst::ExprKind::List {
                    typespec: ts_array(ctx, 3, ts_named(ctx, "u8")),
                    elements: Vec::new(),
                    ellipsis: Some(Box::new(int_lit(ctx, 0, ""))),
                },
            ),
        );
        let countof = cst::ExprNode::new(
            loc(),
            cst::ExprKind::Unary {
                op: cst::UnaryOpToken {
                    location: loc(),
                    kind: cst::UnaryOpKind::Countof,
                },
                rhs: Box::new(path_expr(ctx, &["arr"])),
            },
        );
        let n = const_decl(ctx, "n", Some(ts_named(ctx, "usize")), countof);

        let module = load(&mut compiler, module(vec![arr, n])).unwrap();
        let symbol = lookup_module_symbol(&compiler, module, "n");
        match &compiler.context().symbols[symbol].kind {
            SymbolKind::Constant { value, .. } => match value {
                Value::Integer { ty, value } => {
                    assert_eq!(*ty, Ty::USIZE);
                    assert_eq!(*value, BigInt::from(3));
                }
                other => panic!("expected integer value, got {:?}", other),
            },
            other => panic!("expected constant symbol, got {:?}", other),
        }
    }

    #[test]
    fn test_incompatible_initializer_type_is_rejected() {
        let mut compiler = compiler();
        let ctx = compiler.context();

        let decl = const_decl(
            ctx,
            "x",
            Some(ts_named(ctx, "u32")),
            cst::ExprNode::new(loc(), cst::ExprKind::Boolean(true)),
        );
        let err = load(&mut compiler, module(vec![decl])).unwrap_err();
        assert_eq!(err.message, "incompatible type `bool` (expected `u32`)");
    }

    #[test]
    fn test_extend_adds_a_member_constant() {
        let mut compiler = compiler();
        let ctx = compiler.context();

        // struct pair { var a: u32; }
        let pair = Rc::new(cst::Decl::new(
            loc(),
            cst::DeclKind::Struct {
                identifier: ident(ctx, "pair"),
                template_parameters: Vec::new(),
                members: vec![cst::Member {
                    location: loc(),
                    name: ctx.intern("a"),
                    kind: cst::MemberKind::Variable {
                        identifier: ident(ctx, "a"),
                        typespec: ts_named(ctx, "u32"),
                    },
                }],
            },
        ));
        // extend pair const K: u32 = 3;
        let extension = Rc::new(cst::Decl::new(
            loc(),
            cst::DeclKind::Extend {
                typespec: ts_named(ctx, "pair"),
                decl: const_decl(ctx, "K", Some(ts_named(ctx, "u32")), int_lit(ctx, 3, "")),
            },
        ));
        // const y: u32 = pair::K;
        let y = const_decl(
            ctx,
            "y",
            Some(ts_named(ctx, "u32")),
            path_expr(ctx, &["pair", "K"]),
        );

        let module = load(&mut compiler, module(vec![pair, extension, y])).unwrap();
        let ctx = compiler.context();

        let symbol = lookup_module_symbol(&compiler, module, "y");
        match &ctx.symbols[symbol].kind {
            SymbolKind::Constant { value, .. } => match value {
                Value::Integer { value, .. } => assert_eq!(*value, BigInt::from(3)),
                other => panic!("expected integer value, got {:?}", other),
            },
            other => panic!("expected constant symbol, got {:?}", other),
        }

        // The extension constant's label is prefixed by the type name.
        assert!(compiler.static_symbols().iter().any(|&symbol| matches!(
            ctx.symbol_address(symbol),
            Some(Address::Static { name, .. }) if *ctx.str(*name) == "pair.K"
        )));
    }

    #[test]
    fn test_member_function_call_synthesizes_self_pointer() {
        let mut compiler = compiler();
        let ctx = compiler.context();

        // struct v { var n: u32; func get(self: *v) u32 { return 42; } }
        let get = Rc::new(cst::Decl::new(
            loc(),
            cst::DeclKind::Function {
                identifier: ident(ctx, "get"),
                template_parameters: Vec::new(),
                parameters: vec![cst::FunctionParameter {
                    location: loc(),
                    identifier: ident(ctx, "self"),
                    typespec: cst::Typespec::new(
                        loc(),
                        cst::TypespecKind::Pointer(Box::new(ts_named(ctx, "v"))),
                    ),
                }],
                return_typespec: ts_named(ctx, "u32"),
                body: cst::BlockNode {
                    location: loc(),
                    stmts: vec![cst::StmtNode {
                        location: loc(),
                        kind: cst::StmtKind::Return(Some(int_lit(ctx, 42, ""))),
                    }],
                },
            },
        ));
        let v = Rc::new(cst::Decl::new(
            loc(),
            cst::DeclKind::Struct {
                identifier: ident(ctx, "v"),
                template_parameters: Vec::new(),
                members: vec![
                    cst::Member {
                        location: loc(),
                        name: ctx.intern("n"),
                        kind: cst::MemberKind::Variable {
                            identifier: ident(ctx, "n"),
                            typespec: ts_named(ctx, "u32"),
                        },
                    },
                    cst::Member {
                        location: loc(),
                        name: ctx.intern("get"),
                        kind: cst::MemberKind::Function(get),
                    },
                ],
            },
        ));

        // func main() void {
        //     var s: v = (:v){.n = 7};
        //     var m: u32 = s.get();
        // }
        let struct_literal = cst::ExprNode::new(
            loc(),
            cst::ExprKind::Struct {
                typespec: ts_named(ctx, "v"),
                initializers: vec![cst::MemberInitializer {
                    location: loc(),
                    identifier: ident(ctx, "n"),
                    expr: int_lit(ctx, 7, ""),
                }],
            },
        );
        let declare_s = Rc::new(cst::Decl::new(
            loc(),
            cst::DeclKind::Variable {
                identifier: ident(ctx, "s"),
                typespec: Some(ts_named(ctx, "v")),
                expr: struct_literal,
            },
        ));
        let call = cst::ExprNode::new(
            loc(),
            cst::ExprKind::Call {
                function: Box::new(cst::ExprNode::new(
                    loc(),
                    cst::ExprKind::AccessMember {
                        lhs: Box::new(path_expr(ctx, &["s"])),
                        member: cst::SymbolElement {
                            location: loc(),
                            identifier: ident(ctx, "get"),
                            template_arguments: Vec::new(),
                        },
                    },
                )),
                arguments: Vec::new(),
            },
        );
        let declare_m = Rc::new(cst::Decl::new(
            loc(),
            cst::DeclKind::Variable {
                identifier: ident(ctx, "m"),
                typespec: Some(ts_named(ctx, "u32")),
                expr: call,
            },
        ));
        let main = func_decl(
            ctx,
            "main",
            ts_named(ctx, "void"),
            vec![
                cst::StmtNode {
                    location: loc(),
                    kind: cst::StmtKind::Decl(declare_s),
                },
                cst::StmtNode {
                    location: loc(),
                    kind: cst::StmtKind::Decl(declare_m),
                },
            ],
        );

        load(&mut compiler, module(vec![v, main])).unwrap();
        let ctx = compiler.context();

        let main_func = ctx
            .functions
            .iter()
            .find(|function| *ctx.str(function.name) == "main")
            .expect("main was resolved");
        let block = main_func.body.as_ref().expect("main body resolved");

        // The second statement assigns the call result; its callee is the
        // member function with a synthesized `&s` first argument.
        match &block.stmts[1].kind {
            StmtKind::Assign { rhs, .. } => match &rhs.kind {
                ExprKind::Call { arguments, .. } => {
                    assert_eq!(arguments.len(), 1);
                    match &arguments[0].kind {
                        ExprKind::Unary { op, .. } => {
                            assert_eq!(*op, crate::tir::UnaryOp::AddressOf);
                            assert_eq!(*ctx.type_name(arguments[0].ty), "*v");
                        }
                        other => panic!("expected address-of argument, got {:?}", other),
                    }
                }
                other => panic!("expected call expression, got {:?}", other),
            },
            other => panic!("expected assignment, got {:?}", other),
        }
    }

    #[test]
    fn test_break_captures_defer_chain() {
        let mut compiler = compiler();
        let ctx = compiler.context();

        // func f() void { for i in 0:10 { defer {} break; } }
        let loop_body = cst::BlockNode {
            location: loc(),
            stmts: vec![
                cst::StmtNode {
                    location: loc(),
                    kind: cst::StmtKind::Defer(cst::BlockNode {
                        location: loc(),
                        stmts: Vec::new(),
                    }),
                },
                cst::StmtNode {
                    location: loc(),
                    kind: cst::StmtKind::Break,
                },
            ],
        };
        let body = vec![cst::StmtNode {
            location: loc(),
            kind: cst::StmtKind::ForRange {
                identifier: ident(ctx, "i"),
                begin: Some(int_lit(ctx, 0, "")),
                end: int_lit(ctx, 10, ""),
                body: loop_body,
            },
        }];
        let decl = func_decl(ctx, "f", ts_named(ctx, "void"), body);

        load(&mut compiler, module(vec![decl])).unwrap();
        let ctx = compiler.context();

        let function = ctx.functions.iter().next().expect("f was resolved");
        let block = function.body.as_ref().expect("f body resolved");
        let loop_body = match &block.stmts[0].kind {
            StmtKind::ForRange { body, .. } => body,
            other => panic!("expected for-range, got {:?}", other),
        };

        let defer = match &loop_body.stmts[0].kind {
            StmtKind::Defer(defer) => *defer,
            other => panic!("expected defer, got {:?}", other),
        };
        assert!(ctx.defers[defer].prev.is_none());

        // The break runs the loop body's defer and stops at the loop's
        // anchor (no defers were pending when the loop was entered).
        match &loop_body.stmts[1].kind {
            StmtKind::Break {
                defer_begin,
                defer_end,
            } => {
                assert_eq!(*defer_begin, Some(defer));
                assert_eq!(*defer_end, None);
            }
            other => panic!("expected break, got {:?}", other),
        }
        assert_eq!(loop_body.defer_begin, Some(defer));
        assert_eq!(loop_body.defer_end, None);
    }

    #[test]
    fn test_compile_time_address_of_array_element() {
        let mut compiler = compiler();
        let ctx = compiler.context();

        // const arr: [2]u32 = (:[2]u32)[1, 2];
        let arr = const_decl(
            ctx,
            "arr",
            Some(ts_array(ctx, 2, ts_named(ctx, "u32"))),
            cst::ExprNode::new(
                loc(),
                cst::ExprKind::List {
                    typespec: ts_array(ctx, 2, ts_named(ctx, "u32")),
                    elements: vec![int_lit(ctx, 1, ""), int_lit(ctx, 2, "")],
                    ellipsis: None,
                },
            ),
        );
        // const p: *u32 = &arr[1];
        let index = cst::ExprNode::new(
            loc(),
            cst::ExprKind::AccessIndex {
                lhs: Box::new(path_expr(ctx, &["arr"])),
                index: Box::new(int_lit(ctx, 1, "")),
            },
        );
        let address_of = cst::ExprNode::new(
            loc(),
            cst::ExprKind::Unary {
                op: cst::UnaryOpToken {
                    location: loc(),
                    kind: cst::UnaryOpKind::AddressOf,
                },
                rhs: Box::new(index),
            },
        );
        let p = const_decl(
            ctx,
            "p",
            Some(cst::Typespec::new(
                loc(),
                cst::TypespecKind::Pointer(Box::new(ts_named(ctx, "u32"))),
            )),
            address_of,
        );
        // const sl: []u32 = arr[0:2];
        let slice_access = cst::ExprNode::new(
            loc(),
            cst::ExprKind::AccessSlice {
                lhs: Box::new(path_expr(ctx, &["arr"])),
                begin: Box::new(int_lit(ctx, 0, "")),
                end: Box::new(int_lit(ctx, 2, "")),
            },
        );
        let sl = const_decl(
            ctx,
            "sl",
            Some(cst::Typespec::new(
                loc(),
                cst::TypespecKind::Slice(Box::new(ts_named(ctx, "u32"))),
            )),
            slice_access,
        );

        let module = load(&mut compiler, module(vec![arr, p, sl])).unwrap();
        let ctx = compiler.context();

        let p_symbol = lookup_module_symbol(&compiler, module, "p");
        match &ctx.symbols[p_symbol].kind {
            SymbolKind::Constant { value, .. } => match value {
                Value::Pointer {
                    address: Address::Static { name, offset },
                    ..
                } => {
                    assert_eq!(*ctx.str(*name), "arr");
                    assert_eq!(*offset, 4);
                }
                other => panic!("expected static pointer, got {:?}", other),
            },
            other => panic!("expected constant symbol, got {:?}", other),
        }

        let sl_symbol = lookup_module_symbol(&compiler, module, "sl");
        match &ctx.symbols[sl_symbol].kind {
            SymbolKind::Constant { value, .. } => match value {
                Value::Slice { pointer, count, .. } => {
                    match &**pointer {
                        Value::Pointer {
                            ty,
                            address: Address::Static { name, offset },
                        } => {
                            assert_eq!(*ctx.type_name(*ty), "*u32");
                            assert_eq!(*ctx.str(*name), "arr");
                            assert_eq!(*offset, 0);
                        }
                        other => panic!("expected static pointer, got {:?}", other),
                    }
                    match &**count {
                        Value::Integer { value, .. } => assert_eq!(*value, BigInt::from(2)),
                        other => panic!("expected integer count, got {:?}", other),
                    }
                }
                other => panic!("expected slice value, got {:?}", other),
            },
            other => panic!("expected constant symbol, got {:?}", other),
        }
    }

    #[test]
    fn test_struct_member_layout() {
        let mut compiler = compiler();
        let ctx = compiler.context();

        // struct pair { var a: u8; var b: u32; }
        let pair = Rc::new(cst::Decl::new(
            loc(),
            cst::DeclKind::Struct {
                identifier: ident(ctx, "pair"),
                template_parameters: Vec::new(),
                members: vec![
                    cst::Member {
                        location: loc(),
                        name: ctx.intern("a"),
                        kind: cst::MemberKind::Variable {
                            identifier: ident(ctx, "a"),
                            typespec: ts_named(ctx, "u8"),
                        },
                    },
                    cst::Member {
                        location: loc(),
                        name: ctx.intern("b"),
                        kind: cst::MemberKind::Variable {
                            identifier: ident(ctx, "b"),
                            typespec: ts_named(ctx, "u32"),
                        },
                    },
                ],
            },
        ));

        let module = load(&mut compiler, module(vec![pair])).unwrap();
        let ctx = compiler.context();
        let symbol = lookup_module_symbol(&compiler, module, "pair");
        let ty = match ctx.symbols[symbol].kind {
            SymbolKind::Type(ty) => ty,
            _ => panic!("expected type symbol"),
        };

        let members = ctx.types.struct_members(ty);
        assert_eq!(members[0].offset, 0);
        assert_eq!(members[1].offset, 4);
        assert_eq!(ctx.types.size(ty), Some(8));
        assert_eq!(ctx.types.align(ty), Some(4));
        match ctx.types.kind(ty) {
            TyKind::Struct(_) => {}
            other => panic!("expected struct type, got {:?}", other),
        }
    }
}
