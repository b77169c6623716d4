use crate::helpe::*;
use super::parse::{ArrayLen, FieldDecl, TypeDecl, TypeExpr};

/// Turns written types into [`TypeDesc`]s, looking names up among the
/// predeclared types and one package's declarations.
///
/// Whatever can't be pinned down comes back as
/// [`TypeDesc::Unresolved`], never as a guess.
pub struct Resolver<'a> {
    decls:  &'a IndexMap<String, TypeDecl>,
    word:   IntWidth,
}

/// Names visible where a type is written, besides the package's.
#[derive(Clone, Copy)]
struct Scope<'s> {
    params: &'s [String],
    locals: &'s [TypeDecl],
}

/// Where package-level declarations are resolved.
const PACKAGE: Scope<'static> = Scope { params: &[], locals: &[] };

/// A declaration being resolved. Locals are told apart by position,
/// since an inner block may reuse a name.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Decl {
    Package(String),
    Local(usize),
}

#[derive(Default)]
struct Walk {
    visiting:   Vec<Decl>,
    depth:      usize,
}

/// Resolved types deeper than this are not sized.
const MAX_DEPTH: usize = 256;

impl<'a> Resolver<'a> {
    pub fn new(decls: &'a IndexMap<String, TypeDecl>, abi: &AbiParams) -> Self {
        Self {
            decls,
            word: IntWidth::of_word(abi),
        }
    }

    /// Resolves the fields of a struct literal. `params` are the type
    /// parameters in scope at the literal, `locals` the block-level type
    /// declarations, innermost last.
    pub fn resolve_fields(&self, fields: &[FieldDecl], params: &[String], locals: &[TypeDecl]) -> TypeDesc {
        self.fields(fields, Scope { params, locals }, &mut Walk::default())
    }

    fn fields(&self, fields: &[FieldDecl], scope: Scope, walk: &mut Walk) -> TypeDesc {
        TypeDesc::structure(fields
            .iter()
            .map(|f| (f.name.clone(), self.resolve(&f.ty, scope, walk))))
    }

    fn resolve(&self, ty: &TypeExpr, scope: Scope, walk: &mut Walk) -> TypeDesc {
        if walk.depth == MAX_DEPTH {
            return TypeDesc::Unresolved("type nested too deeply".into());
        }
        walk.depth += 1;
        let res = match ty {
            TypeExpr::Ref               => TypeDesc::Pointer,
            TypeExpr::Slice             => TypeDesc::Slice,
            TypeExpr::Interface         => TypeDesc::Interface,
            TypeExpr::Array { len: ArrayLen::Known(n), elem } => {
                TypeDesc::array(self.resolve(elem, scope, walk), *n)
            },
            TypeExpr::Array { len: ArrayLen::Unknown(text), .. } => {
                TypeDesc::Unresolved(format!("array length {text}"))
            },
            TypeExpr::Struct(fields)    => self.fields(fields, scope, walk),
            TypeExpr::Named { pkg: Some(pkg), name, generic: false } => {
                if pkg == "unsafe" && name == "Pointer" {
                    TypeDesc::Pointer
                } else {
                    TypeDesc::Unresolved(format!("{pkg}.{name}"))
                }
            },
            TypeExpr::Named { pkg, name, generic: true } => {
                let full = match pkg {
                    Some(p) => format!("{p}.{name}"),
                    None    => name.clone(),
                };
                TypeDesc::Unresolved(format!("{full}[...]"))
            },
            TypeExpr::Named { pkg: None, name, generic: false } => {
                self.named(name, scope, walk)
            },
        };
        walk.depth -= 1;

        res
    }

    /// Innermost scope first: enclosing blocks, type parameters, the
    /// package, and finally the predeclared types.
    fn named(&self, name: &str, scope: Scope, walk: &mut Walk) -> TypeDesc {
        if let Some(i) = scope.locals.iter().rposition(|d| d.name == name) {
            // A local declaration sees the blocks around it, and only
            // what was declared before it.
            let inner = Scope { params: scope.params, locals: &scope.locals[..=i] };
            return self.declared(&scope.locals[i], Decl::Local(i), inner, walk);
        }
        if scope.params.iter().any(|p| p == name) {
            return TypeDesc::Unresolved(format!("type parameter {name}"));
        }
        // Package declarations shadow predeclared names. They are
        // resolved in package scope, where nothing local is visible.
        if let Some(decl) = self.decls.get(name) {
            return self.declared(decl, Decl::Package(name.to_string()), PACKAGE, walk);
        }

        self.predeclared(name)
            .unwrap_or_else(|| TypeDesc::Unresolved(name.to_string()))
    }

    fn declared(&self, decl: &TypeDecl, key: Decl, scope: Scope, walk: &mut Walk) -> TypeDesc {
        let name = &decl.name;
        if decl.generic {
            return TypeDesc::Unresolved(format!("{name} without type arguments"));
        }
        if walk.visiting.contains(&key) {
            return TypeDesc::Unresolved(format!("invalid recursive type {name}"));
        }
        walk.visiting.push(key);
        let res = self.resolve(&decl.ty, scope, walk);
        walk.visiting.pop();

        res
    }

    fn predeclared(&self, name: &str) -> Option<TypeDesc> {
        use ScalarKind::*;
        let scalar = match name {
            "bool"                      => Bool,
            "int8"                      => Int(IntWidth::W8),
            "int16"                     => Int(IntWidth::W16),
            "int32" | "rune"            => Int(IntWidth::W32),
            "int64"                     => Int(IntWidth::W64),
            "int"                       => Int(self.word),
            "uint8" | "byte"            => Uint(IntWidth::W8),
            "uint16"                    => Uint(IntWidth::W16),
            "uint32"                    => Uint(IntWidth::W32),
            "uint64"                    => Uint(IntWidth::W64),
            "uint" | "uintptr"          => Uint(self.word),
            "float32"                   => Float32,
            "float64"                   => Float64,
            "complex64"                 => Complex64,
            "complex128"                => Complex128,
            "string"                    => { return Some(TypeDesc::Str); },
            "error" | "any"             => { return Some(TypeDesc::Interface); },
            _                           => { return None; },
        };

        Some(TypeDesc::Scalar(scalar))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn named(name: &str) -> TypeExpr {
        TypeExpr::Named { pkg: None, name: name.into(), generic: false }
    }

    fn field(name: &str, ty: TypeExpr) -> FieldDecl {
        FieldDecl { name: name.into(), ty }
    }

    fn decl(name: &str, ty: TypeExpr) -> (String, TypeDecl) {
        (name.to_string(), TypeDecl { name: name.into(), generic: false, ty })
    }

    fn types(t: &TypeDesc) -> Vec<TypeDesc> {
        t.fields().unwrap().iter().map(|f| f.ty.clone()).collect()
    }

    #[test]
    fn platform_ints_follow_word_size() {
        let decls = IndexMap::new();
        let fields = [field("i", named("int")), field("p", named("uintptr"))];
        let on64 = Resolver::new(&decls, &AbiParams::for_profile("amd64").unwrap());
        let on32 = Resolver::new(&decls, &AbiParams::for_profile("386").unwrap());
        assert_eq!(
            types(&on64.resolve_fields(&fields, &[], &[])),
            vec![TypeDesc::INT64, TypeDesc::Scalar(ScalarKind::Uint(IntWidth::W64))]
        );
        assert_eq!(
            types(&on32.resolve_fields(&fields, &[], &[])),
            vec![TypeDesc::INT32, TypeDesc::Scalar(ScalarKind::Uint(IntWidth::W32))]
        );
    }

    #[test]
    fn named_types_resolve_through_the_package() {
        let decls: IndexMap<_, _> = [
            decl("ID", named("int64")),
            decl("Inner", TypeExpr::Struct(vec![field("ok", named("bool"))])),
            decl("Buf", TypeExpr::Array { len: ArrayLen::Known(2), elem: Box::new(named("ID")) }),
        ].into_iter().collect();
        let r = Resolver::new(&decls, &AbiParams::default());
        let got = r.resolve_fields(&[
            field("id", named("ID")),
            field("in", named("Inner")),
            field("buf", named("Buf")),
        ], &[], &[]);
        assert_eq!(
            types(&got),
            vec![
                TypeDesc::INT64,
                TypeDesc::structure([("ok", TypeDesc::BOOL)]),
                TypeDesc::array(TypeDesc::INT64, 2),
            ]
        );
    }

    #[test]
    fn unknowns_fail_closed() {
        let decls: IndexMap<_, _> = [
            decl("Loop", TypeExpr::Struct(vec![field("self", named("Loop"))])),
            decl("Linked", TypeExpr::Struct(vec![field("next", TypeExpr::Ref)])),
        ].into_iter().collect();
        let r = Resolver::new(&decls, &AbiParams::default());
        let got = r.resolve_fields(&[
            field("t", TypeExpr::Named { pkg: Some("time".into()), name: "Time".into(), generic: false }),
            field("u", TypeExpr::Named { pkg: Some("unsafe".into()), name: "Pointer".into(), generic: false }),
            field("p", named("T")),
            field("l", named("Loop")),
            field("n", named("Linked")),
            field("a", TypeExpr::Array { len: ArrayLen::Unknown("N".into()), elem: Box::new(named("int")) }),
            field("x", named("Mystery")),
        ], &["T".to_string()], &[]);
        assert_eq!(
            types(&got),
            vec![
                TypeDesc::Unresolved("time.Time".into()),
                TypeDesc::Pointer,
                TypeDesc::Unresolved("type parameter T".into()),
                TypeDesc::structure([("self", TypeDesc::Unresolved("invalid recursive type Loop".into()))]),
                TypeDesc::structure([("next", TypeDesc::Pointer)]),
                TypeDesc::Unresolved("array length N".into()),
                TypeDesc::Unresolved("Mystery".into()),
            ]
        );
    }

    #[test]
    fn block_declarations_shadow_the_package() {
        let decls: IndexMap<_, _> = [
            decl("T", TypeExpr::Array { len: ArrayLen::Known(64), elem: Box::new(named("byte")) }),
            decl("W", named("T")),
        ].into_iter().collect();
        let locals = [
            decl("T", named("int8")).1,
            decl("U", named("T")).1,
            decl("Self", TypeExpr::Struct(vec![field("s", named("Self"))])).1,
            decl("U", named("uint16")).1,
        ];
        let r = Resolver::new(&decls, &AbiParams::default());
        let got = r.resolve_fields(&[
            field("t", named("T")),
            field("u", named("U")),
            field("w", named("W")),
            field("s", named("Self")),
        ], &[], &locals);
        assert_eq!(
            types(&got),
            vec![
                TypeDesc::Scalar(ScalarKind::Int(IntWidth::W8)),
                TypeDesc::Scalar(ScalarKind::Uint(IntWidth::W16)),
                // Package declarations never see the block.
                TypeDesc::array(TypeDesc::Scalar(ScalarKind::Uint(IntWidth::W8)), 64),
                TypeDesc::structure([("s", TypeDesc::Unresolved("invalid recursive type Self".into()))]),
            ]
        );
    }

    #[test]
    fn earlier_block_declarations_see_earlier_names() {
        let decls = IndexMap::new();
        // `type A int32; type B A; type A bool` inside one block is
        // illegal Go, but nested blocks allow it.
        let locals = [
            decl("A", named("int32")).1,
            decl("B", named("A")).1,
            decl("A", named("bool")).1,
        ];
        let r = Resolver::new(&decls, &AbiParams::default());
        let got = r.resolve_fields(&[field("b", named("B")), field("a", named("A"))], &[], &locals);
        assert_eq!(types(&got), vec![TypeDesc::INT32, TypeDesc::BOOL]);
    }
}
