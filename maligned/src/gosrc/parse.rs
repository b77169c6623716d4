use crate::helpe::*;
use super::lex::{Tok, Token};

/// A type as written, before any name is looked up.
///
/// Reference-like types do not keep what they point to: their layout
/// never depends on it. This is also what lets a struct point to itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeExpr {
    Named {
        pkg:        Option<String>,
        name:       String,
        /// Instantiated with type arguments.
        generic:    bool,
    },
    /// Pointer, map, channel or function.
    Ref,
    Slice,
    Interface,
    Array {
        len:    ArrayLen,
        elem:   Box<TypeExpr>,
    },
    Struct(Vec<FieldDecl>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArrayLen {
    Known(ByteSize),
    /// A constant expression or `...`, kept verbatim.
    Unknown(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldDecl {
    pub name:   String,
    pub ty:     TypeExpr,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeDecl {
    pub name:       String,
    pub generic:    bool,
    pub ty:         TypeExpr,
}

/// A `struct { ... }` literal, wherever it appeared.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StructSite {
    pub line:       u32,
    pub column:     u32,
    /// Set when the literal is what a type declaration declares.
    pub name:       Option<String>,
    /// Type parameters in scope. Fields naming one can't be sized.
    pub params:     Vec<String>,
    /// Type declarations of the enclosing blocks that are in scope,
    /// innermost last.
    pub locals:     Vec<TypeDecl>,
    pub fields:     Vec<FieldDecl>,
}

#[derive(Debug, Clone, Default)]
pub struct ParsedFile {
    pub package:    String,
    /// Package-level type declarations only.
    pub decls:      Vec<TypeDecl>,
    /// Every struct literal in the file, in source order.
    pub structs:    Vec<StructSite>,
}

/// Picks the struct types and type declarations out of a Go file. The
/// rest of the file is skimmed over, only keeping track of braces.
pub fn parse(toks: &[Token], path: &Arc<Path>) -> Result<ParsedFile, SourceError> {
    let mut p = Parser {
        toks,
        path,
        pos:            0,
        depth:          0,
        params:         vec![],
        func_params:    vec![],
        locals:         vec![],
        nesting:        0,
        res:            ParsedFile::default(),
    };
    p.run()?;
    p.res.structs.sort_by_key(|s| (s.line, s.column));

    Ok(p.res)
}

struct Parser<'a> {
    toks:           &'a [Token],
    path:           &'a Arc<Path>,
    pos:            usize,
    depth:          i64,
    /// Type parameters of the declaration being parsed.
    params:         Vec<String>,
    /// Type parameters of the function we're in, if any.
    func_params:    Vec<String>,
    /// Block-scoped type declarations, with the depth they live at.
    locals:         Vec<(i64, TypeDecl)>,
    /// How deep into a type expression we are.
    nesting:        usize,
    res:            ParsedFile,
}

/// Deeper type expressions are rejected rather than recursed into.
const MAX_NESTING: usize = 100;

impl Parser<'_> {
    fn run(&mut self) -> Result<(), SourceError> {
        loop {
            let t = self.peek(0).clone();
            match &t.tok {
                Tok::Eof => { break; },
                Tok::Ident(w) if w == "package" && self.depth == 0 && self.res.package.is_empty() => {
                    self.next();
                    self.res.package = self.ident()?;
                },
                // Not `x.(type)`.
                Tok::Ident(w) if w == "type" && (matches!(self.peek(1).tok, Tok::Ident(_)) || self.peek(1).is_op("(")) => {
                    self.next();
                    self.type_decls()?;
                },
                Tok::Ident(w) if w == "struct" && self.peek(1).is_op("{") => {
                    self.parse_struct(None)?;
                },
                // A declaration, not a function literal.
                Tok::Ident(w) if w == "func" && self.depth == 0 && self.starts_statement() => {
                    self.next();
                    self.func_header()?;
                },
                Tok::Ident(w) if self.depth == 0 && matches!(w.as_str(), "var" | "const" | "import") => {
                    self.func_params.clear();
                    self.next();
                },
                Tok::Op("{") => {
                    self.depth += 1;
                    self.next();
                },
                Tok::Op("}") => {
                    self.depth -= 1;
                    if self.depth < 0 {
                        return Err(self.error("unbalanced `}`"));
                    }
                    if self.depth == 0 { self.func_params.clear(); }
                    self.locals.retain(|(d, _)| *d <= self.depth);
                    self.next();
                },
                _ => { self.next(); },
            }
        }

        Ok(())
    }

    // ---- Token plumbing ----

    fn starts_statement(&self) -> bool {
        self.pos == 0 || matches!(self.toks[self.pos - 1].tok, Tok::Semi)
    }

    fn peek(&self, n: usize) -> &Token {
        let last = self.toks.len() - 1;
        &self.toks[(self.pos + n).min(last)]
    }

    fn next(&mut self) {
        if self.pos < self.toks.len() - 1 {
            self.pos += 1;
        }
    }

    fn error(&self, message: &str) -> SourceError {
        let t = self.peek(0);
        SourceError::Syntax {
            pos:        SourcePos { path: self.path.clone(), line: t.line, column: t.column },
            message:    message.to_string(),
        }
    }

    fn expect(&mut self, op: &str) -> Result<(), SourceError> {
        if self.peek(0).is_op(op) {
            self.next();
            Ok(())
        } else {
            Err(self.error(&format!("expected `{op}`")))
        }
    }

    fn ident(&mut self) -> Result<String, SourceError> {
        if let Tok::Ident(w) = &self.peek(0).tok {
            let w = w.clone();
            self.next();
            Ok(w)
        } else {
            Err(self.error("expected identifier"))
        }
    }

    /// Index of the token closing the group opened at `self.pos + from`.
    fn matching(&self, from: usize) -> Option<usize> {
        let (open, close) = match &self.peek(from).tok {
            Tok::Op("(") => ("(", ")"),
            Tok::Op("[") => ("[", "]"),
            Tok::Op("{") => ("{", "}"),
            _ => { return None; },
        };
        let mut level = 0;
        for (i, t) in self.toks.iter().enumerate().skip(self.pos + from) {
            if t.is_op(open) { level += 1; }
            else if t.is_op(close) {
                level -= 1;
                if level == 0 { return Some(i); }
            }
        }

        None
    }

    /// Skips a bracketed group, still picking up any struct literal
    /// inside it.
    fn skip_group(&mut self) -> Result<(), SourceError> {
        let Some(end) = self.matching(0) else {
            return Err(self.error("unclosed bracket"));
        };
        self.next();
        while self.pos < end {
            if self.peek(0).is_ident("struct") && self.peek(1).is_op("{") {
                self.parse_struct(None)?;
            } else {
                self.next();
            }
        }
        self.next();

        Ok(())
    }

    /// Names declared by a type parameter list, which starts at the
    /// current `[`. Each comma-separated entry starts with its name.
    fn type_params(&mut self) -> Result<Vec<String>, SourceError> {
        let Some(end) = self.matching(0) else {
            return Err(self.error("unclosed type parameter list"));
        };
        let mut names = vec![];
        let mut entry_start = true;
        let mut level = 0;
        self.next();
        while self.pos < end {
            let t = self.peek(0);
            match &t.tok {
                Tok::Ident(w) if entry_start => { names.push(w.clone()); },
                Tok::Op("(" | "[" | "{") => { level += 1; },
                Tok::Op(")" | "]" | "}") => { level -= 1; },
                _ => {},
            }
            entry_start = level == 0 && t.is_op(",");
            self.next();
        }
        self.next();

        Ok(names)
    }

    // ---- Declarations ----

    fn type_decls(&mut self) -> Result<(), SourceError> {
        if !self.peek(0).is_op("(") {
            return self.type_spec();
        }
        self.next();
        loop {
            match &self.peek(0).tok {
                Tok::Semi => { self.next(); },
                Tok::Op(")") => {
                    self.next();
                    return Ok(());
                },
                Tok::Eof => { return Err(self.error("unexpected end of file in type declaration")); },
                _ => { self.type_spec()?; },
            }
        }
    }

    fn type_spec(&mut self) -> Result<(), SourceError> {
        let name = self.ident()?;
        // `type A[T any] ...` declares parameters; `type A [N]T` is an array.
        let generic = self.peek(0).is_op("[")
            && matches!(self.peek(1).tok, Tok::Ident(_))
            && matches!(&self.peek(2).tok, Tok::Ident(_) | Tok::Op("," | "~"));
        let params = if generic { self.type_params()? } else { vec![] };
        if self.peek(0).is_op("=") {
            self.next();
        }

        // A block-level type is in scope inside its own declaration.
        // Until we know what it is, it stands for itself, which only
        // resolves as a recursive type.
        let local = self.depth > 0;
        if local {
            let itself = TypeExpr::Named { pkg: None, name: name.clone(), generic: false };
            self.locals.push((self.depth, TypeDecl { name: name.clone(), generic, ty: itself }));
        }

        let outer = std::mem::replace(&mut self.params, params);
        let ty = if self.peek(0).is_ident("struct") {
            self.parse_struct(Some(name.clone()))
        } else {
            self.parse_type()
        };
        self.params = outer;
        let ty = ty?;

        if local {
            if let Some((_, decl)) = self.locals.last_mut() {
                decl.ty = ty;
            }
        } else {
            self.res.decls.push(TypeDecl { name, generic, ty });
        }
        if matches!(self.peek(0).tok, Tok::Semi) {
            self.next();
        }

        Ok(())
    }

    /// Remembers the type parameters of a function or method, so that
    /// struct literals in its signature and body know about them.
    fn func_header(&mut self) -> Result<(), SourceError> {
        self.func_params.clear();
        if self.peek(0).is_op("(") {
            // Receiver: `(r *List[T, U])` names T and U.
            let Some(end) = self.matching(0) else {
                return Err(self.error("unclosed receiver"));
            };
            self.next();
            let named = matches!(self.peek(0).tok, Tok::Ident(_))
                && (matches!(self.peek(1).tok, Tok::Ident(_)) || self.peek(1).is_op("*"));
            if named { self.next(); }
            if self.peek(0).is_op("*") { self.next(); }
            if matches!(self.peek(0).tok, Tok::Ident(_)) && self.peek(1).is_op("[") {
                self.next();
                let mut names = self.type_params()?;
                self.func_params.append(&mut names);
            }
            self.pos = end;
            self.next();
        }
        if matches!(self.peek(0).tok, Tok::Ident(_)) && self.peek(1).is_op("[") {
            self.next();
            let mut names = self.type_params()?;
            self.func_params.append(&mut names);
        }

        Ok(())
    }

    // ---- Types ----

    fn parse_type(&mut self) -> Result<TypeExpr, SourceError> {
        if self.nesting == MAX_NESTING {
            return Err(self.error("type nested too deeply"));
        }
        self.nesting += 1;
        let res = self.type_expr();
        self.nesting -= 1;

        res
    }

    fn type_expr(&mut self) -> Result<TypeExpr, SourceError> {
        let t = self.peek(0).clone();
        match &t.tok {
            Tok::Ident(w) => match w.as_str() {
                "struct"    => self.parse_struct(None),
                "interface" => {
                    self.next();
                    self.skip_group()?;
                    Ok(TypeExpr::Interface)
                },
                "map"       => {
                    self.next();
                    self.expect("[")?;
                    self.parse_type()?;
                    self.expect("]")?;
                    self.parse_type()?;
                    Ok(TypeExpr::Ref)
                },
                "chan"      => {
                    self.next();
                    if self.peek(0).is_op("<-") { self.next(); }
                    self.parse_type()?;
                    Ok(TypeExpr::Ref)
                },
                "func"      => {
                    self.next();
                    self.signature()?;
                    Ok(TypeExpr::Ref)
                },
                _           => self.type_name(),
            },
            Tok::Op("*") => {
                self.next();
                self.parse_type()?;
                Ok(TypeExpr::Ref)
            },
            Tok::Op("<-") => {
                self.next();
                if !self.peek(0).is_ident("chan") {
                    return Err(self.error("expected `chan`"));
                }
                self.next();
                self.parse_type()?;
                Ok(TypeExpr::Ref)
            },
            Tok::Op("[") => {
                self.next();
                if self.peek(0).is_op("]") {
                    self.next();
                    self.parse_type()?;
                    return Ok(TypeExpr::Slice);
                }
                let len = self.array_len()?;
                let elem = self.parse_type()?;
                Ok(TypeExpr::Array { len, elem: Box::new(elem) })
            },
            Tok::Op("(") => {
                self.next();
                let ty = self.parse_type()?;
                self.expect(")")?;
                Ok(ty)
            },
            _ => Err(self.error("expected type")),
        }
    }

    /// `T`, `pkg.T`, or either with type arguments.
    fn type_name(&mut self) -> Result<TypeExpr, SourceError> {
        let first = self.ident()?;
        let (pkg, name) = if self.peek(0).is_op(".") {
            self.next();
            (Some(first), self.ident()?)
        } else {
            (None, first)
        };
        let generic = self.peek(0).is_op("[");
        if generic {
            self.skip_group()?;
        }

        Ok(TypeExpr::Named { pkg, name, generic })
    }

    /// Reads an array length and its closing `]`.
    fn array_len(&mut self) -> Result<ArrayLen, SourceError> {
        let number = match &self.peek(0).tok {
            Tok::Number(n) if self.peek(1).is_op("]") => Some(n.clone()),
            _ => None,
        };
        if let Some(n) = number {
            let len = match parse_int(&n) {
                Some(v) => ArrayLen::Known(v),
                None    => ArrayLen::Unknown(n),
            };
            self.next();
            self.next();
            return Ok(len);
        }
        // Anything else, verbatim, up to the matching `]`.
        let start = self.pos;
        let mut level = 0;
        loop {
            match &self.peek(0).tok {
                Tok::Eof => { return Err(self.error("unclosed array length")); },
                Tok::Op("[" | "(") => { level += 1; },
                Tok::Op(")") => { level -= 1; },
                Tok::Op("]") if level == 0 => { break; },
                Tok::Op("]") => { level -= 1; },
                _ => {},
            }
            self.next();
        }
        let text = self.toks[start..self.pos]
            .iter()
            .map(|t| match &t.tok {
                Tok::Ident(w) | Tok::Number(w) => w.as_str(),
                Tok::Op(o) => *o,
                _ => "",
            })
            .join("");
        self.next();

        Ok(ArrayLen::Unknown(text))
    }

    /// Parameters and results of a function type.
    fn signature(&mut self) -> Result<(), SourceError> {
        if !self.peek(0).is_op("(") {
            return Err(self.error("expected `(`"));
        }
        self.skip_group()?;
        match &self.peek(0).tok {
            Tok::Op("(") => { self.skip_group()?; },
            Tok::Ident(_) | Tok::Op("*" | "[" | "<-") => { self.parse_type()?; },
            _ => {},
        }

        Ok(())
    }

    fn parse_struct(&mut self, name: Option<String>) -> Result<TypeExpr, SourceError> {
        let (line, column) = (self.peek(0).line, self.peek(0).column);
        self.next();
        self.expect("{")?;
        let mut fields = vec![];
        loop {
            match &self.peek(0).tok {
                Tok::Semi => {
                    self.next();
                    continue;
                },
                Tok::Op("}") => {
                    self.next();
                    break;
                },
                Tok::Eof => { return Err(self.error("unexpected end of file in struct type")); },
                _ => {},
            }
            self.field_decl(&mut fields)?;
            // Tag.
            if matches!(self.peek(0).tok, Tok::Literal) {
                self.next();
            }
            match &self.peek(0).tok {
                Tok::Semi => { self.next(); },
                Tok::Op("}") => {},
                _ => { return Err(self.error("expected `;` or `}` after field")); },
            }
        }

        let params = self.params
            .iter()
            .chain(self.func_params.iter())
            .cloned()
            .collect();
        let locals = self.locals
            .iter()
            .map(|(_, d)| d.clone())
            .collect();
        self.res.structs.push(StructSite {
            line,
            column,
            name,
            params,
            locals,
            fields: fields.clone(),
        });

        Ok(TypeExpr::Struct(fields))
    }

    fn field_decl(&mut self, fields: &mut Vec<FieldDecl>) -> Result<(), SourceError> {
        if self.peek(0).is_op("*") {
            // Embedded pointer.
            self.next();
            let TypeExpr::Named { name, .. } = self.type_name()? else {
                return Err(self.error("expected embedded type name"));
            };
            fields.push(FieldDecl { name, ty: TypeExpr::Ref });
            return Ok(());
        }

        let after = &self.peek(1).tok;
        let embedded = match after {
            Tok::Semi | Tok::Literal | Tok::Op("}" | ".") => true,
            // `List[int]` is embedded; `buf [4]byte` is a field.
            Tok::Op("[") => self.matching(1).is_some_and(|end| {
                matches!(
                    self.toks.get(end + 1).map(|t| &t.tok),
                    Some(Tok::Semi | Tok::Literal | Tok::Op("}"))
                )
            }),
            _ => false,
        };
        if embedded {
            let ty = self.type_name()?;
            let TypeExpr::Named { name, .. } = &ty else {
                return Err(self.error("expected embedded type name"));
            };
            fields.push(FieldDecl { name: name.clone(), ty });
            return Ok(());
        }

        let mut names = vec![self.ident()?];
        while self.peek(0).is_op(",") {
            self.next();
            names.push(self.ident()?);
        }
        let ty = self.parse_type()?;
        fields.extend(names
            .into_iter()
            .map(|name| FieldDecl { name, ty: ty.clone() }));

        Ok(())
    }
}

/// Go integer literal syntax: decimal, `0x`, `0o`, `0b`, legacy leading
/// zero octal, `_` separators.
pub fn parse_int(text: &str) -> Option<ByteSize> {
    let clean: String = text.chars().filter(|c| *c != '_').collect();
    let lower = clean.to_ascii_lowercase();
    let (digits, radix) = if let Some(d) = lower.strip_prefix("0x") {
        (d, 16)
    } else if let Some(d) = lower.strip_prefix("0o") {
        (d, 8)
    } else if let Some(d) = lower.strip_prefix("0b") {
        (d, 2)
    } else if lower.len() > 1 && lower.starts_with('0') {
        (&lower[1..], 8)
    } else {
        (lower.as_str(), 10)
    };

    ByteSize::from_str_radix(digits, radix).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use super::super::lex::lex;
    use pretty_assertions::assert_eq;

    fn parse_str(src: &str) -> ParsedFile {
        let path: Arc<Path> = Arc::from(Path::new("t.go"));
        parse(&lex(src, &path).unwrap(), &path).unwrap()
    }

    fn named(name: &str) -> TypeExpr {
        TypeExpr::Named { pkg: None, name: name.into(), generic: false }
    }

    #[test]
    fn int_literals() {
        assert_eq!(parse_int("42"), Some(42));
        assert_eq!(parse_int("0x1F"), Some(31));
        assert_eq!(parse_int("0o17"), Some(15));
        assert_eq!(parse_int("017"), Some(15));
        assert_eq!(parse_int("0b101"), Some(5));
        assert_eq!(parse_int("1_000"), Some(1000));
        assert_eq!(parse_int("0"), Some(0));
        assert_eq!(parse_int("1.5"), None);
    }

    #[test]
    fn field_shapes() {
        let f = parse_str("package p\ntype T struct {\n a, b int `json:\"a\"`\n *Embedded\n io.Reader\n buf [4]byte\n List[int]\n m map[string]struct{}\n}\n");
        assert_eq!(f.package, "p");
        assert_eq!(f.decls.len(), 1);
        let site = f.structs.iter().find(|s| s.name.as_deref() == Some("T")).unwrap();
        let names: Vec<&str> = site.fields.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["a", "b", "Embedded", "Reader", "buf", "List", "m"]);
        assert_eq!(site.fields[0].ty, named("int"));
        assert_eq!(site.fields[2].ty, TypeExpr::Ref);
        assert_eq!(
            site.fields[3].ty,
            TypeExpr::Named { pkg: Some("io".into()), name: "Reader".into(), generic: false }
        );
        assert_eq!(
            site.fields[4].ty,
            TypeExpr::Array { len: ArrayLen::Known(4), elem: Box::new(named("byte")) }
        );
        assert_eq!(site.fields[6].ty, TypeExpr::Ref);
        // The map's value type counts as a struct literal of its own.
        assert_eq!(f.structs.len(), 2);
    }

    #[test]
    fn finds_structs_everywhere() {
        let f = parse_str(r#"
package p

type (
    A struct { x int }
    B = struct { y struct { z bool } }
)

func f() {
    var v struct { w string }
    _ = v
    type local struct { q int8 }
}
"#);
        let found: Vec<(u32, Option<&str>)> = f.structs
            .iter()
            .map(|s| (s.line, s.name.as_deref()))
            .collect();
        assert_eq!(
            found,
            vec![(5, Some("A")), (6, Some("B")), (6, None), (10, None), (12, Some("local"))]
        );
        // Local declarations are not package-level.
        let decls: Vec<&str> = f.decls.iter().map(|d| d.name.as_str()).collect();
        assert_eq!(decls, vec!["A", "B"]);
    }

    #[test]
    fn generic_parameters_are_scoped() {
        let f = parse_str(r#"
package p

type Pair[K comparable, V any] struct { k K; v V }

type Arr [N]int

func (l *List[T]) m() { _ = struct{ t T }{} }

type Plain struct { x int }
"#);
        assert_eq!(f.structs[0].params, vec!["K", "V"]);
        assert_eq!(f.structs[1].params, vec!["T"]);
        assert!(f.structs[2].params.is_empty());
        assert!(f.decls[0].generic);
        assert_eq!(
            f.decls[1].ty,
            TypeExpr::Array { len: ArrayLen::Unknown("N".into()), elem: Box::new(named("int")) }
        );
    }

    #[test]
    fn function_types_and_channels() {
        let f = parse_str("package p\ntype T struct {\n f func(a, b int) (string, error)\n g func() *T\n c <-chan int\n d chan<- struct{ x int }\n}\n");
        let t = f.structs.iter().find(|s| s.name.is_some()).unwrap();
        assert!(t.fields.iter().all(|f| f.ty == TypeExpr::Ref));
        assert_eq!(f.structs.len(), 2);
    }

    #[test]
    fn block_types_stay_in_their_block() {
        let f = parse_str(r#"
package p

type T [64]byte

func f() {
    type T int8
    {
        type U T
        _ = struct{ u U }{}
    }
    var v struct{ a T }
}

var w struct{ b T }
"#);
        let locals: Vec<Vec<&str>> = f.structs
            .iter()
            .map(|s| s.locals.iter().map(|d| d.name.as_str()).collect())
            .collect();
        assert_eq!(locals, vec![vec!["T", "U"], vec!["T"], vec![]]);
        assert_eq!(f.structs[1].locals[0].ty, named("int8"));
        let decls: Vec<&str> = f.decls.iter().map(|d| d.name.as_str()).collect();
        assert_eq!(decls, vec!["T"]);
    }

    #[test]
    fn function_literals_are_not_declarations() {
        let f = parse_str(r#"
package p

var h = func(m map[string]int) { _ = struct{ s string; b bool }{} }

func (m Map[K, V]) get(k K) { _ = struct{ k K; v V }{} }

func (Pair[A, B]) swap() { _ = struct{ a A }{} }
"#);
        assert!(f.structs[0].params.is_empty());
        assert_eq!(f.structs[1].params, vec!["K", "V"]);
        assert_eq!(f.structs[2].params, vec!["A", "B"]);
    }

    #[test]
    fn deep_types_are_rejected() {
        let path: Arc<Path> = Arc::from(Path::new("t.go"));
        let src = format!("package p\ntype T struct {{ a {}int }}", "[1]".repeat(500));
        let toks = lex(&src, &path).unwrap();
        let Err(SourceError::Syntax { message, .. }) = parse(&toks, &path) else {
            panic!("nested types were accepted");
        };
        assert_eq!(message, "type nested too deeply");
    }

    #[test]
    fn broken_struct_is_a_syntax_error() {
        let path: Arc<Path> = Arc::from(Path::new("t.go"));
        let toks = lex("package p\ntype T struct { a int b }", &path).unwrap();
        assert!(matches!(parse(&toks, &path), Err(SourceError::Syntax { .. })));
    }
}
