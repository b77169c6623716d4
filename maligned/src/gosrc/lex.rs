use logos::Logos;

use crate::helpe::*;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Tok {
    Ident(String),
    /// Any numeric literal, verbatim.
    Number(String),
    /// String, raw string or rune literal. We never need the contents.
    Literal,
    Op(&'static str),
    /// Explicit `;`, or one inserted at a line break.
    Semi,
    Eof,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub tok:    Tok,
    pub line:   u32,
    pub column: u32,
}

impl Token {
    pub fn is_op(&self, op: &str) -> bool {
        matches!(self.tok, Tok::Op(o) if o == op)
    }

    pub fn is_ident(&self, word: &str) -> bool {
        matches!(&self.tok, Tok::Ident(w) if w == word)
    }
}

/// Raw token from logos, before semicolon insertion.
#[derive(Logos, Debug, Clone, Copy, PartialEq, Eq)]
#[logos(skip r"[ \t\r\f]+")]
enum Raw {
    #[regex(r"//[^\n]*", allow_greedy = true)]
    LineComment,
    #[regex(r"/\*([^*]|\*+[^*/])*\*+/")]
    BlockComment,
    // Only ever the longest match when the comment has no end.
    #[token("/*")]
    OpenComment,

    #[token("\n")]
    Newline,

    // An escape never swallows a line break: `.` stops at `\n`.
    #[regex(r#""([^"\\\n]|\\.)*""#)]
    #[regex(r"'([^'\\\n]|\\.)*'")]
    #[regex(r"`[^`]*`")]
    Literal,
    #[token("`")]
    OpenRawString,

    #[regex(r"[0-9][0-9_]*(\.[0-9_]*)?([eE][+-]?[0-9_]+)?i?")]
    #[regex(r"\.[0-9][0-9_]*([eE][+-]?[0-9_]+)?i?")]
    #[regex(r"0[xX][0-9a-fA-F_]*(\.[0-9a-fA-F_]*)?([pP][+-]?[0-9_]+)?i?")]
    #[regex(r"0[oO][0-7_]+i?")]
    #[regex(r"0[bB][01_]+i?")]
    Number,

    #[regex(r"[a-zA-Z_\u{80}-\u{10FFFF}][a-zA-Z0-9_\u{80}-\u{10FFFF}]*")]
    Ident,

    #[token(";")]
    Semi,

    #[token("<<=")] #[token(">>=")] #[token("&^=")] #[token("...")]
    #[token("&&")] #[token("||")] #[token("<-")] #[token("++")] #[token("--")]
    #[token("==")] #[token("!=")] #[token("<=")] #[token(">=")] #[token(":=")]
    #[token("<<")] #[token(">>")] #[token("&^")] #[token("+=")] #[token("-=")]
    #[token("*=")] #[token("/=")] #[token("%=")] #[token("&=")] #[token("|=")]
    #[token("^=")]
    #[token("+")] #[token("-")] #[token("*")] #[token("/")] #[token("%")]
    #[token("&")] #[token("|")] #[token("^")] #[token("<")] #[token(">")]
    #[token("=")] #[token("!")] #[token("~")]
    #[token("(")] #[token(")")] #[token("[")] #[token("]")] #[token("{")]
    #[token("}")] #[token(",")] #[token(".")] #[token(":")]
    Op,
}

const OPS: [&str; 47] = [
    "<<=", ">>=", "&^=", "...",
    "&&", "||", "<-", "++", "--", "==", "!=", "<=", ">=", ":=",
    "<<", ">>", "&^", "+=", "-=", "*=", "/=", "%=", "&=", "|=", "^=",
    "+", "-", "*", "/", "%", "&", "|", "^", "<", ">", "=", "!", "~",
    "(", ")", "[", "]", "{", "}", ",", ".", ":",
];

/// Byte offsets to 1-based lines and columns. Columns count bytes.
struct Lines {
    starts: Vec<usize>,
}

impl Lines {
    fn new(src: &str) -> Self {
        Self {
            starts: std::iter::once(0)
                .chain(src.match_indices('\n').map(|(i, _)| i + 1))
                .collect(),
        }
    }

    fn at(&self, offset: usize) -> (u32, u32) {
        let line = self.starts.partition_point(|s| *s <= offset);
        let start = self.starts[line - 1];

        (line as u32, (offset - start + 1) as u32)
    }
}

/// Splits Go source into tokens, dropping comments and inserting
/// semicolons at line ends the way the Go grammar does.
pub fn lex(src: &str, path: &Arc<Path>) -> Result<Vec<Token>, SourceError> {
    let lines = Lines::new(src);
    let error = |offset: usize, message: String| {
        let (line, column) = lines.at(offset);
        SourceError::Syntax {
            pos: SourcePos { path: path.clone(), line, column },
            message,
        }
    };

    let mut res: Vec<Token> = vec![];
    let push = |res: &mut Vec<Token>, tok: Tok, offset: usize| {
        let (line, column) = lines.at(offset);
        res.push(Token { tok, line, column });
    };
    let mut raw = Raw::lexer(src);
    while let Some(next) = raw.next() {
        let offset = raw.span().start;
        let slice = raw.slice();
        let Ok(kind) = next else {
            return Err(error(offset, format!("unexpected {slice:?}")));
        };
        match kind {
            Raw::LineComment => {},
            // A comment spanning lines acts like a newline.
            Raw::BlockComment => {
                if slice.contains('\n') && ends_statement(&res) {
                    push(&mut res, Tok::Semi, offset);
                }
            },
            Raw::Newline => {
                if ends_statement(&res) {
                    push(&mut res, Tok::Semi, offset);
                }
            },
            Raw::OpenComment => { return Err(error(offset, "comment not terminated".into())); },
            Raw::OpenRawString => { return Err(error(offset, "raw string literal not terminated".into())); },
            Raw::Literal => { push(&mut res, Tok::Literal, offset); },
            Raw::Number => { push(&mut res, Tok::Number(slice.to_string()), offset); },
            Raw::Ident => { push(&mut res, Tok::Ident(slice.to_string()), offset); },
            Raw::Semi => { push(&mut res, Tok::Semi, offset); },
            Raw::Op => {
                let Some(op) = OPS.iter().find(|op| **op == slice) else {
                    return Err(error(offset, format!("unexpected {slice:?}")));
                };
                push(&mut res, Tok::Op(*op), offset);
            },
        }
    }
    if ends_statement(&res) {
        push(&mut res, Tok::Semi, src.len());
    }
    push(&mut res, Tok::Eof, src.len());

    Ok(res)
}

/// Whether the last token may end a statement.
fn ends_statement(res: &[Token]) -> bool {
    res.last().is_some_and(|t| match &t.tok {
        Tok::Ident(_) | Tok::Number(_) | Tok::Literal    => true,
        Tok::Op(op)                                     => matches!(*op, ")" | "]" | "}" | "++" | "--"),
        Tok::Semi | Tok::Eof                            => false,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn path() -> Arc<Path> {
        Arc::from(Path::new("t.go"))
    }

    fn toks(src: &str) -> Vec<Tok> {
        lex(src, &path()).unwrap().into_iter().map(|t| t.tok).collect()
    }

    fn ident(s: &str) -> Tok {
        Tok::Ident(s.to_string())
    }

    #[test]
    fn semicolons_are_inserted_at_line_ends() {
        assert_eq!(
            toks("a int\nb [4]T // tail\n}"),
            vec![
                ident("a"), ident("int"), Tok::Semi,
                ident("b"), Tok::Op("["), Tok::Number("4".into()), Tok::Op("]"), ident("T"), Tok::Semi,
                Tok::Op("}"), Tok::Semi, Tok::Eof,
            ]
        );
    }

    #[test]
    fn no_semicolon_after_open_brace() {
        assert_eq!(
            toks("struct {\n}"),
            vec![ident("struct"), Tok::Op("{"), Tok::Op("}"), Tok::Semi, Tok::Eof]
        );
    }

    #[test]
    fn literals_and_comments_are_opaque() {
        assert_eq!(
            toks("x int `json:\"x\"` /* a\nb */ y '}' \"{\\\"\""),
            vec![
                ident("x"), ident("int"), Tok::Literal, Tok::Semi,
                ident("y"), Tok::Literal, Tok::Literal, Tok::Semi, Tok::Eof,
            ]
        );
    }

    #[test]
    fn numbers_stay_whole() {
        assert_eq!(
            toks("1_000 0x1p-2 .5e+3 0b101 1+2"),
            vec![
                Tok::Number("1_000".into()),
                Tok::Number("0x1p-2".into()),
                Tok::Number(".5e+3".into()),
                Tok::Number("0b101".into()),
                Tok::Number("1".into()), Tok::Op("+"), Tok::Number("2".into()),
                Tok::Semi, Tok::Eof,
            ]
        );
    }

    #[test]
    fn positions_are_one_based() {
        let t = lex("type T\n  struct", &path()).unwrap();
        assert_eq!((t[0].line, t[0].column), (1, 1));
        assert_eq!((t[1].line, t[1].column), (1, 6));
        assert_eq!((t[3].line, t[3].column), (2, 3));
    }

    #[test]
    fn escaped_quotes_in_runes_and_strings() {
        let t = lex("r := '\\''\ns := \"\\\"\\\\\"\nx", &path()).unwrap();
        let got: Vec<_> = t.iter().map(|t| (t.tok.clone(), t.line)).collect();
        assert_eq!(
            got,
            vec![
                (ident("r"), 1), (Tok::Op(":="), 1), (Tok::Literal, 1), (Tok::Semi, 1),
                (ident("s"), 2), (Tok::Op(":="), 2), (Tok::Literal, 2), (Tok::Semi, 2),
                (ident("x"), 3), (Tok::Semi, 3), (Tok::Eof, 3),
            ]
        );
    }

    #[test]
    fn escape_cannot_continue_a_line() {
        let err = lex("a := \"abc\\\nb := 1", &path()).unwrap_err();
        let SourceError::Syntax { pos, .. } = err else { panic!("{err}") };
        assert_eq!((pos.line, pos.column), (1, 6));
    }

    #[test]
    fn multiline_literals_keep_lines_straight() {
        let t = lex("a := `x\ny\nz`\nb", &path()).unwrap();
        let b = t.iter().find(|t| t.is_ident("b")).unwrap();
        assert_eq!((b.line, b.column), (4, 1));
    }

    #[test]
    fn unterminated_comment() {
        assert!(matches!(lex("/* oops", &path()), Err(SourceError::Syntax { .. })));
        assert!(matches!(lex("x `raw", &path()), Err(SourceError::Syntax { .. })));
    }
}
