//! Token kinds produced by the lexer (spec.md §3, §4.1).

use ruff_text_size::TextRange;

/// A single lexical token plus its source span.
///
/// Spans are `(offset, length)` pairs via `ruff_text_size::TextRange` — a
/// small, dependency-free crate already shaped exactly like spec.md's span
/// requirement, so it is kept even though the rest of ruff's parsing stack
/// is not (see `DESIGN.md`).
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub span: TextRange,
}

impl Token {
    pub fn new(kind: TokenKind, span: TextRange) -> Self {
        Self { kind, span }
    }
}

/// Discriminated token variant.
#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    // Literals
    Int(i64),
    Float(f64),
    Str(Box<str>),
    Ident(Box<str>),

    // Keywords of the supported subset (spec.md §3).
    Def,
    Class,
    If,
    Elif,
    Else,
    For,
    While,
    Return,
    Import,
    From,
    As,
    Async,
    True,
    False,
    None,
    And,
    Or,
    Not,
    In,
    Is,
    /// Not in spec.md's keyword table, but required to parse an empty
    /// `if`/`while`/`for`/function body — the smallest real Python subset
    /// that round-trips through indentation needs a no-op statement.
    Pass,

    // Operators, maximal-munch.
    Plus,
    Minus,
    Star,
    Slash,
    DoubleSlash,
    Percent,
    DoubleStar,
    Amp,
    Pipe,
    Caret,
    Tilde,
    LShift,
    RShift,
    Lt,
    LtEq,
    Gt,
    GtEq,
    EqEq,
    NotEq,
    Eq,
    PlusEq,
    MinusEq,
    StarEq,
    SlashEq,
    DoubleSlashEq,
    PercentEq,
    DoubleStarEq,
    AmpEq,
    PipeEq,
    CaretEq,

    // Punctuation
    Arrow,
    Colon,
    Comma,
    Dot,
    LParen,
    RParen,
    LBracket,
    RBracket,
    LBrace,
    RBrace,

    // Structural
    Newline,
    Indent,
    Dedent,
    Eof,
}

impl TokenKind {
    /// Human-readable name used in `ParseError::UnexpectedToken` messages.
    #[must_use]
    pub fn describe(&self) -> String {
        match self {
            Self::Ident(name) => format!("identifier {name:?}"),
            Self::Int(value) => format!("integer {value}"),
            Self::Float(value) => format!("float {value}"),
            Self::Str(value) => format!("string {value:?}"),
            Self::Eof => "end of file".to_owned(),
            Self::Newline => "newline".to_owned(),
            Self::Indent => "indent".to_owned(),
            Self::Dedent => "dedent".to_owned(),
            other => format!("{other:?}"),
        }
    }
}
