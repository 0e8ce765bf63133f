//! The AST model (spec.md §3).
//!
//! Each node owns its children (`Box`/`Vec`, no arena, no shared pointers);
//! spans are stored inline on every node rather than in a side table, the
//! way the teacher's `ExprLoc`/`CodeRange` pairing keeps a node and its
//! source location together.

use ruff_text_size::TextRange;

pub type Span = TextRange;

#[derive(Debug, Clone)]
pub struct Module {
    pub body: Vec<Stmt>,
}

#[derive(Debug, Clone)]
pub struct Param {
    pub name: Box<str>,
    pub hint: Option<Box<str>>,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub struct FunctionDef {
    pub name: Box<str>,
    pub params: Vec<Param>,
    pub return_hint: Option<Box<str>>,
    pub body: Vec<Stmt>,
    pub is_async: bool,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub struct ClassDef {
    pub name: Box<str>,
    /// Methods only; bare string docstrings are parsed but dropped here the
    /// way top-level docstring `ExprStmt`s are dropped from `Module`.
    pub methods: Vec<FunctionDef>,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub struct If {
    pub test: Expr,
    pub body: Vec<Stmt>,
    pub orelse: Vec<Stmt>,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub struct While {
    pub test: Expr,
    pub body: Vec<Stmt>,
    pub span: Span,
}

/// A `for` loop's target: a single name, or a parenthesis-less tuple of
/// names, lowered uniformly (spec.md §4.2).
#[derive(Debug, Clone)]
pub enum ForTarget {
    Name(Box<str>),
    Tuple(Vec<Box<str>>),
}

#[derive(Debug, Clone)]
pub struct For {
    pub target: ForTarget,
    pub iter: Expr,
    pub body: Vec<Stmt>,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub struct Return {
    pub value: Option<Expr>,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub enum AssignTarget {
    Name(Box<str>, Span),
    Attribute { value: Box<Expr>, attr: Box<str>, span: Span },
    Tuple(Vec<AssignTarget>, Span),
}

impl AssignTarget {
    #[must_use]
    pub fn span(&self) -> Span {
        match self {
            Self::Name(_, span) | Self::Tuple(_, span) => *span,
            Self::Attribute { span, .. } => *span,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Assign {
    pub targets: Vec<AssignTarget>,
    pub value: Expr,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub struct ExprStmt {
    pub value: Expr,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub struct Import {
    pub module: Box<str>,
    pub alias: Option<Box<str>>,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub struct ImportFrom {
    pub module: Box<str>,
    /// `(imported name, optional alias)` pairs.
    pub names: Vec<(Box<str>, Option<Box<str>>)>,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub enum Stmt {
    FunctionDef(FunctionDef),
    ClassDef(ClassDef),
    If(If),
    While(While),
    For(For),
    Return(Return),
    Assign(Assign),
    ExprStmt(ExprStmt),
    Import(Import),
    ImportFrom(ImportFrom),
    Pass(Span),
}

impl Stmt {
    #[must_use]
    pub fn span(&self) -> Span {
        match self {
            Self::FunctionDef(n) => n.span,
            Self::ClassDef(n) => n.span,
            Self::If(n) => n.span,
            Self::While(n) => n.span,
            Self::For(n) => n.span,
            Self::Return(n) => n.span,
            Self::Assign(n) => n.span,
            Self::ExprStmt(n) => n.span,
            Self::Import(n) => n.span,
            Self::ImportFrom(n) => n.span,
            Self::Pass(span) => *span,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Constant {
    Int(i64),
    Float(f64),
    Str(Box<str>),
    Bool(bool),
    None,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    Add,
    Sub,
    Mul,
    Div,
    FloorDiv,
    Mod,
    Pow,
    BitAnd,
    BitOr,
    BitXor,
    LShift,
    RShift,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOperator {
    Plus,
    Minus,
    Not,
    Invert,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoolOperator {
    And,
    Or,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CmpOperator {
    Lt,
    LtEq,
    Gt,
    GtEq,
    Eq,
    NotEq,
    In,
    Is,
}

#[derive(Debug, Clone)]
pub enum Expr {
    Constant(Constant, Span),
    Name(Box<str>, Span),
    BinOp { op: Operator, left: Box<Expr>, right: Box<Expr>, span: Span },
    UnaryOp { op: UnaryOperator, operand: Box<Expr>, span: Span },
    BoolOp { op: BoolOperator, values: Vec<Expr>, span: Span },
    Compare { left: Box<Expr>, op: CmpOperator, right: Box<Expr>, span: Span },
    Call { func: Box<Expr>, args: Vec<Expr>, span: Span },
    Attribute { value: Box<Expr>, attr: Box<str>, span: Span },
    Subscript { value: Box<Expr>, index: Box<Expr>, span: Span },
    List(Vec<Expr>, Span),
    Tuple(Vec<Expr>, Span),
    Dict(Vec<(Expr, Expr)>, Span),
    IfExp { test: Box<Expr>, body: Box<Expr>, orelse: Box<Expr>, span: Span },
}

impl Expr {
    #[must_use]
    pub fn span(&self) -> Span {
        match self {
            Self::Constant(_, span)
            | Self::Name(_, span)
            | Self::BinOp { span, .. }
            | Self::UnaryOp { span, .. }
            | Self::BoolOp { span, .. }
            | Self::Compare { span, .. }
            | Self::Call { span, .. }
            | Self::Attribute { span, .. }
            | Self::Subscript { span, .. }
            | Self::List(_, span)
            | Self::Tuple(_, span)
            | Self::Dict(_, span)
            | Self::IfExp { span, .. } => *span,
        }
    }

    /// Used only by the analyzer's string-concat over-approximation: is this
    /// expression itself an `Add` `BinOp` node? (spec.md §4.3 rule 4, and the
    /// Open Question in §9 about `(1+2)+"x"`.)
    #[must_use]
    pub fn is_add(&self) -> bool {
        matches!(self, Self::BinOp { op: Operator::Add, .. })
    }
}
