//! Error types for every pipeline stage.
//!
//! Matches the teacher's layering in `repl_error.rs`/`resource.rs`: each stage
//! gets its own `Debug + Clone` enum with a hand-written `Display` impl (no
//! `thiserror` — the teacher's core crate does not depend on it either), and
//! `CompileError` is the top-level enum a caller matches on, built up through
//! `From` conversions the way `ReplError` wraps `ParseError`/`CompileError`.

use std::{fmt, io, path::PathBuf};

use ruff_text_size::TextRange;

/// Lexical errors (spec.md tier 1: "compile-time, user-fixable").
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LexError {
    /// A byte sequence could not be tokenized.
    UnexpectedCharacter { found: char, span: TextRange },
    /// Indentation did not match any enclosing level on dedent, or used
    /// inconsistent whitespace.
    BadIndentation { span: TextRange },
    /// A string literal was not closed before the end of the line (or, for
    /// triple-quoted strings, before end of file).
    UnterminatedString { span: TextRange },
}

impl fmt::Display for LexError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnexpectedCharacter { found, span } => {
                write!(f, "unexpected character {found:?} at {span:?}")
            }
            Self::BadIndentation { span } => write!(f, "inconsistent indentation at {span:?}"),
            Self::UnterminatedString { span } => write!(f, "unterminated string literal at {span:?}"),
        }
    }
}

impl std::error::Error for LexError {}

/// Syntactic and restriction errors raised while building the AST.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    /// A token appeared where the grammar did not expect it.
    UnexpectedToken { found: String, span: TextRange },
    /// An expression was expected but the token stream did not start one.
    ExpectedExpression { span: TextRange },
    /// A class body contained something other than a method or a bare
    /// docstring expression.
    UnsupportedClassMember { span: TextRange },
    /// An assignment or `for` target was not a name, attribute, or tuple of
    /// names.
    UnsupportedTarget { span: TextRange },
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnexpectedToken { found, span } => {
                write!(f, "unexpected token {found} at {span:?}")
            }
            Self::ExpectedExpression { span } => write!(f, "expected expression at {span:?}"),
            Self::UnsupportedClassMember { span } => {
                write!(f, "class bodies may only contain methods and docstrings, at {span:?}")
            }
            Self::UnsupportedTarget { span } => write!(f, "unsupported assignment target at {span:?}"),
        }
    }
}

impl std::error::Error for ParseError {}

/// Restriction errors raised while emitting Zig source from an analyzed AST.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EmitError {
    /// A `for` loop's iterable was not `range(...)`, `enumerate(...)`, or
    /// `zip(...)`.
    UnsupportedForLoop { span: TextRange },
    /// `import`/`from ... import` named a module other than `json` or `http`.
    UnsupportedImport { module: Box<str>, span: TextRange },
    /// `range(...)` was called with zero arguments or more than three.
    InvalidRangeArgs { span: TextRange },
    /// `enumerate(...)`'s target was not a two-name tuple.
    InvalidEnumerateTarget { span: TextRange },
    /// `zip(...)`'s target arity did not match the number of zipped operands.
    InvalidZipTarget { span: TextRange },
}

impl fmt::Display for EmitError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnsupportedForLoop { span } => write!(f, "unsupported for-loop shape at {span:?}"),
            Self::UnsupportedImport { module, span } => {
                write!(f, "unsupported import {module:?} at {span:?}")
            }
            Self::InvalidRangeArgs { span } => write!(f, "range() takes 1 to 3 arguments, at {span:?}"),
            Self::InvalidEnumerateTarget { span } => {
                write!(f, "enumerate() target must be a 2-tuple, at {span:?}")
            }
            Self::InvalidZipTarget { span } => {
                write!(f, "zip() target arity does not match operand count, at {span:?}")
            }
        }
    }
}

impl std::error::Error for EmitError {}

/// Tier 2: compile-time, tool-environment errors (spec.md §7).
#[derive(Debug)]
pub enum ToolError {
    /// The `zig` compiler could not be found or failed to start.
    ToolchainNotFound { path: PathBuf, source: io::Error },
    /// Reading the source file, writing the scratch directory, or writing
    /// the cache sidecar failed.
    Io { path: PathBuf, source: io::Error },
    /// The `zig` compiler ran but exited with a non-zero status.
    CompilerFailed { status: Option<i32>, stderr: String },
}

impl fmt::Display for ToolError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ToolchainNotFound { path, source } => {
                write!(f, "could not run zig compiler at {}: {source}", path.display())
            }
            Self::Io { path, source } => write!(f, "I/O error on {}: {source}", path.display()),
            Self::CompilerFailed { status, stderr } => {
                write!(f, "zig compiler failed (status {status:?}):\n{stderr}")
            }
        }
    }
}

impl std::error::Error for ToolError {}

/// Top-level error type returned by the public compile/run entry points.
#[derive(Debug)]
pub enum CompileError {
    Lex(LexError),
    Parse(ParseError),
    Emit(EmitError),
    Tool(ToolError),
}

impl fmt::Display for CompileError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Lex(error) => write!(f, "lex error: {error}"),
            Self::Parse(error) => write!(f, "parse error: {error}"),
            Self::Emit(error) => write!(f, "emit error: {error}"),
            Self::Tool(error) => write!(f, "{error}"),
        }
    }
}

impl std::error::Error for CompileError {}

impl From<LexError> for CompileError {
    fn from(error: LexError) -> Self {
        Self::Lex(error)
    }
}

impl From<ParseError> for CompileError {
    fn from(error: ParseError) -> Self {
        Self::Parse(error)
    }
}

impl From<EmitError> for CompileError {
    fn from(error: EmitError) -> Self {
        Self::Emit(error)
    }
}

impl From<ToolError> for CompileError {
    fn from(error: ToolError) -> Self {
        Self::Tool(error)
    }
}
