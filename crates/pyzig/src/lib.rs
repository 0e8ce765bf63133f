#![doc = include_str!("../../../README.md")]
#![expect(clippy::needless_pass_by_value, reason = "AST nodes are consumed structurally across stages")]

//! `pyzig`: an ahead-of-time compiler from a statically-typed subset of
//! Python to Zig source, linked against a small reference-counted runtime.
//!
//! The pipeline is strictly linear: [`lexer`] → [`parser`] → [`ast`] →
//! [`analyzer`] → [`emitter`], orchestrated by [`orchestrator::compile`]
//! with build-cache support from [`cache`] and toolchain invocation from
//! [`toolchain`].

pub mod analyzer;
pub mod ast;
pub mod cache;
pub mod config;
pub mod emitter;
pub mod error;
pub mod lexer;
pub mod orchestrator;
pub mod parser;
pub mod runtime_sources;
pub mod symbols;
pub mod token;
pub mod toolchain;

pub use config::{BuildConfig, Mode};
pub use error::CompileError;
pub use orchestrator::{compile, CompileOutcome};
