//! Centralised error hierarchy for the interpreter.
//!
//! Every phase (scanner, parser, resolver, runtime, CLI) converts its failure
//! modes into one of the variants defined here, enabling a uniform `Result<T>`
//! alias throughout the crate. Runtime failures are a nested enum so each
//! failure mode stays a typed variant instead of a bare string.
//!
//! `Return`/`Break` unwinds are *not* errors and never appear here; they live
//! in [`crate::interpreter::Unwind`].

use std::io;

use log::info;
use thiserror::Error;

/// Canonical error type used throughout the interpreter.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum LoxError {
    /// Lexical (scanner) error with source line information.
    #[error("[line {line}] Error: {message}")]
    Lex { message: String, line: usize },

    /// Syntactic (parser) error. The message carries a windowed token
    /// context with a caret marking the offending token.
    #[error("[line {line}] Error: {message}")]
    Parse { message: String, line: usize },

    /// Static-analysis failure from the resolver pass.
    #[error("[line {line}] Error: {message}")]
    Resolve { message: String, line: usize },

    /// Runtime evaluation error.
    #[error("Runtime error: {0}")]
    Runtime(#[from] RuntimeError),

    /// Wrapper around `std::io::Error`. Enables `?` on I/O ops.
    #[error(transparent)]
    Io(#[from] io::Error),

    /// UTF-8 decoding failure when ingesting external text.
    #[error(transparent)]
    Utf8(#[from] std::string::FromUtf8Error),
}

impl LoxError {
    /// Helper constructor for the **scanner**.
    pub fn lex<S: Into<String>>(line: usize, msg: S) -> Self {
        let message: String = msg.into();

        info!("Creating Lex error: line={}, msg={}", line, message);

        LoxError::Lex { message, line }
    }

    /// Helper constructor for the **parser**.
    pub fn parse<S: Into<String>>(line: usize, msg: S) -> Self {
        let message: String = msg.into();

        info!("Creating Parse error: line={}, msg={}", line, message);

        LoxError::Parse { message, line }
    }

    /// Helper constructor for the **resolver**.
    pub fn resolve<S: Into<String>>(line: usize, msg: S) -> Self {
        let message: String = msg.into();

        info!("Creating Resolve error: line={}, msg={}", line, message);

        LoxError::Resolve { message, line }
    }
}

/// Typed runtime failures raised by the evaluator.
#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error("[line {line}] operand of '{operator}' must be a number")]
    NumberOperand { operator: String, line: usize },

    #[error("[line {line}] operands of '{operator}' must be numbers")]
    NumberOperands { operator: String, line: usize },

    #[error("[line {line}] operands of '+' must be two numbers or two strings")]
    AddOperands { line: usize },

    #[error("[line {line}] undefined variable '{name}'")]
    UndefinedVariable { name: String, line: usize },

    #[error("[line {line}] '{name}' is already declared in this environment")]
    AlreadyDeclared { name: String, line: usize },

    #[error("[line {line}] can only call functions and classes")]
    NotCallable { line: usize },

    #[error("[line {line}] expected {expected} arguments but got {got}")]
    ArityMismatch {
        expected: usize,
        got: usize,
        line: usize,
    },

    #[error("[line {line}] only instances have properties")]
    NotAnInstance { line: usize },

    #[error("[line {line}] undefined property '{name}'")]
    UndefinedProperty { name: String, line: usize },

    #[error("[line {line}] superclass must be a class")]
    SuperclassNotClass { line: usize },

    #[error("'return' or 'break' unwound past the top level")]
    UnexpectedUnwind,
}

/// Crate-wide `Result` alias.
pub type Result<T> = std::result::Result<T, LoxError>;
