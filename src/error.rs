//! Error types for the three failure taxonomies: parsing, compilation,
//! and execution.
//!
//! Parse errors are accumulated as plain strings on the parser; compile and
//! runtime failures are first-failure enums. Programmer errors (wrong-variant
//! access, popping an empty stack, undefined opcodes reaching the VM) are
//! not represented here; those abort with a diagnostic.

use thiserror::Error;

use crate::ast::InfixOperator;

/// First failure reported by the compiler.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CompileError {
    #[error("undefined variable {0}")]
    UndefinedVariable(String),

    #[error("variable {0} already defined")]
    AlreadyDefined(String),

    #[error("cannot compile {0}")]
    CannotCompile(&'static str),

    #[error("unknown operator {0}")]
    UnknownOperator(InfixOperator),

    // Limit violations: the bytecode operand widths cap what a program may
    // contain, and the compiler refuses anything that would not encode.
    #[error("too many constants")]
    TooManyConstants,

    #[error("too many globals")]
    TooManyGlobals,

    #[error("too many locals")]
    TooManyLocals,

    #[error("too many arguments")]
    TooManyArguments,

    #[error("bytecode too large")]
    CodeTooLarge,
}

/// First failure reported by the VM. Execution stops at the offending
/// instruction; globals keep whatever was stored before the failure.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RuntimeError {
    #[error("stack overflow")]
    StackOverflow,

    #[error("unsupported type for negation {0}")]
    UnsupportedNegation(&'static str),

    #[error("calling non-function")]
    CallingNonFunction,

    #[error("wrong number of arguments: want {want}, got {got}")]
    WrongNumberOfArguments { want: usize, got: usize },
}

/// Any failure from the lex-parse-compile-run pipeline.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum Error {
    #[error("{}", .0.join("\n"))]
    Parse(Vec<String>),

    #[error(transparent)]
    Compile(#[from] CompileError),

    #[error(transparent)]
    Runtime(#[from] RuntimeError),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
