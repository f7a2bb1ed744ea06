//! Compiler error types

use std::time::Duration;

use thiserror::Error;

/// Static-analysis rejections of the submitted source.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Syntax error: {0}")]
    Syntax(String),

    #[error("transform function not found")]
    MissingTransform,

    #[error("transform is defined {0} times, expected exactly one")]
    DuplicateTransform(usize),

    #[error("wrong arity: {0}")]
    WrongArity(&'static str),

    #[error("wrong type: {0}")]
    WrongType(&'static str),
}

#[derive(Error, Debug)]
pub enum CompilerError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("compilation timed out after {0:?}")]
    Timeout(Duration),

    #[error("compilation failed: {0}")]
    Compile(String),

    #[error("compiler produced no wasm artifact")]
    MissingArtifact,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
