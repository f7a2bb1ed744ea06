//! Runtime error types

use thiserror::Error;

#[derive(Error, Debug)]
pub enum RuntimeError {
    #[error("invalid wasm module: {0}")]
    InvalidModule(String),

    #[error("failed to instantiate plugin: {0}")]
    Instantiation(String),

    #[error("guest trapped: {0}")]
    Trap(String),

    #[error("guest returned an error: {0}")]
    Guest(String),

    #[error("host error: {0}")]
    Host(String),

    #[error("runtime is closed")]
    Closed,
}
