//! Compiler for user-submitted transform programs
//!
//! This crate handles static validation of the submitted Rust fragment
//! and the hermetic ahead-of-time build that turns it into a WASI
//! `.wasm` module exporting the `TransformWrapper` entry point.

pub mod compiler;
pub mod error;
pub mod validator;

pub use compiler::RuleCompiler;
pub use error::{CompilerError, ValidationError};
