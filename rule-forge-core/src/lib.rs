//! Core domain models for rule-forge
//!
//! This crate contains the shared data structures used across
//! the rule-execution service: Rule, User, the request/response
//! DTOs, and the service configuration.

pub mod config;
pub mod error;
pub mod models;

pub use config::{CacheConfig, CompilerConfig, Config, RuntimeConfig};
pub use error::CoreError;
pub use models::*;
