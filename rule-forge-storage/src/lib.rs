//! Storage layer for rule-forge
//!
//! Provides persistence for rules and accounts. PostgreSQL is the
//! production backend; the in-memory implementation backs tests and
//! local development.

pub mod error;
pub mod memory;
pub mod postgres;
pub mod traits;

pub use error::StorageError;
pub use memory::InMemoryStorage;
pub use postgres::PgStorage;
pub use traits::{RuleStore, UserStore};

/// Unified storage trait
#[async_trait::async_trait]
pub trait Storage: RuleStore + UserStore + Send + Sync {}

#[async_trait::async_trait]
impl<T> Storage for T where T: RuleStore + UserStore + Send + Sync {}
