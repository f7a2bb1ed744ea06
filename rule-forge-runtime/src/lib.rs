//! WASM runtime management for rule-forge
//!
//! A [`Runtime`] wraps one instantiated plugin compiled from a rule's
//! stored `.wasm` binary. The [`RuntimeCache`] keeps live runtimes per
//! `(user_id, name)` under a byte-cost budget so the hot path never pays
//! instantiation latency.

pub mod cache;
pub mod error;
pub mod runtime;

pub use cache::{RuleKey, RuntimeCache};
pub use error::RuntimeError;
pub use runtime::Runtime;
