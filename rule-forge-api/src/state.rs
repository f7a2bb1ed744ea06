//! Application state shared across handlers

use std::sync::Arc;

use rule_forge_core::{CacheConfig, CompilerConfig, Config, RuntimeConfig};
use rule_forge_runtime::RuntimeCache;
use rule_forge_storage::Storage;

use crate::{AuthService, RuleService};

/// Shared application state
pub struct AppState {
    pub storage: Arc<dyn Storage>,
    pub service: RuleService,
    pub auth: AuthService,
}

impl AppState {
    pub fn from_config(storage: Arc<dyn Storage>, config: &Config) -> Self {
        Self::build(
            storage,
            &config.jwt_secret,
            config.cache.clone(),
            config.compiler.clone(),
            config.runtime.clone(),
        )
    }

    /// State with default tuning, used by tests and local development.
    pub fn with_storage(storage: Arc<dyn Storage>, jwt_secret: &str) -> Self {
        Self::build(
            storage,
            jwt_secret,
            CacheConfig::default(),
            CompilerConfig::default(),
            RuntimeConfig::default(),
        )
    }

    fn build(
        storage: Arc<dyn Storage>,
        jwt_secret: &str,
        cache: CacheConfig,
        compiler: CompilerConfig,
        runtime: RuntimeConfig,
    ) -> Self {
        let service = RuleService::new(
            storage.clone(),
            compiler,
            RuntimeCache::new(&cache),
            runtime,
        );

        Self {
            storage,
            service,
            auth: AuthService::new(jwt_secret),
        }
    }
}
