//! Service facade orchestrating compiler, storage, and runtime cache
//!
//! The facade is stateless per request and cheap to share behind an
//! `Arc`. The runtime cache is the only shared mutable structure; a
//! long compile never blocks unrelated executes.

use std::sync::Arc;

use serde_json::Value;

use rule_forge_compiler::RuleCompiler;
use rule_forge_core::{CompilerConfig, Rule, RuntimeConfig};
use rule_forge_runtime::{RuleKey, Runtime, RuntimeCache, RuntimeError};
use rule_forge_storage::Storage;

use crate::ServiceError;

pub struct RuleService {
    storage: Arc<dyn Storage>,
    compiler: RuleCompiler,
    cache: RuntimeCache,
    limits: RuntimeConfig,
}

impl RuleService {
    pub fn new(
        storage: Arc<dyn Storage>,
        compiler_config: CompilerConfig,
        cache: RuntimeCache,
        limits: RuntimeConfig,
    ) -> Self {
        Self {
            storage,
            compiler: RuleCompiler::new(compiler_config),
            cache,
            limits,
        }
    }

    /// Validate, compile, and persist a rule. The cache entry for the
    /// key is invalidated before returning so the next execute
    /// re-instantiates against the fresh binary.
    pub async fn save_rule(
        &self,
        user_id: i64,
        name: &str,
        source_code: &str,
    ) -> Result<Rule, ServiceError> {
        let wasm = self.compiler.compile(source_code, name).await?;
        let rule = self
            .storage
            .upsert_rule(user_id, name, source_code, &wasm)
            .await?;

        self.cache.delete(&RuleKey::new(user_id, name));

        tracing::info!(
            user_id,
            rule = name,
            wasm_bytes = rule.wasm_binary.len(),
            created = rule.is_freshly_created(),
            "saved rule"
        );
        Ok(rule)
    }

    /// Execute a rule against a JSON input. The input crosses the
    /// sandbox boundary as encoded bytes; the output is decoded back to
    /// JSON when possible and wrapped as a string otherwise.
    pub async fn execute_rule(
        &self,
        user_id: i64,
        name: &str,
        input: &Value,
    ) -> Result<Value, ServiceError> {
        let input_bytes =
            serde_json::to_vec(input).map_err(|e| ServiceError::Internal(e.to_string()))?;
        let key = RuleKey::new(user_id, name);

        if let Some(runtime) = self.cache.get(&key) {
            match self.invoke(runtime, input_bytes.clone()).await {
                // The handle lost a race with eviction between our get
                // and the call; re-instantiate from the store below.
                Err(ServiceError::Runtime(RuntimeError::Closed)) => {}
                other => return other,
            }
        }

        let rule = self
            .storage
            .get_rule(user_id, name)
            .await?
            .ok_or_else(|| ServiceError::RuleNotFound(name.to_string()))?;

        let limits = self.limits.clone();
        let cost = rule.wasm_binary.len() as u64;
        let wasm = rule.wasm_binary;
        let runtime = tokio::task::spawn_blocking(move || Runtime::new(&wasm, &limits))
            .await
            .map_err(|e| ServiceError::Internal(e.to_string()))??;
        let runtime = Arc::new(runtime);

        self.cache.set(key, runtime.clone(), cost);

        self.invoke(runtime, input_bytes).await
    }

    pub async fn get_rule(
        &self,
        user_id: i64,
        name: &str,
    ) -> Result<Option<Rule>, ServiceError> {
        Ok(self.storage.get_rule(user_id, name).await?)
    }

    pub async fn list_rules(&self, user_id: i64) -> Result<Vec<Rule>, ServiceError> {
        Ok(self.storage.list_rules(user_id).await?)
    }

    /// Delete the stored rule and invalidate its cache entry.
    pub async fn delete_rule(&self, user_id: i64, name: &str) -> Result<(), ServiceError> {
        self.storage.delete_rule(user_id, name).await?;
        self.cache.delete(&RuleKey::new(user_id, name));
        tracing::info!(user_id, rule = name, "deleted rule");
        Ok(())
    }

    async fn invoke(
        &self,
        runtime: Arc<Runtime>,
        input: Vec<u8>,
    ) -> Result<Value, ServiceError> {
        let output = tokio::task::spawn_blocking(move || runtime.execute_transform(&input))
            .await
            .map_err(|e| ServiceError::Internal(e.to_string()))??;
        Ok(decode_output(output))
    }
}

fn decode_output(bytes: Vec<u8>) -> Value {
    match serde_json::from_slice(&bytes) {
        Ok(value) => value,
        Err(_) => Value::String(String::from_utf8_lossy(&bytes).into_owned()),
    }
}
