//! Service configuration
//!
//! `Config::from_env` reads the process environment once at startup.
//! `DATABASE_URL` and `JWT_SECRET` are required; everything else has a
//! default. The nested tuning structs are plain in-process knobs and are
//! not sourced from the environment.

use std::time::Duration;

use crate::CoreError;

/// Runtime cache tuning.
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Total byte budget for live runtimes
    pub max_cost_bytes: u64,
    /// Size hint for the admission frequency sketch
    pub num_counters: u64,
    /// Size hint for the write buffers
    pub buffer_items: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_cost_bytes: 100 << 20,
            num_counters: 1000,
            buffer_items: 64,
        }
    }
}

/// Compiler driver tuning.
#[derive(Debug, Clone)]
pub struct CompilerConfig {
    /// Guest crate template copied into every build directory
    pub template_dir: std::path::PathBuf,
    /// Base directory for scratch build directories
    pub temp_base_dir: std::path::PathBuf,
    /// Wall-clock budget for one external compile
    pub timeout: Duration,
}

impl Default for CompilerConfig {
    fn default() -> Self {
        Self {
            template_dir: "guest-template".into(),
            temp_base_dir: std::env::temp_dir(),
            timeout: Duration::from_secs(30),
        }
    }
}

/// Per-runtime sandbox limits.
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    /// Linear memory cap for one guest instance
    pub max_memory_bytes: u64,
    /// Wall-clock budget for one invocation
    pub call_timeout: Duration,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            max_memory_bytes: 64 * 1024 * 1024,
            call_timeout: Duration::from_secs(1),
        }
    }
}

/// Top-level service configuration.
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub jwt_secret: String,
    pub host: String,
    pub port: u16,
    pub cache: CacheConfig,
    pub compiler: CompilerConfig,
    pub runtime: RuntimeConfig,
}

impl Config {
    pub fn from_env() -> Result<Self, CoreError> {
        let database_url =
            std::env::var("DATABASE_URL").map_err(|_| CoreError::MissingEnv("DATABASE_URL"))?;
        let jwt_secret =
            std::env::var("JWT_SECRET").map_err(|_| CoreError::MissingEnv("JWT_SECRET"))?;

        let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
        let port = match std::env::var("PORT") {
            Ok(raw) => raw.parse::<u16>().map_err(|e| CoreError::InvalidEnv {
                var: "PORT",
                reason: e.to_string(),
            })?,
            Err(_) => 8080,
        };

        Ok(Self {
            database_url,
            jwt_secret,
            host,
            port,
            cache: CacheConfig::default(),
            compiler: CompilerConfig::default(),
            runtime: RuntimeConfig::default(),
        })
    }
}
