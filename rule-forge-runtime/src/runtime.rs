//! Sandboxed runtime handle for one compiled rule
//!
//! The guest gets WASI but an empty allow-list for host paths and
//! network hosts, so its only channel to the host is the PDK
//! input/output capability the `TransformWrapper` export uses.

use std::sync::atomic::{AtomicBool, Ordering};

use extism::{Manifest, Plugin, Wasm};
use parking_lot::Mutex;

use rule_forge_core::RuntimeConfig;

use crate::RuntimeError;

const WASM_MAGIC: &[u8; 4] = b"\0asm";
const WASM_PAGE_BYTES: u64 = 64 * 1024;

/// Exported entry point generated by the compile driver.
pub const TRANSFORM_EXPORT: &str = "TransformWrapper";

/// A live, instantiated WASM plugin for one rule.
///
/// Invocations serialize on the plugin mutex, and `close` contends on
/// the same mutex, so a runtime is never torn down mid-invocation. A
/// caller that reaches a runtime after `close` observes
/// [`RuntimeError::Closed`]. Dropping a never-closed `Runtime` releases
/// the sandbox as well.
impl std::fmt::Debug for Runtime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Runtime")
            .field("closed", &self.closed.load(std::sync::atomic::Ordering::Relaxed))
            .finish()
    }
}

pub struct Runtime {
    plugin: Mutex<Option<Plugin>>,
    closed: AtomicBool,
}

impl Runtime {
    /// Instantiate a sandbox from compiled module bytes.
    pub fn new(wasm_bytes: &[u8], limits: &RuntimeConfig) -> Result<Self, RuntimeError> {
        if wasm_bytes.len() < 8 || &wasm_bytes[..4] != WASM_MAGIC {
            return Err(RuntimeError::InvalidModule(
                "missing wasm magic header".to_string(),
            ));
        }

        let max_pages = (limits.max_memory_bytes / WASM_PAGE_BYTES).max(1);
        let max_pages = u32::try_from(max_pages).unwrap_or(u32::MAX);

        // No allowed_hosts / allowed_paths entries: the guest sees no
        // filesystem and no network.
        let manifest = Manifest::new([Wasm::data(wasm_bytes.to_vec())])
            .with_memory_max(max_pages)
            .with_timeout(limits.call_timeout);

        let plugin = Plugin::new(&manifest, [], true)
            .map_err(|e| RuntimeError::Instantiation(e.to_string()))?;

        Ok(Self {
            plugin: Mutex::new(Some(plugin)),
            closed: AtomicBool::new(false),
        })
    }

    /// Invoke the rule's `TransformWrapper` export with `input` and
    /// collect the output bytes.
    pub fn execute_transform(&self, input: &[u8]) -> Result<Vec<u8>, RuntimeError> {
        let mut guard = self.plugin.lock();
        let plugin = guard.as_mut().ok_or(RuntimeError::Closed)?;
        plugin
            .call::<&[u8], Vec<u8>>(TRANSFORM_EXPORT, input)
            .map_err(classify_call_error)
    }

    /// Release the sandbox. Idempotent and safe on an already-released
    /// runtime; blocks until any in-flight invocation has finished.
    pub fn close(&self) {
        let mut guard = self.plugin.lock();
        guard.take();
        self.closed.store(true, Ordering::SeqCst);
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// A handle with no backing plugin, for exercising cache lifecycle
    /// without a compiled module.
    #[cfg(test)]
    pub(crate) fn detached() -> Self {
        Self {
            plugin: Mutex::new(None),
            closed: AtomicBool::new(false),
        }
    }
}

/// The SDK reports traps, deadline overruns, and guest-level failures
/// through one error type; sort them back into the taxonomy callers
/// care about.
fn classify_call_error(err: extism::Error) -> RuntimeError {
    let msg = err.to_string();
    let lower = msg.to_lowercase();
    if lower.contains("timeout")
        || lower.contains("timed out")
        || lower.contains("unreachable")
        || lower.contains("out of bounds")
        || lower.contains("trap")
    {
        RuntimeError::Trap(msg)
    } else {
        RuntimeError::Guest(msg)
    }
}
