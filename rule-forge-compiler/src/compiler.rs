//! Hermetic ahead-of-time compile driver
//!
//! Each compile materializes the guest crate template into a fresh
//! scratch directory, splices the validated user source into
//! `src/lib.rs` together with the generated `TransformWrapper` export,
//! and shells out to `cargo build --target wasm32-wasip1 --release`
//! under a wall-clock budget. The scratch directory is a [`TempDir`],
//! so it is removed on every exit path including unwind.

use std::path::{Path, PathBuf};
use std::process::Stdio;

use tempfile::TempDir;
use tokio::io::AsyncReadExt;
use tokio::process::Command;

use rule_forge_core::CompilerConfig;

use crate::{validator, CompilerError};

const WASM_TARGET: &str = "wasm32-wasip1";

const GUEST_PRELUDE: &str = "use extism_pdk::*;\n";

const GUEST_WRAPPER: &str = r#"
#[allow(non_snake_case)]
#[plugin_fn]
pub fn TransformWrapper(input: Vec<u8>) -> FnResult<Vec<u8>> {
    Ok(transform(&input))
}
"#;

/// Drives the external AOT toolchain for one rule at a time.
///
/// The driver is stateless apart from its configuration and is cheap to
/// share; concurrent compiles get independent scratch directories.
pub struct RuleCompiler {
    config: CompilerConfig,
}

impl RuleCompiler {
    pub fn new(config: CompilerConfig) -> Self {
        Self { config }
    }

    /// Validate `source` and compile it to a WASI module, returning the
    /// `.wasm` bytes. Validation errors propagate unchanged; nothing is
    /// retried.
    pub async fn compile(&self, source: &str, rule_name: &str) -> Result<Vec<u8>, CompilerError> {
        validator::validate(source)?;

        let build_dir = tempfile::Builder::new()
            .prefix("rule-forge-build-")
            .tempdir_in(&self.config.temp_base_dir)?;

        copy_dir_recursive(&self.config.template_dir, build_dir.path())?;

        let lib_rs = build_dir.path().join("src").join("lib.rs");
        tokio::fs::write(&lib_rs, compose_guest_source(source)).await?;

        let wasm_path = self.run_cargo(&build_dir, rule_name).await?;
        let wasm_bytes = tokio::fs::read(&wasm_path).await?;

        tracing::debug!(
            rule = rule_name,
            bytes = wasm_bytes.len(),
            "compiled transform to wasm"
        );

        Ok(wasm_bytes)
    }

    async fn run_cargo(
        &self,
        build_dir: &TempDir,
        rule_name: &str,
    ) -> Result<PathBuf, CompilerError> {
        let mut cmd = Command::new("cargo");
        cmd.args(["build", "--target", WASM_TARGET, "--release"])
            .current_dir(build_dir.path())
            .env("CARGO_TARGET_DIR", build_dir.path().join("target"))
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        // Own process group so a timeout can reap cargo's rustc children
        // too, not just the direct child.
        #[cfg(unix)]
        cmd.process_group(0);

        let mut child = cmd.spawn()?;

        // Drain stderr concurrently; cargo can emit more than a pipe
        // buffer holds and would otherwise block forever on write.
        let stderr_task = child.stderr.take().map(|mut pipe| {
            tokio::spawn(async move {
                let mut buf = Vec::new();
                let _ = pipe.read_to_end(&mut buf).await;
                buf
            })
        });

        let status = match tokio::time::timeout(self.config.timeout, child.wait()).await {
            Ok(waited) => waited?,
            Err(_) => {
                kill_process_group(&child);
                let _ = child.kill().await;
                tracing::warn!(
                    rule = rule_name,
                    timeout = ?self.config.timeout,
                    "compile timed out"
                );
                return Err(CompilerError::Timeout(self.config.timeout));
            }
        };

        let stderr = match stderr_task {
            Some(task) => task.await.unwrap_or_default(),
            None => Vec::new(),
        };

        if !status.success() {
            return Err(CompilerError::Compile(
                String::from_utf8_lossy(&stderr).into_owned(),
            ));
        }

        find_wasm_artifact(&build_dir.path().join("target").join(WASM_TARGET).join("release"))
    }
}

/// Compose the guest `lib.rs`: PDK prelude, the user source verbatim,
/// then the wrapper that moves bytes across the host boundary.
fn compose_guest_source(user_source: &str) -> String {
    format!("{GUEST_PRELUDE}\n{user_source}\n{GUEST_WRAPPER}")
}

fn copy_dir_recursive(src: &Path, dst: &Path) -> std::io::Result<()> {
    std::fs::create_dir_all(dst)?;
    for entry in std::fs::read_dir(src)? {
        let entry = entry?;
        let target = dst.join(entry.file_name());
        if entry.file_type()?.is_dir() {
            copy_dir_recursive(&entry.path(), &target)?;
        } else {
            std::fs::copy(entry.path(), &target)?;
        }
    }
    Ok(())
}

fn find_wasm_artifact(release_dir: &Path) -> Result<PathBuf, CompilerError> {
    std::fs::read_dir(release_dir)?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .find(|path| path.extension().is_some_and(|ext| ext == "wasm"))
        .ok_or(CompilerError::MissingArtifact)
}

#[cfg(unix)]
fn kill_process_group(child: &tokio::process::Child) {
    if let Some(pid) = child.id() {
        unsafe {
            libc::killpg(pid as i32, libc::SIGKILL);
        }
    }
}

#[cfg(not(unix))]
fn kill_process_group(_child: &tokio::process::Child) {}

#[cfg(test)]
mod tests {
    use super::*;

    fn template_dir() -> PathBuf {
        // The workspace-root template, relative to this crate.
        Path::new(env!("CARGO_MANIFEST_DIR")).join("../guest-template")
    }

    fn test_compiler(tmp: &tempfile::TempDir) -> RuleCompiler {
        RuleCompiler::new(CompilerConfig {
            template_dir: template_dir(),
            temp_base_dir: tmp.path().to_path_buf(),
            timeout: std::time::Duration::from_secs(120),
        })
    }

    #[test]
    fn guest_source_wraps_user_code() {
        let composed = compose_guest_source(
            "fn transform(input: &[u8]) -> Vec<u8> { input.to_vec() }",
        );
        assert!(composed.starts_with("use extism_pdk::*;"));
        assert!(composed.contains("fn transform(input: &[u8]) -> Vec<u8>"));
        assert!(composed.contains("pub fn TransformWrapper"));
        assert!(composed.contains("Ok(transform(&input))"));
    }

    #[test]
    fn copies_template_tree() {
        let tmp = tempfile::TempDir::new().unwrap();
        let dst = tmp.path().join("build");
        copy_dir_recursive(&template_dir(), &dst).unwrap();
        assert!(dst.join("Cargo.toml").exists());
        assert!(dst.join("src").join("lib.rs").exists());
    }

    #[test]
    fn missing_artifact_is_reported() {
        let tmp = tempfile::TempDir::new().unwrap();
        let err = find_wasm_artifact(tmp.path()).unwrap_err();
        assert!(matches!(err, CompilerError::MissingArtifact));
    }

    #[tokio::test]
    async fn validation_errors_skip_the_build() {
        let tmp = tempfile::TempDir::new().unwrap();
        let compiler = test_compiler(&tmp);
        let err = compiler
            .compile("fn transform() -> Vec<u8> { Vec::new() }", "bad")
            .await
            .unwrap_err();
        assert!(matches!(err, CompilerError::Validation(_)));
        // No scratch directory should remain.
        assert_eq!(std::fs::read_dir(tmp.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    #[ignore = "requires cargo with the wasm32-wasip1 target and network access"]
    async fn compiles_identity_transform() {
        let tmp = tempfile::TempDir::new().unwrap();
        let compiler = test_compiler(&tmp);
        let wasm = compiler
            .compile(
                "fn transform(input: &[u8]) -> Vec<u8> { input.to_vec() }",
                "echo",
            )
            .await
            .unwrap();
        // Wasm magic number.
        assert_eq!(&wasm[..4], b"\0asm");
        // Scratch directories are cleaned up even on success.
        assert_eq!(std::fs::read_dir(tmp.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    #[ignore = "requires cargo with the wasm32-wasip1 target and network access"]
    async fn surfaces_rustc_errors() {
        let tmp = tempfile::TempDir::new().unwrap();
        let compiler = test_compiler(&tmp);
        let err = compiler
            .compile(
                "fn transform(input: &[u8]) -> Vec<u8> { not_a_function(input) }",
                "broken",
            )
            .await
            .unwrap_err();
        match err {
            CompilerError::Compile(stderr) => assert!(stderr.contains("not_a_function")),
            other => panic!("expected Compile error, got {other:?}"),
        }
    }
}
