//! Subprocess extractor
//!
//! Runs `program args... <capture>` and decodes `{ "assets": [...] }` from stdout.

use std::path::{Path, PathBuf};
use std::process::Stdio;

use async_trait::async_trait;
use tokio::process::Command;

use super::{Extractor, ExtractorError};
use crate::models::ExtractorOutput;

/// Longest stderr excerpt carried into diagnostics
const STDERR_EXCERPT: usize = 512;

#[derive(Debug, Clone)]
pub struct CommandExtractor {
    name: String,
    program: String,
    args: Vec<String>,
}

impl CommandExtractor {
    pub fn new(name: impl Into<String>, program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            name: name.into(),
            program: program.into(),
            args,
        }
    }

    /// Script launched through an interpreter, e.g. `python3 parsers/modbusParser.py`
    pub fn script(name: impl Into<String>, interpreter: impl Into<String>, script: PathBuf) -> Self {
        Self::new(name, interpreter, vec![script.to_string_lossy().into_owned()])
    }
}

#[async_trait]
impl Extractor for CommandExtractor {
    fn name(&self) -> &str {
        &self.name
    }

    async fn run(&self, capture: &Path) -> Result<Vec<serde_json::Value>, ExtractorError> {
        // The child dies with this future on timeout or client disconnect
        let output = Command::new(&self.program)
            .args(&self.args)
            .arg(capture)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|source| ExtractorError::Spawn {
                program: self.program.clone(),
                source,
            })?;

        if !output.status.success() {
            return Err(ExtractorError::Exit {
                status: output.status,
                stderr: stderr_excerpt(&output.stderr),
            });
        }

        let parsed: ExtractorOutput = serde_json::from_slice(&output.stdout)?;
        tracing::debug!("{} emitted {} raw assets", self.name, parsed.assets.len());

        Ok(parsed.assets)
    }
}

fn stderr_excerpt(stderr: &[u8]) -> String {
    let text = String::from_utf8_lossy(stderr);
    let text = text.trim();
    match text.char_indices().nth(STDERR_EXCERPT) {
        Some((cut, _)) => format!("{}...", &text[..cut]),
        None => text.to_string(),
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use tokio_test::assert_ok;

    fn write_script(dir: &tempfile::TempDir, name: &str, body: &str) -> PathBuf {
        let path = dir.path().join(name);
        std::fs::write(&path, format!("#!/bin/sh\n{}\n", body)).unwrap();
        path
    }

    #[tokio::test]
    async fn test_decodes_stdout_and_passes_capture_path() {
        let dir = tempfile::tempdir().unwrap();
        let script = write_script(
            &dir,
            "echo_path.sh",
            r#"echo "{\"assets\": [{\"protocol\": \"Modbus\", \"ip\": \"$1\"}]}""#,
        );
        let extractor = CommandExtractor::script("modbus", "sh", script);

        let assets = assert_ok!(extractor.run(Path::new("/tmp/cap1.pcap")).await);
        assert_eq!(assets.len(), 1);
        assert_eq!(assets[0]["protocol"], "Modbus");
        assert_eq!(assets[0]["ip"], "/tmp/cap1.pcap");
    }

    #[tokio::test]
    async fn test_badly_typed_record_does_not_fail_extractor() {
        let dir = tempfile::tempdir().unwrap();
        let script = write_script(
            &dir,
            "mixed.sh",
            r#"echo '{"assets": [{"protocol": "Modbus", "ip": "10.0.0.1"}, {"protocol": "Modbus", "ip": "10.0.0.2", "vendor": 7}]}'"#,
        );
        let extractor = CommandExtractor::script("modbus", "sh", script);

        let assets = assert_ok!(extractor.run(Path::new("cap")).await);
        assert_eq!(assets.len(), 2);
        assert_eq!(assets[1]["vendor"], 7);
    }

    #[tokio::test]
    async fn test_empty_assets_is_success() {
        let dir = tempfile::tempdir().unwrap();
        let script = write_script(&dir, "none.sh", r#"echo '{"assets": []}'"#);
        let extractor = CommandExtractor::script("dnp3", "sh", script);

        let assets = assert_ok!(extractor.run(Path::new("cap")).await);
        assert!(assets.is_empty());
    }

    #[tokio::test]
    async fn test_non_zero_exit_is_execution_failure() {
        let dir = tempfile::tempdir().unwrap();
        let script = write_script(&dir, "fail.sh", "echo 'tshark not found' >&2\nexit 3");
        let extractor = CommandExtractor::script("dnp3", "sh", script);

        let err = extractor.run(Path::new("cap")).await.unwrap_err();
        assert_eq!(err.kind(), "execution");
        match err {
            ExtractorError::Exit { status, stderr } => {
                assert_eq!(status.code(), Some(3));
                assert_eq!(stderr, "tshark not found");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_non_json_output_is_output_failure() {
        let dir = tempfile::tempdir().unwrap();
        let script = write_script(&dir, "garbage.sh", "echo 'Running tshark...'");
        let extractor = CommandExtractor::script("iec104", "sh", script);

        let err = extractor.run(Path::new("cap")).await.unwrap_err();
        assert!(matches!(err, ExtractorError::Output(_)));
    }

    #[tokio::test]
    async fn test_missing_assets_field_is_output_failure() {
        let dir = tempfile::tempdir().unwrap();
        let script = write_script(&dir, "error_doc.sh", r#"echo '{"error": "Error running tshark"}'"#);
        let extractor = CommandExtractor::script("modbus", "sh", script);

        let err = extractor.run(Path::new("cap")).await.unwrap_err();
        assert_eq!(err.kind(), "output");
    }

    #[tokio::test]
    async fn test_missing_program_is_spawn_failure() {
        let extractor = CommandExtractor::new("ghost", "/nonexistent/interpreter", vec![]);

        let err = extractor.run(Path::new("cap")).await.unwrap_err();
        assert!(matches!(err, ExtractorError::Spawn { .. }));
    }

    #[test]
    fn test_stderr_excerpt_truncates() {
        let long = "x".repeat(STDERR_EXCERPT + 10);
        let excerpt = stderr_excerpt(long.as_bytes());
        assert!(excerpt.ends_with("..."));
        assert_eq!(excerpt.len(), STDERR_EXCERPT + 3);
    }
}
