//! Protocol extractors
//!
//! An extractor is an opaque capability: given a capture path it yields raw
//! asset records or fails. How it runs (subprocess, in-process) is its own
//! business; the pipeline only sees this trait.

pub mod command;
pub mod registry;

#[cfg(test)]
pub mod testing;

use std::path::Path;
use std::process::ExitStatus;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

pub use command::CommandExtractor;
pub use registry::ExtractorRegistry;

#[async_trait]
pub trait Extractor: Send + Sync {
    /// Stable name, used for diagnostics only
    fn name(&self) -> &str;

    /// Scan the capture. An empty list is a successful "no matches".
    ///
    /// Records come back undecoded; each one is validated on its own.
    /// Must not block the runtime thread: blocking or CPU-bound work goes
    /// through `tokio::task::spawn_blocking` or a child process, otherwise
    /// it stalls sibling extractors and the timeout cannot fire.
    async fn run(&self, capture: &Path) -> Result<Vec<serde_json::Value>, ExtractorError>;
}

#[derive(Debug, Error)]
pub enum ExtractorError {
    #[error("failed to launch {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("exited with {status}: {stderr}")]
    Exit { status: ExitStatus, stderr: String },

    #[error("timed out after {0:?}")]
    Timeout(Duration),

    #[error("panicked: {0}")]
    Panicked(String),

    #[error("unparseable output: {0}")]
    Output(#[from] serde_json::Error),
}

impl ExtractorError {
    /// Coarse class for log fields
    pub fn kind(&self) -> &'static str {
        match self {
            ExtractorError::Output(_) => "output",
            ExtractorError::Timeout(_) => "timeout",
            _ => "execution",
        }
    }
}
