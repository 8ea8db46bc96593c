//! In-process extractors for tests

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use super::{Extractor, ExtractorError};

/// Always yields the same records
pub struct StaticExtractor {
    pub name: String,
    pub assets: Vec<serde_json::Value>,
    pub delay: Duration,
    pub calls: Arc<AtomicUsize>,
}

impl StaticExtractor {
    pub fn new(name: &str, assets: Vec<serde_json::Value>) -> Self {
        Self {
            name: name.to_string(),
            assets,
            delay: Duration::ZERO,
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn slow(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }
}

#[async_trait]
impl Extractor for StaticExtractor {
    fn name(&self) -> &str {
        &self.name
    }

    async fn run(&self, _capture: &Path) -> Result<Vec<serde_json::Value>, ExtractorError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        Ok(self.assets.clone())
    }
}

/// Fails the way a crashed script does
pub struct FailingExtractor {
    pub name: String,
}

#[async_trait]
impl Extractor for FailingExtractor {
    fn name(&self) -> &str {
        &self.name
    }

    async fn run(&self, _capture: &Path) -> Result<Vec<serde_json::Value>, ExtractorError> {
        Err(ExtractorError::Spawn {
            program: self.name.clone(),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "no such interpreter"),
        })
    }
}

pub struct PanickingExtractor;

#[async_trait]
impl Extractor for PanickingExtractor {
    fn name(&self) -> &str {
        "panicky"
    }

    async fn run(&self, _capture: &Path) -> Result<Vec<serde_json::Value>, ExtractorError> {
        panic!("decoder blew up");
    }
}

/// Records the capture path it was given, then never finishes
#[derive(Default)]
pub struct HangingExtractor {
    pub seen: Arc<Mutex<Option<PathBuf>>>,
}

#[async_trait]
impl Extractor for HangingExtractor {
    fn name(&self) -> &str {
        "hanging"
    }

    async fn run(&self, capture: &Path) -> Result<Vec<serde_json::Value>, ExtractorError> {
        *self.seen.lock().unwrap() = Some(capture.to_path_buf());
        std::future::pending::<()>().await;
        Ok(Vec::new())
    }
}

/// Does its decoding on the blocking pool, off the runtime threads
pub struct BlockingExtractor {
    pub name: String,
    pub work: Duration,
    pub assets: Vec<serde_json::Value>,
}

#[async_trait]
impl Extractor for BlockingExtractor {
    fn name(&self) -> &str {
        &self.name
    }

    async fn run(&self, _capture: &Path) -> Result<Vec<serde_json::Value>, ExtractorError> {
        let work = self.work;
        let assets = self.assets.clone();
        tokio::task::spawn_blocking(move || {
            std::thread::sleep(work);
            assets
        })
        .await
        .map_err(|e| ExtractorError::Panicked(e.to_string()))
    }
}
