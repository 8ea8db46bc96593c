//! Parallel extraction
//!
//! Every registered extractor runs concurrently against the same capture.
//! Each one is isolated: errors, panics and timeouts become a `Failed`
//! outcome for that extractor only. Results come back in registry order once
//! all of them have settled.

use std::any::Any;
use std::collections::BTreeSet;
use std::panic::AssertUnwindSafe;
use std::path::Path;
use std::time::{Duration, Instant};

use futures::future::join_all;
use futures::FutureExt;
use tokio::sync::Semaphore;

use crate::extractors::{Extractor, ExtractorError, ExtractorRegistry};
use crate::models::{protocol_tag_of, AssetRecord, RawAsset};

#[derive(Debug, Clone, Copy)]
pub struct ExtractionOptions {
    /// Per-extractor budget; exceeding it is an extractor failure
    pub timeout: Duration,
    /// Cap on extractors in flight; `None` runs all at once
    pub concurrency: Option<usize>,
}

#[derive(Debug)]
pub enum ExtractionOutcome {
    Succeeded {
        assets: Vec<AssetRecord>,
        /// Protocol tags seen on every yielded record, dropped or not
        protocols: BTreeSet<String>,
        dropped: usize,
    },
    Failed {
        reason: String,
    },
}

#[derive(Debug)]
pub struct ExtractionResult {
    pub extractor: String,
    pub outcome: ExtractionOutcome,
    pub elapsed: Duration,
}

impl ExtractionResult {
    pub fn is_success(&self) -> bool {
        matches!(self.outcome, ExtractionOutcome::Succeeded { .. })
    }
}

/// Run every registered extractor and wait for all of them
pub async fn extract_all(
    registry: &ExtractorRegistry,
    capture: &Path,
    options: &ExtractionOptions,
) -> Vec<ExtractionResult> {
    let limiter = options.concurrency.map(Semaphore::new);
    let limiter = limiter.as_ref();

    let tasks = registry.iter().map(|extractor| async move {
        let _permit = match limiter {
            Some(semaphore) => semaphore.acquire().await.ok(),
            None => None,
        };
        run_one(extractor.as_ref(), capture, options.timeout).await
    });

    join_all(tasks).await
}

async fn run_one(extractor: &dyn Extractor, capture: &Path, timeout: Duration) -> ExtractionResult {
    let name = extractor.name();
    let started = Instant::now();

    tracing::debug!(extractor = name, "Extractor running");

    let attempt = AssertUnwindSafe(extractor.run(capture)).catch_unwind();
    let result = match tokio::time::timeout(timeout, attempt).await {
        Ok(Ok(result)) => result,
        Ok(Err(panic)) => Err(ExtractorError::Panicked(panic_message(panic))),
        Err(_) => Err(ExtractorError::Timeout(timeout)),
    };

    let outcome = match result {
        Ok(raw) => validate(name, raw),
        Err(err) => {
            tracing::warn!(extractor = name, kind = err.kind(), "Extractor failed: {}", err);
            ExtractionOutcome::Failed {
                reason: err.to_string(),
            }
        }
    };

    let elapsed = started.elapsed();
    tracing::debug!(extractor = name, ?elapsed, "Extractor settled");

    ExtractionResult {
        extractor: name.to_string(),
        outcome,
        elapsed,
    }
}

/// Register protocols, then drop records that fail to decode or validate
fn validate(extractor: &str, raw: Vec<serde_json::Value>) -> ExtractionOutcome {
    let mut assets = Vec::with_capacity(raw.len());
    let mut protocols = BTreeSet::new();
    let mut dropped = 0;

    for value in raw {
        if let Some(tag) = protocol_tag_of(&value) {
            protocols.insert(tag.to_string());
        }

        match RawAsset::decode(value).and_then(RawAsset::into_record) {
            Ok(record) => assets.push(record),
            Err(err) => {
                dropped += 1;
                tracing::warn!(extractor = extractor, "Dropping malformed asset: {}", err);
            }
        }
    }

    ExtractionOutcome::Succeeded {
        assets,
        protocols,
        dropped,
    }
}

fn panic_message(panic: Box<dyn Any + Send>) -> String {
    if let Some(msg) = panic.downcast_ref::<&str>() {
        msg.to_string()
    } else if let Some(msg) = panic.downcast_ref::<String>() {
        msg.clone()
    } else {
        "unknown panic".to_string()
    }
}
