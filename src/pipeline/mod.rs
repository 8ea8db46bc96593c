//! Capture-to-asset pipeline
//!
//! ```text
//! capture ──► coordinator ──┬─► extractor 1 ─┐
//!                           ├─► extractor 2 ─┼─► join all ─► aggregator ─► inventory
//!                           └─► extractor N ─┘
//! ```

pub mod aggregator;
pub mod artifact;
pub mod coordinator;

use std::fmt;
use std::path::Path;

use crate::extractors::ExtractorRegistry;
use crate::models::Inventory;

pub use artifact::CaptureArtifact;
pub use coordinator::{ExtractionOptions, ExtractionOutcome};

/// Where an upload request is in its lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestPhase {
    Received,
    ArtifactAcquired,
    ExtractingAll,
    Aggregated,
    ArtifactReleased,
    Responded,
    RejectedNoArtifact,
}

impl fmt::Display for RequestPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RequestPhase::Received => "received",
            RequestPhase::ArtifactAcquired => "artifact_acquired",
            RequestPhase::ExtractingAll => "extracting_all",
            RequestPhase::Aggregated => "aggregated",
            RequestPhase::ArtifactReleased => "artifact_released",
            RequestPhase::Responded => "responded",
            RequestPhase::RejectedNoArtifact => "rejected_no_artifact",
        };
        f.write_str(s)
    }
}

/// Run every extractor against the capture and merge what they found
pub async fn analyze(
    registry: &ExtractorRegistry,
    capture: &Path,
    options: &ExtractionOptions,
) -> Inventory {
    let results = coordinator::extract_all(registry, capture, options).await;

    for result in &results {
        match &result.outcome {
            ExtractionOutcome::Succeeded { assets, dropped, .. } => {
                tracing::debug!(
                    extractor = %result.extractor,
                    elapsed = ?result.elapsed,
                    "{} assets kept, {} dropped",
                    assets.len(),
                    dropped
                );
            }
            ExtractionOutcome::Failed { reason } => {
                tracing::debug!(
                    extractor = %result.extractor,
                    elapsed = ?result.elapsed,
                    "No contribution: {}",
                    reason
                );
            }
        }
    }
    let failed = results.iter().filter(|r| !r.is_success()).count();
    if failed > 0 {
        tracing::warn!("{}/{} extractors failed", failed, results.len());
    }

    aggregator::aggregate(results)
}
