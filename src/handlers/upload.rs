//! Capture upload handler
//!
//! Owns one request end to end: write the capture to disk, run the pipeline,
//! release the capture, answer. The artifact guard deletes the file on every
//! exit path, including an aborted request.

use std::path::Path;

use axum::{
    extract::{multipart::MultipartRejection, Multipart, State},
    Json,
};
use tokio::io::AsyncWriteExt;

use crate::{AppState, AppError, AppResult};
use crate::models::InventoryResponse;
use crate::pipeline::{self, CaptureArtifact, RequestPhase};

/// POST /upload
pub async fn upload(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> AppResult<Json<InventoryResponse>> {
    tracing::debug!(phase = %RequestPhase::Received, "Upload request");

    // Not a multipart body at all: nothing could carry a file
    let mut multipart = match multipart {
        Ok(multipart) => multipart,
        Err(rejection) => {
            tracing::warn!(
                phase = %RequestPhase::RejectedNoArtifact,
                "Upload is not multipart: {}",
                rejection.body_text()
            );
            return Err(AppError::NoArtifact);
        }
    };

    let artifact = match receive_capture(&state.config.upload_dir, &mut multipart).await? {
        Some(artifact) => artifact,
        None => {
            tracing::warn!(phase = %RequestPhase::RejectedNoArtifact, "Upload without a capture file");
            return Err(AppError::NoArtifact);
        }
    };
    let capture_id = artifact.id();
    tracing::debug!(phase = %RequestPhase::ArtifactAcquired, %capture_id, "Capture stored");

    tracing::debug!(
        phase = %RequestPhase::ExtractingAll,
        %capture_id,
        extractors = state.registry.len(),
        "Running extractors"
    );
    let inventory = pipeline::analyze(&state.registry, artifact.path(), &state.extraction).await;
    tracing::debug!(phase = %RequestPhase::Aggregated, %capture_id, "Inventory merged");

    if let Err(e) = artifact.release().await {
        tracing::error!("{}", e);
    }
    tracing::debug!(phase = %RequestPhase::ArtifactReleased, %capture_id, "Capture released");

    tracing::info!(
        phase = %RequestPhase::Responded,
        %capture_id,
        assets = inventory.summary.total_assets,
        vendors = inventory.summary.unique_vendor_count,
        protocols = inventory.summary.unique_protocol_count,
        "Capture analyzed"
    );

    Ok(Json(inventory.into()))
}

/// Stream the first file field to disk. `None` if the body carries no file.
async fn receive_capture(dir: &Path, multipart: &mut Multipart) -> AppResult<Option<CaptureArtifact>> {
    while let Some(mut field) = multipart.next_field().await? {
        if field.file_name().is_none() {
            tracing::debug!("Ignoring non-file field {:?}", field.name());
            continue;
        }

        let (artifact, mut file) = CaptureArtifact::create(dir).await?;
        let mut written = 0usize;
        while let Some(chunk) = field.chunk().await? {
            written += chunk.len();
            file.write_all(&chunk).await?;
        }
        file.flush().await?;

        tracing::debug!("Received capture {:?} ({} bytes)", field.file_name(), written);
        return Ok(Some(artifact));
    }

    Ok(None)
}
