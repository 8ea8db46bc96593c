//! Capture artifact
//!
//! The uploaded capture lives on disk for exactly one request. The guard
//! deletes it once: on `release`, or on drop if the request bails out early
//! (error, panic, client disconnect).

use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum ArtifactError {
    #[error("failed to release capture {path}: {source}")]
    Release {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

#[derive(Debug)]
pub struct CaptureArtifact {
    id: Uuid,
    path: PathBuf,
    released: bool,
}

impl CaptureArtifact {
    /// Create an empty capture file under `dir`, returning the guard and a writer
    pub async fn create(dir: &Path) -> io::Result<(Self, tokio::fs::File)> {
        let id = Uuid::new_v4();
        let path = dir.join(format!("{}.pcap", id));

        let file = tokio::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .await?;

        tracing::debug!("Capture artifact {} acquired at {}", id, path.display());

        Ok((
            Self {
                id,
                path,
                released: false,
            },
            file,
        ))
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Delete the capture. A file that is already gone counts as released.
    pub async fn release(mut self) -> Result<(), ArtifactError> {
        self.released = true;
        let removed = tokio::fs::remove_file(&self.path).await;
        self.settle(removed)
    }

    /// Synchronous path, only for `Drop`
    fn remove(&mut self) -> Result<(), ArtifactError> {
        if self.released {
            return Ok(());
        }
        self.released = true;
        let removed = std::fs::remove_file(&self.path);
        self.settle(removed)
    }

    fn settle(&self, removed: io::Result<()>) -> Result<(), ArtifactError> {
        match removed {
            Ok(()) => {
                tracing::debug!("Capture artifact {} released", self.id);
                Ok(())
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                tracing::debug!("Capture artifact {} was already gone", self.id);
                Ok(())
            }
            Err(source) => Err(ArtifactError::Release {
                path: self.path.clone(),
                source,
            }),
        }
    }
}

impl Drop for CaptureArtifact {
    fn drop(&mut self) {
        if !self.released {
            tracing::debug!("Capture artifact {} dropped before release", self.id);
        }
        if let Err(e) = self.remove() {
            tracing::error!("{}", e);
        }
    }
}
