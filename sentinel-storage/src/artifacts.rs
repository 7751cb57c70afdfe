//! Violation snapshot files

use crate::error::StorageError;
use chrono::NaiveDateTime;
use sentinel_core::violation::FILE_TIMESTAMP_FORMAT;
use sentinel_core::CameraSection;
use sentinel_eye::frame::{encode_jpeg, Frame, JPEG_QUALITY};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Writes one JPEG per accepted violation into a single directory.
#[derive(Debug, Clone)]
pub struct ArtifactWriter {
    dir: PathBuf,
}

impl ArtifactWriter {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// `<section>_violation_<yyyyMMdd_HHmmss>.jpg`
    pub fn file_name(section: CameraSection, timestamp: &NaiveDateTime) -> String {
        format!("{}_violation_{}.jpg", section, timestamp.format(FILE_TIMESTAMP_FORMAT))
    }

    /// Encode and write `frame`. A file with the same name is overwritten.
    pub async fn write(
        &self,
        section: CameraSection,
        timestamp: &NaiveDateTime,
        frame: &Frame,
    ) -> Result<PathBuf, StorageError> {
        let frame = frame.clone();
        let jpeg = tokio::task::spawn_blocking(move || encode_jpeg(&frame, JPEG_QUALITY))
            .await
            .map_err(|e| StorageError::Artifact(format!("Encode task failed: {}", e)))?
            .map_err(|e| StorageError::Artifact(e.to_string()))?;

        tokio::fs::create_dir_all(&self.dir).await?;
        let path = self.dir.join(Self::file_name(section, timestamp));
        tokio::fs::write(&path, &jpeg).await?;

        debug!("Wrote {} bytes to {}", jpeg.len(), path.display());
        Ok(path)
    }
}
