//! Violation logging with a per-section cooldown

use chrono::{Local, NaiveDateTime};
use parking_lot::Mutex;
use sentinel_core::{CameraSection, NewViolation, ViolationRecord};
use sentinel_eye::Frame;
use sentinel_storage::{ArtifactWriter, ViolationStore};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};

#[derive(Debug, Clone, PartialEq)]
pub enum RecordOutcome {
    /// Inside the cooldown window for this section.
    Suppressed,
    Persisted(ViolationRecord),
    /// Accepted, but the store write failed. Still counts against the cooldown.
    PersistFailed,
}

/// Logs at most one violation per section per cooldown window.
pub struct ViolationLogger {
    cooldown: Duration,
    last_accepted: Mutex<HashMap<CameraSection, NaiveDateTime>>,
    store: Arc<dyn ViolationStore>,
    artifacts: ArtifactWriter,
}

impl ViolationLogger {
    pub fn new(cooldown: Duration, store: Arc<dyn ViolationStore>, artifacts: ArtifactWriter) -> Self {
        Self {
            cooldown,
            last_accepted: Mutex::new(HashMap::new()),
            store,
            artifacts,
        }
    }

    pub async fn record(
        &self,
        section: CameraSection,
        detected_items: &[String],
        missing_items: &[String],
        frame: &Frame,
    ) -> RecordOutcome {
        self.record_at(Local::now().naive_local(), section, detected_items, missing_items, frame)
            .await
    }

    /// [`record`](Self::record) with an explicit clock reading.
    pub async fn record_at(
        &self,
        now: NaiveDateTime,
        section: CameraSection,
        detected_items: &[String],
        missing_items: &[String],
        frame: &Frame,
    ) -> RecordOutcome {
        if !self.try_accept(section, now) {
            return RecordOutcome::Suppressed;
        }

        let image_path = match self.artifacts.write(section, &now, frame).await {
            Ok(path) => {
                info!("Violation captured: {}", path.display());
                Some(path.to_string_lossy().into_owned())
            }
            Err(e) => {
                error!("Failed to save violation image for {}: {}", section, e);
                None
            }
        };

        let violation = NewViolation {
            camera_section: section,
            detected_items: detected_items.to_vec(),
            missing_items: missing_items.to_vec(),
            timestamp: now,
            image_path,
        };

        match self.store.insert_violation(&violation).await {
            Ok(record) => {
                info!("Violation {} logged for {}", record.id, section);
                RecordOutcome::Persisted(record)
            }
            Err(e) => {
                error!("Error logging violation for {}: {}", section, e);
                RecordOutcome::PersistFailed
            }
        }
    }

    /// Check and update the section's last accepted time in one step.
    fn try_accept(&self, section: CameraSection, now: NaiveDateTime) -> bool {
        let mut last = self.last_accepted.lock();
        if let Some(previous) = last.get(&section) {
            // A negative span (clock stepped back) is treated as inside the window.
            let within = match now.signed_duration_since(*previous).to_std() {
                Ok(elapsed) => elapsed < self.cooldown,
                Err(_) => true,
            };
            if within {
                return false;
            }
        }
        last.insert(section, now);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::NaiveDate;
    use sentinel_storage::{SledStore, StorageError};

    struct FailingStore;

    #[async_trait]
    impl ViolationStore for FailingStore {
        async fn insert_violation(&self, _: &NewViolation) -> Result<ViolationRecord, StorageError> {
            Err(StorageError::Database("connection refused".to_string()))
        }

        async fn list_violations(&self) -> Result<Vec<ViolationRecord>, StorageError> {
            Err(StorageError::Database("connection refused".to_string()))
        }
    }

    fn at(secs: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 5, 5)
            .unwrap()
            .and_hms_opt(12, 0, 0)
            .unwrap()
            + chrono::Duration::seconds(secs as i64)
    }

    fn items(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[tokio::test]
    async fn test_cooldown_per_section() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(SledStore::temporary().unwrap());
        let logger = ViolationLogger::new(Duration::from_secs(5), store.clone(), ArtifactWriter::new(dir.path()));
        let frame = Frame::new(8, 8);
        let detected = items(&["NO-Mask"]);
        let missing = items(&["Mask"]);

        assert!(matches!(
            logger.record_at(at(0), CameraSection::Gate, &detected, &missing, &frame).await,
            RecordOutcome::Persisted(_)
        ));
        assert_eq!(
            logger.record_at(at(4), CameraSection::Gate, &detected, &missing, &frame).await,
            RecordOutcome::Suppressed
        );
        // other section has its own window
        assert!(matches!(
            logger.record_at(at(4), CameraSection::Machine, &detected, &missing, &frame).await,
            RecordOutcome::Persisted(_)
        ));
        assert!(matches!(
            logger.record_at(at(5), CameraSection::Gate, &detected, &missing, &frame).await,
            RecordOutcome::Persisted(_)
        ));

        let records = store.list_violations().await.unwrap();
        assert_eq!(records.len(), 3);
        assert_eq!(records[0].missing_gear, "Mask");
        let image = records[0].image_path.clone().unwrap();
        assert!(image.ends_with("gate_violation_20250505_120005.jpg"));
        assert!(std::path::Path::new(&image).exists());
    }

    #[tokio::test]
    async fn test_failed_write_still_consumes_cooldown() {
        let dir = tempfile::tempdir().unwrap();
        let logger = ViolationLogger::new(
            Duration::from_secs(5),
            Arc::new(FailingStore),
            ArtifactWriter::new(dir.path()),
        );
        let frame = Frame::new(8, 8);
        let missing = items(&["Hardhat"]);

        assert_eq!(
            logger.record_at(at(0), CameraSection::Machine, &missing, &missing, &frame).await,
            RecordOutcome::PersistFailed
        );
        assert_eq!(
            logger.record_at(at(1), CameraSection::Machine, &missing, &missing, &frame).await,
            RecordOutcome::Suppressed
        );
        // the artifact was still written
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[tokio::test]
    async fn test_concurrent_records_log_once() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(SledStore::temporary().unwrap());
        let logger = Arc::new(ViolationLogger::new(
            Duration::from_secs(5),
            store.clone(),
            ArtifactWriter::new(dir.path()),
        ));

        let mut handles = Vec::new();
        for _ in 0..10 {
            let logger = logger.clone();
            handles.push(tokio::spawn(async move {
                let missing = vec!["Mask".to_string()];
                logger
                    .record_at(at(0), CameraSection::Gate, &missing, &missing, &Frame::new(4, 4))
                    .await
            }));
        }
        let mut persisted = 0;
        for handle in handles {
            if matches!(handle.await.unwrap(), RecordOutcome::Persisted(_)) {
                persisted += 1;
            }
        }
        assert_eq!(persisted, 1);
        assert_eq!(store.list_violations().await.unwrap().len(), 1);
    }
}
