//! Per-frame detect, alert, log and encode

use crate::cooldown::ViolationLogger;
use crate::session::SharedDevice;
use bytes::Bytes;
use sentinel_core::CameraSection;
use sentinel_eye::frame::JPEG_QUALITY;
use sentinel_eye::{encode_jpeg, Detector, Frame, VisionError};
use sentinel_spk::AlertDeduplicator;
use std::sync::Arc;
use tracing::{debug, warn};

/// Required items whose `NO-<item>` label is among `labels`, in the
/// order of `required`.
pub fn missing_items(labels: &[String], required: &[String]) -> Vec<String> {
    required
        .iter()
        .filter(|item| {
            let negative = format!("NO-{}", item);
            labels.iter().any(|label| *label == negative)
        })
        .cloned()
        .collect()
}

/// Result of running one frame through the detector.
#[derive(Debug, Clone)]
pub struct AnalysedFrame {
    /// Raw frame as captured, archived with violations.
    pub frame: Frame,
    pub labels: Vec<String>,
    pub missing: Vec<String>,
    /// Annotated frame, JPEG encoded.
    pub jpeg: Bytes,
}

pub struct FramePipeline {
    detector: Arc<dyn Detector>,
    alerts: Arc<AlertDeduplicator>,
    logger: Arc<ViolationLogger>,
    confidence: f32,
    required_items: Vec<String>,
}

impl FramePipeline {
    pub fn new(
        detector: Arc<dyn Detector>,
        alerts: Arc<AlertDeduplicator>,
        logger: Arc<ViolationLogger>,
        confidence: f32,
        required_items: Vec<String>,
    ) -> Self {
        Self {
            detector,
            alerts,
            logger,
            confidence,
            required_items,
        }
    }

    pub fn detector_name(&self) -> &str {
        self.detector.name()
    }

    /// Detect, work out missing gear and encode the annotated frame.
    /// CPU bound; call from a blocking context.
    pub fn analyse(&self, frame: Frame) -> Result<AnalysedFrame, VisionError> {
        let output = self.detector.detect(&frame, self.confidence)?;
        let labels = output.labels();
        let missing = missing_items(&labels, &self.required_items);
        let jpeg = encode_jpeg(&output.annotated, JPEG_QUALITY)?;
        Ok(AnalysedFrame {
            frame,
            labels,
            missing,
            jpeg,
        })
    }

    /// Log the violation when gear is missing.
    pub async fn report(&self, section: CameraSection, analysed: &AnalysedFrame) {
        if analysed.missing.is_empty() {
            return;
        }
        self.logger
            .record(section, &analysed.labels, &analysed.missing, &analysed.frame)
            .await;
    }

    /// Read, analyse and report one frame. `None` ends the stream: the
    /// device is closed, a read failed, or the detector failed.
    pub async fn next_frame(self: &Arc<Self>, section: CameraSection, device: &SharedDevice) -> Option<AnalysedFrame> {
        let pipeline = self.clone();
        let device = device.clone();

        // Device reads block; a stuck read stalls this stream but not the runtime.
        let result = tokio::task::spawn_blocking(move || {
            let frame = {
                let mut device = device.lock();
                if !device.is_opened() {
                    return Err(closed());
                }
                device.read_frame()?
            };
            let analysed = pipeline.analyse(frame)?;

            // Turning the camera off releases the device before clearing
            // alerts, so an alert raised here is either kept by a live
            // camera or discarded with the rest.
            let device = device.lock();
            if !device.is_opened() {
                return Err(closed());
            }
            if !analysed.missing.is_empty() {
                pipeline.alerts.evaluate(&analysed.missing);
            }
            Ok(analysed)
        })
        .await;

        let analysed = match result {
            Ok(Ok(analysed)) => analysed,
            Ok(Err(VisionError::Camera(msg))) => {
                debug!("Stream for {} ended: {}", section, msg);
                return None;
            }
            Ok(Err(e)) => {
                warn!("Stream for {} ended: {}", section, e);
                return None;
            }
            Err(e) => {
                warn!("Frame task for {} failed: {}", section, e);
                return None;
            }
        };

        self.report(section, &analysed).await;
        Some(analysed)
    }
}

fn closed() -> VisionError {
    VisionError::Camera("Camera closed".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn labels(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    fn required() -> Vec<String> {
        labels(&["Hardhat", "Mask", "Safety Vest"])
    }

    #[test]
    fn test_missing_items_follow_required_order() {
        let detected = labels(&["Person", "NO-Safety Vest", "NO-Hardhat", "Mask"]);
        assert_eq!(missing_items(&detected, &required()), vec!["Hardhat", "Safety Vest"]);
    }

    #[test]
    fn test_positive_labels_are_not_missing() {
        let detected = labels(&["Hardhat", "Mask", "Safety Vest", "Person"]);
        assert!(missing_items(&detected, &required()).is_empty());
    }

    #[test]
    fn test_duplicates_counted_once() {
        let detected = labels(&["NO-Mask", "NO-Mask", "Person"]);
        assert_eq!(missing_items(&detected, &required()), vec!["Mask"]);
    }

    #[test]
    fn test_label_match_is_exact() {
        let detected = labels(&["no-mask", "NO-Masks", "NO-Hardhat "]);
        assert!(missing_items(&detected, &required()).is_empty());
    }
}
