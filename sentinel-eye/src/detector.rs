//! Detector adapter: the boundary to the pre-trained model.

use crate::error::VisionError;
use crate::frame::Frame;

/// Detected object
#[derive(Debug, Clone, PartialEq)]
pub struct Detection {
    pub class_id: usize,
    pub label: String,
    pub confidence: f32,
    pub bbox: (f32, f32, f32, f32), // x, y, width, height in frame pixels
}

impl Detection {
    /// `NO-<item>` labels mark missing safety gear.
    pub fn is_violation(&self) -> bool {
        self.label.starts_with("NO-")
    }
}

/// What the detector produced for a single frame.
#[derive(Debug, Clone)]
pub struct DetectionOutput {
    pub detections: Vec<Detection>,
    /// The input frame with detections drawn on it.
    pub annotated: Frame,
}

impl DetectionOutput {
    /// Label of every detection, in detection order. Duplicates are kept.
    pub fn labels(&self) -> Vec<String> {
        self.detections.iter().map(|d| d.label.clone()).collect()
    }
}

/// A pre-trained object detector, treated as a black box.
pub trait Detector: Send + Sync {
    /// Run inference, keeping detections scoring at least `confidence`.
    fn detect(&self, frame: &Frame, confidence: f32) -> Result<DetectionOutput, VisionError>;

    fn name(&self) -> &str;
}

/// Reports nothing and returns the frame untouched. Used when no model
/// backend is compiled in.
#[derive(Debug, Default, Clone, Copy)]
pub struct PassthroughDetector;

impl Detector for PassthroughDetector {
    fn detect(&self, frame: &Frame, _confidence: f32) -> Result<DetectionOutput, VisionError> {
        Ok(DetectionOutput {
            detections: Vec::new(),
            annotated: frame.clone(),
        })
    }

    fn name(&self) -> &str {
        "passthrough"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn detection(label: &str) -> Detection {
        Detection {
            class_id: 0,
            label: label.to_string(),
            confidence: 0.9,
            bbox: (0.0, 0.0, 1.0, 1.0),
        }
    }

    #[test]
    fn test_labels_keep_order_and_duplicates() {
        let output = DetectionOutput {
            detections: vec![detection("Person"), detection("NO-Mask"), detection("Person")],
            annotated: Frame::new(1, 1),
        };
        assert_eq!(output.labels(), vec!["Person", "NO-Mask", "Person"]);
    }

    #[test]
    fn test_is_violation() {
        assert!(detection("NO-Hardhat").is_violation());
        assert!(!detection("Hardhat").is_violation());
    }

    #[test]
    fn test_passthrough() {
        let frame = Frame::from_pixel(4, 4, image::Rgb([1, 2, 3]));
        let output = PassthroughDetector.detect(&frame, 0.3).unwrap();
        assert!(output.detections.is_empty());
        assert_eq!(output.annotated, frame);
    }
}
