//! YOLOv8 PPE detector

use super::labels::{label_for, PPE_CLASSES};
use crate::detector::Detection;
use crate::error::VisionError;
use crate::utils::apply_nms;

/// Decode a raw YOLOv8 output tensor of shape `[1, 4 + classes, anchors]`.
///
/// Box rows are centre x, centre y, width, height in model input pixels.
/// `scale` maps input pixels back to frame pixels per axis. Returns the
/// detections that survive the confidence filter and per-class NMS.
pub fn decode_predictions(
    data: &[f32],
    shape: &[usize],
    confidence: f32,
    iou_threshold: f32,
    scale: (f32, f32),
) -> Result<Vec<Detection>, VisionError> {
    if shape.len() != 3 || shape[0] != 1 {
        return Err(VisionError::Model(format!("Unexpected output shape {:?}", shape)));
    }

    let rows = shape[1];
    let anchors = shape[2];
    if rows < 5 {
        return Err(VisionError::Model(format!("Output has too few rows: {}", rows)));
    }
    let expected = rows
        .checked_mul(anchors)
        .ok_or_else(|| VisionError::Model("Output shape would overflow".to_string()))?;
    if data.len() < expected {
        return Err(VisionError::Model(format!(
            "Output holds {} values, expected {}",
            data.len(),
            expected
        )));
    }

    let classes = (rows - 4).min(PPE_CLASSES.len());
    let at = |row: usize, anchor: usize| data[row * anchors + anchor];

    let mut detections = Vec::new();
    for anchor in 0..anchors {
        let mut best_class = 0;
        let mut best_score = f32::MIN;
        for class in 0..classes {
            let score = at(4 + class, anchor);
            if score > best_score {
                best_score = score;
                best_class = class;
            }
        }

        if !best_score.is_finite() || best_score < confidence {
            continue;
        }

        let (cx, cy, w, h) = (at(0, anchor), at(1, anchor), at(2, anchor), at(3, anchor));
        if !(cx.is_finite() && cy.is_finite() && w.is_finite() && h.is_finite()) || w <= 0.0 || h <= 0.0 {
            continue;
        }

        let Some(label) = label_for(best_class) else {
            continue;
        };

        detections.push(Detection {
            class_id: best_class,
            label: label.to_string(),
            confidence: best_score,
            bbox: (
                (cx - w / 2.0) * scale.0,
                (cy - h / 2.0) * scale.1,
                w * scale.0,
                h * scale.1,
            ),
        });
    }

    Ok(apply_nms(detections, iou_threshold))
}

#[cfg(feature = "onnx")]
pub use self::onnx::YoloPpeDetector;

#[cfg(feature = "onnx")]
mod onnx {
    use super::*;
    use crate::annotate::draw_detections;
    use crate::config::VisionConfig;
    use crate::detector::{DetectionOutput, Detector};
    use crate::frame::Frame;
    use crate::utils::frame_to_chw_tensor;
    use ort::session::{builder::GraphOptimizationLevel, Session};
    use ort::value::Tensor;
    use parking_lot::Mutex;
    use tracing::{debug, info};

    /// PPE detector backed by an ONNX export of a YOLOv8 model.
    pub struct YoloPpeDetector {
        session: Mutex<Session>,
        input_size: u32,
        iou_threshold: f32,
    }

    impl YoloPpeDetector {
        pub fn new(config: &VisionConfig) -> Result<Self, VisionError> {
            if !config.model_path.exists() {
                return Err(VisionError::Model(format!(
                    "Model file not found: {}",
                    config.model_path.display()
                )));
            }

            let session = Session::builder()?
                .with_optimization_level(GraphOptimizationLevel::Level3)?
                .commit_from_file(&config.model_path)
                .map_err(|e| VisionError::Ort(format!("Failed to load YOLO model: {}", e)))?;

            info!("YOLO model loaded from {:?}", config.model_path);

            Ok(Self {
                session: Mutex::new(session),
                input_size: config.input_size,
                iou_threshold: config.iou_threshold,
            })
        }
    }

    impl Detector for YoloPpeDetector {
        fn detect(&self, frame: &Frame, confidence: f32) -> Result<DetectionOutput, VisionError> {
            let size = self.input_size as usize;
            let input = frame_to_chw_tensor(frame, self.input_size)?;
            let tensor = Tensor::from_array(([1usize, 3, size, size], input))?;

            let mut session = self.session.lock();
            let outputs = session.run(ort::inputs![tensor])?;
            let (shape, data) = outputs[0].try_extract_tensor::<f32>()?;
            let shape: Vec<usize> = shape.iter().map(|&d| d.max(0) as usize).collect();

            let scale = (
                frame.width() as f32 / self.input_size as f32,
                frame.height() as f32 / self.input_size as f32,
            );
            let detections = decode_predictions(data, &shape, confidence, self.iou_threshold, scale)?;
            drop(outputs);
            drop(session);

            debug!("YOLO detected {} objects", detections.len());
            let annotated = draw_detections(frame, &detections);
            Ok(DetectionOutput { detections, annotated })
        }

        fn name(&self) -> &str {
            "yolov8-ppe"
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Build a `[1, 14, anchors]` tensor from per-anchor (box, class, score).
    fn tensor(anchors: &[((f32, f32, f32, f32), usize, f32)]) -> (Vec<f32>, Vec<usize>) {
        let rows = 4 + PPE_CLASSES.len();
        let n = anchors.len();
        let mut data = vec![0.0f32; rows * n];
        for (i, ((cx, cy, w, h), class, score)) in anchors.iter().enumerate() {
            data[i] = *cx;
            data[n + i] = *cy;
            data[2 * n + i] = *w;
            data[3 * n + i] = *h;
            data[(4 + class) * n + i] = *score;
        }
        (data, vec![1, rows, n])
    }

    #[test]
    fn test_decode_filters_by_confidence() {
        let (data, shape) = tensor(&[
            ((50.0, 50.0, 20.0, 20.0), 2, 0.8),
            ((200.0, 200.0, 20.0, 20.0), 5, 0.1),
        ]);
        let detections = decode_predictions(&data, &shape, 0.3, 0.45, (1.0, 1.0)).unwrap();
        assert_eq!(detections.len(), 1);
        assert_eq!(detections[0].label, "NO-Hardhat");
        assert_eq!(detections[0].bbox, (40.0, 40.0, 20.0, 20.0));
    }

    #[test]
    fn test_decode_scales_boxes() {
        let (data, shape) = tensor(&[((100.0, 100.0, 40.0, 20.0), 0, 0.9)]);
        let detections = decode_predictions(&data, &shape, 0.3, 0.45, (2.0, 0.5)).unwrap();
        assert_eq!(detections[0].bbox, (160.0, 45.0, 80.0, 10.0));
    }

    #[test]
    fn test_decode_suppresses_overlaps() {
        let (data, shape) = tensor(&[
            ((50.0, 50.0, 20.0, 20.0), 7, 0.7),
            ((51.0, 51.0, 20.0, 20.0), 7, 0.9),
            ((51.0, 51.0, 20.0, 20.0), 5, 0.6),
        ]);
        let detections = decode_predictions(&data, &shape, 0.3, 0.45, (1.0, 1.0)).unwrap();
        let labels: Vec<_> = detections.iter().map(|d| d.label.as_str()).collect();
        assert_eq!(labels, vec!["Safety Vest", "Person"]);
    }

    #[test]
    fn test_decode_rejects_bad_shape() {
        assert!(decode_predictions(&[0.0; 4], &[1, 4], 0.3, 0.45, (1.0, 1.0)).is_err());
        assert!(decode_predictions(&[0.0; 4], &[1, 14, 10], 0.3, 0.45, (1.0, 1.0)).is_err());
    }
}
