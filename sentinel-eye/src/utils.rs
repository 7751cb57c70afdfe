//! Utility functions for vision processing

use crate::detector::Detection;
use crate::error::VisionError;
use crate::frame::Frame;

/// Resize (nearest neighbour) and normalise a frame into a CHW float
/// tensor `[3, size, size]` with values in `[0, 1]`.
#[cfg_attr(not(feature = "onnx"), allow(dead_code))]
pub(crate) fn frame_to_chw_tensor(frame: &Frame, size: u32) -> Result<Vec<f32>, VisionError> {
    if size == 0 {
        return Err(VisionError::Processing("Target dimensions cannot be zero".to_string()));
    }

    let (width, height) = frame.dimensions();
    if width == 0 || height == 0 {
        return Err(VisionError::Processing("Invalid image dimensions".to_string()));
    }

    let plane = size
        .checked_mul(size)
        .ok_or_else(|| VisionError::Processing("Target dimensions too large, would overflow".to_string()))?
        as usize;
    let total = plane
        .checked_mul(3)
        .ok_or_else(|| VisionError::Processing("Target dimensions too large, would overflow".to_string()))?;
    if total > 100_000_000 {
        return Err(VisionError::Processing("Target dimensions too large (max 100M pixels)".to_string()));
    }

    let mut chw = vec![0.0f32; total];
    let side = size as usize;

    for y in 0..size {
        let src_y = ((y as u64 * height as u64) / size as u64).min(height as u64 - 1) as u32;
        for x in 0..size {
            let src_x = ((x as u64 * width as u64) / size as u64).min(width as u64 - 1) as u32;
            let pixel = frame.get_pixel(src_x, src_y);
            let idx = y as usize * side + x as usize;
            for c in 0..3 {
                chw[c * plane + idx] = pixel[c] as f32 / 255.0;
            }
        }
    }

    Ok(chw)
}

/// Compute IoU between two `(x, y, w, h)` boxes.
pub(crate) fn compute_iou(bbox1: &(f32, f32, f32, f32), bbox2: &(f32, f32, f32, f32)) -> f32 {
    let (x1, y1, w1, h1) = *bbox1;
    let (x2, y2, w2, h2) = *bbox2;

    if ![x1, y1, w1, h1, x2, y2, w2, h2].iter().all(|v| v.is_finite()) {
        return 0.0;
    }
    if w1 < 0.0 || h1 < 0.0 || w2 < 0.0 || h2 < 0.0 {
        return 0.0;
    }

    let inter_x_min = x1.max(x2);
    let inter_y_min = y1.max(y2);
    let inter_x_max = (x1 + w1).min(x2 + w2);
    let inter_y_max = (y1 + h1).min(y2 + h2);

    if inter_x_max <= inter_x_min || inter_y_max <= inter_y_min {
        return 0.0;
    }

    let inter_area = (inter_x_max - inter_x_min) * (inter_y_max - inter_y_min);
    let union_area = w1 * h1 + w2 * h2 - inter_area;
    if union_area <= 0.0 || !union_area.is_finite() {
        return 0.0;
    }

    let iou = inter_area / union_area;
    if iou.is_finite() && (0.0..=1.0).contains(&iou) {
        iou
    } else {
        0.0
    }
}

/// Non-maximum suppression, applied within each class. Output is sorted
/// by confidence, highest first.
pub(crate) fn apply_nms(mut detections: Vec<Detection>, iou_threshold: f32) -> Vec<Detection> {
    detections.retain(|d| d.confidence.is_finite());
    detections.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));

    let mut suppressed = vec![false; detections.len()];
    let mut keep = Vec::new();

    for i in 0..detections.len() {
        if suppressed[i] {
            continue;
        }
        for j in (i + 1)..detections.len() {
            if suppressed[j] || detections[j].class_id != detections[i].class_id {
                continue;
            }
            if compute_iou(&detections[i].bbox, &detections[j].bbox) > iou_threshold {
                suppressed[j] = true;
            }
        }
        keep.push(detections[i].clone());
    }

    keep
}
