//! Configuration for sentinel-eye

use sentinel_core::config::{CameraConfig, DetectionConfig};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Vision system configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VisionConfig {
    /// USB camera device index (0, 1, 2, etc.)
    pub camera_id: u32,
    /// Target frame rate (frames per second)
    pub frame_rate: u32,
    /// Camera resolution (width, height)
    pub resolution: (u32, u32),
    /// ONNX export of the PPE model
    pub model_path: PathBuf,
    /// Square model input size
    pub input_size: u32,
    /// IoU above which overlapping boxes of the same class are suppressed
    pub iou_threshold: f32,
}

impl Default for VisionConfig {
    fn default() -> Self {
        Self::from_parts(&CameraConfig::default(), &DetectionConfig::default())
    }
}

impl VisionConfig {
    pub fn from_parts(camera: &CameraConfig, detection: &DetectionConfig) -> Self {
        Self {
            camera_id: camera.device_index,
            frame_rate: camera.frame_rate,
            resolution: camera.resolution,
            model_path: detection.model_path.clone(),
            input_size: detection.input_size,
            iou_threshold: detection.iou_threshold,
        }
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.frame_rate == 0 || self.frame_rate > 120 {
            return Err("Frame rate must be between 1 and 120".to_string());
        }

        if self.resolution.0 == 0 || self.resolution.1 == 0 {
            return Err("Resolution must be non-zero".to_string());
        }

        let total_pixels = self
            .resolution
            .0
            .checked_mul(self.resolution.1)
            .ok_or_else(|| "Resolution would cause integer overflow".to_string())?;

        if total_pixels > 100_000_000 {
            return Err("Resolution too large (max 100M pixels)".to_string());
        }

        if self.input_size == 0 || self.input_size > 2048 {
            return Err("Model input size must be between 1 and 2048".to_string());
        }

        Ok(())
    }
}
