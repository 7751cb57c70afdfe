//! USB webcam capture

use crate::error::VisionError;
use crate::frame::Frame;

/// An opened camera handle. Reads block until a frame is available.
pub trait CameraDevice: Send {
    /// Read the next frame. An error means the device is no longer readable.
    fn read_frame(&mut self) -> Result<Frame, VisionError>;

    fn is_opened(&self) -> bool;

    /// Release the OS handle. Idempotent.
    fn release(&mut self);
}

/// Opens the physical camera. Each call yields a fresh handle.
pub trait CameraOpener: Send + Sync {
    fn open(&self) -> Result<Box<dyn CameraDevice>, VisionError>;
}

/// Opener used when the binary was built without a capture backend.
#[derive(Debug, Default, Clone, Copy)]
pub struct UnavailableCameraOpener;

impl CameraOpener for UnavailableCameraOpener {
    fn open(&self) -> Result<Box<dyn CameraDevice>, VisionError> {
        Err(VisionError::Camera(
            "no capture backend compiled in (enable the `opencv` feature)".to_string(),
        ))
    }
}

#[cfg(feature = "opencv")]
pub use self::opencv_backend::{OpenCvCamera, OpenCvCameraOpener};

#[cfg(feature = "opencv")]
mod opencv_backend {
    use super::*;
    use crate::config::VisionConfig;
    use opencv::{
        core::Mat,
        imgproc,
        prelude::*,
        videoio::{VideoCapture, CAP_ANY, CAP_PROP_FPS, CAP_PROP_FRAME_HEIGHT, CAP_PROP_FRAME_WIDTH},
    };
    use std::sync::Arc;
    use tracing::{info, warn};

    /// Opens `VideoCapture` devices using the configured index and format.
    pub struct OpenCvCameraOpener {
        config: Arc<VisionConfig>,
    }

    impl OpenCvCameraOpener {
        pub fn new(config: Arc<VisionConfig>) -> Self {
            Self { config }
        }
    }

    impl CameraOpener for OpenCvCameraOpener {
        fn open(&self) -> Result<Box<dyn CameraDevice>, VisionError> {
            let camera_id = self.config.camera_id;
            let mut capture = VideoCapture::new(camera_id as i32, CAP_ANY)
                .map_err(|e| VisionError::Camera(format!("Failed to open camera {}: {}", camera_id, e)))?;

            if !capture
                .is_opened()
                .map_err(|e| VisionError::Camera(format!("Camera {} not opened: {}", camera_id, e)))?
            {
                return Err(VisionError::Camera(format!("Camera {} failed to open", camera_id)));
            }

            let (width, height) = self.config.resolution;
            // Drivers may ignore these; a refusal is not fatal.
            for (prop, value) in [
                (CAP_PROP_FRAME_WIDTH, width as f64),
                (CAP_PROP_FRAME_HEIGHT, height as f64),
                (CAP_PROP_FPS, self.config.frame_rate as f64),
            ] {
                if let Err(e) = capture.set(prop, value) {
                    warn!("Camera {} rejected property {}: {}", camera_id, prop, e);
                }
            }

            info!(
                "Camera {} opened at {}x{} @ {}fps",
                camera_id, width, height, self.config.frame_rate
            );

            Ok(Box::new(OpenCvCamera {
                camera_id,
                capture: Some(capture),
            }))
        }
    }

    pub struct OpenCvCamera {
        camera_id: u32,
        capture: Option<VideoCapture>,
    }

    impl CameraDevice for OpenCvCamera {
        fn read_frame(&mut self) -> Result<Frame, VisionError> {
            let capture = self
                .capture
                .as_mut()
                .ok_or_else(|| VisionError::Camera("Camera released".to_string()))?;

            let mut bgr = Mat::default();
            let grabbed = capture
                .read(&mut bgr)
                .map_err(|e| VisionError::Camera(format!("Failed to read frame: {}", e)))?;
            if !grabbed || bgr.empty() {
                return Err(VisionError::Camera(format!("Camera {} returned no frame", self.camera_id)));
            }

            mat_to_frame(&bgr)
        }

        fn is_opened(&self) -> bool {
            self.capture
                .as_ref()
                .map(|c| c.is_opened().unwrap_or(false))
                .unwrap_or(false)
        }

        fn release(&mut self) {
            if let Some(mut capture) = self.capture.take() {
                if let Err(e) = capture.release() {
                    warn!("Failed to release camera {}: {}", self.camera_id, e);
                }
                info!("Camera {} released", self.camera_id);
            }
        }
    }

    impl Drop for OpenCvCamera {
        fn drop(&mut self) {
            self.release();
        }
    }

    fn mat_to_frame(bgr: &Mat) -> Result<Frame, VisionError> {
        let mut rgb = Mat::default();
        imgproc::cvt_color(bgr, &mut rgb, imgproc::COLOR_BGR2RGB, 0)?;

        let width = rgb.cols() as u32;
        let height = rgb.rows() as u32;
        let data = rgb.data_bytes()?.to_vec();

        Frame::from_raw(width, height, data)
            .ok_or_else(|| VisionError::Camera("Frame buffer size mismatch".to_string()))
    }
}
