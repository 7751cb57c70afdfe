//! sentinel-eye: camera capture and PPE detection
//!
//! Wraps the physical camera behind [`camera::CameraDevice`] and the
//! pre-trained detector behind [`detector::Detector`]. Both are opaque
//! collaborators for the server: it only needs frames in, labels and an
//! annotated frame out.

pub mod annotate;
pub mod camera;
pub mod config;
pub mod detector;
pub mod error;
pub mod frame;
pub mod models;
mod utils;

pub use camera::{CameraDevice, CameraOpener, UnavailableCameraOpener};
pub use config::VisionConfig;
pub use detector::{Detection, DetectionOutput, Detector, PassthroughDetector};
pub use error::VisionError;
pub use frame::{encode_jpeg, Frame};
