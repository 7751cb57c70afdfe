//! Model-backed detectors

pub mod labels;
pub mod yolo;

pub use labels::PPE_CLASSES;
pub use yolo::decode_predictions;

#[cfg(feature = "onnx")]
pub use yolo::YoloPpeDetector;
