pub mod cooldown;
pub mod error;
pub mod http;
pub mod mjpeg;
pub mod pipeline;
pub mod security;
pub mod session;
pub mod startup;

pub use cooldown::{RecordOutcome, ViolationLogger};
pub use error::{ApiError, ApiJson, ErrorResponse};
pub use http::{create_router, ApiState};
pub use pipeline::{missing_items, FramePipeline};
pub use session::{CameraSessionManager, SharedDevice, ToggleAction, ToggleOutcome};
