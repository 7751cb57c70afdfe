//! sentinel-core: shared domain types and configuration for the PPE monitor.
//!
//! Everything the other crates agree on lives here: camera sections,
//! violation records, user roles, the error taxonomy and the layered
//! configuration.

pub mod config;
pub mod error;
pub mod role;
pub mod section;
pub mod violation;

pub use config::SentinelConfig;
pub use error::{Error, Result};
pub use role::Role;
pub use section::CameraSection;
pub use violation::{NewViolation, ViolationRecord};
