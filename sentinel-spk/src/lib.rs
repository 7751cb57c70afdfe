//! sentinel-spk: spoken safety alerts
//!
//! Provides:
//! - Alert formatting and last-message deduplication
//! - A single background worker that speaks queued alerts one at a time
//! - Native TTS engines (espeak-ng on Linux, `say` on macOS) and a silent fallback

pub mod alert;
pub mod config;
pub mod engines;
pub mod error;
pub mod worker;

pub use alert::{alert_channel, format_alert, AlertDeduplicator, AlertReceiver};
pub use config::SpeechConfig;
pub use engines::Speaker;
pub use error::SpeechError;
pub use worker::spawn_alert_worker;
