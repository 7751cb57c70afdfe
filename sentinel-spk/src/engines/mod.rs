//! TTS engine implementations

pub mod native;
pub mod silent;

use crate::config::SpeechConfig;
use crate::error::SpeechError;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{info, warn};

pub use native::NativeSpeaker;
pub use silent::SilentSpeaker;

/// Converts text to audible speech.
#[async_trait]
pub trait Speaker: Send + Sync {
    /// Speak `text`, returning once playback has finished.
    async fn speak(&self, text: &str) -> Result<(), SpeechError>;

    /// Get engine name
    fn name(&self) -> &str;
}

/// Pick the engine for `config`. Falls back to [`SilentSpeaker`] when
/// speech is disabled or no native engine is installed.
pub fn speaker_from_config(config: &SpeechConfig) -> Arc<dyn Speaker> {
    if !config.enabled {
        info!("Spoken alerts disabled; alerts will only be logged");
        return Arc::new(SilentSpeaker);
    }

    match NativeSpeaker::new(config) {
        Ok(speaker) => {
            info!("Using {} speech engine", speaker.name());
            Arc::new(speaker)
        }
        Err(e) => {
            warn!("Native speech unavailable ({}); alerts will only be logged", e);
            Arc::new(SilentSpeaker)
        }
    }
}
