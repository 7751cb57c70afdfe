//! Engine that only logs

use super::Speaker;
use crate::error::SpeechError;
use async_trait::async_trait;
use tracing::info;

#[derive(Debug, Default, Clone, Copy)]
pub struct SilentSpeaker;

#[async_trait]
impl Speaker for SilentSpeaker {
    async fn speak(&self, text: &str) -> Result<(), SpeechError> {
        info!(alert = %text, "Alert");
        Ok(())
    }

    fn name(&self) -> &str {
        "silent"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_silent_speaker_accepts_any_text() {
        let speaker = SilentSpeaker;
        assert!(tokio_test::block_on(speaker.speak("Warning! Mask are missing.")).is_ok());
        assert!(tokio_test::block_on(speaker.speak("")).is_ok());
        assert_eq!(speaker.name(), "silent");
    }
}
