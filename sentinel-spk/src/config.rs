//! Configuration for speech synthesis

use sentinel_core::config::AlertConfig;
use serde::{Deserialize, Serialize};

/// Speech synthesis configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SpeechConfig {
    /// Speak alerts aloud. When false alerts are only logged.
    pub enabled: bool,

    /// Speech rate (words per minute, 1-500, default 150)
    pub rate: u32,

    /// Volume (0.0-1.0, default 1.0)
    pub volume: f32,

    /// Engine specific voice name
    pub voice: Option<String>,
}

impl Default for SpeechConfig {
    fn default() -> Self {
        Self::from(&AlertConfig::default())
    }
}

impl From<&AlertConfig> for SpeechConfig {
    fn from(alerts: &AlertConfig) -> Self {
        Self {
            enabled: alerts.enabled,
            rate: alerts.rate,
            volume: alerts.volume,
            voice: alerts.voice.clone(),
        }
    }
}

impl SpeechConfig {
    /// Validate configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.rate == 0 || self.rate > 500 {
            return Err("Speech rate must be between 1 and 500".to_string());
        }

        if !self.volume.is_finite() || !(0.0..=1.0).contains(&self.volume) {
            return Err("Volume must be between 0.0 and 1.0".to_string());
        }

        if let Some(voice) = &self.voice {
            if voice.is_empty() || voice.len() > 64 {
                return Err("Voice name must be 1-64 characters".to_string());
            }
            if !voice
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '+' | '.'))
            {
                return Err("Voice name contains invalid characters".to_string());
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_alert_config() {
        let config = SpeechConfig::default();
        assert!(config.enabled);
        assert_eq!(config.rate, 150);
        assert_eq!(config.volume, 1.0);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validation() {
        let mut config = SpeechConfig::default();
        config.rate = 0;
        assert!(config.validate().is_err());

        let mut config = SpeechConfig::default();
        config.volume = 1.5;
        assert!(config.validate().is_err());

        let mut config = SpeechConfig::default();
        config.voice = Some("en; rm -rf /".to_string());
        assert!(config.validate().is_err());

        config.voice = Some("en-us+f3".to_string());
        assert!(config.validate().is_ok());
    }
}
