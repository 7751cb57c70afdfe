//! Layered configuration: defaults, then file, then environment.

use crate::error::Error;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SentinelConfig {
    pub server: ServerConfig,
    pub camera: CameraConfig,
    pub detection: DetectionConfig,
    pub alerts: AlertConfig,
    pub violations: ViolationConfig,
    pub storage: StorageConfig,
    pub auth: AuthConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind_address: String,
    pub port: u16,
    /// Allowed CORS origins. Empty means permissive.
    pub cors_origins: Vec<String>,
    pub log_level: String,
    pub log_json: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0".to_string(),
            port: 7755,
            cors_origins: Vec::new(),
            log_level: "info".to_string(),
            log_json: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    /// USB camera device index (0, 1, 2, etc.)
    pub device_index: u32,
    pub frame_rate: u32,
    pub resolution: (u32, u32),
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            device_index: 0,
            frame_rate: 30,
            resolution: (640, 480),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectionConfig {
    pub model_path: PathBuf,
    /// Minimum class score for a detection to be reported.
    pub confidence: f32,
    pub iou_threshold: f32,
    /// Square model input size in pixels.
    pub input_size: u32,
    /// Safety gear that must be worn; a `NO-<item>` label marks it missing.
    pub required_items: Vec<String>,
}

impl Default for DetectionConfig {
    fn default() -> Self {
        let model_path = dirs::home_dir()
            .map(|mut p| {
                p.push(".sentinel");
                p.push("models");
                p.push("ppe.onnx");
                p
            })
            .unwrap_or_else(|| PathBuf::from("./models/ppe.onnx"));

        Self {
            model_path,
            confidence: 0.3,
            iou_threshold: 0.45,
            input_size: 640,
            required_items: vec![
                "Hardhat".to_string(),
                "Mask".to_string(),
                "Safety Vest".to_string(),
            ],
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AlertConfig {
    pub enabled: bool,
    /// Words per minute.
    pub rate: u32,
    /// 0.0 - 1.0
    pub volume: f32,
    pub voice: Option<String>,
}

impl Default for AlertConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            rate: 150,
            volume: 1.0,
            voice: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ViolationConfig {
    pub cooldown_secs: u64,
    pub artifact_dir: PathBuf,
}

impl Default for ViolationConfig {
    fn default() -> Self {
        Self {
            cooldown_secs: 5,
            artifact_dir: PathBuf::from("violations"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub data_dir: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("./data"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    /// HS256 secret. A random one is generated per process when unset.
    pub jwt_secret: Option<String>,
    pub token_ttl_secs: u64,
    /// PBKDF2-HMAC-SHA256 rounds for new password hashes.
    pub password_iterations: u32,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            jwt_secret: None,
            token_ttl_secs: 3600,
            password_iterations: 100_000,
        }
    }
}

impl SentinelConfig {
    /// Load configuration from file (JSON, TOML or YAML).
    pub fn from_file(path: impl AsRef<std::path::Path>) -> Result<Self, Error> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::Configuration(format!("Failed to read {}: {}", path.display(), e))
        })?;
        Self::from_str(&content)
    }

    /// Load configuration from string
    pub fn from_str(content: &str) -> Result<Self, Error> {
        if let Ok(config) = serde_json::from_str::<SentinelConfig>(content) {
            return Ok(config);
        }

        if let Ok(config) = toml::from_str::<SentinelConfig>(content) {
            return Ok(config);
        }

        if let Ok(config) = serde_yaml::from_str::<SentinelConfig>(content) {
            return Ok(config);
        }

        Err(Error::Configuration("Unknown configuration format".to_string()))
    }

    /// Apply `SENTINEL_*` environment overrides.
    pub fn apply_env(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(port) = lookup("SENTINEL_PORT").and_then(|p| p.parse::<u16>().ok()) {
            self.server.port = port;
        }

        if let Some(host) = lookup("SENTINEL_HOST") {
            self.server.bind_address = host;
        }

        if let Some(data_dir) = lookup("SENTINEL_DATA_DIR") {
            self.storage.data_dir = PathBuf::from(data_dir);
        }

        if let Some(level) = lookup("SENTINEL_LOG_LEVEL") {
            self.server.log_level = level;
        }

        if let Some(secret) = lookup("SENTINEL_JWT_SECRET") {
            self.auth.jwt_secret = Some(secret);
        }

        if let Some(model) = lookup("SENTINEL_MODEL_PATH") {
            self.detection.model_path = PathBuf::from(model);
        }
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), Error> {
        if self.server.port == 0 {
            return Err(Error::Validation("Port must be non-zero".to_string()));
        }

        let camera = &self.camera;
        if camera.frame_rate == 0 || camera.frame_rate > 120 {
            return Err(Error::Validation("Frame rate must be between 1 and 120".to_string()));
        }
        if camera.resolution.0 == 0 || camera.resolution.1 == 0 {
            return Err(Error::Validation("Resolution must be non-zero".to_string()));
        }
        if camera.resolution.0 > 7680 || camera.resolution.1 > 4320 {
            return Err(Error::Validation("Resolution too large (max 8K)".to_string()));
        }
        if camera.device_index > 100 {
            return Err(Error::Validation("Camera index too large (max 100)".to_string()));
        }

        let detection = &self.detection;
        if !(detection.confidence > 0.0 && detection.confidence <= 1.0) {
            return Err(Error::Validation("Confidence must be in (0, 1]".to_string()));
        }
        if !(detection.iou_threshold > 0.0 && detection.iou_threshold <= 1.0) {
            return Err(Error::Validation("IoU threshold must be in (0, 1]".to_string()));
        }
        if detection.input_size == 0 || detection.input_size % 32 != 0 {
            return Err(Error::Validation("Model input size must be a positive multiple of 32".to_string()));
        }
        if detection.required_items.is_empty() {
            return Err(Error::Validation("At least one required item must be configured".to_string()));
        }
        if detection.required_items.iter().any(|item| item.trim().is_empty()) {
            return Err(Error::Validation("Required items must not be blank".to_string()));
        }

        if !(0.0..=1.0).contains(&self.alerts.volume) {
            return Err(Error::Validation("Alert volume must be between 0.0 and 1.0".to_string()));
        }
        if self.alerts.rate > 500 {
            return Err(Error::Validation("Alert rate too high (max 500 wpm)".to_string()));
        }

        if self.auth.token_ttl_secs == 0 {
            return Err(Error::Validation("Token TTL must be non-zero".to_string()));
        }
        if self.auth.password_iterations < 1_000 {
            return Err(Error::Validation("Password iterations must be at least 1000".to_string()));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_config_default() {
        let config = SentinelConfig::default();
        assert_eq!(config.server.port, 7755);
        assert_eq!(config.detection.confidence, 0.3);
        assert_eq!(config.violations.cooldown_secs, 5);
        assert_eq!(
            config.detection.required_items,
            vec!["Hardhat", "Mask", "Safety Vest"]
        );
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_from_toml_partial() {
        let config = SentinelConfig::from_str(
            r#"
            [server]
            port = 9000

            [violations]
            cooldown_secs = 10
            "#,
        )
        .unwrap();
        assert_eq!(config.server.port, 9000);
        assert_eq!(config.violations.cooldown_secs, 10);
        assert_eq!(config.camera.frame_rate, 30);
    }

    #[test]
    fn test_from_json() {
        let config = SentinelConfig::from_str(r#"{"alerts": {"enabled": false}}"#).unwrap();
        assert!(!config.alerts.enabled);
        assert_eq!(config.alerts.rate, 150);
    }

    #[test]
    fn test_from_yaml() {
        let config = SentinelConfig::from_str("storage:\n  data_dir: /var/lib/sentinel\n").unwrap();
        assert_eq!(config.storage.data_dir, PathBuf::from("/var/lib/sentinel"));
    }

    #[test]
    fn test_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sentinel.toml");
        std::fs::write(&path, "[camera]\ndevice_index = 2\n").unwrap();
        let config = SentinelConfig::from_file(&path).unwrap();
        assert_eq!(config.camera.device_index, 2);
    }

    #[test]
    fn test_from_missing_file() {
        let result = SentinelConfig::from_file("/nonexistent/sentinel.toml");
        assert!(matches!(result, Err(Error::Configuration(_))));
    }

    #[test]
    fn test_env_overrides() {
        let vars: HashMap<&str, &str> = [
            ("SENTINEL_PORT", "8181"),
            ("SENTINEL_HOST", "127.0.0.1"),
            ("SENTINEL_JWT_SECRET", "s3cret"),
            ("SENTINEL_DATA_DIR", "/tmp/sentinel"),
        ]
        .into_iter()
        .collect();

        let mut config = SentinelConfig::default();
        config.apply_overrides(|k| vars.get(k).map(|v| v.to_string()));
        assert_eq!(config.server.port, 8181);
        assert_eq!(config.server.bind_address, "127.0.0.1");
        assert_eq!(config.auth.jwt_secret.as_deref(), Some("s3cret"));
        assert_eq!(config.storage.data_dir, PathBuf::from("/tmp/sentinel"));
    }

    #[test]
    fn test_env_override_ignores_bad_port() {
        let mut config = SentinelConfig::default();
        config.apply_overrides(|k| (k == "SENTINEL_PORT").then(|| "not-a-port".to_string()));
        assert_eq!(config.server.port, 7755);
    }

    #[test]
    fn test_validation_rejects_bad_values() {
        let mut config = SentinelConfig::default();
        config.detection.confidence = 0.0;
        assert!(config.validate().is_err());

        let mut config = SentinelConfig::default();
        config.camera.frame_rate = 121;
        assert!(config.validate().is_err());

        let mut config = SentinelConfig::default();
        config.detection.required_items.clear();
        assert!(config.validate().is_err());

        let mut config = SentinelConfig::default();
        config.alerts.volume = 1.5;
        assert!(config.validate().is_err());

        let mut config = SentinelConfig::default();
        config.detection.input_size = 600;
        assert!(config.validate().is_err());
    }
}
