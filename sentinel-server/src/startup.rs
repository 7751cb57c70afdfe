// Service wiring: turns a validated config into the router state

use crate::cooldown::ViolationLogger;
use crate::http::ApiState;
use crate::pipeline::FramePipeline;
use crate::security::{PasswordHasher, TokenManager};
use crate::session::CameraSessionManager;
use anyhow::Context;
use sentinel_core::SentinelConfig;
use sentinel_eye::{CameraOpener, Detector, VisionConfig};
use sentinel_spk::engines::speaker_from_config;
use sentinel_spk::{alert_channel, spawn_alert_worker, SpeechConfig};
use sentinel_storage::{ArtifactWriter, SledStore};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{info, warn};

/// Everything the binary owns after start-up.
pub struct Services {
    pub state: ApiState,
    pub store: Arc<SledStore>,
    /// Finishes once the alert channel is closed and drained.
    pub alert_worker: JoinHandle<()>,
}

/// Open the store, start the alert worker and build the router state.
/// Must run inside a tokio runtime.
pub fn initialize(config: &SentinelConfig) -> anyhow::Result<Services> {
    let db_path = config.storage.data_dir.join("db");
    let store = Arc::new(
        SledStore::open(&db_path).with_context(|| format!("Failed to open store at {}", db_path.display()))?,
    );

    let speech = SpeechConfig::from(&config.alerts);
    speech.validate().map_err(anyhow::Error::msg)?;
    let (alerts, receiver) = alert_channel();
    let alerts = Arc::new(alerts);
    let alert_worker = spawn_alert_worker(receiver, speaker_from_config(&speech));

    let vision = Arc::new(VisionConfig::from_parts(&config.camera, &config.detection));
    vision.validate().map_err(anyhow::Error::msg)?;
    let detector = detector(&vision)?;
    info!("Detector: {}", detector.name());

    let artifacts = ArtifactWriter::new(&config.violations.artifact_dir);
    info!("Violation snapshots go to {}", artifacts.dir().display());
    let logger = Arc::new(ViolationLogger::new(
        Duration::from_secs(config.violations.cooldown_secs),
        store.clone(),
        artifacts,
    ));

    let pipeline = Arc::new(FramePipeline::new(
        detector,
        alerts.clone(),
        logger,
        config.detection.confidence,
        config.detection.required_items.clone(),
    ));
    let session = Arc::new(CameraSessionManager::new(camera_opener(&vision), alerts));

    let secret = match &config.auth.jwt_secret {
        Some(secret) => secret.clone(),
        None => {
            warn!("No JWT secret configured; tokens will not survive a restart");
            TokenManager::random_secret()
        }
    };

    let state = ApiState {
        session,
        pipeline,
        violations: store.clone(),
        users: store.clone(),
        workers: store.clone(),
        token_manager: Arc::new(TokenManager::new(&secret, config.auth.token_ttl_secs)),
        passwords: PasswordHasher::new(config.auth.password_iterations),
    };

    Ok(Services {
        state,
        store,
        alert_worker,
    })
}

#[cfg(feature = "opencv")]
fn camera_opener(vision: &Arc<VisionConfig>) -> Arc<dyn CameraOpener> {
    Arc::new(sentinel_eye::camera::OpenCvCameraOpener::new(vision.clone()))
}

#[cfg(not(feature = "opencv"))]
fn camera_opener(_vision: &Arc<VisionConfig>) -> Arc<dyn CameraOpener> {
    warn!("Built without the `opencv` feature; turning a camera on will fail");
    Arc::new(sentinel_eye::UnavailableCameraOpener)
}

#[cfg(feature = "onnx")]
fn detector(vision: &VisionConfig) -> anyhow::Result<Arc<dyn Detector>> {
    let detector = sentinel_eye::models::YoloPpeDetector::new(vision)
        .with_context(|| format!("Failed to load PPE model from {}", vision.model_path.display()))?;
    Ok(Arc::new(detector))
}

#[cfg(not(feature = "onnx"))]
fn detector(_vision: &VisionConfig) -> anyhow::Result<Arc<dyn Detector>> {
    warn!("Built without the `onnx` feature; frames pass through with no detections");
    Ok(Arc::new(sentinel_eye::PassthroughDetector))
}
