// Shared fixtures: a scripted detector, a fake camera and a router wired
// to a throwaway sled store.

#![allow(dead_code)]

use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use image::Rgb;
use parking_lot::Mutex;
use sentinel_core::Role;
use sentinel_eye::{CameraDevice, CameraOpener, Detection, DetectionOutput, Detector, Frame, VisionError};
use sentinel_server::http::{create_router, ApiState};
use sentinel_server::security::{PasswordHasher, TokenManager};
use sentinel_server::{CameraSessionManager, FramePipeline, ViolationLogger};
use sentinel_spk::{alert_channel, AlertDeduplicator, AlertReceiver};
use async_trait::async_trait;
use sentinel_core::{NewViolation, ViolationRecord};
use sentinel_storage::{ArtifactWriter, SledStore, StorageError, ViolationStore};
use serde_json::Value;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use tower::ServiceExt;

pub const TEST_SECRET: &str = "sentinel-test-secret";

/// Reports the same labels for every frame until told otherwise.
#[derive(Default)]
pub struct ScriptedDetector {
    labels: Mutex<Vec<String>>,
    delay: Mutex<Option<Duration>>,
}

impl ScriptedDetector {
    pub fn set_labels(&self, labels: &[&str]) {
        *self.labels.lock() = labels.iter().map(|s| s.to_string()).collect();
    }

    /// Make every detection take `delay`.
    pub fn set_delay(&self, delay: Duration) {
        *self.delay.lock() = Some(delay);
    }
}

impl Detector for ScriptedDetector {
    fn detect(&self, frame: &Frame, _confidence: f32) -> Result<DetectionOutput, VisionError> {
        let delay = *self.delay.lock();
        if let Some(delay) = delay {
            std::thread::sleep(delay);
        }
        let detections = self
            .labels
            .lock()
            .iter()
            .enumerate()
            .map(|(i, label)| Detection {
                class_id: i,
                label: label.clone(),
                confidence: 0.9,
                bbox: (1.0, 1.0, 4.0, 4.0),
            })
            .collect();
        Ok(DetectionOutput {
            detections,
            annotated: frame.clone(),
        })
    }

    fn name(&self) -> &str {
        "scripted"
    }
}

/// Counters shared between a [`FakeOpener`] and the cameras it opens.
#[derive(Default)]
pub struct CameraStats {
    pub opens: AtomicUsize,
    pub releases: AtomicUsize,
    pub reads: AtomicUsize,
}

pub struct FakeCamera {
    open: bool,
    stats: Arc<CameraStats>,
    /// Reads after this many frames fail.
    frame_limit: Option<usize>,
    frames: usize,
    read_delay: Option<Duration>,
}

impl CameraDevice for FakeCamera {
    fn read_frame(&mut self) -> Result<Frame, VisionError> {
        if !self.open {
            return Err(VisionError::Camera("released".to_string()));
        }
        if self.frame_limit.is_some_and(|limit| self.frames >= limit) {
            return Err(VisionError::Camera("unplugged".to_string()));
        }
        if let Some(delay) = self.read_delay {
            std::thread::sleep(delay);
        }
        self.frames += 1;
        self.stats.reads.fetch_add(1, Ordering::SeqCst);
        Ok(Frame::from_pixel(16, 12, Rgb([40, 90, 160])))
    }

    fn is_opened(&self) -> bool {
        self.open
    }

    fn release(&mut self) {
        if self.open {
            self.open = false;
            self.stats.releases.fetch_add(1, Ordering::SeqCst);
        }
    }
}

#[derive(Default)]
pub struct FakeOpener {
    pub stats: Arc<CameraStats>,
    pub fail: AtomicBool,
    pub frame_limit: Option<usize>,
    /// Every read blocks this long before returning its frame.
    pub read_delay: Option<Duration>,
}

impl CameraOpener for FakeOpener {
    fn open(&self) -> Result<Box<dyn CameraDevice>, VisionError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(VisionError::Camera("no such device".to_string()));
        }
        self.stats.opens.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(FakeCamera {
            open: true,
            stats: self.stats.clone(),
            frame_limit: self.frame_limit,
            frames: 0,
            read_delay: self.read_delay,
        }))
    }
}

/// A violation store whose database is unreachable.
pub struct FailingStore;

#[async_trait]
impl ViolationStore for FailingStore {
    async fn insert_violation(&self, _: &NewViolation) -> Result<ViolationRecord, StorageError> {
        Err(StorageError::Database("connection refused".to_string()))
    }

    async fn list_violations(&self) -> Result<Vec<ViolationRecord>, StorageError> {
        Err(StorageError::Database("connection refused".to_string()))
    }
}

pub struct TestApp {
    pub router: Router,
    pub state: ApiState,
    pub store: Arc<SledStore>,
    pub opener: Arc<FakeOpener>,
    pub detector: Arc<ScriptedDetector>,
    pub alerts: Arc<AlertDeduplicator>,
    pub alert_rx: AlertReceiver,
    pub artifacts: TempDir,
}

impl TestApp {
    pub fn new() -> Self {
        Self::with_opener(FakeOpener::default())
    }

    pub fn with_opener(opener: FakeOpener) -> Self {
        let artifacts = tempfile::tempdir().unwrap();
        let store = Arc::new(SledStore::temporary().unwrap());
        let opener = Arc::new(opener);
        let detector = Arc::new(ScriptedDetector::default());
        let (alerts, alert_rx) = alert_channel();
        let alerts = Arc::new(alerts);

        let logger = Arc::new(ViolationLogger::new(
            Duration::from_secs(5),
            store.clone(),
            ArtifactWriter::new(artifacts.path()),
        ));
        let pipeline = Arc::new(FramePipeline::new(
            detector.clone(),
            alerts.clone(),
            logger,
            0.3,
            vec!["Hardhat".to_string(), "Mask".to_string(), "Safety Vest".to_string()],
        ));

        let state = ApiState {
            session: Arc::new(CameraSessionManager::new(opener.clone(), alerts.clone())),
            pipeline,
            violations: store.clone(),
            users: store.clone(),
            workers: store.clone(),
            token_manager: Arc::new(TokenManager::new(TEST_SECRET, 3600)),
            passwords: PasswordHasher::new(1_000),
        };

        Self {
            router: create_router(state.clone()),
            state,
            store,
            opener,
            detector,
            alerts,
            alert_rx,
            artifacts,
        }
    }

    /// Serve violations from `store` instead of the sled store.
    pub fn with_violation_store(mut self, store: Arc<dyn ViolationStore>) -> Self {
        self.state.violations = store;
        self.router = create_router(self.state.clone());
        self
    }

    pub fn token_for(&self, user_id: u64, role: Role) -> String {
        self.state.token_manager.generate_token(user_id, role).unwrap()
    }

    /// Send a request and decode the JSON body (`Null` when empty).
    pub async fn send(&self, request: Request<Body>) -> (StatusCode, Value) {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json = if body.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&body).unwrap()
        };
        (status, json)
    }

    pub async fn toggle(&self, section: &str, action: &str) -> (StatusCode, Value) {
        self.send(json_request(
            "POST",
            "/toggle_camera",
            serde_json::json!({ "camera_type": section, "action": action }),
            None,
        ))
        .await
    }
}

pub fn get(uri: &str, token: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().uri(uri).method("GET");
    if let Some(token) = token {
        builder = builder.header("authorization", format!("Bearer {}", token));
    }
    builder.body(Body::empty()).unwrap()
}

pub fn json_request(method: &str, uri: &str, body: Value, token: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder()
        .uri(uri)
        .method(method)
        .header("content-type", "application/json");
    if let Some(token) = token {
        builder = builder.header("authorization", format!("Bearer {}", token));
    }
    builder.body(Body::from(body.to_string())).unwrap()
}
