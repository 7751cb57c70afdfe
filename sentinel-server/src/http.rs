// HTTP server with the camera, violation, account and worker routes

use crate::error::{ApiError, ApiJson};
use crate::mjpeg::mjpeg_response;
use crate::pipeline::FramePipeline;
use crate::security::{auth_middleware, Claims, PasswordHasher, TokenManager};
use crate::session::{CameraSessionManager, SessionStatus, ToggleAction};
use axum::{
    extract::{Path, State},
    http::{HeaderValue, Method, StatusCode},
    middleware,
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Extension, Router,
};
use sentinel_core::{CameraSection, Role, ViolationRecord};
use sentinel_storage::{NewUser, UserStore, ViolationStore, Worker, WorkerFields, WorkerStore};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

// API state
#[derive(Clone)]
pub struct ApiState {
    pub session: Arc<CameraSessionManager>,
    pub pipeline: Arc<FramePipeline>,
    pub violations: Arc<dyn ViolationStore>,
    pub users: Arc<dyn UserStore>,
    pub workers: Arc<dyn WorkerStore>,
    pub token_manager: Arc<TokenManager>,
    pub passwords: PasswordHasher,
}

// Response types
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub detector: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    fn new(message: impl Into<String>) -> Json<Self> {
        Json(Self {
            message: message.into(),
        })
    }
}

/// A violation as listed to clients.
#[derive(Debug, Serialize, Deserialize)]
pub struct ViolationResponse {
    pub id: u64,
    pub camera_location: String,
    pub detected_gear: String,
    pub missing_gear: String,
    pub timestamp: String,
}

impl From<ViolationRecord> for ViolationResponse {
    fn from(record: ViolationRecord) -> Self {
        Self {
            id: record.id,
            camera_location: record.camera_location.to_string(),
            timestamp: record.formatted_timestamp(),
            detected_gear: record.detected_gear,
            missing_gear: record.missing_gear,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct ToggleRequest {
    #[serde(default)]
    pub camera_type: String,
    #[serde(default)]
    pub action: String,
}

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub role: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct LoginResponse {
    pub token: String,
    pub role: Role,
    pub message: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TokenStatusResponse {
    pub message: String,
    pub role: Role,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ProfileResponse {
    pub id: u64,
    pub email: String,
    pub role: Role,
}

/// Create the application router
pub fn create_router(state: ApiState) -> Router {
    let public_routes = Router::new()
        .route("/health", get(health_handler))
        .route("/video_feed/:section", get(video_feed_handler))
        .route("/toggle_camera", post(toggle_camera_handler))
        .route("/get-violations", get(get_violations_handler))
        .route("/api/camera/status", get(camera_status_handler))
        .route("/register", post(register_handler))
        .route("/login", post(login_handler));

    let protected_routes = Router::new()
        .route("/validate-token", post(validate_token_handler))
        .route("/api/user/profile", get(profile_handler))
        .route("/api/violations", get(list_violations_handler))
        .route("/api/workers/register", post(register_worker_handler))
        .route("/api/workers", get(list_workers_handler))
        .route(
            "/api/workers/:id",
            get(get_worker_handler)
                .put(update_worker_handler)
                .delete(delete_worker_handler),
        )
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    public_routes
        .merge(protected_routes)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// CORS for the dashboard. An empty list allows any origin.
pub fn cors_layer(origins: &[String]) -> CorsLayer {
    let layer = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE, Method::OPTIONS])
        .allow_headers(Any);

    if origins.is_empty() {
        return layer.allow_origin(Any);
    }

    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match origin.parse::<HeaderValue>() {
            Ok(value) => Some(value),
            Err(_) => {
                warn!("Ignoring invalid CORS origin: {}", origin);
                None
            }
        })
        .collect();
    layer.allow_origin(AllowOrigin::list(allowed))
}

/// Health check endpoint
async fn health_handler(State(state): State<ApiState>) -> impl IntoResponse {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        detector: state.pipeline.detector_name().to_string(),
    })
}

async fn camera_status_handler(State(state): State<ApiState>) -> Json<SessionStatus> {
    Json(state.session.status())
}

/// Live MJPEG feed for a section that currently holds the camera.
async fn video_feed_handler(
    State(state): State<ApiState>,
    Path(section): Path<String>,
) -> Result<Response, ApiError> {
    let section: CameraSection = section.parse()?;
    let device = state.session.open_stream(section)?;
    Ok(mjpeg_response(state.pipeline.clone(), section, device))
}

async fn toggle_camera_handler(
    State(state): State<ApiState>,
    ApiJson(request): ApiJson<ToggleRequest>,
) -> Result<Json<MessageResponse>, ApiError> {
    let section = request.camera_type.parse::<CameraSection>().map_err(|e| {
        warn!("Toggle for unknown camera '{}'", request.camera_type);
        ApiError::from(e)
    })?;
    let action: ToggleAction = request.action.parse().map_err(|_| {
        warn!("Invalid camera action '{}' for {}", request.action, section);
        ApiError::BadRequest("Invalid action".to_string())
    })?;

    // Opening a device blocks.
    let session = state.session.clone();
    let outcome = tokio::task::spawn_blocking(move || session.set_section(section, action))
        .await
        .map_err(|e| ApiError::Internal(format!("Camera task failed: {}", e)))??;

    Ok(MessageResponse::new(outcome.message(section)))
}

async fn load_violations(state: &ApiState) -> Result<Vec<ViolationResponse>, ApiError> {
    let records = state.violations.list_violations().await?;
    Ok(records.into_iter().map(ViolationResponse::from).collect())
}

async fn get_violations_handler(State(state): State<ApiState>) -> Result<Json<Vec<ViolationResponse>>, ApiError> {
    Ok(Json(load_violations(&state).await?))
}

async fn list_violations_handler(
    State(state): State<ApiState>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<Vec<ViolationResponse>>, ApiError> {
    claims.require(Role::can_view)?;
    Ok(Json(load_violations(&state).await?))
}

/// Run PBKDF2 off the async runtime.
async fn hash_password(hasher: PasswordHasher, password: String) -> Result<String, ApiError> {
    tokio::task::spawn_blocking(move || hasher.hash(&password))
        .await
        .map_err(|e| ApiError::Internal(format!("Hashing task failed: {}", e)))
}

async fn verify_password(hasher: PasswordHasher, password: String, stored: String) -> Result<bool, ApiError> {
    tokio::task::spawn_blocking(move || hasher.verify(&password, &stored))
        .await
        .map_err(|e| ApiError::Internal(format!("Hashing task failed: {}", e)))
}

async fn register_handler(
    State(state): State<ApiState>,
    ApiJson(request): ApiJson<RegisterRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let email = request.email.trim();
    if email.is_empty() || request.password.is_empty() || request.role.is_empty() {
        return Err(ApiError::BadRequest("All fields are required".to_string()));
    }
    let role: Role = request
        .role
        .parse()
        .map_err(|_| ApiError::BadRequest("Invalid role".to_string()))?;

    if state.users.find_user_by_email(email).await?.is_some() {
        return Err(ApiError::Conflict("User already exists".to_string()));
    }

    let password_hash = hash_password(state.passwords, request.password).await?;
    state
        .users
        .create_user(NewUser {
            email: email.to_string(),
            password_hash,
            role,
        })
        .await?;

    Ok((StatusCode::CREATED, MessageResponse::new("User registered successfully")))
}

async fn login_handler(
    State(state): State<ApiState>,
    ApiJson(request): ApiJson<LoginRequest>,
) -> Result<Json<LoginResponse>, ApiError> {
    let email = request.email.trim();
    if email.is_empty() || request.password.is_empty() {
        return Err(ApiError::BadRequest("Email and password are required".to_string()));
    }

    let user = state
        .users
        .find_user_by_email(email)
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;

    if !verify_password(state.passwords, request.password, user.password_hash.clone()).await? {
        warn!("Failed login for {}", user.email);
        return Err(ApiError::BadRequest("Invalid credentials".to_string()));
    }

    let token = state
        .token_manager
        .generate_token(user.id, user.role)
        .map_err(|e| ApiError::Internal(e.to_string()))?;

    info!("User {} logged in", user.email);
    Ok(Json(LoginResponse {
        token,
        role: user.role,
        message: "Login successful".to_string(),
    }))
}

async fn validate_token_handler(Extension(claims): Extension<Claims>) -> Json<TokenStatusResponse> {
    Json(TokenStatusResponse {
        message: "Token is valid".to_string(),
        role: claims.role,
    })
}

async fn profile_handler(
    State(state): State<ApiState>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<ProfileResponse>, ApiError> {
    let not_found = || ApiError::NotFound("User not found".to_string());
    let id = claims.user_id().ok_or_else(not_found)?;
    let user = state.users.get_user(id).await?.ok_or_else(not_found)?;
    Ok(Json(ProfileResponse {
        id: user.id,
        email: user.email,
        role: user.role,
    }))
}

fn validate_worker(fields: &WorkerFields) -> Result<(), ApiError> {
    if fields.name.trim().is_empty() || fields.employee_id.trim().is_empty() {
        return Err(ApiError::BadRequest("Name and employee ID are required".to_string()));
    }
    Ok(())
}

fn worker_not_found() -> ApiError {
    ApiError::NotFound("Worker not found".to_string())
}

async fn register_worker_handler(
    State(state): State<ApiState>,
    Extension(claims): Extension<Claims>,
    ApiJson(fields): ApiJson<WorkerFields>,
) -> Result<impl IntoResponse, ApiError> {
    claims.require(Role::can_manage_workers)?;
    validate_worker(&fields)?;
    let worker = state.workers.create_worker(fields).await?;
    info!("Registered worker {} ({})", worker.id, worker.fields.employee_id);
    Ok((StatusCode::CREATED, Json(worker)))
}

async fn list_workers_handler(
    State(state): State<ApiState>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<Vec<Worker>>, ApiError> {
    claims.require(Role::can_view)?;
    Ok(Json(state.workers.list_workers().await?))
}

async fn get_worker_handler(
    State(state): State<ApiState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<u64>,
) -> Result<Json<Worker>, ApiError> {
    claims.require(Role::can_view)?;
    let worker = state.workers.get_worker(id).await?.ok_or_else(worker_not_found)?;
    Ok(Json(worker))
}

async fn update_worker_handler(
    State(state): State<ApiState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<u64>,
    ApiJson(fields): ApiJson<WorkerFields>,
) -> Result<Json<Worker>, ApiError> {
    claims.require(Role::can_manage_workers)?;
    validate_worker(&fields)?;
    let worker = state
        .workers
        .update_worker(id, fields)
        .await?
        .ok_or_else(worker_not_found)?;
    Ok(Json(worker))
}

async fn delete_worker_handler(
    State(state): State<ApiState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<u64>,
) -> Result<Json<MessageResponse>, ApiError> {
    claims.require(Role::can_manage_workers)?;
    if !state.workers.delete_worker(id).await? {
        return Err(worker_not_found());
    }
    info!("Deleted worker {}", id);
    Ok(MessageResponse::new("Worker deleted successfully"))
}
