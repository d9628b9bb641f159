// THEORY:
// The HTTP front end is a thin shell around `phosphene::Orchestrator`. It
// checks that an upload looks like an image, stages it to a scratch file,
// runs the simulation on a blocking thread and maps the outcome to JSON.
//
// Everything the handlers need (the orchestrator, the CORS allow-list, the
// upload limit) is built once from `ServerConfig` when the router is made.
// Nothing is read from globals at request time.

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use axum::extract::multipart::{Multipart, MultipartError, MultipartRejection};
use axum::extract::{DefaultBodyLimit, State};
use axum::http::{HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use phosphene::{ConfigurationRegistry, Orchestrator, SimulationError, SimulationResult, SimulationRunner, TempFileManager};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tower_http::cors::{AllowHeaders, AllowMethods, AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

/// Origins allowed when none are configured: the local dev server and the published front end.
pub const DEFAULT_ALLOWED_ORIGINS: [&str; 3] = [
    "http://localhost:5173",
    "http://127.0.0.1:5173",
    "https://aixiera.github.io",
];
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 25 * 1024 * 1024;

const UPLOAD_FIELD: &str = "file";
const DEFAULT_UPLOAD_SUFFIX: &str = ".png";

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub bind_addr: String,
    pub allowed_origins: Vec<String>,
    /// Where uploads and rendered percepts are staged. `None` means the system temp dir.
    pub scratch_dir: Option<PathBuf>,
    pub max_upload_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1:8000".to_string(),
            allowed_origins: DEFAULT_ALLOWED_ORIGINS.iter().map(|o| o.to_string()).collect(),
            scratch_dir: None,
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
        }
    }
}

#[derive(Clone)]
pub struct AppState {
    pub orchestrator: Arc<Orchestrator>,
}

impl AppState {
    pub fn new(config: &ServerConfig) -> Self {
        let temp_files = config.scratch_dir.clone().map(TempFileManager::new).unwrap_or_default();
        let runner = SimulationRunner::new(Arc::new(ConfigurationRegistry::new()), temp_files);
        Self { orchestrator: Arc::new(Orchestrator::new(runner)) }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid CORS origin {0:?}")]
    InvalidOrigin(String),
}

/// Upload problems the client can fix. A 4xx, usually 400.
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("Please upload an image file.")]
    NotAnImage,
    #[error("Please upload an image file.")]
    MissingFile,
    /// Keeps axum's own status, e.g. 413 when the body limit is hit.
    #[error("{message}")]
    Multipart { status: StatusCode, message: String },
}

impl ValidationError {
    pub fn status(&self) -> StatusCode {
        match self {
            ValidationError::Multipart { status, .. } => *status,
            ValidationError::NotAnImage | ValidationError::MissingFile => StatusCode::BAD_REQUEST,
        }
    }
}

impl From<MultipartError> for ValidationError {
    fn from(e: MultipartError) -> Self {
        Self::Multipart { status: e.status(), message: e.body_text() }
    }
}

impl From<MultipartRejection> for ValidationError {
    fn from(e: MultipartRejection) -> Self {
        Self::Multipart { status: e.status(), message: e.body_text() }
    }
}

#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Simulation(#[from] SimulationError),
    #[error("simulation task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    pub detail: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            ApiError::Validation(e) => e.status(),
            ApiError::Simulation(_) | ApiError::Task(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        if status.is_server_error() {
            error!(error = %self, "simulation request failed");
        } else {
            warn!(error = %self, "rejected upload");
        }
        (status, Json(ErrorBody { detail: self.to_string() })).into_response()
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub ok: bool,
}

/// One uploaded file as received from the multipart body.
#[derive(Debug)]
pub struct UploadedImage {
    pub bytes: Vec<u8>,
    pub content_type: Option<String>,
    pub file_name: Option<String>,
}

impl UploadedImage {
    /// Staging suffix: the original extension with its dot, or `.png`.
    pub fn suffix(&self) -> String {
        upload_suffix(self.file_name.as_deref())
    }
}

pub fn upload_suffix(file_name: Option<&str>) -> String {
    file_name
        .and_then(|name| Path::new(name).extension())
        .map(|ext| ext.to_string_lossy())
        .filter(|ext| !ext.is_empty())
        .map(|ext| format!(".{ext}"))
        .unwrap_or_else(|| DEFAULT_UPLOAD_SUFFIX.to_string())
}

fn cors_layer(origins: &[String]) -> Result<CorsLayer, ConfigError> {
    let origins = origins
        .iter()
        .map(|o| HeaderValue::from_str(o).map_err(|_| ConfigError::InvalidOrigin(o.clone())))
        .collect::<Result<Vec<_>, _>>()?;
    // Credentials rule out `Any`, so methods and headers mirror the preflight instead.
    Ok(CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods(AllowMethods::mirror_request())
        .allow_headers(AllowHeaders::mirror_request())
        .allow_credentials(true))
}

pub fn build_router(state: AppState, config: &ServerConfig) -> Result<Router, ConfigError> {
    Ok(Router::new()
        .route("/health", get(health))
        .route("/simulate", post(simulate))
        .layer(DefaultBodyLimit::max(config.max_upload_bytes))
        .layer(cors_layer(&config.allowed_origins)?)
        .layer(TraceLayer::new_for_http())
        .with_state(state))
}

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse { ok: true })
}

async fn simulate(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<SimulationResult>, ApiError> {
    let upload = read_upload(multipart.map_err(ValidationError::from)?).await?;
    info!(
        file_name = upload.file_name.as_deref().unwrap_or("<none>"),
        content_type = upload.content_type.as_deref().unwrap_or("<none>"),
        len = upload.bytes.len(),
        "simulating upload"
    );

    let orchestrator = state.orchestrator.clone();
    let result = tokio::task::spawn_blocking(move || -> Result<SimulationResult, SimulationError> {
        let staged = orchestrator.runner().temp_files().stage(&upload.bytes, &upload.suffix())?;
        // `staged` is released when this closure returns, whatever the outcome.
        orchestrator.run_all(staged.path())
    })
    .await??;

    Ok(Json(result))
}

/// Pulls the `file` field out of the form and checks it declares an image type.
async fn read_upload(mut multipart: Multipart) -> Result<UploadedImage, ValidationError> {
    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some(UPLOAD_FIELD) {
            continue;
        }
        let content_type = field.content_type().map(str::to_owned);
        if !content_type.as_deref().is_some_and(|ct| ct.starts_with("image/")) {
            return Err(ValidationError::NotAnImage);
        }
        let file_name = field.file_name().map(str::to_owned);
        let bytes = field.bytes().await?.to_vec();
        return Ok(UploadedImage { bytes, content_type, file_name });
    }
    Err(ValidationError::MissingFile)
}

/// Binds `cfg.bind_addr` and serves until Ctrl-C.
pub async fn start_server(
    cfg: ServerConfig,
) -> anyhow::Result<(SocketAddr, tokio::task::JoinHandle<anyhow::Result<()>>)> {
    let app = build_router(AppState::new(&cfg), &cfg)?;
    let listener = tokio::net::TcpListener::bind(&cfg.bind_addr).await?;
    let local_addr = listener.local_addr()?;
    info!(
        addr = %local_addr,
        origins = ?cfg.allowed_origins,
        scratch_dir = ?cfg.scratch_dir,
        "phosphene server listening"
    );

    let server = tokio::spawn(async move {
        axum::serve(listener, app)
            .with_graceful_shutdown(async {
                let _ = tokio::signal::ctrl_c().await;
                info!("shutdown requested");
            })
            .await
            .map_err(anyhow::Error::from)
    });

    Ok((local_addr, server))
}
