use super::error::{not_found, panic_response};
use super::upload::{read_upload, UploadLimits};
use crate::adapters::DynProvider;
use crate::application::relay::RelayService;
use crate::config::{ProviderKind, RelayConfig, StorageBackend};
use crate::domain::result::timestamp;
use crate::error::RelayError;
use axum::extract::multipart::MultipartRejection;
use axum::extract::{DefaultBodyLimit, Multipart, State};
use axum::http::{HeaderValue, Method};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{json, Value};
use std::any::Any;
use std::path::PathBuf;
use std::sync::Arc;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::{AllowHeaders, AllowOrigin, CorsLayer};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing::warn;

/// Shared, read-only state handed to every request.
#[derive(Clone)]
pub struct AppState {
    pub relay: Arc<RelayService<DynProvider>>,
    pub limits: Arc<UploadLimits>,
    pub environment: Arc<str>,
    /// Include debug details in 5xx bodies (anything but production).
    pub expose_details: bool,
    pub cloudinary_configured: bool,
    pub cors_origin: Option<String>,
    /// Served under `/media` when renders are published to the local filesystem.
    pub media_dir: Option<PathBuf>,
}

impl AppState {
    pub fn new(config: &RelayConfig, provider: DynProvider) -> Self {
        let serves_media = config.provider == ProviderKind::Ffmpeg
            && config.storage.backend == StorageBackend::Fs;

        Self {
            relay: Arc::new(RelayService::new(provider, config.retry.clone())),
            limits: Arc::new(UploadLimits {
                staging_dir: config.staging_dir.clone(),
                max_file_bytes: config.max_upload_bytes,
            }),
            environment: Arc::from(config.environment.as_str()),
            expose_details: !config.is_production(),
            cloudinary_configured: config.provider == ProviderKind::Cloudinary
                && config.cloudinary.is_configured(),
            cors_origin: config.frontend_url.clone(),
            media_dir: serves_media.then(|| config.storage.output_dir.clone()),
        }
    }
}

pub fn router(state: AppState) -> Router {
    let expose_details = state.expose_details;

    let mut router = Router::new()
        .route("/api/health", get(health).fallback(fallback))
        .route("/api/stretch", post(stretch).fallback(fallback))
        .route("/api/stretch/health", get(stretch_health).fallback(fallback));

    if let Some(dir) = &state.media_dir {
        router = router.nest_service("/media", ServeDir::new(dir));
    }

    router
        .fallback(fallback)
        .layer(DefaultBodyLimit::max(state.limits.body_limit()))
        .layer(CatchPanicLayer::custom(
            move |panic: Box<dyn Any + Send + 'static>| panic_response(panic, expose_details),
        ))
        .layer(cors_layer(state.cors_origin.as_deref()))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn cors_layer(origin: Option<&str>) -> CorsLayer {
    let allow_origin = match origin.map(HeaderValue::from_str) {
        Some(Ok(value)) => AllowOrigin::exact(value),
        Some(Err(_)) => {
            warn!(origin = ?origin, "invalid FRONTEND_URL, mirroring request origin");
            AllowOrigin::mirror_request()
        }
        None => AllowOrigin::mirror_request(),
    };

    CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(AllowHeaders::mirror_request())
        .allow_credentials(true)
}

/// `POST /api/stretch`
async fn stretch(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Response {
    let outcome = async {
        let mut multipart = multipart.map_err(|rejection| RelayError::Transport {
            status: rejection.status().as_u16(),
            message: rejection.body_text(),
        })?;
        let upload = read_upload(&mut multipart, &state.limits).await?;
        state.relay.process(upload).await
    }
    .await;

    match outcome {
        Ok(result) => Json(result).into_response(),
        Err(err) => {
            if err.is_client_error() {
                tracing::debug!(error = %err, "stretch request rejected");
            } else {
                tracing::error!(error = %err, "stretch request failed");
            }
            err.into_response_with(state.expose_details)
        }
    }
}

/// `GET /api/stretch/health`
async fn stretch_health(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "service": "video-stretch",
        "status": "operational",
        "timestamp": timestamp(),
        "features": {
            "videoProcessing": true,
            "cloudinaryIntegration": state.cloudinary_configured,
            "fileUpload": true,
        }
    }))
}

/// `GET /api/health`
async fn health(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "timestamp": timestamp(),
        "environment": &*state.environment,
    }))
}

async fn fallback() -> Response {
    not_found()
}
