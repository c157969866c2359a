//! API request handlers
//!
//! Handlers for all REST API endpoints. Paths in request bodies refer to the
//! server's filesystem.

use std::path::PathBuf;
use std::sync::Arc;

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde::{Deserialize, Serialize};
use tracing::warn;
use uuid::Uuid;

use crate::cli::{
    apply_dictionary_file, extract_dictionary, translate_dictionary, ApplyReport, ExtractReport,
    TranslateReport,
};
use crate::error::GlossaError;
use crate::translation::{build_backend, TranslationProvider};
use crate::types::ProcessingOptions;

use super::server::AppState;

/// Standard API response wrapper
#[derive(Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub success: bool,
    pub request_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            request_id: Uuid::new_v4().to_string(),
            data: Some(data),
            error: None,
        }
    }

    pub fn err(message: impl Into<String>) -> Self {
        Self {
            success: false,
            request_id: Uuid::new_v4().to_string(),
            data: None,
            error: Some(message.into()),
        }
    }
}

/// HTTP status for a failed operation
pub fn status_for(error: &GlossaError) -> StatusCode {
    match error {
        GlossaError::Validation(_) | GlossaError::Config(_) => StatusCode::BAD_REQUEST,
        GlossaError::Io(e) if e.kind() == std::io::ErrorKind::NotFound => StatusCode::NOT_FOUND,
        GlossaError::Yaml(_) | GlossaError::Json(_) => StatusCode::UNPROCESSABLE_ENTITY,
        GlossaError::Backend(_) => StatusCode::BAD_GATEWAY,
        GlossaError::InFile { source, .. } => status_for(source),
        e if e.is_format_error() => StatusCode::UNPROCESSABLE_ENTITY,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn failure<T: Serialize>(error: GlossaError) -> (StatusCode, Json<ApiResponse<T>>) {
    warn!(error = %error, "request failed");
    (status_for(&error), Json(ApiResponse::err(error.to_string())))
}

/// Root endpoint response
#[derive(Serialize)]
pub struct RootResponse {
    pub name: String,
    pub version: String,
    pub description: String,
    pub endpoints: Vec<EndpointInfo>,
}

#[derive(Serialize)]
pub struct EndpointInfo {
    pub path: String,
    pub method: String,
    pub description: String,
}

impl EndpointInfo {
    fn new(method: &str, path: &str, description: &str) -> Self {
        Self {
            path: path.to_string(),
            method: method.to_string(),
            description: description.to_string(),
        }
    }
}

/// GET / - Root info
pub async fn root(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(ApiResponse::ok(RootResponse {
        name: "Glossa API Server".to_string(),
        version: state.version.clone(),
        description: "Spreadsheet term extraction, dictionary translation and rewrite".to_string(),
        endpoints: vec![
            EndpointInfo::new("GET", "/health", "Health check endpoint"),
            EndpointInfo::new("GET", "/version", "Get server version"),
            EndpointInfo::new("POST", "/api/v1/extract", "Extract terms into a dictionary file"),
            EndpointInfo::new("POST", "/api/v1/translate", "Fill a dictionary through a backend"),
            EndpointInfo::new("POST", "/api/v1/apply", "Rewrite workbooks with a dictionary"),
        ],
    }))
}

/// Health check response
#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub uptime_message: String,
}

/// GET /health - Health check
pub async fn health() -> impl IntoResponse {
    Json(ApiResponse::ok(HealthResponse {
        status: "healthy".to_string(),
        uptime_message: "Server is running".to_string(),
    }))
}

/// Version response
#[derive(Serialize)]
pub struct VersionResponse {
    pub version: String,
    pub features: Vec<String>,
}

/// GET /version - Server version
pub async fn version(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(ApiResponse::ok(VersionResponse {
        version: state.version.clone(),
        features: ["extract", "translate", "apply"]
            .iter()
            .map(|s| s.to_string())
            .collect(),
    }))
}

/// Extract request
#[derive(Debug, Deserialize)]
pub struct ExtractRequest {
    pub file_paths: Vec<String>,
    pub dictionary_path: String,
    #[serde(default)]
    pub options: ProcessingOptions,
}

/// POST /api/v1/extract - Extract terms into a dictionary file
pub async fn extract(
    Json(req): Json<ExtractRequest>,
) -> Result<Json<ApiResponse<ExtractReport>>, (StatusCode, Json<ApiResponse<ExtractReport>>)> {
    let paths: Vec<PathBuf> = req.file_paths.iter().map(PathBuf::from).collect();
    extract_dictionary(&paths, &PathBuf::from(&req.dictionary_path), req.options)
        .map(|report| Json(ApiResponse::ok(report)))
        .map_err(failure)
}

/// Translate request
#[derive(Debug, Deserialize)]
pub struct TranslateRequest {
    pub dictionary_path: String,
    #[serde(default)]
    pub language: Option<String>,
    #[serde(default)]
    pub provider: TranslationProvider,
    /// Write here instead of overwriting `dictionary_path`
    #[serde(default)]
    pub output_path: Option<String>,
}

/// POST /api/v1/translate - Fill a dictionary through a backend
pub async fn translate(
    State(state): State<Arc<AppState>>,
    Json(req): Json<TranslateRequest>,
) -> Result<Json<ApiResponse<TranslateReport>>, (StatusCode, Json<ApiResponse<TranslateReport>>)> {
    let backend =
        build_backend(req.provider, &state.backends).map_err(failure::<TranslateReport>)?;
    let output = req.output_path.as_ref().map(PathBuf::from);

    translate_dictionary(
        &PathBuf::from(&req.dictionary_path),
        req.language.as_deref(),
        backend.as_ref(),
        output.as_deref(),
    )
    .await
    .map(|report| Json(ApiResponse::ok(report)))
    .map_err(failure)
}

/// Apply request
#[derive(Debug, Deserialize)]
pub struct ApplyRequest {
    pub dictionary_path: String,
    pub file_paths: Vec<String>,
    pub output_dir: String,
    #[serde(default)]
    pub language: Option<String>,
    #[serde(default)]
    pub bundle: bool,
}

/// POST /api/v1/apply - Rewrite workbooks with a dictionary.
///
/// Per-file failures keep the report in `data` and set `success` to false.
pub async fn apply(
    Json(req): Json<ApplyRequest>,
) -> Result<Json<ApiResponse<ApplyReport>>, (StatusCode, Json<ApiResponse<ApplyReport>>)> {
    let paths: Vec<PathBuf> = req.file_paths.iter().map(PathBuf::from).collect();
    let report = apply_dictionary_file(
        &PathBuf::from(&req.dictionary_path),
        &paths,
        &PathBuf::from(&req.output_dir),
        req.language.as_deref(),
        req.bundle,
    )
    .map_err(failure::<ApplyReport>)?;

    if report.all_succeeded() {
        return Ok(Json(ApiResponse::ok(report)));
    }

    let mut response = ApiResponse::ok(report);
    response.success = false;
    response.error = Some(format!(
        "{} file(s) failed",
        response.data.as_ref().map_or(0, |r| r.failed.len())
    ));
    Ok(Json(response))
}
