//! HTTP surface: the single-page UI plus the upload and query endpoints.

use axum::extract::multipart::MultipartRejection;
use axum::extract::rejection::JsonRejection;
use axum::extract::{DefaultBodyLimit, Multipart, State};
use axum::http::StatusCode;
use axum::response::Html;
use axum::routing::{get, post};
use axum::{Json, Router};
use pdf_qa_core::{IngestError, ProviderKind, QaCoordinator, QaError};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::{error, warn};

const INDEX_HTML: &str = include_str!("../static/index.html");

pub const UPLOAD_FAILED: &str = "Failed to process PDF";
pub const QUERY_FAILED: &str = "Failed to query PDF";

pub struct AppState {
    pub qa: QaCoordinator,
    pub provider: ProviderKind,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct UploadResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chunks: Option<usize>,
}

#[derive(Debug, Deserialize)]
pub struct QueryRequest {
    #[serde(default)]
    pub query: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct QueryResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub answer: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub provider: String,
    pub chunks: usize,
}

pub fn build_router(state: Arc<AppState>, max_upload_bytes: usize) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/api/health", get(health))
        .route(
            "/api/upload",
            post(upload).layer(DefaultBodyLimit::max(max_upload_bytes)),
        )
        .route("/api/query", post(query))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn index() -> Html<&'static str> {
    Html(INDEX_HTML)
}

async fn health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        provider: state.provider.to_string(),
        chunks: state.qa.chunk_count().await,
    })
}

fn upload_failure(status: StatusCode, message: impl Into<String>) -> (StatusCode, Json<UploadResponse>) {
    (
        status,
        Json(UploadResponse {
            success: false,
            message: Some(message.into()),
            chunks: None,
        }),
    )
}

fn query_failure(status: StatusCode, message: impl Into<String>) -> (StatusCode, Json<QueryResponse>) {
    (
        status,
        Json(QueryResponse {
            success: false,
            answer: None,
            message: Some(message.into()),
        }),
    )
}

/// Client mistakes get an explicit message; everything else is logged and
/// reported generically.
fn classify(error: &QaError, generic: &str) -> (StatusCode, String) {
    if !error.is_client_error() {
        error!(%error, "request failed");
        return (StatusCode::INTERNAL_SERVER_ERROR, generic.to_string());
    }

    let message = match error {
        QaError::Ingest(IngestError::NotPdf(_)) => "Please upload a PDF file".to_string(),
        QaError::Ingest(IngestError::EmptyUpload) => "Uploaded file is empty".to_string(),
        other => other.to_string(),
    };
    (StatusCode::BAD_REQUEST, message)
}

async fn upload(
    State(state): State<Arc<AppState>>,
    multipart: Result<Multipart, MultipartRejection>,
) -> (StatusCode, Json<UploadResponse>) {
    let mut multipart = match multipart {
        Ok(multipart) => multipart,
        Err(rejection) => {
            warn!(%rejection, "upload without multipart body");
            return upload_failure(StatusCode::BAD_REQUEST, "File is required");
        }
    };

    let mut file = None;
    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => break,
            Err(error) => {
                warn!(%error, "malformed multipart upload");
                return upload_failure(error.status(), error.body_text());
            }
        };

        if field.name() != Some("file") {
            continue;
        }

        let file_name = field.file_name().unwrap_or("upload.pdf").to_string();
        match field.bytes().await {
            Ok(bytes) => {
                file = Some((file_name, bytes));
                break;
            }
            Err(error) => {
                warn!(%error, file = %file_name, "failed to read upload");
                return upload_failure(error.status(), error.body_text());
            }
        }
    }

    let Some((file_name, bytes)) = file else {
        return upload_failure(StatusCode::BAD_REQUEST, "File is required");
    };

    match state.qa.ingest(&file_name, bytes.to_vec()).await {
        Ok(outcome) => (
            StatusCode::OK,
            Json(UploadResponse {
                success: true,
                message: Some("PDF processed successfully".to_string()),
                chunks: Some(outcome.chunk_count),
            }),
        ),
        Err(error) => {
            let (status, message) = classify(&error, UPLOAD_FAILED);
            upload_failure(status, message)
        }
    }
}

async fn query(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<QueryRequest>, JsonRejection>,
) -> (StatusCode, Json<QueryResponse>) {
    let question = match payload {
        Ok(Json(QueryRequest {
            query: Some(query),
        })) if !query.trim().is_empty() => query,
        Ok(_) => return query_failure(StatusCode::BAD_REQUEST, "Query is required"),
        Err(rejection) => {
            warn!(%rejection, "invalid query body");
            return query_failure(StatusCode::BAD_REQUEST, "Query is required");
        }
    };

    match state.qa.answer(&question).await {
        Ok(answer) => (
            StatusCode::OK,
            Json(QueryResponse {
                success: true,
                answer: Some(answer.text),
                message: None,
            }),
        ),
        Err(error) => {
            let (status, message) = classify(&error, QUERY_FAILED);
            query_failure(status, message)
        }
    }
}
