//! HTTP API.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `POST` | `/api/train` | Ingest documents; streams progress frames ending in `[DONE]` |
//! | `POST` | `/api/chat` | Answer one conversational turn |
//! | `GET`  | `/health` | Health check (returns version) |
//!
//! `/api/train` responds with plain text frames: integer percents while
//! batches land, a serialized error body if the run fails, and the literal
//! `[DONE]` as the final frame. An empty `files` list is rejected with a
//! 400 JSON body before any stream (or side effect) exists.
//!
//! `/api/chat` responds `{"data": answer}` plus a `source` array of
//! supporting chunks when the answer was grounded in documents.
//!
//! # Error Contract
//!
//! Non-2xx responses carry `{"error": {"code": ..., "message": ...}}`.
//! Validation failures map to 400; upstream and configuration failures to
//! 500 with the upstream message surfaced verbatim.
//!
//! # CORS
//!
//! All origins, methods, and headers are permitted to support browser
//! clients.

use axum::{
    body::{Body, Bytes},
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio_stream::wrappers::UnboundedReceiverStream;
use tokio_stream::StreamExt;
use tower_http::cors::{Any, CorsLayer};

use crate::config::Config;
use crate::error::PipelineError;
use crate::index::VectorIndex;
use crate::ingest::{self, FileRef, IngestDeps, IngestRequest};
use crate::llm::GenerationModel;
use crate::models::{Credential, DocumentChunk, Message, Settings};
use crate::progress::ChannelReporter;
use crate::query::{answer_question, QueryDeps, QueryRequest};
use crate::storage::ObjectStorage;

/// Shared application state handed to every route handler.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub storage: Arc<dyn ObjectStorage>,
    pub index: Arc<dyn VectorIndex>,
    pub model: Arc<dyn GenerationModel>,
}

/// Build the application router. Exposed separately from [`run_server`]
/// so tests can serve it on an ephemeral port.
pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/api/train", post(handle_train))
        .route("/api/chat", post(handle_chat))
        .route("/health", get(handle_health))
        .layer(cors)
        .with_state(state)
}

/// Bind the configured address and serve until the process terminates.
pub async fn run_server(state: AppState) -> anyhow::Result<()> {
    let bind_addr = state.config.server.bind.clone();
    let app = router(state);

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    tracing::info!(addr = %bind_addr, "listening");
    axum::serve(listener, app).await?;
    Ok(())
}

// ============ Error response ============

/// Internal error type that converts into an HTTP response with the
/// standard error body.
struct AppError {
    status: StatusCode,
    code: &'static str,
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = serde_json::json!({
            "error": { "code": self.code, "message": self.message }
        });
        (self.status, Json(body)).into_response()
    }
}

fn bad_request(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::BAD_REQUEST,
        code: "validation_error",
        message: message.into(),
    }
}

impl From<PipelineError> for AppError {
    fn from(err: PipelineError) -> Self {
        let status = match &err {
            PipelineError::Validation(_) => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        AppError {
            status,
            code: err.code(),
            message: err.to_string(),
        }
    }
}

// ============ GET /health ============

#[derive(Serialize)]
struct HealthResponse {
    status: String,
    version: String,
}

async fn handle_health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

// ============ POST /api/train ============

#[derive(Deserialize)]
struct TrainBody {
    #[serde(default)]
    files: Vec<FileRef>,
    #[serde(default)]
    settings: TrainSettings,
    #[serde(default)]
    namespace: String,
    #[serde(default)]
    credential: Option<String>,
}

#[derive(Deserialize, Default)]
struct TrainSettings {
    #[serde(rename = "chunkSize")]
    chunk_size: Option<usize>,
}

async fn handle_train(
    State(state): State<AppState>,
    Json(body): Json<TrainBody>,
) -> Result<Response, AppError> {
    if body.files.is_empty() {
        return Err(bad_request("files must not be empty"));
    }

    let settings = Settings {
        chunk_size: body.settings.chunk_size.unwrap_or_else(|| Settings::default().chunk_size),
        ..Settings::default()
    };
    state.config.limits.check(&settings)?;
    if settings.chunk_size <= state.config.chunking.overlap {
        return Err(bad_request(format!(
            "chunkSize ({}) must be larger than the configured overlap ({})",
            settings.chunk_size, state.config.chunking.overlap
        )));
    }

    let request = IngestRequest {
        files: body.files,
        settings,
        namespace: body.namespace,
        credential: Credential::from_request(body.credential),
    };

    let (tx, rx) = tokio::sync::mpsc::unbounded_channel();
    let reporter = ChannelReporter::new(tx);

    let storage = state.storage.clone();
    let index = state.index.clone();
    let config = state.config.clone();
    tokio::spawn(async move {
        let deps = IngestDeps {
            storage: storage.as_ref(),
            index: index.as_ref(),
            limits: &config.limits,
            document_prefix: &config.storage.prefix,
            overlap: config.chunking.overlap,
        };
        // Failures are already on the stream as a serialized error frame
        // followed by the sentinel.
        let _ = ingest::run_with_completion(&deps, &request, &reporter).await;
    });

    let stream = UnboundedReceiverStream::new(rx)
        .map(|frame| Ok::<_, std::convert::Infallible>(Bytes::from(frame.as_wire())));

    Ok((
        [
            (header::CONTENT_TYPE, "text/event-stream"),
            (header::CACHE_CONTROL, "no-cache, no-transform"),
        ],
        Body::from_stream(stream),
    )
        .into_response())
}

// ============ POST /api/chat ============

#[derive(Deserialize)]
struct ChatBody {
    #[serde(default)]
    question: Option<String>,
    #[serde(default)]
    messages: Vec<Message>,
    #[serde(default)]
    credential: Option<String>,
    /// Client-selected model descriptor; accepted for wire compatibility,
    /// the served model comes from configuration.
    #[serde(default)]
    #[allow(dead_code)]
    model: Option<serde_json::Value>,
    #[serde(default)]
    prompt: Option<String>,
    #[serde(default)]
    namespace: String,
    #[serde(default)]
    settings: ChatSettings,
}

#[derive(Deserialize, Default)]
struct ChatSettings {
    #[serde(default)]
    temperature: Option<f32>,
    #[serde(rename = "maxTokenLength")]
    max_token_length: Option<u32>,
    #[serde(rename = "topP")]
    top_p: Option<f32>,
}

#[derive(Serialize)]
struct ChatResponse {
    data: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    source: Vec<DocumentChunk>,
}

async fn handle_chat(
    State(state): State<AppState>,
    Json(body): Json<ChatBody>,
) -> Result<Json<ChatResponse>, AppError> {
    let question = match body.question {
        Some(q) if !q.trim().is_empty() => q,
        _ => return Err(bad_request("No question in the request")),
    };

    let defaults = Settings::default();
    let settings = Settings {
        chunk_size: defaults.chunk_size,
        temperature: body.settings.temperature.unwrap_or(defaults.temperature),
        top_p: body.settings.top_p.unwrap_or(defaults.top_p),
        max_token_length: body
            .settings
            .max_token_length
            .unwrap_or(defaults.max_token_length),
    };
    state.config.limits.check(&settings)?;

    let request = QueryRequest {
        question,
        messages: body.messages,
        system_prompt: body.prompt,
        namespace: body.namespace,
        settings,
        credential: Credential::from_request(body.credential),
    };

    let response = answer_question(
        &QueryDeps {
            index: state.index.as_ref(),
            model: state.model.as_ref(),
        },
        &request,
    )
    .await?;

    Ok(Json(ChatResponse {
        data: response.data,
        source: response.source,
    }))
}
