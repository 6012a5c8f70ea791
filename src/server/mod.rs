//! HTTP API for the browser client.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `GET`  | `/health` | Health check (returns version) |
//! | `POST` | `/api/documents?name=` | Upload a text/PDF body into the shared corpus |
//! | `POST` | `/api/sessions` | Start a session |
//! | `DELETE` | `/api/sessions/{id}` | End a session and drop its state |
//! | `GET`/`POST` | `/api/sessions/{id}/chat` | Conversation history / ask a question |
//! | `GET`/`PUT` | `/api/sessions/{id}/draft` | Current draft / replace draft and options |
//! | `POST` | `/api/sessions/{id}/draft/suggestions` | Numbered continuation ideas |
//! | `POST` | `/api/sessions/{id}/draft/continue` | Append one continuation |
//! | `POST` | `/api/sessions/{id}/draft/rewrite` | Rewrite in the selected style |
//! | `POST` | `/api/sessions/{id}/draft/enhance` | Polish the draft |
//! | `POST` | `/api/improve` | Improvement analysis with text statistics |
//!
//! Errors use `{ "error": { "code": "...", "message": "..." } }`, including
//! malformed JSON bodies. For failed actions the message is the user-facing
//! text and the session is unchanged. Sessions idle for `SESSION_IDLE_SECS`
//! are dropped.

mod routes;
mod state;

use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::{rejection::JsonRejection, DefaultBodyLimit, FromRequest, Request},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{delete, get, post},
    Json, Router,
};
use serde::Serialize;
use tower_http::cors::{Any, CorsLayer};

use crate::assistant::Assistant;
use crate::config::Config;
use crate::error::{ActionError, IngestError, ParseError};

pub use state::AppState;

pub async fn run_server(config: &Config) -> anyhow::Result<()> {
    let assistant = Arc::new(Assistant::new(config).await?);
    let idle_ttl = Duration::from_secs(config.session_idle_secs);
    let state = AppState::new(assistant).with_idle_ttl(idle_ttl);
    state.spawn_idle_sweeper((idle_ttl / 4).max(Duration::from_secs(1)));
    let app = router(state);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    tracing::info!(addr = %config.bind_addr, "listening");
    axum::serve(listener, app).await?;

    Ok(())
}

pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // Leave headroom above the upload limit so oversize files reach the
    // parser and get a readable error instead of a bare 413.
    let body_limit = state.assistant().max_upload_bytes().saturating_mul(2);

    Router::new()
        .route("/health", get(routes::health))
        .route("/api/documents", post(routes::upload_document))
        .route("/api/improve", post(routes::improve))
        .route("/api/sessions", post(routes::create_session))
        .route("/api/sessions/{id}", delete(routes::end_session))
        .route(
            "/api/sessions/{id}/chat",
            get(routes::chat_history).post(routes::ask),
        )
        .route(
            "/api/sessions/{id}/draft",
            get(routes::get_draft).put(routes::update_draft),
        )
        .route("/api/sessions/{id}/draft/suggestions", post(routes::suggest))
        .route("/api/sessions/{id}/draft/continue", post(routes::continue_draft))
        .route("/api/sessions/{id}/draft/rewrite", post(routes::rewrite))
        .route("/api/sessions/{id}/draft/enhance", post(routes::enhance))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(cors)
        .with_state(state)
}

#[derive(Serialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Serialize)]
struct ErrorDetail {
    code: &'static str,
    message: String,
}

#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    code: &'static str,
    message: String,
}

impl ApiError {
    fn new(status: StatusCode, code: &'static str, message: impl Into<String>) -> Self {
        Self {
            status,
            code,
            message: message.into(),
        }
    }

    fn session_not_found(id: uuid::Uuid) -> Self {
        Self::new(StatusCode::NOT_FOUND, "not_found", format!("session {id} not found"))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: ErrorDetail {
                code: self.code,
                message: self.message,
            },
        };
        (self.status, Json(body)).into_response()
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::new(rejection.status(), "bad_request", rejection.body_text())
    }
}

/// `Json` whose rejection is reported in the API error format.
pub struct ApiJson<T>(pub T);

impl<T, S> FromRequest<S> for ApiJson<T>
where
    Json<T>: FromRequest<S, Rejection = JsonRejection>,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state).await?;
        Ok(Self(value))
    }
}

impl From<ActionError> for ApiError {
    fn from(err: ActionError) -> Self {
        if err.is_upstream() {
            Self::new(StatusCode::BAD_GATEWAY, "action_failed", err.to_string())
        } else {
            Self::new(StatusCode::BAD_REQUEST, "bad_request", err.to_string())
        }
    }
}

impl From<IngestError> for ApiError {
    fn from(err: IngestError) -> Self {
        match &err {
            IngestError::Parse(ParseError::Unsupported(_)) => {
                Self::new(StatusCode::UNSUPPORTED_MEDIA_TYPE, "parse_failed", err.to_string())
            }
            IngestError::Parse(ParseError::TooLarge { .. }) => {
                Self::new(StatusCode::PAYLOAD_TOO_LARGE, "parse_failed", err.to_string())
            }
            IngestError::Parse(_) => {
                Self::new(StatusCode::BAD_REQUEST, "parse_failed", err.to_string())
            }
            IngestError::Retrieval(_) => {
                Self::new(StatusCode::BAD_GATEWAY, "ingest_failed", err.to_string())
            }
        }
    }
}
