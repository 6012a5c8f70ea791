use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    http::{header, HeaderMap, StatusCode},
    Json,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{ApiError, ApiJson, AppState};
use crate::assistant::IngestReport;
use crate::prompt::{ContinuationStyle, ImprovementFocus};
use crate::retrieval::Passage;
use crate::session::{DraftPhase, DraftSession, Improvement, Suggestions, Turn};

#[derive(Serialize)]
pub struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

// ============ Documents ============

#[derive(Deserialize)]
pub struct UploadParams {
    name: Option<String>,
}

#[derive(Serialize)]
pub struct UploadResponse {
    #[serde(flatten)]
    report: IngestReport,
    message: String,
}

pub async fn upload_document(
    State(state): State<AppState>,
    Query(params): Query<UploadParams>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<UploadResponse>, ApiError> {
    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();
    let name = params.name.unwrap_or_else(|| "upload".to_string());

    let report = state
        .assistant()
        .ingest_upload(&name, &body, content_type)
        .await?;
    let message = report.message();
    Ok(Json(UploadResponse { report, message }))
}

// ============ Sessions ============

#[derive(Serialize)]
pub struct SessionCreated {
    session_id: Uuid,
}

pub async fn create_session(State(state): State<AppState>) -> (StatusCode, Json<SessionCreated>) {
    let session_id = state.create_session().await;
    (StatusCode::CREATED, Json(SessionCreated { session_id }))
}

pub async fn end_session(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    if state.end_session(id).await {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::session_not_found(id))
    }
}

// ============ Document chat ============

#[derive(Serialize)]
pub struct ChatHistory {
    history: Vec<Turn>,
}

#[derive(Deserialize)]
pub struct AskRequest {
    query: String,
}

#[derive(Serialize)]
pub struct AskResponse {
    answer: String,
    sources: Vec<Passage>,
    history: Vec<Turn>,
}

pub async fn chat_history(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ChatHistory>, ApiError> {
    let session = state.session(id).await.ok_or_else(|| ApiError::session_not_found(id))?;
    let session = session.lock().await;
    Ok(Json(ChatHistory {
        history: session.chat.history().to_vec(),
    }))
}

pub async fn ask(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    ApiJson(request): ApiJson<AskRequest>,
) -> Result<Json<AskResponse>, ApiError> {
    let session = state.session(id).await.ok_or_else(|| ApiError::session_not_found(id))?;
    let mut session = session.lock().await;
    let answer = state.assistant().ask(&mut session.chat, &request.query).await?;
    Ok(Json(AskResponse {
        answer: answer.text,
        sources: answer.sources,
        history: session.chat.history().to_vec(),
    }))
}

// ============ Drafting ============

#[derive(Serialize)]
pub struct DraftView {
    text: String,
    style: ContinuationStyle,
    count: usize,
    phase: DraftPhase,
}

impl From<&DraftSession> for DraftView {
    fn from(draft: &DraftSession) -> Self {
        Self {
            text: draft.text().to_string(),
            style: draft.style(),
            count: draft.count(),
            phase: draft.phase(),
        }
    }
}

#[derive(Deserialize)]
pub struct DraftUpdate {
    text: Option<String>,
    style: Option<ContinuationStyle>,
    count: Option<usize>,
}

pub async fn get_draft(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<DraftView>, ApiError> {
    let session = state.session(id).await.ok_or_else(|| ApiError::session_not_found(id))?;
    let session = session.lock().await;
    Ok(Json(DraftView::from(&session.draft)))
}

pub async fn update_draft(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    ApiJson(update): ApiJson<DraftUpdate>,
) -> Result<Json<DraftView>, ApiError> {
    let session = state.session(id).await.ok_or_else(|| ApiError::session_not_found(id))?;
    let mut session = session.lock().await;
    if let Some(text) = update.text {
        session.draft.set_text(text);
    }
    if let Some(style) = update.style {
        session.draft.set_style(style);
    }
    if let Some(count) = update.count {
        session.draft.set_count(count);
    }
    Ok(Json(DraftView::from(&session.draft)))
}

pub async fn suggest(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Suggestions>, ApiError> {
    let session = state.session(id).await.ok_or_else(|| ApiError::session_not_found(id))?;
    let session = session.lock().await;
    let suggestions = state.assistant().suggest(&session.draft).await?;
    Ok(Json(suggestions))
}

pub async fn continue_draft(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<DraftView>, ApiError> {
    let session = state.session(id).await.ok_or_else(|| ApiError::session_not_found(id))?;
    let mut session = session.lock().await;
    state.assistant().continue_draft(&mut session.draft).await?;
    Ok(Json(DraftView::from(&session.draft)))
}

pub async fn rewrite(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<DraftView>, ApiError> {
    let session = state.session(id).await.ok_or_else(|| ApiError::session_not_found(id))?;
    let mut session = session.lock().await;
    state.assistant().rewrite(&mut session.draft).await?;
    Ok(Json(DraftView::from(&session.draft)))
}

pub async fn enhance(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<DraftView>, ApiError> {
    let session = state.session(id).await.ok_or_else(|| ApiError::session_not_found(id))?;
    let mut session = session.lock().await;
    state.assistant().enhance(&mut session.draft).await?;
    Ok(Json(DraftView::from(&session.draft)))
}

// ============ Improvements ============

#[derive(Deserialize)]
pub struct ImproveRequest {
    text: String,
    #[serde(default)]
    focus: ImprovementFocus,
}

pub async fn improve(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<ImproveRequest>,
) -> Result<Json<Improvement>, ApiError> {
    let improvement = state
        .assistant()
        .improve(&request.text, request.focus)
        .await?;
    Ok(Json(improvement))
}
