//! Axum route handlers for session history and the session operations that
//! merge AI output back into stored sessions.

use axum::{
    extract::{Path, Query, State},
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use chrono::Utc;
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::analysis::models::{AnalysisResult, RiskLevel};
use crate::auth::AuthenticatedUser;
use crate::calendar::{export_file_name, render_obligations};
use crate::documents::{Document, DocumentDownload};
use crate::errors::AppError;
use crate::history::library::{filter_messages, visible_suggestions};
use crate::history::models::{ChatMessage, ChatSession, CompareSession, HistoryItem};
use crate::history::store;
use crate::state::AppState;

/// RFC 5987 `attr-char`s stay literal in `filename*`; everything else is encoded.
const FILENAME_ENCODE_SET: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'!')
    .remove(b'#')
    .remove(b'$')
    .remove(b'&')
    .remove(b'+')
    .remove(b'-')
    .remove(b'.')
    .remove(b'^')
    .remove(b'_')
    .remove(b'`')
    .remove(b'|')
    .remove(b'~');

// ────────────────────────────────────────────────────────────────────────────
// Request / Response types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct CreateChatRequest {
    pub document: Document,
}

#[derive(Debug, Deserialize)]
pub struct CompareRequest {
    pub document_a: Option<Document>,
    pub document_b: Option<Document>,
}

#[derive(Debug, Deserialize)]
pub struct RiskLevelRequest {
    pub risk_level: RiskLevel,
}

#[derive(Debug, Deserialize)]
pub struct AskRequest {
    pub question: String,
}

#[derive(Debug, Deserialize)]
pub struct TranscriptQuery {
    pub q: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ClearHistoryResponse {
    pub deleted: u64,
}

#[derive(Debug, Serialize)]
pub struct TranscriptResponse {
    pub messages: Vec<ChatMessage>,
    pub suggested_questions: Option<Vec<String>>,
}

#[derive(Debug, Serialize)]
pub struct AskResponse {
    pub question: ChatMessage,
    pub answer: ChatMessage,
}

// ────────────────────────────────────────────────────────────────────────────
// History
// ────────────────────────────────────────────────────────────────────────────

/// GET /api/v1/history
pub async fn handle_list_history(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> Result<Json<Vec<HistoryItem>>, AppError> {
    Ok(Json(store::list_for_user(&state.db, user.user_id).await?))
}

/// DELETE /api/v1/history
pub async fn handle_clear_history(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> Result<Json<ClearHistoryResponse>, AppError> {
    let deleted = store::clear(&state.db, user.user_id).await?;
    Ok(Json(ClearHistoryResponse { deleted }))
}

/// GET /api/v1/history/:id
pub async fn handle_get_history_item(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> Result<Json<HistoryItem>, AppError> {
    Ok(Json(store::get(&state.db, user.user_id, id).await?))
}

/// DELETE /api/v1/history/:id
pub async fn handle_delete_history_item(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    store::delete(&state.db, user.user_id, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// ────────────────────────────────────────────────────────────────────────────
// Chat sessions
// ────────────────────────────────────────────────────────────────────────────

/// POST /api/v1/sessions/chat
///
/// Starts a chat session for a document. Analysis runs separately.
pub async fn handle_create_chat(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Json(req): Json<CreateChatRequest>,
) -> Result<(StatusCode, Json<ChatSession>), AppError> {
    validate_document(&req.document)?;
    let session = store::insert_chat(&state.db, user.user_id, &req.document).await?;
    Ok((StatusCode::CREATED, Json(session)))
}

/// POST /api/v1/sessions/:id/demystify
///
/// Runs the full analysis on the session's document and stores the result.
/// A failed analysis leaves the session untouched.
pub async fn handle_demystify(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> Result<Json<AnalysisResult>, AppError> {
    let session = store::get_chat(&state.db, user.user_id, id).await?;

    info!("Analyzing document '{}' for session {id}", session.document.name);
    let analysis = state.analyst.demystify(&session.document).await?;

    store::set_analysis(&state.db, user.user_id, id, &analysis).await?;
    Ok(Json(analysis))
}

/// PATCH /api/v1/sessions/:id/risks/:index
pub async fn handle_update_risk_level(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path((id, index)): Path<(Uuid, usize)>,
    Json(req): Json<RiskLevelRequest>,
) -> Result<Json<AnalysisResult>, AppError> {
    let analysis =
        store::update_risk_level(&state.db, user.user_id, id, index, req.risk_level).await?;
    Ok(Json(analysis))
}

/// GET /api/v1/sessions/:id/messages?q=
pub async fn handle_get_messages(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<Uuid>,
    Query(query): Query<TranscriptQuery>,
) -> Result<Json<TranscriptResponse>, AppError> {
    let session = store::get_chat(&state.db, user.user_id, id).await?;
    let q = query.q.as_deref();

    Ok(Json(TranscriptResponse {
        messages: filter_messages(&session.messages, q),
        suggested_questions: visible_suggestions(&session, q),
    }))
}

/// POST /api/v1/sessions/:id/messages
///
/// Asks a follow-up question. Both the question and the answer are stored
/// only once the answer arrives.
pub async fn handle_ask(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<Uuid>,
    Json(req): Json<AskRequest>,
) -> Result<Json<AskResponse>, AppError> {
    let question = req.question.trim();
    if question.is_empty() {
        return Err(AppError::Validation("question cannot be empty".to_string()));
    }

    let session = store::get_chat(&state.db, user.user_id, id).await?;
    let analysis = session.analysis.as_ref().ok_or_else(|| {
        AppError::UnprocessableEntity(
            "Analyze the document before asking questions about it".to_string(),
        )
    })?;

    let answer = state
        .analyst
        .ask(question, &analysis.text, &session.messages)
        .await?;

    let question = ChatMessage::user(question);
    let answer = ChatMessage::ai(answer);
    store::append_messages(
        &state.db,
        user.user_id,
        id,
        &[question.clone(), answer.clone()],
    )
    .await?;

    Ok(Json(AskResponse { question, answer }))
}

/// GET /api/v1/sessions/:id/obligations.ics
pub async fn handle_export_obligations(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> Result<Response, AppError> {
    let session = store::get_chat(&state.db, user.user_id, id).await?;
    let analysis = session.analysis.as_ref().ok_or_else(|| {
        AppError::UnprocessableEntity(format!("Session {id} has not been analyzed yet"))
    })?;

    let ics = render_obligations(&session.document.name, &analysis.obligations, Utc::now())?;
    let file_name = export_file_name(session.document.stem());

    Ok(attachment(
        "text/calendar; charset=utf-8",
        &file_name,
        ics.into_bytes(),
    ))
}

// ────────────────────────────────────────────────────────────────────────────
// Compare sessions
// ────────────────────────────────────────────────────────────────────────────

/// POST /api/v1/sessions/compare
///
/// Compares two documents and records the result as a new session.
pub async fn handle_compare(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Json(req): Json<CompareRequest>,
) -> Result<(StatusCode, Json<CompareSession>), AppError> {
    let (Some(document_a), Some(document_b)) = (req.document_a, req.document_b) else {
        return Err(AppError::Validation(
            "Please upload both documents before comparing.".to_string(),
        ));
    };
    validate_document(&document_a)?;
    validate_document(&document_b)?;

    info!(
        "Comparing '{}' with '{}' for user {}",
        document_a.name, document_b.name, user.user_id
    );
    let comparison = state.analyst.compare(&document_a, &document_b).await?;

    let session = store::insert_compare(
        &state.db,
        user.user_id,
        &document_a,
        &document_b,
        Some(&comparison),
    )
    .await?;
    Ok((StatusCode::CREATED, Json(session)))
}

// ────────────────────────────────────────────────────────────────────────────
// Downloads
// ────────────────────────────────────────────────────────────────────────────

/// GET /api/v1/sessions/:id/documents/:slot/download
///
/// `slot` is `document` for chat sessions, `a` or `b` for compare sessions.
pub async fn handle_download_document(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path((id, slot)): Path<(Uuid, String)>,
) -> Result<Response, AppError> {
    let item = store::get(&state.db, user.user_id, id).await?;
    let document = select_document(&item, &slot)?;
    let DocumentDownload {
        file_name,
        mime_type,
        bytes,
    } = document.download()?;

    Ok(attachment(&mime_type, &file_name, bytes))
}

fn select_document<'a>(item: &'a HistoryItem, slot: &str) -> Result<&'a Document, AppError> {
    match (item, slot) {
        (HistoryItem::Chat(chat), "document") => Ok(&chat.document),
        (HistoryItem::Compare(compare), "a") => Ok(&compare.document_a),
        (HistoryItem::Compare(compare), "b") => Ok(&compare.document_b),
        _ => Err(AppError::NotFound(format!(
            "Session {} has no document '{slot}'",
            item.id()
        ))),
    }
}

fn validate_document(document: &Document) -> Result<(), AppError> {
    if document.name.trim().is_empty() {
        return Err(AppError::Validation("document name cannot be empty".to_string()));
    }
    if document.content.trim().is_empty() {
        return Err(AppError::Validation(format!(
            "document '{}' has no content",
            document.name
        )));
    }
    document.data_uri()?;
    Ok(())
}

/// `Content-Disposition` with an ASCII `filename` fallback and the exact
/// UTF-8 name in `filename*` (RFC 6266).
fn content_disposition(file_name: &str) -> HeaderValue {
    let fallback: String = file_name
        .chars()
        .map(|c| {
            if c == '"' || c == '\\' || !c.is_ascii() || c.is_ascii_control() {
                '_'
            } else {
                c
            }
        })
        .collect();
    let encoded = utf8_percent_encode(file_name, FILENAME_ENCODE_SET);
    HeaderValue::from_str(&format!(
        "attachment; filename=\"{fallback}\"; filename*=UTF-8''{encoded}"
    ))
    .unwrap_or_else(|_| HeaderValue::from_static("attachment"))
}

fn attachment(content_type: &str, file_name: &str, bytes: Vec<u8>) -> Response {
    let disposition = content_disposition(file_name);
    let content_type = HeaderValue::from_str(content_type)
        .unwrap_or_else(|_| HeaderValue::from_static("application/octet-stream"));

    (
        [
            (header::CONTENT_TYPE, content_type),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        bytes,
    )
        .into_response()
}
