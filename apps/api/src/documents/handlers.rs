//! Axum route handlers for document intake and the document library.

use axum::{
    extract::{Multipart, State},
    Json,
};
use serde::Deserialize;

use crate::auth::AuthenticatedUser;
use crate::documents::{Document, DocumentPreview};
use crate::errors::AppError;
use crate::history::library::{build_library, LibraryDocument};
use crate::history::store;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct PasteRequest {
    pub text: String,
}

#[derive(Debug, Deserialize)]
pub struct PreviewRequest {
    pub document: Document,
}

/// POST /api/v1/documents/upload
///
/// Reads the multipart `file` field and returns it as a data-URI document.
pub async fn handle_upload(
    _user: AuthenticatedUser,
    mut multipart: Multipart,
) -> Result<Json<Document>, AppError> {
    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some("file") {
            continue;
        }
        let name = field.file_name().unwrap_or_default().to_string();
        let mime_type = field.content_type().map(str::to_string);
        let bytes = field.bytes().await?;
        let document = Document::from_upload(&name, mime_type.as_deref(), &bytes)?;
        return Ok(Json(document));
    }

    Err(AppError::Validation(
        "Multipart body must contain a 'file' field".to_string(),
    ))
}

/// POST /api/v1/documents/paste
pub async fn handle_paste(
    _user: AuthenticatedUser,
    Json(req): Json<PasteRequest>,
) -> Result<Json<Document>, AppError> {
    Ok(Json(Document::from_pasted_text(&req.text)?))
}

/// POST /api/v1/documents/preview
pub async fn handle_preview(
    _user: AuthenticatedUser,
    Json(req): Json<PreviewRequest>,
) -> Result<Json<DocumentPreview>, AppError> {
    // PDF extraction is CPU-bound.
    let preview = tokio::task::spawn_blocking(move || req.document.preview())
        .await
        .map_err(|e| AppError::Internal(e.into()))??;
    Ok(Json(preview))
}

/// GET /api/v1/documents
///
/// Every distinct document the user has analysed or compared.
pub async fn handle_library(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> Result<Json<Vec<LibraryDocument>>, AppError> {
    let history = store::list_for_user(&state.db, user.user_id).await?;
    Ok(Json(build_library(&history)))
}
