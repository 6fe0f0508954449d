use axum::extract::multipart::{Field, MultipartError};
use axum::extract::{DefaultBodyLimit, Multipart, Path, Query, State};
use axum::http::StatusCode;
use axum::routing::{get, patch, post};
use axum::{Json, Router};
use uuid::Uuid;

use crate::auth::Actor;
use crate::error::ApiError;
use crate::extract::ApiJson;
use crate::models::document::{
    Document, DocumentListQuery, UpdateDocumentStatusRequest, UploadFields, UploadedFile,
};
use crate::services::documents::DocumentService;
use crate::state::AppState;

/// Headroom above the upload ceiling for multipart framing and text fields.
const MULTIPART_OVERHEAD: usize = 1024 * 1024;

/// The transport limit is set well above `max_upload_bytes` so an oversized file
/// reaches the service and is reported as a validation error instead of a 413.
pub fn router(max_upload_bytes: u64) -> Router<AppState> {
    let body_limit = usize::try_from(max_upload_bytes)
        .unwrap_or(usize::MAX / 4)
        .saturating_mul(2)
        .saturating_add(MULTIPART_OVERHEAD);

    Router::new()
        .route(
            "/documents",
            post(upload_document).layer(DefaultBodyLimit::max(body_limit)),
        )
        .route("/documents", get(list_documents))
        .route("/documents/{id}/status", patch(update_status))
}

/// A body cut off by the transport limit is reported like any other oversized file.
fn bad_multipart(documents: &DocumentService, err: MultipartError) -> ApiError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        return documents.size_limit_error();
    }
    ApiError::validation(format!("malformed multipart body: {}", err.body_text()))
}

/// Read a file field, keeping at most the upload ceiling but counting every byte.
async fn read_file(
    documents: &DocumentService,
    mut field: Field<'_>,
) -> Result<UploadedFile, ApiError> {
    let keep = documents.max_upload_bytes();
    let file_name = field.file_name().unwrap_or("upload").to_string();
    let content_type = field
        .content_type()
        .unwrap_or("application/octet-stream")
        .to_string();

    let mut size = 0u64;
    let mut bytes = Vec::new();
    while let Some(chunk) = field
        .chunk()
        .await
        .map_err(|e| bad_multipart(documents, e))?
    {
        size = size.saturating_add(chunk.len() as u64);
        if size <= keep {
            bytes.extend_from_slice(&chunk);
        }
    }
    if size > keep {
        bytes = Vec::new();
    }

    Ok(UploadedFile {
        file_name,
        content_type,
        size,
        bytes,
    })
}

async fn upload_document(
    State(state): State<AppState>,
    actor: Actor,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<Document>), ApiError> {
    let mut fields = UploadFields::default();
    let mut file = None;

    let documents = &state.documents;
    let bad = |e: MultipartError| bad_multipart(documents, e);

    while let Some(field) = multipart.next_field().await.map_err(bad)? {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "file" => file = Some(read_file(documents, field).await?),
            "title" => fields.title = field.text().await.map_err(bad)?,
            "description" => fields.description = Some(field.text().await.map_err(bad)?),
            "category" => fields.category = field.text().await.map_err(bad)?,
            other => tracing::debug!(field = other, "Ignoring unknown multipart field"),
        }
    }

    let document = documents.upload(&actor, fields, file).await?;
    Ok((StatusCode::CREATED, Json(document)))
}

async fn list_documents(
    State(state): State<AppState>,
    actor: Actor,
    Query(query): Query<DocumentListQuery>,
) -> Result<Json<Vec<Document>>, ApiError> {
    Ok(Json(state.documents.list(&actor, query.all).await?))
}

async fn update_status(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<Uuid>,
    ApiJson(req): ApiJson<UpdateDocumentStatusRequest>,
) -> Result<Json<Document>, ApiError> {
    Ok(Json(state.documents.update_status(&actor, id, &req.status).await?))
}
