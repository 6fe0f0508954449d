//! Generic document uploads, kept apart from the competition submission flow.

use std::sync::Arc;

use uuid::Uuid;

use crate::auth::Actor;
use crate::authz::{self, Tier};
use crate::error::ApiError;
use crate::models::document::{
    Document, DocumentCategory, NewDocument, UploadFields, UploadedFile, ALLOWED_MIME_TYPES,
};
use crate::models::non_blank;
use crate::models::status::ReviewStatus;
use crate::services::blob::{self, BlobClient};
use crate::store::PortalStore;

#[derive(Clone)]
pub struct DocumentService {
    store: Arc<dyn PortalStore>,
    blob: BlobClient,
    max_upload_bytes: u64,
}

fn mime_essence(content_type: &str) -> String {
    content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase()
}

fn size_label(bytes: u64) -> String {
    const MIB: u64 = 1024 * 1024;
    if bytes % MIB == 0 {
        format!("{} MiB", bytes / MIB)
    } else {
        format!("{bytes} bytes")
    }
}

impl DocumentService {
    pub fn new(store: Arc<dyn PortalStore>, blob: BlobClient, max_upload_bytes: u64) -> Self {
        Self {
            store,
            blob,
            max_upload_bytes,
        }
    }

    pub fn max_upload_bytes(&self) -> u64 {
        self.max_upload_bytes
    }

    pub fn size_limit_error(&self) -> ApiError {
        ApiError::validation(format!(
            "file exceeds the {} limit",
            size_label(self.max_upload_bytes)
        ))
    }

    /// Check the metadata and the file without touching blob storage.
    fn validate(
        &self,
        fields: &UploadFields,
        file: Option<&UploadedFile>,
    ) -> Result<(String, DocumentCategory, String), ApiError> {
        let title = fields.title.trim();
        if title.is_empty() {
            return Err(ApiError::validation("title is required"));
        }
        if fields.category.trim().is_empty() {
            return Err(ApiError::validation("category is required"));
        }
        let category: DocumentCategory = fields
            .category
            .parse()
            .map_err(|e: crate::models::ParseEnumError| ApiError::validation(e.to_string()))?;

        let file = file.ok_or_else(|| ApiError::validation("a file is required"))?;
        if file.size == 0 {
            return Err(ApiError::validation("file is empty"));
        }
        if file.size > self.max_upload_bytes {
            return Err(self.size_limit_error());
        }

        let mime = mime_essence(&file.content_type);
        if !ALLOWED_MIME_TYPES.contains(&mime.as_str()) {
            return Err(ApiError::validation(format!(
                "unsupported file type {mime:?}; allowed: PDF, Word, PowerPoint, text, JPEG, PNG"
            )));
        }

        Ok((title.to_string(), category, mime))
    }

    /// Validate, push the file to object storage, then record the reference.
    pub async fn upload(
        &self,
        actor: &Actor,
        fields: UploadFields,
        file: Option<UploadedFile>,
    ) -> Result<Document, ApiError> {
        let (title, category, file_type) = self.validate(&fields, file.as_ref())?;
        let Some(file) = file else {
            return Err(ApiError::validation("a file is required"));
        };

        let key = blob::object_key(actor.user_id, &file.file_name);
        let file_size = i64::try_from(file.size)
            .map_err(|_| ApiError::validation("file size out of range"))?;
        let file_url = self.blob.put_object(&key, &file_type, file.bytes).await?;

        let document = self
            .store
            .insert_document(NewDocument {
                user_id: actor.user_id,
                title,
                description: non_blank(fields.description.as_deref()),
                file_name: file.file_name,
                file_url,
                file_size,
                file_type,
                category,
            })
            .await?;

        tracing::info!(
            document_id = %document.id,
            user_id = %actor.user_id,
            file_size = document.file_size,
            file_type = %document.file_type,
            "Document uploaded"
        );
        Ok(document)
    }

    /// Own documents, or every document when `all` is set and the actor is a reviewer.
    pub async fn list(&self, actor: &Actor, all: bool) -> Result<Vec<Document>, ApiError> {
        let owner = if all {
            authz::require_role(actor, Tier::Review)?;
            None
        } else {
            Some(actor.user_id)
        };
        Ok(self.store.list_documents(owner).await?)
    }

    pub async fn update_status(
        &self,
        actor: &Actor,
        id: Uuid,
        status: &str,
    ) -> Result<Document, ApiError> {
        authz::require_role(actor, Tier::Review)?;

        let status: ReviewStatus = status.parse().map_err(|_| {
            ApiError::validation(format!(
                "status must be one of pending, under_review, approved, rejected (got {status:?})"
            ))
        })?;

        let document = self
            .store
            .update_document_status(id, status)
            .await?
            .ok_or(ApiError::NotFound)?;

        tracing::info!(document_id = %id, reviewer = %actor.user_id, %status, "Document status updated");
        Ok(document)
    }
}
