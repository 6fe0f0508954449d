use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::row::Row;
use uuid::Uuid;

use super::status::ReviewStatus;
use super::ParseEnumError;
use crate::db::PgRow;
use crate::store::StoreError;

/// MIME types accepted by the document upload path.
pub const ALLOWED_MIME_TYPES: &[&str] = &[
    "application/pdf",
    "application/msword",
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
    "application/vnd.ms-powerpoint",
    "application/vnd.openxmlformats-officedocument.presentationml.presentation",
    "text/plain",
    "image/jpeg",
    "image/png",
];

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentCategory {
    Competition,
    Project,
    Research,
    MeetingNotes,
    Other,
}

impl DocumentCategory {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Competition => "competition",
            Self::Project => "project",
            Self::Research => "research",
            Self::MeetingNotes => "meeting_notes",
            Self::Other => "other",
        }
    }
}

impl fmt::Display for DocumentCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DocumentCategory {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "competition" => Ok(Self::Competition),
            "project" => Ok(Self::Project),
            "research" => Ok(Self::Research),
            "meeting_notes" => Ok(Self::MeetingNotes),
            "other" => Ok(Self::Other),
            _ => Err(ParseEnumError::new("document category", s)),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    pub id: Uuid,
    pub user_id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub file_name: String,
    pub file_url: String,
    pub file_size: i64,
    pub file_type: String,
    pub category: DocumentCategory,
    pub status: ReviewStatus,
    pub submitted_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Document {
    pub fn from_row(row: &PgRow) -> Result<Self, StoreError> {
        let category: String = row.try_get("category")?;
        let status: String = row.try_get("status")?;

        Ok(Self {
            id: row.try_get("id")?,
            user_id: row.try_get("user_id")?,
            title: row.try_get("title")?,
            description: row.try_get("description")?,
            file_name: row.try_get("file_name")?,
            file_url: row.try_get("file_url")?,
            file_size: row.try_get("file_size")?,
            file_type: row.try_get("file_type")?,
            category: category.parse()?,
            status: status.parse()?,
            submitted_at: row.try_get("submitted_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }
}

#[derive(Debug, Clone)]
pub struct NewDocument {
    pub user_id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub file_name: String,
    pub file_url: String,
    pub file_size: i64,
    pub file_type: String,
    pub category: DocumentCategory,
}

/// A file received from the client, before it is pushed to object storage.
#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub file_name: String,
    pub content_type: String,
    /// Total bytes received; can exceed `bytes.len()` when an oversized body was drained.
    pub size: u64,
    pub bytes: Vec<u8>,
}

impl UploadedFile {
    pub fn new(file_name: impl Into<String>, content_type: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            file_name: file_name.into(),
            content_type: content_type.into(),
            size: bytes.len() as u64,
            bytes,
        }
    }
}

/// Metadata fields accompanying an upload.
#[derive(Debug, Clone, Default)]
pub struct UploadFields {
    pub title: String,
    pub description: Option<String>,
    pub category: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct DocumentListQuery {
    #[serde(default)]
    pub all: bool,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UpdateDocumentStatusRequest {
    #[serde(default)]
    pub status: String,
}
