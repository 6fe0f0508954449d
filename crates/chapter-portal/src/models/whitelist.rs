use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::row::Row;
use uuid::Uuid;

use crate::db::PgRow;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WhitelistedEmail {
    pub id: Uuid,
    pub email: String,
    pub created_by: Option<Uuid>,
    #[serde(rename = "added_at")]
    pub created_at: DateTime<Utc>,
}

impl WhitelistedEmail {
    pub fn from_row(row: &PgRow) -> Result<Self, sqlx::error::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            email: row.try_get("email")?,
            created_by: row.try_get("created_by")?,
            created_at: row.try_get("created_at")?,
        })
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AddWhitelistRequest {
    #[serde(default)]
    pub email: String,
}

/// Canonical form used for storage and uniqueness: trimmed and lowercased.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}
