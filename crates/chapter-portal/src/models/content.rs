use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::row::Row;
use uuid::Uuid;

use crate::db::PgRow;

/// Built-in copy for a well-known section key.
#[derive(Debug, Clone, Copy)]
pub struct DefaultSection {
    pub key: &'static str,
    pub title: &'static str,
    pub content: &'static str,
    pub order_index: i32,
}

/// Pre-seeded sections, and the fallback copy shown when a key has no active row.
pub const DEFAULT_SECTIONS: &[DefaultSection] = &[
    DefaultSection {
        key: "hero",
        title: "Build. Compete. Lead.",
        content: "Our chapter brings students together to design, code, and compete in technology and engineering events.",
        order_index: 0,
    },
    DefaultSection {
        key: "about",
        title: "About Us",
        content: "We are a student-run chapter that prepares members for regional, state, and national competitions.",
        order_index: 1,
    },
    DefaultSection {
        key: "mission",
        title: "Our Mission",
        content: "To give every member hands-on experience, mentorship, and a place to grow as a leader.",
        order_index: 2,
    },
    DefaultSection {
        key: "contact_email",
        title: "Contact",
        content: "chapter@example.org",
        order_index: 3,
    },
];

pub fn default_section(key: &str) -> Option<&'static DefaultSection> {
    DEFAULT_SECTIONS.iter().find(|s| s.key == key)
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContentSection {
    pub id: Uuid,
    pub section_key: String,
    pub title: String,
    pub content: String,
    pub order_index: i32,
    pub is_active: bool,
    pub updated_at: DateTime<Utc>,
}

impl ContentSection {
    pub fn from_row(row: &PgRow) -> Result<Self, sqlx::error::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            section_key: row.try_get("section_key")?,
            title: row.try_get("title")?,
            content: row.try_get("content")?,
            order_index: row.try_get("order_index")?,
            is_active: row.try_get("is_active")?,
            updated_at: row.try_get("updated_at")?,
        })
    }
}

/// A single section as rendered by the public pages.
#[derive(Debug, Clone, Serialize)]
pub struct SectionView {
    /// `None` when the copy comes from the built-in default.
    pub id: Option<Uuid>,
    pub section_key: String,
    pub title: String,
    pub content: String,
    pub order_index: i32,
    pub is_default: bool,
}

impl From<ContentSection> for SectionView {
    fn from(section: ContentSection) -> Self {
        Self {
            id: Some(section.id),
            section_key: section.section_key,
            title: section.title,
            content: section.content,
            order_index: section.order_index,
            is_default: false,
        }
    }
}

impl From<&DefaultSection> for SectionView {
    fn from(section: &DefaultSection) -> Self {
        Self {
            id: None,
            section_key: section.key.to_string(),
            title: section.title.to_string(),
            content: section.content.to_string(),
            order_index: section.order_index,
            is_default: true,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SectionUpdate {
    pub id: Uuid,
    pub title: String,
    pub content: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UpdateSectionsRequest {
    pub updates: Vec<SectionUpdate>,
}
