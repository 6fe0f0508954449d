use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::row::Row;
use uuid::Uuid;

use super::profile::SchoolYear;
use super::status::ReviewStatus;
use super::ParseEnumError;
use crate::db::PgRow;
use crate::store::StoreError;

/// Display label for submissions without a group.
pub const UNGROUPED_LABEL: &str = "Ungrouped";

/// Competitions a chapter member can enter.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Category {
    Robotics,
    Coding,
    #[serde(rename = "Engineering Design")]
    EngineeringDesign,
    #[serde(rename = "Video Game Design")]
    VideoGameDesign,
    Webmaster,
    #[serde(rename = "Data Science")]
    DataScience,
    #[serde(rename = "Digital Photography")]
    DigitalPhotography,
    Other,
}

impl Category {
    pub const ALL: [Category; 8] = [
        Self::Robotics,
        Self::Coding,
        Self::EngineeringDesign,
        Self::VideoGameDesign,
        Self::Webmaster,
        Self::DataScience,
        Self::DigitalPhotography,
        Self::Other,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Robotics => "Robotics",
            Self::Coding => "Coding",
            Self::EngineeringDesign => "Engineering Design",
            Self::VideoGameDesign => "Video Game Design",
            Self::Webmaster => "Webmaster",
            Self::DataScience => "Data Science",
            Self::DigitalPhotography => "Digital Photography",
            Self::Other => "Other",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        Self::ALL
            .into_iter()
            .find(|c| c.as_str().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| ParseEnumError::new("category", s))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Submission {
    pub id: Uuid,
    pub user_id: Uuid,
    pub title: String,
    pub category: Category,
    pub description: String,
    pub submission_group: Option<String>,
    pub check_in_date: Option<NaiveDate>,
    pub file_url: String,
    pub file_name: String,
    pub status: ReviewStatus,
    pub feedback: Option<String>,
    pub revision: i64,
    pub submitted_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Submission {
    pub fn from_row(row: &PgRow) -> Result<Self, StoreError> {
        let category: String = row.try_get("category")?;
        let status: String = row.try_get("status")?;

        Ok(Self {
            id: row.try_get("id")?,
            user_id: row.try_get("user_id")?,
            title: row.try_get("title")?,
            category: category.parse()?,
            description: row.try_get("description")?,
            submission_group: row.try_get("submission_group")?,
            check_in_date: row.try_get("check_in_date")?,
            file_url: row.try_get("file_url")?,
            file_name: row.try_get("file_name")?,
            status: status.parse()?,
            feedback: row.try_get("feedback")?,
            revision: row.try_get("revision")?,
            submitted_at: row.try_get("submitted_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }

    /// Label used when partitioning submissions for display.
    pub fn group_label(&self) -> &str {
        self.submission_group.as_deref().unwrap_or(UNGROUPED_LABEL)
    }
}

/// Who submitted an entry, as shown in the review table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmitterSummary {
    pub full_name: String,
    pub email: String,
    pub school_year: Option<SchoolYear>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmissionWithSubmitter {
    #[serde(flatten)]
    pub submission: Submission,
    /// Absent when the submitter has not created a profile.
    pub submitter: Option<SubmitterSummary>,
}

impl SubmissionWithSubmitter {
    pub fn from_row(row: &PgRow) -> Result<Self, StoreError> {
        let submission = Submission::from_row(row)?;
        let full_name: Option<String> = row.try_get("submitter_name")?;
        let submitter = match full_name {
            Some(full_name) => {
                let school_year: Option<String> = row.try_get("submitter_school_year")?;
                Some(SubmitterSummary {
                    full_name,
                    email: row.try_get("submitter_email")?,
                    school_year: school_year.as_deref().map(SchoolYear::from_str).transpose()?,
                })
            }
            None => None,
        };
        Ok(Self {
            submission,
            submitter,
        })
    }
}

/// Validated input for a new submission. Status is not settable here.
#[derive(Debug, Clone)]
pub struct NewSubmission {
    pub user_id: Uuid,
    pub title: String,
    pub category: Category,
    pub description: String,
    pub submission_group: Option<String>,
    pub check_in_date: Option<NaiveDate>,
    pub file_url: String,
    pub file_name: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreateSubmissionRequest {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub description: String,
    pub submission_group: Option<String>,
    pub check_in_date: Option<NaiveDate>,
    #[serde(default)]
    pub file_url: String,
    pub file_name: Option<String>,
    /// Accepted for compatibility and ignored: new submissions always start pending.
    pub status: Option<serde_json::Value>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UpdateStatusRequest {
    #[serde(default)]
    pub status: String,
    pub feedback: Option<String>,
    pub expected_revision: Option<i64>,
}

/// Validated status change handed to the store.
#[derive(Debug, Clone)]
pub struct StatusChange {
    pub status: ReviewStatus,
    pub feedback: Option<String>,
    pub expected_revision: Option<i64>,
}

/// Result of a guarded status update.
#[derive(Debug, Clone)]
pub enum StatusChangeOutcome {
    Updated(Submission),
    NotFound,
    RevisionMismatch { current: i64 },
}

#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    pub sort_by: Option<String>,
    pub sort_order: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SubmissionGroup {
    pub label: String,
    pub submissions: Vec<SubmissionWithSubmitter>,
}
