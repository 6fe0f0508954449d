//! Persistence seam for the portal's five tables.
//!
//! Services only see [`PortalStore`]; `PgStore` backs production and
//! `InMemoryStore` backs tests and database-less local runs.

mod memory;
mod postgres;

pub use memory::InMemoryStore;
pub use postgres::PgStore;

use async_trait::async_trait;
use uuid::Uuid;

use crate::models::content::{ContentSection, DefaultSection, SectionUpdate};
use crate::models::document::{Document, NewDocument};
use crate::models::profile::{NewProfile, Profile, Role};
use crate::models::status::ReviewStatus;
use crate::models::submission::{
    NewSubmission, StatusChange, StatusChangeOutcome, Submission, SubmissionWithSubmitter,
};
use crate::models::whitelist::WhitelistedEmail;
use crate::models::ParseEnumError;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::error::Error),
    #[error("duplicate {0}")]
    UniqueViolation(&'static str),
    #[error("{entity} {id} does not exist")]
    MissingRow { entity: &'static str, id: Uuid },
    #[error("corrupt row: {0}")]
    Corrupt(String),
}

impl From<ParseEnumError> for StoreError {
    fn from(err: ParseEnumError) -> Self {
        StoreError::Corrupt(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, StoreError>;

#[async_trait]
pub trait PortalStore: Send + Sync {
    async fn ping(&self) -> Result<()>;

    async fn get_profile(&self, id: Uuid) -> Result<Option<Profile>>;
    /// Fails with `UniqueViolation` when the identity already has a profile.
    async fn insert_profile(&self, profile: NewProfile) -> Result<Profile>;
    async fn list_profiles(&self) -> Result<Vec<Profile>>;
    async fn set_role(&self, id: Uuid, role: Role) -> Result<Option<Profile>>;

    async fn list_whitelist(&self) -> Result<Vec<WhitelistedEmail>>;
    async fn find_whitelisted(&self, email: &str) -> Result<Option<WhitelistedEmail>>;
    /// Fails with `UniqueViolation` when the (already normalized) email exists.
    async fn insert_whitelist(&self, email: &str, created_by: Uuid) -> Result<WhitelistedEmail>;
    async fn delete_whitelist(&self, id: Uuid) -> Result<bool>;

    /// Inserts with status `pending`.
    async fn insert_submission(&self, submission: NewSubmission) -> Result<Submission>;
    async fn get_submission(&self, id: Uuid) -> Result<Option<Submission>>;
    /// Newest first.
    async fn list_submissions_for_owner(&self, user_id: Uuid) -> Result<Vec<Submission>>;
    /// Newest first, joined with the submitter's profile when one exists.
    async fn list_submissions_with_submitters(&self) -> Result<Vec<SubmissionWithSubmitter>>;
    async fn update_submission_status(
        &self,
        id: Uuid,
        change: StatusChange,
    ) -> Result<StatusChangeOutcome>;

    /// Inserts with status `pending`.
    async fn insert_document(&self, document: NewDocument) -> Result<Document>;
    /// Newest first; `owner` restricts to one submitter.
    async fn list_documents(&self, owner: Option<Uuid>) -> Result<Vec<Document>>;
    async fn update_document_status(
        &self,
        id: Uuid,
        status: ReviewStatus,
    ) -> Result<Option<Document>>;

    /// Active sections ordered by `order_index`.
    async fn list_active_sections(&self) -> Result<Vec<ContentSection>>;
    async fn get_active_section(&self, key: &str) -> Result<Option<ContentSection>>;
    /// Applies every update or none. An unknown id aborts the batch with `MissingRow`.
    async fn update_sections(&self, updates: &[SectionUpdate]) -> Result<Vec<ContentSection>>;
    /// Inserts sections whose key is not present yet; returns how many were added.
    async fn seed_sections(&self, sections: &[DefaultSection]) -> Result<u64>;
}
