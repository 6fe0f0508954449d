use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{PortalStore, Result, StoreError};
use crate::models::content::{ContentSection, DefaultSection, SectionUpdate};
use crate::models::document::{Document, NewDocument};
use crate::models::profile::{NewProfile, Profile, Role};
use crate::models::status::ReviewStatus;
use crate::models::submission::{
    NewSubmission, StatusChange, StatusChangeOutcome, Submission, SubmissionWithSubmitter,
    SubmitterSummary,
};
use crate::models::whitelist::WhitelistedEmail;

#[derive(Default)]
struct Tables {
    profiles: HashMap<Uuid, Profile>,
    whitelist: Vec<WhitelistedEmail>,
    // Kept in insertion order; listings reverse it so ties on the timestamp
    // still come back newest first.
    submissions: Vec<Submission>,
    documents: Vec<Document>,
    sections: Vec<ContentSection>,
}

/// Process-local store with the same contract as the Postgres one.
#[derive(Clone, Default)]
pub struct InMemoryStore {
    inner: Arc<RwLock<Tables>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn newest_first<T, F>(rows: &[T], submitted_at: F) -> Vec<T>
where
    T: Clone,
    F: Fn(&T) -> chrono::DateTime<Utc>,
{
    let mut out: Vec<T> = rows.iter().rev().cloned().collect();
    out.sort_by(|a, b| submitted_at(b).cmp(&submitted_at(a)));
    out
}

#[async_trait]
impl PortalStore for InMemoryStore {
    async fn ping(&self) -> Result<()> {
        Ok(())
    }

    async fn get_profile(&self, id: Uuid) -> Result<Option<Profile>> {
        let tables = self.inner.read().await;
        Ok(tables.profiles.get(&id).cloned())
    }

    async fn insert_profile(&self, profile: NewProfile) -> Result<Profile> {
        let mut tables = self.inner.write().await;
        if tables.profiles.contains_key(&profile.id) {
            return Err(StoreError::UniqueViolation("profile"));
        }

        let now = Utc::now();
        let profile = Profile {
            id: profile.id,
            email: profile.email,
            full_name: profile.full_name,
            school_year: profile.school_year,
            role: profile.role,
            created_at: now,
            updated_at: now,
        };
        tables.profiles.insert(profile.id, profile.clone());
        Ok(profile)
    }

    async fn list_profiles(&self) -> Result<Vec<Profile>> {
        let tables = self.inner.read().await;
        let mut profiles: Vec<Profile> = tables.profiles.values().cloned().collect();
        profiles.sort_by(|a, b| {
            a.full_name
                .cmp(&b.full_name)
                .then_with(|| a.email.cmp(&b.email))
        });
        Ok(profiles)
    }

    async fn set_role(&self, id: Uuid, role: Role) -> Result<Option<Profile>> {
        let mut tables = self.inner.write().await;
        Ok(tables.profiles.get_mut(&id).map(|profile| {
            profile.role = role;
            profile.updated_at = Utc::now();
            profile.clone()
        }))
    }

    async fn list_whitelist(&self) -> Result<Vec<WhitelistedEmail>> {
        let tables = self.inner.read().await;
        Ok(newest_first(&tables.whitelist, |w| w.created_at))
    }

    async fn find_whitelisted(&self, email: &str) -> Result<Option<WhitelistedEmail>> {
        let tables = self.inner.read().await;
        Ok(tables.whitelist.iter().find(|w| w.email == email).cloned())
    }

    async fn insert_whitelist(&self, email: &str, created_by: Uuid) -> Result<WhitelistedEmail> {
        let mut tables = self.inner.write().await;
        if tables.whitelist.iter().any(|w| w.email == email) {
            return Err(StoreError::UniqueViolation("whitelisted email"));
        }

        let entry = WhitelistedEmail {
            id: Uuid::new_v4(),
            email: email.to_string(),
            created_by: Some(created_by),
            created_at: Utc::now(),
        };
        tables.whitelist.push(entry.clone());
        Ok(entry)
    }

    async fn delete_whitelist(&self, id: Uuid) -> Result<bool> {
        let mut tables = self.inner.write().await;
        let before = tables.whitelist.len();
        tables.whitelist.retain(|w| w.id != id);
        Ok(tables.whitelist.len() != before)
    }

    async fn insert_submission(&self, submission: NewSubmission) -> Result<Submission> {
        let now = Utc::now();
        let submission = Submission {
            id: Uuid::new_v4(),
            user_id: submission.user_id,
            title: submission.title,
            category: submission.category,
            description: submission.description,
            submission_group: submission.submission_group,
            check_in_date: submission.check_in_date,
            file_url: submission.file_url,
            file_name: submission.file_name,
            status: ReviewStatus::Pending,
            feedback: None,
            revision: 0,
            submitted_at: now,
            updated_at: now,
        };

        let mut tables = self.inner.write().await;
        tables.submissions.push(submission.clone());
        Ok(submission)
    }

    async fn get_submission(&self, id: Uuid) -> Result<Option<Submission>> {
        let tables = self.inner.read().await;
        Ok(tables.submissions.iter().find(|s| s.id == id).cloned())
    }

    async fn list_submissions_for_owner(&self, user_id: Uuid) -> Result<Vec<Submission>> {
        let tables = self.inner.read().await;
        let owned: Vec<Submission> = tables
            .submissions
            .iter()
            .filter(|s| s.user_id == user_id)
            .cloned()
            .collect();
        Ok(newest_first(&owned, |s| s.submitted_at))
    }

    async fn list_submissions_with_submitters(&self) -> Result<Vec<SubmissionWithSubmitter>> {
        let tables = self.inner.read().await;
        Ok(newest_first(&tables.submissions, |s| s.submitted_at)
            .into_iter()
            .map(|submission| {
                let submitter = tables.profiles.get(&submission.user_id).map(|p| SubmitterSummary {
                    full_name: p.full_name.clone(),
                    email: p.email.clone(),
                    school_year: p.school_year,
                });
                SubmissionWithSubmitter {
                    submission,
                    submitter,
                }
            })
            .collect())
    }

    async fn update_submission_status(
        &self,
        id: Uuid,
        change: StatusChange,
    ) -> Result<StatusChangeOutcome> {
        let mut tables = self.inner.write().await;
        let Some(submission) = tables.submissions.iter_mut().find(|s| s.id == id) else {
            return Ok(StatusChangeOutcome::NotFound);
        };

        if let Some(expected) = change.expected_revision {
            if expected != submission.revision {
                return Ok(StatusChangeOutcome::RevisionMismatch {
                    current: submission.revision,
                });
            }
        }

        submission.status = change.status;
        if let Some(feedback) = change.feedback {
            submission.feedback = Some(feedback);
        }
        submission.revision += 1;
        submission.updated_at = Utc::now();
        Ok(StatusChangeOutcome::Updated(submission.clone()))
    }

    async fn insert_document(&self, document: NewDocument) -> Result<Document> {
        let now = Utc::now();
        let document = Document {
            id: Uuid::new_v4(),
            user_id: document.user_id,
            title: document.title,
            description: document.description,
            file_name: document.file_name,
            file_url: document.file_url,
            file_size: document.file_size,
            file_type: document.file_type,
            category: document.category,
            status: ReviewStatus::Pending,
            submitted_at: now,
            updated_at: now,
        };

        let mut tables = self.inner.write().await;
        tables.documents.push(document.clone());
        Ok(document)
    }

    async fn list_documents(&self, owner: Option<Uuid>) -> Result<Vec<Document>> {
        let tables = self.inner.read().await;
        let rows: Vec<Document> = tables
            .documents
            .iter()
            .filter(|d| owner.map_or(true, |owner| d.user_id == owner))
            .cloned()
            .collect();
        Ok(newest_first(&rows, |d| d.submitted_at))
    }

    async fn update_document_status(
        &self,
        id: Uuid,
        status: ReviewStatus,
    ) -> Result<Option<Document>> {
        let mut tables = self.inner.write().await;
        Ok(tables
            .documents
            .iter_mut()
            .find(|d| d.id == id)
            .map(|document| {
                document.status = status;
                document.updated_at = Utc::now();
                document.clone()
            }))
    }

    async fn list_active_sections(&self) -> Result<Vec<ContentSection>> {
        let tables = self.inner.read().await;
        let mut sections: Vec<ContentSection> =
            tables.sections.iter().filter(|s| s.is_active).cloned().collect();
        sections.sort_by_key(|s| s.order_index);
        Ok(sections)
    }

    async fn get_active_section(&self, key: &str) -> Result<Option<ContentSection>> {
        let tables = self.inner.read().await;
        Ok(tables
            .sections
            .iter()
            .find(|s| s.is_active && s.section_key == key)
            .cloned())
    }

    async fn update_sections(&self, updates: &[SectionUpdate]) -> Result<Vec<ContentSection>> {
        let mut tables = self.inner.write().await;

        // Validate the whole batch before touching anything.
        if let Some(missing) = updates
            .iter()
            .find(|u| !tables.sections.iter().any(|s| s.id == u.id))
        {
            return Err(StoreError::MissingRow {
                entity: "content section",
                id: missing.id,
            });
        }

        let now = Utc::now();
        let mut updated = Vec::with_capacity(updates.len());
        for update in updates {
            if let Some(section) = tables.sections.iter_mut().find(|s| s.id == update.id) {
                section.title = update.title.clone();
                section.content = update.content.clone();
                section.updated_at = now;
                updated.push(section.clone());
            }
        }
        Ok(updated)
    }

    async fn seed_sections(&self, sections: &[DefaultSection]) -> Result<u64> {
        let mut tables = self.inner.write().await;
        let mut inserted = 0u64;
        for section in sections {
            if tables.sections.iter().any(|s| s.section_key == section.key) {
                continue;
            }
            tables.sections.push(ContentSection {
                id: Uuid::new_v4(),
                section_key: section.key.to_string(),
                title: section.title.to_string(),
                content: section.content.to_string(),
                order_index: section.order_index,
                is_active: true,
                updated_at: Utc::now(),
            });
            inserted += 1;
        }
        Ok(inserted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::content::DEFAULT_SECTIONS;
    use crate::models::submission::Category;

    fn new_submission(user_id: Uuid, title: &str) -> NewSubmission {
        NewSubmission {
            user_id,
            title: title.to_string(),
            category: Category::Robotics,
            description: "desc".to_string(),
            submission_group: None,
            check_in_date: None,
            file_url: "https://files.example/x.pdf".to_string(),
            file_name: "x.pdf".to_string(),
        }
    }

    #[tokio::test]
    async fn submissions_list_newest_first() {
        let store = InMemoryStore::new();
        let user = Uuid::new_v4();
        store.insert_submission(new_submission(user, "first")).await.unwrap();
        store.insert_submission(new_submission(user, "second")).await.unwrap();

        let titles: Vec<String> = store
            .list_submissions_for_owner(user)
            .await
            .unwrap()
            .into_iter()
            .map(|s| s.title)
            .collect();
        assert_eq!(titles, vec!["second", "first"]);
    }

    #[tokio::test]
    async fn revision_guard_rejects_stale_writes() {
        let store = InMemoryStore::new();
        let created = store
            .insert_submission(new_submission(Uuid::new_v4(), "guarded"))
            .await
            .unwrap();

        let first = store
            .update_submission_status(
                created.id,
                StatusChange {
                    status: ReviewStatus::Approved,
                    feedback: None,
                    expected_revision: Some(0),
                },
            )
            .await
            .unwrap();
        assert!(matches!(first, StatusChangeOutcome::Updated(ref s) if s.revision == 1));

        let stale = store
            .update_submission_status(
                created.id,
                StatusChange {
                    status: ReviewStatus::Rejected,
                    feedback: None,
                    expected_revision: Some(0),
                },
            )
            .await
            .unwrap();
        assert!(matches!(stale, StatusChangeOutcome::RevisionMismatch { current: 1 }));
    }

    #[tokio::test]
    async fn section_batch_is_all_or_nothing() {
        let store = InMemoryStore::new();
        store.seed_sections(DEFAULT_SECTIONS).await.unwrap();
        let sections = store.list_active_sections().await.unwrap();

        let err = store
            .update_sections(&[
                SectionUpdate {
                    id: sections[0].id,
                    title: "Changed".to_string(),
                    content: "Changed".to_string(),
                },
                SectionUpdate {
                    id: Uuid::new_v4(),
                    title: "Ghost".to_string(),
                    content: "Ghost".to_string(),
                },
            ])
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::MissingRow { .. }));

        let unchanged = store.get_active_section(&sections[0].section_key).await.unwrap().unwrap();
        assert_eq!(unchanged.title, sections[0].title);
    }

    #[tokio::test]
    async fn seeding_is_idempotent() {
        let store = InMemoryStore::new();
        let first = store.seed_sections(DEFAULT_SECTIONS).await.unwrap();
        let second = store.seed_sections(DEFAULT_SECTIONS).await.unwrap();
        assert_eq!(first, DEFAULT_SECTIONS.len() as u64);
        assert_eq!(second, 0);
    }
}
