use async_trait::async_trait;
use uuid::Uuid;

use super::{PortalStore, Result, StoreError};
use crate::db::PgPool;
use crate::models::content::{ContentSection, DefaultSection, SectionUpdate};
use crate::models::document::{Document, NewDocument};
use crate::models::profile::{NewProfile, Profile, Role};
use crate::models::status::ReviewStatus;
use crate::models::submission::{
    NewSubmission, StatusChange, StatusChangeOutcome, Submission, SubmissionWithSubmitter,
};
use crate::models::whitelist::WhitelistedEmail;

/// Postgres-backed store. Every write is a single-row statement except the
/// content batch, which runs in one transaction.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn unique_violation(err: sqlx::error::Error, what: &'static str) -> StoreError {
    if let sqlx::error::Error::Database(db_err) = &err {
        if db_err.is_unique_violation() {
            return StoreError::UniqueViolation(what);
        }
    }
    StoreError::Database(err)
}

#[async_trait]
impl PortalStore for PgStore {
    async fn ping(&self) -> Result<()> {
        sqlx::query::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    async fn get_profile(&self, id: Uuid) -> Result<Option<Profile>> {
        let row = sqlx::query::query("SELECT * FROM profiles WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(Profile::from_row).transpose()
    }

    async fn insert_profile(&self, profile: NewProfile) -> Result<Profile> {
        let row = sqlx::query::query(
            r#"INSERT INTO profiles (id, email, full_name, school_year, role)
               VALUES ($1, $2, $3, $4, $5)
               RETURNING *"#,
        )
        .bind(profile.id)
        .bind(&profile.email)
        .bind(&profile.full_name)
        .bind(profile.school_year.map(|y| y.as_str()))
        .bind(profile.role.as_str())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| unique_violation(e, "profile"))?;

        Profile::from_row(&row)
    }

    async fn list_profiles(&self) -> Result<Vec<Profile>> {
        let rows = sqlx::query::query("SELECT * FROM profiles ORDER BY full_name ASC, email ASC")
            .fetch_all(&self.pool)
            .await?;

        rows.iter().map(Profile::from_row).collect()
    }

    async fn set_role(&self, id: Uuid, role: Role) -> Result<Option<Profile>> {
        let row = sqlx::query::query(
            "UPDATE profiles SET role = $2, updated_at = now() WHERE id = $1 RETURNING *",
        )
        .bind(id)
        .bind(role.as_str())
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(Profile::from_row).transpose()
    }

    async fn list_whitelist(&self) -> Result<Vec<WhitelistedEmail>> {
        let rows = sqlx::query::query("SELECT * FROM whitelisted_emails ORDER BY created_at DESC")
            .fetch_all(&self.pool)
            .await?;

        Ok(rows
            .iter()
            .map(WhitelistedEmail::from_row)
            .collect::<std::result::Result<_, _>>()?)
    }

    async fn find_whitelisted(&self, email: &str) -> Result<Option<WhitelistedEmail>> {
        let row = sqlx::query::query("SELECT * FROM whitelisted_emails WHERE email = $1")
            .bind(email)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.as_ref().map(WhitelistedEmail::from_row).transpose()?)
    }

    async fn insert_whitelist(&self, email: &str, created_by: Uuid) -> Result<WhitelistedEmail> {
        let row = sqlx::query::query(
            r#"INSERT INTO whitelisted_emails (email, created_by)
               VALUES ($1, $2)
               RETURNING *"#,
        )
        .bind(email)
        .bind(created_by)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| unique_violation(e, "whitelisted email"))?;

        Ok(WhitelistedEmail::from_row(&row)?)
    }

    async fn delete_whitelist(&self, id: Uuid) -> Result<bool> {
        let result = sqlx::query::query("DELETE FROM whitelisted_emails WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn insert_submission(&self, submission: NewSubmission) -> Result<Submission> {
        let row = sqlx::query::query(
            r#"INSERT INTO submissions
                   (user_id, title, category, description, submission_group,
                    check_in_date, file_url, file_name, status)
               VALUES ($1, $2, $3, $4, $5, $6, $7, $8, 'pending')
               RETURNING *"#,
        )
        .bind(submission.user_id)
        .bind(&submission.title)
        .bind(submission.category.as_str())
        .bind(&submission.description)
        .bind(submission.submission_group.as_deref())
        .bind(submission.check_in_date)
        .bind(&submission.file_url)
        .bind(&submission.file_name)
        .fetch_one(&self.pool)
        .await?;

        Submission::from_row(&row)
    }

    async fn get_submission(&self, id: Uuid) -> Result<Option<Submission>> {
        let row = sqlx::query::query("SELECT * FROM submissions WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(Submission::from_row).transpose()
    }

    async fn list_submissions_for_owner(&self, user_id: Uuid) -> Result<Vec<Submission>> {
        let rows = sqlx::query::query(
            "SELECT * FROM submissions WHERE user_id = $1 ORDER BY submitted_at DESC",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(Submission::from_row).collect()
    }

    async fn list_submissions_with_submitters(&self) -> Result<Vec<SubmissionWithSubmitter>> {
        let rows = sqlx::query::query(
            r#"SELECT s.*,
                      p.full_name   AS submitter_name,
                      p.email       AS submitter_email,
                      p.school_year AS submitter_school_year
               FROM submissions s
               LEFT JOIN profiles p ON p.id = s.user_id
               ORDER BY s.submitted_at DESC"#,
        )
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(SubmissionWithSubmitter::from_row).collect()
    }

    async fn update_submission_status(
        &self,
        id: Uuid,
        change: StatusChange,
    ) -> Result<StatusChangeOutcome> {
        let row = sqlx::query::query(
            r#"UPDATE submissions
               SET status = $2,
                   feedback = COALESCE($3, feedback),
                   revision = revision + 1,
                   updated_at = now()
               WHERE id = $1
                 AND ($4::BIGINT IS NULL OR revision = $4)
               RETURNING *"#,
        )
        .bind(id)
        .bind(change.status.as_str())
        .bind(change.feedback.as_deref())
        .bind(change.expected_revision)
        .fetch_optional(&self.pool)
        .await?;

        if let Some(row) = row {
            return Ok(StatusChangeOutcome::Updated(Submission::from_row(&row)?));
        }

        // Either the row is gone or the revision guard failed.
        let current: Option<i64> =
            sqlx::query_scalar::query_scalar("SELECT revision FROM submissions WHERE id = $1")
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;

        Ok(match current {
            Some(current) => StatusChangeOutcome::RevisionMismatch { current },
            None => StatusChangeOutcome::NotFound,
        })
    }

    async fn insert_document(&self, document: NewDocument) -> Result<Document> {
        let row = sqlx::query::query(
            r#"INSERT INTO documents
                   (user_id, title, description, file_name, file_url, file_size,
                    file_type, category, status)
               VALUES ($1, $2, $3, $4, $5, $6, $7, $8, 'pending')
               RETURNING *"#,
        )
        .bind(document.user_id)
        .bind(&document.title)
        .bind(document.description.as_deref())
        .bind(&document.file_name)
        .bind(&document.file_url)
        .bind(document.file_size)
        .bind(&document.file_type)
        .bind(document.category.as_str())
        .fetch_one(&self.pool)
        .await?;

        Document::from_row(&row)
    }

    async fn list_documents(&self, owner: Option<Uuid>) -> Result<Vec<Document>> {
        let rows = sqlx::query::query(
            r#"SELECT * FROM documents
               WHERE ($1::UUID IS NULL OR user_id = $1)
               ORDER BY submitted_at DESC"#,
        )
        .bind(owner)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(Document::from_row).collect()
    }

    async fn update_document_status(
        &self,
        id: Uuid,
        status: ReviewStatus,
    ) -> Result<Option<Document>> {
        let row = sqlx::query::query(
            "UPDATE documents SET status = $2, updated_at = now() WHERE id = $1 RETURNING *",
        )
        .bind(id)
        .bind(status.as_str())
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(Document::from_row).transpose()
    }

    async fn list_active_sections(&self) -> Result<Vec<ContentSection>> {
        let rows = sqlx::query::query(
            "SELECT * FROM content_sections WHERE is_active ORDER BY order_index ASC",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .iter()
            .map(ContentSection::from_row)
            .collect::<std::result::Result<_, _>>()?)
    }

    async fn get_active_section(&self, key: &str) -> Result<Option<ContentSection>> {
        let row = sqlx::query::query(
            "SELECT * FROM content_sections WHERE section_key = $1 AND is_active",
        )
        .bind(key)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.as_ref().map(ContentSection::from_row).transpose()?)
    }

    async fn update_sections(&self, updates: &[SectionUpdate]) -> Result<Vec<ContentSection>> {
        let mut tx = self.pool.begin().await?;
        let mut updated = Vec::with_capacity(updates.len());

        for update in updates {
            let row = sqlx::query::query(
                r#"UPDATE content_sections
                   SET title = $2, content = $3, updated_at = now()
                   WHERE id = $1
                   RETURNING *"#,
            )
            .bind(update.id)
            .bind(&update.title)
            .bind(&update.content)
            .fetch_optional(&mut *tx)
            .await?;

            // Returning early drops `tx`, which rolls the batch back.
            let row = row.ok_or(StoreError::MissingRow {
                entity: "content section",
                id: update.id,
            })?;
            updated.push(ContentSection::from_row(&row)?);
        }

        tx.commit().await?;
        Ok(updated)
    }

    async fn seed_sections(&self, sections: &[DefaultSection]) -> Result<u64> {
        let mut inserted = 0u64;
        for section in sections {
            let result = sqlx::query::query(
                r#"INSERT INTO content_sections (section_key, title, content, order_index)
                   VALUES ($1, $2, $3, $4)
                   ON CONFLICT (section_key) DO NOTHING"#,
            )
            .bind(section.key)
            .bind(section.title)
            .bind(section.content)
            .bind(section.order_index)
            .execute(&self.pool)
            .await?;
            inserted += result.rows_affected();
        }
        Ok(inserted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;
    use crate::models::content::DEFAULT_SECTIONS;
    use crate::models::submission::Category;

    async fn store() -> PgStore {
        let url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");
        let pool = db::create_pool(&url, 2).await.unwrap();
        db::apply_schema(&pool).await.unwrap();
        PgStore::new(pool)
    }

    async fn officer(store: &PgStore) -> Profile {
        let id = Uuid::new_v4();
        store
            .insert_profile(NewProfile {
                id,
                email: format!("pg-{id}@example.com"),
                full_name: "Pg Officer".to_string(),
                school_year: None,
                role: Role::Officer,
            })
            .await
            .unwrap()
    }

    fn change(status: ReviewStatus, expected_revision: Option<i64>) -> StatusChange {
        StatusChange {
            status,
            feedback: Some("noted".to_string()),
            expected_revision,
        }
    }

    #[tokio::test]
    #[ignore = "requires DATABASE_URL"]
    async fn duplicate_whitelist_email_is_a_unique_violation() {
        let store = store().await;
        let creator = officer(&store).await;
        let email = format!("pg-{}@example.com", Uuid::new_v4());

        let entry = store.insert_whitelist(&email, creator.id).await.unwrap();
        assert_eq!(store.find_whitelisted(&email).await.unwrap().unwrap().id, entry.id);

        let err = store.insert_whitelist(&email, creator.id).await.unwrap_err();
        assert!(matches!(err, StoreError::UniqueViolation(_)));

        assert!(store.delete_whitelist(entry.id).await.unwrap());
        assert!(!store.delete_whitelist(entry.id).await.unwrap());
    }

    #[tokio::test]
    #[ignore = "requires DATABASE_URL"]
    async fn guarded_status_update_checks_revision() {
        let store = store().await;
        let created = store
            .insert_submission(NewSubmission {
                user_id: Uuid::new_v4(),
                title: "Pg guarded".to_string(),
                category: Category::Coding,
                description: "desc".to_string(),
                submission_group: None,
                check_in_date: None,
                file_url: "https://files.example/pg.zip".to_string(),
                file_name: "pg.zip".to_string(),
            })
            .await
            .unwrap();
        assert_eq!(created.status, ReviewStatus::Pending);
        assert_eq!(created.revision, 0);

        let first = store
            .update_submission_status(created.id, change(ReviewStatus::Approved, Some(0)))
            .await
            .unwrap();
        assert!(matches!(first, StatusChangeOutcome::Updated(ref s) if s.revision == 1));

        let stale = store
            .update_submission_status(created.id, change(ReviewStatus::Rejected, Some(0)))
            .await
            .unwrap();
        assert!(matches!(stale, StatusChangeOutcome::RevisionMismatch { current: 1 }));

        let missing = store
            .update_submission_status(Uuid::new_v4(), change(ReviewStatus::Approved, None))
            .await
            .unwrap();
        assert!(matches!(missing, StatusChangeOutcome::NotFound));
    }

    #[tokio::test]
    #[ignore = "requires DATABASE_URL"]
    async fn section_batch_rolls_back_on_unknown_id() {
        let store = store().await;
        store.seed_sections(DEFAULT_SECTIONS).await.unwrap();
        assert_eq!(store.seed_sections(DEFAULT_SECTIONS).await.unwrap(), 0);
        let sections = store.list_active_sections().await.unwrap();
        let target = &sections[0];

        let err = store
            .update_sections(&[
                SectionUpdate {
                    id: target.id,
                    title: format!("Changed {}", Uuid::new_v4()),
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

        let unchanged = store.get_active_section(&target.section_key).await.unwrap().unwrap();
        assert_eq!(unchanged.title, target.title);
    }
}
