//! Submission lifecycle: creation by the owner, reads, and review transitions.

use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::Arc;

use uuid::Uuid;

use crate::auth::Actor;
use crate::authz::{self, Tier};
use crate::error::ApiError;
use crate::models::non_blank;
use crate::models::status::ReviewStatus;
use crate::models::submission::{
    Category, CreateSubmissionRequest, ListQuery, NewSubmission, StatusChange,
    StatusChangeOutcome, Submission, SubmissionGroup, SubmissionWithSubmitter,
    UpdateStatusRequest,
};
use crate::store::PortalStore;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SortKey {
    #[default]
    SubmittedAt,
    Category,
    Status,
    Title,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SubmissionSort {
    pub key: SortKey,
    pub order: SortOrder,
}

impl SubmissionSort {
    pub fn from_query(query: &ListQuery) -> Result<Self, ApiError> {
        let key = match query.sort_by.as_deref().map(str::trim) {
            None | Some("") => SortKey::default(),
            Some(raw) => match raw.to_ascii_lowercase().as_str() {
                "submitted_at" | "submittedat" => SortKey::SubmittedAt,
                "category" => SortKey::Category,
                "status" => SortKey::Status,
                "title" => SortKey::Title,
                _ => return Err(ApiError::validation(format!("unsupported sort key: {raw}"))),
            },
        };
        let order = match query.sort_order.as_deref().map(str::trim) {
            None | Some("") => SortOrder::default(),
            Some(raw) => match raw.to_ascii_lowercase().as_str() {
                "asc" | "ascending" => SortOrder::Asc,
                "desc" | "descending" => SortOrder::Desc,
                _ => return Err(ApiError::validation(format!("unsupported sort order: {raw}"))),
            },
        };
        Ok(Self { key, order })
    }
}

fn normalized(text: &str) -> String {
    text.trim().to_lowercase()
}

fn compare(a: &Submission, b: &Submission, key: SortKey) -> Ordering {
    match key {
        SortKey::SubmittedAt => a.submitted_at.cmp(&b.submitted_at),
        SortKey::Category => normalized(a.category.as_str()).cmp(&normalized(b.category.as_str())),
        SortKey::Status => a.status.as_str().cmp(b.status.as_str()),
        SortKey::Title => normalized(&a.title).cmp(&normalized(&b.title)),
    }
}

/// Stable sort; ties keep the store's newest-first order.
pub fn sort_submissions(rows: &mut [SubmissionWithSubmitter], sort: SubmissionSort) {
    rows.sort_by(|a, b| {
        let ord = compare(&a.submission, &b.submission, sort.key);
        match sort.order {
            SortOrder::Asc => ord,
            SortOrder::Desc => ord.reverse(),
        }
    });
}

/// Partition an already-sorted list by group label. Partitions appear in the
/// order of their first member; unlabeled rows share one "Ungrouped" partition.
pub fn group_submissions(rows: Vec<SubmissionWithSubmitter>) -> Vec<SubmissionGroup> {
    let mut groups: Vec<SubmissionGroup> = Vec::new();
    let mut positions: HashMap<String, usize> = HashMap::new();

    for row in rows {
        let label = row.submission.group_label().to_string();
        match positions.get(&label) {
            Some(&idx) => groups[idx].submissions.push(row),
            None => {
                positions.insert(label.clone(), groups.len());
                groups.push(SubmissionGroup {
                    label,
                    submissions: vec![row],
                });
            }
        }
    }

    groups
}

fn file_name_from_url(url: &str) -> String {
    let path = url.split(['?', '#']).next().unwrap_or_default();
    path.rsplit('/')
        .find(|segment| !segment.is_empty())
        .filter(|segment| !segment.contains(':'))
        .unwrap_or("attachment")
        .to_string()
}

#[derive(Clone)]
pub struct SubmissionService {
    store: Arc<dyn PortalStore>,
}

impl SubmissionService {
    pub fn new(store: Arc<dyn PortalStore>) -> Self {
        Self { store }
    }

    /// Create a submission owned by the actor. Any status in the request is ignored.
    pub async fn create(
        &self,
        actor: &Actor,
        req: CreateSubmissionRequest,
    ) -> Result<Submission, ApiError> {
        let title = req.title.trim();
        let description = req.description.trim();
        let category = req.category.trim();
        if title.is_empty() {
            return Err(ApiError::validation("title is required"));
        }
        if category.is_empty() {
            return Err(ApiError::validation("category is required"));
        }
        if description.is_empty() {
            return Err(ApiError::validation("description is required"));
        }
        let category: Category = category
            .parse()
            .map_err(|e: crate::models::ParseEnumError| ApiError::validation(e.to_string()))?;

        let file_url = req.file_url.trim();
        if file_url.is_empty() {
            return Err(ApiError::validation("a file is required"));
        }
        let file_name =
            non_blank(req.file_name.as_deref()).unwrap_or_else(|| file_name_from_url(file_url));

        let submission = self
            .store
            .insert_submission(NewSubmission {
                user_id: actor.user_id,
                title: title.to_string(),
                category,
                description: description.to_string(),
                submission_group: non_blank(req.submission_group.as_deref()),
                check_in_date: req.check_in_date,
                file_url: file_url.to_string(),
                file_name,
            })
            .await?;

        tracing::info!(
            submission_id = %submission.id,
            user_id = %actor.user_id,
            category = %submission.category,
            "Submission created"
        );
        Ok(submission)
    }

    /// The actor's own submissions, newest first.
    pub async fn list_for_owner(&self, actor: &Actor) -> Result<Vec<Submission>, ApiError> {
        Ok(self.store.list_submissions_for_owner(actor.user_id).await?)
    }

    /// Every submission with its submitter, for reviewers.
    pub async fn list_all(
        &self,
        actor: &Actor,
        sort: SubmissionSort,
    ) -> Result<Vec<SubmissionWithSubmitter>, ApiError> {
        authz::require_role(actor, Tier::Review)?;

        let mut rows = self.store.list_submissions_with_submitters().await?;
        sort_submissions(&mut rows, sort);
        Ok(rows)
    }

    pub async fn list_grouped(
        &self,
        actor: &Actor,
        sort: SubmissionSort,
    ) -> Result<Vec<SubmissionGroup>, ApiError> {
        let rows = self.list_all(actor, sort).await?;
        Ok(group_submissions(rows))
    }

    /// A single submission, visible to its owner and to reviewers only.
    pub async fn get(&self, actor: &Actor, id: Uuid) -> Result<Submission, ApiError> {
        let submission = self.store.get_submission(id).await?.ok_or(ApiError::NotFound)?;
        if submission.user_id == actor.user_id || authz::has_tier(actor, Tier::Review) {
            Ok(submission)
        } else {
            Err(ApiError::NotFound)
        }
    }

    /// Move a submission to any of pending/approved/rejected.
    pub async fn update_status(
        &self,
        actor: &Actor,
        id: Uuid,
        req: UpdateStatusRequest,
    ) -> Result<Submission, ApiError> {
        authz::require_role(actor, Tier::Review)?;

        let status: ReviewStatus = req
            .status
            .parse()
            .ok()
            .filter(|s: &ReviewStatus| s.is_submission_status())
            .ok_or_else(|| {
                ApiError::validation(format!(
                    "status must be one of pending, approved, rejected (got {:?})",
                    req.status
                ))
            })?;

        let change = StatusChange {
            status,
            feedback: non_blank(req.feedback.as_deref()),
            expected_revision: req.expected_revision,
        };

        match self.store.update_submission_status(id, change).await? {
            StatusChangeOutcome::Updated(submission) => {
                tracing::info!(
                    submission_id = %id,
                    reviewer = %actor.user_id,
                    status = %submission.status,
                    revision = submission.revision,
                    "Submission status updated"
                );
                Ok(submission)
            }
            StatusChangeOutcome::NotFound => Err(ApiError::NotFound),
            StatusChangeOutcome::RevisionMismatch { current } => Err(ApiError::Conflict(format!(
                "submission was changed by someone else (current revision {current})"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::authz::testing::{actor_with_role, actor_without_profile};
    use crate::models::profile::Role;
    use crate::store::InMemoryStore;

    fn service() -> SubmissionService {
        SubmissionService::new(Arc::new(InMemoryStore::new()))
    }

    fn request(title: &str) -> CreateSubmissionRequest {
        CreateSubmissionRequest {
            title: title.to_string(),
            category: "Robotics".to_string(),
            description: "autonomous rover".to_string(),
            file_url: "https://x/file.pdf".to_string(),
            ..Default::default()
        }
    }

    fn status(value: &str) -> UpdateStatusRequest {
        UpdateStatusRequest {
            status: value.to_string(),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn create_forces_pending_status() {
        let svc = service();
        let student = actor_with_role(Role::Student);
        let mut req = request("Rover V1");
        req.status = Some(serde_json::json!("approved"));

        let created = svc.create(&student, req).await.unwrap();
        assert_eq!(created.status, ReviewStatus::Pending);
        assert_eq!(created.user_id, student.user_id);
        assert_eq!(created.file_name, "file.pdf");
        assert_eq!(created.revision, 0);
    }

    #[tokio::test]
    async fn create_requires_fields() {
        let svc = service();
        let student = actor_with_role(Role::Student);

        for field in ["title", "category", "description"] {
            let mut req = request("Rover");
            match field {
                "title" => req.title = "   ".into(),
                "category" => req.category = String::new(),
                _ => req.description = String::new(),
            }
            let err = svc.create(&student, req).await.unwrap_err();
            assert!(matches!(err, ApiError::Validation(ref m) if m.contains(field)), "{field}");
        }

        let mut req = request("Rover");
        req.category = "Knitting".into();
        assert!(matches!(svc.create(&student, req).await, Err(ApiError::Validation(_))));
    }

    #[tokio::test]
    async fn create_works_before_profile_registration() {
        let svc = service();
        let newcomer = actor_without_profile("new@example.com");
        let created = svc.create(&newcomer, request("Early entry")).await.unwrap();
        assert_eq!(created.user_id, newcomer.user_id);
    }

    #[tokio::test]
    async fn owners_only_see_their_own_submissions() {
        let svc = service();
        let alice = actor_with_role(Role::Student);
        let bob = actor_with_role(Role::Student);

        svc.create(&alice, request("Alice 1")).await.unwrap();
        svc.create(&alice, request("Alice 2")).await.unwrap();
        svc.create(&bob, request("Bob 1")).await.unwrap();

        let alice_rows = svc.list_for_owner(&alice).await.unwrap();
        assert_eq!(alice_rows.len(), 2);
        assert!(alice_rows.iter().all(|s| s.user_id == alice.user_id));

        let bob_rows = svc.list_for_owner(&bob).await.unwrap();
        assert_eq!(bob_rows.len(), 1);
        assert_eq!(bob_rows[0].title, "Bob 1");
    }

    #[tokio::test]
    async fn students_cannot_review() {
        let svc = service();
        let student = actor_with_role(Role::Student);
        let created = svc.create(&student, request("Mine")).await.unwrap();

        assert!(matches!(
            svc.list_all(&student, SubmissionSort::default()).await,
            Err(ApiError::Forbidden)
        ));
        assert!(matches!(
            svc.update_status(&student, created.id, status("approved")).await,
            Err(ApiError::Forbidden)
        ));
    }

    #[tokio::test]
    async fn review_scenario_is_visible_to_owner() {
        let svc = service();
        let student = actor_with_role(Role::Student);
        let admin = actor_with_role(Role::Admin);

        let created = svc.create(&student, request("Rover V1")).await.unwrap();
        svc.update_status(&admin, created.id, status("approved")).await.unwrap();

        let rows = svc.list_for_owner(&student).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].status, ReviewStatus::Approved);
    }

    #[tokio::test]
    async fn repeated_status_updates_are_idempotent() {
        let svc = service();
        let student = actor_with_role(Role::Student);
        let teacher = actor_with_role(Role::Teacher);
        let created = svc.create(&student, request("Twice")).await.unwrap();

        svc.update_status(&teacher, created.id, status("approved")).await.unwrap();
        let again = svc.update_status(&teacher, created.id, status("approved")).await.unwrap();
        assert_eq!(again.status, ReviewStatus::Approved);
    }

    #[tokio::test]
    async fn any_state_can_be_reopened() {
        let svc = service();
        let student = actor_with_role(Role::Student);
        let officer = actor_with_role(Role::Officer);
        let created = svc.create(&student, request("Reopen")).await.unwrap();

        svc.update_status(&officer, created.id, status("rejected")).await.unwrap();
        let reopened = svc.update_status(&officer, created.id, status("pending")).await.unwrap();
        assert_eq!(reopened.status, ReviewStatus::Pending);
    }

    #[tokio::test]
    async fn update_status_validates_and_reports_missing_rows() {
        let svc = service();
        let admin = actor_with_role(Role::Admin);
        let student = actor_with_role(Role::Student);
        let created = svc.create(&student, request("Check")).await.unwrap();

        assert!(matches!(
            svc.update_status(&admin, created.id, status("under_review")).await,
            Err(ApiError::Validation(_))
        ));
        assert!(matches!(
            svc.update_status(&admin, created.id, status("archived")).await,
            Err(ApiError::Validation(_))
        ));
        assert!(matches!(
            svc.update_status(&admin, Uuid::new_v4(), status("approved")).await,
            Err(ApiError::NotFound)
        ));
    }

    #[tokio::test]
    async fn feedback_and_revision_guard() {
        let svc = service();
        let admin = actor_with_role(Role::Admin);
        let student = actor_with_role(Role::Student);
        let created = svc.create(&student, request("Guarded")).await.unwrap();

        let updated = svc
            .update_status(
                &admin,
                created.id,
                UpdateStatusRequest {
                    status: "rejected".into(),
                    feedback: Some("Missing the design log".into()),
                    expected_revision: Some(0),
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.feedback.as_deref(), Some("Missing the design log"));
        assert_eq!(updated.revision, 1);

        let stale = svc
            .update_status(
                &admin,
                created.id,
                UpdateStatusRequest {
                    status: "approved".into(),
                    feedback: None,
                    expected_revision: Some(0),
                },
            )
            .await;
        assert!(matches!(stale, Err(ApiError::Conflict(_))));
    }

    #[tokio::test]
    async fn list_all_sorts_by_title() {
        let svc = service();
        let student = actor_with_role(Role::Student);
        let admin = actor_with_role(Role::Admin);
        for title in ["Zed", "Alpha", "Mid"] {
            svc.create(&student, request(title)).await.unwrap();
        }

        let sort = SubmissionSort::from_query(&ListQuery {
            sort_by: Some("title".into()),
            sort_order: Some("asc".into()),
        })
        .unwrap();
        let titles: Vec<String> = svc
            .list_all(&admin, sort)
            .await
            .unwrap()
            .into_iter()
            .map(|row| row.submission.title)
            .collect();
        assert_eq!(titles, vec!["Alpha", "Mid", "Zed"]);
    }

    #[tokio::test]
    async fn list_all_includes_submitter_summary() {
        let store = Arc::new(InMemoryStore::new());
        let svc = SubmissionService::new(store.clone());
        let admin = actor_with_role(Role::Admin);
        let newcomer = actor_without_profile("new@example.com");
        svc.create(&newcomer, request("No profile")).await.unwrap();

        let rows = svc.list_all(&admin, SubmissionSort::default()).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert!(rows[0].submitter.is_none());
    }

    #[tokio::test]
    async fn grouping_follows_sorted_order() {
        let svc = service();
        let student = actor_with_role(Role::Student);
        let admin = actor_with_role(Role::Admin);

        for (title, group) in [
            ("Bravo", Some("Team A")),
            ("Alpha", None),
            ("Charlie", Some("Team B")),
            ("Delta", Some("Team A")),
            ("Echo", Some("  ")),
        ] {
            let mut req = request(title);
            req.submission_group = group.map(str::to_string);
            svc.create(&student, req).await.unwrap();
        }

        let sort = SubmissionSort {
            key: SortKey::Title,
            order: SortOrder::Asc,
        };
        let groups = svc.list_grouped(&admin, sort).await.unwrap();
        let labels: Vec<&str> = groups.iter().map(|g| g.label.as_str()).collect();
        assert_eq!(labels, vec!["Ungrouped", "Team A", "Team B"]);

        let ungrouped: Vec<&str> = groups[0]
            .submissions
            .iter()
            .map(|s| s.submission.title.as_str())
            .collect();
        assert_eq!(ungrouped, vec!["Alpha", "Echo"]);
        assert_eq!(groups[1].submissions.len(), 2);
    }

    #[tokio::test]
    async fn get_hides_other_students_rows() {
        let svc = service();
        let alice = actor_with_role(Role::Student);
        let bob = actor_with_role(Role::Student);
        let teacher = actor_with_role(Role::Teacher);
        let created = svc.create(&alice, request("Private")).await.unwrap();

        assert!(svc.get(&alice, created.id).await.is_ok());
        assert!(svc.get(&teacher, created.id).await.is_ok());
        assert!(matches!(svc.get(&bob, created.id).await, Err(ApiError::NotFound)));
    }

    fn row(title: &str, category: Category, status: ReviewStatus, minute: i64) -> SubmissionWithSubmitter {
        let at = chrono::DateTime::<chrono::Utc>::from_timestamp(1_700_000_000 + minute * 60, 0).unwrap();
        SubmissionWithSubmitter {
            submission: Submission {
                id: Uuid::new_v4(),
                user_id: Uuid::new_v4(),
                title: title.to_string(),
                category,
                description: "d".to_string(),
                submission_group: None,
                check_in_date: None,
                file_url: "https://x/f.pdf".to_string(),
                file_name: "f.pdf".to_string(),
                status,
                feedback: None,
                revision: 0,
                submitted_at: at,
                updated_at: at,
            },
            submitter: None,
        }
    }

    fn sample() -> Vec<SubmissionWithSubmitter> {
        vec![
            row("B", Category::Webmaster, ReviewStatus::Pending, 2),
            row("a", Category::Robotics, ReviewStatus::Rejected, 3),
            row("C", Category::Coding, ReviewStatus::Approved, 1),
        ]
    }

    fn titles_after(key: SortKey, order: SortOrder) -> Vec<String> {
        let mut rows = sample();
        sort_submissions(&mut rows, SubmissionSort { key, order });
        rows.into_iter().map(|r| r.submission.title).collect()
    }

    #[test]
    fn every_key_sorts_both_ways() {
        let cases = [
            (SortKey::SubmittedAt, SortOrder::Asc, ["C", "B", "a"]),
            (SortKey::SubmittedAt, SortOrder::Desc, ["a", "B", "C"]),
            (SortKey::Category, SortOrder::Asc, ["C", "a", "B"]),
            (SortKey::Category, SortOrder::Desc, ["B", "a", "C"]),
            (SortKey::Status, SortOrder::Asc, ["C", "B", "a"]),
            (SortKey::Status, SortOrder::Desc, ["a", "B", "C"]),
            (SortKey::Title, SortOrder::Asc, ["a", "B", "C"]),
            (SortKey::Title, SortOrder::Desc, ["C", "B", "a"]),
        ];
        for (key, order, expected) in cases {
            assert_eq!(titles_after(key, order), expected, "{key:?} {order:?}");
        }
    }

    #[test]
    fn ties_keep_their_incoming_order() {
        for order in [SortOrder::Asc, SortOrder::Desc] {
            let mut rows = vec![
                row("first", Category::Coding, ReviewStatus::Pending, 5),
                row("other", Category::Robotics, ReviewStatus::Approved, 4),
                row("second", Category::Coding, ReviewStatus::Pending, 3),
            ];
            sort_submissions(&mut rows, SubmissionSort { key: SortKey::Status, order });
            let pending: Vec<&str> = rows
                .iter()
                .filter(|r| r.submission.status == ReviewStatus::Pending)
                .map(|r| r.submission.title.as_str())
                .collect();
            assert_eq!(pending, vec!["first", "second"], "{order:?}");

            sort_submissions(&mut rows, SubmissionSort { key: SortKey::Category, order });
            let coding: Vec<&str> = rows
                .iter()
                .filter(|r| r.submission.category == Category::Coding)
                .map(|r| r.submission.title.as_str())
                .collect();
            assert_eq!(coding, vec!["first", "second"], "{order:?}");
        }
    }

    #[test]
    fn explicit_sort_parameters_parse() {
        let sort = SubmissionSort::from_query(&ListQuery {
            sort_by: Some("Submitted_At".into()),
            sort_order: Some("ASC".into()),
        })
        .unwrap();
        assert_eq!(sort, SubmissionSort { key: SortKey::SubmittedAt, order: SortOrder::Asc });

        let sort = SubmissionSort::from_query(&ListQuery {
            sort_by: Some("status".into()),
            sort_order: Some("desc".into()),
        })
        .unwrap();
        assert_eq!(sort, SubmissionSort { key: SortKey::Status, order: SortOrder::Desc });

        assert!(matches!(
            SubmissionSort::from_query(&ListQuery {
                sort_by: None,
                sort_order: Some("sideways".into()),
            }),
            Err(ApiError::Validation(_))
        ));
    }

    #[test]
    fn sort_query_parsing() {
        let default = SubmissionSort::from_query(&ListQuery::default()).unwrap();
        assert_eq!(default.key, SortKey::SubmittedAt);
        assert_eq!(default.order, SortOrder::Desc);

        let bad = SubmissionSort::from_query(&ListQuery {
            sort_by: Some("votes".into()),
            sort_order: None,
        });
        assert!(matches!(bad, Err(ApiError::Validation(_))));
    }

    #[test]
    fn derives_file_name_from_url() {
        assert_eq!(file_name_from_url("https://x/file.pdf"), "file.pdf");
        assert_eq!(file_name_from_url("https://x/dir/report.docx?token=1"), "report.docx");
        assert_eq!(file_name_from_url("https://"), "attachment");
    }
}
