use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::{get, post, put};
use axum::{Json, Router};
use uuid::Uuid;

use crate::auth::Actor;
use crate::error::ApiError;
use crate::extract::ApiJson;
use crate::models::submission::{
    CreateSubmissionRequest, ListQuery, Submission, SubmissionGroup, SubmissionWithSubmitter,
    UpdateStatusRequest,
};
use crate::services::submissions::SubmissionSort;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/submissions", post(create_submission))
        .route("/submissions", get(list_own))
        .route("/submissions/all", get(list_all))
        .route("/submissions/grouped", get(list_grouped))
        .route("/submissions/{id}", get(get_submission))
        .route("/submissions/{id}/status", put(update_status))
}

async fn create_submission(
    State(state): State<AppState>,
    actor: Actor,
    ApiJson(req): ApiJson<CreateSubmissionRequest>,
) -> Result<(StatusCode, Json<Submission>), ApiError> {
    let submission = state.submissions.create(&actor, req).await?;
    Ok((StatusCode::CREATED, Json(submission)))
}

async fn list_own(
    State(state): State<AppState>,
    actor: Actor,
) -> Result<Json<Vec<Submission>>, ApiError> {
    Ok(Json(state.submissions.list_for_owner(&actor).await?))
}

async fn list_all(
    State(state): State<AppState>,
    actor: Actor,
    Query(query): Query<ListQuery>,
) -> Result<Json<Vec<SubmissionWithSubmitter>>, ApiError> {
    let sort = SubmissionSort::from_query(&query)?;
    Ok(Json(state.submissions.list_all(&actor, sort).await?))
}

async fn list_grouped(
    State(state): State<AppState>,
    actor: Actor,
    Query(query): Query<ListQuery>,
) -> Result<Json<Vec<SubmissionGroup>>, ApiError> {
    let sort = SubmissionSort::from_query(&query)?;
    Ok(Json(state.submissions.list_grouped(&actor, sort).await?))
}

async fn get_submission(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<Uuid>,
) -> Result<Json<Submission>, ApiError> {
    Ok(Json(state.submissions.get(&actor, id).await?))
}

async fn update_status(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<Uuid>,
    ApiJson(req): ApiJson<UpdateStatusRequest>,
) -> Result<Json<Submission>, ApiError> {
    Ok(Json(state.submissions.update_status(&actor, id, req).await?))
}
