use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{get, post, put};
use axum::{Json, Router};
use uuid::Uuid;

use crate::auth::Actor;
use crate::error::ApiError;
use crate::extract::ApiJson;
use crate::models::profile::{Profile, RegisterProfileRequest, SetRoleRequest};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/me", get(me))
        .route("/profile", post(register_profile))
        .route("/users", get(list_users))
        .route("/users/{id}/role", put(set_role))
}

async fn me(State(state): State<AppState>, actor: Actor) -> Result<Json<Profile>, ApiError> {
    Ok(Json(state.users.me(&actor)?))
}

async fn register_profile(
    State(state): State<AppState>,
    actor: Actor,
    ApiJson(req): ApiJson<RegisterProfileRequest>,
) -> Result<(StatusCode, Json<Profile>), ApiError> {
    let profile = state.users.register(&actor, req).await?;
    Ok((StatusCode::CREATED, Json(profile)))
}

async fn list_users(
    State(state): State<AppState>,
    actor: Actor,
) -> Result<Json<Vec<Profile>>, ApiError> {
    Ok(Json(state.users.list_profiles(&actor).await?))
}

async fn set_role(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<Uuid>,
    ApiJson(req): ApiJson<SetRoleRequest>,
) -> Result<Json<Profile>, ApiError> {
    Ok(Json(state.users.set_role(&actor, id, &req.role).await?))
}
