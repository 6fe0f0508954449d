use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use uuid::Uuid;

use crate::auth::Actor;
use crate::error::ApiError;
use crate::extract::ApiJson;
use crate::models::whitelist::{AddWhitelistRequest, WhitelistedEmail};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/whitelist", get(list_whitelist))
        .route("/whitelist", post(add_email))
        .route("/whitelist/{id}", delete(remove_email))
}

async fn list_whitelist(
    State(state): State<AppState>,
    actor: Actor,
) -> Result<Json<Vec<WhitelistedEmail>>, ApiError> {
    Ok(Json(state.whitelist.list(&actor).await?))
}

async fn add_email(
    State(state): State<AppState>,
    actor: Actor,
    ApiJson(req): ApiJson<AddWhitelistRequest>,
) -> Result<(StatusCode, Json<WhitelistedEmail>), ApiError> {
    let entry = state.whitelist.add(&actor, &req.email).await?;
    Ok((StatusCode::CREATED, Json(entry)))
}

async fn remove_email(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    state.whitelist.remove(&actor, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
