use axum::extract::{Path, State};
use axum::middleware;
use axum::routing::{get, patch};
use axum::{Json, Router};

use crate::auth::{self, Actor};
use crate::error::ApiError;
use crate::extract::ApiJson;
use crate::models::content::{ContentSection, SectionView, UpdateSectionsRequest};
use crate::state::AppState;

/// Reads are public; only the batch update goes through the auth middleware.
pub fn router(state: AppState) -> Router<AppState> {
    let update = patch(update_sections)
        .route_layer(middleware::from_fn_with_state(state, auth::require_auth));

    Router::new()
        .route("/content", update.get(list_sections))
        .route("/content/{key}", get(get_section))
}

async fn list_sections(
    State(state): State<AppState>,
) -> Result<Json<Vec<ContentSection>>, ApiError> {
    Ok(Json(state.content.list_sections().await?))
}

async fn get_section(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Result<Json<SectionView>, ApiError> {
    Ok(Json(state.content.get_section(&key).await?))
}

async fn update_sections(
    State(state): State<AppState>,
    actor: Actor,
    ApiJson(req): ApiJson<UpdateSectionsRequest>,
) -> Result<Json<Vec<ContentSection>>, ApiError> {
    Ok(Json(state.content.update_sections(&actor, req.updates).await?))
}
