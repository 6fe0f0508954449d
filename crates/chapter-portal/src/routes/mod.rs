pub mod content;
pub mod documents;
pub mod health;
pub mod submissions;
pub mod users;
pub mod whitelist;

use axum::{middleware, Router};

use crate::auth;
use crate::state::AppState;

/// Build the full application router.
pub fn router(state: AppState) -> Router {
    // Public routes (no auth required)
    let public = Router::new()
        .merge(health::router())
        .merge(content::router(state.clone()));

    // Authenticated routes
    let authenticated = Router::new()
        .merge(users::router())
        .merge(submissions::router())
        .merge(documents::router(state.config.max_upload_bytes))
        .merge(whitelist::router())
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth::require_auth,
        ));

    Router::new()
        .nest("/api/v1", authenticated)
        .nest("/api/v1", public)
        .with_state(state)
}
