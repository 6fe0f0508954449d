pub mod jwt;

use axum::extract::{FromRequestParts, Request, State};
use axum::http::request::Parts;
use axum::http::HeaderMap;
use axum::middleware::Next;
use axum::response::Response;
use uuid::Uuid;

use crate::error::ApiError;
use crate::models::profile::{Profile, Role};
use crate::state::AppState;

/// The signed-in identity behind a request, passed explicitly to every service call.
#[derive(Debug, Clone)]
pub struct Actor {
    pub user_id: Uuid,
    /// Email asserted by the identity provider.
    pub email: Option<String>,
    /// `None` until the user registers a profile.
    pub profile: Option<Profile>,
}

impl Actor {
    pub fn role(&self) -> Option<Role> {
        self.profile.as_ref().map(|p| p.role)
    }
}

/// Extract the token from an `Authorization: Bearer <token>` header.
fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get("authorization")?.to_str().ok()?;
    let (scheme, token) = value.split_at_checked(7)?;
    if scheme.eq_ignore_ascii_case("Bearer ") && !token.is_empty() {
        Some(token)
    } else {
        None
    }
}

/// Auth middleware: verifies the bearer token and loads the caller's profile.
pub async fn require_auth(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = bearer_token(request.headers()).ok_or(ApiError::Unauthorized)?;
    let claims = jwt::validate_token(
        token,
        &state.config.jwt_secret,
        state.config.jwt_audience.as_deref(),
    )?;

    let profile = state.store.get_profile(claims.sub).await?;

    request.extensions_mut().insert(Actor {
        user_id: claims.sub,
        email: claims.email,
        profile,
    });
    Ok(next.run(request).await)
}

impl<S: Send + Sync> FromRequestParts<S> for Actor {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Actor>()
            .cloned()
            .ok_or(ApiError::Unauthorized)
    }
}
