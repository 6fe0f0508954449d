//! Profile bootstrap and role management.

use std::str::FromStr;
use std::sync::Arc;

use uuid::Uuid;

use crate::auth::Actor;
use crate::authz::{self, Tier};
use crate::error::ApiError;
use crate::models::non_blank;
use crate::models::profile::{NewProfile, Profile, RegisterProfileRequest, Role, SchoolYear};
use crate::models::whitelist::normalize_email;
use crate::services::whitelist::WhitelistService;
use crate::store::{PortalStore, StoreError};

#[derive(Clone)]
pub struct UserService {
    store: Arc<dyn PortalStore>,
    whitelist: WhitelistService,
}

impl UserService {
    pub fn new(store: Arc<dyn PortalStore>, whitelist: WhitelistService) -> Self {
        Self { store, whitelist }
    }

    /// Create the caller's profile as a student. Only whitelisted emails may register.
    pub async fn register(
        &self,
        actor: &Actor,
        req: RegisterProfileRequest,
    ) -> Result<Profile, ApiError> {
        if actor.profile.is_some() {
            return Err(ApiError::Conflict("profile already exists".to_string()));
        }

        let email = actor.email.as_deref().ok_or(ApiError::Forbidden)?;
        if !self.whitelist.is_whitelisted(email).await? {
            tracing::warn!(user_id = %actor.user_id, "Registration attempt from non-whitelisted email");
            return Err(ApiError::Forbidden);
        }

        let full_name = req.full_name.trim();
        if full_name.is_empty() {
            return Err(ApiError::validation("full_name is required"));
        }
        let school_year = non_blank(req.school_year.as_deref())
            .as_deref()
            .map(SchoolYear::from_str)
            .transpose()
            .map_err(|e| ApiError::validation(e.to_string()))?;

        let created = self
            .store
            .insert_profile(NewProfile {
                id: actor.user_id,
                email: normalize_email(email),
                full_name: full_name.to_string(),
                school_year,
                role: Role::Student,
            })
            .await;

        match created {
            Ok(profile) => {
                tracing::info!(user_id = %profile.id, "Profile registered");
                Ok(profile)
            }
            Err(StoreError::UniqueViolation(_)) => {
                Err(ApiError::Conflict("profile already exists".to_string()))
            }
            Err(err) => Err(err.into()),
        }
    }

    pub fn me(&self, actor: &Actor) -> Result<Profile, ApiError> {
        actor.profile.clone().ok_or(ApiError::NotFound)
    }

    pub async fn list_profiles(&self, actor: &Actor) -> Result<Vec<Profile>, ApiError> {
        authz::require_role(actor, Tier::Review)?;
        Ok(self.store.list_profiles().await?)
    }

    /// Overwrite another user's role. The check is flat: any reviewer may grant any role.
    pub async fn set_role(
        &self,
        actor: &Actor,
        target: Uuid,
        role: &str,
    ) -> Result<Profile, ApiError> {
        authz::require_role(actor, Tier::Review)?;
        let role: Role = role
            .parse()
            .map_err(|e: crate::models::ParseEnumError| ApiError::validation(e.to_string()))?;

        let profile = self
            .store
            .set_role(target, role)
            .await?
            .ok_or(ApiError::NotFound)?;

        tracing::info!(target_user = %target, changed_by = %actor.user_id, %role, "Role updated");
        Ok(profile)
    }
}
