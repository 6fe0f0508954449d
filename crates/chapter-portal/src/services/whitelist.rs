use std::sync::Arc;

use uuid::Uuid;

use crate::auth::Actor;
use crate::authz::{self, Tier};
use crate::error::ApiError;
use crate::models::whitelist::{normalize_email, WhitelistedEmail};
use crate::store::{PortalStore, StoreError};

/// Allow-list of emails permitted to register a profile.
#[derive(Clone)]
pub struct WhitelistService {
    store: Arc<dyn PortalStore>,
}

impl WhitelistService {
    pub fn new(store: Arc<dyn PortalStore>) -> Self {
        Self { store }
    }

    pub async fn list(&self, actor: &Actor) -> Result<Vec<WhitelistedEmail>, ApiError> {
        authz::require_role(actor, Tier::Editor)?;
        Ok(self.store.list_whitelist().await?)
    }

    pub async fn add(&self, actor: &Actor, email: &str) -> Result<WhitelistedEmail, ApiError> {
        authz::require_role(actor, Tier::Editor)?;

        let email = normalize_email(email);
        if email.is_empty() {
            return Err(ApiError::validation("email is required"));
        }

        match self.store.insert_whitelist(&email, actor.user_id).await {
            Ok(entry) => {
                tracing::info!(entry_id = %entry.id, added_by = %actor.user_id, "Email whitelisted");
                Ok(entry)
            }
            Err(StoreError::UniqueViolation(_)) => {
                Err(ApiError::Conflict("email is already whitelisted".to_string()))
            }
            Err(err) => Err(err.into()),
        }
    }

    pub async fn remove(&self, actor: &Actor, id: Uuid) -> Result<(), ApiError> {
        authz::require_role(actor, Tier::Editor)?;

        if !self.store.delete_whitelist(id).await? {
            return Err(ApiError::NotFound);
        }
        tracing::info!(entry_id = %id, removed_by = %actor.user_id, "Email removed from whitelist");
        Ok(())
    }

    pub async fn is_whitelisted(&self, email: &str) -> Result<bool, ApiError> {
        let email = normalize_email(email);
        if email.is_empty() {
            return Ok(false);
        }
        Ok(self.store.find_whitelisted(&email).await?.is_some())
    }
}
