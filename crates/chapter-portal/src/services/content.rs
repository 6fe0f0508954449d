//! Editable page copy with built-in fallbacks for the well-known sections.

use std::sync::Arc;

use crate::auth::Actor;
use crate::authz::{self, Tier};
use crate::error::ApiError;
use crate::models::content::{
    default_section, ContentSection, SectionUpdate, SectionView, DEFAULT_SECTIONS,
};
use crate::store::{PortalStore, StoreError};

#[derive(Clone)]
pub struct ContentService {
    store: Arc<dyn PortalStore>,
}

impl ContentService {
    pub fn new(store: Arc<dyn PortalStore>) -> Self {
        Self { store }
    }

    /// Active sections ordered by `order_index`. Public.
    pub async fn list_sections(&self) -> Result<Vec<ContentSection>, ApiError> {
        Ok(self.store.list_active_sections().await?)
    }

    /// The stored section for `key`, or its default when one exists.
    pub async fn get_section(&self, key: &str) -> Result<SectionView, ApiError> {
        if let Some(section) = self.store.get_active_section(key).await? {
            return Ok(section.into());
        }
        default_section(key)
            .map(SectionView::from)
            .ok_or(ApiError::NotFound)
    }

    pub async fn update_sections(
        &self,
        actor: &Actor,
        updates: Vec<SectionUpdate>,
    ) -> Result<Vec<ContentSection>, ApiError> {
        authz::require_role(actor, Tier::Editor)?;

        if updates.is_empty() {
            return Ok(Vec::new());
        }
        let updates = updates
            .into_iter()
            .map(|update| {
                let title = update.title.trim();
                if title.is_empty() {
                    return Err(ApiError::validation(format!(
                        "title is required for section {}",
                        update.id
                    )));
                }
                Ok(SectionUpdate {
                    id: update.id,
                    title: title.to_string(),
                    content: update.content,
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        match self.store.update_sections(&updates).await {
            Ok(sections) => {
                tracing::info!(count = sections.len(), editor = %actor.user_id, "Content sections updated");
                Ok(sections)
            }
            Err(StoreError::MissingRow { id, .. }) => {
                tracing::debug!(section_id = %id, "Content batch rejected: unknown section");
                Err(ApiError::NotFound)
            }
            Err(err) => Err(err.into()),
        }
    }

    /// Insert the built-in sections that have no row yet.
    pub async fn seed_defaults(&self) -> Result<u64, StoreError> {
        let inserted = self.store.seed_sections(DEFAULT_SECTIONS).await?;
        if inserted > 0 {
            tracing::info!(inserted, "Seeded default content sections");
        }
        Ok(inserted)
    }
}
