//! Permission tiers: the only place role sets are spelled out.

use crate::auth::Actor;
use crate::error::ApiError;
use crate::models::profile::{Profile, Role};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Tier {
    /// Reviewing submissions and documents, the user directory, and role changes.
    Review,
    /// Whitelist management and page copy.
    Editor,
}

impl Tier {
    pub fn roles(self) -> &'static [Role] {
        match self {
            Self::Review => &[Role::Admin, Role::Teacher, Role::Officer],
            Self::Editor => &[Role::Admin, Role::Officer],
        }
    }

    pub fn allows(self, role: Role) -> bool {
        self.roles().contains(&role)
    }
}

/// Succeeds with the actor's profile when its role is in the tier.
///
/// An actor without a profile is treated as unauthenticated.
pub fn require_role(actor: &Actor, tier: Tier) -> Result<&Profile, ApiError> {
    let profile = actor.profile.as_ref().ok_or(ApiError::Unauthorized)?;
    if tier.allows(profile.role) {
        Ok(profile)
    } else {
        tracing::debug!(user_id = %actor.user_id, role = %profile.role, ?tier, "Role check failed");
        Err(ApiError::Forbidden)
    }
}

pub fn has_tier(actor: &Actor, tier: Tier) -> bool {
    actor.role().is_some_and(|role| tier.allows(role))
}
