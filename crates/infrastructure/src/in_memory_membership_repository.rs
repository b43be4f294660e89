use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use tessera_application::{MembershipRepository, SubscriptionTierRepository};
use tessera_core::{AppError, AppResult};
use tessera_domain::{
    MembershipStatus, MembershipTier, MembershipTierId, RoleId, SubscriptionTier,
    SubscriptionTierId, UserId,
};

/// In-memory implementation of the membership and tier repository ports.
#[derive(Debug, Default)]
pub struct InMemoryMembershipRepository {
    memberships: RwLock<HashMap<MembershipTierId, MembershipTier>>,
    tiers: RwLock<HashMap<SubscriptionTierId, SubscriptionTier>>,
}

impl InMemoryMembershipRepository {
    /// Creates an empty in-memory repository.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl MembershipRepository for InMemoryMembershipRepository {
    async fn insert(&self, membership: MembershipTier) -> AppResult<MembershipTier> {
        // The write lock is held across the active-membership scan and the
        // insert, enforcing one active membership per user.
        let mut memberships = self.memberships.write().await;

        let has_active = memberships.values().any(|stored| {
            stored.user_id() == membership.user_id()
                && stored.status() == MembershipStatus::Active
        });
        if has_active {
            return Err(AppError::Conflict(format!(
                "user '{}' already has an active membership",
                membership.user_id()
            )));
        }

        memberships.insert(membership.id(), membership.clone());
        Ok(membership)
    }

    async fn get(&self, membership_id: MembershipTierId) -> AppResult<Option<MembershipTier>> {
        Ok(self.memberships.read().await.get(&membership_id).cloned())
    }

    async fn set_status(
        &self,
        membership_id: MembershipTierId,
        status: MembershipStatus,
    ) -> AppResult<MembershipTier> {
        let mut memberships = self.memberships.write().await;
        let membership = memberships
            .get_mut(&membership_id)
            .ok_or_else(|| AppError::NotFound(format!("membership '{membership_id}'")))?;

        if status == MembershipStatus::Cancelled {
            membership.cancel();
        }

        Ok(membership.clone())
    }

    async fn active_for_user(&self, user_id: UserId) -> AppResult<Option<MembershipTier>> {
        Ok(self
            .memberships
            .read()
            .await
            .values()
            .find(|membership| {
                membership.user_id() == user_id
                    && membership.status() == MembershipStatus::Active
            })
            .cloned())
    }

    async fn add_role(&self, membership_id: MembershipTierId, role_id: RoleId) -> AppResult<()> {
        let mut memberships = self.memberships.write().await;
        let membership = memberships
            .get_mut(&membership_id)
            .ok_or_else(|| AppError::NotFound(format!("membership '{membership_id}'")))?;
        membership.grant_role(role_id);
        Ok(())
    }
}

#[async_trait]
impl SubscriptionTierRepository for InMemoryMembershipRepository {
    async fn insert(&self, tier: SubscriptionTier) -> AppResult<SubscriptionTier> {
        self.tiers.write().await.insert(tier.id(), tier.clone());
        Ok(tier)
    }

    async fn get(&self, tier_id: SubscriptionTierId) -> AppResult<Option<SubscriptionTier>> {
        Ok(self.tiers.read().await.get(&tier_id).cloned())
    }
}

#[cfg(test)]
mod tests {
    use tessera_application::MembershipRepository;
    use tessera_core::{AppError, AppResult};
    use tessera_domain::{
        MembershipStatus, MembershipTier, MembershipTierId, SubscriptionTierId, UserId,
    };

    use super::InMemoryMembershipRepository;

    fn membership(user_id: UserId) -> MembershipTier {
        MembershipTier::new(
            MembershipTierId::new(),
            user_id,
            SubscriptionTierId::new(),
            None,
            Vec::new(),
        )
    }

    #[tokio::test]
    async fn second_active_membership_conflicts() -> AppResult<()> {
        let repository = InMemoryMembershipRepository::new();
        let user_id = UserId::new();

        repository.insert(membership(user_id)).await?;
        let second = repository.insert(membership(user_id)).await;

        assert!(matches!(second, Err(AppError::Conflict(_))));
        Ok(())
    }

    #[tokio::test]
    async fn cancelled_membership_frees_the_active_slot() -> AppResult<()> {
        let repository = InMemoryMembershipRepository::new();
        let user_id = UserId::new();

        let first = repository.insert(membership(user_id)).await?;
        repository
            .set_status(first.id(), MembershipStatus::Cancelled)
            .await?;

        let second = repository.insert(membership(user_id)).await;
        assert!(second.is_ok());
        assert!(repository.active_for_user(user_id).await?.is_some());
        Ok(())
    }
}
