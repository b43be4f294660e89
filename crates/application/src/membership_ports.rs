use async_trait::async_trait;
use serde_json::Value;

use tessera_core::AppResult;
use tessera_domain::{
    MembershipStatus, MembershipTier, MembershipTierId, RoleId, RoleTemplateId, SubscriptionTier,
    SubscriptionTierId, UserId,
};

/// Input payload for membership creation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateMembershipInput {
    /// Subscribing user.
    pub user_id: UserId,
    /// Tier being subscribed to.
    pub subscription_tier_id: SubscriptionTierId,
    /// Optional invite reference.
    pub invite: Option<String>,
    /// Explicit initial role grants; callers pass an empty vec by default.
    pub role_ids: Vec<RoleId>,
}

/// Input payload for subscription tier creation.
#[derive(Debug, Clone, PartialEq)]
pub struct CreateSubscriptionTierInput {
    /// Tier title; must be non-empty.
    pub title: String,
    /// Tier description.
    pub description: String,
    /// Price in minor currency units.
    pub price_minor: i64,
    /// Whether the tier is purchasable.
    pub is_active: bool,
    /// Opaque payment-plan metadata.
    pub payment_plan: Value,
    /// Role templates the tier grants; unknown ids are dropped.
    pub role_template_ids: Vec<RoleTemplateId>,
}

/// Repository port for membership records.
#[async_trait]
pub trait MembershipRepository: Send + Sync {
    /// Stores a new membership.
    ///
    /// Fails with a conflict when the user already holds an active
    /// membership; one active membership per user is enforced here rather
    /// than left to "first wins" reads.
    async fn insert(&self, membership: MembershipTier) -> AppResult<MembershipTier>;

    /// Returns a membership by id.
    async fn get(&self, membership_id: MembershipTierId) -> AppResult<Option<MembershipTier>>;

    /// Rewrites the membership status and returns the updated record.
    async fn set_status(
        &self,
        membership_id: MembershipTierId,
        status: MembershipStatus,
    ) -> AppResult<MembershipTier>;

    /// Returns the user's active membership, if any.
    async fn active_for_user(&self, user_id: UserId) -> AppResult<Option<MembershipTier>>;

    /// Adds a role grant to a membership.
    async fn add_role(&self, membership_id: MembershipTierId, role_id: RoleId) -> AppResult<()>;
}

/// Repository port for subscription tiers.
#[async_trait]
pub trait SubscriptionTierRepository: Send + Sync {
    /// Stores a new tier.
    async fn insert(&self, tier: SubscriptionTier) -> AppResult<SubscriptionTier>;

    /// Returns a tier by id.
    async fn get(&self, tier_id: SubscriptionTierId) -> AppResult<Option<SubscriptionTier>>;
}
