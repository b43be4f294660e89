//! Subscription tiers and membership records.

use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tessera_core::{AppError, AppResult, NonEmptyString};
use uuid::Uuid;

use crate::role::{RoleId, RoleTemplateId};
use crate::user::UserId;

/// Unique identifier for a subscription tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SubscriptionTierId(Uuid);

impl SubscriptionTierId {
    /// Creates a new random tier identifier.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Creates a tier identifier from an existing UUID value.
    #[must_use]
    pub fn from_uuid(value: Uuid) -> Self {
        Self(value)
    }

    /// Returns the underlying UUID value.
    #[must_use]
    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for SubscriptionTierId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for SubscriptionTierId {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(formatter, "{}", self.0)
    }
}

/// Purchasable tier granting a set of role templates on activation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubscriptionTier {
    id: SubscriptionTierId,
    title: NonEmptyString,
    description: String,
    price_minor: i64,
    is_active: bool,
    payment_plan: Value,
    role_template_ids: Vec<RoleTemplateId>,
}

impl SubscriptionTier {
    /// Creates a validated subscription tier.
    ///
    /// The price is in minor currency units; the payment plan is opaque
    /// metadata passed through to billing collaborators.
    pub fn new(
        id: SubscriptionTierId,
        title: impl Into<String>,
        description: impl Into<String>,
        price_minor: i64,
        is_active: bool,
        payment_plan: Value,
        role_template_ids: Vec<RoleTemplateId>,
    ) -> AppResult<Self> {
        if price_minor < 0 {
            return Err(AppError::Validation(
                "tier price must not be negative".to_owned(),
            ));
        }

        let mut role_template_ids = role_template_ids;
        role_template_ids.sort_unstable();
        role_template_ids.dedup();

        Ok(Self {
            id,
            title: NonEmptyString::new(title)?,
            description: description.into(),
            price_minor,
            is_active,
            payment_plan,
            role_template_ids,
        })
    }

    /// Returns the tier identifier.
    #[must_use]
    pub fn id(&self) -> SubscriptionTierId {
        self.id
    }

    /// Returns the tier title.
    #[must_use]
    pub fn title(&self) -> &NonEmptyString {
        &self.title
    }

    /// Returns the tier description.
    #[must_use]
    pub fn description(&self) -> &str {
        self.description.as_str()
    }

    /// Returns the price in minor currency units.
    #[must_use]
    pub fn price_minor(&self) -> i64 {
        self.price_minor
    }

    /// Returns whether the tier is currently purchasable.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.is_active
    }

    /// Returns the opaque payment-plan metadata.
    #[must_use]
    pub fn payment_plan(&self) -> &Value {
        &self.payment_plan
    }

    /// Returns the role templates granted by this tier.
    #[must_use]
    pub fn role_template_ids(&self) -> &[RoleTemplateId] {
        &self.role_template_ids
    }
}

/// Unique identifier for a membership record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct MembershipTierId(Uuid);

impl MembershipTierId {
    /// Creates a new random membership identifier.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Creates a membership identifier from an existing UUID value.
    #[must_use]
    pub fn from_uuid(value: Uuid) -> Self {
        Self(value)
    }

    /// Returns the underlying UUID value.
    #[must_use]
    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for MembershipTierId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for MembershipTierId {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(formatter, "{}", self.0)
    }
}

/// Lifecycle state of a membership.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MembershipStatus {
    /// Membership is in force.
    Active,
    /// Membership has been cancelled.
    Cancelled,
}

impl MembershipStatus {
    /// Returns a stable storage value for this status.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Cancelled => "cancelled",
        }
    }
}

impl FromStr for MembershipStatus {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "active" => Ok(Self::Active),
            "cancelled" => Ok(Self::Cancelled),
            _ => Err(AppError::Validation(format!(
                "unknown membership status '{value}'"
            ))),
        }
    }
}

/// A user's instance of subscribing to a tier.
///
/// Created in `active` status. Roles populate lazily through tier
/// expansion, not at creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MembershipTier {
    id: MembershipTierId,
    user_id: UserId,
    subscription_tier_id: SubscriptionTierId,
    status: MembershipStatus,
    invite: Option<NonEmptyString>,
    role_ids: Vec<RoleId>,
}

impl MembershipTier {
    /// Creates an active membership with an explicit role set.
    #[must_use]
    pub fn new(
        id: MembershipTierId,
        user_id: UserId,
        subscription_tier_id: SubscriptionTierId,
        invite: Option<NonEmptyString>,
        role_ids: Vec<RoleId>,
    ) -> Self {
        Self {
            id,
            user_id,
            subscription_tier_id,
            status: MembershipStatus::Active,
            invite,
            role_ids,
        }
    }

    /// Restores a membership from stored state.
    #[must_use]
    pub fn from_parts(
        id: MembershipTierId,
        user_id: UserId,
        subscription_tier_id: SubscriptionTierId,
        status: MembershipStatus,
        invite: Option<NonEmptyString>,
        role_ids: Vec<RoleId>,
    ) -> Self {
        Self {
            id,
            user_id,
            subscription_tier_id,
            status,
            invite,
            role_ids,
        }
    }

    /// Transitions the membership to cancelled.
    ///
    /// Returns `false` when the membership was already cancelled; the
    /// transition is a no-op in that case.
    pub fn cancel(&mut self) -> bool {
        if self.status == MembershipStatus::Cancelled {
            return false;
        }

        self.status = MembershipStatus::Cancelled;
        true
    }

    /// Adds a role grant to this membership.
    ///
    /// Grants are a list, not a set: tier expansion may legitimately add
    /// several roles stamped from the same template.
    pub fn grant_role(&mut self, role_id: RoleId) {
        self.role_ids.push(role_id);
    }

    /// Returns the membership identifier.
    #[must_use]
    pub fn id(&self) -> MembershipTierId {
        self.id
    }

    /// Returns the owning user.
    #[must_use]
    pub fn user_id(&self) -> UserId {
        self.user_id
    }

    /// Returns the subscribed tier.
    #[must_use]
    pub fn subscription_tier_id(&self) -> SubscriptionTierId {
        self.subscription_tier_id
    }

    /// Returns the lifecycle status.
    #[must_use]
    pub fn status(&self) -> MembershipStatus {
        self.status
    }

    /// Returns the optional invite reference.
    #[must_use]
    pub fn invite(&self) -> Option<&NonEmptyString> {
        self.invite.as_ref()
    }

    /// Returns the granted roles.
    #[must_use]
    pub fn role_ids(&self) -> &[RoleId] {
        &self.role_ids
    }
}
