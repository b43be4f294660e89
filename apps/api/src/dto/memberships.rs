use serde::{Deserialize, Serialize};
use serde_json::Value;
use tessera_domain::MembershipTier;
use ts_rs::TS;

fn default_active() -> bool {
    true
}

fn default_payment_plan() -> Value {
    Value::Object(serde_json::Map::new())
}

/// Incoming payload for membership creation.
#[derive(Debug, Deserialize, TS)]
#[ts(
    export,
    export_to = "../../../../packages/api-types/src/generated/create-membership-request.ts"
)]
pub struct CreateMembershipRequest {
    pub subscription_tier_id: Option<String>,
    pub invite: Option<String>,
    #[serde(default)]
    pub role_ids: Vec<String>,
}

/// Incoming payload for subscription tier creation.
#[derive(Debug, Deserialize, TS)]
#[ts(
    export,
    export_to = "../../../../packages/api-types/src/generated/create-subscription-tier-request.ts"
)]
pub struct CreateSubscriptionTierRequest {
    pub title: Option<String>,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub price_minor: i64,
    #[serde(default = "default_active")]
    pub is_active: bool,
    #[serde(default = "default_payment_plan")]
    pub payment_plan: Value,
    #[serde(default)]
    pub role_template_ids: Vec<String>,
}

/// Confirmation payload for membership mutations.
#[derive(Debug, Serialize, TS)]
#[ts(
    export,
    export_to = "../../../../packages/api-types/src/generated/membership-mutation-response.ts"
)]
pub struct MembershipMutationResponse {
    pub message: String,
    pub membership_id: String,
    pub status: String,
}

/// API representation of a membership record.
#[derive(Debug, Serialize, TS)]
#[ts(
    export,
    export_to = "../../../../packages/api-types/src/generated/membership-response.ts"
)]
pub struct MembershipResponse {
    pub membership_id: String,
    pub subscription_tier_id: String,
    pub status: String,
    pub invite: Option<String>,
    pub role_ids: Vec<String>,
}

impl From<MembershipTier> for MembershipResponse {
    fn from(value: MembershipTier) -> Self {
        Self {
            membership_id: value.id().to_string(),
            subscription_tier_id: value.subscription_tier_id().to_string(),
            status: value.status().as_str().to_owned(),
            invite: value.invite().map(|invite| invite.as_str().to_owned()),
            role_ids: value
                .role_ids()
                .iter()
                .map(|role_id| role_id.to_string())
                .collect(),
        }
    }
}

/// Confirmation payload for tier-template expansion.
#[derive(Debug, Serialize, TS)]
#[ts(
    export,
    export_to = "../../../../packages/api-types/src/generated/assign-roles-from-tier-response.ts"
)]
pub struct AssignRolesFromTierResponse {
    pub message: String,
    pub role_ids: Vec<String>,
    pub role_names: Vec<String>,
}

/// Confirmation payload for subscription tier creation.
#[derive(Debug, Serialize, TS)]
#[ts(
    export,
    export_to = "../../../../packages/api-types/src/generated/subscription-tier-response.ts"
)]
pub struct SubscriptionTierResponse {
    pub message: String,
    pub tier_id: String,
    pub title: String,
    pub role_template_ids: Vec<String>,
}
