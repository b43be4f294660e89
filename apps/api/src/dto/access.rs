use serde::{Deserialize, Serialize};
use tessera_domain::Role;
use ts_rs::TS;

/// Incoming payload for the ad hoc role assignment endpoint.
#[derive(Debug, Deserialize, TS)]
#[ts(
    export,
    export_to = "../../../../packages/api-types/src/generated/assign-role-request.ts"
)]
pub struct AssignRoleRequest {
    pub role_name: Option<String>,
    pub access_level: Option<String>,
    #[serde(default)]
    pub organization_ids: Vec<String>,
    #[serde(default)]
    pub branch_ids: Vec<String>,
}

/// Incoming payload for the create-or-update role endpoint.
#[derive(Debug, Deserialize, TS)]
#[ts(
    export,
    export_to = "../../../../packages/api-types/src/generated/create-or-update-role-request.ts"
)]
pub struct CreateOrUpdateRoleRequest {
    pub role_name: Option<String>,
    pub access_level: Option<String>,
    pub role_type: Option<String>,
    #[serde(default)]
    pub organization_ids: Vec<String>,
    #[serde(default)]
    pub branch_ids: Vec<String>,
    #[serde(default)]
    pub use_existing: bool,
}

/// Incoming payload for full role-set replacement.
#[derive(Debug, Deserialize, TS)]
#[ts(
    export,
    export_to = "../../../../packages/api-types/src/generated/replace-user-roles-request.ts"
)]
pub struct ReplaceUserRolesRequest {
    #[serde(default)]
    pub role_ids: Vec<String>,
}

/// Names and ids of the roles the current user holds.
#[derive(Debug, Serialize, TS)]
#[ts(
    export,
    export_to = "../../../../packages/api-types/src/generated/user-roles-response.ts"
)]
pub struct UserRolesResponse {
    pub roles: Vec<String>,
    pub role_ids: Vec<String>,
}

impl From<Vec<Role>> for UserRolesResponse {
    fn from(value: Vec<Role>) -> Self {
        Self {
            roles: value
                .iter()
                .map(|role| role.name().as_str().to_owned())
                .collect(),
            role_ids: value.iter().map(|role| role.id().to_string()).collect(),
        }
    }
}

/// Confirmation payload for single-role mutations.
#[derive(Debug, Serialize, TS)]
#[ts(
    export,
    export_to = "../../../../packages/api-types/src/generated/role-mutation-response.ts"
)]
pub struct RoleMutationResponse {
    pub message: String,
    pub role_id: String,
    pub role_name: String,
}

/// Confirmation payload for role-set replacement.
#[derive(Debug, Serialize, TS)]
#[ts(
    export,
    export_to = "../../../../packages/api-types/src/generated/replace-user-roles-response.ts"
)]
pub struct ReplaceUserRolesResponse {
    pub message: String,
    pub role_ids: Vec<String>,
}
