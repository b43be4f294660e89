use serde::{Deserialize, Serialize};
use tessera_core::UserIdentity;
use ts_rs::TS;

/// Incoming payload for session login.
#[derive(Debug, Deserialize, TS)]
#[ts(
    export,
    export_to = "../../../../packages/api-types/src/generated/login-request.ts"
)]
pub struct LoginRequest {
    pub username: Option<String>,
}

/// Incoming payload for user registration.
#[derive(Debug, Deserialize, TS)]
#[ts(
    export,
    export_to = "../../../../packages/api-types/src/generated/register-request.ts"
)]
pub struct RegisterRequest {
    pub username: Option<String>,
    pub display_name: Option<String>,
    pub email: Option<String>,
}

/// API representation of the authenticated session user.
#[derive(Debug, Serialize, TS)]
#[ts(
    export,
    export_to = "../../../../packages/api-types/src/generated/session-user-response.ts"
)]
pub struct SessionUserResponse {
    pub subject: String,
    pub username: String,
    pub display_name: String,
}

impl From<&UserIdentity> for SessionUserResponse {
    fn from(value: &UserIdentity) -> Self {
        Self {
            subject: value.subject().to_owned(),
            username: value.username().to_owned(),
            display_name: value.display_name().to_owned(),
        }
    }
}
