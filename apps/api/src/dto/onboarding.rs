use serde::{Deserialize, Serialize};
use tessera_domain::{CompletedOnboardingStep, Onboarding, OnboardingStep};
use ts_rs::TS;

/// Incoming payload for workflow creation.
#[derive(Debug, Deserialize, TS)]
#[ts(
    export,
    export_to = "../../../../packages/api-types/src/generated/create-onboarding-request.ts"
)]
pub struct CreateOnboardingRequest {
    pub name: Option<String>,
    pub role_id: Option<String>,
}

/// Incoming payload for step creation.
#[derive(Debug, Deserialize, TS)]
#[ts(
    export,
    export_to = "../../../../packages/api-types/src/generated/add-onboarding-step-request.ts"
)]
pub struct AddOnboardingStepRequest {
    pub title: Option<String>,
    #[serde(default)]
    pub level: i32,
    #[serde(default)]
    pub is_optional: bool,
}

/// Incoming payload for step completion.
#[derive(Debug, Deserialize, TS)]
#[ts(
    export,
    export_to = "../../../../packages/api-types/src/generated/complete-onboarding-step-request.ts"
)]
pub struct CompleteOnboardingStepRequest {
    pub status: Option<String>,
}

/// API representation of a workflow.
#[derive(Debug, Serialize, TS)]
#[ts(
    export,
    export_to = "../../../../packages/api-types/src/generated/onboarding-response.ts"
)]
pub struct OnboardingResponse {
    pub message: String,
    pub onboarding_id: String,
    pub name: String,
    pub role_id: String,
}

impl OnboardingResponse {
    pub fn created(value: Onboarding) -> Self {
        Self {
            message: "Onboarding workflow created successfully".to_owned(),
            onboarding_id: value.id().to_string(),
            name: value.name().as_str().to_owned(),
            role_id: value.role_id().to_string(),
        }
    }
}

/// API representation of a workflow step.
#[derive(Debug, Serialize, TS)]
#[ts(
    export,
    export_to = "../../../../packages/api-types/src/generated/onboarding-step-response.ts"
)]
pub struct OnboardingStepResponse {
    pub step_id: String,
    pub title: String,
    pub level: i32,
    pub is_optional: bool,
}

impl From<OnboardingStep> for OnboardingStepResponse {
    fn from(value: OnboardingStep) -> Self {
        Self {
            step_id: value.id().to_string(),
            title: value.title().as_str().to_owned(),
            level: value.level(),
            is_optional: value.is_optional(),
        }
    }
}

/// API representation of a completion record.
#[derive(Debug, Serialize, TS)]
#[ts(
    export,
    export_to = "../../../../packages/api-types/src/generated/completed-step-response.ts"
)]
pub struct CompletedStepResponse {
    pub completion_id: String,
    pub step_id: String,
    pub status: String,
}

impl From<CompletedOnboardingStep> for CompletedStepResponse {
    fn from(value: CompletedOnboardingStep) -> Self {
        Self {
            completion_id: value.id().to_string(),
            step_id: value.step_id().to_string(),
            status: value.status().as_str().to_owned(),
        }
    }
}
