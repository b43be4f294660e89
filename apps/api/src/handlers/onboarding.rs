use axum::Json;
use axum::extract::{Extension, Path, State};
use axum::http::StatusCode;
use uuid::Uuid;

use tessera_core::{UserIdentity, required_field};
use tessera_domain::{OnboardingId, OnboardingStepId, RoleId, StepStatus};

use crate::auth::identity_user_id;
use crate::dto::onboarding::{
    AddOnboardingStepRequest, CompleteOnboardingStepRequest, CompletedStepResponse,
    CreateOnboardingRequest, OnboardingResponse, OnboardingStepResponse,
};
use crate::dto::parse_id;
use crate::error::ApiResult;
use crate::state::AppState;

pub async fn create_onboarding_handler(
    State(state): State<AppState>,
    Json(payload): Json<CreateOnboardingRequest>,
) -> ApiResult<(StatusCode, Json<OnboardingResponse>)> {
    let name = required_field(payload.name.as_deref(), "name")?;
    let role_id = required_field(payload.role_id.as_deref(), "role_id")?;
    let role_id = RoleId::from_uuid(parse_id(role_id.as_str(), "role_id")?);

    let workflow = state
        .onboarding_service
        .create_workflow(name.as_str(), role_id)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(OnboardingResponse::created(workflow)),
    ))
}

pub async fn add_step_handler(
    State(state): State<AppState>,
    Path(onboarding_id): Path<Uuid>,
    Json(payload): Json<AddOnboardingStepRequest>,
) -> ApiResult<(StatusCode, Json<OnboardingStepResponse>)> {
    let title = required_field(payload.title.as_deref(), "title")?;

    let step = state
        .onboarding_service
        .add_step(
            OnboardingId::from_uuid(onboarding_id),
            title.as_str(),
            payload.level,
            payload.is_optional,
        )
        .await?;

    Ok((StatusCode::CREATED, Json(OnboardingStepResponse::from(step))))
}

pub async fn list_steps_handler(
    State(state): State<AppState>,
    Path(onboarding_id): Path<Uuid>,
) -> ApiResult<Json<Vec<OnboardingStepResponse>>> {
    let steps = state
        .onboarding_service
        .workflow_steps(OnboardingId::from_uuid(onboarding_id))
        .await?
        .into_iter()
        .map(OnboardingStepResponse::from)
        .collect();

    Ok(Json(steps))
}

pub async fn complete_step_handler(
    State(state): State<AppState>,
    Extension(identity): Extension<UserIdentity>,
    Path(step_id): Path<Uuid>,
    Json(payload): Json<CompleteOnboardingStepRequest>,
) -> ApiResult<(StatusCode, Json<CompletedStepResponse>)> {
    let user_id = identity_user_id(&identity)?;
    let status: StepStatus = payload
        .status
        .as_deref()
        .unwrap_or("completed")
        .parse()?;

    let completion = state
        .onboarding_service
        .complete_step(user_id, OnboardingStepId::from_uuid(step_id), status)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(CompletedStepResponse::from(completion)),
    ))
}

pub async fn progress_handler(
    State(state): State<AppState>,
    Extension(identity): Extension<UserIdentity>,
    Path(onboarding_id): Path<Uuid>,
) -> ApiResult<Json<Vec<CompletedStepResponse>>> {
    let user_id = identity_user_id(&identity)?;
    let completions = state
        .onboarding_service
        .user_progress(user_id, OnboardingId::from_uuid(onboarding_id))
        .await?
        .into_iter()
        .map(CompletedStepResponse::from)
        .collect();

    Ok(Json(completions))
}
