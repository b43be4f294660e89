use axum::Json;
use axum::extract::{Extension, Path, State};
use axum::http::StatusCode;
use uuid::Uuid;

use tessera_application::{CreateMembershipInput, CreateSubscriptionTierInput};
use tessera_core::{AppError, UserIdentity, required_field};
use tessera_domain::{MembershipTierId, RoleId, RoleTemplateId, SubscriptionTierId};

use crate::auth::identity_user_id;
use crate::dto::memberships::{
    AssignRolesFromTierResponse, CreateMembershipRequest, CreateSubscriptionTierRequest,
    MembershipMutationResponse, MembershipResponse, SubscriptionTierResponse,
};
use crate::dto::{parse_id, parse_ids};
use crate::error::ApiResult;
use crate::state::AppState;

pub async fn create_membership_handler(
    State(state): State<AppState>,
    Extension(identity): Extension<UserIdentity>,
    Json(payload): Json<CreateMembershipRequest>,
) -> ApiResult<(StatusCode, Json<MembershipMutationResponse>)> {
    let user_id = identity_user_id(&identity)?;
    let tier_id = required_field(
        payload.subscription_tier_id.as_deref(),
        "subscription_tier_id",
    )?;
    let subscription_tier_id =
        SubscriptionTierId::from_uuid(parse_id(tier_id.as_str(), "subscription_tier_id")?);
    let role_ids: Vec<RoleId> = parse_ids(&payload.role_ids, "role id")?
        .into_iter()
        .map(RoleId::from_uuid)
        .collect();

    let membership = state
        .membership_operations
        .create_membership(CreateMembershipInput {
            user_id,
            subscription_tier_id,
            invite: payload.invite,
            role_ids,
        })
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(MembershipMutationResponse {
            message: "Membership created successfully".to_owned(),
            membership_id: membership.id().to_string(),
            status: membership.status().as_str().to_owned(),
        }),
    ))
}

pub async fn cancel_membership_handler(
    State(state): State<AppState>,
    Path(membership_id): Path<Uuid>,
) -> ApiResult<Json<MembershipMutationResponse>> {
    let membership = state
        .membership_operations
        .cancel_membership(MembershipTierId::from_uuid(membership_id))
        .await?;

    Ok(Json(MembershipMutationResponse {
        message: "Membership cancelled successfully".to_owned(),
        membership_id: membership.id().to_string(),
        status: membership.status().as_str().to_owned(),
    }))
}

pub async fn active_membership_handler(
    State(state): State<AppState>,
    Extension(identity): Extension<UserIdentity>,
) -> ApiResult<Json<MembershipResponse>> {
    let user_id = identity_user_id(&identity)?;
    let membership = state
        .membership_operations
        .active_membership(user_id)
        .await?
        .ok_or_else(|| {
            AppError::NotFound(format!("no active membership for user '{user_id}'"))
        })?;

    Ok(Json(MembershipResponse::from(membership)))
}

pub async fn assign_roles_from_tier_handler(
    State(state): State<AppState>,
    Path(membership_id): Path<Uuid>,
) -> ApiResult<Json<AssignRolesFromTierResponse>> {
    let roles = state
        .membership_operations
        .assign_roles_from_tier(MembershipTierId::from_uuid(membership_id))
        .await?;

    Ok(Json(AssignRolesFromTierResponse {
        message: "Roles assigned from subscription tier".to_owned(),
        role_ids: roles.iter().map(|role| role.id().to_string()).collect(),
        role_names: roles
            .iter()
            .map(|role| role.name().as_str().to_owned())
            .collect(),
    }))
}

pub async fn create_subscription_tier_handler(
    State(state): State<AppState>,
    Json(payload): Json<CreateSubscriptionTierRequest>,
) -> ApiResult<(StatusCode, Json<SubscriptionTierResponse>)> {
    let role_template_ids: Vec<RoleTemplateId> =
        parse_ids(&payload.role_template_ids, "role template id")?
            .into_iter()
            .map(RoleTemplateId::from_uuid)
            .collect();

    let tier = state
        .subscription_admin_service
        .create_subscription_tier(CreateSubscriptionTierInput {
            title: payload.title.unwrap_or_default(),
            description: payload.description,
            price_minor: payload.price_minor,
            is_active: payload.is_active,
            payment_plan: payload.payment_plan,
            role_template_ids,
        })
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(SubscriptionTierResponse {
            message: "Subscription tier created successfully".to_owned(),
            tier_id: tier.id().to_string(),
            title: tier.title().as_str().to_owned(),
            role_template_ids: tier
                .role_template_ids()
                .iter()
                .map(|template_id| template_id.to_string())
                .collect(),
        }),
    ))
}
