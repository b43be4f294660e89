use axum::Json;
use axum::extract::{Extension, State};
use axum::http::StatusCode;

use tessera_application::{AssignRoleInput, CreateOrUpdateRoleInput};
use tessera_core::UserIdentity;
use tessera_domain::{BranchId, OrganizationId, RoleId};

use crate::auth::identity_user_id;
use crate::dto::access::{
    AssignRoleRequest, CreateOrUpdateRoleRequest, ReplaceUserRolesRequest,
    ReplaceUserRolesResponse, RoleMutationResponse, UserRolesResponse,
};
use crate::dto::parse_ids;
use crate::error::ApiResult;
use crate::state::AppState;

pub async fn list_user_roles_handler(
    State(state): State<AppState>,
    Extension(identity): Extension<UserIdentity>,
) -> ApiResult<Json<UserRolesResponse>> {
    let user_id = identity_user_id(&identity)?;
    let roles = state.role_service.user_roles(user_id).await?;

    Ok(Json(UserRolesResponse::from(roles)))
}

pub async fn assign_role_handler(
    State(state): State<AppState>,
    Extension(identity): Extension<UserIdentity>,
    Json(payload): Json<AssignRoleRequest>,
) -> ApiResult<Json<RoleMutationResponse>> {
    let user_id = identity_user_id(&identity)?;
    let organization_ids = parse_ids(&payload.organization_ids, "organization id")?
        .into_iter()
        .map(OrganizationId::from_uuid)
        .collect();
    let branch_ids = parse_ids(&payload.branch_ids, "branch id")?
        .into_iter()
        .map(BranchId::from_uuid)
        .collect();

    let role = state
        .role_service
        .assign_role(
            user_id,
            AssignRoleInput {
                role_name: payload.role_name,
                access_level: payload.access_level,
                organization_ids,
                branch_ids,
            },
        )
        .await?;

    Ok(Json(RoleMutationResponse {
        message: "Role assigned successfully".to_owned(),
        role_id: role.id().to_string(),
        role_name: role.name().as_str().to_owned(),
    }))
}

pub async fn create_or_update_role_handler(
    State(state): State<AppState>,
    Json(payload): Json<CreateOrUpdateRoleRequest>,
) -> ApiResult<Json<RoleMutationResponse>> {
    let organization_ids = parse_ids(&payload.organization_ids, "organization id")?
        .into_iter()
        .map(OrganizationId::from_uuid)
        .collect();
    let branch_ids = parse_ids(&payload.branch_ids, "branch id")?
        .into_iter()
        .map(BranchId::from_uuid)
        .collect();

    let change = state
        .role_service
        .create_or_update_role(CreateOrUpdateRoleInput {
            role_name: payload.role_name,
            access_level: payload.access_level,
            role_type: payload.role_type,
            organization_ids,
            branch_ids,
            use_existing: payload.use_existing,
        })
        .await?;

    let message = if change.created {
        "Role created successfully"
    } else {
        "Role updated successfully"
    };

    Ok(Json(RoleMutationResponse {
        message: message.to_owned(),
        role_id: change.role.id().to_string(),
        role_name: change.role.name().as_str().to_owned(),
    }))
}

pub async fn replace_user_roles_handler(
    State(state): State<AppState>,
    Extension(identity): Extension<UserIdentity>,
    Json(payload): Json<ReplaceUserRolesRequest>,
) -> ApiResult<(StatusCode, Json<ReplaceUserRolesResponse>)> {
    let user_id = identity_user_id(&identity)?;
    let role_ids: Vec<RoleId> = parse_ids(&payload.role_ids, "role id")?
        .into_iter()
        .map(RoleId::from_uuid)
        .collect();

    let resolved = state
        .role_service
        .replace_user_roles(user_id, role_ids)
        .await?;

    Ok((
        StatusCode::OK,
        Json(ReplaceUserRolesResponse {
            message: "User roles updated successfully".to_owned(),
            role_ids: resolved.iter().map(|role| role.id().to_string()).collect(),
        }),
    ))
}
