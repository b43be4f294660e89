use axum::Json;
use axum::extract::{Extension, State};
use axum::http::StatusCode;
use tessera_application::RegisterUserInput;
use tessera_core::{AppError, AppResult, UserIdentity, required_field};
use tessera_domain::{User, UserId};
use tower_sessions::Session;

use crate::dto::auth::{LoginRequest, RegisterRequest, SessionUserResponse};
use crate::error::ApiResult;
use crate::state::AppState;

/// Session key holding the authenticated identity.
pub const SESSION_USER_KEY: &str = "tessera.user";

/// Returns the repository id for the authenticated user.
pub fn identity_user_id(identity: &UserIdentity) -> AppResult<UserId> {
    uuid::Uuid::parse_str(identity.subject())
        .map(UserId::from_uuid)
        .map_err(|error| AppError::Internal(format!("corrupt session subject: {error}")))
}

fn identity_for(user: &User) -> UserIdentity {
    UserIdentity::new(
        user.id().to_string(),
        user.username().as_str(),
        user.display_name().as_str(),
    )
}

async fn start_session(session: &Session, identity: &UserIdentity) -> AppResult<()> {
    session
        .cycle_id()
        .await
        .map_err(|error| AppError::Internal(format!("failed to cycle session id: {error}")))?;

    session
        .insert(SESSION_USER_KEY, identity)
        .await
        .map_err(|error| AppError::Internal(format!("failed to persist session: {error}")))
}

/// Establishes a session for an existing user.
///
/// Credential verification is delegated to the fronting identity provider;
/// this endpoint only binds an already-authenticated username to a session.
pub async fn login_handler(
    State(state): State<AppState>,
    session: Session,
    Json(payload): Json<LoginRequest>,
) -> ApiResult<Json<SessionUserResponse>> {
    let username = required_field(payload.username.as_deref(), "username")?;

    let user = state
        .user_service
        .find_by_username(username.as_str())
        .await?
        .ok_or_else(|| AppError::Unauthorized(format!("unknown username '{username}'")))?;

    let identity = identity_for(&user);
    start_session(&session, &identity).await?;

    Ok(Json(SessionUserResponse::from(&identity)))
}

/// Registers a user and starts their session.
pub async fn register_handler(
    State(state): State<AppState>,
    session: Session,
    Json(payload): Json<RegisterRequest>,
) -> ApiResult<(StatusCode, Json<SessionUserResponse>)> {
    let user = state
        .user_service
        .register(RegisterUserInput {
            username: payload.username,
            display_name: payload.display_name,
            email: payload.email,
        })
        .await?;

    let identity = identity_for(&user);
    start_session(&session, &identity).await?;

    Ok((StatusCode::CREATED, Json(SessionUserResponse::from(&identity))))
}

/// Ends the current session.
pub async fn logout_handler(session: Session) -> ApiResult<StatusCode> {
    session
        .delete()
        .await
        .map_err(|error| AppError::Internal(format!("failed to clear session: {error}")))?;

    Ok(StatusCode::NO_CONTENT)
}

/// Returns the authenticated session user.
pub async fn me_handler(
    Extension(identity): Extension<UserIdentity>,
) -> ApiResult<Json<SessionUserResponse>> {
    Ok(Json(SessionUserResponse::from(&identity)))
}
