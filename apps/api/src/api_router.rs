use axum::Router;
use axum::http::HeaderValue;
use axum::http::Method;
use axum::http::header::CONTENT_TYPE;
use axum::middleware::from_fn;
use axum::routing::{get, post};
use tessera_core::AppError;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tower_sessions::SessionManagerLayer;
use tower_sessions_sqlx_store::PostgresStore;

use crate::state::AppState;
use crate::{auth, handlers, middleware};

pub fn build_router(
    app_state: AppState,
    frontend_url: &str,
    session_layer: SessionManagerLayer<PostgresStore>,
) -> Result<Router, AppError> {
    let protected_routes = Router::new()
        .route(
            "/api/user-roles",
            get(handlers::roles::list_user_roles_handler)
                .put(handlers::roles::replace_user_roles_handler),
        )
        .route("/api/assign-role", post(handlers::roles::assign_role_handler))
        .route(
            "/api/roles",
            post(handlers::roles::create_or_update_role_handler),
        )
        .route(
            "/api/memberships",
            post(handlers::memberships::create_membership_handler),
        )
        .route(
            "/api/memberships/active",
            get(handlers::memberships::active_membership_handler),
        )
        .route(
            "/api/memberships/{membership_id}/cancel",
            post(handlers::memberships::cancel_membership_handler),
        )
        .route(
            "/api/memberships/{membership_id}/assign-roles",
            post(handlers::memberships::assign_roles_from_tier_handler),
        )
        .route(
            "/api/subscription-tiers",
            post(handlers::memberships::create_subscription_tier_handler),
        )
        .route(
            "/api/onboarding",
            post(handlers::onboarding::create_onboarding_handler),
        )
        .route(
            "/api/onboarding/{onboarding_id}/steps",
            get(handlers::onboarding::list_steps_handler)
                .post(handlers::onboarding::add_step_handler),
        )
        .route(
            "/api/onboarding/{onboarding_id}/progress",
            get(handlers::onboarding::progress_handler),
        )
        .route(
            "/api/onboarding/steps/{step_id}/complete",
            post(handlers::onboarding::complete_step_handler),
        )
        .route("/auth/me", get(auth::me_handler))
        .route_layer(from_fn(middleware::require_auth));

    let cors_layer = CorsLayer::new()
        .allow_origin(
            HeaderValue::from_str(frontend_url)
                .map_err(|error| AppError::Internal(format!("invalid FRONTEND_URL: {error}")))?,
        )
        .allow_credentials(true)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([CONTENT_TYPE]);

    let router = Router::new()
        .route("/health", get(handlers::health::health_handler))
        .route("/auth/login", post(auth::login_handler))
        .route("/auth/register", post(auth::register_handler))
        .route("/auth/logout", post(auth::logout_handler))
        .merge(protected_routes)
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer)
        .layer(session_layer)
        .with_state(app_state);

    Ok(router)
}
