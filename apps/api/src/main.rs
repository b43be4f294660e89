//! Tessera API composition root.

#![forbid(unsafe_code)]

mod api_config;
mod api_router;
mod auth;
mod dto;
mod error;
mod handlers;
mod middleware;
mod state;

use std::sync::Arc;

use sqlx::postgres::PgPoolOptions;
use tessera_application::{
    MembershipOperations, MembershipService, OnboardingService, RoleService,
    SubscriptionAdminService, UserService,
};
use tessera_core::AppError;
use tessera_infrastructure::{
    PostgresAccessRepository, PostgresMembershipRepository, PostgresOnboardingRepository,
    PostgresUserRepository,
};
use tower_sessions::cookie::SameSite;
use tower_sessions::cookie::time::Duration;
use tower_sessions::{Expiry, SessionManagerLayer};
use tower_sessions_sqlx_store::PostgresStore;
use tracing::info;

use crate::api_config::{ApiConfig, init_tracing};
use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<(), AppError> {
    dotenvy::dotenv().ok();
    init_tracing();

    let config = ApiConfig::load()?;

    let pool = PgPoolOptions::new()
        .max_connections(10)
        .connect(&config.database_url)
        .await
        .map_err(|error| AppError::Internal(format!("failed to connect to database: {error}")))?;

    sqlx::migrate!("../../crates/infrastructure/migrations")
        .run(&pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to run migrations: {error}")))?;

    if config.migrate_only {
        info!("database migrations applied successfully");
        return Ok(());
    }

    let session_store = PostgresStore::new(pool.clone())
        .with_table_name("tower_sessions")
        .map_err(|error| {
            AppError::Validation(format!("invalid session table name configuration: {error}"))
        })?;
    session_store.migrate().await.map_err(|error| {
        AppError::Internal(format!("failed to initialize session store: {error}"))
    })?;

    let session_layer = SessionManagerLayer::new(session_store)
        .with_secure(config.cookie_secure)
        .with_same_site(SameSite::Lax)
        .with_http_only(true)
        .with_expiry(Expiry::OnInactivity(Duration::minutes(30)));

    let access_repository = Arc::new(PostgresAccessRepository::new(pool.clone()));
    let membership_repository = Arc::new(PostgresMembershipRepository::new(pool.clone()));
    let onboarding_repository = Arc::new(PostgresOnboardingRepository::new(pool.clone()));
    let user_repository = Arc::new(PostgresUserRepository::new(pool.clone()));

    let role_service = RoleService::new(
        access_repository.clone(),
        access_repository.clone(),
        access_repository.clone(),
        access_repository.clone(),
    );

    let membership_service = MembershipService::new(
        membership_repository.clone(),
        membership_repository.clone(),
        access_repository.clone(),
        access_repository.clone(),
        user_repository.clone(),
    );

    // The extension implementation is selected here; it composes the default
    // membership operations with subscription tier administration.
    let subscription_admin_service = SubscriptionAdminService::new(
        membership_service,
        membership_repository.clone(),
        access_repository.clone(),
    );
    let membership_operations: Arc<dyn MembershipOperations> =
        Arc::new(subscription_admin_service.clone());

    let onboarding_service =
        OnboardingService::new(onboarding_repository, access_repository.clone());
    let user_service = UserService::new(user_repository, config.registration_mode);

    let app_state = AppState {
        role_service,
        membership_operations,
        subscription_admin_service,
        onboarding_service,
        user_service,
    };

    let app = api_router::build_router(app_state, &config.frontend_url, session_layer)?;

    let address = config.socket_address()?;
    let listener = tokio::net::TcpListener::bind(address)
        .await
        .map_err(|error| AppError::Internal(format!("failed to bind listener: {error}")))?;

    info!(%address, "tessera-api listening");

    axum::serve(listener, app)
        .await
        .map_err(|error| AppError::Internal(format!("api server error: {error}")))
}
