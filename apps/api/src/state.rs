use std::sync::Arc;

use tessera_application::{
    MembershipOperations, OnboardingService, RoleService, SubscriptionAdminService, UserService,
};

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub role_service: RoleService,
    pub membership_operations: Arc<dyn MembershipOperations>,
    pub subscription_admin_service: SubscriptionAdminService,
    pub onboarding_service: OnboardingService,
    pub user_service: UserService,
}
