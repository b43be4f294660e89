//! Application services and ports.

#![forbid(unsafe_code)]

mod membership_ports;
mod membership_service;
mod onboarding_ports;
mod onboarding_service;
mod role_ports;
mod role_service;
mod user_ports;
mod user_service;

pub use membership_ports::{
    CreateMembershipInput, CreateSubscriptionTierInput, MembershipRepository,
    SubscriptionTierRepository,
};
pub use membership_service::{MembershipOperations, MembershipService, SubscriptionAdminService};
pub use onboarding_ports::OnboardingRepository;
pub use onboarding_service::OnboardingService;
pub use role_ports::{
    AssignRoleInput, CreateOrUpdateRoleInput, DirectoryRepository, RoleChange, RoleRepository,
    RoleTemplateRepository, UserRoleRepository,
};
pub use role_service::RoleService;
pub use user_ports::{RegisterUserInput, UserRepository};
pub use user_service::UserService;
