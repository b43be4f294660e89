pub mod health;
pub mod memberships;
pub mod onboarding;
pub mod roles;
