//! Infrastructure adapters for application ports.

#![forbid(unsafe_code)]

mod in_memory_access_repository;
mod in_memory_membership_repository;
mod in_memory_onboarding_repository;
mod in_memory_user_repository;
mod postgres_access_repository;
mod postgres_membership_repository;
mod postgres_onboarding_repository;
mod postgres_user_repository;

pub use in_memory_access_repository::InMemoryAccessRepository;
pub use in_memory_membership_repository::InMemoryMembershipRepository;
pub use in_memory_onboarding_repository::InMemoryOnboardingRepository;
pub use in_memory_user_repository::InMemoryUserRepository;
pub use postgres_access_repository::PostgresAccessRepository;
pub use postgres_membership_repository::PostgresMembershipRepository;
pub use postgres_onboarding_repository::PostgresOnboardingRepository;
pub use postgres_user_repository::PostgresUserRepository;
