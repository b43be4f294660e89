use async_trait::async_trait;

use tessera_core::AppResult;
use tessera_domain::{
    CompletedOnboardingStep, Onboarding, OnboardingId, OnboardingStep, OnboardingStepId, UserId,
};

/// Repository port for onboarding workflows and completion records.
#[async_trait]
pub trait OnboardingRepository: Send + Sync {
    /// Stores a new workflow; fails with a conflict on duplicate names.
    async fn insert_workflow(&self, onboarding: Onboarding) -> AppResult<Onboarding>;

    /// Returns a workflow by id.
    async fn get_workflow(&self, onboarding_id: OnboardingId) -> AppResult<Option<Onboarding>>;

    /// Returns a workflow by unique name.
    async fn find_workflow_by_name(&self, name: &str) -> AppResult<Option<Onboarding>>;

    /// Stores a new step.
    async fn insert_step(&self, step: OnboardingStep) -> AppResult<OnboardingStep>;

    /// Returns a step by id.
    async fn get_step(&self, step_id: OnboardingStepId) -> AppResult<Option<OnboardingStep>>;

    /// Returns a workflow's steps ordered by level.
    async fn steps_for_workflow(
        &self,
        onboarding_id: OnboardingId,
    ) -> AppResult<Vec<OnboardingStep>>;

    /// Stores a completion record.
    async fn insert_completion(
        &self,
        completion: CompletedOnboardingStep,
    ) -> AppResult<CompletedOnboardingStep>;

    /// Returns a user's completion records within one workflow.
    async fn completions_for_user(
        &self,
        user_id: UserId,
        onboarding_id: OnboardingId,
    ) -> AppResult<Vec<CompletedOnboardingStep>>;
}
