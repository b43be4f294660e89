use std::sync::Arc;

use tessera_core::{AppError, AppResult};
use tessera_domain::{
    CompletedOnboardingStep, CompletedStepId, Onboarding, OnboardingId, OnboardingStep,
    OnboardingStepId, RoleId, StepStatus, UserId,
};

use crate::onboarding_ports::OnboardingRepository;
use crate::role_ports::RoleRepository;

/// Application service for role-owned onboarding workflows.
#[derive(Clone)]
pub struct OnboardingService {
    repository: Arc<dyn OnboardingRepository>,
    roles: Arc<dyn RoleRepository>,
}

impl OnboardingService {
    /// Creates a new service from required dependencies.
    #[must_use]
    pub fn new(repository: Arc<dyn OnboardingRepository>, roles: Arc<dyn RoleRepository>) -> Self {
        Self { repository, roles }
    }

    /// Creates a named workflow owned by an existing role.
    pub async fn create_workflow(&self, name: &str, role_id: RoleId) -> AppResult<Onboarding> {
        if self.roles.get(role_id).await?.is_none() {
            return Err(AppError::NotFound(format!("role '{role_id}'")));
        }

        if self.repository.find_workflow_by_name(name).await?.is_some() {
            return Err(AppError::Conflict(format!(
                "onboarding workflow '{name}' already exists"
            )));
        }

        let onboarding = Onboarding::new(OnboardingId::new(), name, role_id)?;
        self.repository.insert_workflow(onboarding).await
    }

    /// Adds a step to an existing workflow.
    pub async fn add_step(
        &self,
        onboarding_id: OnboardingId,
        title: &str,
        level: i32,
        is_optional: bool,
    ) -> AppResult<OnboardingStep> {
        if self.repository.get_workflow(onboarding_id).await?.is_none() {
            return Err(AppError::NotFound(format!(
                "onboarding workflow '{onboarding_id}'"
            )));
        }

        let step = OnboardingStep::new(
            OnboardingStepId::new(),
            onboarding_id,
            title,
            level,
            is_optional,
        )?;
        self.repository.insert_step(step).await
    }

    /// Returns a workflow's steps ordered by level.
    pub async fn workflow_steps(
        &self,
        onboarding_id: OnboardingId,
    ) -> AppResult<Vec<OnboardingStep>> {
        if self.repository.get_workflow(onboarding_id).await?.is_none() {
            return Err(AppError::NotFound(format!(
                "onboarding workflow '{onboarding_id}'"
            )));
        }

        self.repository.steps_for_workflow(onboarding_id).await
    }

    /// Records a user finishing a step.
    ///
    /// Only optional steps may be skipped.
    pub async fn complete_step(
        &self,
        user_id: UserId,
        step_id: OnboardingStepId,
        status: StepStatus,
    ) -> AppResult<CompletedOnboardingStep> {
        let step = self
            .repository
            .get_step(step_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("onboarding step '{step_id}'")))?;

        if status == StepStatus::Skipped && !step.is_optional() {
            return Err(AppError::Validation(format!(
                "step '{}' is required and cannot be skipped",
                step.title().as_str()
            )));
        }

        let completion =
            CompletedOnboardingStep::new(CompletedStepId::new(), user_id, step_id, status);
        self.repository.insert_completion(completion).await
    }

    /// Returns a user's completion records within one workflow.
    pub async fn user_progress(
        &self,
        user_id: UserId,
        onboarding_id: OnboardingId,
    ) -> AppResult<Vec<CompletedOnboardingStep>> {
        if self.repository.get_workflow(onboarding_id).await?.is_none() {
            return Err(AppError::NotFound(format!(
                "onboarding workflow '{onboarding_id}'"
            )));
        }

        self.repository
            .completions_for_user(user_id, onboarding_id)
            .await
    }
}
