use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use tessera_application::OnboardingRepository;
use tessera_core::{AppError, AppResult};
use tessera_domain::{
    CompletedOnboardingStep, CompletedStepId, Onboarding, OnboardingId, OnboardingStep,
    OnboardingStepId, UserId,
};

/// In-memory implementation of the onboarding repository port.
#[derive(Debug, Default)]
pub struct InMemoryOnboardingRepository {
    workflows: RwLock<HashMap<OnboardingId, Onboarding>>,
    steps: RwLock<HashMap<OnboardingStepId, OnboardingStep>>,
    completions: RwLock<HashMap<CompletedStepId, CompletedOnboardingStep>>,
}

impl InMemoryOnboardingRepository {
    /// Creates an empty in-memory repository.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl OnboardingRepository for InMemoryOnboardingRepository {
    async fn insert_workflow(&self, onboarding: Onboarding) -> AppResult<Onboarding> {
        let mut workflows = self.workflows.write().await;

        if workflows
            .values()
            .any(|stored| stored.name() == onboarding.name())
        {
            return Err(AppError::Conflict(format!(
                "onboarding workflow '{}' already exists",
                onboarding.name()
            )));
        }

        workflows.insert(onboarding.id(), onboarding.clone());
        Ok(onboarding)
    }

    async fn get_workflow(&self, onboarding_id: OnboardingId) -> AppResult<Option<Onboarding>> {
        Ok(self.workflows.read().await.get(&onboarding_id).cloned())
    }

    async fn find_workflow_by_name(&self, name: &str) -> AppResult<Option<Onboarding>> {
        Ok(self
            .workflows
            .read()
            .await
            .values()
            .find(|workflow| workflow.name().as_str() == name)
            .cloned())
    }

    async fn insert_step(&self, step: OnboardingStep) -> AppResult<OnboardingStep> {
        self.steps.write().await.insert(step.id(), step.clone());
        Ok(step)
    }

    async fn get_step(&self, step_id: OnboardingStepId) -> AppResult<Option<OnboardingStep>> {
        Ok(self.steps.read().await.get(&step_id).cloned())
    }

    async fn steps_for_workflow(
        &self,
        onboarding_id: OnboardingId,
    ) -> AppResult<Vec<OnboardingStep>> {
        let steps = self.steps.read().await;
        let mut listed: Vec<OnboardingStep> = steps
            .values()
            .filter(|step| step.onboarding_id() == onboarding_id)
            .cloned()
            .collect();
        listed.sort_by_key(OnboardingStep::level);
        Ok(listed)
    }

    async fn insert_completion(
        &self,
        completion: CompletedOnboardingStep,
    ) -> AppResult<CompletedOnboardingStep> {
        self.completions
            .write()
            .await
            .insert(completion.id(), completion.clone());
        Ok(completion)
    }

    async fn completions_for_user(
        &self,
        user_id: UserId,
        onboarding_id: OnboardingId,
    ) -> AppResult<Vec<CompletedOnboardingStep>> {
        let step_ids: Vec<OnboardingStepId> = self
            .steps_for_workflow(onboarding_id)
            .await?
            .iter()
            .map(OnboardingStep::id)
            .collect();

        Ok(self
            .completions
            .read()
            .await
            .values()
            .filter(|completion| {
                completion.user_id() == user_id && step_ids.contains(&completion.step_id())
            })
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use tessera_application::OnboardingRepository;
    use tessera_core::{AppError, AppResult};
    use tessera_domain::{Onboarding, OnboardingId, OnboardingStep, OnboardingStepId, RoleId};

    use super::InMemoryOnboardingRepository;

    #[tokio::test]
    async fn duplicate_workflow_name_conflicts() -> AppResult<()> {
        let repository = InMemoryOnboardingRepository::new();

        let first = Onboarding::new(OnboardingId::new(), "staff-intake", RoleId::new())?;
        let second = Onboarding::new(OnboardingId::new(), "staff-intake", RoleId::new())?;

        repository.insert_workflow(first).await?;
        let result = repository.insert_workflow(second).await;

        assert!(matches!(result, Err(AppError::Conflict(_))));
        Ok(())
    }

    #[tokio::test]
    async fn steps_list_in_level_order() -> AppResult<()> {
        let repository = InMemoryOnboardingRepository::new();
        let workflow = Onboarding::new(OnboardingId::new(), "staff-intake", RoleId::new())?;
        let workflow = repository.insert_workflow(workflow).await?;

        repository
            .insert_step(OnboardingStep::new(
                OnboardingStepId::new(),
                workflow.id(),
                "Second",
                2,
                false,
            )?)
            .await?;
        repository
            .insert_step(OnboardingStep::new(
                OnboardingStepId::new(),
                workflow.id(),
                "First",
                1,
                false,
            )?)
            .await?;

        let steps = repository.steps_for_workflow(workflow.id()).await?;
        let titles: Vec<&str> = steps.iter().map(|step| step.title().as_str()).collect();
        assert_eq!(titles, ["First", "Second"]);
        Ok(())
    }
}
