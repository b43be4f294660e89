//! Role-owned onboarding workflows and per-user completion records.

use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tessera_core::{AppError, AppResult, NonEmptyString};
use uuid::Uuid;

use crate::role::RoleId;
use crate::user::UserId;

/// Unique identifier for an onboarding workflow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct OnboardingId(Uuid);

impl OnboardingId {
    /// Creates a new random workflow identifier.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Creates a workflow identifier from an existing UUID value.
    #[must_use]
    pub fn from_uuid(value: Uuid) -> Self {
        Self(value)
    }

    /// Returns the underlying UUID value.
    #[must_use]
    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for OnboardingId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for OnboardingId {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(formatter, "{}", self.0)
    }
}

/// Unique identifier for an onboarding step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct OnboardingStepId(Uuid);

impl OnboardingStepId {
    /// Creates a new random step identifier.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Creates a step identifier from an existing UUID value.
    #[must_use]
    pub fn from_uuid(value: Uuid) -> Self {
        Self(value)
    }

    /// Returns the underlying UUID value.
    #[must_use]
    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for OnboardingStepId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for OnboardingStepId {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(formatter, "{}", self.0)
    }
}

/// Named onboarding workflow owned by a role.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Onboarding {
    id: OnboardingId,
    name: NonEmptyString,
    role_id: RoleId,
}

impl Onboarding {
    /// Creates a validated workflow.
    pub fn new(id: OnboardingId, name: impl Into<String>, role_id: RoleId) -> AppResult<Self> {
        Ok(Self {
            id,
            name: NonEmptyString::new(name)?,
            role_id,
        })
    }

    /// Returns the workflow identifier.
    #[must_use]
    pub fn id(&self) -> OnboardingId {
        self.id
    }

    /// Returns the unique workflow name.
    #[must_use]
    pub fn name(&self) -> &NonEmptyString {
        &self.name
    }

    /// Returns the owning role.
    #[must_use]
    pub fn role_id(&self) -> RoleId {
        self.role_id
    }
}

/// Ordered, optionally-skippable unit of an onboarding workflow.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OnboardingStep {
    id: OnboardingStepId,
    onboarding_id: OnboardingId,
    title: NonEmptyString,
    level: i32,
    is_optional: bool,
}

impl OnboardingStep {
    /// Creates a validated step.
    pub fn new(
        id: OnboardingStepId,
        onboarding_id: OnboardingId,
        title: impl Into<String>,
        level: i32,
        is_optional: bool,
    ) -> AppResult<Self> {
        Ok(Self {
            id,
            onboarding_id,
            title: NonEmptyString::new(title)?,
            level,
            is_optional,
        })
    }

    /// Returns the step identifier.
    #[must_use]
    pub fn id(&self) -> OnboardingStepId {
        self.id
    }

    /// Returns the owning workflow.
    #[must_use]
    pub fn onboarding_id(&self) -> OnboardingId {
        self.onboarding_id
    }

    /// Returns the step title.
    #[must_use]
    pub fn title(&self) -> &NonEmptyString {
        &self.title
    }

    /// Returns the ordering level within the workflow.
    #[must_use]
    pub fn level(&self) -> i32 {
        self.level
    }

    /// Returns whether the step may be skipped.
    #[must_use]
    pub fn is_optional(&self) -> bool {
        self.is_optional
    }
}

/// Outcome recorded when a user finishes a step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepStatus {
    /// Step was completed.
    Completed,
    /// Optional step was skipped.
    Skipped,
}

impl StepStatus {
    /// Returns a stable storage value for this status.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Completed => "completed",
            Self::Skipped => "skipped",
        }
    }
}

impl FromStr for StepStatus {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "completed" => Ok(Self::Completed),
            "skipped" => Ok(Self::Skipped),
            _ => Err(AppError::Validation(format!(
                "unknown step status '{value}'"
            ))),
        }
    }
}

/// Unique identifier for a completion record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CompletedStepId(Uuid);

impl CompletedStepId {
    /// Creates a new random completion identifier.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Creates a completion identifier from an existing UUID value.
    #[must_use]
    pub fn from_uuid(value: Uuid) -> Self {
        Self(value)
    }

    /// Returns the underlying UUID value.
    #[must_use]
    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for CompletedStepId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for CompletedStepId {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(formatter, "{}", self.0)
    }
}

/// Record of a user finishing (or skipping) a step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompletedOnboardingStep {
    id: CompletedStepId,
    user_id: UserId,
    step_id: OnboardingStepId,
    status: StepStatus,
}

impl CompletedOnboardingStep {
    /// Creates a completion record.
    #[must_use]
    pub fn new(
        id: CompletedStepId,
        user_id: UserId,
        step_id: OnboardingStepId,
        status: StepStatus,
    ) -> Self {
        Self {
            id,
            user_id,
            step_id,
            status,
        }
    }

    /// Returns the completion identifier.
    #[must_use]
    pub fn id(&self) -> CompletedStepId {
        self.id
    }

    /// Returns the user who finished the step.
    #[must_use]
    pub fn user_id(&self) -> UserId {
        self.user_id
    }

    /// Returns the finished step.
    #[must_use]
    pub fn step_id(&self) -> OnboardingStepId {
        self.step_id
    }

    /// Returns the recorded outcome.
    #[must_use]
    pub fn status(&self) -> StepStatus {
        self.status
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use crate::role::RoleId;

    use super::{Onboarding, OnboardingId, OnboardingStep, OnboardingStepId, StepStatus};

    #[test]
    fn workflow_requires_name() {
        assert!(Onboarding::new(OnboardingId::new(), " ", RoleId::new()).is_err());
    }

    #[test]
    fn step_keeps_level_and_optional_flag() {
        let step = OnboardingStep::new(
            OnboardingStepId::new(),
            OnboardingId::new(),
            "Verify email",
            2,
            true,
        );
        assert!(step.is_ok_and(|value| value.level() == 2 && value.is_optional()));
    }

    #[test]
    fn step_status_roundtrip_storage_value() {
        for status in [StepStatus::Completed, StepStatus::Skipped] {
            let restored = StepStatus::from_str(status.as_str());
            assert!(restored.is_ok_and(|value| value == status));
        }
    }
}
