use async_trait::async_trait;
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use tessera_application::OnboardingRepository;
use tessera_core::{AppError, AppResult};
use tessera_domain::{
    CompletedOnboardingStep, CompletedStepId, Onboarding, OnboardingId, OnboardingStep,
    OnboardingStepId, RoleId, StepStatus, UserId,
};

const WORKFLOW_NAME_CONSTRAINT: &str = "onboardings_name_key";

/// PostgreSQL-backed repository for onboarding workflows.
#[derive(Clone)]
pub struct PostgresOnboardingRepository {
    pool: PgPool,
}

impl PostgresOnboardingRepository {
    /// Creates a repository with the provided connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, FromRow)]
struct WorkflowRow {
    id: Uuid,
    name: String,
    role_id: Uuid,
}

#[derive(Debug, FromRow)]
struct StepRow {
    id: Uuid,
    onboarding_id: Uuid,
    title: String,
    level: i32,
    is_optional: bool,
}

#[derive(Debug, FromRow)]
struct CompletionRow {
    id: Uuid,
    user_id: Uuid,
    step_id: Uuid,
    status: String,
}

fn workflow_from_row(row: WorkflowRow) -> AppResult<Onboarding> {
    Onboarding::new(
        OnboardingId::from_uuid(row.id),
        row.name,
        RoleId::from_uuid(row.role_id),
    )
}

fn step_from_row(row: StepRow) -> AppResult<OnboardingStep> {
    OnboardingStep::new(
        OnboardingStepId::from_uuid(row.id),
        OnboardingId::from_uuid(row.onboarding_id),
        row.title,
        row.level,
        row.is_optional,
    )
}

fn completion_from_row(row: CompletionRow) -> AppResult<CompletedOnboardingStep> {
    let status: StepStatus = row.status.parse()?;
    Ok(CompletedOnboardingStep::new(
        CompletedStepId::from_uuid(row.id),
        UserId::from_uuid(row.user_id),
        OnboardingStepId::from_uuid(row.step_id),
        status,
    ))
}

fn map_workflow_insert_error(error: sqlx::Error, name: &str) -> AppError {
    if let sqlx::Error::Database(database_error) = &error {
        if database_error.constraint() == Some(WORKFLOW_NAME_CONSTRAINT) {
            return AppError::Conflict(format!("onboarding workflow '{name}' already exists"));
        }
    }

    AppError::Internal(format!("failed to persist onboarding workflow: {error}"))
}

#[async_trait]
impl OnboardingRepository for PostgresOnboardingRepository {
    async fn insert_workflow(&self, onboarding: Onboarding) -> AppResult<Onboarding> {
        sqlx::query(
            r#"
            INSERT INTO onboardings (id, name, role_id)
            VALUES ($1, $2, $3)
            "#,
        )
        .bind(onboarding.id().as_uuid())
        .bind(onboarding.name().as_str())
        .bind(onboarding.role_id().as_uuid())
        .execute(&self.pool)
        .await
        .map_err(|error| map_workflow_insert_error(error, onboarding.name().as_str()))?;

        Ok(onboarding)
    }

    async fn get_workflow(&self, onboarding_id: OnboardingId) -> AppResult<Option<Onboarding>> {
        let row = sqlx::query_as::<_, WorkflowRow>(
            r#"
            SELECT id, name, role_id
            FROM onboardings
            WHERE id = $1
            "#,
        )
        .bind(onboarding_id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(|error| {
            AppError::Internal(format!("failed to load onboarding workflow: {error}"))
        })?;

        row.map(workflow_from_row).transpose()
    }

    async fn find_workflow_by_name(&self, name: &str) -> AppResult<Option<Onboarding>> {
        let row = sqlx::query_as::<_, WorkflowRow>(
            r#"
            SELECT id, name, role_id
            FROM onboardings
            WHERE name = $1
            "#,
        )
        .bind(name)
        .fetch_optional(&self.pool)
        .await
        .map_err(|error| {
            AppError::Internal(format!("failed to find onboarding workflow: {error}"))
        })?;

        row.map(workflow_from_row).transpose()
    }

    async fn insert_step(&self, step: OnboardingStep) -> AppResult<OnboardingStep> {
        sqlx::query(
            r#"
            INSERT INTO onboarding_steps (id, onboarding_id, title, level, is_optional)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(step.id().as_uuid())
        .bind(step.onboarding_id().as_uuid())
        .bind(step.title().as_str())
        .bind(step.level())
        .bind(step.is_optional())
        .execute(&self.pool)
        .await
        .map_err(|error| {
            AppError::Internal(format!("failed to persist onboarding step: {error}"))
        })?;

        Ok(step)
    }

    async fn get_step(&self, step_id: OnboardingStepId) -> AppResult<Option<OnboardingStep>> {
        let row = sqlx::query_as::<_, StepRow>(
            r#"
            SELECT id, onboarding_id, title, level, is_optional
            FROM onboarding_steps
            WHERE id = $1
            "#,
        )
        .bind(step_id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(|error| {
            AppError::Internal(format!("failed to load onboarding step: {error}"))
        })?;

        row.map(step_from_row).transpose()
    }

    async fn steps_for_workflow(
        &self,
        onboarding_id: OnboardingId,
    ) -> AppResult<Vec<OnboardingStep>> {
        let rows = sqlx::query_as::<_, StepRow>(
            r#"
            SELECT id, onboarding_id, title, level, is_optional
            FROM onboarding_steps
            WHERE onboarding_id = $1
            ORDER BY level, title
            "#,
        )
        .bind(onboarding_id.as_uuid())
        .fetch_all(&self.pool)
        .await
        .map_err(|error| {
            AppError::Internal(format!("failed to list onboarding steps: {error}"))
        })?;

        rows.into_iter().map(step_from_row).collect()
    }

    async fn insert_completion(
        &self,
        completion: CompletedOnboardingStep,
    ) -> AppResult<CompletedOnboardingStep> {
        sqlx::query(
            r#"
            INSERT INTO completed_onboarding_steps (id, user_id, step_id, status)
            VALUES ($1, $2, $3, $4)
            "#,
        )
        .bind(completion.id().as_uuid())
        .bind(completion.user_id().as_uuid())
        .bind(completion.step_id().as_uuid())
        .bind(completion.status().as_str())
        .execute(&self.pool)
        .await
        .map_err(|error| {
            AppError::Internal(format!("failed to persist step completion: {error}"))
        })?;

        Ok(completion)
    }

    async fn completions_for_user(
        &self,
        user_id: UserId,
        onboarding_id: OnboardingId,
    ) -> AppResult<Vec<CompletedOnboardingStep>> {
        let rows = sqlx::query_as::<_, CompletionRow>(
            r#"
            SELECT completions.id, completions.user_id, completions.step_id, completions.status
            FROM completed_onboarding_steps AS completions
            INNER JOIN onboarding_steps AS steps
                ON steps.id = completions.step_id
            WHERE completions.user_id = $1 AND steps.onboarding_id = $2
            ORDER BY steps.level, completions.completed_at
            "#,
        )
        .bind(user_id.as_uuid())
        .bind(onboarding_id.as_uuid())
        .fetch_all(&self.pool)
        .await
        .map_err(|error| {
            AppError::Internal(format!("failed to list step completions: {error}"))
        })?;

        rows.into_iter().map(completion_from_row).collect()
    }
}
