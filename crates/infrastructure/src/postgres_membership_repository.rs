use async_trait::async_trait;
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use tessera_application::{MembershipRepository, SubscriptionTierRepository};
use tessera_core::{AppError, AppResult, NonEmptyString};
use tessera_domain::{
    MembershipStatus, MembershipTier, MembershipTierId, RoleId, RoleTemplateId, SubscriptionTier,
    SubscriptionTierId, UserId,
};

const ONE_ACTIVE_CONSTRAINT: &str = "membership_tiers_one_active_per_user";

/// PostgreSQL-backed repository for memberships and subscription tiers.
#[derive(Clone)]
pub struct PostgresMembershipRepository {
    pool: PgPool,
}

impl PostgresMembershipRepository {
    /// Creates a repository with the provided connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn load_membership(&self, row: MembershipRow) -> AppResult<MembershipTier> {
        let role_uuids = sqlx::query_scalar::<_, Uuid>(
            r#"
            SELECT role_id
            FROM membership_roles
            WHERE membership_tier_id = $1
            ORDER BY granted_at, role_id
            "#,
        )
        .bind(row.id)
        .fetch_all(&self.pool)
        .await
        .map_err(|error| {
            AppError::Internal(format!("failed to load membership roles: {error}"))
        })?;

        membership_from_parts(row, role_uuids)
    }
}

#[derive(Debug, FromRow)]
struct MembershipRow {
    id: Uuid,
    user_id: Uuid,
    subscription_tier_id: Uuid,
    status: String,
    invite: Option<String>,
}

#[derive(Debug, FromRow)]
struct TierRow {
    id: Uuid,
    title: String,
    description: String,
    price_minor: i64,
    is_active: bool,
    payment_plan: String,
}

fn membership_from_parts(row: MembershipRow, role_uuids: Vec<Uuid>) -> AppResult<MembershipTier> {
    let status: MembershipStatus = row.status.parse()?;
    let invite = row.invite.map(NonEmptyString::new).transpose()?;

    Ok(MembershipTier::from_parts(
        MembershipTierId::from_uuid(row.id),
        UserId::from_uuid(row.user_id),
        SubscriptionTierId::from_uuid(row.subscription_tier_id),
        status,
        invite,
        role_uuids.into_iter().map(RoleId::from_uuid).collect(),
    ))
}

fn tier_from_parts(row: TierRow, template_uuids: Vec<Uuid>) -> AppResult<SubscriptionTier> {
    let payment_plan = serde_json::from_str(row.payment_plan.as_str())
        .map_err(|error| AppError::Internal(format!("corrupt payment plan metadata: {error}")))?;

    SubscriptionTier::new(
        SubscriptionTierId::from_uuid(row.id),
        row.title,
        row.description,
        row.price_minor,
        row.is_active,
        payment_plan,
        template_uuids
            .into_iter()
            .map(RoleTemplateId::from_uuid)
            .collect(),
    )
}

fn map_membership_insert_error(error: sqlx::Error, user_id: UserId) -> AppError {
    if let sqlx::Error::Database(database_error) = &error {
        if database_error.constraint() == Some(ONE_ACTIVE_CONSTRAINT) {
            return AppError::Conflict(format!(
                "user '{user_id}' already has an active membership"
            ));
        }
    }

    AppError::Internal(format!("failed to persist membership: {error}"))
}

#[async_trait]
impl MembershipRepository for PostgresMembershipRepository {
    async fn insert(&self, membership: MembershipTier) -> AppResult<MembershipTier> {
        let mut transaction = self.pool.begin().await.map_err(|error| {
            AppError::Internal(format!("failed to begin transaction: {error}"))
        })?;

        sqlx::query(
            r#"
            INSERT INTO membership_tiers (id, user_id, subscription_tier_id, status, invite)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(membership.id().as_uuid())
        .bind(membership.user_id().as_uuid())
        .bind(membership.subscription_tier_id().as_uuid())
        .bind(membership.status().as_str())
        .bind(membership.invite().map(NonEmptyString::as_str))
        .execute(&mut *transaction)
        .await
        .map_err(|error| map_membership_insert_error(error, membership.user_id()))?;

        for role_id in membership.role_ids() {
            sqlx::query(
                r#"
                INSERT INTO membership_roles (membership_tier_id, role_id)
                VALUES ($1, $2)
                ON CONFLICT (membership_tier_id, role_id) DO NOTHING
                "#,
            )
            .bind(membership.id().as_uuid())
            .bind(role_id.as_uuid())
            .execute(&mut *transaction)
            .await
            .map_err(|error| {
                AppError::Internal(format!("failed to persist membership role: {error}"))
            })?;
        }

        transaction.commit().await.map_err(|error| {
            AppError::Internal(format!("failed to commit transaction: {error}"))
        })?;

        Ok(membership)
    }

    async fn get(&self, membership_id: MembershipTierId) -> AppResult<Option<MembershipTier>> {
        let row = sqlx::query_as::<_, MembershipRow>(
            r#"
            SELECT id, user_id, subscription_tier_id, status, invite
            FROM membership_tiers
            WHERE id = $1
            "#,
        )
        .bind(membership_id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to load membership: {error}")))?;

        match row {
            Some(row) => self.load_membership(row).await.map(Some),
            None => Ok(None),
        }
    }

    async fn set_status(
        &self,
        membership_id: MembershipTierId,
        status: MembershipStatus,
    ) -> AppResult<MembershipTier> {
        let rows_affected = sqlx::query(
            r#"
            UPDATE membership_tiers
            SET status = $2
            WHERE id = $1
            "#,
        )
        .bind(membership_id.as_uuid())
        .bind(status.as_str())
        .execute(&self.pool)
        .await
        .map_err(|error| {
            AppError::Internal(format!("failed to update membership status: {error}"))
        })?
        .rows_affected();

        if rows_affected == 0 {
            return Err(AppError::NotFound(format!("membership '{membership_id}'")));
        }

        MembershipRepository::get(self, membership_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("membership '{membership_id}'")))
    }

    async fn active_for_user(&self, user_id: UserId) -> AppResult<Option<MembershipTier>> {
        let row = sqlx::query_as::<_, MembershipRow>(
            r#"
            SELECT id, user_id, subscription_tier_id, status, invite
            FROM membership_tiers
            WHERE user_id = $1 AND status = 'active'
            LIMIT 1
            "#,
        )
        .bind(user_id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(|error| {
            AppError::Internal(format!("failed to load active membership: {error}"))
        })?;

        match row {
            Some(row) => self.load_membership(row).await.map(Some),
            None => Ok(None),
        }
    }

    async fn add_role(&self, membership_id: MembershipTierId, role_id: RoleId) -> AppResult<()> {
        let membership_exists = sqlx::query_scalar::<_, i64>(
            r#"
            SELECT COUNT(*)
            FROM membership_tiers
            WHERE id = $1
            "#,
        )
        .bind(membership_id.as_uuid())
        .fetch_one(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to resolve membership: {error}")))?;

        if membership_exists == 0 {
            return Err(AppError::NotFound(format!("membership '{membership_id}'")));
        }

        sqlx::query(
            r#"
            INSERT INTO membership_roles (membership_tier_id, role_id)
            VALUES ($1, $2)
            ON CONFLICT (membership_tier_id, role_id) DO NOTHING
            "#,
        )
        .bind(membership_id.as_uuid())
        .bind(role_id.as_uuid())
        .execute(&self.pool)
        .await
        .map_err(|error| {
            AppError::Internal(format!("failed to persist membership role: {error}"))
        })?;

        Ok(())
    }
}

#[async_trait]
impl SubscriptionTierRepository for PostgresMembershipRepository {
    async fn insert(&self, tier: SubscriptionTier) -> AppResult<SubscriptionTier> {
        let payment_plan = serde_json::to_string(tier.payment_plan()).map_err(|error| {
            AppError::Internal(format!("failed to encode payment plan: {error}"))
        })?;

        let mut transaction = self.pool.begin().await.map_err(|error| {
            AppError::Internal(format!("failed to begin transaction: {error}"))
        })?;

        sqlx::query(
            r#"
            INSERT INTO subscription_tiers (id, title, description, price_minor, is_active, payment_plan)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(tier.id().as_uuid())
        .bind(tier.title().as_str())
        .bind(tier.description())
        .bind(tier.price_minor())
        .bind(tier.is_active())
        .bind(payment_plan.as_str())
        .execute(&mut *transaction)
        .await
        .map_err(|error| AppError::Internal(format!("failed to persist tier: {error}")))?;

        for template_id in tier.role_template_ids() {
            sqlx::query(
                r#"
                INSERT INTO tier_role_templates (subscription_tier_id, role_template_id)
                VALUES ($1, $2)
                ON CONFLICT (subscription_tier_id, role_template_id) DO NOTHING
                "#,
            )
            .bind(tier.id().as_uuid())
            .bind(template_id.as_uuid())
            .execute(&mut *transaction)
            .await
            .map_err(|error| {
                AppError::Internal(format!("failed to persist tier template: {error}"))
            })?;
        }

        transaction.commit().await.map_err(|error| {
            AppError::Internal(format!("failed to commit transaction: {error}"))
        })?;

        Ok(tier)
    }

    async fn get(&self, tier_id: SubscriptionTierId) -> AppResult<Option<SubscriptionTier>> {
        let row = sqlx::query_as::<_, TierRow>(
            r#"
            SELECT id, title, description, price_minor, is_active, payment_plan
            FROM subscription_tiers
            WHERE id = $1
            "#,
        )
        .bind(tier_id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to load tier: {error}")))?;

        let Some(row) = row else {
            return Ok(None);
        };

        let template_uuids = sqlx::query_scalar::<_, Uuid>(
            r#"
            SELECT role_template_id
            FROM tier_role_templates
            WHERE subscription_tier_id = $1
            "#,
        )
        .bind(row.id)
        .fetch_all(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to load tier templates: {error}")))?;

        tier_from_parts(row, template_uuids).map(Some)
    }
}

#[cfg(test)]
mod tests {
    use sqlx::PgPool;
    use sqlx::migrate::Migrator;
    use sqlx::postgres::PgPoolOptions;
    use uuid::Uuid;

    use tessera_application::{MembershipRepository, UserRepository};
    use tessera_core::AppError;
    use tessera_domain::{
        MembershipStatus, MembershipTier, MembershipTierId, SubscriptionTierId, User, UserId,
        Username,
    };

    use crate::postgres_user_repository::PostgresUserRepository;

    use super::PostgresMembershipRepository;

    static MIGRATOR: Migrator = sqlx::migrate!("./migrations");

    async fn test_pool() -> Option<PgPool> {
        let Ok(database_url) = std::env::var("DATABASE_URL") else {
            return None;
        };

        let pool = match PgPoolOptions::new()
            .max_connections(2)
            .connect(database_url.as_str())
            .await
        {
            Ok(pool) => pool,
            Err(error) => panic!("failed to connect to DATABASE_URL in test: {error}"),
        };

        if let Err(error) = MIGRATOR.run(&pool).await {
            panic!("failed to run migrations for postgres membership tests: {error}");
        }

        Some(pool)
    }

    async fn seed_user(pool: &PgPool) -> UserId {
        let repository = PostgresUserRepository::new(pool.clone());
        let username = format!("member-{}", Uuid::new_v4());
        let Ok(username) = Username::new(username) else {
            panic!("failed to build username");
        };
        let Ok(user) = User::new(UserId::new(), username, "Member", None) else {
            panic!("failed to build user");
        };
        match repository.insert(user).await {
            Ok(user) => user.id(),
            Err(error) => panic!("failed to seed user: {error}"),
        }
    }

    async fn seed_tier(pool: &PgPool) -> SubscriptionTierId {
        use tessera_application::SubscriptionTierRepository;
        use tessera_domain::SubscriptionTier;

        let repository = PostgresMembershipRepository::new(pool.clone());
        let Ok(tier) = SubscriptionTier::new(
            SubscriptionTierId::new(),
            format!("Gold-{}", Uuid::new_v4()),
            "",
            4900,
            true,
            serde_json::json!({}),
            Vec::new(),
        ) else {
            panic!("failed to build tier");
        };
        match SubscriptionTierRepository::insert(&repository, tier).await {
            Ok(tier) => tier.id(),
            Err(error) => panic!("failed to seed tier: {error}"),
        }
    }

    #[tokio::test]
    async fn partial_unique_index_rejects_second_active_membership() {
        let Some(pool) = test_pool().await else {
            return;
        };
        let repository = PostgresMembershipRepository::new(pool.clone());
        let user_id = seed_user(&pool).await;
        let tier_id = seed_tier(&pool).await;

        let membership = |user_id| {
            MembershipTier::new(
                MembershipTierId::new(),
                user_id,
                tier_id,
                None,
                Vec::new(),
            )
        };

        let first = MembershipRepository::insert(&repository, membership(user_id)).await;
        assert!(first.is_ok());

        let second = MembershipRepository::insert(&repository, membership(user_id)).await;
        assert!(matches!(second, Err(AppError::Conflict(_))));
    }

    #[tokio::test]
    async fn cancelled_membership_frees_the_active_slot() {
        let Some(pool) = test_pool().await else {
            return;
        };
        let repository = PostgresMembershipRepository::new(pool.clone());
        let user_id = seed_user(&pool).await;
        let tier_id = seed_tier(&pool).await;

        let first = MembershipRepository::insert(
            &repository,
            MembershipTier::new(MembershipTierId::new(), user_id, tier_id, None, Vec::new()),
        )
        .await;
        let Ok(first) = first else {
            panic!("failed to create membership");
        };

        let cancelled = repository
            .set_status(first.id(), MembershipStatus::Cancelled)
            .await;
        assert!(cancelled.is_ok_and(|stored| stored.status() == MembershipStatus::Cancelled));

        let second = MembershipRepository::insert(
            &repository,
            MembershipTier::new(MembershipTierId::new(), user_id, tier_id, None, Vec::new()),
        )
        .await;
        assert!(second.is_ok());
    }
}
