use std::collections::HashMap;

use async_trait::async_trait;
use sha2::{Digest, Sha256};
use sqlx::{FromRow, PgPool, Postgres, Transaction};
use tracing::debug;
use uuid::Uuid;

use tessera_application::{
    DirectoryRepository, RoleChange, RoleRepository, RoleTemplateRepository, UserRoleRepository,
};
use tessera_core::{AppError, AppResult};
use tessera_domain::{
    AccessLevel, Branch, BranchId, Organization, OrganizationId, Role, RoleId, RoleIdentity,
    RoleTemplate, RoleTemplateId, RoleType, UserId,
};

/// PostgreSQL-backed repository for the access-control ports.
#[derive(Clone)]
pub struct PostgresAccessRepository {
    pool: PgPool,
}

impl PostgresAccessRepository {
    /// Creates a repository with the provided connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn load_role(&self, row: RoleRow) -> AppResult<Role> {
        let organization_ids = sqlx::query_scalar::<_, Uuid>(
            r#"
            SELECT organization_id
            FROM role_organizations
            WHERE role_id = $1
            "#,
        )
        .bind(row.id)
        .fetch_all(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to load role scope: {error}")))?;

        let branch_ids = sqlx::query_scalar::<_, Uuid>(
            r#"
            SELECT branch_id
            FROM role_branches
            WHERE role_id = $1
            "#,
        )
        .bind(row.id)
        .fetch_all(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to load role scope: {error}")))?;

        role_from_parts(row, organization_ids, branch_ids)
    }
}

#[derive(Debug, FromRow)]
struct RoleRow {
    id: Uuid,
    name: String,
    access_level: String,
}

#[derive(Debug, FromRow)]
struct ScopeRow {
    role_id: Uuid,
    scope_id: Uuid,
}

#[derive(Debug, FromRow)]
struct TemplateRow {
    id: Uuid,
    name: String,
    access_level: String,
    role_type: String,
}

/// Digest of a role's normalized scope sets.
///
/// Stored on the role row so an identity lookup is a single indexed match
/// on `(name, access_level, scope_digest)` instead of a join comparison.
fn scope_digest(identity: &RoleIdentity) -> String {
    let mut hasher = Sha256::new();
    hasher.update((identity.organization_ids().len() as u64).to_le_bytes());
    for organization_id in identity.organization_ids() {
        hasher.update(organization_id.as_uuid().as_bytes());
    }
    hasher.update((identity.branch_ids().len() as u64).to_le_bytes());
    for branch_id in identity.branch_ids() {
        hasher.update(branch_id.as_uuid().as_bytes());
    }

    format!("{:x}", hasher.finalize())
}

fn role_from_parts(
    row: RoleRow,
    organization_ids: Vec<Uuid>,
    branch_ids: Vec<Uuid>,
) -> AppResult<Role> {
    let access_level: AccessLevel = row.access_level.parse()?;
    Role::new(
        RoleId::from_uuid(row.id),
        row.name,
        access_level,
        organization_ids
            .into_iter()
            .map(OrganizationId::from_uuid)
            .collect(),
        branch_ids.into_iter().map(BranchId::from_uuid).collect(),
    )
}

fn template_from_row(row: TemplateRow) -> AppResult<RoleTemplate> {
    let access_level: AccessLevel = row.access_level.parse()?;
    RoleTemplate::new(
        RoleTemplateId::from_uuid(row.id),
        row.name,
        access_level,
        RoleType::new(row.role_type)?,
    )
}

async fn insert_role_row(
    transaction: &mut Transaction<'_, Postgres>,
    role: &Role,
    digest: &str,
) -> AppResult<()> {
    sqlx::query(
        r#"
        INSERT INTO roles (id, name, access_level, scope_digest)
        VALUES ($1, $2, $3, $4)
        "#,
    )
    .bind(role.id().as_uuid())
    .bind(role.name().as_str())
    .bind(role.access_level().as_str())
    .bind(digest)
    .execute(&mut **transaction)
    .await
    .map_err(|error| AppError::Internal(format!("failed to persist role: {error}")))?;

    insert_scope_rows(transaction, role).await
}

async fn insert_scope_rows(
    transaction: &mut Transaction<'_, Postgres>,
    role: &Role,
) -> AppResult<()> {
    for organization_id in role.organization_ids() {
        sqlx::query(
            r#"
            INSERT INTO role_organizations (role_id, organization_id)
            VALUES ($1, $2)
            ON CONFLICT (role_id, organization_id) DO NOTHING
            "#,
        )
        .bind(role.id().as_uuid())
        .bind(organization_id.as_uuid())
        .execute(&mut **transaction)
        .await
        .map_err(|error| AppError::Internal(format!("failed to persist role scope: {error}")))?;
    }

    for branch_id in role.branch_ids() {
        sqlx::query(
            r#"
            INSERT INTO role_branches (role_id, branch_id)
            VALUES ($1, $2)
            ON CONFLICT (role_id, branch_id) DO NOTHING
            "#,
        )
        .bind(role.id().as_uuid())
        .bind(branch_id.as_uuid())
        .execute(&mut **transaction)
        .await
        .map_err(|error| AppError::Internal(format!("failed to persist role scope: {error}")))?;
    }

    Ok(())
}

async fn rewrite_role_row(
    transaction: &mut Transaction<'_, Postgres>,
    role: &Role,
    digest: &str,
) -> AppResult<()> {
    let rows_affected = sqlx::query(
        r#"
        UPDATE roles
        SET name = $2, access_level = $3, scope_digest = $4
        WHERE id = $1
        "#,
    )
    .bind(role.id().as_uuid())
    .bind(role.name().as_str())
    .bind(role.access_level().as_str())
    .bind(digest)
    .execute(&mut **transaction)
    .await
    .map_err(|error| AppError::Internal(format!("failed to update role: {error}")))?
    .rows_affected();

    if rows_affected == 0 {
        return Err(AppError::NotFound(format!("role '{}'", role.id())));
    }

    sqlx::query("DELETE FROM role_organizations WHERE role_id = $1")
        .bind(role.id().as_uuid())
        .execute(&mut **transaction)
        .await
        .map_err(|error| AppError::Internal(format!("failed to clear role scope: {error}")))?;
    sqlx::query("DELETE FROM role_branches WHERE role_id = $1")
        .bind(role.id().as_uuid())
        .execute(&mut **transaction)
        .await
        .map_err(|error| AppError::Internal(format!("failed to clear role scope: {error}")))?;

    insert_scope_rows(transaction, role).await
}

async fn begin(pool: &PgPool) -> AppResult<Transaction<'_, Postgres>> {
    pool.begin()
        .await
        .map_err(|error| AppError::Internal(format!("failed to begin transaction: {error}")))
}

async fn commit(transaction: Transaction<'_, Postgres>) -> AppResult<()> {
    transaction
        .commit()
        .await
        .map_err(|error| AppError::Internal(format!("failed to commit transaction: {error}")))
}

#[async_trait]
impl RoleTemplateRepository for PostgresAccessRepository {
    async fn find_by_name(&self, name: &str) -> AppResult<Option<RoleTemplate>> {
        let row = sqlx::query_as::<_, TemplateRow>(
            r#"
            SELECT id, name, access_level, role_type
            FROM role_templates
            WHERE name = $1
            "#,
        )
        .bind(name)
        .fetch_optional(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to find role template: {error}")))?;

        row.map(template_from_row).transpose()
    }

    async fn insert_if_absent(&self, template: RoleTemplate) -> AppResult<RoleTemplate> {
        // The existing row wins the race; the follow-up select returns
        // whichever template holds the name after the insert attempt.
        sqlx::query(
            r#"
            INSERT INTO role_templates (id, name, access_level, role_type)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (name) DO NOTHING
            "#,
        )
        .bind(template.id().as_uuid())
        .bind(template.name().as_str())
        .bind(template.access_level().as_str())
        .bind(template.role_type().as_str())
        .execute(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to persist role template: {error}")))?;

        self.find_by_name(template.name().as_str())
            .await?
            .ok_or_else(|| {
                AppError::Internal(format!(
                    "role template '{}' vanished after insert",
                    template.name()
                ))
            })
    }

    async fn list_by_ids(&self, ids: &[RoleTemplateId]) -> AppResult<Vec<RoleTemplate>> {
        let uuids: Vec<Uuid> = ids.iter().map(|id| id.as_uuid()).collect();
        let rows = sqlx::query_as::<_, TemplateRow>(
            r#"
            SELECT id, name, access_level, role_type
            FROM role_templates
            WHERE id = ANY($1)
            "#,
        )
        .bind(&uuids)
        .fetch_all(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to list role templates: {error}")))?;

        let mut by_id: HashMap<Uuid, TemplateRow> =
            rows.into_iter().map(|row| (row.id, row)).collect();
        uuids
            .iter()
            .filter_map(|id| by_id.remove(id))
            .map(template_from_row)
            .collect()
    }
}

#[async_trait]
impl RoleRepository for PostgresAccessRepository {
    async fn find_by_identity(&self, identity: &RoleIdentity) -> AppResult<Option<Role>> {
        let digest = scope_digest(identity);
        let row = sqlx::query_as::<_, RoleRow>(
            r#"
            SELECT id, name, access_level
            FROM roles
            WHERE name = $1 AND access_level = $2 AND scope_digest = $3
            ORDER BY created_at, id
            LIMIT 1
            "#,
        )
        .bind(identity.name())
        .bind(identity.access_level().as_str())
        .bind(digest.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to find role: {error}")))?;

        match row {
            Some(row) => self.load_role(row).await.map(Some),
            None => Ok(None),
        }
    }

    async fn insert(&self, role: Role) -> AppResult<Role> {
        let digest = scope_digest(&role.identity());
        let mut transaction = begin(&self.pool).await?;
        insert_role_row(&mut transaction, &role, digest.as_str()).await?;
        commit(transaction).await?;
        Ok(role)
    }

    async fn update(&self, role: Role) -> AppResult<Role> {
        let digest = scope_digest(&role.identity());
        let mut transaction = begin(&self.pool).await?;
        rewrite_role_row(&mut transaction, &role, digest.as_str()).await?;
        commit(transaction).await?;
        Ok(role)
    }

    async fn reuse_or_insert(&self, role: Role) -> AppResult<RoleChange> {
        let identity = role.identity();
        let digest = scope_digest(&identity);
        let mut transaction = begin(&self.pool).await?;

        // Advisory lock on the identity key closes the find/create window
        // between concurrent callers carrying the same payload.
        sqlx::query("SELECT pg_advisory_xact_lock(hashtextextended($1, 0))")
            .bind(format!(
                "role:{}:{}:{digest}",
                identity.name(),
                identity.access_level().as_str()
            ))
            .execute(&mut *transaction)
            .await
            .map_err(|error| {
                AppError::Internal(format!("failed to acquire identity lock: {error}"))
            })?;

        // Duplicate identities are representable when reuse was not
        // requested; the oldest row wins here.
        let existing_id = sqlx::query_scalar::<_, Uuid>(
            r#"
            SELECT id
            FROM roles
            WHERE name = $1 AND access_level = $2 AND scope_digest = $3
            ORDER BY created_at, id
            LIMIT 1
            "#,
        )
        .bind(identity.name())
        .bind(identity.access_level().as_str())
        .bind(digest.as_str())
        .fetch_optional(&mut *transaction)
        .await
        .map_err(|error| AppError::Internal(format!("failed to find role: {error}")))?;

        let change = match existing_id {
            Some(existing_id) => {
                let stored = Role::new(
                    RoleId::from_uuid(existing_id),
                    identity.name(),
                    identity.access_level(),
                    identity.organization_ids().to_vec(),
                    identity.branch_ids().to_vec(),
                )?;
                rewrite_role_row(&mut transaction, &stored, digest.as_str()).await?;
                RoleChange {
                    role: stored,
                    created: false,
                }
            }
            None => {
                insert_role_row(&mut transaction, &role, digest.as_str()).await?;
                RoleChange {
                    role,
                    created: true,
                }
            }
        };

        commit(transaction).await?;
        debug!(role_id = %change.role.id(), created = change.created, "resolved role identity");
        Ok(change)
    }

    async fn get(&self, role_id: RoleId) -> AppResult<Option<Role>> {
        let row = sqlx::query_as::<_, RoleRow>(
            r#"
            SELECT id, name, access_level
            FROM roles
            WHERE id = $1
            "#,
        )
        .bind(role_id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to load role: {error}")))?;

        match row {
            Some(row) => self.load_role(row).await.map(Some),
            None => Ok(None),
        }
    }

    async fn list_by_ids(&self, ids: &[RoleId]) -> AppResult<Vec<Role>> {
        let uuids: Vec<Uuid> = ids.iter().map(|id| id.as_uuid()).collect();
        let rows = sqlx::query_as::<_, RoleRow>(
            r#"
            SELECT id, name, access_level
            FROM roles
            WHERE id = ANY($1)
            "#,
        )
        .bind(&uuids)
        .fetch_all(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to list roles: {error}")))?;

        let organization_rows = sqlx::query_as::<_, ScopeRow>(
            r#"
            SELECT role_id, organization_id AS scope_id
            FROM role_organizations
            WHERE role_id = ANY($1)
            "#,
        )
        .bind(&uuids)
        .fetch_all(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to list role scopes: {error}")))?;

        let branch_rows = sqlx::query_as::<_, ScopeRow>(
            r#"
            SELECT role_id, branch_id AS scope_id
            FROM role_branches
            WHERE role_id = ANY($1)
            "#,
        )
        .bind(&uuids)
        .fetch_all(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to list role scopes: {error}")))?;

        let mut organizations_by_role: HashMap<Uuid, Vec<Uuid>> = HashMap::new();
        for row in organization_rows {
            organizations_by_role
                .entry(row.role_id)
                .or_default()
                .push(row.scope_id);
        }
        let mut branches_by_role: HashMap<Uuid, Vec<Uuid>> = HashMap::new();
        for row in branch_rows {
            branches_by_role
                .entry(row.role_id)
                .or_default()
                .push(row.scope_id);
        }

        let mut by_id: HashMap<Uuid, RoleRow> =
            rows.into_iter().map(|row| (row.id, row)).collect();
        uuids
            .iter()
            .filter_map(|id| by_id.remove(id))
            .map(|row| {
                let organization_ids = organizations_by_role.remove(&row.id).unwrap_or_default();
                let branch_ids = branches_by_role.remove(&row.id).unwrap_or_default();
                role_from_parts(row, organization_ids, branch_ids)
            })
            .collect()
    }
}

#[async_trait]
impl UserRoleRepository for PostgresAccessRepository {
    async fn roles_for_user(&self, user_id: UserId) -> AppResult<Vec<Role>> {
        let role_uuids = sqlx::query_scalar::<_, Uuid>(
            r#"
            SELECT role_id
            FROM user_roles
            WHERE user_id = $1
            ORDER BY granted_at, role_id
            "#,
        )
        .bind(user_id.as_uuid())
        .fetch_all(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to list user roles: {error}")))?;

        let role_ids: Vec<RoleId> = role_uuids.into_iter().map(RoleId::from_uuid).collect();
        RoleRepository::list_by_ids(self, &role_ids).await
    }

    async fn replace_roles(&self, user_id: UserId, role_ids: &[RoleId]) -> AppResult<()> {
        let mut transaction = begin(&self.pool).await?;

        sqlx::query("DELETE FROM user_roles WHERE user_id = $1")
            .bind(user_id.as_uuid())
            .execute(&mut *transaction)
            .await
            .map_err(|error| {
                AppError::Internal(format!("failed to clear user roles: {error}"))
            })?;

        for role_id in role_ids {
            sqlx::query(
                r#"
                INSERT INTO user_roles (user_id, role_id)
                VALUES ($1, $2)
                ON CONFLICT (user_id, role_id) DO NOTHING
                "#,
            )
            .bind(user_id.as_uuid())
            .bind(role_id.as_uuid())
            .execute(&mut *transaction)
            .await
            .map_err(|error| {
                AppError::Internal(format!("failed to persist user role: {error}"))
            })?;
        }

        commit(transaction).await
    }

    async fn add_role(&self, user_id: UserId, role_id: RoleId) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO user_roles (user_id, role_id)
            VALUES ($1, $2)
            ON CONFLICT (user_id, role_id) DO NOTHING
            "#,
        )
        .bind(user_id.as_uuid())
        .bind(role_id.as_uuid())
        .execute(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to grant role: {error}")))?;

        Ok(())
    }
}

#[derive(Debug, FromRow)]
struct OrganizationRow {
    id: Uuid,
    name: String,
}

#[derive(Debug, FromRow)]
struct BranchRow {
    id: Uuid,
    organization_id: Uuid,
    name: String,
}

#[async_trait]
impl DirectoryRepository for PostgresAccessRepository {
    async fn insert_organization(&self, organization: Organization) -> AppResult<Organization> {
        sqlx::query(
            r#"
            INSERT INTO organizations (id, name)
            VALUES ($1, $2)
            "#,
        )
        .bind(organization.id().as_uuid())
        .bind(organization.name().as_str())
        .execute(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to persist organization: {error}")))?;

        Ok(organization)
    }

    async fn insert_branch(&self, branch: Branch) -> AppResult<Branch> {
        sqlx::query(
            r#"
            INSERT INTO branches (id, organization_id, name)
            VALUES ($1, $2, $3)
            "#,
        )
        .bind(branch.id().as_uuid())
        .bind(branch.organization_id().as_uuid())
        .bind(branch.name().as_str())
        .execute(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to persist branch: {error}")))?;

        Ok(branch)
    }

    async fn organizations_by_ids(
        &self,
        ids: &[OrganizationId],
    ) -> AppResult<Vec<Organization>> {
        let uuids: Vec<Uuid> = ids.iter().map(|id| id.as_uuid()).collect();
        let rows = sqlx::query_as::<_, OrganizationRow>(
            r#"
            SELECT id, name
            FROM organizations
            WHERE id = ANY($1)
            "#,
        )
        .bind(&uuids)
        .fetch_all(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to list organizations: {error}")))?;

        let mut by_id: HashMap<Uuid, OrganizationRow> =
            rows.into_iter().map(|row| (row.id, row)).collect();
        uuids
            .iter()
            .filter_map(|id| by_id.remove(id))
            .map(|row| Organization::new(OrganizationId::from_uuid(row.id), row.name))
            .collect()
    }

    async fn branches_by_ids(&self, ids: &[BranchId]) -> AppResult<Vec<Branch>> {
        let uuids: Vec<Uuid> = ids.iter().map(|id| id.as_uuid()).collect();
        let rows = sqlx::query_as::<_, BranchRow>(
            r#"
            SELECT id, organization_id, name
            FROM branches
            WHERE id = ANY($1)
            "#,
        )
        .bind(&uuids)
        .fetch_all(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to list branches: {error}")))?;

        let mut by_id: HashMap<Uuid, BranchRow> =
            rows.into_iter().map(|row| (row.id, row)).collect();
        uuids
            .iter()
            .filter_map(|id| by_id.remove(id))
            .map(|row| {
                Branch::new(
                    BranchId::from_uuid(row.id),
                    OrganizationId::from_uuid(row.organization_id),
                    row.name,
                )
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use sqlx::PgPool;
    use sqlx::migrate::Migrator;
    use sqlx::postgres::PgPoolOptions;
    use uuid::Uuid;

    use tessera_application::{RoleRepository, RoleTemplateRepository};
    use tessera_domain::{AccessLevel, Role, RoleId, RoleTemplate, RoleTemplateId, RoleType};

    use super::PostgresAccessRepository;

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
            panic!("failed to run migrations for postgres access tests: {error}");
        }

        Some(pool)
    }

    fn unique(name: &str) -> String {
        format!("{name}-{}", Uuid::new_v4())
    }

    #[tokio::test]
    async fn role_find_after_insert_roundtrips() {
        let Some(pool) = test_pool().await else {
            return;
        };
        let repository = PostgresAccessRepository::new(pool);

        let Ok(created) = Role::new(
            RoleId::new(),
            unique("Manager"),
            AccessLevel::Global,
            Vec::new(),
            Vec::new(),
        ) else {
            panic!("failed to build role");
        };
        let inserted = repository.insert(created.clone()).await;
        assert!(inserted.is_ok());

        let found = repository.find_by_identity(&created.identity()).await;
        assert!(
            found.is_ok_and(|role| role.is_some_and(|stored| stored.id() == created.id()))
        );
    }

    #[tokio::test]
    async fn reuse_or_insert_converges_on_one_row() {
        let Some(pool) = test_pool().await else {
            return;
        };
        let repository = PostgresAccessRepository::new(pool);
        let name = unique("Auditor");

        let build = |name: &str| {
            Role::new(
                RoleId::new(),
                name,
                AccessLevel::Global,
                Vec::new(),
                Vec::new(),
            )
        };
        let Ok(first_candidate) = build(name.as_str()) else {
            panic!("failed to build role");
        };
        let Ok(second_candidate) = build(name.as_str()) else {
            panic!("failed to build role");
        };

        let first = repository.reuse_or_insert(first_candidate).await;
        let second = repository.reuse_or_insert(second_candidate).await;

        match (first, second) {
            (Ok(first), Ok(second)) => {
                assert!(first.created);
                assert!(!second.created);
                assert_eq!(first.role.id(), second.role.id());
            }
            (first, second) => panic!("reuse_or_insert failed: {first:?} / {second:?}"),
        }
    }

    #[tokio::test]
    async fn template_registry_keeps_first_writer() {
        let Some(pool) = test_pool().await else {
            return;
        };
        let repository = PostgresAccessRepository::new(pool);
        let name = unique("Manager");

        let build = |access_level: AccessLevel| {
            RoleType::new("staff").and_then(|role_type| {
                RoleTemplate::new(RoleTemplateId::new(), name.as_str(), access_level, role_type)
            })
        };
        let Ok(first_candidate) = build(AccessLevel::Organization) else {
            panic!("failed to build template");
        };
        let Ok(second_candidate) = build(AccessLevel::Global) else {
            panic!("failed to build template");
        };

        let first = repository.insert_if_absent(first_candidate).await;
        let second = repository.insert_if_absent(second_candidate).await;

        match (first, second) {
            (Ok(first), Ok(second)) => {
                assert_eq!(first.id(), second.id());
                assert_eq!(second.access_level(), AccessLevel::Organization);
            }
            (first, second) => panic!("insert_if_absent failed: {first:?} / {second:?}"),
        }
    }
}
