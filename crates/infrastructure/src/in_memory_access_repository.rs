use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use tessera_application::{
    DirectoryRepository, RoleChange, RoleRepository, RoleTemplateRepository, UserRoleRepository,
};
use tessera_core::{AppError, AppResult};
use tessera_domain::{
    Branch, BranchId, Organization, OrganizationId, Role, RoleId, RoleIdentity, RoleTemplate,
    RoleTemplateId, UserId,
};

/// In-memory implementation of the access-control repository ports.
#[derive(Debug, Default)]
pub struct InMemoryAccessRepository {
    templates: RwLock<HashMap<RoleTemplateId, RoleTemplate>>,
    roles: RwLock<HashMap<RoleId, Role>>,
    user_roles: RwLock<HashMap<UserId, Vec<RoleId>>>,
    organizations: RwLock<HashMap<OrganizationId, Organization>>,
    branches: RwLock<HashMap<BranchId, Branch>>,
}

impl InMemoryAccessRepository {
    /// Creates an empty in-memory repository.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RoleTemplateRepository for InMemoryAccessRepository {
    async fn find_by_name(&self, name: &str) -> AppResult<Option<RoleTemplate>> {
        Ok(self
            .templates
            .read()
            .await
            .values()
            .find(|template| template.name().as_str() == name)
            .cloned())
    }

    async fn insert_if_absent(&self, template: RoleTemplate) -> AppResult<RoleTemplate> {
        let mut templates = self.templates.write().await;

        if let Some(existing) = templates
            .values()
            .find(|stored| stored.name() == template.name())
        {
            return Ok(existing.clone());
        }

        templates.insert(template.id(), template.clone());
        Ok(template)
    }

    async fn list_by_ids(&self, ids: &[RoleTemplateId]) -> AppResult<Vec<RoleTemplate>> {
        let templates = self.templates.read().await;
        Ok(ids
            .iter()
            .filter_map(|id| templates.get(id).cloned())
            .collect())
    }
}

#[async_trait]
impl RoleRepository for InMemoryAccessRepository {
    async fn find_by_identity(&self, identity: &RoleIdentity) -> AppResult<Option<Role>> {
        Ok(self
            .roles
            .read()
            .await
            .values()
            .find(|role| &role.identity() == identity)
            .cloned())
    }

    async fn insert(&self, role: Role) -> AppResult<Role> {
        self.roles.write().await.insert(role.id(), role.clone());
        Ok(role)
    }

    async fn update(&self, role: Role) -> AppResult<Role> {
        let mut roles = self.roles.write().await;

        if !roles.contains_key(&role.id()) {
            return Err(AppError::NotFound(format!("role '{}'", role.id())));
        }

        roles.insert(role.id(), role.clone());
        Ok(role)
    }

    async fn reuse_or_insert(&self, role: Role) -> AppResult<RoleChange> {
        // The write lock is held across find-and-insert so concurrent calls
        // carrying the same identity converge on one row.
        let mut roles = self.roles.write().await;
        let identity = role.identity();

        if let Some(existing) = roles
            .values_mut()
            .find(|stored| stored.identity() == identity)
        {
            *existing = Role::new(
                existing.id(),
                identity.name(),
                identity.access_level(),
                identity.organization_ids().to_vec(),
                identity.branch_ids().to_vec(),
            )?;
            return Ok(RoleChange {
                role: existing.clone(),
                created: false,
            });
        }

        roles.insert(role.id(), role.clone());
        Ok(RoleChange {
            role,
            created: true,
        })
    }

    async fn get(&self, role_id: RoleId) -> AppResult<Option<Role>> {
        Ok(self.roles.read().await.get(&role_id).cloned())
    }

    async fn list_by_ids(&self, ids: &[RoleId]) -> AppResult<Vec<Role>> {
        let roles = self.roles.read().await;
        Ok(ids.iter().filter_map(|id| roles.get(id).cloned()).collect())
    }
}

#[async_trait]
impl UserRoleRepository for InMemoryAccessRepository {
    async fn roles_for_user(&self, user_id: UserId) -> AppResult<Vec<Role>> {
        let role_ids = self
            .user_roles
            .read()
            .await
            .get(&user_id)
            .cloned()
            .unwrap_or_default();
        RoleRepository::list_by_ids(self, &role_ids).await
    }

    async fn replace_roles(&self, user_id: UserId, role_ids: &[RoleId]) -> AppResult<()> {
        self.user_roles
            .write()
            .await
            .insert(user_id, role_ids.to_vec());
        Ok(())
    }

    async fn add_role(&self, user_id: UserId, role_id: RoleId) -> AppResult<()> {
        let mut user_roles = self.user_roles.write().await;
        let grants = user_roles.entry(user_id).or_default();

        if !grants.contains(&role_id) {
            grants.push(role_id);
        }

        Ok(())
    }
}

#[async_trait]
impl DirectoryRepository for InMemoryAccessRepository {
    async fn insert_organization(&self, organization: Organization) -> AppResult<Organization> {
        self.organizations
            .write()
            .await
            .insert(organization.id(), organization.clone());
        Ok(organization)
    }

    async fn insert_branch(&self, branch: Branch) -> AppResult<Branch> {
        self.branches
            .write()
            .await
            .insert(branch.id(), branch.clone());
        Ok(branch)
    }

    async fn organizations_by_ids(
        &self,
        ids: &[OrganizationId],
    ) -> AppResult<Vec<Organization>> {
        let organizations = self.organizations.read().await;
        Ok(ids
            .iter()
            .filter_map(|id| organizations.get(id).cloned())
            .collect())
    }

    async fn branches_by_ids(&self, ids: &[BranchId]) -> AppResult<Vec<Branch>> {
        let branches = self.branches.read().await;
        Ok(ids
            .iter()
            .filter_map(|id| branches.get(id).cloned())
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use tessera_application::{RoleRepository, RoleTemplateRepository, UserRoleRepository};
    use tessera_core::AppResult;
    use tessera_domain::{
        AccessLevel, OrganizationId, Role, RoleId, RoleTemplate, RoleTemplateId, RoleType, UserId,
    };

    use super::InMemoryAccessRepository;

    fn role(name: &str, organization_ids: Vec<OrganizationId>) -> AppResult<Role> {
        Role::new(
            RoleId::new(),
            name,
            AccessLevel::Organization,
            organization_ids,
            Vec::new(),
        )
    }

    #[tokio::test]
    async fn find_after_insert_roundtrips_on_identity() -> AppResult<()> {
        let repository = InMemoryAccessRepository::new();
        let organization_id = OrganizationId::new();
        let created = repository
            .insert(role("Manager - Acme", vec![organization_id])?)
            .await?;

        let found = repository.find_by_identity(&created.identity()).await?;
        assert!(found.is_some_and(|stored| stored.id() == created.id()));
        Ok(())
    }

    #[tokio::test]
    async fn reuse_or_insert_converges_on_one_row() -> AppResult<()> {
        let repository = InMemoryAccessRepository::new();
        let organization_id = OrganizationId::new();

        let first = repository
            .reuse_or_insert(role("Manager - Acme", vec![organization_id])?)
            .await?;
        let second = repository
            .reuse_or_insert(role("Manager - Acme", vec![organization_id])?)
            .await?;

        assert!(first.created);
        assert!(!second.created);
        assert_eq!(first.role.id(), second.role.id());
        Ok(())
    }

    #[tokio::test]
    async fn plain_insert_keeps_identity_duplicates() -> AppResult<()> {
        let repository = InMemoryAccessRepository::new();

        let first = repository.insert(role("Manager", Vec::new())?).await?;
        let second = repository.insert(role("Manager", Vec::new())?).await?;

        assert_ne!(first.id(), second.id());
        assert_eq!(repository.roles.read().await.len(), 2);
        Ok(())
    }

    #[tokio::test]
    async fn template_insert_if_absent_keeps_existing() -> AppResult<()> {
        let repository = InMemoryAccessRepository::new();

        let first = repository
            .insert_if_absent(RoleTemplate::new(
                RoleTemplateId::new(),
                "Manager",
                AccessLevel::Organization,
                RoleType::new("staff")?,
            )?)
            .await?;
        let second = repository
            .insert_if_absent(RoleTemplate::new(
                RoleTemplateId::new(),
                "Manager",
                AccessLevel::Global,
                RoleType::new("admin")?,
            )?)
            .await?;

        assert_eq!(first.id(), second.id());
        assert_eq!(second.access_level(), AccessLevel::Organization);
        Ok(())
    }

    #[tokio::test]
    async fn replace_roles_overwrites_grants() -> AppResult<()> {
        let repository = InMemoryAccessRepository::new();
        let user_id = UserId::new();

        let kept = repository.insert(role("Keeper", Vec::new())?).await?;
        let dropped = repository.insert(role("Dropped", Vec::new())?).await?;

        repository.add_role(user_id, dropped.id()).await?;
        repository.replace_roles(user_id, &[kept.id()]).await?;

        let held = repository.roles_for_user(user_id).await?;
        assert_eq!(held.len(), 1);
        assert_eq!(held[0].id(), kept.id());
        Ok(())
    }
}
