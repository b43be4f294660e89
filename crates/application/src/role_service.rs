use std::sync::Arc;

use tessera_core::{AppResult, required_field};
use tessera_domain::{
    AccessLevel, Role, RoleId, RoleTemplate, RoleTemplateId, RoleType, UserId, resolve_role_name,
};

use crate::role_ports::{
    AssignRoleInput, CreateOrUpdateRoleInput, DirectoryRepository, RoleChange, RoleRepository,
    RoleTemplateRepository, UserRoleRepository,
};

/// Application service for role resolution and assignment.
#[derive(Clone)]
pub struct RoleService {
    templates: Arc<dyn RoleTemplateRepository>,
    roles: Arc<dyn RoleRepository>,
    user_roles: Arc<dyn UserRoleRepository>,
    directory: Arc<dyn DirectoryRepository>,
}

impl RoleService {
    /// Creates a new service from required dependencies.
    #[must_use]
    pub fn new(
        templates: Arc<dyn RoleTemplateRepository>,
        roles: Arc<dyn RoleRepository>,
        user_roles: Arc<dyn UserRoleRepository>,
        directory: Arc<dyn DirectoryRepository>,
    ) -> Self {
        Self {
            templates,
            roles,
            user_roles,
            directory,
        }
    }

    /// Looks up a template by name, creating it when absent.
    ///
    /// The existing template always wins: a template created earlier keeps
    /// its access level and role type even when a later call passes
    /// different values. Callers who need the template to change must not
    /// rely on this method to do it.
    pub async fn get_or_create_template(
        &self,
        name: &str,
        access_level: AccessLevel,
        role_type: RoleType,
    ) -> AppResult<RoleTemplate> {
        if let Some(existing) = self.templates.find_by_name(name).await? {
            return Ok(existing);
        }

        let template = RoleTemplate::new(RoleTemplateId::new(), name, access_level, role_type)?;
        self.templates.insert_if_absent(template).await
    }

    /// Main entry point: stamps or reuses a role from a template.
    ///
    /// Resolves the template (get-or-create), loads the scope nodes, derives
    /// the display name, and then either reuses an identity-equal role
    /// (`use_existing`) or creates a fresh row. Repeated identical calls
    /// with `use_existing` converge on one role id.
    pub async fn create_or_update_role(
        &self,
        input: CreateOrUpdateRoleInput,
    ) -> AppResult<RoleChange> {
        let template_name = required_field(input.role_name.as_deref(), "role_name")?;
        let access_level: AccessLevel =
            required_field(input.access_level.as_deref(), "access_level")?.parse()?;
        let role_type = RoleType::new(required_field(input.role_type.as_deref(), "role_type")?)?;

        let template = self
            .get_or_create_template(&template_name, access_level, role_type)
            .await?;

        let organizations = self
            .directory
            .organizations_by_ids(&input.organization_ids)
            .await?;
        let branches = self.directory.branches_by_ids(&input.branch_ids).await?;

        let name = resolve_role_name(template.name().as_str(), &organizations);
        let candidate = Role::from_template(
            &template,
            name,
            organizations.iter().map(|node| node.id()).collect(),
            branches.iter().map(|node| node.id()).collect(),
        )?;

        if input.use_existing {
            self.roles.reuse_or_insert(candidate).await
        } else {
            let role = self.roles.insert(candidate).await?;
            Ok(RoleChange {
                role,
                created: true,
            })
        }
    }

    /// Grants one role to a user, additively.
    ///
    /// This is the ad hoc path: the role is keyed by the literal name and
    /// scope the caller supplies, bypassing the template registry, and the
    /// grant adds to the user's existing set. Full-set replacement goes
    /// through [`RoleService::replace_user_roles`] instead; the asymmetry is
    /// deliberate.
    pub async fn assign_role(&self, user_id: UserId, input: AssignRoleInput) -> AppResult<Role> {
        let role_name = required_field(input.role_name.as_deref(), "role_name")?;
        let access_level: AccessLevel =
            required_field(input.access_level.as_deref(), "access_level")?.parse()?;

        let organizations = self
            .directory
            .organizations_by_ids(&input.organization_ids)
            .await?;
        let branches = self.directory.branches_by_ids(&input.branch_ids).await?;

        let candidate = Role::new(
            RoleId::new(),
            role_name,
            access_level,
            organizations.iter().map(|node| node.id()).collect(),
            branches.iter().map(|node| node.id()).collect(),
        )?;

        let change = self.roles.reuse_or_insert(candidate).await?;
        self.user_roles
            .add_role(user_id, change.role.id())
            .await?;

        Ok(change.role)
    }

    /// Returns the roles a user currently holds.
    pub async fn user_roles(&self, user_id: UserId) -> AppResult<Vec<Role>> {
        self.user_roles.roles_for_user(user_id).await
    }

    /// Replaces the user's entire role set with the resolved id set.
    ///
    /// Unknown role ids are dropped by the filter-by-id-set contract; the
    /// resolved roles are returned so callers can see what was kept.
    pub async fn replace_user_roles(
        &self,
        user_id: UserId,
        role_ids: Vec<RoleId>,
    ) -> AppResult<Vec<Role>> {
        let resolved = self.roles.list_by_ids(&role_ids).await?;
        let resolved_ids: Vec<RoleId> = resolved.iter().map(|role| role.id()).collect();
        self.user_roles
            .replace_roles(user_id, &resolved_ids)
            .await?;

        Ok(resolved)
    }
}
