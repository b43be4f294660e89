use async_trait::async_trait;

use tessera_core::AppResult;
use tessera_domain::{
    Branch, BranchId, Organization, OrganizationId, Role, RoleId, RoleIdentity, RoleTemplate,
    RoleTemplateId, UserId,
};

/// Input payload for the create-or-update role entry point.
///
/// Required string fields arrive as options so missing and blank values can
/// be rejected with a missing-field error instead of a transport-level
/// deserialization failure.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CreateOrUpdateRoleInput {
    /// Template name the role is stamped from.
    pub role_name: Option<String>,
    /// Storage value of the requested access level.
    pub access_level: Option<String>,
    /// Role type label used when the template has to be created.
    pub role_type: Option<String>,
    /// Organization scope, by id.
    pub organization_ids: Vec<OrganizationId>,
    /// Branch scope, by id.
    pub branch_ids: Vec<BranchId>,
    /// Reuse an identity-equal role instead of creating a duplicate.
    pub use_existing: bool,
}

/// Input payload for the ad hoc role assignment path.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AssignRoleInput {
    /// Literal role name; this path bypasses the template registry.
    pub role_name: Option<String>,
    /// Storage value of the requested access level.
    pub access_level: Option<String>,
    /// Organization scope, by id.
    pub organization_ids: Vec<OrganizationId>,
    /// Branch scope, by id.
    pub branch_ids: Vec<BranchId>,
}

/// Outcome of a find-or-create role operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoleChange {
    /// The stored role after the operation.
    pub role: Role,
    /// Whether a new role row was created.
    pub created: bool,
}

/// Repository port for the role template registry.
#[async_trait]
pub trait RoleTemplateRepository: Send + Sync {
    /// Finds a template by its unique name.
    async fn find_by_name(&self, name: &str) -> AppResult<Option<RoleTemplate>>;

    /// Inserts a template unless one with the same name already exists,
    /// returning the stored row either way. The existing row always wins.
    async fn insert_if_absent(&self, template: RoleTemplate) -> AppResult<RoleTemplate>;

    /// Lists templates for an id set; unknown ids are dropped.
    async fn list_by_ids(&self, ids: &[RoleTemplateId]) -> AppResult<Vec<RoleTemplate>>;
}

/// Repository port for concrete roles.
#[async_trait]
pub trait RoleRepository: Send + Sync {
    /// Finds a role by exact identity-key match.
    async fn find_by_identity(&self, identity: &RoleIdentity) -> AppResult<Option<Role>>;

    /// Always creates a new role row, even when an identity-equal role
    /// exists (the tier expansion path depends on this).
    async fn insert(&self, role: Role) -> AppResult<Role>;

    /// Rewrites an existing role's name, access level, and scope sets in one
    /// atomic step, keyed by the role id.
    async fn update(&self, role: Role) -> AppResult<Role>;

    /// Finds an identity-equal role and rewrites it from the candidate, or
    /// inserts the candidate when none exists.
    ///
    /// Implementations must make this atomic with respect to concurrent
    /// calls carrying the same identity, so two racing callers converge on
    /// one row.
    async fn reuse_or_insert(&self, role: Role) -> AppResult<RoleChange>;

    /// Returns a role by id.
    async fn get(&self, role_id: RoleId) -> AppResult<Option<Role>>;

    /// Lists roles for an id set; unknown ids are dropped.
    async fn list_by_ids(&self, ids: &[RoleId]) -> AppResult<Vec<Role>>;
}

/// Repository port for the user-role join.
#[async_trait]
pub trait UserRoleRepository: Send + Sync {
    /// Returns the roles a user currently holds.
    async fn roles_for_user(&self, user_id: UserId) -> AppResult<Vec<Role>>;

    /// Replaces the user's entire role set.
    async fn replace_roles(&self, user_id: UserId, role_ids: &[RoleId]) -> AppResult<()>;

    /// Adds one role to the user's set, keeping existing grants.
    async fn add_role(&self, user_id: UserId, role_id: RoleId) -> AppResult<()>;
}

/// Repository port for hierarchy lookups.
#[async_trait]
pub trait DirectoryRepository: Send + Sync {
    /// Stores an organization node.
    async fn insert_organization(&self, organization: Organization) -> AppResult<Organization>;

    /// Stores a branch node.
    async fn insert_branch(&self, branch: Branch) -> AppResult<Branch>;

    /// Returns organizations for an id set in the caller's order; unknown
    /// ids are dropped.
    async fn organizations_by_ids(
        &self,
        ids: &[OrganizationId],
    ) -> AppResult<Vec<Organization>>;

    /// Returns branches for an id set in the caller's order; unknown ids
    /// are dropped.
    async fn branches_by_ids(&self, ids: &[BranchId]) -> AppResult<Vec<Branch>>;
}
