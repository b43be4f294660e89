//! Role templates, concrete roles, and the identity key used for
//! deduplication.
//!
//! A role's identity is `(name, access level, sorted organization ids,
//! sorted branch ids)`. Names are derived for display and are not unique on
//! their own; two roles may share a name as long as their scope differs.

use serde::{Deserialize, Serialize};
use tessera_core::{AppResult, NonEmptyString};
use uuid::Uuid;

use crate::access::{AccessLevel, RoleType};
use crate::hierarchy::{BranchId, Organization, OrganizationId};
use crate::user::Username;

/// Unique identifier for a role template.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RoleTemplateId(Uuid);

impl RoleTemplateId {
    /// Creates a new random template identifier.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Creates a template identifier from an existing UUID value.
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

impl Default for RoleTemplateId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for RoleTemplateId {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(formatter, "{}", self.0)
    }
}

/// Named blueprint from which concrete roles are stamped.
///
/// Templates are immutable once referenced by a role; the registry looks
/// them up by name with get-or-create semantics.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleTemplate {
    id: RoleTemplateId,
    name: NonEmptyString,
    access_level: AccessLevel,
    role_type: RoleType,
}

impl RoleTemplate {
    /// Creates a validated role template.
    pub fn new(
        id: RoleTemplateId,
        name: impl Into<String>,
        access_level: AccessLevel,
        role_type: RoleType,
    ) -> AppResult<Self> {
        Ok(Self {
            id,
            name: NonEmptyString::new(name)?,
            access_level,
            role_type,
        })
    }

    /// Returns the template identifier.
    #[must_use]
    pub fn id(&self) -> RoleTemplateId {
        self.id
    }

    /// Returns the unique template name.
    #[must_use]
    pub fn name(&self) -> &NonEmptyString {
        &self.name
    }

    /// Returns the access level stamped onto roles created from this
    /// template.
    #[must_use]
    pub fn access_level(&self) -> AccessLevel {
        self.access_level
    }

    /// Returns the template's role type label.
    #[must_use]
    pub fn role_type(&self) -> &RoleType {
        &self.role_type
    }
}

/// Unique identifier for a concrete role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RoleId(Uuid);

impl RoleId {
    /// Creates a new random role identifier.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Creates a role identifier from an existing UUID value.
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

impl Default for RoleId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for RoleId {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(formatter, "{}", self.0)
    }
}

/// Deduplication key for concrete roles.
///
/// Scope ids are sorted and deduplicated so equality is insensitive to the
/// order the caller supplied them in.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RoleIdentity {
    name: String,
    access_level: AccessLevel,
    organization_ids: Vec<OrganizationId>,
    branch_ids: Vec<BranchId>,
}

impl RoleIdentity {
    /// Creates a normalized identity key.
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        access_level: AccessLevel,
        organization_ids: Vec<OrganizationId>,
        branch_ids: Vec<BranchId>,
    ) -> Self {
        Self {
            name: name.into(),
            access_level,
            organization_ids: normalize_ids(organization_ids),
            branch_ids: normalize_ids(branch_ids),
        }
    }

    /// Returns the derived role name.
    #[must_use]
    pub fn name(&self) -> &str {
        self.name.as_str()
    }

    /// Returns the access level.
    #[must_use]
    pub fn access_level(&self) -> AccessLevel {
        self.access_level
    }

    /// Returns the sorted organization scope.
    #[must_use]
    pub fn organization_ids(&self) -> &[OrganizationId] {
        &self.organization_ids
    }

    /// Returns the sorted branch scope.
    #[must_use]
    pub fn branch_ids(&self) -> &[BranchId] {
        &self.branch_ids
    }
}

/// Concrete role held by users and memberships.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Role {
    id: RoleId,
    name: NonEmptyString,
    access_level: AccessLevel,
    organization_ids: Vec<OrganizationId>,
    branch_ids: Vec<BranchId>,
}

impl Role {
    /// Creates a role with a normalized scope.
    pub fn new(
        id: RoleId,
        name: impl Into<String>,
        access_level: AccessLevel,
        organization_ids: Vec<OrganizationId>,
        branch_ids: Vec<BranchId>,
    ) -> AppResult<Self> {
        Ok(Self {
            id,
            name: NonEmptyString::new(name)?,
            access_level,
            organization_ids: normalize_ids(organization_ids),
            branch_ids: normalize_ids(branch_ids),
        })
    }

    /// Stamps a new role from a template.
    ///
    /// The access level always comes from the template; the name is supplied
    /// by the caller because the two naming schemes (scope-based and
    /// per-member) diverge.
    pub fn from_template(
        template: &RoleTemplate,
        name: impl Into<String>,
        organization_ids: Vec<OrganizationId>,
        branch_ids: Vec<BranchId>,
    ) -> AppResult<Self> {
        Self::new(
            RoleId::new(),
            name,
            template.access_level(),
            organization_ids,
            branch_ids,
        )
    }

    /// Rewrites name, access level, and both scope sets from a template in
    /// one step, keeping the role identifier.
    ///
    /// This is the only mutation a role's scope permits after creation.
    pub fn apply_template(
        &mut self,
        template: &RoleTemplate,
        name: impl Into<String>,
        organization_ids: Vec<OrganizationId>,
        branch_ids: Vec<BranchId>,
    ) -> AppResult<()> {
        self.name = NonEmptyString::new(name)?;
        self.access_level = template.access_level();
        self.organization_ids = normalize_ids(organization_ids);
        self.branch_ids = normalize_ids(branch_ids);
        Ok(())
    }

    /// Returns the role identifier.
    #[must_use]
    pub fn id(&self) -> RoleId {
        self.id
    }

    /// Returns the derived role name.
    #[must_use]
    pub fn name(&self) -> &NonEmptyString {
        &self.name
    }

    /// Returns the access level.
    #[must_use]
    pub fn access_level(&self) -> AccessLevel {
        self.access_level
    }

    /// Returns the sorted organization scope.
    #[must_use]
    pub fn organization_ids(&self) -> &[OrganizationId] {
        &self.organization_ids
    }

    /// Returns the sorted branch scope.
    #[must_use]
    pub fn branch_ids(&self) -> &[BranchId] {
        &self.branch_ids
    }

    /// Returns the deduplication key for this role.
    #[must_use]
    pub fn identity(&self) -> RoleIdentity {
        RoleIdentity::new(
            self.name.as_str(),
            self.access_level,
            self.organization_ids.clone(),
            self.branch_ids.clone(),
        )
    }
}

/// Resolves the display name for a scope-based role.
///
/// With no organizations the template name is used unchanged; otherwise the
/// first organization qualifies it. The name is advisory: deduplication goes
/// through [`RoleIdentity`], never the name alone.
#[must_use]
pub fn resolve_role_name(template_name: &str, organizations: &[Organization]) -> String {
    match organizations.first() {
        Some(organization) => format!("{template_name} - {}", organization.name().as_str()),
        None => template_name.to_owned(),
    }
}

/// Resolves the display name for a role granted through a membership tier.
///
/// Tier expansion uniquifies per member rather than per scope, so this path
/// deliberately does not use [`resolve_role_name`].
#[must_use]
pub fn member_role_name(template_name: &str, username: &Username) -> String {
    format!("{template_name} - {}", username.as_str())
}

fn normalize_ids<T: Ord + Copy>(mut ids: Vec<T>) -> Vec<T> {
    ids.sort_unstable();
    ids.dedup();
    ids
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;
    use uuid::Uuid;

    use tessera_core::AppResult;

    use crate::access::{AccessLevel, RoleType};
    use crate::hierarchy::{BranchId, Organization, OrganizationId};
    use crate::user::Username;

    use super::{
        Role, RoleId, RoleIdentity, RoleTemplate, RoleTemplateId, member_role_name,
        resolve_role_name,
    };

    fn template(name: &str, access_level: AccessLevel) -> AppResult<RoleTemplate> {
        RoleTemplate::new(
            RoleTemplateId::new(),
            name,
            access_level,
            RoleType::new("staff")?,
        )
    }

    #[test]
    fn name_without_organizations_is_template_name() {
        assert_eq!(resolve_role_name("Manager", &[]), "Manager");
    }

    #[test]
    fn name_with_organizations_uses_first() -> AppResult<()> {
        let organizations = vec![
            Organization::new(OrganizationId::new(), "Acme")?,
            Organization::new(OrganizationId::new(), "Globex")?,
        ];
        assert_eq!(
            resolve_role_name("Manager", &organizations),
            "Manager - Acme"
        );
        Ok(())
    }

    #[test]
    fn member_name_uniquifies_per_user() -> AppResult<()> {
        let username = Username::new("alice")?;
        assert_eq!(member_role_name("Manager", &username), "Manager - alice");
        Ok(())
    }

    #[test]
    fn from_template_takes_template_access_level() -> AppResult<()> {
        let template = template("Auditor", AccessLevel::Organization)?;
        let role = Role::from_template(&template, "Auditor - Acme", Vec::new(), Vec::new())?;
        assert_eq!(role.access_level(), AccessLevel::Organization);
        Ok(())
    }

    #[test]
    fn apply_template_rewrites_name_and_scope_together() -> AppResult<()> {
        let original = template("Auditor", AccessLevel::Organization)?;
        let replacement = template("Auditor", AccessLevel::Branch)?;
        let organization_id = OrganizationId::new();
        let branch_id = BranchId::new();

        let mut role =
            Role::from_template(&original, "Auditor - Acme", vec![organization_id], Vec::new())?;
        role.apply_template(&replacement, "Auditor", Vec::new(), vec![branch_id])?;

        assert_eq!(role.name().as_str(), "Auditor");
        assert_eq!(role.access_level(), AccessLevel::Branch);
        assert!(role.organization_ids().is_empty());
        assert_eq!(role.branch_ids(), [branch_id]);
        Ok(())
    }

    #[test]
    fn identity_deduplicates_scope_ids() {
        let organization_id = OrganizationId::new();
        let identity = RoleIdentity::new(
            "Manager",
            AccessLevel::Organization,
            vec![organization_id, organization_id],
            Vec::new(),
        );
        assert_eq!(identity.organization_ids().len(), 1);
    }

    #[test]
    fn roles_with_same_name_but_different_scope_have_distinct_identity() -> AppResult<()> {
        let template = template("Manager", AccessLevel::Organization)?;
        let first = Role::from_template(
            &template,
            "Manager",
            vec![OrganizationId::new()],
            Vec::new(),
        )?;
        let second = Role::from_template(
            &template,
            "Manager",
            vec![OrganizationId::new()],
            Vec::new(),
        )?;
        assert_ne!(first.identity(), second.identity());
        Ok(())
    }

    proptest! {
        #[test]
        fn identity_is_insensitive_to_scope_order(
            organization_seeds in proptest::collection::vec(any::<u128>(), 0..6),
            branch_seeds in proptest::collection::vec(any::<u128>(), 0..6),
        ) {
            let organization_ids: Vec<OrganizationId> = organization_seeds
                .iter()
                .map(|seed| OrganizationId::from_uuid(Uuid::from_u128(*seed)))
                .collect();
            let branch_ids: Vec<BranchId> = branch_seeds
                .iter()
                .map(|seed| BranchId::from_uuid(Uuid::from_u128(*seed)))
                .collect();

            let mut reversed_organizations = organization_ids.clone();
            reversed_organizations.reverse();
            let mut reversed_branches = branch_ids.clone();
            reversed_branches.reverse();

            let forward = RoleIdentity::new(
                "Manager",
                AccessLevel::Branch,
                organization_ids,
                branch_ids,
            );
            let backward = RoleIdentity::new(
                "Manager",
                AccessLevel::Branch,
                reversed_organizations,
                reversed_branches,
            );

            prop_assert_eq!(forward, backward);
        }
    }

    #[test]
    fn role_id_formats_as_uuid() {
        assert_eq!(RoleId::new().to_string().len(), 36);
    }
}
