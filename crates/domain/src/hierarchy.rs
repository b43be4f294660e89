use serde::{Deserialize, Serialize};
use tessera_core::{AppResult, NonEmptyString};
use uuid::Uuid;

/// Unique identifier for an organization.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct OrganizationId(Uuid);

impl OrganizationId {
    /// Creates a new random organization identifier.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Creates an organization identifier from an existing UUID value.
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

impl Default for OrganizationId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for OrganizationId {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(formatter, "{}", self.0)
    }
}

/// Unique identifier for a branch.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct BranchId(Uuid);

impl BranchId {
    /// Creates a new random branch identifier.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Creates a branch identifier from an existing UUID value.
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

impl Default for BranchId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for BranchId {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(formatter, "{}", self.0)
    }
}

/// Hierarchy node a role's scope can reference.
///
/// The engine never walks the hierarchy; organizations are opaque scoping
/// nodes supplied by the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Organization {
    id: OrganizationId,
    name: NonEmptyString,
}

impl Organization {
    /// Creates a validated organization node.
    pub fn new(id: OrganizationId, name: impl Into<String>) -> AppResult<Self> {
        Ok(Self {
            id,
            name: NonEmptyString::new(name)?,
        })
    }

    /// Returns the organization identifier.
    #[must_use]
    pub fn id(&self) -> OrganizationId {
        self.id
    }

    /// Returns the organization display name.
    #[must_use]
    pub fn name(&self) -> &NonEmptyString {
        &self.name
    }
}

/// Hierarchy node below an organization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Branch {
    id: BranchId,
    organization_id: OrganizationId,
    name: NonEmptyString,
}

impl Branch {
    /// Creates a validated branch node.
    pub fn new(
        id: BranchId,
        organization_id: OrganizationId,
        name: impl Into<String>,
    ) -> AppResult<Self> {
        Ok(Self {
            id,
            organization_id,
            name: NonEmptyString::new(name)?,
        })
    }

    /// Returns the branch identifier.
    #[must_use]
    pub fn id(&self) -> BranchId {
        self.id
    }

    /// Returns the owning organization identifier.
    #[must_use]
    pub fn organization_id(&self) -> OrganizationId {
        self.organization_id
    }

    /// Returns the branch display name.
    #[must_use]
    pub fn name(&self) -> &NonEmptyString {
        &self.name
    }
}

#[cfg(test)]
mod tests {
    use super::{Branch, BranchId, Organization, OrganizationId};

    #[test]
    fn organization_requires_name() {
        assert!(Organization::new(OrganizationId::new(), "").is_err());
    }

    #[test]
    fn branch_keeps_owning_organization() {
        let organization_id = OrganizationId::new();
        let branch = Branch::new(BranchId::new(), organization_id, "North");
        assert!(branch.is_ok_and(|value| value.organization_id() == organization_id));
    }
}
