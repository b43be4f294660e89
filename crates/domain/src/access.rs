use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tessera_core::{AppError, AppResult, NonEmptyString};

/// Breadth of authority a role carries across the hierarchy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccessLevel {
    /// Authority across every organization and branch.
    Global,
    /// Authority scoped to a set of organizations.
    Organization,
    /// Authority scoped to a set of branches.
    Branch,
}

impl AccessLevel {
    /// Returns a stable storage value for this access level.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Global => "global",
            Self::Organization => "organization",
            Self::Branch => "branch",
        }
    }

    /// Returns all known access levels.
    #[must_use]
    pub fn all() -> &'static [Self] {
        const ALL: &[AccessLevel] = &[
            AccessLevel::Global,
            AccessLevel::Organization,
            AccessLevel::Branch,
        ];

        ALL
    }
}

impl FromStr for AccessLevel {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "global" => Ok(Self::Global),
            "organization" => Ok(Self::Organization),
            "branch" => Ok(Self::Branch),
            _ => Err(AppError::Validation(format!(
                "unknown access level '{value}'"
            ))),
        }
    }
}

/// Opaque label classifying what a role is for.
///
/// The value set is owned by operators, not this crate; the only rule is
/// non-emptiness.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RoleType(NonEmptyString);

impl RoleType {
    /// Creates a validated role type label.
    pub fn new(value: impl Into<String>) -> AppResult<Self> {
        Ok(Self(NonEmptyString::new(value)?))
    }

    /// Returns the underlying label.
    #[must_use]
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl From<RoleType> for String {
    fn from(value: RoleType) -> Self {
        value.0.into()
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use super::{AccessLevel, RoleType};

    #[test]
    fn access_level_roundtrip_storage_value() {
        for level in AccessLevel::all() {
            let restored = AccessLevel::from_str(level.as_str());
            assert!(restored.is_ok_and(|value| value == *level));
        }
    }

    #[test]
    fn unknown_access_level_is_rejected() {
        assert!(AccessLevel::from_str("regional").is_err());
    }

    #[test]
    fn blank_role_type_is_rejected() {
        assert!(RoleType::new(" ").is_err());
    }
}
