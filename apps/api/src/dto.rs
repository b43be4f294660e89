pub mod access;
pub mod auth;
pub mod memberships;
pub mod onboarding;

use tessera_core::{AppError, AppResult};
use uuid::Uuid;

/// Parses one transport id into a UUID.
pub fn parse_id(value: &str, field_name: &str) -> AppResult<Uuid> {
    Uuid::parse_str(value)
        .map_err(|_| AppError::Validation(format!("invalid {field_name} '{value}'")))
}

/// Parses a list of transport ids into UUIDs.
pub fn parse_ids(values: &[String], field_name: &str) -> AppResult<Vec<Uuid>> {
    values
        .iter()
        .map(|value| parse_id(value, field_name))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::{parse_id, parse_ids};

    #[test]
    fn malformed_id_is_rejected() {
        assert!(parse_id("not-a-uuid", "organization id").is_err());
    }

    #[test]
    fn id_list_roundtrips() {
        let id = uuid::Uuid::new_v4();
        let parsed = parse_ids(&[id.to_string()], "role id");
        assert!(parsed.is_ok_and(|values| values == [id]));
    }
}
