use crate::error::ModelError;

/// The closed set of roles a user can hold.
///
/// Wire format is the raw integer the backend stores (`role_id`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(try_from = "u8", into = "u8"))]
pub enum UserRole {
    Admin = 1,
    Moderator = 2,
    User = 3,
}

impl Default for UserRole {
    fn default() -> Self {
        UserRole::User
    }
}

impl TryFrom<u8> for UserRole {
    type Error = ModelError;

    fn try_from(raw: u8) -> Result<Self, Self::Error> {
        match raw {
            1 => Ok(UserRole::Admin),
            2 => Ok(UserRole::Moderator),
            3 => Ok(UserRole::User),
            other => Err(ModelError::InvalidRole(other)),
        }
    }
}

impl From<UserRole> for u8 {
    fn from(role: UserRole) -> Self {
        role as u8
    }
}

impl std::fmt::Display for UserRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            UserRole::Admin => write!(f, "Admin"),
            UserRole::Moderator => write!(f, "Moderator"),
            UserRole::User => write!(f, "User"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_known_role_ids() {
        for raw in 1..=3u8 {
            let role = UserRole::try_from(raw).unwrap();
            assert_eq!(u8::from(role), raw);
        }
    }

    #[test]
    fn rejects_unknown_role_id() {
        assert!(UserRole::try_from(0).is_err());
        assert!(UserRole::try_from(4).is_err());
    }

    #[test]
    fn defaults_to_regular_user() {
        assert_eq!(UserRole::default(), UserRole::User);
    }
}
