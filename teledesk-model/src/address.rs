use crate::ids::{AddressId, UserId};

/// A postal address owned by a user.
///
/// Deletion is soft: `is_deleted` rows stay in the backend (and may stay in
/// client caches) but are excluded from user-facing views. The `appartment`
/// spelling is the backend's.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Address {
    pub id: AddressId,
    pub user_id: UserId,
    pub country: String,
    pub city: String,
    pub street: String,
    pub building: String,
    #[cfg_attr(
        feature = "serde",
        serde(default, skip_serializing_if = "Option::is_none")
    )]
    pub appartment: Option<String>,
    pub postal_code: String,
    pub is_deleted: bool,
}

/// Creation payload: an [`Address`] minus the server-assigned `id`.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct NewAddress {
    pub user_id: UserId,
    pub country: String,
    pub city: String,
    pub street: String,
    pub building: String,
    #[cfg_attr(feature = "serde", serde(skip_serializing_if = "Option::is_none"))]
    pub appartment: Option<String>,
    pub postal_code: String,
    #[cfg_attr(feature = "serde", serde(skip_serializing_if = "Option::is_none"))]
    pub is_deleted: Option<bool>,
}

impl NewAddress {
    /// Fill an unset `is_deleted` flag; new addresses are live.
    pub fn with_defaults(mut self) -> Self {
        self.is_deleted = Some(self.is_deleted.unwrap_or(false));
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn with_defaults_marks_address_live() {
        let address = NewAddress {
            user_id: UserId(1),
            country: "Россия".to_string(),
            city: "Москва".to_string(),
            street: "Тверская".to_string(),
            building: "1".to_string(),
            appartment: None,
            postal_code: "125009".to_string(),
            is_deleted: None,
        };
        assert_eq!(address.with_defaults().is_deleted, Some(false));
    }

    #[test]
    fn with_defaults_respects_explicit_flag() {
        let address = NewAddress {
            user_id: UserId(1),
            country: "Россия".to_string(),
            city: "Москва".to_string(),
            street: "Тверская".to_string(),
            building: "1".to_string(),
            appartment: Some("12".to_string()),
            postal_code: "125009".to_string(),
            is_deleted: Some(true),
        };
        assert_eq!(address.with_defaults().is_deleted, Some(true));
    }
}
