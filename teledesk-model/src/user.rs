use std::collections::HashMap;

use chrono::{DateTime, Utc};
use url::Url;

use crate::error::{ModelError, Result as ModelResult};
use crate::ids::UserId;
use crate::role::UserRole;

/// A registered user as stored by the backend.
///
/// `extra_fields` is an open-ended attribute map (`extraFields` on the wire);
/// keys are unique within a user, values are free-form strings.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct User {
    pub id: UserId,
    pub telegram_uid: i64,
    pub first_name: String,
    pub last_name: String,
    #[cfg_attr(
        feature = "serde",
        serde(default, skip_serializing_if = "Option::is_none")
    )]
    pub tg_username: Option<String>,
    #[cfg_attr(
        feature = "serde",
        serde(default, skip_serializing_if = "Option::is_none")
    )]
    pub photo_url: Option<String>,
    pub role_id: UserRole,
    pub created_at: DateTime<Utc>,
    #[cfg_attr(
        feature = "serde",
        serde(
            rename = "extraFields",
            default,
            skip_serializing_if = "HashMap::is_empty"
        )
    )]
    pub extra_fields: HashMap<String, String>,
}

/// Creation payload: a [`User`] minus the server-assigned `id`.
///
/// `role_id` and `created_at` may be left unset; [`NewUser::with_defaults`]
/// fills them before the record is posted.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct NewUser {
    pub telegram_uid: i64,
    pub first_name: String,
    pub last_name: String,
    #[cfg_attr(feature = "serde", serde(skip_serializing_if = "Option::is_none"))]
    pub tg_username: Option<String>,
    #[cfg_attr(feature = "serde", serde(skip_serializing_if = "Option::is_none"))]
    pub photo_url: Option<String>,
    #[cfg_attr(feature = "serde", serde(skip_serializing_if = "Option::is_none"))]
    pub role_id: Option<UserRole>,
    #[cfg_attr(feature = "serde", serde(skip_serializing_if = "Option::is_none"))]
    pub created_at: Option<DateTime<Utc>>,
    #[cfg_attr(
        feature = "serde",
        serde(rename = "extraFields", skip_serializing_if = "HashMap::is_empty")
    )]
    pub extra_fields: HashMap<String, String>,
}

impl NewUser {
    /// Check the constraints the backend does not enforce for us.
    pub fn validate(&self) -> ModelResult<()> {
        if self.first_name.trim().is_empty() {
            return Err(ModelError::InvalidUser(
                "first_name must not be empty".to_string(),
            ));
        }
        if self.last_name.trim().is_empty() {
            return Err(ModelError::InvalidUser(
                "last_name must not be empty".to_string(),
            ));
        }
        if let Some(photo_url) = &self.photo_url {
            validate_photo_url(photo_url)?;
        }
        Ok(())
    }

    /// Fill unset `role_id` and `created_at` with their creation-time
    /// defaults (regular user, current UTC instant).
    pub fn with_defaults(mut self) -> Self {
        self.role_id = Some(self.role_id.unwrap_or_default());
        self.created_at = Some(self.created_at.unwrap_or_else(Utc::now));
        self
    }
}

/// `photo_url` must be an absolute http(s) URL when present.
pub fn validate_photo_url(raw: &str) -> ModelResult<()> {
    let parsed =
        Url::parse(raw).map_err(|err| ModelError::InvalidUrl(format!("{raw}: {err}")))?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(ModelError::InvalidUrl(format!(
            "{raw}: expected an absolute http(s) url"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn payload() -> NewUser {
        NewUser {
            telegram_uid: 100,
            first_name: "Ivan".to_string(),
            last_name: "Ivanov".to_string(),
            tg_username: Some("ivanov".to_string()),
            photo_url: None,
            role_id: None,
            created_at: None,
            extra_fields: HashMap::new(),
        }
    }

    #[test]
    fn validate_rejects_blank_names() {
        let mut new_user = payload();
        new_user.first_name = "  ".to_string();
        assert!(new_user.validate().is_err());

        let mut new_user = payload();
        new_user.last_name = String::new();
        assert!(new_user.validate().is_err());
    }

    #[test]
    fn validate_checks_photo_url_shape() {
        let mut new_user = payload();
        new_user.photo_url = Some("https://t.me/i/userpic/ivanov.jpg".to_string());
        assert!(new_user.validate().is_ok());

        new_user.photo_url = Some("userpic/ivanov.jpg".to_string());
        assert!(new_user.validate().is_err());

        new_user.photo_url = Some("ftp://t.me/userpic.jpg".to_string());
        assert!(new_user.validate().is_err());
    }

    #[test]
    fn with_defaults_fills_role_and_timestamp() {
        let filled = payload().with_defaults();
        assert_eq!(filled.role_id, Some(UserRole::User));
        assert!(filled.created_at.is_some());
    }

    #[test]
    fn with_defaults_keeps_explicit_values() {
        let mut new_user = payload();
        new_user.role_id = Some(UserRole::Moderator);
        let stamp = "2025-05-29T12:00:00Z".parse::<DateTime<Utc>>().unwrap();
        new_user.created_at = Some(stamp);

        let filled = new_user.with_defaults();
        assert_eq!(filled.role_id, Some(UserRole::Moderator));
        assert_eq!(filled.created_at, Some(stamp));
    }
}
