//! User domain types and validation rules.

use bugtrack_core::{AppError, AppResult};
use percent_encoding::{NON_ALPHANUMERIC, utf8_percent_encode};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::RoleName;

/// Unique identifier for a user record. Matches the auth service's user id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(Uuid);

impl UserId {
    /// Creates a new random user identifier.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Creates a user identifier from an existing UUID value.
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

impl Default for UserId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for UserId {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(formatter, "{}", self.0)
    }
}

/// Validated email address.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EmailAddress(String);

impl EmailAddress {
    /// Creates a validated email address.
    ///
    /// Performs basic structural validation: non-empty, contains exactly one `@`,
    /// local part and domain are non-empty, domain contains at least one `.`.
    pub fn new(value: impl Into<String>) -> AppResult<Self> {
        let value = value.into();
        let trimmed = value.trim().to_lowercase();

        if trimmed.is_empty() {
            return Err(AppError::Validation(
                "email address must not be empty".to_owned(),
            ));
        }

        let Some((local, domain)) = trimmed.split_once('@') else {
            return Err(AppError::Validation(
                "email address must contain exactly one '@'".to_owned(),
            ));
        };

        if domain.contains('@') {
            return Err(AppError::Validation(
                "email address must contain exactly one '@'".to_owned(),
            ));
        }

        if local.is_empty() {
            return Err(AppError::Validation(
                "email local part must not be empty".to_owned(),
            ));
        }

        if domain.is_empty() || !domain.contains('.') {
            return Err(AppError::Validation(
                "email domain must contain at least one '.'".to_owned(),
            ));
        }

        if trimmed.len() > 254 {
            return Err(AppError::Validation(
                "email address must not exceed 254 characters".to_owned(),
            ));
        }

        Ok(Self(trimmed))
    }

    /// Returns the validated email string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl From<EmailAddress> for String {
    fn from(value: EmailAddress) -> Self {
        value.0
    }
}

/// Minimum length accepted by the hosted auth service.
pub const PASSWORD_MIN_LENGTH: usize = 6;

/// Validates a new password and its confirmation before it is sent anywhere.
pub fn validate_new_password(password: &str, confirmation: &str) -> AppResult<()> {
    if password.chars().count() < PASSWORD_MIN_LENGTH {
        return Err(AppError::Validation(format!(
            "Password must be at least {PASSWORD_MIN_LENGTH} characters"
        )));
    }

    if password != confirmation {
        return Err(AppError::Validation("Passwords do not match".to_owned()));
    }

    Ok(())
}

/// Storage bucket holding uploaded profile pictures.
pub const AVATARS_BUCKET: &str = "avatars";

/// Builds the generated avatar URL used for new profiles.
#[must_use]
pub fn avatar_url_for(name: &str) -> String {
    format!(
        "https://ui-avatars.com/api/?name={}&background=random",
        utf8_percent_encode(name, NON_ALPHANUMERIC)
    )
}

/// Profile row from the `users` collection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    /// User id, equal to the auth subject.
    pub id: UserId,
    /// Display name.
    #[serde(default)]
    pub name: Option<String>,
    /// Contact email.
    #[serde(default)]
    pub email: Option<String>,
    /// Avatar image URL.
    #[serde(default)]
    pub avatar: Option<String>,
    /// Assigned role; `Developer` when unset or absent.
    #[serde(default)]
    pub role: RoleName,
}

impl UserProfile {
    /// Returns the display name or a placeholder.
    #[must_use]
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or("Unknown User")
    }

    /// Returns a copy carrying a different role.
    #[must_use]
    pub fn with_role(&self, role: RoleName) -> Self {
        Self {
            role,
            ..self.clone()
        }
    }

    /// Case-insensitive match on name or email.
    #[must_use]
    pub fn matches_search(&self, term: &str) -> bool {
        let term = term.to_lowercase();
        [self.name.as_deref(), self.email.as_deref()]
            .into_iter()
            .flatten()
            .any(|value| value.to_lowercase().contains(term.as_str()))
    }
}

#[cfg(test)]
mod tests {
    use super::{EmailAddress, UserProfile, avatar_url_for, validate_new_password};
    use crate::RoleName;

    #[test]
    fn email_requires_single_at_sign() {
        assert!(EmailAddress::new("a@b@example.com").is_err());
        assert!(EmailAddress::new("no-at-sign.example.com").is_err());
        assert_eq!(
            EmailAddress::new(" Jane@Example.com ").ok().map(String::from),
            Some("jane@example.com".to_owned())
        );
    }

    #[test]
    fn short_password_is_rejected() {
        let error = validate_new_password("12345", "12345");
        assert!(error.is_err());
    }

    #[test]
    fn mismatched_confirmation_is_rejected() {
        let error = validate_new_password("123456", "1234567");
        assert_eq!(
            error.err().map(|error| error.message().to_owned()),
            Some("Passwords do not match".to_owned())
        );
    }

    #[test]
    fn avatar_url_encodes_name() {
        assert_eq!(
            avatar_url_for("jane doe"),
            "https://ui-avatars.com/api/?name=jane%20doe&background=random"
        );
    }

    #[test]
    fn profile_without_role_column_defaults_to_developer() {
        let profile: Result<UserProfile, _> = serde_json::from_str(
            r#"{"id": "6f1c1d3e-0c7a-4a55-9a51-2f1f0d1e9b10", "name": "Ana", "email": "ana@example.com"}"#,
        );
        assert_eq!(
            profile.ok().map(|profile| profile.role),
            Some(RoleName::developer())
        );
    }

    #[test]
    fn search_matches_name_or_email_ignoring_case() {
        let profile = UserProfile {
            id: super::UserId::new(),
            name: Some("Ana Lima".to_owned()),
            email: Some("ana@example.com".to_owned()),
            avatar: None,
            role: RoleName::developer(),
        };

        assert!(profile.matches_search("LIMA"));
        assert!(profile.matches_search("example"));
        assert!(!profile.matches_search("bruno"));
    }
}
