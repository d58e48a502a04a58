use std::fmt::{Display, Formatter};

use bugtrack_core::{AppError, AppResult};
use serde::{Deserialize, Deserializer, Serialize};

/// Maximum accepted role name length.
const ROLE_NAME_MAX_LENGTH: usize = 64;

/// Validated role name.
///
/// Roles are compared by value. `Admin` is the distinguished role that always
/// exists and cannot be edited or deleted.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct RoleName(String);

impl RoleName {
    /// Name of the distinguished, always fully permitted role.
    pub const ADMIN: &'static str = "Admin";
    /// Baseline role for users whose stored role is missing.
    pub const DEVELOPER: &'static str = "Developer";
    /// Built-in manager role.
    pub const MANAGER: &'static str = "Manager";
    /// Built-in quality assurance role.
    pub const QA: &'static str = "QA";
    /// Built-in reporter role.
    pub const REPORTER: &'static str = "Reporter";
    /// Built-in read-mostly role.
    pub const GUEST: &'static str = "Guest";

    /// Creates a validated role name.
    pub fn new(value: impl Into<String>) -> AppResult<Self> {
        let value = value.into();
        let trimmed = value.trim();

        if trimmed.is_empty() {
            return Err(AppError::Validation(
                "role name must not be empty".to_owned(),
            ));
        }

        if trimmed.chars().count() > ROLE_NAME_MAX_LENGTH {
            return Err(AppError::Validation(format!(
                "role name must not exceed {ROLE_NAME_MAX_LENGTH} characters"
            )));
        }

        Ok(Self(trimmed.to_owned()))
    }

    /// Returns the distinguished admin role.
    #[must_use]
    pub fn admin() -> Self {
        Self(Self::ADMIN.to_owned())
    }

    /// Returns the baseline developer role.
    #[must_use]
    pub fn developer() -> Self {
        Self(Self::DEVELOPER.to_owned())
    }

    /// Returns the roles seeded with every installation, in display order.
    #[must_use]
    pub fn built_in() -> Vec<Self> {
        [
            Self::ADMIN,
            Self::MANAGER,
            Self::DEVELOPER,
            Self::QA,
            Self::GUEST,
        ]
        .into_iter()
        .map(|name| Self(name.to_owned()))
        .collect()
    }

    /// Returns the role name.
    #[must_use]
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }

    /// Returns whether this is the distinguished admin role.
    #[must_use]
    pub fn is_admin(&self) -> bool {
        self.0 == Self::ADMIN
    }

    /// Returns whether holders of this role may be picked as bug assignees.
    #[must_use]
    pub fn is_assignable(&self) -> bool {
        self.0 != Self::REPORTER && self.0 != Self::GUEST
    }

    /// Parses an optional stored value, falling back to the baseline role.
    #[must_use]
    pub fn from_stored(value: Option<&str>) -> Self {
        value
            .and_then(|stored| Self::new(stored).ok())
            .unwrap_or_else(Self::developer)
    }
}

impl Default for RoleName {
    fn default() -> Self {
        Self::developer()
    }
}

impl Display for RoleName {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        formatter.write_str(self.0.as_str())
    }
}

impl<'de> Deserialize<'de> for RoleName {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = Option::<String>::deserialize(deserializer)?;
        Ok(Self::from_stored(value.as_deref()))
    }
}
