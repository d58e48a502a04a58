use std::fmt::{Display, Formatter};

use bugtrack_core::{AppError, AppResult, NonEmptyString};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Maximum project key length.
pub const PROJECT_KEY_MAX_LENGTH: usize = 5;

/// Identifier of a project row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProjectId(i64);

impl ProjectId {
    /// Wraps a stored id.
    #[must_use]
    pub fn new(value: i64) -> Self {
        Self(value)
    }

    /// Returns the stored id.
    #[must_use]
    pub fn value(&self) -> i64 {
        self.0
    }
}

impl Display for ProjectId {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        write!(formatter, "{}", self.0)
    }
}

/// Project row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Project {
    /// Project id.
    pub id: ProjectId,
    /// Display name.
    pub name: String,
    /// Unique short key, upper-case.
    pub key: String,
    /// Optional description.
    #[serde(default)]
    pub description: Option<String>,
    /// Creation time.
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

/// Validated input for a new project.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProjectDraft {
    name: String,
    key: String,
    description: Option<String>,
}

impl ProjectDraft {
    /// Validates a new project. The key is trimmed and upper-cased.
    pub fn new(
        name: impl Into<String>,
        key: impl Into<String>,
        description: Option<String>,
    ) -> AppResult<Self> {
        let name = NonEmptyString::new(name)?;
        let key = NonEmptyString::new(key)?;
        let key = key.as_str().trim().to_uppercase();

        if key.chars().count() > PROJECT_KEY_MAX_LENGTH {
            return Err(AppError::Validation(format!(
                "project key must not exceed {PROJECT_KEY_MAX_LENGTH} characters"
            )));
        }

        Ok(Self {
            name: String::from(name).trim().to_owned(),
            key,
            description: description.filter(|text| !text.trim().is_empty()),
        })
    }

    /// Returns the project name.
    #[must_use]
    pub fn name(&self) -> &str {
        self.name.as_str()
    }

    /// Returns the normalized key.
    #[must_use]
    pub fn key(&self) -> &str {
        self.key.as_str()
    }

    /// Returns the description.
    #[must_use]
    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::ProjectDraft;

    #[test]
    fn key_is_uppercased() {
        let draft = ProjectDraft::new("Website", " web ", None);
        assert_eq!(draft.ok().map(|draft| draft.key().to_owned()), Some("WEB".to_owned()));
    }

    #[test]
    fn long_key_is_rejected() {
        assert!(ProjectDraft::new("Website", "WEBSITE", None).is_err());
    }

    #[test]
    fn blank_description_is_dropped() {
        let draft = ProjectDraft::new("Website", "WEB", Some(" ".to_owned()));
        assert_eq!(draft.ok().and_then(|draft| draft.description().map(str::to_owned)), None);
    }
}
