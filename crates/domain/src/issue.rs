use std::fmt::{Display, Formatter};
use std::str::FromStr;

use bugtrack_core::{AppError, AppResult, NonEmptyString};
use chrono::{DateTime, Utc};
use percent_encoding::percent_decode_str;
use serde::{Deserialize, Serialize};

use crate::{ProjectId, UserId};

/// Storage bucket holding bug attachments.
pub const ATTACHMENTS_BUCKET: &str = "attachments";

/// Identifier of a bug row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BugId(i64);

impl BugId {
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

impl Display for BugId {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        write!(formatter, "{}", self.0)
    }
}

/// Identifier of an attachment row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AttachmentId(i64);

impl AttachmentId {
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

impl Display for AttachmentId {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        write!(formatter, "{}", self.0)
    }
}

/// Workflow status of a bug.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BugStatus {
    /// Newly reported.
    #[serde(rename = "Open")]
    Open,
    /// Being worked on.
    #[serde(rename = "In Progress")]
    InProgress,
    /// Done.
    #[serde(rename = "Closed")]
    Closed,
    /// Legacy terminal status, reported together with `Closed`.
    #[serde(rename = "Resolved")]
    Resolved,
}

impl BugStatus {
    /// Returns the stored value.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Open => "Open",
            Self::InProgress => "In Progress",
            Self::Closed => "Closed",
            Self::Resolved => "Resolved",
        }
    }

    /// Statuses offered when editing a bug.
    #[must_use]
    pub fn selectable() -> &'static [Self] {
        &[Self::Open, Self::InProgress, Self::Closed]
    }

    /// Returns whether the status counts as closed on the dashboard.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        matches!(self, Self::Closed | Self::Resolved)
    }
}

impl FromStr for BugStatus {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "Open" => Ok(Self::Open),
            "In Progress" => Ok(Self::InProgress),
            "Closed" => Ok(Self::Closed),
            "Resolved" => Ok(Self::Resolved),
            _ => Err(AppError::Validation(format!(
                "unknown bug status '{value}'"
            ))),
        }
    }
}

/// Triage priority of a bug.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum BugPriority {
    /// Low priority.
    Low,
    /// Default priority.
    #[default]
    Medium,
    /// High priority.
    High,
    /// Drop everything.
    Critical,
}

impl BugPriority {
    /// Returns the stored value.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "Low",
            Self::Medium => "Medium",
            Self::High => "High",
            Self::Critical => "Critical",
        }
    }
}

impl FromStr for BugPriority {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "Low" => Ok(Self::Low),
            "Medium" => Ok(Self::Medium),
            "High" => Ok(Self::High),
            "Critical" => Ok(Self::Critical),
            _ => Err(AppError::Validation(format!(
                "unknown bug priority '{value}'"
            ))),
        }
    }
}

/// File attached to a bug.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attachment {
    /// Attachment id.
    pub id: AttachmentId,
    /// Owning bug.
    pub bug_id: BugId,
    /// Public URL of the stored blob.
    pub file_url: String,
    /// Original file name.
    pub file_name: String,
    /// MIME type.
    #[serde(default = "default_file_type")]
    pub file_type: String,
}

fn default_file_type() -> String {
    "application/octet-stream".to_owned()
}

impl Attachment {
    /// Returns the blob name inside the attachments bucket, if the URL points there.
    #[must_use]
    pub fn storage_path(&self) -> Option<String> {
        let marker = format!("/{ATTACHMENTS_BUCKET}/");
        let raw = self.file_url.rsplit_once(marker.as_str())?.1;
        let decoded = percent_decode_str(raw).decode_utf8().ok()?;

        (!decoded.is_empty()).then(|| decoded.into_owned())
    }
}

/// Bug row, with its attachments embedded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bug {
    /// Bug id.
    pub id: BugId,
    /// Short summary.
    pub title: String,
    /// Long description.
    #[serde(default)]
    pub description: Option<String>,
    /// Workflow status.
    pub status: BugStatus,
    /// Priority.
    #[serde(default)]
    pub priority: BugPriority,
    /// Free-form severity label.
    #[serde(default)]
    pub severity: Option<String>,
    /// Owning project.
    #[serde(default)]
    pub project_id: Option<ProjectId>,
    /// Module or component name.
    #[serde(default)]
    pub module: Option<String>,
    /// Environment where the bug was seen.
    #[serde(default)]
    pub environment: Option<String>,
    /// Assigned user.
    #[serde(default)]
    pub assignee_id: Option<UserId>,
    /// Reporting user.
    #[serde(default)]
    pub reporter_id: Option<UserId>,
    /// Reproduction steps.
    #[serde(default)]
    pub steps_to_reproduce: Option<String>,
    /// Expected behaviour.
    #[serde(default)]
    pub expected_result: Option<String>,
    /// Observed behaviour.
    #[serde(default)]
    pub actual_result: Option<String>,
    /// Creation time.
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    /// Embedded attachments.
    #[serde(default)]
    pub attachments: Vec<Attachment>,
}

impl Bug {
    /// Returns a copy with a different status.
    #[must_use]
    pub fn with_status(&self, status: BugStatus) -> Self {
        Self {
            status,
            ..self.clone()
        }
    }

    /// Returns a copy without the given attachment.
    #[must_use]
    pub fn without_attachment(&self, attachment_id: AttachmentId) -> Self {
        Self {
            attachments: self
                .attachments
                .iter()
                .filter(|attachment| attachment.id != attachment_id)
                .cloned()
                .collect(),
            ..self.clone()
        }
    }

    /// Finds an embedded attachment.
    #[must_use]
    pub fn attachment(&self, attachment_id: AttachmentId) -> Option<&Attachment> {
        self.attachments
            .iter()
            .find(|attachment| attachment.id == attachment_id)
    }
}

/// Writable bug fields for create and update.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BugDraft {
    /// Short summary.
    pub title: String,
    /// Long description.
    pub description: Option<String>,
    /// Workflow status.
    pub status: BugStatus,
    /// Priority.
    pub priority: BugPriority,
    /// Free-form severity label.
    pub severity: Option<String>,
    /// Owning project.
    pub project_id: Option<ProjectId>,
    /// Module or component name.
    pub module: Option<String>,
    /// Environment where the bug was seen.
    pub environment: Option<String>,
    /// Assigned user.
    pub assignee_id: Option<UserId>,
    /// Reporting user.
    pub reporter_id: Option<UserId>,
    /// Reproduction steps.
    pub steps_to_reproduce: Option<String>,
    /// Expected behaviour.
    pub expected_result: Option<String>,
    /// Observed behaviour.
    pub actual_result: Option<String>,
}

impl BugDraft {
    /// Creates a draft with the default status, priority and severity.
    pub fn new(title: impl Into<String>, reporter_id: Option<UserId>) -> AppResult<Self> {
        let title = NonEmptyString::new(title)?;

        Ok(Self {
            title: String::from(title).trim().to_owned(),
            description: None,
            status: BugStatus::Open,
            priority: BugPriority::Medium,
            severity: Some("Minor".to_owned()),
            project_id: None,
            module: None,
            environment: None,
            assignee_id: None,
            reporter_id,
            steps_to_reproduce: None,
            expected_result: None,
            actual_result: None,
        })
    }

    /// Normalizes blank optional text fields to `None` before persistence.
    #[must_use]
    pub fn normalized(self) -> Self {
        fn blank_to_none(value: Option<String>) -> Option<String> {
            value.filter(|text| !text.trim().is_empty())
        }

        Self {
            description: blank_to_none(self.description),
            severity: blank_to_none(self.severity),
            module: blank_to_none(self.module),
            environment: blank_to_none(self.environment),
            steps_to_reproduce: blank_to_none(self.steps_to_reproduce),
            expected_result: blank_to_none(self.expected_result),
            actual_result: blank_to_none(self.actual_result),
            ..self
        }
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use super::{Attachment, AttachmentId, Bug, BugDraft, BugId, BugStatus};

    fn attachment(id: i64, url: &str) -> Attachment {
        Attachment {
            id: AttachmentId::new(id),
            bug_id: BugId::new(1),
            file_url: url.to_owned(),
            file_name: "shot.png".to_owned(),
            file_type: "image/png".to_owned(),
        }
    }

    #[test]
    fn storage_path_is_decoded_segment_after_bucket() {
        let attachment = attachment(
            1,
            "https://x.example.co/storage/v1/object/public/attachments/1700-abc%20def.png",
        );
        assert_eq!(attachment.storage_path().as_deref(), Some("1700-abc def.png"));
    }

    #[test]
    fn storage_path_is_none_outside_bucket() {
        let attachment = attachment(1, "https://cdn.example.com/other/file.png");
        assert_eq!(attachment.storage_path(), None);
    }

    #[test]
    fn status_parses_stored_values() {
        assert_eq!(BugStatus::from_str("In Progress").ok(), Some(BugStatus::InProgress));
        assert!(BugStatus::from_str("Done").is_err());
        assert!(BugStatus::Resolved.is_closed());
        assert!(!BugStatus::Open.is_closed());
    }

    #[test]
    fn bug_row_embeds_attachments() {
        let bug: Result<Bug, _> = serde_json::from_str(
            r#"{
                "id": 7,
                "title": "Crash on save",
                "status": "In Progress",
                "priority": "High",
                "created_at": "2024-03-01T10:00:00+00:00",
                "attachments": [
                    {"id": 3, "bug_id": 7, "file_url": "https://h/attachments/a.png", "file_name": "a.png"}
                ]
            }"#,
        );
        let bug = bug.ok();

        assert_eq!(bug.as_ref().map(|bug| bug.status), Some(BugStatus::InProgress));
        assert_eq!(
            bug.as_ref()
                .and_then(|bug| bug.attachment(AttachmentId::new(3)))
                .map(|attachment| attachment.file_type.as_str()),
            Some("application/octet-stream")
        );
        assert_eq!(
            bug.map(|bug| bug.without_attachment(AttachmentId::new(3)).attachments.len()),
            Some(0)
        );
    }

    #[test]
    fn draft_rejects_blank_title_and_normalizes_blanks() {
        assert!(BugDraft::new("   ", None).is_err());

        let draft = BugDraft::new("Broken link", None).map(|mut draft| {
            draft.module = Some("  ".to_owned());
            draft.normalized()
        });
        assert_eq!(draft.ok().and_then(|draft| draft.module), None);
    }
}
