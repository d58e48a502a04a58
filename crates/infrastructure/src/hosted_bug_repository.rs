//! Hosted row-API adapters for the `bugs` and `attachments` collections.

use async_trait::async_trait;
use bugtrack_application::{AttachmentRepository, BugQuery, BugRepository, NewAttachment};
use bugtrack_core::{AppError, AppResult};
use bugtrack_domain::{Attachment, AttachmentId, Bug, BugDraft, BugId, BugStatus};
use serde::Serialize;
use serde_json::json;

use crate::hosted_backend_client::{HostedBackendClient, RowFilter, SortDirection};

const BUGS_TABLE: &str = "bugs";
const ATTACHMENTS_TABLE: &str = "attachments";
const BUG_COLUMNS: &str = "*,attachments(*)";

/// Bug repository backed by the hosted row API.
#[derive(Clone)]
pub struct HostedBugRepository {
    client: HostedBackendClient,
}

impl HostedBugRepository {
    /// Creates a repository over a shared backend client.
    #[must_use]
    pub fn new(client: HostedBackendClient) -> Self {
        Self { client }
    }
}

fn list_filter(query: BugQuery) -> RowFilter {
    let filter = RowFilter::new().select(BUG_COLUMNS);
    let filter = match query.project_id {
        Some(project_id) => filter.eq("project_id", project_id),
        None => filter,
    };
    filter.order("created_at", SortDirection::Descending)
}

fn status_filter(statuses: &[BugStatus]) -> RowFilter {
    match statuses {
        [] => RowFilter::new(),
        [status] => RowFilter::new().eq("status", status.as_str()),
        _ => {
            let names: Vec<&str> = statuses.iter().map(BugStatus::as_str).collect();
            RowFilter::new().in_list("status", &names)
        }
    }
}

#[async_trait]
impl BugRepository for HostedBugRepository {
    async fn list_bugs(&self, query: BugQuery) -> AppResult<Vec<Bug>> {
        self.client.select(BUGS_TABLE, &list_filter(query)).await
    }

    async fn insert_bug(&self, draft: &BugDraft) -> AppResult<Bug> {
        let stored: Vec<Bug> = self
            .client
            .insert(BUGS_TABLE, &RowFilter::new().select(BUG_COLUMNS), &[draft])
            .await?;

        stored.into_iter().next().ok_or_else(|| {
            AppError::Internal(format!("backend returned no row for new bug '{}'", draft.title))
        })
    }

    async fn update_bug(&self, bug_id: BugId, draft: &BugDraft) -> AppResult<()> {
        self.client
            .update(BUGS_TABLE, &RowFilter::new().eq("id", bug_id), draft)
            .await
    }

    async fn update_status(&self, bug_id: BugId, status: BugStatus) -> AppResult<()> {
        self.client
            .update(
                BUGS_TABLE,
                &RowFilter::new().eq("id", bug_id),
                &json!({ "status": status }),
            )
            .await
    }

    async fn delete_bug(&self, bug_id: BugId) -> AppResult<()> {
        self.client
            .delete(BUGS_TABLE, &RowFilter::new().eq("id", bug_id))
            .await
    }

    async fn count_bugs(&self, statuses: &[BugStatus]) -> AppResult<u64> {
        self.client.count(BUGS_TABLE, &status_filter(statuses)).await
    }
}

/// Attachment repository backed by the hosted row API.
#[derive(Clone)]
pub struct HostedAttachmentRepository {
    client: HostedBackendClient,
}

impl HostedAttachmentRepository {
    /// Creates a repository over a shared backend client.
    #[must_use]
    pub fn new(client: HostedBackendClient) -> Self {
        Self { client }
    }
}

#[derive(Serialize)]
struct AttachmentRow<'a> {
    bug_id: BugId,
    file_url: &'a str,
    file_name: &'a str,
    file_type: &'a str,
}

impl<'a> From<&'a NewAttachment> for AttachmentRow<'a> {
    fn from(attachment: &'a NewAttachment) -> Self {
        Self {
            bug_id: attachment.bug_id,
            file_url: attachment.file_url.as_str(),
            file_name: attachment.file_name.as_str(),
            file_type: attachment.file_type.as_str(),
        }
    }
}

#[async_trait]
impl AttachmentRepository for HostedAttachmentRepository {
    async fn insert_attachments(
        &self,
        attachments: Vec<NewAttachment>,
    ) -> AppResult<Vec<Attachment>> {
        if attachments.is_empty() {
            return Ok(Vec::new());
        }

        let rows: Vec<AttachmentRow<'_>> = attachments.iter().map(AttachmentRow::from).collect();
        self.client
            .insert(ATTACHMENTS_TABLE, &RowFilter::new(), &rows)
            .await
    }

    async fn delete_attachment(&self, attachment_id: AttachmentId) -> AppResult<()> {
        self.client
            .delete(ATTACHMENTS_TABLE, &RowFilter::new().eq("id", attachment_id))
            .await
    }
}

#[cfg(test)]
mod tests {
    use bugtrack_application::BugQuery;
    use bugtrack_domain::{BugStatus, ProjectId};

    use super::{list_filter, status_filter};

    #[test]
    fn project_listing_filters_before_ordering() {
        let filter = list_filter(BugQuery {
            project_id: Some(ProjectId::new(3)),
        });
        let keys: Vec<&str> = filter.pairs().iter().map(|(key, _)| key.as_str()).collect();

        assert_eq!(keys, vec!["select", "project_id", "order"]);
        assert_eq!(filter.pairs()[1].1, "eq.3");
    }

    #[test]
    fn status_groups_use_equality_or_membership() {
        assert!(status_filter(&[]).pairs().is_empty());
        assert_eq!(status_filter(&[BugStatus::Open]).pairs()[0].1, "eq.Open");
        assert_eq!(
            status_filter(&[BugStatus::Closed, BugStatus::Resolved]).pairs()[0].1,
            "in.(\"Closed\",\"Resolved\")"
        );
    }
}
