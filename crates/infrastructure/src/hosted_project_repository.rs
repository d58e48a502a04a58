//! Hosted row-API adapter for the `projects` collection.

use async_trait::async_trait;
use bugtrack_application::ProjectRepository;
use bugtrack_core::{AppError, AppResult};
use bugtrack_domain::{Project, ProjectDraft, ProjectId};

use crate::hosted_backend_client::{HostedBackendClient, RowFilter, SortDirection};

const TABLE: &str = "projects";

/// Project repository backed by the hosted row API.
#[derive(Clone)]
pub struct HostedProjectRepository {
    client: HostedBackendClient,
}

impl HostedProjectRepository {
    /// Creates a repository over a shared backend client.
    #[must_use]
    pub fn new(client: HostedBackendClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ProjectRepository for HostedProjectRepository {
    async fn list_projects(&self) -> AppResult<Vec<Project>> {
        self.client
            .select(
                TABLE,
                &RowFilter::new().order("created_at", SortDirection::Descending),
            )
            .await
    }

    async fn insert_project(&self, draft: &ProjectDraft) -> AppResult<Project> {
        let stored: Vec<Project> = self
            .client
            .insert(TABLE, &RowFilter::new(), &[draft])
            .await?;

        stored.into_iter().next().ok_or_else(|| {
            AppError::Internal(format!(
                "backend returned no row for new project '{}'",
                draft.key()
            ))
        })
    }

    async fn delete_project(&self, project_id: ProjectId) -> AppResult<()> {
        self.client
            .delete(TABLE, &RowFilter::new().eq("id", project_id))
            .await
    }
}
