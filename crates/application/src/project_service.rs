//! Project listing, creation and deletion.

use std::sync::Arc;

use bugtrack_core::AppError;
use bugtrack_domain::{Capability, Project, ProjectDraft, ProjectId};
use tracing::{error, info, warn};

use crate::{
    LocalCollection, MutationLabels, MutationOutcome, OptimisticController, ProjectRepository,
    RecordChange, SessionContext,
};

const DUPLICATE_KEY_MESSAGE: &str =
    "A project with this Key already exists. Please choose a unique Key (e.g., WEB2).";

/// Application service behind the projects screen.
#[derive(Clone)]
pub struct ProjectService {
    repository: Arc<dyn ProjectRepository>,
    controller: OptimisticController,
    projects: LocalCollection<Project>,
}

impl ProjectService {
    /// Creates a new project service.
    #[must_use]
    pub fn new(repository: Arc<dyn ProjectRepository>, controller: OptimisticController) -> Self {
        Self {
            repository,
            controller,
            projects: LocalCollection::default(),
        }
    }

    /// Loaded projects, newest first.
    #[must_use]
    pub fn projects(&self) -> Arc<Vec<Project>> {
        self.projects.snapshot()
    }

    /// Reloads projects.
    pub async fn load(&self) {
        match self.repository.list_projects().await {
            Ok(projects) => self.projects.replace(projects),
            Err(load_error) => {
                error!(error = %load_error, "failed to load projects");
                self.projects.replace(Vec::new());
            }
        }
    }

    /// Creates a project and reloads the list.
    pub async fn create(
        &self,
        name: &str,
        key: &str,
        description: Option<String>,
    ) -> Option<Project> {
        let draft = match ProjectDraft::new(name, key, description) {
            Ok(draft) => draft,
            Err(invalid) => {
                self.controller.reject(invalid);
                return None;
            }
        };

        match self.repository.insert_project(&draft).await {
            Ok(project) => {
                info!(project_id = %project.id, key = %project.key, "project created");
                self.load().await;
                Some(project)
            }
            Err(AppError::Conflict(detail)) => {
                warn!(key = draft.key(), detail = %detail, "duplicate project key");
                self.controller
                    .reject(AppError::Conflict(DUPLICATE_KEY_MESSAGE.to_owned()));
                None
            }
            Err(insert_error) => {
                error!(error = %insert_error, "failed to create project");
                self.controller.notices().error(format!(
                    "Error creating project: {}",
                    insert_error.message()
                ));
                None
            }
        }
    }

    /// Deletes a project; the backend cascades to its bugs.
    pub async fn delete(&self, session: &SessionContext, project_id: ProjectId) -> MutationOutcome {
        if let Err(denied) = session.require(Capability::CanDeleteProject) {
            return self.controller.reject(denied);
        }

        let repository = Arc::clone(&self.repository);
        self.controller
            .execute(
                &self.projects,
                project_id,
                MutationLabels::new("Error deleting project"),
                |_| Ok(RecordChange::Remove),
                move |_| async move { repository.delete_project(project_id).await },
            )
            .await
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use bugtrack_core::AppError;
    use bugtrack_domain::ProjectId;

    use crate::test_support::{FakePolicies, FakeProjects, context_for, profile};
    use crate::{MutationOutcome, NoticeBoard, OptimisticController};

    use super::ProjectService;

    fn service(projects: Arc<FakeProjects>) -> (ProjectService, NoticeBoard) {
        let board = NoticeBoard::default();
        (
            ProjectService::new(projects, OptimisticController::new(board.clone())),
            board,
        )
    }

    #[tokio::test]
    async fn create_normalizes_key_and_reloads() {
        let projects = Arc::new(FakeProjects::default());
        let (service, _board) = service(projects.clone());

        let created = service.create("Website", " web ", None).await;

        assert_eq!(created.map(|project| project.key), Some("WEB".to_owned()));
        assert_eq!(service.projects().len(), 1);
    }

    #[tokio::test]
    async fn duplicate_key_gets_friendly_message() {
        let projects = Arc::new(FakeProjects::default());
        let (service, board) = service(projects.clone());
        assert!(service.create("Website", "WEB", None).await.is_some());

        let duplicate = service.create("Website 2", "web", None).await;

        assert!(duplicate.is_none());
        assert!(board.latest().is_some_and(|notice| {
            notice
                .message
                .starts_with("A project with this Key already exists")
        }));
    }

    #[tokio::test]
    async fn overlong_key_is_rejected_locally() {
        let projects = Arc::new(FakeProjects::default());
        let (service, _board) = service(projects.clone());

        assert!(service.create("Website", "WEBSITE", None).await.is_none());
        assert!(projects.calls.lock().await.is_empty());
    }

    #[tokio::test]
    async fn delete_requires_capability_and_reverts_on_failure() {
        let projects = Arc::new(FakeProjects {
            fail_writes: Some(AppError::Forbidden(
                "permission denied for table projects".to_owned(),
            )),
            ..FakeProjects::default()
        });
        let (service, board) = service(projects.clone());
        projects
            .projects
            .lock()
            .await
            .push(bugtrack_domain::Project {
                id: ProjectId::new(1),
                name: "Website".to_owned(),
                key: "WEB".to_owned(),
                description: None,
                created_at: None,
            });
        service.load().await;

        let developer = profile("Dan", "Developer");
        let developer = context_for(&developer, Arc::new(FakePolicies::default())).await;
        let denied = service.delete(&developer, ProjectId::new(1)).await;
        assert!(matches!(denied, MutationOutcome::Rejected { .. }));
        assert!(projects.calls.lock().await.is_empty());

        let admin = profile("Ada", "Admin");
        let admin = context_for(&admin, Arc::new(FakePolicies::default())).await;
        let reverted = service.delete(&admin, ProjectId::new(1)).await;
        assert!(matches!(reverted, MutationOutcome::Reverted { .. }));
        assert_eq!(service.projects().len(), 1);
        assert_eq!(
            board.latest().map(|notice| notice.message).as_deref(),
            Some("Error deleting project: permission denied for table projects")
        );
    }
}
