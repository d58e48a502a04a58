//! Bug board: listing, saving, status changes and deletions.

mod attachments;

use std::sync::{Arc, Mutex, PoisonError};

use bugtrack_core::AppError;
use bugtrack_domain::{Bug, BugDraft, BugId, BugStatus, Capability, UserProfile};
use tracing::{error, info};

use crate::{
    AttachmentRepository, BlobStorage, BugQuery, BugRepository, LocalCollection, MutationLabels,
    MutationOutcome, OptimisticController, RecordChange, SessionContext,
};

pub use attachments::UploadFile;

/// Application service behind the bug board.
#[derive(Clone)]
pub struct IssueService {
    bugs: Arc<dyn BugRepository>,
    attachments: Arc<dyn AttachmentRepository>,
    storage: Arc<dyn BlobStorage>,
    controller: OptimisticController,
    board: LocalCollection<Bug>,
    query: Arc<Mutex<BugQuery>>,
}

impl IssueService {
    /// Creates a new issue service.
    #[must_use]
    pub fn new(
        bugs: Arc<dyn BugRepository>,
        attachments: Arc<dyn AttachmentRepository>,
        storage: Arc<dyn BlobStorage>,
        controller: OptimisticController,
    ) -> Self {
        Self {
            bugs,
            attachments,
            storage,
            controller,
            board: LocalCollection::default(),
            query: Arc::new(Mutex::new(BugQuery::default())),
        }
    }

    /// Loaded bugs, newest first.
    #[must_use]
    pub fn bugs(&self) -> Arc<Vec<Bug>> {
        self.board.snapshot()
    }

    /// Users that may appear as assignees.
    #[must_use]
    pub fn assignable_users(users: &[UserProfile]) -> Vec<UserProfile> {
        users
            .iter()
            .filter(|user| user.role.is_assignable())
            .cloned()
            .collect()
    }

    /// Loads bugs matching `query` and remembers it for later reloads.
    pub async fn load(&self, query: BugQuery) {
        *self.query.lock().unwrap_or_else(PoisonError::into_inner) = query;
        self.reload().await;
    }

    /// Loads bugs with the last used query.
    pub async fn reload(&self) {
        let query = *self.query.lock().unwrap_or_else(PoisonError::into_inner);
        match self.bugs.list_bugs(query).await {
            Ok(bugs) => self.board.replace(bugs),
            Err(load_error) => {
                error!(error = %load_error, "failed to load bugs");
                self.board.replace(Vec::new());
                self.controller.notices().error("Failed to load bugs");
            }
        }
    }

    /// Creates or updates a bug, then attaches `files`.
    ///
    /// Returns the id of the saved bug. Files that fail to upload are skipped.
    pub async fn save(
        &self,
        session: &SessionContext,
        editing: Option<BugId>,
        draft: BugDraft,
        files: Vec<UploadFile>,
    ) -> Option<BugId> {
        let draft = draft.normalized();
        if draft.assignee_id.is_some()
            && let Err(denied) = session.require(Capability::CanAssignUsers)
        {
            self.controller.reject(denied);
            return None;
        }

        let labels = MutationLabels::new("Error saving bug");
        let bug_id = match editing {
            Some(bug_id) => {
                self.controller
                    .persist(labels, self.bugs.update_bug(bug_id, &draft))
                    .await?;
                bug_id
            }
            None => {
                self.controller
                    .persist(labels, self.bugs.insert_bug(&draft))
                    .await?
                    .id
            }
        };

        self.attach_files(bug_id, files).await;
        info!(bug_id = %bug_id, subject = %session.identity().subject(), "bug saved");
        self.controller.notices().success("Issue saved successfully!");
        self.reload().await;

        Some(bug_id)
    }

    /// Changes a bug's status optimistically.
    pub async fn change_status(
        &self,
        session: &SessionContext,
        bug_id: BugId,
        status: BugStatus,
    ) -> MutationOutcome {
        let bugs = Arc::clone(&self.bugs);
        info!(
            bug_id = %bug_id,
            subject = %session.identity().subject(),
            status = status.as_str(),
            "changing bug status"
        );

        self.controller
            .execute(
                &self.board,
                bug_id,
                MutationLabels::new("Error updating status"),
                move |current| Ok(RecordChange::Replace(current.with_status(status))),
                move |_| async move { bugs.update_status(bug_id, status).await },
            )
            .await
    }

    /// Deletes a bug optimistically.
    pub async fn delete_bug(&self, session: &SessionContext, bug_id: BugId) -> MutationOutcome {
        if let Err(denied) = session.require(Capability::CanDeleteBug) {
            return self.controller.reject(denied);
        }

        let bugs = Arc::clone(&self.bugs);
        self.controller
            .execute(
                &self.board,
                bug_id,
                MutationLabels::new("Error deleting bug"),
                |_| Ok(RecordChange::Remove),
                move |_| async move { bugs.delete_bug(bug_id).await },
            )
            .await
    }

    fn reject_missing(&self, bug_id: BugId) -> MutationOutcome {
        self.controller
            .reject(AppError::NotFound(format!("bug '{bug_id}' is not loaded")))
    }
}
