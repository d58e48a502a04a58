//! Team directory and role administration.

mod roles;

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use bugtrack_core::AppError;
use bugtrack_domain::{Capability, PermissionPolicy, RoleName, UserId, UserProfile};
use tracing::{error, warn};

use crate::{
    LocalCollection, MutationLabels, MutationOutcome, OptimisticController,
    PermissionPolicyRepository, RecordChange, SessionContext, UserRepository,
};

/// Application service behind the team and role management screens.
#[derive(Clone)]
pub struct TeamService {
    users: Arc<dyn UserRepository>,
    policies: Arc<dyn PermissionPolicyRepository>,
    controller: OptimisticController,
    directory: LocalCollection<UserProfile>,
    roles: LocalCollection<PermissionPolicy>,
    has_role_column: Arc<AtomicBool>,
}

impl TeamService {
    /// Creates a new team service.
    #[must_use]
    pub fn new(
        users: Arc<dyn UserRepository>,
        policies: Arc<dyn PermissionPolicyRepository>,
        controller: OptimisticController,
    ) -> Self {
        Self {
            users,
            policies,
            controller,
            directory: LocalCollection::default(),
            roles: LocalCollection::default(),
            has_role_column: Arc::new(AtomicBool::new(true)),
        }
    }

    /// Loaded users, ordered by name.
    #[must_use]
    pub fn directory(&self) -> Arc<Vec<UserProfile>> {
        self.directory.snapshot()
    }

    /// Loaded role policies.
    #[must_use]
    pub fn roles(&self) -> Arc<Vec<PermissionPolicy>> {
        self.roles.snapshot()
    }

    /// Whether stored user rows carry a role.
    #[must_use]
    pub fn has_role_column(&self) -> bool {
        self.has_role_column.load(Ordering::SeqCst)
    }

    /// Reloads the user directory.
    pub async fn load_directory(&self) {
        match self.users.list_users().await {
            Ok(directory) => {
                self.has_role_column
                    .store(directory.has_role_column, Ordering::SeqCst);
                if !directory.has_role_column {
                    warn!("user rows have no role column");
                    self.controller.notices().warning(
                        "Note: The role column is missing. Role management is disabled.",
                    );
                }
                self.directory.replace(directory.users);
            }
            Err(load_error) => {
                error!(error = %load_error, "failed to load team members");
                self.directory.replace(Vec::new());
                self.controller
                    .notices()
                    .error("Failed to load team members");
            }
        }
    }

    /// Returns loaded users whose name or email contains `term`.
    #[must_use]
    pub fn search(&self, term: &str) -> Vec<UserProfile> {
        self.directory
            .snapshot()
            .iter()
            .filter(|user| user.matches_search(term))
            .cloned()
            .collect()
    }

    /// Changes a user's role optimistically.
    pub async fn update_role(
        &self,
        session: &SessionContext,
        user_id: UserId,
        role: RoleName,
    ) -> MutationOutcome {
        if let Err(denied) = session.require(Capability::CanManageUsers) {
            return self.controller.reject(denied);
        }
        if !self.has_role_column() {
            return self.controller.reject(AppError::PreconditionFailed(
                "Cannot update role: role column is missing".to_owned(),
            ));
        }

        let users = Arc::clone(&self.users);
        let new_role = role.clone();
        self.controller
            .execute(
                &self.directory,
                user_id,
                MutationLabels::new("Failed to update role")
                    .with_success("Role updated successfully!"),
                move |current| Ok(RecordChange::Replace(current.with_role(new_role))),
                move |_| async move { users.update_role(user_id, &role).await },
            )
            .await
    }
}
