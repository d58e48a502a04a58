use async_trait::async_trait;
use bugtrack_core::AppResult;
use bugtrack_domain::{
    Attachment, AttachmentId, Bug, BugDraft, BugId, BugStatus, Capability, PermissionPolicy,
    Project, ProjectDraft, ProjectId, RoleName, UserId, UserProfile,
};

/// Repository port for the `permissions` collection.
#[async_trait]
pub trait PermissionPolicyRepository: Send + Sync {
    /// Finds the policy row for a role.
    ///
    /// Returns `Ok(None)` when the role has no stored row; any other failure is an error.
    async fn find_policy(&self, role: &RoleName) -> AppResult<Option<PermissionPolicy>>;

    /// Lists every stored policy ordered by role name.
    async fn list_policies(&self) -> AppResult<Vec<PermissionPolicy>>;

    /// Inserts a policy for a new role. Fails with a conflict when the role already has one.
    async fn insert_policy(&self, policy: PermissionPolicy) -> AppResult<PermissionPolicy>;

    /// Stores one capability flag for a role.
    async fn update_capability(
        &self,
        role: &RoleName,
        capability: Capability,
        allowed: bool,
    ) -> AppResult<()>;

    /// Deletes the policy row of a role.
    async fn delete_policy(&self, role: &RoleName) -> AppResult<()>;
}

/// Result of loading the team directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserDirectory {
    /// Users ordered by name.
    pub users: Vec<UserProfile>,
    /// Whether the stored rows carry a role column.
    pub has_role_column: bool,
}

/// Repository port for the `users` collection.
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Finds a profile by its email.
    async fn find_by_email(&self, email: &str) -> AppResult<Option<UserProfile>>;

    /// Lists all profiles ordered by name.
    async fn list_users(&self) -> AppResult<UserDirectory>;

    /// Counts users currently holding a role.
    async fn count_users_with_role(&self, role: &RoleName) -> AppResult<u64>;

    /// Stores a new role for one user.
    async fn update_role(&self, user_id: UserId, role: &RoleName) -> AppResult<()>;

    /// Inserts the profile row for a newly registered account.
    async fn insert_profile(&self, profile: UserProfile) -> AppResult<UserProfile>;

    /// Creates or updates the profile row keyed by `profile.id`.
    ///
    /// Only email, name and avatar are written; a stored role is kept.
    async fn upsert_profile(&self, profile: ProfileUpsert) -> AppResult<UserProfile>;
}

/// Self-service profile edit written with [`UserRepository::upsert_profile`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProfileUpsert {
    /// Profile row id.
    pub id: UserId,
    /// Account email.
    pub email: String,
    /// New display name.
    pub name: String,
    /// Avatar image URL.
    pub avatar: Option<String>,
}

/// Filter for bug listings.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BugQuery {
    /// Restricts the listing to one project.
    pub project_id: Option<ProjectId>,
}

/// Repository port for the `bugs` collection.
#[async_trait]
pub trait BugRepository: Send + Sync {
    /// Lists bugs newest first, with attachments embedded.
    async fn list_bugs(&self, query: BugQuery) -> AppResult<Vec<Bug>>;

    /// Inserts a bug and returns the stored row.
    async fn insert_bug(&self, draft: &BugDraft) -> AppResult<Bug>;

    /// Overwrites the writable fields of a bug.
    async fn update_bug(&self, bug_id: BugId, draft: &BugDraft) -> AppResult<()>;

    /// Stores a new status for one bug.
    async fn update_status(&self, bug_id: BugId, status: BugStatus) -> AppResult<()>;

    /// Deletes one bug.
    async fn delete_bug(&self, bug_id: BugId) -> AppResult<()>;

    /// Counts bugs whose status is one of `statuses`; an empty slice counts every bug.
    async fn count_bugs(&self, statuses: &[BugStatus]) -> AppResult<u64>;
}

/// Attachment row to insert after its blob was uploaded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewAttachment {
    /// Owning bug.
    pub bug_id: BugId,
    /// Public blob URL.
    pub file_url: String,
    /// Original file name.
    pub file_name: String,
    /// MIME type.
    pub file_type: String,
}

/// Repository port for the `attachments` collection.
#[async_trait]
pub trait AttachmentRepository: Send + Sync {
    /// Inserts attachment rows in one request.
    async fn insert_attachments(&self, attachments: Vec<NewAttachment>)
    -> AppResult<Vec<Attachment>>;

    /// Deletes one attachment row.
    async fn delete_attachment(&self, attachment_id: AttachmentId) -> AppResult<()>;
}

/// Repository port for the `projects` collection.
#[async_trait]
pub trait ProjectRepository: Send + Sync {
    /// Lists projects newest first.
    async fn list_projects(&self) -> AppResult<Vec<Project>>;

    /// Inserts a project. A duplicate key is reported as a conflict.
    async fn insert_project(&self, draft: &ProjectDraft) -> AppResult<Project>;

    /// Deletes a project and, through the backend's cascade, its bugs.
    async fn delete_project(&self, project_id: ProjectId) -> AppResult<()>;
}
