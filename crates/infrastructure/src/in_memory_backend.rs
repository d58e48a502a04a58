//! Process-local backend implementing every hosted port.
//!
//! Used by the CLI's `memory` mode and by tests that need realistic
//! persistence without a network.

mod auth;
mod records;

use std::collections::{BTreeMap, HashMap};

use bugtrack_application::AuthSession;
use bugtrack_core::{AppResult, UserIdentity};
use bugtrack_domain::{
    Attachment, Bug, Capability, EmailAddress, PermissionPolicy, Project, RoleName, UserId,
    UserProfile, avatar_url_for,
};
use tokio::sync::RwLock;

#[derive(Debug, Clone)]
struct Account {
    identity: UserIdentity,
    password: String,
}

#[derive(Debug)]
struct BackendState {
    policies: BTreeMap<RoleName, PermissionPolicy>,
    users: Vec<UserProfile>,
    has_role_column: bool,
    accounts: HashMap<String, Account>,
    session: Option<AuthSession>,
    bugs: Vec<Bug>,
    attachments: Vec<Attachment>,
    projects: Vec<Project>,
    blobs: BTreeMap<(String, String), Vec<u8>>,
    next_row_id: i64,
}

impl Default for BackendState {
    fn default() -> Self {
        Self {
            policies: BTreeMap::new(),
            users: Vec::new(),
            has_role_column: true,
            accounts: HashMap::new(),
            session: None,
            bugs: Vec::new(),
            attachments: Vec::new(),
            projects: Vec::new(),
            blobs: BTreeMap::new(),
            next_row_id: 1,
        }
    }
}

impl BackendState {
    fn allocate_id(&mut self) -> i64 {
        let id = self.next_row_id;
        self.next_row_id += 1;
        id
    }
}

/// In-memory implementation of the record, storage and auth ports.
#[derive(Debug, Default)]
pub struct InMemoryBackend {
    state: RwLock<BackendState>,
}

impl InMemoryBackend {
    /// Creates an empty backend.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores one policy row.
    #[must_use]
    pub fn with_policy(mut self, policy: PermissionPolicy) -> Self {
        self.state
            .get_mut()
            .policies
            .insert(policy.role().clone(), policy);
        self
    }

    /// Stores a policy row for each built-in role.
    #[must_use]
    pub fn with_default_policies(self) -> Self {
        RoleName::built_in()
            .into_iter()
            .map(default_policy)
            .fold(self, Self::with_policy)
    }

    /// Creates an account with its profile row.
    pub fn with_account(mut self, email: &str, password: &str, role: RoleName) -> AppResult<Self> {
        let email = EmailAddress::new(email)?;
        let identity = UserIdentity::new(UserId::new().as_uuid(), email.as_str());
        let name = identity.email_local_part().to_owned();

        let state = self.state.get_mut();
        state.users.push(UserProfile {
            id: UserId::from_uuid(identity.subject()),
            avatar: Some(avatar_url_for(name.as_str())),
            name: Some(name),
            email: Some(email.as_str().to_owned()),
            role,
        });
        state.accounts.insert(
            email.as_str().to_owned(),
            Account {
                identity,
                password: password.to_owned(),
            },
        );
        Ok(self)
    }

    /// Simulates a `users` table created before the role column existed.
    #[must_use]
    pub fn without_role_column(mut self) -> Self {
        self.state.get_mut().has_role_column = false;
        self
    }

    /// Returns whether a blob is stored.
    pub async fn has_blob(&self, bucket: &str, name: &str) -> bool {
        self.state
            .read()
            .await
            .blobs
            .contains_key(&(bucket.to_owned(), name.to_owned()))
    }
}

fn default_policy(role: RoleName) -> PermissionPolicy {
    let granted: &[Capability] = match role.as_str() {
        RoleName::ADMIN => Capability::all(),
        RoleName::MANAGER => &[
            Capability::CanDeleteProject,
            Capability::CanDeleteBug,
            Capability::CanManageUsers,
            Capability::CanAssignUsers,
        ],
        RoleName::DEVELOPER | RoleName::QA => &[Capability::CanAssignUsers],
        _ => &[],
    };

    granted
        .iter()
        .fold(PermissionPolicy::new(role), |policy, capability| {
            policy.with(*capability, true)
        })
}
