//! Fake ports shared by the service test suites.

use std::sync::Arc;

use async_trait::async_trait;
use bugtrack_core::{AppError, AppResult, UserIdentity};
use bugtrack_domain::{
    Attachment, AttachmentId, Bug, BugDraft, BugId, BugStatus, Capability, PermissionPolicy,
    Project, ProjectDraft, ProjectId, RoleName, UserId, UserProfile,
};
use tokio::sync::{Mutex, Notify};

use crate::{
    AttachmentRepository, BlobStorage, BugQuery, BugRepository, NewAttachment,
    PermissionPolicyRepository, ProfileUpsert, ProjectRepository, SessionContext, UserDirectory,
    UserRepository,
};

pub(crate) fn role(name: &str) -> RoleName {
    RoleName::new(name).unwrap_or_default()
}

pub(crate) fn profile(name: &str, role_name: &str) -> UserProfile {
    UserProfile {
        id: UserId::new(),
        name: Some(name.to_owned()),
        email: Some(format!("{}@example.com", name.to_lowercase())),
        avatar: None,
        role: role(role_name),
    }
}

/// Builds a signed-in context for `profile` against `policies`.
pub(crate) async fn context_for(
    profile: &UserProfile,
    policies: Arc<dyn PermissionPolicyRepository>,
) -> SessionContext {
    let identity = UserIdentity::new(
        profile.id.as_uuid(),
        profile.email.clone().unwrap_or_default(),
    );
    SessionContext::resolve(identity, Some(profile.clone()), policies).await
}

#[derive(Default)]
pub(crate) struct FakePolicies {
    pub(crate) policies: Mutex<Vec<PermissionPolicy>>,
    pub(crate) calls: Mutex<Vec<String>>,
    pub(crate) fail_writes: Option<AppError>,
}

impl FakePolicies {
    pub(crate) fn with(policies: Vec<PermissionPolicy>) -> Self {
        Self {
            policies: Mutex::new(policies),
            ..Self::default()
        }
    }

    async fn record(&self, call: String) -> AppResult<()> {
        self.calls.lock().await.push(call);
        match &self.fail_writes {
            Some(error) => Err(error.clone()),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl PermissionPolicyRepository for FakePolicies {
    async fn find_policy(&self, role: &RoleName) -> AppResult<Option<PermissionPolicy>> {
        Ok(self
            .policies
            .lock()
            .await
            .iter()
            .find(|policy| policy.role() == role)
            .cloned())
    }

    async fn list_policies(&self) -> AppResult<Vec<PermissionPolicy>> {
        Ok(self.policies.lock().await.clone())
    }

    async fn insert_policy(&self, policy: PermissionPolicy) -> AppResult<PermissionPolicy> {
        self.record(format!("insert:{}", policy.role())).await?;
        let mut policies = self.policies.lock().await;
        if policies.iter().any(|stored| stored.role() == policy.role()) {
            return Err(AppError::Conflict(format!(
                "role '{}' already exists",
                policy.role()
            )));
        }
        policies.push(policy.clone());
        Ok(policy)
    }

    async fn update_capability(
        &self,
        role: &RoleName,
        capability: Capability,
        allowed: bool,
    ) -> AppResult<()> {
        self.record(format!("update:{role}:{capability}:{allowed}"))
            .await?;
        let mut policies = self.policies.lock().await;
        if let Some(policy) = policies.iter_mut().find(|policy| policy.role() == role) {
            *policy = policy.clone().with(capability, allowed);
        }
        Ok(())
    }

    async fn delete_policy(&self, role: &RoleName) -> AppResult<()> {
        self.record(format!("delete:{role}")).await?;
        self.policies
            .lock()
            .await
            .retain(|policy| policy.role() != role);
        Ok(())
    }
}

pub(crate) struct FakeUsers {
    pub(crate) users: Mutex<Vec<UserProfile>>,
    pub(crate) has_role_column: bool,
    pub(crate) calls: Mutex<Vec<String>>,
    pub(crate) fail_writes: Option<AppError>,
    pub(crate) update_gate: Option<Arc<Notify>>,
}

impl FakeUsers {
    pub(crate) fn with(users: Vec<UserProfile>) -> Self {
        Self {
            users: Mutex::new(users),
            has_role_column: true,
            calls: Mutex::new(Vec::new()),
            fail_writes: None,
            update_gate: None,
        }
    }
}

#[async_trait]
impl UserRepository for FakeUsers {
    async fn find_by_email(&self, email: &str) -> AppResult<Option<UserProfile>> {
        Ok(self
            .users
            .lock()
            .await
            .iter()
            .find(|user| user.email.as_deref() == Some(email))
            .cloned())
    }

    async fn list_users(&self) -> AppResult<UserDirectory> {
        let mut users = self.users.lock().await.clone();
        users.sort_by(|left, right| left.name.cmp(&right.name));
        Ok(UserDirectory {
            users,
            has_role_column: self.has_role_column,
        })
    }

    async fn count_users_with_role(&self, role: &RoleName) -> AppResult<u64> {
        self.calls.lock().await.push(format!("count:{role}"));
        let holders = self
            .users
            .lock()
            .await
            .iter()
            .filter(|user| &user.role == role)
            .count();
        Ok(holders as u64)
    }

    async fn update_role(&self, user_id: UserId, role: &RoleName) -> AppResult<()> {
        self.calls.lock().await.push(format!("update_role:{user_id}:{role}"));
        if let Some(gate) = &self.update_gate {
            gate.notified().await;
        }
        if let Some(error) = &self.fail_writes {
            return Err(error.clone());
        }
        let mut users = self.users.lock().await;
        if let Some(user) = users.iter_mut().find(|user| user.id == user_id) {
            user.role = role.clone();
        }
        Ok(())
    }

    async fn insert_profile(&self, profile: UserProfile) -> AppResult<UserProfile> {
        self.calls.lock().await.push(format!("insert_profile:{}", profile.id));
        if let Some(error) = &self.fail_writes {
            return Err(error.clone());
        }
        self.users.lock().await.push(profile.clone());
        Ok(profile)
    }

    async fn upsert_profile(&self, upsert: ProfileUpsert) -> AppResult<UserProfile> {
        self.calls
            .lock()
            .await
            .push(format!("upsert_profile:{}:{}", upsert.id, upsert.name));
        if let Some(error) = &self.fail_writes {
            return Err(error.clone());
        }
        let mut users = self.users.lock().await;
        let role = users
            .iter()
            .find(|user| user.id == upsert.id)
            .map(|user| user.role.clone())
            .unwrap_or_default();
        let stored = UserProfile {
            id: upsert.id,
            name: Some(upsert.name),
            email: Some(upsert.email),
            avatar: upsert.avatar,
            role,
        };
        users.retain(|user| user.id != stored.id);
        users.push(stored.clone());
        Ok(stored)
    }
}

#[derive(Default)]
pub(crate) struct FakeBugs {
    pub(crate) bugs: Mutex<Vec<Bug>>,
    pub(crate) calls: Mutex<Vec<String>>,
    pub(crate) fail_writes: Option<AppError>,
    pub(crate) fail_reads: Option<AppError>,
}

impl FakeBugs {
    pub(crate) fn with(bugs: Vec<Bug>) -> Self {
        Self {
            bugs: Mutex::new(bugs),
            ..Self::default()
        }
    }

    async fn record(&self, call: String) -> AppResult<()> {
        self.calls.lock().await.push(call);
        match &self.fail_writes {
            Some(error) => Err(error.clone()),
            None => Ok(()),
        }
    }
}

pub(crate) fn bug(id: i64, title: &str, status: BugStatus) -> Bug {
    Bug {
        id: BugId::new(id),
        title: title.to_owned(),
        description: None,
        status,
        priority: bugtrack_domain::BugPriority::Medium,
        severity: None,
        project_id: None,
        module: None,
        environment: None,
        assignee_id: None,
        reporter_id: None,
        steps_to_reproduce: None,
        expected_result: None,
        actual_result: None,
        created_at: None,
        attachments: Vec::new(),
    }
}

#[async_trait]
impl BugRepository for FakeBugs {
    async fn list_bugs(&self, query: BugQuery) -> AppResult<Vec<Bug>> {
        if let Some(error) = &self.fail_reads {
            return Err(error.clone());
        }
        Ok(self
            .bugs
            .lock()
            .await
            .iter()
            .filter(|bug| query.project_id.is_none() || bug.project_id == query.project_id)
            .cloned()
            .collect())
    }

    async fn insert_bug(&self, draft: &BugDraft) -> AppResult<Bug> {
        self.record(format!("insert_bug:{}", draft.title)).await?;
        let mut bugs = self.bugs.lock().await;
        let next_id = bugs.iter().map(|bug| bug.id.value()).max().unwrap_or(0) + 1;
        let stored = Bug {
            title: draft.title.clone(),
            project_id: draft.project_id,
            reporter_id: draft.reporter_id,
            ..bug(next_id, draft.title.as_str(), draft.status)
        };
        bugs.insert(0, stored.clone());
        Ok(stored)
    }

    async fn update_bug(&self, bug_id: BugId, draft: &BugDraft) -> AppResult<()> {
        self.record(format!("update_bug:{bug_id}")).await?;
        let mut bugs = self.bugs.lock().await;
        if let Some(stored) = bugs.iter_mut().find(|bug| bug.id == bug_id) {
            stored.title = draft.title.clone();
            stored.status = draft.status;
        }
        Ok(())
    }

    async fn update_status(&self, bug_id: BugId, status: BugStatus) -> AppResult<()> {
        self.record(format!("update_status:{bug_id}:{}", status.as_str()))
            .await
    }

    async fn delete_bug(&self, bug_id: BugId) -> AppResult<()> {
        self.record(format!("delete_bug:{bug_id}")).await
    }

    async fn count_bugs(&self, statuses: &[BugStatus]) -> AppResult<u64> {
        if let Some(error) = &self.fail_reads {
            return Err(error.clone());
        }
        let count = self
            .bugs
            .lock()
            .await
            .iter()
            .filter(|bug| statuses.is_empty() || statuses.contains(&bug.status))
            .count();
        Ok(count as u64)
    }
}

#[derive(Default)]
pub(crate) struct FakeAttachments {
    pub(crate) calls: Mutex<Vec<String>>,
    pub(crate) fail_writes: Option<AppError>,
}

#[async_trait]
impl AttachmentRepository for FakeAttachments {
    async fn insert_attachments(
        &self,
        attachments: Vec<NewAttachment>,
    ) -> AppResult<Vec<Attachment>> {
        self.calls
            .lock()
            .await
            .push(format!("insert_attachments:{}", attachments.len()));
        Ok(attachments
            .into_iter()
            .zip(1_i64..)
            .map(|(attachment, id)| Attachment {
                id: AttachmentId::new(id),
                bug_id: attachment.bug_id,
                file_url: attachment.file_url,
                file_name: attachment.file_name,
                file_type: attachment.file_type,
            })
            .collect())
    }

    async fn delete_attachment(&self, attachment_id: AttachmentId) -> AppResult<()> {
        self.calls
            .lock()
            .await
            .push(format!("delete_attachment:{attachment_id}"));
        match &self.fail_writes {
            Some(error) => Err(error.clone()),
            None => Ok(()),
        }
    }
}

#[derive(Default)]
pub(crate) struct FakeStorage {
    pub(crate) calls: Mutex<Vec<String>>,
    pub(crate) rejected_names: Vec<String>,
    pub(crate) fail_deletes: bool,
}

#[async_trait]
impl BlobStorage for FakeStorage {
    async fn upload_blob(
        &self,
        bucket: &str,
        name: &str,
        _bytes: Vec<u8>,
        _content_type: &str,
    ) -> AppResult<String> {
        self.calls.lock().await.push(format!("upload:{bucket}/{name}"));
        if self.rejected_names.iter().any(|rejected| name.ends_with(rejected.as_str())) {
            return Err(AppError::Remote("payload too large".to_owned()));
        }
        Ok(format!(
            "https://backend.example.com/storage/v1/object/public/{bucket}/{name}"
        ))
    }

    async fn delete_blob(&self, bucket: &str, name: &str) -> AppResult<()> {
        self.calls.lock().await.push(format!("delete:{bucket}/{name}"));
        if self.fail_deletes {
            return Err(AppError::Remote("object not found".to_owned()));
        }
        Ok(())
    }
}

#[derive(Default)]
pub(crate) struct FakeProjects {
    pub(crate) projects: Mutex<Vec<Project>>,
    pub(crate) calls: Mutex<Vec<String>>,
    pub(crate) fail_writes: Option<AppError>,
}

#[async_trait]
impl ProjectRepository for FakeProjects {
    async fn list_projects(&self) -> AppResult<Vec<Project>> {
        Ok(self.projects.lock().await.clone())
    }

    async fn insert_project(&self, draft: &ProjectDraft) -> AppResult<Project> {
        self.calls
            .lock()
            .await
            .push(format!("insert_project:{}", draft.key()));
        if let Some(error) = &self.fail_writes {
            return Err(error.clone());
        }
        let mut projects = self.projects.lock().await;
        if projects.iter().any(|project| project.key == draft.key()) {
            return Err(AppError::Conflict(
                "duplicate key value violates unique constraint \"projects_key_key\"".to_owned(),
            ));
        }
        let next_id = projects.iter().map(|project| project.id.value()).max().unwrap_or(0) + 1;
        let project = Project {
            id: ProjectId::new(next_id),
            name: draft.name().to_owned(),
            key: draft.key().to_owned(),
            description: draft.description().map(str::to_owned),
            created_at: None,
        };
        projects.insert(0, project.clone());
        Ok(project)
    }

    async fn delete_project(&self, project_id: ProjectId) -> AppResult<()> {
        self.calls
            .lock()
            .await
            .push(format!("delete_project:{project_id}"));
        match &self.fail_writes {
            Some(error) => Err(error.clone()),
            None => Ok(()),
        }
    }
}
