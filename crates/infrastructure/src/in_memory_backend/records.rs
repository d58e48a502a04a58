use async_trait::async_trait;
use bugtrack_application::{
    AttachmentRepository, BlobStorage, BugQuery, BugRepository, NewAttachment,
    PermissionPolicyRepository, ProfileUpsert, ProjectRepository, UserDirectory, UserRepository,
};
use bugtrack_core::{AppError, AppResult};
use bugtrack_domain::{
    Attachment, AttachmentId, Bug, BugDraft, BugId, BugStatus, Capability, PermissionPolicy,
    Project, ProjectDraft, ProjectId, RoleName, UserId, UserProfile,
};
use chrono::Utc;

use super::InMemoryBackend;

fn bug_from_draft(id: BugId, draft: &BugDraft) -> Bug {
    Bug {
        id,
        title: draft.title.clone(),
        description: draft.description.clone(),
        status: draft.status,
        priority: draft.priority,
        severity: draft.severity.clone(),
        project_id: draft.project_id,
        module: draft.module.clone(),
        environment: draft.environment.clone(),
        assignee_id: draft.assignee_id,
        reporter_id: draft.reporter_id,
        steps_to_reproduce: draft.steps_to_reproduce.clone(),
        expected_result: draft.expected_result.clone(),
        actual_result: draft.actual_result.clone(),
        created_at: Some(Utc::now()),
        attachments: Vec::new(),
    }
}

#[async_trait]
impl PermissionPolicyRepository for InMemoryBackend {
    async fn find_policy(&self, role: &RoleName) -> AppResult<Option<PermissionPolicy>> {
        Ok(self.state.read().await.policies.get(role).cloned())
    }

    async fn list_policies(&self) -> AppResult<Vec<PermissionPolicy>> {
        Ok(self.state.read().await.policies.values().cloned().collect())
    }

    async fn insert_policy(&self, policy: PermissionPolicy) -> AppResult<PermissionPolicy> {
        let mut state = self.state.write().await;
        if state.policies.contains_key(policy.role()) {
            return Err(AppError::Conflict(format!(
                "role '{}' already has a policy",
                policy.role()
            )));
        }

        state.policies.insert(policy.role().clone(), policy.clone());
        Ok(policy)
    }

    async fn update_capability(
        &self,
        role: &RoleName,
        capability: Capability,
        allowed: bool,
    ) -> AppResult<()> {
        let mut state = self.state.write().await;
        let policy = state
            .policies
            .remove(role)
            .ok_or_else(|| AppError::NotFound(format!("role '{role}' has no policy")))?;
        state
            .policies
            .insert(role.clone(), policy.with(capability, allowed));
        Ok(())
    }

    async fn delete_policy(&self, role: &RoleName) -> AppResult<()> {
        self.state.write().await.policies.remove(role);
        Ok(())
    }
}

#[async_trait]
impl UserRepository for InMemoryBackend {
    async fn find_by_email(&self, email: &str) -> AppResult<Option<UserProfile>> {
        Ok(self
            .state
            .read()
            .await
            .users
            .iter()
            .find(|user| user.email.as_deref() == Some(email))
            .cloned())
    }

    async fn list_users(&self) -> AppResult<UserDirectory> {
        let state = self.state.read().await;
        let mut users = state.users.clone();
        users.sort_by(|left, right| left.name.cmp(&right.name));

        if !state.has_role_column {
            users = users
                .into_iter()
                .map(|user| user.with_role(RoleName::default()))
                .collect();
        }

        Ok(UserDirectory {
            users,
            has_role_column: state.has_role_column,
        })
    }

    async fn count_users_with_role(&self, role: &RoleName) -> AppResult<u64> {
        let state = self.state.read().await;
        let holders = state.users.iter().filter(|user| &user.role == role).count();
        Ok(u64::try_from(holders).unwrap_or(u64::MAX))
    }

    async fn update_role(&self, user_id: UserId, role: &RoleName) -> AppResult<()> {
        let mut state = self.state.write().await;
        if !state.has_role_column {
            return Err(AppError::Remote(
                "column \"role\" of relation \"users\" does not exist".to_owned(),
            ));
        }

        let user = state
            .users
            .iter_mut()
            .find(|user| user.id == user_id)
            .ok_or_else(|| AppError::NotFound(format!("user '{}' not found", user_id.as_uuid())))?;
        user.role = role.clone();
        Ok(())
    }

    async fn insert_profile(&self, profile: UserProfile) -> AppResult<UserProfile> {
        let mut state = self.state.write().await;
        if state.users.iter().any(|user| user.id == profile.id) {
            return Err(AppError::Conflict(format!(
                "profile '{}' already exists",
                profile.id.as_uuid()
            )));
        }

        state.users.push(profile.clone());
        Ok(profile)
    }

    async fn upsert_profile(&self, profile: ProfileUpsert) -> AppResult<UserProfile> {
        let mut state = self.state.write().await;
        if let Some(stored) = state.users.iter_mut().find(|user| user.id == profile.id) {
            stored.email = Some(profile.email);
            stored.name = Some(profile.name);
            stored.avatar = profile.avatar;
            return Ok(stored.clone());
        }

        let stored = UserProfile {
            id: profile.id,
            name: Some(profile.name),
            email: Some(profile.email),
            avatar: profile.avatar,
            role: RoleName::default(),
        };
        state.users.push(stored.clone());
        Ok(stored)
    }
}

#[async_trait]
impl BugRepository for InMemoryBackend {
    async fn list_bugs(&self, query: BugQuery) -> AppResult<Vec<Bug>> {
        let state = self.state.read().await;
        let mut bugs: Vec<Bug> = state
            .bugs
            .iter()
            .filter(|bug| query.project_id.is_none() || bug.project_id == query.project_id)
            .map(|bug| Bug {
                attachments: state
                    .attachments
                    .iter()
                    .filter(|attachment| attachment.bug_id == bug.id)
                    .cloned()
                    .collect(),
                ..bug.clone()
            })
            .collect();
        bugs.sort_by(|left, right| {
            right
                .created_at
                .cmp(&left.created_at)
                .then_with(|| right.id.cmp(&left.id))
        });
        Ok(bugs)
    }

    async fn insert_bug(&self, draft: &BugDraft) -> AppResult<Bug> {
        let mut state = self.state.write().await;
        if let Some(project_id) = draft.project_id
            && !state.projects.iter().any(|project| project.id == project_id)
        {
            return Err(AppError::Conflict(format!(
                "project '{project_id}' does not exist"
            )));
        }

        let bug = bug_from_draft(BugId::new(state.allocate_id()), draft);
        state.bugs.push(bug.clone());
        Ok(bug)
    }

    async fn update_bug(&self, bug_id: BugId, draft: &BugDraft) -> AppResult<()> {
        let mut state = self.state.write().await;
        let bug = state
            .bugs
            .iter_mut()
            .find(|bug| bug.id == bug_id)
            .ok_or_else(|| AppError::NotFound(format!("bug '{bug_id}' not found")))?;

        *bug = Bug {
            created_at: bug.created_at,
            ..bug_from_draft(bug_id, draft)
        };
        Ok(())
    }

    async fn update_status(&self, bug_id: BugId, status: BugStatus) -> AppResult<()> {
        let mut state = self.state.write().await;
        let bug = state
            .bugs
            .iter_mut()
            .find(|bug| bug.id == bug_id)
            .ok_or_else(|| AppError::NotFound(format!("bug '{bug_id}' not found")))?;
        bug.status = status;
        Ok(())
    }

    async fn delete_bug(&self, bug_id: BugId) -> AppResult<()> {
        let mut state = self.state.write().await;
        state.bugs.retain(|bug| bug.id != bug_id);
        state
            .attachments
            .retain(|attachment| attachment.bug_id != bug_id);
        Ok(())
    }

    async fn count_bugs(&self, statuses: &[BugStatus]) -> AppResult<u64> {
        let state = self.state.read().await;
        let matching = state
            .bugs
            .iter()
            .filter(|bug| statuses.is_empty() || statuses.contains(&bug.status))
            .count();
        Ok(u64::try_from(matching).unwrap_or(u64::MAX))
    }
}

#[async_trait]
impl AttachmentRepository for InMemoryBackend {
    async fn insert_attachments(
        &self,
        attachments: Vec<NewAttachment>,
    ) -> AppResult<Vec<Attachment>> {
        let mut state = self.state.write().await;
        if let Some(orphan) = attachments
            .iter()
            .find(|attachment| !state.bugs.iter().any(|bug| bug.id == attachment.bug_id))
        {
            return Err(AppError::Conflict(format!(
                "bug '{}' does not exist",
                orphan.bug_id
            )));
        }

        let mut stored = Vec::with_capacity(attachments.len());
        for attachment in attachments {
            let row = Attachment {
                id: AttachmentId::new(state.allocate_id()),
                bug_id: attachment.bug_id,
                file_url: attachment.file_url,
                file_name: attachment.file_name,
                file_type: attachment.file_type,
            };
            state.attachments.push(row.clone());
            stored.push(row);
        }
        Ok(stored)
    }

    async fn delete_attachment(&self, attachment_id: AttachmentId) -> AppResult<()> {
        self.state
            .write()
            .await
            .attachments
            .retain(|attachment| attachment.id != attachment_id);
        Ok(())
    }
}

#[async_trait]
impl ProjectRepository for InMemoryBackend {
    async fn list_projects(&self) -> AppResult<Vec<Project>> {
        let mut projects = self.state.read().await.projects.clone();
        projects.sort_by(|left, right| {
            right
                .created_at
                .cmp(&left.created_at)
                .then_with(|| right.id.cmp(&left.id))
        });
        Ok(projects)
    }

    async fn insert_project(&self, draft: &ProjectDraft) -> AppResult<Project> {
        let mut state = self.state.write().await;
        if state.projects.iter().any(|project| project.key == draft.key()) {
            return Err(AppError::Conflict(format!(
                "duplicate key value violates unique constraint: key '{}'",
                draft.key()
            )));
        }

        let project = Project {
            id: ProjectId::new(state.allocate_id()),
            name: draft.name().to_owned(),
            key: draft.key().to_owned(),
            description: draft.description().map(str::to_owned),
            created_at: Some(Utc::now()),
        };
        state.projects.push(project.clone());
        Ok(project)
    }

    async fn delete_project(&self, project_id: ProjectId) -> AppResult<()> {
        let mut state = self.state.write().await;
        state.projects.retain(|project| project.id != project_id);

        let removed: Vec<BugId> = state
            .bugs
            .iter()
            .filter(|bug| bug.project_id == Some(project_id))
            .map(|bug| bug.id)
            .collect();
        state
            .bugs
            .retain(|bug| bug.project_id != Some(project_id));
        state
            .attachments
            .retain(|attachment| !removed.contains(&attachment.bug_id));
        Ok(())
    }
}

#[async_trait]
impl BlobStorage for InMemoryBackend {
    async fn upload_blob(
        &self,
        bucket: &str,
        name: &str,
        bytes: Vec<u8>,
        _content_type: &str,
    ) -> AppResult<String> {
        let mut state = self.state.write().await;
        let key = (bucket.to_owned(), name.to_owned());
        if state.blobs.contains_key(&key) {
            return Err(AppError::Conflict(format!(
                "blob '{bucket}/{name}' already exists"
            )));
        }

        state.blobs.insert(key, bytes);
        Ok(format!("memory://storage/v1/object/public/{bucket}/{name}"))
    }

    async fn delete_blob(&self, bucket: &str, name: &str) -> AppResult<()> {
        self.state
            .write()
            .await
            .blobs
            .remove(&(bucket.to_owned(), name.to_owned()));
        Ok(())
    }
}
