//! Hosted row-API adapter for the `permissions` collection.

use async_trait::async_trait;
use bugtrack_application::PermissionPolicyRepository;
use bugtrack_core::{AppError, AppResult};
use bugtrack_domain::{Capability, PermissionPolicy, RoleName};
use serde_json::{Map, Value};

use crate::hosted_backend_client::{HostedBackendClient, RowFilter, SortDirection};

const TABLE: &str = "permissions";

/// Permission policy repository backed by the hosted row API.
#[derive(Clone)]
pub struct HostedPermissionPolicyRepository {
    client: HostedBackendClient,
}

impl HostedPermissionPolicyRepository {
    /// Creates a repository over a shared backend client.
    #[must_use]
    pub fn new(client: HostedBackendClient) -> Self {
        Self { client }
    }
}

fn capability_patch(capability: Capability, allowed: bool) -> Value {
    let mut changes = Map::new();
    changes.insert(capability.as_str().to_owned(), Value::Bool(allowed));
    Value::Object(changes)
}

#[async_trait]
impl PermissionPolicyRepository for HostedPermissionPolicyRepository {
    async fn find_policy(&self, role: &RoleName) -> AppResult<Option<PermissionPolicy>> {
        self.client
            .select_single(TABLE, &RowFilter::new().eq("role", role.as_str()))
            .await
    }

    async fn list_policies(&self) -> AppResult<Vec<PermissionPolicy>> {
        self.client
            .select(TABLE, &RowFilter::new().order("role", SortDirection::Ascending))
            .await
    }

    async fn insert_policy(&self, policy: PermissionPolicy) -> AppResult<PermissionPolicy> {
        let stored: Vec<PermissionPolicy> = self
            .client
            .insert(TABLE, &RowFilter::new(), &[&policy])
            .await?;

        stored.into_iter().next().ok_or_else(|| {
            AppError::Internal(format!(
                "backend returned no row for new policy '{}'",
                policy.role()
            ))
        })
    }

    async fn update_capability(
        &self,
        role: &RoleName,
        capability: Capability,
        allowed: bool,
    ) -> AppResult<()> {
        self.client
            .update(
                TABLE,
                &RowFilter::new().eq("role", role.as_str()),
                &capability_patch(capability, allowed),
            )
            .await
    }

    async fn delete_policy(&self, role: &RoleName) -> AppResult<()> {
        self.client
            .delete(TABLE, &RowFilter::new().eq("role", role.as_str()))
            .await
    }
}
