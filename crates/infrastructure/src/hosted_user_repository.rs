//! Hosted row-API adapter for the `users` collection.

use async_trait::async_trait;
use bugtrack_application::{ProfileUpsert, UserDirectory, UserRepository};
use bugtrack_core::{AppError, AppResult};
use bugtrack_domain::{RoleName, UserId, UserProfile};
use serde::Serialize;
use serde_json::{Value, json};

use crate::hosted_backend_client::{HostedBackendClient, RowFilter, SortDirection};

const TABLE: &str = "users";

/// User profile repository backed by the hosted row API.
#[derive(Clone)]
pub struct HostedUserRepository {
    client: HostedBackendClient,
}

impl HostedUserRepository {
    /// Creates a repository over a shared backend client.
    #[must_use]
    pub fn new(client: HostedBackendClient) -> Self {
        Self { client }
    }
}

/// Columns written by a self-service profile edit; the role is left untouched.
#[derive(Debug, Serialize)]
struct ProfileUpsertRow<'a> {
    id: UserId,
    email: &'a str,
    name: &'a str,
    avatar: Option<&'a str>,
}

impl<'a> From<&'a ProfileUpsert> for ProfileUpsertRow<'a> {
    fn from(profile: &'a ProfileUpsert) -> Self {
        Self {
            id: profile.id,
            email: profile.email.as_str(),
            name: profile.name.as_str(),
            avatar: profile.avatar.as_deref(),
        }
    }
}

/// Builds the directory from raw rows.
///
/// Only the first row is inspected for the role column; an empty table keeps
/// role management enabled.
fn directory_from_rows(rows: Vec<Value>) -> AppResult<UserDirectory> {
    let has_role_column = rows
        .first()
        .and_then(Value::as_object)
        .is_none_or(|row| row.contains_key("role"));

    let users = rows
        .into_iter()
        .map(|row| {
            serde_json::from_value::<UserProfile>(row).map_err(|error| {
                AppError::Internal(format!("failed to decode user profile row: {error}"))
            })
        })
        .collect::<AppResult<Vec<_>>>()?;

    Ok(UserDirectory {
        users,
        has_role_column,
    })
}

#[async_trait]
impl UserRepository for HostedUserRepository {
    async fn find_by_email(&self, email: &str) -> AppResult<Option<UserProfile>> {
        let rows: Vec<UserProfile> = self
            .client
            .select(TABLE, &RowFilter::new().eq("email", email).limit(1))
            .await?;
        Ok(rows.into_iter().next())
    }

    async fn list_users(&self) -> AppResult<UserDirectory> {
        let rows: Vec<Value> = self
            .client
            .select(
                TABLE,
                &RowFilter::new()
                    .select("*")
                    .order("name", SortDirection::Ascending),
            )
            .await?;
        directory_from_rows(rows)
    }

    async fn count_users_with_role(&self, role: &RoleName) -> AppResult<u64> {
        self.client
            .count(TABLE, &RowFilter::new().eq("role", role.as_str()))
            .await
    }

    async fn update_role(&self, user_id: UserId, role: &RoleName) -> AppResult<()> {
        self.client
            .update(
                TABLE,
                &RowFilter::new().eq("id", user_id.as_uuid()),
                &json!({ "role": role.as_str() }),
            )
            .await
    }

    async fn insert_profile(&self, profile: UserProfile) -> AppResult<UserProfile> {
        let stored: Vec<UserProfile> = self
            .client
            .insert(TABLE, &RowFilter::new(), &[&profile])
            .await?;

        stored.into_iter().next().ok_or_else(|| {
            AppError::Internal(format!(
                "backend returned no row for new profile '{}'",
                profile.id.as_uuid()
            ))
        })
    }

    async fn upsert_profile(&self, profile: ProfileUpsert) -> AppResult<UserProfile> {
        let row = ProfileUpsertRow::from(&profile);
        let stored: Vec<UserProfile> = self.client.upsert(TABLE, "id", &[&row]).await?;

        stored.into_iter().next().ok_or_else(|| {
            AppError::Internal(format!(
                "backend returned no row for profile '{}'",
                profile.id.as_uuid()
            ))
        })
    }
}
