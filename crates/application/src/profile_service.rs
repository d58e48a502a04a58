//! Self-service edits of the signed-in user's profile row.

use std::sync::Arc;

use bugtrack_core::{AppResult, NonEmptyString};
use bugtrack_domain::{AVATARS_BUCKET, UserProfile};
use tracing::{info, warn};
use uuid::Uuid;

use crate::{
    BlobStorage, MutationLabels, OptimisticController, ProfileUpsert, SessionContext, UploadFile,
    UserRepository,
};

const SUCCESS_MESSAGE: &str = "Profile updated successfully!";
const FAILURE_PREFIX: &str = "Error updating profile";

/// Application service behind the profile screen.
#[derive(Clone)]
pub struct ProfileService {
    users: Arc<dyn UserRepository>,
    storage: Arc<dyn BlobStorage>,
    controller: OptimisticController,
}

impl ProfileService {
    /// Creates a new profile service.
    #[must_use]
    pub fn new(
        users: Arc<dyn UserRepository>,
        storage: Arc<dyn BlobStorage>,
        controller: OptimisticController,
    ) -> Self {
        Self {
            users,
            storage,
            controller,
        }
    }

    /// Stores a new display name and, optionally, a new avatar picture.
    ///
    /// The avatar is uploaded first; when that fails the row is not written.
    /// On success the session's profile is replaced by the stored row.
    pub async fn update_profile(
        &self,
        session: &mut SessionContext,
        name: &str,
        avatar: Option<UploadFile>,
    ) -> Option<UserProfile> {
        let labels = MutationLabels::new(FAILURE_PREFIX).with_success(SUCCESS_MESSAGE);
        let name = match NonEmptyString::new(name.trim()) {
            Ok(name) => name,
            Err(invalid) => {
                self.controller.reject(invalid);
                return None;
            }
        };

        let upsert = self.prepare(session, name, avatar);
        let stored = self.controller.persist(labels, upsert).await?;

        info!(user_id = %stored.id, "profile updated");
        session.replace_profile(Some(stored.clone())).await;
        Some(stored)
    }

    async fn prepare(
        &self,
        session: &SessionContext,
        name: NonEmptyString,
        avatar: Option<UploadFile>,
    ) -> AppResult<UserProfile> {
        let current = session.profile();
        let id = current.map_or_else(|| session.user_id(), |profile| profile.id);
        let avatar_url = match avatar {
            Some(file) => Some(self.upload_avatar(session, file).await?),
            None => current.and_then(|profile| profile.avatar.clone()),
        };

        self.users
            .upsert_profile(ProfileUpsert {
                id,
                email: session.identity().email().to_owned(),
                name: name.into(),
                avatar: avatar_url,
            })
            .await
    }

    async fn upload_avatar(&self, session: &SessionContext, file: UploadFile) -> AppResult<String> {
        let blob_name = avatar_blob_name(session, &file);
        let content_type = file.content_type().to_owned();

        self.storage
            .upload_blob(AVATARS_BUCKET, blob_name.as_str(), file.bytes, content_type.as_str())
            .await
            .inspect_err(|upload_error| {
                warn!(blob = %blob_name, error = %upload_error, "avatar upload failed");
            })
    }
}

fn avatar_blob_name(session: &SessionContext, file: &UploadFile) -> String {
    format!(
        "avatar-{}-{}.{}",
        session.user_id(),
        Uuid::new_v4().simple(),
        file.extension()
    )
}
