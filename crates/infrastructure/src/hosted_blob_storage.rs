//! Adapter for hosted blob storage (`/storage/v1`).

use async_trait::async_trait;
use bugtrack_application::BlobStorage;
use bugtrack_core::AppResult;
use reqwest::Method;
use reqwest::header;
use serde_json::json;

use crate::hosted_backend_client::HostedBackendClient;

/// Blob storage over the hosted storage API. Buckets are expected to be public.
#[derive(Clone)]
pub struct HostedBlobStorage {
    client: HostedBackendClient,
}

impl HostedBlobStorage {
    /// Creates a storage adapter over a shared backend client.
    #[must_use]
    pub fn new(client: HostedBackendClient) -> Self {
        Self { client }
    }

    /// Public download URL of a blob.
    pub fn public_url(&self, bucket: &str, name: &str) -> AppResult<String> {
        self.client
            .endpoint(&["storage", "v1", "object", "public", bucket, name])
            .map(String::from)
    }
}

#[async_trait]
impl BlobStorage for HostedBlobStorage {
    async fn upload_blob(
        &self,
        bucket: &str,
        name: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> AppResult<String> {
        let url = self
            .client
            .endpoint(&["storage", "v1", "object", bucket, name])?;
        let request = self
            .client
            .request(Method::POST, url)
            .await
            .header(header::CONTENT_TYPE, content_type)
            .header("x-upsert", "false")
            .body(bytes);
        self.client.execute(request, "upload blob").await?;

        self.public_url(bucket, name)
    }

    async fn delete_blob(&self, bucket: &str, name: &str) -> AppResult<()> {
        let url = self.client.endpoint(&["storage", "v1", "object", bucket])?;
        let request = self
            .client
            .request(Method::DELETE, url)
            .await
            .json(&json!({ "prefixes": [name] }));
        self.client
            .execute(request, "delete blob")
            .await
            .map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use bugtrack_domain::{ATTACHMENTS_BUCKET, Attachment, AttachmentId, BugId};

    use super::HostedBlobStorage;
    use crate::hosted_backend_client::HostedBackendClient;

    #[test]
    fn public_url_round_trips_through_attachment_storage_path() {
        let Ok(client) =
            HostedBackendClient::new(reqwest::Client::new(), "https://demo.backend.test", "key")
        else {
            panic!("client should build");
        };
        let storage = HostedBlobStorage::new(client);

        let Ok(file_url) = storage.public_url(ATTACHMENTS_BUCKET, "1700000000000-abc.png") else {
            panic!("url should build");
        };
        let attachment = Attachment {
            id: AttachmentId::new(1),
            bug_id: BugId::new(1),
            file_url,
            file_name: "screen.png".to_owned(),
            file_type: "image/png".to_owned(),
        };

        assert_eq!(
            attachment.storage_path().as_deref(),
            Some("1700000000000-abc.png")
        );
    }
}
