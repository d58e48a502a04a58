use async_trait::async_trait;
use bugtrack_core::AppResult;

/// Port for the hosted blob storage.
#[async_trait]
pub trait BlobStorage: Send + Sync {
    /// Uploads a blob and returns its public URL.
    async fn upload_blob(
        &self,
        bucket: &str,
        name: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> AppResult<String>;

    /// Removes a blob.
    async fn delete_blob(&self, bucket: &str, name: &str) -> AppResult<()>;
}
