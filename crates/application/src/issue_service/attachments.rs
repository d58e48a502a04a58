use super::*;

use bugtrack_domain::{ATTACHMENTS_BUCKET, AttachmentId};
use chrono::Utc;
use tracing::warn;
use uuid::Uuid;

use crate::NewAttachment;

const DEFAULT_FILE_NAME: &str = "pasted_file";
const DEFAULT_EXTENSION: &str = "bin";
const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

/// File selected or pasted for upload with a bug.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadFile {
    /// Original file name; may be empty for pasted images.
    pub name: String,
    /// MIME type; may be empty when unknown.
    pub content_type: String,
    /// File content.
    pub bytes: Vec<u8>,
}

impl UploadFile {
    fn display_name(&self) -> &str {
        if self.name.trim().is_empty() {
            DEFAULT_FILE_NAME
        } else {
            self.name.as_str()
        }
    }

    pub(crate) fn extension(&self) -> &str {
        self.display_name()
            .rsplit_once('.')
            .map(|(_, extension)| extension)
            .filter(|extension| !extension.is_empty())
            .unwrap_or(DEFAULT_EXTENSION)
    }

    pub(crate) fn content_type(&self) -> &str {
        if self.content_type.trim().is_empty() {
            DEFAULT_CONTENT_TYPE
        } else {
            self.content_type.as_str()
        }
    }

    /// Blob name that cannot collide with earlier uploads.
    pub(super) fn unique_blob_name(&self) -> String {
        format!(
            "{}-{}.{}",
            Utc::now().timestamp_millis(),
            Uuid::new_v4().simple(),
            self.extension()
        )
    }
}

impl IssueService {
    /// Removes one attachment from a bug.
    ///
    /// The row delete decides the outcome; the blob is removed afterwards on a
    /// best-effort basis.
    pub async fn delete_attachment(
        &self,
        session: &SessionContext,
        bug_id: BugId,
        attachment_id: AttachmentId,
    ) -> MutationOutcome {
        if let Err(denied) = session.require(Capability::CanDeleteBug) {
            return self.controller.reject(denied);
        }

        let Some(bug) = self.board.get(&bug_id) else {
            return self.reject_missing(bug_id);
        };
        let blob_path = bug
            .attachment(attachment_id)
            .and_then(|attachment| attachment.storage_path());

        let attachments = Arc::clone(&self.attachments);
        let storage = Arc::clone(&self.storage);
        self.controller
            .execute(
                &self.board,
                bug_id,
                MutationLabels::new("Error deleting attachment"),
                move |current| {
                    if current.attachment(attachment_id).is_none() {
                        return Err(AppError::NotFound(format!(
                            "attachment '{attachment_id}' does not belong to bug '{bug_id}'"
                        )));
                    }
                    Ok(RecordChange::Replace(current.without_attachment(attachment_id)))
                },
                move |_| async move {
                    attachments.delete_attachment(attachment_id).await?;

                    if let Some(path) = blob_path
                        && let Err(storage_error) =
                            storage.delete_blob(ATTACHMENTS_BUCKET, path.as_str()).await
                    {
                        warn!(
                            path = %path,
                            error = %storage_error,
                            "failed to remove attachment blob"
                        );
                    }
                    Ok(())
                },
            )
            .await
    }

    pub(super) async fn attach_files(&self, bug_id: BugId, files: Vec<UploadFile>) {
        if files.is_empty() {
            return;
        }

        let mut uploaded = Vec::with_capacity(files.len());
        for file in files {
            let blob_name = file.unique_blob_name();
            let file_name = file.display_name().to_owned();
            let file_type = file.content_type().to_owned();

            match self
                .storage
                .upload_blob(ATTACHMENTS_BUCKET, blob_name.as_str(), file.bytes, file_type.as_str())
                .await
            {
                Ok(file_url) => uploaded.push(NewAttachment {
                    bug_id,
                    file_url,
                    file_name,
                    file_type,
                }),
                Err(upload_error) => {
                    warn!(file = %file_name, error = %upload_error, "skipping attachment upload");
                    self.controller.notices().warning(format!(
                        "Skipped attachment '{file_name}': {}",
                        upload_error.message()
                    ));
                }
            }
        }

        if uploaded.is_empty() {
            return;
        }
        if let Err(link_error) = self.attachments.insert_attachments(uploaded).await {
            error!(bug_id = %bug_id, error = %link_error, "failed to link attachments");
            self.controller
                .notices()
                .warning("Bug saved, but its attachments could not be linked");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::UploadFile;

    fn file(name: &str) -> UploadFile {
        UploadFile {
            name: name.to_owned(),
            content_type: String::new(),
            bytes: vec![1, 2, 3],
        }
    }

    #[test]
    fn blob_name_keeps_extension() {
        let name = file("screen.shot.png").unique_blob_name();
        assert!(name.ends_with(".png"));
        assert!(name.split('-').next().is_some_and(|millis| millis.parse::<i64>().is_ok()));
    }

    #[test]
    fn pasted_file_defaults() {
        let pasted = file("");
        assert_eq!(pasted.display_name(), "pasted_file");
        assert_eq!(pasted.content_type(), "application/octet-stream");
        assert!(pasted.unique_blob_name().ends_with(".bin"));
        assert!(file("README").unique_blob_name().ends_with(".bin"));
    }
}
