//! Domain entities and invariants.

#![forbid(unsafe_code)]

mod issue;
mod load_test;
mod project;
mod role;
mod security;
mod user;

pub use issue::{
    ATTACHMENTS_BUCKET, Attachment, AttachmentId, Bug, BugDraft, BugId, BugPriority, BugStatus,
};
pub use load_test::{LoadTestEvent, LoadTestReport, LoadTestRequest};
pub use project::{PROJECT_KEY_MAX_LENGTH, Project, ProjectDraft, ProjectId};
pub use role::RoleName;
pub use security::{Capability, CapabilitySet, PermissionPolicy};
pub use user::{
    AVATARS_BUCKET, EmailAddress, PASSWORD_MIN_LENGTH, UserId, UserProfile, avatar_url_for,
    validate_new_password,
};
