mod auth;
mod load_test;
mod records;
mod storage;

pub use auth::{AuthGateway, AuthSession, Registration};
pub use load_test::{LoadTestEventStream, LoadTestGateway};
pub use records::{
    AttachmentRepository, BugQuery, BugRepository, NewAttachment, PermissionPolicyRepository,
    ProfileUpsert, ProjectRepository, UserDirectory, UserRepository,
};
pub use storage::BlobStorage;
