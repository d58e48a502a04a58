//! Infrastructure adapters for application ports.

#![forbid(unsafe_code)]

mod hosted_auth_gateway;
mod hosted_backend_client;
mod hosted_blob_storage;
mod hosted_bug_repository;
mod hosted_permission_policy_repository;
mod hosted_project_repository;
mod hosted_user_repository;
mod http_load_test_gateway;
mod in_memory_backend;

pub use hosted_auth_gateway::HostedAuthGateway;
pub use hosted_backend_client::{HostedBackendClient, RowFilter, SortDirection, map_backend_error};
pub use hosted_blob_storage::HostedBlobStorage;
pub use hosted_bug_repository::{HostedAttachmentRepository, HostedBugRepository};
pub use hosted_permission_policy_repository::HostedPermissionPolicyRepository;
pub use hosted_project_repository::HostedProjectRepository;
pub use hosted_user_repository::HostedUserRepository;
pub use http_load_test_gateway::HttpLoadTestGateway;
pub use in_memory_backend::InMemoryBackend;
