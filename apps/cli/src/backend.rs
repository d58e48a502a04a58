use std::sync::Arc;

use bugtrack_application::{
    AttachmentRepository, AuthGateway, BlobStorage, BugRepository, LoadTestGateway,
    PermissionPolicyRepository, ProjectRepository, UserRepository,
};
use bugtrack_core::{AppError, AppResult};
use bugtrack_domain::RoleName;
use bugtrack_infrastructure::{
    HostedAttachmentRepository, HostedAuthGateway, HostedBackendClient, HostedBlobStorage,
    HostedBugRepository, HostedPermissionPolicyRepository, HostedProjectRepository,
    HostedUserRepository, HttpLoadTestGateway, InMemoryBackend,
};
use tracing::info;

use crate::config::{BackendTarget, ClientConfig};

/// Port implementations selected by configuration.
#[derive(Clone)]
pub(crate) struct Backends {
    pub(crate) auth: Arc<dyn AuthGateway>,
    pub(crate) users: Arc<dyn UserRepository>,
    pub(crate) policies: Arc<dyn PermissionPolicyRepository>,
    pub(crate) bugs: Arc<dyn BugRepository>,
    pub(crate) attachments: Arc<dyn AttachmentRepository>,
    pub(crate) projects: Arc<dyn ProjectRepository>,
    pub(crate) storage: Arc<dyn BlobStorage>,
    pub(crate) load_test: Arc<dyn LoadTestGateway>,
}

impl Backends {
    pub(crate) fn connect(config: &ClientConfig) -> AppResult<Self> {
        // The event stream stays open for a whole run, so only connecting is bounded.
        let streaming_client = reqwest::Client::builder()
            .connect_timeout(config.http_timeout)
            .build()
            .map_err(|error| AppError::Internal(format!("failed to build HTTP client: {error}")))?;
        let load_test = Arc::new(HttpLoadTestGateway::new(
            streaming_client,
            config.load_test_url.as_str(),
        )?);

        match &config.backend {
            BackendTarget::Memory => {
                let mut backend = InMemoryBackend::new().with_default_policies();
                if let Some(credentials) = &config.credentials {
                    backend = backend.with_account(
                        credentials.email.as_str(),
                        credentials.password.as_str(),
                        RoleName::admin(),
                    )?;
                }
                info!("using in-memory backend");

                let backend = Arc::new(backend);
                Ok(Self {
                    auth: backend.clone(),
                    users: backend.clone(),
                    policies: backend.clone(),
                    bugs: backend.clone(),
                    attachments: backend.clone(),
                    projects: backend.clone(),
                    storage: backend,
                    load_test,
                })
            }
            BackendTarget::Hosted { base_url, api_key } => {
                let http_client = reqwest::Client::builder()
                    .timeout(config.http_timeout)
                    .build()
                    .map_err(|error| {
                        AppError::Internal(format!("failed to build HTTP client: {error}"))
                    })?;
                let client =
                    HostedBackendClient::new(http_client, base_url.as_str(), api_key.as_str())?;
                info!(base_url = %base_url, "using hosted backend");

                Ok(Self {
                    auth: Arc::new(HostedAuthGateway::new(client.clone())),
                    users: Arc::new(HostedUserRepository::new(client.clone())),
                    policies: Arc::new(HostedPermissionPolicyRepository::new(client.clone())),
                    bugs: Arc::new(HostedBugRepository::new(client.clone())),
                    attachments: Arc::new(HostedAttachmentRepository::new(client.clone())),
                    projects: Arc::new(HostedProjectRepository::new(client.clone())),
                    storage: Arc::new(HostedBlobStorage::new(client)),
                    load_test,
                })
            }
        }
    }
}
