//! Capability resolution for the signed-in user.
//!
//! The resolver caches one capability set per observed role and answers
//! `can` synchronously from that cache. Lookups fail closed: a missing role,
//! a failed fetch or an unknown capability all read as "not permitted".

use std::sync::Arc;

use bugtrack_core::{AppError, AppResult};
use bugtrack_domain::{Capability, CapabilitySet, RoleName};
use tracing::{debug, error};

use crate::PermissionPolicyRepository;

/// Cached capability lookup for one session.
pub struct PermissionResolver {
    repository: Arc<dyn PermissionPolicyRepository>,
    observed: Option<Option<RoleName>>,
    capabilities: CapabilitySet,
    loading: bool,
}

impl PermissionResolver {
    /// Creates a resolver that has not observed any role yet.
    #[must_use]
    pub fn new(repository: Arc<dyn PermissionPolicyRepository>) -> Self {
        Self {
            repository,
            observed: None,
            capabilities: CapabilitySet::empty(),
            loading: true,
        }
    }

    /// Records the current role and re-fetches capabilities when it changed.
    ///
    /// Returns whether a resolution ran. Observing the same role again is a no-op.
    pub async fn observe_role(&mut self, role: Option<&RoleName>) -> bool {
        if self
            .observed
            .as_ref()
            .is_some_and(|observed| observed.as_ref() == role)
        {
            return false;
        }

        self.observed = Some(role.cloned());
        self.resolve().await;
        true
    }

    /// Re-fetches capabilities for the role already observed.
    pub async fn refresh(&mut self) {
        if self.observed.is_some() {
            self.resolve().await;
        }
    }

    /// Returns whether the current user may perform `capability`.
    #[must_use]
    pub fn can(&self, capability: Capability) -> bool {
        if self.role().is_some_and(RoleName::is_admin) {
            return true;
        }

        self.capabilities.allows(capability)
    }

    /// Fails with a forbidden error when `can` is false.
    pub fn require(&self, capability: Capability) -> AppResult<()> {
        if self.can(capability) {
            return Ok(());
        }

        Err(AppError::Forbidden(format!(
            "role '{}' is missing capability '{}'",
            self.role().map_or("<none>", RoleName::as_str),
            capability.as_str()
        )))
    }

    /// Returns the cached capability set.
    #[must_use]
    pub fn capabilities(&self) -> &CapabilitySet {
        &self.capabilities
    }

    /// Returns the observed role.
    #[must_use]
    pub fn role(&self) -> Option<&RoleName> {
        self.observed.as_ref().and_then(Option::as_ref)
    }

    /// True until the first resolution has completed.
    #[must_use]
    pub fn is_loading(&self) -> bool {
        self.loading
    }

    async fn resolve(&mut self) {
        self.capabilities = match self.role() {
            None => CapabilitySet::empty(),
            Some(role) if role.is_admin() => CapabilitySet::all_granted(),
            Some(role) => match self.repository.find_policy(role).await {
                Ok(Some(policy)) => policy.capability_set(),
                Ok(None) => {
                    debug!(role = %role, "no stored policy, using fallback capabilities");
                    CapabilitySet::fallback_for(role)
                }
                Err(fetch_error) => {
                    error!(role = %role, error = %fetch_error, "failed to fetch permission policy");
                    CapabilitySet::empty()
                }
            },
        };
        self.loading = false;
    }
}
