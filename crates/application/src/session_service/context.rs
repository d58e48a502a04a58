use std::sync::Arc;

use bugtrack_core::{AppResult, UserIdentity};
use bugtrack_domain::{Capability, RoleName, UserId, UserProfile};

use crate::{PermissionPolicyRepository, PermissionResolver};

/// Signed-in user, their profile row and resolved capabilities.
///
/// Services take the context explicitly instead of reading global state.
pub struct SessionContext {
    identity: UserIdentity,
    profile: Option<UserProfile>,
    permissions: PermissionResolver,
}

impl SessionContext {
    /// Builds a context and resolves capabilities for the profile's role.
    pub async fn resolve(
        identity: UserIdentity,
        profile: Option<UserProfile>,
        policies: Arc<dyn PermissionPolicyRepository>,
    ) -> Self {
        let mut permissions = PermissionResolver::new(policies);
        permissions
            .observe_role(profile.as_ref().map(|profile| &profile.role))
            .await;

        Self {
            identity,
            profile,
            permissions,
        }
    }

    /// Returns the authenticated account.
    #[must_use]
    pub fn identity(&self) -> &UserIdentity {
        &self.identity
    }

    /// Returns the user id shared by the auth account and the profile row.
    #[must_use]
    pub fn user_id(&self) -> UserId {
        UserId::from_uuid(self.identity.subject())
    }

    /// Returns the profile row, if one was found.
    #[must_use]
    pub fn profile(&self) -> Option<&UserProfile> {
        self.profile.as_ref()
    }

    /// Returns the profile's role.
    #[must_use]
    pub fn role(&self) -> Option<&RoleName> {
        self.permissions.role()
    }

    /// Returns the capability resolver.
    #[must_use]
    pub fn permissions(&self) -> &PermissionResolver {
        &self.permissions
    }

    /// Shorthand for [`PermissionResolver::can`].
    #[must_use]
    pub fn can(&self, capability: Capability) -> bool {
        self.permissions.can(capability)
    }

    /// Shorthand for [`PermissionResolver::require`].
    pub fn require(&self, capability: Capability) -> AppResult<()> {
        self.permissions.require(capability)
    }

    pub(crate) async fn replace_profile(&mut self, profile: Option<UserProfile>) -> bool {
        let role_changed = self
            .permissions
            .observe_role(profile.as_ref().map(|profile| &profile.role))
            .await;
        self.profile = profile;
        role_changed
    }
}
