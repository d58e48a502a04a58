use std::collections::BTreeMap;
use std::fmt::{Display, Formatter};
use std::str::FromStr;

use bugtrack_core::AppError;
use serde::{Deserialize, Serialize};

use crate::RoleName;

/// Capabilities gated by the permission resolver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Capability {
    /// Allows deleting projects.
    CanDeleteProject,
    /// Allows deleting bugs and their attachments.
    CanDeleteBug,
    /// Allows changing other users' roles.
    CanManageUsers,
    /// Allows assigning users to bugs.
    CanAssignUsers,
    /// Allows creating, editing and deleting role policies.
    CanManagePermissions,
}

impl Capability {
    /// Returns a stable storage value for this capability.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::CanDeleteProject => "can_delete_project",
            Self::CanDeleteBug => "can_delete_bug",
            Self::CanManageUsers => "can_manage_users",
            Self::CanAssignUsers => "can_assign_users",
            Self::CanManagePermissions => "can_manage_permissions",
        }
    }

    /// Returns all known capabilities.
    #[must_use]
    pub fn all() -> &'static [Self] {
        const ALL: &[Capability] = &[
            Capability::CanDeleteProject,
            Capability::CanDeleteBug,
            Capability::CanManageUsers,
            Capability::CanAssignUsers,
            Capability::CanManagePermissions,
        ];

        ALL
    }
}

impl Display for Capability {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        formatter.write_str(self.as_str())
    }
}

impl FromStr for Capability {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "can_delete_project" => Ok(Self::CanDeleteProject),
            "can_delete_bug" => Ok(Self::CanDeleteBug),
            "can_manage_users" => Ok(Self::CanManageUsers),
            "can_assign_users" => Ok(Self::CanAssignUsers),
            "can_manage_permissions" => Ok(Self::CanManagePermissions),
            _ => Err(AppError::Validation(format!(
                "unknown capability value '{value}'"
            ))),
        }
    }
}

/// Stored permission policy row, one per role.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermissionPolicy {
    role: RoleName,
    #[serde(default)]
    can_delete_project: bool,
    #[serde(default)]
    can_delete_bug: bool,
    #[serde(default)]
    can_manage_users: bool,
    #[serde(default)]
    can_assign_users: bool,
    #[serde(default)]
    can_manage_permissions: bool,
}

impl PermissionPolicy {
    /// Creates a policy with every capability denied.
    #[must_use]
    pub fn new(role: RoleName) -> Self {
        Self {
            role,
            can_delete_project: false,
            can_delete_bug: false,
            can_manage_users: false,
            can_assign_users: false,
            can_manage_permissions: false,
        }
    }

    /// Returns the role this policy belongs to.
    #[must_use]
    pub fn role(&self) -> &RoleName {
        &self.role
    }

    /// Returns the stored flag for a capability.
    ///
    /// This is the raw stored value; the admin override is applied by the resolver.
    #[must_use]
    pub fn allows(&self, capability: Capability) -> bool {
        match capability {
            Capability::CanDeleteProject => self.can_delete_project,
            Capability::CanDeleteBug => self.can_delete_bug,
            Capability::CanManageUsers => self.can_manage_users,
            Capability::CanAssignUsers => self.can_assign_users,
            Capability::CanManagePermissions => self.can_manage_permissions,
        }
    }

    /// Returns a copy with one flag replaced.
    #[must_use]
    pub fn with(mut self, capability: Capability, allowed: bool) -> Self {
        match capability {
            Capability::CanDeleteProject => self.can_delete_project = allowed,
            Capability::CanDeleteBug => self.can_delete_bug = allowed,
            Capability::CanManageUsers => self.can_manage_users = allowed,
            Capability::CanAssignUsers => self.can_assign_users = allowed,
            Capability::CanManagePermissions => self.can_manage_permissions = allowed,
        }

        self
    }

    /// Returns every flag as a capability set.
    #[must_use]
    pub fn capability_set(&self) -> CapabilitySet {
        Capability::all()
            .iter()
            .map(|capability| (*capability, self.allows(*capability)))
            .collect()
    }
}

/// Capabilities resolved for the signed-in user.
///
/// Capabilities absent from the set are denied.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CapabilitySet(BTreeMap<Capability, bool>);

impl CapabilitySet {
    /// Returns an empty set that denies everything.
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Returns a set granting every known capability.
    #[must_use]
    pub fn all_granted() -> Self {
        Capability::all()
            .iter()
            .map(|capability| (*capability, true))
            .collect()
    }

    /// Fallback used when a role has no stored policy row.
    ///
    /// Grants assignment to every role and reserves the destructive flags
    /// for `Admin`. `can_manage_permissions` is left out and therefore denied.
    #[must_use]
    pub fn fallback_for(role: &RoleName) -> Self {
        let is_admin = role.is_admin();
        Self(BTreeMap::from([
            (Capability::CanDeleteProject, is_admin),
            (Capability::CanDeleteBug, is_admin),
            (Capability::CanManageUsers, is_admin),
            (Capability::CanAssignUsers, true),
        ]))
    }

    /// Returns whether the capability is present and granted.
    #[must_use]
    pub fn allows(&self, capability: Capability) -> bool {
        self.0.get(&capability).copied().unwrap_or(false)
    }

    /// Returns the explicit entry for a capability, if any.
    #[must_use]
    pub fn get(&self, capability: Capability) -> Option<bool> {
        self.0.get(&capability).copied()
    }

    /// Returns whether the set has no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterates over explicit entries in capability order.
    pub fn iter(&self) -> impl Iterator<Item = (Capability, bool)> + '_ {
        self.0.iter().map(|(capability, allowed)| (*capability, *allowed))
    }
}

impl FromIterator<(Capability, bool)> for CapabilitySet {
    fn from_iter<I: IntoIterator<Item = (Capability, bool)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use super::{Capability, CapabilitySet, PermissionPolicy};
    use crate::RoleName;

    #[test]
    fn capability_roundtrip_storage_value() {
        for capability in Capability::all() {
            let restored = Capability::from_str(capability.as_str());
            assert_eq!(restored.ok(), Some(*capability));
        }
    }

    #[test]
    fn unknown_capability_is_rejected() {
        assert!(Capability::from_str("can_fly").is_err());
    }

    #[test]
    fn fallback_for_non_admin_only_grants_assignment() {
        let set = CapabilitySet::fallback_for(&RoleName::from_stored(Some("Guest")));

        assert!(!set.allows(Capability::CanDeleteProject));
        assert!(!set.allows(Capability::CanDeleteBug));
        assert!(!set.allows(Capability::CanManageUsers));
        assert!(set.allows(Capability::CanAssignUsers));
        assert_eq!(set.get(Capability::CanManagePermissions), None);
    }

    #[test]
    fn empty_set_denies_everything() {
        let set = CapabilitySet::empty();
        assert!(Capability::all().iter().all(|capability| !set.allows(*capability)));
    }

    #[test]
    fn policy_row_with_missing_columns_defaults_to_denied() {
        let policy: Result<PermissionPolicy, _> =
            serde_json::from_str(r#"{"id": 4, "role": "QA", "can_delete_bug": true}"#);
        let policy = policy.unwrap_or_else(|_| PermissionPolicy::new(RoleName::admin()));

        assert_eq!(policy.role().as_str(), "QA");
        assert!(policy.allows(Capability::CanDeleteBug));
        assert!(!policy.allows(Capability::CanManageUsers));
    }

    #[test]
    fn with_replaces_single_flag() {
        let policy = PermissionPolicy::new(RoleName::developer())
            .with(Capability::CanAssignUsers, true);

        assert!(policy.allows(Capability::CanAssignUsers));
        assert_eq!(
            policy.capability_set().iter().filter(|(_, allowed)| *allowed).count(),
            1
        );
    }
}
