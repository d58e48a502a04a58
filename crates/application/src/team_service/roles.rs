use super::*;

use tracing::info;

impl TeamService {
    /// Reloads every role policy.
    pub async fn load_roles(&self) {
        match self.policies.list_policies().await {
            Ok(policies) => self.roles.replace(policies),
            Err(load_error) => {
                error!(error = %load_error, "failed to load role policies");
                self.roles.replace(Vec::new());
                self.controller.notices().error("Failed to load roles");
            }
        }
    }

    /// Creates a role with every capability denied.
    ///
    /// The policy joins the local list only after the backend stored it.
    pub async fn create_role(
        &self,
        session: &SessionContext,
        name: &str,
    ) -> Option<PermissionPolicy> {
        if let Err(denied) = session.require(Capability::CanManagePermissions) {
            self.controller.reject(denied);
            return None;
        }

        let role = match RoleName::new(name) {
            Ok(role) => role,
            Err(invalid) => {
                self.controller.reject(invalid);
                return None;
            }
        };
        if self.roles.contains(&role) {
            self.controller
                .reject(AppError::Conflict(format!("Role '{role}' already exists")));
            return None;
        }

        let created = self
            .controller
            .persist(
                MutationLabels::new("Failed to create role")
                    .with_success(format!("Role '{role}' created")),
                self.policies.insert_policy(PermissionPolicy::new(role.clone())),
            )
            .await?;

        info!(role = %role, "role created");
        self.roles.push(created.clone());
        Some(created)
    }

    /// Flips one capability of a role.
    pub async fn toggle_permission(
        &self,
        session: &SessionContext,
        role: &RoleName,
        capability: Capability,
    ) -> MutationOutcome {
        if let Err(denied) = session.require(Capability::CanManagePermissions) {
            return self.controller.reject(denied);
        }
        if role.is_admin() {
            return self.controller.reject(AppError::Forbidden(
                "The Admin policy cannot be edited".to_owned(),
            ));
        }

        let policies = Arc::clone(&self.policies);
        let target = role.clone();
        self.controller
            .execute(
                &self.roles,
                role.clone(),
                MutationLabels::new("Failed to update permission"),
                move |current| {
                    let allowed = !current.allows(capability);
                    Ok(RecordChange::Replace(current.clone().with(capability, allowed)))
                },
                move |change| async move {
                    let allowed = match &change {
                        RecordChange::Replace(policy) => policy.allows(capability),
                        RecordChange::Remove => false,
                    };
                    policies
                        .update_capability(&target, capability, allowed)
                        .await
                },
            )
            .await
    }

    /// Deletes a role nobody holds anymore.
    pub async fn delete_role(&self, session: &SessionContext, role: &RoleName) -> MutationOutcome {
        if let Err(denied) = session.require(Capability::CanManagePermissions) {
            return self.controller.reject(denied);
        }
        if role.is_admin() {
            return self.controller.reject(AppError::Forbidden(
                "The Admin role cannot be deleted".to_owned(),
            ));
        }

        let users = Arc::clone(&self.users);
        let policies = Arc::clone(&self.policies);
        let holders_of = role.clone();
        let target = role.clone();
        let precondition = async move {
            let holders = users.count_users_with_role(&holders_of).await?;
            if holders > 0 {
                return Err(AppError::PreconditionFailed(format!(
                    "Cannot delete role '{holders_of}': {holders} users still hold it"
                )));
            }
            Ok(())
        };

        self.controller
            .execute_guarded(
                &self.roles,
                role.clone(),
                MutationLabels::new("Failed to delete role")
                    .with_success(format!("Role '{role}' deleted")),
                precondition,
                |_| Ok(RecordChange::Remove),
                move |_| async move { policies.delete_policy(&target).await },
            )
            .await
    }
}
