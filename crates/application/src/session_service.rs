//! Authentication flows and the per-user session context.

mod context;

use std::sync::Arc;

use bugtrack_core::{AppError, AppResult, UserIdentity};
use bugtrack_domain::{
    EmailAddress, RoleName, UserId, UserProfile, avatar_url_for, validate_new_password,
};
use tokio::sync::broadcast;
use tracing::{info, warn};
use uuid::Uuid;

use crate::{AuthGateway, PermissionPolicyRepository, UserRepository};

pub use context::SessionContext;

const SESSION_EVENT_CAPACITY: usize = 16;

/// Change in the authentication state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    /// A session was established.
    SignedIn {
        /// Auth subject of the account.
        subject: Uuid,
    },
    /// The session ended.
    SignedOut,
    /// The profile row, and possibly the role, was reloaded.
    ProfileUpdated {
        /// Auth subject of the account.
        subject: Uuid,
    },
}

/// Application service for sign-in, sign-up and session lifecycle.
#[derive(Clone)]
pub struct SessionService {
    auth: Arc<dyn AuthGateway>,
    users: Arc<dyn UserRepository>,
    policies: Arc<dyn PermissionPolicyRepository>,
    events: broadcast::Sender<SessionEvent>,
}

impl SessionService {
    /// Creates a new session service.
    #[must_use]
    pub fn new(
        auth: Arc<dyn AuthGateway>,
        users: Arc<dyn UserRepository>,
        policies: Arc<dyn PermissionPolicyRepository>,
    ) -> Self {
        let (events, _) = broadcast::channel(SESSION_EVENT_CAPACITY);

        Self {
            auth,
            users,
            policies,
            events,
        }
    }

    /// Subscribes to session changes.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    /// Signs in with email and password.
    pub async fn sign_in(&self, email: &str, password: &str) -> AppResult<SessionContext> {
        let email = EmailAddress::new(email)?;
        if password.is_empty() {
            return Err(AppError::Validation("password is required".to_owned()));
        }

        let session = self.auth.authenticate(email.as_str(), password).await?;
        info!(subject = %session.identity.subject(), "signed in");

        Ok(self.establish(session.identity).await)
    }

    /// Creates an account and its profile row.
    ///
    /// Returns `None` when the backend requires email confirmation before the
    /// first sign-in.
    pub async fn sign_up(
        &self,
        email: &str,
        password: &str,
        confirmation: &str,
    ) -> AppResult<Option<SessionContext>> {
        let email = EmailAddress::new(email)?;
        validate_new_password(password, confirmation)?;

        let registration = self.auth.register(email.as_str(), password).await?;
        let identity = registration.identity;
        let name = identity.email_local_part().to_owned();
        let profile = UserProfile {
            id: UserId::from_uuid(identity.subject()),
            avatar: Some(avatar_url_for(name.as_str())),
            name: Some(name),
            email: Some(email.as_str().to_owned()),
            role: RoleName::default(),
        };

        self.users.insert_profile(profile).await.map_err(|error| {
            AppError::Remote(format!(
                "Auth successful but profile creation failed: {}",
                error.message()
            ))
        })?;
        info!(subject = %identity.subject(), "registered account");

        match registration.session {
            Some(session) => Ok(Some(self.establish(session.identity).await)),
            None => Ok(None),
        }
    }

    /// Ends the session and discards its context.
    pub async fn sign_out(&self, context: SessionContext) -> AppResult<()> {
        self.auth.deauthenticate().await?;
        info!(subject = %context.identity().subject(), "signed out");
        self.publish(SessionEvent::SignedOut);
        Ok(())
    }

    /// Rebuilds a context from the session the backend still holds.
    pub async fn restore(&self) -> AppResult<Option<SessionContext>> {
        match self.auth.current_session().await? {
            Some(session) => Ok(Some(self.establish(session.identity).await)),
            None => Ok(None),
        }
    }

    /// Reloads the profile row; capabilities are re-resolved when the role changed.
    pub async fn refresh(&self, context: &mut SessionContext) {
        let profile = self.fetch_profile(context.identity()).await;
        let role_changed = context.replace_profile(profile).await;
        if role_changed {
            info!(
                subject = %context.identity().subject(),
                "role changed, capabilities re-resolved"
            );
        }
        self.publish(SessionEvent::ProfileUpdated {
            subject: context.identity().subject(),
        });
    }

    /// Sends a password reset email.
    pub async fn request_password_reset(
        &self,
        email: &str,
        redirect_to: Option<&str>,
    ) -> AppResult<()> {
        let email = EmailAddress::new(email)?;
        self.auth
            .request_password_reset(email.as_str(), redirect_to)
            .await
    }

    /// Changes the signed-in account's password.
    pub async fn update_password(&self, password: &str, confirmation: &str) -> AppResult<()> {
        validate_new_password(password, confirmation)?;
        self.auth.update_password(password).await
    }

    async fn establish(&self, identity: UserIdentity) -> SessionContext {
        let profile = self.fetch_profile(&identity).await;
        let subject = identity.subject();
        let context = SessionContext::resolve(identity, profile, self.policies.clone()).await;
        self.publish(SessionEvent::SignedIn { subject });
        context
    }

    async fn fetch_profile(&self, identity: &UserIdentity) -> Option<UserProfile> {
        match self.users.find_by_email(identity.email()).await {
            Ok(profile) => profile,
            Err(error) => {
                warn!(subject = %identity.subject(), error = %error, "failed to load profile");
                None
            }
        }
    }

    fn publish(&self, event: SessionEvent) {
        // Sending only fails when nobody is subscribed.
        let _ = self.events.send(event);
    }
}
