use async_trait::async_trait;
use bugtrack_application::{AuthGateway, AuthSession, Registration};
use bugtrack_core::{AppError, AppResult, UserIdentity};
use bugtrack_domain::{EmailAddress, PASSWORD_MIN_LENGTH, UserId};
use uuid::Uuid;

use super::{Account, InMemoryBackend};

fn issue_session(identity: UserIdentity) -> AuthSession {
    AuthSession {
        identity,
        access_token: Uuid::new_v4().simple().to_string(),
        refresh_token: None,
        expires_at: None,
    }
}

#[async_trait]
impl AuthGateway for InMemoryBackend {
    async fn authenticate(&self, email: &str, password: &str) -> AppResult<AuthSession> {
        let email = EmailAddress::new(email)?;
        let mut state = self.state.write().await;

        let identity = state
            .accounts
            .get(email.as_str())
            .filter(|account| account.password == password)
            .map(|account| account.identity.clone())
            .ok_or_else(|| AppError::Unauthorized("Invalid login credentials".to_owned()))?;

        let session = issue_session(identity);
        state.session = Some(session.clone());
        Ok(session)
    }

    async fn register(&self, email: &str, password: &str) -> AppResult<Registration> {
        let email = EmailAddress::new(email)?;
        if password.chars().count() < PASSWORD_MIN_LENGTH {
            return Err(AppError::Validation(format!(
                "Password should be at least {PASSWORD_MIN_LENGTH} characters"
            )));
        }

        let mut state = self.state.write().await;
        if state.accounts.contains_key(email.as_str()) {
            return Err(AppError::Conflict("User already registered".to_owned()));
        }

        let identity = UserIdentity::new(UserId::new().as_uuid(), email.as_str());
        state.accounts.insert(
            email.as_str().to_owned(),
            Account {
                identity: identity.clone(),
                password: password.to_owned(),
            },
        );

        let session = issue_session(identity.clone());
        state.session = Some(session.clone());
        Ok(Registration {
            identity,
            session: Some(session),
        })
    }

    async fn deauthenticate(&self) -> AppResult<()> {
        self.state.write().await.session = None;
        Ok(())
    }

    async fn current_session(&self) -> AppResult<Option<AuthSession>> {
        Ok(self.state.read().await.session.clone())
    }

    async fn request_password_reset(
        &self,
        email: &str,
        redirect_to: Option<&str>,
    ) -> AppResult<()> {
        let email = EmailAddress::new(email)?;
        tracing::info!(
            email = %email.as_str(),
            redirect_to = redirect_to.unwrap_or("<none>"),
            "password reset requested"
        );
        Ok(())
    }

    async fn update_password(&self, new_password: &str) -> AppResult<()> {
        let mut state = self.state.write().await;
        let email = state
            .session
            .as_ref()
            .map(|session| session.identity.email().to_owned())
            .ok_or_else(|| {
                AppError::Unauthorized("sign in before changing the password".to_owned())
            })?;

        let account = state
            .accounts
            .get_mut(email.as_str())
            .ok_or_else(|| AppError::NotFound(format!("account '{email}' not found")))?;
        account.password = new_password.to_owned();
        Ok(())
    }
}
