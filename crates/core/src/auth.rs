use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Identity of the authenticated account as reported by the hosted auth service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserIdentity {
    subject: Uuid,
    email: String,
}

impl UserIdentity {
    /// Creates a user identity from authentication data.
    #[must_use]
    pub fn new(subject: Uuid, email: impl Into<String>) -> Self {
        Self {
            subject,
            email: email.into(),
        }
    }

    /// Returns the stable subject id from the identity provider.
    #[must_use]
    pub fn subject(&self) -> Uuid {
        self.subject
    }

    /// Returns the sign-in email.
    #[must_use]
    pub fn email(&self) -> &str {
        self.email.as_str()
    }

    /// Returns the part of the email before `@`, used as the default display name.
    #[must_use]
    pub fn email_local_part(&self) -> &str {
        self.email
            .split_once('@')
            .map_or(self.email.as_str(), |(local, _)| local)
    }
}

#[cfg(test)]
mod tests {
    use uuid::Uuid;

    use super::UserIdentity;

    #[test]
    fn local_part_is_text_before_at_sign() {
        let identity = UserIdentity::new(Uuid::new_v4(), "jane.doe@example.com");
        assert_eq!(identity.email_local_part(), "jane.doe");
    }
}
