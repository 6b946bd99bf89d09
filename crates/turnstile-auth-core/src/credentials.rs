//! Account verification seam used by the login flow

use async_trait::async_trait;
use turnstile_types::Identity;

use crate::crypto::constant_time_str_eq;
use crate::AuthError;

/// External identity store
///
/// `Ok(None)` means unknown user or wrong password; the two are not
/// distinguished. `Err` is reserved for the store itself failing.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    async fn authenticate(
        &self,
        username: &str,
        password: &str,
    ) -> Result<Option<Identity>, AuthError>;
}

/// Single configured account
pub struct StaticCredentials {
    username: String,
    password: String,
    identity: Identity,
}

impl StaticCredentials {
    /// The subject identifier is generated once and stays stable for the
    /// lifetime of the process.
    pub fn new(
        username: impl Into<String>,
        password: impl Into<String>,
        role: impl Into<String>,
    ) -> Self {
        let username = username.into();
        let identity = Identity::new(uuid::Uuid::new_v4().to_string(), username.clone(), role);
        Self {
            username,
            password: password.into(),
            identity,
        }
    }

    pub fn identity(&self) -> &Identity {
        &self.identity
    }
}

#[async_trait]
impl CredentialStore for StaticCredentials {
    async fn authenticate(
        &self,
        username: &str,
        password: &str,
    ) -> Result<Option<Identity>, AuthError> {
        // Evaluate both comparisons so timing does not reveal which failed
        let user_ok = constant_time_str_eq(username, &self.username);
        let pass_ok = constant_time_str_eq(password, &self.password);

        if user_ok & pass_ok {
            Ok(Some(self.identity.clone()))
        } else {
            Ok(None)
        }
    }
}

impl std::fmt::Debug for StaticCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StaticCredentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("identity", &self.identity)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_static_credentials() {
        let store = StaticCredentials::new("alice", "hunter22", "admin");

        let identity = store.authenticate("alice", "hunter22").await.unwrap().unwrap();
        assert_eq!(identity.contact, "alice");
        assert_eq!(identity.role, "admin");
        assert_eq!(&identity, store.identity());

        assert!(store.authenticate("alice", "wrong").await.unwrap().is_none());
        assert!(store.authenticate("bob", "hunter22").await.unwrap().is_none());
        assert!(store.authenticate("", "").await.unwrap().is_none());
    }

    #[test]
    fn test_debug_redacts_password() {
        let store = StaticCredentials::new("alice", "hunter22", "admin");
        let debug = format!("{:?}", store);
        assert!(!debug.contains("hunter22"));
        assert!(debug.contains("<redacted>"));
    }
}
