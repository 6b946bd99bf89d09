//! Authentication context types.
//!
//! The [`AuthContext`] struct carries the verified identity to request
//! handlers.

use turnstile_types::Identity;

/// Authentication context attached by [`BearerAuthLayer`](crate::BearerAuthLayer).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthContext {
    /// Identity asserted by the access credential.
    pub identity: Identity,
}

impl AuthContext {
    /// Create a new auth context.
    #[must_use]
    pub fn new(identity: Identity) -> Self {
        Self { identity }
    }

    #[must_use]
    pub fn subject(&self) -> &str {
        &self.identity.subject
    }

    /// Check the role label. Labels are compared verbatim.
    #[must_use]
    pub fn has_role(&self, role: &str) -> bool {
        self.identity.role == role
    }
}

impl From<Identity> for AuthContext {
    fn from(identity: Identity) -> Self {
        Self::new(identity)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_auth_context() {
        let ctx = AuthContext::from(Identity::new("sub-1", "alice", "admin"));

        assert_eq!(ctx.subject(), "sub-1");
        assert!(ctx.has_role("admin"));
        assert!(!ctx.has_role("Admin"));
    }
}
