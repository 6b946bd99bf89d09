//! Identity types

use serde::{Deserialize, Serialize};

/// Identity carried by a verified access credential.
///
/// The role is an opaque label; Turnstile never interprets it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Identity {
    /// Subject identifier
    pub subject: String,
    /// Display / contact attribute (e.g. username or email)
    pub contact: String,
    /// Role label
    pub role: String,
}

impl Identity {
    /// Create a new identity
    pub fn new(
        subject: impl Into<String>,
        contact: impl Into<String>,
        role: impl Into<String>,
    ) -> Self {
        Self {
            subject: subject.into(),
            contact: contact.into(),
            role: role.into(),
        }
    }
}

impl std::fmt::Display for Identity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.subject, self.role)
    }
}
