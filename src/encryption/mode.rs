//! Quorum encryption mode
//!
//! Allowed transitions:
//! - NON_SSL → TRANSITIONAL → SSL
//! - SSL → TRANSITIONAL → NON_SSL
//! - TRANSITIONAL → either final mode
//!
//! NON_SSL ↔ SSL is forbidden.

use std::fmt;

use super::errors::{EncryptionError, EncryptionResult};
use crate::state::{StateError, StateResult};

/// Mode written into the live server configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum QuorumMode {
    #[default]
    NonSsl,
    /// Accept both plain and TLS quorum traffic (port unification).
    Transitional,
    Ssl,
}

impl QuorumMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            QuorumMode::NonSsl => "non-ssl",
            QuorumMode::Transitional => "transitional",
            QuorumMode::Ssl => "ssl",
        }
    }

    pub fn parse(key: &str, raw: &str) -> StateResult<Self> {
        match raw {
            "non-ssl" => Ok(QuorumMode::NonSsl),
            "transitional" => Ok(QuorumMode::Transitional),
            "ssl" => Ok(QuorumMode::Ssl),
            other => Err(StateError::malformed(key, other)),
        }
    }

    /// Final mode for the given TLS presence.
    pub fn target(tls: bool) -> Self {
        if tls {
            QuorumMode::Ssl
        } else {
            QuorumMode::NonSsl
        }
    }

    pub fn is_final(&self) -> bool {
        !matches!(self, QuorumMode::Transitional)
    }

    /// Quorum traffic is TLS-only.
    pub fn ssl_quorum(&self) -> bool {
        matches!(self, QuorumMode::Ssl)
    }

    /// Plain and TLS quorum traffic share the same ports.
    pub fn port_unification(&self) -> bool {
        matches!(self, QuorumMode::Transitional)
    }

    /// Validate a move to `next`. Staying put is allowed.
    pub fn transition_to(self, next: QuorumMode) -> EncryptionResult<QuorumMode> {
        match (self, next) {
            (QuorumMode::NonSsl, QuorumMode::Ssl) | (QuorumMode::Ssl, QuorumMode::NonSsl) => {
                Err(EncryptionError::forbidden_transition(self.as_str(), next.as_str()))
            }
            _ => Ok(next),
        }
    }
}

impl fmt::Display for QuorumMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
