//! Error taxonomy for the PowerDNS Authoritative REST client.

use thiserror::Error;

/// A structured PowerDNS error response body.
#[derive(Debug, Clone, PartialEq, serde::Deserialize)]
pub struct ApiErrorBody {
    pub error: String,
    #[serde(default)]
    pub errors: Option<Vec<String>>,
}

#[derive(Debug, Error)]
pub enum PowerDnsError {
    #[error("request to PowerDNS backend failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("PowerDNS backend returned {status}: {body}")]
    Api { status: u16, body: String },

    #[error("unexpected PowerDNS status code {0}")]
    UnexpectedStatus(u16),

    #[error("zone {0} not found")]
    ZoneNotFound(String),

    #[error("invalid domain name {name}: {reason}")]
    InvalidDomain { name: String, reason: String },

    #[error("failed to decode PowerDNS response body: {0}")]
    Decode(#[from] serde_json::Error),
}

impl PowerDnsError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, PowerDnsError::ZoneNotFound(_))
            || matches!(self, PowerDnsError::Api { status, .. } if *status == 404)
    }

    pub fn is_conflict(&self) -> bool {
        matches!(self, PowerDnsError::Api { status, .. } if *status == 409 || *status == 422)
    }

    pub fn is_transient(&self) -> bool {
        match self {
            PowerDnsError::Transport(e) => e.is_timeout() || e.is_connect(),
            PowerDnsError::Api { status, .. } => *status >= 500,
            _ => false,
        }
    }
}
