//! Error types for management API operations

use thiserror::Error;

/// Result type alias for management API operations
pub type Result<T> = std::result::Result<T, MgmtError>;

/// Errors that can occur while talking to the management API
#[derive(Debug, Error)]
pub enum MgmtError {
    /// Network or HTTP-layer failure
    #[error("Transport error calling '{method}': {source}")]
    Transport {
        method: String,
        #[source]
        source: reqwest::Error,
    },

    /// The API answered with a non-200 status
    #[error("API call '{method}' failed with status {status}: {body}")]
    Api {
        method: String,
        status: u16,
        body: String,
    },

    /// Response body was not the expected JSON
    #[error("Failed to decode '{method}' response: {source}")]
    Decode {
        method: String,
        #[source]
        source: serde_json::Error,
    },

    /// Login failed or returned no session id
    #[error("Authentication failed: {message}")]
    Auth {
        message: String,
        #[source]
        source: Option<Box<MgmtError>>,
    },

    /// The underlying HTTP client could not be built
    #[error("Failed to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),
}

impl MgmtError {
    /// Create an Auth error
    pub fn auth(message: impl Into<String>) -> Self {
        Self::Auth {
            message: message.into(),
            source: None,
        }
    }

    /// Create an Auth error wrapping the failure that caused it
    pub fn auth_with_source(message: impl Into<String>, source: MgmtError) -> Self {
        Self::Auth {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Create a Decode error
    pub fn decode(method: impl Into<String>, source: serde_json::Error) -> Self {
        Self::Decode {
            method: method.into(),
            source,
        }
    }

    /// HTTP status carried by an Api error, if any
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Api { status, .. } => Some(*status),
            Self::Auth {
                source: Some(inner),
                ..
            } => inner.status(),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_is_reported_through_auth() {
        let api = MgmtError::Api {
            method: "login".to_string(),
            status: 401,
            body: "denied".to_string(),
        };
        assert_eq!(api.status(), Some(401));

        let auth = MgmtError::auth_with_source("login rejected", api);
        assert_eq!(auth.status(), Some(401));
        assert!(auth.to_string().contains("login rejected"));
    }

    #[test]
    fn test_auth_without_source_has_no_status() {
        assert_eq!(MgmtError::auth("no sid").status(), None);
    }
}
