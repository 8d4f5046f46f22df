//! Error types for the DDNS system
//!
//! Every failure a reconciliation attempt can hit maps onto one of these
//! variants. None of them is fatal to the engine: a task that sees an error
//! logs it and retries after its delay. Only configuration loading in the
//! daemon treats an error as a reason to exit.

use thiserror::Error;

/// Result type alias for DDNS operations
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for the DDNS system
#[derive(Error, Debug)]
pub enum Error {
    /// DNS, TCP or TLS failure before a response was received
    #[error("Transport error: {0}")]
    Transport(String),

    /// Non-success HTTP status
    #[error("HTTP error {status}: {message}")]
    Http {
        /// Status code returned by the server
        status: u16,
        /// Response body excerpt or reason
        message: String,
    },

    /// Response body did not parse into the expected shape
    #[error("Decode error: {0}")]
    Decode(String),

    /// Domain, host or record absent when required to exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// Credentials or request signature rejected
    #[error("Authentication failed: {0}")]
    Authentication(String),

    /// What-is-my-ip body that is not an address of the requested family
    #[error("Invalid address: {0}")]
    InvalidAddress(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Local I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Provider answered 2xx but reported failure in its body
    #[error("Provider error ({provider}): {message}")]
    Provider {
        /// Provider name
        provider: String,
        /// Error message
        message: String,
    },

    /// Generic error with context
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Create a transport error
    pub fn transport(msg: impl Into<String>) -> Self {
        Self::Transport(msg.into())
    }

    /// Create an HTTP status error
    pub fn http(status: u16, msg: impl Into<String>) -> Self {
        Self::Http {
            status,
            message: msg.into(),
        }
    }

    /// Create a decode error
    pub fn decode(msg: impl Into<String>) -> Self {
        Self::Decode(msg.into())
    }

    /// Create a "not found" error
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    /// Create an authentication error
    pub fn auth(msg: impl Into<String>) -> Self {
        Self::Authentication(msg.into())
    }

    /// Create an invalid address error
    pub fn invalid_address(msg: impl Into<String>) -> Self {
        Self::InvalidAddress(msg.into())
    }

    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a provider-specific error
    pub fn provider(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Provider {
            provider: provider.into(),
            message: message.into(),
        }
    }

    /// Whether a retry has a realistic chance of succeeding without operator action.
    ///
    /// The engine retries every failure regardless; this only decides how
    /// loudly a failed attempt is logged.
    pub fn is_retryable(&self) -> bool {
        match self {
            Error::Transport(_) | Error::Decode(_) | Error::Provider { .. } | Error::Io(_) => true,
            Error::Http { status, .. } => *status == 429 || *status >= 500,
            Error::InvalidAddress(_) | Error::Other(_) => true,
            Error::NotFound(_) | Error::Authentication(_) | Error::Config(_) | Error::Json(_) => {
                false
            }
        }
    }
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            Self::Decode(err.to_string())
        } else if let Some(status) = err.status() {
            Self::http(status.as_u16(), err.to_string())
        } else {
            Self::Transport(err.to_string())
        }
    }
}

/// Helper for converting anyhow::Error to our Error type
impl From<anyhow::Error> for Error {
    fn from(err: anyhow::Error) -> Self {
        Self::Other(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_classification() {
        assert!(Error::transport("connection reset").is_retryable());
        assert!(Error::http(503, "unavailable").is_retryable());
        assert!(Error::http(429, "slow down").is_retryable());
        assert!(!Error::http(400, "bad request").is_retryable());
        assert!(!Error::auth("bad token").is_retryable());
        assert!(!Error::not_found("example.com").is_retryable());
    }

    #[test]
    fn test_display_carries_context() {
        let err = Error::provider("dnspod", "Domain id invalid");
        assert_eq!(err.to_string(), "Provider error (dnspod): Domain id invalid");

        let err = Error::http(502, "bad gateway");
        assert_eq!(err.to_string(), "HTTP error 502: bad gateway");
    }
}
