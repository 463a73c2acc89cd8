//! Errors raised inside provider clients.
//!
//! These never leave a provider's public fetch/search methods: the client
//! logs them with provider and identifier context and reports "no data".

use super::cache::CacheError;

/// Failure while talking to an external book data provider.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{provider}: request timed out: {message}")]
    Timeout {
        provider: &'static str,
        message: String,
        #[source]
        source: Option<reqwest::Error>,
    },

    #[error("{provider}: error response{}: {message}", status.map(|s| format!(" (HTTP {s})")).unwrap_or_default())]
    Response {
        provider: &'static str,
        message: String,
        status: Option<u16>,
        #[source]
        source: Option<reqwest::Error>,
    },

    #[error("{provider}: transport error: {message}")]
    Transport {
        provider: &'static str,
        message: String,
        #[source]
        source: Option<reqwest::Error>,
    },

    #[error("{provider}: invalid response body: {message}")]
    Decode {
        provider: &'static str,
        message: String,
        #[source]
        source: Option<serde_json::Error>,
    },
}

impl ApiError {
    /// Name of the provider that raised the error.
    pub fn provider(&self) -> &'static str {
        match self {
            Self::Timeout { provider, .. }
            | Self::Response { provider, .. }
            | Self::Transport { provider, .. }
            | Self::Decode { provider, .. } => provider,
        }
    }

    /// Human-readable message without the provider prefix.
    pub fn message(&self) -> &str {
        match self {
            Self::Timeout { message, .. }
            | Self::Response { message, .. }
            | Self::Transport { message, .. }
            | Self::Decode { message, .. } => message,
        }
    }

    /// HTTP status code, when the remote answered.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Response { status, .. } => *status,
            _ => None,
        }
    }

    /// Map a transport-level `reqwest` failure onto the taxonomy.
    pub fn from_reqwest(provider: &'static str, err: reqwest::Error) -> Self {
        let message = err.to_string();
        if err.is_timeout() {
            Self::Timeout {
                provider,
                message,
                source: Some(err),
            }
        } else if let Some(status) = err.status() {
            Self::Response {
                provider,
                message,
                status: Some(status.as_u16()),
                source: Some(err),
            }
        } else {
            Self::Transport {
                provider,
                message,
                source: Some(err),
            }
        }
    }

    /// Build a response error for a non-success status.
    pub fn status_error(provider: &'static str, status: u16, message: impl Into<String>) -> Self {
        Self::Response {
            provider,
            message: message.into(),
            status: Some(status),
            source: None,
        }
    }

    /// Build a decode error for a malformed JSON body.
    pub fn decode(provider: &'static str, err: serde_json::Error) -> Self {
        Self::Decode {
            provider,
            message: err.to_string(),
            source: Some(err),
        }
    }
}

/// Failure of a cached provider call: either the remote call or the cache.
#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    #[error(transparent)]
    Api(#[from] ApiError),

    #[error(transparent)]
    Cache(#[from] CacheError),
}
