//! Provider error type.

use thiserror::Error;

/// Failure of one request to a completion provider.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// Transport-level failure (connect, timeout, TLS, body read).
    #[error("Error calling LLM: {0}")]
    Http(#[from] reqwest::Error),

    /// Non-success HTTP status.
    #[error("Error calling LLM: {status}: {body}")]
    Api { status: u16, body: String },

    /// Success status but the body was not the expected shape.
    #[error("Error parsing LLM response: {0}")]
    Parse(String),

    /// The provider answered without any choice/candidate.
    #[error("LLM returned an empty response")]
    EmptyResponse,

    /// The provider cannot be constructed from the current configuration.
    #[error("{0}")]
    Config(String),
}

impl ProviderError {
    /// Whether this error is a quota / rate-limit signal worth retrying.
    ///
    /// Matches HTTP 429 and Google's `RESOURCE_EXHAUSTED` status marker.
    pub fn is_rate_limited(&self) -> bool {
        match self {
            ProviderError::Api { status, body } => {
                *status == 429 || body.contains("RESOURCE_EXHAUSTED")
            }
            ProviderError::Http(e) => e.status().is_some_and(|s| s.as_u16() == 429),
            _ => false,
        }
    }
}
