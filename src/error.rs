//! Top-level error types for Mimicbot.

use std::sync::Arc;
use std::time::Duration;

/// Crate-wide result type alias.
pub type Result<T> = std::result::Result<T, Error>;

/// Top-level error enum wrapping domain-specific errors.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Llm(#[from] LlmError),

    #[error(transparent)]
    Messaging(#[from] MessagingError),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// A 429-equivalent signal raised by a collaborator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitSignal {
    /// How long the service asked us to wait, if it said.
    pub retry_after: Option<Duration>,
}

impl Error {
    /// The rate-limit signal carried by this error, if any.
    ///
    /// Both the generation service and the channel transport can push back;
    /// everything else is a generic failure.
    pub fn rate_limit(&self) -> Option<RateLimitSignal> {
        match self {
            Error::Llm(LlmError::RateLimited { retry_after })
            | Error::Messaging(MessagingError::RateLimited { retry_after }) => {
                Some(RateLimitSignal {
                    retry_after: *retry_after,
                })
            }
            _ => None,
        }
    }
}

/// Configuration loading errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to load config from {path}: {source}")]
    Load {
        path: String,
        source: Arc<std::io::Error>,
    },

    #[error("failed to parse config: {0}")]
    Parse(String),

    #[error("invalid configuration: {0}")]
    Invalid(String),

    #[error("missing required config key: {0}")]
    MissingKey(String),
}

/// Generation service errors.
#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    #[error("rate limited by provider (retry after {retry_after:?})")]
    RateLimited { retry_after: Option<Duration> },

    #[error("provider API error ({status}): {message}")]
    Provider { status: u16, message: String },

    #[error("provider request failed: {0}")]
    ProviderRequest(String),

    #[error("invalid provider response: {0}")]
    InvalidResponse(String),
}

/// Channel transport errors.
#[derive(Debug, thiserror::Error)]
pub enum MessagingError {
    #[error("messaging adapter has not been started")]
    NotStarted,

    #[error("invalid platform id: {0}")]
    InvalidId(String),

    #[error("rate limited by transport (retry after {retry_after:?})")]
    RateLimited { retry_after: Option<Duration> },

    #[error("transport request failed: {0}")]
    Transport(String),
}
