/*!
 * Error types for the ytsubflow application.
 *
 * Remote collaborators (the hosting platform and the generative-text
 * services) report `ProviderError`. The caption lifecycle and the pipeline
 * wrap those in `PipelineError`, and the binary folds everything into
 * `AppError` at the edge.
 */

use thiserror::Error;

/// Errors that can occur when talking to a remote service
#[derive(Error, Debug)]
pub enum ProviderError {
    /// Error when making an API request fails
    #[error("API request failed: {0}")]
    RequestFailed(String),

    /// Error when parsing an API response fails
    #[error("Failed to parse API response: {0}")]
    ParseError(String),

    /// Error returned by the API itself
    #[error("API responded with error: {status_code} - {message}")]
    ApiError {
        /// HTTP status code
        status_code: u16,
        /// Error message from the API
        message: String,
    },

    /// Error establishing or maintaining a connection
    #[error("Connection error: {0}")]
    ConnectionError(String),

    /// Error related to rate limiting or quota
    #[error("Rate limit exceeded: {0}")]
    RateLimitExceeded(String),

    /// Error with authentication or authorization
    #[error("Authentication error: {0}")]
    AuthenticationError(String),

    /// The requested resource does not exist
    #[error("Not found: {0}")]
    NotFound(String),
}

impl ProviderError {
    /// Map a non-success HTTP status and body to the matching variant.
    pub fn from_status(status_code: u16, message: impl Into<String>) -> Self {
        let message = message.into();
        match status_code {
            401 | 403 => Self::AuthenticationError(format!("HTTP {}: {}", status_code, message)),
            404 => Self::NotFound(message),
            429 => Self::RateLimitExceeded(message),
            _ => Self::ApiError { status_code, message },
        }
    }

    /// Retrying cannot succeed without new credentials.
    pub fn is_authorization(&self) -> bool {
        matches!(self, Self::AuthenticationError(_))
    }

    /// Network hiccups, throttling and 5xx responses.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::ConnectionError(_) | Self::RateLimitExceeded(_) | Self::RequestFailed(_) => true,
            Self::ApiError { status_code, .. } => *status_code >= 500,
            _ => false,
        }
    }
}

impl From<reqwest::Error> for ProviderError {
    fn from(error: reqwest::Error) -> Self {
        // Request URLs can carry keys and upload session ids
        let error = error.without_url();
        if error.is_connect() || error.is_timeout() {
            Self::ConnectionError(error.to_string())
        } else if error.is_decode() {
            Self::ParseError(error.to_string())
        } else if let Some(status) = error.status() {
            Self::from_status(status.as_u16(), error.to_string())
        } else {
            Self::RequestFailed(error.to_string())
        }
    }
}

/// Errors raised while running the caption lifecycle
#[derive(Error, Debug)]
pub enum PipelineError {
    /// A remote collaborator failed
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    /// The polling policy cannot make progress
    #[error("Invalid retry policy: {0}")]
    InvalidPolicy(String),

    /// The rewrite produced nothing usable
    #[error("Regeneration produced no valid cues")]
    EmptyRegeneration,
}

impl PipelineError {
    pub fn is_authorization(&self) -> bool {
        matches!(self, Self::Provider(e) if e.is_authorization())
    }
}

/// Main application error type that wraps all other errors
#[derive(Error, Debug)]
pub enum AppError {
    /// Error from a file operation
    #[error("File error: {0}")]
    File(String),

    /// Error from configuration loading or validation
    #[error("Config error: {0}")]
    Config(String),

    /// Error from a provider
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    /// Error from the pipeline
    #[error("Pipeline error: {0}")]
    Pipeline(#[from] PipelineError),

    /// Any other error
    #[error("Unknown error: {0}")]
    Unknown(String),
}

impl From<anyhow::Error> for AppError {
    fn from(error: anyhow::Error) -> Self {
        Self::Unknown(error.to_string())
    }
}

impl From<std::io::Error> for AppError {
    fn from(error: std::io::Error) -> Self {
        Self::File(error.to_string())
    }
}
