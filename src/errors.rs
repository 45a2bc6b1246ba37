/*!
 * Error types for the doctran library.
 *
 * This module contains custom error types for different parts of the pipeline,
 * using the thiserror crate for ergonomic error definitions.
 */

use thiserror::Error;

/// Errors that can occur when talking to an LLM provider API
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

    /// Error related to rate limiting
    #[error("Rate limit exceeded: {0}")]
    RateLimitExceeded(String),

    /// Error with authentication
    #[error("Authentication error: {0}")]
    AuthenticationError(String),

    /// The per-call timeout elapsed before a response arrived
    #[error("Request timed out after {0} seconds")]
    Timeout(u64),
}

impl ProviderError {
    /// Whether a retry attempt can reasonably succeed.
    ///
    /// Authentication failures and non-429 client errors are terminal;
    /// everything network-shaped is worth another attempt.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::AuthenticationError(_) => false,
            Self::ApiError { status_code, .. } => *status_code == 429 || *status_code >= 500,
            Self::RequestFailed(_)
            | Self::ParseError(_)
            | Self::ConnectionError(_)
            | Self::RateLimitExceeded(_)
            | Self::Timeout(_) => true,
        }
    }
}

/// Errors that can occur during chunk translation
#[derive(Error, Debug)]
pub enum TranslationError {
    /// Error from the provider API, after retries were exhausted
    #[error("Provider error after {attempts} attempts: {source}")]
    RetriesExhausted {
        /// Number of attempts made
        attempts: u32,
        /// Last provider error observed
        source: ProviderError,
    },

    /// The translation stage was canceled before this chunk was dispatched
    #[error("Translation canceled before dispatch")]
    Canceled,

    /// The provider returned a response the reassembly engine could not use
    #[error("Malformed translation response: {0}")]
    MalformedResponse(String),
}

/// Errors that can occur while exporting translated documents
#[derive(Error, Debug)]
pub enum ExportError {
    /// Error writing an artifact to disk
    #[error("Failed to write artifact {path}: {message}")]
    WriteFailed {
        /// Target path of the artifact
        path: String,
        /// Underlying I/O message
        message: String,
    },

    /// The requested export format is not supported for this document
    #[error("Unsupported export format: {0}")]
    UnsupportedFormat(String),
}

/// Main application error type that wraps all other errors
#[derive(Error, Debug)]
pub enum AppError {
    /// The source file is unreadable or its format is not supported
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// A required external converter or model backend is absent
    #[error("Missing dependency: {0}")]
    DependencyMissing(String),

    /// Error from a provider
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    /// Error from chunk translation
    #[error("Translation error: {0}")]
    Translation(#[from] TranslationError),

    /// Error from the export stage
    #[error("Export error: {0}")]
    Export(#[from] ExportError),

    /// A workflow operation was invoked out of state order
    #[error("Invalid workflow state: {0}")]
    InvalidState(String),

    /// Any other error
    #[error("Unknown error: {0}")]
    Unknown(String),
}

// Utility conversions so `?` works on std and anyhow errors
impl From<anyhow::Error> for AppError {
    fn from(error: anyhow::Error) -> Self {
        Self::Unknown(error.to_string())
    }
}

impl From<std::io::Error> for AppError {
    fn from(error: std::io::Error) -> Self {
        Self::InvalidInput(error.to_string())
    }
}
