/*!
 * Error types for the tmflow application.
 *
 * This module contains custom error types for the different layers of the
 * translation pipeline, using the thiserror crate for ergonomic error definitions.
 */

use thiserror::Error;

/// Errors that can occur when talking to a machine-translation backend
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

    /// The backend did not answer within the configured bound
    #[error("Request timed out after {0} seconds")]
    Timeout(u64),

    /// The response decoded, but into none of the shapes this backend is known to produce
    #[error("Unrecognized response shape: {0}")]
    UnrecognizedResponseShape(String),

    /// The backend answered with a different number of items than it was sent
    #[error("Response length mismatch: expected {expected} items, got {actual}")]
    LengthMismatch {
        /// Number of source strings sent
        expected: usize,
        /// Number of translations received
        actual: usize,
    },

    /// Error with authentication
    #[error("Authentication error: {0}")]
    AuthenticationError(String),
}

impl ProviderError {
    /// Map a reqwest transport error onto the provider error space
    pub fn from_transport(error: reqwest::Error) -> Self {
        if error.is_timeout() {
            Self::ConnectionError(format!("request timed out: {}", error))
        } else if error.is_connect() {
            Self::ConnectionError(error.to_string())
        } else if error.is_decode() {
            Self::ParseError(error.to_string())
        } else {
            Self::RequestFailed(error.to_string())
        }
    }
}

/// Errors raised by a translation memory store
#[derive(Error, Debug)]
pub enum CacheError {
    /// The store could not be reached or rejected the operation
    #[error("Translation memory unavailable: {0}")]
    Unavailable(String),
}

impl From<anyhow::Error> for CacheError {
    fn from(error: anyhow::Error) -> Self {
        Self::Unavailable(format!("{:#}", error))
    }
}

/// Reasons a whole batch comes back untranslated
#[derive(Error, Debug)]
pub enum TranslationError {
    /// The target language has no entry in the backend language map
    #[error("Unsupported target language: {0}")]
    UnsupportedLanguage(String),

    /// More items than the configured batch cap
    #[error("Batch of {size} items exceeds the maximum of {max}")]
    BatchTooLarge {
        /// Items in the rejected batch
        size: usize,
        /// Configured maximum
        max: usize,
    },

    /// Error from the backend
    #[error("Backend error: {0}")]
    Backend(#[from] ProviderError),
}

/// Errors that can occur while reading or writing a bilingual document
#[derive(Error, Debug)]
pub enum DocumentError {
    /// The document is not a recognizable XLIFF file
    #[error("Invalid XLIFF document: {0}")]
    InvalidDocument(String),

    /// A translation unit could not be interpreted
    #[error("Malformed translation unit at byte {offset}: {reason}")]
    MalformedUnit {
        /// Byte offset of the unit in the source file
        offset: usize,
        /// Description of the problem
        reason: String,
    },
}

/// Main application error type that wraps all other errors
#[derive(Error, Debug)]
pub enum AppError {
    /// Error from a file operation
    #[error("File error: {0}")]
    File(String),

    /// Error from a provider
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    /// Error from the translation memory
    #[error("Cache error: {0}")]
    Cache(#[from] CacheError),

    /// Error from document handling
    #[error("Document error: {0}")]
    Document(#[from] DocumentError),

    /// Error from translation
    #[error("Translation error: {0}")]
    Translation(#[from] TranslationError),

    /// Any other error
    #[error("Unknown error: {0}")]
    Unknown(String),
}

// Utility functions for error conversion
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
