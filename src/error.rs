//! Error types for LF View client operations

use thiserror::Error;

/// Main error type for client operations
#[derive(Error, Debug)]
pub enum ClientError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[cfg(feature = "http-client")]
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API request failed ({status}): {body}")]
    Api { status: u16, body: String },

    #[error("Invalid OMF format: {0}")]
    InvalidFormat(String),

    #[error("Unsupported OMF version: {0}")]
    UnsupportedVersion(String),

    #[error("Compression error: {0}")]
    Compression(String),

    #[error("Decompression error: {0}")]
    Decompression(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Missing required field: {0}")]
    MissingField(String),

    #[error("Unknown resource type: {0}")]
    UnknownResourceType(String),

    #[error("Unsupported resource: {0}")]
    UnsupportedResource(String),

    #[error("Resource not found in graph: {0}")]
    NotFound(String),

    #[error("Resource has not been uploaded: {0}")]
    NotUploaded(String),

    #[error("Unresolved pointer to local resource {0}")]
    UnresolvedPointer(uuid::Uuid),

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("Configuration error: {0}")]
    Configuration(String),
}

/// Specialized Result type for client operations
pub type Result<T> = std::result::Result<T, ClientError>;

impl From<serde_json::Error> for ClientError {
    fn from(err: serde_json::Error) -> Self {
        ClientError::Serialization(err.to_string())
    }
}

impl From<url::ParseError> for ClientError {
    fn from(err: url::ParseError) -> Self {
        ClientError::InvalidUrl(err.to_string())
    }
}
