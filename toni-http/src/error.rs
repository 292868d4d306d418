//! Error types.
//!
//! Only the form read can fail. The query and cookie parsers are total: a
//! malformed segment is skipped (and logged at `debug`) instead of aborting
//! the whole parse.
//!
//! None of these conditions is retried. In particular a form read that was
//! cancelled or failed midway has already pulled bytes off a single-pass
//! body, so asking again yields [`FormError::AlreadyConsumed`] unless the
//! caller installed a fresh body.

/// Failure reading the request body as a form.
#[derive(Debug, thiserror::Error)]
pub enum FormError {
    /// `Content-Type` is neither urlencoded nor multipart form data. The
    /// body is left untouched.
    #[error("unsupported media type for form data: '{0}'")]
    UnsupportedMediaType(String),

    /// The request's cancellation signal fired before or during the read.
    #[error("form read was cancelled")]
    Cancelled,

    /// The body had already been read by someone else.
    #[error("request body has already been consumed")]
    AlreadyConsumed,

    #[error("form body exceeds the limit of {limit} bytes")]
    BodyTooLarge { limit: usize },

    #[error("uploaded file '{name}' exceeds the limit of {limit} bytes")]
    FileTooLarge { name: String, limit: usize },

    #[error("invalid multipart body: {0}")]
    InvalidMultipart(&'static str),

    #[error("failed to read request body: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to parse environment variable '{key}': {message}")]
    ParseError { key: String, message: String },

    #[error("Validation failed: {0}")]
    ValidationError(String),

    #[error("Failed to load .env file: {0}")]
    DotenvError(#[from] dotenv::Error),
}
