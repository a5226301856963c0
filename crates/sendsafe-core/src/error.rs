//! Error types for the sendsafe-core library.

use thiserror::Error;

/// Main error type for the sendsafe library.
#[derive(Error, Debug)]
pub enum SendsafeError {
    /// Local validation failed before any network call was made.
    #[error("validation error: {0}")]
    Validation(#[from] ValidationError),

    /// The document backend failed or could not be reached.
    #[error("API error: {0}")]
    Api(#[from] ApiError),

    /// Markup parsing error.
    #[error("parse error: {0}")]
    Parse(#[from] ParseError),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON (de)serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),
}

/// Errors detected locally, before anything is dispatched.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// A batch was submitted without any file.
    #[error("select at least one file")]
    EmptyBatch,

    /// The batch holds more files than allowed.
    #[error("too many files: {count} selected, maximum is {max} per batch")]
    TooManyFiles { count: usize, max: usize },

    /// A single file is over the per-file ceiling.
    #[error("file {name} is too large: {size} bytes, maximum is {max} bytes")]
    FileTooLarge { name: String, size: u64, max: u64 },

    /// The batch as a whole is over the total size ceiling.
    #[error("total size {total} bytes exceeds the maximum of {max} bytes")]
    TotalSizeExceeded { total: u64, max: u64 },

    /// The file name does not carry the required extension.
    #[error("file {name} is not a .{expected} file")]
    WrongExtension { name: String, expected: String },

    /// Two line items share the same index.
    #[error("duplicate line item index: {0}")]
    DuplicateIndex(u32),

    /// No line item carries the given index.
    #[error("no line item with index {0}")]
    ItemNotFound(u32),

    /// Unknown line item field name.
    #[error("unknown line item field: {0}")]
    UnknownField(String),
}

/// Errors returned by the document backend or the transport.
#[derive(Error, Debug)]
pub enum ApiError {
    /// The backend rejected the credentials (HTTP 401).
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// Any other non-2xx response.
    #[error("backend returned {status}: {message}")]
    Status { status: u16, message: String },

    /// Connection, TLS or protocol failure.
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// The request did not complete in time.
    #[error("request timed out")]
    Timeout,

    /// The response body did not have the expected shape.
    #[error("unexpected response: {0}")]
    Decode(String),

    /// The configured base URL cannot be used.
    #[error("invalid URL: {0}")]
    InvalidUrl(String),
}

impl ApiError {
    /// HTTP status of the failure, when the backend answered at all.
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Unauthorized(_) => Some(401),
            ApiError::Status { status, .. } => Some(*status),
            ApiError::Transport(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}

/// Failure to turn text into an element tree.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    /// The markup reader reported an error.
    #[error("malformed markup at byte {position}: {message}")]
    Malformed { position: u64, message: String },

    /// An element was opened but never closed.
    #[error("unclosed element <{0}>")]
    Unclosed(String),

    /// The text holds no element at all.
    #[error("document has no root element")]
    NoRoot,
}

/// Result type for the sendsafe library.
pub type Result<T> = std::result::Result<T, SendsafeError>;
