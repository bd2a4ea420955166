use thiserror::Error;

/// Errors produced by object-store backends.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Local filesystem failure.
    #[error("[Storage] io error: {0}")]
    Io(#[from] std::io::Error),

    /// HTTP transport failure.
    #[error("[Storage] transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// Non-successful response from the HTTP store.
    #[error("[Storage] HTTP {status} for {url}")]
    HttpStatus { status: u16, url: String },

    /// Key is empty, absolute, or escapes the bucket.
    #[error("[Storage] invalid object key: {0:?}")]
    InvalidKey(String),

    /// Backend misconfiguration (empty bucket, bad endpoint).
    #[error("[Storage] config error: {0}")]
    Config(String),
}
