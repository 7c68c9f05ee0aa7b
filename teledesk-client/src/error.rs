use reqwest::StatusCode;
use thiserror::Error;

/// Errors surfaced by the API client and propagated, unrecovered, by the
/// store. The store's only local handling is releasing its loading flags.
#[derive(Debug, Error)]
pub enum DirectoryError {
    /// Network unreachable, timeout, or a malformed response body.
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// The backend answered with a non-2xx status.
    #[error("server returned {status}: {message}")]
    Server { status: StatusCode, message: String },
}

pub type DirectoryResult<T> = Result<T, DirectoryError>;
