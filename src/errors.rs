use crate::response::Response;

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("URL has no http/https scheme: {0}")]
    MissingScheme(String),

    #[error("Body encoding failed: {0}")]
    Encoding(String),

    #[error("Exceeded {max} redirects")]
    TooManyRedirects {
        max: usize,
        /// Every hop completed before the cap was hit, earliest first.
        history: Vec<Response>,
    },

    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Request timed out")]
    Timeout,

    #[error("Hook aborted the request: {0}")]
    Hook(String),
}
