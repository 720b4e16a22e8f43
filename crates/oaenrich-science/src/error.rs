use thiserror::Error;

#[derive(Debug, Error)]
pub enum ScienceError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error from {0}: {1}")]
    ApiError(String, String),

    #[error("parse error: {0}")]
    Parse(String),

    #[error("multiple matches found")]
    AmbiguousMatch,

    #[error("no match found")]
    NotFound,

    #[error("unsupported source: {0}")]
    UnsupportedSource(String),

    #[error("failed to fetch {0}: {1}")]
    FetchError(String, String),

    #[error("no embedded metadata found in {0}")]
    MetadataNotFound(String),

    #[error("no institutional email found")]
    NoEmailFound,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, ScienceError>;
