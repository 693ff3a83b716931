use thiserror::Error;

#[derive(Debug, Error)]
pub enum CmsError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Query API returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Invalid endpoint: {0}")]
    InvalidEndpoint(#[from] url::ParseError),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}
