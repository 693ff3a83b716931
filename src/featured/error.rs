use thiserror::Error;

#[derive(Debug, Error)]
pub enum FeaturedError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Selected posts file has no selectedPostIds array")]
    Malformed,

    #[error("Invalid post id: {0:?}")]
    InvalidId(String),
}
