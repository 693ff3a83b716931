use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use std::fmt;

/// Failures of the admin JSON API. Detail strings are logged, never sent.
#[derive(Debug)]
pub enum AdminError {
    InvalidPassword,
    MalformedRequest,
    Unauthorized,
    MissingPostId,
    InvalidPostId(String),
    ReadFailed(String),
    UpdateFailed(String),
    InternalError(String),
}

impl fmt::Display for AdminError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AdminError::InvalidPassword => write!(f, "Invalid password"),
            AdminError::MalformedRequest => write!(f, "Malformed request body"),
            AdminError::Unauthorized => write!(f, "Admin session required"),
            AdminError::MissingPostId => write!(f, "Post ID is required"),
            AdminError::InvalidPostId(id) => write!(f, "Invalid post ID: {:?}", id),
            AdminError::ReadFailed(e) => write!(f, "Failed to read selected posts: {}", e),
            AdminError::UpdateFailed(e) => write!(f, "Failed to update post: {}", e),
            AdminError::InternalError(e) => write!(f, "Internal error: {}", e),
        }
    }
}

impl std::error::Error for AdminError {}

impl IntoResponse for AdminError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AdminError::InvalidPassword => (StatusCode::UNAUTHORIZED, "Invalid password"),
            AdminError::MalformedRequest => (StatusCode::BAD_REQUEST, "Authentication failed"),
            AdminError::Unauthorized => (StatusCode::UNAUTHORIZED, "Unauthorized"),
            AdminError::MissingPostId => (StatusCode::BAD_REQUEST, "Post ID is required"),
            AdminError::InvalidPostId(_) => (StatusCode::BAD_REQUEST, "Invalid post ID"),
            AdminError::ReadFailed(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to read selected posts",
            ),
            AdminError::UpdateFailed(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "Failed to update post")
            }
            AdminError::InternalError(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
            }
        };

        (status, Json(serde_json::json!({ "error": message }))).into_response()
    }
}
