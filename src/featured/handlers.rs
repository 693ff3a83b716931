use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
};
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

use super::error::FeaturedError;
use crate::{
    AppState,
    admin::{AdminError, AdminSession},
};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SelectedPostsResponse {
    pub selected_post_ids: Vec<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToggleRequest {
    #[serde(default)]
    pub post_id: Option<String>,
    #[serde(default)]
    pub featured: bool,
}

#[derive(Debug, Serialize)]
pub struct ToggleResponse {
    pub success: bool,
    pub featured: bool,
}

pub async fn selected_posts_handler(
    State(app_state): State<AppState>,
) -> Result<Json<SelectedPostsResponse>, AdminError> {
    let selected_post_ids = app_state.featured.load().await.map_err(|e| {
        error!("Failed to read {:?}: {}", app_state.featured.path(), e);
        AdminError::ReadFailed(e.to_string())
    })?;

    Ok(Json(SelectedPostsResponse { selected_post_ids }))
}

pub async fn toggle_featured_handler(
    State(app_state): State<AppState>,
    _session: AdminSession,
    payload: Result<Json<ToggleRequest>, JsonRejection>,
) -> Result<Json<ToggleResponse>, AdminError> {
    let Json(request) = payload.map_err(|e| {
        warn!("Rejected toggle request body: {}", e);
        AdminError::MissingPostId
    })?;

    let post_id = request
        .post_id
        .map(|id| id.trim().to_string())
        .filter(|id| !id.is_empty())
        .ok_or(AdminError::MissingPostId)?;

    match app_state.featured.set_featured(&post_id, request.featured).await {
        Ok(_) => {
            info!("Post {} visibility set to {}", post_id, request.featured);
            Ok(Json(ToggleResponse {
                success: true,
                featured: request.featured,
            }))
        }
        Err(FeaturedError::InvalidId(id)) => {
            warn!("Refused to store post id {:?}", id);
            Err(AdminError::InvalidPostId(id))
        }
        Err(e) => {
            error!("Failed to update selected posts: {}", e);
            Err(AdminError::UpdateFailed(e.to_string()))
        }
    }
}
