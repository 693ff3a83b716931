use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use tracing::debug;

use crate::AppState;

pub const LOGIN_PATH: &str = "/admin/login";

/// Admin pages other than the login page itself.
pub fn requires_admin(path: &str) -> bool {
    let path = path.trim_end_matches('/');
    (path == "/admin" || path.starts_with("/admin/")) && path != LOGIN_PATH
}

pub fn login_redirect_location(path: &str) -> String {
    format!("{}?redirect={}", LOGIN_PATH, urlencoding::encode(path))
}

pub async fn require_admin(
    State(app_state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    let path = request.uri().path();
    if requires_admin(path) && !app_state.admin.is_authenticated(request.headers()) {
        debug!("Redirecting unauthenticated request for {} to login", path);
        return Redirect::temporary(&login_redirect_location(path)).into_response();
    }

    next.run(request).await
}
