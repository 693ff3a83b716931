use axum::{
    Json,
    extract::{Query, State, rejection::JsonRejection},
    http::{HeaderMap, StatusCode, header::SET_COOKIE},
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

use super::{auth::safe_redirect, error::AdminError};
use crate::{
    AppState,
    blog::views::{PostCard, format_short_date},
    cms::PostFilter,
    templating::render_response,
};

#[derive(Deserialize)]
pub struct AuthRequest {
    pub password: String,
}

#[derive(Serialize)]
pub struct AuthResponse {
    pub success: bool,
}

#[derive(Deserialize)]
pub struct LoginQuery {
    pub redirect: Option<String>,
}

fn with_cookie(cookie: &str) -> Result<HeaderMap, AdminError> {
    let mut headers = HeaderMap::new();
    let value = cookie
        .parse()
        .map_err(|e| AdminError::InternalError(format!("Invalid cookie header: {}", e)))?;
    headers.insert(SET_COOKIE, value);
    Ok(headers)
}

pub async fn authenticate_handler(
    State(app_state): State<AppState>,
    payload: Result<Json<AuthRequest>, JsonRejection>,
) -> Result<impl IntoResponse, AdminError> {
    let Json(payload) = payload.map_err(|e| {
        warn!("Malformed authentication request: {}", e);
        AdminError::MalformedRequest
    })?;

    if !app_state.admin.check_password(&payload.password) {
        warn!("Admin authentication failed - invalid password");
        return Err(AdminError::InvalidPassword);
    }

    let cookie = app_state.admin.session_cookie().map_err(|e| {
        error!("Failed to create session cookie: {}", e);
        AdminError::InternalError(e)
    })?;

    info!("Admin authentication successful");
    Ok((with_cookie(&cookie)?, Json(AuthResponse { success: true })))
}

pub async fn logout_handler(
    State(app_state): State<AppState>,
) -> Result<impl IntoResponse, AdminError> {
    info!("Admin session cleared");
    Ok((
        with_cookie(&app_state.admin.clear_cookie())?,
        Json(AuthResponse { success: true }),
    ))
}

pub async fn login_page_handler(
    State(app_state): State<AppState>,
    Query(query): Query<LoginQuery>,
) -> Response {
    let globals = liquid::object!({
        "page_title": "Admin Login",
        "redirect": safe_redirect(query.redirect.as_deref()),
    });
    render_response(
        &app_state.template_engine,
        &app_state.config.admin.login_template,
        globals,
        StatusCode::OK,
    )
    .await
}

/// One row of the visibility dashboard.
#[derive(Debug, Serialize)]
pub struct AdminPostRow {
    #[serde(flatten)]
    pub card: PostCard,
    pub date_short: Option<String>,
    pub featured: bool,
}

pub async fn dashboard_handler(State(app_state): State<AppState>) -> Response {
    let template = &app_state.config.admin.dashboard_template;

    let all = PostFilter::new();
    let (posts, selected) = tokio::join!(
        app_state.content.fetch_posts(&all, None),
        app_state.featured.load(),
    );

    let (page, selected) = match (posts, selected) {
        (Ok(page), Ok(selected)) => (page, selected),
        (posts, selected) => {
            if let Err(e) = posts {
                error!("Failed to load posts for admin: {}", e);
            }
            if let Err(e) = selected {
                error!("Failed to read selected posts: {}", e);
            }
            let globals = liquid::object!({
                "page_title": "Admin",
                "error": "Failed to load posts",
                "posts": Vec::<AdminPostRow>::new(),
                "total": 0,
                "visible_count": 0,
            });
            return render_response(
                &app_state.template_engine,
                template,
                globals,
                StatusCode::BAD_GATEWAY,
            )
            .await;
        }
    };

    let rows: Vec<AdminPostRow> = page
        .posts
        .iter()
        .map(|post| AdminPostRow {
            card: PostCard::from_post(post, &app_state.images),
            date_short: post.published_at.as_ref().map(format_short_date),
            featured: selected.iter().any(|id| *id == post.id),
        })
        .collect();
    let visible_count = rows.iter().filter(|row| row.featured).count();

    let globals = liquid::object!({
        "page_title": "Admin",
        "posts": rows,
        "total": page.total,
        "visible_count": visible_count,
    });
    render_response(&app_state.template_engine, template, globals, StatusCode::OK).await
}
