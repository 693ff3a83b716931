use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Response,
};
use tracing::{debug, error};

use super::views::{PostCard, PostDetail};
use crate::{
    AppState,
    cms::{PageWindow, PostFilter, query::distinct_years},
    listing::{FilterView, ListingParams, ListingQuery, Pagination},
    templating::{not_found_response, render_response},
};

const LOAD_FAILED: &str = "Failed to load posts";

/// Listings only show posts whose ids are in the selected-posts file.
async fn visible_filter(app_state: &AppState) -> Option<PostFilter> {
    match app_state.featured.load().await {
        Ok(ids) => Some(PostFilter::new().only_ids(ids)),
        Err(e) => {
            error!("Failed to read selected posts: {}", e);
            None
        }
    }
}

async fn unavailable(app_state: &AppState, template: &str, page_title: &str) -> Response {
    let globals = liquid::object!({
        "page_title": page_title,
        "error": LOAD_FAILED,
        "posts": Vec::<PostCard>::new(),
        "total": 0,
        "has_more": false,
        "has_filters": false,
    });
    render_response(
        &app_state.template_engine,
        template,
        globals,
        StatusCode::BAD_GATEWAY,
    )
    .await
}

pub async fn home_handler(State(app_state): State<AppState>) -> Response {
    let template = &app_state.config.blog.home_template;
    let Some(filter) = visible_filter(&app_state).await else {
        return unavailable(&app_state, template, "Home").await;
    };

    let count = app_state.config.blog.home_post_count;
    match app_state
        .content
        .fetch_posts(&filter, Some(PageWindow::new(0, count)))
        .await
    {
        Ok(page) => {
            let posts = PostCard::from_posts(&page.posts, &app_state.images);
            let globals = liquid::object!({
                "page_title": "Home",
                "posts": posts,
                "total": page.total,
                "has_more": page.total > count,
            });
            render_response(&app_state.template_engine, template, globals, StatusCode::OK).await
        }
        Err(e) => {
            error!("Failed to load latest posts: {}", e);
            unavailable(&app_state, template, "Home").await
        }
    }
}

pub async fn blog_index_handler(
    State(app_state): State<AppState>,
    Query(query): Query<ListingQuery>,
) -> Response {
    let template = &app_state.config.blog.index_template;
    let Some(visible) = visible_filter(&app_state).await else {
        return unavailable(&app_state, template, "Blog").await;
    };

    let params = ListingParams::parse(&query);
    let per_page = app_state.config.blog.posts_per_page;
    let filter = params.filter().only_ids(visible.ids.clone().unwrap_or_default());

    let content = &app_state.content;
    let (categories, dates, page) = tokio::join!(
        content.fetch_categories(),
        content.fetch_publish_dates(&visible),
        content.fetch_posts(&filter, Some(params.window(per_page))),
    );

    let (categories, dates, page) = match (categories, dates, page) {
        (Ok(categories), Ok(dates), Ok(page)) => (categories, dates, page),
        (categories, dates, page) => {
            for e in [categories.err(), dates.err(), page.err()].into_iter().flatten() {
                error!("Failed to load blog listing: {}", e);
            }
            return unavailable(&app_state, template, "Blog").await;
        }
    };

    let years = distinct_years(&dates);
    let pagination = Pagination::new(params.page, per_page, page.total);
    if pagination.is_out_of_range() && page.total > 0 {
        debug!("Page {} is past the last page {}", params.page, pagination.total_pages);
    }

    let posts = PostCard::from_posts(&page.posts, &app_state.images);
    let globals = liquid::object!({
        "page_title": "Blog",
        "posts": posts,
        "total": page.total,
        "pagination": pagination.view(&params, "/blog"),
        "filters": FilterView::build(&params, &categories, &years, "/blog"),
        "has_filters": params.has_filters(),
    });

    render_response(&app_state.template_engine, template, globals, StatusCode::OK).await
}

pub async fn post_detail_handler(
    State(app_state): State<AppState>,
    Path(slug): Path<String>,
) -> Response {
    let template = &app_state.config.blog.post_template;
    match app_state.content.fetch_post(&slug).await {
        Ok(Some(post)) => {
            let detail = PostDetail::from_post(&post, &app_state.images);
            let globals = liquid::object!({
                "page_title": post.title.clone(),
                "post": detail,
            });
            render_response(&app_state.template_engine, template, globals, StatusCode::OK).await
        }
        Ok(None) => {
            debug!("No post with slug {}", slug);
            not_found_response(&app_state.template_engine, "Post not found").await
        }
        Err(e) => {
            error!("Failed to load post {}: {}", slug, e);
            let globals = liquid::object!({
                "page_title": "Post",
                "error": LOAD_FAILED,
            });
            render_response(
                &app_state.template_engine,
                template,
                globals,
                StatusCode::BAD_GATEWAY,
            )
            .await
        }
    }
}

pub async fn category_handler(
    State(app_state): State<AppState>,
    Path(slug): Path<String>,
) -> Response {
    let template = &app_state.config.blog.category_template;
    let Some(visible) = visible_filter(&app_state).await else {
        return unavailable(&app_state, template, "Category").await;
    };
    let filter = visible.with_categories(vec![slug.clone()]);

    let content = &app_state.content;
    let (categories, page) = tokio::join!(
        content.fetch_categories(),
        content.fetch_posts(&filter, None),
    );

    let (categories, page) = match (categories, page) {
        (Ok(categories), Ok(page)) => (categories, page),
        (categories, page) => {
            for e in [categories.err(), page.err()].into_iter().flatten() {
                error!("Failed to load category {}: {}", slug, e);
            }
            return unavailable(&app_state, template, "Category").await;
        }
    };

    let category = categories
        .iter()
        .find(|category| category.slug.current == slug);
    let title = category
        .map(|category| category.title.clone())
        .unwrap_or_else(|| "Category".to_string());
    let description = category
        .and_then(|category| category.description.clone())
        .unwrap_or_default();

    let posts = PostCard::from_posts(&page.posts, &app_state.images);
    let globals = liquid::object!({
        "page_title": title.clone(),
        "category_title": title,
        "category_slug": slug,
        "category_description": description,
        "known_category": category.is_some(),
        "posts": posts,
        "total": page.total,
    });

    render_response(&app_state.template_engine, template, globals, StatusCode::OK).await
}
