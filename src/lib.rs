use serde::{Deserialize, Serialize};
use std::path::PathBuf;

pub mod admin;
pub mod blog;
pub mod cms;
pub mod featured;
pub mod listing;
pub mod richtext;
pub mod startup_checks;
pub mod static_files;
pub mod templating;

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    pub server: ServerConfig,
    pub app: AppConfig,
    pub templates: TemplateConfig,
    pub static_files: StaticConfig,
    pub cms: CmsConfig,
    #[serde(default)]
    pub blog: BlogConfig,
    #[serde(default)]
    pub admin: AdminConfig,
    #[serde(default)]
    pub featured: FeaturedConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AppConfig {
    pub name: String,
    pub log_level: String,
    #[serde(default)]
    pub base_url: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TemplateConfig {
    pub directory: PathBuf,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StaticConfig {
    pub directory: PathBuf,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CmsConfig {
    pub project_id: String,
    #[serde(default = "default_dataset")]
    pub dataset: String,
    #[serde(default = "default_cdn_base")]
    pub cdn_base: String,
    #[serde(flatten)]
    pub provider: CmsProviderConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(tag = "provider", rename_all = "lowercase")]
pub enum CmsProviderConfig {
    Sanity(SanityConfig),
    File(FileSourceConfig),
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SanityConfig {
    #[serde(default = "default_api_version")]
    pub api_version: String,
    #[serde(default = "default_true")]
    pub use_cdn: bool,
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct FileSourceConfig {
    pub path: PathBuf,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct BlogConfig {
    pub posts_per_page: usize,
    pub home_post_count: usize,
    pub home_template: String,
    pub index_template: String,
    pub post_template: String,
    pub category_template: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AdminConfig {
    /// Overridden by the `ADMIN_PASSWORD` environment variable.
    pub password: Option<String>,
    pub cookie_mode: admin::CookieMode,
    pub secure_cookie: bool,
    pub session_days: u64,
    pub login_template: String,
    pub dashboard_template: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct FeaturedConfig {
    pub path: PathBuf,
}

fn default_dataset() -> String {
    "production".to_string()
}

fn default_cdn_base() -> String {
    cms::image::DEFAULT_CDN_BASE.to_string()
}

fn default_api_version() -> String {
    "2024-01-01".to_string()
}

fn default_true() -> bool {
    true
}

fn default_timeout_seconds() -> u64 {
    10
}

impl Default for SanityConfig {
    fn default() -> Self {
        Self {
            api_version: default_api_version(),
            use_cdn: true,
            token: None,
            timeout_seconds: default_timeout_seconds(),
        }
    }
}

impl Default for BlogConfig {
    fn default() -> Self {
        Self {
            posts_per_page: 12,
            home_post_count: 6,
            home_template: "modules/home.html.liquid".to_string(),
            index_template: "modules/blog_index.html.liquid".to_string(),
            post_template: "modules/post_detail.html.liquid".to_string(),
            category_template: "modules/category.html.liquid".to_string(),
        }
    }
}

impl Default for AdminConfig {
    fn default() -> Self {
        Self {
            password: None,
            cookie_mode: admin::CookieMode::Plain,
            secure_cookie: false,
            session_days: 7,
            login_template: "modules/admin_login.html.liquid".to_string(),
            dashboard_template: "modules/admin_dashboard.html.liquid".to_string(),
        }
    }
}

impl Default for FeaturedConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("data/selected-posts.ts"),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 3000,
            },
            app: AppConfig {
                name: "Inkpress".to_string(),
                log_level: "info".to_string(),
                base_url: None,
            },
            templates: TemplateConfig {
                directory: PathBuf::from("templates"),
            },
            static_files: StaticConfig {
                directory: PathBuf::from("static"),
            },
            cms: CmsConfig {
                project_id: String::new(),
                dataset: default_dataset(),
                cdn_base: default_cdn_base(),
                provider: CmsProviderConfig::Sanity(SanityConfig::default()),
            },
            blog: BlogConfig::default(),
            admin: AdminConfig::default(),
            featured: FeaturedConfig::default(),
        }
    }
}

impl Config {
    /// Secrets that may come from the environment instead of the file.
    pub fn apply_env_overrides(&mut self) {
        if let CmsProviderConfig::Sanity(sanity) = &mut self.cms.provider
            && let Ok(token) = std::env::var("SANITY_API_TOKEN")
            && !token.trim().is_empty()
        {
            sanity.token = Some(token);
        }
    }
}

use axum::{
    Router,
    extract::{Path, State},
    response::IntoResponse,
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

#[derive(Clone)]
pub struct AppState {
    pub template_engine: Arc<templating::TemplateEngine>,
    pub static_handler: static_files::StaticFileHandler,
    pub content: cms::DynContentSource,
    pub images: cms::ImageUrlBuilder,
    pub featured: featured::SharedFeaturedStore,
    pub admin: admin::AdminAuth,
    pub config: Config,
}

impl AppState {
    pub fn new(config: Config, content: cms::DynContentSource) -> Self {
        let site = liquid::object!({
            "name": config.app.name.clone(),
            "base_url": config.app.base_url.clone().unwrap_or_default(),
        });
        let template_engine = Arc::new(templating::TemplateEngine::new(
            config.templates.directory.clone(),
            site,
        ));

        let static_handler =
            static_files::StaticFileHandler::new(config.static_files.directory.clone());

        Self {
            template_engine,
            static_handler,
            content,
            images: cms::image_urls(&config.cms),
            featured: Arc::new(featured::FeaturedStore::new(config.featured.path.clone())),
            admin: admin::AdminAuth::from_config(&config.admin),
            config,
        }
    }
}

async fn static_file_handler(
    State(app_state): State<AppState>,
    Path(path): Path<String>,
    headers: axum::http::HeaderMap,
) -> impl IntoResponse {
    app_state.static_handler.serve(&path, &headers).await
}

pub async fn create_app(config: Config) -> Result<Router, cms::CmsError> {
    let content = cms::create_source(&config.cms).await?;
    tracing::info!("Content source: {}", content.name());
    Ok(create_router(AppState::new(config, content)))
}

pub fn create_router(app_state: AppState) -> Router {
    Router::new()
        .route("/", axum::routing::get(blog::home_handler))
        .route("/blog", axum::routing::get(blog::blog_index_handler))
        .route("/posts/{slug}", axum::routing::get(blog::post_detail_handler))
        .route("/category/{slug}", axum::routing::get(blog::category_handler))
        .route("/admin", axum::routing::get(admin::dashboard_handler))
        .route("/admin/login", axum::routing::get(admin::login_page_handler))
        .route(
            "/api/admin/auth",
            axum::routing::post(admin::authenticate_handler).delete(admin::logout_handler),
        )
        .route(
            "/api/admin/selected-posts",
            axum::routing::get(featured::selected_posts_handler),
        )
        .route(
            "/api/admin/toggle-featured",
            axum::routing::post(featured::toggle_featured_handler),
        )
        .route("/static/{*path}", axum::routing::get(static_file_handler))
        .route("/{*path}", axum::routing::get(templating::page_handler))
        .layer(axum::middleware::from_fn_with_state(
            app_state.clone(),
            admin::require_admin,
        ))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|request: &axum::http::Request<_>| {
                    let method = request.method();
                    let uri = request.uri();
                    let matched_path = request
                        .extensions()
                        .get::<axum::extract::MatchedPath>()
                        .map(|matched_path| matched_path.as_str());

                    tracing::info_span!(
                        "http_request",
                        method = %method,
                        uri = %uri,
                        matched_path,
                    )
                })
                .on_request(|request: &axum::http::Request<_>, _span: &tracing::Span| {
                    let headers = request.headers();
                    let user_agent = headers
                        .get("user-agent")
                        .and_then(|h| h.to_str().ok())
                        .unwrap_or("-");
                    let referer = headers
                        .get("referer")
                        .and_then(|h| h.to_str().ok())
                        .unwrap_or("-");

                    tracing::info!(
                        target: "access_log",
                        method = %request.method(),
                        path = %request.uri().path(),
                        query = ?request.uri().query(),
                        user_agent = %user_agent,
                        referer = %referer,
                        "request"
                    );
                })
                .on_response(
                    |response: &axum::http::Response<_>,
                     latency: std::time::Duration,
                     _span: &tracing::Span| {
                        let size = response
                            .headers()
                            .get("content-length")
                            .and_then(|h| h.to_str().ok())
                            .unwrap_or("-");

                        tracing::info!(
                            target: "access_log",
                            status = %response.status(),
                            size = %size,
                            latency_ms = %latency.as_millis(),
                            "response"
                        );
                    },
                ),
        )
        .with_state(app_state)
}
