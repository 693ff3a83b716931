use crate::AppState;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{Html, IntoResponse, Response},
};
use chrono::{Datelike, Utc};
use std::{collections::HashMap, path::PathBuf, sync::Arc, time::SystemTime};
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::{debug, error, info, warn};

type Partials = liquid::partials::EagerCompiler<liquid::partials::InMemorySource>;

const PARTIALS_DIR: &str = "partials";
pub const NOT_FOUND_TEMPLATE: &str = "pages/404.html.liquid";

#[derive(Debug, Error)]
pub enum TemplateError {
    #[error("Template not found: {0}")]
    NotFound(String),

    #[error("Failed to read template {0}: {1}")]
    Io(String, std::io::Error),

    #[error("Failed to parse template: {0}")]
    Parse(String),

    #[error("Failed to render template: {0}")]
    Render(String),
}

pub struct TemplateEngine {
    template_dir: PathBuf,
    site: liquid::Object,
    cache: Arc<RwLock<HashMap<String, CachedTemplate>>>,
}

struct CachedTemplate {
    content: String,
    modified: SystemTime,
}

/// Maps a request path to its free-standing page template. Hidden
/// segments and parent references are refused.
pub fn page_template_name(path: &str) -> Option<String> {
    let path = path.trim_matches('/');
    if path.is_empty() {
        return None;
    }
    let acceptable = path.split('/').all(|segment| {
        !segment.is_empty()
            && !segment.starts_with('.')
            && !segment.starts_with('_')
            && !segment.contains('\\')
    });
    acceptable.then(|| format!("pages/{}.html.liquid", path))
}

// "security-audits" -> "Security Audits"
fn page_title_from_path(page: &str) -> String {
    page.rsplit('/')
        .next()
        .unwrap_or(page)
        .split(['-', '_'])
        .filter(|word| !word.is_empty())
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

impl TemplateEngine {
    pub fn new(template_dir: PathBuf, site: liquid::Object) -> Self {
        Self {
            template_dir,
            site,
            cache: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    pub fn template_dir(&self) -> &std::path::Path {
        &self.template_dir
    }

    async fn load_template(&self, path: &str) -> Result<String, TemplateError> {
        let template_path = self.template_dir.join(path);

        let metadata = match tokio::fs::metadata(&template_path).await {
            Ok(metadata) => metadata,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(TemplateError::NotFound(path.to_string()));
            }
            Err(e) => return Err(TemplateError::Io(path.to_string(), e)),
        };
        if !metadata.is_file() {
            return Err(TemplateError::NotFound(path.to_string()));
        }

        let modified = metadata
            .modified()
            .map_err(|e| TemplateError::Io(path.to_string(), e))?;

        let mut cache = self.cache.write().await;

        if let Some(cached) = cache.get(path)
            && cached.modified >= modified
        {
            debug!("Using cached template for {}", path);
            return Ok(cached.content.clone());
        }

        info!("Loading template: {}", path);

        let content = tokio::fs::read_to_string(&template_path)
            .await
            .map_err(|e| TemplateError::Io(path.to_string(), e))?;

        cache.insert(
            path.to_string(),
            CachedTemplate {
                content: content.clone(),
                modified,
            },
        );

        Ok(content)
    }

    /// Every `partials/*.liquid` file, included by its stem
    /// (`{% include "_post_card" %}`).
    async fn load_partials(&self) -> Partials {
        let mut partials = Partials::empty();
        let dir = self.template_dir.join(PARTIALS_DIR);

        let mut entries = match tokio::fs::read_dir(&dir).await {
            Ok(entries) => entries,
            Err(e) => {
                debug!("No partials directory {:?}: {}", dir, e);
                return partials;
            }
        };

        while let Ok(Some(entry)) = entries.next_entry().await {
            let file_name = entry.file_name();
            let Some(file_name) = file_name.to_str() else {
                continue;
            };
            let Some(stem) = file_name.strip_suffix(".html.liquid") else {
                continue;
            };
            match self.load_template(&format!("{}/{}", PARTIALS_DIR, file_name)).await {
                Ok(content) => {
                    partials.add(stem.to_string(), content);
                }
                Err(e) => error!("Failed to load partial {}: {}", file_name, e),
            }
        }

        partials
    }

    async fn render_source(
        &self,
        content: &str,
        globals: &liquid::Object,
    ) -> Result<String, TemplateError> {
        let parser = liquid::ParserBuilder::with_stdlib()
            .partials(self.load_partials().await)
            .build()
            .map_err(|e| TemplateError::Parse(e.to_string()))?;

        let template = parser
            .parse(content)
            .map_err(|e| TemplateError::Parse(e.to_string()))?;

        template
            .render(globals)
            .map_err(|e| TemplateError::Render(e.to_string()))
    }

    async fn render_shell(&self, name: &str, globals: &liquid::Object) -> String {
        match self.load_template(name).await {
            Ok(content) => self.render_source(&content, globals).await.unwrap_or_else(|e| {
                error!("Failed to render {}: {}", name, e);
                String::new()
            }),
            Err(e) => {
                warn!("Failed to load {}: {}", name, e);
                String::new()
            }
        }
    }

    /// Renders `template_name` with `site`, `current_year`, and the
    /// rendered `header` and `footer` added to `globals`.
    pub async fn render_template(
        &self,
        template_name: &str,
        globals: liquid::Object,
    ) -> Result<String, TemplateError> {
        let template_content = self.load_template(template_name).await?;

        let mut full_globals = globals;
        full_globals.insert(
            "site".into(),
            liquid::model::Value::Object(self.site.clone()),
        );
        if !full_globals.contains_key("current_year") {
            full_globals.insert(
                "current_year".into(),
                liquid::model::Value::scalar(i64::from(Utc::now().year())),
            );
        }

        let header = self.render_shell("_header.html.liquid", &full_globals).await;
        let footer = self.render_shell("_footer.html.liquid", &full_globals).await;
        full_globals.insert("header".into(), liquid::model::Value::scalar(header));
        full_globals.insert("footer".into(), liquid::model::Value::scalar(footer));

        self.render_source(&template_content, &full_globals).await
    }

    pub async fn render_page(&self, path: &str) -> Result<String, TemplateError> {
        let template_name =
            page_template_name(path).ok_or_else(|| TemplateError::NotFound(path.to_string()))?;
        let page = path.trim_matches('/').to_string();
        let page_title = page_title_from_path(&page);
        self.render_template(
            &template_name,
            liquid::object!({ "page": page, "page_title": page_title }),
        )
        .await
    }
}

/// Wraps a rendered template into an HTML response, logging failures.
pub fn html_response(result: Result<String, TemplateError>, status: StatusCode) -> Response {
    match result {
        Ok(html) => (status, Html(html)).into_response(),
        Err(e) => {
            error!("Template rendering error: {}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, "Template error").into_response()
        }
    }
}

pub async fn render_response(
    engine: &TemplateEngine,
    template_name: &str,
    globals: liquid::Object,
    status: StatusCode,
) -> Response {
    html_response(engine.render_template(template_name, globals).await, status)
}

pub async fn not_found_response(engine: &TemplateEngine, message: &str) -> Response {
    let globals = liquid::object!({
        "page_title": "Not Found",
        "message": message,
    });
    match engine.render_template(NOT_FOUND_TEMPLATE, globals).await {
        Ok(html) => (StatusCode::NOT_FOUND, Html(html)).into_response(),
        Err(e) => {
            debug!("No usable 404 template: {}", e);
            (StatusCode::NOT_FOUND, message.to_string()).into_response()
        }
    }
}

pub async fn page_handler(
    State(app_state): State<AppState>,
    Path(path): Path<String>,
) -> Response {
    let engine = &app_state.template_engine;
    match engine.render_page(&path).await {
        Ok(html) => Html(html).into_response(),
        Err(TemplateError::NotFound(name)) => {
            debug!("No page template for {}", name);
            not_found_response(engine, "Page not found").await
        }
        Err(e) => html_response(Err(e), StatusCode::OK),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn engine_with(files: &[(&str, &str)]) -> (TempDir, TemplateEngine) {
        let temp_dir = TempDir::new().unwrap();
        for (name, content) in files {
            let path = temp_dir.path().join(name);
            fs::create_dir_all(path.parent().unwrap()).unwrap();
            fs::write(path, content).unwrap();
        }
        let engine = TemplateEngine::new(
            temp_dir.path().to_path_buf(),
            liquid::object!({ "name": "Test Blog", "base_url": "" }),
        );
        (temp_dir, engine)
    }

    #[test]
    fn test_page_template_name() {
        assert_eq!(page_template_name("/audits").as_deref(), Some("pages/audits.html.liquid"));
        assert_eq!(page_template_name("about/team/").as_deref(), Some("pages/about/team.html.liquid"));
        assert_eq!(page_template_name("/"), None);
        assert_eq!(page_template_name("../secrets"), None);
        assert_eq!(page_template_name("a/../../b"), None);
        assert_eq!(page_template_name("_header"), None);
        assert_eq!(page_template_name("a//b"), None);
    }

    #[test]
    fn test_page_title_from_path() {
        assert_eq!(page_title_from_path("audits"), "Audits");
        assert_eq!(page_title_from_path("about/security-audits"), "Security Audits");
    }

    #[tokio::test]
    async fn test_render_with_header_footer_and_site() {
        let (_dir, engine) = engine_with(&[
            ("_header.html.liquid", "<h1>{{ site.name }}: {{ page_title }}</h1>"),
            ("_footer.html.liquid", "<footer>{{ current_year }}</footer>"),
            ("page.html.liquid", "{{ header }}|{{ body }}|{{ footer }}"),
        ]);

        let html = engine
            .render_template(
                "page.html.liquid",
                liquid::object!({ "page_title": "Hi", "body": "content", "current_year": 1999 }),
            )
            .await
            .unwrap();

        assert_eq!(html, "<h1>Test Blog: Hi</h1>|content|<footer>1999</footer>");
    }

    #[tokio::test]
    async fn test_partials_share_scope() {
        let (_dir, engine) = engine_with(&[
            ("partials/_item.html.liquid", "[{{ item }}]"),
            (
                "list.html.liquid",
                "{% for item in items %}{% include \"_item\" %}{% endfor %}",
            ),
        ]);

        let html = engine
            .render_template("list.html.liquid", liquid::object!({ "items": vec!["a", "b"] }))
            .await
            .unwrap();

        assert_eq!(html, "[a][b]");
    }

    #[tokio::test]
    async fn test_missing_template_is_not_found() {
        let (_dir, engine) = engine_with(&[]);
        assert!(matches!(
            engine.render_template("nope.html.liquid", liquid::Object::new()).await,
            Err(TemplateError::NotFound(_))
        ));
        assert!(matches!(
            engine.render_page("../etc/passwd").await,
            Err(TemplateError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_cache_picks_up_changes() {
        let (dir, engine) = engine_with(&[("t.html.liquid", "one")]);
        assert_eq!(
            engine.render_template("t.html.liquid", liquid::Object::new()).await.unwrap(),
            "one"
        );

        let path = dir.path().join("t.html.liquid");
        fs::write(&path, "two").unwrap();
        let later = SystemTime::now() + std::time::Duration::from_secs(5);
        fs::File::options()
            .write(true)
            .open(&path)
            .unwrap()
            .set_modified(later)
            .unwrap();

        assert_eq!(
            engine.render_template("t.html.liquid", liquid::Object::new()).await.unwrap(),
            "two"
        );
    }
}
