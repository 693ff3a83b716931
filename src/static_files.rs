use axum::{
    body::Body,
    http::{HeaderMap, StatusCode, header},
    response::{IntoResponse, Response},
};
use std::{
    path::{Component, Path, PathBuf},
    time::UNIX_EPOCH,
};
use tokio::fs::File;
use tokio_util::io::ReaderStream;
use tracing::{debug, error, warn};

#[derive(Clone)]
pub struct StaticFileHandler {
    pub static_dir: PathBuf,
}

/// Relative path below the static root, or `None` when the request tries
/// to leave it.
fn resolve(path: &str) -> Option<PathBuf> {
    let relative = Path::new(path.trim_start_matches('/'));
    let mut resolved = PathBuf::new();
    for component in relative.components() {
        match component {
            Component::Normal(part) => resolved.push(part),
            Component::CurDir => {}
            _ => return None,
        }
    }
    (!resolved.as_os_str().is_empty()).then_some(resolved)
}

fn cache_control_for(content_type: &str) -> &'static str {
    if content_type.starts_with("image/") || content_type.starts_with("font/") {
        "public, max-age=31536000"
    } else if content_type.starts_with("text/css")
        || content_type.starts_with("application/javascript")
        || content_type.starts_with("text/javascript")
    {
        "public, max-age=300, must-revalidate"
    } else {
        "public, max-age=3600"
    }
}

impl StaticFileHandler {
    pub fn new(static_dir: PathBuf) -> Self {
        Self { static_dir }
    }

    pub async fn serve(&self, path: &str, request_headers: &HeaderMap) -> Response {
        let Some(relative) = resolve(path) else {
            warn!("Path traversal attempt: {:?}", path);
            return (StatusCode::FORBIDDEN, "Forbidden").into_response();
        };
        let file_path = self.static_dir.join(relative);

        debug!("Attempting to serve static file: {:?}", file_path);

        let metadata = match tokio::fs::metadata(&file_path).await {
            Ok(m) if m.is_file() => m,
            Ok(_) => return (StatusCode::NOT_FOUND, "File not found").into_response(),
            Err(e) => {
                debug!("Failed to get metadata for {:?}: {}", file_path, e);
                return (StatusCode::NOT_FOUND, "File not found").into_response();
            }
        };

        let content_type = mime_guess::from_path(&file_path)
            .first_or_octet_stream()
            .to_string();
        let cache_control = cache_control_for(&content_type);

        let validators = metadata.modified().ok().and_then(|modified| {
            let duration = modified.duration_since(UNIX_EPOCH).ok()?;
            Some((
                httpdate::fmt_http_date(modified),
                format!("\"{}-{}\"", duration.as_secs(), metadata.len()),
            ))
        });

        if let Some((_, etag)) = &validators
            && request_headers
                .get(header::IF_NONE_MATCH)
                .and_then(|value| value.to_str().ok())
                .is_some_and(|value| value.split(',').any(|tag| tag.trim() == etag.as_str()))
        {
            return Response::builder()
                .status(StatusCode::NOT_MODIFIED)
                .header(header::ETAG, etag.as_str())
                .header(header::CACHE_CONTROL, cache_control)
                .body(Body::empty())
                .unwrap_or_else(|_| StatusCode::NOT_MODIFIED.into_response());
        }

        let file = match File::open(&file_path).await {
            Ok(file) => file,
            Err(e) => {
                debug!("Failed to open file {:?}: {}", file_path, e);
                return (StatusCode::NOT_FOUND, "File not found").into_response();
            }
        };

        let mut response = Response::builder()
            .status(StatusCode::OK)
            .header(header::CONTENT_TYPE, content_type)
            .header(header::CACHE_CONTROL, cache_control)
            .header(header::CONTENT_LENGTH, metadata.len());

        if let Some((last_modified, etag)) = validators {
            response = response
                .header(header::LAST_MODIFIED, last_modified)
                .header(header::ETAG, etag);
        }

        match response.body(Body::from_stream(ReaderStream::new(file))) {
            Ok(response) => response,
            Err(e) => {
                error!("Failed to build static response for {:?}: {}", file_path, e);
                StatusCode::INTERNAL_SERVER_ERROR.into_response()
            }
        }
    }
}
