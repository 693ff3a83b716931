use super::types::ImageRef;

pub const DEFAULT_CDN_BASE: &str = "https://cdn.sanity.io";

/// Resolves image asset references (`image-<id>-<w>x<h>-<ext>`) to CDN URLs.
#[derive(Debug, Clone)]
pub struct ImageUrlBuilder {
    cdn_base: String,
    project_id: String,
    dataset: String,
}

impl ImageUrlBuilder {
    pub fn new(
        cdn_base: impl Into<String>,
        project_id: impl Into<String>,
        dataset: impl Into<String>,
    ) -> Self {
        Self {
            cdn_base: cdn_base.into().trim_end_matches('/').to_string(),
            project_id: project_id.into(),
            dataset: dataset.into(),
        }
    }

    pub fn url(&self, image: &ImageRef, width: Option<u32>, height: Option<u32>) -> Option<String> {
        let reference = image.asset_ref()?;
        let file_name = asset_file_name(reference)?;

        let mut url = format!(
            "{}/images/{}/{}/{}",
            self.cdn_base, self.project_id, self.dataset, file_name
        );

        let mut hints = Vec::new();
        if let Some(w) = width {
            hints.push(format!("w={}", w));
        }
        if let Some(h) = height {
            hints.push(format!("h={}", h));
            if width.is_some() {
                hints.push("fit=crop".to_string());
            }
        }
        if !hints.is_empty() {
            url.push('?');
            url.push_str(&hints.join("&"));
        }

        Some(url)
    }
}

/// `image-abc123-800x600-jpg` -> `abc123-800x600.jpg`
fn asset_file_name(reference: &str) -> Option<String> {
    let rest = reference.strip_prefix("image-")?;
    let (rest, extension) = rest.rsplit_once('-')?;
    let (id, dimensions) = rest.rsplit_once('-')?;

    let (w, h) = dimensions.split_once('x')?;
    if id.is_empty()
        || extension.is_empty()
        || w.parse::<u32>().is_err()
        || h.parse::<u32>().is_err()
    {
        return None;
    }

    Some(format!("{}-{}.{}", id, dimensions, extension))
}
