pub mod error;
pub mod image;
pub mod memory;
pub mod query;
pub mod sanity;
pub mod types;

pub use error::*;
pub use image::ImageUrlBuilder;
pub use query::{PageWindow, PostFilter};
pub use types::*;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;

use crate::{CmsConfig, CmsProviderConfig};

#[async_trait]
pub trait ContentSource: Send + Sync {
    /// Posts matching `filter`, newest first, windowed when `window` is set.
    /// `total` always counts the whole filtered set.
    async fn fetch_posts(
        &self,
        filter: &PostFilter,
        window: Option<PageWindow>,
    ) -> Result<PostPage, CmsError>;

    /// A single post with its body and author bio.
    async fn fetch_post(&self, slug: &str) -> Result<Option<Post>, CmsError>;

    /// All categories ordered by title.
    async fn fetch_categories(&self) -> Result<Vec<Category>, CmsError>;

    async fn fetch_publish_dates(&self, filter: &PostFilter) -> Result<Vec<DateTime<Utc>>, CmsError>;

    fn name(&self) -> &str;
}

pub type DynContentSource = Arc<dyn ContentSource>;

pub async fn create_source(config: &CmsConfig) -> Result<DynContentSource, CmsError> {
    match &config.provider {
        CmsProviderConfig::Sanity(sanity_config) => Ok(Arc::new(sanity::SanityClient::new(
            &config.project_id,
            &config.dataset,
            sanity_config,
        )?)),
        CmsProviderConfig::File(file_config) => {
            Ok(Arc::new(memory::MemorySource::load(&file_config.path).await?))
        }
    }
}

pub fn image_urls(config: &CmsConfig) -> ImageUrlBuilder {
    ImageUrlBuilder::new(&config.cdn_base, &config.project_id, &config.dataset)
}
