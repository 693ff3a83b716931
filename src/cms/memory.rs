use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::{cmp::Ordering, path::Path};
use tracing::info;

use super::{
    ContentSource,
    error::CmsError,
    query::{PageWindow, PostFilter},
    types::{Category, Post, PostPage},
};

/// Content export in the same shape the query projections produce.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ContentExport {
    #[serde(default)]
    pub posts: Vec<Post>,
    #[serde(default)]
    pub categories: Vec<Category>,
}

/// Serves posts and categories held in memory, evaluating filters natively.
pub struct MemorySource {
    posts: Vec<Post>,
    categories: Vec<Category>,
}

impl MemorySource {
    pub fn new(mut posts: Vec<Post>, mut categories: Vec<Category>) -> Self {
        posts.sort_by(newest_first);
        categories.sort_by(|a, b| a.title.cmp(&b.title));
        Self { posts, categories }
    }

    pub async fn load(path: &Path) -> Result<Self, CmsError> {
        let contents = tokio::fs::read_to_string(path).await?;
        let export: ContentExport = serde_json::from_str(&contents)?;
        info!(
            "Loaded {} posts and {} categories from {:?}",
            export.posts.len(),
            export.categories.len(),
            path
        );
        Ok(Self::new(export.posts, export.categories))
    }
}

// Undated posts sort after dated ones, like `order(publishedAt desc)`.
fn newest_first(a: &Post, b: &Post) -> Ordering {
    match (a.published_at, b.published_at) {
        (Some(a), Some(b)) => b.cmp(&a),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

#[async_trait]
impl ContentSource for MemorySource {
    async fn fetch_posts(
        &self,
        filter: &PostFilter,
        window: Option<PageWindow>,
    ) -> Result<PostPage, CmsError> {
        let matching: Vec<&Post> = self.posts.iter().filter(|p| filter.matches(p)).collect();
        let total = matching.len();

        let posts = match window {
            Some(w) => matching
                .into_iter()
                .skip(w.offset)
                .take(w.limit)
                .map(strip_body)
                .collect(),
            None => matching.into_iter().map(strip_body).collect(),
        };

        Ok(PostPage { posts, total })
    }

    async fn fetch_post(&self, slug: &str) -> Result<Option<Post>, CmsError> {
        Ok(self.posts.iter().find(|p| p.slug.current == slug).cloned())
    }

    async fn fetch_categories(&self) -> Result<Vec<Category>, CmsError> {
        Ok(self.categories.clone())
    }

    async fn fetch_publish_dates(&self, filter: &PostFilter) -> Result<Vec<DateTime<Utc>>, CmsError> {
        Ok(self
            .posts
            .iter()
            .filter(|p| filter.matches(p))
            .filter_map(|p| p.published_at)
            .collect())
    }

    fn name(&self) -> &str {
        "In-memory content"
    }
}

// Listing projections never carry the body or the author bio.
fn strip_body(post: &Post) -> Post {
    let mut post = post.clone();
    post.body = None;
    if let Some(author) = post.author.as_mut() {
        author.bio = None;
    }
    post
}
