//! Post filters and the GROQ queries generated from them.
//!
//! User supplied values (category slugs, ids, the post slug) are always
//! bound as `$params`; only integers computed locally are spliced into the
//! query text.

use chrono::{DateTime, Datelike, Utc};
use serde_json::{Map, Value, json};

use super::types::Post;

const POST_PROJECTION: &str = r#"{
  _id,
  title,
  slug,
  publishedAt,
  excerpt,
  mainImage,
  author->{
    name,
    image
  },
  "categories": categories[]->{
    title,
    slug
  }
}"#;

const POST_DETAIL_PROJECTION: &str = r#"{
  _id,
  title,
  slug,
  publishedAt,
  excerpt,
  mainImage,
  body,
  author->{
    name,
    image,
    bio
  },
  "categories": categories[]->{
    title,
    slug
  }
}"#;

/// Conjunction of optional predicates applied to posts.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PostFilter {
    /// Matches posts in ANY of these category slugs. Empty means no constraint.
    pub categories: Vec<String>,
    pub year: Option<i32>,
    /// Allow-list of post ids. `None` means every post.
    pub ids: Option<Vec<String>>,
}

impl PostFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_categories(mut self, categories: Vec<String>) -> Self {
        self.categories = categories;
        self
    }

    pub fn in_year(mut self, year: Option<i32>) -> Self {
        self.year = year;
        self
    }

    pub fn only_ids(mut self, ids: Vec<String>) -> Self {
        self.ids = Some(ids);
        self
    }

    pub fn is_unconditioned(&self) -> bool {
        self.categories.is_empty() && self.year.is_none() && self.ids.is_none()
    }

    /// Native evaluation, kept in step with [`filter_expression`].
    pub fn matches(&self, post: &Post) -> bool {
        if !self.categories.is_empty() && !post.in_any_category(&self.categories) {
            return false;
        }

        if let Some(year) = self.year {
            match post.published_at {
                Some(date) if date.year() == year => {}
                _ => return false,
            }
        }

        if let Some(ids) = &self.ids
            && !ids.iter().any(|id| *id == post.id)
        {
            return false;
        }

        true
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageWindow {
    pub offset: usize,
    pub limit: usize,
}

impl PageWindow {
    pub fn new(offset: usize, limit: usize) -> Self {
        Self { offset, limit }
    }

    pub fn end(&self) -> usize {
        self.offset.saturating_add(self.limit)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct GroqQuery {
    pub query: String,
    pub params: Map<String, Value>,
}

/// Builds the `*[...]` filter body and its bound parameters.
pub fn filter_expression(filter: &PostFilter) -> (String, Map<String, Value>) {
    let mut conditions = vec![r#"_type == "post""#.to_string()];
    let mut params = Map::new();

    if !filter.categories.is_empty() {
        conditions.push("count((categories[]->slug.current)[@ in $categories]) > 0".to_string());
        params.insert("categories".to_string(), json!(filter.categories));
    }

    if let Some(year) = filter.year {
        params.insert("yearStart".to_string(), json!(year_start(year)));
        match year.checked_add(1) {
            Some(next) => {
                conditions
                    .push("publishedAt >= $yearStart && publishedAt < $yearEnd".to_string());
                params.insert("yearEnd".to_string(), json!(year_start(next)));
            }
            None => conditions.push("publishedAt >= $yearStart".to_string()),
        }
    }

    if let Some(ids) = &filter.ids {
        conditions.push("_id in $ids".to_string());
        params.insert("ids".to_string(), json!(ids));
    }

    (conditions.join(" && "), params)
}

fn year_start(year: i32) -> String {
    format!("{:04}-01-01T00:00:00Z", year)
}

/// Posts matching `filter`, newest first, together with the total count.
pub fn paginated_posts(filter: &PostFilter, window: Option<PageWindow>) -> GroqQuery {
    let (expression, params) = filter_expression(filter);
    let slice = window
        .map(|w| format!(" [{}...{}]", w.offset, w.end()))
        .unwrap_or_default();

    let query = format!(
        r#"{{
  "posts": *[{expression}] | order(publishedAt desc){slice} {POST_PROJECTION},
  "total": count(*[{expression}])
}}"#
    );

    GroqQuery { query, params }
}

pub fn post_by_slug(slug: &str) -> GroqQuery {
    let mut params = Map::new();
    params.insert("slug".to_string(), json!(slug));

    GroqQuery {
        query: format!(
            r#"*[_type == "post" && slug.current == $slug][0] {POST_DETAIL_PROJECTION}"#
        ),
        params,
    }
}

pub fn categories() -> GroqQuery {
    GroqQuery {
        query: r#"*[_type == "category"] | order(title asc) {
  _id,
  title,
  slug,
  description
}"#
        .to_string(),
        params: Map::new(),
    }
}

pub fn publish_dates(filter: &PostFilter) -> GroqQuery {
    let (expression, params) = filter_expression(filter);
    GroqQuery {
        query: format!("*[{expression}].publishedAt"),
        params,
    }
}

/// Distinct years, newest first.
pub fn distinct_years<'a>(dates: impl IntoIterator<Item = &'a DateTime<Utc>>) -> Vec<i32> {
    let mut years: Vec<i32> = dates.into_iter().map(|date| date.year()).collect();
    years.sort_unstable_by(|a, b| b.cmp(a));
    years.dedup();
    years
}
