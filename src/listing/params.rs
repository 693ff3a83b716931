use serde::Deserialize;
use url::form_urlencoded;

use crate::cms::{PageWindow, PostFilter};

/// Years accepted from the query string; anything else is ignored.
const YEAR_RANGE: std::ops::RangeInclusive<i32> = 1..=9999;

/// Larger page numbers are clamped; they are past the end of any listing.
const MAX_PAGE: usize = 1_000_000;

/// Raw listing query string. Everything is optional and parsed leniently.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListingQuery {
    pub categories: Option<String>,
    pub year: Option<String>,
    pub page: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListingParams {
    pub categories: Vec<String>,
    pub year: Option<i32>,
    /// 1-based page number.
    pub page: usize,
}

impl Default for ListingParams {
    fn default() -> Self {
        Self {
            categories: Vec::new(),
            year: None,
            page: 1,
        }
    }
}

impl ListingParams {
    pub fn parse(query: &ListingQuery) -> Self {
        let mut categories: Vec<String> = Vec::new();
        for slug in query.categories.as_deref().unwrap_or("").split(',') {
            let slug = slug.trim();
            if !slug.is_empty() && !categories.iter().any(|c| c == slug) {
                categories.push(slug.to_string());
            }
        }

        let year = query
            .year
            .as_deref()
            .and_then(|y| y.trim().parse::<i32>().ok())
            .filter(|y| YEAR_RANGE.contains(y));

        let page = query
            .page
            .as_deref()
            .and_then(|p| p.trim().parse::<usize>().ok())
            .filter(|p| *p >= 1)
            .map(|p| p.min(MAX_PAGE))
            .unwrap_or(1);

        Self {
            categories,
            year,
            page,
        }
    }

    pub fn has_filters(&self) -> bool {
        !self.categories.is_empty() || self.year.is_some()
    }

    pub fn filter(&self) -> PostFilter {
        PostFilter::new()
            .with_categories(self.categories.clone())
            .in_year(self.year)
    }

    pub fn window(&self, per_page: usize) -> PageWindow {
        let per_page = per_page.max(1);
        PageWindow::new((self.page - 1).saturating_mul(per_page), per_page)
    }

    pub fn is_selected(&self, slug: &str) -> bool {
        self.categories.iter().any(|c| c == slug)
    }

    pub fn with_page(&self, page: usize) -> Self {
        Self {
            page: page.max(1),
            ..self.clone()
        }
    }

    /// Adds or removes one category and goes back to the first page.
    pub fn toggle_category(&self, slug: &str) -> Self {
        let mut categories = self.categories.clone();
        if let Some(index) = categories.iter().position(|c| c == slug) {
            categories.remove(index);
        } else {
            categories.push(slug.to_string());
        }

        Self {
            categories,
            year: self.year,
            page: 1,
        }
    }

    pub fn without_categories(&self) -> Self {
        Self {
            categories: Vec::new(),
            year: self.year,
            page: 1,
        }
    }

    pub fn with_year(&self, year: Option<i32>) -> Self {
        Self {
            categories: self.categories.clone(),
            year,
            page: 1,
        }
    }

    /// `base` plus the query string; page 1 is left implicit.
    pub fn url(&self, base: &str) -> String {
        let mut serializer = form_urlencoded::Serializer::new(String::new());
        if !self.categories.is_empty() {
            serializer.append_pair("categories", &self.categories.join(","));
        }
        if let Some(year) = self.year {
            serializer.append_pair("year", &year.to_string());
        }
        if self.page > 1 {
            serializer.append_pair("page", &self.page.to_string());
        }

        let query = serializer.finish();
        if query.is_empty() {
            base.to_string()
        } else {
            format!("{}?{}", base, query)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn query(categories: Option<&str>, year: Option<&str>, page: Option<&str>) -> ListingQuery {
        ListingQuery {
            categories: categories.map(String::from),
            year: year.map(String::from),
            page: page.map(String::from),
        }
    }

    #[test]
    fn test_parse_defaults() {
        let params = ListingParams::parse(&ListingQuery::default());
        assert_eq!(params, ListingParams::default());
        assert!(!params.has_filters());
        assert!(params.filter().is_unconditioned());
    }

    #[test]
    fn test_parse_categories() {
        let params = ListingParams::parse(&query(Some("rust, defi,,rust"), None, None));
        assert_eq!(params.categories, vec!["rust", "defi"]);
        assert!(params.is_selected("defi"));
        assert!(!params.is_selected("go"));
    }

    #[test]
    fn test_parse_lenient_numbers() {
        for (raw, expected) in [("3", 3), ("0", 1), ("-2", 1), ("abc", 1), ("", 1)] {
            let params = ListingParams::parse(&query(None, None, Some(raw)));
            assert_eq!(params.page, expected, "page={}", raw);
        }

        assert_eq!(ListingParams::parse(&query(None, Some("2024"), None)).year, Some(2024));
        assert_eq!(ListingParams::parse(&query(None, Some("soon"), None)).year, None);
    }

    #[test]
    fn test_parse_out_of_range_year_is_ignored() {
        for raw in ["2147483647", "-2147483648", "0", "10000", "-5"] {
            let params = ListingParams::parse(&query(None, Some(raw), None));
            assert_eq!(params.year, None, "year={}", raw);
            assert!(!params.has_filters());
        }
        assert_eq!(ListingParams::parse(&query(None, Some("1"), None)).year, Some(1));
        assert_eq!(ListingParams::parse(&query(None, Some("9999"), None)).year, Some(9999));
    }

    #[test]
    fn test_huge_page_is_clamped() {
        let params = ListingParams::parse(&query(None, None, Some(&usize::MAX.to_string())));
        assert_eq!(params.page, MAX_PAGE);
        assert_eq!(params.window(12), PageWindow::new((MAX_PAGE - 1) * 12, 12));

        let window = ListingParams::default().with_page(usize::MAX).window(12);
        assert_eq!(window.offset, usize::MAX);
        assert_eq!(window.end(), usize::MAX);
    }

    #[test]
    fn test_window_matches_page_number() {
        let params = ListingParams::default();
        assert_eq!(params.window(12), PageWindow::new(0, 12));
        assert_eq!(params.with_page(2).window(12), PageWindow::new(12, 12));
        assert_eq!(params.with_page(5).window(12), PageWindow::new(48, 12));
    }

    #[test]
    fn test_urls() {
        let params = ListingParams::parse(&query(Some("rust,defi"), Some("2024"), Some("3")));
        assert_eq!(params.url("/blog"), "/blog?categories=rust%2Cdefi&year=2024&page=3");
        assert_eq!(params.with_page(1).url("/blog"), "/blog?categories=rust%2Cdefi&year=2024");
        assert_eq!(ListingParams::default().url("/blog"), "/blog");
    }

    #[test]
    fn test_filter_changes_reset_page() {
        let params = ListingParams::parse(&query(Some("rust"), Some("2024"), Some("4")));

        let added = params.toggle_category("defi");
        assert_eq!(added.categories, vec!["rust", "defi"]);
        assert_eq!(added.page, 1);
        assert_eq!(added.year, Some(2024));

        let removed = params.toggle_category("rust");
        assert!(removed.categories.is_empty());
        assert_eq!(removed.url("/blog"), "/blog?year=2024");

        assert_eq!(params.without_categories().url("/blog"), "/blog?year=2024");
        assert_eq!(params.with_year(None).url("/blog"), "/blog?categories=rust");
    }
}
