pub mod pagination;
pub mod params;

pub use pagination::{PageLink, Pagination, PaginationView};
pub use params::{ListingParams, ListingQuery};

use serde::Serialize;

use crate::cms::Category;

#[derive(Debug, Clone, Serialize)]
pub struct CategoryOption {
    pub title: String,
    pub slug: String,
    pub selected: bool,
    pub url: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct YearOption {
    pub year: i32,
    pub selected: bool,
    pub url: String,
}

/// Sidebar filter state for a listing page.
#[derive(Debug, Clone, Serialize)]
pub struct FilterView {
    pub categories: Vec<CategoryOption>,
    pub all_categories_url: String,
    pub no_category_selected: bool,
    pub years: Vec<YearOption>,
    pub all_years_url: String,
    pub selected_year: Option<i32>,
    pub has_filters: bool,
}

impl FilterView {
    pub fn build(params: &ListingParams, categories: &[Category], years: &[i32], base: &str) -> Self {
        Self {
            categories: categories
                .iter()
                .map(|category| CategoryOption {
                    title: category.title.clone(),
                    slug: category.slug.current.clone(),
                    selected: params.is_selected(&category.slug.current),
                    url: params.toggle_category(&category.slug.current).url(base),
                })
                .collect(),
            all_categories_url: params.without_categories().url(base),
            no_category_selected: params.categories.is_empty(),
            years: years
                .iter()
                .map(|&year| YearOption {
                    year,
                    selected: params.year == Some(year),
                    url: params.with_year(Some(year)).url(base),
                })
                .collect(),
            all_years_url: params.with_year(None).url(base),
            selected_year: params.year,
            has_filters: params.has_filters(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cms::Slug;

    fn category(slug: &str) -> Category {
        Category {
            id: format!("cat-{}", slug),
            title: slug.to_uppercase(),
            slug: Slug::new(slug),
            description: None,
        }
    }

    #[test]
    fn test_filter_view_links() {
        let params = ListingParams {
            categories: vec!["rust".to_string()],
            year: Some(2024),
            page: 3,
        };
        let view = FilterView::build(
            &params,
            &[category("defi"), category("rust")],
            &[2024, 2023],
            "/blog",
        );

        assert!(!view.categories[0].selected);
        assert_eq!(view.categories[0].url, "/blog?categories=rust%2Cdefi&year=2024");
        assert!(view.categories[1].selected);
        assert_eq!(view.categories[1].url, "/blog?year=2024");
        assert_eq!(view.all_categories_url, "/blog?year=2024");

        assert!(view.years[0].selected);
        assert_eq!(view.years[1].url, "/blog?categories=rust&year=2023");
        assert_eq!(view.all_years_url, "/blog?categories=rust");
        assert!(view.has_filters);
    }
}
