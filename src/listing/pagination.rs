use serde::Serialize;

use super::params::ListingParams;

const MAX_VISIBLE_PAGES: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageLink {
    Page(usize),
    Ellipsis,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    pub current_page: usize,
    pub per_page: usize,
    pub total_items: usize,
    pub total_pages: usize,
}

impl Pagination {
    pub fn new(current_page: usize, per_page: usize, total_items: usize) -> Self {
        let per_page = per_page.max(1);
        Self {
            current_page: current_page.max(1),
            per_page,
            total_items,
            total_pages: total_items.div_ceil(per_page),
        }
    }

    pub fn offset(&self) -> usize {
        (self.current_page - 1).saturating_mul(self.per_page)
    }

    pub fn has_prev(&self) -> bool {
        self.current_page > 1
    }

    pub fn has_next(&self) -> bool {
        self.current_page < self.total_pages
    }

    pub fn is_out_of_range(&self) -> bool {
        self.current_page > self.total_pages
    }

    /// 1-based inclusive range of the items shown on this page.
    pub fn showing_range(&self) -> Option<(usize, usize)> {
        if self.total_items == 0 || self.is_out_of_range() {
            return None;
        }
        let start = self.offset() + 1;
        let end = self
            .current_page
            .saturating_mul(self.per_page)
            .min(self.total_items);
        Some((start, end))
    }

    /// Page numbers to display: everything for short listings, otherwise the
    /// first and last page around a window of the current page's neighbours.
    pub fn page_numbers(&self) -> Vec<PageLink> {
        let total = self.total_pages;
        let current = self.current_page;

        if total <= MAX_VISIBLE_PAGES {
            return (1..=total).map(PageLink::Page).collect();
        }

        let mut pages = vec![PageLink::Page(1)];
        if current > 3 {
            pages.push(PageLink::Ellipsis);
        }

        let start = current.saturating_sub(1).max(2);
        let end = current.saturating_add(1).min(total - 1);
        for page in start..=end {
            pages.push(PageLink::Page(page));
        }

        if current.saturating_add(2) < total {
            pages.push(PageLink::Ellipsis);
        }
        pages.push(PageLink::Page(total));

        pages
    }

    pub fn view(&self, params: &ListingParams, base: &str) -> PaginationView {
        let url = |page: usize| params.with_page(page).url(base);
        let (start, end) = self.showing_range().unwrap_or((0, 0));

        PaginationView {
            current_page: self.current_page,
            total_pages: self.total_pages,
            total_items: self.total_items,
            per_page: self.per_page,
            visible: self.total_pages > 1,
            start,
            end,
            prev_url: self.has_prev().then(|| url(self.current_page - 1)),
            next_url: self.has_next().then(|| url(self.current_page + 1)),
            pages: self
                .page_numbers()
                .into_iter()
                .map(|link| match link {
                    PageLink::Page(number) => PageLinkView {
                        number: Some(number),
                        url: Some(url(number)),
                        active: number == self.current_page,
                        ellipsis: false,
                    },
                    PageLink::Ellipsis => PageLinkView {
                        number: None,
                        url: None,
                        active: false,
                        ellipsis: true,
                    },
                })
                .collect(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct PageLinkView {
    pub number: Option<usize>,
    pub url: Option<String>,
    pub active: bool,
    pub ellipsis: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct PaginationView {
    pub current_page: usize,
    pub total_pages: usize,
    pub total_items: usize,
    pub per_page: usize,
    pub visible: bool,
    pub start: usize,
    pub end: usize,
    pub prev_url: Option<String>,
    pub next_url: Option<String>,
    pub pages: Vec<PageLinkView>,
}
