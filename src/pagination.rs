//! Paging for the list pages.

use maud::{Markup, html};

/// The config for pagination
#[derive(Debug, Clone)]
pub struct PaginationConfig {
    /// The page number to default to when not specified in a request.
    pub default_page: u64,
    /// The number of rows to display per page when not specified in a request.
    pub default_page_size: u64,
    /// The maximum number of pages to show in the pagination indicator.
    pub max_pages: u64,
}

impl Default for PaginationConfig {
    fn default() -> Self {
        Self {
            default_page: 1,
            default_page_size: 100,
            max_pages: 5,
        }
    }
}

/// The upper limit on a requested page size.
pub const MAX_PAGE_SIZE: u64 = 500;

/// A resolved page request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    /// The 1-based page number.
    pub number: u64,
    /// The number of rows per page.
    pub size: u64,
}

impl Page {
    /// Resolve the optional `page` and `per_page` query parameters against
    /// the defaults `config` and `default_size`.
    ///
    /// Zero values are replaced with the defaults and the page size is kept
    /// between 1 and [MAX_PAGE_SIZE].
    pub fn resolve(
        page: Option<u64>,
        per_page: Option<u64>,
        config: &PaginationConfig,
        default_size: u64,
    ) -> Self {
        let number = page
            .filter(|page| *page > 0)
            .unwrap_or(config.default_page.max(1));
        let size = per_page
            .filter(|size| *size > 0)
            .unwrap_or(default_size)
            .clamp(1, MAX_PAGE_SIZE);

        Self { number, size }
    }

    /// The value for a SQL `LIMIT` clause.
    pub fn limit(&self) -> i64 {
        to_sql_integer(self.size)
    }

    /// The value for a SQL `OFFSET` clause, saturating for absurdly large
    /// page numbers.
    pub fn offset(&self) -> i64 {
        to_sql_integer(self.number.saturating_sub(1).saturating_mul(self.size))
    }

    /// The number of pages needed to show `row_count` rows.
    pub fn page_count(&self, row_count: u32) -> u64 {
        u64::from(row_count).div_ceil(self.size.max(1))
    }
}

fn to_sql_integer(value: u64) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}

#[derive(Debug, PartialEq, Eq)]
pub enum PaginationIndicator {
    Page(u64),
    CurrPage(u64),
    Ellipsis,
    NextButton(u64),
    BackButton(u64),
}

/// Work out which page links to show for `curr_page` out of `page_count`
/// pages, showing at most `max_pages` numbered pages around the current page.
pub fn create_pagination_indicators(
    curr_page: u64,
    page_count: u64,
    max_pages: u64,
) -> Vec<PaginationIndicator> {
    let to_indicator = |page| {
        if page == curr_page {
            PaginationIndicator::CurrPage(page)
        } else {
            PaginationIndicator::Page(page)
        }
    };
    let half_window = max_pages / 2;

    let window = if page_count <= max_pages {
        1..=page_count
    } else if curr_page <= half_window {
        1..=max_pages
    } else if curr_page > page_count - half_window {
        (page_count - max_pages + 1)..=page_count
    } else {
        (curr_page - half_window)..=(curr_page + half_window)
    };

    let mut indicators: Vec<PaginationIndicator> = window.map(to_indicator).collect();

    if page_count > max_pages {
        if curr_page > half_window + 1 {
            indicators.splice(
                0..0,
                [PaginationIndicator::Page(1), PaginationIndicator::Ellipsis],
            );
        }

        if curr_page < page_count - half_window {
            indicators.extend([
                PaginationIndicator::Ellipsis,
                PaginationIndicator::Page(page_count),
            ]);
        }
    }

    if curr_page > 1 {
        indicators.insert(0, PaginationIndicator::BackButton(curr_page - 1));
    }

    if curr_page < page_count {
        indicators.push(PaginationIndicator::NextButton(curr_page + 1));
    }

    indicators
}

/// Render the page links for a list page.
///
/// `page_url` builds the URL for a given page number, so callers can keep
/// their filter parameters in the links.
pub fn pagination_view(
    indicators: &[PaginationIndicator],
    page_url: impl Fn(u64) -> String,
) -> Markup {
    const LINK: &str = "block px-3 py-2 rounded-sm text-blue-600 hover:underline";

    html! {
        @if !indicators.is_empty() {
            nav class="pagination flex justify-center my-4"
            {
                ul class="pagination flex items-center gap-2"
                {
                    @for indicator in indicators {
                        li {
                            @match indicator {
                                PaginationIndicator::CurrPage(page) => {
                                    span
                                        aria-current="page"
                                        class="block px-3 py-2 rounded-sm font-bold text-black dark:text-white"
                                    { (page) }
                                }
                                PaginationIndicator::Page(page) => {
                                    a href=(page_url(*page)) class=(LINK) { (page) }
                                }
                                PaginationIndicator::Ellipsis => {
                                    span class="px-3 py-2 text-gray-500" { "..." }
                                }
                                PaginationIndicator::BackButton(page) => {
                                    a href=(page_url(*page)) role="button" class=(LINK) { "Back" }
                                }
                                PaginationIndicator::NextButton(page) => {
                                    a href=(page_url(*page)) role="button" class=(LINK) { "Next" }
                                }
                            }
                        }
                    }
                }
            }
        }
    }
}

/// Build a URL from `route`, the serialised filter `query` and a page number.
pub fn page_url(route: &str, query: &str, page: u64) -> String {
    if query.is_empty() {
        format!("{route}?page={page}")
    } else {
        format!("{route}?{query}&page={page}")
    }
}
