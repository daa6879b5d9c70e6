//! Pagination module
//!
//! Walks page-numbered result sets (`page` starting at 1, `size` up to 100)
//! and merges them into one document.
//!
//! # Overview
//!
//! A paginated response carries `SearchResult.total` and
//! `SearchResult.resources`. The paginator reads `total` from page 1,
//! derives the page count and fetches the remaining pages one after
//! another through a [`PageSource`].

mod paginator;
mod types;

pub use paginator::Paginator;
pub use types::{
    page_resources, total_records, PageRequest, PageSource, PaginationConfig, DEFAULT_PAGE_SIZE,
    MAX_PAGE_SIZE, SEARCH_RESULT,
};
