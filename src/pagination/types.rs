//! Pagination types and traits
//!
//! Defines the page source abstraction and the per-walk state.

use crate::catalog::EndpointCategory;
use crate::error::Result;
use crate::types::{as_u64, JsonObject, JsonValue};
use async_trait::async_trait;

/// Default page size when the caller's `size` cannot be read
pub const DEFAULT_PAGE_SIZE: u32 = 20;

/// Hard cap on page size
pub const MAX_PAGE_SIZE: u32 = 100;

/// Record holding `total` and `resources` in a paginated response
pub const SEARCH_RESULT: &str = "SearchResult";

/// Supplies single pages to the paginator
///
/// The fetch engine implements this with cache read-through in front of the
/// retry controller; tests can script pages directly.
#[async_trait]
pub trait PageSource: Send + Sync {
    /// Fully-qualified URL for `endpoint`
    fn url_for(&self, endpoint: &str) -> String;

    /// Rate-limit category of `endpoint`, also its cache namespace
    fn category_for(&self, endpoint: &str) -> EndpointCategory;

    /// Fetch one page, consulting the cache first when `use_cache` is set
    async fn fetch_page(
        &self,
        endpoint: &str,
        params: &JsonObject,
        use_cache: bool,
    ) -> Result<JsonValue>;
}

/// Page size limits
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PaginationConfig {
    /// Size used when the caller's value is unreadable
    pub default_page_size: u32,
    /// Size used when the caller gives none; also the upper clamp
    pub max_page_size: u32,
}

impl Default for PaginationConfig {
    fn default() -> Self {
        Self {
            default_page_size: DEFAULT_PAGE_SIZE,
            max_page_size: MAX_PAGE_SIZE,
        }
    }
}

impl PaginationConfig {
    /// Resolve the page size for a request
    ///
    /// Absent → `max_page_size`; present → clamped to `[1, max_page_size]`;
    /// unreadable → `default_page_size`.
    pub fn page_size(&self, params: &JsonObject) -> u32 {
        let max = self.max_page_size.clamp(1, MAX_PAGE_SIZE);
        match params.get("size") {
            None => max,
            Some(value) => match as_u64(value) {
                Some(size) => size.clamp(1, u64::from(max)) as u32,
                None => self.default_page_size.clamp(1, max),
            },
        }
    }
}

/// State of one paginated walk
#[derive(Debug, Clone)]
pub struct PageRequest {
    /// Last page fetched (1-based)
    pub page: u64,
    /// Records per page
    pub page_size: u32,
    /// Records reported by page 1
    pub total_records: u64,
    /// Merged resources so far
    pub resources: Vec<JsonValue>,
}

impl PageRequest {
    /// State after page 1 arrived
    pub fn new(page_size: u32, total_records: u64) -> Self {
        Self {
            page: 1,
            page_size: page_size.max(1),
            total_records,
            resources: Vec::new(),
        }
    }

    /// `ceil(total_records / page_size)`
    pub fn total_pages(&self) -> u64 {
        self.total_records.div_ceil(u64::from(self.page_size))
    }

    /// Record a fetched page
    pub fn push_page(&mut self, page: u64, resources: Vec<JsonValue>) {
        self.page = page;
        self.resources.extend(resources);
    }

    /// Whether the walk stopped before the last page
    pub fn is_partial(&self) -> bool {
        self.page < self.total_pages()
    }
}

/// `SearchResult.total`, if the document is paginated
pub fn total_records(doc: &JsonValue) -> Option<u64> {
    doc.get(SEARCH_RESULT)?.get("total")?.as_u64()
}

/// `SearchResult.resources`; `None` if the document has no `SearchResult`
pub fn page_resources(doc: &JsonValue) -> Option<Vec<JsonValue>> {
    let result = doc.get(SEARCH_RESULT)?.as_object()?;
    Some(
        result
            .get("resources")
            .and_then(JsonValue::as_array)
            .cloned()
            .unwrap_or_default(),
    )
}
