//! Auto-paginating fetch
//!
//! Walks `page=1..=N` sequentially and merges `SearchResult.resources`.
//! `N` is only known once page 1 arrives.

use super::types::{
    page_resources, total_records, PageRequest, PageSource, PaginationConfig, SEARCH_RESULT,
};
use crate::cache::{paginated_cache_key, ResponseCache};
use crate::error::Result;
use crate::types::{JsonObject, JsonValue};
use futures::stream::{self, Stream};
use serde_json::json;
use std::sync::Arc;
use tracing::{error, info, warn};

/// Merges multi-page results and caches the merged document
#[derive(Debug, Clone)]
pub struct Paginator {
    cache: Arc<ResponseCache>,
    config: PaginationConfig,
}

impl Paginator {
    /// Create a paginator writing merged results to `cache`
    pub fn new(cache: Arc<ResponseCache>, config: PaginationConfig) -> Self {
        Self { cache, config }
    }

    /// Page size limits
    pub fn config(&self) -> &PaginationConfig {
        &self.config
    }

    /// Fetch every page of `endpoint` and merge them into one document
    ///
    /// Documents without `SearchResult.total`, and results fitting in one
    /// page, are returned as page 1 verbatim. If a later page fails the
    /// walk stops and the records gathered so far are returned; such a
    /// partial merge is cached with the shorter partial TTL.
    pub async fn fetch_all(
        &self,
        source: &dyn PageSource,
        endpoint: &str,
        params: &JsonObject,
        use_cache: bool,
    ) -> Result<JsonValue> {
        let page_size = self.config.page_size(params);
        let mut request = params.clone();
        request.insert("size".into(), json!(page_size));
        request.insert("page".into(), json!(1));

        let merged_key = paginated_cache_key(&source.url_for(endpoint), &request);
        if use_cache {
            if let Some(cached) = self.cache.get_json(&merged_key).await {
                info!("Cache hit for paginated result: {endpoint}");
                return Ok(cached);
            }
        }

        let mut merged = source.fetch_page(endpoint, &request, use_cache).await?;

        let Some(total) = total_records(&merged) else {
            return Ok(merged);
        };
        let mut state = PageRequest::new(page_size, total);
        let total_pages = state.total_pages();
        if total_pages <= 1 {
            return Ok(merged);
        }
        state.push_page(1, page_resources(&merged).unwrap_or_default());

        for page in 2..=total_pages {
            info!("Fetching page {page} of {total_pages} for {endpoint}");
            request.insert("page".into(), json!(page));
            match source.fetch_page(endpoint, &request, use_cache).await {
                Ok(doc) => match page_resources(&doc) {
                    Some(resources) => state.push_page(page, resources),
                    None => {
                        error!("Page {page} of {endpoint} has no {SEARCH_RESULT}");
                        break;
                    }
                },
                Err(e) => {
                    error!("Error fetching page {page}: {e}");
                    break;
                }
            }
        }

        let partial = state.is_partial();
        if partial {
            warn!(
                "Returning partial result for {endpoint}: {} of {} records ({} of {} pages)",
                state.resources.len(),
                state.total_records,
                state.page,
                total_pages
            );
        }

        if let Some(result) = merged
            .get_mut(SEARCH_RESULT)
            .and_then(JsonValue::as_object_mut)
        {
            result.insert("resources".into(), JsonValue::Array(state.resources));
        }

        if use_cache {
            let ttl = if partial {
                self.cache.partial_ttl()
            } else {
                self.cache.ttl()
            };
            let namespace = source.category_for(endpoint);
            self.cache
                .set_json(namespace.as_str(), &merged_key, &merged, ttl)
                .await;
        }

        Ok(merged)
    }

    /// Yield each page of `endpoint` in order instead of merging
    ///
    /// A failure on page 1 is yielded as an error; a failure on a later
    /// page ends the stream.
    pub fn stream_pages<'a>(
        &self,
        source: &'a dyn PageSource,
        endpoint: &'a str,
        params: &JsonObject,
        use_cache: bool,
    ) -> impl Stream<Item = Result<JsonValue>> + Send + 'a {
        let page_size = self.config.page_size(params);
        let mut request = params.clone();
        request.insert("size".into(), json!(page_size));

        let initial = StreamState {
            request,
            next_page: 1,
            total_pages: None,
            done: false,
        };

        stream::unfold(initial, move |mut st| async move {
            if st.done || st.total_pages.is_some_and(|total| st.next_page > total) {
                return None;
            }

            let page = st.next_page;
            st.request.insert("page".into(), json!(page));
            match source.fetch_page(endpoint, &st.request, use_cache).await {
                Ok(doc) => {
                    if page == 1 {
                        match total_records(&doc) {
                            Some(total) => {
                                st.total_pages =
                                    Some(PageRequest::new(page_size, total).total_pages());
                            }
                            None => st.done = true,
                        }
                    } else {
                        info!("Streamed page {page} for {endpoint}");
                    }
                    st.next_page += 1;
                    Some((Ok(doc), st))
                }
                Err(e) if page == 1 => {
                    st.done = true;
                    Some((Err(e), st))
                }
                Err(e) => {
                    error!("Error fetching page {page}: {e}");
                    None
                }
            }
        })
    }
}

struct StreamState {
    request: JsonObject,
    next_page: u64,
    total_pages: Option<u64>,
    done: bool,
}
