//! Authenticated resource fetching and record-listing pagination

use crate::transport::{RequestHeaders, Transport};
use reqwest::Url;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, warn};
use vcd_api::Element;
use vcd_core::FetchError;

/// Default hard cap on pages followed per listing
pub const DEFAULT_MAX_PAGES: usize = 1000;

/// Link relation marking the next page of a query result
const NEXT_PAGE_REL: &str = "nextPage";

/// One page of a record listing
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Page {
    pub records: Vec<Element>,
    /// Absolute URL of the next page, if the server advertised one
    pub next_page: Option<String>,
}

/// Client for vCloud API resources
#[derive(Clone)]
pub struct ResourceClient {
    transport: Arc<dyn Transport>,
    max_pages: usize,
}

impl ResourceClient {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self {
            transport,
            max_pages: DEFAULT_MAX_PAGES,
        }
    }

    /// Limit the number of pages `fetch_all` follows
    pub fn with_max_pages(mut self, max_pages: usize) -> Self {
        self.max_pages = max_pages.max(1);
        self
    }

    /// GET a resource and parse its XML body
    pub async fn fetch_document(
        &self,
        url: &str,
        headers: &RequestHeaders,
    ) -> Result<Element, FetchError> {
        let response = self.transport.get(url, headers).await?;
        if !response.is_success() {
            return Err(FetchError::Status {
                status: response.status,
                url: url.to_string(),
            });
        }

        Element::parse(&response.body).map_err(|source| FetchError::Parse {
            url: url.to_string(),
            source,
        })
    }

    /// Fetch one page of a listing, extracting every `record` element and
    /// the next-page link resolved against `base`
    pub async fn fetch_page(
        &self,
        url: &str,
        base: &str,
        record: &str,
        headers: &RequestHeaders,
    ) -> Result<Page, FetchError> {
        let document = self.fetch_document(url, headers).await?;

        let records = document
            .descendants(record)
            .into_iter()
            .cloned()
            .collect();

        let next_page = next_page_href(&document)
            .map(|href| resolve_href(base, href))
            .transpose()?;

        Ok(Page { records, next_page })
    }

    /// Follow a listing from `start_url` until no next-page link remains.
    ///
    /// Pagination also stops when a next link points at an already visited
    /// page, or after `max_pages` pages.
    pub async fn fetch_all(
        &self,
        start_url: &str,
        record: &str,
        headers: &RequestHeaders,
    ) -> Result<Vec<Element>, FetchError> {
        let mut visited: HashSet<String> = HashSet::new();
        let mut records = Vec::new();
        let mut next = Some(start_url.to_string());

        while let Some(url) = next.take() {
            if visited.len() >= self.max_pages {
                warn!(
                    "Stopping {} pagination after {} pages; {} not fetched",
                    record, self.max_pages, url
                );
                break;
            }

            let page = self.fetch_page(&url, start_url, record, headers).await?;
            debug!("Fetched {} {} records from {}", page.records.len(), record, url);
            records.extend(page.records);
            visited.insert(url);

            match page.next_page {
                Some(link) if visited.contains(&link) => {
                    warn!("Next page link {} was already visited, stopping {} pagination", link, record);
                }
                link => next = link,
            }
        }

        debug!("Collected {} {} records over {} pages", records.len(), record, visited.len());
        Ok(records)
    }
}

fn next_page_href(document: &Element) -> Option<&str> {
    document
        .descendants("Link")
        .into_iter()
        .find(|link| link.attr("rel") == Some(NEXT_PAGE_REL))
        .and_then(|link| link.attr("href"))
}

/// Resolve an absolute or relative href against `base`
pub fn resolve_href(base: &str, href: &str) -> Result<String, FetchError> {
    let base_url = Url::parse(base).map_err(|e| FetchError::InvalidUrl {
        url: base.to_string(),
        message: e.to_string(),
    })?;
    base_url
        .join(href)
        .map(String::from)
        .map_err(|e| FetchError::InvalidUrl {
            url: href.to_string(),
            message: e.to_string(),
        })
}

/// URL of the provider VDC record query on the same origin as `base`
pub fn provider_query_url(base: &str, page_size: u32) -> Result<String, FetchError> {
    resolve_href(
        base,
        &format!("/api/query?type=providerVdc&format=records&pageSize={}", page_size),
    )
}
