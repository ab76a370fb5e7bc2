//! Page-by-page collection over GitHub listing endpoints.
//!
//! A query is walked from page 1 upward until the first page that comes back
//! empty (or without an item list at all). The walk is capped at
//! `max_pages`; reaching the cap is logged as a possible truncation.

use std::future::Future;

use thiserror::Error;
use tracing::{debug, warn};

use crate::config::Config;
use crate::github::FetchError;

/// Address of one page of a listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: u32,
    pub per_page: u32,
}

impl PageRequest {
    pub fn query(&self) -> [(&'static str, String); 2] {
        [
            ("per_page", self.per_page.to_string()),
            ("page", self.page.to_string()),
        ]
    }
}

/// A page fetch that failed, tagged with the page it was for.
#[derive(Debug, Error)]
#[error("page {page}: {source}")]
pub struct PageError {
    pub page: u32,
    #[source]
    pub source: FetchError,
}

#[derive(Debug, Clone, Copy)]
pub struct Paginator {
    per_page: u32,
    max_pages: u32,
}

impl Paginator {
    pub fn new(per_page: u32, max_pages: u32) -> Self {
        Self {
            per_page: per_page.max(1),
            max_pages: max_pages.max(1),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.page_size, config.max_pages)
    }

    /// Drive `fetch_page` over pages 1, 2, 3, ... and concatenate the items.
    ///
    /// `fetch_page` returns `None` when the response carried no item list.
    /// The first failing page aborts the walk and is returned to the caller,
    /// which decides whether that is fatal.
    pub async fn collect<T, F, Fut>(&self, label: &str, mut fetch_page: F) -> Result<Vec<T>, PageError>
    where
        F: FnMut(PageRequest) -> Fut,
        Fut: Future<Output = Result<Option<Vec<T>>, FetchError>>,
    {
        let mut all = Vec::new();

        for page in 1..=self.max_pages {
            let request = PageRequest {
                page,
                per_page: self.per_page,
            };

            let items = fetch_page(request)
                .await
                .map_err(|source| PageError { page, source })?;

            match items {
                Some(items) if !items.is_empty() => {
                    debug!(
                        "{}: page {}: {} items (total: {})",
                        label,
                        page,
                        items.len(),
                        all.len() + items.len()
                    );
                    all.extend(items);
                }
                _ => {
                    debug!("{}: page {} is empty, done", label, page);
                    return Ok(all);
                }
            }
        }

        warn!(
            "{}: stopped after {} pages without reaching an empty page; results may be truncated",
            label, self.max_pages
        );
        Ok(all)
    }
}
