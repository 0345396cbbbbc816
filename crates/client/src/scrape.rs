//! Scrape pipeline: cache lookup, fetch, extraction and write-through.
//!
//! [`Scraper::scrape`] always yields a [`ScrapedContent`]. Failures land in its
//! `error` field so a chat answer never depends on the page being reachable.

use std::sync::Arc;

use scrapechat_core::{CacheLookup, Error, ScrapeCache, ScrapedContent};

use crate::extract::{Extractor, SelectorExtractor};
use crate::fetch::FetchClient;

/// Fetches, extracts and caches pages.
#[derive(Clone)]
pub struct Scraper {
    fetch: FetchClient,
    extractor: Arc<dyn Extractor>,
    cache: Option<ScrapeCache>,
}

impl Scraper {
    /// Create a scraper with the selector extractor and no cache.
    pub fn new(fetch: FetchClient) -> Self {
        Self { fetch, extractor: Arc::new(SelectorExtractor::new()), cache: None }
    }

    /// Consult and populate `cache` on every scrape.
    pub fn with_cache(mut self, cache: ScrapeCache) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Swap the extraction engine.
    pub fn with_extractor(mut self, extractor: Arc<dyn Extractor>) -> Self {
        self.extractor = extractor;
        self
    }

    /// Scrape `url`, absorbing every failure into the record's error channel.
    pub async fn scrape(&self, url: &str) -> ScrapedContent {
        if let Some(cache) = &self.cache {
            match cache.get(url).await {
                CacheLookup::Hit(record) => return record,
                CacheLookup::Corrupt | CacheLookup::Invalid(_) => {
                    tracing::debug!(url = %url, "discarded unusable cache entry, refetching");
                }
                CacheLookup::Miss => {}
            }
        }

        match self.try_scrape(url).await {
            Ok(mut record) => {
                if let Some(cache) = &self.cache {
                    cache.set(url, &mut record).await;
                }
                record
            }
            Err(e) => {
                tracing::error!(url = %url, error = %e, "error scraping url");
                ScrapedContent::failed(url)
            }
        }
    }

    /// Fetch and extract without touching the cache.
    pub async fn try_scrape(&self, url: &str) -> Result<ScrapedContent, Error> {
        let response = self.fetch.fetch(url).await?;
        tracing::debug!(
            url = %url,
            final_url = %response.final_url,
            content_type = response.content_type.as_deref().unwrap_or(""),
            fetch_ms = response.fetch_ms,
            "page fetched"
        );
        self.extractor.extract(&response.text(), url)
    }
}
