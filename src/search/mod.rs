use crate::clients::nyaa::{self, FeedEntry, NyaaClient};
use crate::config::PreferencesConfig;
use crate::db::Store;
use crate::models::release::ParsedRelease;
use crate::parser::parse_release_title;
use crate::scoring::score_release;
use anyhow::Result;
use async_trait::async_trait;
use futures::future::join_all;
use serde::Serialize;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// A ranked candidate release for one episode.
#[derive(Debug, Clone, Serialize)]
pub struct SearchResult {
    pub title: String,

    /// Usable magnet link; `None` when all three extraction paths failed,
    /// in which case the result is ranked but not actionable.
    pub magnet: Option<String>,

    pub score: i32,

    pub parsed: ParsedRelease,

    pub link: Option<String>,
}

/// Fetch seam between the orchestrator and the network, so orchestration
/// logic is testable without a live feed host.
#[async_trait]
pub trait FeedFetcher: Send + Sync {
    /// Fetches a feed body for a fully-built query URL, possibly from cache.
    async fn fetch_feed(&self, url: &str) -> Result<String>;

    /// Fetches a release page for magnet scraping. Never cached.
    async fn fetch_page(&self, url: &str) -> Result<String>;
}

/// Production fetcher: live HTTP routed through the TTL-bounded cache.
///
/// A cache-read failure degrades to a miss, and a cache-write failure only
/// loses the caching benefit; neither fails the fetch.
pub struct CachedFeedFetcher {
    client: NyaaClient,
    store: Store,
}

impl CachedFeedFetcher {
    #[must_use]
    pub const fn new(client: NyaaClient, store: Store) -> Self {
        Self { client, store }
    }
}

#[async_trait]
impl FeedFetcher for CachedFeedFetcher {
    async fn fetch_feed(&self, url: &str) -> Result<String> {
        match self.store.get_search_cache(url).await {
            Ok(Some(body)) => {
                debug!(url, "Feed cache hit");
                return Ok(body);
            }
            Ok(None) => {}
            Err(err) => warn!(url, error = %err, "Cache read failed, fetching live"),
        }

        let body = self.client.fetch_text(url).await?;

        if let Err(err) = self.store.set_search_cache(url, &body).await {
            warn!(url, error = %err, "Cache write failed");
        }

        Ok(body)
    }

    async fn fetch_page(&self, url: &str) -> Result<String> {
        self.client.fetch_text(url).await
    }
}

/// Runs search queries against the configured feed sources and returns a
/// globally ranked candidate list.
///
/// Queries are tried strictly in order with a fixed delay between them; the
/// feed sources for a single query are fetched concurrently. A failing
/// source contributes zero results, never an error.
pub struct SearchService {
    fetcher: Arc<dyn FeedFetcher>,
    feed_urls: Vec<String>,
    preferences: PreferencesConfig,
    query_delay: Duration,
}

impl SearchService {
    #[must_use]
    pub fn new(
        fetcher: Arc<dyn FeedFetcher>,
        feed_urls: Vec<String>,
        preferences: PreferencesConfig,
        query_delay: Duration,
    ) -> Self {
        Self {
            fetcher,
            feed_urls,
            preferences,
            query_delay,
        }
    }

    pub async fn search(&self, queries: &[String], early_exit: bool) -> Vec<SearchResult> {
        let mut results: Vec<SearchResult> = Vec::new();
        let mut seen: HashSet<(String, Option<String>)> = HashSet::new();

        for (i, query) in queries.iter().enumerate() {
            if i > 0 && !self.query_delay.is_zero() {
                tokio::time::sleep(self.query_delay).await;
            }

            info!(%query, attempt = i + 1, total = queries.len(), "Trying query");

            let fetches = self
                .feed_urls
                .iter()
                .map(|base_url| self.fetch_entries(base_url, query));

            for entries in join_all(fetches).await {
                for entry in entries {
                    let Some(parsed) = parse_release_title(&entry.title) else {
                        continue;
                    };

                    if !self.language_matches(&parsed) {
                        continue;
                    }

                    let score = score_release(&parsed, &self.preferences);
                    let magnet = self.extract_magnet(&entry).await;

                    if !seen.insert((entry.title.clone(), magnet.clone())) {
                        continue;
                    }

                    results.push(SearchResult {
                        title: entry.title,
                        magnet,
                        score,
                        parsed,
                        link: entry.page_link,
                    });
                }
            }

            if early_exit && !results.is_empty() {
                debug!(%query, count = results.len(), "Early exit after productive query");
                break;
            }
        }

        results.sort_by(|a, b| {
            let ka = (a.score, a.parsed.effective_version(), a.parsed.quality_rank());
            let kb = (b.score, b.parsed.effective_version(), b.parsed.quality_rank());
            kb.cmp(&ka).then_with(|| b.title.cmp(&a.title))
        });

        results
    }

    async fn fetch_entries(&self, base_url: &str, query: &str) -> Vec<FeedEntry> {
        let url = match nyaa::feed_url_for_query(base_url, query) {
            Ok(url) => url,
            Err(err) => {
                warn!(base_url, error = %err, "Invalid feed URL");
                return Vec::new();
            }
        };

        match self.fetcher.fetch_feed(&url).await {
            Ok(body) => nyaa::parse_feed(&body),
            Err(err) => {
                warn!(%url, error = %err, "Feed fetch failed");
                Vec::new()
            }
        }
    }

    /// Hard language gate, stricter than the scorer's soft bonus. Entries
    /// with no language token pass through; a tagged entry passes only when
    /// its token contains the preferred language, so MULTI and other broad
    /// tags are excluded here and rewarded by the scorer elsewhere.
    fn language_matches(&self, parsed: &ParsedRelease) -> bool {
        let Some(pref) = self
            .preferences
            .language
            .as_deref()
            .filter(|p| !p.is_empty())
        else {
            return true;
        };
        let Some(lang) = parsed.language.as_deref() else {
            return true;
        };

        lang.to_uppercase().contains(&pref.to_uppercase())
    }

    /// Magnet extraction priority: direct feed field, then the first
    /// `magnet:?` link, then a scrape of the release page. A failed scrape
    /// is logged and yields `None`.
    async fn extract_magnet(&self, entry: &FeedEntry) -> Option<String> {
        if let Some(magnet) = &entry.magnet {
            return Some(magnet.clone());
        }

        if let Some(link) = entry.links.iter().find(|l| l.starts_with("magnet:?")) {
            return Some(link.clone());
        }

        let page_url = entry.page_link.as_deref()?;
        match self.fetcher.fetch_page(page_url).await {
            Ok(html) => nyaa::scrape_magnet_from_page(&html),
            Err(err) => {
                debug!(page_url, error = %err, "Magnet scrape fetch failed");
                None
            }
        }
    }
}

/// Builds the list of feed base URLs from configuration: one per uploader
/// account, plus any explicitly configured RSS URLs.
#[must_use]
pub fn feed_urls_from_config(config: &crate::config::NyaaConfig) -> Vec<String> {
    let mut urls: Vec<String> = config
        .users
        .iter()
        .map(|user| nyaa::feed_url_for_user(user))
        .collect();
    urls.extend(config.rss_urls.iter().cloned());
    urls
}
