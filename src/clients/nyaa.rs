use anyhow::Result;
use regex::Regex;
use std::sync::OnceLock;
use std::time::Duration;
use url::Url;

const NYAA_RSS_BASE: &str = "https://nyaa.si/?page=rss";

/// One `<item>` of a feed, reduced to what magnet extraction and title
/// parsing need.
#[derive(Debug, Clone, Default)]
pub struct FeedEntry {
    pub title: String,

    /// Direct magnet field (`torrent:magnetURI`), when the feed carries one.
    pub magnet: Option<String>,

    /// Generic `<link>` elements; one of them may be a magnet URI.
    pub links: Vec<String>,

    /// Page URL (`<guid>`), the scrape fallback for magnet extraction.
    pub page_link: Option<String>,
}

/// Consolidates regexes for XML parsing to avoid per-call overhead.
struct FeedRegex {
    item: Regex,
    title: Regex,
    link: Regex,
    guid: Regex,
    magnet_uri: Regex,
}

impl FeedRegex {
    fn get() -> Option<&'static Self> {
        static INSTANCE: OnceLock<Option<FeedRegex>> = OnceLock::new();
        INSTANCE
            .get_or_init(|| {
                Some(Self {
                    item: Regex::new(r"(?s)<item>(.*?)</item>").ok()?,
                    title: Regex::new(r"<title>([^<]*)</title>").ok()?,
                    link: Regex::new(r"<link>([^<]*)</link>").ok()?,
                    guid: Regex::new(r"<guid[^>]*>([^<]*)</guid>").ok()?,
                    magnet_uri: Regex::new(r"<torrent:magnetURI>([^<]*)</torrent:magnetURI>")
                        .ok()?,
                })
            })
            .as_ref()
    }
}

fn extract_tag(xml: &str, re: &Regex) -> Option<String> {
    re.captures(xml)
        .and_then(|c| c.get(1))
        .map(|m| html_escape::decode_html_entities(m.as_str()).trim().to_string())
        .filter(|s| !s.is_empty())
}

fn parse_item(item_xml: &str) -> Option<FeedEntry> {
    let re = FeedRegex::get()?;

    Some(FeedEntry {
        title: extract_tag(item_xml, &re.title)?,
        magnet: extract_tag(item_xml, &re.magnet_uri),
        links: re
            .link
            .captures_iter(item_xml)
            .filter_map(|c| c.get(1))
            .map(|m| html_escape::decode_html_entities(m.as_str()).trim().to_string())
            .collect(),
        page_link: extract_tag(item_xml, &re.guid),
    })
}

/// Parses the `<item>` elements out of a raw RSS body. Malformed items are
/// skipped; a body with no items yields an empty list, not an error.
#[must_use]
pub fn parse_feed(xml: &str) -> Vec<FeedEntry> {
    let Some(re) = FeedRegex::get() else {
        return Vec::new();
    };
    re.item
        .captures_iter(xml)
        .filter_map(|c| c.get(1))
        .filter_map(|m| parse_item(m.as_str()))
        .collect()
}

/// Per-uploader RSS feed URL.
#[must_use]
pub fn feed_url_for_user(user: &str) -> String {
    format!("{NYAA_RSS_BASE}&u={user}")
}

/// Appends the search query to a base feed URL, percent-encoding via the
/// URL's query-pair machinery.
pub fn feed_url_for_query(base_url: &str, query: &str) -> Result<String> {
    let mut url = Url::parse(base_url)?;
    url.query_pairs_mut().append_pair("q", query);
    Ok(url.to_string())
}

/// Thin HTTP fetcher for feed bodies and release pages.
#[derive(Clone)]
pub struct NyaaClient {
    client: reqwest::Client,
}

impl NyaaClient {
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent("shokarr/0.1")
            .build()?;
        Ok(Self { client })
    }

    pub async fn fetch_text(&self, url: &str) -> Result<String> {
        let response = self.client.get(url).send().await?.error_for_status()?;
        Ok(response.text().await?)
    }
}

/// Pulls the first `magnet:` anchor out of a release page.
#[must_use]
pub fn scrape_magnet_from_page(html: &str) -> Option<String> {
    static RE: OnceLock<Regex> = OnceLock::new();
    let re = RE
        .get_or_init(|| Regex::new(r#"<a[^>]*href="(magnet:[^"]*)""#).expect("Invalid regex"));

    re.captures(html)
        .and_then(|c| c.get(1))
        .map(|m| html_escape::decode_html_entities(m.as_str()).to_string())
}
