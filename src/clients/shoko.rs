use crate::config::ShokoConfig;
use crate::models::episode::MissingEpisode;
use anyhow::{Context, Result};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT};
use serde::Deserialize;
use std::collections::HashMap;
use tokio::sync::RwLock;
use tracing::debug;
use url::Url;

#[derive(Debug, Deserialize)]
struct EpisodePage {
    #[serde(rename = "Total")]
    total: u32,

    #[serde(rename = "List", default)]
    list: Vec<EpisodeRecord>,
}

#[derive(Debug, Deserialize)]
struct EpisodeRecord {
    #[serde(rename = "IDs")]
    ids: EpisodeIds,

    #[serde(rename = "AniDB", default)]
    anidb: Option<AniDbEpisode>,
}

#[derive(Debug, Deserialize)]
struct EpisodeIds {
    #[serde(rename = "ID")]
    id: i32,

    #[serde(rename = "ParentSeries", default)]
    parent_series: i32,
}

#[derive(Debug, Deserialize)]
struct AniDbEpisode {
    #[serde(rename = "EpisodeNumber")]
    episode_number: u32,
}

#[derive(Debug, Deserialize)]
struct SeriesRecord {
    #[serde(rename = "Name", default)]
    name: Option<String>,

    #[serde(rename = "AniDB", default)]
    anidb: Option<AniDbSeries>,
}

#[derive(Debug, Deserialize)]
struct AniDbSeries {
    #[serde(rename = "Title", default)]
    title: Option<String>,
}

/// Client for the Shoko media-library manager's v3 API.
///
/// Series names are memoized for the lifetime of the client; the missing
/// episode listing typically repeats the same handful of series.
pub struct ShokoClient {
    client: reqwest::Client,
    base_url: String,
    page_size: u32,
    series_names: RwLock<HashMap<i32, String>>,
}

impl ShokoClient {
    pub fn new(config: &ShokoConfig) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        headers.insert(
            "apikey",
            HeaderValue::from_str(&config.api_key).context("Invalid Shoko API key")?,
        );

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(std::time::Duration::from_secs(30))
            .user_agent("shokarr/0.1")
            .build()?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            page_size: config.page_size,
            series_names: RwLock::new(HashMap::new()),
        })
    }

    /// Fetches every episode the library manager reports as missing,
    /// following pagination until the advertised total is reached. Records
    /// without an episode number are skipped.
    pub async fn missing_episodes(&self) -> Result<Vec<MissingEpisode>> {
        let mut episodes = Vec::new();
        let mut page = 1u32;
        let mut fetched = 0u32;

        loop {
            let url = missing_episodes_url(&self.base_url, self.page_size, page)?;

            let response: EpisodePage = self
                .client
                .get(&url)
                .send()
                .await?
                .error_for_status()
                .context("Shoko missing-episodes request failed")?
                .json()
                .await?;

            let page_len = response.list.len() as u32;
            fetched += page_len;

            for record in response.list {
                let Some(anidb) = record.anidb else {
                    debug!(episode_id = record.ids.id, "Episode record without AniDB data, skipping");
                    continue;
                };
                episodes.push(MissingEpisode {
                    episode_id: record.ids.id,
                    series_id: record.ids.parent_series,
                    episode_number: anidb.episode_number,
                });
            }

            if page_len == 0 || fetched >= response.total {
                break;
            }
            page += 1;
        }

        Ok(episodes)
    }

    /// Resolves a series id to a display name, preferring the library name
    /// over the AniDB title. Memoized.
    pub async fn series_name(&self, series_id: i32) -> Result<Option<String>> {
        if let Some(name) = self.series_names.read().await.get(&series_id) {
            return Ok(Some(name.clone()));
        }

        let url = format!("{}/api/v3/Series/{series_id}", self.base_url);
        let record: SeriesRecord = self
            .client
            .get(&url)
            .send()
            .await?
            .error_for_status()
            .context("Shoko series lookup failed")?
            .json()
            .await?;

        let name = record.name.or_else(|| record.anidb.and_then(|a| a.title));

        if let Some(ref name) = name {
            self.series_names
                .write()
                .await
                .insert(series_id, name.clone());
        }

        Ok(name)
    }
}

/// Builds one page of the missing-episodes listing URL, encoding the query
/// through the URL's query-pair machinery.
fn missing_episodes_url(base_url: &str, page_size: u32, page: u32) -> Result<String> {
    let mut url = Url::parse(&format!(
        "{base_url}/api/v3/ReleaseManagement/MissingEpisodes/Episodes"
    ))
    .context("Invalid Shoko base URL")?;

    url.query_pairs_mut()
        .append_pair("pageSize", &page_size.to_string())
        .append_pair("page", &page.to_string())
        .append_pair("collecting", "false")
        .append_pair("includeFiles", "false")
        .append_pair("includeMediaInfo", "false")
        .append_pair("includeAbsolutePaths", "false")
        .append_pair("includeXRefs", "true")
        .append_pair("includeDataFrom", "AniDB");

    Ok(url.to_string())
}
