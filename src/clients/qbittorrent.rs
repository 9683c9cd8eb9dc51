use crate::config::QBittorrentConfig;
use anyhow::{bail, Context, Result};
use reqwest::{Client, StatusCode};
use std::collections::HashMap;
use tracing::{debug, info};

/// Cookie-authenticated client for the qBittorrent Web API.
///
/// In dry-run mode `add_magnet` only logs what it would have added, so a test
/// configuration can run full cycles without queueing real downloads.
#[derive(Debug, Clone)]
pub struct QBitClient {
    client: Client,
    config: QBittorrentConfig,
    dry_run: bool,
}

impl QBitClient {
    pub fn new(config: QBittorrentConfig, dry_run: bool) -> Result<Self> {
        let client = Client::builder()
            .cookie_store(true)
            .user_agent("shokarr/0.1")
            .build()?;

        Ok(Self {
            client,
            config,
            dry_run,
        })
    }

    pub async fn login(&self) -> Result<()> {
        let url = format!("{}/api/v2/auth/login", self.config.url);

        let params = [
            ("username", self.config.username.as_str()),
            ("password", self.config.password.as_str()),
        ];

        let response = self
            .client
            .post(&url)
            .header("Referer", &self.config.url)
            .form(&params)
            .send()
            .await
            .context("Failed to connect to qBittorrent")?;

        let status = response.status();
        let body = response.text().await?;

        if status == StatusCode::OK && body.contains("Ok") {
            debug!("Successfully authenticated with qBittorrent");
            Ok(())
        } else if body.contains("Fails") {
            bail!("qBittorrent authentication failed: invalid credentials")
        } else {
            bail!("qBittorrent authentication failed: status={status}, body={body}")
        }
    }

    async fn ensure_auth(&self) -> Result<()> {
        let url = format!("{}/api/v2/app/version", self.config.url);
        let response = self
            .client
            .get(&url)
            .header("Referer", &self.config.url)
            .send()
            .await?;

        if response.status() == StatusCode::FORBIDDEN {
            debug!(reason = "session_expired", "Logging in...");
            self.login().await?;
        }

        Ok(())
    }

    pub async fn add_magnet(
        &self,
        magnet: &str,
        save_path: Option<&str>,
        category: Option<&str>,
        tags: Option<&str>,
    ) -> Result<()> {
        if self.dry_run {
            info!(
                magnet = %log_preview(magnet),
                ?save_path,
                ?category,
                "Dry run: torrent not added"
            );
            return Ok(());
        }

        self.ensure_auth().await?;

        let url = format!("{}/api/v2/torrents/add", self.config.url);

        let mut form: HashMap<&str, String> = HashMap::new();
        form.insert("urls", magnet.to_string());
        if let Some(path) = save_path {
            form.insert("savepath", path.to_string());
        }
        if let Some(category) = category {
            form.insert("category", category.to_string());
        }
        if let Some(tags) = tags {
            form.insert("tags", tags.to_string());
        }

        let response = self
            .client
            .post(&url)
            .header("Referer", &self.config.url)
            .form(&form)
            .send()
            .await
            .context("Failed to add torrent")?;

        let status = response.status();
        let body = response.text().await?;

        if status == StatusCode::OK {
            debug!("Torrent added successfully");
            Ok(())
        } else {
            bail!("Failed to add torrent: status={status}, body={body}")
        }
    }

    #[must_use]
    pub const fn is_dry_run(&self) -> bool {
        self.dry_run
    }
}

/// Truncates a magnet for logging on a char boundary; `dn=` names carry
/// arbitrary (entity-decoded) text, so byte slicing is not safe.
fn log_preview(magnet: &str) -> String {
    magnet.chars().take(60).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_preview_is_char_boundary_safe() {
        // A multibyte char straddling the 60-byte mark.
        let magnet = format!("magnet:?xt=urn:btih:{}&dn=", "a".repeat(35));
        assert_eq!(magnet.len(), 59);
        let magnet = format!("{magnet}é-release");

        let preview = log_preview(&magnet);
        assert_eq!(preview.chars().count(), 60);
        assert!(magnet.starts_with(&preview));
    }

    #[test]
    fn test_log_preview_keeps_short_magnets_whole() {
        assert_eq!(log_preview("magnet:?xt=urn:btih:abc"), "magnet:?xt=urn:btih:abc");
    }

    #[tokio::test]
    async fn test_dry_run_add_with_multibyte_name_does_not_panic() {
        let client = QBitClient::new(crate::config::QBittorrentConfig::default(), true).unwrap();
        let magnet = format!("magnet:?xt=urn:btih:{}&dn=é-release", "a".repeat(35));

        client
            .add_magnet(&magnet, Some("/data/anime/Show"), Some("SHOW S01"), None)
            .await
            .unwrap();
    }
}
