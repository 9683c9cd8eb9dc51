use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::info;

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub general: GeneralConfig,

    pub shoko: ShokoConfig,

    pub nyaa: NyaaConfig,

    pub qbittorrent: QBittorrentConfig,

    pub cache: CacheConfig,

    pub preferences: PreferencesConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Tracing filter directive, e.g. "info" or "shokarr=debug".
    pub log_level: String,

    /// When set, candidates are logged instead of being sent to the
    /// download client, and the ledger is left untouched.
    pub dry_run: bool,

    /// Upper bound on missing episodes handled per cycle. 0 = unlimited.
    pub max_items: usize,

    /// Stop trying further query variants once one yields results.
    pub early_exit: bool,

    /// Hours between automatic check cycles in daemon mode.
    pub schedule_hours: u64,

    pub worker_threads: usize,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            dry_run: false,
            max_items: 0,
            early_exit: true,
            schedule_hours: 6,
            worker_threads: 2,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ShokoConfig {
    pub base_url: String,

    pub api_key: String,

    /// Page size for the missing-episodes listing.
    pub page_size: u32,
}

impl Default for ShokoConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:8111".to_string(),
            api_key: String::new(),
            page_size: 100,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NyaaConfig {
    /// Uploader accounts whose RSS feeds are searched.
    pub users: Vec<String>,

    /// Extra fully-specified RSS URLs, searched alongside the user feeds.
    pub rss_urls: Vec<String>,

    /// Delay between successive search queries, in seconds.
    pub rate_limit_seconds: u64,

    pub request_timeout_seconds: u64,
}

impl Default for NyaaConfig {
    fn default() -> Self {
        Self {
            users: vec!["Tsundere-Raws".to_string()],
            rss_urls: Vec::new(),
            rate_limit_seconds: 3,
            request_timeout_seconds: 30,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct QBittorrentConfig {
    pub enabled: bool,

    pub url: String,

    pub username: String,

    pub password: String,

    /// Root directory downloads are saved under; a per-series subdirectory
    /// is appended.
    pub save_root: String,

    /// Assign a per-series category like "MY SHOW S01" to each torrent.
    pub category_enabled: bool,

    pub tag_enabled: bool,

    pub tag_value: String,
}

impl Default for QBittorrentConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            url: "http://127.0.0.1:8080".to_string(),
            username: "admin".to_string(),
            password: String::new(),
            save_root: String::new(),
            category_enabled: true,
            tag_enabled: true,
            tag_value: "shokarr".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub database_path: String,

    /// Search-result cache expiry. The downloads ledger never expires.
    pub ttl_hours: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            database_path: "sqlite:data/shokarr.db".to_string(),
            ttl_hours: 24,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PreferencesConfig {
    /// Desired language token, matched as a case-insensitive substring.
    pub language: Option<String>,

    /// Quality tokens in preference order, earlier = more preferred.
    pub qualities: Vec<String>,

    /// Provider tags in preference order, earlier = more preferred.
    pub sources: Vec<String>,

    pub exact_language_bonus: i32,

    /// Bonus for broad multi-language tokens that merely include the
    /// desired language.
    pub multi_language_bonus: i32,

    pub multi_language_tokens: Vec<String>,
}

impl Default for PreferencesConfig {
    fn default() -> Self {
        Self {
            language: Some("VOSTFR".to_string()),
            qualities: vec!["1080p".to_string(), "720p".to_string()],
            sources: vec!["CR".to_string(), "ADN".to_string(), "AMZN".to_string()],
            exact_language_bonus: 50,
            multi_language_bonus: 40,
            multi_language_tokens: vec!["MULTI".to_string()],
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        let paths = Self::config_paths();

        for path in &paths {
            if path.exists() {
                info!("Loading config from: {}", path.display());
                return Self::load_from_path(path);
            }
        }

        info!("No config file found, using defaults");
        Ok(Self::default())
    }

    pub fn load_from_path(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Self = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    pub fn save_to_path(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        info!("Config saved to: {}", path.display());
        Ok(())
    }

    fn config_paths() -> Vec<PathBuf> {
        let mut paths = vec![PathBuf::from("config.toml")];

        if let Some(config_dir) = dirs::config_dir() {
            paths.push(config_dir.join("shokarr").join("config.toml"));
        }

        if let Some(home) = dirs::home_dir() {
            paths.push(home.join(".shokarr").join("config.toml"));
        }

        paths
    }

    fn default_config_path() -> PathBuf {
        PathBuf::from("config.toml")
    }

    pub fn create_default_if_missing() -> Result<bool> {
        let path = Self::default_config_path();
        if path.exists() {
            Ok(false)
        } else {
            let config = Self::default();
            config.save_to_path(&path)?;
            info!("Created default config file: {}", path.display());
            Ok(true)
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.shoko.base_url.is_empty() {
            anyhow::bail!("Shoko base URL cannot be empty");
        }

        if self.shoko.page_size == 0 {
            anyhow::bail!("Shoko page size must be > 0");
        }

        if self.qbittorrent.enabled && self.qbittorrent.url.is_empty() {
            anyhow::bail!("qBittorrent URL cannot be empty when enabled");
        }

        if self.nyaa.users.is_empty() && self.nyaa.rss_urls.is_empty() {
            anyhow::bail!("At least one Nyaa user or RSS URL must be configured");
        }

        Ok(())
    }

    #[must_use]
    pub fn cache_ttl_seconds(&self) -> i64 {
        (self.cache.ttl_hours * 3600) as i64
    }
}
