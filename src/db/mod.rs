use crate::entities::prelude::*;
use crate::entities::{downloads, search_cache};
use anyhow::Result;
use sea_orm::sea_query::OnConflict;
use sea_orm::{ActiveValue::Set, ConnectOptions, Database, DatabaseConnection, EntityTrait};
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info};

pub mod migrator;

/// SQLite-backed store for the search-result cache and the downloads ledger.
///
/// The two tables have deliberately different lifetimes: cache rows expire
/// after the configured TTL (lazily, on read), ledger rows never do.
#[derive(Clone)]
pub struct Store {
    pub conn: DatabaseConnection,
    ttl_seconds: i64,
}

impl Store {
    pub async fn new(db_url: &str, ttl_seconds: i64) -> Result<Self> {
        use sea_orm_migration::MigratorTrait;

        if !db_url.contains(":memory:") {
            let path_str = db_url.trim_start_matches("sqlite:");
            if let Some(parent) = Path::new(path_str).parent() {
                tokio::fs::create_dir_all(parent).await.ok();
            }
            if !Path::new(path_str).exists() {
                std::fs::File::create(path_str)?;
            }
        }

        let mut opt = ConnectOptions::new(db_url.to_string());
        opt.max_connections(5)
            .min_connections(1)
            .connect_timeout(Duration::from_secs(10))
            .acquire_timeout(Duration::from_secs(10))
            .idle_timeout(Duration::from_secs(300))
            .sqlx_logging(false);

        let conn = Database::connect(opt).await?;

        migrator::Migrator::up(&conn, None).await?;

        info!("Database connected & migrations applied");

        Ok(Self { conn, ttl_seconds })
    }

    /// Returns the cached body for a fetch URL, or `None` when the key is
    /// absent or older than the TTL. Expired rows are left in place; the
    /// next `set` overwrites them.
    pub async fn get_search_cache(&self, key: &str) -> Result<Option<String>> {
        let Some(row) = SearchCache::find_by_id(key.to_string())
            .one(&self.conn)
            .await?
        else {
            return Ok(None);
        };

        let age = chrono::Utc::now().timestamp() - row.fetched_at;
        if age <= self.ttl_seconds {
            Ok(Some(row.value))
        } else {
            debug!(key, age, "Cache entry expired");
            Ok(None)
        }
    }

    /// Stores a fetched feed body, overwriting any prior entry for the key.
    pub async fn set_search_cache(&self, key: &str, value: &str) -> Result<()> {
        let model = search_cache::ActiveModel {
            key: Set(key.to_string()),
            value: Set(value.to_string()),
            fetched_at: Set(chrono::Utc::now().timestamp()),
        };

        SearchCache::insert(model)
            .on_conflict(
                OnConflict::column(search_cache::Column::Key)
                    .update_columns([
                        search_cache::Column::Value,
                        search_cache::Column::FetchedAt,
                    ])
                    .to_owned(),
            )
            .exec(&self.conn)
            .await?;

        Ok(())
    }

    pub async fn is_episode_downloaded(&self, episode_id: i32) -> Result<bool> {
        let row = Downloads::find_by_id(episode_id).one(&self.conn).await?;
        Ok(row.is_some())
    }

    /// Records an episode as handed off for download. Re-marking the same
    /// episode overwrites the row and is harmless.
    pub async fn mark_episode_downloaded(
        &self,
        episode_id: i32,
        series_id: i32,
        magnet: &str,
        title: &str,
    ) -> Result<()> {
        let model = downloads::ActiveModel {
            episode_id: Set(episode_id),
            series_id: Set(series_id),
            magnet: Set(magnet.to_string()),
            title: Set(title.to_string()),
            added_at: Set(chrono::Utc::now().timestamp()),
        };

        Downloads::insert(model)
            .on_conflict(
                OnConflict::column(downloads::Column::EpisodeId)
                    .update_columns([
                        downloads::Column::SeriesId,
                        downloads::Column::Magnet,
                        downloads::Column::Title,
                        downloads::Column::AddedAt,
                    ])
                    .to_owned(),
            )
            .exec(&self.conn)
            .await?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn memory_store(ttl_seconds: i64) -> Store {
        Store::new("sqlite::memory:", ttl_seconds)
            .await
            .expect("in-memory store")
    }

    #[tokio::test]
    async fn test_cache_set_then_get_within_ttl() {
        let store = memory_store(3600).await;

        store
            .set_search_cache("https://example.org/feed?q=test", "<rss/>")
            .await
            .unwrap();

        let hit = store
            .get_search_cache("https://example.org/feed?q=test")
            .await
            .unwrap();
        assert_eq!(hit.as_deref(), Some("<rss/>"));
    }

    #[tokio::test]
    async fn test_cache_miss_for_unknown_key() {
        let store = memory_store(3600).await;
        let miss = store.get_search_cache("https://nowhere").await.unwrap();
        assert_eq!(miss, None);
    }

    #[tokio::test]
    async fn test_cache_expired_entry_is_a_miss() {
        let store = memory_store(60).await;

        // Insert a row whose timestamp is already past the TTL.
        let stale = search_cache::ActiveModel {
            key: Set("https://example.org/old".to_string()),
            value: Set("stale".to_string()),
            fetched_at: Set(chrono::Utc::now().timestamp() - 120),
        };
        SearchCache::insert(stale).exec(&store.conn).await.unwrap();

        let miss = store.get_search_cache("https://example.org/old").await.unwrap();
        assert_eq!(miss, None);
    }

    #[tokio::test]
    async fn test_cache_set_overwrites() {
        let store = memory_store(3600).await;

        store.set_search_cache("k", "first").await.unwrap();
        store.set_search_cache("k", "second").await.unwrap();

        let hit = store.get_search_cache("k").await.unwrap();
        assert_eq!(hit.as_deref(), Some("second"));
    }

    #[tokio::test]
    async fn test_ledger_mark_and_check() {
        let store = memory_store(3600).await;

        assert!(!store.is_episode_downloaded(42).await.unwrap());

        store
            .mark_episode_downloaded(42, 7, "magnet:?xt=urn:btih:abc", "Show S01E01")
            .await
            .unwrap();

        assert!(store.is_episode_downloaded(42).await.unwrap());
        assert!(!store.is_episode_downloaded(43).await.unwrap());
    }

    #[tokio::test]
    async fn test_ledger_remark_is_idempotent() {
        let store = memory_store(3600).await;

        store
            .mark_episode_downloaded(1, 2, "magnet:?xt=a", "Title v1")
            .await
            .unwrap();
        store
            .mark_episode_downloaded(1, 2, "magnet:?xt=b", "Title v2")
            .await
            .unwrap();

        assert!(store.is_episode_downloaded(1).await.unwrap());
    }
}
