use crate::clients::qbittorrent::QBitClient;
use crate::clients::shoko::ShokoClient;
use crate::config::Config;
use crate::db::Store;
use crate::models::episode::MissingEpisode;
use crate::parser::{build_queries, infer_season_from_title};
use crate::search::SearchService;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Errors that abort a whole check cycle. Per-episode failures are logged
/// and the cycle moves on; only collaborator-wide failures surface here.
#[derive(Debug, Error)]
pub enum CycleError {
    #[error("Shoko error: {0}")]
    Shoko(String),

    #[error("Download client error: {0}")]
    Download(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<anyhow::Error> for CycleError {
    fn from(err: anyhow::Error) -> Self {
        Self::Internal(err.to_string())
    }
}

/// How an episode ended up. Only episodes that were actually searchable
/// count toward the `max_items` budget.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EpisodeOutcome {
    Handled,
    NotSearchable,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CycleStats {
    /// Missing episodes reported by the library manager.
    pub missing: usize,

    /// Episodes this cycle actually worked through (bounded by `max_items`).
    pub processed: usize,

    pub added: usize,

    pub not_found: usize,

    /// Already in the ledger, or lacking the data needed to search.
    pub skipped: usize,
}

/// One full acquisition pass: missing episodes from Shoko, feed search per
/// episode, best candidate to qBittorrent, ledger updated.
pub struct AutoDownloadService {
    config: Config,
    store: Store,
    shoko: ShokoClient,
    search: SearchService,
    qbit: Option<QBitClient>,
}

impl AutoDownloadService {
    #[must_use]
    pub const fn new(
        config: Config,
        store: Store,
        shoko: ShokoClient,
        search: SearchService,
        qbit: Option<QBitClient>,
    ) -> Self {
        Self {
            config,
            store,
            shoko,
            search,
            qbit,
        }
    }

    pub async fn run_cycle(&self) -> Result<CycleStats, CycleError> {
        if let Some(qbit) = &self.qbit
            && !qbit.is_dry_run()
        {
            qbit.login()
                .await
                .map_err(|err| CycleError::Download(err.to_string()))?;
        }

        info!("Fetching missing episodes");
        let episodes = self
            .shoko
            .missing_episodes()
            .await
            .map_err(|err| CycleError::Shoko(err.to_string()))?;
        info!(count = episodes.len(), "Missing episodes reported");

        let max_items = self.config.general.max_items;
        let early_exit = self.config.general.early_exit;
        let inter_episode_delay = Duration::from_secs(self.config.nyaa.rate_limit_seconds);

        let mut stats = CycleStats {
            missing: episodes.len(),
            ..CycleStats::default()
        };

        for episode in &episodes {
            if max_items > 0 && stats.processed >= max_items {
                break;
            }

            let outcome = self.handle_episode(episode, early_exit, &mut stats).await;
            if let Err(err) = &outcome {
                warn!(
                    episode_id = episode.episode_id,
                    error = %err,
                    "Episode handling failed"
                );
            }

            if !consumes_budget(&outcome) {
                continue;
            }
            stats.processed += 1;

            if !inter_episode_delay.is_zero() {
                tokio::time::sleep(inter_episode_delay).await;
            }
        }

        info!(
            processed = stats.processed,
            added = stats.added,
            not_found = stats.not_found,
            skipped = stats.skipped,
            "Cycle complete"
        );

        Ok(stats)
    }

    async fn handle_episode(
        &self,
        episode: &MissingEpisode,
        early_exit: bool,
        stats: &mut CycleStats,
    ) -> Result<EpisodeOutcome, CycleError> {
        let series_title = self
            .shoko
            .series_name(episode.series_id)
            .await
            .map_err(|err| CycleError::Shoko(err.to_string()))?;

        let Some(series_title) = series_title else {
            debug!(
                series_id = episode.series_id,
                episode_id = episode.episode_id,
                "No series name available, skipping"
            );
            stats.skipped += 1;
            return Ok(EpisodeOutcome::NotSearchable);
        };

        // Shoko does not supply a season; the season-agnostic query does the
        // work and the inferred season is for display and categorization.
        let queries = build_queries(&series_title, None, episode.episode_number);
        let display_season = infer_season_from_title(&series_title).unwrap_or(1);

        info!(
            series = %series_title,
            season = display_season,
            episode = episode.episode_number,
            "Searching"
        );

        let results = self.search.search(&queries, early_exit).await;
        let Some(best) = results.first() else {
            info!(query = %queries[0], "No results");
            stats.not_found += 1;
            return Ok(EpisodeOutcome::Handled);
        };

        let Some(magnet) = best.magnet.as_deref().or(best.link.as_deref()) else {
            debug!(title = %best.title, "Best candidate has no usable link");
            stats.not_found += 1;
            return Ok(EpisodeOutcome::Handled);
        };

        if self.store.is_episode_downloaded(episode.episode_id).await? {
            info!(title = %best.title, "Already in ledger, skipping");
            stats.skipped += 1;
            return Ok(EpisodeOutcome::Handled);
        }

        let Some(qbit) = &self.qbit else {
            info!(title = %best.title, magnet, "Download client disabled, candidate logged only");
            return Ok(EpisodeOutcome::Handled);
        };

        info!(title = %best.title, score = best.score, "Adding to qBittorrent");

        let save_path = build_save_path(&self.config.qbittorrent.save_root, &series_title);
        let category = build_category(
            self.config.qbittorrent.category_enabled,
            &series_title,
            display_season,
        );
        let tags = self.tag();

        qbit.add_magnet(
            magnet,
            save_path.as_deref(),
            category.as_deref(),
            tags.as_deref(),
        )
        .await
        .map_err(|err| CycleError::Download(err.to_string()))?;

        if !qbit.is_dry_run() {
            self.store
                .mark_episode_downloaded(episode.episode_id, episode.series_id, magnet, &best.title)
                .await?;
        }
        stats.added += 1;

        Ok(EpisodeOutcome::Handled)
    }

    fn tag(&self) -> Option<String> {
        let qbit = &self.config.qbittorrent;
        (qbit.tag_enabled && !qbit.tag_value.is_empty()).then(|| qbit.tag_value.clone())
    }
}

/// An episode that could not even be searched (no series name) leaves the
/// `max_items` budget and the inter-episode delay untouched; handled
/// episodes and real failures both consume a slot.
const fn consumes_budget(outcome: &Result<EpisodeOutcome, CycleError>) -> bool {
    !matches!(outcome, Ok(EpisodeOutcome::NotSearchable))
}

/// Replaces filesystem-hostile characters and collapses whitespace, so a
/// series name is safe as a directory component or category.
#[must_use]
pub fn safe_name(name: &str) -> String {
    let replaced: String = name
        .chars()
        .map(|c| match c {
            '\\' | '/' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c => c,
        })
        .collect();
    replaced.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn build_save_path(save_root: &str, series: &str) -> Option<String> {
    if save_root.is_empty() {
        return None;
    }
    Some(format!(
        "{}/{}",
        save_root.trim_end_matches('/'),
        safe_name(series)
    ))
}

fn build_category(enabled: bool, series: &str, season: u32) -> Option<String> {
    enabled.then(|| format!("{} S{season:02}", safe_name(series).to_uppercase()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unsearchable_episodes_leave_the_item_budget_alone() {
        assert!(!consumes_budget(&Ok(EpisodeOutcome::NotSearchable)));
        assert!(consumes_budget(&Ok(EpisodeOutcome::Handled)));
        assert!(consumes_budget(&Err(CycleError::Shoko(
            "series lookup failed".to_string()
        ))));
    }

    #[test]
    fn test_safe_name_replaces_forbidden_chars() {
        assert_eq!(safe_name("Fate/Zero: Part 2"), "Fate_Zero_ Part 2");
        assert_eq!(safe_name("What If...?"), "What If..._");
        assert_eq!(safe_name("  Plain   Title "), "Plain Title");
    }

    #[test]
    fn test_build_category_format() {
        assert_eq!(
            build_category(true, "My Hero Academia", 7),
            Some("MY HERO ACADEMIA S07".to_string())
        );
        assert_eq!(build_category(false, "My Hero Academia", 7), None);
    }

    #[test]
    fn test_build_save_path() {
        assert_eq!(
            build_save_path("/data/anime/", "Fate/Zero"),
            Some("/data/anime/Fate_Zero".to_string())
        );
        assert_eq!(build_save_path("", "Show"), None);
    }
}
