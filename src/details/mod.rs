// src/details/mod.rs
//
// Match-detail fetching. Each finished match gets its `basic` event plus four
// optional sub-resources, saved under
// `match_details/{league}/{season}/{match_id}/`.

pub mod ids;
pub mod report;
pub mod tree;

use anyhow::Result;
use futures::{stream::FuturesUnordered, StreamExt};
use rand::Rng;
use serde_json::Value;
use std::{
    collections::{BTreeMap, HashSet},
    fmt,
    path::PathBuf,
    time::Duration,
};
use tokio::time::sleep;
use tracing::{debug, error, info, instrument, warn};

use crate::config::Config;
use crate::error::{FetchError, FetchResult};
use crate::fetch::JsonSource;
use crate::json::{cell, nested, nested_str};
use crate::store::{safe_name, write_json_pretty, Layout};
use crate::types::{Event, MatchDetail};

pub fn event_path(match_id: u64) -> String {
    format!("/event/{match_id}")
}

#[derive(Debug, Clone, Copy)]
pub struct DetailSettings {
    pub batch_size: usize,
    /// Tries per match, including the first.
    pub attempts: u32,
    pub retry_base: Duration,
    pub retry_jitter: Duration,
    pub batch_pause: Duration,
}

impl DetailSettings {
    pub fn from_config(cfg: &Config) -> Self {
        Self {
            batch_size: cfg.match_batch_size.max(1),
            ..Self::default()
        }
    }

    fn retry_delay(&self, attempt: u32) -> Duration {
        let base = self.retry_base.saturating_mul(2u32.saturating_pow(attempt));
        if self.retry_jitter.is_zero() {
            return base;
        }
        let jitter = rand::thread_rng().gen_range(0.0..=self.retry_jitter.as_secs_f64());
        base + Duration::from_secs_f64(jitter)
    }
}

impl Default for DetailSettings {
    fn default() -> Self {
        Self {
            batch_size: 100,
            attempts: 3,
            retry_base: Duration::from_secs(1),
            retry_jitter: Duration::from_secs(1),
            batch_pause: Duration::from_secs(1),
        }
    }
}

#[derive(Debug)]
pub enum MatchOutcome {
    Fetched(Box<MatchDetail>),
    /// Already on disk; nothing was requested.
    AlreadySaved(PathBuf),
    NotFinished,
    /// 404 or no event in the response.
    Unavailable,
    Failed,
}

/// Tallies for one call of [`MatchDetailFetcher::fetch_matches_batch`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchOutcome {
    pub requested: usize,
    pub skipped: usize,
    pub succeeded: usize,
    pub not_finished: usize,
    pub unavailable: usize,
    pub failed: usize,
}

impl BatchOutcome {
    pub fn attempted(&self) -> usize {
        self.requested - self.skipped
    }

    pub fn success_rate(&self) -> f64 {
        match self.attempted() {
            0 => 0.0,
            n => self.succeeded as f64 / n as f64 * 100.0,
        }
    }

    fn record(&mut self, outcome: &MatchOutcome) {
        match outcome {
            MatchOutcome::Fetched(_) => self.succeeded += 1,
            MatchOutcome::AlreadySaved(_) => self.skipped += 1,
            MatchOutcome::NotFinished => self.not_finished += 1,
            MatchOutcome::Unavailable => self.unavailable += 1,
            MatchOutcome::Failed => self.failed += 1,
        }
    }
}

impl fmt::Display for BatchOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{} succeeded ({:.1}%)",
            self.succeeded,
            self.attempted(),
            self.success_rate()
        )
    }
}

#[derive(Debug, Default)]
pub struct BatchReport {
    pub details: BTreeMap<u64, MatchDetail>,
    pub outcome: BatchOutcome,
}

/// League and season folder names for a match, from its `basic` event.
pub fn detail_folders(basic: &Value) -> (String, String) {
    let league = nested_str(basic, &["tournament", "uniqueTournament", "name"])
        .filter(|n| !n.trim().is_empty())
        .map(safe_name)
        .unwrap_or_else(|| "Unknown_League".to_string());

    let non_empty = |keys: &[&str]| {
        nested(basic, keys)
            .map(cell)
            .filter(|s| !s.trim().is_empty())
    };
    let season = if let Some(name) = non_empty(&["season", "name"]) {
        format!("season_{}", safe_name(&name))
    } else if let Some(year) = non_empty(&["season", "year"]) {
        format!("season_{}", year.replace('/', "_"))
    } else {
        let id = non_empty(&["season", "id"]).unwrap_or_else(|| "unknown".into());
        format!("season_{id}")
    };
    (league, season)
}

pub struct MatchDetailFetcher<S> {
    source: S,
    layout: Layout,
    settings: DetailSettings,
}

impl<S: JsonSource> MatchDetailFetcher<S> {
    pub fn new(source: S, layout: Layout, settings: DetailSettings) -> Self {
        Self {
            source,
            layout,
            settings,
        }
    }

    pub fn layout(&self) -> &Layout {
        &self.layout
    }

    async fn sub_resource(&self, match_id: u64, endpoint: &str) -> Option<Value> {
        let path = format!("{}/{endpoint}", event_path(match_id));
        match self.source.get_json(&path).await {
            Ok(v) => Some(v),
            Err(e) => {
                debug!(match_id, resource = endpoint, error = %e, "sub-resource missing");
                None
            }
        }
    }

    /// `basic`, then the four sub-resources at once if the match is over.
    /// Sub-resource failures leave their field empty.
    async fn fetch_match(&self, match_id: u64) -> FetchResult<MatchOutcome> {
        let raw = self.source.get_json(&event_path(match_id)).await?;
        let Some(basic) = raw.get("event").filter(|e| e.is_object()).cloned() else {
            debug!(match_id, "response has no event");
            return Ok(MatchOutcome::Unavailable);
        };

        let event = Event::from_value(&basic);
        if !event.is_finished() {
            let status = event.status.unwrap_or_default();
            debug!(
                match_id,
                status = status.description.as_deref().unwrap_or(""),
                kind = status.kind.as_deref().unwrap_or(""),
                "match not finished, skipping"
            );
            return Ok(MatchOutcome::NotFinished);
        }

        let (statistics, team_streaks, pregame_form, h2h) = tokio::join!(
            self.sub_resource(match_id, "statistics"),
            self.sub_resource(match_id, "team-streaks"),
            self.sub_resource(match_id, "pregame-form"),
            self.sub_resource(match_id, "h2h"),
        );

        Ok(MatchOutcome::Fetched(Box::new(MatchDetail {
            basic,
            statistics,
            team_streaks,
            pregame_form,
            h2h,
        })))
    }

    /// One file per populated part, then `full_data.json`. The latter marks
    /// the match as saved, so it only lands once every part did.
    pub fn save_match_detail(&self, match_id: u64, detail: &MatchDetail) -> FetchResult<PathBuf> {
        let (league, season) = detail_folders(&detail.basic);
        let dir = self.layout.match_detail_dir(&league, &season, match_id);
        for (stem, value) in detail.parts() {
            write_json_pretty(&dir.join(format!("{stem}.json")), value)?;
        }
        write_json_pretty(&dir.join(tree::FULL_DATA), detail)?;
        info!(match_id, league = %league, season = %season, "match saved");
        Ok(dir)
    }

    /// Fetch and save one match, retrying unexpected failures with
    /// exponential backoff. Never returns an error; the outcome says what
    /// happened.
    pub async fn fetch_with_retry(&self, match_id: u64) -> MatchOutcome {
        let attempts = self.settings.attempts.max(1);
        for attempt in 0..attempts {
            let err = match self.fetch_match(match_id).await {
                Ok(MatchOutcome::Fetched(detail)) => {
                    return match self.save_match_detail(match_id, &detail) {
                        Ok(_) => MatchOutcome::Fetched(detail),
                        Err(e) => {
                            error!(match_id, error = %e, "saving match failed");
                            MatchOutcome::Failed
                        }
                    };
                }
                Ok(other) => return other,
                Err(e) => e,
            };

            match err {
                FetchError::NotFound { .. } => {
                    info!(match_id, "match not available");
                    return MatchOutcome::Unavailable;
                }
                FetchError::Parsing { .. } => {
                    error!(match_id, error = %err, "bad match payload");
                    return MatchOutcome::Failed;
                }
                _ if attempt + 1 < attempts => {
                    let wait = self.settings.retry_delay(attempt);
                    warn!(match_id, attempt = attempt + 1, wait_ms = wait.as_millis() as u64, error = %err, "match fetch failed, retrying");
                    sleep(wait).await;
                }
                _ => {
                    error!(match_id, attempts, error = %err, "match fetch failed, giving up");
                }
            }
        }
        MatchOutcome::Failed
    }

    /// Fetch every id not yet on disk, `batch_size` matches at a time with a
    /// pause in between.
    #[instrument(level = "info", skip(self, match_ids), fields(requested = match_ids.len()))]
    pub async fn fetch_matches_batch(&self, match_ids: &[u64]) -> BatchReport {
        let existing = tree::existing_match_ids(&self.layout.match_details_dir());
        let mut seen = HashSet::new();
        let todo: Vec<u64> = match_ids
            .iter()
            .copied()
            .filter(|id| seen.insert(*id))
            .filter(|id| !existing.contains(&id.to_string()))
            .collect();

        let mut report = BatchReport {
            details: BTreeMap::new(),
            outcome: BatchOutcome {
                requested: match_ids.len(),
                skipped: match_ids.len() - todo.len(),
                ..BatchOutcome::default()
            },
        };
        if report.outcome.skipped > 0 {
            info!(skipped = report.outcome.skipped, "matches already saved");
        }
        if todo.is_empty() {
            info!("nothing to fetch");
            return report;
        }

        let batch_size = self.settings.batch_size.max(1);
        let batches = todo.len().div_ceil(batch_size);
        for (i, batch) in todo.chunks(batch_size).enumerate() {
            info!(batch = i + 1, of = batches, size = batch.len(), "processing batch");
            let before = report.outcome.succeeded;

            let mut pending: FuturesUnordered<_> = batch
                .iter()
                .map(|&id| async move { (id, self.fetch_with_retry(id).await) })
                .collect();
            while let Some((id, outcome)) = pending.next().await {
                report.outcome.record(&outcome);
                if let MatchOutcome::Fetched(detail) = outcome {
                    report.details.insert(id, *detail);
                }
            }
            drop(pending);

            info!(
                batch = i + 1,
                succeeded = report.outcome.succeeded - before,
                size = batch.len(),
                "batch done"
            );
            if i + 1 < batches && !self.settings.batch_pause.is_zero() {
                sleep(self.settings.batch_pause).await;
            }
        }

        info!(
            not_finished = report.outcome.not_finished,
            unavailable = report.outcome.unavailable,
            failed = report.outcome.failed,
            "{}",
            report.outcome
        );
        report
    }

    /// Single match; a no-op when it is already saved.
    pub async fn fetch_match_details(&self, match_id: u64) -> MatchOutcome {
        let details_dir = self.layout.match_details_dir();
        if let Some(found) = tree::find_match_path(&details_dir, &match_id.to_string()) {
            info!(match_id, path = %found.path.display(), "match already saved");
            return MatchOutcome::AlreadySaved(found.path);
        }
        self.fetch_with_retry(match_id).await
    }

    /// Every match id listed in the CSVs under `matches/`, optionally for one
    /// league and its newest `max_seasons` seasons.
    pub async fn fetch_all_match_details(
        &self,
        league_id: Option<u32>,
        max_seasons: usize,
    ) -> Result<BatchOutcome> {
        let ids = ids::collect_match_ids(&self.layout.matches_dir(), league_id, max_seasons)?;
        info!(unique_ids = ids.len(), ?league_id, max_seasons, "match ids found");
        if ids.is_empty() {
            warn!("no match ids to fetch");
            return Ok(BatchOutcome::default());
        }
        Ok(self.fetch_matches_batch(&ids).await.outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::read_json;
    use crate::testing::{init_tracing, MockSource};
    use serde_json::json;
    use std::fs;
    use tempfile::tempdir;

    fn basic(id: u64, finished: bool) -> Value {
        let (desc, kind) = if finished {
            ("Ended", "finished")
        } else {
            ("2nd half", "inprogress")
        };
        json!({"event": {
            "id": id,
            "tournament": {"name": "Premier League", "uniqueTournament": {"id": 17, "name": "Premier League"}},
            "season": {"id": 61627, "name": "Premier League 24/25", "year": "24/25"},
            "homeTeam": {"id": 42, "name": "Arsenal"},
            "awayTeam": {"id": 17, "name": "Manchester City"},
            "status": {"code": 100, "description": desc, "type": kind}
        }})
    }

    fn with_match(mock: MockSource, id: u64) -> MockSource {
        mock.json(&event_path(id), basic(id, true))
            .json(&format!("/event/{id}/statistics"), json!({"statistics": []}))
            .json(&format!("/event/{id}/team-streaks"), json!({"general": []}))
            .json(&format!("/event/{id}/pregame-form"), json!({"homeTeam": {}}))
            .json(&format!("/event/{id}/h2h"), json!({"teamDuel": {"homeWins": 1}}))
    }

    fn fast() -> DetailSettings {
        DetailSettings {
            batch_size: 100,
            attempts: 3,
            retry_base: Duration::from_millis(1),
            retry_jitter: Duration::ZERO,
            batch_pause: Duration::ZERO,
        }
    }

    fn match_dir(root: &std::path::Path, id: u64) -> PathBuf {
        Layout::new(root).match_detail_dir("Premier_League", "season_Premier_League_24_25", id)
    }

    #[test]
    fn test_detail_folders_fallbacks() {
        let (league, season) = detail_folders(&basic(1, true)["event"]);
        assert_eq!(league, "Premier_League");
        assert_eq!(season, "season_Premier_League_24_25");

        let (league, season) = detail_folders(&json!({"season": {"year": "2024/2025", "id": 9}}));
        assert_eq!(league, "Unknown_League");
        assert_eq!(season, "season_2024_2025");
        assert_eq!(detail_folders(&json!({"season": {"id": 9}})).1, "season_9");
    }

    #[tokio::test]
    async fn test_full_match_saved_with_every_file() {
        init_tracing();
        let dir = tempdir().unwrap();
        let mock = with_match(MockSource::new(), 11);
        let fetcher = MatchDetailFetcher::new(&mock, Layout::new(dir.path()), fast());

        let report = fetcher.fetch_matches_batch(&[11]).await;
        assert_eq!(report.outcome.succeeded, 1);
        assert_eq!(report.outcome.to_string(), "1/1 succeeded (100.0%)");

        let m = match_dir(dir.path(), 11);
        for f in tree::REQUIRED_FILES {
            assert!(m.join(f).exists(), "{f} missing");
        }
        let full = read_json(&m.join("full_data.json")).unwrap();
        assert_eq!(full["h2h"]["teamDuel"]["homeWins"], 1);
        assert_eq!(full["basic"]["id"], 11);
    }

    #[tokio::test]
    async fn test_failed_sub_resource_degrades_to_null() {
        let dir = tempdir().unwrap();
        let mock = with_match(MockSource::new(), 12).status("/event/12/statistics", 500);
        let fetcher = MatchDetailFetcher::new(&mock, Layout::new(dir.path()), fast());

        let report = fetcher.fetch_matches_batch(&[12]).await;
        assert_eq!(report.outcome.succeeded, 1);
        assert!(report.details[&12].statistics.is_none());

        let m = match_dir(dir.path(), 12);
        let full = read_json(&m.join("full_data.json")).unwrap();
        assert_eq!(full["statistics"], Value::Null);
        assert!(full["team_streaks"].is_object());
        assert!(!m.join("statistics.json").exists());
        assert!(m.join("h2h.json").exists());
    }

    #[tokio::test]
    async fn test_unfinished_and_missing_matches() {
        let dir = tempdir().unwrap();
        let mock = MockSource::new()
            .json(&event_path(21), basic(21, false))
            .json(&event_path(23), json!({"error": {"code": 404}}));
        let fetcher = MatchDetailFetcher::new(&mock, Layout::new(dir.path()), fast());

        let report = fetcher.fetch_matches_batch(&[21, 22, 23]).await;
        assert_eq!(report.outcome.not_finished, 1);
        assert_eq!(report.outcome.unavailable, 2);
        assert_eq!(report.outcome.to_string(), "0/3 succeeded (0.0%)");
        // not retried, sub-resources never requested
        assert_eq!(mock.hits(&event_path(22)), 1);
        assert_eq!(mock.hits("/event/21/statistics"), 0);
        assert!(!Layout::new(dir.path()).match_details_dir().exists());
    }

    #[tokio::test]
    async fn test_transient_failures_are_retried() {
        let dir = tempdir().unwrap();
        let mock = with_match(MockSource::new(), 31).fail_times(&event_path(31), 2);
        let fetcher = MatchDetailFetcher::new(&mock, Layout::new(dir.path()), fast());

        assert!(matches!(fetcher.fetch_with_retry(31).await, MatchOutcome::Fetched(_)));
        assert_eq!(mock.hits(&event_path(31)), 3);

        let hopeless = MockSource::new().status(&event_path(32), 503);
        let fetcher = MatchDetailFetcher::new(&hopeless, Layout::new(dir.path()), fast());
        assert!(matches!(fetcher.fetch_with_retry(32).await, MatchOutcome::Failed));
        assert_eq!(hopeless.hits(&event_path(32)), 3);
    }

    #[tokio::test]
    async fn test_second_run_is_free_and_identical() {
        let dir = tempdir().unwrap();
        let mock = with_match(MockSource::new(), 41);
        let fetcher = MatchDetailFetcher::new(&mock, Layout::new(dir.path()), fast());

        fetcher.fetch_matches_batch(&[41]).await;
        let full = match_dir(dir.path(), 41).join("full_data.json");
        let first = fs::read_to_string(&full).unwrap();
        let calls = mock.total_hits();

        let again = fetcher.fetch_matches_batch(&[41, 41]).await;
        assert_eq!(again.outcome.skipped, 2);
        assert_eq!(again.outcome.attempted(), 0);
        assert_eq!(mock.total_hits(), calls);
        assert_eq!(fs::read_to_string(&full).unwrap(), first);

        assert!(matches!(
            fetcher.fetch_match_details(41).await,
            MatchOutcome::AlreadySaved(_)
        ));
        assert_eq!(mock.total_hits(), calls);
    }

    #[tokio::test]
    async fn test_failed_save_is_fetched_again() {
        let dir = tempdir().unwrap();
        let mock = with_match(MockSource::new(), 61);
        let fetcher = MatchDetailFetcher::new(&mock, Layout::new(dir.path()), fast());
        let m = match_dir(dir.path(), 61);
        let blocker = m.join("statistics.json");
        fs::create_dir_all(&blocker).unwrap();

        let first = fetcher.fetch_matches_batch(&[61]).await;
        assert_eq!(first.outcome.failed, 1);
        assert!(!m.join("full_data.json").exists());

        fs::remove_dir(&blocker).unwrap();
        let second = fetcher.fetch_matches_batch(&[61]).await;
        assert_eq!(second.outcome.skipped, 0);
        assert_eq!(second.outcome.succeeded, 1);
        assert!(blocker.is_file());
        assert!(m.join("full_data.json").is_file());
    }

    #[tokio::test]
    async fn test_batches_do_not_overlap() {
        let dir = tempdir().unwrap();
        let mut mock = MockSource::new().with_delay(Duration::from_millis(5));
        let ids: Vec<u64> = (100..125).collect();
        for &id in &ids {
            mock = with_match(mock, id);
        }
        let settings = DetailSettings {
            batch_size: 10,
            ..fast()
        };
        let fetcher = MatchDetailFetcher::new(&mock, Layout::new(dir.path()), settings);

        let report = fetcher.fetch_matches_batch(&ids).await;
        assert_eq!(report.outcome.succeeded, 25);
        assert_eq!(report.details.len(), 25);
        // basic, then at most four sub-resources per match of one batch
        assert!(mock.max_in_flight() <= 10 * 4);
    }

    #[tokio::test]
    async fn test_fetch_all_reads_ids_from_csv() {
        let dir = tempdir().unwrap();
        let layout = Layout::new(dir.path());
        let season = layout.season_matches_dir(17, "Premier League", 61627, "Premier League 24/25");
        fs::create_dir_all(&season).unwrap();
        fs::write(season.join("round_1_matches.csv"), "match_id,home_team\n51,Arsenal\n52,Chelsea\n").unwrap();

        let mock = with_match(with_match(MockSource::new(), 51), 52);
        let fetcher = MatchDetailFetcher::new(&mock, layout, fast());
        let outcome = fetcher.fetch_all_match_details(Some(17), 0).await.unwrap();
        assert_eq!(outcome.succeeded, 2);
        assert!(fetcher.fetch_all_match_details(Some(8), 0).await.is_err());
    }
}
