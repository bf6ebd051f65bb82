// src/rounds/mod.rs
//
// Per-season round fetching. Every round of a season is requested at once,
// bounded by a semaphore; rounds already on disk are reused without a
// network call.

pub mod filter;
pub mod summary;

pub use filter::{filter_finished, infer_rounds_from_dates, is_empty_round};

use anyhow::{Context, Result};
use chrono::{Local, NaiveDate};
use futures::{stream::FuturesUnordered, StreamExt};
use serde_json::{json, Value};
use std::{
    collections::BTreeMap,
    fs,
    path::{Path, PathBuf},
};
use tokio::sync::Semaphore;
use tracing::{debug, error, info, instrument, warn};

use crate::config::Config;
use crate::error::FetchResult;
use crate::fetch::JsonSource;
use crate::seasons::{
    year::{looks_unstarted, season_start_year},
    SeasonDirectory,
};
use crate::store::{read_json, round_csv_file, round_full_file, round_legacy_file, write_json_pretty};
use crate::types::Event;

/// A season picked by mistake before it kicked off gets one retry on the
/// season before it.
const MAX_SEASON_ATTEMPTS: u32 = 2;

pub fn round_path(league_id: u32, season_id: u64, round: u32) -> String {
    format!("/unique-tournament/{league_id}/season/{season_id}/events/round/{round}")
}

#[derive(Debug, Clone, Copy)]
pub struct RoundSettings {
    pub max_concurrent: usize,
    pub max_round: u32,
    pub fetch_only_finished: bool,
    pub save_empty_rounds: bool,
}

impl RoundSettings {
    pub fn from_config(cfg: &Config) -> Self {
        Self {
            max_concurrent: cfg.max_concurrent,
            max_round: cfg.max_round,
            fetch_only_finished: cfg.fetch_only_finished,
            save_empty_rounds: cfg.save_empty_rounds,
        }
    }
}

impl Default for RoundSettings {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

/// One round's payload as persisted, with counts for logging.
#[derive(Debug, Clone, PartialEq)]
pub struct RoundResult {
    pub round: Option<u32>,
    pub total_events: usize,
    pub finished_count: usize,
    pub from_disk: bool,
    pub data: Value,
}

impl RoundResult {
    fn saved(round: Option<u32>, data: Value) -> Self {
        let events = data.get("events").and_then(Value::as_array);
        let total_events = events.map_or(0, Vec::len);
        let finished_count = events.map_or(0, |ev| {
            ev.iter().filter(|e| Event::from_value(e).is_finished()).count()
        });
        Self {
            round: round.or_else(|| round_of(&data)),
            total_events,
            finished_count,
            from_disk: true,
            data,
        }
    }

    pub fn events(&self) -> &[Value] {
        self.data
            .get("events")
            .and_then(Value::as_array)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }
}

/// `round` as written into saved payloads, number or numeric string.
fn round_of(data: &Value) -> Option<u32> {
    match data.get("round")? {
        Value::Number(n) => n.as_u64().and_then(|n| u32::try_from(n).ok()),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Where a season's rounds came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeasonOrigin {
    Network,
    RoundFiles,
    Summary,
}

/// Every round kept for one league season.
#[derive(Debug, Clone)]
pub struct SeasonFetch {
    pub league_id: u32,
    pub league_name: String,
    pub season_id: u64,
    pub season_name: String,
    pub rounds: Vec<RoundResult>,
    pub origin: SeasonOrigin,
}

impl SeasonFetch {
    pub fn match_count(&self) -> usize {
        self.rounds.iter().map(|r| r.events().len()).sum()
    }
}

struct Target {
    league_id: u32,
    league_name: String,
    season_id: u64,
    season_name: String,
    dir: PathBuf,
}

/// Saved rounds in `dir`, preferring `round_{n}_full.json` over the older
/// `round_{n}.json`. Unreadable and empty rounds are left out.
fn saved_rounds(dir: &Path) -> Vec<RoundResult> {
    let pattern = dir.join("round_*.json");
    let Ok(paths) = glob::glob(&pattern.to_string_lossy()) else {
        return Vec::new();
    };

    let mut by_round: BTreeMap<u32, PathBuf> = BTreeMap::new();
    for path in paths.filter_map(|p| p.ok()) {
        let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
            continue;
        };
        let Some(num) = stem.strip_prefix("round_") else {
            continue;
        };
        let (num, full) = match num.strip_suffix("_full") {
            Some(n) => (n, true),
            None => (num, false),
        };
        let Ok(n) = num.parse::<u32>() else {
            continue;
        };
        if full || !by_round.contains_key(&n) {
            by_round.insert(n, path);
        }
    }

    by_round
        .into_iter()
        .filter_map(|(n, path)| match read_json(&path) {
            Some(data) if !is_empty_round(&data) => Some(RoundResult::saved(Some(n), data)),
            Some(_) => None,
            None => {
                warn!(path = %path.display(), "skipping unreadable round file");
                None
            }
        })
        .collect()
}

pub struct RoundFetcher<S> {
    source: S,
    settings: RoundSettings,
}

impl<S: JsonSource> RoundFetcher<S> {
    pub fn new(source: S, settings: RoundSettings) -> Self {
        Self { source, settings }
    }

    pub fn settings(&self) -> &RoundSettings {
        &self.settings
    }

    fn target(&self, seasons: &SeasonDirectory, league_id: u32, season_id: u64) -> Target {
        let league_name = seasons.leagues().name_or_default(league_id);
        let season_name = seasons.season_name(league_id, season_id);
        let dir = seasons
            .layout()
            .season_matches_dir(league_id, &league_name, season_id, &season_name);
        Target {
            league_id,
            league_name,
            season_id,
            season_name,
            dir,
        }
    }

    /// `Some(outcome)` when a saved file settles the round. Corrupt files
    /// are removed so the round is fetched again.
    fn load_saved_round(&self, target: &Target, round: u32) -> Option<Option<RoundResult>> {
        for path in [
            round_full_file(&target.dir, round),
            round_legacy_file(&target.dir, round),
        ] {
            if !path.exists() {
                continue;
            }
            match read_json(&path) {
                Some(data) if is_empty_round(&data) => {
                    debug!(league_id = target.league_id, round, "saved round is empty");
                    return Some(None);
                }
                Some(data) => {
                    debug!(league_id = target.league_id, round, path = %path.display(), "reusing saved round");
                    return Some(Some(RoundResult::saved(Some(round), data)));
                }
                None => {
                    warn!(path = %path.display(), "empty or corrupt round file, fetching again");
                    if let Err(e) = fs::remove_file(&path) {
                        warn!(path = %path.display(), error = %e, "could not remove round file");
                    }
                }
            }
        }
        None
    }

    fn save_round(&self, target: &Target, round: u32, data: &Value) -> FetchResult<()> {
        write_json_pretty(&round_full_file(&target.dir, round), data)?;
        let events = data
            .get("events")
            .and_then(Value::as_array)
            .map(Vec::as_slice)
            .unwrap_or(&[]);
        if !summary::write_round_csv(&round_csv_file(&target.dir, round), events)? {
            warn!(league = %target.league_name, round, "no finished matches to write to csv");
        }
        Ok(())
    }

    async fn fetch_and_save_round(
        &self,
        target: &Target,
        gate: &Semaphore,
        round: u32,
    ) -> Option<RoundResult> {
        if let Some(saved) = self.load_saved_round(target, round) {
            return saved;
        }

        let path = round_path(target.league_id, target.season_id, round);
        let fetched = match gate.acquire().await {
            Ok(_permit) => self.source.get_json(&path).await,
            Err(e) => {
                error!(round, error = %e, "round gate closed");
                return None;
            }
        };
        let data = match fetched {
            Ok(data) => data,
            Err(e) if e.is_not_found() => {
                debug!(league = %target.league_name, round, "round not found, season probably ends earlier");
                return None;
            }
            Err(e) => {
                error!(league = %target.league_name, round, error = %e, "round fetch failed");
                return None;
            }
        };

        if is_empty_round(&data) {
            debug!(league = %target.league_name, round, "empty round");
            if self.settings.save_empty_rounds {
                if let Err(e) = write_json_pretty(&round_full_file(&target.dir, round), &data) {
                    error!(round, error = %e, "saving empty round failed");
                }
            }
            return None;
        }

        let (filtered, total, finished) = filter_finished(&data);
        let mut to_save = if self.settings.fetch_only_finished {
            filtered
        } else {
            data
        };
        if let Some(obj) = to_save.as_object_mut() {
            obj.insert("round".into(), json!(round));
        }

        if finished == 0 {
            info!(league = %target.league_name, round, total, "no finished matches in round");
            if self.settings.fetch_only_finished {
                if self.settings.save_empty_rounds {
                    if let Err(e) = write_json_pretty(&round_full_file(&target.dir, round), &to_save) {
                        error!(round, error = %e, "saving empty round failed");
                    }
                }
                return None;
            }
        }

        if let Err(e) = self.save_round(target, round, &to_save) {
            error!(league = %target.league_name, round, error = %e, "saving round failed");
            return None;
        }
        info!(league = %target.league_name, season = %target.season_name, round, total, finished, "round saved");

        Some(RoundResult {
            round: Some(round),
            total_events: total,
            finished_count: finished,
            from_disk: false,
            data: to_save,
        })
    }

    /// Fetch and persist a single round.
    pub async fn fetch_round(
        &self,
        seasons: &SeasonDirectory,
        league_id: u32,
        season_id: u64,
        round: u32,
    ) -> Option<RoundResult> {
        let target = self.target(seasons, league_id, season_id);
        let gate = Semaphore::new(1);
        self.fetch_and_save_round(&target, &gate, round).await
    }

    /// Rounds `1..=max_round` with data, sorted by round. Missing rounds and
    /// failures are logged and left out.
    #[instrument(level = "info", skip(self, seasons), fields(max_round = self.settings.max_round))]
    pub async fn fetch_all_rounds(
        &self,
        seasons: &SeasonDirectory,
        league_id: u32,
        season_id: u64,
    ) -> Vec<RoundResult> {
        let target = self.target(seasons, league_id, season_id);
        info!(
            league = %target.league_name,
            season = %target.season_name,
            limit = self.settings.max_concurrent,
            "fetching rounds"
        );

        let gate = Semaphore::new(self.settings.max_concurrent.max(1));
        let mut pending: FuturesUnordered<_> = (1..=self.settings.max_round)
            .map(|n| self.fetch_and_save_round(&target, &gate, n))
            .collect();

        let mut results = Vec::new();
        while let Some(res) = pending.next().await {
            if let Some(r) = res {
                results.push(r);
            }
        }
        drop(pending);

        results.sort_by_key(|r| r.round);
        let from_disk = results.iter().filter(|r| r.from_disk).count();
        info!(
            league = %target.league_name,
            season = %target.season_name,
            rounds = results.len(),
            from_disk,
            of = self.settings.max_round,
            "rounds done"
        );
        results
    }

    /// All rounds of a season plus its summary files. When nothing comes back
    /// and the season looks like it has not started, the previous season is
    /// tried instead.
    pub async fn fetch_all_matches_for_season(
        &self,
        seasons: &SeasonDirectory,
        league_id: u32,
        season_id: u64,
    ) -> Option<SeasonFetch> {
        self.fetch_season_at(seasons, league_id, season_id, Local::now().date_naive())
            .await
    }

    async fn fetch_season_at(
        &self,
        seasons: &SeasonDirectory,
        league_id: u32,
        mut season_id: u64,
        today: NaiveDate,
    ) -> Option<SeasonFetch> {
        for attempt in 0..MAX_SEASON_ATTEMPTS {
            let rounds = self.fetch_all_rounds(seasons, league_id, season_id).await;
            let target = self.target(seasons, league_id, season_id);

            if !rounds.is_empty() {
                let run = SeasonFetch {
                    league_id,
                    league_name: target.league_name,
                    season_id,
                    season_name: target.season_name,
                    rounds,
                    origin: SeasonOrigin::Network,
                };
                if let Err(e) = summary::save_season_summary(seasons.layout(), &run) {
                    error!(league_id, season_id, error = %e, "saving season summary failed");
                }
                info!(league = %run.league_name, season = %run.season_name, rounds = run.rounds.len(), "season fetched");
                return Some(run);
            }

            warn!(league = %target.league_name, season = %target.season_name, "no matches found");
            let start_year = seasons
                .season_info(league_id, season_id)
                .and_then(|s| season_start_year(&s.year, &s.name))
                .or_else(|| season_start_year("", &target.season_name));
            if !start_year.is_some_and(|y| looks_unstarted(y, today)) {
                return None;
            }
            if attempt + 1 >= MAX_SEASON_ATTEMPTS {
                warn!(league_id, season_id, "season fallback exhausted");
                break;
            }
            match seasons.previous_season(league_id, season_id) {
                Some(prev) => {
                    info!(league_id, from = season_id, to = prev.id, season = %prev.name, "season not started yet, trying the previous one");
                    season_id = prev.id;
                }
                None => {
                    warn!(league_id, season_id, "no earlier season to fall back to");
                    break;
                }
            }
        }
        None
    }

    /// Current season when `season_id` is `None`. Existing summaries are
    /// returned as-is; round files without a summary get one rebuilt; only
    /// then is the network used.
    pub async fn fetch_matches_for_season(
        &self,
        seasons: &SeasonDirectory,
        league_id: u32,
        season_id: Option<u64>,
    ) -> Result<Option<SeasonFetch>> {
        let season_id = match season_id {
            Some(id) => id,
            None => seasons
                .get_current_season_id(league_id)
                .with_context(|| format!("no current season for league {league_id}"))?,
        };
        let target = self.target(seasons, league_id, season_id);
        let layout = seasons.layout();
        let summary_json =
            layout.season_summary_json(league_id, &target.league_name, season_id, &target.season_name);
        let summary_csv =
            layout.season_summary_csv(league_id, &target.league_name, season_id, &target.season_name);

        if summary_json.exists() && summary_csv.exists() {
            info!(path = %summary_json.display(), "season summary already on disk");
            let rounds = read_json(&summary_json)
                .and_then(|v| v.as_array().cloned())
                .unwrap_or_default()
                .into_iter()
                .map(|data| RoundResult::saved(None, data))
                .collect();
            return Ok(Some(SeasonFetch {
                league_id,
                league_name: target.league_name,
                season_id,
                season_name: target.season_name,
                rounds,
                origin: SeasonOrigin::Summary,
            }));
        }

        let saved = saved_rounds(&target.dir);
        if !saved.is_empty() {
            let run = SeasonFetch {
                league_id,
                league_name: target.league_name,
                season_id,
                season_name: target.season_name,
                rounds: saved,
                origin: SeasonOrigin::RoundFiles,
            };
            summary::save_season_summary(layout, &run).context("rebuilding season summary")?;
            info!(league_id, season_id, rounds = run.rounds.len(), "season summary rebuilt from round files");
            return Ok(Some(run));
        }

        info!(league_id, season_id, "nothing on disk, fetching season");
        Ok(self
            .fetch_all_matches_for_season(seasons, league_id, season_id)
            .await)
    }

    /// Current season of every configured league, then the global summary.
    pub async fn fetch_all_leagues_current_season(
        &self,
        seasons: &SeasonDirectory,
    ) -> Result<Vec<SeasonFetch>> {
        let leagues: Vec<_> = seasons.leagues().iter().collect();
        if leagues.is_empty() {
            warn!("no leagues configured");
            return Ok(Vec::new());
        }

        let mut runs = Vec::new();
        for league in leagues {
            let Some(season_id) = seasons.get_current_season_id(league.id) else {
                warn!(league_id = league.id, league = %league.name, "no current season, skipping");
                continue;
            };
            match self
                .fetch_all_matches_for_season(seasons, league.id, season_id)
                .await
            {
                Some(run) => runs.push(run),
                None => warn!(league_id = league.id, season_id, "no data for current season"),
            }
        }

        let rows = summary::save_global_summary(seasons.layout(), &runs)
            .context("writing global summary")?;
        info!(leagues = runs.len(), rows, "all leagues updated");
        Ok(runs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LeagueRegistry;
    use crate::store::Layout;
    use crate::testing::{init_tracing, MockSource};
    use std::{sync::Arc, time::Duration};
    use tempfile::tempdir;

    fn ev(id: u64, finished: bool) -> Value {
        let (desc, kind) = if finished {
            ("Ended", "finished")
        } else {
            ("Not started", "notstarted")
        };
        json!({
            "id": id,
            "homeTeam": {"id": 1, "name": "Arsenal"},
            "awayTeam": {"id": 2, "name": "Chelsea"},
            "status": {"description": desc, "type": kind},
            "startTimestamp": 1716130800
        })
    }

    fn directory(root: &Path) -> SeasonDirectory {
        let leagues = Arc::new(LeagueRegistry::from_pairs([(17, "Premier League")]));
        let mut sd = SeasonDirectory::new(Layout::new(root), leagues);
        sd.record_seasons(
            17,
            &json!({"seasons": [
                {"id": 100, "name": "Premier League 25/26", "year": "25/26"},
                {"id": 90, "name": "Premier League 24/25", "year": "24/25"}
            ]}),
        )
        .unwrap();
        sd
    }

    fn settings(max_round: u32) -> RoundSettings {
        RoundSettings {
            max_concurrent: 2,
            max_round,
            fetch_only_finished: true,
            save_empty_rounds: false,
        }
    }

    fn season_dir(root: &Path, season_id: u64, name: &str) -> PathBuf {
        Layout::new(root).season_matches_dir(17, "Premier League", season_id, name)
    }

    #[tokio::test]
    async fn test_round_keeps_finished_and_writes_csv() {
        init_tracing();
        let dir = tempdir().unwrap();
        let sd = directory(dir.path());
        let mock = MockSource::new().json(
            &round_path(17, 90, 1),
            json!({"events": [ev(1, true), ev(2, false), ev(3, true)], "hasNextPage": false}),
        );
        let fetcher = RoundFetcher::new(&mock, settings(3));

        let r = fetcher.fetch_round(&sd, 17, 90, 1).await.unwrap();
        assert_eq!((r.total_events, r.finished_count), (3, 2));
        assert!(!r.from_disk);

        let season = season_dir(dir.path(), 90, "Premier League 24/25");
        let saved = read_json(&round_full_file(&season, 1)).unwrap();
        assert_eq!(saved["events"].as_array().unwrap().len(), 2);
        assert_eq!(saved["round"], json!(1));
        let csv = fs::read_to_string(round_csv_file(&season, 1)).unwrap();
        assert_eq!(csv.lines().count(), 3);
    }

    #[tokio::test]
    async fn test_saved_rounds_skip_network() {
        let dir = tempdir().unwrap();
        let sd = directory(dir.path());
        let season = season_dir(dir.path(), 90, "Premier League 24/25");
        write_json_pretty(&round_full_file(&season, 1), &json!({"events": [ev(1, true)]})).unwrap();
        write_json_pretty(&round_legacy_file(&season, 2), &json!({"events": []})).unwrap();

        let mock = MockSource::new().json(&round_path(17, 90, 3), json!({"events": [ev(3, true)]}));
        let fetcher = RoundFetcher::new(&mock, settings(3));
        let results = fetcher.fetch_all_rounds(&sd, 17, 90).await;

        assert_eq!(results.iter().map(|r| r.round).collect::<Vec<_>>(), vec![Some(1), Some(3)]);
        assert!(results[0].from_disk);
        assert_eq!(mock.hits(&round_path(17, 90, 1)), 0);
        assert_eq!(mock.hits(&round_path(17, 90, 2)), 0);
        assert_eq!(mock.total_hits(), 1);
    }

    #[tokio::test]
    async fn test_corrupt_round_is_refetched() {
        let dir = tempdir().unwrap();
        let sd = directory(dir.path());
        let season = season_dir(dir.path(), 90, "Premier League 24/25");
        fs::create_dir_all(&season).unwrap();
        fs::write(round_full_file(&season, 1), "{\"events\": [").unwrap();

        let mock = MockSource::new().json(&round_path(17, 90, 1), json!({"events": [ev(1, true)]}));
        let fetcher = RoundFetcher::new(&mock, settings(1));
        let r = fetcher.fetch_round(&sd, 17, 90, 1).await.unwrap();

        assert!(!r.from_disk);
        assert_eq!(mock.hits(&round_path(17, 90, 1)), 1);
        assert!(read_json(&round_full_file(&season, 1)).is_some());
    }

    #[tokio::test]
    async fn test_empty_and_missing_rounds_are_not_saved() {
        let dir = tempdir().unwrap();
        let sd = directory(dir.path());
        let mock = MockSource::new()
            .json(&round_path(17, 90, 1), json!({"events": [], "hasNextPage": false}))
            .json(&round_path(17, 90, 2), json!({"events": [ev(5, false)]}))
            .status(&round_path(17, 90, 3), 500);
        let fetcher = RoundFetcher::new(&mock, settings(4));

        assert!(fetcher.fetch_all_rounds(&sd, 17, 90).await.is_empty());
        assert!(!season_dir(dir.path(), 90, "Premier League 24/25").exists());

        let keep = RoundFetcher::new(
            &mock,
            RoundSettings {
                save_empty_rounds: true,
                ..settings(1)
            },
        );
        assert!(keep.fetch_round(&sd, 17, 90, 1).await.is_none());
        let season = season_dir(dir.path(), 90, "Premier League 24/25");
        assert!(round_full_file(&season, 1).exists());
    }

    #[tokio::test]
    async fn test_round_concurrency_is_bounded() {
        let dir = tempdir().unwrap();
        let sd = directory(dir.path());
        let mut mock = MockSource::new().with_delay(Duration::from_millis(10));
        for n in 1..=12 {
            mock = mock.json(&round_path(17, 90, n), json!({"events": [ev(u64::from(n), true)]}));
        }
        let fetcher = RoundFetcher::new(&mock, settings(12));

        let results = fetcher.fetch_all_rounds(&sd, 17, 90).await;
        assert_eq!(results.len(), 12);
        assert!(mock.max_in_flight() <= 2);
    }

    #[tokio::test]
    async fn test_unstarted_season_falls_back_once() {
        let dir = tempdir().unwrap();
        let sd = directory(dir.path());
        let mock = MockSource::new().json(&round_path(17, 90, 2), json!({"events": [ev(7, true)]}));
        let fetcher = RoundFetcher::new(&mock, settings(3));

        let july = NaiveDate::from_ymd_opt(2025, 7, 1).unwrap();
        let run = fetcher.fetch_season_at(&sd, 17, 100, july).await.unwrap();
        assert_eq!(run.season_id, 90);
        assert_eq!(run.match_count(), 1);
        assert!(Layout::new(dir.path())
            .season_summary_csv(17, "Premier League", 90, "Premier League 24/25")
            .exists());

        // Started season with no data: no fallback.
        let october = NaiveDate::from_ymd_opt(2025, 10, 1).unwrap();
        assert!(fetcher.fetch_season_at(&sd, 17, 100, october).await.is_none());
    }

    #[tokio::test]
    async fn test_summary_rebuilt_from_round_files() {
        let dir = tempdir().unwrap();
        let sd = directory(dir.path());
        let season = season_dir(dir.path(), 90, "Premier League 24/25");
        write_json_pretty(&round_full_file(&season, 1), &json!({"events": [ev(1, true)], "round": 1})).unwrap();
        write_json_pretty(&round_full_file(&season, 2), &json!({"events": [ev(2, true)], "round": 2})).unwrap();

        let mock = MockSource::new();
        let fetcher = RoundFetcher::new(&mock, settings(3));

        let run = fetcher.fetch_matches_for_season(&sd, 17, Some(90)).await.unwrap().unwrap();
        assert_eq!(run.origin, SeasonOrigin::RoundFiles);
        assert_eq!(run.match_count(), 2);
        assert_eq!(mock.total_hits(), 0);

        let again = fetcher.fetch_matches_for_season(&sd, 17, Some(90)).await.unwrap().unwrap();
        assert_eq!(again.origin, SeasonOrigin::Summary);
        assert_eq!(again.rounds[1].round, Some(2));
    }

    #[tokio::test]
    async fn test_all_leagues_writes_global_summary() {
        let dir = tempdir().unwrap();
        let sd = directory(dir.path());
        let mut mock = MockSource::new();
        for season in [100, 90] {
            mock = mock.json(&round_path(17, season, 1), json!({"events": [ev(season, true)]}));
        }
        let fetcher = RoundFetcher::new(&mock, settings(2));

        let runs = fetcher.fetch_all_leagues_current_season(&sd).await.unwrap();
        assert_eq!(runs.len(), 1);
        let csv = fs::read_to_string(Layout::new(dir.path()).global_summary_csv()).unwrap();
        assert_eq!(csv.lines().count(), 2);
        assert!(csv.lines().nth(1).unwrap().starts_with("17,Premier League,"));
    }
}
