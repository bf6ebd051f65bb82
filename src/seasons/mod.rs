// src/seasons/mod.rs

pub mod year;

use anyhow::{Context, Result};
use chrono::{Local, NaiveDate};
use futures::{stream::FuturesUnordered, StreamExt};
use serde_json::Value;
use std::{
    collections::{BTreeMap, HashMap},
    fs,
    path::Path,
    sync::Arc,
};
use tokio::sync::Semaphore;
use tracing::{debug, error, info, instrument, warn};

use crate::config::LeagueRegistry;
use crate::error::{FetchError, FetchResult};
use crate::fetch::{BlockingApiClient, JsonSource};
use crate::store::{read_json, write_json_pretty, Layout};
use crate::types::Season;
use year::{classify, season_start_year, sortable_year_value, SeasonPhase};

pub fn seasons_path(league_id: u32) -> String {
    format!("/unique-tournament/{league_id}/seasons")
}

fn parse_seasons(url: &str, raw: &Value) -> FetchResult<Vec<Season>> {
    let list = raw.get("seasons").cloned().ok_or_else(|| FetchError::Parsing {
        url: url.to_string(),
        message: "response has no `seasons` array".into(),
    })?;
    serde_json::from_value(list).map_err(|e| FetchError::Parsing {
        url: url.to_string(),
        message: e.to_string(),
    })
}

/// Newest first by season year. Stable, so API order breaks ties.
pub fn sort_newest_first(seasons: &mut [Season]) {
    seasons.sort_by(|a, b| sortable_year_value(&b.year).total_cmp(&sortable_year_value(&a.year)));
}

/// Known seasons per league, backed by `seasons/*.json`.
pub struct SeasonDirectory {
    layout: Layout,
    leagues: Arc<LeagueRegistry>,
    league_seasons: HashMap<u32, Vec<Season>>,
}

impl SeasonDirectory {
    /// Loads whatever earlier runs persisted.
    pub fn new(layout: Layout, leagues: Arc<LeagueRegistry>) -> Self {
        let mut dir = Self {
            layout,
            leagues,
            league_seasons: HashMap::new(),
        };
        dir.load_existing();
        dir
    }

    pub fn layout(&self) -> &Layout {
        &self.layout
    }

    pub fn leagues(&self) -> &LeagueRegistry {
        &self.leagues
    }

    /// In-memory seasons for a league, as last fetched or loaded.
    pub fn seasons(&self, league_id: u32) -> &[Season] {
        self.league_seasons
            .get(&league_id)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn league_count(&self) -> usize {
        self.league_seasons.len()
    }

    fn load_existing(&mut self) {
        let pattern = self.layout.seasons_dir().join("*_seasons.json");
        let entries = match glob::glob(&pattern.to_string_lossy()) {
            Ok(paths) => paths.filter_map(|p| p.ok()).collect::<Vec<_>>(),
            Err(e) => {
                warn!(error = %e, "bad seasons glob");
                Vec::new()
            }
        };

        for path in entries {
            let Some(league_id) = path
                .file_name()
                .and_then(|n| n.to_str())
                .and_then(|n| n.split('_').next())
                .and_then(|id| id.parse::<u32>().ok())
            else {
                continue;
            };
            let Some(raw) = read_json(&path) else {
                warn!(path = %path.display(), "unreadable seasons file");
                continue;
            };
            match parse_seasons(&path.to_string_lossy(), &raw) {
                Ok(seasons) => {
                    self.league_seasons.insert(league_id, seasons);
                }
                Err(e) => warn!(path = %path.display(), error = %e, "skipping seasons file"),
            }
        }

        if self.league_seasons.is_empty() {
            let csv_path = self.layout.league_seasons_csv();
            if csv_path.exists() {
                match load_seasons_csv(&csv_path) {
                    Ok(map) => self.league_seasons = map,
                    Err(e) => error!(path = %csv_path.display(), error = %e, "loading seasons csv"),
                }
            }
        }

        let total: usize = self.league_seasons.values().map(Vec::len).sum();
        info!(leagues = self.league_seasons.len(), seasons = total, "season data loaded");
    }

    /// Persist a raw `/seasons` response and replace the in-memory entry.
    pub fn record_seasons(&mut self, league_id: u32, raw: &Value) -> FetchResult<Vec<Season>> {
        let league_name = self.leagues.name_or_default(league_id);
        let seasons = parse_seasons(&seasons_path(league_id), raw)?;
        write_json_pretty(&self.layout.seasons_file(league_id, &league_name), raw)?;
        info!(league_id, league = %league_name, count = seasons.len(), "seasons found");
        self.league_seasons.insert(league_id, seasons.clone());
        Ok(seasons)
    }

    pub async fn fetch_seasons<S: JsonSource>(
        &mut self,
        source: &S,
        league_id: u32,
    ) -> FetchResult<Vec<Season>> {
        info!(league_id, "fetching seasons");
        let raw = source.get_json(&seasons_path(league_id)).await?;
        self.record_seasons(league_id, &raw)
    }

    pub fn fetch_seasons_blocking(
        &mut self,
        client: &BlockingApiClient,
        league_id: u32,
    ) -> FetchResult<Vec<Season>> {
        info!(league_id, "fetching seasons (blocking)");
        let raw = client.fetch_json(&seasons_path(league_id))?;
        self.record_seasons(league_id, &raw)
    }

    /// Fetch several leagues at once; the map is updated after all complete.
    #[instrument(level = "info", skip(self, source, league_ids), fields(leagues = league_ids.len()))]
    pub async fn fetch_seasons_batch<S: JsonSource>(
        &mut self,
        source: &S,
        league_ids: &[u32],
        max_concurrent: usize,
    ) -> BTreeMap<u32, Vec<Season>> {
        let sem = Arc::new(Semaphore::new(max_concurrent.max(1)));

        let mut pending: FuturesUnordered<_> = league_ids
            .iter()
            .map(|&league_id| {
                let sem = sem.clone();
                async move {
                    let path = seasons_path(league_id);
                    let res = match sem.acquire_owned().await {
                        Ok(_permit) => source.get_json(&path).await,
                        Err(e) => Err(FetchError::network(&path, e)),
                    };
                    (league_id, res)
                }
            })
            .collect();

        let mut fetched = Vec::with_capacity(league_ids.len());
        while let Some((league_id, res)) = pending.next().await {
            match res {
                Ok(raw) => fetched.push((league_id, raw)),
                Err(e) => error!(league_id, error = %e, "season fetch failed"),
            }
        }
        drop(pending);

        let mut out = BTreeMap::new();
        for (league_id, raw) in fetched {
            match self.record_seasons(league_id, &raw) {
                Ok(seasons) => {
                    out.insert(league_id, seasons);
                }
                Err(e) => error!(league_id, error = %e, "storing seasons failed"),
            }
        }
        out
    }

    /// Every configured league, then `league_seasons.csv`.
    pub async fn fetch_all_leagues_seasons<S: JsonSource>(
        &mut self,
        source: &S,
        max_concurrent: usize,
    ) -> Result<BTreeMap<u32, Vec<Season>>> {
        let ids = self.leagues.ids();
        if ids.is_empty() {
            warn!("no leagues configured");
            return Ok(BTreeMap::new());
        }
        let fetched = self.fetch_seasons_batch(source, &ids, max_concurrent).await;
        self.save_seasons_csv()?;
        info!(requested = ids.len(), fetched = fetched.len(), "league seasons refreshed");
        Ok(fetched)
    }

    pub fn save_seasons_csv(&self) -> Result<()> {
        let path = self.layout.league_seasons_csv();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| format!("creating {}", parent.display()))?;
        }
        let mut wtr = csv::Writer::from_path(&path)
            .with_context(|| format!("opening {}", path.display()))?;
        wtr.write_record(["League Name", "League ID", "Season ID", "Season Name", "Season Year"])?;

        let mut ids: Vec<_> = self.league_seasons.keys().copied().collect();
        ids.sort_unstable();
        for league_id in ids {
            let name = self.leagues.name_or_default(league_id);
            for s in self.seasons(league_id) {
                wtr.write_record(&[
                    name.clone(),
                    league_id.to_string(),
                    s.id.to_string(),
                    s.name.clone(),
                    s.year.clone(),
                ])?;
            }
        }
        wtr.flush()?;
        info!(path = %path.display(), "league seasons csv written");
        Ok(())
    }

    /// Seasons from the persisted file (current or legacy name), falling
    /// back to memory.
    pub fn seasons_for_league(&self, league_id: u32) -> Vec<Season> {
        let name = self.leagues.name_or_default(league_id);
        let primary = self.layout.seasons_file(league_id, &name);
        let candidates = std::iter::once(primary).chain(self.layout.legacy_seasons_files(league_id, &name));

        for path in candidates {
            if let Some(raw) = read_json(&path) {
                match parse_seasons(&path.to_string_lossy(), &raw) {
                    Ok(list) => return list,
                    Err(e) => warn!(path = %path.display(), error = %e, "bad seasons file"),
                }
            }
        }
        self.seasons(league_id).to_vec()
    }

    pub fn season_info(&self, league_id: u32, season_id: u64) -> Option<Season> {
        let found = self
            .seasons(league_id)
            .iter()
            .find(|s| s.id == season_id)
            .cloned()
            .or_else(|| {
                self.seasons_for_league(league_id)
                    .into_iter()
                    .find(|s| s.id == season_id)
            });
        if found.is_none() {
            debug!(league_id, season_id, "season not known");
        }
        found
    }

    /// Display name, `Season_{id}` when unknown.
    pub fn season_name(&self, league_id: u32, season_id: u64) -> String {
        self.season_info(league_id, season_id)
            .map(|s| s.name)
            .filter(|n| !n.is_empty())
            .unwrap_or_else(|| format!("Season_{season_id}"))
    }

    /// Round files or a season summary already on disk.
    pub fn has_persisted_matches(&self, league_id: u32, season: &Season) -> bool {
        let league_name = self.leagues.name_or_default(league_id);
        let season_dir = self
            .layout
            .season_matches_dir(league_id, &league_name, season.id, &season.name);
        let summary = self
            .layout
            .season_summary_json(league_id, &league_name, season.id, &season.name);
        summary.exists() || has_round_files(&season_dir)
    }

    pub fn get_current_season_id(&self, league_id: u32) -> Option<u64> {
        self.current_season_id_at(league_id, Local::now().date_naive())
    }

    /// Best guess at the league's current season as of `today`:
    /// active with data, past with data, any active, then newest overall.
    pub fn current_season_id_at(&self, league_id: u32, today: NaiveDate) -> Option<u64> {
        let mut seasons = self.seasons_for_league(league_id);
        if seasons.is_empty() {
            error!(league_id, "no seasons known");
            return None;
        }
        sort_newest_first(&mut seasons);

        let mut active = Vec::new();
        let mut past = Vec::new();
        for (idx, s) in seasons.iter().enumerate() {
            let phase = classify(season_start_year(&s.year, &s.name), idx, today);
            debug!(league_id, season_id = s.id, year = %s.year, ?phase, "classified");
            match phase {
                SeasonPhase::Active => active.push(s),
                SeasonPhase::Past => past.push(s),
                SeasonPhase::Future => {}
            }
        }

        let chosen = active
            .iter()
            .find(|s| self.has_persisted_matches(league_id, s))
            .map(|s| (s, "active with data"))
            .or_else(|| {
                past.iter()
                    .find(|s| self.has_persisted_matches(league_id, s))
                    .map(|s| (s, "past with data"))
            })
            .or_else(|| active.first().map(|s| (s, "newest active")))
            .map(|(s, why)| (s.id, s.name.as_str(), why))
            .unwrap_or_else(|| (seasons[0].id, seasons[0].name.as_str(), "newest overall"));

        info!(league_id, season_id = chosen.0, season = %chosen.1, reason = chosen.2, "current season");
        Some(chosen.0)
    }

    /// The season after `season_id` in newest-first order.
    pub fn previous_season(&self, league_id: u32, season_id: u64) -> Option<Season> {
        let mut seasons = self.seasons_for_league(league_id);
        sort_newest_first(&mut seasons);
        let idx = seasons.iter().position(|s| s.id == season_id)?;
        seasons.get(idx + 1).cloned()
    }
}

fn has_round_files(season_dir: &Path) -> bool {
    let pattern = season_dir.join("round_*.json");
    glob::glob(&pattern.to_string_lossy())
        .map(|mut paths| paths.any(|p| p.is_ok()))
        .unwrap_or(false)
}

fn load_seasons_csv(path: &Path) -> Result<HashMap<u32, Vec<Season>>> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .from_path(path)
        .with_context(|| format!("opening {}", path.display()))?;
    let headers = rdr.headers()?.clone();
    let col = |name: &str| headers.iter().position(|h| h == name);
    let (Some(lid), Some(sid), Some(sname), Some(syear)) = (
        col("League ID"),
        col("Season ID"),
        col("Season Name"),
        col("Season Year"),
    ) else {
        anyhow::bail!("unexpected header in {}", path.display());
    };

    let mut map: HashMap<u32, Vec<Season>> = HashMap::new();
    for (i, rec) in rdr.records().enumerate() {
        let rec = rec?;
        let parsed = rec
            .get(lid)
            .and_then(|v| v.trim().parse::<u32>().ok())
            .zip(rec.get(sid).and_then(|v| v.trim().parse::<u64>().ok()));
        let Some((league_id, season_id)) = parsed else {
            warn!(row = i + 1, "skipping seasons csv row");
            continue;
        };
        map.entry(league_id).or_default().push(Season {
            id: season_id,
            name: rec.get(sname).unwrap_or_default().to_string(),
            year: rec.get(syear).unwrap_or_default().to_string(),
        });
    }
    info!(leagues = map.len(), path = %path.display(), "seasons loaded from csv");
    Ok(map)
}
