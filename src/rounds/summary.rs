// src/rounds/summary.rs
//
// Flat CSV views of round data: per round, per season, and one global file
// that accumulates across runs.

use chrono::DateTime;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::{
    collections::{BTreeMap, HashMap},
    path::Path,
};
use tracing::{debug, info, warn};

use super::{filter::infer_rounds_from_dates, RoundResult, SeasonFetch};
use crate::error::{FetchError, FetchResult};
use crate::json::{cell, nested, nested_i64, nested_str, nested_u64};
use crate::store::{ensure_dir, write_json_pretty, Layout};

fn format_ts(ts: Option<i64>, fmt: &str) -> String {
    ts.and_then(|t| DateTime::from_timestamp(t, 0))
        .map(|d| d.format(fmt).to_string())
        .unwrap_or_default()
}

fn csv_err(path: &Path, e: csv::Error) -> FetchError {
    FetchError::io(path, e.into())
}

/// Serialize `rows` to `path` with a header from the row type.
fn write_rows<T: Serialize>(path: &Path, rows: &[T]) -> FetchResult<()> {
    if let Some(parent) = path.parent() {
        ensure_dir(parent)?;
    }
    let mut wtr = csv::Writer::from_path(path).map_err(|e| csv_err(path, e))?;
    for row in rows {
        wtr.serialize(row).map_err(|e| csv_err(path, e))?;
    }
    wtr.flush().map_err(|e| FetchError::io(path, e))
}

#[derive(Debug, Serialize)]
struct RoundMatchRow {
    match_id: Option<u64>,
    home_team: String,
    away_team: String,
    home_team_id: Option<u64>,
    away_team_id: Option<u64>,
    home_score: Option<i64>,
    away_score: Option<i64>,
    round: String,
    status: Option<String>,
    status_type: Option<String>,
    start_timestamp: Option<i64>,
    start_time: String,
    slug: Option<String>,
}

impl RoundMatchRow {
    fn from_event(e: &Value) -> Self {
        let s = |keys: &[&str]| nested_str(e, keys).map(str::to_string);
        Self {
            match_id: nested_u64(e, &["id"]),
            home_team: s(&["homeTeam", "name"]).unwrap_or_else(|| "Unknown".into()),
            away_team: s(&["awayTeam", "name"]).unwrap_or_else(|| "Unknown".into()),
            home_team_id: nested_u64(e, &["homeTeam", "id"]),
            away_team_id: nested_u64(e, &["awayTeam", "id"]),
            home_score: nested_i64(e, &["homeScore", "current"]),
            away_score: nested_i64(e, &["awayScore", "current"]),
            round: nested(e, &["roundInfo", "round"]).map(cell).unwrap_or_default(),
            status: s(&["status", "description"]),
            status_type: s(&["status", "type"]),
            start_timestamp: nested_i64(e, &["startTimestamp"]),
            start_time: format_ts(nested_i64(e, &["startTimestamp"]), "%Y-%m-%d %H:%M:%S"),
            slug: s(&["slug"]),
        }
    }
}

/// `round_{n}_matches.csv`. Returns `false`, writing nothing, when there
/// are no events.
pub fn write_round_csv(path: &Path, events: &[Value]) -> FetchResult<bool> {
    if events.is_empty() {
        return Ok(false);
    }
    let rows: Vec<_> = events.iter().map(RoundMatchRow::from_event).collect();
    write_rows(path, &rows)?;
    Ok(true)
}

/// Events paired with a round label. Results that carry no round number get
/// theirs inferred from match dates across the whole set.
fn labelled_events(results: &[RoundResult]) -> Vec<(String, Value)> {
    let mut out = Vec::new();
    let mut loose = Vec::new();
    for r in results {
        for e in r.events() {
            match r.round {
                Some(n) => out.push((n.to_string(), e.clone())),
                None => loose.push(e.clone()),
            }
        }
    }
    if !loose.is_empty() {
        infer_rounds_from_dates(&mut loose);
        for e in loose {
            let label = nested(&e, &["roundInfo", "round"]).map(cell).unwrap_or_default();
            out.push((label, e));
        }
    }
    out
}

#[derive(Debug, Serialize)]
struct SeasonRow {
    round: String,
    match_id: String,
    home_team: String,
    away_team: String,
    home_score: i64,
    away_score: i64,
    match_date: String,
    status: String,
    tournament: String,
    season: String,
}

fn warn_duplicate_rounds(league_id: u32, season_id: u64, results: &[RoundResult]) {
    let mut seen: HashMap<u32, usize> = HashMap::new();
    for n in results.iter().filter_map(|r| r.round) {
        let count = seen.entry(n).or_default();
        *count += 1;
        if *count == 2 {
            warn!(league_id, season_id, round = n, "round fetched more than once");
        }
    }
}

/// `{season}_summary.json` (the round payloads) and `{season}_summary.csv`
/// (one row per match). Nothing is written for an empty result set.
pub fn save_season_summary(
    layout: &Layout,
    run: &SeasonFetch,
) -> FetchResult<()> {
    if run.rounds.is_empty() {
        debug!(league_id = run.league_id, season_id = run.season_id, "no rounds, no summary");
        return Ok(());
    }
    warn_duplicate_rounds(run.league_id, run.season_id, &run.rounds);

    let json_path =
        layout.season_summary_json(run.league_id, &run.league_name, run.season_id, &run.season_name);
    let payloads: Vec<&Value> = run.rounds.iter().map(|r| &r.data).collect();
    write_json_pretty(&json_path, &payloads)?;

    let rows: Vec<SeasonRow> = labelled_events(&run.rounds)
        .into_iter()
        .map(|(round, e)| SeasonRow {
            round,
            match_id: nested(&e, &["id"]).map(cell).unwrap_or_default(),
            home_team: nested_str(&e, &["homeTeam", "name"]).unwrap_or_default().to_string(),
            away_team: nested_str(&e, &["awayTeam", "name"]).unwrap_or_default().to_string(),
            home_score: nested_i64(&e, &["homeScore", "current"]).unwrap_or(0),
            away_score: nested_i64(&e, &["awayScore", "current"]).unwrap_or(0),
            match_date: format_ts(nested_i64(&e, &["startTimestamp"]), "%Y-%m-%d %H:%M"),
            status: nested_str(&e, &["status", "description"]).unwrap_or_default().to_string(),
            tournament: nested_str(&e, &["tournament", "name"]).unwrap_or_default().to_string(),
            season: nested_str(&e, &["season", "name"]).unwrap_or_default().to_string(),
        })
        .collect();

    let csv_path =
        layout.season_summary_csv(run.league_id, &run.league_name, run.season_id, &run.season_name);
    if rows.is_empty() {
        warn!(path = %csv_path.display(), "season has no matches, csv summary skipped");
    } else {
        write_rows(&csv_path, &rows)?;
    }
    info!(
        league_id = run.league_id,
        season_id = run.season_id,
        rounds = run.rounds.len(),
        matches = rows.len(),
        "season summary saved"
    );
    Ok(())
}

/// One line of `fetch_summary.csv`. Everything is text so rows written by
/// older runs always load back.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GlobalRow {
    pub league_id: String,
    pub league_name: String,
    pub season_id: String,
    pub season_name: String,
    pub round: String,
    pub match_id: String,
    pub home_team: String,
    pub away_team: String,
    pub home_score: String,
    pub away_score: String,
    pub match_date: String,
    pub status: String,
}

impl GlobalRow {
    fn key(&self) -> (String, String) {
        (self.league_id.clone(), self.match_id.clone())
    }
}

fn global_rows(run: &SeasonFetch) -> Vec<GlobalRow> {
    labelled_events(&run.rounds)
        .into_iter()
        .map(|(round, e)| GlobalRow {
            league_id: run.league_id.to_string(),
            league_name: run.league_name.clone(),
            season_id: run.season_id.to_string(),
            season_name: run.season_name.clone(),
            round,
            match_id: nested(&e, &["id"]).map(cell).unwrap_or_default(),
            home_team: nested_str(&e, &["homeTeam", "name"]).unwrap_or_default().to_string(),
            away_team: nested_str(&e, &["awayTeam", "name"]).unwrap_or_default().to_string(),
            home_score: nested_i64(&e, &["homeScore", "current"]).unwrap_or(0).to_string(),
            away_score: nested_i64(&e, &["awayScore", "current"]).unwrap_or(0).to_string(),
            match_date: format_ts(nested_i64(&e, &["startTimestamp"]), "%Y-%m-%d %H:%M"),
            status: nested_str(&e, &["status", "description"]).unwrap_or_default().to_string(),
        })
        .collect()
}

fn read_global_rows(path: &Path) -> Vec<GlobalRow> {
    if !path.exists() {
        return Vec::new();
    }
    let mut rdr = match csv::Reader::from_path(path) {
        Ok(r) => r,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "cannot read previous global summary");
            return Vec::new();
        }
    };
    let mut rows = Vec::new();
    for (i, rec) in rdr.deserialize::<GlobalRow>().enumerate() {
        match rec {
            Ok(row) => rows.push(row),
            Err(e) => warn!(row = i + 1, error = %e, "dropping unreadable global summary row"),
        }
    }
    rows
}

/// Rewrite `fetch_summary.json` for this run and merge this run's matches
/// into `fetch_summary.csv`. Rows are keyed by league and match id; a newer
/// row replaces an older one in place. Returns the CSV row count.
pub fn save_global_summary(layout: &Layout, runs: &[SeasonFetch]) -> FetchResult<usize> {
    let mut by_league = Map::new();
    for run in runs {
        by_league.insert(
            run.league_id.to_string(),
            json!({
                "league_name": run.league_name,
                "season_id": run.season_id,
                "season_name": run.season_name,
                "rounds": run.rounds.iter().map(|r| &r.data).collect::<Vec<_>>(),
            }),
        );
    }
    write_json_pretty(&layout.global_summary_json(), &Value::Object(by_league))?;

    let csv_path = layout.global_summary_csv();
    let mut rows = read_global_rows(&csv_path);
    let previous = rows.len();
    let mut index: BTreeMap<(String, String), usize> =
        rows.iter().enumerate().map(|(i, r)| (r.key(), i)).collect();

    for row in runs.iter().flat_map(global_rows) {
        match index.get(&row.key()) {
            Some(&i) => rows[i] = row,
            None => {
                index.insert(row.key(), rows.len());
                rows.push(row);
            }
        }
    }

    if rows.is_empty() {
        warn!("no matches for the global summary");
        return Ok(0);
    }
    write_rows(&csv_path, &rows)?;
    info!(path = %csv_path.display(), previous, total = rows.len(), "global summary saved");
    Ok(rows.len())
}
