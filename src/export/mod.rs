// src/export/mod.rs
//
// Saved match details to flat CSV datasets under
// `match_details/processed/`.

pub mod flatten;

use anyhow::{Context, Result};
use chrono::Utc;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;
use std::{
    collections::BTreeMap,
    path::{Path, PathBuf},
};
use tracing::{debug, info, instrument, warn};

use crate::details::ids::collect_match_ids;
use crate::details::tree::{discover_matches, find_match_path, MatchLocation};
use crate::json::cell;
use crate::store::{ensure_dir, read_json, Layout};
use flatten::{column_order, flatten_match, Row};

static NON_WORD: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^\w]").expect("static regex"));

/// File stem safe on every platform: non-word characters become `_`.
pub fn safe_file_stem(name: &str) -> String {
    NON_WORD.replace_all(name, "_").into_owned()
}

fn league_key(row: &Row) -> String {
    ["league_folder", "tournament_name"]
        .iter()
        .filter_map(|k| row.get(*k).and_then(Value::as_str))
        .find(|s| !s.is_empty())
        .unwrap_or("Unknown")
        .to_string()
}

pub fn write_rows(path: &Path, rows: &[Row]) -> Result<()> {
    let columns = column_order(rows);
    let mut wtr = csv::Writer::from_path(path)
        .with_context(|| format!("creating {}", path.display()))?;
    wtr.write_record(&columns)?;
    for row in rows {
        wtr.write_record(
            columns
                .iter()
                .map(|c| row.get(c).map(cell).unwrap_or_default()),
        )?;
    }
    wtr.flush()
        .with_context(|| format!("writing {}", path.display()))?;
    Ok(())
}

pub struct CsvExporter {
    layout: Layout,
}

impl CsvExporter {
    pub fn new(layout: Layout) -> Self {
        Self { layout }
    }

    fn load(&self, loc: &MatchLocation) -> Option<Row> {
        let Some(detail) = read_json(&loc.full_data()) else {
            warn!(match_id = %loc.match_id, path = %loc.path.display(), "unreadable match data, skipping");
            return None;
        };
        Some(flatten_match(
            &loc.match_id,
            &detail,
            loc.league_folder.as_deref(),
            loc.season_folder.as_deref(),
        ))
    }

    fn locate(&self, match_ids: Option<&[u64]>) -> Vec<MatchLocation> {
        let details_dir = self.layout.match_details_dir();
        let Some(ids) = match_ids else {
            return discover_matches(&details_dir);
        };
        ids.iter()
            .filter_map(|id| {
                let found = find_match_path(&details_dir, &id.to_string());
                if found.is_none() {
                    warn!(match_id = id, "no saved data for match");
                }
                found
            })
            .collect()
    }

    /// Flatten the given matches (every saved match when `None`) into
    /// `all_matches_{ts}.csv`, or one `{League}_{ts}.csv` per league when
    /// `separate_by_league`. Returns the files written; empty when nothing
    /// was found.
    #[instrument(level = "info", skip(self, match_ids), fields(requested = match_ids.map(<[u64]>::len)))]
    pub fn create_csv_dataset(
        &self,
        match_ids: Option<&[u64]>,
        separate_by_league: bool,
    ) -> Result<Vec<PathBuf>> {
        let locations = self.locate(match_ids);
        info!(matches = locations.len(), "converting matches");
        let rows: Vec<Row> = locations.iter().filter_map(|l| self.load(l)).collect();
        if rows.is_empty() {
            warn!("no match data to export");
            return Ok(Vec::new());
        }

        let out_dir = self.layout.processed_dir();
        ensure_dir(&out_dir)?;
        let ts = Utc::now().timestamp();

        if !separate_by_league {
            let path = out_dir.join(format!("all_matches_{ts}.csv"));
            write_rows(&path, &rows)?;
            info!(rows = rows.len(), path = %path.display(), "csv written");
            return Ok(vec![path]);
        }

        let mut by_league: BTreeMap<String, Vec<Row>> = BTreeMap::new();
        for row in rows {
            by_league.entry(league_key(&row)).or_default().push(row);
        }
        let mut paths = Vec::with_capacity(by_league.len());
        for (league, rows) in &by_league {
            let path = out_dir.join(format!("{}_{ts}.csv", safe_file_stem(league)));
            write_rows(&path, rows)?;
            info!(league = %league, rows = rows.len(), path = %path.display(), "csv written");
            paths.push(path);
        }
        Ok(paths)
    }

    /// Per-league files for the matches listed under one league's
    /// `matches/{id}_*` folder.
    pub fn convert_league_matches_to_csv(&self, league_id: u32) -> Result<Vec<PathBuf>> {
        let ids = collect_match_ids(&self.layout.matches_dir(), Some(league_id), 0)?;
        debug!(league_id, ids = ids.len(), "match ids for export");
        if ids.is_empty() {
            warn!(league_id, "league has no match ids");
            return Ok(Vec::new());
        }
        self.create_csv_dataset(Some(&ids), true)
    }

    pub fn convert_all_matches_to_csv(&self) -> Result<Vec<PathBuf>> {
        self.create_csv_dataset(None, true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::fs;
    use tempfile::tempdir;

    fn save(dir: &Path, detail: Value) {
        fs::create_dir_all(dir).unwrap();
        fs::write(dir.join("full_data.json"), detail.to_string()).unwrap();
    }

    fn detail(league: &str, home: &str) -> Value {
        json!({
            "basic": {
                "tournament": {"uniqueTournament": {"name": league}},
                "homeTeam": {"name": home},
                "homeScore": {"normaltime": 1}
            },
            "statistics": null,
            "team_streaks": {"general": [{"team": "home", "name": "Wins", "value": "2", "continued": true}]},
            "pregame_form": null,
            "h2h": null
        })
    }

    fn fixture() -> (tempfile::TempDir, Layout) {
        let tmp = tempdir().unwrap();
        let layout = Layout::new(tmp.path());
        let md = layout.match_details_dir();
        save(&md.join("Premier_League").join("season_PL_24_25").join("1"), detail("Premier League", "Arsenal"));
        save(&md.join("Premier_League").join("season_PL_24_25").join("2"), detail("Premier League", "Chelsea"));
        save(&md.join("LaLiga").join("season_LL_24_25").join("3"), detail("LaLiga", "Sevilla"));
        // flat layout, league comes from the data
        save(&md.join("4"), detail("Serie A", "Roma"));
        (tmp, layout)
    }

    fn read(path: &Path) -> Vec<Vec<String>> {
        let mut rdr = csv::ReaderBuilder::new().has_headers(false).from_path(path).unwrap();
        rdr.records().map(|r| r.unwrap().iter().map(String::from).collect()).collect()
    }

    #[test]
    fn test_all_matches_in_one_file() {
        let (_tmp, layout) = fixture();
        let paths = CsvExporter::new(layout.clone()).create_csv_dataset(None, false).unwrap();
        assert_eq!(paths.len(), 1);
        let name = paths[0].file_name().unwrap().to_str().unwrap();
        assert!(name.starts_with("all_matches_") && name.ends_with(".csv"));
        assert!(paths[0].starts_with(layout.processed_dir()));

        let rows = read(&paths[0]);
        assert_eq!(rows.len(), 5);
        let header = &rows[0];
        assert_eq!(&header[..3], ["match_id", "league_folder", "season_folder"]);
        let cont = header.iter().position(|c| c == "home_streak_wins_continued").unwrap();
        assert!(rows[1..].iter().all(|r| r[cont] == "true"));
        let flat = rows.iter().find(|r| r[0] == "4").unwrap();
        assert_eq!(flat[1], "");
    }

    #[test]
    fn test_separate_by_league_and_selected_ids() {
        let (_tmp, layout) = fixture();
        let exporter = CsvExporter::new(layout);

        let paths = exporter.create_csv_dataset(None, true).unwrap();
        let names: Vec<String> = paths
            .iter()
            .map(|p| p.file_name().unwrap().to_str().unwrap().split('_').next().unwrap().to_string())
            .collect();
        assert_eq!(names, ["LaLiga", "Premier", "Serie"]);

        let pl = paths.iter().find(|p| p.to_str().unwrap().contains("Premier_League_")).unwrap();
        assert_eq!(read(pl).len(), 3);

        let some = exporter.create_csv_dataset(Some(&[3, 99][..]), false).unwrap();
        let rows = read(&some[0]);
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1][0], "3");
        assert_eq!(rows[1][2], "LL_24_25");
    }

    #[test]
    fn test_columns_cover_every_row() {
        let tmp = tempdir().unwrap();
        let layout = Layout::new(tmp.path());
        let season = layout.match_details_dir().join("Premier_League").join("season_PL_24_25");
        let mut with_stats = detail("Premier League", "Arsenal");
        with_stats["statistics"] = json!({"statistics": [{"period": "ALL", "groups": [
            {"statisticsItems": [{"key": "possession", "homeValue": 55, "awayValue": 45}]}
        ]}]});
        save(&season.join("1"), with_stats);
        save(&season.join("2"), detail("Premier League", "Chelsea"));

        let paths = CsvExporter::new(layout).create_csv_dataset(None, false).unwrap();
        let rows = read(&paths[0]);
        assert_eq!(rows.len(), 3);
        let col = rows[0].iter().position(|c| c == "home_possession").unwrap();
        let arsenal = rows.iter().find(|r| r[0] == "1").unwrap();
        let chelsea = rows.iter().find(|r| r[0] == "2").unwrap();
        assert_eq!(arsenal[col], "55");
        assert_eq!(chelsea[col], "");
        assert!(rows.iter().all(|r| r.len() == rows[0].len()));
    }

    #[test]
    fn test_nothing_to_export() {
        let tmp = tempdir().unwrap();
        let exporter = CsvExporter::new(Layout::new(tmp.path()));
        assert!(exporter.create_csv_dataset(None, false).unwrap().is_empty());
        assert!(!Layout::new(tmp.path()).processed_dir().exists());
    }

    #[test]
    fn test_safe_file_stem() {
        assert_eq!(safe_file_stem("Série A / Italy"), "Série_A___Italy");
        assert_eq!(safe_file_stem("Premier_League"), "Premier_League");
    }
}
