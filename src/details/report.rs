// src/details/report.rs
//
// Completeness of the match-detail tree: which of the expected files each
// saved match has, rolled up per season and league.

use anyhow::{Context, Result};
use serde::Serialize;
use std::{collections::BTreeMap, path::PathBuf};
use tracing::info;

use super::tree::{subdirs, PROCESSED_DIR, REQUIRED_FILES};
use crate::store::{ensure_dir, write_json_pretty, Layout};

/// Percent with two decimals; zero when there is nothing to count.
fn rate(part: usize, total: usize) -> f64 {
    if total == 0 {
        return 0.0;
    }
    (part as f64 / total as f64 * 10_000.0).round() / 100.0
}

#[derive(Debug, Clone, Default, Serialize, PartialEq)]
pub struct Completeness {
    pub total_matches: usize,
    pub complete_matches: usize,
    pub completion_rate: f64,
    pub missing_files: BTreeMap<String, usize>,
}

impl Completeness {
    fn record(&mut self, missing: &[&str]) {
        self.total_matches += 1;
        if missing.is_empty() {
            self.complete_matches += 1;
        }
        for f in missing {
            *self.missing_files.entry((*f).to_string()).or_default() += 1;
        }
    }

    fn finish(&mut self) {
        self.completion_rate = rate(self.complete_matches, self.total_matches);
    }
}

#[derive(Debug, Clone, Default, Serialize, PartialEq)]
pub struct LeagueStats {
    #[serde(flatten)]
    pub totals: Completeness,
    pub seasons: BTreeMap<String, Completeness>,
}

#[derive(Debug, Clone, Serialize)]
pub struct FileReport {
    pub league_stats: BTreeMap<String, LeagueStats>,
    pub overall_stats: Completeness,
    #[serde(skip)]
    pub json_report_path: PathBuf,
    #[serde(skip)]
    pub csv_report_path: PathBuf,
}

/// Scan `match_details/{league}/season_*/{match_id}/` and write
/// `match_files_stats.json` and `match_files_report.csv` under `processed/`.
pub fn generate_file_report(layout: &Layout) -> Result<FileReport> {
    let root = layout.match_details_dir();
    let mut overall = Completeness::default();
    let mut leagues: BTreeMap<String, LeagueStats> = BTreeMap::new();

    for (league, league_path) in subdirs(&root) {
        if league == PROCESSED_DIR {
            continue;
        }
        let stats = leagues.entry(league.clone()).or_default();
        for (season, season_path) in subdirs(&league_path) {
            if !season.starts_with("season_") {
                continue;
            }
            let season_stats = stats.seasons.entry(season.clone()).or_default();
            for (_, match_path) in subdirs(&season_path) {
                let missing: Vec<&str> = REQUIRED_FILES
                    .iter()
                    .copied()
                    .filter(|f| !match_path.join(f).exists())
                    .collect();
                overall.record(&missing);
                stats.totals.record(&missing);
                season_stats.record(&missing);
            }
        }
    }

    overall.finish();
    for stats in leagues.values_mut() {
        stats.totals.finish();
        stats.seasons.values_mut().for_each(Completeness::finish);
    }

    let out_dir = layout.processed_dir();
    ensure_dir(&out_dir)?;
    let json_report_path = out_dir.join("match_files_stats.json");
    let csv_report_path = out_dir.join("match_files_report.csv");

    let mut report = FileReport {
        league_stats: leagues,
        overall_stats: overall,
        json_report_path: PathBuf::new(),
        csv_report_path: PathBuf::new(),
    };
    write_json_pretty(&json_report_path, &report)?;

    let mut wtr = csv::Writer::from_path(&csv_report_path)
        .with_context(|| format!("opening {}", csv_report_path.display()))?;
    wtr.write_record([
        "League",
        "Season",
        "Total Matches",
        "Complete Matches",
        "Completion Rate",
        "Missing Files",
    ])?;
    for (league, stats) in &report.league_stats {
        for (season, s) in &stats.seasons {
            let missing = s
                .missing_files
                .iter()
                .map(|(f, n)| format!("{f}: {n}"))
                .collect::<Vec<_>>()
                .join("; ");
            wtr.write_record([
                league.clone(),
                season.clone(),
                s.total_matches.to_string(),
                s.complete_matches.to_string(),
                format!("{}%", s.completion_rate),
                missing,
            ])?;
        }
    }
    wtr.flush()?;

    info!(
        matches = report.overall_stats.total_matches,
        complete = report.overall_stats.complete_matches,
        rate = report.overall_stats.completion_rate,
        json = %json_report_path.display(),
        csv = %csv_report_path.display(),
        "file report written"
    );
    report.json_report_path = json_report_path;
    report.csv_report_path = csv_report_path;
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::{fs, path::Path};
    use tempfile::tempdir;

    fn write_files(dir: &Path, files: &[&str]) {
        fs::create_dir_all(dir).unwrap();
        for f in files {
            fs::write(dir.join(f), "{}").unwrap();
        }
    }

    #[test]
    fn test_report_counts_missing_files() {
        let tmp = tempdir().unwrap();
        let layout = Layout::new(tmp.path());
        let season = layout.match_details_dir().join("Premier_League").join("season_PL_24_25");
        write_files(&season.join("1"), &REQUIRED_FILES);
        write_files(&season.join("2"), &["full_data.json", "basic.json", "h2h.json"]);
        write_files(&season.join("3"), &REQUIRED_FILES);

        let report = generate_file_report(&layout).unwrap();
        assert_eq!(report.overall_stats.total_matches, 3);
        assert_eq!(report.overall_stats.complete_matches, 2);
        assert_eq!(report.overall_stats.completion_rate, 66.67);
        assert_eq!(report.overall_stats.missing_files.get("statistics.json"), Some(&1));
        assert!(!report.league_stats.contains_key(PROCESSED_DIR));

        let csv = fs::read_to_string(&report.csv_report_path).unwrap();
        let row = csv.lines().nth(1).unwrap();
        assert!(row.starts_with("Premier_League,season_PL_24_25,3,2,66.67%,"));
        assert!(row.contains("team_streaks.json: 1"));

        let json: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&report.json_report_path).unwrap()).unwrap();
        assert_eq!(json["league_stats"]["Premier_League"]["total_matches"], 3);
    }

    #[test]
    fn test_rate() {
        assert_eq!(rate(0, 0), 0.0);
        assert_eq!(rate(1, 3), 33.33);
        assert_eq!(rate(3, 3), 100.0);
    }
}
