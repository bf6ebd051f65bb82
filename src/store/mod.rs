// src/store/mod.rs
//
// On-disk layout. File existence is the only record of what has been
// fetched, so every path used for skip checks is built here.

use serde::Serialize;
use std::{
    fs,
    path::{Path, PathBuf},
};

use crate::error::{FetchError, FetchResult};

/// Spaces and slashes become underscores; everything else is kept.
pub fn safe_name(name: &str) -> String {
    name.trim().replace([' ', '/'], "_")
}

#[derive(Debug, Clone)]
pub struct Layout {
    root: PathBuf,
}

impl Layout {
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn seasons_dir(&self) -> PathBuf {
        self.root.join("seasons")
    }

    pub fn matches_dir(&self) -> PathBuf {
        self.root.join("matches")
    }

    pub fn match_details_dir(&self) -> PathBuf {
        self.root.join("match_details")
    }

    pub fn processed_dir(&self) -> PathBuf {
        self.match_details_dir().join("processed")
    }

    pub fn league_seasons_csv(&self) -> PathBuf {
        self.root.join("league_seasons.csv")
    }

    pub fn global_summary_json(&self) -> PathBuf {
        self.root.join("fetch_summary.json")
    }

    pub fn global_summary_csv(&self) -> PathBuf {
        self.root.join("fetch_summary.csv")
    }

    /// `seasons/{id}_{League_Name}_seasons.json`
    pub fn seasons_file(&self, league_id: u32, league_name: &str) -> PathBuf {
        self.seasons_dir()
            .join(format!("{league_id}_{}_seasons.json", safe_name(league_name)))
    }

    /// Older names tried when the current one is missing.
    pub fn legacy_seasons_files(&self, league_id: u32, league_name: &str) -> [PathBuf; 2] {
        [
            self.seasons_dir()
                .join(format!("{league_id}_{league_name}_seasons.json")),
            self.seasons_dir().join(format!("{league_name}_seasons.json")),
        ]
    }

    pub fn league_matches_dir(&self, league_id: u32, league_name: &str) -> PathBuf {
        self.matches_dir()
            .join(format!("{league_id}_{}", safe_name(league_name)))
    }

    pub fn season_matches_dir(
        &self,
        league_id: u32,
        league_name: &str,
        season_id: u64,
        season_name: &str,
    ) -> PathBuf {
        self.league_matches_dir(league_id, league_name)
            .join(format!("{season_id}_{}", safe_name(season_name)))
    }

    pub fn season_summary_json(
        &self,
        league_id: u32,
        league_name: &str,
        season_id: u64,
        season_name: &str,
    ) -> PathBuf {
        self.league_matches_dir(league_id, league_name)
            .join(format!("{season_id}_{}_summary.json", safe_name(season_name)))
    }

    pub fn season_summary_csv(
        &self,
        league_id: u32,
        league_name: &str,
        season_id: u64,
        season_name: &str,
    ) -> PathBuf {
        self.league_matches_dir(league_id, league_name)
            .join(format!("{season_id}_{}_summary.csv", safe_name(season_name)))
    }

    pub fn match_detail_dir(&self, league_folder: &str, season_folder: &str, match_id: u64) -> PathBuf {
        self.match_details_dir()
            .join(league_folder)
            .join(season_folder)
            .join(match_id.to_string())
    }
}

pub fn round_full_file(season_dir: &Path, round: u32) -> PathBuf {
    season_dir.join(format!("round_{round}_full.json"))
}

pub fn round_legacy_file(season_dir: &Path, round: u32) -> PathBuf {
    season_dir.join(format!("round_{round}.json"))
}

pub fn round_csv_file(season_dir: &Path, round: u32) -> PathBuf {
    season_dir.join(format!("round_{round}_matches.csv"))
}

pub fn ensure_dir(dir: &Path) -> FetchResult<()> {
    fs::create_dir_all(dir).map_err(|e| FetchError::io(dir, e))
}

/// Pretty JSON, two-space indent, non-ASCII kept literal. Parents are created.
pub fn write_json_pretty<T: Serialize + ?Sized>(path: &Path, value: &T) -> FetchResult<()> {
    if let Some(parent) = path.parent() {
        ensure_dir(parent)?;
    }
    let text = serde_json::to_string_pretty(value).map_err(|e| {
        FetchError::io(path, std::io::Error::new(std::io::ErrorKind::InvalidData, e))
    })?;
    fs::write(path, text).map_err(|e| FetchError::io(path, e))
}

/// `None` when the file is missing, empty or not JSON.
pub fn read_json(path: &Path) -> Option<serde_json::Value> {
    let text = fs::read_to_string(path).ok()?;
    if text.trim().is_empty() {
        return None;
    }
    serde_json::from_str(&text).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::tempdir;

    #[test]
    fn test_safe_name() {
        assert_eq!(safe_name("Premier League"), "Premier_League");
        assert_eq!(safe_name("Premier League 24/25"), "Premier_League_24_25");
    }

    #[test]
    fn test_paths() {
        let l = Layout::new("data");
        assert_eq!(
            l.seasons_file(17, "Premier League"),
            PathBuf::from("data/seasons/17_Premier_League_seasons.json")
        );
        let season = l.season_matches_dir(17, "Premier League", 41886, "Premier League 24/25");
        assert_eq!(
            season,
            PathBuf::from("data/matches/17_Premier_League/41886_Premier_League_24_25")
        );
        assert_eq!(
            round_full_file(&season, 38).file_name().and_then(|n| n.to_str()),
            Some("round_38_full.json")
        );
        assert_eq!(
            l.season_summary_csv(17, "Premier League", 41886, "PL 24/25"),
            PathBuf::from("data/matches/17_Premier_League/41886_PL_24_25_summary.csv")
        );
    }

    #[test]
    fn test_json_keeps_unicode_and_indent() -> FetchResult<()> {
        let dir = tempdir().map_err(|e| FetchError::io("tmp", e))?;
        let path = dir.path().join("a").join("b.json");
        write_json_pretty(&path, &json!({"team": "Beşiktaş"}))?;
        let text = fs::read_to_string(&path).map_err(|e| FetchError::io(&path, e))?;
        assert!(text.contains("Beşiktaş"));
        assert!(text.contains("\n  \"team\""));
        assert_eq!(read_json(&path), Some(json!({"team": "Beşiktaş"})));
        Ok(())
    }
}
