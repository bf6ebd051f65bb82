// src/details/tree.rs
//
// Walks `match_details/`. Current layout is `{league}/{season}/{match_id}/`;
// older runs wrote `{match_id}/` straight under the root. A match counts as
// saved once its folder holds `full_data.json`.

use std::{
    collections::HashSet,
    fs,
    path::{Path, PathBuf},
};

pub const FULL_DATA: &str = "full_data.json";
pub const PROCESSED_DIR: &str = "processed";

/// Files a complete match folder holds.
pub const REQUIRED_FILES: [&str; 6] = [
    FULL_DATA,
    "basic.json",
    "statistics.json",
    "team_streaks.json",
    "pregame_form.json",
    "h2h.json",
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchLocation {
    pub match_id: String,
    /// `None` for the old flat layout.
    pub league_folder: Option<String>,
    pub season_folder: Option<String>,
    pub path: PathBuf,
}

impl MatchLocation {
    pub fn full_data(&self) -> PathBuf {
        self.path.join(FULL_DATA)
    }
}

/// Child directories of `dir` by name, sorted. Missing dirs give nothing.
pub(crate) fn subdirs(dir: &Path) -> Vec<(String, PathBuf)> {
    let Ok(entries) = fs::read_dir(dir) else {
        return Vec::new();
    };
    let mut out: Vec<_> = entries
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| p.is_dir())
        .filter_map(|p| {
            let name = p.file_name()?.to_str()?.to_string();
            Some((name, p))
        })
        .collect();
    out.sort();
    out
}

fn is_saved(dir: &Path) -> bool {
    dir.join(FULL_DATA).is_file()
}

/// Every saved match under `details_dir`, nested layout and flat layout.
pub fn discover_matches(details_dir: &Path) -> Vec<MatchLocation> {
    let mut found = Vec::new();
    for (name, path) in subdirs(details_dir) {
        if name == PROCESSED_DIR {
            continue;
        }
        if is_saved(&path) {
            found.push(MatchLocation {
                match_id: name,
                league_folder: None,
                season_folder: None,
                path,
            });
            continue;
        }
        for (season, season_path) in subdirs(&path) {
            for (match_id, match_path) in subdirs(&season_path) {
                if is_saved(&match_path) {
                    found.push(MatchLocation {
                        match_id,
                        league_folder: Some(name.clone()),
                        season_folder: Some(season.clone()),
                        path: match_path,
                    });
                }
            }
        }
    }
    found
}

pub fn existing_match_ids(details_dir: &Path) -> HashSet<String> {
    discover_matches(details_dir)
        .into_iter()
        .map(|m| m.match_id)
        .collect()
}

/// Nested layout first, then the flat one.
pub fn find_match_path(details_dir: &Path, match_id: &str) -> Option<MatchLocation> {
    for (league, league_path) in subdirs(details_dir) {
        if league == PROCESSED_DIR || is_saved(&league_path) {
            continue;
        }
        for (season, season_path) in subdirs(&league_path) {
            let path = season_path.join(match_id);
            if is_saved(&path) {
                return Some(MatchLocation {
                    match_id: match_id.to_string(),
                    league_folder: Some(league.clone()),
                    season_folder: Some(season),
                    path,
                });
            }
        }
    }
    let flat = details_dir.join(match_id);
    is_saved(&flat).then(|| MatchLocation {
        match_id: match_id.to_string(),
        league_folder: None,
        season_folder: None,
        path: flat,
    })
}
