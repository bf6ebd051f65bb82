// src/details/ids.rs
//
// Match ids come from the round and summary CSVs under `matches/`.

use anyhow::{bail, Context, Result};
use std::{
    collections::BTreeSet,
    fs,
    path::{Path, PathBuf},
};
use tracing::{debug, info, warn};

use super::tree::subdirs;

const ID_COLUMNS: [&str; 5] = ["match_id", "matchId", "id", "match-id", "matchid"];

fn is_id_csv(name: &str) -> bool {
    name.ends_with("_matches.csv") || name.ends_with("_summary.csv")
}

/// Ids from the first recognised id column of each row; only all-digit
/// values count.
pub fn extract_match_ids_from_csv(path: &Path) -> Result<Vec<u64>> {
    let mut rdr = csv::Reader::from_path(path)
        .with_context(|| format!("opening {}", path.display()))?;
    let headers = rdr.headers()?.clone();
    let columns: Vec<usize> = ID_COLUMNS
        .iter()
        .filter_map(|c| headers.iter().position(|h| h == *c))
        .collect();
    if columns.is_empty() {
        debug!(path = %path.display(), "no id column");
        return Ok(Vec::new());
    }

    let mut ids = Vec::new();
    for rec in rdr.records() {
        let rec = rec.with_context(|| format!("reading {}", path.display()))?;
        let value = columns
            .iter()
            .filter_map(|&i| rec.get(i))
            .find(|v| !v.is_empty());
        let Some(v) = value else { continue };
        if v.bytes().all(|b| b.is_ascii_digit()) {
            if let Ok(id) = v.parse() {
                ids.push(id);
            }
        }
    }
    Ok(ids)
}

fn id_csvs_in(dir: &Path) -> Vec<PathBuf> {
    let Ok(entries) = fs::read_dir(dir) else {
        return Vec::new();
    };
    let mut files: Vec<PathBuf> = entries
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| p.is_file())
        .filter(|p| p.file_name().and_then(|n| n.to_str()).is_some_and(is_id_csv))
        .collect();
    files.sort();
    files
}

fn leading_id(name: &str) -> Option<u64> {
    name.split('_').next()?.parse().ok()
}

/// Unique match ids under `matches_dir`, sorted. `league_id` restricts to
/// one `{id}_{name}` folder; `max_seasons > 0` keeps only the newest
/// seasons by season id.
pub fn collect_match_ids(
    matches_dir: &Path,
    league_id: Option<u32>,
    max_seasons: usize,
) -> Result<Vec<u64>> {
    if !matches_dir.is_dir() {
        bail!("matches directory {} not found", matches_dir.display());
    }

    let leagues: Vec<_> = subdirs(matches_dir)
        .into_iter()
        .filter(|(name, _)| match league_id {
            Some(id) => leading_id(name) == Some(u64::from(id)),
            None => true,
        })
        .collect();
    if leagues.is_empty() {
        match league_id {
            Some(id) => bail!("no match folder for league {id}"),
            None => bail!("no league folders in {}", matches_dir.display()),
        }
    }

    let mut ids = BTreeSet::new();
    for (league_name, league_path) in leagues {
        let mut seasons = subdirs(&league_path);
        seasons.sort_by_key(|(name, _)| std::cmp::Reverse(leading_id(name).unwrap_or(0)));
        if max_seasons > 0 && seasons.len() > max_seasons {
            seasons.truncate(max_seasons);
        }
        let kept: BTreeSet<u64> = seasons.iter().filter_map(|(n, _)| leading_id(n)).collect();

        let mut files: Vec<PathBuf> = id_csvs_in(&league_path)
            .into_iter()
            .filter(|p| {
                max_seasons == 0
                    || p.file_name()
                        .and_then(|n| n.to_str())
                        .and_then(leading_id)
                        .is_some_and(|s| kept.contains(&s))
            })
            .collect();
        for (_, season_path) in &seasons {
            files.extend(id_csvs_in(season_path));
        }

        let before = ids.len();
        for file in files {
            match extract_match_ids_from_csv(&file) {
                Ok(found) => ids.extend(found),
                Err(e) => warn!(path = %file.display(), error = %e, "skipping csv"),
            }
        }
        info!(league = %league_name, seasons = seasons.len(), new_ids = ids.len() - before, "match ids collected");
    }
    Ok(ids.into_iter().collect())
}
