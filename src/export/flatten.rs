// src/export/flatten.rs
//
// One saved match (`full_data.json`) to one flat row.

use serde_json::{Map, Value};
use std::collections::{BTreeMap, BTreeSet};

use crate::json::{nested, nested_or_null};

pub type Row = BTreeMap<String, Value>;

/// Leading columns, in order, when present.
pub const PRIORITY_COLUMNS: [&str; 11] = [
    "match_id",
    "league_folder",
    "season_folder",
    "tournament_name",
    "season_name",
    "round",
    "home_team_name",
    "away_team_name",
    "home_score_ft",
    "away_score_ft",
    "match_date",
];

const BASIC_FIELDS: [(&str, &[&str]); 18] = [
    ("tournament_id", &["tournament", "uniqueTournament", "id"]),
    ("tournament_name", &["tournament", "uniqueTournament", "name"]),
    ("season_id", &["season", "id"]),
    ("season_name", &["season", "name"]),
    ("season_year", &["season", "year"]),
    ("round", &["roundInfo", "round"]),
    ("home_team_id", &["homeTeam", "id"]),
    ("home_team_name", &["homeTeam", "name"]),
    ("away_team_id", &["awayTeam", "id"]),
    ("away_team_name", &["awayTeam", "name"]),
    ("home_score_ht", &["homeScore", "period1"]),
    ("away_score_ht", &["awayScore", "period1"]),
    ("home_score_ft", &["homeScore", "normaltime"]),
    ("away_score_ft", &["awayScore", "normaltime"]),
    ("match_date", &["startTimestamp"]),
    ("venue", &["venue", "name"]),
    ("referee", &["referee", "name"]),
    ("status", &["status", "description"]),
];

fn present<'a>(detail: &'a Value, key: &str) -> Option<&'a Value> {
    detail.get(key).filter(|v| match v {
        Value::Null => false,
        Value::Object(m) => !m.is_empty(),
        _ => true,
    })
}

fn objects<'a>(v: Option<&'a Value>) -> impl Iterator<Item = &'a Map<String, Value>> {
    v.and_then(Value::as_array)
        .into_iter()
        .flatten()
        .filter_map(Value::as_object)
}

fn statistics(row: &mut Row, stats: &Value) {
    let all = objects(stats.get("statistics"))
        .filter(|p| p.get("period").and_then(Value::as_str) == Some("ALL"));
    for period in all {
        for group in objects(period.get("groups")) {
            for item in objects(group.get("statisticsItems")) {
                let Some(key) = item.get("key").and_then(Value::as_str).filter(|k| !k.is_empty()) else {
                    continue;
                };
                let side = |s: &str| item.get(s).cloned().unwrap_or(Value::Null);
                row.insert(format!("home_{key}"), side("homeValue"));
                row.insert(format!("away_{key}"), side("awayValue"));
            }
        }
    }
}

fn streaks(row: &mut Row, streaks: &Value) {
    for streak in objects(streaks.get("general")) {
        let team = streak.get("team").and_then(Value::as_str).unwrap_or("");
        if team != "home" && team != "away" {
            continue;
        }
        let name = streak
            .get("name")
            .and_then(Value::as_str)
            .unwrap_or("")
            .to_lowercase()
            .replace(' ', "_");
        let column = format!("{team}_streak_{name}");
        let continued = streak.get("continued").cloned().unwrap_or(Value::Bool(false));
        row.insert(column.clone(), streak.get("value").cloned().unwrap_or(Value::Null));
        row.insert(format!("{column}_continued"), continued);
    }
}

fn form(row: &mut Row, form: &Value) {
    for side in ["home", "away"] {
        let team = form.get(format!("{side}Team")).unwrap_or(&Value::Null);
        row.insert(format!("{side}_position"), nested_or_null(team, &["position"]));
        row.insert(format!("{side}_points"), nested_or_null(team, &["value"]));
        row.insert(format!("{side}_rating"), nested_or_null(team, &["avgRating"]));
        let letters: Vec<&str> = team
            .get("form")
            .and_then(Value::as_array)
            .into_iter()
            .flatten()
            .filter_map(Value::as_str)
            .collect();
        let joined = if letters.is_empty() {
            Value::Null
        } else {
            Value::String(letters.join("_"))
        };
        row.insert(format!("{side}_form"), joined);
    }
}

fn head_to_head(row: &mut Row, h2h: &Value) {
    let duel = h2h.get("teamDuel").unwrap_or(&Value::Null);
    for (col, key) in [
        ("h2h_home_wins", "homeWins"),
        ("h2h_away_wins", "awayWins"),
        ("h2h_draws", "draws"),
    ] {
        row.insert(col.to_string(), nested_or_null(duel, &[key]));
    }
}

/// Flatten a saved match. Folder names come from where the match sits in
/// the detail tree; the `season_` prefix is dropped from the season folder.
pub fn flatten_match(
    match_id: &str,
    detail: &Value,
    league_folder: Option<&str>,
    season_folder: Option<&str>,
) -> Row {
    let mut row = Row::new();
    row.insert("match_id".into(), Value::String(match_id.to_string()));
    for (col, _) in BASIC_FIELDS {
        row.insert(col.to_string(), Value::Null);
    }
    if let Some(league) = league_folder {
        row.insert("league_folder".into(), Value::String(league.to_string()));
    }
    if let Some(season) = season_folder {
        let season = season.strip_prefix("season_").unwrap_or(season);
        row.insert("season_folder".into(), Value::String(season.to_string()));
    }

    if let Some(basic) = present(detail, "basic") {
        for (col, path) in BASIC_FIELDS {
            if let Some(v) = nested(basic, path) {
                row.insert(col.to_string(), v.clone());
            }
        }
    }
    if let Some(v) = present(detail, "statistics") {
        statistics(&mut row, v);
    }
    if let Some(v) = present(detail, "team_streaks") {
        streaks(&mut row, v);
    }
    if let Some(v) = present(detail, "pregame_form") {
        form(&mut row, v);
    }
    if let Some(v) = present(detail, "h2h") {
        head_to_head(&mut row, v);
    }
    row
}

/// Priority columns that occur, then every other column alphabetically.
pub fn column_order(rows: &[Row]) -> Vec<String> {
    let all: BTreeSet<&str> = rows.iter().flat_map(|r| r.keys().map(String::as_str)).collect();
    let mut columns: Vec<String> = PRIORITY_COLUMNS
        .iter()
        .filter(|c| all.contains(*c))
        .map(|c| c.to_string())
        .collect();
    columns.extend(
        all.into_iter()
            .filter(|c| !PRIORITY_COLUMNS.contains(c))
            .map(str::to_string),
    );
    columns
}
