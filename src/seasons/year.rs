// src/seasons/year.rs
//
// Season "year" strings come as "2024", "24/25" or "2024/2025".

use chrono::{Datelike, NaiveDate};
use once_cell::sync::Lazy;
use regex::Regex;

static YEAR_IN_NAME: Lazy<Regex> = Lazy::new(|| Regex::new(r"20\d\d").expect("static regex"));

/// Sort key for a season year string; higher is newer, `0.0` when unparseable.
pub fn sortable_year_value(year: &str) -> f64 {
    let year = year.trim();
    if year.is_empty() || year == "0" {
        return 0.0;
    }

    let Some((start, rest)) = year.split_once('/') else {
        return year.parse().unwrap_or(0.0);
    };
    let start = start.trim();
    let end = rest.split('/').next().unwrap_or("").trim();

    if start.len() == 2 && end.len() == 2 {
        let (Ok(s), Ok(e)) = (start.parse::<u32>(), end.parse::<u32>()) else {
            return 0.0;
        };
        return if s > e {
            // "99/00" rolls into the new century
            2000.0 + e as f64
        } else if s < 50 {
            2000.0 + s as f64
        } else {
            1900.0 + s as f64
        };
    }
    start.parse().unwrap_or(0.0)
}

/// Calendar year a season starts in, from the year field or, failing that,
/// the first `20xx` in its name.
pub fn season_start_year(year: &str, name: &str) -> Option<i32> {
    let year = year.trim();
    let start = year.split('/').next().unwrap_or("").trim();
    let parsed = match start.len() {
        4 => start.parse::<i32>().ok(),
        2 => start
            .parse::<i32>()
            .ok()
            .map(|y| if y < 50 { 2000 + y } else { 1900 + y }),
        _ => None,
    };
    parsed.or_else(|| {
        YEAR_IN_NAME
            .find(name)
            .and_then(|m| m.as_str().parse().ok())
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeasonPhase {
    Future,
    Active,
    Past,
}

/// `index` is the season's position in newest-first order; it decides when
/// no year can be read.
pub fn classify(start_year: Option<i32>, index: usize, today: NaiveDate) -> SeasonPhase {
    let current = today.year();
    match start_year {
        Some(y) if y > current => SeasonPhase::Future,
        Some(y) if y == current => SeasonPhase::Active,
        Some(y) if y == current - 1 && today.month() <= 6 => SeasonPhase::Active,
        Some(_) => SeasonPhase::Past,
        None if index < 2 => SeasonPhase::Active,
        None => SeasonPhase::Past,
    }
}

/// True for a season that probably has not kicked off yet. Most leagues
/// start in August.
pub fn looks_unstarted(start_year: i32, today: NaiveDate) -> bool {
    start_year > today.year() || (start_year == today.year() && today.month() < 8)
}
