// src/config/mod.rs

pub mod leagues;

pub use leagues::{League, LeagueRegistry};

use std::{env, path::PathBuf, str::FromStr, time::Duration};
use tracing::warn;

use crate::store::Layout;

pub const DEFAULT_API_BASE_URL: &str = "https://www.sofascore.com/api/v1";

/// Runtime settings, resolved once at startup and handed to each component.
#[derive(Debug, Clone)]
pub struct Config {
    pub api_base_url: String,
    pub data_dir: PathBuf,
    pub leagues_file: PathBuf,
    /// In-flight round requests per season fetch.
    pub max_concurrent: usize,
    /// Attempts per HTTP request, including the first one.
    pub max_retries: u32,
    pub request_timeout: Duration,
    pub wait_time_min: Duration,
    pub wait_time_max: Duration,
    pub fetch_only_finished: bool,
    pub save_empty_rounds: bool,
    pub proxy_url: Option<String>,
    pub match_batch_size: usize,
    pub match_max_concurrent: usize,
    pub season_max_concurrent: usize,
    pub max_round: u32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            data_dir: PathBuf::from("data"),
            leagues_file: PathBuf::from("config").join("leagues.txt"),
            max_concurrent: 25,
            max_retries: 3,
            request_timeout: Duration::from_secs(10),
            wait_time_min: Duration::from_millis(200),
            wait_time_max: Duration::from_millis(500),
            fetch_only_finished: true,
            save_empty_rounds: false,
            proxy_url: None,
            match_batch_size: 100,
            match_max_concurrent: 30,
            season_max_concurrent: 10,
            max_round: 40,
        }
    }
}

impl Config {
    /// Defaults, then `.env`, then the process environment.
    pub fn from_env() -> Self {
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build from any key/value source. Unparseable values keep the default.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut cfg = Config::default();

        if let Some(url) = lookup("API_BASE_URL").filter(|v| !v.trim().is_empty()) {
            cfg.api_base_url = url.trim().trim_end_matches('/').to_string();
        }
        if let Some(dir) = lookup("DATA_DIR").filter(|v| !v.trim().is_empty()) {
            cfg.data_dir = PathBuf::from(dir);
        }
        let config_dir = lookup("CONFIG_DIR")
            .filter(|v| !v.trim().is_empty())
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("config"));
        cfg.leagues_file = lookup("LEAGUES_FILE")
            .filter(|v| !v.trim().is_empty())
            .map(PathBuf::from)
            .unwrap_or_else(|| config_dir.join("leagues.txt"));

        cfg.max_concurrent = parse_or(&lookup, "MAX_CONCURRENT", cfg.max_concurrent).max(1);
        cfg.max_retries = parse_or(&lookup, "MAX_RETRIES", cfg.max_retries).max(1);
        cfg.request_timeout =
            Duration::from_secs(parse_or(&lookup, "REQUEST_TIMEOUT", cfg.request_timeout.as_secs()));
        cfg.wait_time_min = secs_or(&lookup, "WAIT_TIME_MIN", cfg.wait_time_min);
        cfg.wait_time_max = secs_or(&lookup, "WAIT_TIME_MAX", cfg.wait_time_max);
        cfg.fetch_only_finished = bool_or(&lookup, "FETCH_ONLY_FINISHED", cfg.fetch_only_finished);
        cfg.save_empty_rounds = bool_or(&lookup, "SAVE_EMPTY_ROUNDS", cfg.save_empty_rounds);
        cfg.match_batch_size = parse_or(&lookup, "MATCH_BATCH_SIZE", cfg.match_batch_size).max(1);
        cfg.match_max_concurrent =
            parse_or(&lookup, "MATCH_MAX_CONCURRENT", cfg.match_max_concurrent).max(1);
        cfg.season_max_concurrent =
            parse_or(&lookup, "SEASON_MAX_CONCURRENT", cfg.season_max_concurrent).max(1);
        cfg.max_round = parse_or(&lookup, "MAX_ROUND", cfg.max_round).max(1);

        if bool_or(&lookup, "USE_PROXY", false) {
            cfg.proxy_url = lookup("PROXY_URL").filter(|v| !v.trim().is_empty());
            if cfg.proxy_url.is_none() {
                warn!("USE_PROXY is set but PROXY_URL is empty; going direct");
            }
        }

        cfg
    }

    pub fn layout(&self) -> Layout {
        Layout::new(&self.data_dir)
    }
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> T
where
    F: Fn(&str) -> Option<String>,
    T: FromStr + Copy,
{
    match lookup(key) {
        Some(raw) => raw.trim().parse().unwrap_or_else(|_| {
            warn!(key, value = %raw, "invalid value; using default");
            default
        }),
        None => default,
    }
}

fn secs_or<F>(lookup: &F, key: &str, default: Duration) -> Duration
where
    F: Fn(&str) -> Option<String>,
{
    let secs = parse_or(lookup, key, default.as_secs_f64());
    if secs.is_finite() && secs >= 0.0 {
        Duration::from_secs_f64(secs)
    } else {
        warn!(key, secs, "negative duration; using default");
        default
    }
}

fn bool_or<F>(lookup: &F, key: &str, default: bool) -> bool
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(key).map(|v| v.trim().to_ascii_lowercase()) {
        Some(v) if v == "true" || v == "1" || v == "yes" => true,
        Some(v) if v == "false" || v == "0" || v == "no" => false,
        Some(v) => {
            warn!(key, value = %v, "invalid boolean; using default");
            default
        }
        None => default,
    }
}
