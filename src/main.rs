// src/main.rs

use anyhow::{bail, Context, Result};
use sofascraper::{
    config::{Config, LeagueRegistry},
    details::{report::generate_file_report, DetailSettings, MatchDetailFetcher},
    export::CsvExporter,
    fetch::ApiClient,
    rounds::{RoundFetcher, RoundSettings},
    seasons::SeasonDirectory,
};
use std::{env, sync::Arc};
use tokio::time::Instant;
use tracing::{info, warn};
use tracing_subscriber::{fmt, EnvFilter};

const USAGE: &str = "usage: sofascraper <command>
  seasons                              refresh seasons of every configured league
  rounds <league_id> [season_id]       matches of one season (current when omitted)
  update-all                           current season of every league
  details [league_id] [max_seasons]    match details for ids found under matches/
  export [--by-league]                 flatten saved match details to csv
  report                               completeness of the match-detail tree";

fn parse_arg<T: std::str::FromStr>(raw: Option<String>, what: &str) -> Result<Option<T>> {
    match raw {
        None => Ok(None),
        Some(s) => match s.parse() {
            Ok(v) => Ok(Some(v)),
            Err(_) => bail!("invalid {what}: {s}\n{USAGE}"),
        },
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // ─── 1) init logging ─────────────────────────────────────────────
    let _ = dotenvy::dotenv();
    let filter = EnvFilter::try_from_default_env()
        .ok()
        .or_else(|| {
            env::var("LOG_LEVEL")
                .ok()
                .filter(|l| !l.trim().is_empty())
                .and_then(|l| EnvFilter::try_new(l.to_lowercase()).ok())
        })
        .unwrap_or_else(|| EnvFilter::new("info"));
    fmt::Subscriber::builder()
        .with_env_filter(filter)
        .with_span_events(fmt::format::FmtSpan::CLOSE)
        .init();

    let mut args = env::args().skip(1);
    let Some(command) = args.next() else {
        eprintln!("{USAGE}");
        return Ok(());
    };

    // ─── 2) config & shared state ────────────────────────────────────
    let cfg = Config::from_env();
    let layout = cfg.layout();
    info!(data_dir = %cfg.data_dir.display(), api = %cfg.api_base_url, "startup");
    let start = Instant::now();

    match command.as_str() {
        // ─── seasons ─────────────────────────────────────────────────
        "seasons" => {
            let leagues = Arc::new(LeagueRegistry::load(&cfg.leagues_file)?);
            let mut seasons = SeasonDirectory::new(layout, leagues.clone());
            let client = ApiClient::new(&cfg)?;
            let fetched = seasons
                .fetch_all_leagues_seasons(&client, cfg.season_max_concurrent)
                .await?;
            println!("seasons refreshed for {}/{} leagues", fetched.len(), leagues.len());
        }

        // ─── rounds ──────────────────────────────────────────────────
        "rounds" => {
            let league_id: u32 = parse_arg(args.next(), "league id")?
                .with_context(|| format!("league id required\n{USAGE}"))?;
            let season_id: Option<u64> = parse_arg(args.next(), "season id")?;

            let leagues = Arc::new(LeagueRegistry::load(&cfg.leagues_file)?);
            let mut seasons = SeasonDirectory::new(layout, leagues);
            let client = ApiClient::new(&cfg)?;
            if seasons.seasons(league_id).is_empty() {
                seasons
                    .fetch_seasons(&client, league_id)
                    .await
                    .with_context(|| format!("fetching seasons of league {league_id}"))?;
            }

            let fetcher = RoundFetcher::new(&client, RoundSettings::from_config(&cfg));
            match fetcher
                .fetch_matches_for_season(&seasons, league_id, season_id)
                .await?
            {
                Some(run) => println!(
                    "{} {}: {} rounds, {} matches ({:?})",
                    run.league_name,
                    run.season_name,
                    run.rounds.len(),
                    run.match_count(),
                    run.origin
                ),
                None => println!("no matches found for league {league_id}"),
            }
        }

        // ─── update-all ──────────────────────────────────────────────
        "update-all" => {
            let leagues = Arc::new(LeagueRegistry::load(&cfg.leagues_file)?);
            let mut seasons = SeasonDirectory::new(layout, leagues.clone());
            let client = ApiClient::new(&cfg)?;
            if seasons.league_count() < leagues.len() {
                info!("season data incomplete, refreshing first");
                seasons
                    .fetch_all_leagues_seasons(&client, cfg.season_max_concurrent)
                    .await?;
            }
            let fetcher = RoundFetcher::new(&client, RoundSettings::from_config(&cfg));
            let runs = fetcher.fetch_all_leagues_current_season(&seasons).await?;
            let matches: usize = runs.iter().map(|r| r.match_count()).sum();
            println!(
                "{}/{} leagues updated, {} matches",
                runs.len(),
                leagues.len(),
                matches
            );
        }

        // ─── details ─────────────────────────────────────────────────
        "details" => {
            let league_id: Option<u32> = parse_arg(args.next(), "league id")?;
            let max_seasons: usize = parse_arg(args.next(), "max seasons")?.unwrap_or(0);
            let client = ApiClient::for_details(&cfg)?.with_max_in_flight(cfg.match_max_concurrent);
            let fetcher = MatchDetailFetcher::new(client, layout, DetailSettings::from_config(&cfg));
            let outcome = fetcher.fetch_all_match_details(league_id, max_seasons).await?;
            println!(
                "{outcome}; {} already saved, {} not finished, {} unavailable, {} failed",
                outcome.skipped, outcome.not_finished, outcome.unavailable, outcome.failed
            );
        }

        // ─── export ──────────────────────────────────────────────────
        "export" => {
            let by_league = match args.next().as_deref() {
                None => false,
                Some("--by-league") => true,
                Some(other) => bail!("unknown flag {other}\n{USAGE}"),
            };
            let paths = CsvExporter::new(layout).create_csv_dataset(None, by_league)?;
            if paths.is_empty() {
                warn!("nothing exported");
            }
            for p in &paths {
                println!("{}", p.display());
            }
        }

        // ─── report ──────────────────────────────────────────────────
        "report" => {
            let report = generate_file_report(&layout)?;
            let o = &report.overall_stats;
            println!(
                "{}/{} matches complete ({}%), report at {}",
                o.complete_matches,
                o.total_matches,
                o.completion_rate,
                report.csv_report_path.display()
            );
        }

        other => bail!("unknown command {other}\n{USAGE}"),
    }

    info!(elapsed = ?start.elapsed(), "all done");
    Ok(())
}
