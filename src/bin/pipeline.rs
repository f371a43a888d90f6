use std::path::PathBuf;
use std::time::Duration;

use anyhow::Result;
use clap::Parser;
use tracing::{info, warn};

use hoops_trends::config::{DataPaths, PipelineConfig};
use hoops_trends::logging::init_logging;
use hoops_trends::pipeline::{self, RunSummary};
use hoops_trends::registry::PlayerRegistry;
use hoops_trends::stats_api::NbaStatsClient;

/// Pulls player game logs from stats.nba.com and rebuilds every Parquet
/// table under the data directory.
#[derive(Debug, Parser)]
#[command(name = "pipeline", version)]
struct Cli {
    /// Data root; `raw/` and `processed/` live under it.
    #[arg(long)]
    data_dir: Option<PathBuf>,

    /// Seasons in YYYY-YY form. Comma separated or repeated.
    #[arg(long, value_delimiter = ',')]
    season: Vec<String>,

    /// Player display names to resolve. Comma separated or repeated.
    #[arg(long, value_delimiter = ',')]
    player: Vec<String>,

    /// Season type as the stats site spells it.
    #[arg(long)]
    season_type: Option<String>,

    /// Pause before each API call, in milliseconds.
    #[arg(long)]
    delay_ms: Option<u64>,

    /// JSON player registry to use instead of the bundled one.
    #[arg(long)]
    registry: Option<PathBuf>,

    /// Fetch the full player list from the stats site before resolving.
    #[arg(long, default_value_t = false)]
    refresh_registry: bool,

    /// Also pull team game logs for every franchise.
    #[arg(long, default_value_t = false)]
    with_teams: bool,
}

impl Cli {
    fn apply(self, cfg: &mut PipelineConfig) {
        if let Some(dir) = self.data_dir {
            cfg.paths = DataPaths::new(dir);
        }
        if !self.season.is_empty() {
            cfg.seasons = self.season;
        }
        if !self.player.is_empty() {
            cfg.player_names = self.player;
        }
        if let Some(season_type) = self.season_type {
            cfg.season_type = season_type;
        }
        if let Some(ms) = self.delay_ms {
            cfg.request_delay = Duration::from_millis(ms);
        }
        if self.registry.is_some() {
            cfg.player_registry = self.registry;
        }
        cfg.with_teams |= self.with_teams;
    }
}

fn main() -> Result<()> {
    let _ = dotenvy::from_filename(".env.local");
    let _ = dotenvy::from_filename(".env");
    init_logging();

    let mut cfg = PipelineConfig::from_env();
    let cli = Cli::parse();
    let refresh = cli.refresh_registry;
    cli.apply(&mut cfg);

    let client = NbaStatsClient::new(cfg.http_timeout)?;
    let registry = load_registry(&cfg, &client, refresh)?;
    let summary = pipeline::run(&cfg, &registry, &client)?;
    print_summary(&summary);
    Ok(())
}

/// Names missing from the local list trigger one refresh, unless the
/// registry file was given explicitly.
fn load_registry(
    cfg: &PipelineConfig,
    client: &NbaStatsClient,
    refresh: bool,
) -> Result<PlayerRegistry> {
    let registry = pipeline::load_player_registry(cfg)?;
    let missing = pipeline::unresolved_names(&registry, &cfg.player_names);
    if !refresh && (missing.is_empty() || cfg.player_registry.is_some()) {
        return Ok(registry);
    }
    if !missing.is_empty() {
        info!(?missing, "names not in local player registry");
    }
    match pipeline::refresh_player_registry(cfg, client) {
        Ok(fresh) => Ok(fresh),
        Err(err) => {
            warn!("player registry refresh failed: {err:#}");
            Ok(registry)
        }
    }
}

fn print_summary(summary: &RunSummary) {
    println!("All done");
    println!(
        "Players: {} | Player-games: {} | Trend rows: {}",
        summary.players, summary.player_games, summary.trend_rows
    );
    if let (Some(teams), Some(games)) = (summary.teams, summary.team_games) {
        println!("Teams: {teams} | Team-games: {games}");
    }
    println!(
        "API calls: {} | Skipped: {}",
        summary.calls,
        summary.failures.len()
    );
    for failure in summary.failures.iter().take(8) {
        println!(
            " - {} ({}) {}: {}",
            failure.entity_name, failure.entity_id, failure.season, failure.message
        );
    }
    for file in &summary.files {
        println!("{}  {} rows  {}", file.sha256, file.rows, file.path.display());
    }
}
