use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use tracing::{info, warn};

use crate::config::{DEFAULT_SEASONS, PipelineConfig};
use crate::extract::{
    ExtractFailure, Pacer, extract_player_game_logs, extract_team_game_logs,
};
use crate::parquet_io::{file_digest, write_table};
use crate::registry::{PlayerRegistry, TeamRegistry, players_from_table};
use crate::resolve::{dim_players_table, dim_teams_table, resolve_player_ids};
use crate::stats_api::{GameLogSource, PlayerListSource};
use crate::table::Table;
use crate::transform::{clean_player_games, clean_team_games, make_player_trends};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WrittenFile {
    pub path: PathBuf,
    pub rows: usize,
    pub sha256: String,
}

#[derive(Debug, Clone, Default)]
pub struct RunSummary {
    pub players: usize,
    pub player_games: usize,
    pub trend_rows: usize,
    pub teams: Option<usize>,
    pub team_games: Option<usize>,
    pub calls: usize,
    pub failures: Vec<ExtractFailure>,
    pub files: Vec<WrittenFile>,
}

/// An explicit registry file wins, then a previously refreshed cache under
/// the raw directory, then the list compiled into the binary.
pub fn load_player_registry(cfg: &PipelineConfig) -> Result<PlayerRegistry> {
    if let Some(path) = &cfg.player_registry {
        return PlayerRegistry::from_path(path);
    }
    let cache = cfg.paths.player_registry_cache();
    if cache.is_file() {
        match PlayerRegistry::from_path(&cache) {
            Ok(registry) if !registry.is_empty() => return Ok(registry),
            Ok(_) => warn!(path = %cache.display(), "cached player registry is empty"),
            Err(err) => warn!(path = %cache.display(), "ignoring cached player registry: {err:#}"),
        }
    }
    PlayerRegistry::bundled()
}

/// Pulls the full player list from the stats site and stores it as the
/// registry cache. The previous cache survives a failed or empty fetch.
pub fn refresh_player_registry(
    cfg: &PipelineConfig,
    source: &dyn PlayerListSource,
) -> Result<PlayerRegistry> {
    let season = cfg
        .seasons
        .iter()
        .max()
        .map(String::as_str)
        .unwrap_or(DEFAULT_SEASONS[DEFAULT_SEASONS.len() - 1]);
    info!(season, "refresh player registry");
    let table = source.all_players(season).context("fetch player list")?;
    let registry = PlayerRegistry::new(players_from_table(&table));
    if registry.is_empty() {
        bail!("player list for {season} came back empty");
    }

    let path = cfg.paths.player_registry_cache();
    cfg.paths.ensure_dirs()?;
    let tmp = path.with_extension("json.tmp");
    let written = fs::write(&tmp, registry.to_json()?)
        .with_context(|| format!("write {}", tmp.display()))
        .and_then(|()| fs::rename(&tmp, &path).with_context(|| format!("swap {}", path.display())));
    if written.is_err() {
        let _ = fs::remove_file(&tmp);
    }
    written?;
    info!(path = %path.display(), players = registry.len(), "cached player registry");
    Ok(registry)
}

/// Names with no match at all in `registry`, in input order.
pub fn unresolved_names<'a>(registry: &PlayerRegistry, names: &'a [String]) -> Vec<&'a str> {
    names
        .iter()
        .filter(|name| registry.find_players_by_full_name(name).is_empty())
        .map(String::as_str)
        .collect()
}

/// Full extract/transform/load pass. Every output file is rewritten from
/// scratch. An unresolvable player name stops the run before anything is
/// fetched; individual fetch failures do not.
pub fn run(
    cfg: &PipelineConfig,
    registry: &PlayerRegistry,
    source: &dyn GameLogSource,
) -> Result<RunSummary> {
    let paths = &cfg.paths;
    paths.ensure_dirs()?;
    let pacer = Pacer::new(cfg.request_delay);
    let mut summary = RunSummary::default();

    info!("1) resolve players");
    let players = resolve_player_ids(registry, &cfg.player_names)?;
    let dim_players = dim_players_table(&players)?;
    save(&dim_players, &paths.raw_players(), &mut summary)?;
    summary.players = players.len();

    info!(
        players = players.len(),
        seasons = cfg.seasons.len(),
        "2) extract player game logs"
    );
    let raw = extract_player_game_logs(source, &players, &cfg.seasons, &cfg.season_type, &pacer);
    summary.calls += raw.calls;
    summary.failures.extend(raw.failures);
    save(&raw.table, &paths.raw_player_gamelogs(), &mut summary)?;

    info!("3) transform to processed tables");
    let fact_player_game = clean_player_games(&raw.table);
    let player_trends = make_player_trends(&fact_player_game).context("build player trends")?;
    summary.player_games = fact_player_game.len();
    summary.trend_rows = player_trends.len();

    save(&dim_players, &paths.dim_players(), &mut summary)?;
    save(&fact_player_game, &paths.fact_player_game(), &mut summary)?;
    save(&player_trends, &paths.mart_player_trends(), &mut summary)?;

    if cfg.with_teams {
        info!("4) extract team game logs");
        let teams = TeamRegistry::bundled()?;
        let raw_teams =
            extract_team_game_logs(source, &teams, &cfg.seasons, &cfg.season_type, &pacer);
        summary.calls += raw_teams.calls;
        summary.failures.extend(raw_teams.failures);
        save(&raw_teams.table, &paths.raw_team_gamelogs(), &mut summary)?;

        let dim_teams = dim_teams_table(&teams)?;
        let fact_team_game = clean_team_games(&raw_teams.table);
        summary.teams = Some(dim_teams.len());
        summary.team_games = Some(fact_team_game.len());
        save(&dim_teams, &paths.dim_teams(), &mut summary)?;
        save(&fact_team_game, &paths.fact_team_game(), &mut summary)?;
    }

    info!(
        players = summary.players,
        player_games = summary.player_games,
        failures = summary.failures.len(),
        "all done"
    );
    Ok(summary)
}

fn save(table: &Table, path: &Path, summary: &mut RunSummary) -> Result<()> {
    write_table(table, path).with_context(|| format!("save {}", path.display()))?;
    let sha256 = file_digest(path)?;
    info!(path = %path.display(), rows = table.len(), "wrote table");
    summary.files.push(WrittenFile {
        path: path.to_path_buf(),
        rows: table.len(),
        sha256,
    });
    Ok(())
}
