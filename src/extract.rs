use std::thread;
use std::time::Duration;

use anyhow::Result;

use crate::registry::TeamRegistry;
use crate::resolve::PlayerDim;
use crate::stats_api::GameLogSource;
use crate::table::{Datum, Table};

/// Fixed pause before every outbound call. Nothing adaptive: the stats site
/// throttles bursts, and a constant gap is enough to stay under it.
#[derive(Debug, Clone, Copy)]
pub struct Pacer {
    delay: Duration,
}

impl Pacer {
    pub fn new(delay: Duration) -> Self {
        Self { delay }
    }

    pub fn none() -> Self {
        Self::new(Duration::ZERO)
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    pub fn wait(&self) {
        if !self.delay.is_zero() {
            thread::sleep(self.delay);
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractFailure {
    pub entity_id: i64,
    pub entity_name: String,
    pub season: String,
    pub message: String,
}

#[derive(Debug, Clone, Default)]
pub struct Extraction {
    pub table: Table,
    pub calls: usize,
    pub empty: usize,
    pub failures: Vec<ExtractFailure>,
}

struct Target<'a> {
    id: i64,
    name: &'a str,
}

/// Pulls one game log per (season, player). Failed calls are logged and
/// skipped; whatever came back is concatenated.
pub fn extract_player_game_logs(
    source: &dyn GameLogSource,
    players: &[PlayerDim],
    seasons: &[String],
    season_type: &str,
    pacer: &Pacer,
) -> Extraction {
    let targets: Vec<Target<'_>> = players
        .iter()
        .map(|p| Target {
            id: p.player_id,
            name: &p.player_name,
        })
        .collect();
    extract_logs(
        &targets,
        seasons,
        pacer,
        ("player_id", "player_name"),
        "gamelog",
        |id, season| source.player_game_log(id, season, season_type),
    )
}

pub fn extract_team_game_logs(
    source: &dyn GameLogSource,
    teams: &TeamRegistry,
    seasons: &[String],
    season_type: &str,
    pacer: &Pacer,
) -> Extraction {
    let targets: Vec<Target<'_>> = teams
        .teams()
        .iter()
        .map(|t| Target {
            id: t.id,
            name: &t.full_name,
        })
        .collect();
    extract_logs(
        &targets,
        seasons,
        pacer,
        ("team_id", "team_name"),
        "teamlog",
        |id, season| source.team_game_log(id, season, season_type),
    )
}

fn extract_logs(
    targets: &[Target<'_>],
    seasons: &[String],
    pacer: &Pacer,
    (id_col, name_col): (&str, &str),
    kind: &str,
    fetch: impl Fn(i64, &str) -> Result<Table>,
) -> Extraction {
    let mut out = Extraction::default();
    let mut parts = Vec::new();

    for season in seasons {
        for target in targets {
            pacer.wait();
            out.calls += 1;
            match fetch(target.id, season) {
                Ok(mut table) => {
                    if table.is_empty() {
                        out.empty += 1;
                        tracing::debug!(id = target.id, name = target.name, %season, "empty {kind}");
                        continue;
                    }
                    table.set_constant("season", Datum::from(season.as_str()));
                    table.set_constant(id_col, Datum::Int(target.id));
                    table.set_constant(name_col, Datum::from(target.name));
                    tracing::debug!(id = target.id, rows = table.len(), %season, "fetched {kind}");
                    parts.push(table);
                }
                Err(err) => {
                    tracing::warn!(
                        "failed {kind} for {} ({}) {season}: {err:#}",
                        target.name,
                        target.id
                    );
                    out.failures.push(ExtractFailure {
                        entity_id: target.id,
                        entity_name: target.name.to_string(),
                        season: season.clone(),
                        message: format!("{err:#}"),
                    });
                }
            }
        }
    }

    out.table = if parts.is_empty() {
        Table::new(["season", id_col, name_col])
    } else {
        Table::concat(&parts)
    };
    out
}
