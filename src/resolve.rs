use std::collections::HashSet;

use thiserror::Error;

use crate::registry::{PlayerRegistry, RegistryTeam, TeamRegistry};
use crate::table::{Datum, Table, TableError};

pub const DIM_PLAYER_COLUMNS: [&str; 4] =
    ["player_id", "player_name", "full_name_registry", "is_active"];

pub const DIM_TEAM_COLUMNS: [&str; 7] = [
    "team_id",
    "full_name",
    "abbreviation",
    "nickname",
    "city",
    "state",
    "year_founded",
];

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ResolveError {
    #[error("could not find player: {0}")]
    NotFound(String),
}

/// One row of the player dimension.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlayerDim {
    pub player_id: i64,
    /// Name as configured, used as the display label downstream.
    pub player_name: String,
    pub full_name_registry: String,
    pub is_active: Option<bool>,
}

/// Maps display names to registry ids. Any name with no match aborts the
/// whole resolution. When several players match, the first active one wins.
pub fn resolve_player_ids(
    registry: &PlayerRegistry,
    names: &[String],
) -> Result<Vec<PlayerDim>, ResolveError> {
    let mut seen = HashSet::new();
    let mut out = Vec::new();
    for name in names {
        let matches = registry.find_players_by_full_name(name);
        let best = matches
            .iter()
            .find(|p| p.is_active == Some(true))
            .or_else(|| matches.first())
            .ok_or_else(|| ResolveError::NotFound(name.clone()))?;

        if !seen.insert(best.id) {
            continue;
        }
        out.push(PlayerDim {
            player_id: best.id,
            player_name: name.clone(),
            full_name_registry: best.full_name.clone(),
            is_active: best.is_active,
        });
    }
    Ok(out)
}

pub fn dim_players_table(players: &[PlayerDim]) -> Result<Table, TableError> {
    let rows = players
        .iter()
        .map(|p| {
            vec![
                Datum::Int(p.player_id),
                Datum::from(p.player_name.as_str()),
                Datum::from(p.full_name_registry.as_str()),
                Datum::from(p.is_active),
            ]
        })
        .collect();
    Table::from_rows(DIM_PLAYER_COLUMNS, rows)
}

pub fn dim_teams_table(registry: &TeamRegistry) -> Result<Table, TableError> {
    Table::from_rows(DIM_TEAM_COLUMNS, registry.teams().iter().map(team_row).collect())
}

fn team_row(t: &RegistryTeam) -> Vec<Datum> {
    vec![
        Datum::Int(t.id),
        Datum::from(t.full_name.as_str()),
        Datum::from(t.abbreviation.as_str()),
        Datum::from(t.nickname.as_str()),
        Datum::from(t.city.as_str()),
        Datum::from(t.state.as_str()),
        Datum::Int(t.year_founded),
    ]
}
