use anyhow::Result;
use thiserror::Error;

use crate::config::DataPaths;
use crate::parquet_io::read_table;
use crate::table::{Datum, Table};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DashboardError {
    #[error("processed data not found: {}. Run: cargo run --bin pipeline", .missing.join(", "))]
    MissingData { missing: Vec<String> },
}

#[derive(Debug, Clone, Default)]
pub struct DashboardData {
    pub fact: Table,
    pub trends: Table,
    pub players: Table,
}

/// Fails with [`DashboardError::MissingData`] listing every absent file.
pub fn check_data(paths: &DataPaths) -> Result<(), DashboardError> {
    let missing: Vec<String> = [
        paths.fact_player_game(),
        paths.mart_player_trends(),
        paths.dim_players(),
    ]
    .iter()
    .filter(|p| !p.exists())
    .map(|p| p.display().to_string())
    .collect();
    if missing.is_empty() {
        Ok(())
    } else {
        Err(DashboardError::MissingData { missing })
    }
}

pub fn load_data(paths: &DataPaths) -> Result<DashboardData> {
    check_data(paths)?;
    let mut fact = read_table(&paths.fact_player_game())?;
    let mut trends = read_table(&paths.mart_player_trends())?;
    let players = read_table(&paths.dim_players())?;

    fact.map_column("game_date", Datum::to_date);
    trends.map_column("game_date", Datum::to_date);

    Ok(DashboardData {
        fact,
        trends,
        players,
    })
}
