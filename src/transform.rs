use std::collections::HashMap;

use crate::table::{Datum, Table, TableError};

/// Natural key of a player box-score row.
pub const PLAYER_GAME_KEY: [&str; 3] = ["player_id", "game_id", "season"];
pub const TEAM_GAME_KEY: [&str; 3] = ["team_id", "game_id", "season"];

pub const PLAYER_GAME_COLUMNS: [&str; 21] = [
    "season",
    "player_id",
    "player_name",
    "game_id",
    "game_date",
    "matchup",
    "wl",
    "min",
    "pts",
    "reb",
    "ast",
    "stl",
    "blk",
    "tov",
    "fgm",
    "fga",
    "fg3m",
    "fg3a",
    "ftm",
    "fta",
    "plus_minus",
];

pub const TEAM_GAME_COLUMNS: [&str; 18] = [
    "season",
    "team_id",
    "team_name",
    "game_id",
    "game_date",
    "matchup",
    "wl",
    "pts",
    "reb",
    "ast",
    "tov",
    "fgm",
    "fga",
    "fg3m",
    "fg3a",
    "ftm",
    "fta",
    "plus_minus",
];

pub const TREND_STATS: [&str; 3] = ["pts", "reb", "ast"];
pub const TREND_GROUP: [&str; 2] = ["player_id", "season"];
pub const ROLL_WINDOW: usize = 10;
pub const ROLL_MIN_PERIODS: usize = 3;

pub fn roll_column(stat: &str) -> String {
    format!("{stat}_roll{ROLL_WINDOW}")
}

pub fn clean_player_games(raw: &Table) -> Table {
    clean_games(raw, &PLAYER_GAME_KEY, &PLAYER_GAME_COLUMNS)
}

pub fn clean_team_games(raw: &Table) -> Table {
    clean_games(raw, &TEAM_GAME_KEY, &TEAM_GAME_COLUMNS)
}

fn clean_games(raw: &Table, key: &[&str], allow: &[&str]) -> Table {
    if raw.is_empty() {
        return raw.clone();
    }
    let mut out = raw.clone();
    out.lowercase_columns();
    // The stats site ships `Player_ID`; extraction adds `player_id` too.
    out.drop_duplicate_columns();
    out.map_column("game_date", Datum::to_date);
    out.drop_duplicate_rows(key);
    out.project(allow);
    out
}

/// Fact rows ordered by player, season and date, with rolling means of the
/// trend stats appended as `<stat>_roll10`.
pub fn make_player_trends(games: &Table) -> Result<Table, TableError> {
    if games.is_empty() || !games.has_column("game_date") {
        return Ok(games.clone());
    }

    let mut df = games.clone();
    df.sort_by(&["player_id", "season", "game_date"]);
    for stat in TREND_STATS {
        if !df.has_column(stat) {
            continue;
        }
        let values = grouped_rolling_mean(&df, &TREND_GROUP, stat, ROLL_WINDOW, ROLL_MIN_PERIODS);
        df.push_column(&roll_column(stat), values)?;
    }
    Ok(df)
}

/// Rolling mean of `column` inside each group, in current row order. Rows
/// with a null group key get null.
pub fn grouped_rolling_mean(
    table: &Table,
    group: &[&str],
    column: &str,
    window: usize,
    min_periods: usize,
) -> Vec<Datum> {
    let mut out = vec![Datum::Null; table.len()];
    let Some(col_idx) = table.column_index(column) else {
        return out;
    };
    let group_idx: Vec<usize> = group.iter().filter_map(|g| table.column_index(g)).collect();

    let mut groups: HashMap<Vec<String>, Vec<usize>> = HashMap::new();
    for (i, row) in table.rows().iter().enumerate() {
        if group_idx.iter().any(|g| row[*g].is_null()) {
            continue;
        }
        let key = group_idx.iter().map(|g| row[*g].key()).collect();
        groups.entry(key).or_default().push(i);
    }

    for rows in groups.values() {
        let values: Vec<Option<f64>> = rows
            .iter()
            .map(|i| table.rows()[*i][col_idx].as_f64())
            .collect();
        for (i, mean) in rows.iter().zip(rolling_mean(&values, window, min_periods)) {
            out[*i] = mean.map(Datum::Float).unwrap_or(Datum::Null);
        }
    }
    out
}

/// Trailing mean over the current value and up to `window - 1` before it.
/// Nulls are skipped; fewer than `min_periods` observations yields `None`.
pub fn rolling_mean(values: &[Option<f64>], window: usize, min_periods: usize) -> Vec<Option<f64>> {
    let window = window.max(1);
    (0..values.len())
        .map(|i| {
            let start = (i + 1).saturating_sub(window);
            let seen: Vec<f64> = values[start..=i].iter().flatten().copied().collect();
            if seen.is_empty() || seen.len() < min_periods {
                return None;
            }
            Some(seen.iter().sum::<f64>() / seen.len() as f64)
        })
        .collect()
}
