use std::collections::{BTreeMap, BTreeSet};

use chrono::NaiveDate;

use crate::table::{Datum, Table, TableError};

/// Metric picker entries: label shown to the user, column in the fact table.
pub const METRICS: [(&str, &str); 8] = [
    ("Points (PTS)", "pts"),
    ("Assists (AST)", "ast"),
    ("Rebounds (REB)", "reb"),
    ("Steals (STL)", "stl"),
    ("Blocks (BLK)", "blk"),
    ("Turnovers (TOV)", "tov"),
    ("Minutes (MIN)", "min"),
    ("Plus/Minus", "plus_minus"),
];

pub const SUMMARY_STATS: [&str; 8] = ["pts", "reb", "ast", "stl", "blk", "tov", "min", "plus_minus"];
pub const LEADERBOARD_STATS: [&str; 7] = ["pts", "reb", "ast", "stl", "blk", "tov", "min"];
pub const RECENT_GAMES: usize = 10;

pub fn player_options(players: &Table) -> Vec<String> {
    distinct_text(players, "player_name")
}

pub fn season_options(fact: &Table) -> Vec<String> {
    distinct_text(fact, "season")
}

fn distinct_text(table: &Table, column: &str) -> Vec<String> {
    let Some(values) = table.column(column) else {
        return Vec::new();
    };
    values
        .filter(|v| !v.is_null())
        .map(|v| v.to_string())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

fn text_at(table: &Table, row: usize, column: &str) -> Option<String> {
    table
        .get(row, column)
        .filter(|v| !v.is_null())
        .map(|v| v.to_string())
}

/// Rows for one player (when given) whose season is among `seasons`.
pub fn filter_games(table: &Table, player: Option<&str>, seasons: &[String]) -> Table {
    table.filter(|t, i| {
        let player_ok = match player {
            Some(name) => text_at(t, i, "player_name").as_deref() == Some(name),
            None => true,
        };
        let season_ok = text_at(t, i, "season").is_some_and(|s| seasons.contains(&s));
        player_ok && season_ok
    })
}

/// Inclusive date filter. Rows without a date drop out.
pub fn filter_dates(table: &Table, start: NaiveDate, end: NaiveDate) -> Table {
    table.filter(|t, i| {
        t.get(i, "game_date")
            .and_then(Datum::as_date)
            .is_some_and(|d| d >= start && d <= end)
    })
}

pub fn game_dates(table: &Table) -> Vec<NaiveDate> {
    let Some(values) = table.column("game_date") else {
        return Vec::new();
    };
    values
        .filter_map(Datum::as_date)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

pub fn date_bounds(table: &Table) -> Option<(NaiveDate, NaiveDate)> {
    let dates = game_dates(table);
    Some((*dates.first()?, *dates.last()?))
}

/// `(date, value)` points for one column, in date order, skipping gaps.
pub fn series(table: &Table, column: &str) -> Vec<(NaiveDate, f64)> {
    let mut points: Vec<(NaiveDate, f64)> = (0..table.len())
        .filter_map(|i| {
            let date = table.get(i, "game_date").and_then(Datum::as_date)?;
            let value = table.get(i, column).and_then(Datum::as_f64)?;
            Some((date, value))
        })
        .collect();
    points.sort_by(|a, b| a.0.cmp(&b.0));
    points
}

fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}

fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        None
    } else {
        Some(values.iter().sum::<f64>() / values.len() as f64)
    }
}

/// Groups rows by `keys` (sorted by key) and averages each of `stats` that
/// exists in the table, rounded to two decimals.
pub fn grouped_means(
    table: &Table,
    keys: &[&str],
    stats: &[&str],
) -> Result<Table, TableError> {
    let stats: Vec<&str> = stats
        .iter()
        .copied()
        .filter(|s| table.has_column(s))
        .collect();

    let mut groups: BTreeMap<Vec<String>, Vec<Vec<f64>>> = BTreeMap::new();
    for i in 0..table.len() {
        let Some(key) = keys
            .iter()
            .map(|k| text_at(table, i, k))
            .collect::<Option<Vec<String>>>()
        else {
            continue;
        };
        let acc = groups
            .entry(key)
            .or_insert_with(|| vec![Vec::new(); stats.len()]);
        for (slot, stat) in acc.iter_mut().zip(stats.iter()) {
            if let Some(v) = table.get(i, stat).and_then(Datum::as_f64) {
                slot.push(v);
            }
        }
    }

    let mut columns: Vec<String> = keys.iter().map(|k| k.to_string()).collect();
    columns.extend(stats.iter().map(|s| s.to_string()));
    let rows = groups
        .into_iter()
        .map(|(key, acc)| {
            let mut row: Vec<Datum> = key.into_iter().map(Datum::Text).collect();
            row.extend(acc.iter().map(|vals| mean(vals).map(round2).into()));
            row
        })
        .collect();
    Table::from_rows(columns, rows)
}

/// Per-season averages for the filtered games of one player. Stats absent
/// from `full_fact` are left out.
pub fn season_summary(filtered: &Table, full_fact: &Table) -> Result<Table, TableError> {
    let stats: Vec<&str> = SUMMARY_STATS
        .iter()
        .copied()
        .filter(|s| full_fact.has_column(s))
        .collect();
    grouped_means(filtered, &["season"], &stats)
}

/// Per-(player, season) averages across every player, limited to the chosen
/// seasons, ordered by season then points descending.
pub fn leaderboard(fact: &Table, seasons: &[String]) -> Result<Table, TableError> {
    let in_seasons = filter_games(fact, None, seasons);
    let mut board = grouped_means(&in_seasons, &["player_name", "season"], &LEADERBOARD_STATS)?;
    let season_idx = board.column_index("season");
    let pts_idx = board.column_index("pts");
    board.sort_with(|a, b| {
        let by_season = season_idx
            .map(|i| a[i].total_cmp(&b[i]))
            .unwrap_or(std::cmp::Ordering::Equal);
        by_season.then_with(|| {
            pts_idx
                .map(|i| match (a[i].as_f64(), b[i].as_f64()) {
                    (Some(x), Some(y)) => y.total_cmp(&x),
                    _ => a[i].total_cmp(&b[i]),
                })
                .unwrap_or(std::cmp::Ordering::Equal)
        })
    });
    Ok(board)
}

#[derive(Debug, Clone, PartialEq)]
pub struct RecentForm {
    pub season_avg: f64,
    pub last10_avg: f64,
    pub delta: f64,
    /// The most recent games, oldest first.
    pub last_games: Vec<RecentGame>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RecentGame {
    pub date: NaiveDate,
    pub value: f64,
    pub matchup: String,
    pub wl: String,
}

/// Last ten games against the average of everything currently filtered.
pub fn recent_form(filtered: &Table, metric: &str) -> Option<RecentForm> {
    if filtered.is_empty() || !filtered.has_column("game_date") || !filtered.has_column(metric) {
        return None;
    }
    let mut sorted = filtered.clone();
    sorted.sort_by(&["game_date"]);
    let rows = sorted.len();
    let tail_start = rows.saturating_sub(RECENT_GAMES);

    let all: Vec<f64> = (0..rows)
        .filter_map(|i| sorted.get(i, metric).and_then(Datum::as_f64))
        .collect();
    let season_avg = mean(&all)?;

    let mut last_games = Vec::new();
    let mut last_values = Vec::new();
    for i in tail_start..rows {
        let value = sorted.get(i, metric).and_then(Datum::as_f64);
        if let Some(v) = value {
            last_values.push(v);
        }
        let Some(date) = sorted.get(i, "game_date").and_then(Datum::as_date) else {
            continue;
        };
        last_games.push(RecentGame {
            date,
            value: value.unwrap_or(0.0),
            matchup: text_at(&sorted, i, "matchup").unwrap_or_default(),
            wl: text_at(&sorted, i, "wl").unwrap_or_default(),
        });
    }
    let last10_avg = mean(&last_values)?;

    Some(RecentForm {
        season_avg,
        last10_avg,
        delta: last10_avg - season_avg,
        last_games,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round2_keeps_two_decimals() {
        assert_eq!(round2(2.345678), 2.35);
        assert_eq!(round2(-1.234), -1.23);
    }

    #[test]
    fn mean_of_nothing_is_none() {
        assert_eq!(mean(&[]), None);
    }

    #[test]
    fn grouped_means_yield_one_full_width_row_per_key() {
        let games = Table::from_rows(
            ["season", "pts", "reb"],
            vec![
                vec![Datum::from("2024-25"), Datum::Int(30), Datum::Null],
                vec![Datum::from("2023-24"), Datum::Int(10), Datum::Int(5)],
                vec![Datum::from("2023-24"), Datum::Int(21), Datum::Int(6)],
                vec![Datum::Null, Datum::Int(99), Datum::Int(99)],
            ],
        )
        .unwrap();
        let got = grouped_means(&games, &["season"], &["pts", "reb", "ast"]).unwrap();
        assert_eq!(got.columns(), ["season", "pts", "reb"]);
        assert_eq!(got.len(), 2);
        assert_eq!(got.get(0, "season"), Some(&Datum::from("2023-24")));
        assert_eq!(got.get(0, "pts"), Some(&Datum::Float(15.5)));
        assert_eq!(got.get(0, "reb"), Some(&Datum::Float(5.5)));
        assert_eq!(got.get(1, "reb"), Some(&Datum::Null));
    }
}
