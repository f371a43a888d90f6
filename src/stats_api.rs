use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use reqwest::blocking::Client;
use serde::Deserialize;
use serde_json::Value;

use crate::http_client::http_client;
use crate::table::{Datum, Table};

pub const STATS_BASE_URL: &str = "https://stats.nba.com/stats";
const LEAGUE_ID_NBA: &str = "00";
const ERROR_BODY_PREVIEW: usize = 200;

/// Where per-entity game logs come from. The pipeline only ever talks to
/// this trait, so tests can hand it canned tables.
pub trait GameLogSource {
    fn player_game_log(&self, player_id: i64, season: &str, season_type: &str) -> Result<Table>;
    fn team_game_log(&self, team_id: i64, season: &str, season_type: &str) -> Result<Table>;
}

/// Where the full historical player list comes from.
pub trait PlayerListSource {
    fn all_players(&self, season: &str) -> Result<Table>;
}

pub struct NbaStatsClient {
    client: &'static Client,
    base_url: String,
}

impl NbaStatsClient {
    pub fn new(timeout: Duration) -> Result<Self> {
        Ok(Self {
            client: http_client(timeout)?,
            base_url: STATS_BASE_URL.to_string(),
        })
    }

    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    fn fetch_result_set(&self, endpoint: &str, params: &[(&str, String)]) -> Result<Table> {
        let url = format!("{}/{endpoint}", self.base_url);
        tracing::debug!(%url, ?params, "stats request");
        let resp = self
            .client
            .get(&url)
            .query(params)
            .send()
            .context("request failed")?;
        let status = resp.status();
        let body = resp.text().context("failed reading body")?;
        if !status.is_success() {
            let preview: String = body.chars().take(ERROR_BODY_PREVIEW).collect();
            return Err(anyhow!("http {status}: {preview}"));
        }
        parse_result_set_json(&body).with_context(|| format!("decode {endpoint} response"))
    }
}

impl GameLogSource for NbaStatsClient {
    fn player_game_log(&self, player_id: i64, season: &str, season_type: &str) -> Result<Table> {
        self.fetch_result_set(
            "playergamelog",
            &[
                ("PlayerID", player_id.to_string()),
                ("Season", season.to_string()),
                ("SeasonType", season_type.to_string()),
                ("LeagueID", LEAGUE_ID_NBA.to_string()),
                ("DateFrom", String::new()),
                ("DateTo", String::new()),
            ],
        )
    }

    fn team_game_log(&self, team_id: i64, season: &str, season_type: &str) -> Result<Table> {
        self.fetch_result_set(
            "teamgamelog",
            &[
                ("TeamID", team_id.to_string()),
                ("Season", season.to_string()),
                ("SeasonType", season_type.to_string()),
                ("LeagueID", LEAGUE_ID_NBA.to_string()),
                ("DateFrom", String::new()),
                ("DateTo", String::new()),
            ],
        )
    }
}

impl PlayerListSource for NbaStatsClient {
    fn all_players(&self, season: &str) -> Result<Table> {
        self.fetch_result_set(
            "commonallplayers",
            &[
                ("LeagueID", LEAGUE_ID_NBA.to_string()),
                ("Season", season.to_string()),
                ("IsOnlyCurrentSeason", "0".to_string()),
            ],
        )
    }
}

#[derive(Debug, Deserialize)]
struct StatsResponse {
    #[serde(rename = "resultSets", default)]
    result_sets: Vec<ResultSet>,
    // A handful of endpoints return a single object under this key instead.
    #[serde(rename = "resultSet", default)]
    result_set: Option<ResultSet>,
}

#[derive(Debug, Deserialize)]
struct ResultSet {
    #[serde(default)]
    headers: Vec<String>,
    #[serde(rename = "rowSet", default)]
    row_set: Vec<Vec<Value>>,
}

/// Decodes the first result set of a stats response into a table with the
/// site's own column labels.
pub fn parse_result_set_json(raw: &str) -> Result<Table> {
    let trimmed = raw.trim();
    if trimmed.is_empty() || trimmed == "null" {
        return Ok(Table::default());
    }
    let parsed: StatsResponse = serde_json::from_str(trimmed).context("invalid stats json")?;
    let set = parsed
        .result_sets
        .into_iter()
        .next()
        .or(parsed.result_set)
        .ok_or_else(|| anyhow!("response has no result set"))?;

    let mut table = Table::new(set.headers);
    for row in set.row_set {
        table.push_row(row.iter().map(Datum::from_json).collect())?;
    }
    Ok(table)
}
