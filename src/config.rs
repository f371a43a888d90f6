use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};

/// Seasons in the stats site's `YYYY-YY` format.
pub const DEFAULT_SEASONS: [&str; 2] = ["2023-24", "2024-25"];
pub const DEFAULT_SEASON_TYPE: &str = "Regular Season";

pub const DEFAULT_PLAYER_NAMES: [&str; 10] = [
    "Nikola Jokic",
    "Shai Gilgeous-Alexander",
    "Luka Doncic",
    "Giannis Antetokounmpo",
    "Jayson Tatum",
    "Anthony Edwards",
    "Stephen Curry",
    "LeBron James",
    "Kevin Durant",
    "Joel Embiid",
];

pub const DEFAULT_DATA_DIR: &str = "data";
pub const DEFAULT_REQUEST_DELAY_MS: u64 = 700;
pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 30;

const ENV_DATA_DIR: &str = "HOOPS_DATA_DIR";
const ENV_SEASONS: &str = "HOOPS_SEASONS";
const ENV_PLAYERS: &str = "HOOPS_PLAYERS";
const ENV_SEASON_TYPE: &str = "HOOPS_SEASON_TYPE";
const ENV_REQUEST_DELAY_MS: &str = "HOOPS_REQUEST_DELAY_MS";
const ENV_HTTP_TIMEOUT_SECS: &str = "HOOPS_HTTP_TIMEOUT_SECS";
const ENV_PLAYER_REGISTRY: &str = "HOOPS_PLAYER_REGISTRY";

/// Where every artifact lives. Raw snapshots and processed tables are kept
/// in sibling directories under one data root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataPaths {
    pub data_dir: PathBuf,
    pub raw_dir: PathBuf,
    pub processed_dir: PathBuf,
}

impl DataPaths {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        let data_dir = data_dir.into();
        Self {
            raw_dir: data_dir.join("raw"),
            processed_dir: data_dir.join("processed"),
            data_dir,
        }
    }

    pub fn ensure_dirs(&self) -> Result<()> {
        for dir in [&self.raw_dir, &self.processed_dir] {
            fs::create_dir_all(dir).with_context(|| format!("create {}", dir.display()))?;
        }
        Ok(())
    }

    pub fn raw_players(&self) -> PathBuf {
        self.raw_dir.join("raw_players.parquet")
    }

    pub fn raw_player_gamelogs(&self) -> PathBuf {
        self.raw_dir.join("raw_player_gamelogs.parquet")
    }

    /// Player list fetched from the stats site, preferred over the bundled
    /// one once present.
    pub fn player_registry_cache(&self) -> PathBuf {
        self.raw_dir.join("player_registry.json")
    }

    pub fn raw_team_gamelogs(&self) -> PathBuf {
        self.raw_dir.join("raw_team_gamelogs.parquet")
    }

    pub fn dim_players(&self) -> PathBuf {
        processed_file(&self.processed_dir, "dim_players")
    }

    pub fn fact_player_game(&self) -> PathBuf {
        processed_file(&self.processed_dir, "fact_player_game")
    }

    pub fn mart_player_trends(&self) -> PathBuf {
        processed_file(&self.processed_dir, "mart_player_trends")
    }

    pub fn dim_teams(&self) -> PathBuf {
        processed_file(&self.processed_dir, "dim_teams")
    }

    pub fn fact_team_game(&self) -> PathBuf {
        processed_file(&self.processed_dir, "fact_team_game")
    }
}

fn processed_file(dir: &Path, table: &str) -> PathBuf {
    dir.join(format!("{table}.parquet"))
}

#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub seasons: Vec<String>,
    pub season_type: String,
    pub player_names: Vec<String>,
    pub paths: DataPaths,
    pub request_delay: Duration,
    pub http_timeout: Duration,
    pub player_registry: Option<PathBuf>,
    pub with_teams: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            seasons: DEFAULT_SEASONS.iter().map(|s| s.to_string()).collect(),
            season_type: DEFAULT_SEASON_TYPE.to_string(),
            player_names: DEFAULT_PLAYER_NAMES.iter().map(|s| s.to_string()).collect(),
            paths: DataPaths::new(DEFAULT_DATA_DIR),
            request_delay: Duration::from_millis(DEFAULT_REQUEST_DELAY_MS),
            http_timeout: Duration::from_secs(DEFAULT_HTTP_TIMEOUT_SECS),
            player_registry: None,
            with_teams: false,
        }
    }
}

impl PipelineConfig {
    /// Defaults overlaid with `HOOPS_*` variables from the process env.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut cfg = Self::default();
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(dir) = get(ENV_DATA_DIR) {
            cfg.paths = DataPaths::new(dir.trim());
        }
        if let Some(seasons) = get(ENV_SEASONS).map(|v| split_list(&v)) {
            if !seasons.is_empty() {
                cfg.seasons = seasons;
            }
        }
        if let Some(players) = get(ENV_PLAYERS).map(|v| split_list(&v)) {
            if !players.is_empty() {
                cfg.player_names = players;
            }
        }
        if let Some(season_type) = get(ENV_SEASON_TYPE) {
            cfg.season_type = season_type.trim().to_string();
        }
        if let Some(ms) = get(ENV_REQUEST_DELAY_MS).and_then(|v| v.trim().parse::<u64>().ok()) {
            cfg.request_delay = Duration::from_millis(ms);
        }
        if let Some(secs) = get(ENV_HTTP_TIMEOUT_SECS).and_then(|v| v.trim().parse::<u64>().ok())
        {
            cfg.http_timeout = Duration::from_secs(secs.max(1));
        }
        if let Some(path) = get(ENV_PLAYER_REGISTRY) {
            cfg.player_registry = Some(PathBuf::from(path.trim()));
        }
        cfg
    }
}

/// Splits a comma separated list, dropping blanks.
pub fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}
