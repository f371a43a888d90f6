use std::cell::{Cell, RefCell};
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Result, anyhow};
use hoops_trends::config::{DataPaths, PipelineConfig};
use hoops_trends::dashboard::{DashboardError, DashboardState, check_data, load_data};
use hoops_trends::extract::{Pacer, extract_player_game_logs};
use hoops_trends::parquet_io::read_table;
use hoops_trends::pipeline::{
    load_player_registry, refresh_player_registry, run, unresolved_names,
};
use hoops_trends::registry::PlayerRegistry;
use hoops_trends::resolve::resolve_player_ids;
use hoops_trends::stats_api::{GameLogSource, PlayerListSource, parse_result_set_json};
use hoops_trends::table::{Datum, Table};
use hoops_trends::transform::{TEAM_GAME_COLUMNS, clean_player_games};

const JOKIC: i64 = 203999;
const LEBRON: i64 = 2544;
const NUGGETS: i64 = 1610612743;
const LAKERS: i64 = 1610612747;

fn read_fixture(name: &str) -> String {
    let mut path = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    path.push("tests");
    path.push("fixtures");
    path.push(name);
    fs::read_to_string(path).expect("fixture file should be readable")
}

fn small_registry() -> PlayerRegistry {
    PlayerRegistry::from_json(&read_fixture("registry_small.json")).expect("registry should parse")
}

fn next_season_games() -> Table {
    let mut table = Table::new(["Player_ID", "Game_ID", "GAME_DATE", "MATCHUP", "WL", "PTS", "REB", "AST"]);
    let games = [
        ("0022400061", "OCT 24, 2024", "DEN vs. OKC", "L", 16, 20, 16),
        ("0022400077", "OCT 26, 2024", "DEN @ LAC", "L", 41, 12, 8),
        ("0022400093", "OCT 28, 2024", "DEN vs. BKN", "W", 29, 18, 16),
    ];
    for (game, day, matchup, wl, pts, reb, ast) in games {
        table
            .push_row(vec![
                Datum::Int(JOKIC),
                Datum::from(game),
                Datum::from(day),
                Datum::from(matchup),
                Datum::from(wl),
                Datum::Int(pts),
                Datum::Int(reb),
                Datum::Int(ast),
            ])
            .unwrap();
    }
    table
}

/// Jokić has two seasons of games, LeBron's first season errors and his
/// second comes back empty. Denver has one season of team games, the
/// Lakers' second season errors.
struct FakeSource {
    calls: Cell<usize>,
}

impl FakeSource {
    fn new() -> Self {
        Self {
            calls: Cell::new(0),
        }
    }
}

impl GameLogSource for FakeSource {
    fn player_game_log(&self, player_id: i64, season: &str, _season_type: &str) -> Result<Table> {
        self.calls.set(self.calls.get() + 1);
        match (player_id, season) {
            (JOKIC, "2023-24") => parse_result_set_json(&read_fixture("playergamelog.json")),
            (JOKIC, "2024-25") => Ok(next_season_games()),
            (LEBRON, "2023-24") => Err(anyhow!("http 429 Too Many Requests")),
            _ => Ok(Table::default()),
        }
    }

    fn team_game_log(&self, team_id: i64, season: &str, _season_type: &str) -> Result<Table> {
        self.calls.set(self.calls.get() + 1);
        match (team_id, season) {
            (NUGGETS, "2023-24") => parse_result_set_json(&read_fixture("teamgamelog.json")),
            (LAKERS, "2024-25") => Err(anyhow!("http 500 Internal Server Error")),
            _ => Ok(Table::default()),
        }
    }
}

/// Serves the player list fixture, or an empty result set when `empty`.
struct FakePlayerList {
    empty: bool,
    seasons: RefCell<Vec<String>>,
}

impl FakePlayerList {
    fn new(empty: bool) -> Self {
        Self {
            empty,
            seasons: RefCell::new(Vec::new()),
        }
    }
}

impl PlayerListSource for FakePlayerList {
    fn all_players(&self, season: &str) -> Result<Table> {
        self.seasons.borrow_mut().push(season.to_string());
        if self.empty {
            let raw = r#"{"resultSets":[{"headers":["PERSON_ID"],"rowSet":[]}]}"#;
            return parse_result_set_json(raw);
        }
        parse_result_set_json(&read_fixture("commonallplayers.json"))
    }
}

fn test_config(data_dir: PathBuf) -> PipelineConfig {
    PipelineConfig {
        seasons: vec!["2023-24".to_string(), "2024-25".to_string()],
        player_names: vec!["Nikola Jokic".to_string(), "LeBron James".to_string()],
        paths: DataPaths::new(data_dir),
        request_delay: Duration::ZERO,
        ..PipelineConfig::default()
    }
}

#[test]
fn extraction_skips_failures_and_concatenates() {
    let registry = small_registry();
    let names = vec!["Nikola Jokic".to_string(), "LeBron James".to_string()];
    let players = resolve_player_ids(&registry, &names).unwrap();
    let seasons = vec!["2023-24".to_string(), "2024-25".to_string()];
    let source = FakeSource::new();

    let got = extract_player_game_logs(&source, &players, &seasons, "Regular Season", &Pacer::none());
    assert_eq!(got.calls, 4);
    assert_eq!(source.calls.get(), 4);
    assert_eq!(got.empty, 1);
    assert_eq!(got.failures.len(), 1);
    assert_eq!(got.failures[0].entity_id, LEBRON);
    assert_eq!(got.failures[0].season, "2023-24");
    assert!(got.failures[0].message.contains("429"));

    assert_eq!(got.table.len(), 8);
    assert!(got.table.has_column("season"));
    assert!(got.table.has_column("player_name"));
    // the second season lacks most box-score columns
    assert_eq!(got.table.get(7, "FGM"), Some(&Datum::Null));
    assert_eq!(got.table.get(7, "season"), Some(&Datum::from("2024-25")));
}

#[test]
fn extraction_with_nothing_returned_keeps_context_columns() {
    let registry = small_registry();
    let players = resolve_player_ids(&registry, &["Wilt Chamberlain".to_string()]).unwrap();
    let got = extract_player_game_logs(
        &FakeSource::new(),
        &players,
        &["2023-24".to_string()],
        "Regular Season",
        &Pacer::none(),
    );
    assert!(got.table.is_empty());
    assert_eq!(got.table.columns(), ["season", "player_id", "player_name"]);
}

#[test]
fn run_writes_every_table() {
    let dir = tempfile::tempdir().unwrap();
    let cfg = test_config(dir.path().to_path_buf());
    let summary = run(&cfg, &small_registry(), &FakeSource::new()).unwrap();

    assert_eq!(summary.players, 2);
    assert_eq!(summary.player_games, 7);
    assert_eq!(summary.trend_rows, 7);
    assert_eq!(summary.calls, 4);
    assert_eq!(summary.failures.len(), 1);
    assert_eq!(summary.teams, None);
    assert_eq!(summary.files.len(), 5);
    for file in &summary.files {
        assert!(file.path.exists(), "{} missing", file.path.display());
        assert_eq!(file.sha256.len(), 64);
    }

    let fact = read_table(&cfg.paths.fact_player_game()).unwrap();
    assert_eq!(fact.len(), 7);
    assert!(fact.column("game_date").unwrap().all(|d| matches!(d, Datum::Date(_))));

    let trends = read_table(&cfg.paths.mart_player_trends()).unwrap();
    assert!(trends.has_column("pts_roll10"));
    let dims = read_table(&cfg.paths.dim_players()).unwrap();
    assert_eq!(dims.len(), 2);
}

#[test]
fn run_with_teams_writes_team_tables() {
    let dir = tempfile::tempdir().unwrap();
    let mut cfg = test_config(dir.path().to_path_buf());
    cfg.with_teams = true;
    let source = FakeSource::new();
    let summary = run(&cfg, &small_registry(), &source).unwrap();

    assert_eq!(summary.teams, Some(30));
    assert_eq!(summary.team_games, Some(3));
    // 2 players and 30 teams, over 2 seasons
    assert_eq!(summary.calls, 64);
    assert_eq!(source.calls.get(), 64);
    let failed: Vec<i64> = summary.failures.iter().map(|f| f.entity_id).collect();
    assert_eq!(failed, vec![LEBRON, LAKERS]);

    assert_eq!(summary.files.len(), 8);
    for path in [
        cfg.paths.raw_team_gamelogs(),
        cfg.paths.dim_teams(),
        cfg.paths.fact_team_game(),
    ] {
        assert!(summary.files.iter().any(|f| f.path == path), "{} not reported", path.display());
        assert!(path.exists(), "{} missing", path.display());
    }

    let raw = read_table(&cfg.paths.raw_team_gamelogs()).unwrap();
    assert_eq!(raw.len(), 4);

    let dims = read_table(&cfg.paths.dim_teams()).unwrap();
    assert_eq!(dims.len(), 30);

    let fact = read_table(&cfg.paths.fact_team_game()).unwrap();
    assert_eq!(fact.len(), 3);
    for col in fact.columns() {
        assert!(TEAM_GAME_COLUMNS.contains(&col.as_str()), "unexpected column {col}");
    }
    assert_eq!(fact.columns().iter().filter(|c| *c == "team_id").count(), 1);
    assert!(!fact.has_column("w_pct"));
    let games: Vec<&str> = fact.column("game_id").unwrap().filter_map(Datum::as_str).collect();
    assert_eq!(games, vec!["0022301196", "0022301179", "0022301161"]);
    assert!(fact.column("team_name").unwrap().all(|n| n == &Datum::from("Denver Nuggets")));
    assert!(fact.column("team_id").unwrap().all(|id| id == &Datum::Int(NUGGETS)));
    assert!(fact.column("game_date").unwrap().all(|d| matches!(d, Datum::Date(_))));
}

#[test]
fn run_without_teams_skips_team_tables() {
    let dir = tempfile::tempdir().unwrap();
    let cfg = test_config(dir.path().to_path_buf());
    let source = FakeSource::new();
    run(&cfg, &small_registry(), &source).unwrap();
    assert_eq!(source.calls.get(), 4);
    assert!(!cfg.paths.fact_team_game().exists());
    assert!(!cfg.paths.dim_teams().exists());
}

#[test]
fn refreshed_registry_is_cached_and_preferred() {
    let dir = tempfile::tempdir().unwrap();
    let mut cfg = test_config(dir.path().to_path_buf());
    cfg.player_names = vec!["Zach Edey".to_string(), "Jalen Duren".to_string()];

    let bundled = load_player_registry(&cfg).unwrap();
    assert_eq!(
        unresolved_names(&bundled, &cfg.player_names),
        vec!["Zach Edey", "Jalen Duren"]
    );

    let source = FakePlayerList::new(false);
    let fresh = refresh_player_registry(&cfg, &source).unwrap();
    assert_eq!(*source.seasons.borrow(), vec!["2024-25".to_string()]);
    assert_eq!(fresh.len(), 5);
    assert!(cfg.paths.player_registry_cache().is_file());

    let cached = load_player_registry(&cfg).unwrap();
    assert_eq!(cached.len(), 5);
    assert!(unresolved_names(&cached, &cfg.player_names).is_empty());
    let players = resolve_player_ids(&cached, &cfg.player_names).unwrap();
    let ids: Vec<i64> = players.iter().map(|p| p.player_id).collect();
    assert_eq!(ids, vec![1641744, 1631105]);

    let jordan = resolve_player_ids(&cached, &["Michael Jordan".to_string()]).unwrap();
    assert_eq!(jordan[0].is_active, Some(false));
    let jokic = resolve_player_ids(&cached, &["Nikola Jokic".to_string()]).unwrap();
    assert_eq!(jokic[0].full_name_registry, "Nikola Jokić");
}

#[test]
fn explicit_registry_beats_cache() {
    let dir = tempfile::tempdir().unwrap();
    let mut cfg = test_config(dir.path().to_path_buf());
    refresh_player_registry(&cfg, &FakePlayerList::new(false)).unwrap();

    let mut path = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    path.push("tests/fixtures/registry_small.json");
    cfg.player_registry = Some(path);
    let registry = load_player_registry(&cfg).unwrap();
    assert_eq!(registry.len(), small_registry().len());
}

#[test]
fn empty_player_list_keeps_previous_registry() {
    let dir = tempfile::tempdir().unwrap();
    let cfg = test_config(dir.path().to_path_buf());
    assert!(refresh_player_registry(&cfg, &FakePlayerList::new(true)).is_err());
    assert!(!cfg.paths.player_registry_cache().exists());
    assert!(!cfg.paths.raw_dir.join("player_registry.json.tmp").exists());

    let registry = load_player_registry(&cfg).unwrap();
    assert_eq!(registry.len(), PlayerRegistry::bundled().unwrap().len());
}

#[test]
fn parquet_round_trip_preserves_cells() {
    let dir = tempfile::tempdir().unwrap();
    let mut raw = parse_result_set_json(&read_fixture("playergamelog.json")).unwrap();
    raw.set_constant("season", Datum::from("2023-24"));
    raw.set_constant("player_id", Datum::Int(JOKIC));
    raw.set_constant("player_name", Datum::from("Nikola Jokic"));
    let fact = clean_player_games(&raw);

    let path = dir.path().join("fact.parquet");
    hoops_trends::parquet_io::write_table(&fact, &path).unwrap();
    let back = read_table(&path).unwrap();
    assert_eq!(back, fact);
}

#[test]
fn reruns_write_identical_bytes() {
    let dir = tempfile::tempdir().unwrap();
    let cfg = test_config(dir.path().to_path_buf());
    let first = run(&cfg, &small_registry(), &FakeSource::new()).unwrap();
    let second = run(&cfg, &small_registry(), &FakeSource::new()).unwrap();
    assert_eq!(first.files, second.files);

    let other = tempfile::tempdir().unwrap();
    let third = run(
        &test_config(other.path().to_path_buf()),
        &small_registry(),
        &FakeSource::new(),
    )
    .unwrap();
    let digests = |files: &[hoops_trends::pipeline::WrittenFile]| -> Vec<String> {
        files.iter().map(|f| f.sha256.clone()).collect()
    };
    assert_eq!(digests(&first.files), digests(&third.files));
}

#[test]
fn unknown_player_stops_the_run_before_fetching() {
    let dir = tempfile::tempdir().unwrap();
    let mut cfg = test_config(dir.path().to_path_buf());
    cfg.player_names.push("Nobody Atall".to_string());
    let source = FakeSource::new();
    let err = run(&cfg, &small_registry(), &source).unwrap_err();
    assert!(err.to_string().contains("Nobody Atall"));
    assert_eq!(source.calls.get(), 0);
    assert!(!cfg.paths.fact_player_game().exists());
}

#[test]
fn dashboard_reports_missing_files() {
    let dir = tempfile::tempdir().unwrap();
    let paths = DataPaths::new(dir.path());
    let err = check_data(&paths).unwrap_err();
    let DashboardError::MissingData { missing } = &err;
    assert_eq!(missing.len(), 3);
    assert!(err.to_string().contains("cargo run --bin pipeline"));
    assert!(load_data(&paths).is_err());
}

#[test]
fn dashboard_filters_follow_selection() {
    let dir = tempfile::tempdir().unwrap();
    let cfg = test_config(dir.path().to_path_buf());
    run(&cfg, &small_registry(), &FakeSource::new()).unwrap();

    let data = load_data(&cfg.paths).unwrap();
    let mut state = DashboardState::new(data);
    assert_eq!(state.players, vec!["LeBron James", "Nikola Jokic"]);
    assert_eq!(state.seasons, vec!["2023-24", "2024-25"]);
    assert!(state.fact_view.is_empty());

    state.cycle_player(true);
    assert_eq!(state.selected_player(), Some("Nikola Jokic"));
    assert_eq!(state.fact_view.len(), 7);
    assert_eq!(state.trends_view.len(), 7);

    // cursor starts on 2023-24
    state.toggle_season();
    assert_eq!(state.selected_seasons(), vec!["2024-25"]);
    assert_eq!(state.fact_view.len(), 3);
    assert!(
        state
            .fact_view
            .column("season")
            .unwrap()
            .all(|s| s == &Datum::from("2024-25"))
    );

    state.step_date(true);
    assert_eq!(state.fact_view.len(), 2);
    state.reset_dates();
    assert_eq!(state.fact_view.len(), 3);
}
