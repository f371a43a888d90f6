use std::fs;
use std::path::PathBuf;

use hoops_trends::registry::{PlayerRegistry, TeamRegistry};
use hoops_trends::resolve::{
    DIM_PLAYER_COLUMNS, ResolveError, dim_players_table, dim_teams_table, resolve_player_ids,
};
use hoops_trends::table::Datum;

fn fixture_path(name: &str) -> PathBuf {
    let mut path = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    path.push("tests");
    path.push("fixtures");
    path.push(name);
    path
}

fn small_registry() -> PlayerRegistry {
    let raw = fs::read_to_string(fixture_path("registry_small.json"))
        .expect("fixture file should be readable");
    PlayerRegistry::from_json(&raw).expect("registry should parse")
}

fn names(list: &[&str]) -> Vec<String> {
    list.iter().map(|s| s.to_string()).collect()
}

#[test]
fn unaccented_name_finds_accented_player() {
    let players = resolve_player_ids(&small_registry(), &names(&["Nikola Jokic"])).unwrap();
    assert_eq!(players.len(), 1);
    assert_eq!(players[0].player_id, 203999);
    assert_eq!(players[0].player_name, "Nikola Jokic");
    assert_eq!(players[0].full_name_registry, "Nikola Jokić");
}

#[test]
fn active_match_wins_over_earlier_inactive_one() {
    let players = resolve_player_ids(&small_registry(), &names(&["Gary Payton"])).unwrap();
    assert_eq!(players[0].player_id, 1627780);
    assert_eq!(players[0].is_active, Some(true));
}

#[test]
fn inactive_only_match_is_used() {
    let players = resolve_player_ids(&small_registry(), &names(&["wilt chamberlain"])).unwrap();
    assert_eq!(players[0].player_id, 76375);
    assert_eq!(players[0].is_active, Some(false));
}

#[test]
fn unknown_name_aborts_resolution() {
    let err = resolve_player_ids(&small_registry(), &names(&["LeBron James", "Nobody Atall"]))
        .unwrap_err();
    assert_eq!(err, ResolveError::NotFound("Nobody Atall".to_string()));
    assert_eq!(err.to_string(), "could not find player: Nobody Atall");
}

#[test]
fn repeated_names_yield_one_row_per_id() {
    let players = resolve_player_ids(
        &small_registry(),
        &names(&["LeBron James", "Nikola Jokic", "lebron  james"]),
    )
    .unwrap();
    let ids: Vec<i64> = players.iter().map(|p| p.player_id).collect();
    assert_eq!(ids, vec![2544, 203999]);
    assert_eq!(players[0].player_name, "LeBron James");
}

#[test]
fn dim_players_has_fixed_columns() {
    let players = resolve_player_ids(&small_registry(), &names(&["LeBron James"])).unwrap();
    let table = dim_players_table(&players).unwrap();
    assert_eq!(table.columns(), DIM_PLAYER_COLUMNS);
    assert_eq!(table.get(0, "player_id"), Some(&Datum::Int(2544)));
    assert_eq!(table.get(0, "is_active"), Some(&Datum::Bool(true)));
}

#[test]
fn bundled_registry_resolves_default_players() {
    let registry = PlayerRegistry::bundled().unwrap();
    let players = resolve_player_ids(
        &registry,
        &names(&["Shai Gilgeous-Alexander", "Luka Doncic", "Stephen Curry"]),
    )
    .unwrap();
    let ids: Vec<i64> = players.iter().map(|p| p.player_id).collect();
    assert_eq!(ids, vec![1628983, 1629029, 201939]);
}

#[test]
fn bundled_registry_reaches_beyond_default_players() {
    let registry = PlayerRegistry::bundled().unwrap();
    let players = resolve_player_ids(
        &registry,
        &names(&["Chris Paul", "Paolo Banchero", "Jalen Williams", "Alperen Sengun"]),
    )
    .unwrap();
    let ids: Vec<i64> = players.iter().map(|p| p.player_id).collect();
    assert_eq!(ids, vec![101108, 1631094, 1631114, 1630578]);
}

#[test]
fn team_dimension_covers_every_franchise() {
    let teams = TeamRegistry::bundled().unwrap();
    let table = dim_teams_table(&teams).unwrap();
    assert_eq!(table.len(), 30);
    assert!(
        table
            .column("team_id")
            .unwrap()
            .all(|id| matches!(id, Datum::Int(v) if (1610612737..=1610612766).contains(v)))
    );
}
