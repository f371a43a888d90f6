use criterion::{Criterion, criterion_group, criterion_main};
use std::hint::black_box;

use hoops_trends::dashboard::filter::{leaderboard, recent_form};
use hoops_trends::stats_api::parse_result_set_json;
use hoops_trends::table::{Datum, Table};
use hoops_trends::transform::{clean_player_games, make_player_trends};

const SEASONS: [&str; 2] = ["2023-24", "2024-25"];

/// Two seasons of 82 games for ten players, shaped like the extracted raw
/// table (upper-case API labels plus the added context columns).
fn synthetic_raw() -> Table {
    let mut table = Table::new([
        "Player_ID", "Game_ID", "GAME_DATE", "MATCHUP", "WL", "MIN", "PTS", "REB", "AST", "STL",
        "BLK", "TOV", "season", "player_id", "player_name",
    ]);
    for player in 0..10i64 {
        for (s, season) in SEASONS.iter().enumerate() {
            for game in 0..82i64 {
                let day = 1 + (game % 28) as u32;
                let month = ["NOV", "DEC", "JAN", "FEB", "MAR"][(game / 28) as usize % 5];
                let year = 2023 + s as i64 + if month == "NOV" || month == "DEC" { 0 } else { 1 };
                let seed = player * 31 + game * 7;
                let row = vec![
                    Datum::Int(player),
                    Datum::from(format!("00{}{:05}", 22 + s, player * 100 + game)),
                    Datum::from(format!("{month} {day:02}, {year}")),
                    Datum::from("AAA vs. BBB"),
                    Datum::from(if seed % 3 == 0 { "L" } else { "W" }),
                    Datum::Int(24 + seed % 14),
                    Datum::Int(8 + seed % 30),
                    Datum::Int(2 + seed % 12),
                    Datum::Int(1 + seed % 10),
                    Datum::Int(seed % 3),
                    Datum::Int(seed % 2),
                    Datum::Int(seed % 5),
                    Datum::from(*season),
                    Datum::Int(player),
                    Datum::from(format!("Player {player}")),
                ];
                table.push_row(row).unwrap();
            }
        }
    }
    table
}

fn bench_result_set_parse(c: &mut Criterion) {
    c.bench_function("result_set_parse", |b| {
        b.iter(|| {
            let table = parse_result_set_json(black_box(PLAYER_GAME_LOG_JSON)).unwrap();
            black_box(table.len());
        })
    });
}

fn bench_clean_player_games(c: &mut Criterion) {
    let raw = synthetic_raw();
    c.bench_function("clean_player_games", |b| {
        b.iter(|| {
            let fact = clean_player_games(black_box(&raw));
            black_box(fact.len());
        })
    });
}

fn bench_player_trends(c: &mut Criterion) {
    let fact = clean_player_games(&synthetic_raw());
    c.bench_function("make_player_trends", |b| {
        b.iter(|| {
            let trends = make_player_trends(black_box(&fact)).unwrap();
            black_box(trends.len());
        })
    });
}

fn bench_dashboard_views(c: &mut Criterion) {
    let fact = clean_player_games(&synthetic_raw());
    let seasons: Vec<String> = SEASONS.iter().map(|s| s.to_string()).collect();
    c.bench_function("leaderboard", |b| {
        b.iter(|| {
            let board = leaderboard(black_box(&fact), &seasons).unwrap();
            black_box(board.len());
        })
    });
    c.bench_function("recent_form", |b| {
        b.iter(|| {
            let form = recent_form(black_box(&fact), "pts");
            black_box(form.map(|f| f.delta));
        })
    });
}

criterion_group!(
    perf,
    bench_result_set_parse,
    bench_clean_player_games,
    bench_player_trends,
    bench_dashboard_views
);
criterion_main!(perf);

static PLAYER_GAME_LOG_JSON: &str = include_str!("../tests/fixtures/playergamelog.json");
