use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::table::{Datum, Table};

const BUNDLED_PLAYERS: &str = include_str!("../assets/player_registry.json");
const BUNDLED_TEAMS: &str = include_str!("../assets/team_registry.json");

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistryPlayer {
    pub id: i64,
    pub full_name: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub is_active: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RegistryTeam {
    pub id: i64,
    pub full_name: String,
    pub abbreviation: String,
    pub nickname: String,
    pub city: String,
    pub state: String,
    pub year_founded: i64,
}

/// Static player list, shipped with the binary and optionally replaced by a
/// file with the same JSON layout.
#[derive(Debug, Clone)]
pub struct PlayerRegistry {
    players: Vec<RegistryPlayer>,
    folded: Vec<String>,
}

impl PlayerRegistry {
    pub fn bundled() -> Result<Self> {
        Self::from_json(BUNDLED_PLAYERS).context("parse bundled player registry")
    }

    pub fn from_path(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("read player registry {}", path.display()))?;
        Self::from_json(&raw).with_context(|| format!("parse player registry {}", path.display()))
    }

    pub fn from_json(raw: &str) -> Result<Self> {
        let players: Vec<RegistryPlayer> =
            serde_json::from_str(raw).context("invalid player registry json")?;
        Ok(Self::new(players))
    }

    pub fn new(players: Vec<RegistryPlayer>) -> Self {
        let folded = players.iter().map(|p| fold_name(&p.full_name)).collect();
        Self { players, folded }
    }

    pub fn players(&self) -> &[RegistryPlayer] {
        &self.players
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(&self.players).context("encode player registry")
    }

    pub fn len(&self) -> usize {
        self.players.len()
    }

    pub fn is_empty(&self) -> bool {
        self.players.is_empty()
    }

    /// Case- and accent-insensitive substring search on the full name, in
    /// registry order.
    pub fn find_players_by_full_name(&self, name: &str) -> Vec<&RegistryPlayer> {
        let needle = fold_name(name);
        if needle.is_empty() {
            return Vec::new();
        }
        self.players
            .iter()
            .zip(self.folded.iter())
            .filter(|(_, folded)| folded.contains(&needle))
            .map(|(p, _)| p)
            .collect()
    }
}

/// Converts a `commonallplayers` result set into registry entries, sorted by
/// last then first name so that search order matches the bundled list.
/// Rows without an id or a name are skipped.
pub fn players_from_table(table: &Table) -> Vec<RegistryPlayer> {
    let mut players: Vec<RegistryPlayer> = table
        .rows()
        .iter()
        .filter_map(|row| {
            let cell = |name: &str| table.column_index(name).map(|i| &row[i]);
            let id = cell("PERSON_ID")?.as_i64()?;
            let full_name = cell("DISPLAY_FIRST_LAST")?.as_str()?.trim().to_string();
            if full_name.is_empty() {
                return None;
            }
            let (last_name, first_name) = cell("DISPLAY_LAST_COMMA_FIRST")
                .and_then(Datum::as_str)
                .map(split_last_comma_first)
                .unwrap_or_else(|| split_full_name(&full_name));
            Some(RegistryPlayer {
                id,
                full_name,
                first_name,
                last_name,
                is_active: cell("ROSTERSTATUS").and_then(roster_status),
            })
        })
        .collect();
    players.sort_by(|a, b| {
        (fold_name(&a.last_name), fold_name(&a.first_name), a.id).cmp(&(
            fold_name(&b.last_name),
            fold_name(&b.first_name),
            b.id,
        ))
    });
    players
}

fn split_last_comma_first(raw: &str) -> (String, String) {
    match raw.split_once(',') {
        Some((last, first)) => (last.trim().to_string(), first.trim().to_string()),
        None => (raw.trim().to_string(), String::new()),
    }
}

fn split_full_name(full: &str) -> (String, String) {
    match full.split_once(' ') {
        Some((first, last)) => (last.trim().to_string(), first.to_string()),
        None => (full.to_string(), String::new()),
    }
}

fn roster_status(value: &Datum) -> Option<bool> {
    match value {
        Datum::Bool(b) => Some(*b),
        Datum::Int(v) => Some(*v == 1),
        Datum::Float(v) => Some(*v == 1.0),
        Datum::Text(s) => match s.trim().to_ascii_lowercase().as_str() {
            "1" | "active" => Some(true),
            "0" | "inactive" => Some(false),
            _ => None,
        },
        _ => None,
    }
}

#[derive(Debug, Clone)]
pub struct TeamRegistry {
    teams: Vec<RegistryTeam>,
}

impl TeamRegistry {
    pub fn bundled() -> Result<Self> {
        let teams: Vec<RegistryTeam> =
            serde_json::from_str(BUNDLED_TEAMS).context("parse bundled team registry")?;
        Ok(Self { teams })
    }

    pub fn teams(&self) -> &[RegistryTeam] {
        &self.teams
    }
}

/// Lowercases, strips Latin diacritics and collapses whitespace so that
/// "Nikola Jokic" finds "Nikola Jokić".
pub fn fold_name(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut last_space = true;
    for ch in raw.chars().flat_map(char::to_lowercase) {
        if ch.is_whitespace() {
            if !last_space {
                out.push(' ');
            }
            last_space = true;
            continue;
        }
        last_space = false;
        out.push(strip_accent(ch));
    }
    if out.ends_with(' ') {
        out.pop();
    }
    out
}

fn strip_accent(ch: char) -> char {
    match ch {
        'á' | 'à' | 'â' | 'ä' | 'ã' | 'å' | 'ā' | 'ă' | 'ą' => 'a',
        'ć' | 'č' | 'ç' => 'c',
        'ď' | 'đ' => 'd',
        'é' | 'è' | 'ê' | 'ë' | 'ē' | 'ė' | 'ę' | 'ě' => 'e',
        'ğ' => 'g',
        'í' | 'ì' | 'î' | 'ï' | 'ī' | 'ı' => 'i',
        'ł' | 'ľ' => 'l',
        'ñ' | 'ń' | 'ň' => 'n',
        'ó' | 'ò' | 'ô' | 'ö' | 'õ' | 'ø' | 'ō' | 'ő' => 'o',
        'ř' => 'r',
        'ś' | 'š' | 'ş' | 'ș' => 's',
        'ť' | 'ț' | 'ţ' => 't',
        'ú' | 'ù' | 'û' | 'ü' | 'ū' | 'ů' | 'ű' => 'u',
        'ý' | 'ÿ' => 'y',
        'ź' | 'ż' | 'ž' => 'z',
        other => other,
    }
}
