use std::collections::VecDeque;

use chrono::NaiveDate;

use super::data::DashboardData;
use super::filter::{
    METRICS, date_bounds, filter_dates, filter_games, game_dates, player_options, season_options,
};
use crate::table::Table;

const MAX_LOGS: usize = 50;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tab {
    Trends,
    Summary,
    RecentForm,
}

impl Tab {
    pub const ALL: [Tab; 3] = [Tab::Trends, Tab::Summary, Tab::RecentForm];

    pub fn title(self) -> &'static str {
        match self {
            Tab::Trends => "Player Trends",
            Tab::Summary => "Season Summary",
            Tab::RecentForm => "Recent Form",
        }
    }

    pub fn index(self) -> usize {
        match self {
            Tab::Trends => 0,
            Tab::Summary => 1,
            Tab::RecentForm => 2,
        }
    }
}

/// Which end of the date range the +/- keys move.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateBound {
    Start,
    End,
}

pub struct DashboardState {
    pub data: DashboardData,
    pub tab: Tab,
    pub players: Vec<String>,
    pub player_idx: usize,
    pub seasons: Vec<String>,
    pub season_selected: Vec<bool>,
    pub season_cursor: usize,
    pub metric_idx: usize,
    pub use_rolling: bool,
    pub date_range: Option<(NaiveDate, NaiveDate)>,
    pub date_bound: DateBound,
    pub log_scroll: usize,
    pub help_overlay: bool,
    pub logs: VecDeque<String>,
    /// Fact rows after player, season and date filters.
    pub fact_view: Table,
    /// Trend rows after the same filters.
    pub trends_view: Table,
    // Player+season filtered fact, before the date filter; the date range
    // steps through its game dates.
    fact_undated: Table,
}

impl DashboardState {
    pub fn new(data: DashboardData) -> Self {
        let players = player_options(&data.players);
        let seasons = season_options(&data.fact);
        let season_selected = vec![true; seasons.len()];
        let mut state = Self {
            data,
            tab: Tab::Trends,
            players,
            player_idx: 0,
            seasons,
            season_selected,
            season_cursor: 0,
            metric_idx: 0,
            use_rolling: true,
            date_range: None,
            date_bound: DateBound::Start,
            log_scroll: 0,
            help_overlay: false,
            logs: VecDeque::new(),
            fact_view: Table::default(),
            trends_view: Table::default(),
            fact_undated: Table::default(),
        };
        state.reset_dates();
        state
    }

    pub fn selected_player(&self) -> Option<&str> {
        self.players.get(self.player_idx).map(String::as_str)
    }

    pub fn selected_seasons(&self) -> Vec<String> {
        self.seasons
            .iter()
            .zip(self.season_selected.iter())
            .filter(|(_, on)| **on)
            .map(|(s, _)| s.clone())
            .collect()
    }

    pub fn metric(&self) -> &'static str {
        METRICS[self.metric_idx].1
    }

    pub fn metric_label(&self) -> &'static str {
        METRICS[self.metric_idx].0
    }

    pub fn push_log(&mut self, msg: impl Into<String>) {
        self.logs.push_back(msg.into());
        while self.logs.len() > MAX_LOGS {
            self.logs.pop_front();
        }
    }

    pub fn next_tab(&mut self) {
        let idx = (self.tab.index() + 1) % Tab::ALL.len();
        self.tab = Tab::ALL[idx];
    }

    pub fn select_tab(&mut self, tab: Tab) {
        self.tab = tab;
    }

    pub fn cycle_player(&mut self, forward: bool) {
        if self.players.is_empty() {
            return;
        }
        let n = self.players.len();
        self.player_idx = if forward {
            (self.player_idx + 1) % n
        } else {
            (self.player_idx + n - 1) % n
        };
        self.reset_dates();
        if let Some(name) = self.selected_player().map(str::to_string) {
            self.push_log(format!("[INFO] Player: {name}"));
        }
    }

    pub fn move_season_cursor(&mut self, forward: bool) {
        if self.seasons.is_empty() {
            return;
        }
        let n = self.seasons.len();
        self.season_cursor = if forward {
            (self.season_cursor + 1) % n
        } else {
            (self.season_cursor + n - 1) % n
        };
    }

    pub fn toggle_season(&mut self) {
        let Some(flag) = self.season_selected.get_mut(self.season_cursor) else {
            return;
        };
        *flag = !*flag;
        self.reset_dates();
    }

    pub fn cycle_metric(&mut self) {
        self.metric_idx = (self.metric_idx + 1) % METRICS.len();
    }

    pub fn toggle_rolling(&mut self) {
        self.use_rolling = !self.use_rolling;
    }

    pub fn toggle_date_bound(&mut self) {
        self.date_bound = match self.date_bound {
            DateBound::Start => DateBound::End,
            DateBound::End => DateBound::Start,
        };
    }

    /// Moves the active end of the date range to the neighbouring game date,
    /// never letting start pass end.
    pub fn step_date(&mut self, forward: bool) {
        let Some((start, end)) = self.date_range else {
            return;
        };
        let dates = game_dates(&self.fact_undated);
        let current = match self.date_bound {
            DateBound::Start => start,
            DateBound::End => end,
        };
        let next = if forward {
            dates.iter().copied().find(|d| *d > current)
        } else {
            dates.iter().rev().copied().find(|d| *d < current)
        };
        let Some(next) = next else {
            return;
        };
        let range = match self.date_bound {
            DateBound::Start if next <= end => (next, end),
            DateBound::End if next >= start => (start, next),
            _ => return,
        };
        self.date_range = Some(range);
        self.refresh();
    }

    /// Resets the date range to span the current player's filtered games.
    pub fn reset_dates(&mut self) {
        let seasons = self.selected_seasons();
        self.fact_undated = filter_games(&self.data.fact, self.selected_player(), &seasons);
        self.date_range = date_bounds(&self.fact_undated);
        self.refresh();
    }

    pub fn scroll_log(&mut self, down: bool) {
        if down {
            if self.log_scroll + 1 < self.fact_view.len() {
                self.log_scroll += 1;
            }
        } else {
            self.log_scroll = self.log_scroll.saturating_sub(1);
        }
    }

    fn refresh(&mut self) {
        let seasons = self.selected_seasons();
        let trends = filter_games(&self.data.trends, self.selected_player(), &seasons);
        match self.date_range {
            Some((start, end)) if !self.fact_undated.is_empty() => {
                self.fact_view = filter_dates(&self.fact_undated, start, end);
                self.trends_view = filter_dates(&trends, start, end);
            }
            _ => {
                self.fact_view = self.fact_undated.clone();
                self.trends_view = trends;
            }
        }
        self.fact_view.sort_by(&["game_date"]);
        self.trends_view.sort_by(&["game_date"]);
        self.log_scroll = self.log_scroll.min(self.fact_view.len().saturating_sub(1));
    }
}
