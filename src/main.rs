use std::io;
use std::path::PathBuf;
use std::time::{Duration, Instant};

use anyhow::Result;
use clap::Parser;
use crossterm::event::{
    self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEvent, KeyEventKind,
};
use crossterm::execute;
use crossterm::terminal::{
    EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode,
};
use ratatui::layout::{Constraint, Direction, Layout};
use ratatui::prelude::*;
use ratatui::style::{Color, Modifier, Style};
use ratatui::symbols::Marker;
use ratatui::widgets::{
    Axis, Bar, BarChart, BarGroup, Block, Borders, Chart, Clear, Dataset, GraphType, Paragraph,
    Row, Table as TuiTable, Tabs,
};

use hoops_trends::config::{DataPaths, PipelineConfig};
use hoops_trends::dashboard::filter::{leaderboard, recent_form, season_summary, series};
use hoops_trends::dashboard::{DashboardState, DateBound, Tab, load_data};
use hoops_trends::table::Table;
use hoops_trends::transform::roll_column;

const GAME_LOG_COLUMNS: [&str; 8] = [
    "game_date", "season", "matchup", "wl", "min", "pts", "reb", "ast",
];
const MAX_CELL_WIDTH: usize = 24;

/// Terminal dashboard over the processed player tables.
#[derive(Debug, Parser)]
#[command(name = "hoops_trends", version)]
struct Cli {
    /// Data root written by the pipeline.
    #[arg(long)]
    data_dir: Option<PathBuf>,
}

struct App {
    state: DashboardState,
    should_quit: bool,
}

impl App {
    fn new(state: DashboardState) -> Self {
        Self {
            state,
            should_quit: false,
        }
    }

    fn on_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Char('q') => self.should_quit = true,
            KeyCode::Tab => self.state.next_tab(),
            KeyCode::Char('1') => self.state.select_tab(Tab::Trends),
            KeyCode::Char('2') => self.state.select_tab(Tab::Summary),
            KeyCode::Char('3') => self.state.select_tab(Tab::RecentForm),
            KeyCode::Char('p') => self.state.cycle_player(true),
            KeyCode::Char('P') => self.state.cycle_player(false),
            KeyCode::Char(']') => self.state.move_season_cursor(true),
            KeyCode::Char('[') => self.state.move_season_cursor(false),
            KeyCode::Char(' ') => {
                self.state.toggle_season();
                if self.state.selected_seasons().is_empty() {
                    self.state.push_log("[WARN] No seasons selected");
                }
            }
            KeyCode::Char('m') => {
                self.state.cycle_metric();
                let label = self.state.metric_label();
                self.state.push_log(format!("[INFO] Metric: {label}"));
            }
            KeyCode::Char('r') => self.state.toggle_rolling(),
            KeyCode::Char('d') => self.state.toggle_date_bound(),
            KeyCode::Char('+') | KeyCode::Char('=') => self.state.step_date(true),
            KeyCode::Char('-') => self.state.step_date(false),
            KeyCode::Char('x') => {
                self.state.reset_dates();
                self.state.push_log("[INFO] Date range reset");
            }
            KeyCode::Char('j') | KeyCode::Down => self.state.scroll_log(true),
            KeyCode::Char('k') | KeyCode::Up => self.state.scroll_log(false),
            KeyCode::Char('?') => self.state.help_overlay = !self.state.help_overlay,
            KeyCode::Esc => self.state.help_overlay = false,
            _ => {}
        }
    }
}

fn main() -> Result<()> {
    let _ = dotenvy::from_filename(".env.local");
    let _ = dotenvy::from_filename(".env");

    let cli = Cli::parse();
    let paths = cli
        .data_dir
        .map(DataPaths::new)
        .unwrap_or_else(|| PipelineConfig::from_env().paths);

    let data = match load_data(&paths) {
        Ok(data) => data,
        Err(err) => {
            eprintln!("error: {err:#}");
            std::process::exit(1);
        }
    };
    let mut app = App::new(DashboardState::new(data));
    app.state.push_log(format!(
        "[INFO] Loaded {} games for {} players",
        app.state.data.fact.len(),
        app.state.players.len()
    ));

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = ratatui::backend::CrosstermBackend::new(stdout);
    let mut terminal = ratatui::Terminal::new(backend)?;

    let res = run_app(&mut terminal, &mut app);

    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    if let Err(err) = res {
        eprintln!("error: {err}");
    }
    Ok(())
}

fn run_app<B: Backend>(terminal: &mut Terminal<B>, app: &mut App) -> io::Result<()> {
    let tick_rate = Duration::from_millis(250);
    let mut last_tick = Instant::now();

    loop {
        terminal.draw(|f| ui(f, app))?;

        let timeout = tick_rate
            .checked_sub(last_tick.elapsed())
            .unwrap_or(Duration::ZERO);
        if event::poll(timeout)? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press {
                    app.on_key(key);
                }
            }
        }

        if last_tick.elapsed() >= tick_rate {
            last_tick = Instant::now();
        }

        if app.should_quit {
            return Ok(());
        }
    }
}

fn ui(frame: &mut Frame, app: &App) {
    let state = &app.state;
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(2),
            Constraint::Length(3),
            Constraint::Length(3),
            Constraint::Min(1),
            Constraint::Length(5),
            Constraint::Length(1),
        ])
        .split(frame.size());

    let header = Paragraph::new(header_text(state))
        .style(Style::default().add_modifier(Modifier::BOLD));
    frame.render_widget(header, chunks[0]);

    let filters = Paragraph::new(filter_line(state))
        .block(Block::default().title("Filters").borders(Borders::ALL));
    frame.render_widget(filters, chunks[1]);

    let titles: Vec<&str> = Tab::ALL.iter().map(|t| t.title()).collect();
    let tabs = Tabs::new(titles)
        .select(state.tab.index())
        .block(Block::default().borders(Borders::ALL))
        .highlight_style(
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD),
        );
    frame.render_widget(tabs, chunks[2]);

    match state.tab {
        Tab::Trends => render_trends(frame, chunks[3], state),
        Tab::Summary => render_summary(frame, chunks[3], state),
        Tab::RecentForm => render_recent_form(frame, chunks[3], state),
    }

    let console = Paragraph::new(console_text(state))
        .block(Block::default().title("Console").borders(Borders::ALL));
    frame.render_widget(console, chunks[4]);

    let footer = Paragraph::new(footer_text()).style(Style::default().fg(Color::DarkGray));
    frame.render_widget(footer, chunks[5]);

    if state.help_overlay {
        let area = frame.size();
        render_help_overlay(frame, area);
    }
}

fn header_text(state: &DashboardState) -> String {
    let seasons = state.seasons.join(" & ");
    format!(
        "NBA Player Performance Dashboard ({})\nGame logs from stats.nba.com, refreshed by the pipeline binary",
        if seasons.is_empty() { "no seasons" } else { seasons.as_str() }
    )
}

fn filter_line(state: &DashboardState) -> Line<'static> {
    let mut spans = vec![
        Span::raw("Player: "),
        Span::styled(
            state.selected_player().unwrap_or("-").to_string(),
            Style::default().add_modifier(Modifier::BOLD),
        ),
        Span::raw("  Seasons:"),
    ];
    for (idx, season) in state.seasons.iter().enumerate() {
        let on = state.season_selected.get(idx).copied().unwrap_or(false);
        let mark = if on { "[x]" } else { "[ ]" };
        let style = if idx == state.season_cursor {
            Style::default().fg(Color::Yellow)
        } else {
            Style::default()
        };
        spans.push(Span::styled(format!(" {mark} {season}"), style));
    }
    spans.push(Span::raw(format!("  Metric: {}", state.metric_label())));
    spans.push(Span::raw(format!(
        "  Rolling: {}",
        if state.use_rolling { "on" } else { "off" }
    )));
    let dates = match state.date_range {
        Some((start, end)) => {
            let (s, e) = match state.date_bound {
                DateBound::Start => (format!(">{start}"), end.to_string()),
                DateBound::End => (start.to_string(), format!(">{end}")),
            };
            format!("  Dates: {s} .. {e}")
        }
        None => "  Dates: -".to_string(),
    };
    spans.push(Span::raw(dates));
    Line::from(spans)
}

fn footer_text() -> &'static str {
    "Tab/1-3 Tabs | p/P Player | [ ] Space Seasons | m Metric | r Rolling | d +/- x Dates | j/k Scroll | ? Help | q Quit"
}

fn render_trends(frame: &mut Frame, area: Rect, state: &DashboardState) {
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Percentage(55), Constraint::Min(3)])
        .split(area);

    let player = state.selected_player().unwrap_or("-");
    let title = format!("{player}: {} over time", state.metric_label());
    if state.fact_view.is_empty() {
        let warn = Paragraph::new("No data for current filters.")
            .style(Style::default().fg(Color::Yellow))
            .block(Block::default().title(title).borders(Borders::ALL));
        frame.render_widget(warn, rows[0]);
    } else {
        render_metric_chart(frame, rows[0], state, title);
    }

    let columns: Vec<&str> = GAME_LOG_COLUMNS
        .iter()
        .copied()
        .chain(std::iter::once(state.metric()))
        .fold(Vec::new(), |mut acc, c| {
            if !acc.contains(&c) && state.fact_view.has_column(c) {
                acc.push(c);
            }
            acc
        });
    let log = data_table(
        &state.fact_view,
        &columns,
        state.log_scroll,
        "Raw game log (filtered)",
    );
    frame.render_widget(log, rows[1]);
}

fn render_metric_chart(frame: &mut Frame, area: Rect, state: &DashboardState, title: String) {
    let metric = state.metric();
    let points = series(&state.fact_view, metric);
    let Some(first) = points.first().map(|p| p.0) else {
        let empty = Paragraph::new(format!("No {metric} values for current filters."))
            .block(Block::default().title(title).borders(Borders::ALL));
        frame.render_widget(empty, area);
        return;
    };
    let last = points.last().map(|p| p.0).unwrap_or(first);
    let to_xy = |pts: &[(chrono::NaiveDate, f64)]| -> Vec<(f64, f64)> {
        pts.iter()
            .map(|(d, v)| ((*d - first).num_days() as f64, *v))
            .collect()
    };
    let game_xy = to_xy(&points);

    let roll_col = roll_column(metric);
    let rolling_available = state.trends_view.has_column(&roll_col);
    let roll_xy = if state.use_rolling && rolling_available {
        to_xy(&series(&state.trends_view, &roll_col))
    } else {
        Vec::new()
    };

    let mut datasets = vec![Dataset::default()
        .name(metric.to_string())
        .marker(Marker::Braille)
        .graph_type(GraphType::Line)
        .style(Style::default().fg(Color::Cyan))
        .data(&game_xy)];
    if !roll_xy.is_empty() {
        datasets.push(
            Dataset::default()
                .name(roll_col.clone())
                .marker(Marker::Braille)
                .graph_type(GraphType::Line)
                .style(Style::default().fg(Color::Yellow))
                .data(&roll_xy),
        );
    }

    let (y_min, y_max) = game_xy
        .iter()
        .chain(roll_xy.iter())
        .fold((f64::MAX, f64::MIN), |(lo, hi), (_, y)| (lo.min(*y), hi.max(*y)));
    let y_pad = ((y_max - y_min) * 0.1).max(1.0);
    let (y_lo, y_hi) = (y_min - y_pad, y_max + y_pad);
    let x_max = ((last - first).num_days() as f64).max(1.0);

    let mut title = title;
    if state.use_rolling && !rolling_available {
        title.push_str(" (no rolling average for this metric)");
    }

    let chart = Chart::new(datasets)
        .block(Block::default().title(title).borders(Borders::ALL))
        .x_axis(
            Axis::default()
                .bounds([0.0, x_max])
                .labels(vec![
                    Span::raw(first.format("%Y-%m-%d").to_string()),
                    Span::raw(last.format("%Y-%m-%d").to_string()),
                ]),
        )
        .y_axis(
            Axis::default()
                .bounds([y_lo, y_hi])
                .labels(vec![
                    Span::raw(format!("{y_lo:.0}")),
                    Span::raw(format!("{:.0}", (y_lo + y_hi) / 2.0)),
                    Span::raw(format!("{y_hi:.0}")),
                ]),
        );
    frame.render_widget(chart, area);
}

fn render_summary(frame: &mut Frame, area: Rect, state: &DashboardState) {
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(7), Constraint::Min(3)])
        .split(area);

    let summary_title = "Per-season averages (selected player)";
    if state.fact_view.is_empty() {
        render_notice(frame, rows[0], summary_title, "No data for current filters.".to_string());
    } else {
        match season_summary(&state.fact_view, &state.data.fact) {
            Ok(summary) => render_whole_table(frame, rows[0], &summary, summary_title),
            Err(err) => render_notice(frame, rows[0], summary_title, err.to_string()),
        }
    }

    let board_title = "Leaderboard (selected seasons)";
    match leaderboard(&state.data.fact, &state.selected_seasons()) {
        Ok(board) => render_whole_table(frame, rows[1], &board, board_title),
        Err(err) => render_notice(frame, rows[1], board_title, err.to_string()),
    }
}

fn render_whole_table(frame: &mut Frame, area: Rect, table: &Table, title: &str) {
    let cols: Vec<&str> = table.columns().iter().map(String::as_str).collect();
    frame.render_widget(data_table(table, &cols, 0, title), area);
}

fn render_notice(frame: &mut Frame, area: Rect, title: &str, text: String) {
    let warn = Paragraph::new(text)
        .style(Style::default().fg(Color::Yellow))
        .block(Block::default().title(title.to_string()).borders(Borders::ALL));
    frame.render_widget(warn, area);
}

fn render_recent_form(frame: &mut Frame, area: Rect, state: &DashboardState) {
    let block = Block::default()
        .title("Last 10 games vs season average")
        .borders(Borders::ALL);
    let Some(form) = recent_form(&state.fact_view, state.metric()) else {
        let warn = Paragraph::new("Not enough data for recent-form view.")
            .style(Style::default().fg(Color::Yellow))
            .block(block);
        frame.render_widget(warn, area);
        return;
    };

    let inner = block.inner(area);
    frame.render_widget(block, area);
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(3), Constraint::Min(3)])
        .split(inner);

    let cards = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Ratio(1, 3),
            Constraint::Ratio(1, 3),
            Constraint::Ratio(1, 3),
        ])
        .split(rows[0]);
    let delta_color = if form.delta >= 0.0 {
        Color::Green
    } else {
        Color::Red
    };
    render_card(frame, cards[0], "Season avg", format!("{:.2}", form.season_avg), Color::White);
    render_card(frame, cards[1], "Last 10 avg", format!("{:.2}", form.last10_avg), Color::White);
    render_card(frame, cards[2], "Delta", format!("{:+.2}", form.delta), delta_color);

    let bars: Vec<Bar> = form
        .last_games
        .iter()
        .map(|g| {
            Bar::default()
                .value(g.value.max(0.0).round() as u64)
                .text_value(format!("{:.0}", g.value))
                .label(Line::from(format!("{} {}", g.date.format("%m-%d"), g.wl)))
                .style(Style::default().fg(Color::Cyan))
        })
        .collect();
    let bar_width = (rows[1].width / (bars.len().max(1) as u16 + 1)).clamp(3, 9);
    let chart = BarChart::default()
        .data(BarGroup::default().bars(&bars))
        .bar_width(bar_width)
        .bar_gap(1);
    frame.render_widget(chart, rows[1]);
}

fn render_card(frame: &mut Frame, area: Rect, title: &str, value: String, color: Color) {
    let card = Paragraph::new(value)
        .style(Style::default().fg(color).add_modifier(Modifier::BOLD))
        .alignment(Alignment::Center)
        .block(Block::default().title(title.to_string()).borders(Borders::ALL));
    frame.render_widget(card, area);
}

fn data_table<'a>(table: &Table, columns: &[&str], offset: usize, title: &str) -> TuiTable<'a> {
    let idxs: Vec<usize> = columns
        .iter()
        .filter_map(|c| table.column_index(c))
        .collect();
    let rows: Vec<Vec<String>> = table
        .rows()
        .iter()
        .skip(offset)
        .map(|r| idxs.iter().map(|i| r[*i].to_string()).collect())
        .collect();

    let widths: Vec<Constraint> = idxs
        .iter()
        .enumerate()
        .map(|(pos, i)| {
            let header = table.columns()[*i].len();
            let widest = rows
                .iter()
                .map(|r| r[pos].chars().count())
                .max()
                .unwrap_or(0);
            Constraint::Length(header.max(widest).min(MAX_CELL_WIDTH) as u16)
        })
        .collect();

    let header = Row::new(idxs.iter().map(|i| table.columns()[*i].clone()).collect::<Vec<_>>())
        .style(Style::default().add_modifier(Modifier::BOLD));
    TuiTable::new(rows.into_iter().map(Row::new).collect::<Vec<_>>(), widths)
        .header(header)
        .block(Block::default().title(title.to_string()).borders(Borders::ALL))
}

fn console_text(state: &DashboardState) -> String {
    if state.logs.is_empty() {
        return "No messages yet".to_string();
    }
    let skip = state.logs.len().saturating_sub(3);
    state
        .logs
        .iter()
        .skip(skip)
        .cloned()
        .collect::<Vec<_>>()
        .join("\n")
}

fn render_help_overlay(frame: &mut Frame, area: Rect) {
    let popup_area = centered_rect(60, 70, area);
    frame.render_widget(Clear, popup_area);

    let text = [
        "Hoops Trends - Help",
        "",
        "Tabs:",
        "  Tab / 1-3    Switch tab",
        "",
        "Filters:",
        "  p / P        Next / previous player",
        "  [ / ]        Move season cursor",
        "  Space        Toggle season",
        "  m            Cycle metric",
        "  r            Toggle rolling 10-game average",
        "  d            Switch date bound (start/end)",
        "  + / -        Move date bound by one game",
        "  x            Reset date range",
        "",
        "Game log:",
        "  j/k or ↑/↓   Scroll",
        "",
        "  ?            Toggle help",
        "  q            Quit",
    ]
    .join("\n");

    let help = Paragraph::new(text)
        .block(Block::default().title("Help").borders(Borders::ALL))
        .style(Style::default());
    frame.render_widget(help, popup_area);
}

fn centered_rect(percent_x: u16, percent_y: u16, area: Rect) -> Rect {
    let vertical = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(area);

    let horizontal = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(vertical[1]);

    horizontal[1]
}
