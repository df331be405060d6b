mod tui_app;

use std::io;
use std::time::Duration;

use crossterm::{
    event::{self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Cell, Paragraph, Row, Table, TableState, Wrap},
    Frame, Terminal,
};
use tui_app::{
    format_chaos, format_comparison, format_time_ns, format_weight, truncate, AppState, CardRow,
    ConnectionStatus,
};

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

#[tokio::main]
async fn main() -> io::Result<()> {
    let base_url = std::env::var("API_URL").unwrap_or_else(|_| "http://localhost:3000".to_string());

    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(5))
        .build()
        .map_err(io::Error::other)?;

    let mut app = AppState::new(base_url);

    // Initial fetch before rendering
    app.refresh(&client).await;

    // Terminal setup
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let mut card_table_state = TableState::default();
    card_table_state.select(None);

    let result = run_loop(&mut terminal, &mut app, &client, &mut card_table_state).await;

    // Restore terminal regardless of result
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    result
}

// ---------------------------------------------------------------------------
// Main event loop
// ---------------------------------------------------------------------------

async fn run_loop(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    app: &mut AppState,
    client: &reqwest::Client,
    card_state: &mut TableState,
) -> io::Result<()> {
    let refresh_interval = Duration::from_secs(5);
    let mut last_tick = std::time::Instant::now();

    loop {
        terminal.draw(|f| render(f, app, card_state))?;

        let timeout = refresh_interval
            .checked_sub(last_tick.elapsed())
            .unwrap_or(Duration::ZERO);

        if event::poll(timeout)? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press {
                    match key.code {
                        KeyCode::Char('q') | KeyCode::Char('Q') => return Ok(()),
                        KeyCode::Char('r') | KeyCode::Char('R') => {
                            app.request_refresh(client).await;
                            app.refresh(client).await;
                            last_tick = std::time::Instant::now();
                        }
                        KeyCode::Char('l') | KeyCode::Char('L') => {
                            app.switch_league(client).await;
                            card_state.select(None);
                            app.refresh(client).await;
                            last_tick = std::time::Instant::now();
                        }
                        KeyCode::Char('w') | KeyCode::Char('W') => {
                            app.worth_only = !app.worth_only;
                            card_state.select(None);
                            app.refresh(client).await;
                            last_tick = std::time::Instant::now();
                        }
                        KeyCode::Down | KeyCode::Char('j') => {
                            let max = app.cards.cards.len().saturating_sub(1);
                            let next = card_state.selected().map_or(0, |i| (i + 1).min(max));
                            card_state.select(Some(next));
                        }
                        KeyCode::Up | KeyCode::Char('k') => {
                            let prev = card_state
                                .selected()
                                .map_or(0, |i| i.saturating_sub(1));
                            card_state.select(Some(prev));
                        }
                        _ => {}
                    }
                }
            }
        }

        if last_tick.elapsed() >= refresh_interval {
            app.refresh(client).await;
            last_tick = std::time::Instant::now();
        }
    }
}

// ---------------------------------------------------------------------------
// Rendering
// ---------------------------------------------------------------------------

fn render(f: &mut Frame, app: &AppState, card_state: &mut TableState) {
    let area = f.area();

    // Outer vertical split: header | body | footer
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // header
            Constraint::Min(0),    // body
            Constraint::Length(1), // footer
        ])
        .split(area);

    render_header(f, app, chunks[0]);
    render_body(f, app, card_state, chunks[1]);
    render_footer(f, app, chunks[2]);
}

fn render_header(f: &mut Frame, app: &AppState, area: Rect) {
    let (status_text, status_color) = match &app.status {
        ConnectionStatus::Connected if app.health.refreshing => ("↻ refreshing".to_string(), Color::Yellow),
        ConnectionStatus::Connected => ("● connected".to_string(), Color::Green),
        ConnectionStatus::Connecting => ("◌ connecting".to_string(), Color::Yellow),
        ConnectionStatus::Waiting(msg) => (format!("◌ {msg}"), Color::Yellow),
        ConnectionStatus::Error(e) => (format!("✗ {}", truncate(e, 40)), Color::Red),
    };

    let worth = app
        .cards
        .cards
        .iter()
        .filter(|c| c.valuation.as_ref().is_some_and(|v| v.worth_farming))
        .count();
    let origin_color = |origin: &str| if origin == "live" { Color::Green } else { Color::Yellow };
    let updated = app
        .health
        .last_refresh_at_ns
        .map_or("—".to_string(), format_time_ns);

    let title_spans = vec![
        Span::styled(
            " Divination Card Valuator  ",
            Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
        ),
        Span::styled(status_text, Style::default().fg(status_color)),
        Span::raw("  │  "),
        Span::styled(
            format!("league: {}", app.leagues.active),
            Style::default().fg(Color::White),
        ),
        Span::raw("  │  "),
        Span::styled(
            format!("{worth}/{} worth farming", app.cards.cards.len()),
            Style::default().fg(Color::White),
        ),
        Span::raw("  │  prices "),
        Span::styled(
            app.cards.market_origin.clone(),
            Style::default().fg(origin_color(&app.cards.market_origin)),
        ),
        Span::raw("  weights "),
        Span::styled(
            app.cards.weights_origin.clone(),
            Style::default().fg(origin_color(&app.cards.weights_origin)),
        ),
        Span::raw("  │  "),
        Span::styled(format!("updated {updated}"), Style::default().fg(Color::DarkGray)),
    ];

    let header_line = Line::from(title_spans);
    let paragraph = Paragraph::new(header_line)
        .block(Block::default().borders(Borders::ALL).border_style(
            Style::default().fg(Color::DarkGray),
        ));

    f.render_widget(paragraph, area);
}

fn render_body(f: &mut Frame, app: &AppState, card_state: &mut TableState, area: Rect) {
    // Horizontal split: cards (60%) | detail (40%)
    let halves = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(60), Constraint::Percentage(40)])
        .split(area);

    render_cards_table(f, app, card_state, halves[0]);
    let selected = card_state.selected().and_then(|i| app.cards.cards.get(i));
    render_detail(f, app, selected, halves[1]);
}

fn render_cards_table(f: &mut Frame, app: &AppState, state: &mut TableState, area: Rect) {
    let header_cells = ["#", "Card", "Chaos", "Weight", "Farm", "vs Avg"]
        .iter()
        .map(|h| Cell::from(*h).style(Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD)));
    let header = Row::new(header_cells).height(1);

    let rows: Vec<Row> = app
        .cards
        .cards
        .iter()
        .enumerate()
        .map(|(i, c)| {
            let valuation = c.valuation.as_ref();
            let (verdict, verdict_color) = match valuation {
                Some(v) if v.worth_farming => ("yes", Color::Green),
                Some(_) => ("no", Color::Red),
                None => ("—", Color::DarkGray),
            };
            let comparison = valuation.map(|v| v.comparison_to_average);
            let comparison_color = comparison.map_or(Color::DarkGray, |v| {
                if v >= 0.0 {
                    Color::Green
                } else {
                    Color::Red
                }
            });

            Row::new(vec![
                Cell::from(format!("{}", i + 1)).style(Style::default().fg(Color::DarkGray)),
                Cell::from(truncate(&c.name, 26)),
                Cell::from(format_chaos(c.chaos_value)).style(Style::default().fg(Color::Cyan)),
                Cell::from(format_weight(c.weight)),
                Cell::from(verdict).style(Style::default().fg(verdict_color)),
                Cell::from(format_comparison(comparison)).style(Style::default().fg(comparison_color)),
            ])
        })
        .collect();

    let title = if app.worth_only {
        " CARDS (worth farming) "
    } else {
        " CARDS "
    };
    let table = Table::new(
        rows,
        [
            Constraint::Length(4),
            Constraint::Min(12),
            Constraint::Length(8),
            Constraint::Length(8),
            Constraint::Length(5),
            Constraint::Length(7),
        ],
    )
    .header(header)
    .block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::DarkGray))
            .title(Span::styled(
                title,
                Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
            )),
    )
    .row_highlight_style(
        Style::default()
            .bg(Color::DarkGray)
            .add_modifier(Modifier::BOLD),
    );

    f.render_stateful_widget(table, area, state);
}

fn render_detail(f: &mut Frame, app: &AppState, card: Option<&CardRow>, area: Rect) {
    let label = |s: &'static str| Span::styled(s, Style::default().fg(Color::Yellow));

    let lines: Vec<Line> = match card {
        None => {
            let mut lines = vec![Line::from(Span::styled(
                "Select a card with ↑↓ / j k",
                Style::default().fg(Color::DarkGray),
            ))];
            if let Some(err) = &app.cards.error {
                lines.push(Line::from(Span::styled(err.clone(), Style::default().fg(Color::Red))));
            }
            if let Some(patch) = &app.cards.weights_patch {
                lines.push(Line::from(vec![label("weights patch "), Span::raw(patch.clone())]));
            }
            lines
        }
        Some(c) => {
            let mut lines = vec![
                Line::from(Span::styled(
                    c.name.clone(),
                    Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
                )),
                Line::from(vec![label("chaos       "), Span::raw(format!("{:.2}", c.chaos_value))]),
                Line::from(vec![label("weight      "), Span::raw(format_weight(c.weight))]),
                Line::from(vec![label("drop rate   "), Span::raw(format!("{:.6}%", c.drop_rate * 100.0))]),
                Line::from(vec![label("chaos/weight"), Span::raw(format!(" {:.4}", c.value_per_weight))]),
                Line::from(vec![label("stack size  "), Span::raw(c.stack_size.to_string())]),
            ];
            if let Some(v) = &c.valuation {
                lines.push(Line::from(vec![
                    label("expected    "),
                    Span::raw(format!("{:.4} chaos/draw", v.expected_value)),
                ]));
                lines.push(Line::from(vec![
                    label("efficiency  "),
                    Span::raw(format!("{:.1} (top {:.0}%)", v.efficiency, v.percentile_rank)),
                ]));
                lines.push(Line::from(vec![label("restriction "), Span::raw(v.restriction.clone())]));
                lines.push(Line::raw(""));
                let color = if v.worth_farming { Color::Green } else { Color::Red };
                lines.push(Line::from(Span::styled(v.reason.clone(), Style::default().fg(color))));
            }
            lines
        }
    };

    let paragraph = Paragraph::new(lines).wrap(Wrap { trim: true }).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::DarkGray))
            .title(Span::styled(
                " DETAIL ",
                Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
            )),
    );
    f.render_widget(paragraph, area);
}

fn render_footer(f: &mut Frame, app: &AppState, area: Rect) {
    let latency = app
        .latency
        .p50_ms
        .map_or("—".to_string(), |p| format!("{p:.0}ms"));
    let line = Line::from(vec![
        Span::styled(" [q] ", Style::default().fg(Color::Yellow)),
        Span::raw("quit  "),
        Span::styled("[r] ", Style::default().fg(Color::Yellow)),
        Span::raw("refresh  "),
        Span::styled("[l] ", Style::default().fg(Color::Yellow)),
        Span::raw("league  "),
        Span::styled("[w] ", Style::default().fg(Color::Yellow)),
        Span::raw("worth only  "),
        Span::styled("[↑↓ / j k] ", Style::default().fg(Color::Yellow)),
        Span::raw("scroll  "),
        Span::styled(
            format!("refresh p50: {latency} ({} cycles)", app.latency.samples),
            Style::default().fg(Color::DarkGray),
        ),
    ]);
    let paragraph = Paragraph::new(line).style(Style::default().fg(Color::White));
    f.render_widget(paragraph, area);
}
