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
    widgets::{Block, Borders, Cell, List, ListItem, ListState, Paragraph, Row, Table, Wrap},
    Frame, Terminal,
};
use tui_app::{format_time_ns, truncate, AppState, ConnectionStatus};

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

#[tokio::main]
async fn main() -> io::Result<()> {
    let base_url = std::env::var("API_URL").unwrap_or_else(|_| "http://localhost:3000".to_string());

    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(5))
        .build()
        .expect("failed to build HTTP client");

    let mut app = AppState::new(base_url);

    // Initial fetch before rendering
    app.refresh(&client).await;

    // Terminal setup
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let result = run_loop(&mut terminal, &mut app, &client).await;

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
) -> io::Result<()> {
    let refresh_interval = Duration::from_secs(5);
    let mut last_tick = std::time::Instant::now();

    loop {
        terminal.draw(|f| render(f, app))?;

        let timeout = refresh_interval
            .checked_sub(last_tick.elapsed())
            .unwrap_or(Duration::ZERO);

        if event::poll(timeout)? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press {
                    match key.code {
                        KeyCode::Char('q') | KeyCode::Char('Q') => return Ok(()),
                        KeyCode::Char('r') | KeyCode::Char('R') => {
                            app.refresh(client).await;
                            last_tick = std::time::Instant::now();
                        }
                        KeyCode::Down | KeyCode::Char('j') => {
                            app.select_next();
                            if let Some(p) = app.selected_platform().map(str::to_string) {
                                app.fetch_table(client, &p).await;
                            }
                        }
                        KeyCode::Up | KeyCode::Char('k') => {
                            app.select_prev();
                            if let Some(p) = app.selected_platform().map(str::to_string) {
                                app.fetch_table(client, &p).await;
                            }
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

fn render(f: &mut Frame, app: &AppState) {
    let area = f.area();

    // Outer vertical split: header | body | summary | footer
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // header
            Constraint::Min(0),    // body
            Constraint::Length(4), // summary
            Constraint::Length(1), // footer
        ])
        .split(area);

    render_header(f, app, chunks[0]);
    render_body(f, app, chunks[1]);
    render_summary(f, app, chunks[2]);
    render_footer(f, chunks[3]);
}

fn render_header(f: &mut Frame, app: &AppState, area: Rect) {
    let (status_text, status_color) = match &app.status {
        ConnectionStatus::Connected => ("● connected".to_string(), Color::Green),
        ConnectionStatus::Connecting => ("◌ connecting".to_string(), Color::Yellow),
        ConnectionStatus::Error(e) => (format!("✗ {}", truncate(e, 40)), Color::Red),
    };

    let fetch_str = app
        .health
        .last_fetch_at_ns
        .map_or("no fetch yet".to_string(), |ns| {
            format!("last fetch {}", format_time_ns(ns))
        });

    let title_spans = vec![
        Span::styled(
            " Ad Report Hub  ",
            Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
        ),
        Span::styled(status_text, Style::default().fg(status_color)),
        Span::raw("  │  "),
        Span::styled(
            format!("{} tables", app.tables.len()),
            Style::default().fg(Color::White),
        ),
        Span::raw("  │  "),
        Span::styled(fetch_str, Style::default().fg(Color::White)),
        Span::raw("  │  "),
        Span::styled(
            format!(
                "fetch ok/err {}/{}",
                app.health.fetch_ok_total.unwrap_or(0),
                app.health.fetch_error_total.unwrap_or(0),
            ),
            Style::default().fg(Color::White),
        ),
    ];

    let header_line = Line::from(title_spans);
    let paragraph = Paragraph::new(header_line).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::DarkGray)),
    );

    f.render_widget(paragraph, area);
}

fn render_body(f: &mut Frame, app: &AppState, area: Rect) {
    // Horizontal split: platforms (25%) | report grid (75%)
    let halves = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(25), Constraint::Percentage(75)])
        .split(area);

    render_platform_list(f, app, halves[0]);
    render_report_grid(f, app, halves[1]);
}

fn render_platform_list(f: &mut Frame, app: &AppState, area: Rect) {
    let items: Vec<ListItem> = app
        .tables
        .iter()
        .map(|t| {
            ListItem::new(Line::from(vec![
                Span::raw(truncate(&t.platform, 16)),
                Span::styled(
                    format!("  {}×{}", t.metrics, t.columns),
                    Style::default().fg(Color::DarkGray),
                ),
            ]))
        })
        .collect();

    let list = List::new(items)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::DarkGray))
                .title(Span::styled(
                    " PLATFORMS ",
                    Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
                )),
        )
        .highlight_style(
            Style::default()
                .bg(Color::DarkGray)
                .add_modifier(Modifier::BOLD),
        );

    let mut state = ListState::default();
    state.select(if app.tables.is_empty() {
        None
    } else {
        Some(app.selected)
    });
    f.render_stateful_widget(list, area, &mut state);
}

fn render_report_grid(f: &mut Frame, app: &AppState, area: Rect) {
    let Some(table) = &app.table else {
        let placeholder = Paragraph::new("no table loaded").block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::DarkGray)),
        );
        f.render_widget(placeholder, area);
        return;
    };

    let mut header_cells = vec![Cell::from("Metric")
        .style(Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD))];
    for column in &table.columns {
        header_cells.push(
            Cell::from(format!("{}\n{}", column.name, column.display_name))
                .style(Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD)),
        );
    }
    let header = Row::new(header_cells).height(2);

    let rows: Vec<Row> = table
        .metrics
        .iter()
        .map(|metric| {
            let calculated = metric.kind == "calculated";
            let name_style = if calculated {
                Style::default().fg(Color::Blue)
            } else {
                Style::default().fg(Color::White)
            };
            let mut cells =
                vec![Cell::from(truncate(&metric.name, 22)).style(name_style)];
            for cell in &metric.cells {
                let api_sourced = cell.source.as_deref() == Some("api");
                let style = if calculated {
                    Style::default().fg(Color::Blue).add_modifier(Modifier::ITALIC)
                } else if api_sourced {
                    Style::default().fg(Color::Green)
                } else {
                    Style::default().fg(Color::White)
                };
                cells.push(Cell::from(cell.formatted.clone()).style(style));
            }
            Row::new(cells)
        })
        .collect();

    let mut widths = vec![Constraint::Length(24)];
    widths.extend(table.columns.iter().map(|_| Constraint::Min(12)));

    let grid = Table::new(rows, widths).header(header).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::DarkGray))
            .title(Span::styled(
                format!(" {} ", table.platform.to_uppercase()),
                Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
            )),
    );

    f.render_widget(grid, area);
}

fn render_summary(f: &mut Frame, app: &AppState, area: Rect) {
    let text = app
        .table
        .as_ref()
        .map(|t| t.summary.clone())
        .unwrap_or_default();
    let paragraph = Paragraph::new(text).wrap(Wrap { trim: true }).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::DarkGray))
            .title(Span::styled(
                " SUMMARY ",
                Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
            )),
    );
    f.render_widget(paragraph, area);
}

fn render_footer(f: &mut Frame, area: Rect) {
    let line = Line::from(vec![
        Span::styled(" [q] ", Style::default().fg(Color::Yellow)),
        Span::raw("quit  "),
        Span::styled("[r] ", Style::default().fg(Color::Yellow)),
        Span::raw("refresh  "),
        Span::styled("[↑↓ / j k] ", Style::default().fg(Color::Yellow)),
        Span::raw("switch platform  "),
        Span::styled(
            "calculated = blue, api-sourced = green",
            Style::default().fg(Color::DarkGray),
        ),
        Span::raw("  "),
        Span::styled("auto-refresh: 5s", Style::default().fg(Color::DarkGray)),
    ]);
    let paragraph = Paragraph::new(line).style(Style::default().fg(Color::White));
    f.render_widget(paragraph, area);
}
