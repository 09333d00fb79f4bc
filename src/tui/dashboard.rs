use anyhow::Result;
use crossterm::{
    event::{self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::{Backend, CrosstermBackend},
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Bar, BarChart, BarGroup, Block, Borders, Cell, List, ListItem, Paragraph, Row, Table, Tabs, Wrap},
    Frame, Terminal,
};
use std::io;

use crate::commands::{format_number, truncate};
use crate::models::MonthReport;
use crate::tui::app::{App, Tab};

const PAGE: usize = 10;

pub fn run_dashboard(app: App) -> Result<()> {
    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let result = event_loop(&mut terminal, app);

    // Restore terminal
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    result
}

fn event_loop<B: Backend>(terminal: &mut Terminal<B>, mut app: App) -> Result<()> {
    loop {
        terminal.draw(|f| draw_ui(f, &app))?;

        if let Event::Key(key) = event::read()? {
            if key.kind != KeyEventKind::Press {
                continue;
            }
            match key.code {
                KeyCode::Char('q') | KeyCode::Esc => app.quit(),
                KeyCode::Tab => app.next_tab(),
                KeyCode::BackTab => app.previous_tab(),
                KeyCode::Down | KeyCode::Char('j') => app.next_month(),
                KeyCode::Up | KeyCode::Char('k') => app.previous_month(),
                KeyCode::Enter => app.process(),
                KeyCode::Char('r') => app.reload(),
                KeyCode::PageDown => app.scroll_down(PAGE),
                KeyCode::PageUp => app.scroll_up(PAGE),
                _ => {}
            }
        }

        if app.should_quit {
            return Ok(());
        }
    }
}

fn draw_ui(f: &mut Frame, app: &App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Min(0),
            Constraint::Length(3),
        ])
        .split(f.area());

    draw_header(f, app, chunks[0]);

    let body = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Length(16), Constraint::Min(0)])
        .split(chunks[1]);

    draw_months(f, app, body[0]);

    match app.selected_tab {
        Tab::Diagnostics => draw_diagnostics(f, app, body[1]),
        tab => match &app.report {
            Some(Ok(report)) => match tab {
                Tab::Charts => draw_charts(f, report, app.top_n, body[1]),
                Tab::Tables => draw_tables(f, report, body[1]),
                _ => draw_rows(f, report, app.scroll, body[1]),
            },
            Some(Err(e)) => draw_message(f, &e.to_string(), Color::Red, body[1]),
            None => draw_message(f, "Press Enter to process the selected month", Color::Gray, body[1]),
        },
    }

    draw_footer(f, app, chunks[2]);
}

fn draw_header(f: &mut Frame, app: &App, area: Rect) {
    let titles = vec!["Charts", "Tables", "Rows", "Diagnostics"];
    let selected = match app.selected_tab {
        Tab::Charts => 0,
        Tab::Tables => 1,
        Tab::Rows => 2,
        Tab::Diagnostics => 3,
    };

    let title = format!(" Cost Tracker · {} ", app.snapshot.source.display());
    let tabs = Tabs::new(titles)
        .block(Block::default().borders(Borders::ALL).title(title))
        .select(selected)
        .style(Style::default().fg(Color::White))
        .highlight_style(Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD));

    f.render_widget(tabs, area);
}

fn draw_footer(f: &mut Frame, app: &App, area: Rect) {
    let mut spans = vec![
        Span::styled("↑↓", Style::default().fg(Color::Cyan)),
        Span::raw(" month  "),
        Span::styled("Enter", Style::default().fg(Color::Cyan)),
        Span::raw(" process  "),
        Span::styled("Tab", Style::default().fg(Color::Cyan)),
        Span::raw(" view  "),
        Span::styled("PgUp/PgDn", Style::default().fg(Color::Cyan)),
        Span::raw(" scroll  "),
        Span::styled("r", Style::default().fg(Color::Cyan)),
        Span::raw(" reload  "),
        Span::styled("q", Style::default().fg(Color::Cyan)),
        Span::raw(" quit"),
    ];
    if let Some(status) = &app.status {
        spans.push(Span::raw("  │  "));
        spans.push(Span::styled(status.clone(), Style::default().fg(Color::Yellow)));
    }

    let footer = Paragraph::new(Line::from(spans))
        .block(Block::default().borders(Borders::ALL))
        .alignment(Alignment::Center);

    f.render_widget(footer, area);
}

fn draw_months(f: &mut Frame, app: &App, area: Rect) {
    let processed = match &app.report {
        Some(Ok(report)) => Some(report.month.as_str()),
        _ => None,
    };

    let items: Vec<ListItem> = app
        .months
        .iter()
        .enumerate()
        .map(|(i, month)| {
            let style = if i == app.selected_month {
                Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD)
            } else {
                Style::default()
            };
            let marker = if processed == Some(month.as_str()) { "● " } else { "  " };
            ListItem::new(Line::from(Span::styled(format!("{}{}", marker, month), style)))
        })
        .collect();

    let list = List::new(items).block(Block::default().borders(Borders::ALL).title(" Months "));
    f.render_widget(list, area);
}

fn draw_message(f: &mut Frame, message: &str, color: Color, area: Rect) {
    let paragraph = Paragraph::new(Line::from(Span::styled(
        message.to_string(),
        Style::default().fg(color).add_modifier(Modifier::BOLD),
    )))
    .block(Block::default().borders(Borders::ALL))
    .alignment(Alignment::Center)
    .wrap(Wrap { trim: true });

    f.render_widget(paragraph, area);
}

fn draw_charts(f: &mut Frame, report: &MonthReport, top_n: usize, area: Rect) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Ratio(1, 3),
            Constraint::Ratio(1, 3),
            Constraint::Ratio(1, 3),
        ])
        .split(area);

    let token_bars: Vec<Bar> = report
        .model_tokens
        .iter()
        .map(|m| token_bar(&m.model, m.total_tokens))
        .collect();
    render_bar_chart(
        f,
        &format!(" Top {} Total Tokens Used by Model ({}) ", top_n, report.month),
        &token_bars,
        Color::Cyan,
        chunks[0],
    );

    let model_cost_bars: Vec<Bar> = report
        .model_cost
        .iter()
        .map(|m| cost_bar(&m.model, m.total_cost))
        .collect();
    render_bar_chart(
        f,
        &format!(" Top {} Total Cost by Model ({}) ", top_n, report.month),
        &model_cost_bars,
        Color::Green,
        chunks[1],
    );

    let user_bars: Vec<Bar> = report
        .user_cost
        .iter()
        .map(|u| cost_bar(&u.user, u.total_cost))
        .collect();
    render_bar_chart(
        f,
        &format!(" Total Cost by User ({}) ", report.month),
        &user_bars,
        Color::Yellow,
        chunks[2],
    );
}

fn render_bar_chart(f: &mut Frame, title: &str, bars: &[Bar], color: Color, area: Rect) {
    let chart = BarChart::default()
        .block(Block::default().borders(Borders::ALL).title(title.to_string()))
        .direction(Direction::Horizontal)
        .bar_width(1)
        .bar_gap(0)
        .bar_style(Style::default().fg(color))
        .value_style(Style::default().fg(Color::Black).bg(color))
        .data(BarGroup::default().bars(bars));

    f.render_widget(chart, area);
}

fn token_bar(label: &str, tokens: i64) -> Bar<'static> {
    Bar::default()
        .label(Line::from(truncate(label, 24)))
        .value(tokens.max(0) as u64)
        .text_value(format_number(tokens))
}

/// Bars are scaled in hundredths of a cent so small costs still show.
fn cost_bar(label: &str, cost: f64) -> Bar<'static> {
    Bar::default()
        .label(Line::from(truncate(label, 24)))
        .value((cost * 10_000.0).round().max(0.0) as u64)
        .text_value(format!("${:.4}", cost))
}

fn draw_tables(f: &mut Frame, report: &MonthReport, area: Rect) {
    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Ratio(1, 3),
            Constraint::Ratio(1, 3),
            Constraint::Ratio(1, 3),
        ])
        .split(area);

    let header_style = Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD);

    let token_rows = report.model_tokens.iter().map(|m| {
        Row::new(vec![
            Cell::from(m.model.clone()),
            Cell::from(format_number(m.total_tokens)),
        ])
    });
    let tokens = Table::new(token_rows, [Constraint::Min(10), Constraint::Length(14)])
        .header(Row::new(vec!["Model", "Tokens"]).style(header_style))
        .block(Block::default().borders(Borders::ALL).title(" Tokens by Model "));
    f.render_widget(tokens, chunks[0]);

    let cost_rows = report.model_cost.iter().map(|m| {
        Row::new(vec![
            Cell::from(m.model.clone()),
            Cell::from(format!("${:.4}", m.total_cost)),
        ])
    });
    let costs = Table::new(cost_rows, [Constraint::Min(10), Constraint::Length(12)])
        .header(Row::new(vec!["Model", "Cost"]).style(header_style))
        .block(Block::default().borders(Borders::ALL).title(" Cost by Model "));
    f.render_widget(costs, chunks[1]);

    let user_rows = report.user_cost.iter().map(|u| {
        let row = Row::new(vec![
            Cell::from(u.user.clone()),
            Cell::from(format!("${:.4}", u.total_cost)),
        ]);
        if u.is_total() {
            row.style(Style::default().add_modifier(Modifier::BOLD))
        } else {
            row
        }
    });
    let users = Table::new(user_rows, [Constraint::Min(10), Constraint::Length(12)])
        .header(Row::new(vec!["User", "Cost"]).style(header_style))
        .block(Block::default().borders(Borders::ALL).title(" Cost by User "));
    f.render_widget(users, chunks[2]);
}

fn draw_rows(f: &mut Frame, report: &MonthReport, scroll: usize, area: Rect) {
    let rows = report.rows.iter().skip(scroll).map(|r| {
        Row::new(vec![
            Cell::from(r.timestamp.format("%Y-%m-%d %H:%M:%S").to_string()),
            Cell::from(r.user.clone()),
            Cell::from(r.model.clone()),
            Cell::from(format_number(r.total_tokens)),
            Cell::from(format!("${:.4}", r.total_cost)),
        ])
    });

    let table = Table::new(
        rows,
        [
            Constraint::Length(20),
            Constraint::Percentage(30),
            Constraint::Percentage(30),
            Constraint::Length(12),
            Constraint::Length(12),
        ],
    )
    .header(
        Row::new(vec!["Timestamp", "User", "Model", "Tokens", "Cost"])
            .style(Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD)),
    )
    .block(Block::default().borders(Borders::ALL).title(format!(
        " Records in {} ({}) ",
        report.month, report.row_count
    )));

    f.render_widget(table, area);
}

fn draw_diagnostics(f: &mut Frame, app: &App, area: Rect) {
    let normalized = &app.snapshot.normalized;
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(6), Constraint::Min(0)])
        .split(area);

    let shape = normalized
        .shape
        .map(|s| s.to_string())
        .unwrap_or_else(|| "unrecognised".to_string());
    let cache = app.cache();
    let mut summary = vec![
        Line::from(format!("Shape:   {}", shape)),
        Line::from(format!(
            "Records: {} valid, {} skipped",
            normalized.table.len(),
            normalized.diagnostics.len()
        )),
        Line::from(format!(
            "Cache:   {} hit(s), {} miss(es)",
            cache.hits(),
            cache.misses()
        )),
    ];
    if let Some(warning) = normalized.warning() {
        summary.push(Line::from(Span::styled(
            warning.to_string(),
            Style::default().fg(Color::Red),
        )));
    }
    let summary = Paragraph::new(summary)
        .block(Block::default().borders(Borders::ALL).title(" Load Summary "));
    f.render_widget(summary, chunks[0]);

    let items: Vec<ListItem> = normalized
        .diagnostics
        .iter()
        .skip(app.scroll)
        .map(|d| ListItem::new(Line::from(Span::styled(d.to_string(), Style::default().fg(Color::Yellow)))))
        .collect();
    let list = List::new(items).block(Block::default().borders(Borders::ALL).title(" Skipped Records "));
    f.render_widget(list, chunks[1]);
}
