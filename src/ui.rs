use ratatui::{
    Frame,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    symbols,
    text::{Line, Span},
    widgets::{Axis, Block, Borders, Cell, Chart, Dataset, GraphType, Paragraph, Row, Table, Tabs, Wrap},
};
use crate::app::{App, Tab};
use crate::classify::{CorrelationBucket, RiskLevel, classify_correlation, is_strong};
use crate::config::Theme;
use crate::risk::{Severity, allocation_segments};
use crate::trends::summarize;

const LIGHT_PALETTE: [&str; 11] = [
    "#0077b6", "#0096c7", "#00b4d8", "#48cae4", "#90e0ef", "#ade8f4", "#caf0f8", "#d9f2f4", "#f0f9fa",
    "#fee440", "#f94144",
];

const DARK_PALETTE: [&str; 11] = [
    "#8be9fd", "#bd93f9", "#ff79c6", "#ffb86c", "#f1fa8c", "#50fa7b", "#8be9fd", "#bd93f9", "#ff79c6",
    "#ffb86c", "#ff5555",
];

const MARKET_NOTES: &[&str] = &[
    "Overall crypto market correlation has increased during market downturns",
    "Layer-1 blockchain tokens show stronger intra-group correlation",
    "Bitcoin's correlation with other assets tends to decrease during extreme market events",
    "DeFi tokens exhibit variable correlation patterns depending on market conditions",
];

/// Parses `#RRGGBB`; anything else renders gray.
pub fn hex_color(hex: &str) -> Color {
    hex.parse::<Color>().unwrap_or(Color::Gray)
}

pub fn bucket_color(bucket: CorrelationBucket, theme: Theme) -> Color {
    let palette = match theme {
        Theme::Light => &LIGHT_PALETTE,
        Theme::Dark => &DARK_PALETTE,
    };
    hex_color(palette[bucket.index()])
}

/// Cell style for a correlation value: bucket background, contrasting text.
pub fn correlation_style(value: f64, theme: Theme) -> Style {
    let fg = if is_strong(value) {
        Color::White
    } else {
        match theme {
            Theme::Dark => hex_color("#f8f8f2"),
            Theme::Light => hex_color("#333333"),
        }
    };
    Style::default().bg(bucket_color(classify_correlation(value), theme)).fg(fg)
}

fn text_style(theme: Theme) -> Style {
    match theme {
        Theme::Dark => Style::default().fg(hex_color("#e5e7eb")),
        Theme::Light => Style::default().fg(hex_color("#1f2937")),
    }
}

fn muted_style(theme: Theme) -> Style {
    match theme {
        Theme::Dark => Style::default().fg(hex_color("#d1d5db")),
        Theme::Light => Style::default().fg(hex_color("#4b5563")),
    }
}

fn accent(theme: Theme) -> Color {
    match theme {
        Theme::Dark => hex_color("#9333ea"),
        Theme::Light => hex_color("#3b82f6"),
    }
}

fn risk_color(level: RiskLevel) -> Color {
    match level {
        RiskLevel::High => Color::Red,
        RiskLevel::Moderate => Color::Yellow,
        RiskLevel::Low => Color::Green,
    }
}

pub fn render(f: &mut Frame, app: &App) {
    let layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Min(0),
            Constraint::Length(3),
        ])
        .split(f.area());

    render_header(f, app, layout[0]);

    match app.tab {
        Tab::Home => render_matrix(f, app, layout[1]),
        Tab::Trends => render_trends(f, app, layout[1]),
        Tab::Portfolio => render_portfolio(f, app, layout[1]),
        Tab::Settings => render_settings(f, app, layout[1]),
    }

    render_footer(f, app, layout[2]);
}

fn render_header(f: &mut Frame, app: &App, area: Rect) {
    let titles = Tab::ALL.iter().map(|t| Line::from(format!(" {} ", t.title())));
    let tabs = Tabs::new(titles)
        .select(app.tab.index())
        .style(muted_style(app.theme))
        .highlight_style(Style::default().fg(accent(app.theme)).add_modifier(Modifier::BOLD))
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(Span::styled(
                    " CryptoCorrelate ",
                    Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
                ))
                .title_bottom(Line::from(format!(" source: {} ", app.dashboard.source)).right_aligned()),
        );
    f.render_widget(tabs, area);
}

fn render_footer(f: &mut Frame, app: &App, area: Rect) {
    let hint = match app.tab {
        Tab::Home | Tab::Trends => "1-4/Tab: switch tab | t: theme | q/Esc: quit",
        Tab::Portfolio => "↑↓: select | ←→: ±1% | PgUp/PgDn: ±10% | t: theme | q: quit",
        Tab::Settings => "d: data source | p: time period | t: theme | q: quit",
    };

    let footer = Paragraph::new(Line::from(vec![
        Span::styled(" Controls: ", Style::default().fg(Color::Gray)),
        Span::styled(hint, text_style(app.theme)),
    ]))
    .block(Block::default().borders(Borders::ALL));

    f.render_widget(footer, area);
}

fn render_matrix(f: &mut Frame, app: &App, area: Rect) {
    let assets = &app.dashboard.assets;
    let matrix = &app.dashboard.matrix;
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(assets.len() as u16 + 4), Constraint::Min(0)])
        .split(area);

    let header = Row::new(
        std::iter::once(Cell::from("Crypto"))
            .chain(assets.iter().map(|a| Cell::from(a.symbol.as_str())))
            .collect::<Vec<_>>(),
    )
    .style(text_style(app.theme).add_modifier(Modifier::BOLD));

    let rows = assets.iter().zip(matrix.rows()).map(|(asset, row)| {
        let cells = std::iter::once(Cell::from(asset.symbol.as_str()).style(text_style(app.theme)))
            .chain(
                row.iter()
                    .map(|&value| Cell::from(format!("{:^7.2}", value)).style(correlation_style(value, app.theme))),
            )
            .collect::<Vec<_>>();
        Row::new(cells)
    });

    let widths = std::iter::once(Constraint::Length(7))
        .chain(assets.iter().map(|_| Constraint::Length(7)))
        .collect::<Vec<_>>();

    let table = Table::new(rows, widths).header(header).column_spacing(1).block(
        Block::default()
            .borders(Borders::ALL)
            .title(" Crypto Price Correlation Matrix "),
    );
    f.render_widget(table, chunks[0]);

    let help = vec![
        Line::from(Span::styled(
            "How to Read This Matrix",
            text_style(app.theme).add_modifier(Modifier::BOLD),
        )),
        Line::from(" • Values range from -1 to 1"),
        Line::from(" • 1: Perfect positive correlation (move together)"),
        Line::from(" • 0: No correlation (move independently)"),
        Line::from(" • -1: Perfect negative correlation (move in opposite directions)"),
        Line::from(""),
        Line::from(format!(
            "Average pairwise correlation: {:.2}",
            matrix.average_off_diagonal()
        )),
    ];
    let help = Paragraph::new(help)
        .style(muted_style(app.theme))
        .block(Block::default().borders(Borders::ALL));
    f.render_widget(help, chunks[1]);
}

fn render_trends(f: &mut Frame, app: &App, area: Rect) {
    let trends = &app.dashboard.trends;
    let mut constraints: Vec<Constraint> = trends.iter().map(|_| Constraint::Min(8)).collect();
    constraints.push(Constraint::Length(MARKET_NOTES.len() as u16 + 2));
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints(constraints)
        .split(area);

    for (trend, chunk) in trends.iter().zip(chunks.iter()) {
        let parts = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(65), Constraint::Percentage(35)])
            .split(*chunk);

        let points: Vec<(f64, f64)> = trend
            .points
            .iter()
            .enumerate()
            .map(|(i, p)| (i as f64, p.correlation))
            .collect();
        let (min, max) = if points.is_empty() {
            (-1.0, 1.0)
        } else {
            (
                points.iter().map(|p| p.1).fold(f64::INFINITY, f64::min),
                points.iter().map(|p| p.1).fold(f64::NEG_INFINITY, f64::max),
            )
        };
        let x_max = (points.len().max(2) - 1) as f64;

        let first_label = trend.points.first().map(|p| p.period.clone()).unwrap_or_default();
        let last_label = trend.points.last().map(|p| p.period.clone()).unwrap_or_default();

        let datasets = vec![Dataset::default()
            .name("correlation")
            .marker(symbols::Marker::Braille)
            .graph_type(GraphType::Line)
            .style(Style::default().fg(hex_color(&trend.color)))
            .data(&points)];

        let chart = Chart::new(datasets)
            .block(
                Block::default()
                    .title(Span::styled(
                        format!(" {} Correlation Over Time ", trend.name),
                        Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
                    ))
                    .borders(Borders::ALL),
            )
            .x_axis(
                Axis::default()
                    .style(Style::default().fg(Color::Gray))
                    .bounds([0.0, x_max])
                    .labels(vec![Span::raw(first_label), Span::raw(last_label)]),
            )
            .y_axis(
                Axis::default()
                    .style(Style::default().fg(Color::Gray))
                    .bounds([min - 0.05, max + 0.05])
                    .labels(vec![
                        Span::raw(format!("{:.2}", min)),
                        Span::raw(format!("{:.2}", max)),
                    ]),
            );
        f.render_widget(chart, parts[0]);

        let mut info = Vec::new();
        if let Some(summary) = summarize(trend) {
            info.push(Line::from(format!("Mean:   {:.2}", summary.mean)));
            info.push(Line::from(format!("Range:  {:.2} .. {:.2}", summary.min, summary.max)));
            info.push(Line::from(format!(
                "Change: {:+.2} ({})",
                summary.change,
                summary.direction.as_str()
            )));
        }
        if let Some(text) = &trend.commentary {
            info.push(Line::from(""));
            info.push(Line::from(text.as_str()));
        }
        let info = Paragraph::new(info)
            .style(muted_style(app.theme))
            .wrap(Wrap { trim: true })
            .block(Block::default().borders(Borders::ALL).title(" Details "));
        f.render_widget(info, parts[1]);
    }

    let notes: Vec<Line> = MARKET_NOTES.iter().map(|n| Line::from(format!(" • {}", n))).collect();
    let notes = Paragraph::new(notes)
        .style(muted_style(app.theme))
        .wrap(Wrap { trim: true })
        .block(Block::default().borders(Borders::ALL).title(" Key Correlation Trends "));
    f.render_widget(notes, chunks[trends.len()]);
}

fn render_portfolio(f: &mut Frame, app: &App, area: Rect) {
    let assets = &app.dashboard.assets;
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(5),
            Constraint::Length(assets.len() as u16 + 4),
            Constraint::Min(0),
        ])
        .split(area);

    // Risk score
    let score_line = match app.risk_score() {
        Ok(score) => {
            let level = crate::classify::classify_risk(score);
            Line::from(vec![
                Span::styled(format!("{:.2}", score), text_style(app.theme).add_modifier(Modifier::BOLD)),
                Span::raw("  "),
                Span::styled(
                    format!(" {} Risk ", level),
                    Style::default().fg(Color::Black).bg(risk_color(level)),
                ),
            ])
        }
        Err(e) => Line::from(Span::styled(e.to_string(), Style::default().fg(Color::Red))),
    };
    let score = Paragraph::new(vec![
        score_line,
        Line::from(Span::styled(
            "Measures risk from asset correlations and allocations. Lower values indicate better diversification.",
            muted_style(app.theme),
        )),
    ])
    .wrap(Wrap { trim: true })
    .block(Block::default().borders(Borders::ALL).title(" Portfolio Risk Score "));
    f.render_widget(score, chunks[0]);

    // Allocation bar + sliders
    let inner_width = chunks[1].width.saturating_sub(2) as f64;
    let bar: Vec<Span> = allocation_segments(assets, &app.allocations)
        .into_iter()
        .map(|seg| {
            let cols = (seg.width / 100.0 * inner_width).round() as usize;
            Span::styled("█".repeat(cols), Style::default().fg(hex_color(&seg.color)))
        })
        .collect();

    let mut lines = vec![Line::from(bar), Line::from("")];
    let slider_width = 20usize;
    for (i, asset) in assets.iter().enumerate() {
        let value = app.allocations.get(&asset.id);
        let filled = ((value / 100.0) * slider_width as f64).round() as usize;
        let selected = i == app.selected;
        let marker = if selected { "▶ " } else { "  " };
        let name_style = if selected {
            Style::default().fg(accent(app.theme)).add_modifier(Modifier::BOLD)
        } else {
            text_style(app.theme)
        };
        lines.push(Line::from(vec![
            Span::styled(format!("{}{:<10}", marker, asset.name), name_style),
            Span::styled("━".repeat(filled), Style::default().fg(hex_color(&asset.color))),
            Span::styled("─".repeat(slider_width - filled.min(slider_width)), Style::default().fg(Color::DarkGray)),
            Span::styled(format!(" {:>3.0}%", value), text_style(app.theme)),
        ]));
    }
    let allocation = Paragraph::new(lines).block(Block::default().borders(Borders::ALL).title(" Current Allocation "));
    f.render_widget(allocation, chunks[1]);

    // Recommendations
    let recs: Vec<Line> = app
        .recommendations()
        .into_iter()
        .map(|rec| {
            let color = match rec.severity {
                Severity::Warning => Color::Red,
                Severity::Caution => Color::Yellow,
                Severity::Positive => Color::Green,
                Severity::Info => Color::Blue,
            };
            Line::from(vec![
                Span::styled(format!(" {} ", rec.severity.marker()), Style::default().fg(Color::White).bg(color)),
                Span::raw(" "),
                Span::styled(rec.message, text_style(app.theme)),
            ])
        })
        .collect();
    let recs = Paragraph::new(recs)
        .wrap(Wrap { trim: true })
        .block(Block::default().borders(Borders::ALL).title(" Diversification Recommendations "));
    f.render_widget(recs, chunks[2]);
}

fn render_settings(f: &mut Frame, app: &App, area: Rect) {
    let row = |label: &str, value: String, key: &str| {
        Line::from(vec![
            Span::styled(format!("{:<14}", label), text_style(app.theme)),
            Span::styled(value, Style::default().fg(accent(app.theme)).add_modifier(Modifier::BOLD)),
            Span::styled(format!("  [{}]", key), muted_style(app.theme)),
        ])
    };

    let lines = vec![
        row("Dark Mode", if app.theme == Theme::Dark { "On" } else { "Off" }.to_string(), "t"),
        row("Data Source", app.data_source.label().to_string(), "d"),
        row("Time Period", app.time_period.label().to_string(), "p"),
        Line::from(""),
        Line::from(Span::styled(
            format!("Loaded from: {} ({} assets)", app.dashboard.source, app.dashboard.assets.len()),
            muted_style(app.theme),
        )),
    ];
    let settings = Paragraph::new(lines)
        .alignment(Alignment::Left)
        .block(Block::default().borders(Borders::ALL).title(" Settings "));
    f.render_widget(settings, area);
}
