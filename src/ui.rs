use chrono::Local;
use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Bar, BarChart, BarGroup, Block, Borders, Cell, Gauge, List, ListItem, Paragraph, Row, Table, Wrap},
    Frame,
};

use crate::{
    app::{App, Form, HomeState, NotificationKind, PropertyFocus, Screen, EXTRA_PAYMENT_SCENARIOS},
    chart::{chart_years, DonutChart, LocationPlot, ScheduleChart, INTEREST_COLOR, PRINCIPAL_COLOR, REHAB_COLOR},
    comps::ValuationSummary,
    format::{currency, months_span},
    loan::quick_loan_estimate,
    roi::{quick_roi_estimate, Rating},
    schedule::{table_rows, ViewMode},
};

const APP_TITLE: &str = "TaxCompare";

pub fn ui(f: &mut Frame, app: &mut App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(0), Constraint::Length(1)].as_ref())
        .split(f.size());

    match app.screen {
        Screen::Home => render_home_screen(f, app, chunks[0]),
        Screen::Loan => render_loan_screen(f, app, chunks[0]),
        Screen::Roi => render_roi_screen(f, app, chunks[0]),
        Screen::PropertyTax => render_property_tax_screen(f, app, chunks[0]),
        Screen::History => render_history_screen(f, app, chunks[0]),
    }
    render_notification(f, app, chunks[1]);
}

fn title(text: &str) -> Paragraph<'_> {
    Paragraph::new(text)
        .style(Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD))
        .alignment(Alignment::Center)
        .block(Block::default().borders(Borders::BOTTOM))
}

fn help(text: &str) -> Paragraph<'_> {
    Paragraph::new(text)
        .style(Style::default().fg(Color::DarkGray))
        .alignment(Alignment::Center)
        .block(Block::default().borders(Borders::TOP))
}

fn bold(text: &str) -> Span<'_> {
    Span::styled(text, Style::default().add_modifier(Modifier::BOLD))
}

/// Title, body and help line, the frame every screen shares.
fn screen_chunks(area: Rect) -> std::rc::Rc<[Rect]> {
    Layout::default()
        .direction(Direction::Vertical)
        .margin(1)
        .constraints([Constraint::Length(2), Constraint::Min(0), Constraint::Length(2)].as_ref())
        .split(area)
}

fn form_lines(form: &Form) -> Vec<Line<'static>> {
    form.fields
        .iter()
        .enumerate()
        .map(|(i, field)| {
            if i == form.focus {
                Line::from(format!("▶ {}: {}", field.label, field.value))
                    .style(Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD))
            } else {
                Line::from(format!("  {}: {}", field.label, field.value)).style(Style::default().fg(Color::Gray))
            }
        })
        .collect()
}

fn render_notification(f: &mut Frame, app: &App, area: Rect) {
    let Some(note) = &app.notification else {
        return;
    };
    let (icon, color) = match note.kind {
        NotificationKind::Success => ("✓", Color::Green),
        NotificationKind::Error => ("✗", Color::Red),
    };
    let line = Paragraph::new(format!("{icon} {}", note.message))
        .style(Style::default().fg(color).add_modifier(Modifier::BOLD))
        .alignment(Alignment::Center);
    f.render_widget(line, area);
}

fn render_home_screen(f: &mut Frame, app: &mut App, area: Rect) {
    let chunks = screen_chunks(area);
    f.render_widget(title(APP_TITLE), chunks[0]);

    let body = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(35), Constraint::Percentage(65)].as_ref())
        .split(chunks[1]);

    let items: Vec<ListItem> = Screen::MENU.iter().map(|s| ListItem::new(s.title())).collect();
    let menu = List::new(items)
        .block(Block::default().borders(Borders::ALL).title("Tools"))
        .highlight_style(Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD))
        .highlight_symbol("▶ ");
    f.render_stateful_widget(menu, body[0], &mut app.home.menu);

    let form = &app.home.form;
    let loan = quick_loan_estimate(form.number(HomeState::LOAN, 240_000.0), form.number(HomeState::RATE, 6.5));
    let roi = quick_roi_estimate(form.number(HomeState::PRICE, 300_000.0), form.number(HomeState::RENT, 2500.0));

    let mut text = form_lines(form);
    text.push(Line::from(""));
    text.push(Line::from(vec![
        bold("Monthly Payment: "),
        Span::styled(currency(loan.payment), Style::default().fg(Color::Green)),
    ]));
    text.push(Line::from(vec![
        bold("Total Interest (30 yr): "),
        Span::styled(currency(loan.total_interest), Style::default().fg(Color::Red)),
    ]));
    text.push(Line::from(vec![
        bold("CAP Rate: "),
        Span::raw(format!("{:.1}%", roi.cap_rate)),
    ]));
    text.push(Line::from(vec![
        bold("Cash-on-Cash: "),
        Span::raw(format!("{:.1}%", roi.cash_on_cash)),
    ]));

    let preview = Paragraph::new(text).block(Block::default().borders(Borders::ALL).title("Quick Estimates"));
    f.render_widget(preview, body[1]);

    f.render_widget(
        help("j/k: select tool | Enter: open | l/r/p/h: loan/roi/property/history | Tab/↑/↓: field | q: quit"),
        chunks[2],
    );
}

fn render_loan_screen(f: &mut Frame, app: &mut App, area: Rect) {
    let chunks = screen_chunks(area);
    f.render_widget(title(Screen::Loan.title()), chunks[0]);

    let body = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Length(44), Constraint::Min(0)].as_ref())
        .split(chunks[1]);

    let left = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(6), Constraint::Length(7), Constraint::Length(3), Constraint::Length(3), Constraint::Min(0)].as_ref())
        .split(body[0]);

    let inputs = Paragraph::new(form_lines(&app.loan.form)).block(Block::default().borders(Borders::ALL).title("Loan Details"));
    f.render_widget(inputs, left[0]);

    let right = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Percentage(50), Constraint::Percentage(50)].as_ref())
        .split(body[1]);

    let view = app.loan.view;
    match &app.loan.analysis {
        Some(analysis) => {
            let summary = vec![
                Line::from(vec![
                    bold("Monthly Payment: "),
                    Span::raw(currency(analysis.total_monthly_payment())),
                ]),
                Line::from(vec![
                    bold("Total Interest: "),
                    Span::styled(currency(analysis.accelerated_summary.total_interest), Style::default().fg(Color::Red)),
                ]),
                Line::from(vec![
                    bold("Interest Savings: "),
                    Span::styled(currency(analysis.interest_savings()), Style::default().fg(Color::Green)),
                ]),
                Line::from(vec![
                    bold("Time Saved: "),
                    Span::raw(months_span(analysis.months_saved())),
                ]),
                Line::from(vec![
                    bold("Total Paid: "),
                    Span::raw(currency(analysis.accelerated_summary.total_paid)),
                ]),
            ];
            let summary = Paragraph::new(summary).block(Block::default().borders(Borders::ALL).title("Results"));
            f.render_widget(summary, left[1]);

            let standard = Gauge::default()
                .block(Block::default().borders(Borders::ALL).title("Standard Payoff"))
                .gauge_style(Style::default().fg(Color::DarkGray))
                .ratio(1.0)
                .label(format!("{:.1} years", analysis.standard_years()));
            f.render_widget(standard, left[2]);

            let accelerated = Gauge::default()
                .block(Block::default().borders(Borders::ALL).title("With Extra Payment"))
                .gauge_style(Style::default().fg(PRINCIPAL_COLOR))
                .ratio(analysis.payoff_ratio().clamp(0.0, 1.0))
                .label(format!("{:.1} years", analysis.accelerated_years()));
            f.render_widget(accelerated, left[3]);

            let header = Row::new(vec!["Period", "Payment", "Principal", "Interest", "Balance"])
                .style(Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD))
                .height(1);
            let rows = table_rows(analysis.schedule(), view).into_iter().map(|row| {
                Row::new(vec![
                    Cell::from(row.label(view)),
                    Cell::from(currency(row.payment)),
                    Cell::from(currency(row.principal)),
                    Cell::from(currency(row.interest)),
                    Cell::from(currency(row.balance)),
                ])
            });
            let widths = [
                Constraint::Length(10),
                Constraint::Length(12),
                Constraint::Length(12),
                Constraint::Length(12),
                Constraint::Length(12),
            ];
            let table_title = match view {
                ViewMode::Yearly => "Amortization (Yearly)".to_string(),
                ViewMode::Monthly => format!("Amortization (Monthly, first {})", crate::schedule::MONTHLY_TABLE_LIMIT),
            };
            let table = Table::new(rows, widths)
                .header(header)
                .block(Block::default().borders(Borders::ALL).title(table_title))
                .highlight_style(Style::default().bg(Color::DarkGray))
                .highlight_symbol(">> ");
            f.render_stateful_widget(table, right[0], &mut app.loan.table_state);

            let years = chart_years(analysis.schedule());
            let legend = Line::from(vec![
                Span::raw("Balance Over Time  "),
                Span::styled("■ Principal ", Style::default().fg(PRINCIPAL_COLOR)),
                Span::styled("■ Interest", Style::default().fg(INTEREST_COLOR)),
            ]);
            let chart = ScheduleChart::new(&years).block(Block::default().borders(Borders::ALL).title(legend));
            f.render_widget(chart, right[1]);
        }
        None => {
            let placeholder = Paragraph::new("Press Enter to calculate the amortization schedule.")
                .style(Style::default().fg(Color::DarkGray))
                .alignment(Alignment::Center)
                .block(Block::default().borders(Borders::ALL));
            f.render_widget(placeholder, body[1]);
        }
    }

    let scenarios = EXTRA_PAYMENT_SCENARIOS
        .iter()
        .enumerate()
        .map(|(i, extra)| format!("F{}: +${extra}", i + 1))
        .collect::<Vec<_>>()
        .join(" ");
    let text = format!(
        "Tab/↑/↓: field | Enter: calculate | {scenarios} | v: {} view | j/k: scroll | c: CSV | t: report | s: save | Esc: home",
        view.toggle().label().to_lowercase()
    );
    f.render_widget(help(&text), chunks[2]);
}

fn rating_color(rating: Rating) -> Color {
    match rating {
        Rating::Good => Color::Green,
        Rating::Moderate => Color::Yellow,
        Rating::Warning => Color::Red,
    }
}

fn render_roi_screen(f: &mut Frame, app: &mut App, area: Rect) {
    let chunks = screen_chunks(area);
    f.render_widget(title(Screen::Roi.title()), chunks[0]);

    let body = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Length(44), Constraint::Min(0)].as_ref())
        .split(chunks[1]);
    let left = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(10), Constraint::Min(0)].as_ref())
        .split(body[0]);

    let inputs = Paragraph::new(form_lines(&app.roi.form)).block(Block::default().borders(Borders::ALL).title("Property Details"));
    f.render_widget(inputs, left[0]);

    let Some(roi) = &app.roi.analysis else {
        f.render_widget(help("Tab/↑/↓: field | Esc: home"), chunks[2]);
        return;
    };

    let flow_color = if roi.monthly_cash_flow >= 0.0 { Color::Green } else { Color::Red };
    let metrics = vec![
        Line::from(vec![bold("Cash-on-Cash Return: "), Span::raw(format!("{:.2}%", roi.cash_on_cash))]),
        Line::from(vec![bold("CAP Rate: "), Span::raw(format!("{:.2}%", roi.cap_rate))]),
        Line::from(vec![
            bold("Monthly Cash Flow: "),
            Span::styled(currency(roi.monthly_cash_flow), Style::default().fg(flow_color)),
        ]),
        Line::from(vec![
            bold("Annual Cash Flow: "),
            Span::styled(currency(roi.annual_cash_flow), Style::default().fg(flow_color)),
        ]),
        Line::from(vec![bold("Total Cash Invested: "), Span::raw(currency(roi.total_cash_invested))]),
        Line::from(vec![bold("Net Operating Income: "), Span::raw(currency(roi.noi))]),
        Line::from(vec![
            bold("Break-even Rent: "),
            Span::raw(roi.break_even_rent.map(currency).unwrap_or_else(|| "N/A".to_string())),
        ]),
    ];
    let metrics = Paragraph::new(metrics).block(Block::default().borders(Borders::ALL).title("Returns"));
    f.render_widget(metrics, left[1]);

    let right = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(8), Constraint::Min(0)].as_ref())
        .split(body[1]);

    let mut insights: Vec<Line> = roi
        .insights()
        .iter()
        .map(|insight| {
            Line::from(vec![
                Span::styled(format!("{} ", insight.rating.icon()), Style::default().fg(rating_color(insight.rating))),
                bold(insight.title),
                Span::raw(format!(": {}", insight.message)),
            ])
        })
        .collect();
    insights.push(Line::from(""));
    insights.push(Line::from(Span::styled(roi.recommendation(), Style::default().fg(Color::Cyan))));
    let insights = Paragraph::new(insights)
        .wrap(Wrap { trim: true })
        .block(Block::default().borders(Borders::ALL).title("Insights"));
    f.render_widget(insights, right[0]);

    let colors = [PRINCIPAL_COLOR, INTEREST_COLOR, REHAB_COLOR];
    let segments: Vec<(&'static str, f64, Color)> = roi
        .investment_breakdown()
        .into_iter()
        .zip(colors)
        .map(|((label, value), color)| (label, value, color))
        .collect();
    let legend: Vec<Span> = segments
        .iter()
        .map(|(label, value, color)| Span::styled(format!("■ {label} {}  ", currency(*value)), Style::default().fg(*color)))
        .collect();
    let donut = DonutChart::new(&segments, currency(roi.total_cash_invested))
        .block(Block::default().borders(Borders::ALL).title(Line::from(legend)));
    f.render_widget(donut, right[1]);

    f.render_widget(
        help("Tab/↑/↓: field | edits recalculate | c: CSV | t: report | s: save | Esc: home | q: quit"),
        chunks[2],
    );
}

fn render_property_tax_screen(f: &mut Frame, app: &mut App, area: Rect) {
    let chunks = screen_chunks(area);
    f.render_widget(title(Screen::PropertyTax.title()), chunks[0]);

    let body = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(4), Constraint::Min(0)].as_ref())
        .split(chunks[1]);

    let property = &mut app.property;
    let focused = Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD);
    let idle = Style::default().fg(Color::Gray);
    let (address_style, radius_style) = match property.focus {
        PropertyFocus::Address => (focused, idle),
        PropertyFocus::Radius => (idle, focused),
    };
    let mut search = vec![
        Line::from(format!("Address: {}", property.address)).style(address_style),
        Line::from(format!("Radius: {:.1} mi  (←/→)", property.radius)).style(radius_style),
    ];
    if property.is_searching() {
        search[0].spans.push(Span::styled("   Searching...", Style::default().fg(Color::Cyan)));
    }
    let search = Paragraph::new(search).block(Block::default().borders(Borders::ALL).title("Search Property"));
    f.render_widget(search, body[0]);

    if let Some(results) = &property.results {
        let summary = ValuationSummary::from_results(results);

        let columns = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(55), Constraint::Percentage(45)].as_ref())
            .split(body[1]);
        let left = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Length(7), Constraint::Min(0)].as_ref())
            .split(columns[0]);
        let right = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Length(9), Constraint::Min(0)].as_ref())
            .split(columns[1]);

        let (difference_color, recommendation_color) = if summary.is_overvalued() {
            (Color::Red, Color::Yellow)
        } else {
            (Color::Green, Color::Green)
        };
        let text = vec![
            Line::from(vec![bold("Your Taxable Value: "), Span::raw(currency(summary.subject_value))]),
            Line::from(vec![bold("Comparable Average: "), Span::raw(currency(summary.average_value))]),
            Line::from(vec![
                bold("Difference: "),
                Span::styled(currency(summary.difference), Style::default().fg(difference_color)),
            ]),
            Line::from(""),
            Line::from(vec![
                Span::styled(
                    format!("{}: ", summary.recommendation.headline()),
                    Style::default().fg(recommendation_color).add_modifier(Modifier::BOLD),
                ),
                Span::raw(summary.recommendation.detail()),
            ]),
        ];
        let text = Paragraph::new(text)
            .wrap(Wrap { trim: true })
            .block(Block::default().borders(Borders::ALL).title(results.subject.address.as_str()));
        f.render_widget(text, left[0]);

        let header = Row::new(vec!["#", "Address", "Value", "Appeal", "Sqft", "Bd/Ba", "Dist"])
            .style(Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD))
            .height(1);
        let rows = results.comparables.iter().enumerate().map(|(i, comp)| {
            Row::new(vec![
                Cell::from((i + 1).to_string()),
                Cell::from(comp.address.clone()),
                Cell::from(currency(comp.value)),
                Cell::from(comp.last_appeal_label()),
                Cell::from(comp.sqft.to_string()),
                Cell::from(format!("{}/{}", comp.beds, comp.baths)),
                Cell::from(format!("{:.2} mi", comp.distance)),
            ])
        });
        let widths = [
            Constraint::Length(3),
            Constraint::Min(16),
            Constraint::Length(10),
            Constraint::Length(6),
            Constraint::Length(5),
            Constraint::Length(5),
            Constraint::Length(8),
        ];
        let table = Table::new(rows, widths)
            .header(header)
            .block(Block::default().borders(Borders::ALL).title(format!("Comparables ({})", results.comparables.len())))
            .highlight_style(Style::default().bg(Color::DarkGray))
            .highlight_symbol(">> ");
        f.render_stateful_widget(table, left[1], &mut property.table_state);

        let bars = [
            Bar::default()
                .value(summary.subject_value.max(0.0).round() as u64)
                .label(Line::from("Yours"))
                .text_value(currency(summary.subject_value))
                .style(Style::default().fg(if summary.is_overvalued() { Color::Red } else { Color::Green })),
            Bar::default()
                .value(summary.average_value.max(0.0).round() as u64)
                .label(Line::from("Average"))
                .text_value(currency(summary.average_value))
                .style(Style::default().fg(PRINCIPAL_COLOR)),
        ];
        let chart = BarChart::default()
            .block(Block::default().borders(Borders::ALL).title("Valuation"))
            .data(BarGroup::default().bars(&bars))
            .bar_width(12)
            .bar_gap(4);
        f.render_widget(chart, right[0]);

        let plot = LocationPlot::new(results).block(
            Block::default()
                .borders(Borders::ALL)
                .title(format!("Location ({:.1} mi radius)", results.radius)),
        );
        f.render_widget(plot, right[1]);
    } else {
        let placeholder = Paragraph::new("Enter an address and press Enter to find comparable properties.")
            .style(Style::default().fg(Color::DarkGray))
            .alignment(Alignment::Center)
            .block(Block::default().borders(Borders::ALL));
        f.render_widget(placeholder, body[1]);
    }

    f.render_widget(
        help("Enter: search | Tab: field | ↑/↓: scroll | Ctrl-E: CSV | Ctrl-T: report | Ctrl-S: save | Ctrl-R: reset | Esc: home"),
        chunks[2],
    );
}

fn render_history_screen(f: &mut Frame, app: &mut App, area: Rect) {
    let chunks = screen_chunks(area);
    f.render_widget(title(Screen::History.title()), chunks[0]);

    if app.history.entries.is_empty() {
        let empty = Paragraph::new("Nothing saved yet. Press s in a calculator to save it here.")
            .style(Style::default().fg(Color::DarkGray))
            .alignment(Alignment::Center)
            .block(Block::default().borders(Borders::ALL));
        f.render_widget(empty, chunks[1]);
    } else {
        let items: Vec<ListItem> = app
            .history
            .entries
            .iter()
            .map(|entry| {
                let when = entry.timestamp.with_timezone(&Local).format("%Y-%m-%d %H:%M");
                let fields = entry
                    .data
                    .as_object()
                    .map(|map| {
                        map.iter()
                            .map(|(k, v)| format!("{k}={}", v.as_str().map(str::to_string).unwrap_or_else(|| v.to_string())))
                            .collect::<Vec<_>>()
                            .join(", ")
                    })
                    .unwrap_or_default();
                ListItem::new(Line::from(vec![
                    Span::styled(format!("{when}  "), Style::default().fg(Color::DarkGray)),
                    Span::styled(format!("{:<13}", entry.key), Style::default().fg(Color::Cyan)),
                    Span::raw(fields),
                ]))
            })
            .collect();
        let list = List::new(items)
            .block(Block::default().borders(Borders::ALL).title("Newest first"))
            .highlight_style(Style::default().bg(Color::DarkGray))
            .highlight_symbol(">> ");
        f.render_stateful_widget(list, chunks[1], &mut app.history.list_state);
    }

    f.render_widget(help("j/k: navigate | Enter: open in tool | Esc/h: home | q: quit"), chunks[2]);
}
