//! Frame rendering for the dashboard phases.

use ratatui::{
    Frame,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    symbols::Marker as CanvasMarker,
    text::{Line, Span},
    widgets::{
        Block, Borders, Cell, Clear, Paragraph, Row, Table, Wrap,
        canvas::{Canvas, Circle, Map, MapResolution, Points},
    },
};

use crate::alerts::AlertKind;
use crate::app::{Dashboard, Phase, ScreenLayout};
use crate::list::{
    COLUMN_HEADERS, COLUMN_SPACING, COLUMN_WIDTHS, SortKey, format_magnitude, minor_events,
};
use crate::map::{ATTRIBUTION, marker_style, popup_lines};
use crate::models::{Feature, format_local_time};
use crate::refresh::REFRESH_PERIOD;

const MAJOR_BANNER_BG: Color = Color::Rgb(0xef, 0x44, 0x44);
const TSUNAMI_BANNER_BG: Color = Color::Rgb(0xf9, 0x73, 0x16);
const SELECTED_ROW_BG: Color = Color::Rgb(0x14, 0x53, 0x2d);

/// Render the full TUI frame.
pub fn draw(frame: &mut Frame, app: &mut Dashboard) {
    match app.phase() {
        Phase::Loading => draw_centered(
            frame,
            Line::from(vec![
                Span::styled("◌ ", Style::default().fg(Color::Cyan)),
                Span::raw("Loading earthquake data..."),
            ]),
        ),
        Phase::Error => {
            let message = app.last_error().unwrap_or("An error occurred");
            draw_centered(
                frame,
                Line::from(Span::styled(
                    format!("Error: {message}"),
                    Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
                )),
            );
        }
        Phase::Ready => draw_dashboard(frame, app),
    }
}

fn draw_centered(frame: &mut Frame, line: Line<'_>) {
    let area = frame.area();
    let rows = Layout::vertical([Constraint::Fill(1), Constraint::Length(1), Constraint::Fill(1)])
        .split(area);
    frame.render_widget(Paragraph::new(line).alignment(Alignment::Center), rows[1]);
}

fn draw_dashboard(frame: &mut Frame, app: &mut Dashboard) {
    let major = app.visible_alert(AlertKind::Major).map(|e| AlertKind::Major.banner_text(e));
    let tsunami = app
        .visible_alert(AlertKind::Tsunami)
        .map(|e| AlertKind::Tsunami.banner_text(e));

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(u16::from(major.is_some())),   // major banner
            Constraint::Length(u16::from(tsunami.is_some())), // tsunami banner
            Constraint::Length(3),                            // header
            Constraint::Min(8),                               // map + list
            Constraint::Length(1),                            // help bar
        ])
        .split(frame.area());

    let mut layout = ScreenLayout::default();

    // ── Alert banners ───────────────────────────────────────────
    if let Some(text) = major {
        draw_banner(frame, chunks[0], "⚠", &text, MAJOR_BANNER_BG, 'a');
        layout.major_banner = Some(chunks[0]);
    }
    if let Some(text) = tsunami {
        draw_banner(frame, chunks[1], "≈", &text, TSUNAMI_BANNER_BG, 'w');
        layout.tsunami_banner = Some(chunks[1]);
    }

    // ── Header ──────────────────────────────────────────────────
    draw_header(frame, chunks[2], app);

    // ── Map + list ──────────────────────────────────────────────
    let main = Layout::horizontal([Constraint::Percentage(60), Constraint::Percentage(40)])
        .split(chunks[3]);
    layout.map = draw_map(frame, main[0], app);
    layout.table = draw_list(frame, main[1], app);

    // ── Help bar ────────────────────────────────────────────────
    let help = " q: quit | t/l/m: sort | j/k: move | Enter: select | Esc: clear | i: details | +/-/0: zoom | a/w: dismiss ";
    frame.render_widget(
        Paragraph::new(Line::from(Span::styled(help, Style::default().fg(Color::DarkGray)))),
        chunks[4],
    );

    app.set_layout(layout);
}

fn draw_banner(frame: &mut Frame, area: Rect, icon: &str, text: &str, bg: Color, key: char) {
    let style = Style::default().fg(Color::White).bg(bg);
    let line = Line::from(vec![
        Span::styled(format!(" {icon} "), style.add_modifier(Modifier::BOLD)),
        Span::styled(text.to_string(), style.add_modifier(Modifier::BOLD)),
        Span::styled(format!("  [{key}] ✕"), style),
    ]);
    frame.render_widget(Paragraph::new(line).style(style), area);
}

fn draw_header(frame: &mut Frame, area: Rect, app: &Dashboard) {
    let mut spans = vec![Span::styled(
        format!("feed {}", app.feed_label),
        Style::default().fg(Color::Cyan),
    )];

    if let Some(snapshot) = app.snapshot() {
        let elapsed = snapshot.received_at.elapsed();
        let next = app.next_refresh_in().unwrap_or(REFRESH_PERIOD).as_secs();
        let ago = match elapsed.as_secs() {
            0 => String::from("just now"),
            s if s < 60 => format!("{s}s ago"),
            s => format!("{}m ago", s / 60),
        };
        spans.push(Span::raw(format!(
            "  │  {} events  │  updated {ago}  │  next in {}:{:02}",
            snapshot.events.len(),
            next / 60,
            next % 60
        )));
    }

    if let Some(error) = app.last_error() {
        spans.push(Span::raw("  │  "));
        spans.push(Span::styled(
            format!("Error: {error}"),
            Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
        ));
    }

    let header = Paragraph::new(Line::from(spans)).block(
        Block::default()
            .borders(Borders::ALL)
            .title(Span::styled(
                " Earthquake Monitor ",
                Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
            ))
            .border_style(Style::default().fg(Color::DarkGray)),
    );
    frame.render_widget(header, area);
}

/// Draw the map and return the canvas area used for hit-testing.
fn draw_map(frame: &mut Frame, area: Rect, app: &Dashboard) -> Rect {
    let block = Block::default()
        .borders(Borders::ALL)
        .title(" Major Earthquakes Map (M5.0+) ")
        .title_bottom(Line::from(format!(" {ATTRIBUTION} ")).right_aligned())
        .border_style(Style::default().fg(Color::DarkGray));
    let inner = block.inner(area);

    let selected = app.selection.current();
    let markers = app.map.markers(app.events(), selected.as_deref());
    let viewport = app.map.viewport();
    let (x_bounds, y_bounds) = viewport.bounds();
    let stroke_step = viewport.degrees_per_pixel();

    let canvas = Canvas::default()
        .block(block)
        .marker(CanvasMarker::Braille)
        .x_bounds(x_bounds)
        .y_bounds(y_bounds)
        .paint(|ctx| {
            ctx.draw(&Map {
                color: Color::DarkGray,
                resolution: MapResolution::High,
            });
            ctx.layer();
            for marker in &markers {
                ctx.draw(&Points {
                    coords: &[(marker.x, marker.y)],
                    color: marker.style.fill,
                });
                for w in 0..marker.style.weight {
                    ctx.draw(&Circle {
                        x: marker.x,
                        y: marker.y,
                        radius: (marker.radius - f64::from(w) * stroke_step).max(stroke_step),
                        color: marker.style.stroke,
                    });
                }
            }
        });
    frame.render_widget(canvas, area);

    if app.show_popup {
        if let Some(event) = app.selected_event() {
            draw_popup(frame, inner, event);
        }
    }

    inner
}

fn draw_popup(frame: &mut Frame, map_area: Rect, event: &Feature) {
    let [title, magnitude, depth, link] = popup_lines(event);
    let width = map_area.width.min(48);
    let height = map_area.height.min(7);
    let area = Rect::new(
        map_area.x + map_area.width.saturating_sub(width),
        map_area.y,
        width,
        height,
    );

    let text = vec![
        Line::from(Span::styled(title, Style::default().add_modifier(Modifier::BOLD))),
        Line::from(magnitude),
        Line::from(depth),
        Line::from(Span::styled(link, Style::default().fg(Color::Blue))),
    ];
    let popup = Paragraph::new(text).wrap(Wrap { trim: true }).block(
        Block::default()
            .borders(Borders::ALL)
            .title(" Details [i] ")
            .border_style(Style::default().fg(marker_style(true, 0.0).stroke)),
    );
    frame.render_widget(Clear, area);
    frame.render_widget(popup, area);
}

/// Draw the list and return the table area used for hit-testing.
fn draw_list(frame: &mut Frame, area: Rect, app: &mut Dashboard) -> Rect {
    let block = Block::default()
        .borders(Borders::ALL)
        .title(" Recent Minor Earthquakes ")
        .border_style(Style::default().fg(Color::DarkGray));
    let inner = block.inner(area);

    let sort = app.list.sort();
    let header = Row::new(SortKey::ALL.iter().zip(COLUMN_HEADERS).map(|(key, label)| {
        if *key == sort.key {
            Cell::from(format!("{label} {}", sort.direction.arrow()))
        } else {
            Cell::from(label)
        }
    }))
    .style(Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD));

    let rows_data = minor_events(app.events(), sort);
    let rows: Vec<Row> = rows_data
        .iter()
        .map(|event| {
            let style = if app.selection.is_selected(&event.id) {
                Style::default().bg(SELECTED_ROW_BG).fg(Color::White)
            } else {
                Style::default()
            };
            Row::new(vec![
                Cell::from(format_local_time(event.properties.time)),
                Cell::from(event.properties.place.clone()),
                Cell::from(Line::from(format_magnitude(event.magnitude())).alignment(Alignment::Center)),
            ])
            .style(style)
        })
        .collect();

    let table = Table::new(rows, COLUMN_WIDTHS)
        .header(header)
        .column_spacing(COLUMN_SPACING)
        .block(block)
        .row_highlight_style(Style::default().add_modifier(Modifier::REVERSED));

    frame.render_stateful_widget(table, area, &mut app.list.table_state);

    inner
}
