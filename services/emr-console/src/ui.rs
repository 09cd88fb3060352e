// services/emr-console/src/ui.rs
//
// Rendering: one draw_* function per region, colours from the active theme

use ratatui::{
    prelude::*,
    symbols,
    widgets::*,
};

use emrkit::views::{CreatePatientView, DashboardView, DetailsStatus, Field, LoadStatus, Page, PatientDetailsView};
use emrkit::{ChartSeries, Theme};

use crate::app::{App, InputMode};

// Dark: red, white, silver and gold on deep blue. Light: the same accents on paper.
mod colors {
    use ratatui::style::Color;

    pub const RED: Color = Color::Rgb(220, 50, 47);
    pub const DARK_RED: Color = Color::Rgb(139, 0, 0);
    pub const WHITE: Color = Color::Rgb(253, 246, 227);
    pub const SILVER: Color = Color::Rgb(147, 161, 161);
    pub const GOLD: Color = Color::Rgb(255, 193, 37);
    pub const DARK_GOLD: Color = Color::Rgb(184, 134, 11);
    pub const BG_DARK: Color = Color::Rgb(0, 20, 30);
    pub const BG_PANEL: Color = Color::Rgb(7, 30, 41);
    pub const SUCCESS: Color = Color::Rgb(133, 153, 0);

    pub const INK: Color = Color::Rgb(7, 54, 66);
    pub const SLATE: Color = Color::Rgb(88, 110, 117);
    pub const PAPER: Color = Color::Rgb(253, 246, 227);
    pub const PAPER_PANEL: Color = Color::Rgb(238, 232, 213);
}

#[derive(Debug, Clone, Copy)]
pub struct Palette {
    pub bg: Color,
    pub panel: Color,
    pub text: Color,
    pub muted: Color,
    pub accent: Color,
    pub accent_dim: Color,
    pub brand: Color,
    pub success: Color,
    pub error: Color,
}

impl Palette {
    pub fn for_theme(theme: Theme) -> Self {
        match theme {
            Theme::Dark => Self {
                bg: colors::BG_DARK,
                panel: colors::BG_PANEL,
                text: colors::WHITE,
                muted: colors::SILVER,
                accent: colors::GOLD,
                accent_dim: colors::DARK_GOLD,
                brand: colors::DARK_RED,
                success: colors::SUCCESS,
                error: colors::RED,
            },
            Theme::Light => Self {
                bg: colors::PAPER,
                panel: colors::PAPER_PANEL,
                text: colors::INK,
                muted: colors::SLATE,
                accent: colors::DARK_GOLD,
                accent_dim: colors::SLATE,
                brand: colors::DARK_RED,
                success: colors::SUCCESS,
                error: colors::RED,
            },
        }
    }

    fn panel_block<'a>(&self, title: &'a str) -> Block<'a> {
        Block::default()
            .title(Span::styled(title, Style::default().fg(self.accent).bold()))
            .borders(Borders::ALL)
            .border_style(Style::default().fg(self.muted))
            .border_type(BorderType::Rounded)
            .style(Style::default().bg(self.panel).fg(self.text))
    }
}

pub fn draw_ui(frame: &mut Frame, app: &App) {
    let palette = Palette::for_theme(app.theme());
    let area = frame.area();

    frame.render_widget(Block::default().style(Style::default().bg(palette.bg)), area);

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Header
            Constraint::Min(10),   // Page
            Constraint::Length(8), // Activity
            Constraint::Length(3), // Footer
        ])
        .split(area);

    draw_header(frame, chunks[0], app, &palette);
    match app.navigator().page() {
        Page::Dashboard(view) => draw_dashboard(frame, chunks[1], app, view, &palette),
        Page::CreatePatient(view) => draw_create_patient(frame, chunks[1], view, &palette),
        Page::PatientDetails(view) => draw_patient_details(frame, chunks[1], app, view, &palette),
    }
    draw_activity_panel(frame, chunks[2], app, &palette);
    draw_footer(frame, chunks[3], app, &palette);
}

fn draw_header(frame: &mut Frame, area: Rect, app: &App, palette: &Palette) {
    let (mode_text, mode_color) = if app.demo {
        ("DEMO", palette.accent)
    } else {
        ("LIVE", palette.success)
    };

    let mut spans = vec![
        Span::styled(" EMR CONSOLE ", Style::default().fg(colors::WHITE).bg(palette.brand).bold()),
        Span::raw("  "),
        Span::styled(format!("[{}]", mode_text), Style::default().fg(mode_color).bold()),
        Span::raw("  "),
        Span::styled(app.navigator().route().path(), Style::default().fg(palette.text)),
        Span::raw("  "),
        Span::styled(app.backend_name().to_string(), Style::default().fg(palette.muted)),
    ];
    let pending = app.pending_requests();
    if pending > 0 {
        spans.push(Span::raw("  "));
        spans.push(Span::styled(
            format!("[{} pending]", pending),
            Style::default().fg(palette.accent),
        ));
    }

    let header = Paragraph::new(Line::from(spans))
        .alignment(Alignment::Center)
        .block(
            Block::default()
                .borders(Borders::BOTTOM)
                .border_style(Style::default().fg(palette.brand))
                .style(Style::default().bg(palette.bg)),
        );

    frame.render_widget(header, area);
}

fn draw_dashboard(frame: &mut Frame, area: Rect, app: &App, view: &DashboardView, palette: &Palette) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(3), Constraint::Min(5)])
        .split(area);

    // Search box
    let searching = app.input_mode == InputMode::Search;
    let mut spans = vec![Span::styled(view.search().to_string(), Style::default().fg(palette.text))];
    if searching {
        spans.push(Span::styled("_", Style::default().fg(palette.accent)));
    } else if view.search().is_empty() {
        spans.push(Span::styled("press / to search by name", Style::default().fg(palette.muted)));
    }
    if view.is_searching() {
        spans.push(Span::styled("  searching...", Style::default().fg(palette.accent)));
    }
    let title = match view.search_mode() {
        emrkit::config::SearchMode::Local => " SEARCH ",
        emrkit::config::SearchMode::Remote => " SEARCH (server) ",
    };
    let border = if searching { palette.accent } else { palette.muted };
    frame.render_widget(
        Paragraph::new(Line::from(spans)).block(palette.panel_block(title).border_style(Style::default().fg(border))),
        chunks[0],
    );

    let block = palette.panel_block(" PATIENTS ");
    let message = match view.status() {
        LoadStatus::Idle | LoadStatus::Loading => Some(("Loading patients...", palette.muted)),
        LoadStatus::Failed => Some((view.error().unwrap_or("Failed to fetch patients."), palette.error)),
        LoadStatus::Ready if view.visible().is_empty() => Some(("No patients found.", palette.muted)),
        LoadStatus::Ready => None,
    };
    if let Some((text, color)) = message {
        frame.render_widget(
            Paragraph::new(Span::styled(text, Style::default().fg(color))).block(block),
            chunks[1],
        );
        return;
    }

    let rows: Vec<Row> = view
        .visible()
        .iter()
        .map(|p| {
            Row::new(vec![
                Cell::from(p.name.clone()),
                Cell::from(p.dob.clone()),
                Cell::from(p.gender.clone()),
                Cell::from(p.blood_type.clone()),
                Cell::from(p.contact_number.clone()),
                Cell::from(p.notes.len().to_string()),
            ])
            .style(Style::default().fg(palette.text))
        })
        .collect();

    let header_style = Style::default().fg(palette.accent).bold();
    let table = Table::new(
        rows,
        [
            Constraint::Min(20),
            Constraint::Length(12),
            Constraint::Length(8),
            Constraint::Length(6),
            Constraint::Length(18),
            Constraint::Length(6),
        ],
    )
    .header(
        Row::new(vec!["NAME", "DOB", "GENDER", "BLOOD", "CONTACT", "NOTES"])
            .style(header_style)
            .bottom_margin(1),
    )
    .block(block)
    .row_highlight_style(Style::default().bg(palette.bg).fg(palette.accent).bold())
    .highlight_symbol("> ");

    let mut state = TableState::default().with_selected(Some(app.selected));
    frame.render_stateful_widget(table, chunks[1], &mut state);

    if let Some(error) = view.error() {
        draw_banner(frame, chunks[1], error, palette.error, palette);
    }
    if let Some(patient) = view.pending_delete() {
        draw_confirm(
            frame,
            area,
            &format!("Delete {} and all of their notes?", patient.name),
            palette,
        );
    }
}

fn draw_create_patient(frame: &mut Frame, area: Rect, view: &CreatePatientView, palette: &Palette) {
    let block = palette.panel_block(" NEW PATIENT ");
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let mut lines = Vec::new();
    for field in Field::ALL {
        let focused = view.focus() == field;
        let value = view.value(field);
        let label_style = if focused {
            Style::default().fg(palette.accent).bold()
        } else {
            Style::default().fg(palette.muted)
        };

        let shown = if value.is_empty() {
            Span::styled(field.placeholder(), Style::default().fg(palette.muted).add_modifier(Modifier::DIM))
        } else {
            Span::styled(value.to_string(), Style::default().fg(palette.text))
        };

        let mut spans = vec![
            Span::styled(if focused { "> " } else { "  " }, label_style),
            Span::styled(format!("{:<16}", field.label()), label_style),
        ];
        if field.choices().is_some() {
            spans.push(Span::styled("< ", Style::default().fg(palette.muted)));
            spans.push(shown);
            spans.push(Span::styled(" >", Style::default().fg(palette.muted)));
        } else {
            spans.push(shown);
            if focused {
                spans.push(Span::styled("_", Style::default().fg(palette.accent)));
            }
        }
        lines.push(Line::from(spans));
        lines.push(Line::from(""));
    }

    if view.is_submitting() {
        lines.push(Line::from(Span::styled("Creating...", Style::default().fg(palette.accent))));
    } else if let Some(error) = view.error() {
        lines.push(Line::from(Span::styled(error.to_string(), Style::default().fg(palette.error))));
    }

    frame.render_widget(Paragraph::new(lines).wrap(Wrap { trim: false }), inner.inner(Margin::new(1, 1)));
}

fn draw_patient_details(frame: &mut Frame, area: Rect, app: &App, view: &PatientDetailsView, palette: &Palette) {
    let patient = match (view.status(), view.patient()) {
        (DetailsStatus::Ready, Some(patient)) => patient,
        (DetailsStatus::NotFound, _) => {
            let text = Span::styled("Patient not found.", Style::default().fg(palette.muted));
            frame.render_widget(Paragraph::new(text).block(palette.panel_block(" PATIENT ")), area);
            return;
        }
        (DetailsStatus::Failed, _) => {
            let message = view.error().unwrap_or("Failed to fetch patient details.");
            let text = Span::styled(message, Style::default().fg(palette.error));
            frame.render_widget(Paragraph::new(text).block(palette.panel_block(" PATIENT ")), area);
            return;
        }
        _ => {
            let text = Span::styled("Loading patient...", Style::default().fg(palette.muted));
            frame.render_widget(Paragraph::new(text).block(palette.panel_block(" PATIENT ")), area);
            return;
        }
    };

    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(4), Constraint::Min(6)])
        .split(area);

    let label = Style::default().fg(palette.muted);
    let value = Style::default().fg(palette.text).bold();
    let info = vec![
        Line::from(vec![
            Span::styled("DOB ", label),
            Span::styled(patient.dob.clone(), value),
            Span::raw("   "),
            Span::styled("Gender ", label),
            Span::styled(patient.gender.clone(), value),
            Span::raw("   "),
            Span::styled("Blood ", label),
            Span::styled(patient.blood_type.clone(), value),
        ]),
        Line::from(vec![Span::styled("Contact ", label), Span::styled(patient.contact_number.clone(), value)]),
    ];
    let title = format!(" {} ", patient.name.to_uppercase());
    frame.render_widget(Paragraph::new(info).block(palette.panel_block(&title)), rows[0]);

    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(45), Constraint::Percentage(55)])
        .split(rows[1]);

    draw_notes(frame, columns[0], app, view, palette);

    let ai = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Percentage(40), Constraint::Percentage(60)])
        .split(columns[1]);
    draw_summary(frame, ai[0], view, palette);
    draw_analysis(frame, ai[1], view, palette);

    if let Some(note) = view.pending_note_delete() {
        let preview: String = note.content.chars().take(40).collect();
        draw_confirm(frame, area, &format!("Delete note \"{}\"?", preview), palette);
    }
}

fn draw_notes(frame: &mut Frame, area: Rect, app: &App, view: &PatientDetailsView, palette: &Palette) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(3), Constraint::Length(3)])
        .split(area);

    let items: Vec<ListItem> = view
        .notes()
        .iter()
        .map(|note| {
            let mut spans = Vec::new();
            if let Some(ts) = &note.timestamp {
                spans.push(Span::styled(format!("{} ", ts), Style::default().fg(palette.muted)));
            }
            let style = if view.deleting_note() == Some(&note.id) {
                Style::default().fg(palette.muted).add_modifier(Modifier::CROSSED_OUT)
            } else {
                Style::default().fg(palette.text)
            };
            spans.push(Span::styled(note.content.clone(), style));
            ListItem::new(Line::from(spans))
        })
        .collect();

    let block = palette.panel_block(" NOTES ");
    if items.is_empty() {
        let text = Span::styled("No notes yet.", Style::default().fg(palette.muted));
        frame.render_widget(Paragraph::new(text).block(block), chunks[0]);
    } else {
        let list = List::new(items)
            .block(block)
            .highlight_style(Style::default().fg(palette.accent).bold())
            .highlight_symbol("> ");
        let mut state = ListState::default().with_selected(Some(app.selected));
        frame.render_stateful_widget(list, chunks[0], &mut state);
    }

    let editing = app.input_mode == InputMode::NoteDraft;
    let mut spans = vec![Span::styled(view.note_draft().to_string(), Style::default().fg(palette.text))];
    if view.is_adding_note() {
        spans.push(Span::styled("  adding...", Style::default().fg(palette.accent)));
    } else if editing {
        spans.push(Span::styled("_", Style::default().fg(palette.accent)));
    } else if view.note_draft().is_empty() {
        spans.push(Span::styled("press a to add a note", Style::default().fg(palette.muted)));
    }
    let border = if editing { palette.accent } else { palette.muted };
    frame.render_widget(
        Paragraph::new(Line::from(spans))
            .block(palette.panel_block(" NEW NOTE ").border_style(Style::default().fg(border))),
        chunks[1],
    );

    if let Some(error) = view.notes_error() {
        draw_banner(frame, chunks[0], error, palette.error, palette);
    }
}

fn draw_summary(frame: &mut Frame, area: Rect, view: &PatientDetailsView, palette: &Palette) {
    let panel = view.summary();
    let text = if panel.loading {
        Span::styled("Generating summary...", Style::default().fg(palette.accent))
    } else if let Some(error) = &panel.error {
        Span::styled(error.clone(), Style::default().fg(palette.error))
    } else if let Some(summary) = &panel.value {
        Span::styled(summary.clone(), Style::default().fg(palette.text))
    } else {
        Span::styled("press s for an AI summary", Style::default().fg(palette.muted))
    };

    frame.render_widget(
        Paragraph::new(text)
            .wrap(Wrap { trim: true })
            .block(palette.panel_block(" AI SUMMARY ")),
        area,
    );
}

fn draw_analysis(frame: &mut Frame, area: Rect, view: &PatientDetailsView, palette: &Palette) {
    let panel = view.analysis();
    let block = palette.panel_block(" PREDICTIVE ANALYSIS ");

    let placeholder = if panel.loading {
        Some(Span::styled("Running analysis...", Style::default().fg(palette.accent)))
    } else if let Some(error) = &panel.error {
        Some(Span::styled(error.clone(), Style::default().fg(palette.error)))
    } else if panel.value.is_none() {
        Some(Span::styled("press p for a predictive analysis", Style::default().fg(palette.muted)))
    } else {
        None
    };

    match (placeholder, &panel.value) {
        (None, Some(series)) => draw_chart(frame, area, series, block, palette),
        (Some(text), _) => frame.render_widget(Paragraph::new(text).wrap(Wrap { trim: true }).block(block), area),
        (None, None) => frame.render_widget(block, area),
    }
}

fn draw_chart(frame: &mut Frame, area: Rect, series: &ChartSeries, block: Block, palette: &Palette) {
    let points = series.points();
    let (min, max) = series.bounds();
    let pad = ((max - min) * 0.1).max(1.0);
    let y_bounds = [min - pad, max + pad];
    let x_max = (points.len().saturating_sub(1)).max(1) as f64;

    let x_labels: Vec<Span> = match (series.labels.first(), series.labels.last()) {
        (Some(first), Some(last)) if series.labels.len() > 1 => vec![Span::raw(first.clone()), Span::raw(last.clone())],
        (Some(only), _) => vec![Span::raw(only.clone())],
        _ => Vec::new(),
    };
    let y_labels = vec![
        Span::raw(format!("{:.1}", y_bounds[0])),
        Span::raw(format!("{:.1}", y_bounds[1])),
    ];

    let dataset = Dataset::default()
        .name("prediction")
        .marker(symbols::Marker::Braille)
        .graph_type(GraphType::Line)
        .style(Style::default().fg(palette.accent))
        .data(&points);

    let chart = Chart::new(vec![dataset])
        .block(block)
        .x_axis(
            Axis::default()
                .style(Style::default().fg(palette.muted))
                .bounds([0.0, x_max])
                .labels(x_labels),
        )
        .y_axis(
            Axis::default()
                .style(Style::default().fg(palette.muted))
                .bounds(y_bounds)
                .labels(y_labels),
        );

    frame.render_widget(chart, area);
}

fn draw_activity_panel(frame: &mut Frame, area: Rect, app: &App, palette: &Palette) {
    let logs: Vec<Line> = app
        .activity_log
        .iter()
        .rev()
        .take(area.height.saturating_sub(2) as usize)
        .map(|entry| {
            let (prefix, color) = match entry.level.as_str() {
                "ERROR" => ("[ERR]", palette.error),
                "WARN" => ("[WRN]", palette.accent),
                "INFO" => ("[INF]", palette.success),
                _ => ("[---]", palette.muted),
            };

            Line::from(vec![
                Span::styled(
                    format!("{} ", entry.timestamp.format("%H:%M:%S")),
                    Style::default().fg(palette.muted).add_modifier(Modifier::DIM),
                ),
                Span::styled(format!("{} ", prefix), Style::default().fg(color)),
                Span::styled(entry.message.clone(), Style::default().fg(palette.text)),
            ])
        })
        .collect();

    frame.render_widget(
        Paragraph::new(logs)
            .block(palette.panel_block(" ACTIVITY LOG "))
            .wrap(Wrap { trim: true }),
        area,
    );
}

fn draw_footer(frame: &mut Frame, area: Rect, app: &App, palette: &Palette) {
    let hints: &[(&str, &str)] = match (app.navigator().page(), app.input_mode) {
        (Page::Dashboard(view), _) if view.pending_delete().is_some() => &[("Y", "Delete"), ("N", "Cancel")],
        (Page::PatientDetails(view), _) if view.pending_note_delete().is_some() => {
            &[("Y", "Delete"), ("N", "Cancel")]
        }
        (Page::Dashboard(_), InputMode::Search) => &[("TYPE", "Filter"), ("ENTER/ESC", "Done")],
        (Page::Dashboard(_), _) => &[
            ("Q", "Quit"),
            ("/", "Search"),
            ("ENTER", "Open"),
            ("N", "New"),
            ("D", "Delete"),
            ("R", "Reload"),
            ("T", "Theme"),
        ],
        (Page::CreatePatient(_), _) => &[
            ("TAB", "Next"),
            ("LEFT/RIGHT", "Choose"),
            ("ENTER", "Create"),
            ("ESC", "Back"),
        ],
        (Page::PatientDetails(_), InputMode::NoteDraft) => &[("ENTER", "Add note"), ("ESC", "Cancel")],
        (Page::PatientDetails(_), _) => &[
            ("ESC", "Back"),
            ("A", "Note"),
            ("X", "Delete note"),
            ("S", "Summary"),
            ("P", "Analysis"),
            ("T", "Theme"),
        ],
    };

    let mut spans = Vec::new();
    for (key, label) in hints {
        spans.push(Span::styled(format!(" [{}] ", key), Style::default().fg(palette.bg).bg(palette.accent_dim)));
        spans.push(Span::styled(format!(" {} ", label), Style::default().fg(palette.muted)));
        spans.push(Span::raw(" "));
    }

    let footer = Paragraph::new(Line::from(spans))
        .alignment(Alignment::Center)
        .block(
            Block::default()
                .borders(Borders::TOP)
                .border_style(Style::default().fg(palette.brand))
                .style(Style::default().bg(palette.bg)),
        );

    frame.render_widget(footer, area);
}

/// One-line message pinned to the bottom edge of `area`.
fn draw_banner(frame: &mut Frame, area: Rect, message: &str, color: Color, palette: &Palette) {
    if area.height < 3 {
        return;
    }
    let line = Rect {
        x: area.x + 1,
        y: area.y + area.height - 2,
        width: area.width.saturating_sub(2),
        height: 1,
    };
    frame.render_widget(Clear, line);
    frame.render_widget(
        Paragraph::new(Span::styled(message.to_string(), Style::default().fg(color).bold()))
            .style(Style::default().bg(palette.panel)),
        line,
    );
}

fn draw_confirm(frame: &mut Frame, area: Rect, question: &str, palette: &Palette) {
    let width = (question.chars().count() as u16 + 6).min(area.width);
    let popup = Rect {
        x: area.x + area.width.saturating_sub(width) / 2,
        y: area.y + area.height.saturating_sub(5) / 2,
        width,
        height: 5.min(area.height),
    };

    let text = vec![
        Line::from(Span::styled(question.to_string(), Style::default().fg(palette.text).bold())),
        Line::from(""),
        Line::from(Span::styled("[y] yes   [n] no", Style::default().fg(palette.muted))),
    ];
    frame.render_widget(Clear, popup);
    frame.render_widget(
        Paragraph::new(text)
            .alignment(Alignment::Center)
            .block(palette.panel_block(" CONFIRM ").border_style(Style::default().fg(palette.error))),
        popup,
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_palettes_differ_by_theme() {
        let light = Palette::for_theme(Theme::Light);
        let dark = Palette::for_theme(Theme::Dark);
        assert_ne!(light.bg, dark.bg);
        assert_ne!(light.text, dark.text);
        assert_eq!(dark.bg, colors::BG_DARK);
    }
}
