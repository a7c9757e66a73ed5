use itertools::Itertools;
use ratatui::{
    buffer::Buffer,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Paragraph, Widget, Wrap},
};
use time_humanize::{Accuracy, HumanTime, Tense};
use unicode_width::UnicodeWidthStr;

use crate::session::Session;
use crate::util::clock_format;
use crate::App;

const HORIZONTAL_MARGIN: u16 = 5;

impl Widget for &App {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let snapshot = &self.snapshot;

        match (snapshot.is_active, &snapshot.last_session) {
            (true, Some(session)) => {
                render_running(self, session, area, buf);
            }
            (_, Some(session)) => {
                render_summary(self, session, area, buf);
            }
            _ => {
                render_welcome(area, buf);
            }
        }
    }
}

fn centered_rows(area: Rect, rows: u16) -> std::rc::Rc<[Rect]> {
    Layout::default()
        .direction(Direction::Vertical)
        .horizontal_margin(HORIZONTAL_MARGIN)
        .constraints(
            [
                Constraint::Length(area.height.saturating_sub(rows) / 2),
                Constraint::Length(rows),
                Constraint::Min(0),
            ]
            .as_ref(),
        )
        .split(area)
}

fn title_line(session: &Session, max_width: u16) -> String {
    // Ellipsize rather than wrap; the elapsed clock is the hero here
    let max = max_width as usize;
    if session.title.width() <= max {
        return session.title.clone();
    }
    let mut title = session.title.clone();
    while title.width() + 1 > max && !title.is_empty() {
        title.pop();
    }
    title.push('…');
    title
}

fn render_running(app: &App, session: &Session, area: Rect, buf: &mut Buffer) {
    let bold = Style::default().add_modifier(Modifier::BOLD);
    let dim = Style::default().add_modifier(Modifier::DIM);

    let chunks = centered_rows(area, 6);
    let inner_width = area.width.saturating_sub(HORIZONTAL_MARGIN * 2);

    let lines = vec![
        Line::from(Span::styled(title_line(session, inner_width), bold)),
        Line::from(Span::styled(
            clock_format(app.snapshot.current_duration_ms),
            bold.fg(Color::Green),
        )),
        Line::from(""),
        Line::from(Span::styled(markers_line(session), dim)),
        Line::from(""),
        Line::from(Span::styled(
            "(space) stop  (m) marker  (r) reset  (esc) quit",
            dim.add_modifier(Modifier::ITALIC),
        )),
    ];

    Paragraph::new(lines)
        .alignment(Alignment::Center)
        .wrap(Wrap { trim: true })
        .render(chunks[1], buf);
}

fn render_summary(app: &App, session: &Session, area: Rect, buf: &mut Buffer) {
    let bold = Style::default().add_modifier(Modifier::BOLD);
    let dim = Style::default().add_modifier(Modifier::DIM);
    let magenta = Style::default().fg(Color::Magenta);

    let started_secs = (chrono::Utc::now() - session.start_time)
        .num_seconds()
        .max(0) as u64;
    let started_ago = HumanTime::from(std::time::Duration::from_secs(started_secs))
        .to_text_en(Accuracy::Rough, Tense::Past);

    let chunks = centered_rows(area, 8);
    let inner_width = area.width.saturating_sub(HORIZONTAL_MARGIN * 2);

    let mut lines = vec![
        Line::from(Span::styled(title_line(session, inner_width), bold)),
        Line::from(Span::styled(format!("started {}", started_ago), dim)),
        Line::from(Span::styled(
            clock_format(app.snapshot.current_duration_ms),
            bold.fg(Color::Yellow),
        )),
        Line::from(Span::styled(markers_line(session), dim)),
        Line::from(""),
    ];

    if let Some(status) = &app.status {
        lines.push(Line::from(Span::styled(
            status.clone(),
            magenta.add_modifier(Modifier::ITALIC),
        )));
    } else {
        lines.push(Line::from(""));
    }

    lines.push(Line::from(""));
    lines.push(Line::from(Span::styled(
        "(space) start new  (e) export  (r) reset  (esc) quit",
        dim.add_modifier(Modifier::ITALIC),
    )));

    Paragraph::new(lines)
        .alignment(Alignment::Center)
        .wrap(Wrap { trim: true })
        .render(chunks[1], buf);
}

fn render_welcome(area: Rect, buf: &mut Buffer) {
    let message = Paragraph::new(vec![
        Line::from(Span::styled(
            "takt",
            Style::default().add_modifier(Modifier::BOLD),
        )),
        Line::from(""),
        Line::from(Span::styled(
            "press (space) to start a session, (esc) to quit",
            Style::default().add_modifier(Modifier::DIM | Modifier::ITALIC),
        )),
    ])
    .alignment(Alignment::Center)
    .wrap(Wrap { trim: true });

    message.render(centered_rows(area, 3)[1], buf);
}

fn markers_line(session: &Session) -> String {
    match session.markers.len() {
        0 => "no markers".to_string(),
        n => {
            let labels = session.markers.iter().map(|m| m.label.as_str()).join(", ");
            format!("{} marker{} · {}", n, if n == 1 { "" } else { "s" }, labels)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::export::ExportFormat;
    use crate::store::{SessionState, SessionStore};
    use std::path::PathBuf;

    fn create_test_app(active: bool, with_session: bool) -> App {
        let mut snapshot = SessionState::default();
        if with_session {
            let mut session = Session::begin("morning deep work", "writing");
            session.add_marker("draft done");
            snapshot.last_session = Some(session);
            snapshot.is_active = active;
            snapshot.current_duration_ms = 93_000;
        }

        App {
            store: SessionStore::new(),
            snapshot,
            title: "morning deep work".to_string(),
            description: "writing".to_string(),
            export_format: ExportFormat::Markdown,
            export_dir: PathBuf::from("."),
            status: None,
        }
    }

    fn rendered(app: &App, area: Rect) -> String {
        let mut buffer = Buffer::empty(area);
        app.render(area, &mut buffer);
        buffer.content().iter().map(|c| c.symbol()).collect()
    }

    #[test]
    fn running_view_shows_title_and_clock() {
        let app = create_test_app(true, true);
        let text = rendered(&app, Rect::new(0, 0, 80, 24));

        assert!(text.contains("morning deep work"));
        assert!(text.contains("00:01:33"));
        assert!(text.contains("draft done"));
        assert!(text.contains("(m) marker"));
    }

    #[test]
    fn summary_view_offers_export() {
        let mut app = create_test_app(false, true);
        app.status = Some("exported session_1.md".to_string());
        let text = rendered(&app, Rect::new(0, 0, 80, 24));

        assert!(text.contains("(e) export"));
        assert!(text.contains("exported session_1.md"));
        assert!(text.contains("started"));
    }

    #[test]
    fn welcome_view_without_any_session() {
        let app = create_test_app(false, false);
        let text = rendered(&app, Rect::new(0, 0, 80, 24));

        assert!(text.contains("takt"));
        assert!(text.contains("press (space) to start"));
    }

    #[test]
    fn long_titles_are_ellipsized_not_wrapped() {
        let mut app = create_test_app(true, true);
        if let Some(session) = app.snapshot.last_session.as_mut() {
            session.title = "a".repeat(200);
        }
        let text = rendered(&app, Rect::new(0, 0, 40, 12));
        assert!(text.contains('…'));
    }

    #[test]
    fn render_survives_tiny_areas() {
        let app = create_test_app(true, true);
        let area = Rect::new(0, 0, 20, 3);
        let mut buffer = Buffer::empty(area);
        (&app).render(area, &mut buffer);
    }
}
