//! Layout and chrome for the chat screen

use ratatui::{
    buffer::Buffer,
    layout::{Constraint, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Paragraph, Widget},
    Frame,
};

use super::app::{App, Pane};
use super::{compose, help, messages, sidebar};
use crate::chat::ConnectionState;

const SIDEBAR_WIDTH: u16 = 28;

fn connection_label(state: &ConnectionState) -> (String, Color) {
    match state {
        ConnectionState::Connecting => ("connecting".to_string(), Color::Yellow),
        ConnectionState::Connected => ("online".to_string(), Color::Green),
        ConnectionState::Reconnecting { in_secs } => {
            (format!("offline, retry in {}s", in_secs), Color::Red)
        }
        ConnectionState::Closed => ("closed".to_string(), Color::DarkGray),
    }
}

pub fn render(frame: &mut Frame, app: &App) {
    let [header_area, main_area, status_area] = Layout::vertical([
        Constraint::Length(1),
        Constraint::Fill(1),
        Constraint::Length(1),
    ])
    .areas(frame.area());

    render_header(header_area, frame.buffer_mut(), app);

    let [sidebar_area, content_area] =
        Layout::horizontal([Constraint::Length(SIDEBAR_WIDTH), Constraint::Fill(1)])
            .areas(main_area);
    sidebar::render(
        sidebar_area,
        frame.buffer_mut(),
        &app.sidebar,
        app.active_pane == Pane::Sidebar,
    );

    let [messages_area, compose_area] = Layout::vertical([
        Constraint::Fill(1),
        Constraint::Length(compose::COMPOSE_HEIGHT),
    ])
    .areas(content_area);
    messages::render(
        messages_area,
        frame.buffer_mut(),
        &app.messages,
        app.active_pane == Pane::Messages,
    );

    let peer = app.sidebar.open.as_ref().map(|_| app.messages.peer_name.as_str());
    compose::render(
        compose_area,
        frame,
        &app.compose,
        peer,
        app.active_pane == Pane::Compose,
    );

    render_status(status_area, frame.buffer_mut(), app);

    if app.show_help {
        help::render_help_popup(frame);
    }
}

fn render_header(area: Rect, buf: &mut Buffer, app: &App) {
    let (conn, conn_color) = connection_label(&app.connection);
    let unread = app.sidebar.total_unread();

    let left = " Bus Admin \u{00B7} Support chat";
    let right = format!("{} unread  \u{25CF} {}  {} ", unread, conn, app.operator_name);
    let pad = (area.width as usize).saturating_sub(left.chars().count() + right.chars().count());

    let line = Line::from(vec![
        Span::styled(left, Style::default().fg(Color::White).add_modifier(Modifier::BOLD)),
        Span::raw(" ".repeat(pad)),
        Span::styled(format!("{} unread  ", unread), Style::default().fg(Color::Yellow)),
        Span::styled(format!("\u{25CF} {}  ", conn), Style::default().fg(conn_color)),
        Span::styled(format!("{} ", app.operator_name), Style::default().fg(Color::Cyan)),
    ]);
    Paragraph::new(line)
        .style(Style::default().bg(Color::DarkGray))
        .render(area, buf);
}

fn render_status(area: Rect, buf: &mut Buffer, app: &App) {
    let line = match app.status_message {
        Some(ref msg) => {
            let color = if app.status_is_error {
                Color::Red
            } else {
                Color::Green
            };
            Line::from(Span::styled(format!(" {} ", msg), Style::default().fg(color)))
        }
        None => {
            let sep = Span::styled(" | ", Style::default().fg(Color::Gray));
            Line::from(vec![
                Span::styled(
                    format!(" Tab: {}", app.active_pane.as_str()),
                    Style::default().fg(Color::Cyan),
                ),
                sep.clone(),
                Span::styled("Enter: open/send", Style::default().fg(Color::Gray)),
                sep.clone(),
                Span::styled("?: help", Style::default().fg(Color::Gray)),
                sep,
                Span::styled("q: leave", Style::default().fg(Color::Gray)),
            ])
        }
    };
    Paragraph::new(line)
        .style(Style::default().bg(Color::DarkGray))
        .render(area, buf);
}
