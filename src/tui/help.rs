//! Key bindings popup.

use ratatui::{
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph},
    Frame,
};

const POPUP_WIDTH: u16 = 52;

/// (section, [(key, action)])
const BINDINGS: &[(&str, &[(&str, &str)])] = &[
    (
        "CUSTOMERS",
        &[
            ("Up/Down j/k", "Move cursor"),
            ("Enter", "Open conversation"),
            ("Esc", "Close conversation"),
        ],
    ),
    (
        "CONVERSATION",
        &[
            ("Up/Down", "Scroll one line"),
            ("PgUp/PgDn", "Scroll one page"),
            ("End", "Jump to newest"),
        ],
    ),
    (
        "COMPOSE",
        &[
            ("Enter", "Send message"),
            ("Ctrl+U", "Clear input"),
            ("Esc", "Back to customers"),
        ],
    ),
    (
        "GENERAL",
        &[
            ("Tab/Shift+Tab", "Cycle panes"),
            ("?", "Toggle this help"),
            ("q / Ctrl+C", "Leave chat"),
        ],
    ),
];

fn help_lines() -> Vec<Line<'static>> {
    let mut lines = Vec::new();
    for (idx, (section, keys)) in BINDINGS.iter().enumerate() {
        if idx > 0 {
            lines.push(Line::from(""));
        }
        lines.push(Line::from(Span::styled(
            *section,
            Style::default().fg(Color::White).add_modifier(Modifier::BOLD),
        )));
        for (key, action) in keys.iter() {
            lines.push(Line::from(vec![
                Span::styled(format!("  {:<15}", key), Style::default().fg(Color::Yellow)),
                Span::styled(*action, Style::default().fg(Color::Gray)),
            ]));
        }
    }
    lines
}

pub fn render_help_popup(frame: &mut Frame) {
    let lines = help_lines();
    let area = frame.area();
    let width = POPUP_WIDTH.min(area.width.saturating_sub(2));
    let height = (lines.len() as u16 + 2).min(area.height.saturating_sub(2));
    let popup = Rect::new(
        area.x + area.width.saturating_sub(width) / 2,
        area.y + area.height.saturating_sub(height) / 2,
        width,
        height,
    );

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan))
        .title(Span::styled(
            " Keys (? to close) ",
            Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
        ));

    frame.render_widget(Clear, popup);
    frame.render_widget(Paragraph::new(lines).block(block), popup);
}
