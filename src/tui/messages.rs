//! Messages pane: the open conversation, newest at the bottom.

use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, BorderType, Borders, Paragraph, Widget},
};
use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

use crate::chat::Phase;
use crate::models::{format_timestamp, ChatMessage, OPERATOR_ROLE};

#[derive(Default)]
pub struct MessagesState {
    /// Display name of the open peer; empty when nothing is open.
    pub peer_name: String,
    pub phase: Phase,
    pub messages: Vec<ChatMessage>,
    /// Lines scrolled up from the bottom (0 = follow newest).
    pub scroll_back: usize,
}

impl MessagesState {
    pub fn update(&mut self, peer_name: String, phase: Phase, messages: Vec<ChatMessage>) {
        if peer_name != self.peer_name {
            self.scroll_back = 0;
        }
        self.peer_name = peer_name;
        self.phase = phase;
        self.messages = messages;
    }

    pub fn scroll_up(&mut self, lines: usize) {
        self.scroll_back = self.scroll_back.saturating_add(lines);
    }

    pub fn scroll_down(&mut self, lines: usize) {
        self.scroll_back = self.scroll_back.saturating_sub(lines);
    }

    pub fn to_bottom(&mut self) {
        self.scroll_back = 0;
    }
}

pub fn render(area: Rect, buf: &mut Buffer, state: &MessagesState, focused: bool) {
    let title = if state.peer_name.is_empty() {
        " Conversation ".to_string()
    } else {
        format!(" {} ", state.peer_name)
    };
    let block = Block::default()
        .borders(Borders::ALL)
        .border_type(if focused {
            BorderType::Double
        } else {
            BorderType::Plain
        })
        .border_style(if focused {
            Style::default().fg(Color::Yellow)
        } else {
            Style::default().fg(Color::DarkGray)
        })
        .title(Span::styled(
            title,
            Style::default().fg(Color::White).add_modifier(Modifier::BOLD),
        ));
    let inner = block.inner(area);
    block.render(area, buf);

    if inner.height == 0 || inner.width == 0 {
        return;
    }

    if let Some(text) = empty_hint(state) {
        let line = Line::from(Span::styled(text, Style::default().fg(Color::DarkGray)));
        Paragraph::new(line).render(Rect::new(inner.x, inner.y, inner.width, 1), buf);
        return;
    }

    let lines = build_lines(state, inner.width as usize);
    let height = inner.height as usize;
    let max_scroll = lines.len().saturating_sub(height);
    let top = max_scroll.saturating_sub(state.scroll_back.min(max_scroll));

    for (row, line) in lines.into_iter().skip(top).take(height).enumerate() {
        Paragraph::new(line).render(Rect::new(inner.x, inner.y + row as u16, inner.width, 1), buf);
    }

    if top > 0 {
        let cell = &mut buf[(inner.x + inner.width - 1, inner.y)];
        cell.set_char('^');
        cell.set_style(Style::default().fg(Color::DarkGray));
    }
}

fn empty_hint(state: &MessagesState) -> Option<&'static str> {
    if !state.messages.is_empty() {
        return None;
    }
    Some(match state.phase {
        Phase::Idle => " Pick a customer and press Enter",
        Phase::Loading => " Loading conversation...",
        Phase::Ready => " No messages yet",
    })
}

fn build_lines(state: &MessagesState, width: usize) -> Vec<Line<'static>> {
    let mut lines = Vec::new();
    if state.phase == Phase::Loading {
        lines.push(Line::from(Span::styled(
            " refreshing...",
            Style::default().fg(Color::DarkGray).add_modifier(Modifier::ITALIC),
        )));
    }

    for message in &state.messages {
        let mine = message.is_from_operator(OPERATOR_ROLE);
        let (who, who_style) = if mine {
            ("You".to_string(), Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD))
        } else {
            (
                state.peer_name.clone(),
                Style::default().fg(Color::White).add_modifier(Modifier::BOLD),
            )
        };
        lines.push(Line::from(vec![
            Span::styled(format!(" {}", who), who_style),
            Span::styled(
                format!("  {}", format_timestamp(&message.timestamp)),
                Style::default().fg(Color::DarkGray),
            ),
        ]));

        let body_style = if mine {
            Style::default().fg(Color::Gray)
        } else {
            Style::default().fg(Color::White)
        };
        for chunk in wrap_text(&message.content, width.saturating_sub(3)) {
            lines.push(Line::from(Span::styled(format!("   {}", chunk), body_style)));
        }
        lines.push(Line::from(""));
    }
    lines
}

/// Word-wrap by display columns; words wider than a line are split.
fn wrap_text(text: &str, width: usize) -> Vec<String> {
    if width == 0 {
        return Vec::new();
    }
    let mut out = Vec::new();
    for paragraph in text.lines() {
        let mut current = String::new();
        for word in paragraph.split_whitespace() {
            let sep = usize::from(!current.is_empty());
            if current.width() + sep + word.width() <= width {
                if sep == 1 {
                    current.push(' ');
                }
                current.push_str(word);
                continue;
            }
            if !current.is_empty() {
                out.push(std::mem::take(&mut current));
            }
            for c in word.chars() {
                if !current.is_empty() && current.width() + c.width().unwrap_or(0) > width {
                    out.push(std::mem::take(&mut current));
                }
                current.push(c);
            }
        }
        out.push(current);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn message(role: &str, content: &str) -> ChatMessage {
        ChatMessage {
            id: None,
            sender_id: "x".into(),
            receiver_id: None,
            content: content.into(),
            timestamp: "2026-10-19T08:30:00+07:00".into(),
            read: false,
            role: Some(role.into()),
        }
    }

    #[test]
    fn test_wrap_text() {
        assert_eq!(wrap_text("xe đến lúc chín giờ", 10), vec!["xe đến lúc", "chín giờ"]);
        assert_eq!(wrap_text("abcdefghij", 4), vec!["abcd", "efgh", "ij"]);
        assert_eq!(wrap_text("một\n\nhai", 10), vec!["một", "", "hai"]);
        assert!(wrap_text("x", 0).is_empty());
    }

    #[test]
    fn test_lines_label_operator_and_peer() {
        let state = MessagesState {
            peer_name: "Trần An".into(),
            phase: Phase::Ready,
            messages: vec![message("user", "Cho hỏi giờ xe"), message("admin", "21h")],
            scroll_back: 0,
        };
        let lines = build_lines(&state, 40);
        assert_eq!(lines.len(), 6);
        let header: String = lines[0].spans.iter().map(|s| s.content.as_ref()).collect();
        assert_eq!(header, " Trần An  19/10/2026 08:30");
        let mine: String = lines[3].spans.iter().map(|s| s.content.as_ref()).collect();
        assert!(mine.starts_with(" You"));
    }

    #[test]
    fn test_new_peer_resets_scroll() {
        let mut state = MessagesState::default();
        state.update("A".into(), Phase::Ready, vec![]);
        state.scroll_up(5);
        state.update("A".into(), Phase::Ready, vec![]);
        assert_eq!(state.scroll_back, 5);
        state.update("B".into(), Phase::Loading, vec![]);
        assert_eq!(state.scroll_back, 0);
        assert_eq!(empty_hint(&state), Some(" Loading conversation..."));
    }
}
