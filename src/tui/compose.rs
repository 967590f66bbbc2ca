//! Compose line for the open conversation.

use ratatui::{
    layout::Rect,
    style::{Color, Style},
    text::{Line, Span},
    widgets::{Block, BorderType, Borders, Paragraph},
    Frame,
};
use unicode_width::UnicodeWidthChar;

/// Border + one input row + border.
pub const COMPOSE_HEIGHT: u16 = 3;

const MAX_MESSAGE_CHARS: usize = 2000;

/// Single-line input; `cursor` is a byte offset on a char boundary.
#[derive(Default)]
pub struct ComposeState {
    pub input: String,
    cursor: usize,
}

impl ComposeState {
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn insert_char(&mut self, c: char) {
        if c == '\n' || self.input.chars().count() >= MAX_MESSAGE_CHARS {
            return;
        }
        self.input.insert(self.cursor, c);
        self.cursor += c.len_utf8();
    }

    fn prev_boundary(&self) -> Option<usize> {
        self.input[..self.cursor].char_indices().last().map(|(i, _)| i)
    }

    fn next_boundary(&self) -> Option<usize> {
        self.input[self.cursor..]
            .chars()
            .next()
            .map(|c| self.cursor + c.len_utf8())
    }

    pub fn backspace(&mut self) {
        if let Some(prev) = self.prev_boundary() {
            self.input.replace_range(prev..self.cursor, "");
            self.cursor = prev;
        }
    }

    pub fn delete(&mut self) {
        if let Some(next) = self.next_boundary() {
            self.input.replace_range(self.cursor..next, "");
        }
    }

    pub fn move_left(&mut self) {
        if let Some(prev) = self.prev_boundary() {
            self.cursor = prev;
        }
    }

    pub fn move_right(&mut self) {
        if let Some(next) = self.next_boundary() {
            self.cursor = next;
        }
    }

    pub fn move_home(&mut self) {
        self.cursor = 0;
    }

    pub fn move_end(&mut self) {
        self.cursor = self.input.len();
    }

    pub fn clear(&mut self) {
        self.input.clear();
        self.cursor = 0;
    }

    /// Take the trimmed text, leaving the box empty. `None` if blank.
    pub fn take(&mut self) -> Option<String> {
        let text = self.input.trim().to_string();
        if text.is_empty() {
            return None;
        }
        self.clear();
        Some(text)
    }
}

/// Visible slice of `input` that keeps the cursor on screen, and the
/// cursor's column within it.
fn visible_window(input: &str, cursor: usize, width: usize) -> (&str, usize) {
    let before: usize = input[..cursor].chars().filter_map(|c| c.width()).sum();
    if before < width {
        return (input, before);
    }

    // Drop leading chars until the cursor fits.
    let mut start = 0;
    let mut dropped = 0;
    for (i, c) in input.char_indices() {
        if before - dropped < width {
            break;
        }
        dropped += c.width().unwrap_or(0);
        start = i + c.len_utf8();
    }
    (&input[start..], before - dropped)
}

pub fn render(area: Rect, frame: &mut Frame, state: &ComposeState, peer: Option<&str>, focused: bool) {
    let border_style = if focused {
        Style::default().fg(Color::Yellow)
    } else {
        Style::default().fg(Color::DarkGray)
    };
    let block = Block::default()
        .borders(Borders::ALL)
        .border_type(if focused {
            BorderType::Double
        } else {
            BorderType::Plain
        })
        .border_style(border_style);
    let inner = block.inner(area);
    frame.render_widget(block, area);

    if inner.height == 0 || inner.width < 2 {
        return;
    }
    let input_area = Rect::new(inner.x, inner.y, inner.width, 1);
    let width = inner.width as usize - 1;

    if state.input.is_empty() {
        let placeholder = match peer {
            Some(name) => format!(" Message {}...", name),
            None => " Select a conversation first".to_string(),
        };
        let line = Line::from(Span::styled(placeholder, Style::default().fg(Color::DarkGray)));
        frame.render_widget(Paragraph::new(line), input_area);
        if focused {
            frame.set_cursor_position((input_area.x + 1, input_area.y));
        }
        return;
    }

    let (visible, column) = visible_window(&state.input, state.cursor, width);
    let line = Line::from(Span::styled(
        format!(" {}", visible),
        Style::default().fg(Color::White),
    ));
    frame.render_widget(Paragraph::new(line), input_area);
    if focused {
        frame.set_cursor_position((input_area.x + 1 + column as u16, input_area.y));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn typed(text: &str) -> ComposeState {
        let mut state = ComposeState::default();
        for c in text.chars() {
            state.insert_char(c);
        }
        state
    }

    #[test]
    fn test_editing_multibyte_text() {
        let mut state = typed("Đã đến");
        state.backspace();
        assert_eq!(state.input, "Đã đế");

        state.move_home();
        state.move_right();
        state.delete();
        assert_eq!(state.input, "Đ đế");
        assert_eq!(state.cursor(), 'Đ'.len_utf8());

        state.move_end();
        state.insert_char('n');
        assert_eq!(state.input, "Đ đến");
    }

    #[test]
    fn test_take_trims_and_clears() {
        let mut state = typed("  xin chào  ");
        assert_eq!(state.take().as_deref(), Some("xin chào"));
        assert!(state.input.is_empty());
        assert_eq!(state.cursor(), 0);

        let mut blank = typed("   ");
        assert_eq!(blank.take(), None);
        assert_eq!(blank.input, "   ");
    }

    #[test]
    fn test_visible_window_follows_cursor() {
        assert_eq!(visible_window("abc", 3, 10), ("abc", 3));
        let (visible, column) = visible_window("abcdefghij", 10, 4);
        assert_eq!(visible, "hij");
        assert_eq!(column, 3);
    }
}
