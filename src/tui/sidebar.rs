//! Sidebar: customers with an open support conversation.

use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, BorderType, Borders, Paragraph, Widget},
};
use unicode_width::UnicodeWidthStr;

use crate::models::ChatUser;

pub struct SidebarState {
    pub users: Vec<ChatUser>,
    /// Row under the cursor.
    pub cursor: usize,
    /// Conversation currently open in the messages pane.
    pub open: Option<String>,
    /// No user list received yet.
    pub loading: bool,
}

impl Default for SidebarState {
    fn default() -> Self {
        Self {
            users: Vec::new(),
            cursor: 0,
            open: None,
            loading: true,
        }
    }
}

impl SidebarState {
    /// Replace the list, keeping the cursor on the same user when possible.
    pub fn update(&mut self, users: Vec<ChatUser>, open: Option<String>) {
        let anchor = self.cursor_id().map(str::to_string);
        self.users = users;
        self.open = open;
        self.loading = false;

        if let Some(pos) = anchor.and_then(|id| self.users.iter().position(|u| u.id == id)) {
            self.cursor = pos;
        }
        self.cursor = self.cursor.min(self.users.len().saturating_sub(1));
    }

    pub fn cursor_id(&self) -> Option<&str> {
        self.users.get(self.cursor).map(|u| u.id.as_str())
    }

    pub fn name_of(&self, id: &str) -> String {
        self.users
            .iter()
            .find(|u| u.id == id)
            .map(|u| u.display_name().to_string())
            .unwrap_or_else(|| id.to_string())
    }

    pub fn move_up(&mut self) {
        self.cursor = self.cursor.saturating_sub(1);
    }

    pub fn move_down(&mut self) {
        if self.cursor + 1 < self.users.len() {
            self.cursor += 1;
        }
    }

    pub fn total_unread(&self) -> u32 {
        self.users.iter().map(|u| u.unread_count).sum()
    }
}

pub fn render(area: Rect, buf: &mut Buffer, state: &SidebarState, focused: bool) {
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
            " Customers ",
            Style::default().fg(Color::White).add_modifier(Modifier::BOLD),
        ));
    let inner = block.inner(area);
    block.render(area, buf);

    if inner.height == 0 || inner.width == 0 {
        return;
    }

    let placeholder = if state.loading {
        Some(" Loading...")
    } else if state.users.is_empty() {
        Some(" No conversations")
    } else {
        None
    };
    if let Some(text) = placeholder {
        let line = Line::from(Span::styled(text, Style::default().fg(Color::DarkGray)));
        Paragraph::new(line).render(Rect::new(inner.x, inner.y, inner.width, 1), buf);
        return;
    }

    let height = inner.height as usize;
    let offset = scroll_offset(state.cursor, height, state.users.len());
    for (row, (idx, user)) in state
        .users
        .iter()
        .enumerate()
        .skip(offset)
        .take(height)
        .enumerate()
    {
        let row_area = Rect::new(inner.x, inner.y + row as u16, inner.width, 1);
        let under_cursor = idx == state.cursor;
        let is_open = state.open.as_deref() == Some(user.id.as_str());
        render_user(buf, row_area, user, under_cursor && focused, is_open);
    }
}

/// Keep the cursor row visible.
fn scroll_offset(cursor: usize, height: usize, total: usize) -> usize {
    if total <= height || cursor < height {
        return 0;
    }
    (cursor + 1 - height).min(total - height)
}

fn render_user(buf: &mut Buffer, area: Rect, user: &ChatUser, highlighted: bool, is_open: bool) {
    let width = area.width as usize;
    let presence = if user.online { "\u{25CF}" } else { "\u{25CB}" };
    let marker = if is_open { ">" } else { " " };
    let badge = if user.unread_count > 0 {
        format!(" {} ", user.unread_count)
    } else {
        String::new()
    };

    let base = if highlighted {
        Style::default().fg(Color::White).bg(Color::DarkGray)
    } else if is_open {
        Style::default().fg(Color::Cyan)
    } else if user.unread_count > 0 {
        Style::default().fg(Color::White).add_modifier(Modifier::BOLD)
    } else {
        Style::default().fg(Color::Gray)
    };
    let presence_style = base.fg(if user.online { Color::Green } else { Color::DarkGray });

    let room = width.saturating_sub(3 + badge.width());
    let name = fit(user.display_name(), room);
    let pad = room.saturating_sub(name.width());

    let line = Line::from(vec![
        Span::styled(marker, base),
        Span::styled(presence, presence_style),
        Span::styled(" ", base),
        Span::styled(name, base),
        Span::styled(" ".repeat(pad), base),
        Span::styled(
            badge,
            Style::default()
                .fg(Color::Black)
                .bg(Color::Yellow)
                .add_modifier(Modifier::BOLD),
        ),
    ]);
    Paragraph::new(line).render(area, buf);
}

/// Cut `text` to at most `width` columns.
fn fit(text: &str, width: usize) -> String {
    let mut out = String::new();
    let mut used = 0;
    for c in text.chars() {
        let w = unicode_width::UnicodeWidthChar::width(c).unwrap_or(0);
        if used + w > width {
            break;
        }
        used += w;
        out.push(c);
    }
    out
}
