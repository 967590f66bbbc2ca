//! Chat screen state and its async event loop

use std::time::Duration;

use anyhow::{Context, Result};
use crossterm::event::{Event, EventStream, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use futures::StreamExt;
use ratatui::DefaultTerminal;

use super::compose::ComposeState;
use super::log_capture::LogBuffer;
use super::messages::MessagesState;
use super::sidebar::SidebarState;
use super::ui;
use crate::auth::Session;
use crate::chat::{self, ChatCommand, ChatHandle, ChatUpdate, ConnectionState};
use crate::config::Config;

/// Redraw cadence while idle (~30 fps)
const FRAME_DURATION_MS: u64 = 33;
const PAGE: usize = 10;

#[derive(Default, Clone, Copy, PartialEq, Eq, Debug)]
pub enum Pane {
    #[default]
    Sidebar,
    Messages,
    Compose,
}

impl Pane {
    pub fn as_str(&self) -> &'static str {
        match self {
            Pane::Sidebar => "customers",
            Pane::Messages => "conversation",
            Pane::Compose => "compose",
        }
    }

    fn next(self) -> Self {
        match self {
            Pane::Sidebar => Pane::Messages,
            Pane::Messages => Pane::Compose,
            Pane::Compose => Pane::Sidebar,
        }
    }

    fn prev(self) -> Self {
        match self {
            Pane::Sidebar => Pane::Compose,
            Pane::Messages => Pane::Sidebar,
            Pane::Compose => Pane::Messages,
        }
    }
}

pub struct App {
    pub should_exit: bool,
    pub operator_name: String,
    pub connection: ConnectionState,
    pub active_pane: Pane,
    pub show_help: bool,
    pub status_message: Option<String>,
    pub status_is_error: bool,
    pub sidebar: SidebarState,
    pub messages: MessagesState,
    pub compose: ComposeState,
}

impl App {
    pub fn new(operator_name: &str) -> Self {
        Self {
            should_exit: false,
            operator_name: operator_name.to_string(),
            connection: ConnectionState::Connecting,
            active_pane: Pane::default(),
            show_help: false,
            status_message: None,
            status_is_error: false,
            sidebar: SidebarState::default(),
            messages: MessagesState::default(),
            compose: ComposeState::default(),
        }
    }

    fn set_status(&mut self, message: String, is_error: bool) {
        self.status_message = Some(message);
        self.status_is_error = is_error;
    }

    pub fn apply(&mut self, update: ChatUpdate) {
        match update {
            ChatUpdate::View(view) => {
                self.sidebar.update(view.users, view.selected.clone());
                let peer_name = view
                    .selected
                    .as_deref()
                    .map(|id| self.sidebar.name_of(id))
                    .unwrap_or_default();
                self.messages.update(peer_name, view.phase, view.messages);
            }
            ChatUpdate::Notice(notice) => self.set_status(notice.to_string(), true),
            ChatUpdate::Connection(state) => {
                if state == ConnectionState::Connected && self.status_is_error {
                    self.status_message = None;
                }
                self.connection = state;
            }
        }
    }

    /// Apply a key press; returns the chat command it triggers, if any.
    pub fn handle_key(&mut self, key: KeyEvent) -> Option<ChatCommand> {
        if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
            self.should_exit = true;
            return None;
        }
        if self.show_help {
            if matches!(key.code, KeyCode::Esc | KeyCode::Char('?')) {
                self.show_help = false;
            }
            return None;
        }

        self.status_message = None;
        match key.code {
            KeyCode::Tab => {
                self.active_pane = self.active_pane.next();
                return None;
            }
            KeyCode::BackTab => {
                self.active_pane = self.active_pane.prev();
                return None;
            }
            _ => {}
        }

        match self.active_pane {
            Pane::Compose => self.compose_key(key),
            Pane::Sidebar | Pane::Messages => self.browse_key(key),
        }
    }

    fn browse_key(&mut self, key: KeyEvent) -> Option<ChatCommand> {
        match key.code {
            KeyCode::Char('q') => self.should_exit = true,
            KeyCode::Char('?') => self.show_help = true,
            KeyCode::Esc if self.sidebar.open.is_some() => return Some(ChatCommand::Deselect),
            _ if self.active_pane == Pane::Sidebar => return self.sidebar_key(key),
            KeyCode::Up | KeyCode::Char('k') => self.messages.scroll_up(1),
            KeyCode::Down | KeyCode::Char('j') => self.messages.scroll_down(1),
            KeyCode::PageUp => self.messages.scroll_up(PAGE),
            KeyCode::PageDown => self.messages.scroll_down(PAGE),
            KeyCode::End | KeyCode::Char('G') => self.messages.to_bottom(),
            _ => {}
        }
        None
    }

    fn sidebar_key(&mut self, key: KeyEvent) -> Option<ChatCommand> {
        match key.code {
            KeyCode::Up | KeyCode::Char('k') => self.sidebar.move_up(),
            KeyCode::Down | KeyCode::Char('j') => self.sidebar.move_down(),
            KeyCode::Enter => {
                let peer = self.sidebar.cursor_id()?.to_string();
                self.active_pane = Pane::Compose;
                return Some(ChatCommand::Select(peer));
            }
            _ => {}
        }
        None
    }

    fn compose_key(&mut self, key: KeyEvent) -> Option<ChatCommand> {
        let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
        match key.code {
            KeyCode::Esc => self.active_pane = Pane::Sidebar,
            KeyCode::Enter => {
                let text = self.compose.take()?;
                self.messages.to_bottom();
                return Some(ChatCommand::Send(text));
            }
            KeyCode::Char('u') if ctrl => self.compose.clear(),
            KeyCode::Char(c) if !ctrl => self.compose.insert_char(c),
            KeyCode::Backspace => self.compose.backspace(),
            KeyCode::Delete => self.compose.delete(),
            KeyCode::Left => self.compose.move_left(),
            KeyCode::Right => self.compose.move_right(),
            KeyCode::Home => self.compose.move_home(),
            KeyCode::End => self.compose.move_end(),
            _ => {}
        }
        None
    }
}

/// Run the chat screen until the operator leaves.
///
/// The chat task is torn down on the way out, whatever the exit path.
pub async fn run(config: &Config, session: &Session, logs: LogBuffer) -> Result<()> {
    let mut handle = chat::spawn(
        config.server.socket_base().to_string(),
        session.token.clone(),
        config.chat.clone(),
    );
    let operator = session.display_name.as_deref().unwrap_or("operator");
    let mut app = App::new(operator);

    let result = match ratatui::try_init() {
        Ok(mut terminal) => {
            let result = run_app(&mut terminal, &mut app, &mut handle, &logs).await;
            ratatui::restore();
            result
        }
        Err(e) => Err(e).context("Failed to initialise terminal"),
    };

    let shutdown = handle.shutdown().await;
    for line in logs.drain_problems() {
        eprintln!("{}", line);
    }
    result.and(shutdown)
}

async fn run_app(
    terminal: &mut DefaultTerminal,
    app: &mut App,
    handle: &mut ChatHandle,
    logs: &LogBuffer,
) -> Result<()> {
    let mut input = EventStream::new();
    let mut frame_tick = tokio::time::interval(Duration::from_millis(FRAME_DURATION_MS));

    while !app.should_exit {
        terminal.draw(|frame| ui::render(frame, app))?;

        tokio::select! {
            _ = frame_tick.tick() => {
                if app.status_message.is_none() {
                    if let Some(line) = logs.take_problem() {
                        app.set_status(line, true);
                    }
                }
            }
            update = handle.updates.recv() => match update {
                Some(update) => app.apply(update),
                None => app.should_exit = true,
            },
            event = input.next() => match event {
                Some(Ok(Event::Key(key))) if key.kind == KeyEventKind::Press => {
                    if let Some(command) = app.handle_key(key) {
                        if handle.commands.send(command).await.is_err() {
                            app.should_exit = true;
                        }
                    }
                }
                Some(Ok(_)) => {}
                Some(Err(e)) => return Err(e).context("Terminal input error"),
                None => app.should_exit = true,
            },
        }
    }
    Ok(())
}
