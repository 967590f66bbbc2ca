//! The chat sync loop: one task, one `select!`, all chat state inside.

use anyhow::Result;
use tokio::sync::mpsc;
use tokio::time::{self, Instant, MissedTickBehavior};

use super::sync::{ChatSync, ChatView, Notice};
use crate::config::ChatConfig;
use crate::realtime::{ClientEvent, EventChannel};

/// Operator input from the UI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatCommand {
    Select(String),
    Deselect,
    Send(String),
    Close,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionState {
    Connecting,
    Connected,
    Reconnecting { in_secs: u64 },
    Closed,
}

/// State pushed to the UI.
#[derive(Debug, Clone, PartialEq)]
pub enum ChatUpdate {
    View(ChatView),
    Notice(Notice),
    Connection(ConnectionState),
}

/// Why a driver run ended.
#[derive(Debug)]
pub enum Exit {
    /// The operator left the chat screen, or the UI went away.
    Closed,
    /// The connection failed; state in `ChatSync` is still valid.
    Lost(anyhow::Error),
}

async fn emit_all<C: EventChannel>(channel: &mut C, events: Vec<ClientEvent>) -> Result<()> {
    for event in &events {
        channel.emit(event).await?;
    }
    Ok(())
}

/// Push the current view and any pending notices. `false` once the UI is gone.
pub(super) async fn publish(sync: &mut ChatSync, updates: &mpsc::Sender<ChatUpdate>) -> bool {
    for notice in sync.take_notices() {
        if updates.send(ChatUpdate::Notice(notice)).await.is_err() {
            return false;
        }
    }
    updates.send(ChatUpdate::View(sync.view())).await.is_ok()
}

/// Drive one connection until it fails or the operator closes the screen.
///
/// The user list is requested immediately and then every `user_poll`; the
/// open conversation is re-requested every `history_poll`, with that timer
/// restarted whenever a different conversation is selected.
pub async fn run<C: EventChannel>(
    channel: &mut C,
    sync: &mut ChatSync,
    timers: &ChatConfig,
    commands: &mut mpsc::Receiver<ChatCommand>,
    updates: &mpsc::Sender<ChatUpdate>,
) -> Exit {
    let mut users_tick = time::interval(timers.user_poll());
    users_tick.set_missed_tick_behavior(MissedTickBehavior::Delay);

    let history_period = timers.history_poll();
    let mut history_tick = time::interval_at(Instant::now() + history_period, history_period);
    history_tick.set_missed_tick_behavior(MissedTickBehavior::Delay);

    if let Err(e) = emit_all(channel, sync.resume(Instant::now())).await {
        return Exit::Lost(e);
    }
    if !publish(sync, updates).await {
        return Exit::Closed;
    }

    loop {
        let deadline = sync.deadline();

        let emitted = tokio::select! {
            event = channel.next_event() => match event {
                Ok(Some(event)) => sync.on_event(event),
                Ok(None) => return Exit::Lost(anyhow::anyhow!("Chat connection closed by server")),
                Err(e) => return Exit::Lost(e),
            },
            _ = users_tick.tick() => vec![sync.poll_users()],
            _ = history_tick.tick(), if sync.selected().is_some() => {
                sync.poll_history().into_iter().collect()
            }
            _ = time::sleep_until(deadline.unwrap_or_else(Instant::now)), if deadline.is_some() => {
                sync.check_timeout(Instant::now());
                Vec::new()
            }
            command = commands.recv() => match command {
                Some(ChatCommand::Select(peer)) => {
                    let out = sync.select(&peer, Instant::now());
                    history_tick.reset();
                    out
                }
                Some(ChatCommand::Deselect) => {
                    sync.deselect();
                    Vec::new()
                }
                Some(ChatCommand::Send(text)) => sync.send(&text).into_iter().collect(),
                Some(ChatCommand::Close) | None => return Exit::Closed,
            },
        };

        if let Err(e) = emit_all(channel, emitted).await {
            return Exit::Lost(e);
        }
        if !publish(sync, updates).await {
            return Exit::Closed;
        }
    }
}
