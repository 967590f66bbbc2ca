//! Support chat: sync state, the loop that drives it, and reconnection
//!
//! The whole chat runs in one spawned task. The UI talks to it through a
//! command channel and gets `ChatUpdate`s back; dropping the `ChatHandle`
//! aborts the task, which drops the timers and the socket with it.

pub mod driver;
pub mod sync;

use std::time::Duration;

use anyhow::Result;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant};

use crate::api::ApiError;
use crate::config::ChatConfig;
use crate::models::OPERATOR_ROLE;
use crate::realtime::{ChatSocket, ClientEvent, EventChannel};

pub use driver::{ChatCommand, ChatUpdate, ConnectionState};
pub use sync::{ChatSync, Notice, Phase};

const MIN_BACKOFF: Duration = Duration::from_secs(1);
const MAX_BACKOFF: Duration = Duration::from_secs(30);

pub struct ChatHandle {
    pub commands: mpsc::Sender<ChatCommand>,
    pub updates: mpsc::Receiver<ChatUpdate>,
    task: Option<JoinHandle<Result<()>>>,
}

impl ChatHandle {
    /// Ask the loop to close the socket and wait for it to finish.
    pub async fn shutdown(mut self) -> Result<()> {
        let _ = self.commands.send(ChatCommand::Close).await;
        match self.task.take() {
            Some(task) => match task.await {
                Ok(result) => result,
                Err(e) if e.is_cancelled() => Ok(()),
                Err(e) => Err(e.into()),
            },
            None => Ok(()),
        }
    }
}

impl Drop for ChatHandle {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

/// Start the chat task for the given socket base URL and bearer token.
pub fn spawn(socket_base: String, token: String, timers: ChatConfig) -> ChatHandle {
    let (commands, command_rx) = mpsc::channel(32);
    let (update_tx, updates) = mpsc::channel(64);
    let task = tokio::spawn(run_with_reconnect(
        socket_base,
        token,
        timers,
        command_rx,
        update_tx,
    ));
    ChatHandle {
        commands,
        updates,
        task: Some(task),
    }
}

fn is_session_expired(e: &anyhow::Error) -> bool {
    matches!(
        e.downcast_ref::<ApiError>(),
        Some(ApiError::SessionExpired { .. })
    )
}

async fn notify(updates: &mpsc::Sender<ChatUpdate>, state: ConnectionState) {
    let _ = updates.send(ChatUpdate::Connection(state)).await;
}

/// Keep a connection up until the operator closes the chat.
///
/// Chat state lives outside the connection, so a reconnect picks up where
/// the previous socket left off. Backoff starts at 1s, doubles per failed
/// attempt up to 30s, and resets after a successful connect. A rejected
/// token ends the loop with `ApiError::SessionExpired`.
async fn run_with_reconnect(
    socket_base: String,
    token: String,
    timers: ChatConfig,
    mut commands: mpsc::Receiver<ChatCommand>,
    updates: mpsc::Sender<ChatUpdate>,
) -> Result<()> {
    let mut sync = ChatSync::new(OPERATOR_ROLE, timers.history_timeout());
    // Read acknowledgements made while offline.
    let mut outbox: Vec<ClientEvent> = Vec::new();
    let mut backoff = MIN_BACKOFF;

    loop {
        notify(&updates, ConnectionState::Connecting).await;

        let connected = match connect(&socket_base, &token, &mut sync, &updates).await {
            Some(result) => result,
            None => return Ok(()),
        };
        match connected {
            Ok(mut socket) => {
                backoff = MIN_BACKOFF;
                notify(&updates, ConnectionState::Connected).await;

                let mut flushed = Ok(());
                for event in outbox.drain(..) {
                    flushed = socket.emit(&event).await;
                    if flushed.is_err() {
                        break;
                    }
                }

                let exit = match flushed {
                    Ok(()) => {
                        driver::run(&mut socket, &mut sync, &timers, &mut commands, &updates).await
                    }
                    Err(e) => driver::Exit::Lost(e),
                };
                match exit {
                    driver::Exit::Closed => {
                        socket.close().await;
                        notify(&updates, ConnectionState::Closed).await;
                        return Ok(());
                    }
                    driver::Exit::Lost(e) => tracing::warn!("Chat connection lost: {:#}", e),
                }
            }
            Err(e) if is_session_expired(&e) => {
                notify(&updates, ConnectionState::Closed).await;
                return Err(e);
            }
            Err(e) => tracing::warn!("Chat connection failed: {:#}", e),
        }

        tracing::info!("Reconnecting chat in {}s", backoff.as_secs());
        notify(
            &updates,
            ConnectionState::Reconnecting {
                in_secs: backoff.as_secs(),
            },
        )
        .await;
        if !wait_offline(backoff, &mut sync, &mut outbox, &mut commands, &updates).await {
            notify(&updates, ConnectionState::Closed).await;
            return Ok(());
        }
        backoff = (backoff * 2).min(MAX_BACKOFF);
    }
}

/// Expire a history wait that ran out. `false` once the UI is gone.
async fn expire_history(sync: &mut ChatSync, updates: &mpsc::Sender<ChatUpdate>) -> bool {
    if sync.check_timeout(Instant::now()) {
        return driver::publish(sync, updates).await;
    }
    true
}

/// Connect, enforcing the history wait while the handshake is in flight.
///
/// `None` if the UI went away meanwhile.
async fn connect(
    socket_base: &str,
    token: &str,
    sync: &mut ChatSync,
    updates: &mpsc::Sender<ChatUpdate>,
) -> Option<Result<ChatSocket>> {
    let attempt = ChatSocket::connect(socket_base, token);
    tokio::pin!(attempt);

    loop {
        let deadline = sync.deadline();
        tokio::select! {
            result = &mut attempt => return Some(result),
            _ = time::sleep_until(deadline.unwrap_or_else(Instant::now)), if deadline.is_some() => {
                if !expire_history(sync, updates).await {
                    return None;
                }
            }
        }
    }
}

/// Sleep out the backoff while still serving operator commands and the
/// history wait.
///
/// Returns `false` if the operator closed the chat meanwhile.
async fn wait_offline(
    delay: Duration,
    sync: &mut ChatSync,
    outbox: &mut Vec<ClientEvent>,
    commands: &mut mpsc::Receiver<ChatCommand>,
    updates: &mpsc::Sender<ChatUpdate>,
) -> bool {
    let sleep = time::sleep(delay);
    tokio::pin!(sleep);

    loop {
        let deadline = sync.deadline();
        tokio::select! {
            _ = &mut sleep => return true,
            _ = time::sleep_until(deadline.unwrap_or_else(Instant::now)), if deadline.is_some() => {
                if !expire_history(sync, updates).await {
                    return false;
                }
                continue;
            }
            command = commands.recv() => match command {
                Some(ChatCommand::Select(peer)) => {
                    // Join and history requests are repeated on resume.
                    outbox.extend(
                        sync.select(&peer, Instant::now())
                            .into_iter()
                            .filter(|e| matches!(e, ClientEvent::MarkRead { .. })),
                    );
                }
                Some(ChatCommand::Deselect) => sync.deselect(),
                Some(ChatCommand::Send(_)) => {
                    let _ = updates.send(ChatUpdate::Notice(Notice::Offline)).await;
                }
                Some(ChatCommand::Close) | None => return false,
            },
        }
        if !driver::publish(sync, updates).await {
            return false;
        }
    }
}
