//! Terminal UI for the support chat
//!
//! Ratatui screen on top of the chat sync task.

mod app;
mod compose;
mod help;
pub mod log_capture;
mod messages;
mod sidebar;
mod ui;

pub use app::run;
pub use log_capture::LogBuffer;
