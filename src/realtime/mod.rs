//! Socket.IO client for the support chat channel
//!
//! Speaks Engine.IO v4 over a single websocket; no long-polling fallback.

pub mod events;
pub mod frame;
pub mod socket;

pub use events::{ClientEvent, ServerEvent};
pub use socket::{ChatSocket, EventChannel};
