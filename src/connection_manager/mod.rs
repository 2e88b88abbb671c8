//! Connection management for the lobby session
//!
//! This module provides:
//! - The view gate deciding where a transport may exist
//! - The transport lifecycle state machine
//! - Single-slot inbound listener registration
//! - Session statistics for reported failures

mod gate;
mod manager;
mod stats;
mod types;

pub use gate::{normalize_view, ViewGate, GAME_VIEW, INDEX_VIEW, LOBBY_VIEW};
pub use manager::ConnectionManager;
pub use stats::SessionStats;
pub use types::{MessageListener, TransportState};
