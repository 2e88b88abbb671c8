//! Per-manager session statistics

use chrono::{DateTime, Utc};
use serde::Serialize;

/// Counters kept by one connection manager instance
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SessionStats {
    pub transports_opened: u64,
    pub transports_closed: u64,
    pub frames_sent: u64,
    pub frames_received: u64,
    pub messages_delivered: u64,
    pub transport_not_ready: u64,
    pub decode_failures: u64,
    pub transport_errors: u64,
    pub listener_missing: u64,
    pub last_opened_at: Option<DateTime<Utc>>,
}

impl SessionStats {
    /// Total failures reported through the log sink
    pub fn failures(&self) -> u64 {
        self.transport_not_ready + self.decode_failures + self.transport_errors + self.listener_missing
    }
}
