//! Real-time WebSocket engine configuration.

use serde::{Deserialize, Serialize};

/// Real-time (WebSocket) engine configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RealtimeConfig {
    /// Maximum WebSocket connections per user. When the cap is reached the
    /// oldest connection is evicted to make room for the new one.
    #[serde(default = "default_max_connections_per_user")]
    pub max_connections_per_user: usize,
    /// Outbound buffer size per connection. Events beyond a full buffer
    /// are dropped (delivery is best-effort).
    #[serde(default = "default_channel_buffer")]
    pub channel_buffer_size: usize,
    /// Seconds an unanswered call may stay ringing before it times out.
    #[serde(default = "default_ringing_timeout")]
    pub ringing_timeout_seconds: u64,
    /// Interval in seconds between sweeps for timed-out ringing calls.
    #[serde(default = "default_sweep_interval")]
    pub sweep_interval_seconds: u64,
}

impl Default for RealtimeConfig {
    fn default() -> Self {
        Self {
            max_connections_per_user: default_max_connections_per_user(),
            channel_buffer_size: default_channel_buffer(),
            ringing_timeout_seconds: default_ringing_timeout(),
            sweep_interval_seconds: default_sweep_interval(),
        }
    }
}

fn default_max_connections_per_user() -> usize {
    5
}

fn default_channel_buffer() -> usize {
    256
}

fn default_ringing_timeout() -> u64 {
    60
}

fn default_sweep_interval() -> u64 {
    5
}
