//! Reconnection and timeout configuration for the transports in this crate.
//!
//! Mirrors `alloy-core::transport::config::{ClientConfig, WsClientConfig}`:
//! a plain builder struct with a sensible `Default`, nothing read from the
//! environment or a config file (this is a library, not a binary).
//! `initial_delay`'s default of 100ms departs from the teacher's 1s: the
//! reconnect backoff's starting delay is a fixed, externally-mandated
//! number here, not a tunable left to this crate's judgment.

use std::time::Duration;

/// Reconnection policy for the WebSocket event transport.
#[derive(Debug, Clone)]
pub struct WsReconnectConfig {
    /// Whether to reconnect automatically after an unexpected close or
    /// error. When `false`, a disconnect ends the event stream for good.
    pub auto_reconnect: bool,
    /// Maximum number of reconnection attempts (`None` = unbounded).
    pub max_retries: Option<u32>,
    /// Delay before the first reconnection attempt.
    pub initial_delay: Duration,
    /// Ceiling the backoff delay is capped at.
    pub max_delay: Duration,
    /// Multiplier applied to the delay after each failed attempt.
    pub backoff_multiplier: f64,
}

impl Default for WsReconnectConfig {
    fn default() -> Self {
        Self {
            auto_reconnect: true,
            max_retries: None,
            initial_delay: Duration::from_millis(100),
            max_delay: Duration::from_secs(60),
            backoff_multiplier: 2.0,
        }
    }
}

impl WsReconnectConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Disables automatic reconnection entirely.
    pub fn no_reconnect() -> Self {
        Self {
            auto_reconnect: false,
            ..Default::default()
        }
    }

    pub fn with_max_retries(mut self, max: u32) -> Self {
        self.max_retries = Some(max);
        self
    }

    pub fn with_initial_delay(mut self, delay: Duration) -> Self {
        self.initial_delay = delay;
        self
    }

    pub fn with_max_delay(mut self, delay: Duration) -> Self {
        self.max_delay = delay;
        self
    }

    pub fn with_backoff_multiplier(mut self, multiplier: f64) -> Self {
        self.backoff_multiplier = multiplier;
        self
    }
}

/// Request timeout and reconnection policy passed to `ari-transport`'s
/// entry points at connect time.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Timeout applied to every schema-load and operation HTTP request.
    pub request_timeout: Duration,
    /// WebSocket reconnection policy.
    pub ws: WsReconnectConfig,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            request_timeout: Duration::from_secs(30),
            ws: WsReconnectConfig::default(),
        }
    }
}

impl ClientConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn with_ws(mut self, ws: WsReconnectConfig) -> Self {
        self.ws = ws;
        self
    }
}
