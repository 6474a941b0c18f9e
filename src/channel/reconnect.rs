//! Reconnect policy with exponential backoff and jitter.

use std::time::Duration;

use rand::Rng;

use crate::config::ChannelConfig;

/// When and how often the WebSocket transport retries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconnectPolicy {
    pub enabled: bool,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
    pub max_attempts: Option<u32>,
}

impl ReconnectPolicy {
    /// A policy that never retries.
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            base_delay_ms: 0,
            max_delay_ms: 0,
            max_attempts: Some(0),
        }
    }

    /// Whether another attempt is allowed after `failures` consecutive failures.
    pub fn should_retry(&self, failures: u32) -> bool {
        self.enabled && self.max_attempts.map_or(true, |max| failures < max)
    }

    /// Delay before the next attempt.
    ///
    /// `failures` is the number of consecutive failed attempts so far; a drop
    /// after a healthy session counts as the first.
    pub fn delay(&self, failures: u32) -> Duration {
        let attempt = failures.max(1);
        let exponential = 2u64.saturating_pow(attempt - 1);
        let capped = self
            .base_delay_ms
            .saturating_mul(exponential)
            .min(self.max_delay_ms);

        // jitter: 0 to 10% of the delay
        let jitter_range = capped / 10;
        let jitter = if jitter_range > 0 {
            rand::thread_rng().gen_range(0..jitter_range)
        } else {
            0
        };

        Duration::from_millis(capped + jitter)
    }
}

impl From<&ChannelConfig> for ReconnectPolicy {
    fn from(config: &ChannelConfig) -> Self {
        Self {
            enabled: config.reconnect,
            base_delay_ms: config.reconnect_base_delay_ms,
            max_delay_ms: config.reconnect_max_delay_ms,
            max_attempts: config.max_reconnect_attempts,
        }
    }
}
