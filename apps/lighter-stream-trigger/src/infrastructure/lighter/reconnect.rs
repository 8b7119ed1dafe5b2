//! Reconnection Policy
//!
//! Fixed-interval reconnection for the Lighter stream. Retries while
//! reconnection is enabled, with no backoff, no jitter and no attempt cap.

use std::time::Duration;

use crate::domain::channel::{DEFAULT_RECONNECT_INTERVAL, SubscriptionConfig};

/// Configuration for reconnection behavior.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconnectConfig {
    /// Whether to reconnect after an unplanned close.
    pub enabled: bool,
    /// Delay before each reconnection attempt.
    pub interval: Duration,
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            interval: DEFAULT_RECONNECT_INTERVAL,
        }
    }
}

impl ReconnectConfig {
    /// Create a new configuration. A zero interval falls back to the default.
    #[must_use]
    pub fn new(enabled: bool, interval: Duration) -> Self {
        let interval = if interval.is_zero() {
            DEFAULT_RECONNECT_INTERVAL
        } else {
            interval
        };
        Self { enabled, interval }
    }

    /// Create configuration from a subscription.
    #[must_use]
    pub fn from_subscription(config: &SubscriptionConfig) -> Self {
        Self::new(config.reconnect, config.reconnect_interval)
    }
}

/// Reconnection policy with a fixed delay.
///
/// # Example
///
/// ```rust
/// use lighter_stream_trigger::infrastructure::lighter::reconnect::{ReconnectConfig, ReconnectPolicy};
/// use std::time::Duration;
///
/// let mut policy = ReconnectPolicy::new(ReconnectConfig::new(true, Duration::from_secs(5)));
///
/// assert_eq!(policy.next_delay(), Some(Duration::from_secs(5)));
/// assert_eq!(policy.attempt_count(), 1);
///
/// // Subscribed again
/// policy.reset();
/// assert_eq!(policy.attempt_count(), 0);
/// ```
#[derive(Debug)]
pub struct ReconnectPolicy {
    config: ReconnectConfig,
    attempt_count: u32,
}

impl ReconnectPolicy {
    /// Create a new reconnection policy.
    #[must_use]
    pub const fn new(config: ReconnectConfig) -> Self {
        Self {
            config,
            attempt_count: 0,
        }
    }

    /// Get the delay before the next attempt.
    ///
    /// Returns `None` if reconnection is disabled.
    #[must_use]
    pub const fn next_delay(&mut self) -> Option<Duration> {
        if !self.config.enabled {
            return None;
        }

        self.attempt_count = self.attempt_count.saturating_add(1);
        Some(self.config.interval)
    }

    /// Reset the attempt count after a successful subscription.
    pub const fn reset(&mut self) {
        self.attempt_count = 0;
    }

    /// Get the current attempt count.
    #[must_use]
    pub const fn attempt_count(&self) -> u32 {
        self.attempt_count
    }
}
