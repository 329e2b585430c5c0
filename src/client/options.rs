//! Client tuning options.
//!
//! # Example
//!
//! ```ignore
//! use std::time::Duration;
//! use thingsboard_telemetry::ClientOptions;
//!
//! let options = ClientOptions::new()
//!     .with_reconnect_base_delay(Duration::from_secs(1))
//!     .with_max_reconnect_attempts(10)
//!     .with_retention(500);
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::time::Duration;

use crate::protocol::AttributeScope;
use crate::subscription::DEFAULT_RETENTION;
use crate::transport::ReconnectPolicy;
use crate::transport::backoff::{DEFAULT_BASE_DELAY, DEFAULT_MAX_ATTEMPTS};

// ============================================================================
// Constants
// ============================================================================

/// Sliding window of a time-series subscription unless set otherwise.
pub const DEFAULT_TIME_WINDOW: Duration = Duration::from_millis(60_000);

// ============================================================================
// ClientOptions
// ============================================================================

/// Reconnection, retention and subscription defaults.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClientOptions {
    /// Backoff schedule for automatic reconnection.
    pub reconnect: ReconnectPolicy,

    /// Points kept per key in a subscription's buffers.
    pub retention: usize,

    /// Window used by [`crate::TelemetryClient::timeseries`].
    pub time_window: Duration,

    /// Scope used by [`crate::TelemetryClient::attributes`].
    pub attribute_scope: AttributeScope,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// Constructors
// ============================================================================

impl ClientOptions {
    /// Options with the stock defaults (2s base delay, 5 attempts, 1000 points,
    /// 60s window, client scope).
    #[inline]
    #[must_use]
    pub const fn new() -> Self {
        Self {
            reconnect: ReconnectPolicy::new(DEFAULT_BASE_DELAY, DEFAULT_MAX_ATTEMPTS),
            retention: DEFAULT_RETENTION,
            time_window: DEFAULT_TIME_WINDOW,
            attribute_scope: AttributeScope::ClientScope,
        }
    }
}

// ============================================================================
// Builder Methods
// ============================================================================

impl ClientOptions {
    /// Sets the delay before the first reconnection attempt.
    #[inline]
    #[must_use]
    pub fn with_reconnect_base_delay(mut self, delay: Duration) -> Self {
        self.reconnect.base_delay = delay;
        self
    }

    /// Sets how many reconnection attempts are made before giving up.
    #[inline]
    #[must_use]
    pub fn with_max_reconnect_attempts(mut self, attempts: u32) -> Self {
        self.reconnect.max_attempts = attempts;
        self
    }

    /// Sets the per-key retention cap.
    #[inline]
    #[must_use]
    pub fn with_retention(mut self, points: usize) -> Self {
        self.retention = points;
        self
    }

    /// Sets the default time-series window.
    #[inline]
    #[must_use]
    pub fn with_time_window(mut self, window: Duration) -> Self {
        self.time_window = window;
        self
    }

    /// Sets the default attribute scope.
    #[inline]
    #[must_use]
    pub fn with_attribute_scope(mut self, scope: AttributeScope) -> Self {
        self.attribute_scope = scope;
        self
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let options = ClientOptions::new();
        assert_eq!(options.reconnect.base_delay, Duration::from_secs(2));
        assert_eq!(options.reconnect.max_attempts, 5);
        assert_eq!(options.retention, 1000);
        assert_eq!(options.time_window, Duration::from_secs(60));
        assert_eq!(options.attribute_scope, AttributeScope::ClientScope);
        assert_eq!(options, ClientOptions::default());
    }

    #[test]
    fn test_builder_chain() {
        let options = ClientOptions::new()
            .with_reconnect_base_delay(Duration::from_millis(250))
            .with_max_reconnect_attempts(10)
            .with_retention(50)
            .with_time_window(Duration::from_secs(5))
            .with_attribute_scope(AttributeScope::SharedScope);

        assert_eq!(
            options.reconnect,
            ReconnectPolicy::new(Duration::from_millis(250), 10)
        );
        assert_eq!(options.retention, 50);
        assert_eq!(options.time_window, Duration::from_secs(5));
        assert_eq!(options.attribute_scope, AttributeScope::SharedScope);
    }
}
