//! Telemetry client module.
//!
//! This module is the consumer-facing entry point: it builds the shared
//! connection and turns entity/key selections into subscriptions.
//!
//! # Components
//!
//! | Type | Description |
//! |------|-------------|
//! | [`TelemetryClient`] | Subscribe/unsubscribe over one shared connection |
//! | [`TelemetryClientBuilder`] | Fluent configuration builder |
//! | [`ClientOptions`] | Reconnection, retention and default parameters |
//! | [`TelemetrySubscription`] | Reactive handle with buffered data |
//!
//! # Example
//!
//! ```no_run
//! use thingsboard_telemetry::{EntityRef, TelemetryClient, TokenStore};
//!
//! # async fn example() -> thingsboard_telemetry::Result<()> {
//! let client = TelemetryClient::builder()
//!     .origin("https://iot.example.com")
//!     .token_provider(TokenStore::with_token("eyJhbGciOi..."))
//!     .build()?;
//!
//! let mut sub = client.watch(client.timeseries(EntityRef::device("abc"), ["temperature"]));
//! sub.changed().await?;
//! println!("connected: {}", sub.connected());
//! # Ok(())
//! # }
//! ```

// ============================================================================
// Submodules
// ============================================================================

/// Fluent builder pattern for client configuration.
pub mod builder;

/// Core client implementation.
pub mod core;

/// Client options and defaults.
pub mod options;

/// Reactive subscription handle.
pub mod subscription;

// ============================================================================
// Re-exports
// ============================================================================

pub use builder::TelemetryClientBuilder;
pub use core::{SubscriptionKind, TelemetryClient};
pub use options::{ClientOptions, DEFAULT_TIME_WINDOW};
pub use subscription::{SubscriptionParams, TelemetrySubscription};
