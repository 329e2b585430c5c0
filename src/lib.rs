//! ThingsBoard telemetry - Real-time attribute and time-series subscriptions.
//!
//! This library keeps one multiplexed WebSocket connection to a ThingsBoard
//! server's telemetry endpoint and lets any number of consumers subscribe to
//! entity data over it.
//!
//! # Architecture
//!
//! - **Connection**: one transport, opened lazily with the caller's bearer
//!   token, reconnected with exponential backoff when it drops
//! - **Protocol**: outbound command envelopes keyed by a client-allocated
//!   `cmdId`, inbound updates carrying the matching `subscriptionId`
//! - **Registry**: routes each update to the one callback owning its id
//! - **Buffers**: per-key, timestamp-ordered, capped sample lists
//!
//! Key guarantees:
//!
//! - Commands issued while disconnected are flushed in order on open
//! - No callback runs after its subscription is cancelled
//! - `disconnect()` never triggers a reconnect
//!
//! # Quick Start
//!
//! ```no_run
//! use thingsboard_telemetry::{EntityRef, Result, TelemetryClient, TokenStore};
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let client = TelemetryClient::builder()
//!         .origin("https://iot.example.com")
//!         .token_provider(TokenStore::with_token("eyJhbGciOi..."))
//!         .build()?;
//!
//!     let params = client.timeseries(EntityRef::device("abc"), ["temperature"]);
//!     let mut sub = client.watch(params);
//!
//!     loop {
//!         sub.changed().await?;
//!         if let Some(point) = sub.data().latest("temperature") {
//!             println!("temperature = {} @ {}", point.value, point.ts);
//!         }
//!     }
//! }
//! ```
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`client`] | Client factory, options and reactive subscriptions |
//! | [`auth`] | Bearer token sources |
//! | [`error`] | Error types and [`Result`] alias |
//! | [`identifiers`] | Command id type and allocator |
//! | [`protocol`] | Wire commands and inbound updates |
//! | [`subscription`] | Callback registry and sample buffers |
//! | [`transport`] | WebSocket connection management (internal) |

// ============================================================================
// Modules
// ============================================================================

/// Bearer token sources.
pub mod auth;

/// Client factory and configuration.
///
/// Use [`TelemetryClient::builder()`] to create a configured client.
pub mod client;

/// Error types and result aliases.
///
/// All fallible operations return [`Result<T>`] which uses [`Error`].
pub mod error;

/// Command identifiers.
pub mod identifiers;

/// Telemetry protocol message types.
///
/// Outbound command envelopes and inbound subscription updates.
pub mod protocol;

/// Subscription routing and buffering.
pub mod subscription;

/// WebSocket transport layer.
///
/// Internal module handling the connection lifecycle and reconnection.
pub mod transport;

// ============================================================================
// Re-exports
// ============================================================================

// Auth types
pub use auth::{TokenProvider, TokenStore};

// Client types
pub use client::{
    ClientOptions, SubscriptionKind, SubscriptionParams, TelemetryClient, TelemetryClientBuilder,
    TelemetrySubscription,
};

// Error types
pub use error::{Error, Result};

// Identifier types
pub use identifiers::CommandId;

// Protocol types
pub use protocol::{AttributeScope, EntityRef, EntityType, SubscriptionUpdate, TsPoint};

// Subscription types
pub use subscription::TelemetryData;

// Transport types
pub use transport::{ConnectionManager, ConnectionState, ConnectionStatus, ReconnectPolicy};
