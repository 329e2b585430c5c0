//! WebSocket transport layer.
//!
//! This module owns the one multiplexed connection to the telemetry
//! endpoint.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────┐                         ┌──────────────────────┐
//! │  TelemetryClient     │                         │  Platform server     │
//! │                      │        WebSocket        │                      │
//! │  ConnectionManager   │◄───────────────────────►│  /api/ws/plugins/    │
//! │  → session task      │   commands ▸ ◂ updates  │       telemetry      │
//! │  → registry          │                         │                      │
//! └──────────────────────┘                         └──────────────────────┘
//! ```
//!
//! # Connection Lifecycle
//!
//! 1. `ConnectionManager::new` - Disconnected, nothing spawned
//! 2. `connect` / first `send` - Read token, open transport via `Connector`
//! 3. Open - Flush queued commands, route updates to the registry
//! 4. Close - Back off and reconnect, up to the attempt budget
//! 5. `disconnect` - Cancel reconnects, drop subscriptions, close
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `backoff` | Exponential reconnection schedule |
//! | `connection` | Connection manager and event loop |
//! | `connector` | Transport establishment seam |
//! | `endpoint` | Endpoint URL construction |

// ============================================================================
// Submodules
// ============================================================================

/// Reconnection schedule.
pub mod backoff;

/// Connection manager and event loop.
pub mod connection;

/// Transport establishment.
pub mod connector;

/// Endpoint URL construction.
pub mod endpoint;

#[cfg(test)]
pub(crate) mod testing;

// ============================================================================
// Re-exports
// ============================================================================

pub use backoff::ReconnectPolicy;
pub use connection::{ConnectionManager, ConnectionState, ConnectionStatus, StatusHandler};
pub use connector::{Connector, Link, LinkSink, LinkSource, TungsteniteConnector};
pub use endpoint::{TELEMETRY_PATH, parse_origin, telemetry_url};
