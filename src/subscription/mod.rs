//! Subscription routing and data retention.
//!
//! | Module | Description |
//! |--------|-------------|
//! | `registry` | Maps command ids to subscriber callbacks |
//! | `buffer` | Per-key bounded merge of inbound samples |

// ============================================================================
// Submodules
// ============================================================================

/// Bounded per-key sample buffers.
pub mod buffer;

/// Command id → callback routing.
pub mod registry;

// ============================================================================
// Re-exports
// ============================================================================

pub use buffer::{DEFAULT_RETENTION, TelemetryData, merge_points};
pub use registry::{SubscriptionRegistry, UpdateCallback};
