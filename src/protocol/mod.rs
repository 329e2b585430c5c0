//! WebSocket protocol message types.
//!
//! This module defines the frames exchanged with the telemetry endpoint
//! (`/api/ws/plugins/telemetry`).
//!
//! # Protocol Overview
//!
//! | Message Type | Direction | Purpose |
//! |--------------|-----------|---------|
//! | `CommandEnvelope` | Local → Server | Subscribe, fetch history, unsubscribe |
//! | `InboundMessage` | Server → Local | Data for a `subscriptionId` |
//!
//! The `cmdId` chosen by the client on subscribe comes back as the
//! `subscriptionId` of every update for that subscription.
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `command` | Outbound envelopes and the id-allocating encoder |
//! | `entity` | Entity types, references and attribute scopes |
//! | `message` | Inbound decoding |

// ============================================================================
// Submodules
// ============================================================================

/// Outbound command envelopes.
pub mod command;

/// Entity addressing.
pub mod entity;

/// Inbound message decoding.
pub mod message;

// ============================================================================
// Re-exports
// ============================================================================

pub use command::{
    AttributeSubscribeCmd, CommandEncoder, CommandEnvelope, HistoryCmd, LATEST_TELEMETRY_SCOPE,
    TimeseriesSubscribeCmd, UnsubscribeCmd,
};
pub use entity::{AttributeScope, EntityRef, EntityType};
pub use message::{InboundMessage, KeyedPoints, SubscriptionUpdate, TsPoint};
