//! Outbound command envelopes.
//!
//! Every frame sent to the telemetry endpoint is a [`CommandEnvelope`]: an
//! object with up to four command arrays. Each command carries the `cmdId`
//! that correlates it with the inbound updates answering it.
//!
//! # Command Shapes
//!
//! | Array | Command | Purpose |
//! |-------|---------|---------|
//! | `tsSubCmds` | [`TimeseriesSubscribeCmd`] | Latest telemetry over a sliding window |
//! | `attrSubCmds` | [`AttributeSubscribeCmd`] | Attribute values in one scope |
//! | `historyCmds` | [`HistoryCmd`] | One-shot closed time range |
//! | `unsubscribeCmd` | [`UnsubscribeCmd`] | Cancel a `cmdId` |

// ============================================================================
// Imports
// ============================================================================

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use serde::{Serialize, Serializer};

use crate::error::Result;
use crate::identifiers::{CommandId, IdAllocator};

use super::entity::{AttributeScope, EntityRef, EntityType};

// ============================================================================
// Constants
// ============================================================================

/// Scope sent with every time-series subscription.
pub const LATEST_TELEMETRY_SCOPE: &str = "LATEST_TELEMETRY";

// ============================================================================
// Commands
// ============================================================================

/// Time-series subscription (`tsSubCmds` entry).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeseriesSubscribeCmd {
    pub entity_type: EntityType,
    pub entity_id: String,
    pub scope: &'static str,
    pub cmd_id: CommandId,
    #[serde(serialize_with = "join_keys")]
    pub keys: Vec<String>,
    /// Window start, unix millis.
    pub start_ts: i64,
    /// Window length, millis.
    pub time_window: u64,
}

/// Attribute subscription (`attrSubCmds` entry).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AttributeSubscribeCmd {
    pub entity_type: EntityType,
    pub entity_id: String,
    pub scope: AttributeScope,
    pub cmd_id: CommandId,
    #[serde(serialize_with = "join_keys")]
    pub keys: Vec<String>,
}

/// History fetch over a closed range (`historyCmds` entry).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryCmd {
    pub entity_type: EntityType,
    pub entity_id: String,
    #[serde(serialize_with = "join_keys")]
    pub keys: Vec<String>,
    pub start_ts: i64,
    pub end_ts: i64,
    pub cmd_id: CommandId,
}

/// Cancellation of a previous subscription (`unsubscribeCmd` entry).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UnsubscribeCmd {
    pub cmd_id: CommandId,
}

/// Keys travel as one comma-separated string.
fn join_keys<S: Serializer>(
    keys: &[String],
    serializer: S,
) -> std::result::Result<S::Ok, S::Error> {
    serializer.serialize_str(&keys.join(","))
}

// ============================================================================
// CommandEnvelope
// ============================================================================

/// One outbound frame. Empty arrays are omitted from the JSON.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CommandEnvelope {
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub ts_sub_cmds: Vec<TimeseriesSubscribeCmd>,

    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub attr_sub_cmds: Vec<AttributeSubscribeCmd>,

    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub history_cmds: Vec<HistoryCmd>,

    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub unsubscribe_cmd: Vec<UnsubscribeCmd>,
}

impl CommandEnvelope {
    /// Returns `true` if the envelope carries no command.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ts_sub_cmds.is_empty()
            && self.attr_sub_cmds.is_empty()
            && self.history_cmds.is_empty()
            && self.unsubscribe_cmd.is_empty()
    }

    /// Appends every command of `other` to this envelope.
    #[must_use]
    pub fn combine(mut self, other: CommandEnvelope) -> Self {
        self.ts_sub_cmds.extend(other.ts_sub_cmds);
        self.attr_sub_cmds.extend(other.attr_sub_cmds);
        self.history_cmds.extend(other.history_cmds);
        self.unsubscribe_cmd.extend(other.unsubscribe_cmd);
        self
    }

    /// All command ids in the envelope, in array order.
    #[must_use]
    pub fn cmd_ids(&self) -> Vec<CommandId> {
        self.ts_sub_cmds
            .iter()
            .map(|c| c.cmd_id)
            .chain(self.attr_sub_cmds.iter().map(|c| c.cmd_id))
            .chain(self.history_cmds.iter().map(|c| c.cmd_id))
            .chain(self.unsubscribe_cmd.iter().map(|c| c.cmd_id))
            .collect()
    }

    /// Serializes the envelope to its wire JSON.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Json`] if serialization fails.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}

// ============================================================================
// CommandEncoder
// ============================================================================

/// Builds command envelopes and allocates their ids.
///
/// Encoding is pure apart from id allocation. Callers must pass a non-empty
/// entity id and key list; the encoder does not check.
#[derive(Debug, Default)]
pub struct CommandEncoder {
    ids: IdAllocator,
}

impl CommandEncoder {
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocates a fresh command id (first id is 1).
    #[inline]
    pub fn next_id(&self) -> CommandId {
        self.ids.next_id()
    }

    /// Time-series subscription covering the last `window`.
    pub fn telemetry_subscribe(
        &self,
        entity: &EntityRef,
        keys: &[String],
        window: Duration,
    ) -> (CommandId, CommandEnvelope) {
        self.telemetry_subscribe_at(now_millis(), entity, keys, window)
    }

    /// Same as [`Self::telemetry_subscribe`] with an explicit "now" in unix millis.
    pub fn telemetry_subscribe_at(
        &self,
        now_ms: i64,
        entity: &EntityRef,
        keys: &[String],
        window: Duration,
    ) -> (CommandId, CommandEnvelope) {
        let cmd_id = self.next_id();
        let time_window = u64::try_from(window.as_millis()).unwrap_or(u64::MAX);
        let start_ts = now_ms.saturating_sub(i64::try_from(time_window).unwrap_or(i64::MAX));

        let envelope = CommandEnvelope {
            ts_sub_cmds: vec![TimeseriesSubscribeCmd {
                entity_type: entity.entity_type,
                entity_id: entity.entity_id.clone(),
                scope: LATEST_TELEMETRY_SCOPE,
                cmd_id,
                keys: keys.to_vec(),
                start_ts,
                time_window,
            }],
            ..Default::default()
        };

        (cmd_id, envelope)
    }

    /// Attribute subscription in `scope`.
    pub fn attribute_subscribe(
        &self,
        entity: &EntityRef,
        scope: AttributeScope,
        keys: &[String],
    ) -> (CommandId, CommandEnvelope) {
        let cmd_id = self.next_id();
        let envelope = CommandEnvelope {
            attr_sub_cmds: vec![AttributeSubscribeCmd {
                entity_type: entity.entity_type,
                entity_id: entity.entity_id.clone(),
                scope,
                cmd_id,
                keys: keys.to_vec(),
            }],
            ..Default::default()
        };

        (cmd_id, envelope)
    }

    /// History fetch over `[start_ts, end_ts]`. Callers guarantee `end_ts >= start_ts`.
    pub fn history(
        &self,
        entity: &EntityRef,
        keys: &[String],
        start_ts: i64,
        end_ts: i64,
    ) -> (CommandId, CommandEnvelope) {
        let cmd_id = self.next_id();
        let envelope = CommandEnvelope {
            history_cmds: vec![HistoryCmd {
                entity_type: entity.entity_type,
                entity_id: entity.entity_id.clone(),
                keys: keys.to_vec(),
                start_ts,
                end_ts,
                cmd_id,
            }],
            ..Default::default()
        };

        (cmd_id, envelope)
    }

    /// Cancellation of `cmd_id`. Does not allocate.
    #[must_use]
    pub fn unsubscribe(&self, cmd_id: CommandId) -> CommandEnvelope {
        CommandEnvelope {
            unsubscribe_cmd: vec![UnsubscribeCmd { cmd_id }],
            ..Default::default()
        }
    }
}

/// Current wall-clock time in unix millis.
pub(crate) fn now_millis() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| i64::try_from(d.as_millis()).unwrap_or(i64::MAX))
        .unwrap_or_default()
}

// ============================================================================
// Tests
// ============================================================================
