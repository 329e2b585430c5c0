//! Inbound message decoding.
//!
//! Frames from the server are decoded into an [`InboundMessage`] before any
//! routing happens. The shape is validated up front: anything that is not a
//! JSON object, or whose fields have the wrong types, is rejected with an
//! error that the connection logs and drops.
//!
//! # Format
//!
//! ```json
//! {
//!   "subscriptionId": 3,
//!   "errorCode": 0,
//!   "errorMsg": null,
//!   "data": { "temperature": [[1700000000000, "21.5"]] }
//! }
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::collections::BTreeMap;

use serde::Deserialize;
use serde_json::Value;

use crate::error::{Error, Result};
use crate::identifiers::CommandId;

// ============================================================================
// TsPoint
// ============================================================================

/// One `(timestamp, value)` sample.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TsPoint {
    /// Unix millis.
    pub ts: i64,
    pub value: String,
}

impl TsPoint {
    #[inline]
    #[must_use]
    pub fn new(ts: i64, value: impl Into<String>) -> Self {
        Self {
            ts,
            value: value.into(),
        }
    }
}

/// Per-key batches carried by one update, keyed by telemetry/attribute name.
pub type KeyedPoints = BTreeMap<String, Vec<TsPoint>>;

// ============================================================================
// SubscriptionUpdate
// ============================================================================

/// A data message addressed to one subscription.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubscriptionUpdate {
    /// The `cmdId` of the subscription this update answers.
    pub subscription_id: CommandId,
    /// Server error code, 0 on success.
    pub error_code: i32,
    pub error_msg: Option<String>,
    pub data: KeyedPoints,
}

impl SubscriptionUpdate {
    /// Returns `true` if the server reported an error for this subscription.
    #[inline]
    #[must_use]
    pub fn is_error(&self) -> bool {
        self.error_code != 0
    }
}

// ============================================================================
// InboundMessage
// ============================================================================

/// Decoded inbound frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InboundMessage {
    /// Data or error for a subscription.
    Update(SubscriptionUpdate),
    /// Well-formed object without a `subscriptionId`; nothing to route.
    Unaddressed,
}

impl InboundMessage {
    /// Decodes one text frame.
    ///
    /// # Errors
    ///
    /// - [`Error::Json`] if the frame is not JSON
    /// - [`Error::Protocol`] if the JSON does not have the update shape
    pub fn decode(text: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(text)?;
        if !value.is_object() {
            return Err(Error::protocol("inbound frame is not a JSON object"));
        }

        let wire: WireUpdate = serde_json::from_value(value)
            .map_err(|e| Error::protocol(format!("unexpected update shape: {e}")))?;

        let Some(subscription_id) = wire.subscription_id else {
            return Ok(Self::Unaddressed);
        };

        let data = wire
            .data
            .unwrap_or_default()
            .into_iter()
            .map(|(key, points)| {
                let points = points.into_iter().map(TsPoint::from).collect();
                (key, points)
            })
            .collect();

        Ok(Self::Update(SubscriptionUpdate {
            subscription_id: CommandId::new(subscription_id),
            error_code: wire.error_code.unwrap_or_default(),
            error_msg: wire.error_msg,
            data,
        }))
    }
}

// ============================================================================
// Wire Types
// ============================================================================

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireUpdate {
    subscription_id: Option<u32>,
    error_code: Option<i32>,
    error_msg: Option<String>,
    data: Option<BTreeMap<String, Vec<WirePoint>>>,
}

/// `[ts, value]` pair. Values are usually strings; anything else is kept as its JSON text.
#[derive(Deserialize)]
struct WirePoint(i64, Value);

impl From<WirePoint> for TsPoint {
    fn from(WirePoint(ts, value): WirePoint) -> Self {
        let value = match value {
            Value::String(s) => s,
            other => other.to_string(),
        };
        Self { ts, value }
    }
}

// ============================================================================
// Tests
// ============================================================================
