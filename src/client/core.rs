//! Telemetry client: subscription adapter over one shared connection.
//!
//! [`TelemetryClient`] turns "watch these keys on that entity" into protocol
//! commands, registers the caller's callback and hands the command to the
//! [`ConnectionManager`], connecting on demand.
//!
//! # Example
//!
//! ```no_run
//! use thingsboard_telemetry::{EntityRef, SubscriptionKind, TelemetryClient, TokenStore};
//!
//! # async fn example() -> thingsboard_telemetry::Result<()> {
//! let client = TelemetryClient::builder()
//!     .origin("https://iot.example.com")
//!     .token_provider(TokenStore::with_token("eyJhbGciOi..."))
//!     .build()?;
//!
//! let keys = vec!["temperature".to_string()];
//! let handle = client.subscribe(
//!     SubscriptionKind::Timeseries { window: std::time::Duration::from_secs(60) },
//!     &EntityRef::device("abc"),
//!     &keys,
//!     |update| println!("{:?}", update.data),
//! );
//!
//! if let Some(handle) = handle {
//!     client.unsubscribe(handle);
//! }
//! # Ok(())
//! # }
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tracing::debug;
use url::Url;

use crate::auth::TokenProvider;
use crate::identifiers::CommandId;
use crate::protocol::{AttributeScope, CommandEncoder, EntityRef, SubscriptionUpdate};
use crate::transport::{ConnectionManager, ConnectionStatus, Connector};

use super::builder::TelemetryClientBuilder;
use super::options::ClientOptions;
use super::subscription::{SubscriptionParams, TelemetrySubscription};

// ============================================================================
// SubscriptionKind
// ============================================================================

/// What a subscription asks the server for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SubscriptionKind {
    /// Latest time-series values over a sliding window.
    Timeseries { window: Duration },
    /// Attribute values in one scope.
    Attributes { scope: AttributeScope },
}

// ============================================================================
// Types
// ============================================================================

/// Internal shared state for the client.
pub(crate) struct ClientInner {
    /// The one multiplexed connection.
    pub manager: ConnectionManager,

    /// Command id allocation and envelope building.
    pub encoder: CommandEncoder,

    pub options: ClientOptions,
}

// ============================================================================
// TelemetryClient
// ============================================================================

/// Subscription adapter over a shared telemetry connection.
///
/// Cheap to clone; clones share the connection, the id sequence and the
/// subscription registry.
///
/// Operations that may connect ([`subscribe`](Self::subscribe),
/// [`unsubscribe`](Self::unsubscribe), [`connect`](Self::connect)) must be
/// called from within a Tokio runtime.
#[derive(Clone)]
pub struct TelemetryClient {
    pub(crate) inner: Arc<ClientInner>,
}

// ============================================================================
// TelemetryClient - Display
// ============================================================================

impl fmt::Debug for TelemetryClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TelemetryClient")
            .field("manager", &self.inner.manager)
            .field("options", &self.inner.options)
            .finish_non_exhaustive()
    }
}

// ============================================================================
// TelemetryClient - Construction
// ============================================================================

impl TelemetryClient {
    /// Creates a configuration builder for the client.
    #[inline]
    #[must_use]
    pub fn builder() -> TelemetryClientBuilder {
        TelemetryClientBuilder::new()
    }

    pub(crate) fn new(
        origin: Url,
        tokens: Arc<dyn TokenProvider>,
        connector: Arc<dyn Connector>,
        options: ClientOptions,
    ) -> Self {
        let manager = ConnectionManager::new(origin, tokens, connector, options.reconnect);

        Self {
            inner: Arc::new(ClientInner {
                manager,
                encoder: CommandEncoder::new(),
                options,
            }),
        }
    }
}

// ============================================================================
// TelemetryClient - Subscriptions
// ============================================================================

impl TelemetryClient {
    /// Subscribes `callback` to updates for `keys` on `entity`.
    ///
    /// Connects if needed. Returns `None` without doing anything when the
    /// entity id or the key list is empty.
    pub fn subscribe<F>(
        &self,
        kind: SubscriptionKind,
        entity: &EntityRef,
        keys: &[String],
        callback: F,
    ) -> Option<CommandId>
    where
        F: Fn(&SubscriptionUpdate) + Send + Sync + 'static,
    {
        let Some(keys) = addressable_keys(entity, keys) else {
            debug!(%entity, "Nothing to subscribe to, skipping");
            return None;
        };

        let manager = &self.inner.manager;
        manager.connect();

        let encoder = &self.inner.encoder;
        let (cmd_id, envelope) = match kind {
            SubscriptionKind::Timeseries { window } => {
                encoder.telemetry_subscribe(entity, &keys, window)
            }
            SubscriptionKind::Attributes { scope } => {
                encoder.attribute_subscribe(entity, scope, &keys)
            }
        };

        // Registered before sending so the first update has somewhere to go.
        manager.registry().register(cmd_id, Box::new(callback));
        manager.send(envelope);

        debug!(%cmd_id, %entity, ?kind, "Subscribed");
        Some(cmd_id)
    }

    /// Requests stored samples over `[start_ts, end_ts]` (unix millis).
    ///
    /// The answer arrives through `callback` like any other update. The
    /// entry stays registered until [`unsubscribe`](Self::unsubscribe).
    /// Returns `None` for an empty entity id or key list, or a reversed range.
    pub fn subscribe_history<F>(
        &self,
        entity: &EntityRef,
        keys: &[String],
        start_ts: i64,
        end_ts: i64,
        callback: F,
    ) -> Option<CommandId>
    where
        F: Fn(&SubscriptionUpdate) + Send + Sync + 'static,
    {
        if end_ts < start_ts {
            debug!(%entity, start_ts, end_ts, "Reversed history range, skipping");
            return None;
        }
        let Some(keys) = addressable_keys(entity, keys) else {
            debug!(%entity, "Nothing to fetch, skipping");
            return None;
        };

        let manager = &self.inner.manager;
        manager.connect();

        let (cmd_id, envelope) = self.inner.encoder.history(entity, &keys, start_ts, end_ts);
        manager.registry().register(cmd_id, Box::new(callback));
        manager.send(envelope);

        debug!(%cmd_id, %entity, start_ts, end_ts, "History requested");
        Some(cmd_id)
    }

    /// Cancels a subscription.
    ///
    /// The callback is never invoked after this returns. Idempotent: the
    /// cancel command is sent only for handles that were still registered.
    pub fn unsubscribe(&self, cmd_id: CommandId) {
        let manager = &self.inner.manager;
        if !manager.registry().unregister(cmd_id) {
            return;
        }

        manager.send(self.inner.encoder.unsubscribe(cmd_id));
        debug!(%cmd_id, "Unsubscribed");
    }

    /// Opens a reactive subscription that buffers updates.
    ///
    /// See [`TelemetrySubscription`].
    #[must_use]
    pub fn watch(&self, params: SubscriptionParams) -> TelemetrySubscription {
        TelemetrySubscription::open(self.clone(), params)
    }

    /// Time-series parameters with the configured default window.
    #[must_use]
    pub fn timeseries<I, K>(&self, entity: EntityRef, keys: I) -> SubscriptionParams
    where
        I: IntoIterator<Item = K>,
        K: Into<String>,
    {
        SubscriptionParams::new(
            entity,
            keys,
            SubscriptionKind::Timeseries {
                window: self.inner.options.time_window,
            },
        )
    }

    /// Attribute parameters with the configured default scope.
    #[must_use]
    pub fn attributes<I, K>(&self, entity: EntityRef, keys: I) -> SubscriptionParams
    where
        I: IntoIterator<Item = K>,
        K: Into<String>,
    {
        SubscriptionParams::new(
            entity,
            keys,
            SubscriptionKind::Attributes {
                scope: self.inner.options.attribute_scope,
            },
        )
    }
}

// ============================================================================
// TelemetryClient - Connection
// ============================================================================

impl TelemetryClient {
    /// Connects now instead of on first subscription.
    #[inline]
    pub fn connect(&self) {
        self.inner.manager.connect();
    }

    /// Closes the connection and forgets every subscription.
    #[inline]
    pub fn disconnect(&self) {
        self.inner.manager.disconnect();
    }

    #[inline]
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.inner.manager.is_connected()
    }

    #[inline]
    #[must_use]
    pub fn status(&self) -> ConnectionStatus {
        self.inner.manager.status()
    }

    /// Watches connection status changes.
    #[inline]
    #[must_use]
    pub fn watch_status(&self) -> watch::Receiver<ConnectionStatus> {
        self.inner.manager.watch_status()
    }

    #[inline]
    #[must_use]
    pub fn options(&self) -> &ClientOptions {
        &self.inner.options
    }

    /// The underlying connection manager.
    #[inline]
    #[must_use]
    pub fn manager(&self) -> &ConnectionManager {
        &self.inner.manager
    }
}

/// Non-empty keys of a subscription, or `None` if there is nothing to address.
fn addressable_keys(entity: &EntityRef, keys: &[String]) -> Option<Vec<String>> {
    if entity.entity_id.is_empty() {
        return None;
    }

    let keys: Vec<String> = keys
        .iter()
        .filter(|key| !key.is_empty())
        .cloned()
        .collect();
    (!keys.is_empty()).then_some(keys)
}

// ============================================================================
// Tests
// ============================================================================
