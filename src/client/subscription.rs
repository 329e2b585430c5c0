//! Reactive subscription handle.
//!
//! A [`TelemetrySubscription`] owns one server subscription and exposes the
//! accumulated [`TelemetryData`] plus the connection flag through
//! `tokio::sync::watch`. Changing its [`SubscriptionParams`] re-subscribes
//! only when the identity of the subscription changes; dropping it
//! unsubscribes.

// ============================================================================
// Imports
// ============================================================================

use std::sync::Arc;

use tokio::sync::watch;
use tracing::debug;

use crate::error::{Error, Result};
use crate::identifiers::CommandId;
use crate::protocol::EntityRef;
use crate::subscription::TelemetryData;
use crate::transport::ConnectionStatus;

use super::core::{SubscriptionKind, TelemetryClient};

// ============================================================================
// SubscriptionParams
// ============================================================================

/// Identity of a reactive subscription.
///
/// Two equal parameter sets describe the same server subscription.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SubscriptionParams {
    pub entity: EntityRef,
    pub keys: Vec<String>,
    pub kind: SubscriptionKind,
    /// When `false` the handle holds no server subscription.
    pub enabled: bool,
}

impl SubscriptionParams {
    #[must_use]
    pub fn new<I, K>(entity: EntityRef, keys: I, kind: SubscriptionKind) -> Self
    where
        I: IntoIterator<Item = K>,
        K: Into<String>,
    {
        Self {
            entity,
            keys: keys.into_iter().map(Into::into).collect(),
            kind,
            enabled: true,
        }
    }

    #[inline]
    #[must_use]
    pub fn enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }
}

// ============================================================================
// TelemetrySubscription
// ============================================================================

/// Live view of one subscription's data and the connection state.
///
/// Created by [`TelemetryClient::watch`]. Must be dropped within a Tokio
/// runtime since dropping sends the cancel command.
///
/// # Example
///
/// ```no_run
/// use thingsboard_telemetry::{EntityRef, TelemetryClient};
///
/// # async fn example(client: TelemetryClient) -> thingsboard_telemetry::Result<()> {
/// let params = client.timeseries(EntityRef::device("abc"), ["temperature"]);
/// let mut sub = client.watch(params);
///
/// loop {
///     sub.changed().await?;
///     if let Some(point) = sub.data().latest("temperature") {
///         println!("{} @ {}", point.value, point.ts);
///     }
/// }
/// # }
/// ```
pub struct TelemetrySubscription {
    client: TelemetryClient,
    params: SubscriptionParams,
    handle: Option<CommandId>,
    data_tx: Arc<watch::Sender<TelemetryData>>,
    data_rx: watch::Receiver<TelemetryData>,
    status_rx: watch::Receiver<ConnectionStatus>,
}

impl TelemetrySubscription {
    pub(crate) fn open(client: TelemetryClient, params: SubscriptionParams) -> Self {
        let retention = client.options().retention;
        let (data_tx, data_rx) = watch::channel(TelemetryData::with_retention(retention));
        let status_rx = client.watch_status();

        let mut subscription = Self {
            client,
            params,
            handle: None,
            data_tx: Arc::new(data_tx),
            data_rx,
            status_rx,
        };
        subscription.acquire();
        subscription
    }

    /// Applies new parameters.
    ///
    /// Equal parameters are a no-op. Otherwise the old subscription is
    /// cancelled, the buffers are cleared and a new one is opened if enabled.
    /// Returns `true` if anything changed.
    pub fn reconcile(&mut self, params: SubscriptionParams) -> bool {
        if params == self.params {
            return false;
        }

        self.release();
        self.data_tx.send_if_modified(|data| {
            if data.is_empty() {
                return false;
            }
            data.clear();
            true
        });

        self.params = params;
        self.acquire();
        true
    }

    /// Cancels the server subscription now; later calls are no-ops.
    ///
    /// Buffered data stays readable.
    pub fn unsubscribe(&mut self) {
        self.release();
    }

    /// Waits until the data or the connection flag changes.
    ///
    /// # Errors
    ///
    /// [`Error::ConnectionClosed`] if the client is gone.
    pub async fn changed(&mut self) -> Result<()> {
        tokio::select! {
            changed = self.data_rx.changed() => changed.map_err(|_| Error::ConnectionClosed),
            changed = self.status_rx.changed() => changed.map_err(|_| Error::ConnectionClosed),
        }
    }

    /// Buffered samples. Holds a read lock while the guard is alive.
    #[inline]
    pub fn data(&self) -> watch::Ref<'_, TelemetryData> {
        self.data_rx.borrow()
    }

    /// Copy of the buffered samples.
    #[must_use]
    pub fn snapshot(&self) -> TelemetryData {
        self.data_rx.borrow().clone()
    }

    #[inline]
    #[must_use]
    pub fn connected(&self) -> bool {
        self.status_rx.borrow().is_connected()
    }

    #[inline]
    #[must_use]
    pub fn reconnect_exhausted(&self) -> bool {
        self.status_rx.borrow().reconnect_exhausted
    }

    /// Server-side handle, `None` while disabled or not addressable.
    #[inline]
    #[must_use]
    pub fn handle(&self) -> Option<CommandId> {
        self.handle
    }

    #[inline]
    #[must_use]
    pub fn params(&self) -> &SubscriptionParams {
        &self.params
    }

    fn acquire(&mut self) {
        if !self.params.enabled {
            return;
        }

        // Only the sender is captured; the registry must not own the client.
        let data_tx = Arc::clone(&self.data_tx);
        self.handle = self.client.subscribe(
            self.params.kind,
            &self.params.entity,
            &self.params.keys,
            move |update| {
                data_tx.send_if_modified(|data| {
                    if update.data.is_empty() {
                        return false;
                    }
                    data.merge(&update.data);
                    true
                });
            },
        );
    }

    fn release(&mut self) {
        if let Some(handle) = self.handle.take() {
            debug!(%handle, entity = %self.params.entity, "Releasing subscription");
            self.client.unsubscribe(handle);
        }
    }
}

impl Drop for TelemetrySubscription {
    fn drop(&mut self) {
        self.release();
    }
}

impl std::fmt::Debug for TelemetrySubscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TelemetrySubscription")
            .field("params", &self.params)
            .field("handle", &self.handle)
            .field("connected", &self.connected())
            .finish_non_exhaustive()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use std::time::Duration;

    use serde_json::json;
    use tokio::time::timeout;

    use crate::auth::TokenStore;
    use crate::transport::testing::{MockConnector, ServerEnd, recv_json, send_json};

    fn client_with(connector: Arc<MockConnector>, tokens: TokenStore) -> TelemetryClient {
        TelemetryClient::builder()
            .origin("http://localhost:8080")
            .token_provider(tokens)
            .shared_connector(connector)
            .retention(3)
            .build()
            .unwrap()
    }

    async fn wait_for_data(sub: &mut TelemetrySubscription) {
        timeout(Duration::from_secs(5), async {
            while sub.data().is_empty() {
                sub.changed().await.unwrap();
            }
        })
        .await
        .unwrap();
    }

    async fn push(server: &mut ServerEnd, handle: CommandId, points: serde_json::Value) {
        let update = json!({
            "subscriptionId": handle.as_u32(),
            "errorCode": 0,
            "data": { "temperature": points },
        });
        send_json(server, update).await;
    }

    #[tokio::test]
    async fn test_watch_merges_updates_into_data() {
        let (connector, mut servers) = MockConnector::new();
        let client = client_with(connector, TokenStore::with_token("jwt"));

        let mut sub = client.watch(client.timeseries(EntityRef::device("abc"), ["temperature"]));
        let handle = sub.handle().unwrap();

        let mut server = servers.recv().await.unwrap();
        recv_json(&mut server).await;
        push(&mut server, handle, json!([[3, "c"], [1, "a"]])).await;
        wait_for_data(&mut sub).await;

        assert!(sub.connected());
        let data = sub.snapshot();
        let buffer = data.get("temperature").unwrap();
        let values: Vec<_> = buffer.iter().map(|p| p.ts).collect();
        assert_eq!(values, vec![1, 3]);
    }

    #[tokio::test]
    async fn test_data_is_capped_by_retention() {
        let (connector, mut servers) = MockConnector::new();
        let client = client_with(connector, TokenStore::with_token("jwt"));

        let mut sub = client.watch(client.timeseries(EntityRef::device("abc"), ["temperature"]));
        let handle = sub.handle().unwrap();

        let mut server = servers.recv().await.unwrap();
        recv_json(&mut server).await;
        let points = json!([[1, "1"], [2, "2"], [3, "3"], [4, "4"], [5, "5"]]);
        push(&mut server, handle, points).await;
        wait_for_data(&mut sub).await;

        let data = sub.snapshot();
        let buffer = data.get("temperature").unwrap();
        let ts: Vec<_> = buffer.iter().map(|p| p.ts).collect();
        assert_eq!(ts, vec![3, 4, 5]);
    }

    #[tokio::test]
    async fn test_drop_sends_unsubscribe() {
        let (connector, mut servers) = MockConnector::new();
        let client = client_with(connector, TokenStore::with_token("jwt"));

        let sub = client.watch(client.timeseries(EntityRef::device("abc"), ["temperature"]));
        let handle = sub.handle().unwrap();

        let mut server = servers.recv().await.unwrap();
        recv_json(&mut server).await;

        drop(sub);
        let frame = recv_json(&mut server).await;
        assert_eq!(frame["unsubscribeCmd"][0]["cmdId"], json!(handle.as_u32()));
        assert!(client.manager().registry().is_empty());
    }

    #[tokio::test]
    async fn test_repeated_mount_does_not_leak_entries() {
        let (connector, _servers) = MockConnector::new();
        let client = client_with(connector, TokenStore::with_token("jwt"));

        for _ in 0..20 {
            let sub = client.watch(client.timeseries(EntityRef::device("abc"), ["temperature"]));
            assert_eq!(client.manager().registry().len(), 1);
            drop(sub);
        }

        assert!(client.manager().registry().is_empty());
    }

    #[tokio::test]
    async fn test_reconcile_same_params_keeps_subscription() {
        let (connector, _servers) = MockConnector::new();
        let client = client_with(connector, TokenStore::with_token("jwt"));

        let params = client.timeseries(EntityRef::device("abc"), ["temperature"]);
        let mut sub = client.watch(params.clone());
        let handle = sub.handle();

        assert!(!sub.reconcile(params));
        assert_eq!(sub.handle(), handle);
        assert_eq!(client.manager().pending_len(), 1);
    }

    #[tokio::test]
    async fn test_reconcile_new_entity_resubscribes_and_clears() {
        let (connector, mut servers) = MockConnector::new();
        let client = client_with(connector, TokenStore::with_token("jwt"));

        let mut sub = client.watch(client.timeseries(EntityRef::device("abc"), ["temperature"]));
        let old = sub.handle().unwrap();

        let mut server = servers.recv().await.unwrap();
        recv_json(&mut server).await;
        push(&mut server, old, json!([[1, "20"]])).await;
        wait_for_data(&mut sub).await;

        let moved = client.timeseries(EntityRef::device("def"), ["temperature"]);
        assert!(sub.reconcile(moved));
        let new = sub.handle().unwrap();
        assert_ne!(old, new);
        assert!(sub.data().is_empty());

        let frame = recv_json(&mut server).await;
        assert_eq!(frame["unsubscribeCmd"][0]["cmdId"], json!(old.as_u32()));
        let frame = recv_json(&mut server).await;
        assert_eq!(frame["tsSubCmds"][0]["entityId"], json!("def"));
        assert_eq!(client.manager().registry().len(), 1);
    }

    #[tokio::test]
    async fn test_disabled_params_hold_no_subscription() {
        let (connector, _servers) = MockConnector::new();
        let client = client_with(Arc::clone(&connector), TokenStore::with_token("jwt"));

        let params = client
            .timeseries(EntityRef::device("abc"), ["temperature"])
            .enabled(false);
        let mut sub = client.watch(params.clone());
        assert!(sub.handle().is_none());
        assert!(client.manager().registry().is_empty());

        assert!(sub.reconcile(params.enabled(true)));
        assert!(sub.handle().is_some());
        assert_eq!(client.manager().registry().len(), 1);
    }

    #[tokio::test]
    async fn test_without_token_nothing_is_queued() {
        let (connector, _servers) = MockConnector::new();
        let client = client_with(Arc::clone(&connector), TokenStore::new());

        let sub = client.watch(client.timeseries(EntityRef::device("abc"), ["temperature"]));
        tokio::task::yield_now().await;

        assert!(!sub.connected());
        assert_eq!(client.manager().pending_len(), 0);
        assert_eq!(connector.attempts(), 0);
    }
}
