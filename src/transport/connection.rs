//! Connection manager and event loop.
//!
//! This module owns the single WebSocket to the telemetry endpoint: its
//! lifecycle, reconnection with exponential backoff, the queue of commands
//! issued while the transport was not open, and routing of inbound updates
//! to the subscription registry.
//!
//! # State Machine
//!
//! ```text
//!                connect() + token
//! Disconnected ───────────────────► Connecting
//!      ▲                                │ open
//!      │ close (schedule reconnect)     ▼
//!      └──────────────────────────── Connected
//! ```
//!
//! - On open: reset the attempt counter, publish `connected`, flush the
//!   pending queue in FIFO order.
//! - On close: publish `disconnected`, schedule a reconnect unless the
//!   attempt budget is spent.
//! - Transport errors cause no transition; the close that follows does.
//!
//! # Event Loop
//!
//! Each connection attempt spawns a session task that owns the transport
//! halves and selects over:
//!
//! - Incoming frames (decoded, then dispatched to the registry)
//! - Outgoing frames queued by [`ConnectionManager::send`]
//!
//! Sessions are tagged with an epoch. [`ConnectionManager::disconnect`] bumps
//! the epoch, which detaches the running session from the close path so it
//! cannot trigger a reconnect.

// ============================================================================
// Imports
// ============================================================================

use std::collections::VecDeque;
use std::sync::{Arc, Weak};

use futures_util::{SinkExt, StreamExt};
use parking_lot::Mutex;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::sleep;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, info, trace, warn};
use url::Url;

use crate::auth::TokenProvider;
use crate::protocol::{CommandEnvelope, InboundMessage};
use crate::subscription::SubscriptionRegistry;

use super::backoff::ReconnectPolicy;
use super::connector::{Connector, Link};
use super::endpoint::telemetry_url;

// ============================================================================
// Types
// ============================================================================

/// Connection status callback, called with `true` on open and `false` on close.
pub type StatusHandler = Box<dyn Fn(bool) + Send + Sync>;

// ============================================================================
// ConnectionState
// ============================================================================

/// Lifecycle state of the transport.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum ConnectionState {
    #[default]
    Disconnected,
    Connecting,
    Connected,
}

/// Snapshot published to status watchers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ConnectionStatus {
    pub state: ConnectionState,
    /// Automatic reconnection gave up; only an explicit `connect()` retries.
    pub reconnect_exhausted: bool,
}

impl ConnectionStatus {
    #[inline]
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.state == ConnectionState::Connected
    }
}

// ============================================================================
// LinkState
// ============================================================================

/// Mutable connection state, guarded by one lock.
#[derive(Default)]
struct LinkState {
    state: ConnectionState,
    /// Identifies the current session; bumped on every attempt and on disconnect.
    epoch: u64,
    /// Reconnection attempts since the last successful open.
    attempts: u32,
    exhausted: bool,
    /// Frames for the open session, present only while connected.
    outbound: Option<mpsc::UnboundedSender<String>>,
    pending: VecDeque<CommandEnvelope>,
    reconnect_timer: Option<JoinHandle<()>>,
}

impl LinkState {
    fn status(&self) -> ConnectionStatus {
        ConnectionStatus {
            state: self.state,
            reconnect_exhausted: self.exhausted,
        }
    }

    /// Writes `command` to the open session, handing it back if there is none.
    fn transmit(&mut self, command: CommandEnvelope) -> Option<CommandEnvelope> {
        if self.state != ConnectionState::Connected {
            return Some(command);
        }
        let Some(outbound) = &self.outbound else {
            return Some(command);
        };

        let json = match command.to_json() {
            Ok(json) => json,
            Err(e) => {
                warn!(error = %e, "Failed to serialize command, dropping");
                return None;
            }
        };

        match outbound.send(json) {
            Ok(()) => {
                trace!(cmd_ids = ?command.cmd_ids(), "Command sent");
                None
            }
            // Session ended but its close has not been processed yet.
            Err(_) => Some(command),
        }
    }
}

// ============================================================================
// Shared
// ============================================================================

struct Shared {
    origin: Url,
    policy: ReconnectPolicy,
    tokens: Arc<dyn TokenProvider>,
    connector: Arc<dyn Connector>,
    registry: SubscriptionRegistry,
    link: Mutex<LinkState>,
    status_tx: watch::Sender<ConnectionStatus>,
    status_handler: Mutex<Option<Arc<StatusHandler>>>,
}

impl Drop for Shared {
    fn drop(&mut self) {
        if let Some(timer) = self.link.get_mut().reconnect_timer.take() {
            timer.abort();
        }
    }
}

// ============================================================================
// ConnectionManager
// ============================================================================

/// Owner of the single multiplexed WebSocket.
///
/// Cheap to clone; clones share the same connection. Dropping the last clone
/// cancels any scheduled reconnect and closes the transport.
///
/// # Runtime
///
/// [`connect`](Self::connect) and [`send`](Self::send) spawn Tokio tasks and
/// must be called from within a Tokio runtime.
#[derive(Clone)]
pub struct ConnectionManager {
    shared: Arc<Shared>,
}

impl ConnectionManager {
    /// Creates a disconnected manager. Nothing is spawned until `connect()`.
    pub fn new(
        origin: Url,
        tokens: Arc<dyn TokenProvider>,
        connector: Arc<dyn Connector>,
        policy: ReconnectPolicy,
    ) -> Self {
        let (status_tx, _) = watch::channel(ConnectionStatus::default());

        Self {
            shared: Arc::new(Shared {
                origin,
                policy,
                tokens,
                connector,
                registry: SubscriptionRegistry::new(),
                link: Mutex::new(LinkState::default()),
                status_tx,
                status_handler: Mutex::new(None),
            }),
        }
    }

    /// Starts connecting if no transport is open or opening.
    ///
    /// No-op without a token. Resets the attempt budget if automatic
    /// reconnection had given up.
    pub fn connect(&self) {
        {
            let mut link = self.shared.link.lock();
            if link.exhausted {
                debug!("Explicit connect, resetting reconnect budget");
                link.exhausted = false;
                link.attempts = 0;
                self.shared.publish(&link);
            }
        }
        Shared::start(&self.shared);
    }

    /// Sends `command` now if connected, otherwise queues it and connects.
    ///
    /// Without a token the command is dropped rather than queued.
    pub fn send(&self, command: CommandEnvelope) {
        let Some(command) = self.shared.link.lock().transmit(command) else {
            return;
        };

        if self.shared.tokens.token().is_none() {
            debug!(cmd_ids = ?command.cmd_ids(), "No token available, dropping command");
            return;
        }

        {
            let mut link = self.shared.link.lock();
            // The session may have opened while the token was read.
            let Some(command) = link.transmit(command) else {
                return;
            };
            let pending = link.pending.len() + 1;
            trace!(cmd_ids = ?command.cmd_ids(), pending, "Command queued");
            link.pending.push_back(command);
        }

        Shared::start(&self.shared);
    }

    /// Tears the connection down for good.
    ///
    /// Cancels a scheduled reconnect, drops every subscription and queued
    /// command, and closes the transport without entering the reconnect path.
    /// The status handler is not called.
    pub fn disconnect(&self) {
        {
            let mut link = self.shared.link.lock();
            if let Some(timer) = link.reconnect_timer.take() {
                timer.abort();
            }
            link.epoch += 1;
            link.outbound = None;
            link.pending.clear();
            link.state = ConnectionState::Disconnected;
            link.attempts = 0;
            link.exhausted = false;
            self.shared.publish(&link);
        }
        self.shared.registry.clear();
        debug!("Disconnected");
    }

    /// Sets the status callback, replacing any previous one.
    pub fn set_status_handler(&self, handler: StatusHandler) {
        *self.shared.status_handler.lock() = Some(Arc::new(handler));
    }

    /// Removes the status callback.
    pub fn clear_status_handler(&self) {
        *self.shared.status_handler.lock() = None;
    }

    /// Watches status changes.
    #[must_use]
    pub fn watch_status(&self) -> watch::Receiver<ConnectionStatus> {
        self.shared.status_tx.subscribe()
    }

    /// Subscription routing table.
    #[inline]
    #[must_use]
    pub fn registry(&self) -> &SubscriptionRegistry {
        &self.shared.registry
    }

    #[inline]
    #[must_use]
    pub fn status(&self) -> ConnectionStatus {
        self.shared.link.lock().status()
    }

    #[inline]
    #[must_use]
    pub fn state(&self) -> ConnectionState {
        self.shared.link.lock().state
    }

    #[inline]
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.state() == ConnectionState::Connected
    }

    /// Returns `true` once automatic reconnection has given up.
    #[inline]
    #[must_use]
    pub fn is_exhausted(&self) -> bool {
        self.shared.link.lock().exhausted
    }

    /// Reconnection attempts since the last successful open.
    #[inline]
    #[must_use]
    pub fn reconnect_attempts(&self) -> u32 {
        self.shared.link.lock().attempts
    }

    /// Number of commands waiting for the transport to open.
    #[inline]
    #[must_use]
    pub fn pending_len(&self) -> usize {
        self.shared.link.lock().pending.len()
    }

    #[inline]
    #[must_use]
    pub fn policy(&self) -> ReconnectPolicy {
        self.shared.policy
    }
}

impl std::fmt::Debug for ConnectionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionManager")
            .field("origin", &self.shared.origin.as_str())
            .field("status", &self.status())
            .field("subscriptions", &self.shared.registry.len())
            .finish()
    }
}

// ============================================================================
// Shared - Lifecycle
// ============================================================================

impl Shared {
    /// Moves `Disconnected → Connecting` and spawns a session.
    fn start(this: &Arc<Self>) {
        if this.link.lock().state != ConnectionState::Disconnected {
            return;
        }

        let Some(token) = this.tokens.token() else {
            debug!("No token available, not connecting");
            return;
        };

        let url = match telemetry_url(&this.origin, &token) {
            Ok(url) => url,
            Err(e) => {
                warn!(error = %e, "Cannot build telemetry endpoint");
                return;
            }
        };

        let epoch = {
            let mut link = this.link.lock();
            if link.state != ConnectionState::Disconnected {
                return;
            }
            link.state = ConnectionState::Connecting;
            link.epoch += 1;
            this.publish(&link);
            debug!(epoch = link.epoch, attempt = link.attempts, "Connecting");
            link.epoch
        };

        tokio::spawn(run_session(Arc::downgrade(this), epoch, url));
    }

    /// Transport opened. Returns `false` if the session was detached meanwhile.
    fn handle_open(&self, epoch: u64, outbound: mpsc::UnboundedSender<String>) -> bool {
        {
            let mut link = self.link.lock();
            if link.epoch != epoch {
                return false;
            }

            link.state = ConnectionState::Connected;
            link.attempts = 0;
            link.exhausted = false;
            link.outbound = Some(outbound);
            if let Some(timer) = link.reconnect_timer.take() {
                timer.abort();
            }

            let queued: Vec<_> = link.pending.drain(..).collect();
            let flushed = queued.len();
            for command in queued {
                if let Some(command) = link.transmit(command) {
                    link.pending.push_back(command);
                }
            }

            info!(epoch, flushed, "Telemetry connection open");
            self.publish(&link);
        }

        self.notify(true);
        true
    }

    /// Transport closed. Schedules a reconnect while the budget lasts.
    fn handle_close(this: &Arc<Self>, epoch: u64) {
        {
            let mut link = this.link.lock();
            if link.epoch != epoch {
                return;
            }

            link.state = ConnectionState::Disconnected;
            link.outbound = None;

            match this.policy.delay_for(link.attempts) {
                Some(delay) => {
                    debug!(
                        attempt = link.attempts + 1,
                        delay_ms = delay.as_millis() as u64,
                        "Scheduling reconnect"
                    );
                    if let Some(previous) = link.reconnect_timer.take() {
                        previous.abort();
                    }
                    let timer = tokio::spawn(reconnect_after(Arc::downgrade(this), delay));
                    link.reconnect_timer = Some(timer);
                }
                None => {
                    warn!(
                        attempts = link.attempts,
                        "Reconnect attempts exhausted, staying disconnected"
                    );
                    link.exhausted = true;
                }
            }

            this.publish(&link);
        }

        this.notify(false);
    }

    /// Decodes a text frame and routes it. Malformed frames are dropped.
    fn handle_text(&self, text: &str) {
        match InboundMessage::decode(text) {
            Ok(InboundMessage::Update(update)) => {
                if update.is_error() {
                    warn!(
                        cmd_id = %update.subscription_id,
                        code = update.error_code,
                        message = update.error_msg.as_deref().unwrap_or_default(),
                        "Subscription error from server"
                    );
                }
                if !self.registry.dispatch(&update) {
                    trace!(cmd_id = %update.subscription_id, "No subscriber for update");
                }
            }
            Ok(InboundMessage::Unaddressed) => {
                trace!("Ignoring message without subscriptionId");
            }
            Err(e) => {
                warn!(error = %e, "Discarding malformed message");
            }
        }
    }

    fn publish(&self, link: &LinkState) {
        let status = link.status();
        self.status_tx.send_if_modified(|current| {
            if *current == status {
                return false;
            }
            *current = status;
            true
        });
    }

    fn notify(&self, connected: bool) {
        let handler = self.status_handler.lock().clone();
        if let Some(handler) = handler {
            handler(connected);
        }
    }
}

// ============================================================================
// Tasks
// ============================================================================

/// Waits out the backoff delay, then tries again.
async fn reconnect_after(shared: Weak<Shared>, delay: std::time::Duration) {
    sleep(delay).await;

    let Some(shared) = shared.upgrade() else {
        return;
    };
    {
        let mut link = shared.link.lock();
        link.reconnect_timer = None;
        link.attempts += 1;
    }
    Shared::start(&shared);
}

/// One connection attempt and, if it opens, its event loop.
async fn run_session(shared: Weak<Shared>, epoch: u64, url: Url) {
    let Some(connector) = shared.upgrade().map(|s| Arc::clone(&s.connector)) else {
        return;
    };

    let result = connector.connect(&url).await;

    let Some(strong) = shared.upgrade() else {
        return;
    };

    let Link {
        mut sink,
        mut source,
    } = match result {
        Ok(link) => link,
        Err(e) => {
            warn!(error = %e, "Connection attempt failed");
            Shared::handle_close(&strong, epoch);
            return;
        }
    };

    let (outbound_tx, mut outbound_rx) = mpsc::unbounded_channel();
    if !strong.handle_open(epoch, outbound_tx) {
        debug!(epoch, "Session detached before open, closing");
        let _ = sink.close().await;
        return;
    }
    drop(strong);

    loop {
        tokio::select! {
            // Incoming frames from the server
            message = source.next() => {
                match message {
                    Some(Ok(Message::Text(text))) => {
                        let Some(shared) = shared.upgrade() else {
                            break;
                        };
                        trace!(len = text.len(), "Frame received");
                        shared.handle_text(&text);
                    }

                    Some(Ok(Message::Close(_))) => {
                        debug!("WebSocket closed by server");
                        break;
                    }

                    Some(Err(e)) => {
                        // The close that follows drives recovery.
                        debug!(error = %e, "WebSocket error");
                        break;
                    }

                    None => {
                        debug!("WebSocket stream ended");
                        break;
                    }

                    // Ignore Binary, Ping, Pong
                    _ => {}
                }
            }

            // Frames queued by send()
            frame = outbound_rx.recv() => {
                match frame {
                    Some(json) => {
                        if let Err(e) = sink.send(Message::Text(json.into())).await {
                            debug!(error = %e, "Failed to write frame");
                            break;
                        }
                    }

                    None => {
                        debug!(epoch, "Session detached, closing transport");
                        let _ = sink.close().await;
                        return;
                    }
                }
            }
        }
    }

    if let Some(shared) = shared.upgrade() {
        Shared::handle_close(&shared, epoch);
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::time::Duration;

    use serde_json::json;

    use crate::identifiers::CommandId;
    use crate::protocol::{CommandEncoder, EntityRef};
    use crate::transport::endpoint::parse_origin;
    use crate::transport::testing::{MockConnector, recv_json, send_json};

    fn manager_with(connector: Arc<MockConnector>, token: Option<&str>) -> ConnectionManager {
        let token = token.map(str::to_string);
        ConnectionManager::new(
            parse_origin("http://localhost:8080").unwrap(),
            Arc::new(move || token.clone()),
            connector,
            ReconnectPolicy::default(),
        )
    }

    fn unsubscribe(id: u32) -> CommandEnvelope {
        CommandEncoder::new().unsubscribe(CommandId::new(id))
    }

    async fn wait_connected(manager: &ConnectionManager) {
        manager
            .watch_status()
            .wait_for(ConnectionStatus::is_connected)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_connect_without_token_is_noop() {
        let (connector, _servers) = MockConnector::new();
        let manager = manager_with(Arc::clone(&connector), None);

        manager.connect();
        tokio::task::yield_now().await;

        assert_eq!(manager.state(), ConnectionState::Disconnected);
        assert_eq!(connector.attempts(), 0);
    }

    #[tokio::test]
    async fn test_connect_url_carries_token() {
        let (connector, _servers) = MockConnector::new();
        let manager = manager_with(Arc::clone(&connector), Some("jwt"));

        manager.connect();
        wait_connected(&manager).await;

        let url = connector.last_url().unwrap();
        assert_eq!(
            url.as_str(),
            "ws://localhost:8080/api/ws/plugins/telemetry?token=jwt"
        );
    }

    #[tokio::test]
    async fn test_send_without_token_is_dropped() {
        let (connector, _servers) = MockConnector::new();
        let manager = manager_with(connector, None);

        manager.send(unsubscribe(1));
        assert_eq!(manager.pending_len(), 0);
        assert_eq!(manager.state(), ConnectionState::Disconnected);
    }

    #[tokio::test]
    async fn test_send_with_token_queues_and_connects() {
        let (connector, _servers) = MockConnector::new();
        let manager = manager_with(connector, Some("jwt"));

        manager.send(unsubscribe(1));
        assert_eq!(manager.pending_len(), 1);
        assert_eq!(manager.state(), ConnectionState::Connecting);
    }

    #[tokio::test]
    async fn test_pending_commands_flush_in_order_before_new_ones() {
        let (connector, mut servers) = MockConnector::new();
        let manager = manager_with(connector, Some("jwt"));

        manager.send(unsubscribe(1));
        manager.send(unsubscribe(2));
        manager.send(unsubscribe(3));

        let mut server = servers.recv().await.unwrap();
        wait_connected(&manager).await;
        assert_eq!(manager.pending_len(), 0);
        manager.send(unsubscribe(4));

        for expected in 1..=4 {
            let frame = recv_json(&mut server).await;
            assert_eq!(frame, json!({ "unsubscribeCmd": [{ "cmdId": expected }] }));
        }
    }

    #[tokio::test]
    async fn test_status_handler_sees_open_and_close() {
        let (connector, mut servers) = MockConnector::new();
        let manager = manager_with(connector, Some("jwt"));

        let opened = Arc::new(AtomicBool::new(false));
        let closes = Arc::new(AtomicUsize::new(0));
        let (o, c) = (Arc::clone(&opened), Arc::clone(&closes));
        manager.set_status_handler(Box::new(move |connected| {
            if connected {
                o.store(true, Ordering::SeqCst);
            } else {
                c.fetch_add(1, Ordering::SeqCst);
            }
        }));

        manager.connect();
        let server = servers.recv().await.unwrap();
        wait_connected(&manager).await;
        assert!(opened.load(Ordering::SeqCst));

        drop(server);
        manager
            .watch_status()
            .wait_for(|s| s.state == ConnectionState::Disconnected)
            .await
            .unwrap();
        assert_eq!(closes.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_reconnect_backoff_is_bounded() {
        let (connector, _servers) = MockConnector::refusing();
        let manager = manager_with(Arc::clone(&connector), Some("jwt"));

        manager.connect();
        manager
            .watch_status()
            .wait_for(|s| s.reconnect_exhausted)
            .await
            .unwrap();

        // One initial attempt plus five reconnects.
        assert_eq!(connector.attempts(), 6);
        let gaps: Vec<_> = connector
            .attempt_times()
            .windows(2)
            .map(|w| w[1] - w[0])
            .collect();
        assert_eq!(gaps, [2, 4, 8, 16, 32].map(Duration::from_secs).to_vec());

        sleep(Duration::from_secs(3600)).await;
        assert_eq!(connector.attempts(), 6);
        assert!(manager.is_exhausted());
        assert_eq!(manager.state(), ConnectionState::Disconnected);
    }

    #[tokio::test(start_paused = true)]
    async fn test_explicit_connect_after_exhaustion_resets_budget() {
        let (connector, _servers) = MockConnector::refusing();
        let manager = manager_with(Arc::clone(&connector), Some("jwt"));

        manager.connect();
        manager
            .watch_status()
            .wait_for(|s| s.reconnect_exhausted)
            .await
            .unwrap();

        manager.connect();
        assert!(!manager.is_exhausted());
        sleep(Duration::from_millis(1)).await;

        assert_eq!(connector.attempts(), 7);
        assert_eq!(manager.reconnect_attempts(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_reconnect_flushes_commands_queued_while_down() {
        let (connector, mut servers) = MockConnector::new();
        let manager = manager_with(connector, Some("jwt"));

        manager.connect();
        let first = servers.recv().await.unwrap();
        wait_connected(&manager).await;

        drop(first);
        manager
            .watch_status()
            .wait_for(|s| s.state != ConnectionState::Connected)
            .await
            .unwrap();

        manager.send(unsubscribe(9));
        let mut second = servers.recv().await.unwrap();
        assert_eq!(
            recv_json(&mut second).await,
            json!({ "unsubscribeCmd": [{ "cmdId": 9 }] })
        );
    }

    #[tokio::test]
    async fn test_malformed_frames_do_not_drop_connection() {
        let (connector, mut servers) = MockConnector::new();
        let manager = manager_with(connector, Some("jwt"));

        let (tx, mut rx) = mpsc::unbounded_channel();
        manager.registry().register(
            CommandId::new(1),
            Box::new(move |update| {
                let _ = tx.send(update.data["t"][0].value.clone());
            }),
        );

        manager.connect();
        let mut server = servers.recv().await.unwrap();
        wait_connected(&manager).await;

        server
            .send(Message::Text("{not json".to_string().into()))
            .await
            .unwrap();
        send_json(&mut server, json!([1, 2, 3])).await;
        send_json(
            &mut server,
            json!({ "subscriptionId": 1, "data": { "t": [[100, "ok"]] } }),
        )
        .await;

        assert_eq!(rx.recv().await.unwrap(), "ok");
        assert!(manager.is_connected());
    }

    #[tokio::test(start_paused = true)]
    async fn test_disconnect_clears_state_and_never_reconnects() {
        let (connector, mut servers) = MockConnector::new();
        let manager = manager_with(Arc::clone(&connector), Some("jwt"));

        manager.connect();
        let mut server = servers.recv().await.unwrap();
        wait_connected(&manager).await;

        manager
            .registry()
            .register(CommandId::new(1), Box::new(|_| {}));
        manager.disconnect();

        assert!(manager.registry().is_empty());
        assert_eq!(manager.pending_len(), 0);
        assert_eq!(manager.state(), ConnectionState::Disconnected);

        // Transport is closed from our side.
        while let Some(Ok(message)) = server.next().await {
            if message.is_close() {
                break;
            }
        }

        sleep(Duration::from_secs(3600)).await;
        assert_eq!(connector.attempts(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_disconnect_cancels_scheduled_reconnect() {
        let (connector, _servers) = MockConnector::refusing();
        let manager = manager_with(Arc::clone(&connector), Some("jwt"));

        manager.connect();
        manager
            .watch_status()
            .wait_for(|s| s.state == ConnectionState::Disconnected)
            .await
            .unwrap();
        assert_eq!(connector.attempts(), 1);

        // First retry is now 2s away.
        manager.disconnect();
        sleep(Duration::from_secs(3600)).await;

        assert_eq!(connector.attempts(), 1);
        assert_eq!(manager.state(), ConnectionState::Disconnected);
        assert_eq!(manager.reconnect_attempts(), 0);
        assert!(!manager.is_exhausted());
    }

    #[tokio::test]
    async fn test_subscribe_frame_reaches_server() {
        let (connector, mut servers) = MockConnector::new();
        let manager = manager_with(connector, Some("jwt"));
        let encoder = CommandEncoder::new();

        let (_, command) = encoder.telemetry_subscribe(
            &EntityRef::device("abc"),
            &["temperature".to_string()],
            Duration::from_secs(60),
        );
        manager.send(command);

        let mut server = servers.recv().await.unwrap();
        let frame = recv_json(&mut server).await;
        assert_eq!(frame["tsSubCmds"][0]["entityId"], "abc");
        assert_eq!(frame["tsSubCmds"][0]["cmdId"], 1);
    }
}
