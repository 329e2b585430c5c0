//! In-memory transport for tests.
//!
//! [`MockConnector`] pairs every accepted connection with a server-side
//! WebSocket over `tokio::io::duplex` and hands that half to the test.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use parking_lot::Mutex;
use serde_json::Value;
use tokio::io::{DuplexStream, duplex};
use tokio::sync::mpsc;
use tokio::time::Instant;
use tokio_tungstenite::WebSocketStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::tungstenite::protocol::Role;
use tracing_subscriber::EnvFilter;
use url::Url;

use crate::error::{Error, Result};

use super::connector::{Connector, Link};

/// Server side of a mock connection.
pub(crate) type ServerEnd = WebSocketStream<DuplexStream>;

pub(crate) struct MockConnector {
    refuse: AtomicBool,
    attempts: Mutex<Vec<Instant>>,
    urls: Mutex<Vec<Url>>,
    servers: mpsc::UnboundedSender<ServerEnd>,
}

impl MockConnector {
    /// Connector that accepts every attempt.
    pub(crate) fn new() -> (Arc<Self>, mpsc::UnboundedReceiver<ServerEnd>) {
        init_tracing();
        let (servers, rx) = mpsc::unbounded_channel();
        let connector = Arc::new(Self {
            refuse: AtomicBool::new(false),
            attempts: Mutex::new(Vec::new()),
            urls: Mutex::new(Vec::new()),
            servers,
        });
        (connector, rx)
    }

    /// Connector that refuses every attempt.
    pub(crate) fn refusing() -> (Arc<Self>, mpsc::UnboundedReceiver<ServerEnd>) {
        let (connector, rx) = Self::new();
        connector.set_refuse(true);
        (connector, rx)
    }

    pub(crate) fn set_refuse(&self, refuse: bool) {
        self.refuse.store(refuse, Ordering::SeqCst);
    }

    pub(crate) fn attempts(&self) -> usize {
        self.attempts.lock().len()
    }

    pub(crate) fn attempt_times(&self) -> Vec<Instant> {
        self.attempts.lock().clone()
    }

    pub(crate) fn last_url(&self) -> Option<Url> {
        self.urls.lock().last().cloned()
    }
}

#[async_trait]
impl Connector for MockConnector {
    async fn connect(&self, url: &Url) -> Result<Link> {
        self.attempts.lock().push(Instant::now());
        self.urls.lock().push(url.clone());

        if self.refuse.load(Ordering::SeqCst) {
            return Err(Error::connection("connection refused"));
        }

        let (client_io, server_io) = duplex(64 * 1024);
        let client = WebSocketStream::from_raw_socket(client_io, Role::Client, None).await;
        let server = WebSocketStream::from_raw_socket(server_io, Role::Server, None).await;

        self.servers
            .send(server)
            .map_err(|_| Error::connection("test dropped the server receiver"))?;

        Ok(Link::from_stream(client))
    }
}

/// Installs a test-writer subscriber filtered by `RUST_LOG`. Safe to call repeatedly.
pub(crate) fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Reads the next text frame as JSON.
pub(crate) async fn recv_json(server: &mut ServerEnd) -> Value {
    loop {
        match server.next().await {
            Some(Ok(Message::Text(text))) => {
                return serde_json::from_str(&text).expect("client sent invalid JSON");
            }
            Some(Ok(_)) => continue,
            other => panic!("expected a text frame, got {other:?}"),
        }
    }
}

/// Sends `value` as a text frame.
pub(crate) async fn send_json(server: &mut ServerEnd, value: Value) {
    server
        .send(Message::Text(value.to_string().into()))
        .await
        .expect("server send failed");
}
