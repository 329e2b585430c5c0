//! Transport establishment.
//!
//! A [`Connector`] opens one WebSocket and hands back its two halves as a
//! [`Link`]. The connection manager never touches sockets directly, so tests
//! can substitute an in-memory transport.

// ============================================================================
// Imports
// ============================================================================

use std::pin::Pin;
use std::result::Result as StdResult;

use async_trait::async_trait;
use futures_util::{Sink, Stream, StreamExt};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio_tungstenite::WebSocketStream;
use tokio_tungstenite::tungstenite::{Error as WsError, Message};
use tracing::debug;
use url::Url;

use crate::error::Result;

// ============================================================================
// Types
// ============================================================================

/// Outbound half of a transport.
pub type LinkSink = Pin<Box<dyn Sink<Message, Error = WsError> + Send>>;

/// Inbound half of a transport.
pub type LinkSource = Pin<Box<dyn Stream<Item = StdResult<Message, WsError>> + Send>>;

// ============================================================================
// Link
// ============================================================================

/// An open transport, split into write and read halves.
pub struct Link {
    pub sink: LinkSink,
    pub source: LinkSource,
}

impl Link {
    /// Wraps arbitrary halves.
    pub fn new<S, R>(sink: S, source: R) -> Self
    where
        S: Sink<Message, Error = WsError> + Send + 'static,
        R: Stream<Item = StdResult<Message, WsError>> + Send + 'static,
    {
        Self {
            sink: Box::pin(sink),
            source: Box::pin(source),
        }
    }

    /// Splits an established WebSocket over any byte stream.
    pub fn from_stream<S>(stream: WebSocketStream<S>) -> Self
    where
        S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
    {
        let (sink, source) = stream.split();
        Self::new(sink, source)
    }
}

impl std::fmt::Debug for Link {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Link").finish_non_exhaustive()
    }
}

// ============================================================================
// Connector
// ============================================================================

/// Opens transports to the telemetry endpoint.
#[async_trait]
pub trait Connector: Send + Sync + 'static {
    /// Connects to `url`. Any error is treated as a transport close.
    async fn connect(&self, url: &Url) -> Result<Link>;
}

/// Default connector over TCP (and TLS with the `rustls` feature).
#[derive(Debug, Clone, Copy, Default)]
pub struct TungsteniteConnector;

#[async_trait]
impl Connector for TungsteniteConnector {
    async fn connect(&self, url: &Url) -> Result<Link> {
        let (stream, response) = tokio_tungstenite::connect_async(url.as_str()).await?;
        debug!(status = %response.status(), "WebSocket handshake completed");
        Ok(Link::from_stream(stream))
    }
}
