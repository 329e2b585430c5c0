//! Builder pattern for client configuration.
//!
//! Provides a fluent API for configuring and creating [`TelemetryClient`]
//! instances.
//!
//! # Example
//!
//! ```no_run
//! use thingsboard_telemetry::{TelemetryClient, TokenStore};
//!
//! # fn example() -> thingsboard_telemetry::Result<()> {
//! let tokens = TokenStore::with_token("eyJhbGciOi...");
//! let client = TelemetryClient::builder()
//!     .origin("https://iot.example.com")
//!     .token_provider(tokens)
//!     .build()?;
//! # Ok(())
//! # }
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::sync::Arc;
use std::time::Duration;

use url::Url;

use crate::auth::TokenProvider;
use crate::error::{Error, Result};
use crate::transport::{Connector, TungsteniteConnector, parse_origin};

use super::core::TelemetryClient;
use super::options::ClientOptions;

// ============================================================================
// TelemetryClientBuilder
// ============================================================================

/// Builder for configuring a [`TelemetryClient`] instance.
///
/// Use [`TelemetryClient::builder()`] to create a new builder.
#[derive(Default, Clone)]
pub struct TelemetryClientBuilder {
    /// Page origin the endpoint is derived from.
    origin: Option<String>,
    /// Bearer token source.
    tokens: Option<Arc<dyn TokenProvider>>,
    /// Transport factory; TCP/TLS when unset.
    connector: Option<Arc<dyn Connector>>,
    options: ClientOptions,
}

// ============================================================================
// TelemetryClientBuilder Implementation
// ============================================================================

impl TelemetryClientBuilder {
    /// Creates a new builder with no configuration.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the origin, e.g. `https://iot.example.com:8080`.
    ///
    /// `https` origins connect over `wss`, `http` over `ws`.
    #[inline]
    #[must_use]
    pub fn origin(mut self, origin: impl Into<String>) -> Self {
        self.origin = Some(origin.into());
        self
    }

    /// Sets the credential source.
    #[inline]
    #[must_use]
    pub fn token_provider(mut self, provider: impl TokenProvider) -> Self {
        self.tokens = Some(Arc::new(provider));
        self
    }

    /// Replaces the transport factory.
    #[inline]
    #[must_use]
    pub fn connector(mut self, connector: impl Connector) -> Self {
        self.connector = Some(Arc::new(connector));
        self
    }

    /// Same as [`Self::connector`] for an already shared connector.
    #[inline]
    #[must_use]
    pub fn shared_connector(mut self, connector: Arc<dyn Connector>) -> Self {
        self.connector = Some(connector);
        self
    }

    /// Replaces all options at once.
    #[inline]
    #[must_use]
    pub fn options(mut self, options: ClientOptions) -> Self {
        self.options = options;
        self
    }

    #[inline]
    #[must_use]
    pub fn reconnect_base_delay(mut self, delay: Duration) -> Self {
        self.options = self.options.with_reconnect_base_delay(delay);
        self
    }

    #[inline]
    #[must_use]
    pub fn max_reconnect_attempts(mut self, attempts: u32) -> Self {
        self.options = self.options.with_max_reconnect_attempts(attempts);
        self
    }

    #[inline]
    #[must_use]
    pub fn retention(mut self, points: usize) -> Self {
        self.options = self.options.with_retention(points);
        self
    }

    /// Builds the client with validation.
    ///
    /// Nothing connects until the first subscription or `connect()`.
    ///
    /// # Errors
    ///
    /// - [`Error::Config`] if origin or token provider is not set
    /// - [`Error::InvalidUrl`] / [`Error::Config`] if the origin is invalid
    /// - [`Error::Config`] if retention or reconnect delay is zero
    pub fn build(self) -> Result<TelemetryClient> {
        let origin = self.validate_origin()?;
        self.validate_options()?;

        let tokens = self.tokens.ok_or_else(|| {
            Error::config(
                "Token provider is required. Use .token_provider() to set it.\n\
                 Example: TelemetryClient::builder().token_provider(TokenStore::new())",
            )
        })?;
        let connector = self
            .connector
            .unwrap_or_else(|| Arc::new(TungsteniteConnector));

        let client = TelemetryClient::new(origin, tokens, connector, self.options);
        Ok(client)
    }
}

// ============================================================================
// Validation
// ============================================================================

impl TelemetryClientBuilder {
    /// Validates the origin configuration.
    fn validate_origin(&self) -> Result<Url> {
        let origin = self.origin.as_deref().ok_or_else(|| {
            Error::config(
                "Origin is required. Use .origin() to set it.\n\
                 Example: TelemetryClient::builder().origin(\"https://iot.example.com\")",
            )
        })?;

        parse_origin(origin)
    }

    /// Validates option values.
    fn validate_options(&self) -> Result<()> {
        if self.options.retention == 0 {
            return Err(Error::config(
                "Retention must keep at least one point per key",
            ));
        }
        if self.options.reconnect.base_delay.is_zero() {
            return Err(Error::config(
                "Reconnect base delay must be greater than zero",
            ));
        }
        Ok(())
    }
}

impl std::fmt::Debug for TelemetryClientBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TelemetryClientBuilder")
            .field("origin", &self.origin)
            .field("tokens", &self.tokens.is_some())
            .field("connector", &self.connector.is_some())
            .field("options", &self.options)
            .finish()
    }
}

// ============================================================================
// Tests
// ============================================================================
