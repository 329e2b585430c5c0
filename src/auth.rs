//! Credential source for the telemetry endpoint.
//!
//! The connection manager asks a [`TokenProvider`] for the current bearer
//! token every time it opens a connection. `None` means "cannot connect yet":
//! `connect()` becomes a no-op until a token shows up.

// ============================================================================
// Imports
// ============================================================================

use std::sync::Arc;

use parking_lot::RwLock;

// ============================================================================
// TokenProvider
// ============================================================================

/// Synchronous accessor for the current bearer token.
pub trait TokenProvider: Send + Sync + 'static {
    /// Returns the current token, or `None` when unauthenticated.
    fn token(&self) -> Option<String>;
}

impl<F> TokenProvider for F
where
    F: Fn() -> Option<String> + Send + Sync + 'static,
{
    #[inline]
    fn token(&self) -> Option<String> {
        self()
    }
}

// ============================================================================
// TokenStore
// ============================================================================

/// Shared, mutable token slot.
///
/// Login flows call [`TokenStore::set`], logout calls [`TokenStore::clear`];
/// clones share the same slot.
#[derive(Debug, Clone, Default)]
pub struct TokenStore {
    inner: Arc<RwLock<Option<String>>>,
}

impl TokenStore {
    /// Creates an empty store.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store holding `token`.
    #[inline]
    #[must_use]
    pub fn with_token(token: impl Into<String>) -> Self {
        let store = Self::new();
        store.set(token);
        store
    }

    /// Replaces the stored token.
    pub fn set(&self, token: impl Into<String>) {
        *self.inner.write() = Some(token.into());
    }

    /// Removes the stored token.
    pub fn clear(&self) {
        *self.inner.write() = None;
    }
}

impl TokenProvider for TokenStore {
    fn token(&self) -> Option<String> {
        self.inner.read().clone().filter(|token| !token.is_empty())
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_closure_provider() {
        let provider = || Some("abc".to_string());
        assert_eq!(provider.token().as_deref(), Some("abc"));
    }

    #[test]
    fn test_store_set_and_clear() {
        let store = TokenStore::new();
        assert!(store.token().is_none());

        let shared = store.clone();
        store.set("jwt");
        assert_eq!(shared.token().as_deref(), Some("jwt"));

        shared.clear();
        assert!(store.token().is_none());
    }

    #[test]
    fn test_empty_token_counts_as_absent() {
        let store = TokenStore::with_token("");
        assert!(store.token().is_none());
    }
}
