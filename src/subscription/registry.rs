//! Command id → callback routing.
//!
//! The registry maps every live [`CommandId`] to the callback of its
//! subscriber and routes decoded updates to it. Updates for ids that are not
//! registered (late data for an already cancelled stream) are dropped.
//!
//! # Cancellation
//!
//! Every entry has a gate. Dispatch holds the gate while the callback runs and
//! [`SubscriptionRegistry::unregister`] closes it, so once `unregister`
//! returns no callback invocation for that id can start or still be running
//! on another thread. The gate is reentrant: a callback may unregister its
//! own id.

// ============================================================================
// Imports
// ============================================================================

use std::cell::Cell;
use std::sync::Arc;

use parking_lot::{Mutex, ReentrantMutex};
use rustc_hash::FxHashMap;
use tracing::{trace, warn};

use crate::identifiers::CommandId;
use crate::protocol::SubscriptionUpdate;

// ============================================================================
// Types
// ============================================================================

/// Subscriber callback, invoked with every update addressed to its id.
pub type UpdateCallback = Box<dyn Fn(&SubscriptionUpdate) + Send + Sync>;

/// A registered callback and its open/closed gate.
struct Entry {
    gate: ReentrantMutex<Cell<bool>>,
    callback: UpdateCallback,
}

type EntryMap = FxHashMap<CommandId, Arc<Entry>>;

// ============================================================================
// SubscriptionRegistry
// ============================================================================

/// Routing table for inbound updates.
///
/// Callbacks are never invoked while the map lock is held.
#[derive(Default)]
pub struct SubscriptionRegistry {
    entries: Mutex<EntryMap>,
}

impl SubscriptionRegistry {
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `callback` for `cmd_id`.
    ///
    /// Ids come fresh from the encoder, so collisions do not occur under
    /// correct use. If one does, the later registration replaces the earlier.
    pub fn register(&self, cmd_id: CommandId, callback: UpdateCallback) {
        let entry = Arc::new(Entry {
            gate: ReentrantMutex::new(Cell::new(true)),
            callback,
        });

        let previous = self.entries.lock().insert(cmd_id, entry);
        if let Some(previous) = previous {
            warn!(%cmd_id, "Command id registered twice, replacing callback");
            previous.gate.lock().set(false);
        }
    }

    /// Removes `cmd_id`. Returns `true` if it was registered.
    ///
    /// Blocks until an invocation of that callback running on another thread
    /// has finished.
    pub fn unregister(&self, cmd_id: CommandId) -> bool {
        let removed = self.entries.lock().remove(&cmd_id);

        match removed {
            Some(entry) => {
                entry.gate.lock().set(false);
                trace!(%cmd_id, "Subscription unregistered");
                true
            }
            None => false,
        }
    }

    /// Routes `update` to its subscriber. Returns `true` if a callback ran.
    pub fn dispatch(&self, update: &SubscriptionUpdate) -> bool {
        let cmd_id = update.subscription_id;
        let entry = self.entries.lock().get(&cmd_id).cloned();

        let Some(entry) = entry else {
            trace!(%cmd_id, "Dropping update for unknown subscription");
            return false;
        };

        let open = entry.gate.lock();
        if !open.get() {
            return false;
        }
        (entry.callback)(update);
        true
    }

    /// Returns `true` if `cmd_id` is registered.
    #[inline]
    #[must_use]
    pub fn contains(&self, cmd_id: CommandId) -> bool {
        self.entries.lock().contains_key(&cmd_id)
    }

    /// Number of live subscriptions.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    /// Removes every subscription.
    pub fn clear(&self) {
        let drained: Vec<_> = self.entries.lock().drain().collect();
        for (_, entry) in drained {
            entry.gate.lock().set(false);
        }
    }
}

impl std::fmt::Debug for SubscriptionRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SubscriptionRegistry")
            .field("len", &self.len())
            .finish()
    }
}

// ============================================================================
// Tests
// ============================================================================
