//! Type-safe identifiers.
//!
//! Command ids are client-assigned correlation identifiers that link an
//! outbound subscribe command to the inbound data messages answering it.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::atomic::{AtomicU32, Ordering};

use serde::{Deserialize, Serialize};
use tracing::warn;

// ============================================================================
// CommandId
// ============================================================================

/// Correlation id of one subscription (`cmdId` on the wire).
///
/// Allocated by [`IdAllocator`]; never 0.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CommandId(u32);

impl CommandId {
    /// Wraps a raw id.
    #[inline]
    #[must_use]
    pub const fn new(id: u32) -> Self {
        Self(id)
    }

    /// Returns the raw id.
    #[inline]
    #[must_use]
    pub const fn as_u32(&self) -> u32 {
        self.0
    }
}

impl fmt::Display for CommandId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u32> for CommandId {
    #[inline]
    fn from(id: u32) -> Self {
        Self(id)
    }
}

// ============================================================================
// IdAllocator
// ============================================================================

/// Monotonic command id source.
///
/// The first id handed out is 1. Ids are strictly increasing and are never
/// reused until the `u32` space is spent; after that every call returns
/// `u32::MAX`.
#[derive(Debug, Default)]
pub struct IdAllocator {
    last: AtomicU32,
}

impl IdAllocator {
    /// Creates an allocator whose first id is 1.
    #[inline]
    #[must_use]
    pub const fn new() -> Self {
        Self {
            last: AtomicU32::new(0),
        }
    }

    /// Creates an allocator that resumes after `last`.
    #[inline]
    #[must_use]
    pub const fn starting_after(last: u32) -> Self {
        Self {
            last: AtomicU32::new(last),
        }
    }

    /// Allocates the next id.
    pub fn next_id(&self) -> CommandId {
        let counter = &self.last;
        let bump = |last: u32| last.checked_add(1);

        match counter.fetch_update(Ordering::Relaxed, Ordering::Relaxed, bump) {
            Ok(previous) => CommandId(previous + 1),
            Err(_) => {
                warn!("Command id space exhausted, reusing {}", u32::MAX);
                CommandId(u32::MAX)
            }
        }
    }

    /// Returns the most recently allocated id, if any.
    #[inline]
    #[must_use]
    pub fn last_id(&self) -> Option<CommandId> {
        match self.last.load(Ordering::Relaxed) {
            0 => None,
            id => Some(CommandId(id)),
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use proptest::prelude::*;

    #[test]
    fn test_first_id_is_one() {
        let ids = IdAllocator::new();
        assert_eq!(ids.last_id(), None);
        assert_eq!(ids.next_id(), CommandId::new(1));
        assert_eq!(ids.last_id(), Some(CommandId::new(1)));
    }

    #[test]
    fn test_next_id_saturates_at_max() {
        let ids = IdAllocator::starting_after(u32::MAX - 1);
        assert_eq!(ids.next_id(), CommandId::new(u32::MAX));
        assert_eq!(ids.next_id(), CommandId::new(u32::MAX));
        assert_eq!(ids.last_id(), Some(CommandId::new(u32::MAX)));
    }

    #[test]
    fn test_command_id_serializes_as_number() {
        let json = serde_json::to_string(&CommandId::new(7)).unwrap();
        assert_eq!(json, "7");
    }

    proptest! {
        #[test]
        fn ids_are_distinct_and_strictly_increasing(n in 1usize..500) {
            let ids = IdAllocator::new();
            let allocated: Vec<_> = (0..n).map(|_| ids.next_id()).collect();

            prop_assert!(allocated.iter().all(|id| id.as_u32() != 0));
            prop_assert!(allocated.windows(2).all(|w| w[0] < w[1]));
        }
    }
}
