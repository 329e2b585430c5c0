//! Bounded, time-ordered per-key buffers.
//!
//! Each subscription owns one [`TelemetryData`]. An inbound update is folded
//! in with [`TelemetryData::merge`]: for every key in the update the new
//! points are appended, the buffer is stable-sorted by timestamp, and the
//! oldest points are dropped once the retention cap is exceeded. Keys absent
//! from the update are left untouched.
//!
//! Points sharing a timestamp are all kept, in arrival order.

// ============================================================================
// Imports
// ============================================================================

use std::collections::BTreeMap;
use std::collections::btree_map::Iter;

use crate::protocol::{KeyedPoints, TsPoint};

// ============================================================================
// Constants
// ============================================================================

/// Points kept per key unless configured otherwise.
pub const DEFAULT_RETENTION: usize = 1000;

// ============================================================================
// TelemetryData
// ============================================================================

/// Per-key sample buffers of one subscription.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TelemetryData {
    series: BTreeMap<String, Vec<TsPoint>>,
    retention: usize,
}

impl Default for TelemetryData {
    fn default() -> Self {
        Self::with_retention(DEFAULT_RETENTION)
    }
}

impl TelemetryData {
    /// Empty buffers with the default cap.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Empty buffers keeping at most `retention` points per key.
    #[inline]
    #[must_use]
    pub fn with_retention(retention: usize) -> Self {
        Self {
            series: BTreeMap::new(),
            retention,
        }
    }

    /// Folds one update into the buffers.
    pub fn merge(&mut self, update: &KeyedPoints) {
        for (key, points) in update {
            let buffer = self.series.entry(key.clone()).or_default();
            merge_points(buffer, points, self.retention);
        }
    }

    /// Buffer for `key`, oldest first.
    #[inline]
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&[TsPoint]> {
        self.series.get(key).map(Vec::as_slice)
    }

    /// Newest point for `key`.
    #[inline]
    #[must_use]
    pub fn latest(&self, key: &str) -> Option<&TsPoint> {
        self.series.get(key).and_then(|points| points.last())
    }

    #[inline]
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.series.keys().map(String::as_str)
    }

    #[inline]
    pub fn iter(&self) -> Iter<'_, String, Vec<TsPoint>> {
        self.series.iter()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.series.is_empty()
    }

    #[inline]
    #[must_use]
    pub fn retention(&self) -> usize {
        self.retention
    }

    /// Drops every buffer, keeping the cap.
    pub fn clear(&mut self) {
        self.series.clear();
    }
}

impl<'a> IntoIterator for &'a TelemetryData {
    type Item = (&'a String, &'a Vec<TsPoint>);
    type IntoIter = Iter<'a, String, Vec<TsPoint>>;

    fn into_iter(self) -> Self::IntoIter {
        self.series.iter()
    }
}

/// Appends `incoming`, stable-sorts by timestamp and trims the front to `cap`.
pub fn merge_points(buffer: &mut Vec<TsPoint>, incoming: &[TsPoint], cap: usize) {
    buffer.extend_from_slice(incoming);
    buffer.sort_by_key(|point| point.ts);

    if buffer.len() > cap {
        let overflow = buffer.len() - cap;
        buffer.drain(..overflow);
    }
}

// ============================================================================
// Tests
// ============================================================================
