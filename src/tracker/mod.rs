//! Shared-target tracking for multiplexed connections.
//!
//! Several logical subscriptions can share one physical connection. The
//! tracker counts how many of them are interested in each channel and
//! pattern, and tells the caller which keys actually have to go over the
//! wire:
//!
//! - a subscribe is needed only when a key gains its first subscriber
//! - an unsubscribe is needed only when a key loses its last subscriber
//!
//! Channels and patterns are tracked in two independent [`TargetTable`]s.
//!
//! # Example
//!
//! ```ignore
//! let tracker = SharedTargetTracker::new();
//!
//! let send = tracker.channels().register_and_should_subscribe(&keys(["news"]));
//! assert_eq!(send, keys(["news"]));
//!
//! // A second subscriber piggybacks on the existing wire subscription
//! assert!(tracker.channels().register_and_should_subscribe(&keys(["news"])).is_empty());
//! ```

mod table;
mod target;

pub use table::TargetTable;
pub use target::Target;

use crate::types::TargetKind;
use serde::Serialize;

/// Reference counts for one physical connection.
pub struct SharedTargetTracker {
    channels: TargetTable,
    patterns: TargetTable,
}

impl SharedTargetTracker {
    pub fn new() -> Self {
        Self {
            channels: TargetTable::new(TargetKind::Channel),
            patterns: TargetTable::new(TargetKind::Pattern),
        }
    }

    pub fn channels(&self) -> &TargetTable {
        &self.channels
    }

    pub fn patterns(&self) -> &TargetTable {
        &self.patterns
    }

    pub fn table(&self, kind: TargetKind) -> &TargetTable {
        match kind {
            TargetKind::Channel => &self.channels,
            TargetKind::Pattern => &self.patterns,
        }
    }

    pub fn stats(&self) -> TrackerStats {
        TrackerStats {
            channels: self.channels.len(),
            patterns: self.patterns.len(),
            channel_references: self.channels.total_references(),
            pattern_references: self.patterns.total_references(),
        }
    }
}

impl Default for SharedTargetTracker {
    fn default() -> Self {
        Self::new()
    }
}

/// Point-in-time view of a tracker.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct TrackerStats {
    /// Distinct channels with at least one subscriber.
    pub channels: usize,
    /// Distinct patterns with at least one subscriber.
    pub patterns: usize,
    pub channel_references: i64,
    pub pattern_references: i64,
}
