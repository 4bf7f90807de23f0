//! Per-category table of reference-counted targets.

use crate::types::{ByteKey, TargetKind};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;

use super::target::Target;

/// Map from channel (or pattern) to its live subscriber count.
///
/// The lock covers inserting and erasing entries only. Counters of existing
/// targets move with atomics outside it; the lock is retaken when a count
/// crosses between zero and one. A target whose count reached zero can never
/// be revived, so an erase only has to check that the entry is still the same
/// `Arc` it released.
pub struct TargetTable {
    kind: TargetKind,
    targets: Mutex<HashMap<ByteKey, Arc<Target>>>,
}

impl TargetTable {
    pub fn new(kind: TargetKind) -> Self {
        Self {
            kind,
            targets: Mutex::new(HashMap::new()),
        }
    }

    pub fn kind(&self) -> TargetKind {
        self.kind
    }

    fn lookup(&self, raw: &ByteKey) -> Option<Arc<Target>> {
        self.targets.lock().get(raw).cloned()
    }

    /// Take one reference on `raw`. Returns the target and whether it was
    /// created by this call.
    fn acquire(&self, raw: &ByteKey) -> (Arc<Target>, bool) {
        if let Some(target) = self.lookup(raw) {
            if target.try_acquire() {
                return (target, false);
            }
        }

        // Missing, or dropped to zero and about to be erased
        let mut map = self.targets.lock();
        if let Some(target) = map.get(raw) {
            if target.try_acquire() {
                return (target.clone(), false);
            }
        }
        let target = Arc::new(Target::first(raw.clone()));
        map.insert(raw.clone(), target.clone());
        (target, true)
    }

    /// Register interest without deciding on any wire action.
    ///
    /// Used for targets a subscriber already holds before it starts listening.
    pub fn track(&self, targets: &[ByteKey]) {
        for raw in targets {
            let (target, _) = self.acquire(raw);
            tracing::trace!(kind = %self.kind, key = %raw, count = target.subscribers(), "tracked");
        }
    }

    /// Register interest and return the targets that gained their first
    /// subscriber. Only those need a physical subscribe.
    ///
    /// A target whose earlier physical subscribe failed is reported again to
    /// the next registrant.
    pub fn register_and_should_subscribe(&self, targets: &[ByteKey]) -> Vec<ByteKey> {
        let mut first = Vec::new();
        for raw in targets {
            let (target, created) = self.acquire(raw);
            if (created || target.take_needs_subscribe()) && !first.contains(raw) {
                first.push(raw.clone());
            }
            tracing::trace!(kind = %self.kind, key = %raw, count = target.subscribers(), "registered");
        }
        first
    }

    /// Release interest and return the targets that lost their last
    /// subscriber. Those are erased from the table and need a physical
    /// unsubscribe.
    ///
    /// Unknown targets are ignored. An empty input drains the whole table.
    pub fn release_and_should_unsubscribe(&self, targets: &[ByteKey]) -> Vec<ByteKey> {
        if targets.is_empty() {
            return self.drain();
        }

        let mut last = Vec::new();
        for raw in targets {
            let Some(target) = self.lookup(raw) else {
                tracing::trace!(kind = %self.kind, key = %raw, "release of untracked target ignored");
                continue;
            };
            match target.release() {
                None => {
                    tracing::trace!(kind = %self.kind, key = %raw, "release of drained target ignored");
                }
                Some(false) => {
                    tracing::trace!(kind = %self.kind, key = %raw, count = target.subscribers(), "released");
                }
                Some(true) => {
                    let mut map = self.targets.lock();
                    // A drain may have erased it, or a registrant replaced it
                    if map.get(raw).is_some_and(|current| Arc::ptr_eq(current, &target)) {
                        map.remove(raw);
                        last.push(raw.clone());
                        tracing::trace!(kind = %self.kind, key = %raw, "released last reference");
                    }
                }
            }
        }
        last
    }

    /// Give back references taken by a registration whose physical subscribe
    /// failed.
    ///
    /// `sent` are the keys that subscribe carried. Any of them still shared by
    /// other subscribers is marked so the next registrant resends it; those
    /// keys are returned.
    pub fn abandon(&self, sent: &[ByteKey], targets: &[ByteKey]) -> Vec<ByteKey> {
        if targets.is_empty() {
            return Vec::new();
        }
        self.release_and_should_unsubscribe(targets);

        let map = self.targets.lock();
        let stranded: Vec<ByteKey> = sent
            .iter()
            .filter(|raw| match map.get(*raw) {
                Some(target) => {
                    target.mark_needs_subscribe();
                    true
                }
                None => false,
            })
            .cloned()
            .collect();
        if !stranded.is_empty() {
            tracing::debug!(kind = %self.kind, count = stranded.len(), "shared targets left without a subscribe");
        }
        stranded
    }

    /// Whether `raw` is counted but its physical subscribe is outstanding.
    pub fn needs_subscribe(&self, raw: &ByteKey) -> bool {
        self.lookup(raw).is_some_and(|target| target.needs_subscribe())
    }

    /// Erase every target regardless of its count. Returns the erased keys in
    /// ascending order.
    pub fn drain(&self) -> Vec<ByteKey> {
        let mut map = self.targets.lock();
        let mut drained: Vec<ByteKey> = map
            .drain()
            .map(|(raw, target)| {
                target.drain();
                raw
            })
            .collect();
        drained.sort();
        if !drained.is_empty() {
            tracing::debug!(kind = %self.kind, count = drained.len(), "drained table");
        }
        drained
    }

    /// Live subscriber count for a target, zero when untracked.
    pub fn subscriber_count(&self, raw: &ByteKey) -> i64 {
        self.targets
            .lock()
            .get(raw)
            .map(|target| target.subscribers())
            .unwrap_or(0)
    }

    pub fn contains(&self, raw: &ByteKey) -> bool {
        self.targets.lock().contains_key(raw)
    }

    pub fn len(&self) -> usize {
        self.targets.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.targets.lock().is_empty()
    }

    /// Sum of all subscriber counts.
    pub fn total_references(&self) -> i64 {
        self.targets
            .lock()
            .values()
            .map(|target| target.subscribers())
            .sum()
    }

    /// Tracked keys in ascending order.
    pub fn keys(&self) -> Vec<ByteKey> {
        let mut keys: Vec<ByteKey> = self.targets.lock().keys().cloned().collect();
        keys.sort();
        keys
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::keys;

    fn table() -> TargetTable {
        TargetTable::new(TargetKind::Channel)
    }

    #[test]
    fn test_first_registration_reports_subscribe() {
        let table = table();

        let first = table.register_and_should_subscribe(&keys(["a", "b"]));
        assert_eq!(first, keys(["a", "b"]));

        let second = table.register_and_should_subscribe(&keys(["a"]));
        assert!(second.is_empty());
        assert_eq!(table.subscriber_count(&"a".into()), 2);
        assert_eq!(table.subscriber_count(&"b".into()), 1);
    }

    #[test]
    fn test_release_reports_only_at_zero() {
        let table = table();
        table.register_and_should_subscribe(&keys(["a", "b"]));
        table.register_and_should_subscribe(&keys(["a"]));

        // a: 2 -> 1, b: 1 -> 0
        let last = table.release_and_should_unsubscribe(&keys(["a", "b"]));
        assert_eq!(last, keys(["b"]));
        assert!(!table.contains(&"b".into()));
        assert_eq!(table.subscriber_count(&"a".into()), 1);

        let last = table.release_and_should_unsubscribe(&keys(["a"]));
        assert_eq!(last, keys(["a"]));
        assert!(table.is_empty());
    }

    #[test]
    fn test_release_unknown_is_noop() {
        let table = table();
        table.register_and_should_subscribe(&keys(["a"]));

        let last = table.release_and_should_unsubscribe(&keys(["zzz"]));
        assert!(last.is_empty());
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn test_duplicate_keys_in_one_call() {
        let table = table();

        let first = table.register_and_should_subscribe(&keys(["a", "a"]));
        assert_eq!(first, keys(["a"]));
        assert_eq!(table.subscriber_count(&"a".into()), 2);

        let last = table.release_and_should_unsubscribe(&keys(["a", "a", "a"]));
        assert_eq!(last, keys(["a"]));
        assert!(table.is_empty());
    }

    #[test]
    fn test_track_counts_without_reporting() {
        let table = table();
        table.track(&keys(["news"]));
        assert_eq!(table.subscriber_count(&"news".into()), 1);

        // Already has a subscriber, so nothing to send
        assert!(table
            .register_and_should_subscribe(&keys(["news"]))
            .is_empty());
    }

    #[test]
    fn test_empty_release_drains_everything() {
        let table = table();
        table.register_and_should_subscribe(&keys(["b", "a"]));
        table.register_and_should_subscribe(&keys(["a"]));

        let drained = table.release_and_should_unsubscribe(&[]);
        assert_eq!(drained, keys(["a", "b"]));
        assert!(table.is_empty());
        assert_eq!(table.total_references(), 0);
    }

    #[test]
    fn test_reregister_after_release() {
        let table = table();
        table.register_and_should_subscribe(&keys(["a"]));
        table.release_and_should_unsubscribe(&keys(["a"]));

        let first = table.register_and_should_subscribe(&keys(["a"]));
        assert_eq!(first, keys(["a"]));
    }

    #[test]
    fn test_abandon_marks_shared_keys_for_resend() {
        let table = table();
        // First registrant is about to send "a" and "b"
        let sent = table.register_and_should_subscribe(&keys(["a", "b"]));
        // Second registrant piggybacks on "a" before the wire call returns
        assert!(table.register_and_should_subscribe(&keys(["a"])).is_empty());

        let stranded = table.abandon(&sent, &keys(["a", "b"]));
        assert_eq!(stranded, keys(["a"]));
        assert!(!table.contains(&"b".into()));
        assert_eq!(table.subscriber_count(&"a".into()), 1);
        assert!(table.needs_subscribe(&"a".into()));

        // Next registrant resends, once
        assert_eq!(table.register_and_should_subscribe(&keys(["a"])), keys(["a"]));
        assert!(!table.needs_subscribe(&"a".into()));
        assert!(table.register_and_should_subscribe(&keys(["a"])).is_empty());
    }

    #[test]
    fn test_abandon_unshared_leaves_nothing() {
        let table = table();
        let sent = table.register_and_should_subscribe(&keys(["a"]));

        assert!(table.abandon(&sent, &keys(["a"])).is_empty());
        assert!(table.is_empty());
    }

    #[test]
    fn test_release_after_drain_is_ignored() {
        let table = table();
        table.register_and_should_subscribe(&keys(["a"]));
        table.drain();

        // Re-created by someone else after the drain
        table.register_and_should_subscribe(&keys(["a"]));
        table.register_and_should_subscribe(&keys(["a"]));
        let last = table.release_and_should_unsubscribe(&keys(["a"]));
        assert!(last.is_empty());
        assert_eq!(table.subscriber_count(&"a".into()), 1);
    }
}
