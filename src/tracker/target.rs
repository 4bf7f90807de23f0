//! Reference-counted record of one physical channel or pattern.

use crate::types::ByteKey;
use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};

/// One channel or pattern and the number of logical subscribers using it.
///
/// The counter is only ever moved with atomics; the owning table's lock is
/// needed to insert or erase a target, never to bump its count.
#[derive(Debug)]
pub struct Target {
    raw: ByteKey,
    subscribers: AtomicI64,
    /// Set when the physical subscribe for this target failed while other
    /// subscribers were already sharing it. The next registrant resends.
    needs_subscribe: AtomicBool,
}

impl Target {
    /// A target holding its first subscriber.
    pub(crate) fn first(raw: ByteKey) -> Self {
        Self {
            raw,
            subscribers: AtomicI64::new(1),
            needs_subscribe: AtomicBool::new(false),
        }
    }

    pub fn raw(&self) -> &ByteKey {
        &self.raw
    }

    /// Current number of interested subscribers.
    pub fn subscribers(&self) -> i64 {
        self.subscribers.load(Ordering::Acquire)
    }

    /// Whether the target is counted but missing on the wire.
    pub fn needs_subscribe(&self) -> bool {
        self.needs_subscribe.load(Ordering::Acquire)
    }

    pub(crate) fn mark_needs_subscribe(&self) {
        self.needs_subscribe.store(true, Ordering::Release);
    }

    /// Clear the resend marker, returning whether it was set.
    pub(crate) fn take_needs_subscribe(&self) -> bool {
        self.needs_subscribe.swap(false, Ordering::AcqRel)
    }

    /// Add one subscriber to a live target.
    ///
    /// Fails when the count is zero: the target is being erased (or was
    /// drained) and the caller must go through the table to get a fresh one.
    pub(crate) fn try_acquire(&self) -> bool {
        let mut current = self.subscribers.load(Ordering::Acquire);
        loop {
            assert!(
                current >= 0,
                "negative subscriber count {} for target {}",
                current,
                self.raw
            );
            if current == 0 {
                return false;
            }
            match self.subscribers.compare_exchange_weak(
                current,
                current + 1,
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => return true,
                Err(actual) => current = actual,
            }
        }
    }

    /// Drop one subscriber.
    ///
    /// Returns `Some(true)` for the release that took the count from 1 to 0,
    /// `Some(false)` for any other successful release, and `None` when the
    /// count was already zero (drained underneath the caller). Retries the
    /// compare-and-swap until it lands, so concurrent releases each observe a
    /// distinct prior count.
    pub(crate) fn release(&self) -> Option<bool> {
        let mut current = self.subscribers.load(Ordering::Acquire);
        loop {
            assert!(
                current >= 0,
                "negative subscriber count {} for target {}",
                current,
                self.raw
            );
            if current == 0 {
                return None;
            }
            match self.subscribers.compare_exchange_weak(
                current,
                current - 1,
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => return Some(current == 1),
                // Lost the race, retry with the fresh value
                Err(actual) => current = actual,
            }
        }
    }

    /// Zero the counter, returning what it held.
    pub(crate) fn drain(&self) -> i64 {
        self.subscribers.swap(0, Ordering::AcqRel)
    }
}
