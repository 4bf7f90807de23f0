//! Per-subscriber registry of channels and patterns.

use crate::error::{Result, SubscriptionError};
use crate::types::{keys, ByteKey, SubscriptionId, TargetKind, UnsubscribeScope};
use parking_lot::Mutex;
use std::collections::HashSet;
use std::fmt;
use std::sync::{Arc, Weak};

use super::types::{InitialInterest, Residual, SubscriptionInfo, Transport};

/// Internal interest state, guarded by the registry lock.
struct Interest {
    channels: HashSet<ByteKey>,
    patterns: HashSet<ByteKey>,
    alive: bool,
}

impl Interest {
    fn set(&self, kind: TargetKind) -> &HashSet<ByteKey> {
        match kind {
            TargetKind::Channel => &self.channels,
            TargetKind::Pattern => &self.patterns,
        }
    }

    fn set_mut(&mut self, kind: TargetKind) -> &mut HashSet<ByteKey> {
        match kind {
            TargetKind::Channel => &mut self.channels,
            TargetKind::Pattern => &mut self.patterns,
        }
    }

    fn is_empty(&self) -> bool {
        self.channels.is_empty() && self.patterns.is_empty()
    }
}

/// One logical subscriber's channels and patterns.
///
/// The registry is alive until an unsubscribe leaves it with neither
/// channels nor patterns, at which point it closes itself and runs the
/// transport's cleanup exactly once. After that every mutating call with
/// explicit targets fails with [`SubscriptionError::InvalidSubscription`].
///
/// Calls on one registry are serialized by its lock, which is held across
/// the transport call.
///
/// Only the effective delta reaches the transport: keys already owned are not
/// resubscribed and keys never owned are not unsubscribed. A shared transport
/// counts one reference per owned key, so forwarding the raw lists would take
/// or give back references this subscriber does not hold.
pub struct Subscription<L> {
    id: SubscriptionId,
    listener: L,
    transport: Arc<dyn Transport>,
    state: Arc<Mutex<Interest>>,
}

/// Handle that lets the owner of a connection invalidate a registry once the
/// physical subscriptions behind it are gone.
pub(crate) struct Revoker {
    id: SubscriptionId,
    state: Weak<Mutex<Interest>>,
}

impl Revoker {
    /// Mark the registry closed and forget its interest without touching the
    /// transport. Returns whether it was still alive.
    pub(crate) fn revoke(&self) -> bool {
        let Some(state) = self.state.upgrade() else {
            return false;
        };
        let mut state = state.lock();
        if !state.alive {
            return false;
        }
        state.alive = false;
        state.channels.clear();
        state.patterns.clear();
        tracing::debug!(subscription = %self.id, "subscription revoked");
        true
    }

    /// Whether the registry still exists and is alive.
    pub(crate) fn is_live(&self) -> bool {
        self.state
            .upgrade()
            .is_some_and(|state| state.lock().alive)
    }
}

impl<L> Subscription<L> {
    /// Create a registry that already owns `initial`.
    ///
    /// No transport call is made for the initial interest.
    pub fn new(
        id: SubscriptionId,
        listener: L,
        initial: InitialInterest,
        transport: Arc<dyn Transport>,
    ) -> Self {
        let state = Interest {
            channels: initial.channels.into_iter().collect(),
            patterns: initial.patterns.into_iter().collect(),
            alive: true,
        };
        tracing::debug!(
            subscription = %id,
            channels = state.channels.len(),
            patterns = state.patterns.len(),
            "subscription created"
        );
        Self {
            id,
            listener,
            transport,
            state: Arc::new(Mutex::new(state)),
        }
    }

    pub fn id(&self) -> SubscriptionId {
        self.id
    }

    pub(crate) fn revoker(&self) -> Revoker {
        Revoker {
            id: self.id,
            state: Arc::downgrade(&self.state),
        }
    }

    /// The subscriber-supplied handle used to route incoming messages.
    pub fn listener(&self) -> &L {
        &self.listener
    }

    pub fn is_alive(&self) -> bool {
        self.state.lock().alive
    }

    /// Copy of the owned channels.
    pub fn channels(&self) -> HashSet<ByteKey> {
        self.state.lock().channels.clone()
    }

    /// Copy of the owned patterns.
    pub fn patterns(&self) -> HashSet<ByteKey> {
        self.state.lock().patterns.clone()
    }

    pub fn info(&self) -> SubscriptionInfo {
        let state = self.state.lock();
        SubscriptionInfo {
            id: self.id,
            alive: state.alive,
            channels: sorted(&state.channels),
            patterns: sorted(&state.patterns),
        }
    }

    /// Subscribe to channels. The list must not be empty.
    pub fn subscribe<I>(&self, channels: I) -> Result<()>
    where
        I: IntoIterator,
        I::Item: Into<ByteKey>,
    {
        self.add(TargetKind::Channel, keys(channels))
    }

    /// Subscribe to patterns. The list must not be empty.
    pub fn psubscribe<I>(&self, patterns: I) -> Result<()>
    where
        I: IntoIterator,
        I::Item: Into<ByteKey>,
    {
        self.add(TargetKind::Pattern, keys(patterns))
    }

    /// Unsubscribe from channels. An empty list means every owned channel.
    pub fn unsubscribe<I>(&self, channels: I) -> Result<()>
    where
        I: IntoIterator,
        I::Item: Into<ByteKey>,
    {
        self.remove(TargetKind::Channel, keys(channels))
    }

    /// Unsubscribe from patterns. An empty list means every owned pattern.
    pub fn punsubscribe<I>(&self, patterns: I) -> Result<()>
    where
        I: IntoIterator,
        I::Item: Into<ByteKey>,
    {
        self.remove(TargetKind::Pattern, keys(patterns))
    }

    /// Unsubscribe from every owned channel.
    pub fn unsubscribe_all(&self) -> Result<()> {
        self.remove(TargetKind::Channel, Vec::new())
    }

    /// Unsubscribe from every owned pattern.
    pub fn punsubscribe_all(&self) -> Result<()> {
        self.remove(TargetKind::Pattern, Vec::new())
    }

    /// Force teardown, e.g. after the connection went away.
    ///
    /// Always runs the transport cleanup, handing it whatever is still owned.
    pub fn close(&self) {
        let residual = {
            let mut state = self.state.lock();
            state.alive = false;
            Residual {
                channels: drain_sorted(&mut state.channels),
                patterns: drain_sorted(&mut state.patterns),
            }
        };
        tracing::debug!(
            subscription = %self.id,
            channels = residual.channels.len(),
            patterns = residual.patterns.len(),
            "subscription force closed"
        );
        self.transport.close(&residual);
    }

    fn add(&self, kind: TargetKind, targets: Vec<ByteKey>) -> Result<()> {
        let mut state = self.state.lock();
        if !state.alive {
            return Err(SubscriptionError::InvalidSubscription);
        }
        if targets.is_empty() {
            return Err(SubscriptionError::InvalidArgument(format!(
                "at least one {} is required",
                kind
            )));
        }

        // Only keys this subscriber did not own yet reach the transport, so a
        // repeated subscribe never takes a second shared reference.
        let set = state.set_mut(kind);
        let added: Vec<ByteKey> = targets
            .into_iter()
            .filter(|raw| set.insert(raw.clone()))
            .collect();
        if added.is_empty() {
            return Ok(());
        }

        let sent = match kind {
            TargetKind::Channel => self.transport.subscribe(&added),
            TargetKind::Pattern => self.transport.psubscribe(&added),
        };
        if let Err(e) = sent {
            let set = state.set_mut(kind);
            for raw in &added {
                set.remove(raw);
            }
            return Err(e);
        }

        tracing::debug!(subscription = %self.id, %kind, count = added.len(), "subscribed");
        Ok(())
    }

    fn remove(&self, kind: TargetKind, targets: Vec<ByteKey>) -> Result<()> {
        let mut state = self.state.lock();
        if !state.alive {
            if targets.is_empty() {
                return Ok(());
            }
            return Err(SubscriptionError::InvalidSubscription);
        }

        let (scope, owned) = if targets.is_empty() {
            (UnsubscribeScope::All, sorted(state.set(kind)))
        } else {
            let set = state.set(kind);
            let mut seen = HashSet::new();
            let owned: Vec<ByteKey> = targets
                .into_iter()
                .filter(|raw| set.contains(raw) && seen.insert(raw.clone()))
                .collect();
            (UnsubscribeScope::Explicit, owned)
        };

        if !owned.is_empty() {
            match kind {
                TargetKind::Channel => self.transport.unsubscribe(scope, &owned)?,
                TargetKind::Pattern => self.transport.punsubscribe(scope, &owned)?,
            }
            let set = state.set_mut(kind);
            for raw in &owned {
                set.remove(raw);
            }
            tracing::debug!(subscription = %self.id, %kind, ?scope, count = owned.len(), "unsubscribed");
        }

        if !state.is_empty() {
            return Ok(());
        }
        state.alive = false;
        drop(state);

        tracing::debug!(subscription = %self.id, "subscription closed, no interest left");
        self.transport.close(&Residual::default());
        Ok(())
    }
}

impl<L> fmt::Debug for Subscription<L> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.lock();
        f.debug_struct("Subscription")
            .field("id", &self.id)
            .field("alive", &state.alive)
            .field("channels", &state.channels.len())
            .field("patterns", &state.patterns.len())
            .finish()
    }
}

impl<L> Drop for Subscription<L> {
    fn drop(&mut self) {
        let alive = self.state.lock().alive;
        if alive {
            self.close();
        }
    }
}

fn sorted(set: &HashSet<ByteKey>) -> Vec<ByteKey> {
    let mut keys: Vec<ByteKey> = set.iter().cloned().collect();
    keys.sort();
    keys
}

fn drain_sorted(set: &mut HashSet<ByteKey>) -> Vec<ByteKey> {
    let mut keys: Vec<ByteKey> = set.drain().collect();
    keys.sort();
    keys
}
