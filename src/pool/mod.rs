//! Subscriber pool: many logical subscriptions over one physical connection.
//!
//! The pool owns the connection and the [`SharedTargetTracker`] for it. Each
//! [`Subscription`] it opens routes its calls through the pool's transport,
//! which in multiplexed mode only touches the wire for keys whose subscriber
//! count crosses zero.
//!
//! # Example
//!
//! ```ignore
//! let pool = SubscriberPool::new(Arc::new(connection), PoolConfig::default());
//!
//! let a = pool.open("a", InitialInterest::none())?;
//! let b = pool.open("b", InitialInterest::none())?;
//!
//! a.subscribe(["news"])?; // wire SUBSCRIBE news
//! b.subscribe(["news"])?; // shared, nothing sent
//! a.unsubscribe(["news"])?; // b still listening, nothing sent
//! b.unsubscribe(["news"])?; // wire UNSUBSCRIBE news
//! ```

mod config;
mod transport;

pub use config::{ConnectionMode, PoolConfig};
pub use transport::Connection;

use crate::error::{Result, SubscriptionError};
use crate::subscriptions::{InitialInterest, Revoker, Subscription, Transport};
use crate::tracker::{SharedTargetTracker, TrackerStats};
use crate::types::{ByteKey, SubscriptionId};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use transport::PooledTransport;

/// What was forgotten when the connection went away.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DrainReport {
    pub channels: Vec<ByteKey>,
    pub patterns: Vec<ByteKey>,
    /// Subscriptions that were still alive and are now closed.
    pub revoked: usize,
}

/// Opens subscriptions that share one physical connection.
pub struct SubscriberPool<C> {
    transport: Arc<PooledTransport<C>>,
    /// Counter for generating subscription IDs.
    next_id: AtomicU64,
    /// Subscriptions opened here, pruned as they close.
    live: Mutex<Vec<Revoker>>,
    config: PoolConfig,
}

impl<C: Connection + 'static> SubscriberPool<C> {
    pub fn new(connection: Arc<C>, config: PoolConfig) -> Self {
        Self::with_tracker(connection, Arc::new(SharedTargetTracker::new()), config)
    }

    /// Create a pool around an existing tracker.
    pub fn with_tracker(
        connection: Arc<C>,
        tracker: Arc<SharedTargetTracker>,
        config: PoolConfig,
    ) -> Self {
        Self {
            transport: Arc::new(PooledTransport {
                connection,
                tracker,
                mode: config.mode,
            }),
            next_id: AtomicU64::new(1),
            live: Mutex::new(Vec::new()),
            config,
        }
    }

    /// Open a subscription that already holds `initial`.
    ///
    /// Nothing is sent for the initial interest. In multiplexed mode it is
    /// counted in the tracker so later subscribers share it. In exclusive
    /// mode the connection serves one live subscription at a time, and a
    /// second open fails with [`SubscriptionError::ConnectionBusy`].
    pub fn open<L>(&self, listener: L, initial: InitialInterest) -> Result<Subscription<L>> {
        // Held until the subscription is tracked, so connection_lost either
        // sees all of it or none of it
        let mut live = self.live.lock();
        live.retain(Revoker::is_live);
        if self.config.mode == ConnectionMode::Exclusive && !live.is_empty() {
            return Err(SubscriptionError::ConnectionBusy);
        }

        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::SeqCst));
        let transport: Arc<dyn Transport> = self.transport.clone();
        let subscription = Subscription::new(id, listener, initial, transport);

        if self.config.mode == ConnectionMode::Multiplexed {
            // Track the deduplicated sets, not the raw input
            let channels: Vec<ByteKey> = subscription.channels().into_iter().collect();
            let patterns: Vec<ByteKey> = subscription.patterns().into_iter().collect();
            self.tracker().channels().track(&channels);
            self.tracker().patterns().track(&patterns);
        }

        live.push(subscription.revoker());
        Ok(subscription)
    }

    /// Forget everything after the connection was lost.
    ///
    /// Every subscription opened from this pool is closed without a transport
    /// call and the tracker is drained. Nothing is sent. Owners reopen on the
    /// recovered connection; closing or dropping a revoked subscription is a
    /// no-op.
    pub fn connection_lost(&self) -> DrainReport {
        let mut live = self.live.lock();
        let revoked = live.drain(..).filter(|revoker| revoker.revoke()).count();
        let report = DrainReport {
            channels: self.tracker().channels().drain(),
            patterns: self.tracker().patterns().drain(),
            revoked,
        };
        drop(live);

        tracing::debug!(
            channels = report.channels.len(),
            patterns = report.patterns.len(),
            revoked = report.revoked,
            "connection lost, tracker drained"
        );
        report
    }

    /// Number of subscriptions opened here that are still alive.
    pub fn live_subscriptions(&self) -> usize {
        let mut live = self.live.lock();
        live.retain(Revoker::is_live);
        live.len()
    }

    pub fn tracker(&self) -> &Arc<SharedTargetTracker> {
        &self.transport.tracker
    }

    pub fn connection(&self) -> &Arc<C> {
        &self.transport.connection
    }

    pub fn config(&self) -> &PoolConfig {
        &self.config
    }

    pub fn stats(&self) -> TrackerStats {
        self.tracker().stats()
    }
}
