//! Transport that routes subscription calls onto a physical connection.

use crate::error::Result;
use crate::subscriptions::{Residual, Transport};
use crate::tracker::SharedTargetTracker;
use crate::types::{ByteKey, TargetKind, UnsubscribeScope};
use std::sync::Arc;

use super::config::ConnectionMode;

/// A physical pub/sub connection.
///
/// An empty slice passed to `unsubscribe`/`punsubscribe` means "everything
/// on this connection".
pub trait Connection: Send + Sync {
    fn subscribe(&self, channels: &[ByteKey]) -> Result<()>;

    fn unsubscribe(&self, channels: &[ByteKey]) -> Result<()>;

    fn psubscribe(&self, patterns: &[ByteKey]) -> Result<()>;

    fn punsubscribe(&self, patterns: &[ByteKey]) -> Result<()>;
}

/// Transport shared by every subscription opened from one pool.
pub(crate) struct PooledTransport<C> {
    pub(crate) connection: Arc<C>,
    pub(crate) tracker: Arc<SharedTargetTracker>,
    pub(crate) mode: ConnectionMode,
}

impl<C: Connection> PooledTransport<C> {
    fn wire_subscribe(&self, kind: TargetKind, targets: &[ByteKey]) -> Result<()> {
        match kind {
            TargetKind::Channel => self.connection.subscribe(targets),
            TargetKind::Pattern => self.connection.psubscribe(targets),
        }
    }

    fn wire_unsubscribe(&self, kind: TargetKind, targets: &[ByteKey]) -> Result<()> {
        match kind {
            TargetKind::Channel => self.connection.unsubscribe(targets),
            TargetKind::Pattern => self.connection.punsubscribe(targets),
        }
    }

    fn add(&self, kind: TargetKind, targets: &[ByteKey]) -> Result<()> {
        if self.mode == ConnectionMode::Exclusive {
            return self.wire_subscribe(kind, targets);
        }

        let table = self.tracker.table(kind);
        let first = table.register_and_should_subscribe(targets);
        if first.is_empty() {
            tracing::trace!(%kind, count = targets.len(), "already subscribed on the wire");
            return Ok(());
        }

        tracing::debug!(%kind, count = first.len(), "wire subscribe");
        if let Err(e) = self.wire_subscribe(kind, &first) {
            // Give back the references taken above; the caller rolls back too.
            // Keys another subscriber joined meanwhile are resent by the next one.
            let stranded = table.abandon(&first, targets);
            if !stranded.is_empty() {
                tracing::warn!(%kind, count = stranded.len(), error = %e, "shared targets await resubscribe");
            }
            return Err(e);
        }
        Ok(())
    }

    fn remove(&self, kind: TargetKind, scope: UnsubscribeScope, targets: &[ByteKey]) -> Result<()> {
        if self.mode == ConnectionMode::Exclusive {
            return match scope {
                UnsubscribeScope::All => self.wire_unsubscribe(kind, &[]),
                UnsubscribeScope::Explicit => self.wire_unsubscribe(kind, targets),
            };
        }
        // An empty release would drain every subscriber's references
        if targets.is_empty() {
            return Ok(());
        }

        let table = self.tracker.table(kind);
        let last = table.release_and_should_unsubscribe(targets);
        if last.is_empty() {
            tracing::trace!(%kind, count = targets.len(), "other subscribers remain");
            return Ok(());
        }

        tracing::debug!(%kind, count = last.len(), "wire unsubscribe");
        if let Err(e) = self.wire_unsubscribe(kind, &last) {
            // Still subscribed on the wire, so the caller keeps its references
            table.track(targets);
            return Err(e);
        }
        Ok(())
    }

    fn release_residual(&self, kind: TargetKind, targets: &[ByteKey]) {
        if targets.is_empty() {
            return;
        }
        let last = match self.mode {
            ConnectionMode::Exclusive => targets.to_vec(),
            ConnectionMode::Multiplexed => self
                .tracker
                .table(kind)
                .release_and_should_unsubscribe(targets),
        };
        if last.is_empty() {
            return;
        }
        if let Err(e) = self.wire_unsubscribe(kind, &last) {
            tracing::warn!(%kind, count = last.len(), error = %e, "unsubscribe on close failed");
        }
    }
}

impl<C: Connection> Transport for PooledTransport<C> {
    fn subscribe(&self, channels: &[ByteKey]) -> Result<()> {
        self.add(TargetKind::Channel, channels)
    }

    fn unsubscribe(&self, scope: UnsubscribeScope, channels: &[ByteKey]) -> Result<()> {
        self.remove(TargetKind::Channel, scope, channels)
    }

    fn psubscribe(&self, patterns: &[ByteKey]) -> Result<()> {
        self.add(TargetKind::Pattern, patterns)
    }

    fn punsubscribe(&self, scope: UnsubscribeScope, patterns: &[ByteKey]) -> Result<()> {
        self.remove(TargetKind::Pattern, scope, patterns)
    }

    fn close(&self, residual: &Residual) {
        self.release_residual(TargetKind::Channel, &residual.channels);
        self.release_residual(TargetKind::Pattern, &residual.patterns);
    }
}
