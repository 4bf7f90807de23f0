//! Subscription types and the transport boundary.

use crate::error::Result;
use crate::types::{keys, ByteKey, SubscriptionId, UnsubscribeScope};
use serde::Serialize;

/// Physical side of a subscription, supplied by the connection layer.
///
/// The registry calls these after updating its own bookkeeping and while
/// still holding its lock, so an implementation must not call back into the
/// same registry.
pub trait Transport: Send + Sync {
    fn subscribe(&self, channels: &[ByteKey]) -> Result<()>;

    fn unsubscribe(&self, scope: UnsubscribeScope, channels: &[ByteKey]) -> Result<()>;

    fn psubscribe(&self, patterns: &[ByteKey]) -> Result<()>;

    fn punsubscribe(&self, scope: UnsubscribeScope, patterns: &[ByteKey]) -> Result<()>;

    /// One-time cleanup when the registry closes.
    ///
    /// `residual` holds whatever the registry still owned at that moment;
    /// it is empty when the registry closed because its interest ran out.
    fn close(&self, residual: &Residual);
}

/// Channels and patterns a registry still owned when it closed.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Residual {
    pub channels: Vec<ByteKey>,
    pub patterns: Vec<ByteKey>,
}

impl Residual {
    pub fn is_empty(&self) -> bool {
        self.channels.is_empty() && self.patterns.is_empty()
    }
}

/// Interest a subscriber already holds when its registry is created.
///
/// These are recorded without any transport call.
#[derive(Clone, Debug, Default)]
pub struct InitialInterest {
    pub channels: Vec<ByteKey>,
    pub patterns: Vec<ByteKey>,
}

impl InitialInterest {
    /// Start with nothing.
    pub fn none() -> Self {
        Self::default()
    }

    /// Start with the given channels.
    pub fn channels<I>(channels: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<ByteKey>,
    {
        Self {
            channels: keys(channels),
            ..Default::default()
        }
    }

    /// Start with the given patterns.
    pub fn patterns<I>(patterns: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<ByteKey>,
    {
        Self {
            patterns: keys(patterns),
            ..Default::default()
        }
    }

    pub fn with_patterns<I>(mut self, patterns: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<ByteKey>,
    {
        self.patterns.extend(keys(patterns));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.channels.is_empty() && self.patterns.is_empty()
    }
}

/// Snapshot of one registry for monitoring.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct SubscriptionInfo {
    pub id: SubscriptionId,
    pub alive: bool,
    /// Sorted.
    pub channels: Vec<ByteKey>,
    /// Sorted.
    pub patterns: Vec<ByteKey>,
}
