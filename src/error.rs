//! Error types for subscription operations.

use thiserror::Error;

/// Main error type for subscription operations.
#[derive(Debug, Error)]
pub enum SubscriptionError {
    /// The registry already reached its closed state.
    #[error("Subscription is closed")]
    InvalidSubscription,

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// An exclusive connection already serves a live subscription.
    #[error("Connection is already used by a live subscription")]
    ConnectionBusy,

    /// The connection layer rejected a physical (un)subscribe.
    #[error("Transport error: {0}")]
    Transport(String),
}

impl SubscriptionError {
    pub fn transport(msg: impl Into<String>) -> Self {
        SubscriptionError::Transport(msg.into())
    }
}

/// Result type for subscription operations.
pub type Result<T> = std::result::Result<T, SubscriptionError>;
