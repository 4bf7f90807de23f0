//! Pool configuration.

/// How subscriptions use the physical connection.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum ConnectionMode {
    /// One subscriber owns the connection; every call goes to the wire.
    Exclusive,
    /// Subscribers share the connection; wire calls happen only when a
    /// channel or pattern gains its first or loses its last subscriber.
    #[default]
    Multiplexed,
}

/// Configuration for a subscriber pool.
#[derive(Clone, Debug, Default)]
pub struct PoolConfig {
    /// Default: multiplexed.
    pub mode: ConnectionMode,
}

impl PoolConfig {
    pub fn exclusive() -> Self {
        Self {
            mode: ConnectionMode::Exclusive,
        }
    }

    pub fn multiplexed() -> Self {
        Self {
            mode: ConnectionMode::Multiplexed,
        }
    }
}
