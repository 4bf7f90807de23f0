//! # Subscription Multiplexing
//!
//! Client-side bookkeeping that lets many independent pub/sub subscribers
//! share a few physical connections to a message-oriented key-value store.
//!
//! ## Core Concepts
//!
//! - **ByteKey**: Raw channel or pattern bytes usable as a map key
//! - **Tracker**: Reference counts per channel/pattern on one connection
//! - **Subscription**: One subscriber's interest set and close lifecycle
//! - **Pool**: Opens subscriptions over a shared connection
//!
//! ## Example
//!
//! ```ignore
//! use submux::{InitialInterest, PoolConfig, SubscriberPool};
//!
//! let pool = SubscriberPool::new(Arc::new(connection), PoolConfig::default());
//!
//! // Two subscribers, one wire subscription
//! let alerts = pool.open(alerts_listener, InitialInterest::none())?;
//! let audit = pool.open(audit_listener, InitialInterest::none())?;
//! alerts.subscribe(["orders"])?;
//! audit.subscribe(["orders"])?;
//!
//! // The wire unsubscribe goes out only after both are done
//! alerts.unsubscribe_all()?;
//! audit.unsubscribe_all()?;
//! ```

pub mod error;
pub mod pool;
pub mod subscriptions;
pub mod tracker;
pub mod types;

// Re-exports
pub use error::{Result, SubscriptionError};
pub use pool::{Connection, ConnectionMode, DrainReport, PoolConfig, SubscriberPool};
pub use subscriptions::{InitialInterest, Residual, Subscription, SubscriptionInfo, Transport};
pub use tracker::{SharedTargetTracker, Target, TargetTable, TrackerStats};
pub use types::*;
