//! Logical subscriptions with an isolated lifecycle.
//!
//! A [`Subscription`] owns the channels and patterns of one subscriber and
//! delegates the physical work to a [`Transport`]:
//! - subscribe/psubscribe add targets, then hand the new ones to the transport
//! - unsubscribe/punsubscribe hand owned targets to the transport, then drop them
//! - once nothing is left the registry closes itself and the transport cleans up
//!
//! The same state machine runs whether the transport owns its connection
//! outright or shares it with other subscriptions through a
//! [`SharedTargetTracker`](crate::tracker::SharedTargetTracker).
//!
//! # Example
//!
//! ```ignore
//! let sub = Subscription::new(id, listener, InitialInterest::channels(["news"]), transport);
//!
//! sub.subscribe(["sports"])?;
//! assert_eq!(sub.channels().len(), 2);
//!
//! // Drop everything; the registry closes itself
//! sub.unsubscribe_all()?;
//! assert!(!sub.is_alive());
//! ```

mod registry;
mod types;

pub use registry::Subscription;
pub(crate) use registry::Revoker;
pub use types::{InitialInterest, Residual, SubscriptionInfo, Transport};
