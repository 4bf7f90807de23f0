//! Error handling and edge case tests.

use std::sync::Arc;
use submux::{
    keys, ByteKey, Connection, InitialInterest, PoolConfig, Result, SubscriberPool,
    SubscriptionError,
};

/// Connection that refuses every subscribe.
struct RefusingConnection;

impl Connection for RefusingConnection {
    fn subscribe(&self, _channels: &[ByteKey]) -> Result<()> {
        Err(SubscriptionError::transport("NOPERM this user has no permissions"))
    }

    fn unsubscribe(&self, _channels: &[ByteKey]) -> Result<()> {
        Ok(())
    }

    fn psubscribe(&self, _patterns: &[ByteKey]) -> Result<()> {
        Err(SubscriptionError::transport("NOPERM this user has no permissions"))
    }

    fn punsubscribe(&self, _patterns: &[ByteKey]) -> Result<()> {
        Ok(())
    }
}

fn refusing_pool() -> SubscriberPool<RefusingConnection> {
    SubscriberPool::new(Arc::new(RefusingConnection), PoolConfig::multiplexed())
}

// --- Argument Errors ---

#[test]
fn test_empty_subscribe_is_rejected() {
    let pool = refusing_pool();
    let sub = pool.open((), InitialInterest::channels(["a"])).unwrap();

    let result = sub.subscribe(Vec::<String>::new());
    assert!(matches!(result, Err(SubscriptionError::InvalidArgument(_))));

    let result = sub.psubscribe(Vec::<String>::new());
    assert!(matches!(result, Err(SubscriptionError::InvalidArgument(_))));

    // Nothing changed
    assert!(sub.is_alive());
    assert_eq!(sub.channels().len(), 1);
    assert!(sub.patterns().is_empty());
}

// --- Lifecycle Errors ---

#[test]
fn test_closed_subscription() {
    let pool = refusing_pool();
    let sub = pool.open((), InitialInterest::patterns(["p*"])).unwrap();
    sub.punsubscribe_all().unwrap();
    assert!(!sub.is_alive());

    assert!(matches!(
        sub.subscribe(["a"]),
        Err(SubscriptionError::InvalidSubscription)
    ));
    assert!(matches!(
        sub.punsubscribe(["p*"]),
        Err(SubscriptionError::InvalidSubscription)
    ));

    // Unsubscribing "everything" from nothing is fine
    assert!(sub.unsubscribe(Vec::<String>::new()).is_ok());
    assert!(sub.punsubscribe_all().is_ok());
}

#[test]
fn test_closed_check_precedes_argument_check() {
    let pool = refusing_pool();
    let sub = pool.open((), InitialInterest::none()).unwrap();
    sub.close();

    assert!(matches!(
        sub.subscribe(Vec::<String>::new()),
        Err(SubscriptionError::InvalidSubscription)
    ));
}

// --- Transport Errors ---

#[test]
fn test_transport_error_propagates_without_state_change() {
    let pool = refusing_pool();
    let sub = pool.open((), InitialInterest::channels(["a"])).unwrap();

    let err = sub.subscribe(["b"]).unwrap_err();
    assert!(matches!(err, SubscriptionError::Transport(_)));
    assert_eq!(err.to_string(), "Transport error: NOPERM this user has no permissions");

    let err = sub.psubscribe(["p*"]).unwrap_err();
    assert!(matches!(err, SubscriptionError::Transport(_)));

    assert_eq!(sub.info().channels, keys(["a"]));
    assert!(sub.patterns().is_empty());
    assert_eq!(pool.tracker().channels().keys(), keys(["a"]));
    assert!(pool.tracker().patterns().is_empty());
}

// --- Edge Cases ---

#[test]
fn test_unsubscribe_unknown_channel_is_silent() {
    let pool = refusing_pool();
    let sub = pool.open((), InitialInterest::channels(["a"])).unwrap();

    sub.unsubscribe(["never-subscribed"]).unwrap();
    assert!(sub.is_alive());
    assert_eq!(pool.tracker().channels().subscriber_count(&"a".into()), 1);
}

#[test]
fn test_empty_key_is_a_valid_channel() {
    let pool = refusing_pool();
    let sub = pool.open((), InitialInterest::channels([""])).unwrap();

    assert!(sub.channels().contains(&ByteKey::from("")));
    sub.unsubscribe([""]).unwrap();
    assert!(!sub.is_alive());
}

#[test]
fn test_exclusive_connection_refuses_second_subscription() {
    let pool = SubscriberPool::new(Arc::new(RefusingConnection), PoolConfig::exclusive());
    let _first = pool.open((), InitialInterest::channels(["a"])).unwrap();

    let err = pool.open((), InitialInterest::channels(["b"])).unwrap_err();
    assert!(matches!(err, SubscriptionError::ConnectionBusy));
    assert_eq!(
        err.to_string(),
        "Connection is already used by a live subscription"
    );
}

#[test]
fn test_error_messages() {
    assert_eq!(
        SubscriptionError::InvalidSubscription.to_string(),
        "Subscription is closed"
    );
    assert_eq!(
        SubscriptionError::InvalidArgument("at least one channel is required".into()).to_string(),
        "Invalid argument: at least one channel is required"
    );
}
