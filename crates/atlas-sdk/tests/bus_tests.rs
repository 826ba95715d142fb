//! Event bus integration tests: shared-connection reference counting,
//! lifecycle-topic locality and payload decoding through the dispatch path.

use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use atlas_sdk::EventBus;
use atlas_sdk::bus::{CONNECTED_TOPIC, handlers};

mod common;
use common::{UnreachableTransport, recording_bus};

/// Two participants sharing one transport: the second start joins the
/// existing connection and re-emits `connected` locally; the real disconnect
/// happens on the last stop.
#[tokio::test]
async fn shared_start_stop_reference_counting() {
    let (bus, transport) = recording_bus();

    let connected_emissions = Arc::new(AtomicUsize::new(0));
    let counter = connected_emissions.clone();
    bus.subscribe(
        CONNECTED_TOPIC,
        handlers::empty(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        }),
    );

    bus.start().await.unwrap();
    assert!(bus.is_started());
    assert_eq!(transport.connects.load(Ordering::SeqCst), 1);
    assert_eq!(connected_emissions.load(Ordering::SeqCst), 1);

    // Second participant joins: no re-dial, but its connection hook fires.
    bus.start().await.unwrap();
    assert_eq!(transport.connects.load(Ordering::SeqCst), 1);
    assert_eq!(connected_emissions.load(Ordering::SeqCst), 2);

    bus.stop().await;
    assert_eq!(transport.disconnects.load(Ordering::SeqCst), 0);
    assert!(bus.is_started());

    bus.stop().await;
    assert_eq!(transport.disconnects.load(Ordering::SeqCst), 1);
    assert!(!bus.is_started());
}

/// An unreachable broker is fatal on the first start and rolls the use count
/// back, so a retry dials again instead of pretending to be connected.
#[tokio::test]
async fn failed_first_connect_is_fatal_and_rolls_back() {
    let bus = EventBus::new();
    let transport = Arc::new(UnreachableTransport::new());
    bus.bind(transport.clone());

    assert!(bus.start().await.is_err());
    assert!(!bus.is_started());
    assert_eq!(transport.attempts.load(Ordering::SeqCst), 1);

    // The failed start left no phantom user behind.
    assert!(bus.start().await.is_err());
    assert_eq!(transport.attempts.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn starting_without_a_transport_is_an_error() {
    let bus = EventBus::new();
    assert!(bus.start().await.is_err());
    assert!(!bus.is_started());
}

/// Lifecycle topics never reach the transport; ordinary topics do.
#[test]
fn lifecycle_publishes_stay_local() {
    let (bus, transport) = recording_bus();

    bus.publish(CONNECTED_TOPIC, None);
    bus.publish("atlas/discovery/pong", Some(b"{}".to_vec().into()));

    let published = transport.published();
    assert_eq!(published.len(), 1);
    assert_eq!(published[0].0, "atlas/discovery/pong");
}

/// Structured decoding through the full dispatch path: a valid object
/// reaches the handler as a map, garbage degrades to an empty map, and
/// neither interrupts delivery to the handlers after it.
#[test]
fn json_decoding_degrades_without_halting_dispatch() {
    let (bus, _transport) = recording_bus();

    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = seen.clone();
    bus.subscribe(
        "event1",
        handlers::json(move |data| {
            sink.lock().unwrap().push(data);
        }),
    );
    let tail_calls = Arc::new(AtomicUsize::new(0));
    let tail = tail_calls.clone();
    bus.subscribe(
        "event1",
        handlers::empty(move || {
            tail.fetch_add(1, Ordering::SeqCst);
        }),
    );

    bus.dispatch("event1", Some(br#"{"location":"Paris"}"#.as_slice()));
    bus.dispatch("event1", Some(b"definitely not json".as_slice()));

    let seen = seen.lock().unwrap();
    assert_eq!(seen.len(), 2);
    assert_eq!(
        seen[0].get("location").and_then(serde_json::Value::as_str),
        Some("Paris")
    );
    assert!(seen[1].is_empty());
    assert_eq!(tail_calls.load(Ordering::SeqCst), 2);
}

/// Dispatching a topic nobody subscribed is silently dropped.
#[test]
fn unknown_topics_are_dropped_silently() {
    let (bus, _transport) = recording_bus();
    bus.dispatch("atlas/unclaimed/topic", Some(b"{}".as_slice()));
}
