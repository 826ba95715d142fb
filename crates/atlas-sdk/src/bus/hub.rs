//! The event bus: topic registry, ordered dispatch and reference-counted
//! connection lifecycle.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, OnceLock, Weak};

use bytes::Bytes;
use dashmap::DashMap;
use log::{debug, warn};
use tokio::sync::Mutex;

use crate::bus::handlers::Handler;
use crate::config::MessagingConfig;
use crate::error::{SdkError, SdkResult};
use crate::transport::{LoopbackTransport, MqttTransport, Transport, TransportKind};

/// Local lifecycle topic fired when the transport connection is up.
pub const CONNECTED_TOPIC: &str = "connected";

/// Local lifecycle topic fired when the transport connection is gone.
pub const DISCONNECTED_TOPIC: &str = "disconnected";

/// Lifecycle topics never touch the network: they are dispatched locally and
/// excluded from the transport's bulk re-subscription on reconnect.
pub fn is_lifecycle(topic: &str) -> bool {
    topic == CONNECTED_TOPIC || topic == DISCONNECTED_TOPIC
}

/// Token identifying one subscription, for identity-based removal.
///
/// The same callback can be registered twice on one topic; each registration
/// gets its own id and is removable on its own.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HandlerId(u64);

struct Registration {
    id: u64,
    handler: Arc<Handler>,
}

impl Clone for Registration {
    fn clone(&self) -> Self {
        Self {
            id: self.id,
            handler: Arc::clone(&self.handler),
        }
    }
}

struct BusInner {
    /// Topic -> registrations, delivered in insertion order.
    handlers: DashMap<String, Vec<Registration>>,
    /// Bound once, before the first start().
    transport: OnceLock<Arc<dyn Transport>>,
    next_id: AtomicU64,
    /// Participants sharing this connection. The physical connect happens at
    /// 0 -> 1, the physical disconnect at 1 -> 0.
    use_count: Mutex<usize>,
    started: AtomicBool,
}

impl BusInner {
    fn dispatch(&self, topic: &str, payload: Option<&[u8]>) {
        let registrations: Vec<Registration> = match self.handlers.get(topic) {
            Some(entry) => entry.value().clone(),
            None => {
                // Participants share a transport, so topics nobody here cares
                // about are expected traffic.
                debug!("no handler registered for {topic}");
                return;
            }
        };

        debug!("dispatching {topic} to {} handler(s)", registrations.len());
        for registration in registrations {
            registration.handler.invoke(topic, payload);
        }
    }
}

/// In-process dispatcher shared by every participant on one connection.
///
/// Cloning is cheap and yields a handle to the same bus. The bus itself does
/// no I/O: subscriptions mutate the registry, publishes forward to the bound
/// [`Transport`], and inbound traffic arrives through [`Inbound`].
#[derive(Clone)]
pub struct EventBus {
    inner: Arc<BusInner>,
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl EventBus {
    /// Create a bus with no transport bound yet.
    pub fn new() -> Self {
        Self {
            inner: Arc::new(BusInner {
                handlers: DashMap::new(),
                transport: OnceLock::new(),
                next_id: AtomicU64::new(1),
                use_count: Mutex::new(0),
                started: AtomicBool::new(false),
            }),
        }
    }

    /// Create a bus bound to an in-process loopback transport.
    pub fn loopback() -> Self {
        let bus = Self::new();
        let transport = Arc::new(LoopbackTransport::new(bus.inbound()));
        bus.bind(transport);
        bus
    }

    /// Create a bus with the transport selected by the messaging config.
    pub fn from_config(messaging: &MessagingConfig) -> Self {
        let bus = Self::new();
        let transport: Arc<dyn Transport> = match messaging.transport {
            TransportKind::Loopback => Arc::new(LoopbackTransport::new(bus.inbound())),
            TransportKind::Mqtt => {
                Arc::new(MqttTransport::new(messaging.broker.clone(), bus.inbound()))
            }
        };
        bus.bind(transport);
        bus
    }

    /// Bind the transport this bus publishes through. Effective once; later
    /// calls are ignored with a warning.
    pub fn bind(&self, transport: Arc<dyn Transport>) {
        if self.inner.transport.set(transport).is_err() {
            warn!("a transport is already bound to this bus");
        }
    }

    /// Handle the transport uses to deliver inbound messages.
    pub fn inbound(&self) -> Inbound {
        Inbound {
            inner: Arc::downgrade(&self.inner),
        }
    }

    /// Register a handler for a topic. Handlers fire in registration order.
    pub fn subscribe(&self, topic: &str, handler: Handler) -> HandlerId {
        debug!("subscribing to {topic}");
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        self.inner
            .handlers
            .entry(topic.to_string())
            .or_default()
            .push(Registration {
                id,
                handler: Arc::new(handler),
            });

        if self.is_started()
            && !is_lifecycle(topic)
            && let Some(transport) = self.inner.transport.get()
        {
            transport.subscribe(topic);
        }
        HandlerId(id)
    }

    /// Remove every handler for a topic. Unknown topics warn and no-op.
    pub fn unsubscribe(&self, topic: &str) {
        debug!("unsubscribing from {topic}");
        if self.inner.handlers.remove(topic).is_none() {
            warn!("trying to unsubscribe from a non-existent topic {topic}");
            return;
        }
        self.transport_unsubscribe(topic);
    }

    /// Remove one registration by identity. Removing the last one drops the
    /// topic entry entirely. An id that is not registered is a silent no-op;
    /// only an unknown topic warns.
    pub fn unsubscribe_handler(&self, topic: &str, id: HandlerId) {
        debug!("unsubscribing one handler from {topic}");
        let Some(mut entry) = self.inner.handlers.get_mut(topic) else {
            warn!("trying to unsubscribe from a non-existent topic {topic}");
            return;
        };
        entry.retain(|registration| registration.id != id.0);
        let now_empty = entry.is_empty();
        drop(entry);

        if now_empty {
            self.inner.handlers.remove_if(topic, |_, regs| regs.is_empty());
            self.transport_unsubscribe(topic);
        }
    }

    /// Publish a payload to a topic. Lifecycle topics are delivered locally
    /// without touching the network; everything else goes to the transport.
    /// Fire-and-forget either way.
    pub fn publish(&self, topic: &str, payload: Option<Bytes>) {
        debug!("publishing to {topic}");
        if is_lifecycle(topic) {
            self.inner.dispatch(topic, payload.as_deref());
            return;
        }

        match self.inner.transport.get() {
            Some(transport) => transport.publish(topic, payload),
            None => warn!("dropping publish to {topic}: no transport bound"),
        }
    }

    /// Deliver an inbound message to every handler registered for its topic,
    /// in registration order. Unknown topics are dropped with a debug log,
    /// not an error, since other participants on the connection may own them.
    pub fn dispatch(&self, topic: &str, payload: Option<&[u8]>) {
        self.inner.dispatch(topic, payload);
    }

    /// Start the shared connection, or join it if a co-located participant
    /// already started it.
    ///
    /// The physical connect happens only on the first call; the transport
    /// signals `connected` itself once the connection is usable. Later calls
    /// increment the use count and re-emit `connected` locally so the new
    /// participant still observes its connection hook. A failed first connect
    /// rolls the count back and is fatal.
    pub async fn start(&self) -> SdkResult<()> {
        let mut count = self.inner.use_count.lock().await;
        if *count == 0 {
            let transport = self
                .inner
                .transport
                .get()
                .ok_or(SdkError::TransportUnbound)?;
            self.inner.started.store(true, Ordering::SeqCst);
            if let Err(err) = transport.connect().await {
                self.inner.started.store(false, Ordering::SeqCst);
                return Err(err);
            }
            *count = 1;
        } else {
            *count += 1;
            debug!("transport already connected ({count} users), re-emitting connected");
            drop(count);
            self.inner.dispatch(CONNECTED_TOPIC, None);
        }
        Ok(())
    }

    /// Leave the shared connection; the physical disconnect happens when the
    /// last participant leaves.
    pub async fn stop(&self) {
        let mut count = self.inner.use_count.lock().await;
        match *count {
            0 => warn!("stop called on a bus that was never started"),
            1 => {
                *count = 0;
                self.inner.started.store(false, Ordering::SeqCst);
                if let Some(transport) = self.inner.transport.get() {
                    if let Err(err) = transport.disconnect().await {
                        warn!("error while disconnecting: {err}");
                    }
                }
            }
            _ => {
                *count -= 1;
                debug!("transport still in use by {count} participant(s)");
            }
        }
    }

    pub fn is_started(&self) -> bool {
        self.inner.started.load(Ordering::SeqCst)
    }

    fn transport_unsubscribe(&self, topic: &str) {
        if self.is_started()
            && !is_lifecycle(topic)
            && let Some(transport) = self.inner.transport.get()
        {
            transport.unsubscribe(topic);
        }
    }
}

/// Weak handle a transport uses to push inbound traffic into its bus.
///
/// Holds only a weak reference: the bus owns the transport, so a strong
/// handle here would form a cycle that outlives both.
#[derive(Clone)]
pub struct Inbound {
    inner: Weak<BusInner>,
}

impl Inbound {
    /// Deliver an inbound message. No-op if the bus is gone.
    pub fn dispatch(&self, topic: &str, payload: Option<&[u8]>) {
        if let Some(bus) = self.inner.upgrade() {
            bus.dispatch(topic, payload);
        }
    }

    /// Registered non-lifecycle topics, for bulk re-subscription on
    /// (re)connect.
    pub fn topics(&self) -> Vec<String> {
        let Some(bus) = self.inner.upgrade() else {
            return Vec::new();
        };
        bus.handlers
            .iter()
            .map(|entry| entry.key().clone())
            .filter(|topic| !is_lifecycle(topic))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bus::handlers;
    use std::sync::Mutex as StdMutex;

    fn recording_handler(log: &Arc<StdMutex<Vec<String>>>, tag: &str) -> Handler {
        let log = Arc::clone(log);
        let tag = tag.to_string();
        handlers::raw(move |payload| {
            log.lock().unwrap().push(format!("{tag}:{payload}"));
        })
    }

    #[test]
    fn dispatch_invokes_handlers_in_registration_order() {
        let bus = EventBus::new();
        let log = Arc::new(StdMutex::new(Vec::new()));

        bus.subscribe("event1", recording_handler(&log, "h1"));
        bus.subscribe("event1", recording_handler(&log, "h2"));
        bus.subscribe("event2", recording_handler(&log, "h3"));

        bus.dispatch("event1", Some(b"data1".as_slice()));
        bus.dispatch("event2", Some(b"data2".as_slice()));

        assert_eq!(
            *log.lock().unwrap(),
            vec!["h1:data1", "h2:data1", "h3:data2"]
        );
    }

    #[test]
    fn unsubscribing_one_handler_leaves_the_rest_firing() {
        let bus = EventBus::new();
        let log = Arc::new(StdMutex::new(Vec::new()));

        bus.subscribe("event1", recording_handler(&log, "first"));
        let middle = bus.subscribe("event1", recording_handler(&log, "middle"));
        bus.subscribe("event1", recording_handler(&log, "last"));

        bus.unsubscribe_handler("event1", middle);
        bus.dispatch("event1", Some(b"x".as_slice()));

        assert_eq!(*log.lock().unwrap(), vec!["first:x", "last:x"]);
    }

    #[test]
    fn unsubscribing_a_topic_silences_it_entirely() {
        let bus = EventBus::new();
        let log = Arc::new(StdMutex::new(Vec::new()));

        bus.subscribe("event1", recording_handler(&log, "h1"));
        bus.subscribe("event1", recording_handler(&log, "h2"));
        bus.unsubscribe("event1");

        bus.dispatch("event1", Some(b"x".as_slice()));
        assert!(log.lock().unwrap().is_empty());
    }

    #[test]
    fn removing_the_last_handler_drops_the_topic_entry() {
        let bus = EventBus::new();
        let log = Arc::new(StdMutex::new(Vec::new()));

        let only = bus.subscribe("event1", recording_handler(&log, "h"));
        bus.unsubscribe_handler("event1", only);

        assert!(bus.inner.handlers.get("event1").is_none());
    }

    #[test]
    fn duplicate_registrations_are_independently_removable() {
        let bus = EventBus::new();
        let log = Arc::new(StdMutex::new(Vec::new()));

        let _first = bus.subscribe("event1", recording_handler(&log, "dup"));
        let second = bus.subscribe("event1", recording_handler(&log, "dup"));

        bus.unsubscribe_handler("event1", second);
        bus.dispatch("event1", Some(b"x".as_slice()));

        assert_eq!(*log.lock().unwrap(), vec!["dup:x"]);
    }

    #[test]
    fn unsubscribing_an_unknown_topic_is_a_no_op() {
        let bus = EventBus::new();
        bus.unsubscribe("never-subscribed");
        bus.unsubscribe_handler("never-subscribed", HandlerId(42));
    }

    #[test]
    fn lifecycle_topics_dispatch_locally_without_a_transport() {
        let bus = EventBus::new();
        let log = Arc::new(StdMutex::new(Vec::new()));
        bus.subscribe(CONNECTED_TOPIC, recording_handler(&log, "life"));

        // No transport bound; a lifecycle publish must still deliver.
        bus.publish(CONNECTED_TOPIC, None);
        assert_eq!(*log.lock().unwrap(), vec!["life:"]);
    }

    #[test]
    fn inbound_topics_exclude_lifecycle_entries() {
        let bus = EventBus::new();
        let log = Arc::new(StdMutex::new(Vec::new()));
        bus.subscribe(CONNECTED_TOPIC, recording_handler(&log, "a"));
        bus.subscribe("atlas/intents/echo", recording_handler(&log, "b"));

        let topics = bus.inbound().topics();
        assert_eq!(topics, vec!["atlas/intents/echo".to_string()]);
    }
}
