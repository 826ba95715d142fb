//! Skill-side protocol adapter.

use std::collections::{BTreeSet, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use bytes::Bytes;
use log::{debug, warn};

use atlas_protocol::{SkillDescriptor, envelope, topics};

use crate::bus::handlers::{self, JsonPayload};
use crate::bus::{CONNECTED_TOPIC, EventBus, HandlerId};
use crate::message::IntentMessage;
use crate::sync::lock;

/// One skill's view of the bus: answers discovery pings with the skill
/// descriptor, routes recognized intents to their handlers, and publishes
/// dialog replies tagged with their conversation id.
pub struct SkillAdapter {
    bus: EventBus,
    descriptor: Mutex<SkillDescriptor>,
    /// Intents with a user handler; their topics are subscribed as soon as
    /// `handle` is called.
    handled: Mutex<HashSet<String>>,
    /// Subscriptions made by `activate`, undone by `deactivate`.
    activation: Mutex<Vec<(String, HandlerId)>>,
    active: AtomicBool,
}

impl SkillAdapter {
    pub fn new(bus: EventBus, descriptor: SkillDescriptor) -> Arc<Self> {
        Arc::new(Self {
            bus,
            descriptor: Mutex::new(descriptor),
            handled: Mutex::new(HashSet::new()),
            activation: Mutex::new(Vec::new()),
            active: AtomicBool::new(false),
        })
    }

    /// Snapshot of the descriptor, including intents inserted by `handle`.
    pub fn descriptor(&self) -> SkillDescriptor {
        lock(&self.descriptor).clone()
    }

    /// Register a handler for an intent.
    ///
    /// An intent the descriptor never declared is inserted with no slots and
    /// a warning; a half-declared skill keeps working for the intents it
    /// did wire up.
    pub fn handle<F>(&self, intent: &str, callback: F)
    where
        F: Fn(IntentMessage) + Send + Sync + 'static,
    {
        {
            let mut descriptor = lock(&self.descriptor);
            if !descriptor.intents.contains_key(intent) {
                warn!("registering a handler for undeclared intent {intent}");
                descriptor.declare_intent(intent, None);
            }
        }

        let topic = topics::intent(intent);

        // Replace the placeholder binding if activation installed one.
        let mut activation = lock(&self.activation);
        if let Some(position) = activation.iter().position(|(t, _)| *t == topic) {
            let (_, id) = activation.remove(position);
            self.bus.unsubscribe_handler(&topic, id);
        }
        drop(activation);

        lock(&self.handled).insert(intent.to_string());
        self.bus.subscribe(
            &topic,
            handlers::json(move |data| callback(IntentMessage::new(data))),
        );
    }

    /// Publish the discovery descriptor. Called on every received ping and
    /// on (re)connect; the payload is rebuilt fresh each time.
    pub fn pong(&self) {
        debug!("answering discovery ping");
        let payload = lock(&self.descriptor).to_pong_payload();
        self.bus
            .publish(topics::DISCOVERY_PONG, Some(Bytes::from(payload)));
    }

    /// Ask the user for more input within a conversation.
    pub fn ask(&self, conversation_id: &str, payload: JsonPayload) {
        self.publish_dialog(topics::DIALOG_ASK, conversation_id, payload);
    }

    /// Answer the user within a conversation.
    pub fn answer(&self, conversation_id: &str, payload: JsonPayload) {
        self.publish_dialog(topics::DIALOG_ANSWER, conversation_id, payload);
    }

    /// Terminate a conversation.
    pub fn end(&self, conversation_id: &str, payload: JsonPayload) {
        self.publish_dialog(topics::DIALOG_END, conversation_id, payload);
    }

    /// Wire up discovery and the declared intents.
    pub fn activate(self: &Arc<Self>) {
        if self.active.swap(true, Ordering::SeqCst) {
            debug!("skill adapter already active");
            return;
        }
        debug!("activating skill adapter");

        let mut activation = Vec::new();

        let me = Arc::clone(self);
        activation.push((
            CONNECTED_TOPIC.to_string(),
            self.bus
                .subscribe(CONNECTED_TOPIC, handlers::empty(move || me.pong())),
        ));

        let me = Arc::clone(self);
        activation.push((
            topics::DISCOVERY_PING.to_string(),
            self.bus
                .subscribe(topics::DISCOVERY_PING, handlers::json(move |_| me.pong())),
        ));

        // Declared intents nobody handled yet get a log-only binding so a
        // partially-configured skill stays observable instead of crashing.
        let declared: Vec<String> = lock(&self.descriptor).intents.keys().cloned().collect();
        let handled = lock(&self.handled);
        for intent in declared {
            if handled.contains(&intent) {
                continue;
            }
            let topic = topics::intent(&intent);
            let name = intent.clone();
            let id = self.bus.subscribe(
                &topic,
                handlers::json(move |_| warn!("no handler configured for intent {name}")),
            );
            activation.push((topic, id));
        }
        drop(handled);

        *lock(&self.activation) = activation;
    }

    /// Undo everything `activate` and `handle` subscribed, including intent
    /// topics that never got an explicit handler.
    pub fn deactivate(&self) {
        if !self.active.swap(false, Ordering::SeqCst) {
            debug!("skill adapter already inactive");
            return;
        }
        debug!("deactivating skill adapter");

        let mut intent_topics = BTreeSet::new();
        for (topic, id) in lock(&self.activation).drain(..) {
            if topic == CONNECTED_TOPIC || topic == topics::DISCOVERY_PING {
                // Shared topics: remove only this adapter's registration so
                // co-located participants keep theirs.
                self.bus.unsubscribe_handler(&topic, id);
            } else {
                intent_topics.insert(topic);
            }
        }
        for intent in lock(&self.handled).drain() {
            intent_topics.insert(topics::intent(&intent));
        }
        for topic in intent_topics {
            self.bus.unsubscribe(&topic);
        }
    }

    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }

    fn publish_dialog(&self, topic: &str, conversation_id: &str, payload: JsonPayload) {
        let body = envelope::correlated(conversation_id, payload);
        self.bus.publish(topic, Some(Bytes::from(body)));
    }
}
