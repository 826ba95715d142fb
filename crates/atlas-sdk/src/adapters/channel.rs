//! Channel-side protocol adapter.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use bytes::Bytes;
use chrono::{DateTime, Utc};
use log::{debug, info, warn};
use serde_json::Value;

use atlas_protocol::descriptor::DiscoveryPing;
use atlas_protocol::{keys, topics};

use crate::bus::handlers::{self, JsonPayload};
use crate::bus::{CONNECTED_TOPIC, EventBus, HandlerId};
use crate::sync::lock;

/// Callback taking a decoded JSON payload.
pub type JsonCallback = Arc<dyn Fn(JsonPayload) + Send + Sync>;

/// Callback taking no payload.
pub type EmptyCallback = Arc<dyn Fn() + Send + Sync>;

/// The server-driven events a channel can react to.
///
/// Every callback defaults to a log-only no-op, so a channel that only wires
/// up the events it cares about stays operable for those.
#[derive(Clone)]
pub struct ChannelCallbacks {
    /// A skill asks the user for input.
    pub on_ask: JsonCallback,
    /// A skill answers the user.
    pub on_answer: JsonCallback,
    /// The server acknowledged this channel's creation.
    pub on_created: JsonCallback,
    /// The current session ended.
    pub on_end: EmptyCallback,
    /// A skill started working on a request.
    pub on_work: EmptyCallback,
    /// The server destroyed this channel's session.
    pub on_destroyed: EmptyCallback,
}

impl Default for ChannelCallbacks {
    fn default() -> Self {
        Self {
            on_ask: unset_json("ask"),
            on_answer: unset_json("answer"),
            on_created: unset_json("created"),
            on_end: unset_empty("end"),
            on_work: unset_empty("work"),
            on_destroyed: unset_empty("destroyed"),
        }
    }
}

fn unset_json(event: &'static str) -> JsonCallback {
    Arc::new(move |_| warn!("no {event} callback configured"))
}

fn unset_empty(event: &'static str) -> EmptyCallback {
    Arc::new(move || warn!("no {event} callback configured"))
}

/// One channel's view of the bus: owns the remote session for a single user
/// surface, relays the server's dialog events to its callbacks, and
/// re-announces itself when the discovery exchange reveals a server restart.
pub struct ChannelAdapter {
    bus: EventBus,
    channel_id: String,
    user_id: Option<String>,
    callbacks: ChannelCallbacks,
    /// When the create announcement was last sent. `None` until the first
    /// `create`; never cleared by `destroy`.
    created_at: Mutex<Option<DateTime<Utc>>>,
    activation: Mutex<Vec<(String, HandlerId)>>,
    active: AtomicBool,
}

impl ChannelAdapter {
    pub fn new(
        bus: EventBus,
        channel_id: impl Into<String>,
        user_id: Option<String>,
        callbacks: ChannelCallbacks,
    ) -> Arc<Self> {
        Arc::new(Self {
            bus,
            channel_id: channel_id.into(),
            user_id,
            callbacks,
            created_at: Mutex::new(None),
            activation: Mutex::new(Vec::new()),
            active: AtomicBool::new(false),
        })
    }

    pub fn channel_id(&self) -> &str {
        &self.channel_id
    }

    /// When the create announcement was last sent.
    pub fn created_at(&self) -> Option<DateTime<Utc>> {
        *lock(&self.created_at)
    }

    /// Announce this channel to the server so it provisions a session.
    ///
    /// Safe to call again: the timestamp refreshes and the announcement is
    /// simply repeated.
    pub fn create(&self) {
        *lock(&self.created_at) = Some(Utc::now());

        let mut payload = JsonPayload::new();
        payload.insert(
            keys::UID.to_string(),
            self.user_id
                .as_ref()
                .map(|uid| Value::String(uid.clone()))
                .unwrap_or(Value::Null),
        );
        let body = Value::Object(payload).to_string();

        debug!("announcing channel {}", self.channel_id);
        self.bus.publish(
            &topics::channel_create(&self.channel_id),
            Some(Bytes::from(body)),
        );
    }

    /// Tell the server this channel is going away. The remote session is
    /// dropped; local state is left alone since the adapter is usually
    /// discarded right after.
    pub fn destroy(&self) {
        debug!("destroying channel {}", self.channel_id);
        self.bus
            .publish(&topics::channel_destroy(&self.channel_id), None);
    }

    /// Submit raw user text for parsing. The one outbound path that is not
    /// JSON: the message is already plain text.
    pub fn parse(&self, message: &str) {
        self.bus.publish(
            &topics::dialog_parse(&self.channel_id),
            Some(Bytes::copy_from_slice(message.as_bytes())),
        );
    }

    /// Wire up the connection hook, the discovery liveness check and the six
    /// server-driven channel events.
    pub fn activate(self: &Arc<Self>) {
        if self.active.swap(true, Ordering::SeqCst) {
            debug!("channel adapter already active");
            return;
        }
        debug!("activating channel adapter {}", self.channel_id);

        let mut activation = Vec::new();

        // Re-announce on every (re)connect.
        let me = Arc::clone(self);
        activation.push((
            CONNECTED_TOPIC.to_string(),
            self.bus
                .subscribe(CONNECTED_TOPIC, handlers::empty(move || me.create())),
        ));

        let me = Arc::clone(self);
        activation.push((
            topics::DISCOVERY_PING.to_string(),
            self.bus.subscribe(
                topics::DISCOVERY_PING,
                handlers::json(move |data| me.check_still_connected(&data)),
            ),
        ));

        let json_events: [(String, &JsonCallback); 3] = [
            (topics::channel_ask(&self.channel_id), &self.callbacks.on_ask),
            (
                topics::channel_answer(&self.channel_id),
                &self.callbacks.on_answer,
            ),
            (
                topics::channel_created(&self.channel_id),
                &self.callbacks.on_created,
            ),
        ];
        for (topic, callback) in json_events {
            let callback = Arc::clone(callback);
            let id = self
                .bus
                .subscribe(&topic, handlers::json(move |data| callback(data)));
            activation.push((topic, id));
        }

        let empty_events: [(String, &EmptyCallback); 3] = [
            (topics::channel_end(&self.channel_id), &self.callbacks.on_end),
            (
                topics::channel_work(&self.channel_id),
                &self.callbacks.on_work,
            ),
            (
                topics::channel_destroyed(&self.channel_id),
                &self.callbacks.on_destroyed,
            ),
        ];
        for (topic, callback) in empty_events {
            let callback = Arc::clone(callback);
            let id = self.bus.subscribe(&topic, handlers::empty(move || callback()));
            activation.push((topic, id));
        }

        *lock(&self.activation) = activation;
    }

    /// Undo every subscription `activate` made; with `destroy` the server is
    /// told to drop the session before finishing. Each removal is no-op-safe,
    /// so a partial failure can never leave handlers behind.
    pub fn deactivate(&self, destroy: bool) {
        if !self.active.swap(false, Ordering::SeqCst) {
            debug!("channel adapter already inactive");
            return;
        }
        debug!("deactivating channel adapter {}", self.channel_id);

        for (topic, id) in lock(&self.activation).drain(..) {
            if topic == CONNECTED_TOPIC || topic == topics::DISCOVERY_PING {
                // Shared topics: co-located participants keep their own
                // registrations.
                self.bus.unsubscribe_handler(&topic, id);
            } else {
                // Addressed topics belong to this channel alone.
                self.bus.unsubscribe(&topic);
            }
        }

        if destroy {
            self.destroy();
        }
    }

    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }

    /// Discovery-ping liveness check: a server that started after our last
    /// create has no memory of this channel, so announce it again. Pings
    /// without a start timestamp are tolerated and ignored.
    fn check_still_connected(&self, data: &JsonPayload) {
        let Some(server_started) = DiscoveryPing::started_at_from(data) else {
            return;
        };

        let recreate = match *lock(&self.created_at) {
            // Never created: nothing to compare against, announce now.
            None => true,
            Some(created) => server_started > created,
        };

        if recreate {
            info!(
                "recreating channel {}, looks like the server has been restarted",
                self.channel_id
            );
            self.create();
        }
    }
}
