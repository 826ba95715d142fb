//! MQTT transport.
//!
//! One broker connection per transport, driven by a single event-loop task,
//! which is what serializes dispatch: every inbound publish is fully handled
//! before the next one is polled. Outbound calls go through the client's
//! non-blocking queue, so the dispatch path never waits on the network.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use log::{debug, info, warn};
use rumqttc::{AsyncClient, Event, EventLoop, MqttOptions, Packet, QoS};
use uuid::Uuid;

use crate::bus::{CONNECTED_TOPIC, DISCONNECTED_TOPIC, Inbound};
use crate::config::BrokerConfig;
use crate::error::{SdkError, SdkResult};
use crate::sync::lock;
use crate::transport::Transport;

const KEEP_ALIVE: Duration = Duration::from_secs(30);
const RECONNECT_DELAY: Duration = Duration::from_secs(1);

/// Outbound request queue size for the MQTT client.
const REQUEST_BUFFER_SIZE: usize = 64;

pub struct MqttTransport {
    broker: BrokerConfig,
    inbound: Inbound,
    shared: Arc<Shared>,
}

struct Shared {
    /// Present while a connection cycle is live; replaced on every connect.
    client: Mutex<Option<AsyncClient>>,
    connected: AtomicBool,
    stopping: AtomicBool,
}

impl MqttTransport {
    pub fn new(broker: BrokerConfig, inbound: Inbound) -> Self {
        Self {
            broker,
            inbound,
            shared: Arc::new(Shared {
                client: Mutex::new(None),
                connected: AtomicBool::new(false),
                stopping: AtomicBool::new(false),
            }),
        }
    }

    fn client_id(&self) -> String {
        self.broker.client_id.clone().unwrap_or_else(|| {
            let suffix = Uuid::new_v4().simple().to_string();
            format!("atlas-{}", &suffix[..12])
        })
    }
}

#[async_trait]
impl Transport for MqttTransport {
    async fn connect(&self) -> SdkResult<()> {
        let endpoint = format!("{}:{}", self.broker.host, self.broker.port);
        let mut options = MqttOptions::new(self.client_id(), &self.broker.host, self.broker.port);
        options.set_keep_alive(KEEP_ALIVE);
        if let (Some(username), Some(password)) =
            (self.broker.username.as_ref(), self.broker.password.as_ref())
        {
            options.set_credentials(username, password);
        }

        let (client, mut eventloop) = AsyncClient::new(options, REQUEST_BUFFER_SIZE);

        // Drive the handshake inline so an unreachable broker fails the
        // caller instead of a background task.
        loop {
            match eventloop.poll().await {
                Ok(Event::Incoming(Packet::ConnAck(_))) => break,
                Ok(_) => continue,
                Err(err) => {
                    return Err(SdkError::ConnectFailed {
                        endpoint,
                        message: err.to_string(),
                    });
                }
            }
        }

        self.shared.stopping.store(false, Ordering::SeqCst);
        *lock(&self.shared.client) = Some(client.clone());
        restore_subscriptions(&client, &self.inbound);
        self.shared.connected.store(true, Ordering::SeqCst);
        info!("connected to broker at {endpoint}");
        self.inbound.dispatch(CONNECTED_TOPIC, None);

        let shared = Arc::clone(&self.shared);
        let inbound = self.inbound.clone();
        tokio::spawn(drive(eventloop, client, shared, inbound));
        Ok(())
    }

    async fn disconnect(&self) -> SdkResult<()> {
        self.shared.stopping.store(true, Ordering::SeqCst);
        if let Some(client) = lock(&self.shared.client).take() {
            if let Err(err) = client.try_disconnect() {
                warn!("error while disconnecting from broker: {err}");
            }
        }
        if self.shared.connected.swap(false, Ordering::SeqCst) {
            info!("disconnected from broker");
            self.inbound.dispatch(DISCONNECTED_TOPIC, None);
        }
        Ok(())
    }

    fn publish(&self, topic: &str, payload: Option<Bytes>) {
        let guard = lock(&self.shared.client);
        let Some(client) = guard.as_ref() else {
            warn!("dropping publish to {topic}: not connected");
            return;
        };
        let body = payload.map(|bytes| bytes.to_vec()).unwrap_or_default();
        if let Err(err) = client.try_publish(topic, QoS::AtMostOnce, false, body) {
            warn!("could not publish to {topic}: {err}");
        }
    }

    fn subscribe(&self, topic: &str) {
        let guard = lock(&self.shared.client);
        let Some(client) = guard.as_ref() else {
            // Not connected yet; the subscription is restored on CONNACK.
            return;
        };
        if let Err(err) = client.try_subscribe(topic, QoS::AtMostOnce) {
            warn!("could not subscribe to {topic}: {err}");
        }
    }

    fn unsubscribe(&self, topic: &str) {
        let guard = lock(&self.shared.client);
        let Some(client) = guard.as_ref() else {
            return;
        };
        if let Err(err) = client.try_unsubscribe(topic) {
            warn!("could not unsubscribe from {topic}: {err}");
        }
    }
}

/// Re-establish every registered non-lifecycle subscription. Runs before the
/// local `connected` signal on every (re)connect.
fn restore_subscriptions(client: &AsyncClient, inbound: &Inbound) {
    for topic in inbound.topics() {
        debug!("subscribing to {topic}");
        if let Err(err) = client.try_subscribe(&topic, QoS::AtMostOnce) {
            warn!("could not subscribe to {topic}: {err}");
        }
    }
}

async fn drive(mut eventloop: EventLoop, client: AsyncClient, shared: Arc<Shared>, inbound: Inbound) {
    loop {
        match eventloop.poll().await {
            Ok(Event::Incoming(Packet::Publish(publish))) => {
                inbound.dispatch(&publish.topic, Some(publish.payload.as_ref()));
            }
            Ok(Event::Incoming(Packet::ConnAck(_))) => {
                restore_subscriptions(&client, &inbound);
                shared.connected.store(true, Ordering::SeqCst);
                info!("reconnected to broker");
                inbound.dispatch(CONNECTED_TOPIC, None);
            }
            Ok(_) => {}
            Err(err) => {
                if shared.stopping.load(Ordering::SeqCst) {
                    debug!("mqtt event loop stopped");
                    break;
                }
                if shared.connected.swap(false, Ordering::SeqCst) {
                    warn!("connection to broker lost: {err}");
                    inbound.dispatch(DISCONNECTED_TOPIC, None);
                }
                tokio::time::sleep(RECONNECT_DELAY).await;
            }
        }
    }
}
