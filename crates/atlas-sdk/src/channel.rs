//! High-level channel participant.

use std::sync::Arc;

use log::info;
use uuid::Uuid;

use crate::adapters::{ChannelAdapter, ChannelCallbacks};
use crate::bus::EventBus;
use crate::bus::handlers::JsonPayload;
use crate::config::SdkConfig;
use crate::error::SdkResult;
use crate::shutdown;

/// A channel is a single source of communication with the server, created
/// for one user: a terminal, a voice input, a web app.
///
/// Build one with the callbacks it cares about; anything left out defaults
/// to a log-only handler:
///
/// ```no_run
/// # async fn demo() -> atlas_sdk::SdkResult<()> {
/// use atlas_sdk::{Channel, EventBus};
///
/// let channel = Channel::builder("term-1")
///     .user_id("1337")
///     .on_answer(|data| println!("atlas says {data:?}"))
///     .build(EventBus::loopback());
///
/// channel.parse("what's the weather like?");
/// channel.run().await
/// # }
/// ```
pub struct Channel {
    bus: EventBus,
    adapter: Arc<ChannelAdapter>,
}

impl Channel {
    pub fn builder(id: impl Into<String>) -> ChannelBuilder {
        ChannelBuilder {
            id: id.into(),
            user_id: None,
            callbacks: ChannelCallbacks::default(),
        }
    }

    /// Start a builder from a loaded config file's `channel:` section. A
    /// missing id is generated, since it only has to be unique.
    pub fn builder_from_config(config: &SdkConfig) -> ChannelBuilder {
        let section = config.channel.clone().unwrap_or_default();
        let id = section
            .id
            .unwrap_or_else(|| Uuid::new_v4().to_string());
        ChannelBuilder {
            id,
            user_id: section.user_id,
            callbacks: ChannelCallbacks::default(),
        }
    }

    /// Submit raw user text for parsing.
    pub fn parse(&self, message: &str) {
        self.adapter.parse(message);
    }

    /// Re-announce the channel to the server.
    pub fn create(&self) {
        self.adapter.create();
    }

    /// Tell the server to drop this channel's session.
    pub fn destroy(&self) {
        self.adapter.destroy();
    }

    /// The protocol adapter underneath.
    pub fn adapter(&self) -> Arc<ChannelAdapter> {
        Arc::clone(&self.adapter)
    }

    pub fn bus(&self) -> &EventBus {
        &self.bus
    }

    /// Run in the foreground until interrupted: activate, connect, wait for
    /// ctrl-c, then tear down, announcing the departure to the server.
    pub async fn run(&self) -> SdkResult<()> {
        self.adapter.activate();
        self.bus.start().await?;
        info!("channel {} running", self.adapter.channel_id());

        shutdown::wait_for_signal().await;

        self.adapter.deactivate(true);
        self.bus.stop().await;
        Ok(())
    }
}

/// Builder producing an immutable [`Channel`] callback configuration.
pub struct ChannelBuilder {
    id: String,
    user_id: Option<String>,
    callbacks: ChannelCallbacks,
}

impl ChannelBuilder {
    pub fn user_id(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = Some(user_id.into());
        self
    }

    /// Called when a skill asks the user for input.
    pub fn on_ask<F>(mut self, callback: F) -> Self
    where
        F: Fn(JsonPayload) + Send + Sync + 'static,
    {
        self.callbacks.on_ask = Arc::new(callback);
        self
    }

    /// Called when a skill answers the user.
    pub fn on_answer<F>(mut self, callback: F) -> Self
    where
        F: Fn(JsonPayload) + Send + Sync + 'static,
    {
        self.callbacks.on_answer = Arc::new(callback);
        self
    }

    /// Called when the server acknowledges the channel's creation.
    pub fn on_created<F>(mut self, callback: F) -> Self
    where
        F: Fn(JsonPayload) + Send + Sync + 'static,
    {
        self.callbacks.on_created = Arc::new(callback);
        self
    }

    /// Called when the current session ends.
    pub fn on_end<F>(mut self, callback: F) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.callbacks.on_end = Arc::new(callback);
        self
    }

    /// Called when a skill starts working on a request.
    pub fn on_work<F>(mut self, callback: F) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.callbacks.on_work = Arc::new(callback);
        self
    }

    /// Called when the server destroys the channel's session.
    pub fn on_destroyed<F>(mut self, callback: F) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.callbacks.on_destroyed = Arc::new(callback);
        self
    }

    pub fn build(self, bus: EventBus) -> Channel {
        let adapter = ChannelAdapter::new(bus.clone(), self.id, self.user_id, self.callbacks);
        Channel { bus, adapter }
    }
}
