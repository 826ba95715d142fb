//! High-level skill participant.

use std::sync::Arc;

use log::info;

use atlas_protocol::SkillDescriptor;

use crate::adapters::SkillAdapter;
use crate::bus::EventBus;
use crate::config::SdkConfig;
use crate::error::{SdkError, SdkResult};
use crate::message::IntentMessage;
use crate::shutdown;

/// A skill executes actions based on intents recognized by the server.
///
/// Declare the intents in the descriptor (or a config file), register a
/// handler per intent, and [`run`](Skill::run) the skill in the foreground:
///
/// ```no_run
/// # async fn demo() -> atlas_sdk::SdkResult<()> {
/// use atlas_sdk::{EventBus, Skill};
/// use atlas_sdk::protocol::SkillDescriptor;
///
/// let mut descriptor = SkillDescriptor::new("greeter", "1.0.0");
/// descriptor.declare_intent("greet", Some(vec!["name".to_string()]));
///
/// let skill = Skill::new(EventBus::loopback(), descriptor);
/// skill.handle("greet", |message| {
///     println!("greeting {:?}", message.slot_str("name"));
/// });
/// skill.run().await
/// # }
/// ```
pub struct Skill {
    bus: EventBus,
    adapter: Arc<SkillAdapter>,
}

impl Skill {
    pub fn new(bus: EventBus, descriptor: SkillDescriptor) -> Self {
        let adapter = SkillAdapter::new(bus.clone(), descriptor);
        Self { bus, adapter }
    }

    /// Build a skill from a loaded config file: the descriptor comes from the
    /// `skill:` section, the bus from `messaging:`.
    pub fn from_config(config: &SdkConfig) -> SdkResult<Self> {
        let descriptor = config
            .skill
            .clone()
            .ok_or(SdkError::MissingConfig("skill"))?;
        let bus = EventBus::from_config(&config.messaging);
        Ok(Self::new(bus, descriptor))
    }

    /// Register a handler for an intent. See [`SkillAdapter::handle`].
    pub fn handle<F>(&self, intent: &str, callback: F)
    where
        F: Fn(IntentMessage) + Send + Sync + 'static,
    {
        self.adapter.handle(intent, callback);
    }

    /// The protocol adapter, for publishing replies from handlers.
    pub fn adapter(&self) -> Arc<SkillAdapter> {
        Arc::clone(&self.adapter)
    }

    pub fn bus(&self) -> &EventBus {
        &self.bus
    }

    /// Run in the foreground until interrupted: activate, connect, wait for
    /// ctrl-c, then tear down cleanly.
    pub async fn run(&self) -> SdkResult<()> {
        let name = self.adapter.descriptor().name;
        self.adapter.activate();
        self.bus.start().await?;
        info!("skill {name} running");

        shutdown::wait_for_signal().await;

        self.adapter.deactivate();
        self.bus.stop().await;
        Ok(())
    }
}
