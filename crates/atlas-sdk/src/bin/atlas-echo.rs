//! Echo skill: answers every `echo` intent with the message slot it got.
//!
//! Mostly a wiring demonstration: config file, CLI overrides, one intent
//! handler, foreground run.

use std::io::{self, Write};

use anyhow::Result;
use clap::Parser;
use log::warn;
use serde_json::Value;

use atlas_sdk::bus::handlers::JsonPayload;
use atlas_sdk::cli::BrokerArgs;
use atlas_sdk::protocol::SkillDescriptor;
use atlas_sdk::{EventBus, Skill};

#[derive(Debug, Parser)]
#[command(author, version, about = "Atlas echo skill")]
struct Cli {
    #[command(flatten)]
    broker: BrokerArgs,
}

fn main() {
    if let Err(err) = try_main() {
        let _ = writeln!(io::stderr(), "{err:?}");
        std::process::exit(1);
    }
}

#[tokio::main]
async fn try_main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let config = cli.broker.load_config()?;

    let descriptor = config.skill.clone().unwrap_or_else(|| {
        let mut descriptor = SkillDescriptor::new("echo", env!("CARGO_PKG_VERSION"));
        descriptor.declare_intent("echo", Some(vec!["message".to_string()]));
        descriptor
    });

    let skill = Skill::new(EventBus::from_config(&config.messaging), descriptor);

    let adapter = skill.adapter();
    skill.handle("echo", move |message| {
        let Some(conversation_id) = message.conversation_id() else {
            warn!("echo intent without a conversation id, dropping");
            return;
        };
        let text = message.slot_str("message").unwrap_or("nothing to echo");

        let mut payload = JsonPayload::new();
        payload.insert("text".to_string(), Value::String(text.to_string()));
        adapter.answer(conversation_id, payload);
    });

    skill.run().await?;
    Ok(())
}
