//! Topic name table for the atlas dialog protocol.
//!
//! Topics come in two flavors: *global* topics shared by every participant of
//! a role (discovery, the skill-facing dialog verbs) and *addressed* topics
//! built by substituting a participant identifier into a template. Addressed
//! naming is what keeps participants sharing one connection from stepping on
//! each other: two channels never collide because their ids differ.

// Discovery related topics

pub const DISCOVERY_PING: &str = "atlas/discovery/ping";
pub const DISCOVERY_PONG: &str = "atlas/discovery/pong";

// Dialog related topics, skill-facing. These are global: the server
// multiplexes conversations through them, so correlation rides in the
// payload (`keys::CONVERSATION_ID`), not in the topic name.

pub const DIALOG_ASK: &str = "atlas/dialog/ask";
pub const DIALOG_ANSWER: &str = "atlas/dialog/answer";
pub const DIALOG_END: &str = "atlas/dialog/end";

/// Topic on which a recognized intent is delivered to its skill.
pub fn intent(name: &str) -> String {
    format!("atlas/intents/{name}")
}

/// Topic on which a channel submits raw user text for parsing.
pub fn dialog_parse(channel_id: &str) -> String {
    format!("atlas/{channel_id}/dialog/parse")
}

// Channel related topics, one set per channel id.

pub fn channel_ask(channel_id: &str) -> String {
    format!("atlas/{channel_id}/channel/ask")
}

pub fn channel_answer(channel_id: &str) -> String {
    format!("atlas/{channel_id}/channel/answer")
}

pub fn channel_work(channel_id: &str) -> String {
    format!("atlas/{channel_id}/channel/work")
}

pub fn channel_end(channel_id: &str) -> String {
    format!("atlas/{channel_id}/channel/end")
}

pub fn channel_create(channel_id: &str) -> String {
    format!("atlas/{channel_id}/channel/create")
}

pub fn channel_created(channel_id: &str) -> String {
    format!("atlas/{channel_id}/channel/created")
}

pub fn channel_destroy(channel_id: &str) -> String {
    format!("atlas/{channel_id}/channel/destroy")
}

pub fn channel_destroyed(channel_id: &str) -> String {
    format!("atlas/{channel_id}/channel/destroyed")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn addressed_topics_are_stable_per_id() {
        assert_eq!(channel_ask("term"), channel_ask("term"));
        assert_eq!(channel_ask("term"), "atlas/term/channel/ask");
    }

    #[test]
    fn addressed_topics_never_collide_across_ids() {
        assert_ne!(channel_create("a"), channel_create("b"));
        assert_ne!(dialog_parse("a"), dialog_parse("b"));
        assert_ne!(intent("greet"), intent("weather"));
    }
}
