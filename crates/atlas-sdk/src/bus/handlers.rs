//! Payload decoding for subscribed handlers.
//!
//! Every subscription fixes its own decoding mode at registration time:
//! `empty` handlers take no data, `raw` handlers get the undecoded payload as
//! text, `json` handlers get the payload parsed into a key/value map. A
//! malformed JSON payload degrades to an empty map plus a warning; one bad
//! message must never halt dispatch for the other handlers on the topic.

use log::warn;
use serde_json::{Map, Value};

/// Decoded structured payload handed to `json` handlers.
pub type JsonPayload = Map<String, Value>;

/// A subscribed callback together with its decoding mode.
pub enum Handler {
    Empty(Box<dyn Fn() + Send + Sync>),
    Raw(Box<dyn Fn(&str) + Send + Sync>),
    Json(Box<dyn Fn(JsonPayload) + Send + Sync>),
}

/// Wrap a callback that takes no payload.
pub fn empty<F>(f: F) -> Handler
where
    F: Fn() + Send + Sync + 'static,
{
    Handler::Empty(Box::new(f))
}

/// Wrap a callback that takes the payload as undecoded text.
pub fn raw<F>(f: F) -> Handler
where
    F: Fn(&str) + Send + Sync + 'static,
{
    Handler::Raw(Box::new(f))
}

/// Wrap a callback that takes the payload parsed as a JSON object.
pub fn json<F>(f: F) -> Handler
where
    F: Fn(JsonPayload) + Send + Sync + 'static,
{
    Handler::Json(Box::new(f))
}

impl Handler {
    pub(crate) fn invoke(&self, topic: &str, payload: Option<&[u8]>) {
        match self {
            Handler::Empty(f) => f(),
            Handler::Raw(f) => {
                let text = payload
                    .map(String::from_utf8_lossy)
                    .unwrap_or_default();
                f(&text);
            }
            Handler::Json(f) => f(decode_json(topic, payload)),
        }
    }
}

fn decode_json(topic: &str, payload: Option<&[u8]>) -> JsonPayload {
    let Some(bytes) = payload else {
        warn!("empty payload on {topic} where a JSON object was expected");
        return JsonPayload::new();
    };

    match serde_json::from_slice::<Value>(bytes) {
        Ok(Value::Object(map)) => map,
        Ok(other) => {
            warn!("payload on {topic} is JSON but not an object: {other}");
            JsonPayload::new()
        }
        Err(err) => {
            warn!(
                "could not decode payload on {topic}: {err} ({})",
                String::from_utf8_lossy(bytes)
            );
            JsonPayload::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn json_handler_receives_decoded_map() {
        let seen = std::sync::Arc::new(Mutex::new(None));
        let seen_in = seen.clone();
        let handler = json(move |data| {
            *seen_in.lock().unwrap() = Some(data);
        });

        handler.invoke("event1", Some(br#"{ "location": "Paris" }"#.as_slice()));

        let data = seen.lock().unwrap().take().unwrap();
        assert_eq!(data.get("location").and_then(Value::as_str), Some("Paris"));
    }

    #[test]
    fn json_handler_degrades_to_empty_map_on_garbage() {
        let calls = std::sync::Arc::new(AtomicUsize::new(0));
        let calls_in = calls.clone();
        let handler = json(move |data| {
            assert!(data.is_empty());
            calls_in.fetch_add(1, Ordering::SeqCst);
        });

        handler.invoke("event1", Some(b"{ not json".as_slice()));
        handler.invoke("event1", Some(b"42".as_slice()));
        handler.invoke("event1", None);

        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn raw_handler_receives_payload_text() {
        let seen = std::sync::Arc::new(Mutex::new(String::new()));
        let seen_in = seen.clone();
        let handler = raw(move |text| {
            seen_in.lock().unwrap().push_str(text);
        });

        handler.invoke("event1", Some(b"raw value".as_slice()));
        assert_eq!(*seen.lock().unwrap(), "raw value");
    }

    #[test]
    fn empty_handler_ignores_any_payload() {
        let calls = std::sync::Arc::new(AtomicUsize::new(0));
        let calls_in = calls.clone();
        let handler = empty(move || {
            calls_in.fetch_add(1, Ordering::SeqCst);
        });

        handler.invoke("event1", Some(b"raw value".as_slice()));
        handler.invoke("event1", None);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }
}
