//! The message value type carried through channels, handlers, and sources.

use {
    serde::{Deserialize, Serialize},
    std::collections::HashMap,
};

/// An immutable message: a JSON payload plus string headers.
///
/// Messages are cheap to clone and carry no identity of their own; channels
/// and endpoints never mutate a message in flight.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub headers: HashMap<String, String>,
    pub payload: serde_json::Value,
}

impl Message {
    #[must_use]
    pub fn new(payload: serde_json::Value) -> Self {
        Self {
            headers: HashMap::new(),
            payload,
        }
    }

    /// Build a message with a plain text payload.
    #[must_use]
    pub fn text(payload: impl Into<String>) -> Self {
        Self::new(serde_json::Value::String(payload.into()))
    }

    #[must_use]
    pub fn with_header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(key.into(), value.into());
        self
    }

    /// The payload as a string slice, when it is a JSON string.
    #[must_use]
    pub fn payload_str(&self) -> Option<&str> {
        self.payload.as_str()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn text_payload_round_trips() {
        let msg = Message::text("hello").with_header("origin", "test");
        let json = serde_json::to_string(&msg).unwrap();
        let back: Message = serde_json::from_str(&json).unwrap();
        assert_eq!(back, msg);
        assert_eq!(back.payload_str(), Some("hello"));
    }
}
