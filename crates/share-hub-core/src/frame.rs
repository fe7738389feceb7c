//! Values exchanged between the hub, its stores, and viewers.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::keys::StateKey;

/// One state update, as pushed to viewers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShareFrame {
    /// Durable key of the entry.
    pub key: String,
    /// Opaque entry content.
    pub content: Value,
}

impl ShareFrame {
    #[must_use]
    pub fn new(key: impl Into<String>, content: Value) -> Self {
        Self {
            key: key.into(),
            content,
        }
    }
}

/// The share record of a session: who owns it and the secret guarding it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShareRecord {
    pub secret: String,
    pub session_id: String,
}

impl ShareRecord {
    /// Whether `secret` authorizes mutations of this share.
    #[must_use]
    pub fn authorizes(&self, secret: &str) -> bool {
        self.secret == secret
    }
}

/// Current state of a shared session.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionData {
    /// Latest session metadata, `null` when none was published.
    pub info: Option<Value>,
    /// Latest content of each message, keyed by message id.
    pub messages: BTreeMap<String, Value>,
}

impl SessionData {
    /// Partition durable entries of `session_id` into info and messages.
    ///
    /// Reserved keys and entries of other sessions are skipped.
    pub fn from_entries<I>(session_id: &str, entries: I) -> Self
    where
        I: IntoIterator<Item = (String, Value)>,
    {
        let mut data = Self::default();
        for (key, content) in entries {
            match StateKey::parse(&key) {
                Some(StateKey::Info { session_id: owner }) if owner == session_id => {
                    data.info = Some(content);
                }
                Some(StateKey::Message {
                    session_id: owner,
                    message_id,
                }) if owner == session_id => {
                    data.messages.insert(message_id.to_string(), content);
                }
                _ => {}
            }
        }
        data
    }

    /// Whether nothing has been published.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.info.is_none() && self.messages.is_empty()
    }
}
