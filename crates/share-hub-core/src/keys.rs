//! Key layout for shared session state.
//!
//! Durable keys look like `session/info/<session>` or
//! `session/message/<session>/<message>`. The archive mirrors each key at
//! `share/<key>.json`.

/// Number of trailing characters of a session identifier used as its address.
pub const SHORT_ID_LEN: usize = 8;

/// Reserved durable key holding the share secret.
pub const SECRET_KEY: &str = "secret";

/// Reserved durable key holding the bound session identifier.
pub const SESSION_ID_KEY: &str = "sessionID";

const INFO_ROOT: &str = "session/info/";
const MESSAGE_ROOT: &str = "session/message/";
const ARCHIVE_ROOT: &str = "share/";
const ARCHIVE_SUFFIX: &str = ".json";

/// Derive the routing address (and public short id) of a session.
///
/// This is the last [`SHORT_ID_LEN`] characters of the identifier, or the
/// whole identifier when it is shorter. Identifiers that are already short
/// ids map to themselves.
#[must_use]
pub fn short_id(id: &str) -> &str {
    match id.char_indices().rev().nth(SHORT_ID_LEN - 1) {
        Some((start, _)) => &id[start..],
        None => id,
    }
}

/// Whether a durable key belongs to the share record rather than to state.
#[must_use]
pub fn is_reserved(key: &str) -> bool {
    key == SECRET_KEY || key == SESSION_ID_KEY
}

/// Key of the session metadata entry.
#[must_use]
pub fn info_key(session_id: &str) -> String {
    format!("{INFO_ROOT}{session_id}")
}

/// Prefix shared by every message entry of a session.
#[must_use]
pub fn message_prefix(session_id: &str) -> String {
    format!("{MESSAGE_ROOT}{session_id}/")
}

/// Archive object key mirroring a durable key.
#[must_use]
pub fn archive_key(key: &str) -> String {
    format!("{ARCHIVE_ROOT}{key}{ARCHIVE_SUFFIX}")
}

/// Archive listing prefix covering every message object of a session.
#[must_use]
pub fn archive_message_prefix(session_id: &str) -> String {
    format!("{ARCHIVE_ROOT}{}", message_prefix(session_id))
}

/// A parsed state key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StateKey<'a> {
    /// `session/info/<session_id>`
    Info { session_id: &'a str },
    /// `session/message/<session_id>/<message_id>`
    Message {
        session_id: &'a str,
        message_id: &'a str,
    },
}

impl<'a> StateKey<'a> {
    /// Parse a durable key. Returns `None` for reserved or foreign keys.
    ///
    /// Message ids may themselves contain `/`; everything after the session
    /// segment is taken as the id.
    #[must_use]
    pub fn parse(key: &'a str) -> Option<Self> {
        if let Some(session_id) = key.strip_prefix(INFO_ROOT) {
            if session_id.is_empty() || session_id.contains('/') {
                return None;
            }
            return Some(Self::Info { session_id });
        }

        let rest = key.strip_prefix(MESSAGE_ROOT)?;
        let (session_id, message_id) = rest.split_once('/')?;
        if session_id.is_empty() || message_id.is_empty() {
            return None;
        }
        Some(Self::Message {
            session_id,
            message_id,
        })
    }

    /// Session this key belongs to.
    #[must_use]
    pub const fn session_id(&self) -> &'a str {
        match *self {
            Self::Info { session_id } | Self::Message { session_id, .. } => session_id,
        }
    }

    /// Whether `key` lies inside the namespace of `session_id`.
    #[must_use]
    pub fn in_namespace(key: &str, session_id: &str) -> bool {
        StateKey::parse(key).is_some_and(|parsed| parsed.session_id() == session_id)
    }
}
