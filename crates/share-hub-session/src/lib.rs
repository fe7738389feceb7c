//! Session share actors and storage for the share hub.
//!
//! Provides:
//! - `SessionActor` - Serialized owner of one session's share state
//! - `ShareHandle` - Cloneable sender addressing one actor
//! - `ShareRegistry` - Routes session ids to actors, spawning on demand
//! - Storage implementations (memory, filesystem archive, SQLite)

pub mod actor;
pub mod error;
pub mod registry;
pub mod storage;

pub use actor::{
    ActorConfig, DEFAULT_IDLE_TIMEOUT, DEFAULT_VIEWER_CAPACITY, SessionActor, ShareHandle, Viewer,
};
pub use error::ShareError;
pub use registry::{DEFAULT_PAGE_LIMIT, ShareRegistry};
