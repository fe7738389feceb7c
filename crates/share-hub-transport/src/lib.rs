//! Transport layer for the session share hub.
//!
//! Provides:
//! - Wire protocol (JSON request and response bodies)
//! - HTTP routes for owners (`share_create`, `share_sync`, ...)
//! - WebSocket push channel for viewers (`share_poll`)

pub mod error;
pub mod http;
pub mod protocol;
pub mod websocket;

pub use error::{ApiError, ApiResult};
pub use http::{DEFAULT_ADMIN_SHORT_ID, HubConfig, HubState, router};
pub use protocol::{
    Empty, PollQuery, ShareCreateRequest, ShareCreateResponse, ShareDeleteRequest,
    ShareSyncRequest,
};
pub use share_hub_core::ShareFrame;
