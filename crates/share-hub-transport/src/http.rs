//! HTTP routes of the share hub.

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Query, State, rejection::JsonRejection},
    routing::{get, post},
};
use share_hub_core::{SessionData, short_id};
use share_hub_session::ShareRegistry;
use tracing::{info, warn};

use crate::{
    error::{ApiError, ApiResult},
    protocol::{
        Empty, PollQuery, ShareCreateRequest, ShareCreateResponse, ShareDeleteRequest,
        ShareSyncRequest,
    },
    websocket,
};

/// Address cleared by `POST /share_delete_admin` unless configured otherwise.
pub const DEFAULT_ADMIN_SHORT_ID: &str = "hubadmin";

/// Transport settings.
#[derive(Debug, Clone)]
pub struct HubConfig {
    /// Base of the public share URLs, e.g. `https://share.example.com`.
    pub public_url: String,
    /// Short id targeted by the admin delete route.
    pub admin_short_id: String,
}

impl Default for HubConfig {
    fn default() -> Self {
        Self {
            public_url: "http://localhost:3000".to_string(),
            admin_short_id: DEFAULT_ADMIN_SHORT_ID.to_string(),
        }
    }
}

impl HubConfig {
    /// Public URL of the share for `session_id`.
    #[must_use]
    pub fn share_url(&self, session_id: &str) -> String {
        format!(
            "{}/s/{}",
            self.public_url.trim_end_matches('/'),
            short_id(session_id)
        )
    }
}

/// State shared by every handler.
#[derive(Clone)]
pub struct HubState {
    pub registry: Arc<ShareRegistry>,
    pub config: Arc<HubConfig>,
}

impl HubState {
    #[must_use]
    pub fn new(registry: Arc<ShareRegistry>, config: HubConfig) -> Self {
        Self {
            registry,
            config: Arc::new(config),
        }
    }
}

/// Build the hub router.
///
/// # Example
/// ```ignore
/// let app = router(HubState::new(registry, HubConfig::default()))
///     .layer(CorsLayer::permissive());
/// ```
pub fn router(state: HubState) -> Router {
    Router::new()
        .route("/", get(health))
        .route("/share_create", post(share_create))
        .route("/share_delete", post(share_delete))
        .route("/share_delete_admin", post(share_delete_admin))
        .route("/share_sync", post(share_sync))
        .route("/share_poll", get(websocket::share_poll))
        .route("/share_data", get(share_data))
        .with_state(state)
}

/// Short id from a viewer query, rejecting a missing or empty `id`.
pub(crate) fn required_id(query: PollQuery) -> ApiResult<String> {
    match query.id {
        Some(id) if !id.is_empty() => Ok(id),
        _ => Err(ApiError::BadRequest("missing id".to_string())),
    }
}

async fn health() -> &'static str {
    "ok"
}

async fn share_create(
    State(state): State<HubState>,
    body: Result<Json<ShareCreateRequest>, JsonRejection>,
) -> ApiResult<Json<ShareCreateResponse>> {
    let Json(request) = body?;
    let handle = state.registry.resolve(&request.session_id).await?;
    let secret = handle.share(request.session_id.clone()).await?;

    Ok(Json(ShareCreateResponse {
        secret,
        url: state.config.share_url(&request.session_id),
    }))
}

async fn share_delete(
    State(state): State<HubState>,
    body: Result<Json<ShareDeleteRequest>, JsonRejection>,
) -> ApiResult<Json<Empty>> {
    let Json(request) = body?;
    let handle = state.registry.resolve(&request.session_id).await?;
    handle.clear_with_secret(request.secret).await?;

    info!(address = handle.address(), "share deleted by owner");
    Ok(Json(Empty {}))
}

async fn share_delete_admin(State(state): State<HubState>) -> ApiResult<Json<Empty>> {
    let handle = state.registry.resolve(&state.config.admin_short_id).await?;
    handle.clear().await?;

    warn!(address = handle.address(), "share deleted through admin route");
    Ok(Json(Empty {}))
}

async fn share_sync(
    State(state): State<HubState>,
    body: Result<Json<ShareSyncRequest>, JsonRejection>,
) -> ApiResult<Json<Empty>> {
    let Json(request) = body?;
    let handle = state.registry.resolve(&request.session_id).await?;
    handle.assert_secret(request.secret.clone()).await?;
    handle
        .publish(request.secret, request.key, request.content)
        .await?;
    Ok(Json(Empty {}))
}

async fn share_data(
    State(state): State<HubState>,
    Query(query): Query<PollQuery>,
) -> ApiResult<Json<SessionData>> {
    let id = required_id(query)?;
    let handle = state.registry.resolve(&id).await?;
    Ok(Json(handle.get_data().await?))
}
