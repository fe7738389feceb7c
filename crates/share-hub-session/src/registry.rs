//! Registry routing session identifiers to share actors.

use std::{collections::HashMap, sync::Arc, time::Duration};

use share_hub_core::{ArchiveStore, KeyValueStore, short_id};
use tokio::sync::RwLock;
use tracing::debug;

use crate::{ActorConfig, SessionActor, ShareError, ShareHandle};

/// Archive objects listed per page while clearing a share.
pub const DEFAULT_PAGE_LIMIT: usize = 1000;

/// Routes session ids and short ids to their actors.
///
/// Both a full session id and its short id resolve to the same actor, since
/// the address is derived with [`short_id`]. The registry keeps no session
/// state of its own; it only hands out handles. Actors stop on their own
/// when idle, and their entries are pruned the next time an actor is
/// spawned.
pub struct ShareRegistry {
    kv: Arc<dyn KeyValueStore>,
    archive: Arc<dyn ArchiveStore>,
    config: ActorConfig,
    actors: RwLock<HashMap<String, ShareHandle>>,
}

impl ShareRegistry {
    /// Create a registry whose actors use the given stores.
    #[must_use]
    pub fn new(kv: Arc<dyn KeyValueStore>, archive: Arc<dyn ArchiveStore>) -> Self {
        Self {
            kv,
            archive,
            config: ActorConfig::default(),
            actors: RwLock::new(HashMap::new()),
        }
    }

    /// Set the archive page size used by clears.
    #[must_use]
    pub fn with_page_limit(mut self, page_limit: usize) -> Self {
        self.config.page_limit = page_limit.max(1);
        self
    }

    /// Set how long an actor without viewers may sit idle before stopping.
    #[must_use]
    pub const fn with_idle_timeout(mut self, idle_timeout: Duration) -> Self {
        self.config.idle_timeout = idle_timeout;
        self
    }

    /// Set how many live frames a viewer may fall behind before it is dropped.
    #[must_use]
    pub fn with_viewer_capacity(mut self, viewer_capacity: usize) -> Self {
        self.config.viewer_capacity = viewer_capacity.max(1);
        self
    }

    /// Handle for the actor owning `id`, spawning it on first reference.
    ///
    /// # Errors
    /// Returns [`ShareError::InvalidSessionId`] if `id` is empty.
    pub async fn resolve(&self, id: &str) -> Result<ShareHandle, ShareError> {
        if id.is_empty() {
            return Err(ShareError::InvalidSessionId);
        }
        let address = short_id(id);

        if let Some(handle) = self.actors.read().await.get(address) {
            if !handle.is_closed() {
                return Ok(handle.clone());
            }
        }

        let mut actors = self.actors.write().await;
        if let Some(handle) = actors.get(address) {
            if !handle.is_closed() {
                return Ok(handle.clone());
            }
        }
        actors.retain(|_, handle| !handle.is_closed());

        debug!(address, "spawning share actor");
        let handle = SessionActor::spawn(
            address,
            Arc::clone(&self.kv),
            Arc::clone(&self.archive),
            self.config,
        );
        actors.insert(address.to_string(), handle.clone());
        Ok(handle)
    }

    /// Whether a running actor owns the address of `id`.
    pub async fn contains(&self, id: &str) -> bool {
        self.actors
            .read()
            .await
            .get(short_id(id))
            .is_some_and(|handle| !handle.is_closed())
    }

    /// Number of running actors.
    pub async fn len(&self) -> usize {
        self.actors
            .read()
            .await
            .values()
            .filter(|handle| !handle.is_closed())
            .count()
    }

    /// Whether no actor is running.
    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Drop every handle held by the registry.
    ///
    /// Actors finish their queued commands and stop once outstanding
    /// handles elsewhere are dropped too.
    pub async fn shutdown(&self) {
        let mut actors = self.actors.write().await;
        debug!(actors = actors.len(), "releasing share actors");
        actors.clear();
    }
}
