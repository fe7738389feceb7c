//! Session share actor.
//!
//! Each shared session is owned by one [`SessionActor`] running in its own
//! tokio task. Every operation arrives as a command over an mpsc
//! channel and runs to completion, awaits included, before the next one
//! starts. That ordering is what keeps publishes, snapshots, and clears from
//! interleaving, so the actor state needs no locks.

use std::{collections::VecDeque, sync::Arc, time::Duration};

use serde_json::Value;
use share_hub_core::{
    ArchiveStore, KeyValueStore, SessionData, ShareFrame, ShareRecord, StateKey,
    keys::{self, SECRET_KEY, SESSION_ID_KEY},
};
use tokio::sync::{
    mpsc::{self, error::TrySendError},
    oneshot,
};
use tokio_stream::{Stream, StreamExt, wrappers::ReceiverStream};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::ShareError;

/// Pending commands per actor before senders wait.
const MAILBOX_CAPACITY: usize = 64;

/// Default idle period after which an actor without viewers stops.
pub const DEFAULT_IDLE_TIMEOUT: Duration = Duration::from_secs(300);

/// Default number of live frames buffered per viewer.
pub const DEFAULT_VIEWER_CAPACITY: usize = 256;

/// Tuning shared by every actor a registry spawns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActorConfig {
    /// Archive objects listed per page while clearing.
    pub page_limit: usize,
    /// Stop after this long without commands, unless viewers are connected.
    pub idle_timeout: Duration,
    /// Live frames queued per viewer before it is dropped as lagging.
    pub viewer_capacity: usize,
}

impl Default for ActorConfig {
    fn default() -> Self {
        Self {
            page_limit: crate::DEFAULT_PAGE_LIMIT,
            idle_timeout: DEFAULT_IDLE_TIMEOUT,
            viewer_capacity: DEFAULT_VIEWER_CAPACITY,
        }
    }
}

type Reply<T> = oneshot::Sender<Result<T, ShareError>>;

/// Operations accepted by a [`SessionActor`].
enum ActorCommand {
    Share {
        session_id: String,
        reply: Reply<String>,
    },
    Publish {
        secret: String,
        key: String,
        content: Value,
        reply: Reply<()>,
    },
    AssertSecret {
        secret: String,
        reply: Reply<()>,
    },
    GetData {
        reply: Reply<SessionData>,
    },
    Clear {
        secret: Option<String>,
        reply: Reply<()>,
    },
    Subscribe {
        reply: Reply<Viewer>,
    },
    ViewerCount {
        reply: oneshot::Sender<usize>,
    },
}

/// A connected viewer as seen by the actor.
struct ViewerSlot {
    id: u64,
    tx: mpsc::Sender<ShareFrame>,
}

/// Receiving side of a viewer subscription.
///
/// Yields the snapshot taken at subscribe time, then every later publish.
/// The stream ends when the share is cleared, the actor stops, or the viewer
/// falls more than the configured capacity behind.
#[derive(Debug)]
pub struct Viewer {
    id: u64,
    snapshot: VecDeque<ShareFrame>,
    rx: mpsc::Receiver<ShareFrame>,
}

impl Viewer {
    /// Actor-local id of this viewer.
    #[must_use]
    pub const fn id(&self) -> u64 {
        self.id
    }

    /// Next frame, or `None` once the actor has let go of this viewer.
    pub async fn recv(&mut self) -> Option<ShareFrame> {
        match self.snapshot.pop_front() {
            Some(frame) => Some(frame),
            None => self.rx.recv().await,
        }
    }

    /// Next frame if one is ready, without waiting.
    pub fn try_recv(&mut self) -> Option<ShareFrame> {
        self.snapshot
            .pop_front()
            .or_else(|| self.rx.try_recv().ok())
    }

    /// Convert into a stream of frames.
    pub fn into_stream(self) -> impl Stream<Item = ShareFrame> + Send + Unpin + 'static {
        tokio_stream::iter(self.snapshot).chain(ReceiverStream::new(self.rx))
    }
}

/// Owner of one session's share state.
pub struct SessionActor {
    address: String,
    kv: Arc<dyn KeyValueStore>,
    archive: Arc<dyn ArchiveStore>,
    config: ActorConfig,
    viewers: Vec<ViewerSlot>,
    next_viewer_id: u64,
    rx: mpsc::Receiver<ActorCommand>,
}

impl SessionActor {
    /// Spawn an actor for `address` and return a handle to it.
    ///
    /// The actor stops once every handle has been dropped and its queue is
    /// drained, or once it has been idle for `config.idle_timeout` with no
    /// viewer connected. A zero page limit or viewer capacity is treated as
    /// one.
    #[must_use]
    pub fn spawn(
        address: impl Into<String>,
        kv: Arc<dyn KeyValueStore>,
        archive: Arc<dyn ArchiveStore>,
        config: ActorConfig,
    ) -> ShareHandle {
        let address = address.into();
        let (tx, rx) = mpsc::channel(MAILBOX_CAPACITY);

        let actor = Self {
            address: address.clone(),
            kv,
            archive,
            config: ActorConfig {
                page_limit: config.page_limit.max(1),
                viewer_capacity: config.viewer_capacity.max(1),
                ..config
            },
            viewers: Vec::new(),
            next_viewer_id: 0,
            rx,
        };
        tokio::spawn(actor.run());

        ShareHandle { address, tx }
    }

    async fn run(mut self) {
        debug!(address = %self.address, "share actor started");
        loop {
            match tokio::time::timeout(self.config.idle_timeout, self.rx.recv()).await {
                Ok(Some(command)) => self.handle(command).await,
                Ok(None) => break,
                Err(_) => {
                    self.prune_viewers();
                    if self.viewers.is_empty() {
                        debug!(address = %self.address, "share actor idle");
                        self.drain().await;
                        break;
                    }
                }
            }
        }
        debug!(address = %self.address, "share actor stopped");
    }

    /// Refuse new commands, then finish the ones already queued.
    async fn drain(&mut self) {
        self.rx.close();
        while let Some(command) = self.rx.recv().await {
            self.handle(command).await;
        }
    }

    fn prune_viewers(&mut self) {
        self.viewers.retain(|viewer| !viewer.tx.is_closed());
    }

    async fn handle(&mut self, command: ActorCommand) {
        // A dropped reply receiver only means the caller went away; the
        // operation itself has already run to completion.
        match command {
            ActorCommand::Share { session_id, reply } => {
                let _ = reply.send(self.share(session_id).await);
            }
            ActorCommand::Publish {
                secret,
                key,
                content,
                reply,
            } => {
                let _ = reply.send(self.publish(&secret, key, content).await);
            }
            ActorCommand::AssertSecret { secret, reply } => {
                let _ = reply.send(self.authorize(&secret).await.map(drop));
            }
            ActorCommand::GetData { reply } => {
                let _ = reply.send(self.get_data().await);
            }
            ActorCommand::Clear { secret, reply } => {
                let result = match secret {
                    Some(secret) => match self.authorize(&secret).await {
                        Ok(_) => self.clear().await,
                        Err(e) => Err(e),
                    },
                    None => self.clear().await,
                };
                let _ = reply.send(result);
            }
            ActorCommand::Subscribe { reply } => {
                let _ = reply.send(self.subscribe().await);
            }
            ActorCommand::ViewerCount { reply } => {
                self.prune_viewers();
                let _ = reply.send(self.viewers.len());
            }
        }
    }

    async fn record(&self) -> Result<Option<ShareRecord>, ShareError> {
        let secret = self.kv.get(&self.address, SECRET_KEY).await?;
        let session_id = self.kv.get(&self.address, SESSION_ID_KEY).await?;

        Ok(match (secret, session_id) {
            (Some(Value::String(secret)), Some(Value::String(session_id))) => Some(ShareRecord {
                secret,
                session_id,
            }),
            _ => None,
        })
    }

    async fn authorize(&self, secret: &str) -> Result<ShareRecord, ShareError> {
        match self.record().await? {
            Some(record) if record.authorizes(secret) => Ok(record),
            _ => Err(ShareError::Unauthorized),
        }
    }

    async fn share(&self, session_id: String) -> Result<String, ShareError> {
        // State keys use `/` as their separator.
        if session_id.is_empty() || session_id.contains('/') {
            return Err(ShareError::InvalidSessionId);
        }
        if let Some(record) = self.record().await? {
            return Ok(record.secret);
        }

        let secret = Uuid::new_v4().to_string();
        self.kv
            .put(&self.address, SECRET_KEY, Value::String(secret.clone()))
            .await?;
        self.kv
            .put(&self.address, SESSION_ID_KEY, Value::String(session_id.clone()))
            .await?;

        info!(address = %self.address, session_id = %session_id, "share created");
        Ok(secret)
    }

    async fn publish(&mut self, secret: &str, key: String, content: Value) -> Result<(), ShareError> {
        let record = self.authorize(secret).await?;
        if !StateKey::in_namespace(&key, &record.session_id) {
            return Err(ShareError::InvalidKey { key });
        }

        self.archive
            .put(&keys::archive_key(&key), &content)
            .await
            .inspect_err(|e| error!(address = %self.address, key = %key, "archive write failed: {e}"))?;
        self.kv
            .put(&self.address, &key, content.clone())
            .await
            .inspect_err(|e| error!(address = %self.address, key = %key, "state write failed: {e}"))?;

        debug!(address = %self.address, key = %key, viewers = self.viewers.len(), "published");
        self.broadcast(&ShareFrame { key, content });
        Ok(())
    }

    fn broadcast(&mut self, frame: &ShareFrame) {
        let address = &self.address;
        self.viewers.retain(|viewer| match viewer.tx.try_send(frame.clone()) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) => {
                warn!(address = %address, viewer = viewer.id, "dropping lagging viewer");
                false
            }
            Err(TrySendError::Closed(_)) => {
                debug!(address = %address, viewer = viewer.id, "dropping disconnected viewer");
                false
            }
        });
    }

    async fn get_data(&self) -> Result<SessionData, ShareError> {
        let Some(record) = self.record().await? else {
            return Ok(SessionData::default());
        };
        let entries = self.kv.list(&self.address).await?;
        Ok(SessionData::from_entries(&record.session_id, entries))
    }

    async fn clear(&mut self) -> Result<(), ShareError> {
        if let Some(record) = self.record().await? {
            let prefix = keys::archive_message_prefix(&record.session_id);
            let mut removed = 0usize;
            loop {
                let page = self.archive.list(&prefix, self.config.page_limit).await?;
                let full_page = page.len() >= self.config.page_limit;
                for object in page {
                    self.archive.delete(&object.key).await?;
                    removed += 1;
                }
                if !full_page {
                    break;
                }
            }
            self.archive
                .delete(&keys::archive_key(&keys::info_key(&record.session_id)))
                .await?;
            info!(
                address = %self.address,
                session_id = %record.session_id,
                archived_messages = removed,
                "share cleared"
            );
        }

        self.kv.delete_all(&self.address).await?;
        // Closing the channels ends every viewer stream of the old share.
        self.viewers.clear();
        Ok(())
    }

    async fn subscribe(&mut self) -> Result<Viewer, ShareError> {
        let snapshot = self
            .kv
            .list(&self.address)
            .await?
            .into_iter()
            .filter(|(key, _)| !keys::is_reserved(key))
            .map(|(key, content)| ShareFrame { key, content })
            .collect();
        let (tx, rx) = mpsc::channel(self.config.viewer_capacity);

        let id = self.next_viewer_id;
        self.next_viewer_id += 1;
        self.viewers.push(ViewerSlot { id, tx });

        info!(address = %self.address, viewer = id, "viewer connected");
        Ok(Viewer { id, snapshot, rx })
    }
}

/// Cloneable handle to a [`SessionActor`].
#[derive(Clone, Debug)]
pub struct ShareHandle {
    address: String,
    tx: mpsc::Sender<ActorCommand>,
}

impl ShareHandle {
    /// Address of the actor behind this handle.
    #[must_use]
    pub fn address(&self) -> &str {
        &self.address
    }

    /// Whether the actor task has stopped.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }

    async fn call<T>(
        &self,
        command: impl FnOnce(oneshot::Sender<T>) -> ActorCommand,
    ) -> Result<T, ShareError> {
        let (reply, response) = oneshot::channel();
        self.tx
            .send(command(reply))
            .await
            .map_err(|_| ShareError::ActorUnavailable)?;
        response.await.map_err(|_| ShareError::ActorUnavailable)
    }

    /// Start sharing `session_id`, or return the existing secret.
    ///
    /// # Errors
    /// Returns error if `session_id` is empty or storage fails.
    pub async fn share(&self, session_id: impl Into<String>) -> Result<String, ShareError> {
        let session_id = session_id.into();
        self.call(|reply| ActorCommand::Share { session_id, reply })
            .await?
    }

    /// Archive, persist, and broadcast one entry.
    ///
    /// # Errors
    /// Returns error if the secret is wrong, the key is outside the session
    /// namespace, or storage fails. Nothing is written or broadcast then.
    pub async fn publish(
        &self,
        secret: impl Into<String>,
        key: impl Into<String>,
        content: Value,
    ) -> Result<(), ShareError> {
        let (secret, key) = (secret.into(), key.into());
        self.call(|reply| ActorCommand::Publish {
            secret,
            key,
            content,
            reply,
        })
        .await?
    }

    /// Check a secret without changing anything.
    ///
    /// # Errors
    /// Returns [`ShareError::Unauthorized`] if the secret does not match or
    /// the session is not shared.
    pub async fn assert_secret(&self, secret: impl Into<String>) -> Result<(), ShareError> {
        let secret = secret.into();
        self.call(|reply| ActorCommand::AssertSecret { secret, reply })
            .await?
    }

    /// Current info and messages of the share.
    ///
    /// # Errors
    /// Returns error if storage fails.
    pub async fn get_data(&self) -> Result<SessionData, ShareError> {
        self.call(|reply| ActorCommand::GetData { reply }).await?
    }

    /// Remove the share record, all state, and every archived object.
    ///
    /// Performs no secret check; owner deletes go through
    /// [`Self::clear_with_secret`].
    ///
    /// # Errors
    /// Returns error if storage fails.
    pub async fn clear(&self) -> Result<(), ShareError> {
        self.call(|reply| ActorCommand::Clear {
            secret: None,
            reply,
        })
        .await?
    }

    /// Check `secret` and clear the share in one step.
    ///
    /// # Errors
    /// Returns [`ShareError::Unauthorized`] if the secret does not match the
    /// current share, in which case nothing is removed, or error if storage
    /// fails.
    pub async fn clear_with_secret(&self, secret: impl Into<String>) -> Result<(), ShareError> {
        let secret = Some(secret.into());
        self.call(|reply| ActorCommand::Clear { secret, reply })
            .await?
    }

    /// Subscribe a viewer: snapshot first, live updates after.
    ///
    /// # Errors
    /// Returns error if reading the snapshot fails.
    pub async fn subscribe(&self) -> Result<Viewer, ShareError> {
        self.call(|reply| ActorCommand::Subscribe { reply }).await?
    }

    /// Number of connected viewers.
    ///
    /// # Errors
    /// Returns error if the actor has stopped.
    pub async fn viewer_count(&self) -> Result<usize, ShareError> {
        self.call(|reply| ActorCommand::ViewerCount { reply }).await
    }
}

#[cfg(all(test, feature = "memory"))]
mod tests {
    use async_trait::async_trait;
    use serde_json::json;
    use share_hub_core::{ArchiveObject, StorageError};
    use tokio_test::{assert_err, assert_ok};

    use super::*;
    use crate::storage::{MemoryArchiveStore, MemoryKeyValueStore};

    struct Fixture {
        kv: Arc<MemoryKeyValueStore>,
        archive: Arc<MemoryArchiveStore>,
        handle: ShareHandle,
    }

    fn fixture(page_limit: usize) -> Fixture {
        fixture_with(ActorConfig {
            page_limit,
            ..ActorConfig::default()
        })
    }

    fn fixture_with(config: ActorConfig) -> Fixture {
        let kv = Arc::new(MemoryKeyValueStore::new());
        let archive = Arc::new(MemoryArchiveStore::new());
        let handle = SessionActor::spawn(
            "abc",
            Arc::clone(&kv) as Arc<dyn KeyValueStore>,
            Arc::clone(&archive) as Arc<dyn ArchiveStore>,
            config,
        );
        Fixture {
            kv,
            archive,
            handle,
        }
    }

    #[tokio::test]
    async fn test_share_is_idempotent() {
        let f = fixture(10);

        let first = f.handle.share("abc").await.unwrap();
        let second = f.handle.share("other").await.unwrap();

        assert_eq!(first, second);
        let stored = f.kv.list("abc").await.unwrap();
        assert_eq!(stored[SESSION_ID_KEY], json!("abc"));
        assert_eq!(stored[SECRET_KEY], json!(first));
    }

    #[tokio::test]
    async fn test_share_rejects_empty_session_id() {
        let f = fixture(10);
        let err = f.handle.share("").await.unwrap_err();
        assert!(matches!(err, ShareError::InvalidSessionId));
    }

    #[tokio::test]
    async fn test_share_rejects_session_id_with_separator() {
        let f = fixture(10);
        let err = f.handle.share("abc/def").await.unwrap_err();
        assert!(matches!(err, ShareError::InvalidSessionId));
        assert!(f.kv.list("abc").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_assert_secret() {
        let f = fixture(10);
        assert_err!(f.handle.assert_secret("anything").await);

        let secret = f.handle.share("abc").await.unwrap();
        assert_ok!(f.handle.assert_secret(secret.clone()).await);
        assert_err!(f.handle.assert_secret(format!("{secret}x")).await);
    }

    #[tokio::test]
    async fn test_publish_with_wrong_secret_changes_nothing() {
        let f = fixture(10);
        let secret = f.handle.share("abc").await.unwrap();
        let mut viewer = f.handle.subscribe().await.unwrap();

        let err = f
            .handle
            .publish("wrong", "session/info/abc", json!({"title": "t"}))
            .await
            .unwrap_err();
        assert!(matches!(err, ShareError::Unauthorized));
        assert!(!err.to_string().contains(&secret));

        assert_eq!(f.kv.list("abc").await.unwrap().len(), 2);
        assert!(f.archive.is_empty());
        assert!(viewer.try_recv().is_none());
    }

    #[tokio::test]
    async fn test_publish_before_share_is_unauthorized() {
        let f = fixture(10);
        let err = f
            .handle
            .publish("", "session/info/abc", json!({}))
            .await
            .unwrap_err();
        assert!(matches!(err, ShareError::Unauthorized));
        assert!(f.kv.list("abc").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_publish_outside_namespace_changes_nothing() {
        let f = fixture(10);
        let secret = f.handle.share("abc").await.unwrap();
        let mut viewer = f.handle.subscribe().await.unwrap();

        for key in [
            "session/info/other-session",
            "session/message/other-session/m1",
            "session/message/abc",
            "secret",
        ] {
            let err = f
                .handle
                .publish(secret.clone(), key, json!({"title": "t"}))
                .await
                .unwrap_err();
            assert!(matches!(err, ShareError::InvalidKey { .. }), "{key}");
        }

        assert_eq!(f.kv.list("abc").await.unwrap().len(), 2);
        assert!(f.archive.is_empty());
        assert!(viewer.try_recv().is_none());
    }

    #[tokio::test]
    async fn test_publish_archives_persists_and_broadcasts() {
        let f = fixture(10);
        let secret = f.handle.share("abc").await.unwrap();
        let mut viewer = f.handle.subscribe().await.unwrap();

        f.handle
            .publish(secret, "session/message/abc/m1", json!({"text": "hi"}))
            .await
            .unwrap();

        assert_eq!(
            f.archive.get("share/session/message/abc/m1.json").unwrap(),
            json!({"text": "hi"})
        );
        assert_eq!(
            f.kv.get("abc", "session/message/abc/m1").await.unwrap(),
            Some(json!({"text": "hi"}))
        );
        assert_eq!(
            viewer.recv().await.unwrap(),
            ShareFrame::new("session/message/abc/m1", json!({"text": "hi"}))
        );
    }

    #[tokio::test]
    async fn test_get_data_round_trip() {
        let f = fixture(10);
        let secret = f.handle.share("abc").await.unwrap();
        f.handle
            .publish(secret.clone(), "session/info/abc", json!({"title": "t"}))
            .await
            .unwrap();
        f.handle
            .publish(secret, "session/message/abc/m1", json!({"text": "hi"}))
            .await
            .unwrap();

        let data = f.handle.get_data().await.unwrap();

        assert_eq!(
            serde_json::to_value(&data).unwrap(),
            json!({"info": {"title": "t"}, "messages": {"m1": {"text": "hi"}}})
        );
    }

    #[tokio::test]
    async fn test_later_publish_overwrites_entry() {
        let f = fixture(10);
        let secret = f.handle.share("abc").await.unwrap();
        for text in ["a", "ab", "abc"] {
            f.handle
                .publish(secret.clone(), "session/message/abc/m1", json!({"text": text}))
                .await
                .unwrap();
        }

        let data = f.handle.get_data().await.unwrap();
        assert_eq!(data.messages.len(), 1);
        assert_eq!(data.messages["m1"], json!({"text": "abc"}));
    }

    #[tokio::test]
    async fn test_snapshot_precedes_live_updates() {
        let f = fixture(10);
        let secret = f.handle.share("abc").await.unwrap();
        f.handle
            .publish(secret.clone(), "session/info/abc", json!({"title": "t"}))
            .await
            .unwrap();
        f.handle
            .publish(secret.clone(), "session/message/abc/m0", json!({"text": "old"}))
            .await
            .unwrap();

        let mut viewer = f.handle.subscribe().await.unwrap();
        f.handle
            .publish(secret, "session/message/abc/m1", json!({"text": "new"}))
            .await
            .unwrap();

        let mut keys = Vec::new();
        for _ in 0..3 {
            keys.push(viewer.recv().await.unwrap().key);
        }
        assert_eq!(
            keys,
            vec![
                "session/info/abc",
                "session/message/abc/m0",
                "session/message/abc/m1",
            ]
        );
    }

    #[tokio::test]
    async fn test_snapshot_excludes_share_record() {
        let f = fixture(10);
        f.handle.share("abc").await.unwrap();

        let mut viewer = f.handle.subscribe().await.unwrap();
        assert!(viewer.try_recv().is_none());
    }

    #[tokio::test]
    async fn test_concurrent_publishes_are_serialized() {
        let f = fixture(10);
        let secret = f.handle.share("abc").await.unwrap();
        let mut viewer = f.handle.subscribe().await.unwrap();

        let mut tasks = Vec::new();
        for i in 0..20 {
            let handle = f.handle.clone();
            let secret = secret.clone();
            tasks.push(tokio::spawn(async move {
                handle
                    .publish(secret, format!("session/message/abc/m{i:02}"), json!(i))
                    .await
            }));
        }
        for task in tasks {
            task.await.unwrap().unwrap();
        }

        let mut seen = Vec::new();
        for _ in 0..20 {
            seen.push(viewer.recv().await.unwrap().key);
        }
        seen.sort();
        seen.dedup();
        assert_eq!(seen.len(), 20);
        assert_eq!(f.handle.get_data().await.unwrap().messages.len(), 20);
    }

    #[tokio::test]
    async fn test_clear_purges_everything_across_pages() {
        let f = fixture(2);
        let secret = f.handle.share("abc").await.unwrap();
        f.handle
            .publish(secret.clone(), "session/info/abc", json!({"title": "t"}))
            .await
            .unwrap();
        for i in 0..5 {
            f.handle
                .publish(secret.clone(), format!("session/message/abc/m{i}"), json!(i))
                .await
                .unwrap();
        }
        assert_eq!(f.archive.len(), 6);

        f.handle.clear_with_secret(secret.clone()).await.unwrap();

        assert!(f.handle.get_data().await.unwrap().is_empty());
        assert!(f.kv.list("abc").await.unwrap().is_empty());
        assert!(
            f.archive
                .list("share/session/message/abc/", 100)
                .await
                .unwrap()
                .is_empty()
        );
        assert!(f.archive.is_empty());
        assert_err!(f.handle.assert_secret(secret).await);
    }

    #[tokio::test]
    async fn test_clear_leaves_other_sessions_archive_alone() {
        let f = fixture(2);
        f.archive
            .put("share/session/message/zzz/m1.json", &json!(1))
            .await
            .unwrap();
        let secret = f.handle.share("abc").await.unwrap();
        f.handle
            .publish(secret, "session/message/abc/m1", json!(1))
            .await
            .unwrap();

        f.handle.clear().await.unwrap();

        assert_eq!(f.archive.len(), 1);
        assert!(f.archive.get("share/session/message/zzz/m1.json").is_some());
    }

    #[tokio::test]
    async fn test_reshare_after_clear_mints_new_secret() {
        let f = fixture(10);
        let first = f.handle.share("abc").await.unwrap();
        f.handle.clear().await.unwrap();

        let second = f.handle.share("abc").await.unwrap();

        assert_ne!(first, second);
        assert_err!(f.handle.assert_secret(first).await);
        assert_ok!(f.handle.assert_secret(second).await);
    }

    #[tokio::test]
    async fn test_clear_with_wrong_secret_changes_nothing() {
        let f = fixture(10);
        let secret = f.handle.share("abc").await.unwrap();
        f.handle
            .publish(secret.clone(), "session/info/abc", json!({"title": "t"}))
            .await
            .unwrap();

        let err = f.handle.clear_with_secret("wrong").await.unwrap_err();

        assert!(matches!(err, ShareError::Unauthorized));
        assert_eq!(f.archive.len(), 1);
        assert_ok!(f.handle.assert_secret(secret).await);
    }

    #[tokio::test]
    async fn test_stale_secret_cannot_clear_new_share() {
        let f = fixture(10);
        let stale = f.handle.share("abc").await.unwrap();
        f.handle.clear_with_secret(stale.clone()).await.unwrap();
        let current = f.handle.share("abc").await.unwrap();
        f.handle
            .publish(current.clone(), "session/message/abc/m1", json!(1))
            .await
            .unwrap();

        let err = f.handle.clear_with_secret(stale).await.unwrap_err();

        assert!(matches!(err, ShareError::Unauthorized));
        assert_eq!(f.handle.get_data().await.unwrap().messages.len(), 1);
        assert_ok!(f.handle.assert_secret(current).await);
    }

    #[tokio::test]
    async fn test_lagging_viewer_is_dropped() {
        let f = fixture_with(ActorConfig {
            viewer_capacity: 4,
            ..ActorConfig::default()
        });
        let secret = f.handle.share("abc").await.unwrap();
        for i in 0..10 {
            f.handle
                .publish(secret.clone(), format!("session/message/abc/m{i}"), json!(i))
                .await
                .unwrap();
        }
        // A snapshot larger than the live buffer is still delivered whole.
        let mut stalled = f.handle.subscribe().await.unwrap();
        let mut reader = f.handle.subscribe().await.unwrap();
        for _ in 0..10 {
            reader.recv().await.unwrap();
        }

        for i in 10..20 {
            f.handle
                .publish(secret.clone(), format!("session/message/abc/m{i}"), json!(i))
                .await
                .unwrap();
            reader.recv().await.unwrap();
        }

        assert_eq!(f.handle.viewer_count().await.unwrap(), 1);
        let mut received = 0;
        while stalled.recv().await.is_some() {
            received += 1;
        }
        assert_eq!(received, 10 + 4);
    }

    #[tokio::test]
    async fn test_idle_actor_stops() {
        let f = fixture_with(ActorConfig {
            idle_timeout: Duration::from_millis(50),
            ..ActorConfig::default()
        });
        f.handle.share("abc").await.unwrap();

        tokio::time::sleep(Duration::from_millis(200)).await;

        assert!(f.handle.is_closed());
        assert_eq!(f.kv.list("abc").await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_actor_with_viewer_outlives_idle_timeout() {
        let f = fixture_with(ActorConfig {
            idle_timeout: Duration::from_millis(50),
            ..ActorConfig::default()
        });
        let viewer = f.handle.subscribe().await.unwrap();

        tokio::time::sleep(Duration::from_millis(200)).await;
        assert!(!f.handle.is_closed());
        assert_eq!(f.handle.viewer_count().await.unwrap(), 1);

        drop(viewer);
        tokio::time::sleep(Duration::from_millis(200)).await;
        assert!(f.handle.is_closed());
    }

    #[tokio::test]
    async fn test_clear_disconnects_viewers() {
        let f = fixture(10);
        f.handle.share("abc").await.unwrap();
        let mut viewer = f.handle.subscribe().await.unwrap();
        assert_eq!(f.handle.viewer_count().await.unwrap(), 1);

        f.handle.clear().await.unwrap();

        assert!(viewer.recv().await.is_none());
        assert_eq!(f.handle.viewer_count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_failed_viewer_does_not_affect_others() {
        let f = fixture(10);
        let secret = f.handle.share("abc").await.unwrap();
        let broken = f.handle.subscribe().await.unwrap();
        let mut healthy = f.handle.subscribe().await.unwrap();
        drop(broken);

        f.handle
            .publish(secret, "session/info/abc", json!({"title": "t"}))
            .await
            .unwrap();

        assert_eq!(
            healthy.recv().await.unwrap(),
            ShareFrame::new("session/info/abc", json!({"title": "t"}))
        );
        assert_eq!(f.handle.viewer_count().await.unwrap(), 1);
    }

    struct FailingArchive;

    #[async_trait]
    impl ArchiveStore for FailingArchive {
        async fn put(&self, _key: &str, _content: &Value) -> Result<(), StorageError> {
            Err(StorageError::Backend("archive offline".into()))
        }

        async fn list(&self, _prefix: &str, _limit: usize) -> Result<Vec<ArchiveObject>, StorageError> {
            Ok(Vec::new())
        }

        async fn delete(&self, _key: &str) -> Result<(), StorageError> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_archive_failure_aborts_publish() {
        let kv = Arc::new(MemoryKeyValueStore::new());
        let handle = SessionActor::spawn(
            "abc",
            Arc::clone(&kv) as Arc<dyn KeyValueStore>,
            Arc::new(FailingArchive),
            ActorConfig::default(),
        );
        let secret = handle.share("abc").await.unwrap();
        let mut viewer = handle.subscribe().await.unwrap();

        let err = handle
            .publish(secret, "session/info/abc", json!({"title": "t"}))
            .await
            .unwrap_err();

        assert!(matches!(err, ShareError::Storage(_)));
        assert_eq!(kv.get("abc", "session/info/abc").await.unwrap(), None);
        assert!(viewer.try_recv().is_none());
    }

    #[tokio::test]
    async fn test_handle_reports_stopped_actor() {
        let (tx, rx) = mpsc::channel(1);
        drop(rx);
        let handle = ShareHandle {
            address: "abc".into(),
            tx,
        };
        assert!(handle.is_closed());
        assert!(matches!(
            handle.get_data().await.unwrap_err(),
            ShareError::ActorUnavailable
        ));
    }
}
