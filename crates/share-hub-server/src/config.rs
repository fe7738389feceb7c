//! Command-line and environment configuration.

use std::{net::SocketAddr, path::PathBuf, time::Duration};

use clap::Parser;
use share_hub_session::{DEFAULT_IDLE_TIMEOUT, DEFAULT_PAGE_LIMIT, DEFAULT_VIEWER_CAPACITY};
use share_hub_transport::{DEFAULT_ADMIN_SHORT_ID, HubConfig};

/// Session share hub server.
#[derive(Debug, Clone, Parser)]
#[command(name = "share-hub", version, about)]
pub struct ServerConfig {
    /// Address to listen on.
    #[arg(long, env = "SHARE_HUB_BIND", default_value = "127.0.0.1:3000")]
    pub bind: SocketAddr,

    /// Base URL embedded in share links.
    #[arg(long, env = "SHARE_HUB_PUBLIC_URL", default_value = "http://localhost:3000")]
    pub public_url: String,

    /// Directory for the archive store. Archived state is kept in memory when unset.
    #[arg(long, env = "SHARE_HUB_ARCHIVE_DIR")]
    pub archive_dir: Option<PathBuf>,

    /// SQLite URL for the durable store. State is kept in memory when unset.
    #[arg(long, env = "SHARE_HUB_DATABASE_URL")]
    pub database_url: Option<String>,

    /// Archive objects listed per page when a share is deleted.
    #[arg(long, env = "SHARE_HUB_ARCHIVE_PAGE_LIMIT", default_value_t = DEFAULT_PAGE_LIMIT)]
    pub archive_page_limit: usize,

    /// Seconds an actor without viewers stays alive after its last request.
    #[arg(long, env = "SHARE_HUB_IDLE_SECS", default_value_t = DEFAULT_IDLE_TIMEOUT.as_secs())]
    pub idle_secs: u64,

    /// Live frames buffered per viewer before a lagging viewer is dropped.
    #[arg(long, env = "SHARE_HUB_VIEWER_BUFFER", default_value_t = DEFAULT_VIEWER_CAPACITY)]
    pub viewer_buffer: usize,

    /// Short id cleared by the admin delete route.
    #[arg(long, env = "SHARE_HUB_ADMIN_SHORT_ID", default_value = DEFAULT_ADMIN_SHORT_ID)]
    pub admin_short_id: String,
}

impl ServerConfig {
    /// Transport settings derived from this configuration.
    #[must_use]
    pub fn hub_config(&self) -> HubConfig {
        HubConfig {
            public_url: self.public_url.clone(),
            admin_short_id: self.admin_short_id.clone(),
        }
    }

    /// Idle period after which an actor without viewers stops.
    #[must_use]
    pub const fn idle_timeout(&self) -> Duration {
        Duration::from_secs(self.idle_secs)
    }
}
