use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;

use tracing::{debug, trace};

use crate::util;

/// Storage backend configuration
#[derive(Debug, Clone, PartialEq, serde::Deserialize)]
#[serde(tag = "backend", rename_all = "lowercase")]
pub enum StorageConfig {
    /// In-memory storage (no persistence)
    #[serde(rename = "none")]
    None,

    /// SQLite database (default for most deployments)
    Sqlite {
        /// Path to the SQLite database file
        #[serde(default = "default_sqlite_path")]
        path: PathBuf,
    },
}

impl Default for StorageConfig {
    fn default() -> Self {
        StorageConfig::Sqlite {
            path: default_sqlite_path(),
        }
    }
}

fn default_sqlite_path() -> PathBuf {
    PathBuf::from("./labwatch.db")
}

/// Fallback buffer configuration
#[derive(Debug, Clone, PartialEq, serde::Deserialize)]
#[serde(default)]
pub struct BufferConfig {
    /// Log file samples are appended to while storage is down
    pub path: PathBuf,

    /// How often the replay actor checks whether it can drain the log
    pub replay_interval_secs: u64,
}

impl BufferConfig {
    pub fn replay_interval(&self) -> Duration {
        Duration::from_secs(self.replay_interval_secs.max(1))
    }
}

impl Default for BufferConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("buffer.log"),
            replay_interval_secs: 30,
        }
    }
}

/// HTTP/WebSocket server configuration
#[derive(Debug, Clone, PartialEq, serde::Deserialize)]
#[serde(default)]
pub struct ApiSettings {
    pub bind: SocketAddr,

    pub enable_cors: bool,

    /// Deadline for a single WebSocket write before the observer is dropped
    pub write_timeout_secs: u64,
}

impl ApiSettings {
    pub fn write_timeout(&self) -> Duration {
        Duration::from_secs(self.write_timeout_secs)
    }
}

impl Default for ApiSettings {
    fn default() -> Self {
        Self {
            bind: SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), 8080),
            enable_cors: true,
            write_timeout_secs: 10,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, serde::Deserialize)]
#[serde(default)]
pub struct Config {
    pub storage: StorageConfig,

    pub buffer: BufferConfig,

    pub api: ApiSettings,
}

impl Config {
    /// Apply `PORT`, `HUB_ADDR`, `BUFFER_FILE` and `DATABASE_PATH` on top of
    /// the file values
    pub fn with_env_overrides(mut self) -> Self {
        if let Some(port) = util::get_port() {
            debug!("PORT override: {port}");
            self.api.bind.set_port(port);
        }

        if let Some(addr) = util::get_addr() {
            debug!("HUB_ADDR override: {addr}");
            self.api.bind.set_ip(addr);
        }

        if let Some(path) = util::get_buffer_path() {
            debug!("BUFFER_FILE override: {}", path.display());
            self.buffer.path = path;
        }

        if let Some(db_path) = util::get_database_path()
            && let StorageConfig::Sqlite { path } = &mut self.storage
        {
            debug!("DATABASE_PATH override: {}", db_path.display());
            *path = db_path;
        }

        self
    }
}

pub fn read_config_file(path: &str) -> anyhow::Result<Config> {
    let file_content = std::fs::read_to_string(path)?;
    serde_json::from_str(&file_content)
        .map_err(|e| anyhow::anyhow!("Invalid configuration file provided: {e}"))
        .inspect(|config| trace!("loaded config: {config:?}"))
}
