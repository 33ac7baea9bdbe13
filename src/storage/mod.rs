//! Primary storage for samples and alerts
//!
//! The ingestion pipeline writes each accepted sample and each alert through
//! the [`StorageBackend`] trait. A failed sample write is not an ingestion
//! failure: the pipeline falls back to the local
//! [`FallbackBuffer`](crate::buffer::FallbackBuffer) instead.
//!
//! ## Backends
//!
//! - **SQLite** (default): Embedded database with migrations
//! - **In-Memory**: No persistence, for tests or database-less deployments
//!
//! ## Usage
//!
//! ```no_run
//! use labwatch::storage::{StorageBackend, sqlite::SqliteBackend};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let backend = SqliteBackend::new("./labwatch.db").await?;
//!     println!("{}", backend.get_stats().await?);
//!     Ok(())
//! }
//! ```

pub mod backend;
pub mod error;
pub mod memory;
#[cfg(feature = "storage-sqlite")]
pub mod sqlite;

pub use backend::{HealthStatus, StorageBackend};
pub use error::{StorageError, StorageResult};
