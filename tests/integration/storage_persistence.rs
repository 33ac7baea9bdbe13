//! Integration tests for SQLite persistence
//!
//! These tests verify that:
//! - Samples and alerts written through the pipeline survive a reopen
//! - Buffered samples replay into SQLite after an outage
//! - Alert resolution is persisted

use std::sync::Arc;
use std::time::Duration;

use labwatch::{
    AlertCategory,
    actors::{BroadcastHandle, ReplayHandle},
    buffer::FallbackBuffer,
    pipeline::{IngestPipeline, IngestStatus},
    storage::{StorageBackend, sqlite::SqliteBackend},
};
use pretty_assertions::assert_eq;
use tempfile::tempdir;
use uuid::Uuid;

use crate::helpers::*;

#[tokio::test]
async fn test_samples_and_alerts_survive_reopen() {
    let dir = tempdir().unwrap();
    let db_path = dir.path().join("labwatch.db");
    let host = Uuid::new_v4();

    {
        let backend: Arc<dyn StorageBackend> = Arc::new(SqliteBackend::new(&db_path).await.unwrap());
        let buffer = Arc::new(FallbackBuffer::new(dir.path().join("buffer.log")));
        let pipeline = IngestPipeline::new(Arc::clone(&backend), buffer, BroadcastHandle::spawn());

        let report = pipeline.ingest(payload_for(host, 96.0, 40.0)).await.unwrap();
        assert_eq!(report.status, IngestStatus::Stored);
        pipeline.ingest(payload_for(host, 20.0, 40.0)).await.unwrap();

        backend.close().await.unwrap();
    }

    let backend = SqliteBackend::new(&db_path).await.unwrap();

    let samples = backend.query_latest(host, 10).await.unwrap();
    assert_eq!(samples.len(), 2);

    let alerts = backend.query_alerts(None, 10).await.unwrap();
    assert_eq!(alerts.len(), 1);
    assert_eq!(alerts[0].category, AlertCategory::HighCpu);
    assert_eq!(alerts[0].computer_id, host);
}

#[tokio::test]
async fn test_buffered_samples_replay_into_sqlite() {
    let dir = tempdir().unwrap();
    let backend: Arc<dyn StorageBackend> =
        Arc::new(SqliteBackend::new(dir.path().join("labwatch.db")).await.unwrap());
    let buffer = Arc::new(FallbackBuffer::new(dir.path().join("buffer.log")));

    let host = Uuid::new_v4();
    for cpu in [11.0, 22.0] {
        let sample = payload_for(host, cpu, 10.0).into_sample(chrono::Utc::now());
        buffer.append(&sample).await.unwrap();
    }

    let replay = ReplayHandle::spawn(
        Arc::clone(&buffer),
        Arc::clone(&backend),
        Duration::from_secs(3600),
    );
    assert_eq!(replay.replay_now().await.unwrap(), 2);

    assert_eq!(buffer.pending().await.unwrap(), 0);
    assert_eq!(backend.query_latest(host, 10).await.unwrap().len(), 2);

    replay.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_resolution_is_persisted() {
    let dir = tempdir().unwrap();
    let db_path = dir.path().join("labwatch.db");

    let alert_id = {
        let backend: Arc<dyn StorageBackend> = Arc::new(SqliteBackend::new(&db_path).await.unwrap());
        let buffer = Arc::new(FallbackBuffer::new(dir.path().join("buffer.log")));
        let pipeline = IngestPipeline::new(Arc::clone(&backend), buffer, BroadcastHandle::spawn());

        let report = pipeline.ingest(payload(10.0, 99.0)).await.unwrap();
        let id = report.alerts[0].id;
        assert!(backend.resolve_alert(id).await.unwrap());
        backend.close().await.unwrap();
        id
    };

    let backend = SqliteBackend::new(&db_path).await.unwrap();
    let resolved = backend.query_alerts(Some(true), 10).await.unwrap();
    assert_eq!(resolved.len(), 1);
    assert_eq!(resolved[0].id, alert_id);
    assert!(backend.query_alerts(Some(false), 10).await.unwrap().is_empty());
}
