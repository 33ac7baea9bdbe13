//! Outage and recovery tests
//!
//! These tests verify that samples buffered during a storage outage end up
//! in primary storage once it comes back, and that a failed replay keeps
//! every record for the next attempt.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use assert_matches::assert_matches;
use labwatch::{
    ResourceSample,
    actors::ReplayHandle,
    buffer::BufferError,
    pipeline::IngestStatus,
    storage::StorageBackend,
};
use pretty_assertions::assert_eq;
use uuid::Uuid;

use crate::helpers::*;

#[tokio::test]
async fn test_outage_then_replay_restores_samples() {
    let t = test_pipeline();
    let host = Uuid::new_v4();

    t.backend.set_available(false);
    for cpu in [10.0, 20.0, 30.0] {
        let report = t.pipeline.ingest(payload_for(host, cpu, 5.0)).await.unwrap();
        assert_eq!(report.status, IngestStatus::Degraded);
    }
    assert_eq!(t.buffer.pending().await.unwrap(), 3);

    t.backend.set_available(true);
    let replay = ReplayHandle::spawn(
        Arc::clone(&t.buffer),
        t.backend.clone(),
        Duration::from_secs(3600),
    );

    assert_eq!(replay.replay_now().await.unwrap(), 3);
    assert_eq!(t.buffer.pending().await.unwrap(), 0);

    let stored = t.backend.query_latest(host, 10).await.unwrap();
    let mut cpus: Vec<f64> = stored.iter().map(|s| s.cpu).collect();
    cpus.sort_by(f64::total_cmp);
    assert_eq!(cpus, vec![10.0, 20.0, 30.0]);

    replay.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_replay_failure_midway_keeps_all_records() {
    let t = test_pipeline();
    t.backend.set_available(false);
    for cpu in [1.0, 2.0, 3.0, 4.0] {
        t.pipeline.ingest(payload(cpu, 5.0)).await.unwrap();
    }
    let before = std::fs::read_to_string(t.buffer.path()).unwrap();

    let calls = AtomicUsize::new(0);
    let result = t
        .buffer
        .replay(|_sample: ResourceSample| {
            let call = calls.fetch_add(1, Ordering::SeqCst);
            async move {
                if call == 2 {
                    Err("database is locked")
                } else {
                    Ok(())
                }
            }
        })
        .await;

    assert_matches!(
        result,
        Err(BufferError::ReplayAborted {
            position: 2,
            total: 4,
            ..
        })
    );
    assert_eq!(std::fs::read_to_string(t.buffer.path()).unwrap(), before);
}

#[tokio::test]
async fn test_new_outage_after_replay_starts_fresh_log() {
    let t = test_pipeline();
    t.backend.set_available(false);
    t.pipeline.ingest(payload(1.0, 1.0)).await.unwrap();

    t.backend.set_available(true);
    let processed = t
        .buffer
        .replay(|sample| {
            let backend = t.backend.clone();
            async move { backend.insert_sample(&sample).await }
        })
        .await
        .unwrap();
    assert_eq!(processed, 1);

    t.backend.set_available(false);
    t.pipeline.ingest(payload(2.0, 2.0)).await.unwrap();

    let content = std::fs::read_to_string(t.buffer.path()).unwrap();
    assert_eq!(content.lines().count(), 1);
    assert!(content.contains("\"cpu\":2.0"));
}

#[tokio::test]
async fn test_scheduled_replay_recovers_after_outage() {
    let t = test_pipeline();
    t.backend.set_available(false);
    t.pipeline.ingest(payload(42.0, 5.0)).await.unwrap();

    let replay = ReplayHandle::spawn(
        Arc::clone(&t.buffer),
        t.backend.clone(),
        Duration::from_millis(20),
    );

    tokio::time::sleep(Duration::from_millis(80)).await;
    assert_eq!(t.buffer.pending().await.unwrap(), 1);

    t.backend.set_available(true);
    for _ in 0..100 {
        if t.buffer.pending().await.unwrap() == 0 {
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }

    assert_eq!(t.buffer.pending().await.unwrap(), 0);
    assert_eq!(t.backend.sample_count().await, 1);

    let stats = replay.stats().await.unwrap();
    assert_eq!(stats.records_replayed, 1);

    replay.shutdown().await.unwrap();
}
