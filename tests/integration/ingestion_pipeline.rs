//! End-to-end tests for the ingestion pipeline
//!
//! These tests verify that:
//! - Accepted samples are stored or buffered, never both and never neither
//! - Rejected samples leave no trace anywhere
//! - Alerts and resource updates reach observers in order
//! - Alert persistence problems never suppress broadcasts

use std::sync::Arc;
use std::time::Duration;

use assert_matches::assert_matches;
use labwatch::{
    AlertCategory,
    actors::BroadcastHandle,
    buffer::FallbackBuffer,
    pipeline::{IngestError, IngestPipeline, IngestStatus},
    storage::memory::MemoryBackend,
};
use pretty_assertions::assert_eq;

use crate::helpers::*;

#[tokio::test]
async fn test_stored_sample_is_broadcast_without_buffering() {
    let t = test_pipeline();
    let (sink, mut observer) = channel_sink(false);
    t.hub.register(sink).await.unwrap();

    let report = t.pipeline.ingest(payload(35.0, 60.0)).await.unwrap();

    assert_eq!(report.status, IngestStatus::Stored);
    assert_eq!(t.backend.sample_count().await, 1);
    assert_eq!(t.buffer.pending().await.unwrap(), 0);

    let frame = observer.next_frame().await;
    assert_eq!(frame["type"], "resource_update");
    assert_eq!(frame["data"]["cpu"], 35.0);
    assert_eq!(
        frame["data"]["computer_id"],
        report.sample.computer_id.to_string()
    );
}

#[tokio::test]
async fn test_high_cpu_only_raises_one_alert() {
    let t = test_pipeline();
    let (sink, mut observer) = channel_sink(false);
    t.hub.register(sink).await.unwrap();

    let report = t.pipeline.ingest(payload(95.0, 50.0)).await.unwrap();

    assert_eq!(report.alerts.len(), 1);
    assert_eq!(report.alerts[0].category, AlertCategory::HighCpu);

    let alert = observer.next_frame().await;
    assert_eq!(alert["type"], "alert");
    assert_eq!(alert["data"]["category"], "high-cpu");
    assert_eq!(alert["data"]["message"], "CPU usage exceeds 90%");
    assert_eq!(alert["data"]["resolved"], false);

    let update = observer.next_frame().await;
    assert_eq!(update["type"], "resource_update");

    observer.assert_silent(Duration::from_millis(50)).await;
}

#[tokio::test]
async fn test_both_thresholds_raise_cpu_then_memory() {
    let t = test_pipeline();
    let (sink, mut observer) = channel_sink(false);
    t.hub.register(sink).await.unwrap();

    t.pipeline.ingest(payload(95.0, 95.0)).await.unwrap();

    assert_eq!(observer.next_frame().await["data"]["category"], "high-cpu");
    assert_eq!(
        observer.next_frame().await["data"]["category"],
        "high-memory"
    );
    assert_eq!(observer.next_frame().await["type"], "resource_update");
    assert_eq!(t.backend.alert_count().await, 2);
}

#[tokio::test]
async fn test_threshold_is_strict() {
    let t = test_pipeline();

    let report = t.pipeline.ingest(payload(90.0, 90.0)).await.unwrap();

    assert!(report.alerts.is_empty());
}

#[tokio::test]
async fn test_rejected_sample_leaves_no_trace() {
    let t = test_pipeline();
    let (sink, mut observer) = channel_sink(false);
    t.hub.register(sink).await.unwrap();

    for (cpu, memory) in [(-1.0, 10.0), (10.0, 100.5), (f64::NAN, 10.0)] {
        let result = t.pipeline.ingest(payload(cpu, memory)).await;
        assert_matches!(result, Err(IngestError::Validation(_)));
    }

    let mut negative_rate = payload(10.0, 10.0);
    negative_rate.network_out = -5.0;
    assert_matches!(
        t.pipeline.ingest(negative_rate).await,
        Err(IngestError::Validation(_))
    );

    assert_eq!(t.backend.sample_count().await, 0);
    assert_eq!(t.buffer.pending().await.unwrap(), 0);
    observer.assert_silent(Duration::from_millis(50)).await;
}

#[tokio::test]
async fn test_degraded_sample_is_buffered_once_and_broadcast() {
    let t = test_pipeline();
    t.backend.set_available(false);
    let (sink, mut observer) = channel_sink(false);
    t.hub.register(sink).await.unwrap();

    let report = t.pipeline.ingest(payload(95.0, 20.0)).await.unwrap();

    assert_eq!(report.status, IngestStatus::Degraded);
    let content = std::fs::read_to_string(t.buffer.path()).unwrap();
    assert_eq!(content.lines().count(), 1);

    assert_eq!(observer.next_frame().await["type"], "alert");
    assert_eq!(observer.next_frame().await["type"], "resource_update");
}

#[tokio::test]
async fn test_lost_sample_is_not_broadcast() {
    let dir = tempfile::tempdir().unwrap();
    let backend = Arc::new(MemoryBackend::new());
    backend.set_available(false);
    let hub = BroadcastHandle::spawn();
    // The buffer path is a directory, so appends fail
    let buffer = Arc::new(FallbackBuffer::new(dir.path()));
    let pipeline = IngestPipeline::new(backend, buffer, hub.clone());

    let (sink, mut observer) = channel_sink(false);
    hub.register(sink).await.unwrap();

    let result = pipeline.ingest(payload(99.0, 99.0)).await;

    assert_matches!(result, Err(IngestError::BufferWrite { .. }));
    observer.assert_silent(Duration::from_millis(50)).await;
}

#[tokio::test]
async fn test_alert_table_failure_does_not_block_broadcast() {
    let t = test_pipeline();
    t.backend.set_alerts_available(false);
    let (sink, mut observer) = channel_sink(false);
    t.hub.register(sink).await.unwrap();

    let report = t.pipeline.ingest(payload(20.0, 97.0)).await.unwrap();

    assert_eq!(report.status, IngestStatus::Stored);
    assert_eq!(t.backend.alert_count().await, 0);
    assert_eq!(observer.next_frame().await["data"]["category"], "high-memory");
    assert_eq!(observer.next_frame().await["type"], "resource_update");
}

#[tokio::test]
async fn test_concurrent_degraded_ingestion_buffers_every_sample() {
    let t = test_pipeline();
    t.backend.set_available(false);

    let mut handles = Vec::new();
    for i in 0..50 {
        let pipeline = t.pipeline.clone();
        handles.push(tokio::spawn(async move {
            pipeline.ingest(payload(i as f64, 10.0)).await
        }));
    }

    for handle in handles {
        let report = handle.await.unwrap().unwrap();
        assert_eq!(report.status, IngestStatus::Degraded);
    }

    let content = std::fs::read_to_string(t.buffer.path()).unwrap();
    assert_eq!(content.lines().count(), 50);
    for line in content.lines() {
        let value: serde_json::Value = serde_json::from_str(line).unwrap();
        assert!(value["cpu"].is_number());
    }
}
