//! Helper functions for integration tests

#![allow(dead_code)]

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use labwatch::{
    SamplePayload,
    actors::{BroadcastHandle, HubStats, broadcast::DeliveryError, ObserverSink},
    buffer::FallbackBuffer,
    pipeline::IngestPipeline,
    storage::memory::MemoryBackend,
};
use tokio::sync::mpsc;
use uuid::Uuid;

pub fn payload(cpu: f64, memory: f64) -> SamplePayload {
    payload_for(Uuid::new_v4(), cpu, memory)
}

pub fn payload_for(computer_id: Uuid, cpu: f64, memory: f64) -> SamplePayload {
    SamplePayload {
        computer_id,
        cpu,
        memory,
        network_in: 1500.0,
        network_out: 300.0,
        timestamp: None,
    }
}

/// Observer sink that forwards every frame to a channel
pub struct ChannelSink {
    frames: mpsc::UnboundedSender<String>,
    broken: Arc<AtomicBool>,
    closes: Arc<AtomicUsize>,
}

/// Test-side view of a [`ChannelSink`]
pub struct ChannelObserver {
    pub frames: mpsc::UnboundedReceiver<String>,
    pub broken: Arc<AtomicBool>,
    pub closes: Arc<AtomicUsize>,
}

impl ChannelObserver {
    /// Next frame, failing the test after a second
    pub async fn next_frame(&mut self) -> serde_json::Value {
        let text = tokio::time::timeout(Duration::from_secs(1), self.frames.recv())
            .await
            .expect("timed out waiting for frame")
            .expect("sink dropped");
        serde_json::from_str(&text).expect("frame is not JSON")
    }

    /// Assert nothing arrives within `wait`
    pub async fn assert_silent(&mut self, wait: Duration) {
        let result = tokio::time::timeout(wait, self.frames.recv()).await;
        assert!(result.is_err(), "unexpected frame: {result:?}");
    }

    pub fn close_count(&self) -> usize {
        self.closes.load(Ordering::SeqCst)
    }
}

pub fn channel_sink(broken: bool) -> (ChannelSink, ChannelObserver) {
    let (tx, rx) = mpsc::unbounded_channel();
    let broken = Arc::new(AtomicBool::new(broken));
    let closes = Arc::new(AtomicUsize::new(0));

    (
        ChannelSink {
            frames: tx,
            broken: Arc::clone(&broken),
            closes: Arc::clone(&closes),
        },
        ChannelObserver {
            frames: rx,
            broken,
            closes,
        },
    )
}

#[async_trait]
impl ObserverSink for ChannelSink {
    async fn send_text(&mut self, text: &str) -> Result<(), DeliveryError> {
        if self.broken.load(Ordering::SeqCst) {
            return Err(DeliveryError::Transport("connection reset".to_string()));
        }
        self.frames
            .send(text.to_string())
            .map_err(|_| DeliveryError::Closed)
    }

    async fn send_binary(&mut self, data: &[u8]) -> Result<(), DeliveryError> {
        self.send_text(&String::from_utf8_lossy(data)).await
    }

    async fn close(&mut self) {
        self.closes.fetch_add(1, Ordering::SeqCst);
    }
}

/// Pipeline over an in-memory backend and a buffer in a temp dir
pub struct TestPipeline {
    pub dir: tempfile::TempDir,
    pub backend: Arc<MemoryBackend>,
    pub buffer: Arc<FallbackBuffer>,
    pub hub: BroadcastHandle,
    pub pipeline: IngestPipeline,
}

pub fn test_pipeline() -> TestPipeline {
    test_pipeline_with_hub(BroadcastHandle::spawn())
}

pub fn test_pipeline_with_hub(hub: BroadcastHandle) -> TestPipeline {
    let dir = tempfile::tempdir().unwrap();
    let backend = Arc::new(MemoryBackend::new());
    let buffer = Arc::new(FallbackBuffer::new(dir.path().join("buffer.log")));
    let pipeline = IngestPipeline::new(backend.clone(), Arc::clone(&buffer), hub.clone());

    TestPipeline {
        dir,
        backend,
        buffer,
        hub,
        pipeline,
    }
}

/// Poll hub stats until `check` passes, failing the test after a second
pub async fn wait_for_hub(hub: &BroadcastHandle, check: impl Fn(&HubStats) -> bool) -> HubStats {
    for _ in 0..100 {
        let stats = hub.stats().await.unwrap();
        if check(&stats) {
            return stats;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("hub never reached expected state");
}
