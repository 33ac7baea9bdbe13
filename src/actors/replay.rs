//! ReplayActor - Drains the fallback buffer into primary storage
//!
//! Samples land in the [`FallbackBuffer`] while the primary store is down.
//! This actor checks on an interval whether there is anything buffered and
//! whether the backend reports healthy again, and if so replays the buffer
//! with `insert_sample` as the processor.
//!
//! ```text
//! Timer tick → pending > 0? → backend healthy? → replay(insert_sample)
//!     ↑
//!     └─── Commands (ReplayNow, GetStats, Shutdown)
//! ```
//!
//! Replayed samples are not broadcast again; observers saw them at ingest time.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::sync::{mpsc, oneshot};
use tokio::time::{MissedTickBehavior, interval};
use tracing::{debug, info, instrument, trace, warn};

use super::messages::{ReplayCommand, ReplayStats};
use crate::buffer::{BufferError, FallbackBuffer};
use crate::storage::StorageBackend;

pub struct ReplayActor {
    buffer: Arc<FallbackBuffer>,

    backend: Arc<dyn StorageBackend>,

    /// Command receiver for control messages
    command_rx: mpsc::Receiver<ReplayCommand>,

    interval_duration: Duration,

    stats: ReplayStats,
}

impl ReplayActor {
    pub fn new(
        buffer: Arc<FallbackBuffer>,
        backend: Arc<dyn StorageBackend>,
        command_rx: mpsc::Receiver<ReplayCommand>,
        interval_duration: Duration,
    ) -> Self {
        Self {
            buffer,
            backend,
            command_rx,
            interval_duration,
            stats: ReplayStats::default(),
        }
    }

    /// Run the actor's main loop
    ///
    /// Runs until a Shutdown command arrives or the command channel closes.
    #[instrument(skip(self), fields(buffer = %self.buffer.path().display()))]
    pub async fn run(mut self) {
        debug!("starting replay actor");

        let mut ticker = interval(self.interval_duration);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    self.scheduled_replay().await;
                }

                cmd = self.command_rx.recv() => {
                    match cmd {
                        Some(ReplayCommand::ReplayNow { respond_to }) => {
                            debug!("received ReplayNow command");
                            let result = self.replay().await.map_err(anyhow::Error::from);
                            let _ = respond_to.send(result);
                        }

                        Some(ReplayCommand::GetStats { respond_to }) => {
                            let _ = respond_to.send(self.stats.clone());
                        }

                        Some(ReplayCommand::Shutdown) => {
                            debug!("received shutdown command");
                            break;
                        }

                        None => {
                            warn!("command channel closed, shutting down");
                            break;
                        }
                    }
                }
            }
        }

        debug!("replay actor stopped");
    }

    /// Replay only if something is buffered and the backend looks healthy
    async fn scheduled_replay(&mut self) {
        match self.buffer.pending().await {
            Ok(0) => {
                trace!("buffer empty, nothing to replay");
                return;
            }
            Ok(pending) => trace!("{pending} samples buffered"),
            Err(e) => {
                warn!("failed to inspect fallback buffer: {}", e);
                return;
            }
        }

        match self.backend.health_check().await {
            Ok(health) if health.healthy => {}
            Ok(health) => {
                debug!("backend still unhealthy, skipping replay: {}", health.message);
                return;
            }
            Err(e) => {
                debug!("health check failed, skipping replay: {}", e);
                return;
            }
        }

        // Errors are recorded in the stats and retried on the next tick
        let _ = self.replay().await;
    }

    async fn replay(&mut self) -> Result<usize, BufferError> {
        self.stats.runs += 1;

        let backend = &self.backend;
        let result = self
            .buffer
            .replay(|sample| {
                let backend = Arc::clone(backend);
                async move { backend.insert_sample(&sample).await }
            })
            .await;

        match &result {
            Ok(0) => trace!("replay found nothing to do"),
            Ok(count) => {
                self.stats.records_replayed += *count as u64;
                info!("replayed {} buffered samples into primary storage", count);
            }
            Err(e) => {
                self.stats.aborted_runs += 1;
                self.stats.last_error = Some(e.to_string());
                warn!("replay aborted: {}", e);
            }
        }

        result
    }
}

/// Handle for controlling the ReplayActor
#[derive(Clone, Debug)]
pub struct ReplayHandle {
    sender: mpsc::Sender<ReplayCommand>,
}

impl ReplayHandle {
    /// Spawn a new replay actor ticking every `interval_duration`
    pub fn spawn(
        buffer: Arc<FallbackBuffer>,
        backend: Arc<dyn StorageBackend>,
        interval_duration: Duration,
    ) -> Self {
        let (cmd_tx, cmd_rx) = mpsc::channel(32);

        let actor = ReplayActor::new(buffer, backend, cmd_rx, interval_duration);
        tokio::spawn(actor.run());

        Self { sender: cmd_tx }
    }

    /// Replay the buffer immediately, skipping the health check
    ///
    /// Returns the number of samples moved into primary storage.
    pub async fn replay_now(&self) -> Result<usize> {
        let (tx, rx) = oneshot::channel();
        self.sender
            .send(ReplayCommand::ReplayNow { respond_to: tx })
            .await
            .context("failed to send ReplayNow command")?;

        rx.await.context("failed to receive response")?
    }

    /// Get replay statistics
    pub async fn stats(&self) -> Result<ReplayStats> {
        let (tx, rx) = oneshot::channel();
        self.sender
            .send(ReplayCommand::GetStats { respond_to: tx })
            .await
            .context("failed to send GetStats command")?;

        rx.await.context("failed to receive response")
    }

    /// Gracefully shut down the replay actor
    pub async fn shutdown(&self) -> Result<()> {
        self.sender
            .send(ReplayCommand::Shutdown)
            .await
            .context("failed to send Shutdown command")?;
        Ok(())
    }
}
