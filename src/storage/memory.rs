//! In-memory storage backend (no persistence)
//!
//! This backend keeps samples in a ring buffer per host and alerts in a
//! bounded list. It's useful for:
//! - Testing without database dependencies
//! - Deployments without a database configured
//!
//! The backend can be switched unavailable at runtime, which makes every
//! write fail with [`StorageError::ConnectionFailed`] and the health check
//! report unhealthy. Tests use this to simulate a primary-store outage.
//!
//! ## Limitations
//!
//! - **No persistence**: All data lost on restart
//! - **Limited capacity**: oldest records are evicted

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::{debug, trace};
use uuid::Uuid;

use super::backend::{HealthStatus, StorageBackend};
use super::error::{StorageError, StorageResult};
use crate::{AlertEvent, ResourceSample};

/// Maximum samples to keep in memory per host
const MAX_SAMPLES_PER_HOST: usize = 1000;

/// Maximum alerts to keep in memory
const MAX_ALERTS: usize = 1000;

#[derive(Debug, Default)]
struct MemoryState {
    samples: HashMap<Uuid, VecDeque<ResourceSample>>,
    alerts: VecDeque<AlertEvent>,
}

/// In-memory storage backend
#[derive(Debug)]
pub struct MemoryBackend {
    state: RwLock<MemoryState>,

    /// When false, sample writes and health checks fail
    available: AtomicBool,

    /// When false, alert writes fail (independently of `available`)
    alerts_available: AtomicBool,
}

impl MemoryBackend {
    /// Create a new in-memory backend
    pub fn new() -> Self {
        Self {
            state: RwLock::new(MemoryState::default()),
            available: AtomicBool::new(true),
            alerts_available: AtomicBool::new(true),
        }
    }

    /// Simulate the store going down or coming back
    pub fn set_available(&self, available: bool) {
        debug!("in-memory backend availability set to {available}");
        self.available.store(available, Ordering::SeqCst);
    }

    /// Simulate failures on the alert table only
    pub fn set_alerts_available(&self, available: bool) {
        self.alerts_available.store(available, Ordering::SeqCst);
    }

    /// Total number of stored samples across all hosts
    pub async fn sample_count(&self) -> usize {
        self.state.read().await.samples.values().map(VecDeque::len).sum()
    }

    /// Number of stored alerts
    pub async fn alert_count(&self) -> usize {
        self.state.read().await.alerts.len()
    }

    fn ensure_available(&self) -> StorageResult<()> {
        if self.available.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(StorageError::ConnectionFailed(
                "in-memory backend marked unavailable".to_string(),
            ))
        }
    }
}

impl Default for MemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl StorageBackend for MemoryBackend {
    async fn insert_sample(&self, sample: &ResourceSample) -> StorageResult<()> {
        self.ensure_available()?;

        let mut state = self.state.write().await;
        let samples = state.samples.entry(sample.computer_id).or_default();
        samples.push_back(sample.clone());
        if samples.len() > MAX_SAMPLES_PER_HOST {
            samples.pop_front();
        }

        trace!("stored sample for {}", sample.computer_id);
        Ok(())
    }

    async fn insert_alert(&self, alert: &AlertEvent) -> StorageResult<()> {
        self.ensure_available()?;
        if !self.alerts_available.load(Ordering::SeqCst) {
            return Err(StorageError::QueryFailed(
                "alert table unavailable".to_string(),
            ));
        }

        let mut state = self.state.write().await;
        state.alerts.push_back(alert.clone());
        if state.alerts.len() > MAX_ALERTS {
            state.alerts.pop_front();
        }

        Ok(())
    }

    async fn query_latest(
        &self,
        computer_id: Uuid,
        limit: usize,
    ) -> StorageResult<Vec<ResourceSample>> {
        self.ensure_available()?;
        debug!("querying latest {} samples for {}", limit, computer_id);

        let state = self.state.read().await;
        let mut samples: Vec<ResourceSample> = state
            .samples
            .get(&computer_id)
            .map(|deque| deque.iter().cloned().collect())
            .unwrap_or_default();

        samples.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        samples.truncate(limit);
        Ok(samples)
    }

    async fn query_alerts(
        &self,
        resolved: Option<bool>,
        limit: usize,
    ) -> StorageResult<Vec<AlertEvent>> {
        self.ensure_available()?;

        let state = self.state.read().await;
        let mut alerts: Vec<AlertEvent> = state
            .alerts
            .iter()
            .filter(|a| resolved.is_none_or(|r| a.resolved == r))
            .cloned()
            .collect();

        alerts.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        alerts.truncate(limit);
        Ok(alerts)
    }

    async fn resolve_alert(&self, id: Uuid) -> StorageResult<bool> {
        self.ensure_available()?;

        let mut state = self.state.write().await;
        match state.alerts.iter_mut().find(|a| a.id == id) {
            Some(alert) => {
                alert.resolved = true;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn health_check(&self) -> StorageResult<HealthStatus> {
        let healthy = self.available.load(Ordering::SeqCst);
        let (samples, alerts) = {
            let state = self.state.read().await;
            (
                state.samples.values().map(VecDeque::len).sum::<usize>(),
                state.alerts.len(),
            )
        };

        Ok(HealthStatus {
            healthy,
            message: if healthy {
                "In-memory storage operational".to_string()
            } else {
                "In-memory storage unavailable".to_string()
            },
            metadata: HashMap::from([
                ("backend".to_string(), "memory".to_string()),
                ("total_samples".to_string(), samples.to_string()),
                ("total_alerts".to_string(), alerts.to_string()),
            ]),
        })
    }

    async fn get_stats(&self) -> StorageResult<String> {
        let state = self.state.read().await;
        Ok(format!(
            "In-Memory: {} samples across {} hosts, {} alerts",
            state.samples.values().map(VecDeque::len).sum::<usize>(),
            state.samples.len(),
            state.alerts.len()
        ))
    }

    async fn close(&self) -> StorageResult<()> {
        debug!("closing in-memory backend (no-op)");
        Ok(())
    }
}
