//! Background service bounding memory and disk usage.
//!
//! One sweep:
//! - Trims live results on disk to the retention policy
//! - Trims the garment cache to capacity
//! - Drops limiter state for idle clients
//!
//! Sweeps run on a fixed interval and additionally after every
//! `clean_every_writes` live results.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio::sync::Mutex;
use tokio::time::interval;
use tracing::{debug, info, warn};

use vtryon_storage::{sweep_live_results, GarmentCache, ResultStore, RetentionPolicy};

use super::rate_limiter::SlidingWindowLimiter;

/// Housekeeping settings.
#[derive(Debug, Clone, Copy)]
pub struct HousekeeperConfig {
    pub retention: RetentionPolicy,
    pub limiter_retention: Duration,
    pub clean_every_writes: u64,
    pub interval: Duration,
}

/// Outcome of one sweep.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SweepReport {
    pub results_deleted: usize,
    pub cache_evicted: usize,
    pub clients_pruned: usize,
}

/// Housekeeping service.
pub struct Housekeeper {
    store: ResultStore,
    cache: Arc<GarmentCache>,
    limiter: Arc<SlidingWindowLimiter>,
    config: HousekeeperConfig,
    writes: AtomicU64,
    // Serializes sweeps so the interval task and a write trigger never race
    sweep_lock: Mutex<()>,
}

impl Housekeeper {
    pub fn new(
        store: ResultStore,
        cache: Arc<GarmentCache>,
        limiter: Arc<SlidingWindowLimiter>,
        config: HousekeeperConfig,
    ) -> Self {
        Self {
            store,
            cache,
            limiter,
            config,
            writes: AtomicU64::new(0),
            sweep_lock: Mutex::new(()),
        }
    }

    /// Run one sweep now.
    pub async fn maybe_clean(&self) -> SweepReport {
        let _guard = self.sweep_lock.lock().await;

        let results_deleted = match sweep_live_results(&self.store, &self.config.retention).await {
            Ok(n) => n,
            Err(e) => {
                warn!(error = %e, "Live result sweep failed");
                0
            }
        };
        let cache_evicted = self.cache.trim();
        let clients_pruned = self.limiter.prune_stale(self.config.limiter_retention);

        let report = SweepReport {
            results_deleted,
            cache_evicted,
            clients_pruned,
        };
        if report != SweepReport::default() {
            info!(
                results_deleted,
                cache_evicted,
                clients_pruned,
                "Housekeeping sweep complete"
            );
        } else {
            debug!("Housekeeping sweep found nothing to do");
        }
        report
    }

    /// Count a live write; sweeps on every `clean_every_writes`th call.
    pub async fn record_write(&self) -> Option<SweepReport> {
        let every = self.config.clean_every_writes;
        let count = self.writes.fetch_add(1, Ordering::SeqCst) + 1;
        if every > 0 && count % every == 0 {
            debug!(writes = count, "Write threshold reached, sweeping");
            Some(self.maybe_clean().await)
        } else {
            None
        }
    }

    pub fn write_count(&self) -> u64 {
        self.writes.load(Ordering::SeqCst)
    }

    pub fn reset_write_count(&self) {
        self.writes.store(0, Ordering::SeqCst);
    }

    /// Start the background sweep loop.
    ///
    /// This function runs indefinitely and should be spawned as a background task.
    pub async fn run(self: Arc<Self>) {
        info!("Starting housekeeper (interval: {:?})", self.config.interval);

        let mut ticker = interval(self.config.interval);
        // The first tick completes immediately; skip it so startup is not slowed
        ticker.tick().await;

        loop {
            ticker.tick().await;
            self.maybe_clean().await;
        }
    }
}
