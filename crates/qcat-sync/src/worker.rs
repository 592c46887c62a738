//! Background delivery of outbox entries to the fact base.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use rand::Rng;
use rustc_hash::FxHashSet;
use serde::{Deserialize, Serialize};
use tokio::sync::Notify;
use tokio::time::{MissedTickBehavior, interval};
use tokio_util::sync::CancellationToken;

use crate::adapter::FactStoreAdapter;
use crate::error::SyncResult;
use crate::fact::FactKey;
use crate::outbox::Outbox;

/// Sync worker configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Interval between outbox polls when no wake-up arrives.
    pub poll_interval_ms: u64,
    /// Delay before the first retry of a failed entry.
    pub initial_backoff_ms: u64,
    /// Upper bound of the retry delay.
    pub max_backoff_ms: u64,
    /// Maximum entries read per pass.
    pub batch_size: usize,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: 500,
            initial_backoff_ms: 200,
            max_backoff_ms: 60_000,
            batch_size: 256,
        }
    }
}

impl SyncConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms.max(1))
    }

    /// Retry delay after the given number of failed attempts, without jitter.
    ///
    /// Doubles from `initial_backoff_ms` and saturates at `max_backoff_ms`.
    pub fn backoff_delay(&self, attempts: u32) -> Duration {
        let factor = 2u64.saturating_pow(attempts.saturating_sub(1));
        let ms = self
            .initial_backoff_ms
            .saturating_mul(factor)
            .min(self.max_backoff_ms);
        Duration::from_millis(ms)
    }
}

// Up to 10% on top of the base delay.
fn with_jitter(delay: Duration) -> Duration {
    let max_jitter = delay.as_millis() as u64 / 10;
    if max_jitter == 0 {
        return delay;
    }
    delay + Duration::from_millis(rand::thread_rng().gen_range(0..=max_jitter))
}

/// Outcome of one or more delivery passes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DrainReport {
    /// Entries applied and acknowledged.
    pub applied: usize,
    /// Entries that failed and were rescheduled.
    pub failed: usize,
    /// Entries skipped because they are not due yet or wait behind an
    /// earlier entry for the same record.
    pub deferred: usize,
}

impl DrainReport {
    fn absorb(&mut self, other: DrainReport) {
        self.applied += other.applied;
        self.failed += other.failed;
        self.deferred = other.deferred;
    }
}

/// Drains the outbox into the fact base.
///
/// Entries for the same record are applied strictly in sequence order; an
/// entry waiting on a retry blocks every later entry for that record but
/// not entries for other records. Failed entries are retried indefinitely
/// with capped exponential backoff.
pub struct SyncWorker {
    outbox: Arc<dyn Outbox>,
    adapter: FactStoreAdapter,
    config: SyncConfig,
    notify: Arc<Notify>,
}

impl SyncWorker {
    pub fn new(outbox: Arc<dyn Outbox>, adapter: FactStoreAdapter, config: SyncConfig) -> Self {
        Self {
            outbox,
            adapter,
            config,
            notify: Arc::new(Notify::new()),
        }
    }

    /// Handle that wakes the worker before its next poll.
    pub fn notifier(&self) -> Arc<Notify> {
        self.notify.clone()
    }

    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    /// One pass over the oldest `batch_size` entries.
    pub async fn run_once(&self) -> SyncResult<DrainReport> {
        let now = Utc::now();
        let entries = self.outbox.pending(self.config.batch_size).await?;
        let mut blocked: FxHashSet<FactKey> = FxHashSet::default();
        let mut report = DrainReport::default();

        for entry in entries {
            let key = entry.key();
            if blocked.contains(&key) || !entry.is_due(now) {
                blocked.insert(key);
                report.deferred += 1;
                continue;
            }

            match self.adapter.apply(&entry.mutation).await {
                Ok(()) => {
                    self.outbox.ack(entry.seq).await?;
                    report.applied += 1;
                }
                Err(e) => {
                    let attempts = entry.attempts.saturating_add(1);
                    let delay = with_jitter(self.config.backoff_delay(attempts));
                    let retry_at =
                        Utc::now() + chrono::Duration::milliseconds(delay.as_millis() as i64);
                    self.outbox
                        .record_failure(entry.seq, &e.to_string(), retry_at)
                        .await?;

                    if e.is_transient() {
                        tracing::warn!(
                            seq = entry.seq,
                            attempts,
                            "Failed to apply {}, retrying in {:?}: {}",
                            entry.mutation,
                            delay,
                            e
                        );
                    } else {
                        tracing::error!(
                            seq = entry.seq,
                            attempts,
                            "Fact base rejected {}, retrying in {:?}: {}",
                            entry.mutation,
                            delay,
                            e
                        );
                    }

                    blocked.insert(key);
                    report.failed += 1;
                }
            }
        }

        if report.applied > 0 || report.failed > 0 {
            tracing::debug!(
                applied = report.applied,
                failed = report.failed,
                deferred = report.deferred,
                "Outbox pass complete"
            );
        }
        Ok(report)
    }

    /// Repeat passes until one applies nothing.
    pub async fn run_until_idle(&self) -> SyncResult<DrainReport> {
        let mut total = DrainReport::default();
        loop {
            let report = self.run_once().await?;
            total.absorb(report);
            if report.applied == 0 {
                return Ok(total);
            }
        }
    }

    /// Run until `cancel` fires, draining on every poll tick and wake-up.
    pub async fn run(&self, cancel: CancellationToken) {
        let mut ticker = interval(self.config.poll_interval());
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        tracing::info!(
            poll_interval_ms = self.config.poll_interval_ms,
            "Sync worker started"
        );

        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = ticker.tick() => {}
                _ = self.notify.notified() => {}
            }

            if let Err(e) = self.run_until_idle().await {
                tracing::error!("Error draining outbox: {}", e);
            }
        }

        tracing::info!("Sync worker stopped");
    }

    /// Spawn [`run`](Self::run) on the current runtime.
    pub fn start(self: Arc<Self>, cancel: CancellationToken) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move { self.run(cancel).await })
    }
}

impl std::fmt::Debug for SyncWorker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyncWorker")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
