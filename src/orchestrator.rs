//! One invocation of the payout job: scan, dispatch, notify.

use std::num::NonZeroUsize;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tracing::{error, info, instrument, warn};

use crate::chain::{PayoutDispatcher, PotReader};
use crate::config::Tuning;
use crate::core::constants::DEFAULT_CACHE_CAPACITY;
use crate::core::{CachedPotState, Eligibility, EligibilitySet, Pot, PotId, ScanResult};
use crate::error::ScanError;
use crate::notify::{NotificationFanout, Notifier};
use crate::scout::{CacheStatistics, EligibilityClassifier, PotStateCache};

/// What the scanning phase collected
#[derive(Debug, Default)]
struct ScanPass {
    checked: u64,
    failed_reads: u64,
    eligible: EligibilitySet,
    /// Snapshots of payout-eligible pots, in the same order as `eligible.payout_eligible`
    payout_pots: Vec<Pot>,
}

pub struct ScanOrchestrator {
    reader: Arc<dyn PotReader>,
    dispatcher: Arc<dyn PayoutDispatcher>,
    classifier: EligibilityClassifier,
    fanout: NotificationFanout,
    /// Held for a whole invocation, so it also keeps overlapping runs apart
    cache: Mutex<PotStateCache>,
    max_scan_duration: Duration,
    lock_timeout: Duration,
}

impl ScanOrchestrator {
    pub fn new(
        reader: Arc<dyn PotReader>,
        dispatcher: Arc<dyn PayoutDispatcher>,
        notifier: Arc<dyn Notifier>,
        app_url: impl Into<String>,
        tuning: &Tuning,
    ) -> Self {
        let capacity = NonZeroUsize::new(tuning.cache.capacity)
            .or(NonZeroUsize::new(DEFAULT_CACHE_CAPACITY))
            .unwrap_or(NonZeroUsize::MIN);

        Self {
            classifier: EligibilityClassifier::new(Arc::clone(&reader)),
            fanout: NotificationFanout::new(Arc::clone(&reader), notifier, app_url),
            reader,
            dispatcher,
            cache: Mutex::new(PotStateCache::new(capacity, tuning.cache_ttl())),
            max_scan_duration: tuning.max_scan_duration(),
            lock_timeout: tuning.lock_timeout(),
        }
    }

    pub async fn run_now(&self) -> Result<ScanResult, ScanError> {
        self.run(unix_now()).await
    }

    /// Run one invocation as of `now` (unix seconds).
    ///
    /// A dispatch failure is reported as an unsuccessful `ScanResult`; only failing to
    /// start the scan at all is an `Err`.
    #[instrument(skip(self))]
    pub async fn run(&self, now: u64) -> Result<ScanResult, ScanError> {
        let mut cache = tokio::time::timeout(self.lock_timeout, self.cache.lock())
            .await
            .map_err(|_| ScanError::AlreadyRunning)?;
        let started = Instant::now();

        let pot_count = self.reader.pot_count().await.map_err(ScanError::PotCount)?;
        info!(pot_count, "🔍 Starting payout scan");

        let pass = self.scan(&mut cache, pot_count, now, started).await;
        let deferred_terminations = pass.eligible.termination_eligible.len() as u64;
        for pot_id in &pass.eligible.termination_eligible {
            // No batch termination entry point on the contract yet
            info!(pot_id, "Pot ready for termination, deferring action");
        }

        let payout_ids = &pass.eligible.payout_eligible;
        if payout_ids.is_empty() {
            info!(
                checked = pass.checked,
                failed_reads = pass.failed_reads,
                deferred_terminations,
                elapsed_ms = started.elapsed().as_millis() as u64,
                "Payout scan complete, nothing to pay out"
            );
            return Ok(ScanResult {
                checked_count: pass.checked,
                triggered_count: 0,
                success: true,
                error_message: None,
                failed_reads: pass.failed_reads,
                deferred_terminations,
                notifications: Vec::new(),
            });
        }

        let receipt = match self.dispatcher.dispatch_payouts(payout_ids).await {
            Ok(receipt) => receipt,
            Err(e) => {
                error!(pot_ids = ?payout_ids, error = %e, "❌ Payout batch failed");
                return Ok(ScanResult {
                    failed_reads: pass.failed_reads,
                    deferred_terminations,
                    ..ScanResult::failed(pass.checked, e.to_string())
                });
            }
        };

        // Notifications run under the lock as well; the next run must not
        // observe a half-finished invocation.
        let notifications = self.fanout.notify_all(&pass.payout_pots).await;
        let failed_notifications = notifications.iter().filter(|r| r.is_failure()).count();
        drop(cache);

        info!(
            tx_hash = %receipt.tx_hash,
            checked = pass.checked,
            triggered = payout_ids.len(),
            failed_reads = pass.failed_reads,
            deferred_terminations,
            failed_notifications,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "✅ Payout scan complete"
        );

        Ok(ScanResult {
            checked_count: pass.checked,
            triggered_count: payout_ids.len() as u64,
            success: true,
            error_message: None,
            failed_reads: pass.failed_reads,
            deferred_terminations,
            notifications,
        })
    }

    async fn scan(
        &self,
        cache: &mut PotStateCache,
        pot_count: u64,
        now: u64,
        started: Instant,
    ) -> ScanPass {
        let mut pass = ScanPass::default();

        for pot_id in 0..pot_count {
            if started.elapsed() >= self.max_scan_duration {
                warn!(
                    pot_id,
                    remaining = pot_count - pot_id,
                    "Scan budget exhausted, deferring remaining pots to the next run"
                );
                break;
            }
            pass.checked += 1;

            // A cached deadline still in the future is the only case that skips the chain
            if let Some(cached) = cache.lookup(pot_id, now) {
                if !cached.deadline_reached(now) {
                    continue;
                }
            }

            let pot = match self.reader.get_pot(pot_id).await {
                Ok(pot) => pot,
                Err(e) => {
                    warn!(pot_id, error = %e, "Failed to read pot, skipping this cycle");
                    pass.failed_reads += 1;
                    continue;
                }
            };
            let state = pot.state();
            cache.record(pot_id, state, now);

            match self.classifier.classify(pot_id, &state, now).await {
                Ok(eligibility) => {
                    if pass.eligible.insert(pot_id, eligibility) && eligibility == Eligibility::Payout {
                        pass.payout_pots.push(pot);
                    }
                }
                Err(e) => {
                    warn!(pot_id, error = %e, "Failed to simulate payout, skipping this cycle");
                    pass.failed_reads += 1;
                }
            }
        }

        pass
    }

    /// Last cached state of a pot, or `None` while a scan holds the cache
    pub fn cached_state(&self, pot_id: PotId, now: u64) -> Option<CachedPotState> {
        self.cache.try_lock().ok()?.lookup(pot_id, now)
    }

    pub fn is_running(&self) -> bool {
        self.cache.try_lock().is_err()
    }

    pub fn cache_statistics(&self) -> Option<CacheStatistics> {
        self.cache.try_lock().ok().map(|cache| cache.statistics())
    }
}

pub fn unix_now() -> u64 {
    chrono::Utc::now().timestamp().max(0) as u64
}
