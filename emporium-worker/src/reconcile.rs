use std::future::Future;
use std::num::NonZeroU64;
use std::time::Duration;

use emporium_core::{CatalogService, ReconcileReport};
use tokio::time::{interval, MissedTickBehavior};
use tracing::{error, info};

/// Running totals over every pass of the periodic job.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconcileTotals {
    pub passes: u64,
    pub failed_passes: u64,
    pub corrected: u64,
    pub last: Option<ReconcileReport>,
}

impl ReconcileTotals {
    fn record(&mut self, report: ReconcileReport) {
        self.passes += 1;
        self.corrected += report.corrected as u64;
        self.last = Some(report);
    }
}

/// Runs a reconciliation pass every `period_seconds` until `shutdown` resolves.
pub async fn run_periodic<F>(service: CatalogService, period_seconds: NonZeroU64, shutdown: F) -> ReconcileTotals
where
    F: Future<Output = ()>,
{
    let period = Duration::from_secs(period_seconds.get());
    let mut ticker = interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    tokio::pin!(shutdown);

    let mut totals = ReconcileTotals::default();
    info!("Reconciling ratings every {:?}", period);

    loop {
        tokio::select! {
            _ = &mut shutdown => {
                info!("Shutdown requested, stopping reconciliation");
                break;
            }
            _ = ticker.tick() => {
                match service.reconcile_ratings().await {
                    Ok(report) => {
                        info!(
                            "Reconciliation pass {}: {} products, {} corrected, {} failed",
                            totals.passes + 1,
                            report.products,
                            report.corrected,
                            report.failed
                        );
                        totals.record(report);
                    }
                    Err(e) => {
                        error!("Reconciliation pass failed: {}", e);
                        totals.failed_passes += 1;
                    }
                }
            }
        }
    }

    totals
}
