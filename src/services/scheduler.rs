use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;

use crate::metrics::WatchdogMetrics;
use crate::models::Target;
use crate::services::engine::StateEngine;
use crate::services::lister::TargetLister;
use crate::services::notifier::Notifier;

/// Summary of one poll cycle
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CycleReport {
    pub checked: usize,
    pub failed: usize,
    pub alerts_delivered: usize,
    pub interrupted: bool,
}

/// Drives the engine on a fixed interval until shutdown.
pub struct PollScheduler {
    targets: Vec<Target>,
    interval: Duration,
    lister: Arc<dyn TargetLister>,
    engine: Arc<StateEngine>,
    notifier: Arc<dyn Notifier>,
    metrics: Arc<WatchdogMetrics>,
}

impl PollScheduler {
    pub fn new(
        targets: Vec<Target>,
        interval: Duration,
        lister: Arc<dyn TargetLister>,
        engine: Arc<StateEngine>,
        notifier: Arc<dyn Notifier>,
        metrics: Arc<WatchdogMetrics>,
    ) -> Self {
        Self {
            targets,
            interval,
            lister,
            engine,
            notifier,
            metrics,
        }
    }

    /// Runs cycles back to back with `interval` between the end of one and the
    /// start of the next. Returns once `shutdown` flips to true or its sender
    /// is dropped.
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) {
        log::info!(
            "Poll scheduler started: {} targets, interval {}s",
            self.targets.len(),
            self.interval.as_secs()
        );

        loop {
            if *shutdown.borrow() {
                break;
            }

            let report = self.run_cycle(&shutdown).await;
            if report.interrupted {
                break;
            }

            tokio::select! {
                _ = tokio::time::sleep(self.interval) => {}
                _ = shutdown.changed() => break,
            }
        }

        log::info!("Poll scheduler stopped");
    }

    /// Checks every enabled target once, in configuration order.
    ///
    /// Each target runs in its own task so a panic while checking one target
    /// is contained and logged; the cycle moves on to the next target.
    pub async fn run_cycle(&self, shutdown: &watch::Receiver<bool>) -> CycleReport {
        let mut report = CycleReport::default();
        let active: Vec<&Target> = self.targets.iter().filter(|t| t.enabled).collect();

        if active.is_empty() {
            log::warn!("No enabled monitors configured");
            return report;
        }
        log::debug!("Checking {} monitors", active.len());

        for target in active {
            if *shutdown.borrow() {
                log::info!("Shutdown requested, abandoning the rest of the cycle");
                report.interrupted = true;
                return report;
            }

            let target = target.clone();
            let name = target.name.clone();
            let lister = self.lister.clone();
            let engine = self.engine.clone();
            let notifier = self.notifier.clone();

            let task = tokio::spawn(async move {
                let observation = lister.list_running(&target).await;
                engine
                    .observe(&target, &observation, Utc::now(), notifier.as_ref())
                    .await
            });

            match task.await {
                Ok(delivered) => {
                    report.checked += 1;
                    report.alerts_delivered += delivered;
                }
                Err(e) => {
                    report.failed += 1;
                    log::error!("Checking monitor [{}] failed: {}", name, e);
                }
            }
        }

        self.metrics.poll_cycles.inc();
        report
    }
}
