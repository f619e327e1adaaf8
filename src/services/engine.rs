//! Per-pair process state machine and alert gating.
//!
//! ```text
//!   prev \ observed   Running              Stopped
//!   Unknown           baseline             baseline
//!   Running           -                    arm alert, candidate
//!   Stopped           recovered, disarm    candidate if armed
//! ```
//!
//! Candidates go through the cooldown tracker in [`StateEngine::evaluate`];
//! the cooldown is only consumed by a successful delivery in
//! [`StateEngine::deliver`].

use chrono::{DateTime, Local, Utc};
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Duration;

use crate::metrics::WatchdogMetrics;
use crate::models::{
    AgentStatus, AlertEvent, Locator, Observation, PairKey, ProcessState, ProcessStatus, Target,
    TargetStatus, TrackedPair,
};
use crate::services::cooldown::CooldownTracker;
use crate::services::notifier::{alert_message, Notifier};

/// Outcome of the last poll of a target
#[derive(Debug, Clone, Copy)]
struct TargetHealth {
    reachable: bool,
    checked_at: DateTime<Utc>,
}

#[derive(Default)]
struct StateTable {
    pairs: HashMap<PairKey, TrackedPair>,
    cooldown: CooldownTracker,
    targets: HashMap<String, TargetHealth>,
}

pub struct StateEngine {
    table: RwLock<StateTable>,
    cooldown: Duration,
    /// Name put in alert messages to identify this watchdog
    reporter: String,
    metrics: Arc<WatchdogMetrics>,
}

impl StateEngine {
    pub fn new(cooldown: Duration, reporter: impl Into<String>, metrics: Arc<WatchdogMetrics>) -> Self {
        Self {
            table: RwLock::new(StateTable::default()),
            cooldown,
            reporter: reporter.into(),
            metrics,
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, StateTable> {
        self.table.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, StateTable> {
        self.table.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Applies one observation of `target` and returns the alerts that passed
    /// the cooldown check and should be delivered.
    pub fn evaluate(&self, target: &Target, observation: &Observation, now: DateTime<Utc>) -> Vec<AlertEvent> {
        let processes = match observation {
            Observation::Unavailable { reason } => {
                log::warn!("Target [{}] ({}) unavailable: {}", target.name, target.locator, reason);
                self.write().targets.insert(
                    target.name.clone(),
                    TargetHealth { reachable: false, checked_at: now },
                );
                self.metrics.set_reachable(&target.name, false);
                return Vec::new();
            }
            Observation::Processes(set) => set,
        };

        let mut guard = self.write();
        let table = &mut *guard;
        table.targets.insert(
            target.name.clone(),
            TargetHealth { reachable: true, checked_at: now },
        );
        self.metrics.set_reachable(&target.name, true);

        let mut alerts = Vec::new();
        for process in &target.processes {
            let key = PairKey::new(&target.name, process);
            let observed = if processes.contains(process) {
                ProcessState::Running
            } else {
                ProcessState::Stopped
            };

            let pair = table.pairs.entry(key.clone()).or_default();
            let prev = pair.state;

            match (prev, observed) {
                (ProcessState::Unknown, _) => {
                    log::info!(
                        "Start monitoring {} (currently {})",
                        key,
                        if observed == ProcessState::Running { "running" } else { "stopped" }
                    );
                }
                (ProcessState::Running, ProcessState::Stopped) => {
                    log::warn!("Process stopped: {}", key);
                    pair.alert_armed = true;
                    pair.alert_delivered = false;
                    pair.down_since = Some(now);
                }
                (ProcessState::Stopped, ProcessState::Running) => {
                    log::info!("Process recovered: {}", key);
                    pair.alert_armed = false;
                    pair.alert_delivered = false;
                    pair.down_since = None;
                }
                _ => {}
            }
            pair.state = observed;
            self.metrics.set_process_state(&target.name, process, observed);

            if observed != ProcessState::Stopped || !pair.alert_armed {
                continue;
            }

            if table.cooldown.should_alert(&key, now, self.cooldown) {
                alerts.push(AlertEvent {
                    key,
                    locator: target.locator.to_string(),
                    reminder: pair.alert_delivered,
                    observed_at: now,
                    down_since: pair.down_since,
                });
            } else {
                let left = table.cooldown.remaining(&key, now, self.cooldown).unwrap_or_default();
                log::debug!("{} within cooldown, alert skipped ({}s left)", key, left.as_secs());
                self.metrics
                    .alerts_suppressed
                    .with_label_values(&[&target.name, process])
                    .inc();
            }
        }
        alerts
    }

    /// Sends each alert; the pair's cooldown starts only when delivery succeeds.
    /// Returns the number of delivered alerts.
    pub async fn deliver(&self, events: Vec<AlertEvent>, notifier: &dyn Notifier) -> usize {
        let mut delivered = 0;
        for event in events {
            let labels = [event.key.target.as_str(), event.key.process.as_str()];
            let message = alert_message(&event, &self.reporter);

            if notifier.notify(&message).await {
                let mut table = self.write();
                table.cooldown.record_alert(&event.key, event.observed_at);
                if let Some(pair) = table.pairs.get_mut(&event.key) {
                    pair.alert_delivered = true;
                }
                drop(table);
                self.metrics.alerts_sent.with_label_values(&labels).inc();
                delivered += 1;
            } else {
                log::error!("Failed to deliver stop alert for {}, will retry next cycle", event.key);
                self.metrics.alerts_failed.with_label_values(&labels).inc();
            }
        }
        delivered
    }

    /// `evaluate` followed by `deliver`
    pub async fn observe(
        &self,
        target: &Target,
        observation: &Observation,
        now: DateTime<Utc>,
        notifier: &dyn Notifier,
    ) -> usize {
        let events = self.evaluate(target, observation, now);
        if events.is_empty() {
            return 0;
        }
        self.deliver(events, notifier).await
    }

    #[cfg(test)]
    pub fn process_state(&self, key: &PairKey) -> ProcessState {
        self.read().pairs.get(key).map(|p| p.state).unwrap_or_default()
    }

    #[cfg(test)]
    pub fn last_alert(&self, key: &PairKey) -> Option<DateTime<Utc>> {
        self.read().cooldown.last_alert(key)
    }

    /// Read-only projection of the table, in the order of `targets`.
    /// Agent health fields are filled in by the status reporter.
    pub fn snapshot(&self, targets: &[Target]) -> Vec<TargetStatus> {
        let table = self.read();
        targets
            .iter()
            .map(|target| {
                let health = table.targets.get(&target.name);
                let processes = target
                    .processes
                    .iter()
                    .map(|process| {
                        let key = PairKey::new(&target.name, process);
                        let state = table.pairs.get(&key).map(|p| p.state).unwrap_or_default();
                        ProcessStatus {
                            name: process.clone(),
                            running: state.as_running(),
                            last_alert: table
                                .cooldown
                                .last_alert(&key)
                                .map(format_time)
                                .unwrap_or_else(|| "never".to_string()),
                        }
                    })
                    .collect();

                TargetStatus {
                    name: target.name.clone(),
                    locator: target.locator.to_string(),
                    enabled: target.enabled,
                    description: target.description.clone(),
                    agent_status: match (&target.locator, target.enabled) {
                        (_, false) => AgentStatus::Disabled,
                        (Locator::Local, true) => AgentStatus::Local,
                        (Locator::Remote { .. }, true) => AgentStatus::Offline,
                    },
                    agent_hostname: None,
                    reachable: health.map(|h| h.reachable),
                    last_checked: health.map(|h| format_time(h.checked_at)),
                    processes,
                }
            })
            .collect()
    }
}

fn format_time(t: DateTime<Utc>) -> String {
    t.with_timezone(&Local).format("%Y-%m-%d %H:%M:%S").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ProcessSet;
    use async_trait::async_trait;
    use chrono::TimeZone;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Mutex;

    /// Records every message; delivery outcome is switchable.
    struct RecordingNotifier {
        sent: Mutex<Vec<String>>,
        succeed: AtomicBool,
    }

    impl RecordingNotifier {
        fn new(succeed: bool) -> Self {
            Self {
                sent: Mutex::new(Vec::new()),
                succeed: AtomicBool::new(succeed),
            }
        }

        fn calls(&self) -> usize {
            self.sent.lock().unwrap().len()
        }

        fn set_succeed(&self, ok: bool) {
            self.succeed.store(ok, Ordering::SeqCst);
        }
    }

    #[async_trait]
    impl Notifier for RecordingNotifier {
        async fn notify(&self, message: &str) -> bool {
            self.sent.lock().unwrap().push(message.to_string());
            self.succeed.load(Ordering::SeqCst)
        }
    }

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap()
    }

    fn engine(cooldown_secs: u64) -> StateEngine {
        StateEngine::new(
            Duration::from_secs(cooldown_secs),
            "test-host",
            Arc::new(WatchdogMetrics::new().unwrap()),
        )
    }

    fn target(processes: &[&str]) -> Target {
        Target {
            name: "web".into(),
            locator: Locator::Remote { host: "10.0.0.2".into(), port: 8888 },
            enabled: true,
            processes: processes.iter().map(|p| p.to_string()).collect(),
            description: String::new(),
        }
    }

    fn running(names: &[&str]) -> Observation {
        Observation::Processes(ProcessSet::exact(names.iter().copied()))
    }

    fn stopped() -> Observation {
        running(&[])
    }

    fn key(process: &str) -> PairKey {
        PairKey::new("web", process)
    }

    #[tokio::test]
    async fn first_observation_never_alerts() {
        let engine = engine(300);
        let notifier = RecordingNotifier::new(true);
        let t = target(&["nginx"]);

        assert_eq!(engine.observe(&t, &stopped(), at(0), &notifier).await, 0);
        assert_eq!(engine.process_state(&key("nginx")), ProcessState::Stopped);
        // Baseline Stopped stays quiet on later cycles too
        assert_eq!(engine.observe(&t, &stopped(), at(400), &notifier).await, 0);
        assert_eq!(notifier.calls(), 0);
    }

    #[tokio::test]
    async fn running_to_stopped_alerts_once_within_cooldown() {
        let engine = engine(300);
        let notifier = RecordingNotifier::new(true);
        let t = target(&["nginx"]);

        engine.observe(&t, &running(&["nginx"]), at(0), &notifier).await;
        assert_eq!(engine.observe(&t, &stopped(), at(30), &notifier).await, 1);
        for i in 2..10 {
            engine.observe(&t, &stopped(), at(30 * i), &notifier).await;
        }
        assert_eq!(notifier.calls(), 1);
        assert_eq!(engine.last_alert(&key("nginx")), Some(at(30)));
    }

    #[tokio::test]
    async fn failed_delivery_does_not_consume_cooldown() {
        let engine = engine(300);
        let notifier = RecordingNotifier::new(false);
        let t = target(&["nginx"]);

        engine.observe(&t, &running(&["nginx"]), at(0), &notifier).await;
        assert_eq!(engine.observe(&t, &stopped(), at(10), &notifier).await, 0);
        assert!(engine.last_alert(&key("nginx")).is_none());

        // Next cycle, well within the cooldown window, tries again
        notifier.set_succeed(true);
        assert_eq!(engine.observe(&t, &stopped(), at(11), &notifier).await, 1);
        assert_eq!(notifier.calls(), 2);
        assert_eq!(engine.last_alert(&key("nginx")), Some(at(11)));
    }

    #[tokio::test]
    async fn retried_first_alert_is_not_a_reminder() {
        let engine = engine(5);
        let notifier = RecordingNotifier::new(false);
        let t = target(&["nginx"]);

        engine.observe(&t, &running(&["nginx"]), at(0), &notifier).await;
        assert_eq!(engine.observe(&t, &stopped(), at(1), &notifier).await, 0);

        notifier.set_succeed(true);
        assert_eq!(engine.observe(&t, &stopped(), at(2), &notifier).await, 1);
        assert_eq!(engine.observe(&t, &stopped(), at(7), &notifier).await, 1);

        let sent = notifier.sent.lock().unwrap();
        assert_eq!(sent.len(), 3);
        assert!(sent[1].starts_with("[Process Alert]\n"));
        assert!(sent[2].contains("still stopped"));
    }

    #[tokio::test]
    async fn new_outage_starts_without_reminder() {
        let engine = engine(0);
        let t = target(&["nginx"]);

        engine.evaluate(&t, &running(&["nginx"]), at(0));
        let first = engine.evaluate(&t, &stopped(), at(1));
        assert!(!first[0].is_reminder());
        let notifier = RecordingNotifier::new(true);
        engine.deliver(first, &notifier).await;
        assert!(engine.evaluate(&t, &stopped(), at(2))[0].is_reminder());

        engine.evaluate(&t, &running(&["nginx"]), at(3));
        assert!(!engine.evaluate(&t, &stopped(), at(4))[0].is_reminder());
    }

    #[tokio::test]
    async fn unavailable_target_is_inert() {
        let engine = engine(300);
        let notifier = RecordingNotifier::new(true);
        let t = target(&["nginx", "sshd"]);

        engine.observe(&t, &running(&["nginx"]), at(0), &notifier).await;
        for i in 1..=3 {
            let events = engine.evaluate(&t, &Observation::unavailable("HTTP 500"), at(i));
            assert!(events.is_empty());
        }
        assert_eq!(engine.process_state(&key("nginx")), ProcessState::Running);
        assert_eq!(engine.process_state(&key("sshd")), ProcessState::Stopped);
        assert_eq!(engine.metrics.unavailable_count("web"), 3.0);
        assert_eq!(notifier.calls(), 0);

        let status = engine.snapshot(&[t]);
        assert_eq!(status[0].reachable, Some(false));
    }

    #[tokio::test]
    async fn unavailable_before_first_observation_keeps_unknown() {
        let engine = engine(300);
        let t = target(&["nginx"]);
        engine.evaluate(&t, &Observation::unavailable("timeout"), at(0));
        assert_eq!(engine.process_state(&key("nginx")), ProcessState::Unknown);
    }

    #[tokio::test]
    async fn flapping_within_cooldown_alerts_once() {
        let engine = engine(300);
        let notifier = RecordingNotifier::new(true);
        let t = target(&["nginx"]);

        engine.observe(&t, &running(&["nginx"]), at(0), &notifier).await;
        engine.observe(&t, &stopped(), at(10), &notifier).await;
        engine.observe(&t, &running(&["nginx"]), at(20), &notifier).await;
        engine.observe(&t, &stopped(), at(30), &notifier).await;
        engine.observe(&t, &running(&["nginx"]), at(40), &notifier).await;
        engine.observe(&t, &stopped(), at(50), &notifier).await;

        assert_eq!(notifier.calls(), 1);
    }

    #[tokio::test]
    async fn recovery_never_notifies() {
        let engine = engine(0);
        let notifier = RecordingNotifier::new(true);
        let t = target(&["nginx"]);

        engine.observe(&t, &stopped(), at(0), &notifier).await;
        assert!(engine.evaluate(&t, &running(&["nginx"]), at(1)).is_empty());
        assert_eq!(engine.process_state(&key("nginx")), ProcessState::Running);
        assert_eq!(notifier.calls(), 0);
    }

    #[tokio::test]
    async fn short_interval_scenario() {
        // interval 1s, cooldown 5s
        let engine = engine(5);
        let notifier = RecordingNotifier::new(true);
        let t = target(&["P"]);

        assert_eq!(engine.observe(&t, &stopped(), at(0), &notifier).await, 0); // baseline
        assert_eq!(engine.observe(&t, &running(&["P"]), at(1), &notifier).await, 0); // recovered
        assert_eq!(engine.observe(&t, &stopped(), at(2), &notifier).await, 1); // alert
        assert_eq!(engine.last_alert(&key("P")), Some(at(2)));
        assert_eq!(engine.observe(&t, &stopped(), at(3), &notifier).await, 0);
        assert_eq!(engine.observe(&t, &stopped(), at(6), &notifier).await, 0);
        // Still down once the window has elapsed: reminder
        assert_eq!(engine.observe(&t, &stopped(), at(7), &notifier).await, 1);
        assert_eq!(engine.last_alert(&key("P")), Some(at(7)));
        assert_eq!(notifier.calls(), 2);
        assert!(notifier.sent.lock().unwrap()[1].contains("still stopped"));
    }

    #[tokio::test]
    async fn state_updates_even_when_alert_suppressed() {
        let engine = engine(300);
        let notifier = RecordingNotifier::new(true);
        let t = target(&["nginx"]);

        engine.observe(&t, &running(&["nginx"]), at(0), &notifier).await;
        engine.observe(&t, &stopped(), at(1), &notifier).await;
        engine.observe(&t, &running(&["nginx"]), at(2), &notifier).await;
        let events = engine.evaluate(&t, &stopped(), at(3));
        assert!(events.is_empty());
        assert_eq!(engine.process_state(&key("nginx")), ProcessState::Stopped);
    }

    #[tokio::test]
    async fn pairs_of_one_target_are_independent() {
        let engine = engine(300);
        let t = target(&["nginx", "sshd"]);

        engine.evaluate(&t, &running(&["nginx", "sshd"]), at(0));
        let events = engine.evaluate(&t, &running(&["sshd"]), at(1));
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].key, key("nginx"));
        assert!(!events[0].is_reminder());
        assert_eq!(events[0].down_since, Some(at(1)));
    }

    #[test]
    fn snapshot_reports_unknown_and_never() {
        let engine = engine(300);
        let t = target(&["nginx"]);
        let status = engine.snapshot(&[t]);

        assert_eq!(status[0].processes[0].running, None);
        assert_eq!(status[0].processes[0].last_alert, "never");
        assert_eq!(status[0].reachable, None);
        assert_eq!(status[0].agent_status, AgentStatus::Offline);
    }
}
