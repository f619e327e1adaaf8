use prometheus::{
    register_counter_vec_with_registry, register_gauge_vec_with_registry,
    register_int_counter_with_registry, CounterVec, Encoder, GaugeVec, IntCounter, Opts, Registry,
    TextEncoder,
};

use crate::models::ProcessState;

pub struct WatchdogMetrics {
    registry: Registry,

    // Gauge metrics
    pub process_up: GaugeVec,
    pub target_reachable: GaugeVec,

    // Counter metrics
    pub alerts_sent: CounterVec,
    pub alerts_failed: CounterVec,
    pub alerts_suppressed: CounterVec,
    pub target_unavailable: CounterVec,
    pub poll_cycles: IntCounter,
}

impl WatchdogMetrics {
    pub fn new() -> prometheus::Result<Self> {
        let registry = Registry::new();
        let pair_labels = &["target", "process"];

        let process_up = register_gauge_vec_with_registry!(
            Opts::new("watchdog_process_up", "Watched process is running (1) or stopped (0)"),
            pair_labels,
            registry
        )?;

        let target_reachable = register_gauge_vec_with_registry!(
            Opts::new("watchdog_target_reachable", "Target answered the last poll (1) or not (0)"),
            &["target"],
            registry
        )?;

        let alerts_sent = register_counter_vec_with_registry!(
            Opts::new("watchdog_alerts_sent_total", "Stop alerts delivered"),
            pair_labels,
            registry
        )?;

        let alerts_failed = register_counter_vec_with_registry!(
            Opts::new("watchdog_alerts_failed_total", "Stop alerts whose delivery failed"),
            pair_labels,
            registry
        )?;

        let alerts_suppressed = register_counter_vec_with_registry!(
            Opts::new("watchdog_alerts_suppressed_total", "Stop alerts held back by the cooldown"),
            pair_labels,
            registry
        )?;

        let target_unavailable = register_counter_vec_with_registry!(
            Opts::new("watchdog_target_unavailable_total", "Polls where the target could not be queried"),
            &["target"],
            registry
        )?;

        let poll_cycles = register_int_counter_with_registry!(
            Opts::new("watchdog_poll_cycles_total", "Completed poll cycles"),
            registry
        )?;

        Ok(Self {
            registry,
            process_up,
            target_reachable,
            alerts_sent,
            alerts_failed,
            alerts_suppressed,
            target_unavailable,
            poll_cycles,
        })
    }

    pub fn set_process_state(&self, target: &str, process: &str, state: ProcessState) {
        match state.as_running() {
            Some(running) => self
                .process_up
                .with_label_values(&[target, process])
                .set(if running { 1.0 } else { 0.0 }),
            None => {
                let _ = self.process_up.remove_label_values(&[target, process]);
            }
        }
    }

    pub fn set_reachable(&self, target: &str, reachable: bool) {
        self.target_reachable
            .with_label_values(&[target])
            .set(if reachable { 1.0 } else { 0.0 });
        if !reachable {
            self.target_unavailable.with_label_values(&[target]).inc();
        }
    }

    #[cfg(test)]
    pub fn unavailable_count(&self, target: &str) -> f64 {
        self.target_unavailable.with_label_values(&[target]).get()
    }

    pub fn render(&self) -> Result<String, Box<dyn std::error::Error>> {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        encoder.encode(&metric_families, &mut buffer)?;
        Ok(String::from_utf8(buffer)?)
    }
}
