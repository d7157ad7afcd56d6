//! Metrics sink port. The core emits counters and gauges through this
//! trait; wiring a real backend (Prometheus, statsd, ...) is left to the
//! binary that constructs the engine.

use std::collections::HashMap;
use std::sync::Mutex;

/// A destination for counters and gauges the engine emits during ticks.
pub trait MetricsSink: Send + Sync {
    fn incr_counter(&self, name: &str, value: u64);
    fn set_gauge(&self, name: &str, value: f64);
}

/// Discards everything. The default when no observability endpoint is
/// configured.
#[derive(Debug, Default)]
pub struct NoopMetrics;

impl MetricsSink for NoopMetrics {
    fn incr_counter(&self, _name: &str, _value: u64) {}
    fn set_gauge(&self, _name: &str, _value: f64) {}
}

/// Accumulates counters and gauges in memory, for test assertions.
#[derive(Default)]
pub struct InMemoryMetrics {
    counters: Mutex<HashMap<String, u64>>,
    gauges: Mutex<HashMap<String, f64>>,
}

impl InMemoryMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn counter(&self, name: &str) -> u64 {
        *self.counters.lock().expect("metrics mutex poisoned").get(name).unwrap_or(&0)
    }

    pub fn gauge(&self, name: &str) -> Option<f64> {
        self.gauges.lock().expect("metrics mutex poisoned").get(name).copied()
    }
}

impl MetricsSink for InMemoryMetrics {
    fn incr_counter(&self, name: &str, value: u64) {
        let mut counters = self.counters.lock().expect("metrics mutex poisoned");
        *counters.entry(name.to_string()).or_insert(0) += value;
    }

    fn set_gauge(&self, name: &str, value: f64) {
        let mut gauges = self.gauges.lock().expect("metrics mutex poisoned");
        gauges.insert(name.to_string(), value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn in_memory_metrics_accumulates_counters() {
        let sink = InMemoryMetrics::new();
        sink.incr_counter("ticks", 1);
        sink.incr_counter("ticks", 3);
        assert_eq!(sink.counter("ticks"), 4);
        assert_eq!(sink.counter("missing"), 0);
    }

    #[test]
    fn in_memory_metrics_overwrites_gauges() {
        let sink = InMemoryMetrics::new();
        sink.set_gauge("players_online", 3.0);
        sink.set_gauge("players_online", 5.0);
        assert_eq!(sink.gauge("players_online"), Some(5.0));
        assert_eq!(sink.gauge("missing"), None);
    }
}
