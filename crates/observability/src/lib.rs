use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use once_cell::sync::OnceCell;
use serde::Serialize;
use tracing_subscriber::EnvFilter;

static TRACING_INIT: OnceCell<()> = OnceCell::new();

#[derive(Debug, Default)]
pub struct AppMetrics {
    calculations_total: AtomicU64,
    lookups_total: AtomicU64,
    validation_failures_total: AtomicU64,
    not_found_total: AtomicU64,
    unparsed_rates_total: AtomicU64,
    total_latency_micros: AtomicU64,
}

#[derive(Debug, Clone, Serialize)]
pub struct MetricsSnapshot {
    pub calculations_total: u64,
    pub lookups_total: u64,
    pub validation_failures_total: u64,
    pub not_found_total: u64,
    pub unparsed_rates_total: u64,
    pub avg_latency_micros: f64,
}

impl AppMetrics {
    pub fn shared() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn inc_calculation(&self) {
        self.calculations_total.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_lookup(&self) {
        self.lookups_total.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_validation_failure(&self) {
        self.validation_failures_total
            .fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_not_found(&self) {
        self.not_found_total.fetch_add(1, Ordering::Relaxed);
    }

    pub fn add_unparsed_rates(&self, count: usize) {
        self.unparsed_rates_total
            .fetch_add(count as u64, Ordering::Relaxed);
    }

    pub fn observe_latency(&self, duration: Duration) {
        self.total_latency_micros
            .fetch_add(duration.as_micros() as u64, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        let calculations = self.calculations_total.load(Ordering::Relaxed);
        let latency = self.total_latency_micros.load(Ordering::Relaxed);

        MetricsSnapshot {
            calculations_total: calculations,
            lookups_total: self.lookups_total.load(Ordering::Relaxed),
            validation_failures_total: self.validation_failures_total.load(Ordering::Relaxed),
            not_found_total: self.not_found_total.load(Ordering::Relaxed),
            unparsed_rates_total: self.unparsed_rates_total.load(Ordering::Relaxed),
            avg_latency_micros: if calculations == 0 {
                0.0
            } else {
                latency as f64 / calculations as f64
            },
        }
    }
}

#[derive(Debug, Clone)]
pub struct TracingConfig {
    pub service_name: String,
    /// Default level when `RUST_LOG` is unset.
    pub level: String,
    pub json: bool,
}

impl TracingConfig {
    pub fn new(service_name: impl Into<String>) -> Self {
        Self {
            service_name: service_name.into(),
            level: "info".to_string(),
            json: false,
        }
    }

    fn default_directives(&self) -> String {
        format!(
            "{service}={level},duty_service={level},duty_storage={level},duty_core={level}",
            service = self.service_name,
            level = self.level,
        )
    }
}

/// Installs the global subscriber once; later calls are no-ops.
pub fn init_tracing(config: &TracingConfig) {
    TRACING_INIT.get_or_init(|| {
        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(config.default_directives()));

        if config.json {
            tracing_subscriber::fmt()
                .json()
                .with_env_filter(filter)
                .with_current_span(true)
                .with_span_list(true)
                .with_writer(std::io::stderr)
                .init();
        } else {
            tracing_subscriber::fmt()
                .compact()
                .with_env_filter(filter)
                .with_writer(std::io::stderr)
                .init();
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snapshot_averages_latency_over_calculations() {
        let metrics = AppMetrics::shared();
        assert_eq!(metrics.snapshot().avg_latency_micros, 0.0);

        metrics.inc_calculation();
        metrics.inc_calculation();
        metrics.observe_latency(Duration::from_micros(300));
        metrics.observe_latency(Duration::from_micros(100));
        metrics.add_unparsed_rates(2);

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.calculations_total, 2);
        assert_eq!(snapshot.unparsed_rates_total, 2);
        assert_eq!(snapshot.avg_latency_micros, 200.0);
    }

    #[test]
    fn default_directives_cover_workspace_crates() {
        let mut config = TracingConfig::new("duty_cli");
        config.level = "debug".to_string();
        let directives = config.default_directives();
        assert!(directives.starts_with("duty_cli=debug"));
        assert!(directives.contains("duty_core=debug"));
    }
}
