//! Prometheus self-metrics describing the exporter's own scrapes

use anyhow::Result;
use prometheus::{CounterVec, Encoder, Histogram, HistogramOpts, Opts, Registry, TextEncoder};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Counters and timings for exporter scrapes
#[derive(Clone)]
pub struct ExporterMetrics {
    /// Scrapes handled, by outcome
    pub scrapes_total: CounterVec,
    /// Scrape duration in seconds
    pub scrape_duration_seconds: Histogram,
    /// Detail fetches that fell back to zero values, by resource kind
    pub degraded_fetches_total: CounterVec,
    /// Prometheus registry for metrics
    pub registry: Arc<Registry>,
}

impl ExporterMetrics {
    /// Create a new set of exporter metrics on a private registry
    pub fn new() -> Result<Self> {
        let registry = Arc::new(Registry::new());

        let scrapes_total = CounterVec::new(
            Opts::new("vcd_exporter_scrapes_total", "Total scrapes by outcome"),
            &["outcome"],
        )?;

        let scrape_duration_seconds = Histogram::with_opts(
            HistogramOpts::new(
                "vcd_exporter_scrape_duration_seconds",
                "Time spent collecting and rendering a scrape",
            )
            .buckets(vec![0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0, 60.0]),
        )?;

        let degraded_fetches_total = CounterVec::new(
            Opts::new(
                "vcd_exporter_degraded_fetches_total",
                "Detail fetches that failed and were reported as zeros",
            ),
            &["resource"],
        )?;

        registry.register(Box::new(scrapes_total.clone()))?;
        registry.register(Box::new(scrape_duration_seconds.clone()))?;
        registry.register(Box::new(degraded_fetches_total.clone()))?;

        Ok(Self {
            scrapes_total,
            scrape_duration_seconds,
            degraded_fetches_total,
            registry,
        })
    }

    /// Record a finished scrape
    pub fn observe_scrape(&self, outcome: &str, elapsed: Duration) {
        debug!("Scrape finished with outcome {} in {:?}", outcome, elapsed);
        self.scrapes_total.with_label_values(&[outcome]).inc();
        self.scrape_duration_seconds.observe(elapsed.as_secs_f64());
    }

    /// Record `count` degraded fetches of a resource kind
    pub fn record_degraded(&self, resource: &str, count: usize) {
        if count > 0 {
            self.degraded_fetches_total
                .with_label_values(&[resource])
                .inc_by(count as f64);
        }
    }

    /// Gather all metrics in Prometheus text format
    pub fn gather(&self) -> Result<String> {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = vec![];
        encoder.encode(&metric_families, &mut buffer)?;
        Ok(String::from_utf8(buffer)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_creation() {
        let metrics = ExporterMetrics::new().expect("Failed to create metrics");
        assert!(metrics.gather().is_ok());
    }

    #[test]
    fn test_observe_scrape() {
        let metrics = ExporterMetrics::new().expect("Failed to create metrics");
        metrics.observe_scrape("success", Duration::from_millis(250));
        metrics.observe_scrape("fetch_error", Duration::from_millis(10));

        let text = metrics.gather().expect("Failed to gather metrics");
        assert!(text.contains("# TYPE vcd_exporter_scrapes_total counter"));
        assert!(text.contains(r#"vcd_exporter_scrapes_total{outcome="success"} 1"#));
        assert!(text.contains(r#"vcd_exporter_scrapes_total{outcome="fetch_error"} 1"#));
        assert!(text.contains("vcd_exporter_scrape_duration_seconds_count 2"));
    }

    #[test]
    fn test_record_degraded() {
        let metrics = ExporterMetrics::new().expect("Failed to create metrics");
        metrics.record_degraded("compute_capacity", 2);
        metrics.record_degraded("storage_profile", 0);

        let text = metrics.gather().expect("Failed to gather metrics");
        assert!(text.contains(r#"vcd_exporter_degraded_fetches_total{resource="compute_capacity"} 2"#));
        assert!(!text.contains(r#"resource="storage_profile""#));
    }

    #[test]
    fn test_metrics_clone_shares_registry() {
        let metrics = ExporterMetrics::new().expect("Failed to create metrics");
        let clone = metrics.clone();
        clone.observe_scrape("success", Duration::from_secs(1));

        let text = metrics.gather().expect("Failed to gather metrics");
        assert!(text.contains(r#"vcd_exporter_scrapes_total{outcome="success"} 1"#));
    }
}
