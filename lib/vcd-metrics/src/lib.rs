//! Metric output for the vCloud Director exporter
pub mod render;
pub mod metrics;

pub use render::{escape_label_value, render};
pub use metrics::ExporterMetrics;
