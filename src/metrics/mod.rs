//! Metric collection and exposition
//!
//! - [`collector`] - scrape orchestration and response-to-sample conversion
//! - [`naming`] - metric name and label mapping
//! - [`exposition`] - Prometheus text encoding and the exporter's own metrics

pub mod collector;
pub mod exposition;
pub mod naming;

pub use collector::{Collector, MetricSample};
pub use exposition::ExporterMetrics;
