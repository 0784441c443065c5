//! Azure Monitor metrics exporter.
//!
//! Polls Azure Monitor on every scrape and republishes the latest aggregated
//! values as Prometheus gauges.

pub mod azure;
pub mod config;
pub mod definitions;
pub mod metrics;
pub mod resource;
pub mod server;
pub mod state;
